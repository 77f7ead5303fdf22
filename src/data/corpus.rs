//! Parallel corpus loading
//!
//! The corpus is UTF-8 text with one sentence pair per line and the source
//! and target fields separated by a single tab.

use crate::error::{Error, Result};
use crate::preprocessing::vocab::{END_MARKER, PAD_SYMBOL, START_MARKER};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// Field separator between source and target sentences
pub const FIELD_SEPARATOR: char = '\t';

/// One aligned (source, target) sentence pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentencePair {
    /// Source-language sentence
    pub source: String,
    /// Target-language sentence, without START/END framing
    pub target: String,
}

impl SentencePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Parses one corpus line. `line_number` is 1-based and only used for errors.
    pub fn parse(line: &str, line_number: usize) -> Result<Self> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();

        if fields.len() != 2 {
            return Err(Error::MalformedCorpusLine {
                line: line_number,
                reason: format!("expected 2 tab-separated fields, found {}", fields.len()),
            });
        }

        for field in &fields {
            if let Some(c) = field
                .chars()
                .find(|c| [START_MARKER, END_MARKER, PAD_SYMBOL].contains(c))
            {
                return Err(Error::MalformedCorpusLine {
                    line: line_number,
                    reason: format!("reserved character {:?} in sentence text", c),
                });
            }
        }

        Ok(Self::new(fields[0], fields[1]))
    }
}

/// An ordered, non-empty collection of sentence pairs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    pairs: Vec<SentencePair>,
}

impl Corpus {
    /// Creates a corpus from already-parsed pairs
    pub fn new(pairs: Vec<SentencePair>) -> Result<Self> {
        if pairs.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        Ok(Self { pairs })
    }

    /// Reads a corpus file, keeping at most `limit` pairs when given
    pub fn load<P: AsRef<Path>>(path: P, limit: Option<usize>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading corpus from {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(file, limit)
    }

    /// Reads a corpus from any reader. Any malformed line aborts loading.
    pub fn from_reader<R: Read>(reader: R, limit: Option<usize>) -> Result<Self> {
        let reader = BufReader::new(reader);
        let mut pairs = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            if limit.is_some_and(|n| pairs.len() >= n) {
                break;
            }
            let line = line?;
            pairs.push(SentencePair::parse(&line, i + 1)?);
        }

        debug!("Parsed {} sentence pairs", pairs.len());
        Self::new(pairs)
    }

    /// Parses a corpus held in memory
    pub fn parse_str(text: &str, limit: Option<usize>) -> Result<Self> {
        Self::from_reader(text.as_bytes(), limit)
    }

    pub fn pairs(&self) -> &[SentencePair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterates over the source sentences
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|p| p.source.as_str())
    }

    /// Iterates over the unframed target sentences
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|p| p.target.as_str())
    }

    /// Splits into leading training and trailing validation pairs.
    ///
    /// Either side may come back empty for extreme ratios, so the halves are
    /// returned as plain slices rather than corpora.
    pub fn split(&self, validation_ratio: f64) -> (&[SentencePair], &[SentencePair]) {
        let n = self.pairs.len();
        let n_val = ((n as f64) * validation_ratio.clamp(0.0, 1.0)).round() as usize;
        self.pairs.split_at(n - n_val.min(n))
    }
}
