//! Character vocabularies for the source and target languages
//!
//! An [`Alphabet`] is frozen once built: the index → char table is a boxed
//! slice and the char → index table a hash map derived from it, with no
//! mutating API. Rebuilding an alphabet from differently ordered data would
//! desynchronise a trained decoder, so alphabets are always persisted with
//! the model weights.

use crate::data::Corpus;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::info;

/// Marks the beginning of every target sequence
pub const START_MARKER: char = '\t';
/// Marks the end of every target sequence
pub const END_MARKER: char = '\n';
/// Reserved padding symbol used by [`PadPolicy::Dedicated`]
pub const PAD_SYMBOL: char = '\0';

/// Which side of a sentence pair a sequence belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Source,
    Target,
}

/// How timesteps past the end of a sequence are filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadPolicy {
    /// A reserved symbol disjoint from all natural text
    #[default]
    Dedicated,
    /// The space character, which cannot be told apart from a real trailing space
    Space,
}

impl PadPolicy {
    pub fn pad_char(self) -> char {
        match self {
            PadPolicy::Dedicated => PAD_SYMBOL,
            PadPolicy::Space => ' ',
        }
    }
}

/// A frozen, duplicate-free, ordered set of characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<char>", into = "Vec<char>")]
pub struct Alphabet {
    index_to_char: Box<[char]>,
    char_to_index: HashMap<char, usize>,
}

impl Alphabet {
    /// Builds an alphabet from any characters, sorted by code point.
    ///
    /// Sorting makes the index assignment independent of the order in which
    /// characters were observed.
    pub fn from_chars<I: IntoIterator<Item = char>>(chars: I) -> Self {
        let unique: BTreeSet<char> = chars.into_iter().collect();
        let index_to_char: Box<[char]> = unique.into_iter().collect();
        let char_to_index = index_to_char
            .iter()
            .enumerate()
            .map(|(i, &c)| (c, i))
            .collect();

        Self {
            index_to_char,
            char_to_index,
        }
    }

    pub fn len(&self) -> usize {
        self.index_to_char.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_to_char.is_empty()
    }

    pub fn contains(&self, c: char) -> bool {
        self.char_to_index.contains_key(&c)
    }

    /// Index of `c`, if it belongs to the alphabet
    pub fn index_of(&self, c: char) -> Option<usize> {
        self.char_to_index.get(&c).copied()
    }

    /// Like [`Alphabet::index_of`] but reports the sequence position of a miss
    pub fn try_index(&self, c: char, position: usize) -> Result<usize> {
        self.index_of(c).ok_or(Error::UnknownCharacter {
            character: c,
            position,
        })
    }

    /// Character stored at `index`
    pub fn char_at(&self, index: usize) -> Option<char> {
        self.index_to_char.get(index).copied()
    }

    /// All characters in index order
    pub fn chars(&self) -> &[char] {
        &self.index_to_char
    }

    /// Decodes indices back into text, skipping anything out of range
    pub fn decode(&self, indices: &[usize]) -> String {
        indices.iter().filter_map(|&i| self.char_at(i)).collect()
    }
}

impl TryFrom<Vec<char>> for Alphabet {
    type Error = Error;

    fn try_from(chars: Vec<char>) -> Result<Self> {
        let alphabet = Alphabet::from_chars(chars.iter().copied());
        if alphabet.chars() != chars.as_slice() {
            return Err(Error::InvalidParameter(
                "stored alphabet is not sorted and duplicate-free".to_string(),
            ));
        }
        Ok(alphabet)
    }
}

impl From<Alphabet> for Vec<char> {
    fn from(alphabet: Alphabet) -> Self {
        alphabet.index_to_char.into_vec()
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.index_to_char.iter() {
            write!(f, "{}", c.escape_debug())?;
        }
        Ok(())
    }
}

/// Wraps a target sentence with START and END markers
pub fn frame_target(text: &str) -> String {
    let mut framed = String::with_capacity(text.len() + 2);
    framed.push(START_MARKER);
    framed.push_str(text);
    framed.push(END_MARKER);
    framed
}

/// Source and target alphabets plus the sequence budgets derived from a corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    source: Alphabet,
    target: Alphabet,
    /// Longest source sentence, in characters
    pub max_source_len: usize,
    /// Longest framed target sentence, in characters
    pub max_target_len: usize,
    pub pad_policy: PadPolicy,
}

impl Vocabulary {
    /// Builds both alphabets from a corpus.
    ///
    /// Targets are framed before extraction so START and END always occupy a
    /// target slot. The pad symbol is added to both alphabets.
    pub fn build(corpus: &Corpus, pad_policy: PadPolicy) -> Result<Self> {
        if corpus.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        let pad = pad_policy.pad_char();
        let mut max_source_len = 0;
        let mut max_target_len = 0;

        let source = Alphabet::from_chars(
            corpus
                .sources()
                .inspect(|s| max_source_len = max_source_len.max(s.chars().count()))
                .flat_map(str::chars)
                .chain(std::iter::once(pad))
                .collect::<Vec<_>>(),
        );

        let target = Alphabet::from_chars(
            corpus
                .targets()
                .map(frame_target)
                .inspect(|t| max_target_len = max_target_len.max(t.chars().count()))
                .flat_map(|t| t.chars().collect::<Vec<_>>())
                .chain(std::iter::once(pad))
                .collect::<Vec<_>>(),
        );

        info!(
            "Vocabulary built: {} pairs, {} source chars, {} target chars, max lengths {}/{}",
            corpus.len(),
            source.len(),
            target.len(),
            max_source_len,
            max_target_len
        );

        Ok(Self {
            source,
            target,
            max_source_len,
            max_target_len,
            pad_policy,
        })
    }

    pub fn source(&self) -> &Alphabet {
        &self.source
    }

    pub fn target(&self) -> &Alphabet {
        &self.target
    }

    pub fn alphabet(&self, role: Role) -> &Alphabet {
        match role {
            Role::Source => &self.source,
            Role::Target => &self.target,
        }
    }

    pub fn max_len(&self, role: Role) -> usize {
        match role {
            Role::Source => self.max_source_len,
            Role::Target => self.max_target_len,
        }
    }

    pub fn pad_index(&self, role: Role) -> usize {
        // build() always inserts the pad symbol into both alphabets
        self.alphabet(role)
            .index_of(self.pad_policy.pad_char())
            .unwrap_or_default()
    }

    pub fn start_index(&self) -> usize {
        self.target.index_of(START_MARKER).unwrap_or_default()
    }

    pub fn end_index(&self) -> usize {
        self.target.index_of(END_MARKER).unwrap_or_default()
    }

    /// Verifies the structural invariants a trained model relies on.
    ///
    /// Used after deserialisation, where the alphabets came from disk.
    pub fn validate(&self) -> Result<()> {
        let pad = self.pad_policy.pad_char();
        for (name, alphabet) in [("source", &self.source), ("target", &self.target)] {
            if !alphabet.contains(pad) {
                return Err(Error::InvalidParameter(format!(
                    "{} alphabet lacks the pad symbol {:?}",
                    name, pad
                )));
            }
        }
        if !self.target.contains(START_MARKER) || !self.target.contains(END_MARKER) {
            return Err(Error::InvalidParameter(
                "target alphabet lacks START/END markers".to_string(),
            ));
        }
        Ok(())
    }
}
