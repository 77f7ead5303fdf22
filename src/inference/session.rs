//! Translation entry point
//!
//! [`TranslationSession`] owns a shared, read-only model and performs the
//! whole pipeline for one sentence: alphabet lookup, tensor encoding, the
//! encoder pass, greedy decoding and marker stripping.

use super::decoding::{GreedyDecoder, Termination};
use crate::error::{Error, Result};
use crate::model::{ContextEncoder, Seq2SeqModel};
use crate::preprocessing::{PadPolicy, Role, TensorEncoder, END_MARKER, PAD_SYMBOL, START_MARKER};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// What to do with source characters missing from the frozen alphabet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnknownCharPolicy {
    /// Fail the sentence with `UnknownCharacter`
    #[default]
    Reject,
    /// Replace with a character that is in the source alphabet
    Substitute(char),
}

/// Decoded text of one sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Output with markers and padding removed
    pub text: String,
    pub termination: Termination,
}

impl Translation {
    /// False when decoding stopped at the length bound instead of END
    pub fn is_complete(&self) -> bool {
        self.termination == Termination::EndMarker
    }
}

/// Translation against one immutable model snapshot
#[derive(Debug, Clone)]
pub struct TranslationSession {
    model: Arc<Seq2SeqModel>,
    unknown_policy: UnknownCharPolicy,
    max_output_len: usize,
}

impl TranslationSession {
    pub fn new(model: Arc<Seq2SeqModel>) -> Self {
        let max_output_len = model.vocab().max_target_len;
        Self {
            model,
            unknown_policy: UnknownCharPolicy::Reject,
            max_output_len,
        }
    }

    /// Sets the unknown-character policy. A substitute must itself be in the
    /// source alphabet and cannot be the reserved pad symbol.
    pub fn with_unknown_policy(mut self, policy: UnknownCharPolicy) -> Result<Self> {
        if let UnknownCharPolicy::Substitute(c) = policy {
            if c == PAD_SYMBOL || !self.model.vocab().source().contains(c) {
                return Err(Error::Config(format!(
                    "substitute character {:?} is not in the source alphabet",
                    c
                )));
            }
        }
        self.unknown_policy = policy;
        Ok(self)
    }

    /// Overrides the decoding length bound (defaults to the longest framed
    /// training target)
    pub fn with_max_output_len(mut self, max_output_len: usize) -> Self {
        self.max_output_len = max_output_len;
        self
    }

    pub fn model(&self) -> &Seq2SeqModel {
        &self.model
    }

    fn prepare_source(&self, text: &str) -> String {
        match self.unknown_policy {
            UnknownCharPolicy::Reject => text.to_string(),
            UnknownCharPolicy::Substitute(sub) => {
                let alphabet = self.model.vocab().source();
                text.chars()
                    .map(|c| if c != PAD_SYMBOL && alphabet.contains(c) { c } else { sub })
                    .collect()
            }
        }
    }

    /// Translates one sentence
    pub fn translate(&self, text: &str) -> Result<Translation> {
        let vocab = self.model.vocab();
        let source = self.prepare_source(text);
        let input = TensorEncoder::for_role(vocab, Role::Source).encode_one(&source)?;

        let context = self.model.encoder().encode_context(input.view())?;
        let outcome = GreedyDecoder::new(
            self.model.decoder(),
            context,
            vocab.start_index(),
            vocab.end_index(),
            vocab.target().len(),
            self.max_output_len,
        )?
        .run()?;

        let raw = vocab.target().decode(&outcome.tokens);
        debug!(input = text, output = ?raw, "translated");

        Ok(Translation {
            text: strip_markers(&raw, vocab.pad_policy),
            termination: outcome.termination,
        })
    }

    /// Translates independent sentences in parallel.
    ///
    /// Each sentence gets its own recurrent state; a failure is reported in
    /// that sentence's slot and does not affect the others.
    pub fn translate_batch<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Vec<Result<Translation>> {
        texts.par_iter().map(|t| self.translate(t.as_ref())).collect()
    }
}

/// Removes START/END markers and padding from decoded text
pub fn strip_markers(raw: &str, pad_policy: PadPolicy) -> String {
    let text: String = raw
        .chars()
        .filter(|&c| c != START_MARKER && c != END_MARKER && c != PAD_SYMBOL)
        .collect();
    match pad_policy {
        PadPolicy::Dedicated => text,
        PadPolicy::Space => text.trim_end_matches(' ').to_string(),
    }
}

/// Holder for the current model.
///
/// Readers take an immutable `Arc` snapshot and decode against it; a retrained
/// model is published by swapping the snapshot, never by mutating weights
/// that in-flight translations are reading.
#[derive(Debug)]
pub struct ModelSnapshot {
    current: RwLock<Arc<Seq2SeqModel>>,
}

impl ModelSnapshot {
    pub fn new(model: Seq2SeqModel) -> Self {
        Self {
            current: RwLock::new(Arc::new(model)),
        }
    }

    /// The model in effect right now
    pub fn current(&self) -> Arc<Seq2SeqModel> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&*guard)
    }

    /// Session bound to the current snapshot
    pub fn session(&self) -> TranslationSession {
        TranslationSession::new(self.current())
    }

    /// Publishes `model`, returning the previous snapshot
    pub fn swap(&self, model: Seq2SeqModel) -> Result<Arc<Seq2SeqModel>> {
        model.validate()?;
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let previous = std::mem::replace(&mut *guard, Arc::new(model));
        info!("Published new model snapshot");
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Corpus, SentencePair};
    use crate::preprocessing::Vocabulary;

    fn model(seed: u64) -> Seq2SeqModel {
        let corpus = Corpus::new(vec![
            SentencePair::new("Go.", "Va !"),
            SentencePair::new("Hi.", "Salut !"),
            SentencePair::new("Run!", "Cours !"),
        ])
        .unwrap();
        let vocab = Vocabulary::build(&corpus, PadPolicy::Dedicated).unwrap();
        Seq2SeqModel::new(vocab, 16, seed).unwrap()
    }

    #[test]
    fn test_translate_is_deterministic() {
        let session = TranslationSession::new(Arc::new(model(1)));
        let a = session.translate("Hi.").unwrap();
        let b = session.translate("Hi.").unwrap();
        assert_eq!(a, b);
        assert!(a.text.chars().count() <= session.model().vocab().max_target_len + 1);
    }

    #[test]
    fn test_unknown_character_rejected() {
        let session = TranslationSession::new(Arc::new(model(1)));
        assert!(matches!(
            session.translate("Hz"),
            Err(Error::UnknownCharacter { character: 'z', position: 1 })
        ));
    }

    #[test]
    fn test_unknown_character_substituted() {
        let session = TranslationSession::new(Arc::new(model(1)))
            .with_unknown_policy(UnknownCharPolicy::Substitute('.'))
            .unwrap();
        assert!(session.translate("Hz").is_ok());
        assert!(TranslationSession::new(Arc::new(model(1)))
            .with_unknown_policy(UnknownCharPolicy::Substitute('z'))
            .is_err());
    }

    #[test]
    fn test_pad_symbol_is_not_a_source_character() {
        let session = TranslationSession::new(Arc::new(model(1)));
        assert!(matches!(
            session.translate("Go\0"),
            Err(Error::UnknownCharacter { character: PAD_SYMBOL, position: 2 })
        ));

        assert!(TranslationSession::new(Arc::new(model(1)))
            .with_unknown_policy(UnknownCharPolicy::Substitute(PAD_SYMBOL))
            .is_err());

        let lenient = TranslationSession::new(Arc::new(model(1)))
            .with_unknown_policy(UnknownCharPolicy::Substitute('.'))
            .unwrap();
        assert_eq!(lenient.translate("Go\0").unwrap(), lenient.translate("Go.").unwrap());
    }

    #[test]
    fn test_too_long_source() {
        let session = TranslationSession::new(Arc::new(model(1)));
        assert!(matches!(
            session.translate("Go. Go."),
            Err(Error::SequenceTooLong { length: 7, max: 4 })
        ));
    }

    #[test]
    fn test_batch_isolates_failures() {
        let session = TranslationSession::new(Arc::new(model(1)));
        let results = session.translate_batch(&["Go.", "Hz", "Hi."]);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap(), &session.translate("Hi.").unwrap());
    }

    #[test]
    fn test_strip_markers() {
        assert_eq!(strip_markers("\tVa !\n", PadPolicy::Dedicated), "Va !");
        assert_eq!(strip_markers("Va\0\0", PadPolicy::Dedicated), "Va");
        assert_eq!(strip_markers("Va !  \n", PadPolicy::Space), "Va !");
    }

    #[test]
    fn test_snapshot_swap() {
        let snapshot = ModelSnapshot::new(model(1));
        let before = snapshot.current();
        let session = snapshot.session();

        let previous = snapshot.swap(model(2)).unwrap();
        assert!(Arc::ptr_eq(&before, &previous));
        assert!(!Arc::ptr_eq(&before, &snapshot.current()));
        // Sessions keep decoding against the snapshot they were built from
        assert!(Arc::ptr_eq(&before, &session.model));
    }
}
