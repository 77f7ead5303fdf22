//! # Data loading
//!
//! Reading tab-separated parallel corpora into sentence pairs.

mod corpus;

pub use corpus::{Corpus, SentencePair, FIELD_SEPARATOR};
