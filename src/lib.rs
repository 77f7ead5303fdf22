//! # char_seq2seq
//!
//! Character-level sequence-to-sequence translation with an LSTM encoder,
//! an LSTM decoder and greedy autoregressive decoding.
//!
//! ## Modules
//!
//! - `data` - Tab-separated parallel corpora
//! - `preprocessing` - Alphabets, START/END framing, one-hot tensors
//! - `model` - Encoder and decoder adapters, persisted model bundle
//! - `training` - Teacher-forced readout training
//! - `inference` - Greedy decoding loop and translation sessions
//! - `utils` - Evaluation metrics
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use char_seq2seq::config::TrainingConfig;
//! use char_seq2seq::data::Corpus;
//! use char_seq2seq::inference::TranslationSession;
//! use char_seq2seq::model::Seq2SeqModel;
//! use char_seq2seq::preprocessing::{PadPolicy, Vocabulary};
//! use char_seq2seq::training::Trainer;
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     // 1. Load pairs and freeze the alphabets
//!     let corpus = Corpus::load("data/fra.txt", Some(10_000))?;
//!     let vocab = Vocabulary::build(&corpus, PadPolicy::Dedicated)?;
//!
//!     // 2. Build and train the model
//!     let mut model = Seq2SeqModel::new(vocab, 256, 42)?;
//!     let (train, val) = corpus.split(0.2);
//!     Trainer::new(TrainingConfig::default()).fit(&mut model, train, val)?;
//!
//!     // 3. Translate
//!     let session = TranslationSession::new(Arc::new(model));
//!     let translation = session.translate("Go.")?;
//!     println!("{}", translation.text);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod inference;
pub mod model;
pub mod preprocessing;
pub mod training;
pub mod utils;

pub use config::Config;
pub use data::{Corpus, SentencePair};
pub use error::{Error, Result};
pub use inference::{ModelSnapshot, Termination, Translation, TranslationSession, UnknownCharPolicy};
pub use model::Seq2SeqModel;
pub use preprocessing::{PadPolicy, Vocabulary};
pub use training::Trainer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
