//! # Encoder-decoder model
//!
//! LSTM encoder and decoder adapters around `ndarray` gate math.
//!
//! ```rust,no_run
//! use char_seq2seq::data::Corpus;
//! use char_seq2seq::model::Seq2SeqModel;
//! use char_seq2seq::preprocessing::{PadPolicy, Vocabulary};
//!
//! # fn main() -> char_seq2seq::Result<()> {
//! let corpus = Corpus::load("data/fra.txt", Some(10_000))?;
//! let vocab = Vocabulary::build(&corpus, PadPolicy::Dedicated)?;
//! let model = Seq2SeqModel::new(vocab, 256, 42)?;
//! model.save("models/fra.bin")?;
//! # Ok(())
//! # }
//! ```

mod config;
mod decoder;
mod encoder;
mod layers;
mod lstm;
mod seq2seq;

pub use config::Seq2SeqConfig;
pub use decoder::{DecoderStep, LstmDecoder};
pub use encoder::{ContextEncoder, LstmEncoder};
pub use layers::{softmax, SoftmaxLayer};
pub use lstm::{LstmCell, RecurrentState};
pub use seq2seq::{ModelSummary, Seq2SeqModel};
