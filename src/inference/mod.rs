//! # Inference
//!
//! - `decoding` - the greedy RUNNING/DONE decoding state machine
//! - `session` - end-to-end translation of raw text

pub mod decoding;
pub mod session;

pub use decoding::{select_next_token, DecodeOutcome, DecodeStatus, GreedyDecoder, Termination};
pub use session::{strip_markers, ModelSnapshot, Translation, TranslationSession, UnknownCharPolicy};
