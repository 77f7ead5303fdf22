//! # Preprocessing
//!
//! - `vocab` - character alphabets and the START/END/pad conventions
//! - `encoder` - one-hot tensors and teacher-forced training triples

pub mod encoder;
pub mod vocab;

pub use encoder::{one_hot, teacher_forcing, TensorEncoder, TrainingTensors};
pub use vocab::{
    frame_target, Alphabet, PadPolicy, Role, Vocabulary, END_MARKER, PAD_SYMBOL, START_MARKER,
};
