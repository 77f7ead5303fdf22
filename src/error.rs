//! Error types for the char_seq2seq library

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// A corpus line did not split into exactly one source and one target field
    #[error("Malformed corpus line {line}: {reason}")]
    MalformedCorpusLine { line: usize, reason: String },

    /// The corpus contained no sentence pairs
    #[error("Corpus is empty")]
    EmptyCorpus,

    /// A character is absent from the frozen alphabet
    #[error("Unknown character {character:?} at position {position}")]
    UnknownCharacter { character: char, position: usize },

    /// A sequence exceeds the configured timestep budget
    #[error("Sequence of length {length} exceeds maximum of {max} timesteps")]
    SequenceTooLong { length: usize, max: usize },

    /// The decoder adapter failed mid-sequence
    #[error("Decoder step failed: {0}")]
    DecoderStepFailure(String),

    /// Tensor or state dimensions do not line up
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Invalid parameter passed to a constructor or trainer
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Model (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error is scoped to a single sequence.
    ///
    /// Such errors abort the offending translation but leave sibling
    /// sequences in a batch untouched.
    pub fn is_per_sequence(&self) -> bool {
        matches!(
            self,
            Error::UnknownCharacter { .. }
                | Error::SequenceTooLong { .. }
                | Error::DecoderStepFailure(_)
        )
    }

    pub(crate) fn shape(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_sequence_classification() {
        assert!(Error::UnknownCharacter { character: 'x', position: 0 }.is_per_sequence());
        assert!(Error::SequenceTooLong { length: 9, max: 4 }.is_per_sequence());
        assert!(Error::DecoderStepFailure("bad".into()).is_per_sequence());
        assert!(!Error::EmptyCorpus.is_per_sequence());
    }

    #[test]
    fn test_display_reports_offending_length() {
        let err = Error::SequenceTooLong { length: 12, max: 5 };
        assert_eq!(err.to_string(), "Sequence of length 12 exceeds maximum of 5 timesteps");
    }
}
