//! # Utilities
//!
//! Evaluation metrics.

mod metrics;

pub use metrics::{character_error_rate, cross_entropy, edit_distance, exact_match, next_char_accuracy};
