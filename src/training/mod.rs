//! # Training
//!
//! Teacher-forced fitting of the decoder readout.

mod dataset;
mod trainer;

pub use dataset::ReadoutDataset;
pub use trainer::{EpochStats, Trainer, TrainingReport};
