//! Readout training
//!
//! Fits the decoder's softmax readout with mini-batch gradient descent on
//! the categorical cross-entropy against the one-step-shifted target. For a
//! softmax layer the gradient is closed-form:
//!
//! ```text
//! dL/dlogits = p - y,   dW = (p - y)ᵀ h / B,   db = Σ (p - y) / B
//! ```
//!
//! The encoder and decoder LSTM weights keep their seeded initialisation,
//! in the manner of a reservoir / echo state network.

use super::dataset::ReadoutDataset;
use crate::config::TrainingConfig;
use crate::data::SentencePair;
use crate::error::{Error, Result};
use crate::model::Seq2SeqModel;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Axis;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Loss and accuracy after one epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub val_loss: Option<f64>,
    pub val_accuracy: Option<f64>,
}

/// Per-epoch history of a training run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingReport {
    pub history: Vec<EpochStats>,
}

impl TrainingReport {
    pub fn last(&self) -> Option<&EpochStats> {
        self.history.last()
    }

    /// Training loss per epoch
    pub fn loss_history(&self) -> Vec<f64> {
        self.history.iter().map(|e| e.train_loss).collect()
    }
}

/// Mini-batch trainer for the decoder readout
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
    seed: u64,
    show_progress: bool,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            seed: 42,
            show_progress: false,
        }
    }

    /// Seed for mini-batch shuffling
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Draw a progress bar on stderr
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(self.config.epochs as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) Loss: {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb
    }

    /// Trains `model` in place on `train`, reporting held-out metrics on
    /// `validation` when it is non-empty
    pub fn fit(
        &self,
        model: &mut Seq2SeqModel,
        train: &[SentencePair],
        validation: &[SentencePair],
    ) -> Result<TrainingReport> {
        if self.config.batch_size == 0 {
            return Err(Error::InvalidParameter("batch_size must be > 0".to_string()));
        }
        if train.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        info!(
            "Preparing teacher-forced features for {} training / {} validation pairs",
            train.len(),
            validation.len()
        );
        let train_set = ReadoutDataset::build(model, train)?;
        let val_set = if validation.is_empty() {
            None
        } else {
            Some(ReadoutDataset::build(model, validation)?)
        };

        let width = model.vocab().target().len();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut order: Vec<usize> = (0..train_set.len()).collect();
        let mut report = TrainingReport::default();
        let pb = self.progress_bar();

        for epoch in 1..=self.config.epochs {
            order.shuffle(&mut rng);

            for batch in order.chunks(self.config.batch_size) {
                let h = train_set.hidden.select(Axis(0), batch);
                let readout = model.decoder_mut().readout_mut();

                let mut grad = readout.forward_batch(h.view());
                grad -= &train_set.one_hot_targets(batch, width);
                let scale = 1.0 / batch.len() as f64;
                let d_weights = grad.t().dot(&h) * scale;
                let d_biases = grad.sum_axis(Axis(0)) * scale;

                readout.apply_gradients(&d_weights, &d_biases, self.config.learning_rate);
            }

            let (train_loss, train_accuracy) = train_set.evaluate(model);
            let (val_loss, val_accuracy) = match &val_set {
                Some(v) => {
                    let (l, a) = v.evaluate(model);
                    (Some(l), Some(a))
                }
                None => (None, None),
            };

            info!(
                epoch,
                train_loss,
                train_accuracy,
                val_loss = val_loss.unwrap_or(f64::NAN),
                "epoch finished"
            );
            pb.set_message(format!("{:.4}", train_loss));
            pb.inc(1);

            report.history.push(EpochStats {
                epoch,
                train_loss,
                train_accuracy,
                val_loss,
                val_accuracy,
            });
        }

        pb.finish_with_message("training complete");
        Ok(report)
    }
}
