//! Teacher-forced readout features
//!
//! The recurrent weights stay fixed during training, so the decoder hidden
//! state at every teacher-forced timestep can be computed once and reused
//! across epochs. Only timesteps whose shifted target is a real character
//! (END included) are kept; padded tails carry no signal for decoding,
//! which stops at END.

use crate::data::SentencePair;
use crate::error::{Error, Result};
use crate::inference::select_next_token;
use crate::model::{ContextEncoder, Seq2SeqModel};
use crate::preprocessing::teacher_forcing;
use crate::utils::{cross_entropy, next_char_accuracy};
use ndarray::{concatenate, s, Array2, ArrayView2, Axis};
use rayon::prelude::*;
use tracing::debug;

/// Pairs are converted to tensors in chunks of this size to bound memory
const CHUNK_SIZE: usize = 256;

/// Decoder hidden states and the index of the character each should predict
#[derive(Debug, Clone)]
pub struct ReadoutDataset {
    /// `[positions, latent_dim]`
    pub hidden: Array2<f64>,
    /// Target alphabet index per row of `hidden`
    pub targets: Vec<usize>,
}

impl ReadoutDataset {
    /// Runs the encoder and the teacher-forced decoder over every pair
    pub fn build(model: &Seq2SeqModel, pairs: &[SentencePair]) -> Result<Self> {
        let vocab = model.vocab();
        let latent = model.config.latent_dim;

        let mut blocks: Vec<Array2<f64>> = Vec::new();
        let mut targets = Vec::new();

        for chunk in pairs.chunks(CHUNK_SIZE) {
            let tensors = teacher_forcing(vocab, chunk)?;

            let per_pair: Vec<Result<(Array2<f64>, Vec<usize>)>> = (0..chunk.len())
                .into_par_iter()
                .map(|i| -> Result<(Array2<f64>, Vec<usize>)> {
                    let context = model
                        .encoder()
                        .encode_context(tensors.encoder_input.index_axis(Axis(0), i))?;
                    let hidden = model
                        .decoder()
                        .hidden_sequence(tensors.decoder_input.index_axis(Axis(0), i), &context)?;
                    let shifted = tensors.decoder_target.index_axis(Axis(0), i);

                    // Framed length minus one: every real character after START
                    let positions = chunk[i].target.chars().count() + 1;
                    let labels = shifted
                        .slice(s![..positions, ..])
                        .axis_iter(Axis(0))
                        .map(|row| {
                            select_next_token(row).ok_or_else(|| Error::shape("one-hot target row", "empty row"))
                        })
                        .collect::<Result<Vec<usize>>>()?;
                    Ok((hidden.slice(s![..positions, ..]).to_owned(), labels))
                })
                .collect();

            for item in per_pair {
                let (hidden, labels) = item?;
                blocks.push(hidden);
                targets.extend(labels);
            }
        }

        let views: Vec<ArrayView2<f64>> = blocks.iter().map(|b| b.view()).collect();
        let hidden = if views.is_empty() {
            Array2::zeros((0, latent))
        } else {
            concatenate(Axis(0), &views).map_err(|e| Error::shape("stackable blocks", e.to_string()))?
        };

        debug!("Readout dataset: {} positions from {} pairs", targets.len(), pairs.len());
        Ok(Self { hidden, targets })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// One-hot matrix of the targets for rows `rows`
    pub fn one_hot_targets(&self, rows: &[usize], width: usize) -> Array2<f64> {
        let mut y = Array2::zeros((rows.len(), width));
        for (r, &row) in rows.iter().enumerate() {
            y[[r, self.targets[row]]] = 1.0;
        }
        y
    }

    /// Mean cross-entropy and argmax accuracy of `model`'s readout
    pub fn evaluate(&self, model: &Seq2SeqModel) -> (f64, f64) {
        if self.is_empty() {
            return (0.0, 0.0);
        }
        let probs = model.decoder().readout().forward_batch(self.hidden.view());
        let all: Vec<usize> = (0..self.len()).collect();
        let y = self.one_hot_targets(&all, probs.ncols());
        (
            cross_entropy(probs.view(), y.view()),
            next_char_accuracy(probs.view(), &self.targets),
        )
    }
}
