//! Encoder-decoder hyper-parameters

use serde::{Deserialize, Serialize};

/// Dimensions and initialisation of an encoder-decoder pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seq2SeqConfig {
    /// Source alphabet size (encoder input width)
    pub source_size: usize,
    /// Target alphabet size (decoder input and output width)
    pub target_size: usize,
    /// Width of the hidden and cell vectors
    pub latent_dim: usize,
    /// Scale applied to the uniform input-weight initialisation
    pub input_scaling: f64,
    /// Initial forget-gate bias
    pub forget_bias: f64,
    /// Seed for weight initialisation
    pub seed: u64,
}

impl Seq2SeqConfig {
    /// Creates a configuration with default initialisation
    ///
    /// # Arguments
    ///
    /// * `source_size` - Number of source characters
    /// * `target_size` - Number of target characters, markers included
    /// * `latent_dim` - Recurrent state width
    pub fn new(source_size: usize, target_size: usize, latent_dim: usize) -> Self {
        Self {
            source_size,
            target_size,
            latent_dim,
            input_scaling: 1.0,
            forget_bias: 1.0,
            seed: 42,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_input_scaling(mut self, scaling: f64) -> Self {
        self.input_scaling = scaling;
        self
    }

    pub fn with_forget_bias(mut self, bias: f64) -> Self {
        self.forget_bias = bias;
        self
    }
}
