//! Encoder network adapter

use super::lstm::{LstmCell, RecurrentState};
use crate::error::{Error, Result};
use ndarray::{ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Turns one encoded source sequence into the decoder's initial state
pub trait ContextEncoder {
    /// Runs the `[timesteps, source_alphabet]` input through the recurrent
    /// layer and returns only the final state.
    fn encode_context(&self, input: ArrayView2<f64>) -> Result<RecurrentState>;
}

/// LSTM encoder. The per-timestep outputs are discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmEncoder {
    cell: LstmCell,
}

impl LstmEncoder {
    pub fn new(cell: LstmCell) -> Self {
        Self { cell }
    }

    pub fn input_size(&self) -> usize {
        self.cell.input_size
    }

    pub fn latent_dim(&self) -> usize {
        self.cell.hidden_size
    }
}

impl ContextEncoder for LstmEncoder {
    fn encode_context(&self, input: ArrayView2<f64>) -> Result<RecurrentState> {
        if input.ncols() != self.cell.input_size {
            return Err(Error::shape(
                format!("[_, {}]", self.cell.input_size),
                format!("{:?}", input.shape()),
            ));
        }

        let mut state = self.cell.init_state();
        for x in input.axis_iter(Axis(0)) {
            state = self.cell.forward(x, &state);
        }
        Ok(state)
    }
}
