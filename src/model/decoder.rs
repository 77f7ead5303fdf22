//! Decoder network adapter

use super::layers::SoftmaxLayer;
use super::lstm::{LstmCell, RecurrentState};
use crate::error::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// One autoregressive decoding step
pub trait DecoderStep {
    /// Consumes a one-hot token over the target alphabet and the current
    /// state; returns a distribution over the target alphabet and the next
    /// state.
    fn step(&self, token: ArrayView1<f64>, state: &RecurrentState) -> Result<(Array1<f64>, RecurrentState)>;
}

impl<D: DecoderStep + ?Sized> DecoderStep for &D {
    fn step(&self, token: ArrayView1<f64>, state: &RecurrentState) -> Result<(Array1<f64>, RecurrentState)> {
        (**self).step(token, state)
    }
}

/// LSTM decoder with a softmax readout over the target alphabet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmDecoder {
    cell: LstmCell,
    readout: SoftmaxLayer,
}

impl LstmDecoder {
    pub fn new(cell: LstmCell, readout: SoftmaxLayer) -> Result<Self> {
        if readout.input_size() != cell.hidden_size {
            return Err(Error::shape(
                format!("readout input {}", cell.hidden_size),
                format!("readout input {}", readout.input_size()),
            ));
        }
        Ok(Self { cell, readout })
    }

    pub fn target_size(&self) -> usize {
        self.cell.input_size
    }

    pub fn latent_dim(&self) -> usize {
        self.cell.hidden_size
    }

    pub fn readout(&self) -> &SoftmaxLayer {
        &self.readout
    }

    pub fn readout_mut(&mut self) -> &mut SoftmaxLayer {
        &mut self.readout
    }

    fn check_state(&self, state: &RecurrentState) -> Result<()> {
        match state.width() {
            Some(w) if w == self.cell.hidden_size => Ok(()),
            other => Err(Error::DecoderStepFailure(format!(
                "state width {:?} does not match latent dim {}",
                other, self.cell.hidden_size
            ))),
        }
    }

    /// Hidden vectors for every timestep of a teacher-forced input,
    /// `[timesteps, latent_dim]`.
    pub fn hidden_sequence(&self, inputs: ArrayView2<f64>, initial: &RecurrentState) -> Result<Array2<f64>> {
        if inputs.ncols() != self.target_size() {
            return Err(Error::DecoderStepFailure(format!(
                "input width {} does not match target alphabet {}",
                inputs.ncols(),
                self.target_size()
            )));
        }
        self.check_state(initial)?;

        let mut hidden = Array2::zeros((inputs.nrows(), self.latent_dim()));
        let mut state = initial.clone();
        for (t, x) in inputs.axis_iter(Axis(0)).enumerate() {
            state = self.cell.forward(x, &state);
            hidden.row_mut(t).assign(&state.hidden);
        }
        Ok(hidden)
    }

    /// Runs the whole teacher-forced decoder input at once.
    ///
    /// Row `t` of the result is the predicted distribution for the character
    /// at `t + 1` of the framed target.
    pub fn forward_sequence(&self, inputs: ArrayView2<f64>, initial: &RecurrentState) -> Result<Array2<f64>> {
        let hidden = self.hidden_sequence(inputs, initial)?;
        Ok(self.readout.forward_batch(hidden.view()))
    }
}

impl DecoderStep for LstmDecoder {
    fn step(&self, token: ArrayView1<f64>, state: &RecurrentState) -> Result<(Array1<f64>, RecurrentState)> {
        if token.len() != self.target_size() {
            return Err(Error::DecoderStepFailure(format!(
                "token width {} does not match target alphabet {}",
                token.len(),
                self.target_size()
            )));
        }
        self.check_state(state)?;

        let next = self.cell.forward(token, state);
        let distribution = self.readout.forward(next.hidden.view());
        Ok((distribution, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::one_hot;
    use rand::{rngs::StdRng, SeedableRng};

    fn decoder() -> LstmDecoder {
        let mut rng = StdRng::seed_from_u64(11);
        let cell = LstmCell::new(5, 8, 1.0, 1.0, &mut rng);
        let readout = SoftmaxLayer::new(8, 5, &mut rng);
        LstmDecoder::new(cell, readout).unwrap()
    }

    #[test]
    fn test_step_returns_distribution() {
        let dec = decoder();
        let (p, state) = dec.step(one_hot(0, 5).view(), &RecurrentState::zeros(8)).unwrap();
        assert_eq!(p.len(), 5);
        assert!((p.sum() - 1.0).abs() < 1e-9);
        assert!(p.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert_eq!(state.width(), Some(8));
    }

    #[test]
    fn test_sequence_matches_stepping() {
        let dec = decoder();
        let inputs = Array2::from_shape_fn((4, 5), |(t, c)| if c == (t * 2) % 5 { 1.0 } else { 0.0 });
        let batch = dec.forward_sequence(inputs.view(), &RecurrentState::zeros(8)).unwrap();

        let mut state = RecurrentState::zeros(8);
        for t in 0..4 {
            let (p, next) = dec.step(inputs.row(t), &state).unwrap();
            for (a, b) in p.iter().zip(batch.row(t).iter()) {
                assert!((a - b).abs() < 1e-12);
            }
            state = next;
        }
    }

    #[test]
    fn test_bad_state_fails_step() {
        let err = decoder().step(one_hot(0, 5).view(), &RecurrentState::zeros(3)).unwrap_err();
        assert!(matches!(err, Error::DecoderStepFailure(_)));
    }

    #[test]
    fn test_bad_token_fails_step() {
        let err = decoder().step(one_hot(0, 4).view(), &RecurrentState::zeros(8)).unwrap_err();
        assert!(matches!(err, Error::DecoderStepFailure(_)));
    }
}
