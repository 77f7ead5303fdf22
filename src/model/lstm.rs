//! LSTM cell and recurrent state

use ndarray::{Array1, Array2, ArrayView1};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Hidden/cell vector pair threaded through a recurrent computation.
///
/// Only the `model` module looks inside; everything else treats it as an
/// opaque token handed from the encoder to the decoder and from one decoder
/// step to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrentState {
    pub(super) hidden: Array1<f64>,
    pub(super) cell: Array1<f64>,
}

impl RecurrentState {
    /// All-zero state of the given latent width
    pub fn zeros(width: usize) -> Self {
        Self {
            hidden: Array1::zeros(width),
            cell: Array1::zeros(width),
        }
    }

    /// Latent width, or `None` if hidden and cell disagree
    pub fn width(&self) -> Option<usize> {
        (self.hidden.len() == self.cell.len()).then_some(self.hidden.len())
    }
}

/// Single LSTM layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmCell {
    pub input_size: usize,
    pub hidden_size: usize,

    // Input gate
    w_ii: Array2<f64>,
    w_hi: Array2<f64>,
    b_i: Array1<f64>,

    // Forget gate
    w_if: Array2<f64>,
    w_hf: Array2<f64>,
    b_f: Array1<f64>,

    // Cell candidate
    w_ig: Array2<f64>,
    w_hg: Array2<f64>,
    b_g: Array1<f64>,

    // Output gate
    w_io: Array2<f64>,
    w_ho: Array2<f64>,
    b_o: Array1<f64>,
}

impl LstmCell {
    /// Creates a cell with weights drawn uniformly from `±sqrt(1 / hidden_size)`
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        input_scaling: f64,
        forget_bias: f64,
        rng: &mut StdRng,
    ) -> Self {
        let limit = (1.0 / hidden_size.max(1) as f64).sqrt();
        let dist = Uniform::new_inclusive(-limit, limit);
        let input_weights =
            |rng: &mut StdRng| Array2::random_using((hidden_size, input_size), dist, rng) * input_scaling;
        let recurrent_weights =
            |rng: &mut StdRng| Array2::random_using((hidden_size, hidden_size), dist, rng);

        Self {
            input_size,
            hidden_size,
            w_ii: input_weights(rng),
            w_hi: recurrent_weights(rng),
            b_i: Array1::zeros(hidden_size),
            w_if: input_weights(rng),
            w_hf: recurrent_weights(rng),
            b_f: Array1::from_elem(hidden_size, forget_bias),
            w_ig: input_weights(rng),
            w_hg: recurrent_weights(rng),
            b_g: Array1::zeros(hidden_size),
            w_io: input_weights(rng),
            w_ho: recurrent_weights(rng),
            b_o: Array1::zeros(hidden_size),
        }
    }

    /// One timestep. Callers are responsible for matching dimensions.
    pub fn forward(&self, x: ArrayView1<f64>, state: &RecurrentState) -> RecurrentState {
        let h = &state.hidden;

        // i = σ(W_ii x + W_hi h + b_i)
        let i_gate = sigmoid(self.w_ii.dot(&x) + self.w_hi.dot(h) + &self.b_i);
        // f = σ(W_if x + W_hf h + b_f)
        let f_gate = sigmoid(self.w_if.dot(&x) + self.w_hf.dot(h) + &self.b_f);
        // g = tanh(W_ig x + W_hg h + b_g)
        let g = (self.w_ig.dot(&x) + self.w_hg.dot(h) + &self.b_g).mapv(f64::tanh);
        // o = σ(W_io x + W_ho h + b_o)
        let o_gate = sigmoid(self.w_io.dot(&x) + self.w_ho.dot(h) + &self.b_o);

        let cell = f_gate * &state.cell + i_gate * g;
        let hidden = o_gate * cell.mapv(f64::tanh);

        RecurrentState { hidden, cell }
    }

    pub fn init_state(&self) -> RecurrentState {
        RecurrentState::zeros(self.hidden_size)
    }
}

fn sigmoid(x: Array1<f64>) -> Array1<f64> {
    x.mapv_into(|v| 1.0 / (1.0 + (-v).exp()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_cell_shapes() {
        let mut rng = StdRng::seed_from_u64(1);
        let cell = LstmCell::new(5, 10, 1.0, 1.0, &mut rng);
        let x = Array1::<f64>::zeros(5);

        let next = cell.forward(x.view(), &cell.init_state());

        assert_eq!(next.width(), Some(10));
    }

    #[test]
    fn test_hidden_is_bounded() {
        let mut rng = StdRng::seed_from_u64(2);
        let cell = LstmCell::new(3, 8, 1.0, 1.0, &mut rng);
        let x = Array1::from_vec(vec![1.0, 0.0, 0.0]);
        let mut state = cell.init_state();
        for _ in 0..20 {
            state = cell.forward(x.view(), &state);
        }
        assert!(state.hidden.iter().all(|h| h.abs() < 1.0));
    }

    #[test]
    fn test_same_seed_same_weights() {
        let a = LstmCell::new(3, 4, 1.0, 1.0, &mut StdRng::seed_from_u64(9));
        let b = LstmCell::new(3, 4, 1.0, 1.0, &mut StdRng::seed_from_u64(9));
        let x = Array1::from_vec(vec![0.0, 1.0, 0.0]);
        assert_eq!(a.forward(x.view(), &a.init_state()), b.forward(x.view(), &b.init_state()));
    }
}
