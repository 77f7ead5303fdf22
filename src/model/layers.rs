//! Dense softmax readout

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Fully connected layer followed by softmax: `p = softmax(W h + b)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxLayer {
    /// `[output_size, input_size]`
    pub weights: Array2<f64>,
    /// `[output_size]`
    pub biases: Array1<f64>,
}

impl SoftmaxLayer {
    /// Xavier-uniform weights, zero biases
    pub fn new(input_size: usize, output_size: usize, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (input_size + output_size).max(1) as f64).sqrt();
        Self {
            weights: Array2::random_using((output_size, input_size), Uniform::new_inclusive(-limit, limit), rng),
            biases: Array1::zeros(output_size),
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.ncols()
    }

    pub fn output_size(&self) -> usize {
        self.weights.nrows()
    }

    /// Probability distribution for one hidden vector
    pub fn forward(&self, h: ArrayView1<f64>) -> Array1<f64> {
        softmax(self.weights.dot(&h) + &self.biases)
    }

    /// Row-wise distributions for `[timesteps, input_size]` hidden states
    pub fn forward_batch(&self, h: ArrayView2<f64>) -> Array2<f64> {
        let mut logits = h.dot(&self.weights.t()) + &self.biases;
        for mut row in logits.axis_iter_mut(Axis(0)) {
            let probs = softmax(row.to_owned());
            row.assign(&probs);
        }
        logits
    }

    /// Gradient-descent step: `W -= lr * dW`, `b -= lr * db`
    pub fn apply_gradients(&mut self, d_weights: &Array2<f64>, d_biases: &Array1<f64>, learning_rate: f64) {
        self.weights.scaled_add(-learning_rate, d_weights);
        self.biases.scaled_add(-learning_rate, d_biases);
    }
}

/// Numerically stable softmax
pub fn softmax(logits: Array1<f64>) -> Array1<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp = logits.mapv_into(|x| (x - max).exp());
    let sum = exp.sum();
    exp / sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_softmax_is_distribution() {
        let p = softmax(Array1::from_vec(vec![10.0, 0.0, -3.0]));
        assert!((p.sum() - 1.0).abs() < 1e-12);
        assert!(p.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!(p[0] > p[1] && p[1] > p[2]);
    }

    #[test]
    fn test_softmax_large_logits_stay_finite() {
        let p = softmax(Array1::from_vec(vec![1000.0, 0.0, -3.0]));
        assert!((p.sum() - 1.0).abs() < 1e-12);
        assert!(p.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert_eq!(p[0], 1.0);
    }

    #[test]
    fn test_batch_matches_single() {
        let layer = SoftmaxLayer::new(4, 6, &mut StdRng::seed_from_u64(3));
        let h = Array2::from_shape_fn((3, 4), |(i, j)| (i as f64 - j as f64) * 0.1);
        let batch = layer.forward_batch(h.view());
        for t in 0..3 {
            let single = layer.forward(h.row(t));
            for (a, b) in single.iter().zip(batch.row(t).iter()) {
                assert!((a - b).abs() < 1e-12);
            }
        }
    }
}
