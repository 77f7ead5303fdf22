//! Metrics for next-character prediction and decoded translations

use crate::inference::select_next_token;
use ndarray::{ArrayView2, Axis};

const EPS: f64 = 1e-12;

/// Mean categorical cross-entropy over rows of `[timesteps, classes]`
pub fn cross_entropy(probs: ArrayView2<f64>, targets: ArrayView2<f64>) -> f64 {
    let rows = probs.nrows();
    if rows == 0 {
        return 0.0;
    }
    let total: f64 = probs
        .iter()
        .zip(targets.iter())
        .filter(|(_, t)| **t > 0.0)
        .map(|(&p, &t)| -t * (p.max(EPS)).ln())
        .sum();
    total / rows as f64
}

/// Share of rows whose most probable class is the target index.
///
/// `targets` holds one class per row of `probs`; callers pass only real
/// positions, since under space padding a pad row and a real space share an
/// index.
pub fn next_char_accuracy(probs: ArrayView2<f64>, targets: &[usize]) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }
    let correct = probs
        .axis_iter(Axis(0))
        .zip(targets)
        .filter(|(p, &t)| select_next_token(p.view()) == Some(t))
        .count();
    correct as f64 / targets.len() as f64
}

/// Share of hypotheses identical to their reference
pub fn exact_match<R: AsRef<str>, H: AsRef<str>>(references: &[R], hypotheses: &[H]) -> f64 {
    let n = references.len().min(hypotheses.len());
    if n == 0 {
        return 0.0;
    }
    let hits = references
        .iter()
        .zip(hypotheses)
        .filter(|&(r, h)| <str as PartialEq>::eq(r.as_ref(), h.as_ref()))
        .count();
    hits as f64 / n as f64
}

/// Levenshtein distance over characters
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Character error rate: edit distance normalised by reference length
pub fn character_error_rate(reference: &str, hypothesis: &str) -> f64 {
    let len = reference.chars().count();
    if len == 0 {
        return if hypothesis.is_empty() { 0.0 } else { 1.0 };
    }
    edit_distance(reference, hypothesis) as f64 / len as f64
}
