//! One-hot tensor encoding of character sequences

use super::vocab::{frame_target, Alphabet, Role, Vocabulary, PAD_SYMBOL};
use crate::data::SentencePair;
use crate::error::{Error, Result};
use ndarray::{s, Array1, Array2, Array3, ArrayViewMut2};

/// One-hot vector of `width` with a 1.0 at `index`
pub fn one_hot(index: usize, width: usize) -> Array1<f64> {
    let mut v = Array1::zeros(width);
    if index < width {
        v[index] = 1.0;
    }
    v
}

/// Encodes sequences of one role into `[batch, max_len, alphabet]` tensors.
///
/// Every timestep row carries exactly one 1.0: the character's index while
/// the sequence lasts, the pad index afterwards.
#[derive(Debug, Clone, Copy)]
pub struct TensorEncoder<'a> {
    alphabet: &'a Alphabet,
    max_len: usize,
    pad_index: usize,
}

impl<'a> TensorEncoder<'a> {
    pub fn new(alphabet: &'a Alphabet, max_len: usize, pad_index: usize) -> Result<Self> {
        if pad_index >= alphabet.len() {
            return Err(Error::InvalidParameter(format!(
                "pad index {} outside alphabet of size {}",
                pad_index,
                alphabet.len()
            )));
        }
        Ok(Self {
            alphabet,
            max_len,
            pad_index,
        })
    }

    /// Encoder configured with the alphabet, budget and pad slot of `role`
    pub fn for_role(vocab: &'a Vocabulary, role: Role) -> Self {
        Self {
            alphabet: vocab.alphabet(role),
            max_len: vocab.max_len(role),
            pad_index: vocab.pad_index(role),
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn width(&self) -> usize {
        self.alphabet.len()
    }

    /// Encodes a batch of sequences
    pub fn encode<S: AsRef<str>>(&self, sequences: &[S]) -> Result<Array3<f64>> {
        let mut tensor = Array3::zeros((sequences.len(), self.max_len, self.width()));
        for (i, seq) in sequences.iter().enumerate() {
            self.write_row(seq.as_ref(), 0, tensor.slice_mut(s![i, .., ..]))?;
        }
        Ok(tensor)
    }

    /// Encodes one sequence as a `[max_len, alphabet]` matrix
    pub fn encode_one(&self, sequence: &str) -> Result<Array2<f64>> {
        let mut matrix = Array2::zeros((self.max_len, self.width()));
        self.write_row(sequence, 0, matrix.view_mut())?;
        Ok(matrix)
    }

    /// Writes `sequence[skip..]` into `out`, padding the remaining timesteps
    fn write_row(&self, sequence: &str, skip: usize, mut out: ArrayViewMut2<f64>) -> Result<()> {
        let length = sequence.chars().count();
        if length > self.max_len {
            return Err(Error::SequenceTooLong {
                length,
                max: self.max_len,
            });
        }

        let mut t = 0;
        for (position, c) in sequence.chars().enumerate().skip(skip) {
            // The reserved pad slot is never a character of the text itself
            if c == PAD_SYMBOL {
                return Err(Error::UnknownCharacter {
                    character: c,
                    position,
                });
            }
            out[[t, self.alphabet.try_index(c, position)?]] = 1.0;
            t += 1;
        }
        for t in t..self.max_len {
            out[[t, self.pad_index]] = 1.0;
        }
        Ok(())
    }
}

/// Encoder input, decoder input and decoder target for teacher forcing
#[derive(Debug, Clone)]
pub struct TrainingTensors {
    /// `[batch, max_source_len, source_alphabet]`
    pub encoder_input: Array3<f64>,
    /// Framed targets, `[batch, max_target_len, target_alphabet]`
    pub decoder_input: Array3<f64>,
    /// Framed targets shifted left by one timestep, padded at the end
    pub decoder_target: Array3<f64>,
}

impl TrainingTensors {
    pub fn batch_size(&self) -> usize {
        self.encoder_input.shape()[0]
    }
}

/// Builds the teacher-forced tensors for a set of sentence pairs.
///
/// Decoder-target timestep `t` holds the framed target character at `t + 1`,
/// so the decoder learns to predict the next character rather than echo its
/// current input.
pub fn teacher_forcing(vocab: &Vocabulary, pairs: &[SentencePair]) -> Result<TrainingTensors> {
    let source = TensorEncoder::for_role(vocab, Role::Source);
    let target = TensorEncoder::for_role(vocab, Role::Target);

    let framed: Vec<String> = pairs.iter().map(|p| frame_target(&p.target)).collect();
    let encoder_input = source.encode(&pairs.iter().map(|p| p.source.as_str()).collect::<Vec<_>>())?;
    let decoder_input = target.encode(&framed)?;

    let mut decoder_target = Array3::zeros(decoder_input.raw_dim());
    for (i, seq) in framed.iter().enumerate() {
        target.write_row(seq, 1, decoder_target.slice_mut(s![i, .., ..]))?;
    }

    Ok(TrainingTensors {
        encoder_input,
        decoder_input,
        decoder_target,
    })
}
