//! Greedy autoregressive decoding
//!
//! The loop starts from the encoder's context and the START token and
//! repeatedly feeds the decoder its own previous choice:
//!
//! ```text
//! RUNNING --(next == END or len > max_target_len)--> DONE
//! ```
//!
//! The length bound is a correctness safety net for models that never emit
//! END (an undertrained model routinely does this). It is not a latency
//! control.

use crate::error::{Error, Result};
use crate::model::{DecoderStep, RecurrentState};
use crate::preprocessing::one_hot;
use ndarray::ArrayView1;
use tracing::{debug, warn};

/// Index of the most probable entry.
///
/// Ties go to the lowest index and NaN never wins, so decoding is
/// reproducible for a fixed model and input. Returns `None` for an empty or
/// all-NaN distribution.
pub fn select_next_token(distribution: ArrayView1<f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &p) in distribution.iter().enumerate() {
        if p.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if p <= b => {}
            _ => best = Some((i, p)),
        }
    }
    best.map(|(i, _)| i)
}

/// Decoding loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    Running,
    Done,
}

/// Why a finished decoding stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The decoder emitted END; it is the last output token
    EndMarker,
    /// The length bound was hit without END. Treat the output as lower confidence.
    LengthBound,
}

/// Tokens produced by a finished decoding session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOutcome {
    pub tokens: Vec<usize>,
    pub termination: Termination,
}

impl DecodeOutcome {
    pub fn terminated_cleanly(&self) -> bool {
        self.termination == Termination::EndMarker
    }
}

/// One decoding session: the state machine threading a [`RecurrentState`]
/// through successive decoder steps.
pub struct GreedyDecoder<D> {
    decoder: D,
    state: RecurrentState,
    current: usize,
    end_index: usize,
    target_size: usize,
    max_target_len: usize,
    output: Vec<usize>,
    status: DecodeStatus,
    termination: Option<Termination>,
}

impl<D: DecoderStep> GreedyDecoder<D> {
    /// Starts a session in `Running` with `current_token = START`.
    ///
    /// Both markers must index into the target alphabet.
    pub fn new(
        decoder: D,
        initial_state: RecurrentState,
        start_index: usize,
        end_index: usize,
        target_size: usize,
        max_target_len: usize,
    ) -> Result<Self> {
        if start_index >= target_size || end_index >= target_size {
            return Err(Error::InvalidParameter(format!(
                "marker indices {}/{} out of range for target alphabet {}",
                start_index, end_index, target_size
            )));
        }
        Ok(Self {
            decoder,
            state: initial_state,
            current: start_index,
            end_index,
            target_size,
            max_target_len,
            // The bound comes from callers and may be huge; grow on demand
            output: Vec::new(),
            status: DecodeStatus::Running,
            termination: None,
        })
    }

    pub fn status(&self) -> DecodeStatus {
        self.status
    }

    /// Tokens emitted so far
    pub fn output(&self) -> &[usize] {
        &self.output
    }

    /// Performs one transition. A no-op once `Done`.
    ///
    /// A decoder failure aborts the session: the error is returned and no
    /// retry is attempted, since the recurrent state cannot be recovered
    /// mid-sequence.
    pub fn advance(&mut self) -> Result<DecodeStatus> {
        if self.status == DecodeStatus::Done {
            return Ok(self.status);
        }

        let token = one_hot(self.current, self.target_size);
        let (distribution, state) = self.decoder.step(token.view(), &self.state)?;
        if distribution.len() != self.target_size {
            return Err(Error::DecoderStepFailure(format!(
                "distribution width {} does not match target alphabet {}",
                distribution.len(),
                self.target_size
            )));
        }
        let next = select_next_token(distribution.view()).ok_or_else(|| {
            Error::DecoderStepFailure("decoder returned an empty or NaN distribution".to_string())
        })?;

        self.state = state;
        self.output.push(next);
        self.current = next;
        debug!(step = self.output.len(), token = next, "decoded token");

        if next == self.end_index {
            self.finish(Termination::EndMarker);
        } else if self.output.len() > self.max_target_len {
            warn!(
                "Decoding hit the length bound of {} without emitting END",
                self.max_target_len
            );
            self.finish(Termination::LengthBound);
        }
        Ok(self.status)
    }

    fn finish(&mut self, termination: Termination) {
        self.status = DecodeStatus::Done;
        self.termination = Some(termination);
    }

    /// Drives the session to `Done`
    pub fn run(mut self) -> Result<DecodeOutcome> {
        while self.advance()? == DecodeStatus::Running {}
        Ok(DecodeOutcome {
            tokens: self.output,
            termination: self.termination.unwrap_or(Termination::LengthBound),
        })
    }
}
