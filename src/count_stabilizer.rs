//! Temporal debouncing of per-frame finger counts.
//!
//! Contour topology flickers from frame to frame, so a count is only
//! announced once the same reading has been seen for a run of consecutive
//! frames. The history lives in an explicit [`StabilizerState`] owned by the
//! caller.

use crate::constants::STABLE_RUN_LENGTH;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// What happens while a stable run keeps going past the required length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retrigger {
    /// Announce once when the run reaches the required length
    #[default]
    OncePerRun,
    /// Announce on every frame once the run is long enough
    EveryFrame,
}

/// Debounce history carried from frame to frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StabilizerState {
    window: VecDeque<u32>,
    run_length: usize,
}

impl StabilizerState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent readings, all identical, oldest first
    #[must_use]
    pub fn window(&self) -> &VecDeque<u32> {
        &self.window
    }

    /// How many consecutive frames the current reading has been seen
    #[must_use]
    pub const fn run_length(&self) -> usize {
        self.run_length
    }

    pub fn clear(&mut self) {
        self.window.clear();
        self.run_length = 0;
    }
}

/// Turns per-frame hand counts into announcements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountStabilizer {
    required_run: usize,
    retrigger: Retrigger,
}

impl Default for CountStabilizer {
    fn default() -> Self {
        Self::new(STABLE_RUN_LENGTH, Retrigger::default())
    }
}

impl CountStabilizer {
    /// A zero run length is treated as 1
    #[must_use]
    pub fn new(required_run: usize, retrigger: Retrigger) -> Self {
        Self {
            required_run: required_run.max(1),
            retrigger,
        }
    }

    #[must_use]
    pub const fn required_run(&self) -> usize {
        self.required_run
    }

    /// Feed one frame's finger counts, one entry per matched hand.
    ///
    /// A frame with no hands clears the history. Otherwise the reading is the
    /// single count, or the sum for several hands; a reading that differs
    /// from the history clears it first. Returns the text to announce, if any.
    pub fn update(&self, state: &mut StabilizerState, counts: &[u32]) -> Option<String> {
        let reading = match counts {
            [] => {
                state.clear();
                return None;
            }
            [single] => *single,
            many => many.iter().fold(0u32, |sum, &c| sum.saturating_add(c)),
        };

        if state.window.iter().any(|&previous| previous != reading) {
            state.clear();
        }
        state.window.push_back(reading);
        if state.window.len() > self.required_run {
            state.window.pop_front();
        }
        state.run_length = state.run_length.saturating_add(1);

        let due = match self.retrigger {
            Retrigger::OncePerRun => state.run_length == self.required_run,
            Retrigger::EveryFrame => state.run_length >= self.required_run,
        };
        due.then(|| announcement(counts, reading))
    }
}

/// `"3"` for one hand, `"2 plus 3 plus 1 equals 6"` for several
#[must_use]
pub fn announcement(counts: &[u32], total: u32) -> String {
    if counts.len() <= 1 {
        return total.to_string();
    }
    let terms: Vec<String> = counts.iter().map(ToString::to_string).collect();
    format!("{} equals {total}", terms.join(" plus "))
}
