#[cfg(test)]
#[path = "accumulator_test.rs"]
mod tests;

use crate::domain::models::CodePilotError;
use crate::domain::models::GenerationResult;
use crate::domain::models::SessionState;
use crate::domain::models::Settlement;

/// Per-session state machine folding a fragment sequence into one buffer.
///
/// Every session gets a generation number from `begin`. Fragments and
/// terminal signals carrying any other number belong to a superseded session
/// and are ignored.
pub struct StreamAccumulator {
    state: SessionState,
    buffer: String,
    generation: u64,
}

impl Default for StreamAccumulator {
    fn default() -> StreamAccumulator {
        return StreamAccumulator {
            state: SessionState::Idle,
            buffer: "".to_string(),
            generation: 0,
        };
    }
}

impl StreamAccumulator {
    pub fn state(&self) -> &SessionState {
        return &self.state;
    }

    pub fn buffer(&self) -> &str {
        return &self.buffer;
    }

    pub fn generation(&self) -> u64 {
        return self.generation;
    }

    pub fn is_active(&self) -> bool {
        return self.state.is_active();
    }

    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.buffer.clear();
    }

    /// Starts a new session, superseding any active one, and returns its
    /// generation number.
    pub fn begin(&mut self) -> u64 {
        self.reset();
        self.generation += 1;
        self.state = SessionState::Requesting;

        return self.generation;
    }

    /// Invalidates the active session without starting a new one.
    pub fn abandon(&mut self) {
        self.generation += 1;
        self.reset();
    }

    /// Appends a fragment. Returns false when the fragment was dropped.
    pub fn push(&mut self, generation: u64, fragment: &str) -> bool {
        if !self.accepts(generation) {
            return false;
        }

        self.state = SessionState::Streaming;
        self.buffer += fragment;

        return true;
    }

    /// Settles the session once its sequence has drained.
    pub fn finish(&mut self, generation: u64) -> Option<Settlement> {
        if !self.accepts(generation) {
            return None;
        }

        let settlement = if self.buffer.trim().is_empty() {
            Settlement::Empty
        } else {
            Settlement::Success(GenerationResult {
                code: self.buffer.to_string(),
            })
        };

        self.state = SessionState::Settled(settlement.clone());
        return Some(settlement);
    }

    /// Settles the session as failed, discarding whatever was buffered.
    pub fn fail(&mut self, generation: u64, err: CodePilotError) -> Option<Settlement> {
        if !self.accepts(generation) {
            return None;
        }

        self.buffer.clear();
        let settlement = Settlement::Error(err);
        self.state = SessionState::Settled(settlement.clone());

        return Some(settlement);
    }

    fn accepts(&self, generation: u64) -> bool {
        return generation == self.generation && self.state.is_active();
    }
}
