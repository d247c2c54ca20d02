use std::collections::VecDeque;

/// A control command issued while the remote connection was not ready.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PendingAction {
    SetPlaying(bool),
    SkipNext,
    SkipPrevious,
    /// Fraction of the track duration, in `0.0..=1.0`.
    Seek(f64),
}

/// FIFO queue of [`PendingAction`]s.
///
/// Actions are neither coalesced nor deduplicated: two contradictory
/// `SetPlaying` entries are both kept and both replayed, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingActions {
    queue: VecDeque<PendingAction>,
}

impl PendingActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: PendingAction) {
        self.queue.push_back(action);
    }

    /// Removes and returns every queued action, oldest first.
    pub fn drain(&mut self) -> Vec<PendingAction> {
        self.queue.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingAction> {
        self.queue.iter()
    }

    pub fn to_vec(&self) -> Vec<PendingAction> {
        self.queue.iter().copied().collect()
    }
}
