//! Snapshot undo/redo history.
//!
//! Every undoable edit pushes a full copy of the state it is about to change.
//! The past is bounded: once `capacity` snapshots are held, the oldest is
//! dropped. Any new commit clears the redo side.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct History<State> {
    past: VecDeque<State>,
    future: Vec<State>,
    capacity: usize,
}

impl<State> History<State> {
    pub fn new(capacity: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn has_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn has_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of retained undo snapshots
    pub fn depth(&self) -> usize {
        self.past.len()
    }

    /// Record the state as it was before an edit
    pub fn commit(&mut self, before: State) {
        self.past.push_back(before);
        while self.past.len() > self.capacity {
            self.past.pop_front();
        }
        self.future.clear();
    }

    /// Step back. `current` moves to the redo side; the previous state is returned.
    pub fn undo(&mut self, current: State) -> Result<State, State> {
        match self.past.pop_back() {
            Some(previous) => {
                self.future.push(current);
                Ok(previous)
            }
            None => Err(current),
        }
    }

    /// Step forward again. `current` moves back to the undo side.
    pub fn redo(&mut self, current: State) -> Result<State, State> {
        match self.future.pop() {
            Some(next) => {
                self.past.push_back(current);
                Ok(next)
            }
            None => Err(current),
        }
    }
}

/// Holds the pre-edit snapshot of a continuous control gesture (a knob drag)
/// until the control has been quiet for `quiet`.
#[derive(Debug, Clone)]
pub struct Settle<State> {
    pending: Option<State>,
    last_change: Option<Instant>,
    quiet: Duration,
}

impl<State> Settle<State> {
    pub fn new(quiet: Duration) -> Self {
        Self {
            pending: None,
            last_change: None,
            quiet,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Note a change at `now`. The snapshot is taken only on the first change
    /// of a gesture.
    pub fn touch(&mut self, now: Instant, snapshot: impl FnOnce() -> State) {
        if self.pending.is_none() {
            self.pending = Some(snapshot());
        }
        self.last_change = Some(now);
    }

    /// Hand out the snapshot once the gesture has gone quiet
    pub fn poll(&mut self, now: Instant) -> Option<State> {
        let last = self.last_change?;
        if now.saturating_duration_since(last) >= self.quiet {
            self.take()
        } else {
            None
        }
    }

    /// Hand out the snapshot regardless of timing
    pub fn take(&mut self) -> Option<State> {
        self.last_change = None;
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_undo_and_redo() {
        let mut history = History::new(10);
        let mut state = 0;

        for next in [5, 6, 9] {
            history.commit(state);
            state = next;
        }
        assert!(history.has_undo());
        assert!(!history.has_redo());

        state = history.redo(state).unwrap_err();
        assert_eq!(state, 9);

        state = history.undo(state).unwrap();
        assert_eq!(state, 6);
        assert!(history.has_redo());

        state = history.redo(state).unwrap();
        assert_eq!(state, 9);

        state = history.undo(state).unwrap();
        state = history.undo(state).unwrap();
        state = history.undo(state).unwrap();
        assert_eq!(state, 0);
        state = history.undo(state).unwrap_err();
        assert_eq!(state, 0);

        state = history.redo(state).unwrap();
        assert_eq!(state, 5);

        history.commit(state);
        assert!(!history.has_redo());
    }

    #[test]
    fn capacity_drops_oldest() {
        let mut history = History::new(100);
        let mut state = 0;
        for next in 1..=150 {
            history.commit(state);
            state = next;
        }
        assert_eq!(history.depth(), 100);

        while let Ok(previous) = history.undo(state) {
            state = previous;
        }
        // 0..=49 were evicted
        assert_eq!(state, 50);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut history = History::new(0);
        history.commit(1);
        history.commit(2);
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.undo(3), Ok(2));
        assert_eq!(history.undo(2), Err(2));
    }

    #[test]
    fn settle_waits_for_quiet() {
        let start = Instant::now();
        let ms = Duration::from_millis;
        let mut settle = Settle::new(ms(250));

        settle.touch(start, || "before");
        settle.touch(start + ms(100), || "during");
        assert!(settle.is_pending());
        assert_eq!(settle.poll(start + ms(300)), None);
        assert_eq!(settle.poll(start + ms(350)), Some("before"));
        assert!(!settle.is_pending());
        assert_eq!(settle.poll(start + ms(1000)), None);
    }

    #[test]
    fn settle_take_flushes_early() {
        let mut settle = Settle::new(Duration::from_secs(10));
        settle.touch(Instant::now(), || 1);
        assert_eq!(settle.take(), Some(1));
        assert_eq!(settle.take(), None);
    }
}
