//! Bounded snapshot history for undo/redo.

use std::collections::VecDeque;

/// One undo step per recorded checkpoint. The oldest steps are discarded once
/// `limit` is reached.
#[derive(Debug, Clone)]
pub struct History<T> {
    undo: VecDeque<T>,
    redo: Vec<T>,
    limit: usize,
}

impl<T> History<T> {
    pub fn new(limit: usize) -> Self {
        Self { undo: VecDeque::new(), redo: Vec::new(), limit }
    }

    /// Record `state` as the state to return to on the next undo.
    /// Any redo steps are invalidated.
    pub fn record(&mut self, state: T) {
        self.redo.clear();
        if self.limit == 0 {
            return;
        }
        if self.undo.len() == self.limit {
            self.undo.pop_front();
        }
        self.undo.push_back(state);
    }

    /// Swap `current` for the last recorded state.
    pub fn undo(&mut self, current: T) -> Result<T, T> {
        match self.undo.pop_back() {
            Some(previous) => {
                self.redo.push(current);
                Ok(previous)
            }
            None => Err(current),
        }
    }

    /// Swap `current` for the last undone state.
    pub fn redo(&mut self, current: T) -> Result<T, T> {
        match self.redo.pop() {
            Some(next) => {
                self.undo.push_back(current);
                Ok(next)
            }
            None => Err(current),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo_cycle() {
        let mut history = History::new(10);
        history.record(1);
        history.record(2);
        assert_eq!(history.undo(3), Ok(2));
        assert_eq!(history.undo(2), Ok(1));
        assert_eq!(history.undo(1), Err(1));
        assert_eq!(history.redo(1), Ok(2));
        assert_eq!(history.redo(2), Ok(3));
        assert_eq!(history.redo(3), Err(3));
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = History::new(10);
        history.record("a");
        assert_eq!(history.undo("b"), Ok("a"));
        assert!(history.can_redo());
        history.record("a");
        assert!(!history.can_redo());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::new(2);
        history.record(1);
        history.record(2);
        history.record(3);
        assert_eq!(history.undo(4), Ok(3));
        assert_eq!(history.undo(3), Ok(2));
        assert_eq!(history.undo(2), Err(2));
    }
}
