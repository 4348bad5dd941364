//! # History Manager
//!
//! Linear undo/redo over whole-document snapshots.
//!
//! The manager owns the current value plus two bounded stacks of earlier and
//! undone values. Snapshots are never mutated, only moved between the stacks,
//! and any commit after an undo discards the redo stack (no branching timeline).

use std::collections::VecDeque;

/// Default number of undo steps kept.
pub const DEFAULT_HISTORY_DEPTH: usize = 50;

#[derive(Debug, Clone)]
pub struct History<T> {
    current: T,
    past: VecDeque<T>,
    future: Vec<T>,
    max_depth: usize,
}

impl<T: Clone> History<T> {
    pub fn new(initial: T) -> Self {
        Self::with_depth(initial, DEFAULT_HISTORY_DEPTH)
    }

    /// A history keeping at most `max_depth` undo steps (at least one).
    pub fn with_depth(initial: T, max_depth: usize) -> Self {
        Self {
            current: initial,
            past: VecDeque::new(),
            future: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    pub fn current(&self) -> &T {
        &self.current
    }

    /// Record a user edit: the old value becomes undoable, redo is discarded.
    pub fn commit(&mut self, next: T) {
        let previous = std::mem::replace(&mut self.current, next);
        if self.past.len() >= self.max_depth {
            self.past.pop_front();
        }
        self.past.push_back(previous);
        self.future.clear();
    }

    /// Swap the current value without touching either stack.
    pub fn replace_without_history(&mut self, next: T) {
        self.current = next;
    }

    /// Swap the current value and forget all history (new/loaded project).
    pub fn reset(&mut self, next: T) {
        self.current = next;
        self.past.clear();
        self.future.clear();
    }

    /// Step back one edit. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.past.pop_back() else {
            return false;
        };
        let undone = std::mem::replace(&mut self.current, previous);
        self.future.push(undone);
        log::trace!(target: "history", "undo ({} left)", self.past.len());
        true
    }

    /// Re-apply the last undone edit. Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.future.pop() else {
            return false;
        };
        let previous = std::mem::replace(&mut self.current, next);
        if self.past.len() >= self.max_depth {
            self.past.pop_front();
        }
        self.past.push_back(previous);
        log::trace!(target: "history", "redo ({} left)", self.future.len());
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }
}
