//! Cache cells: memoized slots for derived properties.
//!
//! Every derived property of a semantic wrapper is stored in a [`CacheCell`].
//! A cell is a tri-state slot (`Empty | InProgress | Done`). Reading a cell
//! that is `InProgress` means the computation asked for its own result: a
//! cycle. The caller supplies an `on_cycle` fallback for those slots where a
//! cycle is a property of the input (inheritance and `Extends` chains), and
//! the fallback value becomes the cached value of the re-entered slot.
//!
//! Cells are single-threaded (`RefCell`); they are never borrowed across a
//! call to `compute`, so computations may freely read other cells.

use std::cell::RefCell;
use std::fmt;

enum CacheState<T> {
    Empty,
    InProgress,
    Done(T),
}

enum Entry<T> {
    Cached(T),
    Reentered,
    Started,
}

/// A lazily-initialized, memoized value slot.
pub struct CacheCell<T> {
    state: RefCell<CacheState<T>>,
}

impl<T> CacheCell<T> {
    pub const fn new() -> Self {
        Self {
            state: RefCell::new(CacheState::Empty),
        }
    }

    /// Whether a value (computed or cycle sentinel) has been stored.
    pub fn is_computed(&self) -> bool {
        matches!(*self.state.borrow(), CacheState::Done(_))
    }
}

impl<T: Clone> CacheCell<T> {
    /// Return the cached value, computing it on first access.
    ///
    /// If `compute` (directly or transitively) reads this same cell, the
    /// inner read gets `on_cycle()` instead of recursing, and that sentinel
    /// is what every later read observes, including the outer call.
    pub fn get_or_compute<F, C>(&self, compute: F, on_cycle: C) -> T
    where
        F: FnOnce() -> T,
        C: FnOnce() -> T,
    {
        match self.enter() {
            Entry::Cached(value) => value,
            Entry::Reentered => {
                let sentinel = on_cycle();
                *self.state.borrow_mut() = CacheState::Done(sentinel.clone());
                sentinel
            }
            Entry::Started => {
                let value = compute();
                self.finish(value)
            }
        }
    }

    /// Like [`get_or_compute`](Self::get_or_compute) for slots that can never
    /// be part of a cycle.
    ///
    /// # Panics
    ///
    /// Panics on reentrant access; that is a bug in the caller.
    pub fn get_or_init<F>(&self, compute: F) -> T
    where
        F: FnOnce() -> T,
    {
        self.get_or_compute(compute, || {
            panic!("cache cell re-entered while computing and no cycle fallback was given")
        })
    }

    /// Peek at the cached value without computing it.
    pub fn get(&self) -> Option<T> {
        match &*self.state.borrow() {
            CacheState::Done(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn enter(&self) -> Entry<T> {
        let mut state = self.state.borrow_mut();
        if let CacheState::Done(value) = &*state {
            return Entry::Cached(value.clone());
        }
        if matches!(*state, CacheState::InProgress) {
            return Entry::Reentered;
        }
        *state = CacheState::InProgress;
        Entry::Started
    }

    fn finish(&self, value: T) -> T {
        let mut state = self.state.borrow_mut();
        // A re-entrant read already stored the cycle sentinel; it wins.
        if let CacheState::Done(existing) = &*state {
            return existing.clone();
        }
        *state = CacheState::Done(value.clone());
        value
    }
}

impl<T> Default for CacheCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Cached values may point back at their owner; never print them.
impl<T> fmt::Debug for CacheCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.borrow() {
            CacheState::Empty => "empty",
            CacheState::InProgress => "in progress",
            CacheState::Done(_) => "computed",
        };
        write!(f, "CacheCell(<{}>)", state)
    }
}
