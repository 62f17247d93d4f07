//! Lazily built derived indices.
//!
//! The surface, the BSP tree and the nearest-neighbor index are derived from
//! the sample set and rebuilt on the first query after a mutation. Each one
//! lives in a [`LazyIndex`], a small state machine:
//!
//! ```text
//!   Dirty ──(first query)──► Building ──(ok)──► Ready
//!     ▲                          │
//!     │                        (err)
//!     └──────(mutation)──────────┴──────────────────┘
//! ```
//!
//! Building happens behind `&self`, so the cell uses interior mutability and
//! the owner is `!Sync`.

use std::cell::{Cell, OnceCell};

/// Build state of a derived index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// Not built, or invalidated by a mutation.
    Dirty,
    /// Currently being built.
    Building,
    /// Built and current.
    Ready,
}

/// A derived value built on first access.
#[derive(Debug)]
pub struct LazyIndex<T> {
    cell: OnceCell<T>,
    building: Cell<bool>,
}

impl<T> Default for LazyIndex<T> {
    fn default() -> Self {
        Self {
            cell: OnceCell::new(),
            building: Cell::new(false),
        }
    }
}

impl<T> LazyIndex<T> {
    /// Creates a dirty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index that is already built.
    pub fn ready(value: T) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(value);
        Self {
            cell,
            building: Cell::new(false),
        }
    }

    /// Current state.
    pub fn state(&self) -> IndexState {
        if self.building.get() {
            IndexState::Building
        } else if self.cell.get().is_some() {
            IndexState::Ready
        } else {
            IndexState::Dirty
        }
    }

    /// The built value, if ready.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Returns the value, building it first if needed.
    ///
    /// A failed build leaves the index dirty so the next access retries.
    ///
    /// # Panics
    ///
    /// Panics if `build` re-enters the same index.
    pub fn get_or_try_build<E, F>(&self, build: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(v) = self.cell.get() {
            return Ok(v);
        }
        assert!(!self.building.replace(true), "re-entrant index build");
        let result = build();
        self.building.set(false);
        let value = result?;
        Ok(self.cell.get_or_init(|| value))
    }

    /// Returns the value, building it first if needed.
    pub fn get_or_build<F: FnOnce() -> T>(&self, build: F) -> &T {
        match self.get_or_try_build::<std::convert::Infallible, _>(|| Ok(build())) {
            Ok(v) => v,
            Err(never) => match never {},
        }
    }

    /// Drops the value; the next access rebuilds it.
    pub fn invalidate(&mut self) {
        self.cell.take();
        self.building.set(false);
    }
}
