//! # Session Table Cache
//!
//! Each typed table the session exposes lives in a [`TableCell`]: an
//! `Option<T>` plus a dirty flag and the list of device tables the value was
//! built from. Accessors fetch lazily through
//! [`TableCell::get_or_try_load`]; any write or procedure that may change a
//! source table calls [`TableCell::invalidate_table`] so the next access
//! re-reads from the device.

use serde::{Deserialize, Serialize};

/// Lifecycle of a cached table value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheState {
    /// Never loaded.
    Empty,
    /// Loaded and not invalidated since.
    Valid,
    /// Loaded once, then invalidated by a device mutation.
    Dirty,
}

/// Statistics for cache monitoring
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Accesses served from the cached value
    pub hits: u64,
    /// Accesses that went to the device
    pub loads: u64,
    /// Times the value was dropped by an invalidation
    pub invalidations: u64,
}

#[derive(Debug)]
pub struct TableCell<T> {
    sources: &'static [u16],
    value: Option<T>,
    dirty: bool,
    stats: CacheStats,
}

impl<T> TableCell<T> {
    /// A cell whose value is derived from the device tables in `sources`.
    pub const fn new(sources: &'static [u16]) -> Self {
        Self {
            sources,
            value: None,
            dirty: false,
            stats: CacheStats {
                hits: 0,
                loads: 0,
                invalidations: 0,
            },
        }
    }

    pub fn state(&self) -> CacheState {
        match (&self.value, self.dirty) {
            (Some(_), _) => CacheState::Valid,
            (None, true) => CacheState::Dirty,
            (None, false) => CacheState::Empty,
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// The cached value, if valid.
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Returns the cached value, loading it with `load` when absent.
    ///
    /// A failed load leaves the cell unchanged.
    pub fn get_or_try_load<E, F>(&mut self, load: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let value = match self.value.take() {
            Some(value) => {
                self.stats.hits += 1;
                value
            }
            None => {
                let value = load()?;
                self.stats.loads += 1;
                self.dirty = false;
                value
            }
        };
        Ok(self.value.insert(value))
    }

    /// Stores a value known to match the device.
    pub fn set(&mut self, value: T) {
        self.value = Some(value);
        self.dirty = false;
    }

    pub fn invalidate(&mut self) {
        if self.value.take().is_some() {
            self.dirty = true;
            self.stats.invalidations += 1;
        }
    }

    pub fn depends_on(&self, table: u16) -> bool {
        self.sources.contains(&table)
    }

    /// Invalidates the cell if `table` is one of its sources.
    pub fn invalidate_table(&mut self, table: u16) {
        if self.depends_on(table) {
            self.invalidate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_load_once() {
        let mut cell: TableCell<u32> = TableCell::new(&[2048]);
        assert_eq!(cell.state(), CacheState::Empty);

        let mut calls = 0;
        for _ in 0..3 {
            let value = cell
                .get_or_try_load(|| {
                    calls += 1;
                    Ok::<_, ()>(7)
                })
                .unwrap();
            assert_eq!(*value, 7);
        }
        assert_eq!(calls, 1);
        assert_eq!(cell.stats().hits, 2);
        assert_eq!(cell.state(), CacheState::Valid);
    }

    #[test]
    fn test_invalidate_by_table() {
        let mut cell: TableCell<u32> = TableCell::new(&[2048, 52]);
        cell.set(1);
        cell.invalidate_table(23);
        assert_eq!(cell.state(), CacheState::Valid);
        cell.invalidate_table(52);
        assert_eq!(cell.state(), CacheState::Dirty);
        assert!(cell.get().is_none());
    }

    #[test]
    fn test_failed_load_keeps_state() {
        let mut cell: TableCell<u32> = TableCell::new(&[1]);
        assert!(cell.get_or_try_load(|| Err::<u32, _>("offline")).is_err());
        assert_eq!(cell.state(), CacheState::Empty);
        assert_eq!(cell.stats().loads, 0);
    }
}
