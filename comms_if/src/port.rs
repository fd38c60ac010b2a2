//! # Data ports
//!
//! A `DataPort` holds the newest value written by a producer. Reading it
//! never blocks: the reader is told whether the value is new since its last
//! read, has already been seen, or has never been written. Writes overwrite
//! any unread value, only the newest one is kept.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::cell::Cell;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Single-slot newest-value port.
///
/// The freshness flag sits in a `Cell` so that a consumer holding a shared
/// reference to its inputs can mark them as read. Ports are therefore not
/// `Sync` and belong to one thread.
#[derive(Debug, Default)]
pub struct DataPort<T> {
    value: Option<T>,
    fresh: Cell<bool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Result of reading a `DataPort`.
#[derive(Debug, PartialEq)]
pub enum Reading<'a, T> {
    /// A value written since the last read.
    Fresh(&'a T),

    /// The last value, already returned by a previous read.
    Stale(&'a T),

    /// Nothing has ever been written to the port.
    Absent,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T> DataPort<T> {
    /// Create an empty port.
    pub fn new() -> Self {
        Self {
            value: None,
            fresh: Cell::new(false),
        }
    }

    /// Write a new value, replacing any previous one.
    pub fn write(&mut self, value: T) {
        self.value = Some(value);
        self.fresh.set(true);
    }

    /// Read the newest value, marking it as seen.
    pub fn read_newest(&self) -> Reading<'_, T> {
        match self.value {
            Some(ref v) => {
                if self.fresh.replace(false) {
                    Reading::Fresh(v)
                } else {
                    Reading::Stale(v)
                }
            }
            None => Reading::Absent,
        }
    }

    /// Returns true if an unread value is waiting in the port.
    pub fn has_fresh(&self) -> bool {
        self.value.is_some() && self.fresh.get()
    }

    /// Get the newest value without changing its freshness.
    pub fn peek(&self) -> Option<&T> {
        self.value.as_ref()
    }
}

impl<'a, T> Reading<'a, T> {
    /// Return the value only if it is fresh.
    pub fn fresh(self) -> Option<&'a T> {
        match self {
            Reading::Fresh(v) => Some(v),
            _ => None,
        }
    }

    /// Returns true for a fresh reading.
    pub fn is_fresh(&self) -> bool {
        matches!(self, Reading::Fresh(_))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_port_freshness() {
        let mut port: DataPort<Vec<f64>> = DataPort::new();

        assert_eq!(port.read_newest(), Reading::Absent);
        assert!(!port.has_fresh());

        port.write(vec![1.0]);
        assert!(port.has_fresh());
        assert_eq!(port.read_newest(), Reading::Fresh(&vec![1.0]));
        assert_eq!(port.read_newest(), Reading::Stale(&vec![1.0]));

        // Only the newest of two unread writes is kept
        port.write(vec![2.0]);
        port.write(vec![3.0]);
        assert_eq!(port.peek(), Some(&vec![3.0]));
        assert!(port.has_fresh());
        assert_eq!(port.read_newest().fresh(), Some(&vec![3.0]));
        assert_eq!(port.read_newest().fresh(), None);
    }
}
