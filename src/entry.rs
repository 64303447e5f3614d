//! The capability contract for indexable entries.
//!
//! The list does not care what an entry is, only that it can produce a
//! stable identity and a score. Anything satisfying [`Rankable`] can be
//! indexed: a plain struct, a shared `Rc`/`Arc` handle when the caller
//! wants to keep the entry too, or a bare `(id, score)` tuple.

use std::rc::Rc;
use std::sync::Arc;

/// An entry the list can rank: a stable identity plus the score to order by.
///
/// Both accessors are read once, when the entry is inserted (or re-inserted
/// by `update`), and the values are snapshotted onto the list's own node.
/// Mutating a shared entry's score afterwards does not reorder the list;
/// only `update` repositions an entry.
pub trait Rankable {
    /// Stable identity, unique within one list. Must be strictly positive
    /// for the entry to be insertable.
    fn id(&self) -> i64;

    /// The score the list orders by, descending.
    fn score(&self) -> u64;
}

impl<T: Rankable + ?Sized> Rankable for &T {
    fn id(&self) -> i64 {
        (**self).id()
    }

    fn score(&self) -> u64 {
        (**self).score()
    }
}

impl<T: Rankable + ?Sized> Rankable for Box<T> {
    fn id(&self) -> i64 {
        (**self).id()
    }

    fn score(&self) -> u64 {
        (**self).score()
    }
}

impl<T: Rankable + ?Sized> Rankable for Rc<T> {
    fn id(&self) -> i64 {
        (**self).id()
    }

    fn score(&self) -> u64 {
        (**self).score()
    }
}

impl<T: Rankable + ?Sized> Rankable for Arc<T> {
    fn id(&self) -> i64 {
        (**self).id()
    }

    fn score(&self) -> u64 {
        (**self).score()
    }
}

/// Bare `(id, score)` pairs, handy in tests and one-off tools.
impl Rankable for (i64, u64) {
    fn id(&self) -> i64 {
        self.0
    }

    fn score(&self) -> u64 {
        self.1
    }
}
