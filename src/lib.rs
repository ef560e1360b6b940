#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! Concurrent hash sets across lock granularities.
//!
//! This crate implements one hash set four times, each time with a different
//! synchronization discipline, so that the variants can be benchmarked and
//! studied against each other:
//!
//! * [`SequentialSet`] ‒ no synchronization at all; the single-threaded
//!   baseline the others are measured against.
//! * [`CoarseSet`] ‒ one mutex around the whole table. Trivially correct,
//!   zero scalability.
//! * [`StripedSet`] ‒ a fixed array of mutexes, each guarding a slice of the
//!   buckets. The lock array never grows, so ever more buckets come to share
//!   each lock as the table does.
//! * [`RefinableSet`] ‒ one mutex per bucket, always. The lock array grows
//!   together with the table, which requires a second synchronization level
//!   (a reader/writer gate) to replace the lock array safely.
//!
//! All four share the bucket-array engine in [`raw`] and the
//! [`ConcurrentSet`] contract, so a benchmark harness (see [`workload`]) can
//! be written once and pointed at any of them.
//!
//! Elements are stored by value and found by hash and equality, through the
//! same `Borrow` pattern the standard collections use. The hasher is
//! pluggable through a [`BuildHasher`][std::hash::BuildHasher] type
//! parameter defaulting to [`RandomState`][std::collections::hash_map::RandomState].
//!
//! # Example
//!
//! ```rust
//! use crossbeam_utils::thread;
//! use lockgrain::RefinableSet;
//!
//! let set: RefinableSet<usize> = RefinableSet::new(4);
//!
//! thread::scope(|s| {
//!     for t in 0..4 {
//!         let set = &set;
//!         s.spawn(move |_| {
//!             for i in 0..100 {
//!                 set.insert(t * 100 + i);
//!             }
//!         });
//!     }
//! })
//! .unwrap();
//!
//! assert_eq!(400, set.len());
//! assert!(set.contains(&123));
//! ```
//!
//! # Non-goals
//!
//! The sets do not iterate, snapshot, or shrink, and they make no attempt at
//! lock-free progress ‒ the whole point is to compare *locking* strategies.

pub mod coarse;
pub mod raw;
pub mod refinable;
pub mod sequential;
pub mod striped;
pub mod workload;

// Visible to the unit-test build and to rustdoc's doctest pass alike; the
// compile-fail doc examples in there only run under the latter.
#[cfg(any(test, doctest))]
mod tests;

pub use crate::coarse::CoarseSet;
pub use crate::refinable::RefinableSet;
pub use crate::sequential::SequentialSet;
pub use crate::striped::StripedSet;

/// The abstract contract shared by every set variant.
///
/// All methods take `&self`; the implementations provide interior
/// mutability with whatever synchronization their discipline prescribes.
/// For the concurrent variants, `insert`, `remove` and `contains` are
/// linearizable with respect to each other on any one element.
///
/// [`len`][ConcurrentSet::len] is the exception: it reads a single atomic
/// counter outside any lock. Its result was correct at some instant during
/// the call, but it is not linearizable with the mutating operations across
/// calls.
pub trait ConcurrentSet<T> {
    /// Inserts `elem`, returning whether it was absent.
    fn insert(&self, elem: T) -> bool;

    /// Removes `elem`, returning whether it was present.
    fn remove(&self, elem: &T) -> bool;

    /// Checks whether `elem` is present.
    fn contains(&self, elem: &T) -> bool;

    /// The number of elements currently in the set.
    fn len(&self) -> usize;

    /// Checks whether the set is empty, with the same caveats as
    /// [`len`][ConcurrentSet::len].
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
