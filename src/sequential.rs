//! The [`SequentialSet`] ‒ the unsynchronized baseline.

use std::borrow::Borrow;
use std::cell::{Cell, RefCell};
use std::collections::hash_map::RandomState;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::hash::{BuildHasher, Hash};

use crate::raw::{self, Table};
use crate::ConcurrentSet;

/// A hash set without any synchronization.
///
/// This is the reference oracle the concurrent variants are benchmarked and
/// tested against. It honors the same `&self` contract as the others (via
/// interior mutability), but it is deliberately *not* [`Sync`]: the compiler
/// refuses to share it between threads, so it can never end up in the
/// concurrent workload by accident.
///
/// ```rust
/// use lockgrain::SequentialSet;
///
/// let set: SequentialSet<u32> = SequentialSet::new(2);
/// assert!(set.insert(1));
/// assert!(!set.insert(1));
/// assert!(set.remove(&1));
/// assert!(!set.contains(&1));
/// ```
pub struct SequentialSet<T, S = RandomState> {
    table: RefCell<Table<T>>,
    elem_count: Cell<usize>,
    hash_builder: S,
}

impl<T> SequentialSet<T, RandomState>
where
    T: Hash + Eq,
{
    /// Creates a set with `capacity` initial buckets.
    ///
    /// # Panics
    ///
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::with_hasher(capacity, RandomState::default())
    }
}

impl<T, S> SequentialSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a set with `capacity` initial buckets and the given hasher.
    ///
    /// # Panics
    ///
    /// If `capacity` is zero.
    pub fn with_hasher(capacity: usize, hash_builder: S) -> Self {
        SequentialSet {
            table: RefCell::new(Table::new(capacity)),
            elem_count: Cell::new(0),
            hash_builder,
        }
    }

    /// Inserts `elem`, returning whether it was absent.
    pub fn insert(&self, elem: T) -> bool {
        let mut table = self.table.borrow_mut();
        let hash = self.hash_builder.hash_one(&elem);
        if table.contains(hash, &elem) {
            return false;
        }
        table.insert(hash, elem);
        self.elem_count.set(self.elem_count.get() + 1);
        if raw::needs_growth(self.elem_count.get(), table.bucket_count()) {
            table.grow(&self.hash_builder);
        }
        true
    }

    /// Removes the element matching `key`, returning whether it was present.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let mut table = self.table.borrow_mut();
        let hash = self.hash_builder.hash_one(key);
        if table.remove(hash, key) {
            debug_assert!(self.elem_count.get() > 0);
            self.elem_count.set(self.elem_count.get() - 1);
            true
        } else {
            false
        }
    }

    /// Checks whether an element matching `key` is present.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let table = self.table.borrow();
        table.contains(self.hash_builder.hash_one(key), key)
    }
}

impl<T, S> SequentialSet<T, S> {
    /// The number of elements currently in the set.
    pub fn len(&self) -> usize {
        self.elem_count.get()
    }

    /// Checks whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.table.borrow().bucket_count()
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&mut self)
    where
        T: Hash + Eq,
        S: BuildHasher,
    {
        self.table
            .get_mut()
            .assert_consistent(&self.hash_builder, self.elem_count.get());
    }
}

impl<T, S> ConcurrentSet<T> for SequentialSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn insert(&self, elem: T) -> bool {
        SequentialSet::insert(self, elem)
    }

    fn remove(&self, elem: &T) -> bool {
        SequentialSet::remove(self, elem)
    }

    fn contains(&self, elem: &T) -> bool {
        SequentialSet::contains(self, elem)
    }

    fn len(&self) -> usize {
        SequentialSet::len(self)
    }
}

impl<T, S> Debug for SequentialSet<T, S> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.debug_struct("SequentialSet")
            .field("len", &self.len())
            .field("bucket_count", &self.bucket_count())
            .finish()
    }
}

impl<T, S> Extend<T> for &SequentialSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        for elem in iter {
            self.insert(elem);
        }
    }
}

impl<T, S> Extend<T> for SequentialSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        let mut me: &SequentialSet<_, _> = self;
        me.extend(iter);
    }
}

impl<T> FromIterator<T> for SequentialSet<T>
where
    T: Hash + Eq,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut me = SequentialSet::new(raw::DEFAULT_CAPACITY);
        me.extend(iter);
        me
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::tests::NoHasher;

    #[test]
    fn double_insert_then_remove() {
        let set = SequentialSet::new(4);
        assert!(set.insert(1));
        assert!(!set.insert(1));
        assert!(set.remove(&1));
        assert!(!set.contains(&1));
        assert_eq!(0, set.len());
    }

    // The counter and the buckets must move together; a removal that only
    // decrements the counter would leave the element findable.
    #[test]
    fn remove_actually_removes() {
        let mut set = SequentialSet::new(2);
        for i in 0..50usize {
            set.insert(i);
        }
        for i in 0..50usize {
            assert!(set.remove(&i));
            assert!(!set.contains(&i));
            set.assert_consistent();
        }
        assert!(set.is_empty());
    }

    #[test]
    fn add_drain_cycle() {
        let set = SequentialSet::new(2);
        for i in 0..100usize {
            assert!(set.insert(i));
        }
        assert_eq!(100, set.len());
        assert!(set.contains(&50));
        for i in 0..100usize {
            assert_eq!(100 - i, set.len());
            assert!(set.remove(&i));
        }
        assert!(!set.contains(&50));
        assert_eq!(0, set.len());
    }

    #[test]
    fn grows_by_doubling() {
        let mut set = SequentialSet::new(2);
        for i in 0..100usize {
            set.insert(i);
        }
        // Doubling from two buckets under the load-factor-four policy lands
        // at 32 buckets for a hundred elements.
        assert_eq!(32, set.bucket_count());
        set.assert_consistent();
    }

    #[test]
    fn collisions_still_act_like_a_set() {
        let mut set = SequentialSet::with_hasher(2, NoHasher);
        for i in 0..20usize {
            assert!(set.insert(i));
        }
        for i in 0..20usize {
            assert!(set.contains(&i));
            assert!(!set.insert(i));
        }
        set.assert_consistent();
    }

    #[test]
    fn from_iterator_collects() {
        let set: SequentialSet<usize> = (0..10).collect();
        assert_eq!(10, set.len());
        assert!(set.contains(&9));
    }

    #[test]
    #[should_panic(expected = "at least one bucket")]
    fn zero_capacity_refused() {
        let _ = SequentialSet::<usize>::new(0);
    }
}
