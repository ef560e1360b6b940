//! The [`CoarseSet`] ‒ one mutex around everything.

use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
#[cfg(feature = "parallel")]
use rayon::iter::{FromParallelIterator, IntoParallelIterator, ParallelExtend, ParallelIterator};

use crate::raw::{self, Table};
use crate::ConcurrentSet;

/// A concurrent hash set guarded by a single mutex.
///
/// Every operation takes the one lock on entry and holds it for its whole
/// critical section, which makes the variant trivially linearizable ‒ and
/// trivially unscalable. A growth triggered by an insert runs while the
/// inserting caller still holds the mutex, so no operation ever observes a
/// partially rehashed table.
///
/// The element counter lives outside the mutex as an atomic, so
/// [`len`][CoarseSet::len] never blocks.
///
/// ```rust
/// use crossbeam_utils::thread;
/// use lockgrain::CoarseSet;
///
/// let set: CoarseSet<&str> = CoarseSet::new(4);
///
/// thread::scope(|s| {
///     s.spawn(|_| {
///         set.insert("hello");
///     });
///     s.spawn(|_| {
///         set.insert("world");
///     });
/// })
/// .unwrap();
///
/// assert!(set.contains("hello"));
/// assert!(set.contains("world"));
/// ```
pub struct CoarseSet<T, S = RandomState> {
    table: Mutex<Table<T>>,
    elem_count: AtomicUsize,
    hash_builder: S,
}

impl<T> CoarseSet<T, RandomState>
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

impl<T, S> CoarseSet<T, S>
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
        CoarseSet {
            table: Mutex::new(Table::new(capacity)),
            elem_count: AtomicUsize::new(0),
            hash_builder,
        }
    }

    /// Inserts `elem`, returning whether it was absent.
    pub fn insert(&self, elem: T) -> bool {
        let mut table = self.table.lock();
        let hash = self.hash_builder.hash_one(&elem);
        if table.contains(hash, &elem) {
            return false;
        }
        table.insert(hash, elem);
        let count = self.elem_count.fetch_add(1, Ordering::Relaxed) + 1;
        if raw::needs_growth(count, table.bucket_count()) {
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
        let mut table = self.table.lock();
        let hash = self.hash_builder.hash_one(key);
        if table.remove(hash, key) {
            debug_assert!(self.elem_count.load(Ordering::Relaxed) > 0);
            self.elem_count.fetch_sub(1, Ordering::Relaxed);
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
        let table = self.table.lock();
        table.contains(self.hash_builder.hash_one(key), key)
    }
}

impl<T, S> CoarseSet<T, S> {
    /// The number of elements currently in the set.
    ///
    /// A single atomic read outside the mutex; see the caveats on
    /// [`ConcurrentSet::len`].
    pub fn len(&self) -> usize {
        self.elem_count.load(Ordering::Relaxed)
    }

    /// Checks whether the set is empty, with the same caveats as
    /// [`len`][CoarseSet::len].
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.table.lock().bucket_count()
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&mut self)
    where
        T: Hash + Eq,
        S: BuildHasher,
    {
        let count = *self.elem_count.get_mut();
        self.table
            .get_mut()
            .assert_consistent(&self.hash_builder, count);
    }
}

impl<T, S> ConcurrentSet<T> for CoarseSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn insert(&self, elem: T) -> bool {
        CoarseSet::insert(self, elem)
    }

    fn remove(&self, elem: &T) -> bool {
        CoarseSet::remove(self, elem)
    }

    fn contains(&self, elem: &T) -> bool {
        CoarseSet::contains(self, elem)
    }

    fn len(&self) -> usize {
        CoarseSet::len(self)
    }
}

impl<T, S> Debug for CoarseSet<T, S> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.debug_struct("CoarseSet")
            .field("len", &self.len())
            .field("bucket_count", &self.bucket_count())
            .finish()
    }
}

impl<T, S> Extend<T> for &CoarseSet<T, S>
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

impl<T, S> Extend<T> for CoarseSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        let mut me: &CoarseSet<_, _> = self;
        me.extend(iter);
    }
}

impl<T> FromIterator<T> for CoarseSet<T>
where
    T: Hash + Eq,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut me = CoarseSet::new(raw::DEFAULT_CAPACITY);
        me.extend(iter);
        me
    }
}

#[cfg(feature = "parallel")]
impl<T, S> ParallelExtend<T> for &CoarseSet<T, S>
where
    T: Hash + Eq + Send,
    S: BuildHasher + Sync,
{
    fn par_extend<I>(&mut self, par_iter: I)
    where
        I: IntoParallelIterator<Item = T>,
    {
        let set: &CoarseSet<_, _> = self;
        par_iter.into_par_iter().for_each(|elem| {
            set.insert(elem);
        });
    }
}

#[cfg(feature = "parallel")]
impl<T, S> ParallelExtend<T> for CoarseSet<T, S>
where
    T: Hash + Eq + Send,
    S: BuildHasher + Sync,
{
    fn par_extend<I>(&mut self, par_iter: I)
    where
        I: IntoParallelIterator<Item = T>,
    {
        let mut me: &CoarseSet<_, _> = self;
        me.par_extend(par_iter);
    }
}

#[cfg(feature = "parallel")]
impl<T> FromParallelIterator<T> for CoarseSet<T>
where
    T: Hash + Eq + Send,
{
    fn from_par_iter<I>(par_iter: I) -> Self
    where
        I: IntoParallelIterator<Item = T>,
    {
        let mut me = CoarseSet::new(raw::DEFAULT_CAPACITY);
        me.par_extend(par_iter);
        me
    }
}
