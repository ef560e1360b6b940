//! The [`RefinableSet`] ‒ per-bucket locks that grow with the table.

use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::hash::{BuildHasher, Hash};
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard, RwLock};
#[cfg(feature = "parallel")]
use rayon::iter::{FromParallelIterator, IntoParallelIterator, ParallelExtend, ParallelIterator};

use crate::raw::{self, Bucket};
use crate::ConcurrentSet;

/// A concurrent hash set whose lock granularity tracks its bucket count.
///
/// There is always exactly one mutex per bucket, so the available
/// parallelism grows together with the table. The price is that a resize
/// must replace the very lock array the per-key operations depend on, which
/// an "acquire the lock, then use the bucket" protocol cannot survive on its
/// own ‒ the lock a caller holds may belong to a dead array.
///
/// Two synchronization levels solve this:
///
/// 1. A *resize gate* (a reader/writer lock around the array). Every
///    per-key operation performs its whole critical section under a shared
///    lease; a resize takes the exclusive lease, so it starts only after
///    every in-flight operation has left and admits no new one.
/// 2. The per-bucket mutexes themselves, each owning its bucket. Under a
///    shared lease the bucket count cannot change, so indexing the array by
///    `hash % bucket_count` is stable for the whole critical section.
///
/// Before swapping in the doubled array, the resize *quiesces*: it locks and
/// unlocks every per-bucket mutex once. With the gate-first discipline of
/// this module the exclusive lease already guarantees exclusivity; the sweep
/// pins the stronger invariant that nobody who reached a bucket lock by any
/// other path is still in flight.
///
/// ```rust
/// use crossbeam_utils::thread;
/// use lockgrain::RefinableSet;
///
/// let set: RefinableSet<usize> = RefinableSet::new(2);
///
/// thread::scope(|s| {
///     for t in 0..4 {
///         let set = &set;
///         s.spawn(move |_| {
///             for i in 0..250 {
///                 set.insert(t * 250 + i);
///             }
///         });
///     }
/// })
/// .unwrap();
///
/// // The lock array kept up with the doublings: one lock per bucket.
/// assert_eq!(1000, set.len());
/// assert!(set.bucket_count() > 2);
/// ```
pub struct RefinableSet<T, S = RandomState> {
    /// The resize gate, owning the per-bucket lock array; each per-bucket
    /// mutex owns its bucket. Replaced wholesale under the exclusive lease.
    buckets: RwLock<Box<[Mutex<Bucket<T>>]>>,
    /// Mirrors the array length. Exact whenever a lease is held; a
    /// best-effort snapshot for `len` and the growth policy outside.
    bucket_count: AtomicUsize,
    elem_count: AtomicUsize,
    hash_builder: S,
}

impl<T> RefinableSet<T, RandomState>
where
    T: Hash + Eq,
{
    /// Creates a set with `capacity` initial buckets (and bucket locks).
    ///
    /// # Panics
    ///
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::with_hasher(capacity, RandomState::default())
    }
}

impl<T, S> RefinableSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a set with `capacity` initial buckets (and bucket locks) and
    /// the given hasher.
    ///
    /// # Panics
    ///
    /// If `capacity` is zero.
    pub fn with_hasher(capacity: usize, hash_builder: S) -> Self {
        assert!(capacity > 0, "a table needs at least one bucket");
        RefinableSet {
            buckets: RwLock::new((0..capacity).map(|_| Mutex::new(Bucket::new())).collect()),
            bucket_count: AtomicUsize::new(capacity),
            elem_count: AtomicUsize::new(0),
            hash_builder,
        }
    }

    /// Inserts `elem`, returning whether it was absent.
    pub fn insert(&self, elem: T) -> bool {
        let hash = self.hash_builder.hash_one(&elem);
        {
            let buckets = self.buckets.read();
            let mut bucket = self.lock_bucket(&buckets, hash);
            if raw::bucket_contains(&bucket, &elem) {
                return false;
            }
            bucket.push(elem);
            self.elem_count.fetch_add(1, Ordering::Relaxed);
            // Bucket guard drops before the lease.
        }
        // The policy check runs after the lease is gone, keeping the shared
        // section short. A spurious trigger exits inside grow().
        if self.should_grow() {
            self.grow();
        }
        true
    }

    /// Removes the element matching `key`, returning whether it was present.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_builder.hash_one(key);
        let buckets = self.buckets.read();
        let mut bucket = self.lock_bucket(&buckets, hash);
        if raw::bucket_remove(&mut bucket, key) {
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
        let hash = self.hash_builder.hash_one(key);
        let buckets = self.buckets.read();
        let bucket = self.lock_bucket(&buckets, hash);
        raw::bucket_contains(&bucket, key)
    }

    /// Locks the bucket for `hash`.
    ///
    /// The caller holds a shared lease on the gate, which freezes both the
    /// counter and the array identity, so the two are guaranteed to agree.
    fn lock_bucket<'a>(
        &self,
        buckets: &'a [Mutex<Bucket<T>>],
        hash: u64,
    ) -> MutexGuard<'a, Bucket<T>> {
        let bucket_count = self.bucket_count.load(Ordering::Relaxed);
        debug_assert_eq!(bucket_count, buckets.len());
        buckets[hash as usize % bucket_count].lock()
    }

    fn should_grow(&self) -> bool {
        raw::needs_growth(
            self.elem_count.load(Ordering::Relaxed),
            self.bucket_count.load(Ordering::Relaxed),
        )
    }

    /// Doubles the bucket count and the lock array with it.
    fn grow(&self) {
        let old_count = self.bucket_count.load(Ordering::Relaxed);
        // Exclusive lease: waits until every shared lease holder has left
        // and keeps new ones out until the swap is done.
        let mut buckets = self.buckets.write();
        if self.bucket_count.load(Ordering::Relaxed) != old_count {
            // Another resize won the race; this one is redundant.
            return;
        }
        // Quiesce: no thread may still hold any per-bucket lock, whichever
        // way it obtained it.
        for bucket in buckets.iter() {
            drop(bucket.lock());
        }
        let new_count = 2 * old_count;
        let drained: Vec<Bucket<T>> = buckets
            .iter_mut()
            .map(|bucket| mem::take(bucket.get_mut()))
            .collect();
        *buckets = raw::redistribute(drained.into_iter().flatten(), new_count, &self.hash_builder)
            .into_iter()
            .map(Mutex::new)
            .collect();
        self.bucket_count.store(new_count, Ordering::Relaxed);
    }
}

impl<T, S> RefinableSet<T, S> {
    /// The number of elements currently in the set.
    ///
    /// A single atomic read outside any lock; see the caveats on
    /// [`ConcurrentSet::len`].
    pub fn len(&self) -> usize {
        self.elem_count.load(Ordering::Relaxed)
    }

    /// Checks whether the set is empty, with the same caveats as
    /// [`len`][RefinableSet::len].
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current number of buckets ‒ and, by construction, of bucket
    /// locks.
    pub fn bucket_count(&self) -> usize {
        self.bucket_count.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&mut self)
    where
        T: Hash + Eq,
        S: BuildHasher,
    {
        let count = *self.elem_count.get_mut();
        let bucket_count = *self.bucket_count.get_mut();
        let buckets = self.buckets.get_mut();
        assert_eq!(
            bucket_count,
            buckets.len(),
            "lock array diverged from the table"
        );
        let refs: Vec<&Bucket<T>> = buckets.iter_mut().map(|bucket| &*bucket.get_mut()).collect();
        raw::assert_buckets_consistent(refs, &self.hash_builder, count);
    }
}

impl<T, S> ConcurrentSet<T> for RefinableSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn insert(&self, elem: T) -> bool {
        RefinableSet::insert(self, elem)
    }

    fn remove(&self, elem: &T) -> bool {
        RefinableSet::remove(self, elem)
    }

    fn contains(&self, elem: &T) -> bool {
        RefinableSet::contains(self, elem)
    }

    fn len(&self) -> usize {
        RefinableSet::len(self)
    }
}

impl<T, S> Debug for RefinableSet<T, S> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.debug_struct("RefinableSet")
            .field("len", &self.len())
            .field("bucket_count", &self.bucket_count())
            .finish()
    }
}

impl<T, S> Extend<T> for &RefinableSet<T, S>
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

impl<T, S> Extend<T> for RefinableSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        let mut me: &RefinableSet<_, _> = self;
        me.extend(iter);
    }
}

impl<T> FromIterator<T> for RefinableSet<T>
where
    T: Hash + Eq,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut me = RefinableSet::new(raw::DEFAULT_CAPACITY);
        me.extend(iter);
        me
    }
}

#[cfg(feature = "parallel")]
impl<T, S> ParallelExtend<T> for &RefinableSet<T, S>
where
    T: Hash + Eq + Send,
    S: BuildHasher + Sync,
{
    fn par_extend<I>(&mut self, par_iter: I)
    where
        I: IntoParallelIterator<Item = T>,
    {
        let set: &RefinableSet<_, _> = self;
        par_iter.into_par_iter().for_each(|elem| {
            set.insert(elem);
        });
    }
}

#[cfg(feature = "parallel")]
impl<T, S> ParallelExtend<T> for RefinableSet<T, S>
where
    T: Hash + Eq + Send,
    S: BuildHasher + Sync,
{
    fn par_extend<I>(&mut self, par_iter: I)
    where
        I: IntoParallelIterator<Item = T>,
    {
        let mut me: &RefinableSet<_, _> = self;
        me.par_extend(par_iter);
    }
}

#[cfg(feature = "parallel")]
impl<T> FromParallelIterator<T> for RefinableSet<T>
where
    T: Hash + Eq + Send,
{
    fn from_par_iter<I>(par_iter: I) -> Self
    where
        I: IntoParallelIterator<Item = T>,
    {
        let mut me = RefinableSet::new(raw::DEFAULT_CAPACITY);
        me.par_extend(par_iter);
        me
    }
}
