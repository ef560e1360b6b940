//! The [`StripedSet`] ‒ a fixed lock array shared by a growing table.

use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard};
#[cfg(feature = "parallel")]
use rayon::iter::{FromParallelIterator, IntoParallelIterator, ParallelExtend, ParallelIterator};

use crate::raw::{self, Bucket};
use crate::ConcurrentSet;

/// A concurrent hash set with lock striping.
///
/// The number of locks is fixed at construction (it equals the initial
/// bucket count) and never changes; the bucket array keeps doubling. Bucket
/// `b` is guarded by lock `b % lock_count`, so each lock comes to guard more
/// and more buckets as the table grows. In this encoding the stripe mutex
/// directly owns the group of buckets it guards ‒ bucket `b` lives in stripe
/// `b % lock_count` at position `b / lock_count`, which stays well defined
/// because the bucket count only ever doubles and therefore remains a
/// multiple of the lock count.
///
/// An operation on a key takes exactly one stripe. A growth takes all of
/// them, in index order, freezing the whole set for the duration of the
/// rehash.
///
/// ```rust
/// use crossbeam_utils::thread;
/// use lockgrain::StripedSet;
///
/// let set: StripedSet<usize> = StripedSet::new(4);
///
/// thread::scope(|s| {
///     for t in 0..2 {
///         let set = &set;
///         s.spawn(move |_| {
///             for i in 0..500 {
///                 set.insert(t * 500 + i);
///             }
///         });
///     }
/// })
/// .unwrap();
///
/// assert_eq!(1000, set.len());
/// assert_eq!(4, set.lock_count());
/// assert!(set.bucket_count() > 4);
/// ```
pub struct StripedSet<T, S = RandomState> {
    /// Stripe `s` owns the buckets `{b | b % lock_count == s}`, each stored
    /// at local index `b / lock_count`.
    stripes: Box<[Mutex<Vec<Bucket<T>>>]>,
    /// Read inside a stripe critical section the value is exact, because a
    /// grower holds every stripe while storing it; read outside (by `len`
    /// and the growth policy) it is a best-effort snapshot.
    bucket_count: AtomicUsize,
    elem_count: AtomicUsize,
    hash_builder: S,
}

impl<T> StripedSet<T, RandomState>
where
    T: Hash + Eq,
{
    /// Creates a set with `capacity` initial buckets and as many locks.
    ///
    /// # Panics
    ///
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::with_hasher(capacity, RandomState::default())
    }
}

impl<T, S> StripedSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a set with `capacity` initial buckets, as many locks, and the
    /// given hasher.
    ///
    /// # Panics
    ///
    /// If `capacity` is zero.
    pub fn with_hasher(capacity: usize, hash_builder: S) -> Self {
        assert!(capacity > 0, "a table needs at least one bucket");
        StripedSet {
            stripes: (0..capacity)
                .map(|_| Mutex::new(vec![Bucket::new()]))
                .collect(),
            bucket_count: AtomicUsize::new(capacity),
            elem_count: AtomicUsize::new(0),
            hash_builder,
        }
    }

    /// Inserts `elem`, returning whether it was absent.
    pub fn insert(&self, elem: T) -> bool {
        let hash = self.hash_builder.hash_one(&elem);
        {
            let (mut stripe, local) = self.acquire(hash);
            let bucket = &mut stripe[local];
            if raw::bucket_contains(bucket, &elem) {
                return false;
            }
            bucket.push(elem);
            self.elem_count.fetch_add(1, Ordering::Relaxed);
        }
        // The policy check runs outside the stripe lock. A spurious trigger
        // exits inside grow(), a missed one is re-triggered by a later
        // insert.
        let old_count = self.bucket_count.load(Ordering::Relaxed);
        if raw::needs_growth(self.elem_count.load(Ordering::Relaxed), old_count) {
            self.grow(old_count);
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
        let (mut stripe, local) = self.acquire(hash);
        if raw::bucket_remove(&mut stripe[local], key) {
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
        let (stripe, local) = self.acquire(hash);
        raw::bucket_contains(&stripe[local], key)
    }

    /// Locks the stripe for `hash` and resolves the local bucket index
    /// within it.
    ///
    /// The lock index depends only on the constant lock count, the bucket
    /// index on the current bucket count; because the lock count divides the
    /// bucket count, the locked stripe is exactly the one owning the bucket.
    fn acquire(&self, hash: u64) -> (MutexGuard<'_, Vec<Bucket<T>>>, usize) {
        let lock_count = self.stripes.len();
        let stripe = self.stripes[hash as usize % lock_count].lock();
        let bucket = hash as usize % self.bucket_count.load(Ordering::Relaxed);
        debug_assert_eq!(hash as usize % lock_count, bucket % lock_count);
        (stripe, bucket / lock_count)
    }

    /// Doubles the bucket count while holding every stripe.
    ///
    /// `old_count` is the bucket count the caller saw when the policy fired.
    /// If it no longer matches once every stripe is held, another thread
    /// already resized in the meantime and this attempt backs off.
    fn grow(&self, old_count: usize) {
        // Index-order acquisition over the whole array; concurrent growers
        // queue behind each other instead of deadlocking.
        let mut stripes: Vec<_> = self.stripes.iter().map(|stripe| stripe.lock()).collect();
        if self.bucket_count.load(Ordering::Relaxed) != old_count {
            // Someone else resized while we were queueing for the locks.
            return;
        }
        let lock_count = stripes.len();
        let new_count = 2 * old_count;
        let elems: Vec<T> = stripes
            .iter_mut()
            .flat_map(|stripe| stripe.drain(..))
            .flatten()
            .collect();
        for (idx, bucket) in raw::redistribute(elems, new_count, &self.hash_builder)
            .into_iter()
            .enumerate()
        {
            stripes[idx % lock_count].push(bucket);
        }
        self.bucket_count.store(new_count, Ordering::Relaxed);
    }
}

impl<T, S> StripedSet<T, S> {
    /// The number of elements currently in the set.
    ///
    /// A single atomic read outside any lock; see the caveats on
    /// [`ConcurrentSet::len`].
    pub fn len(&self) -> usize {
        self.elem_count.load(Ordering::Relaxed)
    }

    /// Checks whether the set is empty, with the same caveats as
    /// [`len`][StripedSet::len].
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.bucket_count.load(Ordering::Relaxed)
    }

    /// The number of locks, fixed at construction.
    pub fn lock_count(&self) -> usize {
        self.stripes.len()
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&mut self)
    where
        T: Hash + Eq,
        S: BuildHasher,
    {
        let lock_count = self.stripes.len();
        let bucket_count = *self.bucket_count.get_mut();
        let count = *self.elem_count.get_mut();
        let groups: Vec<&Vec<Bucket<T>>> = self
            .stripes
            .iter_mut()
            .map(|stripe| &*stripe.get_mut())
            .collect();
        for group in &groups {
            assert_eq!(bucket_count / lock_count, group.len());
        }
        let buckets: Vec<&Bucket<T>> = (0..bucket_count)
            .map(|b| &groups[b % lock_count][b / lock_count])
            .collect();
        raw::assert_buckets_consistent(buckets, &self.hash_builder, count);
    }
}

impl<T, S> ConcurrentSet<T> for StripedSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn insert(&self, elem: T) -> bool {
        StripedSet::insert(self, elem)
    }

    fn remove(&self, elem: &T) -> bool {
        StripedSet::remove(self, elem)
    }

    fn contains(&self, elem: &T) -> bool {
        StripedSet::contains(self, elem)
    }

    fn len(&self) -> usize {
        StripedSet::len(self)
    }
}

impl<T, S> Debug for StripedSet<T, S> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.debug_struct("StripedSet")
            .field("len", &self.len())
            .field("bucket_count", &self.bucket_count())
            .field("lock_count", &self.lock_count())
            .finish()
    }
}

impl<T, S> Extend<T> for &StripedSet<T, S>
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

impl<T, S> Extend<T> for StripedSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        let mut me: &StripedSet<_, _> = self;
        me.extend(iter);
    }
}

impl<T> FromIterator<T> for StripedSet<T>
where
    T: Hash + Eq,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut me = StripedSet::new(raw::DEFAULT_CAPACITY);
        me.extend(iter);
        me
    }
}

#[cfg(feature = "parallel")]
impl<T, S> ParallelExtend<T> for &StripedSet<T, S>
where
    T: Hash + Eq + Send,
    S: BuildHasher + Sync,
{
    fn par_extend<I>(&mut self, par_iter: I)
    where
        I: IntoParallelIterator<Item = T>,
    {
        let set: &StripedSet<_, _> = self;
        par_iter.into_par_iter().for_each(|elem| {
            set.insert(elem);
        });
    }
}

#[cfg(feature = "parallel")]
impl<T, S> ParallelExtend<T> for StripedSet<T, S>
where
    T: Hash + Eq + Send,
    S: BuildHasher + Sync,
{
    fn par_extend<I>(&mut self, par_iter: I)
    where
        I: IntoParallelIterator<Item = T>,
    {
        let mut me: &StripedSet<_, _> = self;
        me.par_extend(par_iter);
    }
}

#[cfg(feature = "parallel")]
impl<T> FromParallelIterator<T> for StripedSet<T>
where
    T: Hash + Eq + Send,
{
    fn from_par_iter<I>(par_iter: I) -> Self
    where
        I: IntoParallelIterator<Item = T>,
    {
        let mut me = StripedSet::new(raw::DEFAULT_CAPACITY);
        me.par_extend(par_iter);
        me
    }
}
