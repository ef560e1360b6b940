//! The bucket-array engine shared by all the set variants.
//!
//! This module contains the [`Table`] type and the rehashing primitive
//! [`redistribute`], which together form the unsynchronized core of every
//! data structure in this crate. The concurrent variants differ only in the
//! locks they wrap around this engine, never in the bucket arithmetic. The
//! module is exposed to allow wrapping it into further APIs, but is probably
//! not the best thing for general use.

use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash};
use std::mem;

use smallvec::SmallVec;

/// How many elements a bucket stores inline.
///
/// Buckets are almost always short: growth triggers once the *average*
/// bucket length exceeds [`MAX_LOAD`], so the common case fits inline and
/// the spilled `Vec` representation is reserved for hash pile-ups. Same
/// trade as a collision list ‒ usually one element, rarely many.
const BUCKET_INLINE: usize = 4;

/// A single bucket: the elements sharing one `hash % bucket_count` slot.
///
/// The order of elements within a bucket is an implementation detail and is
/// not observable through any set API.
pub type Bucket<T> = SmallVec<[T; BUCKET_INLINE]>;

/// Bucket count used when a set is built from an iterator and no capacity
/// was given.
pub(crate) const DEFAULT_CAPACITY: usize = 16;

/// The load-factor threshold.
///
/// A set grows once `elem_count / bucket_count > MAX_LOAD`. The division is
/// integer division on purpose ‒ growth triggers at `5 * bucket_count`
/// elements, not at a fractional load of 4.0.
pub(crate) const MAX_LOAD: usize = 4;

/// Checks the load-factor policy on a pair of counter snapshots.
///
/// The snapshots may be stale (they are read outside any lock); a spurious
/// positive leads to a growth attempt that re-checks under exclusion, and a
/// missed positive is re-triggered by the next insert.
pub(crate) fn needs_growth(elem_count: usize, bucket_count: usize) -> bool {
    elem_count / bucket_count > MAX_LOAD
}

/// Linear scan of one bucket.
pub(crate) fn bucket_contains<T, Q>(bucket: &[T], key: &Q) -> bool
where
    T: Borrow<Q>,
    Q: ?Sized + Eq,
{
    bucket.iter().any(|stored| stored.borrow() == key)
}

/// Removes the element matching `key` from the bucket, if present.
///
/// Uses `swap_remove` ‒ bucket order is unobservable, so there is no point
/// in shifting the tail.
pub(crate) fn bucket_remove<T, Q>(bucket: &mut Bucket<T>, key: &Q) -> bool
where
    T: Borrow<Q>,
    Q: ?Sized + Eq,
{
    match bucket.iter().position(|stored| stored.borrow() == key) {
        Some(idx) => {
            bucket.swap_remove(idx);
            true
        }
        None => false,
    }
}

/// Distributes elements into a freshly allocated bucket array.
///
/// This is the one rehashing algorithm in the crate: every variant's resize
/// funnels through here, no matter which exclusion protocol it used to gain
/// the right to call it. No element is lost or duplicated ‒ the output holds
/// exactly the input elements, each in bucket `hash % bucket_count`.
pub fn redistribute<T, S, I>(elems: I, bucket_count: usize, hash_builder: &S) -> Vec<Bucket<T>>
where
    T: Hash,
    S: BuildHasher,
    I: IntoIterator<Item = T>,
{
    let mut buckets: Vec<Bucket<T>> = (0..bucket_count).map(|_| Bucket::new()).collect();
    for elem in elems {
        let idx = hash_builder.hash_one(&elem) as usize % bucket_count;
        buckets[idx].push(elem);
    }
    buckets
}

/// An indexed sequence of buckets.
///
/// Pure data ‒ the table knows nothing about synchronization and nothing
/// about hashing either, beyond being handed pre-computed hashes. Callers
/// are responsible for exclusion and for using one consistent hasher.
pub struct Table<T> {
    buckets: Vec<Bucket<T>>,
}

impl<T> Table<T> {
    /// Creates a table of `bucket_count` empty buckets.
    ///
    /// # Panics
    ///
    /// If `bucket_count` is zero ‒ a table without buckets has no bucket to
    /// map a hash to.
    pub fn new(bucket_count: usize) -> Self {
        assert!(bucket_count > 0, "a table needs at least one bucket");
        Table {
            buckets: (0..bucket_count).map(|_| Bucket::new()).collect(),
        }
    }

    /// The current number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Maps a hash to its bucket index.
    pub fn bucket_index(&self, hash: u64) -> usize {
        hash as usize % self.buckets.len()
    }

    /// Checks whether the bucket for `hash` holds an element matching `key`.
    pub fn contains<Q>(&self, hash: u64, key: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        bucket_contains(&self.buckets[self.bucket_index(hash)], key)
    }

    /// Appends `elem` to the bucket for `hash`.
    ///
    /// The caller must have checked absence first; buckets never hold
    /// duplicates.
    pub fn insert(&mut self, hash: u64, elem: T)
    where
        T: Eq,
    {
        let idx = self.bucket_index(hash);
        debug_assert!(
            !bucket_contains(&self.buckets[idx], &elem),
            "insert of an element that is already present"
        );
        self.buckets[idx].push(elem);
    }

    /// Removes the element matching `key` from the bucket for `hash`.
    ///
    /// Returns whether the element was present.
    pub fn remove<Q>(&mut self, hash: u64, key: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let idx = self.bucket_index(hash);
        bucket_remove(&mut self.buckets[idx], key)
    }

    /// Rehashes the table into twice as many buckets.
    pub fn grow<S>(&mut self, hash_builder: &S)
    where
        T: Hash,
        S: BuildHasher,
    {
        let doubled = self.buckets.len() * 2;
        let old = mem::take(&mut self.buckets);
        self.buckets = redistribute(old.into_iter().flatten(), doubled, hash_builder);
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent<S>(&self, hash_builder: &S, expected_len: usize)
    where
        T: Hash + Eq,
        S: BuildHasher,
    {
        assert_buckets_consistent(&self.buckets, hash_builder, expected_len);
    }
}

/// Asserts the structural invariants over a whole bucket array: every
/// element sits in `hash % bucket_count`, no bucket holds duplicates, and
/// the total matches the element counter.
///
/// Callers take `&mut self` on their sets before collecting the buckets,
/// which proves nobody is concurrently modifying the array they hand in.
#[cfg(test)]
pub(crate) fn assert_buckets_consistent<'a, T, S, I>(
    buckets: I,
    hash_builder: &S,
    expected_len: usize,
) where
    T: Hash + Eq + 'a,
    S: BuildHasher,
    I: IntoIterator<Item = &'a Bucket<T>>,
{
    let buckets: Vec<&Bucket<T>> = buckets.into_iter().collect();
    let bucket_count = buckets.len();
    let mut total = 0;
    for (idx, bucket) in buckets.iter().enumerate() {
        for (pos, elem) in bucket.iter().enumerate() {
            assert_eq!(
                idx,
                hash_builder.hash_one(elem) as usize % bucket_count,
                "element hashed into the wrong bucket"
            );
            assert!(
                bucket[pos + 1..].iter().all(|other| other != elem),
                "duplicate element within a bucket"
            );
        }
        total += bucket.len();
    }
    assert_eq!(expected_len, total, "element counter drifted from contents");
}

// Also compiled under `doctest` so the test modules that borrow the hashers
// from here still resolve during rustdoc's doctest collection.
#[cfg(any(test, doctest))]
pub(crate) mod tests {
    use std::collections::hash_map::RandomState;
    use std::hash::Hasher;

    use super::*;

    // A hasher to create collisions on purpose. Everything lands in bucket
    // zero, which turns the table into a glorified vector. We allow tests in
    // higher-level modules to reuse it for their tests.
    pub(crate) struct NoHasher;

    impl Hasher for NoHasher {
        fn finish(&self) -> u64 {
            0
        }

        fn write(&mut self, _: &[u8]) {}
    }

    impl BuildHasher for NoHasher {
        type Hasher = NoHasher;

        fn build_hasher(&self) -> NoHasher {
            NoHasher
        }
    }

    #[test]
    fn growth_threshold_is_integer_division() {
        // 9 / 2 == 4, so a table of two buckets is not over-loaded at nine
        // elements and becomes so at ten.
        assert!(!needs_growth(9, 2));
        assert!(needs_growth(10, 2));
        assert!(!needs_growth(4, 1));
        assert!(needs_growth(5, 1));
    }

    #[test]
    fn insert_remove_contains() {
        let hasher = RandomState::new();
        let mut table: Table<usize> = Table::new(2);
        let hash = hasher.hash_one(&42usize);
        assert!(!table.contains(hash, &42));
        table.insert(hash, 42);
        assert!(table.contains(hash, &42));
        assert!(table.remove(hash, &42));
        assert!(!table.contains(hash, &42));
        assert!(!table.remove(hash, &42));
    }

    #[test]
    fn grow_preserves_elements() {
        let hasher = RandomState::new();
        let mut table: Table<usize> = Table::new(2);
        for i in 0..100usize {
            table.insert(hasher.hash_one(&i), i);
        }
        table.grow(&hasher);
        table.grow(&hasher);
        assert_eq!(8, table.bucket_count());
        for i in 0..100usize {
            assert!(table.contains(hasher.hash_one(&i), &i));
        }
        table.assert_consistent(&hasher, 100);
    }

    #[test]
    fn redistribute_places_by_hash() {
        let hasher = RandomState::new();
        let buckets = redistribute(0..1000usize, 16, &hasher);
        assert_eq!(16, buckets.len());
        assert_buckets_consistent(&buckets, &hasher, 1000);
    }

    #[test]
    fn colliding_elements_share_a_bucket() {
        let mut table: Table<usize> = Table::new(8);
        for i in 0..20usize {
            table.insert(NoHasher.hash_one(&i), i);
        }
        // All of them collide into bucket zero and still behave as a set.
        for i in 0..20usize {
            assert!(table.contains(NoHasher.hash_one(&i), &i));
        }
        table.assert_consistent(&NoHasher, 20);
    }

    #[test]
    fn removal_within_collisions_keeps_the_rest() {
        let mut table: Table<usize> = Table::new(4);
        for i in 0..10usize {
            table.insert(NoHasher.hash_one(&i), i);
        }
        assert!(table.remove(NoHasher.hash_one(&3usize), &3));
        assert!(!table.contains(NoHasher.hash_one(&3usize), &3));
        for i in (0..10usize).filter(|&i| i != 3) {
            assert!(table.contains(NoHasher.hash_one(&i), &i));
        }
        table.assert_consistent(&NoHasher, 9);
    }
}
