use std::collections::hash_map::RandomState;
use std::collections::HashSet;
use std::hash::{BuildHasher, Hash};

use proptest::collection::vec;
use proptest::prelude::*;
use rayon::prelude::*;

use crate::raw::tests::NoHasher;
use crate::{CoarseSet, ConcurrentSet, RefinableSet, StripedSet};

fn insert_parallel_test<T, S, H, F>(
    make: F,
    values: Vec<T>,
    hasher: H,
) -> Result<(), TestCaseError>
where
    T: Clone + Hash + Eq + Send + Sync,
    S: ConcurrentSet<T> + Sync,
    H: BuildHasher,
    F: FnOnce(usize, H) -> S,
{
    let expected: HashSet<T> = values.iter().cloned().collect();
    let set = make(4, hasher);
    values.into_par_iter().for_each(|v| {
        set.insert(v);
    });
    prop_assert_eq!(expected.len(), set.len());
    for v in expected {
        prop_assert!(set.contains(&v));
    }

    Ok(())
}

fn remove_parallel_test<T, S, H, F>(
    make: F,
    values: Vec<T>,
    hasher: H,
) -> Result<(), TestCaseError>
where
    T: Clone + Hash + Eq + Send + Sync,
    S: ConcurrentSet<T> + Sync,
    H: BuildHasher,
    F: FnOnce(usize, H) -> S,
{
    let distinct: Vec<T> = values
        .iter()
        .cloned()
        .collect::<HashSet<T>>()
        .into_iter()
        .collect();
    let set = make(4, hasher);
    values.into_par_iter().for_each(|v| {
        set.insert(v);
    });
    // Toss every other distinct value, concurrently.
    let toss: Vec<T> = distinct.iter().step_by(2).cloned().collect();
    toss.clone().into_par_iter().for_each(|v| {
        set.remove(&v);
    });
    prop_assert_eq!(distinct.len() - toss.len(), set.len());
    for v in &toss {
        prop_assert!(!set.contains(v));
    }
    for v in distinct.iter().skip(1).step_by(2) {
        prop_assert!(set.contains(v));
    }

    Ok(())
}

#[cfg(feature = "parallel")]
#[test]
fn collect_from_parallel_iterator() {
    let set: RefinableSet<usize> = (0..1_000usize).into_par_iter().collect();
    assert_eq!(1_000, set.len());
    assert!(set.contains(&999));
}

proptest! {
    #[test]
    fn coarse_insert_all_parallel(values in vec(any::<u16>(), 1..2_000)) {
        insert_parallel_test(CoarseSet::with_hasher, values, RandomState::default())?;
    }

    #[test]
    fn striped_insert_all_parallel(values in vec(any::<u16>(), 1..2_000)) {
        insert_parallel_test(StripedSet::with_hasher, values, RandomState::default())?;
    }

    #[test]
    fn refinable_insert_all_parallel(values in vec(any::<u16>(), 1..2_000)) {
        insert_parallel_test(RefinableSet::with_hasher, values, RandomState::default())?;
    }

    // The small universe forces plenty of duplicate insert attempts.
    #[test]
    fn striped_insert_all_parallel_small(values in vec(any::<u8>(), 1..2_000)) {
        insert_parallel_test(StripedSet::with_hasher, values, RandomState::default())?;
    }

    // Everything collides; the sets degenerate into one long bucket and must
    // still behave.
    #[test]
    fn striped_insert_all_parallel_collisions(values in vec(any::<u16>(), 1..300)) {
        insert_parallel_test(StripedSet::with_hasher, values, NoHasher)?;
    }

    #[test]
    fn refinable_insert_all_parallel_collisions(values in vec(any::<u16>(), 1..300)) {
        insert_parallel_test(RefinableSet::with_hasher, values, NoHasher)?;
    }

    #[test]
    fn coarse_remove_parallel(values in vec(any::<u16>(), 1..1_000)) {
        remove_parallel_test(CoarseSet::with_hasher, values, RandomState::default())?;
    }

    #[test]
    fn striped_remove_parallel(values in vec(any::<u16>(), 1..1_000)) {
        remove_parallel_test(StripedSet::with_hasher, values, RandomState::default())?;
    }

    #[test]
    fn refinable_remove_parallel(values in vec(any::<u16>(), 1..1_000)) {
        remove_parallel_test(RefinableSet::with_hasher, values, RandomState::default())?;
    }
}
