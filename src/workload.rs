//! The mixed workload and demo plumbing shared by the benchmark binaries.
//!
//! Every demo binary drives the same scenario so the variants can be
//! compared on equal footing: `T` workers, each covering a key range that
//! overlaps its neighbour's by one chunk, hammering insert/contains/remove
//! and finally restoring every key. After the join the set must hold exactly
//! the union of the ranges ‒ any lost update, duplicated key or torn resize
//! shows up as a size or membership mismatch.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::{Duration, Instant};

use crossbeam_utils::thread;

use crate::ConcurrentSet;

/// How many contains-and-remove passes each worker makes over its range.
const PASSES: usize = 20;

/// Keys divisible by this get removed during the passes (and re-inserted by
/// the final sweep).
const REMOVE_DIVISOR: usize = 20;

/// The per-thread workload.
///
/// Worker `id` covers `[id * chunk_size, id * chunk_size + 2 * chunk_size)`;
/// neighbouring ranges overlap by one chunk, so the union over `T` workers
/// is `[0, (T + 1) * chunk_size)` and every inner key is fought over by two
/// threads.
fn worker<S>(set: &S, chunk_size: usize, id: usize)
where
    S: ConcurrentSet<usize>,
{
    let base = id * chunk_size;
    for k in 0..2 * chunk_size {
        set.insert(base + k);
    }
    for _ in 0..PASSES {
        for k in 0..2 * chunk_size {
            let elem = base + k;
            if set.contains(&elem) && elem % REMOVE_DIVISOR == 0 {
                set.remove(&elem);
            }
        }
    }
    for k in 0..2 * chunk_size {
        set.insert(base + k);
    }
}

/// Runs the workload with `num_threads` workers and returns the wall time.
pub fn run<S>(set: &S, num_threads: usize, chunk_size: usize) -> Duration
where
    S: ConcurrentSet<usize> + Sync,
{
    let start = Instant::now();
    thread::scope(|s| {
        for id in 0..num_threads {
            s.spawn(move |_| worker(set, chunk_size, id));
        }
    })
    .unwrap();
    start.elapsed()
}

/// The number of distinct keys the workload leaves behind.
///
/// `chunk_size * (num_threads + 1)`, from the one-chunk overlap between
/// neighbouring workers ‒ except that without workers nothing is inserted at
/// all.
pub fn expected_size(num_threads: usize, chunk_size: usize) -> usize {
    if num_threads == 0 {
        0
    } else {
        chunk_size * (num_threads + 1)
    }
}

/// What the final verification found wrong.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Mismatch {
    /// The final size differs from [`expected_size`].
    Size {
        /// What the set reported.
        actual: usize,
        /// What the workload should have left behind.
        expected: usize,
    },
    /// A key the workload re-inserted is gone.
    Missing {
        /// The missing key.
        elem: usize,
    },
}

impl Display for Mismatch {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Mismatch::Size { actual, expected } => {
                write!(fmt, "size {} does not match expected size {}", actual, expected)
            }
            Mismatch::Missing { elem } => write!(fmt, "expected value {} not found", elem),
        }
    }
}

/// Verifies the set after [`run`]: exact final size, then membership of
/// every key in the covered range.
pub fn check<S>(set: &S, num_threads: usize, chunk_size: usize) -> Result<(), Mismatch>
where
    S: ConcurrentSet<usize>,
{
    let expected = expected_size(num_threads, chunk_size);
    let actual = set.len();
    if actual != expected {
        return Err(Mismatch::Size { actual, expected });
    }
    for elem in 0..expected {
        if !set.contains(&elem) {
            return Err(Mismatch::Missing { elem });
        }
    }
    Ok(())
}

fn parse(args: &[String]) -> Option<Vec<usize>> {
    args.iter().map(|arg| arg.parse().ok()).collect()
}

/// The entry point shared by the concurrent demo binaries.
///
/// Parses `num_threads initial_capacity chunk_size` from the command line,
/// builds a set through `make`, runs and verifies the workload and reports.
/// Returns the process exit code: zero on success, non-zero with a
/// single-line diagnostic on stderr otherwise.
pub fn concurrent_demo<S, F>(make: F) -> i32
where
    S: ConcurrentSet<usize> + Sync,
    F: FnOnce(usize) -> S,
{
    let args: Vec<String> = env::args().collect();
    let name = args.first().map(String::as_str).unwrap_or("demo").to_owned();
    let values = parse(args.get(1..).unwrap_or(&[])).unwrap_or_default();
    let &[num_threads, initial_capacity, chunk_size] = &values[..] else {
        eprintln!("Usage: {} num_threads initial_capacity chunk_size", name);
        return 1;
    };
    if initial_capacity == 0 {
        eprintln!("{} failed: initial_capacity must be positive", name);
        return 1;
    }

    let set = make(initial_capacity);
    let elapsed = run(&set, num_threads, chunk_size);

    if let Err(mismatch) = check(&set, num_threads, chunk_size) {
        eprintln!("{} failed: {}", name, mismatch);
        return 1;
    }

    println!("{} succeeded", name);
    println!("Concurrent computation took:");
    println!("  {} ms", elapsed.as_millis());
    0
}

/// The entry point of the sequential demo binary.
///
/// Parses `initial_capacity count`, fills the set, then drains it key by
/// key, checking the size at every step on the way down.
pub fn sequential_demo<S, F>(make: F) -> i32
where
    S: ConcurrentSet<usize>,
    F: FnOnce(usize) -> S,
{
    let args: Vec<String> = env::args().collect();
    let name = args.first().map(String::as_str).unwrap_or("demo").to_owned();
    let values = parse(args.get(1..).unwrap_or(&[])).unwrap_or_default();
    let &[initial_capacity, count] = &values[..] else {
        eprintln!("Usage: {} initial_capacity count", name);
        return 1;
    };
    if initial_capacity == 0 {
        eprintln!("{} failed: initial_capacity must be positive", name);
        return 1;
    }

    let set = make(initial_capacity);
    for i in 0..count {
        set.insert(i);
    }
    if set.len() != count {
        eprintln!(
            "{} failed: size {} does not match expected size {}",
            name,
            set.len(),
            count
        );
        return 1;
    }
    for i in 0..count {
        if set.len() != count - i {
            eprintln!(
                "{} failed: size {} does not match expected size {}",
                name,
                set.len(),
                count - i
            );
            return 1;
        }
        if !set.contains(&i) {
            eprintln!("{} failed: expected value {} not found", name, i);
            return 1;
        }
        set.remove(&i);
    }
    if !set.is_empty() {
        eprintln!(
            "{} failed: expected empty set, got set with size {}",
            name,
            set.len()
        );
        return 1;
    }

    println!("{} succeeded", name);
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CoarseSet, RefinableSet, StripedSet};

    #[test]
    fn expected_size_counts_the_overlap() {
        assert_eq!(900, expected_size(8, 100));
        assert_eq!(20, expected_size(1, 10));
        // No workers, no keys ‒ the overlap formula has no meaning then.
        assert_eq!(0, expected_size(0, 100));
    }

    #[test]
    fn mismatches_render_as_one_line() {
        let size = Mismatch::Size {
            actual: 899,
            expected: 900,
        };
        assert_eq!("size 899 does not match expected size 900", size.to_string());
        let missing = Mismatch::Missing { elem: 42 };
        assert_eq!("expected value 42 not found", missing.to_string());
    }

    #[test]
    fn workload_settles_on_every_variant() {
        let coarse = CoarseSet::new(4);
        run(&coarse, 2, 50);
        assert_eq!(Ok(()), check(&coarse, 2, 50));

        let striped = StripedSet::new(4);
        run(&striped, 2, 50);
        assert_eq!(Ok(()), check(&striped, 2, 50));

        let refinable = RefinableSet::new(4);
        run(&refinable, 2, 50);
        assert_eq!(Ok(()), check(&refinable, 2, 50));
    }

    #[test]
    fn check_reports_a_missing_key() {
        let set = CoarseSet::new(4);
        run(&set, 2, 10);
        set.remove(&15);
        let err = check(&set, 2, 10).unwrap_err();
        assert!(matches!(err, Mismatch::Size { actual: 29, .. }));
    }
}
