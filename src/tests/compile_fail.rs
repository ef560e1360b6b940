#![allow(dead_code)] // Allow the unused structs

//! Compile fail tests
//!
//! Implemented in a minimal way, as doc tests in a hidden module.

/// The sequential baseline must never make it into a multi-threaded
/// workload; its interior mutability is unsynchronized.
///
/// ```compile_fail
/// use crossbeam_utils::thread;
/// use lockgrain::SequentialSet;
///
/// let set: SequentialSet<usize> = SequentialSet::new(4);
///
/// thread::scope(|s| {
///     s.spawn(|_| {
///         set.insert(1);
///     });
/// }).unwrap();
/// ```
///
/// The same sharing is fine with any of the locked variants, though.
///
/// ```
/// use crossbeam_utils::thread;
/// use lockgrain::CoarseSet;
///
/// let set: CoarseSet<usize> = CoarseSet::new(4);
///
/// thread::scope(|s| {
///     s.spawn(|_| {
///         set.insert(1);
///     });
/// }).unwrap();
/// ```
struct SequentialShouldNotSync;

/// A set of non-`Send` elements cannot move between threads.
///
/// ```compile_fail
/// use std::rc::Rc;
///
/// use crossbeam_utils::thread;
/// use lockgrain::RefinableSet;
///
/// let set: RefinableSet<Rc<usize>> = RefinableSet::new(4);
///
/// thread::scope(|s| {
///     s.spawn(|_| {
///         drop(set);
///     });
/// }).unwrap();
/// ```
///
/// Similar one, but with Arc should work fine, though.
///
/// ```
/// use std::sync::Arc;
///
/// use crossbeam_utils::thread;
/// use lockgrain::RefinableSet;
///
/// let set: RefinableSet<Arc<usize>> = RefinableSet::new(4);
///
/// thread::scope(|s| {
///     s.spawn(|_| {
///         drop(set);
///     });
/// }).unwrap();
/// ```
struct RcElementsShouldNotBeSend;
