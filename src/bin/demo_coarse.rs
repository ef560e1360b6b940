//! Demo driving the coarse-grained set through the concurrent workload.

use std::process;

use lockgrain::{workload, CoarseSet};

fn main() {
    process::exit(workload::concurrent_demo(CoarseSet::<usize>::new));
}
