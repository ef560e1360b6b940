//! Demo driving the refinable set through the concurrent workload.

use std::process;

use lockgrain::{workload, RefinableSet};

fn main() {
    process::exit(workload::concurrent_demo(RefinableSet::<usize>::new));
}
