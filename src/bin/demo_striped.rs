//! Demo driving the striped set through the concurrent workload.

use std::process;

use lockgrain::{workload, StripedSet};

fn main() {
    process::exit(workload::concurrent_demo(StripedSet::<usize>::new));
}
