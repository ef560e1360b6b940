//! Demo driving the sequential baseline: fill, then drain key by key.

use std::process;

use lockgrain::{workload, SequentialSet};

fn main() {
    process::exit(workload::sequential_demo(SequentialSet::<usize>::new));
}
