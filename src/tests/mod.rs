//! Crate-internal tests exercising all the variants together.

mod acts_like_set;
mod compile_fail;
