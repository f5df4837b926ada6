//! Numeric helpers shared by the fee, adapter and router crates.

pub mod math;
pub mod units;
