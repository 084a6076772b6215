pub mod features;
pub mod indicators;

#[cfg(test)]
mod indicators_tests;

pub use features::*;
pub use indicators::*;
