//! Fee Estimation Module
//!
//! Flat size-based fees for legacy P2PKH transactions.

mod estimator;

pub use estimator::*;
