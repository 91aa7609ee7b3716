//! Fee Estimator
//!
//! Size-based flat fee: `(inputs*180 + outputs*34 + 10)` estimated bytes at
//! 150 lanoshi per byte (a base rate of 100 with a 1.5x margin). The
//! arithmetic is exact integer math.

/// Estimated bytes per signed P2PKH input (uncompressed key)
pub const INPUT_SIZE: u64 = 180;
pub const OUTPUT_SIZE: u64 = 34;
/// Version, time, counts and locktime
pub const TX_OVERHEAD: u64 = 10;
/// Base rate 100 with the 1.5x safety margin applied
pub const FEE_PER_BYTE: u64 = 150;

/// Consolidation fees are sized for one payment plus one change output
pub const CONSOLIDATION_OUTPUTS: usize = 2;

pub fn estimate_size(inputs: usize, outputs: usize) -> u64 {
    (inputs as u64)
        .saturating_mul(INPUT_SIZE)
        .saturating_add((outputs as u64).saturating_mul(OUTPUT_SIZE))
        .saturating_add(TX_OVERHEAD)
}

pub fn estimate_fee(inputs: usize, outputs: usize) -> u64 {
    estimate_size(inputs, outputs).saturating_mul(FEE_PER_BYTE)
}

pub fn consolidation_fee(inputs: usize) -> u64 {
    estimate_fee(inputs, CONSOLIDATION_OUTPUTS)
}
