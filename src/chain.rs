// Lanacoin network parameters
// Legacy P2PKH only, uncompressed keys, timestamp-bearing transactions.

/// WIF private key prefix
pub const WIF_VERSION: u8 = 0xb0;
/// P2PKH address prefix ('L')
pub const ADDRESS_VERSION: u8 = 0x30;

/// Transaction header version
pub const TX_VERSION: u32 = 1;
/// Every input is final
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;
pub const LOCK_TIME: u32 = 0;
pub const SIGHASH_ALL: u8 = 0x01;

/// Outputs below this value (in lanoshi) are dust
pub const DUST_THRESHOLD: u64 = 10_000;
/// Change is only emitted when the remainder is strictly above this
pub const MIN_CHANGE: u64 = 1_000;

/// Upper bound on inputs per consolidation batch
pub const MAX_BATCH_SIZE: usize = 30;
/// Largest outputs listed in an analysis report
pub const TOP_UTXO_COUNT: usize = 20;

pub const MIN_ADDRESS_LEN: usize = 26;
pub const MAX_ADDRESS_LEN: usize = 35;
