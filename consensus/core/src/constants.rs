/// Current block version
pub const BLOCK_VERSION: u16 = 1;

/// Base units per coin
pub const COIN: u64 = 100_000_000;

/// Number of blocks used for median time past
pub const MEDIAN_TIME_SPAN: usize = 11;

/// Maximum forward skew of a header timestamp against the adjusted clock (2 hours)
pub const MAX_FUTURE_BLOCK_TIME: u64 = 2 * 60 * 60;

/// Maximum forward skew of a transaction time against the adjusted clock.
/// Zero: no transaction may be dated after the node's adjusted now.
pub const MAX_FUTURE_TX_DRIFT: u64 = 0;

/// Confirmations required before a coinbase output can be spent
pub const COINBASE_MATURITY: u64 = 100;
