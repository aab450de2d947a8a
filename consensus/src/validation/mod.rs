//! Validation of candidate blocks.
//!
//! - [`BlockValidator`]: stateless checks, safe to run without the chain lock
//! - [`HeaderValidator`]: header rules, with and without the parent entry
//! - [`TransactionValidator`]: input checks against a UTXO view
//! - [`ContextualValidator`]: a whole body against the ledger of its parent
//!
//! Validators only read chain state. Recording verdicts is up to the caller.

pub mod block_validator;
pub mod contextual;
pub mod header_validator;
pub mod transaction_validator;

pub use block_validator::BlockValidator;
pub use contextual::ContextualValidator;
pub use header_validator::HeaderValidator;
pub use transaction_validator::TransactionValidator;
