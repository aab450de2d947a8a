//! Chain core of a multi-algorithm proof-of-work node.
//!
//! Candidate blocks are validated, indexed into a tree of headers, and the heaviest valid branch
//! is kept connected to the UTXO ledger. Every connect, disconnect and reorganization is reported
//! to observers in one global order.

pub mod chain_index;
pub mod clock;
pub mod errors;
pub mod executor;
pub mod notify;
pub mod pipeline;
pub mod reorg;
pub mod types;
pub mod validation;

pub use chain_index::{BlockIndexEntry, ChainIndex};
pub use clock::{Clock, FixedClock, SystemClock};
pub use consensus_core::Hash;
pub use errors::{ChainError, ChainResult};
pub use executor::Executor;
pub use notify::{ChainEvent, ChainObserver, Dispatcher, SubscriptionId};
pub use pipeline::Consensus;
pub use reorg::{activate_best_chain, Activation};
pub use types::{CheckFlags, SubmitResult};
pub use validation::{BlockValidator, ContextualValidator, HeaderValidator, TransactionValidator};
