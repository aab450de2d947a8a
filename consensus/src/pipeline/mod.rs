//! Block ingestion and the query surface over the chain state.

pub mod block_processor;

pub use block_processor::Consensus;
