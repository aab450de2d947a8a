//! Consensus serialization for hashing.
//!
//! These byte layouts are part of consensus: every node must produce identical digests.

pub mod header;
pub mod tx;
