use serde::{Deserialize, Serialize};

/// Validation state of a block index entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockStatus {
    /// Header known and checked, body not yet validated
    HeaderOnly,
    /// Fully validated, not on the active chain
    Valid,
    /// Part of the active chain
    Connected,
    /// Failed validation, or descends from a block that did
    Invalid,
}

impl BlockStatus {
    pub fn is_invalid(self) -> bool {
        self == Self::Invalid
    }

    /// Eligible to become part of the active chain.
    pub fn is_valid_or_connected(self) -> bool {
        matches!(self, Self::Valid | Self::Connected)
    }
}
