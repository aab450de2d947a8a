use consensus_core::errors::{ConsensusError, RejectCode};
use consensus_core::Hash;
use serde::{Deserialize, Serialize};

/// Which stateless checks a validation pass runs. Everything is on by default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckFlags {
    pub check_pow: bool,
    pub check_merkle_root: bool,
    pub check_signature: bool,
    pub check_difficulty: bool,
}

impl CheckFlags {
    pub fn all() -> Self {
        Self { check_pow: true, check_merkle_root: true, check_signature: true, check_difficulty: true }
    }

    pub fn with_signature(mut self, check_signature: bool) -> Self {
        self.check_signature = check_signature;
        self
    }
}

impl Default for CheckFlags {
    fn default() -> Self {
        Self::all()
    }
}

/// Outcome of one block submission, as reported back to its source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResult {
    pub hash: Hash,
    pub accepted: bool,
    pub reject_code: Option<RejectCode>,
    pub reject_reason: Option<String>,
}

impl SubmitResult {
    pub fn accepted(hash: Hash) -> Self {
        Self { hash, accepted: true, reject_code: None, reject_reason: None }
    }

    pub fn rejected(hash: Hash, err: &ConsensusError) -> Self {
        Self {
            hash,
            accepted: false,
            reject_code: Some(err.reject_code()),
            reject_reason: Some(err.reject_reason().to_string()),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        self.reject_reason.as_deref()
    }
}
