use consensus_core::errors::ConsensusError;
use database::DbError;
use thiserror::Error;

/// Failures of the chain core that are not plain validation verdicts.
#[derive(Error, Debug)]
pub enum ChainError {
    /// The store could not read or commit. Chain state was rolled back before this surfaced.
    #[error("storage failure: {0}")]
    Storage(#[from] DbError),

    /// Broken internal invariant, such as a missing index entry or undo record.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("rejected: {0}")]
    Rejected(#[from] ConsensusError),
}

impl ChainError {
    pub fn as_rejection(&self) -> Option<&ConsensusError> {
        match self {
            Self::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

pub type ChainResult<T> = Result<T, ChainError>;
