use thiserror::Error;

use crate::tx::TransactionOutpoint;
use crate::Hash;

/// Reject codes reported to the submitter, same numbering as the legacy p2p `reject` message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum RejectCode {
    Malformed = 0x01,
    Invalid = 0x10,
    Obsolete = 0x11,
    Duplicate = 0x12,
    Nonstandard = 0x40,
    InsufficientFee = 0x42,
    Checkpoint = 0x43,
}

impl RejectCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

pub const REJECT_MALFORMED: u8 = RejectCode::Malformed as u8;
pub const REJECT_INVALID: u8 = RejectCode::Invalid as u8;
pub const REJECT_DUPLICATE: u8 = RejectCode::Duplicate as u8;

/// How a failed check affects the block index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectKind {
    /// Malformed body. Permanent once the body is known to match its header.
    Structural,
    /// Breaks a consensus rule. The block and all its descendants are invalid.
    Consensus,
    /// Fails only this submission. Nothing is recorded so a later correct copy is still processed.
    Policy,
    /// Parent unknown, nothing to attach the header to.
    Orphan,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("block has no transactions")]
    EmptyTransactionList,

    #[error("first transaction is not a coinbase")]
    MissingCoinbase,

    #[error("more than one coinbase")]
    MultipleCoinbase,

    #[error("coinbase signature script length {0} out of range")]
    BadCoinbaseLength(usize),

    #[error("transaction {0} has no inputs")]
    NoInputs(Hash),

    #[error("transaction {0} has no outputs")]
    NoOutputs(Hash),

    #[error("transaction {0} spends a null outpoint")]
    NullPrevout(Hash),

    #[error("transaction {0} output total overflows")]
    OutputValueOverflow(Hash),

    #[error("header merkle root {expected} does not match computed {computed}")]
    BadMerkleRoot { expected: Hash, computed: Hash },

    #[error("transaction list contains duplicated subtrees")]
    MutatedMerkleTree,

    #[error("block hash does not satisfy its target")]
    InvalidProofOfWork,

    #[error("difficulty bits {actual:#010x} do not match required {expected:#010x}")]
    BadDifficultyBits { expected: u32, actual: u32 },

    #[error("transaction {txid} time {time} is past the allowed limit {limit}")]
    TransactionTimeTooNew { txid: Hash, time: u64, limit: u64 },

    #[error("block time {time} is past the allowed limit {limit}")]
    BlockTimeTooNew { time: u64, limit: u64 },

    #[error("block time {time} is not after median time past {median}")]
    BlockTimeTooOld { time: u64, median: u64 },

    #[error("block signature missing or invalid for coinbase key")]
    BadBlockSignature,

    #[error("input {0} is missing or already spent")]
    MissingOrSpentInput(TransactionOutpoint),

    #[error("transaction {0} spends the same outpoint twice")]
    DuplicateInput(Hash),

    #[error("transaction {0} spends more than its inputs")]
    InputsBelowOutputs(Hash),

    #[error("input {0} fails script verification")]
    ScriptVerifyFailed(TransactionOutpoint),

    #[error("input {outpoint} spends a coinbase with {confirmations} confirmations")]
    PrematureCoinbaseSpend { outpoint: TransactionOutpoint, confirmations: u64 },

    #[error("coinbase pays {actual} but only {allowed} is allowed")]
    BadCoinbaseAmount { actual: u64, allowed: u64 },

    #[error("parent block {0} is invalid")]
    BadPrevBlock(Hash),

    #[error("parent block {0} not found")]
    PrevBlockNotFound(Hash),

    #[error("block {0} claims to be genesis but is not this network's genesis")]
    BadGenesis(Hash),

    #[error("block {0} is already known invalid")]
    DuplicateInvalid(Hash),

    #[error("algorithm {0} is not enabled on this network")]
    AlgorithmDisabled(crate::PowAlgorithm),

    #[error("unknown proof-of-work algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

impl ConsensusError {
    /// Fixed short reason string reported alongside the reject code.
    pub fn reject_reason(&self) -> &'static str {
        match self {
            Self::EmptyTransactionList => "bad-txns-empty",
            Self::MissingCoinbase => "bad-cb-missing",
            Self::MultipleCoinbase => "bad-cb-multiple",
            Self::BadCoinbaseLength(_) => "bad-cb-length",
            Self::NoInputs(_) => "bad-txns-vin-empty",
            Self::NoOutputs(_) => "bad-txns-vout-empty",
            Self::NullPrevout(_) => "bad-txns-prevout-null",
            Self::OutputValueOverflow(_) => "bad-txns-txouttotal-toolarge",
            Self::BadMerkleRoot { .. } => "bad-merkle-root",
            Self::MutatedMerkleTree => "bad-txns-duplicate",
            Self::InvalidProofOfWork => "bad-pow",
            Self::BadDifficultyBits { .. } => "bad-diffbits",
            Self::TransactionTimeTooNew { .. } => "transaction-time-too-new",
            Self::BlockTimeTooNew { .. } => "time-too-new",
            Self::BlockTimeTooOld { .. } => "time-too-old",
            Self::BadBlockSignature => "bad-blk-signature",
            Self::MissingOrSpentInput(_) => "bad-txns-inputs-missingorspent",
            Self::DuplicateInput(_) => "bad-txns-inputs-duplicate",
            Self::InputsBelowOutputs(_) => "bad-txns-in-belowout",
            Self::ScriptVerifyFailed(_) => "bad-script-verify",
            Self::PrematureCoinbaseSpend { .. } => "bad-txns-premature-spend-of-coinbase",
            Self::BadCoinbaseAmount { .. } => "bad-cb-amount",
            Self::BadPrevBlock(_) => "bad-prevblk",
            Self::PrevBlockNotFound(_) => "prev-blk-not-found",
            Self::BadGenesis(_) => "bad-genesis",
            Self::DuplicateInvalid(_) => "duplicate-invalid",
            Self::AlgorithmDisabled(_) | Self::UnknownAlgorithm(_) => "bad-algo",
            Self::Signing(_) => "signing-failed",
        }
    }

    pub fn reject_code(&self) -> RejectCode {
        match self {
            Self::DuplicateInvalid(_) => RejectCode::Duplicate,
            _ => RejectCode::Invalid,
        }
    }

    pub fn kind(&self) -> RejectKind {
        match self {
            Self::EmptyTransactionList
            | Self::MissingCoinbase
            | Self::MultipleCoinbase
            | Self::BadCoinbaseLength(_)
            | Self::NoInputs(_)
            | Self::NoOutputs(_)
            | Self::NullPrevout(_)
            | Self::OutputValueOverflow(_)
            | Self::BadMerkleRoot { .. }
            | Self::MutatedMerkleTree => RejectKind::Structural,
            Self::TransactionTimeTooNew { .. }
            | Self::BlockTimeTooNew { .. }
            | Self::BadBlockSignature
            | Self::DuplicateInvalid(_)
            | Self::UnknownAlgorithm(_)
            | Self::Signing(_) => RejectKind::Policy,
            Self::PrevBlockNotFound(_) => RejectKind::Orphan,
            _ => RejectKind::Consensus,
        }
    }
}

pub type ConsensusResult<T> = Result<T, ConsensusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_reasons_and_kinds() {
        let err = ConsensusError::TransactionTimeTooNew { txid: Hash::zeroed(), time: 11, limit: 10 };
        assert_eq!(err.reject_reason(), "transaction-time-too-new");
        assert_eq!(err.kind(), RejectKind::Policy);
        assert_eq!(err.reject_code().as_u8(), REJECT_INVALID);

        assert_eq!(ConsensusError::InvalidProofOfWork.kind(), RejectKind::Consensus);
        assert_eq!(ConsensusError::EmptyTransactionList.kind(), RejectKind::Structural);
        assert_eq!(ConsensusError::PrevBlockNotFound(Hash::zeroed()).reject_reason(), "prev-blk-not-found");
        assert_eq!(ConsensusError::DuplicateInvalid(Hash::zeroed()).reject_code(), RejectCode::Duplicate);
    }
}
