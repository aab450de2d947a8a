//!
//! # Transaction
//!
//! Consensus [`Transaction`] structure and the outpoint/UTXO types it references.
//!

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Debug, Display};

use crate::errors::ConsensusError;
use crate::script::ScriptPublicKey;
use crate::{hashing, BlockHeight, Hash};

/// COINBASE_TRANSACTION_INDEX is the index of the coinbase transaction in every block
pub const COINBASE_TRANSACTION_INDEX: usize = 0;
/// A 32-byte transaction identifier.
pub type TransactionId = Hash;

/// Output reference. The null outpoint marks a coinbase input.
#[derive(Eq, Default, Hash, PartialEq, Debug, Copy, Clone, Serialize, Deserialize, PartialOrd, Ord)]
pub struct TransactionOutpoint {
    pub transaction_id: TransactionId,
    pub index: u32,
}

impl TransactionOutpoint {
    pub fn new(transaction_id: TransactionId, index: u32) -> Self {
        Self { transaction_id, index }
    }

    pub fn null() -> Self {
        Self { transaction_id: Hash::zeroed(), index: u32::MAX }
    }

    pub fn is_null(&self) -> bool {
        self.index == u32::MAX && self.transaction_id.is_zero()
    }
}

impl Display for TransactionOutpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.transaction_id, self.index)
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TransactionInput {
    pub previous_outpoint: TransactionOutpoint,
    /// DER signature for pay-to-pubkey coins, height and extra nonce for a coinbase
    pub signature_script: Vec<u8>,
    pub sequence: u32,
}

impl TransactionInput {
    pub fn new(previous_outpoint: TransactionOutpoint, signature_script: Vec<u8>, sequence: u32) -> Self {
        Self { previous_outpoint, signature_script, sequence }
    }
}

impl Debug for TransactionInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionInput")
            .field("previous_outpoint", &self.previous_outpoint)
            .field("signature_script", &hex::encode(&self.signature_script))
            .field("sequence", &self.sequence)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: u64,
    pub script_public_key: ScriptPublicKey,
}

impl TransactionOutput {
    pub fn new(value: u64, script_public_key: ScriptPublicKey) -> Self {
        Self { value, script_public_key }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u16,
    /// Creation time in seconds. Bounded against the adjusted clock when a block is checked.
    pub time: u64,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn new(version: u16, time: u64, inputs: Vec<TransactionInput>, outputs: Vec<TransactionOutput>, lock_time: u32) -> Self {
        Self { version, time, inputs, outputs, lock_time }
    }

    /// Coinbase with the block height and `extra_nonce` in its signature script.
    pub fn new_coinbase(height: BlockHeight, time: u64, extra_nonce: u64, outputs: Vec<TransactionOutput>) -> Self {
        let mut script = height.to_le_bytes().to_vec();
        script.extend_from_slice(&extra_nonce.to_le_bytes());
        let input = TransactionInput::new(TransactionOutpoint::null(), script, u32::MAX);
        Self::new(1, time, vec![input], outputs, 0)
    }

    pub fn id(&self) -> TransactionId {
        hashing::tx::id(self)
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous_outpoint.is_null()
    }

    /// Sum of output values, `None` on overflow.
    pub fn total_output_value(&self) -> Option<u64> {
        self.outputs.iter().try_fold(0u64, |acc, out| acc.checked_add(out.value))
    }

    /// Context-free checks: inputs and outputs present, no value overflow, no duplicated
    /// outpoints, null outpoints only in a coinbase.
    pub fn check_sanity(&self) -> Result<(), ConsensusError> {
        let id = self.id();
        if self.inputs.is_empty() {
            return Err(ConsensusError::NoInputs(id));
        }
        if self.outputs.is_empty() {
            return Err(ConsensusError::NoOutputs(id));
        }
        if self.total_output_value().is_none() {
            return Err(ConsensusError::OutputValueOverflow(id));
        }

        let mut seen = HashSet::with_capacity(self.inputs.len());
        for input in &self.inputs {
            if !seen.insert(input.previous_outpoint) {
                return Err(ConsensusError::DuplicateInput(id));
            }
        }

        if self.is_coinbase() {
            let len = self.inputs[0].signature_script.len();
            if !(2..=100).contains(&len) {
                return Err(ConsensusError::BadCoinbaseLength(len));
            }
        } else if self.inputs.iter().any(|input| input.previous_outpoint.is_null()) {
            return Err(ConsensusError::NullPrevout(id));
        }
        Ok(())
    }

    /// Outpoints created by this transaction, in output order.
    pub fn created_outpoints(&self) -> impl Iterator<Item = TransactionOutpoint> + '_ {
        let id = self.id();
        (0..self.outputs.len() as u32).map(move |index| TransactionOutpoint::new(id, index))
    }
}

/// Unspent output together with the facts needed to spend it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoEntry {
    pub amount: u64,
    pub script_public_key: ScriptPublicKey,
    pub block_height: BlockHeight,
    pub is_coinbase: bool,
}

impl UtxoEntry {
    pub fn new(amount: u64, script_public_key: ScriptPublicKey, block_height: BlockHeight, is_coinbase: bool) -> Self {
        Self { amount, script_public_key, block_height, is_coinbase }
    }
}
