//! Output locking scripts.
//!
//! Only two templates are spendable: pay-to-pubkey (`<33 or 65-byte key> OP_CHECKSIG`), unlocked
//! by a DER signature over the input's sighash, and the single-opcode `OP_TRUE` script that
//! anyone can spend. Everything else, including `OP_RETURN` data carriers, is unspendable.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

use crate::hashing;
use crate::sign::{verify_signature, PUBLIC_KEY_SIZE, UNCOMPRESSED_PUBLIC_KEY_SIZE};
use crate::tx::Transaction;

pub const OP_TRUE: u8 = 0x51;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_CHECKSIG: u8 = 0xac;
/// Push of the next 33 bytes, a compressed key
pub const OP_PUSH_33: u8 = 0x21;
/// Push of the next 65 bytes, an uncompressed key
pub const OP_PUSH_65: u8 = 0x41;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptClass {
    /// Serialized key, compressed or uncompressed
    PayToPubKey(Vec<u8>),
    AnyoneCanSpend,
    Unspendable,
}

#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScriptPublicKey {
    script: Vec<u8>,
}

impl ScriptPublicKey {
    pub fn from_vec(script: Vec<u8>) -> Self {
        Self { script }
    }

    /// `public_key` is a 33-byte compressed or 65-byte uncompressed serialization.
    pub fn pay_to_pubkey(public_key: &[u8]) -> Self {
        let mut script = Vec::with_capacity(public_key.len() + 2);
        script.push(public_key.len() as u8);
        script.extend_from_slice(public_key);
        script.push(OP_CHECKSIG);
        Self { script }
    }

    pub fn anyone_can_spend() -> Self {
        Self { script: vec![OP_TRUE] }
    }

    /// Provably unspendable output carrying `data`.
    pub fn data_carrier(data: &[u8]) -> Self {
        let mut script = vec![OP_RETURN];
        script.extend_from_slice(data);
        Self { script }
    }

    pub fn script(&self) -> &[u8] {
        &self.script
    }

    pub fn classify(&self) -> ScriptClass {
        match self.script.as_slice() {
            [OP_TRUE] => ScriptClass::AnyoneCanSpend,
            [OP_PUSH_33, key @ .., OP_CHECKSIG] if key.len() == PUBLIC_KEY_SIZE => ScriptClass::PayToPubKey(key.to_vec()),
            [OP_PUSH_65, key @ .., OP_CHECKSIG] if key.len() == UNCOMPRESSED_PUBLIC_KEY_SIZE => {
                ScriptClass::PayToPubKey(key.to_vec())
            }
            _ => ScriptClass::Unspendable,
        }
    }

    /// Outputs locked by this script can never be spent and stay out of the UTXO set.
    pub fn is_unspendable(&self) -> bool {
        self.classify() == ScriptClass::Unspendable
    }

    /// Embedded public key if this is a pay-to-pubkey script.
    pub fn pubkey(&self) -> Option<Vec<u8>> {
        match self.classify() {
            ScriptClass::PayToPubKey(pk) => Some(pk),
            _ => None,
        }
    }
}

impl Debug for ScriptPublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScriptPublicKey({})", hex::encode(&self.script))
    }
}

/// Checks that input `input_index` of `tx` unlocks an output locked by `spent_script`.
pub fn verify_input(tx: &Transaction, input_index: usize, spent_script: &ScriptPublicKey) -> bool {
    let Some(input) = tx.inputs.get(input_index) else {
        return false;
    };
    match spent_script.classify() {
        ScriptClass::AnyoneCanSpend => true,
        ScriptClass::PayToPubKey(pk) => {
            let message = hashing::tx::sig_hash(tx, input_index, spent_script);
            verify_signature(&pk, &message, &input.signature_script)
        }
        ScriptClass::Unspendable => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_templates() {
        let pk = [2u8; PUBLIC_KEY_SIZE];
        assert_eq!(ScriptPublicKey::pay_to_pubkey(&pk).classify(), ScriptClass::PayToPubKey(pk.to_vec()));
        let long = [4u8; UNCOMPRESSED_PUBLIC_KEY_SIZE];
        assert_eq!(ScriptPublicKey::pay_to_pubkey(&long).script()[0], OP_PUSH_65);
        assert_eq!(ScriptPublicKey::pay_to_pubkey(&long).classify(), ScriptClass::PayToPubKey(long.to_vec()));
        assert_eq!(ScriptPublicKey::anyone_can_spend().classify(), ScriptClass::AnyoneCanSpend);
        assert_eq!(ScriptPublicKey::data_carrier(b"hello").classify(), ScriptClass::Unspendable);
        assert_eq!(ScriptPublicKey::from_vec(vec![OP_TRUE, OP_TRUE]).classify(), ScriptClass::Unspendable);
        assert_eq!(ScriptPublicKey::default().classify(), ScriptClass::Unspendable);
    }

    #[test]
    fn test_truncated_p2pk_is_not_a_key() {
        let mut script = ScriptPublicKey::pay_to_pubkey(&[3u8; PUBLIC_KEY_SIZE]).script().to_vec();
        script.remove(5);
        assert_eq!(ScriptPublicKey::from_vec(script).pubkey(), None);

        // 65-byte push carrying only 33 bytes
        let mut script = vec![OP_PUSH_65];
        script.extend_from_slice(&[3u8; PUBLIC_KEY_SIZE]);
        script.push(OP_CHECKSIG);
        assert_eq!(ScriptPublicKey::from_vec(script).pubkey(), None);
    }
}
