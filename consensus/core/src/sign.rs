//! ECDSA over secp256k1 for input scripts and block signatures.

use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};

use crate::block::Block;
use crate::errors::ConsensusError;
use crate::script::ScriptClass;
use crate::Hash;

/// Compressed public key length
pub const PUBLIC_KEY_SIZE: usize = 33;
/// Uncompressed public key length
pub const UNCOMPRESSED_PUBLIC_KEY_SIZE: usize = 65;

/// Verifies a DER signature over a 32-byte message. High-S signatures are normalized first.
pub fn verify_signature(public_key: &[u8], message: &Hash, der_signature: &[u8]) -> bool {
    let Ok(public_key) = PublicKey::from_slice(public_key) else {
        return false;
    };
    let Ok(mut signature) = Signature::from_der(der_signature) else {
        return false;
    };
    let Ok(message) = Message::from_slice(message.as_bytes()) else {
        return false;
    };
    signature.normalize_s();
    Secp256k1::verification_only().verify_ecdsa(&message, &signature, &public_key).is_ok()
}

/// DER signature of `message` under `secret_key`.
pub fn sign_hash(secret_key: &SecretKey, message: &Hash) -> Result<Vec<u8>, ConsensusError> {
    let message = Message::from_slice(message.as_bytes()).map_err(|e| ConsensusError::Signing(e.to_string()))?;
    let signature = Secp256k1::signing_only().sign_ecdsa(&message, secret_key);
    Ok(signature.serialize_der().to_vec())
}

/// Key a block must be signed with: the pay-to-pubkey key of the coinbase's second output.
pub fn block_signing_key(block: &Block) -> Option<Vec<u8>> {
    let coinbase = block.transactions.first()?;
    match coinbase.outputs.get(1)?.script_public_key.classify() {
        ScriptClass::PayToPubKey(pk) => Some(pk),
        _ => None,
    }
}

/// Blocks whose coinbase pays a public key must carry a signature by that key over the block hash.
pub fn check_block_signature(block: &Block) -> Result<(), ConsensusError> {
    match block_signing_key(block) {
        None => Ok(()),
        Some(pk) if verify_signature(&pk, &block.hash(), &block.signature) => Ok(()),
        Some(_) => Err(ConsensusError::BadBlockSignature),
    }
}

/// Sign `block` in place with `secret_key`.
pub fn sign_block(block: &mut Block, secret_key: &SecretKey) -> Result<(), ConsensusError> {
    block.signature = sign_hash(secret_key, &block.hash())?;
    Ok(())
}

/// Compressed public key of `secret_key`.
pub fn public_key_bytes(secret_key: &SecretKey) -> [u8; PUBLIC_KEY_SIZE] {
    PublicKey::from_secret_key(&Secp256k1::signing_only(), secret_key).serialize()
}

/// Uncompressed public key of `secret_key`.
pub fn uncompressed_public_key_bytes(secret_key: &SecretKey) -> [u8; UNCOMPRESSED_PUBLIC_KEY_SIZE] {
    PublicKey::from_secret_key(&Secp256k1::signing_only(), secret_key).serialize_uncompressed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_hashes::sha256;

    fn key(seed: &[u8]) -> SecretKey {
        SecretKey::from_slice(sha256(seed).as_bytes()).unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let sk = key(b"alice");
        let pk = public_key_bytes(&sk);
        let msg = sha256(b"message");
        let sig = sign_hash(&sk, &msg).unwrap();
        assert!(verify_signature(&pk, &msg, &sig));
        assert!(!verify_signature(&pk, &sha256(b"other"), &sig));
        assert!(!verify_signature(&public_key_bytes(&key(b"bob")), &msg, &sig));
        assert!(verify_signature(&uncompressed_public_key_bytes(&sk), &msg, &sig));
    }

    #[test]
    fn test_garbage_inputs_fail() {
        let pk = public_key_bytes(&key(b"alice"));
        assert!(!verify_signature(&pk, &Hash::zeroed(), &[]));
        assert!(!verify_signature(&[0u8; 33], &Hash::zeroed(), &[0x30, 0x00]));
    }
}
