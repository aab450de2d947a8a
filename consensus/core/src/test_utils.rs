//! Helpers for building, mining and signing blocks in tests.
//!
//! Enabled inside this crate's tests and, for dependent crates, through the `test-utils` feature.

use secp256k1::SecretKey;

use crate::block::Block;
use crate::config::Params;
use crate::header::Header;
use crate::script::ScriptPublicKey;
use crate::sign::{public_key_bytes, sign_block, sign_hash, uncompressed_public_key_bytes};
use crate::tx::{Transaction, TransactionInput, TransactionOutpoint, TransactionOutput};
use crate::constants::BLOCK_VERSION;
use crate::{hashing, BlockHeight, PowAlgorithm};

/// Deterministic secret key derived from `seed`.
pub fn secret_key(seed: &str) -> SecretKey {
    SecretKey::from_slice(crypto_hashes::sha256(seed.as_bytes()).as_bytes()).expect("sha256 output is a valid key")
}

pub fn p2pk_script(key: &SecretKey) -> ScriptPublicKey {
    ScriptPublicKey::pay_to_pubkey(&public_key_bytes(key))
}

pub fn p2pk_uncompressed_script(key: &SecretKey) -> ScriptPublicKey {
    ScriptPublicKey::pay_to_pubkey(&uncompressed_public_key_bytes(key))
}

/// Increments the nonce until the header meets its own target.
pub fn mine(header: &mut Header) {
    let target = chain_math::target_from_compact(header.bits).expect("test headers carry valid bits");
    while header.pow_value() > target {
        header.nonce += 1;
    }
}

/// Increments the nonce until the header fails its own target.
pub fn unmine(header: &mut Header) {
    let target = chain_math::target_from_compact(header.bits).expect("test headers carry valid bits");
    while header.pow_value() <= target {
        header.nonce += 1;
    }
}

/// Anyone-can-spend transaction consuming `outpoint` and paying `value` back to anyone.
pub fn spend_tx(outpoint: TransactionOutpoint, value: u64, time: u64) -> Transaction {
    Transaction::new(
        1,
        time,
        vec![TransactionInput::new(outpoint, vec![], 0)],
        vec![TransactionOutput::new(value, ScriptPublicKey::anyone_can_spend())],
        0,
    )
}

/// Signs input `index` of `tx`, which spends an output locked to `key`.
pub fn sign_input(tx: &mut Transaction, index: usize, key: &SecretKey) {
    let message = hashing::tx::sig_hash(tx, index, &p2pk_script(key));
    tx.inputs[index].signature_script = sign_hash(key, &message).expect("32-byte message");
}

/// Builder for a child block of a known parent.
///
/// Defaults: one second after the parent, easiest regtest bits, sha256d, a coinbase paying the
/// full subsidy to an anyone-can-spend output.
pub struct BlockBuilder {
    parent: Header,
    height: BlockHeight,
    time: u64,
    bits: u32,
    algo: PowAlgorithm,
    extra_nonce: u64,
    coinbase_time: Option<u64>,
    coinbase_outputs: Option<Vec<TransactionOutput>>,
    transactions: Vec<Transaction>,
    signer: Option<SecretKey>,
}

impl BlockBuilder {
    pub fn new(params: &Params, parent: &Header, parent_height: BlockHeight) -> Self {
        let height = parent_height + 1;
        Self {
            parent: parent.clone(),
            height,
            time: parent.timestamp + 1,
            bits: params.pow_limit_bits,
            algo: PowAlgorithm::Sha256d,
            extra_nonce: 0,
            coinbase_time: None,
            coinbase_outputs: Some(vec![TransactionOutput::new(
                params.block_subsidy(height),
                ScriptPublicKey::anyone_can_spend(),
            )]),
            transactions: Vec::new(),
            signer: None,
        }
    }

    pub fn time(mut self, time: u64) -> Self {
        self.time = time;
        self
    }

    pub fn bits(mut self, bits: u32) -> Self {
        self.bits = bits;
        self
    }

    pub fn algo(mut self, algo: PowAlgorithm) -> Self {
        self.algo = algo;
        self
    }

    /// Distinguishes siblings that would otherwise be identical.
    pub fn extra_nonce(mut self, extra_nonce: u64) -> Self {
        self.extra_nonce = extra_nonce;
        self
    }

    pub fn coinbase_time(mut self, time: u64) -> Self {
        self.coinbase_time = Some(time);
        self
    }

    pub fn coinbase_outputs(mut self, outputs: Vec<TransactionOutput>) -> Self {
        self.coinbase_outputs = Some(outputs);
        self
    }

    pub fn tx(mut self, tx: Transaction) -> Self {
        self.transactions.push(tx);
        self
    }

    /// Sign the finished block with `key`.
    pub fn signed_by(mut self, key: SecretKey) -> Self {
        self.signer = Some(key);
        self
    }

    pub fn coinbase(&self) -> Transaction {
        let time = self.coinbase_time.unwrap_or(self.time);
        Transaction::new_coinbase(self.height, time, self.extra_nonce, self.coinbase_outputs.clone().unwrap_or_default())
    }

    /// Assembles the block with a correct merkle root, without mining it.
    pub fn build_unmined(self) -> Block {
        let mut transactions = vec![self.coinbase()];
        transactions.extend(self.transactions.iter().cloned());
        let merkle_root = crypto_hashes::MerkleTree::from_leaves(transactions.iter().map(Transaction::id).collect()).root();
        let header = Header::new(BLOCK_VERSION, self.parent.hash(), merkle_root, self.time, self.bits, self.algo, 0);
        let mut block = Block::new(header, transactions);
        if let Some(key) = self.signer {
            sign_block(&mut block, &key).expect("32-byte message");
        }
        block
    }

    pub fn build(self) -> Block {
        let signer = self.signer;
        let mut block = Self { signer: None, ..self }.build_unmined();
        mine(&mut block.header);
        if let Some(key) = signer {
            sign_block(&mut block, &key).expect("32-byte message");
        }
        block
    }
}
