use serde::{Deserialize, Serialize};

use crate::{header::Header, tx::Transaction, Hash};
use crypto_hashes::MerkleTree;

/// Complete block: header, transactions and an optional signature over the block hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    /// DER signature, required only when the coinbase pays a public key. Not covered by the hash.
    #[serde(default)]
    pub signature: Vec<u8>,
}

impl Block {
    /// Creates a new unsigned block with the given header and transactions
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Self {
        Self { header, transactions, signature: Vec::new() }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.first().filter(|tx| tx.is_coinbase())
    }

    pub fn merkle_tree(&self) -> MerkleTree {
        MerkleTree::from_leaves(self.transactions.iter().map(Transaction::id).collect())
    }

    /// Merkle root over the transaction ids, as the header should commit to it.
    pub fn calculate_merkle_root(&self) -> Hash {
        self.merkle_tree().root()
    }

    /// True when the transactions hash to the header's merkle root without duplicated subtrees.
    /// Only then can a body failure be blamed on the header.
    pub fn body_matches_header(&self) -> bool {
        let tree = self.merkle_tree();
        !tree.is_mutated() && tree.root() == self.header.merkle_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptPublicKey;
    use crate::tx::TransactionOutput;
    use crate::PowAlgorithm;

    #[test]
    fn test_merkle_root_and_signature_exclusion() {
        let cb = Transaction::new_coinbase(1, 0, 0, vec![TransactionOutput::new(1, ScriptPublicKey::anyone_can_spend())]);
        let header = Header::new(1, Hash::zeroed(), cb.id(), 0, 0x207f_ffff, PowAlgorithm::Sha256d, 0);
        let mut block = Block::new(header, vec![cb]);
        assert!(block.body_matches_header());
        assert!(block.coinbase().is_some());

        let before = block.hash();
        block.signature = vec![1, 2, 3];
        assert_eq!(block.hash(), before);

        block.transactions.push(block.transactions[0].clone());
        assert!(!block.body_matches_header());
    }
}
