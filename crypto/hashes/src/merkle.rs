use crate::{hasher::HashWriter, Hash};

/// Merkle tree over transaction ids.
///
/// Interior nodes are `SHA256d(left || right)`; an odd node at the end of a level is
/// paired with itself. Because of that duplication two different leaf lists can share
/// a root, so the tree records whether any level contained an identical adjacent pair.
pub struct MerkleTree {
    leaves: Vec<Hash>,
    levels: Vec<Vec<Hash>>,
    mutated: bool,
}

impl MerkleTree {
    /// Create a Merkle tree directly from leaf hashes
    pub fn from_leaves(leaves: Vec<Hash>) -> Self {
        let mut tree = Self { leaves: leaves.clone(), levels: vec![leaves], mutated: false };
        tree.build_tree();
        tree
    }

    fn build_tree(&mut self) {
        let mut current_level = self.levels[0].clone();
        while current_level.len() > 1 {
            let mut next_level = Vec::with_capacity((current_level.len() + 1) / 2);
            for chunk in current_level.chunks(2) {
                let (left, right) = match chunk {
                    [left, right] => {
                        if left == right {
                            self.mutated = true;
                        }
                        (left, right)
                    }
                    [single] => (single, single),
                    _ => unreachable!(),
                };
                next_level.push(hash_pair(left, right));
            }
            self.levels.push(next_level.clone());
            current_level = next_level;
        }
    }

    /// Get the Merkle root hash. An empty tree has the zero hash as root.
    pub fn root(&self) -> Hash {
        self.levels.last().and_then(|level| level.first()).copied().unwrap_or_default()
    }

    /// True if the leaf list had duplicated adjacent entries, see type docs.
    pub fn is_mutated(&self) -> bool {
        self.mutated
    }

    /// Create a Merkle proof for the item at the given index
    pub fn create_proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaves.len() {
            return None;
        }

        let mut proof = Vec::new();
        let mut current_index = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_index = if current_index % 2 == 0 { current_index + 1 } else { current_index - 1 };

            if sibling_index < level.len() {
                proof.push(level[sibling_index]);
            } else {
                proof.push(level[current_index]);
            }

            current_index /= 2;
        }

        Some(MerkleProof { proof_hashes: proof, index })
    }
}

fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut writer = HashWriter::new();
    writer.update(left.as_bytes()).update(right.as_bytes());
    writer.finalize_double()
}

/// Merkle proof for verifying inclusion
pub struct MerkleProof {
    proof_hashes: Vec<Hash>,
    index: usize,
}

impl MerkleProof {
    /// Verify that the given hash exists in the tree with the given root
    pub fn verify(&self, hash: Hash, root: Hash) -> bool {
        let mut current = hash;
        let mut current_index = self.index;

        for sibling in &self.proof_hashes {
            current = if current_index % 2 == 0 { hash_pair(&current, sibling) } else { hash_pair(sibling, &current) };
            current_index /= 2;
        }

        current == root
    }
}
