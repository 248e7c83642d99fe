//! Merkle tree committing a block's transactions.
//!
//! Nodes live in an arena and refer to each other by index, so leaves can
//! walk up to the root without shared ownership. An odd node at any level is
//! paired with itself.

use crate::hash::{hash_concat, Hash};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while building a merkle tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("cannot build a merkle tree from an empty transaction list")]
    EmptyInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    hash: Hash,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
}

impl Node {
    fn leaf(hash: Hash) -> Self {
        Self {
            hash,
            parent: None,
            left: None,
            right: None,
        }
    }
}

/// A binary hash tree over an ordered, non-empty list of transactions.
///
/// Leaves occupy `nodes[..transactions.len()]` in input order. The tree is
/// serialized as its leaf transactions and rebuilt on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Transaction>", into = "Vec<Transaction>")]
pub struct MerkleTree {
    nodes: Vec<Node>,
    transactions: Vec<Transaction>,
    root: usize,
}

/// A merkle proof for a single leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    /// The leaf being proven.
    pub leaf: Hash,
    /// Sibling hashes from leaf to root.
    pub siblings: Vec<Hash>,
    /// Direction for each sibling (true = right, false = left).
    pub directions: Vec<bool>,
}

impl MerkleTree {
    /// Build a tree from transactions, hashing each by its canonical id.
    pub fn build(transactions: Vec<Transaction>) -> Result<Self, MerkleError> {
        if transactions.is_empty() {
            return Err(MerkleError::EmptyInput);
        }
        Ok(Self::assemble(transactions))
    }

    fn assemble(transactions: Vec<Transaction>) -> Self {
        let mut nodes: Vec<Node> = transactions
            .iter()
            .map(|tx| Node::leaf(tx.compute_id()))
            .collect();
        let mut level: Vec<usize> = (0..nodes.len()).collect();

        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));

            for pair in level.chunks(2) {
                let left = pair[0];
                let right = pair.get(1).copied().unwrap_or(left);
                let hash = hash_concat(&[nodes[left].hash.as_ref(), nodes[right].hash.as_ref()]);

                let parent = nodes.len();
                nodes.push(Node {
                    hash,
                    parent: None,
                    left: Some(left),
                    right: Some(right),
                });
                nodes[left].parent = Some(parent);
                nodes[right].parent = Some(parent);
                next.push(parent);
            }

            level = next;
        }

        let root = level[0];
        Self {
            nodes,
            transactions,
            root,
        }
    }

    /// Rebuild the tree with additional transactions appended as leaves.
    pub fn extend(self, more: impl IntoIterator<Item = Transaction>) -> Self {
        let mut transactions = self.transactions;
        transactions.extend(more);
        Self::assemble(transactions)
    }

    /// Get the root hash.
    pub fn root(&self) -> Hash {
        self.nodes[self.root].hash
    }

    /// The committed transactions in leaf order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Get the number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        self.transactions.len()
    }

    /// Hash stored at the given leaf.
    pub fn leaf_hash(&self, index: usize) -> Option<Hash> {
        (index < self.leaf_count()).then(|| self.nodes[index].hash)
    }

    /// Index of the first leaf carrying this hash.
    pub fn find_leaf(&self, leaf: &Hash) -> Option<usize> {
        self.nodes[..self.leaf_count()]
            .iter()
            .position(|node| node.hash == *leaf)
    }

    /// Check that `tx` is a leaf and that every internal hash on its path to
    /// the root matches its children.
    pub fn verify_membership(&self, tx: &Transaction) -> bool {
        let Some(mut index) = self.find_leaf(&tx.compute_id()) else {
            return false;
        };

        while let Some(parent) = self.nodes[index].parent {
            let node = &self.nodes[parent];
            let (Some(left), Some(right)) = (node.left, node.right) else {
                return false;
            };
            let recomputed =
                hash_concat(&[self.nodes[left].hash.as_ref(), self.nodes[right].hash.as_ref()]);
            if recomputed != node.hash {
                return false;
            }
            index = parent;
        }

        index == self.root
    }

    /// Generate a proof for the leaf at the given index.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        let leaf = self.leaf_hash(index)?;
        let mut siblings = Vec::new();
        let mut directions = Vec::new();
        let mut current = index;

        while let Some(parent) = self.nodes[current].parent {
            let node = &self.nodes[parent];
            let (left, right) = (node.left?, node.right?);
            if left == current {
                siblings.push(self.nodes[right].hash);
                directions.push(true);
            } else {
                siblings.push(self.nodes[left].hash);
                directions.push(false);
            }
            current = parent;
        }

        Some(MerkleProof {
            leaf,
            siblings,
            directions,
        })
    }

    /// Verify a merkle proof against this tree's root.
    pub fn verify_proof(&self, proof: &MerkleProof) -> bool {
        verify_proof(&self.root(), proof)
    }
}

impl TryFrom<Vec<Transaction>> for MerkleTree {
    type Error = MerkleError;

    fn try_from(transactions: Vec<Transaction>) -> Result<Self, Self::Error> {
        Self::build(transactions)
    }
}

impl From<MerkleTree> for Vec<Transaction> {
    fn from(tree: MerkleTree) -> Self {
        tree.transactions
    }
}

/// Check whether `tx` is committed by `tree`.
pub fn verify_membership(tx: &Transaction, tree: &MerkleTree) -> bool {
    tree.verify_membership(tx)
}

/// Verify a merkle proof against a given root.
pub fn verify_proof(root: &Hash, proof: &MerkleProof) -> bool {
    let mut current = proof.leaf;

    for (sibling, is_right) in proof.siblings.iter().zip(proof.directions.iter()) {
        current = if *is_right {
            hash_concat(&[current.as_ref(), sibling.as_ref()])
        } else {
            hash_concat(&[sibling.as_ref(), current.as_ref()])
        };
    }

    current == *root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PubKeyHash;
    use crate::hash::hash;

    fn make_txs(n: usize) -> Vec<Transaction> {
        (0..n)
            .map(|i| {
                Transaction::introduction(
                    PubKeyHash::from_bytes([i as u8; 20]),
                    hash(&[i as u8]),
                    i as u64 * 10,
                    1_650_000_000 + i as u64,
                )
            })
            .collect()
    }

    #[test]
    fn test_build_empty_fails() {
        assert_eq!(MerkleTree::build(vec![]), Err(MerkleError::EmptyInput));
    }

    #[test]
    fn test_single_leaf_is_root() {
        let txs = make_txs(1);
        let tree = MerkleTree::build(txs.clone()).unwrap();
        assert_eq!(tree.root(), txs[0].compute_id());
        assert!(tree.verify_membership(&txs[0]));
    }

    #[test]
    fn test_root_two() {
        let txs = make_txs(2);
        let tree = MerkleTree::build(txs.clone()).unwrap();
        let expected = hash_concat(&[
            txs[0].compute_id().as_ref(),
            txs[1].compute_id().as_ref(),
        ]);
        assert_eq!(tree.root(), expected);
    }

    #[test]
    fn test_odd_leaf_pairs_with_itself() {
        let txs = make_txs(3);
        let tree = MerkleTree::build(txs.clone()).unwrap();
        let h: Vec<Hash> = txs.iter().map(|t| t.compute_id()).collect();
        let left = hash_concat(&[h[0].as_ref(), h[1].as_ref()]);
        let right = hash_concat(&[h[2].as_ref(), h[2].as_ref()]);
        assert_eq!(tree.root(), hash_concat(&[left.as_ref(), right.as_ref()]));
    }

    #[test]
    fn test_order_matters() {
        let txs = make_txs(4);
        let mut reversed = txs.clone();
        reversed.reverse();
        let r1 = MerkleTree::build(txs).unwrap().root();
        let r2 = MerkleTree::build(reversed).unwrap().root();
        assert_ne!(r1, r2);
    }

    #[test]
    fn test_membership_for_every_leaf() {
        for n in 1..=9 {
            let txs = make_txs(n);
            let tree = MerkleTree::build(txs.clone()).unwrap();
            for tx in &txs {
                assert!(verify_membership(tx, &tree), "leaf missing for n={n}");
            }
        }
    }

    #[test]
    fn test_membership_rejects_outsider() {
        let txs = make_txs(5);
        let tree = MerkleTree::build(txs).unwrap();
        let outsider = make_txs(6).pop().unwrap();
        assert!(!tree.verify_membership(&outsider));
    }

    #[test]
    fn test_membership_detects_corrupted_internal_node() {
        let txs = make_txs(4);
        let mut tree = MerkleTree::build(txs.clone()).unwrap();
        let internal = tree.leaf_count();
        tree.nodes[internal].hash = Hash([0xEE; 32]);
        assert!(!tree.verify_membership(&txs[0]));
        // Root no longer matches its children either.
        assert!(!tree.verify_membership(&txs[3]));
    }

    #[test]
    fn test_proofs_verify() {
        for n in [1, 2, 5, 8] {
            let tree = MerkleTree::build(make_txs(n)).unwrap();
            for i in 0..n {
                let proof = tree.proof(i).unwrap();
                assert!(tree.verify_proof(&proof));
                assert!(verify_proof(&tree.root(), &proof));
            }
        }
    }

    #[test]
    fn test_proof_invalid_index() {
        let tree = MerkleTree::build(make_txs(4)).unwrap();
        assert!(tree.proof(10).is_none());
    }

    #[test]
    fn test_proof_wrong_root() {
        let tree = MerkleTree::build(make_txs(4)).unwrap();
        let proof = tree.proof(0).unwrap();
        assert!(!verify_proof(&hash(b"wrong"), &proof));
    }

    #[test]
    fn test_extend_rebuilds() {
        let txs = make_txs(5);
        let tree = MerkleTree::build(txs[..3].to_vec()).unwrap();
        let extended = tree.extend(txs[3..].to_vec());
        assert_eq!(extended, MerkleTree::build(txs.clone()).unwrap());
        assert!(extended.verify_membership(&txs[4]));
    }

    #[test]
    fn test_serde_rebuilds_tree() {
        let txs = make_txs(3);
        let tree = MerkleTree::build(txs.clone()).unwrap();
        let bytes = bincode::serialize(&tree).unwrap();
        let decoded: MerkleTree = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, tree);
        assert_eq!(decoded.transactions(), txs.as_slice());
        assert_eq!(bincode::serialize(&decoded).unwrap(), bytes);
    }

    #[test]
    fn test_deserialize_empty_fails() {
        let bytes = bincode::serialize(&Vec::<Transaction>::new()).unwrap();
        assert!(bincode::deserialize::<MerkleTree>(&bytes).is_err());
    }
}
