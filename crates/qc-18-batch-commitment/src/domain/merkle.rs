//! # Merkle Root Builder
//!
//! Binary Keccak-256 tree over the transactions of one chunk.
//!
//! ## Convention
//!
//! - leaf = `keccak256(0x00 || tx_bytes)`
//! - node = `keccak256(0x01 || left || right)`
//! - an odd node at any level is paired with [`PADDING_HASH`], never with a
//!   copy of itself, so `[a, b, c]` and `[a, b, c, c]` commit differently
//! - a one-leaf chunk still hashes once: `root = node(leaf, PADDING_HASH)`
//!
//! The prefixes keep leaves and internal nodes in separate domains.
//! Roots cross the sink boundary; changing any of the above breaks
//! compatibility with every existing commitment.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use super::entities::{Chunk, Hash, Root};
use crate::error::{BatchCommitmentError, Result};

/// Right sibling of an odd node
pub const PADDING_HASH: Hash = [0u8; 32];

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// Keccak-256 of arbitrary bytes
pub fn keccak256(data: &[u8]) -> Hash {
    Keccak256::digest(data).into()
}

/// Domain-separated leaf hash
pub fn hash_leaf(transaction: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(transaction);
    hasher.finalize().into()
}

/// Domain-separated internal node hash
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

fn next_level(level: &[Hash]) -> Vec<Hash> {
    level
        .chunks(2)
        .map(|pair| hash_pair(&pair[0], pair.get(1).unwrap_or(&PADDING_HASH)))
        .collect()
}

fn leaf_hashes(chunk: &Chunk) -> Vec<Hash> {
    chunk
        .transactions()
        .iter()
        .map(|tx| hash_leaf(tx.as_bytes()))
        .collect()
}

/// Root of a chunk.
///
/// An empty chunk (never produced by the chunker) commits to [`PADDING_HASH`].
pub fn build_root(chunk: &Chunk) -> Root {
    let mut level = leaf_hashes(chunk);
    if level.is_empty() {
        return Root(PADDING_HASH);
    }

    // The leaf level is always hashed at least once
    loop {
        level = next_level(&level);
        if level.len() == 1 {
            return Root(level[0]);
        }
    }
}

/// Roots of many chunks, computed in parallel, in chunk order.
pub fn build_roots(chunks: &[Chunk]) -> Vec<Root> {
    chunks.par_iter().map(build_root).collect()
}

/// Fully materialised tree, used for inclusion proofs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    /// `levels[0]` are the leaf hashes, the last level is `[root]`
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    /// Build a tree over a chunk.
    ///
    /// # Errors
    /// * `EmptyChunk` if the chunk holds no transactions
    pub fn from_chunk(chunk: &Chunk) -> Result<Self> {
        Self::from_leaf_hashes(leaf_hashes(chunk))
    }

    /// Build a tree over precomputed leaf hashes.
    ///
    /// # Errors
    /// * `EmptyChunk` if `leaves` is empty
    pub fn from_leaf_hashes(leaves: Vec<Hash>) -> Result<Self> {
        if leaves.is_empty() {
            return Err(BatchCommitmentError::EmptyChunk);
        }

        let mut levels = vec![leaves];
        loop {
            let next = next_level(&levels[levels.len() - 1]);
            let done = next.len() == 1;
            levels.push(next);
            if done {
                break;
            }
        }

        Ok(Self { levels })
    }

    /// Committed root
    pub fn root(&self) -> Root {
        Root(self.levels[self.levels.len() - 1][0])
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Proof of inclusion for the leaf at `index`.
    ///
    /// # Errors
    /// * `InternalError` if `index` is out of range
    pub fn generate_proof(&self, index: usize) -> Result<MerkleProof> {
        if index >= self.leaf_count() {
            return Err(BatchCommitmentError::InternalError(format!(
                "leaf index {} out of range ({} leaves)",
                index,
                self.leaf_count()
            )));
        }

        let mut path = Vec::with_capacity(self.levels.len() - 1);
        let mut current = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = current ^ 1;
            let (hash, position) = if current % 2 == 0 {
                (
                    level.get(sibling).copied().unwrap_or(PADDING_HASH),
                    SiblingPosition::Right,
                )
            } else {
                (level[sibling], SiblingPosition::Left)
            };
            path.push(ProofNode { hash, position });
            current /= 2;
        }

        Ok(MerkleProof {
            leaf_index: index,
            path,
        })
    }

    /// Check that `transaction` sits at `proof.leaf_index` under `root`.
    pub fn verify_proof(transaction: &[u8], proof: &MerkleProof, root: &Root) -> bool {
        let mut current = hash_leaf(transaction);

        for node in &proof.path {
            current = match node.position {
                SiblingPosition::Left => hash_pair(&node.hash, &current),
                SiblingPosition::Right => hash_pair(&current, &node.hash),
            };
        }

        current == root.0
    }
}

/// Inclusion proof for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Position of the transaction within its chunk
    pub leaf_index: usize,
    /// Sibling hashes from leaf to root
    pub path: Vec<ProofNode>,
}

/// A single node in the proof path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofNode {
    /// The sibling hash at this level
    pub hash: Hash,
    /// Position of the sibling
    pub position: SiblingPosition,
}

/// Position of a sibling in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiblingPosition {
    /// Sibling hashes before the running node
    Left,
    /// Sibling hashes after the running node
    Right,
}
