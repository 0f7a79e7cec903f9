//! Domain layer - Pure logic for batch production
//!
//! Everything here is synchronous and free of I/O. Parallelism (rayon) is
//! used inside root building and signature aggregation only.
//!
//! ## Entities
//!
//! - [`PackedTransaction`]: Fixed 24-byte transfer record
//! - [`Chunk`]: Byte-bounded run of transactions under one root
//! - [`CommitBatch`]: Ordered roots committed in one base-ledger transaction
//!
//! ## Services
//!
//! - [`encoding`]: Transfer packing
//! - [`chunker`]: Greedy size-bounded partition
//! - [`merkle`]: Keccak-256 roots and inclusion proofs
//! - [`bls`]: BLS12-381 aggregation
//! - [`cost`]: Gas accounting
//!
//! ## Invariants
//!
//! 1. Chunk concatenation reproduces the accepted input, in order
//! 2. Every chunk is non-empty and at most `max_root_size` bytes
//! 3. Every root lands in exactly one batch
//! 4. Only confirmed submissions reach the cost ledger

pub mod bls;
pub mod chunker;
pub mod cost;
pub mod encoding;
pub mod entities;
pub mod merkle;

pub use bls::KeyPair;
pub use chunker::{chunk, Chunker, ChunkingOutcome, RejectedTransaction};
pub use cost::{CostEntry, CostKind, CostLedger, CostReport};
pub use encoding::{decode, encode};
pub use entities::*;
pub use merkle::{build_root, build_roots, MerkleProof, MerkleTree, ProofNode, SiblingPosition};
