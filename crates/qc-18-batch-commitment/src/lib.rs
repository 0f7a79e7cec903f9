//! # Quantum Chain - Batch Commitment (Subsystem 18)
//!
//! **Bounded Context:** Commit-Chain Batch Production
//! **Architecture Compliance:** DDD + Hexagonal + TDD
//!
//! ## Purpose
//!
//! Turns a stream of signed transfers into bonded base-ledger commitments:
//! - Packs each transfer into a fixed 24-byte record
//! - Partitions the records greedily into size-bounded chunks
//! - Commits each chunk with a Keccak-256 Merkle root and one aggregate
//!   BLS signature over its transactions
//! - Groups roots into sequenced batches, publishes and commits them, and
//!   records the gas they cost
//!
//! ## Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Adapters (Outer)                                   │
//! │  - InMemoryCommitmentSink: simulated base ledger    │
//! │  - BlsSignatureProvider: blst min_sig               │
//! │  - FixedGasOracle                                   │
//! └─────────────────────────────────────────────────────┘
//!                         │
//! ┌─────────────────────────────────────────────────────┐
//! │  Ports (Middle)                                     │
//! │  - Inbound: BatchCommitmentApi                      │
//! │  - Outbound: CommitmentSink, GasOracle,             │
//! │    SignatureProvider                                │
//! └─────────────────────────────────────────────────────┘
//!                         │
//! ┌─────────────────────────────────────────────────────┐
//! │  Domain (Inner - Pure Logic)                        │
//! │  - encode / Chunker / build_root / bls aggregation  │
//! │  - CostLedger                                       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! [`BatchPipeline`] drives the layers: chunks, roots and aggregates are
//! produced on rayon workers, while a tokio task submits one batch at a
//! time through the [`CommitmentScheduler`]. A dedicated task owns the
//! cost ledger.
//!
//! ## Critical Invariants
//!
//! 1. **Order**: chunk concatenation equals the accepted input
//! 2. **Bound**: every chunk holds between 1 transaction and `max_root_size` bytes
//! 3. **Sequencing**: batch `n + 1` never commits while batch `n` is pending
//! 4. **Accounting**: only gas of confirmed sink calls is recorded
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! let pipeline = BatchPipeline::start(config, sink, provider, oracle).await?;
//! let report = pipeline.process(transfers, signers).await?;
//! println!("{} batches, {} gas", report.batches.len(), report.cost.total_gas);
//! ```
//!
//! ## Module Structure
//!
//! - [`domain`]: Encoding, chunking, Merkle roots, BLS, cost accounting
//! - [`ports`]: Hexagonal interfaces (inbound/outbound)
//! - [`adapters`]: Sink, signer and gas oracle implementations
//! - [`scheduler`]: Batch assembly and sequenced submission
//! - [`ledger`]: Cost ledger task
//! - [`service`]: End-to-end pipeline

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Sink, signer and gas oracle implementations
pub mod adapters;
/// Domain models and pure logic
pub mod domain;
pub mod ledger;
pub mod ports;
pub mod scheduler;
pub mod service;

mod config;
mod error;
mod metrics;

pub use config::{
    BatchingConfig, BondSize, CommitChainConfig, GasConfig, LoggingConfig, NetworkConfig,
    DEFAULT_BOND_SIZE_WEI,
};
pub use error::{BatchCommitmentError, Result};
pub use metrics::Metrics;

// Re-export commonly used types
pub use domain::{
    build_root, build_roots, chunk, decode, encode, AggregateSignature, BatchState,
    BlockReference, BlsPublicKey, BlsSignature, Chunk, Chunker, ChunkingOutcome, CommitBatch,
    CostKind, CostLedger, CostReport, KeyPair, Metadata, PackedTransaction, RejectedTransaction,
    RejectionReason, Root, SignedTransaction, Transfer, TRANSACTION_SIZE,
};

pub use ports::{
    BatchCommitmentApi, BatchOutcome, CommitmentSink, GasOracle, GasPrice, PipelineReport,
    RootPublication, SignatureProvider, SinkReceipt, SubmissionOverrides, SubmissionReceipt,
    SubmitRequest,
};

pub use adapters::{BlsSignatureProvider, FixedGasOracle, InMemoryCommitmentSink, InMemorySinkConfig};

pub use scheduler::{CommitmentScheduler, SchedulerConfig};
pub use service::BatchPipeline;

/// Subsystem identifier
pub const SUBSYSTEM_ID: u8 = 18;

/// Roots per commitment
pub const DEFAULT_MAX_ROOTS_PER_COMMIT: usize = 128;

/// Byte bound per chunk
pub const DEFAULT_MAX_ROOT_SIZE: usize = 32_000;

/// Gas limit per base-ledger transaction
pub const DEFAULT_GAS_LIMIT: u64 = 6_000_000;

/// Gas capacity of one base-ledger block
pub const DEFAULT_LEDGER_BLOCK_CAPACITY: u64 = 8_000_000;
