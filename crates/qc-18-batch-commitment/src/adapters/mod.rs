//! # Adapters Module
//!
//! Infrastructure adapters implementing the ports.

pub mod gas;
pub mod memory_sink;
pub mod signer;

pub use gas::FixedGasOracle;
pub use memory_sink::{
    CommittedBatch, GasSchedule, InMemoryCommitmentSink, InMemorySinkConfig,
};
pub use signer::BlsSignatureProvider;
