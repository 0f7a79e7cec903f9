//! Inbound ports (driving side - API)

use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    BlockReference, CostReport, KeyPair, RejectedTransaction, SignedTransaction, Transfer,
};
use crate::error::{BatchCommitmentError, Result};

/// Primary API for batch production
#[async_trait]
pub trait BatchCommitmentApi: Send + Sync {
    /// Encode, sign and commit a sequence of transfers.
    ///
    /// Signer `i % signers.len()` signs transfer `i`.
    async fn process(&self, transfers: Vec<Transfer>, signers: Arc<Vec<KeyPair>>)
        -> Result<PipelineReport>;

    /// Commit already signed transactions.
    ///
    /// Signer keys not generated in this process must have had their proof
    /// of possession checked first, see
    /// [`verify_possession`](crate::SignatureProvider::verify_possession).
    async fn process_signed(&self, transactions: Vec<SignedTransaction>) -> Result<PipelineReport>;

    /// Offer a retained batch to the sink again with a fresh block reference
    async fn resubmit(&self, sequence: u64) -> Result<SubmissionReceipt>;

    /// Sequence numbers of retained (unconfirmed) batches
    async fn pending_batches(&self) -> Vec<u64>;

    /// Current cost snapshot
    async fn cost_report(&self) -> Result<CostReport>;
}

/// Confirmation of one commit batch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// Batch sequence number
    pub sequence: u64,
    /// Global root indices committed
    pub root_range: Range<usize>,
    /// Anchor block used
    pub block: BlockReference,
    /// Gas spent publishing the batch's roots, over every attempt
    pub publication_gas: u64,
    /// Gas spent on the commitment itself
    pub commitment_gas: u64,
}

/// Fate of one commit batch within a run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Accepted by the sink
    Confirmed(SubmissionReceipt),
    /// Signature check, rejection or timeout
    Failed {
        /// Batch sequence number
        sequence: u64,
        /// Global root indices carried
        root_range: Range<usize>,
        /// What went wrong
        error: BatchCommitmentError,
    },
}

impl BatchOutcome {
    /// Whether the sink accepted the batch
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }
}

/// Summary of one pipeline run
#[derive(Clone, Debug, Default)]
pub struct PipelineReport {
    /// Input length
    pub transactions: usize,
    /// Transactions placed into chunks
    pub chunked: usize,
    /// Transactions skipped (encoding overflow, oversized)
    pub rejected: Vec<RejectedTransaction>,
    /// Chunks built
    pub chunks: usize,
    /// Roots handed to the scheduler
    pub roots: usize,
    /// Batches in submission order
    pub batches: Vec<BatchOutcome>,
    /// First input index not covered by a confirmed or retained batch,
    /// set when the run halted early
    pub resume_from: Option<usize>,
    /// Cost snapshot taken at the end of the run
    pub cost: CostReport,
}

impl PipelineReport {
    /// Whether a batch failure stopped the run
    pub fn halted(&self) -> bool {
        self.resume_from.is_some()
    }

    /// Number of batches the sink accepted
    pub fn confirmed_batches(&self) -> usize {
        self.batches.iter().filter(|b| b.is_confirmed()).count()
    }
}
