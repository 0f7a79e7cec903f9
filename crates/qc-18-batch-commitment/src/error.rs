//! Error types for the batch commitment subsystem

use std::ops::Range;

use thiserror::Error;

use crate::domain::entities::RejectionReason;

/// Result type alias for batch commitment operations
pub type Result<T> = std::result::Result<T, BatchCommitmentError>;

/// Errors that can occur while packing, chunking, signing or committing
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BatchCommitmentError {
    /// A transfer field does not fit its fixed-width slot
    #[error("Encoding overflow: {field} needs {actual} bytes, slot holds {width}")]
    EncodingOverflow {
        /// Name of the offending field
        field: &'static str,
        /// Slot width in bytes
        width: usize,
        /// Bytes the value actually needs
        actual: usize,
    },

    /// A packed record does not have the fixed transaction length
    #[error("Malformed transaction: expected {expected} bytes, got {actual}")]
    MalformedTransaction {
        /// Fixed record length
        expected: usize,
        /// Length received
        actual: usize,
    },

    /// A single transaction is larger than the chunk bound
    #[error("Transaction {index} is {size} bytes and can never fit a {max}-byte chunk")]
    OversizedTransaction {
        /// Position in the input sequence
        index: usize,
        /// Encoded size
        size: usize,
        /// Configured maximum root size
        max: usize,
    },

    /// A chunk or tree was requested over zero transactions
    #[error("Cannot build a root over an empty chunk")]
    EmptyChunk,

    /// Aggregate signature verification failed.
    ///
    /// Aggregation cannot tell which contributor is bad; `invalid_transactions`
    /// is only populated once the batch has been bisected.
    #[error(
        "Aggregate signature for batch {batch_sequence} failed over {signature_count} signatures \
         (roots {root_indices:?}); the aggregate does not identify the offending signature, \
         bisection isolated transactions {invalid_transactions:?}"
    )]
    InvalidSignature {
        /// Sequence number of the containing commit batch
        batch_sequence: u64,
        /// Global indices of the roots whose aggregates failed
        root_indices: Vec<usize>,
        /// Number of signatures folded into the failing aggregates
        signature_count: usize,
        /// Input indices of the signatures found invalid by bisection
        invalid_transactions: Vec<usize>,
    },

    /// Key or signature bytes do not decode to a curve point
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Cannot aggregate an empty list of signatures
    #[error("Cannot aggregate empty signature list")]
    EmptyAggregation,

    /// The commitment sink refused a submission
    #[error("Batch {sequence} rejected (roots {root_range:?}): {reason}")]
    SubmissionRejected {
        /// Batch sequence number
        sequence: u64,
        /// Reason reported by the sink
        reason: RejectionReason,
        /// Global root indices carried by the batch
        root_range: Range<usize>,
    },

    /// The sink did not answer within the submission budget
    #[error("Batch {sequence} timed out after {timeout_ms}ms (roots {root_range:?})")]
    Timeout {
        /// Batch sequence number
        sequence: u64,
        /// Budget that elapsed
        timeout_ms: u64,
        /// Global root indices carried by the batch
        root_range: Range<usize>,
    },

    /// Transport-level failure talking to the sink or oracle
    #[error("Commitment sink unavailable: {0}")]
    SinkUnavailable(String),

    /// The cost ledger task has stopped
    #[error("Cost ledger is closed")]
    LedgerClosed,

    /// No retained batch carries this sequence number
    #[error("Unknown batch sequence {0}")]
    UnknownBatch(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl BatchCommitmentError {
    /// Per-transaction errors: skip the transaction, report it, keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EncodingOverflow { .. }
                | Self::MalformedTransaction { .. }
                | Self::OversizedTransaction { .. }
        )
    }

    /// Errors that fail the containing commit batch.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature { .. }
                | Self::SubmissionRejected { .. }
                | Self::Timeout { .. }
                | Self::SinkUnavailable(_)
        )
    }

    /// Whether the failed batch may be handed back to the sink unchanged
    /// (with a fresh block reference).
    pub fn is_resubmittable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::SinkUnavailable(_) => true,
            Self::SubmissionRejected { reason, .. } => reason.is_resubmittable(),
            _ => false,
        }
    }
}
