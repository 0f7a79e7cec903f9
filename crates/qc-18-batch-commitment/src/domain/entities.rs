//! # Domain Entities
//!
//! Core data structures for batch production.
//!
//! ## Wire Layout
//!
//! A [`PackedTransaction`] is a fixed 24-byte record (big-endian, each slot
//! left zero-padded):
//!
//! ```text
//! 0        4    5       7    8         12        16             20            24
//! ├────────┼────┼───────┼────┼─────────┼─────────┼──────────────┼─────────────┤
//! │ height │root│ tx idx│out │  from   │   to    │ transfer amt │ change amt  │
//! └────────┴────┴───────┴────┴─────────┴─────────┴──────────────┴─────────────┘
//! ```
//!
//! A [`Root`] is a 32-byte Keccak-256 digest (see [`super::merkle`]).

use std::fmt;
use std::ops::Range;

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// 32-byte digest
pub type Hash = [u8; 32];

/// Base-ledger account address (producer / fee recipient)
pub type Address = [u8; 20];

/// Encoded length of every packed transaction
pub const TRANSACTION_SIZE: usize = 24;

/// Compressed G1 signature length (`min_sig` variant)
pub const SIGNATURE_SIZE: usize = 48;

/// Compressed G2 public key length (`min_sig` variant)
pub const PUBLIC_KEY_SIZE: usize = 96;

// =============================================================================
// Transactions
// =============================================================================

/// Location of the UTXO a transfer spends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metadata {
    /// Commit-chain block height of the spent output
    pub block_height: u32,
    /// Root index within that block
    pub root_index: u8,
    /// Transaction index within that root
    pub transaction_index: u16,
    /// Output index within that transaction
    pub output_index: u8,
}

/// A logical transfer before packing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    /// Spent output location
    pub metadata: Metadata,
    /// Sender identifier (at most 4 bytes)
    pub from: Vec<u8>,
    /// Receiver identifier (at most 4 bytes)
    pub to: Vec<u8>,
    /// Amount moved to the receiver (must fit 32 bits)
    pub transfer_amount: U256,
    /// Amount returned to the sender (must fit 32 bits)
    pub change_amount: U256,
}

/// Immutable packed transaction record.
///
/// Equality is byte equality. Built by [`super::encoding::encode`] or
/// wrapped from raw bytes with [`PackedTransaction::from_raw`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PackedTransaction(Vec<u8>);

impl PackedTransaction {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Wrap raw record bytes without layout checks.
    ///
    /// The chunker accepts records of any size; oversized records are
    /// reported rather than chunked.
    pub fn from_raw(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encoded length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record carries no bytes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the raw bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for PackedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackedTransaction(0x{})", hex::encode(&self.0))
    }
}

impl AsRef<[u8]> for PackedTransaction {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// =============================================================================
// Chunks & Roots
// =============================================================================

/// An ordered, non-empty run of transactions bounded by `max_root_size`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// Input positions of the contained transactions
    indices: Vec<usize>,
    transactions: Vec<PackedTransaction>,
    byte_len: usize,
}

impl Chunk {
    pub(crate) fn new(indices: Vec<usize>, transactions: Vec<PackedTransaction>) -> Self {
        debug_assert_eq!(indices.len(), transactions.len());
        let byte_len = transactions.iter().map(PackedTransaction::len).sum();
        Self {
            indices,
            transactions,
            byte_len,
        }
    }

    /// Transactions in input order
    pub fn transactions(&self) -> &[PackedTransaction] {
        &self.transactions
    }

    /// Input position of each transaction
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Input position of the first transaction
    pub fn first_index(&self) -> usize {
        self.indices[0]
    }

    /// Number of transactions
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Always false for chunks produced by the chunker
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Total encoded length
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Concatenated transaction bytes, as published on the base ledger
    pub fn payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len);
        for tx in &self.transactions {
            out.extend_from_slice(tx.as_bytes());
        }
        out
    }
}

/// Merkle root committing to one chunk.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Root(pub Hash);

impl Root {
    /// Digest bytes
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Root(0x{})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// =============================================================================
// BLS Types (BLS12-381, min_sig)
// =============================================================================

/// BLS signature (G1 point, 48 bytes compressed)
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlsSignature {
    /// G1 point (48 bytes compressed)
    #[serde_as(as = "Bytes")]
    pub bytes: [u8; SIGNATURE_SIZE],
}

/// BLS public key (G2 point, 96 bytes compressed)
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlsPublicKey {
    /// G2 point (96 bytes compressed)
    #[serde_as(as = "Bytes")]
    pub bytes: [u8; PUBLIC_KEY_SIZE],
}

/// Group sum of a set of signatures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AggregateSignature {
    /// Summed G1 point
    pub signature: BlsSignature,
    /// Number of signatures folded in
    pub count: usize,
}

/// A packed transaction with its signer's signature over the packed bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    /// The signed record
    pub transaction: PackedTransaction,
    /// Signature over `transaction.as_bytes()`
    pub signature: BlsSignature,
    /// Signer public key
    pub public_key: BlsPublicKey,
}

// =============================================================================
// Commitments
// =============================================================================

/// Base-ledger block a commitment is anchored to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockReference {
    /// Block number
    pub number: u64,
    /// Block hash
    pub hash: Hash,
}

/// Why the sink refused a submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    /// Attached bond differs from the sink minimum
    InsufficientBond,
    /// Block reference is unknown or too old
    StaleBlockReference,
    /// The sequence slot already holds a commitment
    SlotTaken,
    /// Sequence is ahead of the next open slot
    OutOfOrder,
    /// More roots than the sink accepts per commitment
    TooManyRoots,
    /// A referenced root was never published
    UnknownRoot,
    /// Root was already published
    DuplicateRoot,
    /// The sink did not answer within budget
    Timeout,
    /// An earlier batch is still unconfirmed
    PredecessorRejected {
        /// Sequence number of the blocking batch
        sequence: u64,
    },
    /// Sink-specific reason
    Other(String),
}

impl RejectionReason {
    /// Whether the same batch may be offered again (with a fresh block reference)
    pub fn is_resubmittable(&self) -> bool {
        matches!(
            self,
            Self::StaleBlockReference
                | Self::Timeout
                | Self::PredecessorRejected { .. }
                | Self::OutOfOrder
                | Self::Other(_)
        )
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientBond => write!(f, "insufficient bond"),
            Self::StaleBlockReference => write!(f, "stale block reference"),
            Self::SlotTaken => write!(f, "commitment slot already taken"),
            Self::OutOfOrder => write!(f, "sequence out of order"),
            Self::TooManyRoots => write!(f, "too many roots"),
            Self::UnknownRoot => write!(f, "root not published"),
            Self::DuplicateRoot => write!(f, "root already published"),
            Self::Timeout => write!(f, "timeout"),
            Self::PredecessorRejected { sequence } => {
                write!(f, "predecessor batch {} unconfirmed", sequence)
            }
            Self::Other(reason) => write!(f, "{}", reason),
        }
    }
}

/// Lifecycle of a commit batch.
///
/// ```text
/// Assembling ──► Submitting ──► Confirmed
///      ▲              │
///      └── resubmit ──┴──► Rejected
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchState {
    /// Roots are still being appended
    Assembling,
    /// Handed to the sink, awaiting an answer
    Submitting,
    /// Accepted by the sink
    Confirmed {
        /// Gas observed for the commitment transaction
        gas_used: u64,
    },
    /// Refused or timed out; roots retained for resubmission
    Rejected {
        /// Sink or scheduler reason
        reason: RejectionReason,
    },
}

/// An ordered set of roots committed in one base-ledger transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitBatch {
    /// Batch sequence number (commitment slot)
    pub sequence: u64,
    /// Global index of the first root
    pub first_root_index: usize,
    /// Roots in production order
    pub roots: Vec<Root>,
    /// Bond attached to the submission
    pub bond: U256,
    /// Anchor block, set when submitted
    pub block: Option<BlockReference>,
    /// Current lifecycle state
    pub state: BatchState,
}

impl CommitBatch {
    /// Global root indices carried by this batch
    pub fn root_range(&self) -> Range<usize> {
        self.first_root_index..self.first_root_index + self.roots.len()
    }

    /// Number of roots
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether the batch carries no roots
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
