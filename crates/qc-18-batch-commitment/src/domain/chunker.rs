//! # Chunker
//!
//! Greedy, order-preserving partition of a transaction stream into chunks
//! of at most `max_root_size` bytes.
//!
//! The streaming [`Chunker`] holds only the active chunk; [`chunk`] drives
//! it over a slice. A transaction larger than the bound is reported as
//! `OversizedTransaction` and skipped; its neighbours chunk exactly as if it
//! were absent.

use tracing::{debug, warn};

use super::entities::{Chunk, PackedTransaction};
use crate::error::{BatchCommitmentError, Result};

/// A transaction dropped from the stream, with the reason.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedTransaction {
    /// Position in the input sequence
    pub index: usize,
    /// Why it was rejected
    pub error: BatchCommitmentError,
}

/// Result of chunking a full sequence.
#[derive(Clone, Debug, Default)]
pub struct ChunkingOutcome {
    /// Chunks in input order
    pub chunks: Vec<Chunk>,
    /// Transactions that could not be chunked
    pub rejected: Vec<RejectedTransaction>,
}

impl ChunkingOutcome {
    /// Number of transactions placed into chunks
    pub fn transaction_count(&self) -> usize {
        self.chunks.iter().map(Chunk::len).sum()
    }
}

/// Streaming greedy chunker.
#[derive(Debug)]
pub struct Chunker {
    max_root_size: usize,
    next_index: usize,
    indices: Vec<usize>,
    current: Vec<PackedTransaction>,
    current_size: usize,
}

impl Chunker {
    /// Create a chunker with the given byte bound.
    ///
    /// # Errors
    /// * `InvalidConfig` if `max_root_size` is zero
    pub fn new(max_root_size: usize) -> Result<Self> {
        if max_root_size == 0 {
            return Err(BatchCommitmentError::InvalidConfig(
                "max_root_size must be non-zero".into(),
            ));
        }
        Ok(Self {
            max_root_size,
            next_index: 0,
            indices: Vec::new(),
            current: Vec::new(),
            current_size: 0,
        })
    }

    /// Byte bound per chunk
    pub fn max_root_size(&self) -> usize {
        self.max_root_size
    }

    /// Input position the next pushed transaction will get
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Append the next transaction of the stream.
    ///
    /// Returns the previous chunk if this transaction closed it.
    ///
    /// # Errors
    /// * `OversizedTransaction` if the transaction alone exceeds the bound.
    ///   The chunker state is untouched apart from the position counter.
    pub fn push(&mut self, transaction: PackedTransaction) -> Result<Option<Chunk>> {
        let index = self.next_index;
        self.next_index += 1;

        let size = transaction.len();
        if size > self.max_root_size {
            warn!(
                "[qc-18] Transaction {} is {} bytes, exceeds max root size {}",
                index, size, self.max_root_size
            );
            return Err(BatchCommitmentError::OversizedTransaction {
                index,
                size,
                max: self.max_root_size,
            });
        }

        let closed = if self.current_size + size > self.max_root_size {
            self.take_current()
        } else {
            None
        };

        self.indices.push(index);
        self.current.push(transaction);
        self.current_size += size;

        Ok(closed)
    }

    /// Advance the position counter for a transaction rejected upstream
    /// (e.g. by the encoder), keeping indices aligned with the input.
    pub fn skip(&mut self) {
        self.next_index += 1;
    }

    /// Close the active chunk at end of input.
    pub fn finish(&mut self) -> Option<Chunk> {
        self.take_current()
    }

    fn take_current(&mut self) -> Option<Chunk> {
        if self.current.is_empty() {
            return None;
        }
        let indices = std::mem::take(&mut self.indices);
        let transactions = std::mem::take(&mut self.current);
        debug!(
            "[qc-18] Closed chunk at tx {}: {} txs, {} bytes",
            indices[0],
            transactions.len(),
            self.current_size
        );
        self.current_size = 0;
        Some(Chunk::new(indices, transactions))
    }
}

/// Chunk a complete sequence.
///
/// # Errors
/// * `InvalidConfig` if `max_root_size` is zero. Oversized transactions are
///   reported in [`ChunkingOutcome::rejected`], never as an error.
pub fn chunk(transactions: &[PackedTransaction], max_root_size: usize) -> Result<ChunkingOutcome> {
    let mut chunker = Chunker::new(max_root_size)?;
    let mut outcome = ChunkingOutcome::default();

    for transaction in transactions {
        let index = chunker.next_index();
        match chunker.push(transaction.clone()) {
            Ok(Some(closed)) => outcome.chunks.push(closed),
            Ok(None) => {}
            Err(error) => outcome.rejected.push(RejectedTransaction { index, error }),
        }
    }
    outcome.chunks.extend(chunker.finish());

    Ok(outcome)
}
