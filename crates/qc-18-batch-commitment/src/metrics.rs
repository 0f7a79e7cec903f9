//! Metrics collection for the batch commitment subsystem

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for batch production
#[derive(Debug, Default)]
pub struct Metrics {
    /// Transfers packed successfully
    pub transactions_encoded: AtomicU64,

    /// Transactions skipped (encoding overflow, oversized)
    pub transactions_rejected: AtomicU64,

    /// Chunks closed
    pub chunks_built: AtomicU64,

    /// Signatures folded into aggregates
    pub signatures_aggregated: AtomicU64,

    /// Roots handed to the scheduler
    pub roots_scheduled: AtomicU64,

    /// Batches the sink accepted
    pub batches_confirmed: AtomicU64,

    /// Batches refused, timed out or failing signature checks
    pub batches_failed: AtomicU64,

    /// Gas spent on confirmed publications and commitments
    pub gas_used: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record packed and rejected transfers
    pub fn record_encoding(&self, encoded: usize, rejected: usize) {
        self.transactions_encoded
            .fetch_add(encoded as u64, Ordering::Relaxed);
        self.transactions_rejected
            .fetch_add(rejected as u64, Ordering::Relaxed);
    }

    /// Record a transaction the chunker refused
    pub fn record_oversized(&self) {
        self.transactions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a closed chunk and the signatures aggregated over it
    pub fn record_chunk(&self, signatures: usize) {
        self.chunks_built.fetch_add(1, Ordering::Relaxed);
        self.signatures_aggregated
            .fetch_add(signatures as u64, Ordering::Relaxed);
    }

    /// Record roots handed to the scheduler
    pub fn record_roots(&self, roots: usize) {
        self.roots_scheduled
            .fetch_add(roots as u64, Ordering::Relaxed);
    }

    /// Record a confirmed batch
    pub fn record_confirmed(&self, gas_used: u64) {
        self.batches_confirmed.fetch_add(1, Ordering::Relaxed);
        self.gas_used.fetch_add(gas_used, Ordering::Relaxed);
    }

    /// Record a failed batch
    pub fn record_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get batches confirmed
    pub fn get_batches_confirmed(&self) -> u64 {
        self.batches_confirmed.load(Ordering::Relaxed)
    }

    /// Get average signatures per chunk
    pub fn get_avg_signatures_per_chunk(&self) -> f64 {
        let chunks = self.chunks_built.load(Ordering::Relaxed);
        if chunks == 0 {
            return 0.0;
        }
        self.signatures_aggregated.load(Ordering::Relaxed) as f64 / chunks as f64
    }
}
