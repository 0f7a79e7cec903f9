//! # Cost Model
//!
//! Accumulates the base-ledger gas spent on root publications and block
//! commitments, and converts it into block equivalents and a price estimate.
//!
//! Only confirmed sink answers are recorded. The ledger is owned by a single
//! task (see [`crate::ledger`]); this type itself is plain data.

use primitive_types::U256;
use serde::Serialize;

/// What a cost entry paid for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum CostKind {
    /// Publishing one root with its chunk payload
    RootPublication,
    /// Committing one batch of roots
    BlockCommitment,
}

/// A single confirmed expense.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CostEntry {
    /// What was paid for
    pub kind: CostKind,
    /// Batch sequence (or global root index for publications)
    pub sequence: u64,
    /// Gas consumed
    pub gas_used: u64,
}

/// Running gas account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CostLedger {
    entries: Vec<CostEntry>,
    total: U256,
}

impl CostLedger {
    /// Empty ledger, zero total
    pub fn new() -> Self {
        Self::default()
    }

    /// Record confirmed gas.
    pub fn add(&mut self, kind: CostKind, sequence: u64, gas_used: u64) {
        self.entries.push(CostEntry {
            kind,
            sequence,
            gas_used,
        });
        self.total = self.total.saturating_add(U256::from(gas_used));
    }

    /// Cumulative gas
    pub fn total_gas(&self) -> U256 {
        self.total
    }

    /// Cumulative gas of one kind
    pub fn gas_by_kind(&self, kind: CostKind) -> U256 {
        self.entries
            .iter()
            .filter(|e| e.kind == kind)
            .fold(U256::zero(), |acc, e| acc.saturating_add(U256::from(e.gas_used)))
    }

    /// Recorded entries in confirmation order
    pub fn entries(&self) -> &[CostEntry] {
        &self.entries
    }

    /// Whole base-ledger blocks the total gas would fill.
    ///
    /// Integer division; a zero capacity yields zero.
    pub fn block_equivalents(&self, block_capacity: u64) -> U256 {
        if block_capacity == 0 {
            return U256::zero();
        }
        self.total / U256::from(block_capacity)
    }

    /// Block equivalents multiplied by a per-block price.
    pub fn estimated_cost(&self, block_capacity: u64, price_per_block: u64) -> U256 {
        self.block_equivalents(block_capacity)
            .saturating_mul(U256::from(price_per_block))
    }

    /// Point-in-time report.
    pub fn report(&self, block_capacity: u64) -> CostReport {
        CostReport {
            total_gas: self.total,
            root_publication_gas: self.gas_by_kind(CostKind::RootPublication),
            block_commitment_gas: self.gas_by_kind(CostKind::BlockCommitment),
            block_capacity,
            block_equivalents: self.block_equivalents(block_capacity),
            entries: self.entries.len(),
        }
    }
}

/// Snapshot of the cost ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CostReport {
    /// Cumulative gas
    pub total_gas: U256,
    /// Gas spent publishing roots
    pub root_publication_gas: U256,
    /// Gas spent committing batches
    pub block_commitment_gas: U256,
    /// Gas capacity of one base-ledger block
    pub block_capacity: u64,
    /// `total_gas / block_capacity`
    pub block_equivalents: U256,
    /// Number of recorded entries
    pub entries: usize,
}

impl CostReport {
    /// Estimated spend at `price_per_block`.
    pub fn estimated_cost(&self, price_per_block: u64) -> U256 {
        self.block_equivalents
            .saturating_mul(U256::from(price_per_block))
    }
}
