//! # Cost Ledger Task
//!
//! The [`CostLedger`] has exactly one writer: a tokio task fed by an mpsc
//! channel. Submitters send [`LedgerEvent::Record`]; readers ask for a
//! snapshot through a oneshot reply. When every [`LedgerHandle`] is dropped
//! the task ends and hands back the final ledger.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::domain::{CostEntry, CostKind, CostLedger, CostReport};
use crate::error::{BatchCommitmentError, Result};

/// Messages understood by the ledger task.
#[derive(Debug)]
pub enum LedgerEvent {
    /// A confirmed expense
    Record(CostEntry),
    /// Every expense of one confirmed batch, applied together
    Settle(Vec<CostEntry>),
    /// Request a report
    Snapshot {
        /// Reply channel
        reply: oneshot::Sender<CostReport>,
    },
}

/// Cloneable sender side of the ledger task.
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerEvent>,
}

impl LedgerHandle {
    /// Record confirmed gas.
    pub async fn record(&self, kind: CostKind, sequence: u64, gas_used: u64) -> Result<()> {
        self.sender
            .send(LedgerEvent::Record(CostEntry {
                kind,
                sequence,
                gas_used,
            }))
            .await
            .map_err(|_| {
                error!(
                    "[qc-18] Cost ledger gone, {:?} gas for {} not recorded",
                    kind, sequence
                );
                BatchCommitmentError::LedgerClosed
            })
    }

    /// Record a confirmed batch's expenses as one event.
    ///
    /// Either all entries reach the ledger or none do.
    pub async fn settle(&self, entries: Vec<CostEntry>) -> Result<()> {
        let count = entries.len();
        self.sender
            .send(LedgerEvent::Settle(entries))
            .await
            .map_err(|_| {
                error!("[qc-18] Cost ledger gone, {} entries not recorded", count);
                BatchCommitmentError::LedgerClosed
            })
    }

    /// Report reflecting every event sent before this call.
    pub async fn snapshot(&self) -> Result<CostReport> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(LedgerEvent::Snapshot { reply })
            .await
            .map_err(|_| BatchCommitmentError::LedgerClosed)?;
        response.await.map_err(|_| BatchCommitmentError::LedgerClosed)
    }
}

/// Start the ledger task.
///
/// `block_capacity` is the gas capacity of one base-ledger block, used for
/// block-equivalent figures in snapshots.
pub fn spawn_ledger(
    channel_capacity: usize,
    block_capacity: u64,
) -> (LedgerHandle, JoinHandle<CostLedger>) {
    let (sender, mut receiver) = mpsc::channel(channel_capacity.max(1));

    let task = tokio::spawn(async move {
        let mut ledger = CostLedger::new();

        while let Some(event) = receiver.recv().await {
            match event {
                LedgerEvent::Record(entry) => {
                    debug!(
                        "[qc-18] Ledger: {:?} #{} +{} gas",
                        entry.kind, entry.sequence, entry.gas_used
                    );
                    ledger.add(entry.kind, entry.sequence, entry.gas_used);
                }
                LedgerEvent::Settle(entries) => {
                    debug!("[qc-18] Ledger: settling {} entries", entries.len());
                    for entry in entries {
                        ledger.add(entry.kind, entry.sequence, entry.gas_used);
                    }
                }
                LedgerEvent::Snapshot { reply } => {
                    // Reader may have given up
                    let _ = reply.send(ledger.report(block_capacity));
                }
            }
        }

        info!(
            "[qc-18] Cost ledger closed: {} entries, {} gas",
            ledger.entries().len(),
            ledger.total_gas()
        );
        ledger
    });

    (LedgerHandle { sender }, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitive_types::U256;

    #[tokio::test]
    async fn test_records_are_ordered_before_snapshot() {
        let (handle, task) = spawn_ledger(8, 10);

        handle.record(CostKind::RootPublication, 0, 15).await.unwrap();
        handle.record(CostKind::BlockCommitment, 1, 20).await.unwrap();

        let report = handle.snapshot().await.unwrap();
        assert_eq!(report.total_gas, U256::from(35));
        assert_eq!(report.block_equivalents, U256::from(3));

        drop(handle);
        let ledger = task.await.unwrap();
        assert_eq!(ledger.entries().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_writers() {
        let (handle, task) = spawn_ledger(4, 1_000);

        let writers: Vec<_> = (0..10u64)
            .map(|i| {
                let handle = handle.clone();
                tokio::spawn(async move {
                    handle.record(CostKind::BlockCommitment, i, 100).await.unwrap();
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        assert_eq!(handle.snapshot().await.unwrap().total_gas, U256::from(1_000));
        drop(handle);
        assert_eq!(task.await.unwrap().entries().len(), 10);
    }

    #[tokio::test]
    async fn test_settle_applies_all_entries() {
        let (handle, _task) = spawn_ledger(1, 100);
        handle
            .settle(vec![
                CostEntry {
                    kind: CostKind::RootPublication,
                    sequence: 0,
                    gas_used: 40,
                },
                CostEntry {
                    kind: CostKind::BlockCommitment,
                    sequence: 1,
                    gas_used: 60,
                },
            ])
            .await
            .unwrap();

        let report = handle.snapshot().await.unwrap();
        assert_eq!(report.entries, 2);
        assert_eq!(report.root_publication_gas, U256::from(40));
        assert_eq!(report.total_gas, U256::from(100));
    }

    #[tokio::test]
    async fn test_closed_ledger() {
        let (handle, task) = spawn_ledger(1, 1);
        task.abort();
        let _ = task.await;

        assert_eq!(
            handle.record(CostKind::BlockCommitment, 1, 1).await,
            Err(BatchCommitmentError::LedgerClosed)
        );
    }
}
