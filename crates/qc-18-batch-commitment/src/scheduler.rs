//! # Commitment Scheduler
//!
//! Groups roots into [`CommitBatch`]es of at most `max_roots_per_commit`,
//! publishes their roots and commits them through the [`CommitmentSink`].
//!
//! ## State Machine
//!
//! ```text
//! Assembling ──► Submitting ──► Confirmed
//!                     │
//!                     └──► Rejected ──(resubmit)──► Submitting
//! ```
//!
//! Sink answers are awaited under `submission_timeout`. A rejected or timed
//! out batch is retained in `pending` with its roots untouched; nothing is
//! retried automatically because a bonded submission may already be in the
//! mempool. While a lower sequence is pending no later batch is submitted.
//!
//! Gas is charged to the cost ledger once per confirmed batch, publications
//! and commitment together. A failed attempt leaves the ledger untouched.

use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use primitive_types::U256;
use tracing::{debug, info, warn};

use crate::domain::{
    BatchState, BlockReference, CommitBatch, CostEntry, CostKind, RejectionReason, Root,
};
use crate::error::{BatchCommitmentError, Result};
use crate::ledger::LedgerHandle;
use crate::ports::inbound::SubmissionReceipt;
use crate::ports::outbound::{
    CommitmentSink, RootPublication, SinkReceipt, SubmissionOverrides, SubmitRequest,
};

/// Scheduler parameters.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Roots per commitment
    pub max_roots_per_commit: usize,
    /// Bond attached to every commitment
    pub bond: U256,
    /// Budget for each sink call
    pub submission_timeout: Duration,
    /// Sequence number of the first batch
    pub first_sequence: u64,
    /// Session transaction parameters
    pub overrides: SubmissionOverrides,
}

#[derive(Debug)]
struct PendingBatch {
    batch: CommitBatch,
    unpublished: VecDeque<RootPublication>,
    /// Accepted publications, charged only once the batch confirms
    publication_costs: Vec<CostEntry>,
    /// Commitment the sink accepted but the ledger has not booked
    unbooked: Option<SubmissionReceipt>,
}

impl PendingBatch {
    fn new(batch: CommitBatch, publications: Vec<RootPublication>) -> Self {
        Self {
            batch,
            unpublished: publications.into(),
            publication_costs: Vec::new(),
            unbooked: None,
        }
    }
}

/// Batches roots and drives them through the sink.
pub struct CommitmentScheduler {
    sink: Arc<dyn CommitmentSink>,
    ledger: LedgerHandle,
    config: SchedulerConfig,
    assembling: Vec<Root>,
    assembling_start: usize,
    next_sequence: u64,
    next_root_index: usize,
    pending: BTreeMap<u64, PendingBatch>,
}

impl CommitmentScheduler {
    /// Create a scheduler.
    ///
    /// # Errors
    /// * `InvalidConfig` if `max_roots_per_commit` is zero
    pub fn new(
        sink: Arc<dyn CommitmentSink>,
        ledger: LedgerHandle,
        config: SchedulerConfig,
    ) -> Result<Self> {
        if config.max_roots_per_commit == 0 {
            return Err(BatchCommitmentError::InvalidConfig(
                "max_roots_per_commit must be non-zero".into(),
            ));
        }
        Ok(Self {
            sink,
            ledger,
            next_sequence: config.first_sequence,
            config,
            assembling: Vec::new(),
            assembling_start: 0,
            next_root_index: 0,
            pending: BTreeMap::new(),
        })
    }

    /// Append a root; returns the batch it completed, if any.
    pub fn push_root(&mut self, root: Root) -> Option<CommitBatch> {
        self.assembling.push(root);
        self.next_root_index += 1;

        if self.assembling.len() == self.config.max_roots_per_commit {
            Some(self.seal())
        } else {
            None
        }
    }

    /// Close the partial batch at end of input.
    pub fn close(&mut self) -> Option<CommitBatch> {
        if self.assembling.is_empty() {
            None
        } else {
            Some(self.seal())
        }
    }

    fn seal(&mut self) -> CommitBatch {
        let batch = CommitBatch {
            sequence: self.next_sequence,
            first_root_index: self.assembling_start,
            roots: std::mem::take(&mut self.assembling),
            bond: self.config.bond,
            block: None,
            state: BatchState::Assembling,
        };
        self.next_sequence += 1;
        self.assembling_start = self.next_root_index;

        debug!(
            "[qc-18] Sealed batch {} with {} roots ({:?})",
            batch.sequence,
            batch.len(),
            batch.root_range()
        );
        batch
    }

    /// Sequence the next sealed batch will get
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Global index the next pushed root will get
    pub fn next_root_index(&self) -> usize {
        self.next_root_index
    }

    /// Roots waiting for the current batch to fill
    pub fn assembling_len(&self) -> usize {
        self.assembling.len()
    }

    /// Retained batch sequences, ascending
    pub fn pending_sequences(&self) -> Vec<u64> {
        self.pending.keys().copied().collect()
    }

    /// A retained batch
    pub fn pending_batch(&self, sequence: u64) -> Option<&CommitBatch> {
        self.pending.get(&sequence).map(|p| &p.batch)
    }

    /// Publish the batch's roots and commit it, anchored at `block`.
    ///
    /// `publications` must cover every root of the batch, in order.
    ///
    /// # Errors
    /// * `SubmissionRejected` if the sink refused, or a lower sequence is
    ///   still pending (`PredecessorRejected`)
    /// * `Timeout` if the sink did not answer within budget
    /// * `LedgerClosed` if the sink confirmed the batch but its cost could
    ///   not be booked; the batch stays pending in its `Confirmed` state
    ///
    /// On rejection or timeout the batch is retained for [`Self::resubmit`].
    /// Publication gas reaches the ledger only together with the
    /// commitment gas of a confirmed batch.
    pub async fn submit(
        &mut self,
        mut batch: CommitBatch,
        publications: Vec<RootPublication>,
        block: BlockReference,
    ) -> Result<SubmissionReceipt> {
        if let Some(&blocking) = self.pending.range(..batch.sequence).next().map(|(s, _)| s) {
            batch.block = Some(block);
            return Err(self.retain(
                PendingBatch::new(batch, publications),
                RejectionReason::PredecessorRejected { sequence: blocking },
            ));
        }
        self.dispatch(PendingBatch::new(batch, publications), block)
            .await
    }

    /// Offer a retained batch again, anchored at a fresh `block`.
    ///
    /// Roots already published are not published again. A batch the sink
    /// already confirmed is not sent again; only its cost booking is retried.
    ///
    /// # Errors
    /// * `UnknownBatch` if `sequence` is not pending
    /// * as [`Self::submit`]
    pub async fn resubmit(
        &mut self,
        sequence: u64,
        block: BlockReference,
    ) -> Result<SubmissionReceipt> {
        if let Some(&blocking) = self.pending.range(..sequence).next().map(|(s, _)| s) {
            let root_range = self
                .pending
                .get(&sequence)
                .map(|p| p.batch.root_range())
                .ok_or(BatchCommitmentError::UnknownBatch(sequence))?;
            return Err(BatchCommitmentError::SubmissionRejected {
                sequence,
                reason: RejectionReason::PredecessorRejected { sequence: blocking },
                root_range,
            });
        }

        let pending = self
            .pending
            .remove(&sequence)
            .ok_or(BatchCommitmentError::UnknownBatch(sequence))?;

        info!("[qc-18] Resubmitting batch {}", sequence);
        self.dispatch(pending, block).await
    }

    async fn answer<F>(&self, call: F) -> Result<Option<SinkReceipt>>
    where
        F: Future<Output = Result<SinkReceipt>>,
    {
        match tokio::time::timeout(self.config.submission_timeout, call).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    async fn dispatch(
        &mut self,
        mut pending: PendingBatch,
        block: BlockReference,
    ) -> Result<SubmissionReceipt> {
        if let Some(receipt) = pending.unbooked.take() {
            return self.book(pending, receipt).await;
        }

        let sequence = pending.batch.sequence;
        pending.batch.block = Some(block);
        pending.batch.state = BatchState::Submitting;
        info!(
            "[qc-18] Submitting batch {}: {} roots, anchor block {}",
            sequence,
            pending.batch.len(),
            block.number
        );

        while let Some(publication) = pending.unpublished.front() {
            let root_index = publication.root_index as u64;
            match self.answer(self.sink.publish_root(publication)).await {
                Ok(Some(receipt)) if receipt.accepted => {
                    pending.publication_costs.push(CostEntry {
                        kind: CostKind::RootPublication,
                        sequence: root_index,
                        gas_used: receipt.gas_used,
                    });
                }
                Ok(Some(SinkReceipt {
                    reason: Some(RejectionReason::DuplicateRoot),
                    ..
                })) => {
                    debug!("[qc-18] Root #{} was already published", root_index);
                }
                Ok(Some(receipt)) => {
                    let reason = receipt
                        .reason
                        .unwrap_or_else(|| RejectionReason::Other("no reason given".into()));
                    return Err(self.retain(pending, reason));
                }
                Ok(None) => return Err(self.retain(pending, RejectionReason::Timeout)),
                Err(error) => {
                    self.retain(pending, RejectionReason::Other(error.to_string()));
                    return Err(error);
                }
            }
            pending.unpublished.pop_front();
        }

        let request = SubmitRequest {
            block,
            sequence,
            roots: pending.batch.roots.clone(),
            bond: pending.batch.bond,
            overrides: self.config.overrides,
        };

        match self.answer(self.sink.submit(&request)).await {
            Ok(Some(receipt)) if receipt.accepted => {
                pending.batch.state = BatchState::Confirmed {
                    gas_used: receipt.gas_used,
                };
                let receipt = SubmissionReceipt {
                    sequence,
                    root_range: pending.batch.root_range(),
                    block,
                    publication_gas: pending.publication_costs.iter().map(|c| c.gas_used).sum(),
                    commitment_gas: receipt.gas_used,
                };
                self.book(pending, receipt).await
            }
            Ok(Some(receipt)) => {
                let reason = receipt
                    .reason
                    .unwrap_or_else(|| RejectionReason::Other("no reason given".into()));
                Err(self.retain(pending, reason))
            }
            Ok(None) => Err(self.retain(pending, RejectionReason::Timeout)),
            Err(error) => {
                self.retain(pending, RejectionReason::Other(error.to_string()));
                Err(error)
            }
        }
    }

    /// Charge a confirmed batch to the ledger in one event.
    ///
    /// If the ledger is gone the batch stays pending in its `Confirmed`
    /// state and a later resubmit only retries the booking.
    async fn book(
        &mut self,
        mut pending: PendingBatch,
        receipt: SubmissionReceipt,
    ) -> Result<SubmissionReceipt> {
        let mut entries = pending.publication_costs.clone();
        entries.push(CostEntry {
            kind: CostKind::BlockCommitment,
            sequence: receipt.sequence,
            gas_used: receipt.commitment_gas,
        });

        if let Err(error) = self.ledger.settle(entries).await {
            warn!(
                "[qc-18] Batch {} committed but its cost is not booked, retained",
                receipt.sequence
            );
            pending.unbooked = Some(receipt);
            self.pending.insert(pending.batch.sequence, pending);
            return Err(error);
        }

        info!(
            "[qc-18] Batch {} confirmed: {} gas (+{} publication gas)",
            receipt.sequence, receipt.commitment_gas, receipt.publication_gas
        );
        Ok(receipt)
    }

    fn retain(
        &mut self,
        mut pending: PendingBatch,
        reason: RejectionReason,
    ) -> BatchCommitmentError {
        let sequence = pending.batch.sequence;
        let root_range = pending.batch.root_range();

        warn!(
            "[qc-18] Batch {} not committed ({}), retained with {} unpublished roots",
            sequence,
            reason,
            pending.unpublished.len()
        );

        let error = match reason {
            RejectionReason::Timeout => BatchCommitmentError::Timeout {
                sequence,
                timeout_ms: self.config.submission_timeout.as_millis() as u64,
                root_range,
            },
            ref other => BatchCommitmentError::SubmissionRejected {
                sequence,
                reason: other.clone(),
                root_range,
            },
        };

        pending.batch.state = BatchState::Rejected { reason };
        self.pending.insert(sequence, pending);
        error
    }
}
