//! In-memory Commitment Sink
//!
//! Implements `CommitmentSink` by simulating the base-ledger contract:
//! bond equality, roots per commitment, block reference freshness, slot
//! ordering, and that committed roots were published first. Publications
//! occupy root slots by global index; identical roots at different indices
//! are separate publications.
//!
//! Gas is charged from a deterministic [`GasSchedule`] so cost reports are
//! reproducible. Rejections and delays can be injected for tests.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use primitive_types::U256;
use tracing::{debug, info, warn};

use crate::domain::merkle::keccak256;
use crate::domain::{BlockReference, Hash, RejectionReason, Root};
use crate::error::Result;
use crate::ports::outbound::{CommitmentSink, RootPublication, SinkReceipt, SubmitRequest};

/// Gas charged per call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasSchedule {
    /// Fixed cost of a publication
    pub publication_base: u64,
    /// Cost per payload byte
    pub publication_per_byte: u64,
    /// Cost of checking one aggregate signature
    pub signature_check: u64,
    /// Fixed cost of a commitment
    pub commitment_base: u64,
    /// Cost per committed root
    pub commitment_per_root: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            publication_base: 21_000,
            publication_per_byte: 16,
            signature_check: 113_000,
            commitment_base: 50_000,
            commitment_per_root: 20_000,
        }
    }
}

impl GasSchedule {
    /// Gas for publishing `payload_len` bytes
    pub fn publication(&self, payload_len: usize) -> u64 {
        self.publication_base
            + self.publication_per_byte * payload_len as u64
            + self.signature_check
    }

    /// Gas for committing `roots` roots
    pub fn commitment(&self, roots: usize) -> u64 {
        self.commitment_base + self.commitment_per_root * roots as u64
    }
}

/// Contract parameters.
#[derive(Clone, Debug)]
pub struct InMemorySinkConfig {
    /// Exact bond every commitment must carry
    pub minimum_bond: U256,
    /// Roots accepted per commitment
    pub max_roots_per_commit: usize,
    /// Oldest accepted block reference, in blocks behind head
    pub block_window: u64,
    /// Slot the first commitment must use
    pub first_sequence: u64,
    /// Head block number at start
    pub initial_head: u64,
    /// Gas charged
    pub gas: GasSchedule,
}

impl Default for InMemorySinkConfig {
    fn default() -> Self {
        Self {
            minimum_bond: U256::from(10_000_000_000_000_000u64),
            max_roots_per_commit: crate::DEFAULT_MAX_ROOTS_PER_COMMIT,
            block_window: 255,
            first_sequence: 1,
            initial_head: 1_000,
            gas: GasSchedule::default(),
        }
    }
}

/// A commitment the sink has accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommittedBatch {
    /// Slot
    pub sequence: u64,
    /// Roots
    pub roots: Vec<Root>,
    /// Anchor block
    pub block: BlockReference,
    /// Bond held
    pub bond: U256,
}

#[derive(Debug, Default)]
struct SinkState {
    head: u64,
    next_sequence: u64,
    published: BTreeMap<usize, Root>,
    known: HashSet<Root>,
    committed: BTreeMap<u64, CommittedBatch>,
    injected_rejections: VecDeque<RejectionReason>,
    submit_delay: Option<Duration>,
    publish_delay: Option<Duration>,
}

/// Simulated base-ledger contract.
pub struct InMemoryCommitmentSink {
    config: InMemorySinkConfig,
    state: RwLock<SinkState>,
}

/// Hash the simulated chain assigns to block `number`.
pub fn block_hash(number: u64) -> Hash {
    keccak256(&number.to_be_bytes())
}

impl InMemoryCommitmentSink {
    /// Create a sink with the given parameters.
    pub fn new(config: InMemorySinkConfig) -> Self {
        let state = SinkState {
            head: config.initial_head,
            next_sequence: config.first_sequence,
            ..SinkState::default()
        };
        Self {
            config,
            state: RwLock::new(state),
        }
    }

    /// Contract parameters
    pub fn config(&self) -> &InMemorySinkConfig {
        &self.config
    }

    /// Mine `blocks` empty blocks.
    pub fn advance_blocks(&self, blocks: u64) {
        self.state.write().head += blocks;
    }

    /// Current head block number
    pub fn head(&self) -> u64 {
        self.state.read().head
    }

    /// Refuse the next submission with `reason`.
    pub fn reject_next(&self, reason: RejectionReason) {
        self.state.write().injected_rejections.push_back(reason);
    }

    /// Hold the next submission for `delay` before answering.
    pub fn delay_next_submit(&self, delay: Duration) {
        self.state.write().submit_delay = Some(delay);
    }

    /// Hold the next publication for `delay` before answering.
    pub fn delay_next_publication(&self, delay: Duration) {
        self.state.write().publish_delay = Some(delay);
    }

    /// Accepted commitments in slot order
    pub fn committed_batches(&self) -> Vec<CommittedBatch> {
        self.state.read().committed.values().cloned().collect()
    }

    /// Number of published roots
    pub fn published_roots(&self) -> usize {
        self.state.read().published.len()
    }

    /// Whether `root` has been published
    pub fn is_published(&self, root: &Root) -> bool {
        self.state.read().known.contains(root)
    }

    fn check_block(&self, head: u64, block: &BlockReference) -> bool {
        block.number <= head
            && head - block.number <= self.config.block_window
            && block.hash == block_hash(block.number)
    }

    fn validate(&self, state: &SinkState, request: &SubmitRequest) -> Option<RejectionReason> {
        if request.bond != self.config.minimum_bond {
            return Some(RejectionReason::InsufficientBond);
        }
        if request.roots.is_empty() || request.roots.len() > self.config.max_roots_per_commit {
            return Some(RejectionReason::TooManyRoots);
        }
        if !self.check_block(state.head, &request.block) {
            return Some(RejectionReason::StaleBlockReference);
        }
        if request.sequence < state.next_sequence {
            return Some(RejectionReason::SlotTaken);
        }
        if request.sequence > state.next_sequence {
            return Some(RejectionReason::OutOfOrder);
        }
        if request.roots.iter().any(|r| !state.known.contains(r)) {
            return Some(RejectionReason::UnknownRoot);
        }
        None
    }
}

impl Default for InMemoryCommitmentSink {
    fn default() -> Self {
        Self::new(InMemorySinkConfig::default())
    }
}

#[async_trait]
impl CommitmentSink for InMemoryCommitmentSink {
    async fn latest_block(&self, depth: u64) -> Result<BlockReference> {
        let number = self.state.read().head.saturating_sub(depth);
        Ok(BlockReference {
            number,
            hash: block_hash(number),
        })
    }

    async fn minimum_bond(&self) -> Result<U256> {
        Ok(self.config.minimum_bond)
    }

    async fn publish_root(&self, publication: &RootPublication) -> Result<SinkReceipt> {
        let delay = self.state.write().publish_delay.take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write();
        if state.published.contains_key(&publication.root_index) {
            debug!(
                "[qc-18] Sink: root #{} already published",
                publication.root_index
            );
            return Ok(SinkReceipt::rejected(RejectionReason::DuplicateRoot));
        }
        state.published.insert(publication.root_index, publication.root);
        state.known.insert(publication.root);

        let gas = self.config.gas.publication(publication.payload.len());
        debug!(
            "[qc-18] Sink: published root #{} {:?} ({} bytes, {} gas)",
            publication.root_index,
            publication.root,
            publication.payload.len(),
            gas
        );
        Ok(SinkReceipt::accepted(gas))
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<SinkReceipt> {
        let delay = self.state.write().submit_delay.take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write();
        let reason = state
            .injected_rejections
            .pop_front()
            .or_else(|| self.validate(&state, request));

        if let Some(reason) = reason {
            warn!(
                "[qc-18] Sink: commitment {} rejected: {}",
                request.sequence, reason
            );
            return Ok(SinkReceipt::rejected(reason));
        }

        let gas = self.config.gas.commitment(request.roots.len());
        state.committed.insert(
            request.sequence,
            CommittedBatch {
                sequence: request.sequence,
                roots: request.roots.clone(),
                block: request.block,
                bond: request.bond,
            },
        );
        state.next_sequence += 1;
        state.head += 1;

        info!(
            "[qc-18] Sink: commitment {} accepted ({} roots, {} gas)",
            request.sequence,
            request.roots.len(),
            gas
        );
        Ok(SinkReceipt::accepted(gas))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::outbound::SubmissionOverrides;

    fn publication(root: Root) -> RootPublication {
        RootPublication {
            root,
            root_index: 0,
            producer: [0u8; 20],
            fee_token: [0u8; 20],
            payload: vec![0u8; 240],
            aggregate_signature: vec![0u8; 48],
            overrides: SubmissionOverrides::default(),
        }
    }

    async fn request(sink: &InMemoryCommitmentSink, sequence: u64, roots: Vec<Root>) -> SubmitRequest {
        SubmitRequest {
            block: sink.latest_block(7).await.unwrap(),
            sequence,
            roots,
            bond: sink.minimum_bond().await.unwrap(),
            overrides: SubmissionOverrides::default(),
        }
    }

    #[tokio::test]
    async fn test_publish_then_commit() {
        let sink = InMemoryCommitmentSink::default();
        let root = Root([1u8; 32]);

        let published = sink.publish_root(&publication(root)).await.unwrap();
        assert!(published.accepted);
        assert_eq!(published.gas_used, GasSchedule::default().publication(240));

        let receipt = sink.submit(&request(&sink, 1, vec![root]).await).await.unwrap();
        assert!(receipt.accepted);
        assert_eq!(receipt.gas_used, GasSchedule::default().commitment(1));
        assert_eq!(sink.committed_batches().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_publication() {
        let sink = InMemoryCommitmentSink::default();
        let root = Root([2u8; 32]);
        sink.publish_root(&publication(root)).await.unwrap();

        let again = sink.publish_root(&publication(root)).await.unwrap();
        assert_eq!(again.reason, Some(RejectionReason::DuplicateRoot));
    }

    #[tokio::test]
    async fn test_identical_roots_in_distinct_slots() {
        let sink = InMemoryCommitmentSink::default();
        let root = Root([3u8; 32]);
        let mut second = publication(root);
        second.root_index = 1;

        assert!(sink.publish_root(&publication(root)).await.unwrap().accepted);
        assert!(sink.publish_root(&second).await.unwrap().accepted);
        assert_eq!(sink.published_roots(), 2);
    }

    #[tokio::test]
    async fn test_unpublished_root_rejected() {
        let sink = InMemoryCommitmentSink::default();
        let receipt = sink
            .submit(&request(&sink, 1, vec![Root([9u8; 32])]).await)
            .await
            .unwrap();
        assert_eq!(receipt.reason, Some(RejectionReason::UnknownRoot));
    }

    #[tokio::test]
    async fn test_bond_must_match() {
        let sink = InMemoryCommitmentSink::default();
        let root = Root([3u8; 32]);
        sink.publish_root(&publication(root)).await.unwrap();

        let mut req = request(&sink, 1, vec![root]).await;
        req.bond = U256::from(1);
        let receipt = sink.submit(&req).await.unwrap();
        assert_eq!(receipt.reason, Some(RejectionReason::InsufficientBond));
    }

    #[tokio::test]
    async fn test_stale_block_reference() {
        let sink = InMemoryCommitmentSink::default();
        let root = Root([4u8; 32]);
        sink.publish_root(&publication(root)).await.unwrap();

        let req = request(&sink, 1, vec![root]).await;
        sink.advance_blocks(1_000);
        let receipt = sink.submit(&req).await.unwrap();
        assert_eq!(receipt.reason, Some(RejectionReason::StaleBlockReference));
    }

    #[tokio::test]
    async fn test_slot_ordering() {
        let sink = InMemoryCommitmentSink::default();
        let a = Root([5u8; 32]);
        let b = Root([6u8; 32]);
        sink.publish_root(&publication(a)).await.unwrap();
        sink.publish_root(&publication(b)).await.unwrap();

        let ahead = sink.submit(&request(&sink, 2, vec![a]).await).await.unwrap();
        assert_eq!(ahead.reason, Some(RejectionReason::OutOfOrder));

        assert!(sink.submit(&request(&sink, 1, vec![a]).await).await.unwrap().accepted);

        let taken = sink.submit(&request(&sink, 1, vec![b]).await).await.unwrap();
        assert_eq!(taken.reason, Some(RejectionReason::SlotTaken));
    }

    #[tokio::test]
    async fn test_too_many_roots() {
        let sink = InMemoryCommitmentSink::new(InMemorySinkConfig {
            max_roots_per_commit: 1,
            ..InMemorySinkConfig::default()
        });
        let roots = vec![Root([7u8; 32]), Root([8u8; 32])];
        for root in &roots {
            sink.publish_root(&publication(*root)).await.unwrap();
        }
        let receipt = sink.submit(&request(&sink, 1, roots).await).await.unwrap();
        assert_eq!(receipt.reason, Some(RejectionReason::TooManyRoots));
    }

    #[tokio::test]
    async fn test_injected_rejection_consumed_once() {
        let sink = InMemoryCommitmentSink::default();
        let root = Root([10u8; 32]);
        sink.publish_root(&publication(root)).await.unwrap();
        sink.reject_next(RejectionReason::Other("maintenance".into()));

        let first = sink.submit(&request(&sink, 1, vec![root]).await).await.unwrap();
        assert!(!first.accepted);
        let second = sink.submit(&request(&sink, 1, vec![root]).await).await.unwrap();
        assert!(second.accepted);
    }

    #[tokio::test]
    async fn test_latest_block_depth() {
        let sink = InMemoryCommitmentSink::default();
        let block = sink.latest_block(7).await.unwrap();
        assert_eq!(block.number, sink.head() - 7);
        assert_eq!(block.hash, block_hash(block.number));
    }
}
