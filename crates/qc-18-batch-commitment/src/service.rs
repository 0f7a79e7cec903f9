//! # Batch Pipeline Service
//!
//! Wires encoder, chunker, root builder, aggregator and scheduler end to end.
//!
//! ## Flow
//!
//! ```text
//!  spawn_blocking (rayon)                       tokio task
//! ┌──────────────────────────────┐  bounded   ┌───────────────────────────┐
//! │ chunk ─► group of N chunks   │  mpsc      │ push roots ─► seal batch  │
//! │   roots + aggregates (par)   ├───────────►│ publish roots ─► commit   │
//! │   verify / bisect            │            │ record cost (ledger task) │
//! └──────────────────────────────┘            └───────────────────────────┘
//! ```
//!
//! A group holds `max_roots_per_commit` chunks, so each message becomes
//! exactly one commit batch. The channel holds `max_in_flight_batches`
//! groups: production runs ahead of submission with bounded memory.
//!
//! The first failing batch halts the run. Later groups are dropped and the
//! report names the first input index that was not scheduled.

use std::sync::Arc;

use rayon::prelude::*;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::CommitChainConfig;
use crate::domain::merkle::build_root;
use crate::domain::{
    encode, Address, AggregateSignature, BlsPublicKey, BlsSignature, Chunk, Chunker,
    CostLedger, CostReport, KeyPair, PackedTransaction, RejectedTransaction, Root,
    SignedTransaction, Transfer,
};
use crate::error::{BatchCommitmentError, Result};
use crate::ledger::{spawn_ledger, LedgerHandle};
use crate::metrics::Metrics;
use crate::ports::inbound::{BatchCommitmentApi, BatchOutcome, PipelineReport, SubmissionReceipt};
use crate::ports::outbound::{
    CommitmentSink, GasOracle, RootPublication, SignatureProvider, SubmissionOverrides,
};
use crate::scheduler::{CommitmentScheduler, SchedulerConfig};

/// Buffered ledger events
const LEDGER_CHANNEL_CAPACITY: usize = 256;

/// A chunk ready for publication.
#[derive(Debug)]
struct ChunkArtifact {
    chunk: Chunk,
    root: Root,
    aggregate: AggregateSignature,
}

/// A group whose aggregates did not verify.
#[derive(Debug)]
struct InvalidGroup {
    first_transaction: usize,
    roots: usize,
    root_offsets: Vec<usize>,
    signature_count: usize,
    invalid_transactions: Vec<usize>,
}

#[derive(Debug)]
enum Produced {
    Group(Vec<ChunkArtifact>),
    Invalid(InvalidGroup),
}

#[derive(Debug, Default)]
struct ProducerSummary {
    chunks: usize,
    chunked: usize,
    rejected: Vec<RejectedTransaction>,
}

#[derive(Clone, Copy, Debug)]
struct ProducerSettings {
    max_root_size: usize,
    group_size: usize,
    verify: bool,
    isolate: bool,
}

/// End-to-end batch producer.
pub struct BatchPipeline {
    config: CommitChainConfig,
    sink: Arc<dyn CommitmentSink>,
    provider: Arc<dyn SignatureProvider>,
    ledger: LedgerHandle,
    ledger_task: JoinHandle<CostLedger>,
    scheduler: Mutex<CommitmentScheduler>,
    metrics: Arc<Metrics>,
    producer: Address,
    fee_token: Address,
    overrides: SubmissionOverrides,
}

impl BatchPipeline {
    /// Validate configuration, query the gas oracle and the sink's bond,
    /// and start the cost ledger task.
    ///
    /// # Errors
    /// * `InvalidConfig` if the configuration is inconsistent or the
    ///   configured bond differs from the bond the sink requires
    /// * any error from the oracle or sink
    pub async fn start(
        config: CommitChainConfig,
        sink: Arc<dyn CommitmentSink>,
        provider: Arc<dyn SignatureProvider>,
        oracle: Arc<dyn GasOracle>,
    ) -> Result<Self> {
        config.validate()?;
        provider.initialize()?;
        let producer = config.producer()?;
        let fee_token = config.fee_token()?;

        let price = oracle.current_price().await?;
        let overrides = SubmissionOverrides {
            gas_limit: config.gas.gas_limit,
            gas_price: price.safe,
        };

        let minimum = sink.minimum_bond().await?;
        if config.bond() != minimum {
            return Err(BatchCommitmentError::InvalidConfig(format!(
                "bond {} does not match sink minimum {}",
                config.bond(),
                minimum
            )));
        }

        let (ledger, ledger_task) =
            spawn_ledger(LEDGER_CHANNEL_CAPACITY, config.gas.ledger_block_capacity);

        let scheduler = CommitmentScheduler::new(
            sink.clone(),
            ledger.clone(),
            SchedulerConfig {
                max_roots_per_commit: config.batching.max_roots_per_commit,
                bond: config.bond(),
                submission_timeout: config.batching.submission_timeout(),
                first_sequence: config.batching.first_sequence,
                overrides,
            },
        )?;

        info!(
            "[qc-18] Batch pipeline started: max root size {}, {} roots per commit, gas price {}",
            config.batching.max_root_size, config.batching.max_roots_per_commit, overrides.gas_price
        );

        Ok(Self {
            config,
            sink,
            provider,
            ledger,
            ledger_task,
            scheduler: Mutex::new(scheduler),
            metrics: Arc::new(Metrics::new()),
            producer,
            fee_token,
            overrides,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &CommitChainConfig {
        &self.config
    }

    /// Counters
    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    /// Transaction parameters fixed at start
    pub fn overrides(&self) -> SubmissionOverrides {
        self.overrides
    }

    /// Stop the pipeline and return the final cost ledger.
    pub async fn shutdown(self) -> Result<CostLedger> {
        let Self {
            ledger,
            ledger_task,
            scheduler,
            ..
        } = self;
        drop(scheduler);
        drop(ledger);

        ledger_task.await.map_err(|e| {
            error!("[qc-18] Cost ledger task failed: {}", e);
            BatchCommitmentError::InternalError(format!("ledger task: {}", e))
        })
    }

    fn publication(&self, artifact: &ChunkArtifact, root_index: usize) -> RootPublication {
        RootPublication {
            root: artifact.root,
            root_index,
            producer: self.producer,
            fee_token: self.fee_token,
            payload: artifact.chunk.payload(),
            aggregate_signature: self.provider.to_wire_format(&artifact.aggregate),
            overrides: self.overrides,
        }
    }

    async fn run(
        &self,
        items: Vec<(usize, SignedTransaction)>,
        transactions: usize,
        mut rejected: Vec<RejectedTransaction>,
    ) -> Result<PipelineReport> {
        let mut scheduler = self.scheduler.lock().await;
        let batching = &self.config.batching;

        let (sender, mut receiver) = mpsc::channel(batching.max_in_flight_batches);
        let settings = ProducerSettings {
            max_root_size: batching.max_root_size,
            group_size: batching.max_roots_per_commit,
            verify: batching.verify_aggregates,
            isolate: batching.isolate_invalid,
        };
        let provider = self.provider.clone();
        let metrics = self.metrics.clone();
        let producer =
            tokio::task::spawn_blocking(move || produce(items, settings, provider, metrics, sender));

        let mut report = PipelineReport {
            transactions,
            ..PipelineReport::default()
        };

        while let Some(message) = receiver.recv().await {
            let artifacts = match message {
                Produced::Group(artifacts) => artifacts,
                Produced::Invalid(group) => {
                    let first_root = scheduler.next_root_index();
                    let sequence = scheduler.next_sequence();
                    let error = BatchCommitmentError::InvalidSignature {
                        batch_sequence: sequence,
                        root_indices: group.root_offsets.iter().map(|o| first_root + o).collect(),
                        signature_count: group.signature_count,
                        invalid_transactions: group.invalid_transactions,
                    };
                    error!("[qc-18] {}", error);
                    self.metrics.record_failed();
                    report.batches.push(BatchOutcome::Failed {
                        sequence,
                        root_range: first_root..first_root + group.roots,
                        error,
                    });
                    report.resume_from = Some(group.first_transaction);
                    break;
                }
            };

            let first_transaction = artifacts.first().map(|a| a.chunk.first_index()).unwrap_or(0);
            let end_transaction = artifacts
                .last()
                .and_then(|a| a.chunk.indices().last())
                .map_or(first_transaction, |last| last + 1);

            // Anchor first so a failing head query leaves nothing sealed
            let block = match self.sink.latest_block(batching.block_reference_depth).await {
                Ok(block) => block,
                Err(error) => {
                    let first_root = scheduler.next_root_index();
                    warn!("[qc-18] Cannot fetch anchor block: {}", error);
                    self.metrics.record_failed();
                    report.batches.push(BatchOutcome::Failed {
                        sequence: scheduler.next_sequence(),
                        root_range: first_root..first_root + artifacts.len(),
                        error,
                    });
                    report.resume_from = Some(first_transaction);
                    break;
                }
            };

            let mut publications = Vec::with_capacity(artifacts.len());
            let mut sealed = None;
            for artifact in &artifacts {
                publications.push(self.publication(artifact, scheduler.next_root_index()));
                sealed = scheduler.push_root(artifact.root).or(sealed);
            }
            let Some(batch) = sealed.or_else(|| scheduler.close()) else {
                continue;
            };

            self.metrics.record_roots(artifacts.len());
            report.roots += artifacts.len();
            let sequence = batch.sequence;
            let root_range = batch.root_range();

            match scheduler.submit(batch, publications, block).await {
                Ok(receipt) => {
                    self.metrics
                        .record_confirmed(receipt.publication_gas + receipt.commitment_gas);
                    report.batches.push(BatchOutcome::Confirmed(receipt));
                }
                Err(error) if error.is_batch_fatal() => {
                    self.metrics.record_failed();
                    report.batches.push(BatchOutcome::Failed {
                        sequence,
                        root_range,
                        error,
                    });
                    report.resume_from = Some(end_transaction);
                    break;
                }
                Err(error) => return Err(error),
            }
        }

        // Unblocks the producer if the run halted
        drop(receiver);

        let summary = producer
            .await
            .map_err(|e| BatchCommitmentError::InternalError(format!("producer task: {}", e)))??;

        report.chunks = summary.chunks;
        report.chunked = summary.chunked;
        rejected.extend(summary.rejected);
        rejected.sort_by_key(|r| r.index);
        report.rejected = rejected;
        report.cost = self.ledger.snapshot().await?;

        info!(
            "[qc-18] Run complete: {} txs, {} chunks, {} roots, {}/{} batches confirmed, {} gas{}",
            report.transactions,
            report.chunks,
            report.roots,
            report.confirmed_batches(),
            report.batches.len(),
            report.cost.total_gas,
            report
                .resume_from
                .map(|i| format!(", halted (resume from tx {})", i))
                .unwrap_or_default()
        );

        Ok(report)
    }
}

/// Encode transfers and sign the ones that pack, skipping and reporting the
/// rest. Returned items carry their input positions.
pub fn prepare_transfers(
    provider: &dyn SignatureProvider,
    transfers: &[Transfer],
    signers: &[KeyPair],
) -> Result<(Vec<(usize, SignedTransaction)>, Vec<RejectedTransaction>)> {
    let encoded: Vec<(usize, Result<PackedTransaction>)> = transfers
        .par_iter()
        .enumerate()
        .map(|(index, transfer)| (index, encode(transfer)))
        .collect();

    let mut packed = Vec::with_capacity(encoded.len());
    let mut rejected = Vec::new();
    for (index, result) in encoded {
        match result {
            Ok(transaction) => packed.push((index, transaction)),
            Err(error) => {
                debug!("[qc-18] Transfer {} not encoded: {}", index, error);
                rejected.push(RejectedTransaction { index, error });
            }
        }
    }

    let signed = provider.sign_all(packed, signers)?;
    Ok((signed, rejected))
}

fn produce(
    items: Vec<(usize, SignedTransaction)>,
    settings: ProducerSettings,
    provider: Arc<dyn SignatureProvider>,
    metrics: Arc<Metrics>,
    sender: mpsc::Sender<Produced>,
) -> Result<ProducerSummary> {
    let mut chunker = Chunker::new(settings.max_root_size)?;
    let mut summary = ProducerSummary::default();
    let mut active: Vec<SignedTransaction> = Vec::new();
    let mut group: Vec<(Chunk, Vec<SignedTransaction>)> = Vec::with_capacity(settings.group_size);

    for (index, item) in items {
        while chunker.next_index() < index {
            chunker.skip();
        }

        match chunker.push(item.transaction.clone()) {
            Ok(closed) => {
                if let Some(chunk) = closed {
                    group.push((chunk, std::mem::take(&mut active)));
                }
                active.push(item);
            }
            Err(error) => {
                metrics.record_oversized();
                summary.rejected.push(RejectedTransaction { index, error });
            }
        }

        if group.len() == settings.group_size
            && !emit(std::mem::take(&mut group), &settings, provider.as_ref(), &metrics, &sender, &mut summary)
        {
            return Ok(summary);
        }
    }

    if let Some(chunk) = chunker.finish() {
        group.push((chunk, active));
    }
    if !group.is_empty() {
        emit(group, &settings, provider.as_ref(), &metrics, &sender, &mut summary);
    }

    Ok(summary)
}

/// Build roots and aggregates for a group and hand it to the submitter.
/// Returns false once production should stop.
fn emit(
    group: Vec<(Chunk, Vec<SignedTransaction>)>,
    settings: &ProducerSettings,
    provider: &dyn SignatureProvider,
    metrics: &Metrics,
    sender: &mpsc::Sender<Produced>,
    summary: &mut ProducerSummary,
) -> bool {
    let first_transaction = group.first().map(|(c, _)| c.first_index()).unwrap_or(0);
    let roots = group.len();

    let sealed: Vec<std::result::Result<ChunkArtifact, (usize, Vec<usize>)>> = group
        .into_par_iter()
        .map(|(chunk, signed)| seal_chunk(chunk, signed, settings, provider))
        .collect();

    let mut artifacts = Vec::with_capacity(roots);
    let mut root_offsets = Vec::new();
    let mut signature_count = 0;
    let mut invalid_transactions = Vec::new();

    for (offset, result) in sealed.into_iter().enumerate() {
        match result {
            Ok(artifact) => {
                metrics.record_chunk(artifact.chunk.len());
                summary.chunks += 1;
                summary.chunked += artifact.chunk.len();
                artifacts.push(artifact);
            }
            Err((signatures, invalid)) => {
                summary.chunks += 1;
                root_offsets.push(offset);
                signature_count += signatures;
                invalid_transactions.extend(invalid);
            }
        }
    }

    let message = if root_offsets.is_empty() {
        debug!(
            "[qc-18] Group ready: {} roots from tx {}",
            artifacts.len(),
            first_transaction
        );
        Produced::Group(artifacts)
    } else {
        Produced::Invalid(InvalidGroup {
            first_transaction,
            roots,
            root_offsets,
            signature_count,
            invalid_transactions,
        })
    };
    let stop = matches!(message, Produced::Invalid(_));

    // Receiver gone means the run halted
    sender.blocking_send(message).is_ok() && !stop
}

fn seal_chunk(
    chunk: Chunk,
    signed: Vec<SignedTransaction>,
    settings: &ProducerSettings,
    provider: &dyn SignatureProvider,
) -> std::result::Result<ChunkArtifact, (usize, Vec<usize>)> {
    let root = build_root(&chunk);
    let signatures: Vec<BlsSignature> = signed.iter().map(|s| s.signature).collect();

    let verified = provider.aggregate(&signatures).and_then(|aggregate| {
        if !settings.verify {
            return Ok(aggregate);
        }
        let pairs: Vec<(BlsPublicKey, &[u8])> = signed
            .iter()
            .map(|s| (s.public_key, s.transaction.as_bytes()))
            .collect();
        if provider.verify_aggregate(&aggregate, &pairs) {
            Ok(aggregate)
        } else {
            Err(BatchCommitmentError::InvalidKeyMaterial(
                "aggregate does not verify".into(),
            ))
        }
    });

    match verified {
        Ok(aggregate) => Ok(ChunkArtifact {
            chunk,
            root,
            aggregate,
        }),
        Err(reason) => {
            warn!(
                "[qc-18] Chunk at tx {} failed signature check: {}",
                chunk.first_index(),
                reason
            );
            let invalid = if settings.isolate {
                provider
                    .isolate_invalid(&signed)
                    .into_iter()
                    .map(|position| chunk.indices()[position])
                    .collect()
            } else {
                Vec::new()
            };
            Err((signed.len(), invalid))
        }
    }
}

#[async_trait::async_trait]
impl BatchCommitmentApi for BatchPipeline {
    async fn process(
        &self,
        transfers: Vec<Transfer>,
        signers: Arc<Vec<KeyPair>>,
    ) -> Result<PipelineReport> {
        let transactions = transfers.len();
        let provider = self.provider.clone();

        let (items, rejected) = tokio::task::spawn_blocking(move || {
            prepare_transfers(provider.as_ref(), &transfers, &signers)
        })
        .await
        .map_err(|e| BatchCommitmentError::InternalError(format!("encoder task: {}", e)))??;

        self.metrics.record_encoding(items.len(), rejected.len());
        self.run(items, transactions, rejected).await
    }

    async fn process_signed(&self, transactions: Vec<SignedTransaction>) -> Result<PipelineReport> {
        let count = transactions.len();
        self.metrics.record_encoding(count, 0);
        self.run(transactions.into_iter().enumerate().collect(), count, Vec::new())
            .await
    }

    async fn resubmit(&self, sequence: u64) -> Result<SubmissionReceipt> {
        let mut scheduler = self.scheduler.lock().await;
        let block = self
            .sink
            .latest_block(self.config.batching.block_reference_depth)
            .await?;

        match scheduler.resubmit(sequence, block).await {
            Ok(receipt) => {
                self.metrics
                    .record_confirmed(receipt.publication_gas + receipt.commitment_gas);
                Ok(receipt)
            }
            Err(error) => {
                if error.is_batch_fatal() {
                    self.metrics.record_failed();
                }
                Err(error)
            }
        }
    }

    async fn pending_batches(&self) -> Vec<u64> {
        self.scheduler.lock().await.pending_sequences()
    }

    async fn cost_report(&self) -> Result<CostReport> {
        self.ledger.snapshot().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{BlsSignatureProvider, FixedGasOracle, InMemoryCommitmentSink};
    use crate::domain::Metadata;
    use primitive_types::U256;

    fn transfer(amount: u32) -> Transfer {
        Transfer {
            metadata: Metadata::default(),
            from: vec![0xde, 0xad, 0xbe],
            to: vec![0xde, 0xad, 0xbe],
            transfer_amount: U256::from(amount),
            change_amount: U256::from(amount),
        }
    }

    fn small_config(max_root_size: usize, max_roots: usize) -> CommitChainConfig {
        let mut config = CommitChainConfig::default();
        config.batching.max_root_size = max_root_size;
        config.batching.max_roots_per_commit = max_roots;
        config.batching.max_in_flight_batches = 2;
        config
    }

    async fn pipeline(
        config: CommitChainConfig,
    ) -> (BatchPipeline, Arc<InMemoryCommitmentSink>) {
        let sink = Arc::new(InMemoryCommitmentSink::default());
        let pipeline = BatchPipeline::start(
            config,
            sink.clone(),
            Arc::new(BlsSignatureProvider::new()),
            Arc::new(FixedGasOracle::default()),
        )
        .await
        .unwrap();
        (pipeline, sink)
    }

    fn signers() -> Arc<Vec<KeyPair>> {
        Arc::new(vec![
            KeyPair::from_seed(&[11u8; 32]).unwrap(),
            KeyPair::from_seed(&[12u8; 32]).unwrap(),
        ])
    }

    #[test]
    fn test_prepare_skips_overflowing_transfers() {
        let mut transfers: Vec<Transfer> = (0..4).map(transfer).collect();
        transfers[2].to = vec![1, 2, 3, 4, 5];

        let provider = BlsSignatureProvider::new();
        let (items, rejected) = prepare_transfers(&provider, &transfers, &signers()).unwrap();

        let indices: Vec<usize> = items.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 3]);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].index, 2);
        assert!(rejected[0].error.is_recoverable());
    }

    #[tokio::test]
    async fn test_run_commits_all_batches() {
        // 4 transactions per chunk, 2 roots per batch
        let (pipeline, sink) = pipeline(small_config(96, 2)).await;
        let transfers: Vec<Transfer> = (0..30).map(transfer).collect();

        let report = pipeline.process(transfers, signers()).await.unwrap();

        assert_eq!(report.chunks, 8);
        assert_eq!(report.chunked, 30);
        assert_eq!(report.roots, 8);
        assert_eq!(report.batches.len(), 4);
        assert_eq!(report.confirmed_batches(), 4);
        assert!(!report.halted());
        assert!(report.rejected.is_empty());

        let committed = sink.committed_batches();
        let sequences: Vec<u64> = committed.iter().map(|b| b.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4]);
        assert_eq!(sink.published_roots(), 8);
        assert!(report.cost.total_gas > U256::zero());
        assert_eq!(pipeline.metrics().get_batches_confirmed(), 4);

        let ledger = pipeline.shutdown().await.unwrap();
        assert_eq!(ledger.total_gas(), report.cost.total_gas);
    }

    #[tokio::test]
    async fn test_invalid_signature_halts_before_submission() {
        let (pipeline, sink) = pipeline(small_config(48, 2)).await;
        let provider = BlsSignatureProvider::new();
        let transfers: Vec<Transfer> = (0..8).map(transfer).collect();
        let (items, _) = prepare_transfers(&provider, &transfers, &signers()).unwrap();

        let mut signed: Vec<SignedTransaction> = items.into_iter().map(|(_, s)| s).collect();
        // Chunks of 2, batches of 2 chunks: tx 5 sits in the second batch
        let intruder = KeyPair::from_seed(&[99u8; 32]).unwrap();
        signed[5].signature = intruder.sign(signed[5].transaction.as_bytes());

        let report = pipeline.process_signed(signed).await.unwrap();

        assert_eq!(report.confirmed_batches(), 1);
        assert_eq!(report.resume_from, Some(4));
        match &report.batches[1] {
            BatchOutcome::Failed {
                sequence,
                error:
                    BatchCommitmentError::InvalidSignature {
                        batch_sequence,
                        root_indices,
                        signature_count,
                        invalid_transactions,
                    },
                ..
            } => {
                assert_eq!(*sequence, 2);
                assert_eq!(*batch_sequence, 2);
                assert_eq!(root_indices, &vec![2]);
                assert_eq!(*signature_count, 2);
                assert_eq!(invalid_transactions, &vec![5]);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        // Nothing of the bad batch reached the sink
        assert_eq!(sink.committed_batches().len(), 1);
        assert_eq!(sink.published_roots(), 2);
    }

    #[tokio::test]
    async fn test_rejection_retained_and_resubmitted() {
        let (pipeline, sink) = pipeline(small_config(48, 1)).await;
        let transfers: Vec<Transfer> = (0..6).map(transfer).collect();

        sink.reject_next(crate::domain::RejectionReason::StaleBlockReference);
        let report = pipeline.process(transfers, signers()).await.unwrap();

        assert_eq!(report.confirmed_batches(), 0);
        assert_eq!(report.resume_from, Some(2));
        assert_eq!(pipeline.pending_batches().await, vec![1]);

        let receipt = pipeline.resubmit(1).await.unwrap();
        assert_eq!(receipt.sequence, 1);
        assert!(pipeline.pending_batches().await.is_empty());
        assert_eq!(sink.committed_batches().len(), 1);
    }

    #[tokio::test]
    async fn test_bond_below_minimum_rejected() {
        let mut config = CommitChainConfig::default();
        config.bond_size_wei = crate::config::BondSize(1);

        let result = BatchPipeline::start(
            config,
            Arc::new(InMemoryCommitmentSink::default()),
            Arc::new(BlsSignatureProvider::new()),
            Arc::new(FixedGasOracle::default()),
        )
        .await;
        assert!(matches!(result, Err(BatchCommitmentError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_bond_above_minimum_rejected() {
        let mut config = CommitChainConfig::default();
        config.bond_size_wei = crate::config::BondSize(crate::config::DEFAULT_BOND_SIZE_WEI * 2);

        // The sink takes exactly its minimum; a larger bond would fail every batch
        let result = BatchPipeline::start(
            config,
            Arc::new(InMemoryCommitmentSink::default()),
            Arc::new(BlsSignatureProvider::new()),
            Arc::new(FixedGasOracle::default()),
        )
        .await;
        match result {
            Err(BatchCommitmentError::InvalidConfig(message)) => {
                assert!(message.contains("does not match"))
            }
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("bond above the sink minimum accepted"),
        }
    }

    #[tokio::test]
    async fn test_overrides_use_safe_price() {
        let (pipeline, _) = pipeline(CommitChainConfig::default()).await;
        let overrides = pipeline.overrides();
        assert_eq!(overrides.gas_limit, 6_000_000);
        assert_eq!(overrides.gas_price, U256::from(20 * crate::adapters::gas::GWEI));
    }
}
