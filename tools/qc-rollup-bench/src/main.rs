//! QC-Rollup-Bench: commit-chain cost benchmark
//!
//! Batches N identical benchmark transfers (owner `0xdeadbe`, amounts
//! `0xaabbccdd`) through the full pipeline against the in-memory sink and
//! reports the base-ledger gas they cost, in blocks and in USD at each
//! configured block price.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use primitive_types::U256;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use qc_18_batch_commitment::{
    BatchCommitmentApi, BatchPipeline, BlsSignatureProvider, CommitChainConfig, FixedGasOracle,
    InMemoryCommitmentSink, InMemorySinkConfig, KeyPair, LoggingConfig, Metadata,
    PipelineReport, Transfer,
};

/// Signing keys used round robin over the transfers
const SIGNERS: u8 = 4;

/// QC-Rollup-Bench: commit-chain batch cost benchmark
#[derive(Parser, Debug)]
#[command(name = "qc-rollup-bench")]
#[command(about = "Batch benchmark transfers into commitments and report their gas cost")]
struct Args {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of transfers to batch
    #[arg(short, long, default_value = "100000")]
    transactions: usize,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Summary {
    transactions: usize,
    rejected: usize,
    chunks: usize,
    roots: usize,
    batches: usize,
    confirmed_batches: usize,
    halted_at: Option<usize>,
    total_gas: U256,
    root_publication_gas: U256,
    block_commitment_gas: U256,
    block_equivalents: U256,
    estimates: Vec<CostEstimate>,
}

#[derive(Debug, Serialize)]
struct CostEstimate {
    usd_per_block: u64,
    usd: U256,
}

impl Summary {
    fn new(report: &PipelineReport, usd_per_block: &[u64]) -> Self {
        Self {
            transactions: report.transactions,
            rejected: report.rejected.len(),
            chunks: report.chunks,
            roots: report.roots,
            batches: report.batches.len(),
            confirmed_batches: report.confirmed_batches(),
            halted_at: report.resume_from,
            total_gas: report.cost.total_gas,
            root_publication_gas: report.cost.root_publication_gas,
            block_commitment_gas: report.cost.block_commitment_gas,
            block_equivalents: report.cost.block_equivalents,
            estimates: usd_per_block
                .iter()
                .map(|&price| CostEstimate {
                    usd_per_block: price,
                    usd: report.cost.estimated_cost(price),
                })
                .collect(),
        }
    }

    fn print(&self) {
        println!("transactions:         {}", self.transactions);
        println!("rejected:             {}", self.rejected);
        println!("chunks:               {}", self.chunks);
        println!("roots:                {}", self.roots);
        println!(
            "batches:              {} ({} confirmed)",
            self.batches, self.confirmed_batches
        );
        if let Some(index) = self.halted_at {
            println!("halted at tx:         {}", index);
        }
        println!("root publication gas: {}", self.root_publication_gas);
        println!("commitment gas:       {}", self.block_commitment_gas);
        println!("total gas:            {}", self.total_gas);
        println!("block equivalents:    {}", self.block_equivalents);
        for estimate in &self.estimates {
            println!(
                "cost at ${:>4}/block:  ${}",
                estimate.usd_per_block, estimate.usd
            );
        }
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("invalid log filter")?;

    // stdout carries the summary
    let layer = if logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .context("tracing already initialized")
}

fn benchmark_transfers(count: usize) -> Vec<Transfer> {
    let transfer = Transfer {
        metadata: Metadata::default(),
        from: vec![0xde, 0xad, 0xbe],
        to: vec![0xde, 0xad, 0xbe],
        transfer_amount: U256::from(0xaabb_ccddu64),
        change_amount: U256::from(0xaabb_ccddu64),
    };
    vec![transfer; count]
}

fn signers() -> Result<Vec<KeyPair>> {
    (1..=SIGNERS)
        .map(|seed| KeyPair::from_seed(&[seed; 32]).context("deriving signing key"))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CommitChainConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CommitChainConfig::default(),
    };
    init_tracing(&config.logging)?;

    let sink = Arc::new(InMemoryCommitmentSink::new(InMemorySinkConfig {
        minimum_bond: config.bond(),
        max_roots_per_commit: config.batching.max_roots_per_commit,
        ..InMemorySinkConfig::default()
    }));
    let usd_per_block = config.gas.usd_per_block.clone();

    let pipeline = BatchPipeline::start(
        config,
        sink,
        Arc::new(BlsSignatureProvider::new()),
        Arc::new(FixedGasOracle::default()),
    )
    .await
    .context("starting pipeline")?;

    info!("Batching {} benchmark transfers", args.transactions);
    let report = pipeline
        .process(benchmark_transfers(args.transactions), Arc::new(signers()?))
        .await
        .context("running pipeline")?;

    let summary = Summary::new(&report, &usd_per_block);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        summary.print();
    }

    pipeline.shutdown().await.context("stopping pipeline")?;
    Ok(())
}
