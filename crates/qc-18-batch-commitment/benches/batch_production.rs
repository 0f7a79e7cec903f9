//! # QC-18 Batch Production Benchmarks
//!
//! Performance claims to validate:
//! - Greedy chunking: O(n) over the transaction stream
//! - Root building: O(n) hashes per chunk, chunks in parallel
//! - Aggregation: one G1 addition per signature
//!
//! Workload: 100,000 packed transfers, 32,000-byte roots.
//!
//! ```bash
//! cargo bench --package qc-18-batch-commitment --bench batch_production
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use primitive_types::U256;
use qc_18_batch_commitment::domain::bls;
use qc_18_batch_commitment::{
    build_root, build_roots, chunk, encode, BlsSignature, KeyPair, Metadata, PackedTransaction,
    Transfer,
};

const TRANSACTIONS: usize = 100_000;
const MAX_ROOT_SIZE: usize = 32_000;

fn workload(count: usize) -> Vec<PackedTransaction> {
    (0..count as u32)
        .map(|n| {
            encode(&Transfer {
                metadata: Metadata {
                    block_height: n,
                    ..Metadata::default()
                },
                from: vec![0xde, 0xad, 0xbe],
                to: vec![0xde, 0xad, 0xbe],
                transfer_amount: U256::from(0xaabb_ccddu64),
                change_amount: U256::from(0xaabb_ccddu64),
            })
            .unwrap()
        })
        .collect()
}

fn bench_chunking(c: &mut Criterion) {
    let transactions = workload(TRANSACTIONS);
    let mut group = c.benchmark_group("qc-18/chunking");
    group.throughput(Throughput::Elements(TRANSACTIONS as u64));

    group.bench_function("greedy_100k", |b| {
        b.iter(|| chunk(black_box(&transactions), MAX_ROOT_SIZE).unwrap())
    });
    group.finish();
}

fn bench_roots(c: &mut Criterion) {
    let outcome = chunk(&workload(TRANSACTIONS), MAX_ROOT_SIZE).unwrap();
    let mut group = c.benchmark_group("qc-18/merkle");
    group.throughput(Throughput::Elements(TRANSACTIONS as u64));

    group.bench_function("single_chunk", |b| {
        b.iter(|| build_root(black_box(&outcome.chunks[0])))
    });
    group.bench_function("all_chunks_parallel", |b| {
        b.iter(|| build_roots(black_box(&outcome.chunks)))
    });
    group.finish();
}

fn bench_aggregation(c: &mut Criterion) {
    let key = KeyPair::from_seed(&[7u8; 32]).unwrap();
    let transactions = workload(1_333);
    let signatures: Vec<BlsSignature> = transactions
        .iter()
        .map(|t| key.sign(t.as_bytes()))
        .collect();

    let mut group = c.benchmark_group("qc-18/bls");
    for size in [100usize, 1_333] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("aggregate", size), &size, |b, &size| {
            b.iter(|| bls::aggregate(black_box(&signatures[..size])).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_chunking, bench_roots, bench_aggregation);
criterion_main!(benches);
