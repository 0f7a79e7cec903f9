use std::sync::Arc;
use std::time::Duration;

use primitive_types::U256;
use proptest::prelude::*;
use qc_18_batch_commitment::domain::bls;
use qc_18_batch_commitment::ledger::spawn_ledger;
use qc_18_batch_commitment::{
    build_root, chunk, decode, encode, CommitmentScheduler, InMemoryCommitmentSink, KeyPair,
    Metadata, PackedTransaction, Root, SchedulerConfig, SubmissionOverrides, Transfer,
};

fn transactions(max_len: usize, count: usize) -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 1..=max_len), 0..count)
}

fn packed(raw: &[Vec<u8>]) -> Vec<PackedTransaction> {
    raw.iter().cloned().map(PackedTransaction::from_raw).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn chunks_partition_input_in_order(
        raw in transactions(64, 200),
        max_root_size in 64usize..512,
    ) {
        let outcome = chunk(&packed(&raw), max_root_size).unwrap();

        prop_assert!(outcome.rejected.is_empty());
        let rebuilt: Vec<u8> = outcome.chunks.iter().flat_map(|c| c.payload()).collect();
        prop_assert_eq!(rebuilt, raw.concat());

        let indices: Vec<usize> = outcome.chunks.iter().flat_map(|c| c.indices().to_vec()).collect();
        prop_assert_eq!(indices, (0..raw.len()).collect::<Vec<_>>());

        for (i, c) in outcome.chunks.iter().enumerate() {
            prop_assert!(!c.is_empty());
            prop_assert!(c.byte_len() <= max_root_size);
            // Greedy: the next chunk's first record would not have fit
            if let Some(next) = outcome.chunks.get(i + 1) {
                prop_assert!(c.byte_len() + next.transactions()[0].len() > max_root_size);
            }
        }
    }

    #[test]
    fn oversized_records_skipped_not_reordered(
        raw in transactions(40, 100),
        max_root_size in 24usize..64,
    ) {
        let outcome = chunk(&packed(&raw), max_root_size).unwrap();

        let expected_rejected: Vec<usize> = raw
            .iter()
            .enumerate()
            .filter(|(_, t)| t.len() > max_root_size)
            .map(|(i, _)| i)
            .collect();
        let rejected: Vec<usize> = outcome.rejected.iter().map(|r| r.index).collect();
        prop_assert_eq!(rejected, expected_rejected);

        let kept: Vec<u8> = raw
            .iter()
            .filter(|t| t.len() <= max_root_size)
            .flatten()
            .copied()
            .collect();
        let rebuilt: Vec<u8> = outcome.chunks.iter().flat_map(|c| c.payload()).collect();
        prop_assert_eq!(rebuilt, kept);
    }

    #[test]
    fn root_changes_with_any_byte(
        raw in prop::collection::vec(prop::collection::vec(any::<u8>(), 24), 1..16),
        position in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let original = chunk(&packed(&raw), usize::MAX).unwrap();
        let before = build_root(&original.chunks[0]);

        let mut mutated = raw.concat();
        let at = position.index(mutated.len());
        mutated[at] ^= flip;
        let mutated: Vec<Vec<u8>> = mutated.chunks(24).map(<[u8]>::to_vec).collect();
        let after = build_root(&chunk(&packed(&mutated), usize::MAX).unwrap().chunks[0]);

        prop_assert_ne!(before, after);
        prop_assert_eq!(before, build_root(&original.chunks[0]));
    }

    #[test]
    fn root_changes_when_records_swap(
        raw in prop::collection::vec(prop::collection::vec(any::<u8>(), 24), 2..16),
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
    ) {
        let (i, j) = (a.index(raw.len()), b.index(raw.len()));
        prop_assume!(raw[i] != raw[j]);

        let mut swapped = raw.clone();
        swapped.swap(i, j);

        let before = build_root(&chunk(&packed(&raw), usize::MAX).unwrap().chunks[0]);
        let after = build_root(&chunk(&packed(&swapped), usize::MAX).unwrap().chunks[0]);
        prop_assert_ne!(before, after);
    }

    #[test]
    fn encoding_is_reversible(
        block_height in any::<u32>(),
        root_index in any::<u8>(),
        transaction_index in any::<u16>(),
        output_index in any::<u8>(),
        from in any::<[u8; 4]>(),
        to in any::<[u8; 4]>(),
        transfer_amount in any::<u32>(),
        change_amount in any::<u32>(),
    ) {
        let transfer = Transfer {
            metadata: Metadata { block_height, root_index, transaction_index, output_index },
            from: from.to_vec(),
            to: to.to_vec(),
            transfer_amount: U256::from(transfer_amount),
            change_amount: U256::from(change_amount),
        };

        let packed = encode(&transfer).unwrap();
        prop_assert_eq!(packed.len(), 24);
        prop_assert_eq!(decode(packed.as_bytes()).unwrap(), transfer);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn batches_partition_roots(
        roots in prop::collection::vec(any::<[u8; 32]>(), 0..300),
        max_roots in 1usize..40,
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();
        let (ledger, _task) = spawn_ledger(4, 8_000_000);
        let mut scheduler = CommitmentScheduler::new(
            Arc::new(InMemoryCommitmentSink::default()),
            ledger,
            SchedulerConfig {
                max_roots_per_commit: max_roots,
                bond: U256::one(),
                submission_timeout: Duration::from_secs(1),
                first_sequence: 7,
                overrides: SubmissionOverrides::default(),
            },
        )
        .unwrap();

        let roots: Vec<Root> = roots.into_iter().map(Root).collect();
        let mut batches: Vec<_> = roots.iter().filter_map(|r| scheduler.push_root(*r)).collect();
        batches.extend(scheduler.close());

        prop_assert_eq!(batches.len(), roots.len().div_ceil(max_roots));
        let mut next_index = 0;
        for (offset, batch) in batches.iter().enumerate() {
            prop_assert_eq!(batch.sequence, 7 + offset as u64);
            prop_assert_eq!(batch.first_root_index, next_index);
            prop_assert!(!batch.roots.is_empty() && batch.roots.len() <= max_roots);
            next_index += batch.roots.len();
        }
        let union: Vec<Root> = batches.into_iter().flat_map(|b| b.roots).collect();
        prop_assert_eq!(union, roots);
    }

    #[test]
    fn aggregation_order_independent(
        messages in prop::collection::vec(prop::collection::vec(any::<u8>(), 24), 1..6),
        seed in any::<[u8; 32]>(),
    ) {
        let key = KeyPair::from_seed(&seed).unwrap();
        let signatures: Vec<_> = messages.iter().map(|m| key.sign(m)).collect();
        let mut reversed = signatures.clone();
        reversed.reverse();

        let forward = bls::aggregate(&signatures).unwrap();
        prop_assert_eq!(forward, bls::aggregate(&reversed).unwrap());

        let pairs: Vec<_> = messages.iter().map(|m| (key.public_key(), m.as_slice())).collect();
        prop_assert!(bls::verify_aggregate(&forward, &pairs));
    }
}
