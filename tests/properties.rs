//! Quantified-invariant property tests, in the style of this engine's
//! sibling delta-compression crate's seeded randomized trials, generalized
//! from `rand`-only fuzzing to `proptest`-driven input generation.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use std::collections::HashSet;

use dbg_path_collapse::arena::Arena;
use dbg_path_collapse::kmer::pack_kmer;
use dbg_path_collapse::node::{self, PathNode};
use dbg_path_collapse::{NodeId, Simplifier, SimplifierConfig};

const BASES: [u8; 4] = *b"ACGT";
const K: usize = 4;

fn random_kmer(rng: &mut StdRng) -> u64 {
    let bases: Vec<u8> = (0..K).map(|_| BASES[rng.gen_range(0..4)]).collect();
    pack_kmer(&bases, K).unwrap()
}

/// Invariant 1 + 2: for a chain of unrelated (non-overlapping,
/// non-collapsible) nodes pushed in order, the engine emits them in the
/// same order with the same total weight, since there is nothing to
/// collapse.
proptest! {
    #[test]
    fn pass_through_preserves_order_and_weight(
        seed in any::<u64>(),
        count in 1usize..12,
        gap in 20i64..200,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sim = Simplifier::new(SimplifierConfig::default().with_k(K)).unwrap();
        let mut expected_starts = Vec::new();
        let mut pos = 0i64;
        let mut weight_in = 0u64;
        for _ in 0..count {
            let weight = rng.gen_range(1u64..50);
            sim.push(vec![random_kmer(&mut rng)], pos, pos, vec![weight], vec![false], vec![]).unwrap();
            expected_starts.push(pos);
            weight_in += weight;
            pos += gap;
        }
        sim.finish().unwrap();
        let out = sim.drain().unwrap();

        prop_assert_eq!(out.len(), count);
        let observed_starts: Vec<i64> = out.iter().map(|n| n.first_start).collect();
        prop_assert_eq!(observed_starts, expected_starts);
        let weight_out: u64 = out.iter().map(|n| n.weights.iter().sum::<u64>()).sum();
        prop_assert_eq!(weight_out, weight_in);
        prop_assert_eq!(weight_out, sim.summary().weight_in);
    }
}

/// Invariant 3: in a linear chain (a single successor at every step, so no
/// pair of siblings is ever available to collapse), every emitted node's
/// `successors` list names exactly the one node that follows it, and that
/// node is itself emitted exactly once.
proptest! {
    #[test]
    fn successor_ids_refer_to_exactly_one_emitted_node(
        seed in any::<u64>(),
        count in 2usize..10,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sim = Simplifier::new(SimplifierConfig::default().with_k(K)).unwrap();
        let mut ids: Vec<NodeId> = Vec::new();
        let mut pos = 0i64;
        let mut prev: Option<NodeId> = None;
        for _ in 0..count {
            let weight = rng.gen_range(1u64..20);
            let preds: Vec<NodeId> = prev.into_iter().collect();
            let id = sim.push(vec![random_kmer(&mut rng)], pos, pos, vec![weight], vec![false], preds).unwrap();
            ids.push(id);
            prev = Some(id);
            pos += 10;
        }
        sim.finish().unwrap();
        let out = sim.drain().unwrap();

        prop_assert_eq!(out.len(), count);
        prop_assert_eq!(sim.summary().collapses_performed, 0);
        for (i, node) in out.iter().enumerate() {
            if i + 1 < count {
                prop_assert_eq!(&node.successors, &vec![ids[i + 1]]);
            } else {
                prop_assert!(node.successors.is_empty());
            }
        }
    }
}

/// Invariant 4: no two nodes present in the emitted output ever share the
/// same `(first_kmer, first_start)` identity, whether or not a bubble along
/// the way actually collapsed.
proptest! {
    #[test]
    fn first_kmer_first_start_pairs_are_unique_in_output(
        seed in any::<u64>(),
        trials in 1usize..5,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sim = Simplifier::new(
            SimplifierConfig::default().with_k(K).with_max_bases_mismatch(1).with_max_path_collapse_length(5),
        )
        .unwrap();
        let mut pos = 1i64;
        for _ in 0..trials {
            let root = sim.push(vec![random_kmer(&mut rng)], pos, pos + 9, vec![1; 10], vec![false; 10], vec![]).unwrap();
            let a_kmer = random_kmer(&mut rng);
            let identical = rng.gen_bool(0.5);
            let b_kmer = if identical { a_kmer } else { random_kmer(&mut rng) };
            let a = sim.push(vec![a_kmer], pos + 1, pos + 10, vec![3; 10], vec![false; 10], vec![root]).unwrap();
            let b = sim.push(vec![b_kmer], pos + 1, pos + 10, vec![1; 10], vec![false; 10], vec![root]).unwrap();
            sim.push(vec![random_kmer(&mut rng)], pos + 2, pos + 11, vec![4; 10], vec![false; 10], vec![a, b]).unwrap();
            pos += 20;
        }
        sim.finish().unwrap();
        let out = sim.drain().unwrap();

        let mut seen = HashSet::new();
        for node in &out {
            let key = (node.kmers.first().copied(), node.first_start);
            prop_assert!(seen.insert(key), "duplicate (first_kmer, first_start) pair in emitted output");
        }
    }
}

/// Invariant 5: feeding an already-settled, non-collapsible chain back
/// through a fresh simplifier with the same configuration reproduces it
/// bit-for-bit.
proptest! {
    #[test]
    fn resimplifying_a_settled_chain_is_idempotent(
        seed in any::<u64>(),
        count in 1usize..8,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut first = Simplifier::new(SimplifierConfig::default().with_k(K).with_max_bases_mismatch(0)).unwrap();
        let mut prev: Option<NodeId> = None;
        let mut pos = 0i64;
        for _ in 0..count {
            let weight = rng.gen_range(1u64..20);
            let preds: Vec<NodeId> = prev.into_iter().collect();
            let id = first.push(vec![random_kmer(&mut rng)], pos, pos, vec![weight], vec![false], preds).unwrap();
            prev = Some(id);
            pos += 10;
        }
        first.finish().unwrap();
        let settled = first.drain().unwrap();
        prop_assert_eq!(first.summary().collapses_performed, 0);

        let mut second = Simplifier::new(SimplifierConfig::default().with_k(K).with_max_bases_mismatch(0)).unwrap();
        let mut prev_id: Option<NodeId> = None;
        for node in &settled {
            let preds: Vec<NodeId> = prev_id.into_iter().collect();
            let id = second
                .push(node.kmers.clone(), node.first_start, node.first_end, node.weights.clone(), node.reference_flags.clone(), preds)
                .unwrap();
            prev_id = Some(id);
        }
        second.finish().unwrap();
        let resettled = second.drain().unwrap();

        prop_assert_eq!(second.summary().collapses_performed, 0);
        prop_assert_eq!(resettled.len(), settled.len());
        for (a, b) in settled.iter().zip(resettled.iter()) {
            prop_assert_eq!(&a.kmers, &b.kmers);
            prop_assert_eq!(a.first_start, b.first_start);
            prop_assert_eq!(a.first_end, b.first_end);
            prop_assert_eq!(&a.weights, &b.weights);
            prop_assert_eq!(&a.reference_flags, &b.reference_flags);
        }
    }
}

/// Invariant 6: `split_at_length` followed immediately by `merge_nodes`
/// restores the original node's chain, interval, and weights bit-for-bit.
proptest! {
    #[test]
    fn split_then_merge_is_identity(
        seed in any::<u64>(),
        length in 2usize..10,
        width in 1usize..8,
        split_at in 1usize..9,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let split_at = split_at % (length.max(2) - 1) + 1; // 0 < split_at < length
        let kmers: Vec<u64> = (0..length).map(|_| random_kmer(&mut rng)).collect();
        let weights: Vec<u64> = (0..width).map(|_| rng.gen_range(0u64..1000)).collect();
        let reference_flags: Vec<bool> = (0..width).map(|_| rng.gen_bool(0.5)).collect();

        let mut arena: Arena<PathNode> = Arena::new();
        let original = PathNode {
            kmers: kmers.clone(),
            first_start: 1000,
            first_end: 1000 + width as i64 - 1,
            weights: weights.clone(),
            reference_flags: reference_flags.clone(),
            predecessors: Vec::new(),
            successors: Vec::new(),
        };
        let id = arena.insert(original);

        let (prefix, suffix) = node::split_at_length(&mut arena, id, split_at).unwrap();
        node::merge_nodes(&mut arena, prefix, suffix).unwrap();

        let restored = arena.get(prefix).unwrap();
        prop_assert_eq!(&restored.kmers, &kmers);
        prop_assert_eq!(restored.first_start, 1000);
        prop_assert_eq!(restored.first_end, 1000 + width as i64 - 1);
        prop_assert_eq!(&restored.weights, &weights);
        prop_assert_eq!(&restored.reference_flags, &reference_flags);
    }
}

/// Invariant 7: with `maxBasesMismatch = 0`, two single-k-mer branches off
/// a shared root and shared child only collapse when their k-mers are
/// identical.
proptest! {
    #[test]
    fn zero_mismatch_budget_requires_identical_overlap(
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sim = Simplifier::new(
            SimplifierConfig::default().with_k(K).with_max_bases_mismatch(0).with_max_path_collapse_length(5),
        )
        .unwrap();

        let root_kmer = random_kmer(&mut rng);
        let branch_a_kmer = random_kmer(&mut rng);
        let identical = rng.gen_bool(0.5);
        let branch_b_kmer = if identical { branch_a_kmer } else { random_kmer(&mut rng) };
        let child_kmer = random_kmer(&mut rng);

        let root = sim.push(vec![root_kmer], 1, 10, vec![5; 10], vec![false; 10], vec![]).unwrap();
        let a = sim.push(vec![branch_a_kmer], 2, 11, vec![3; 10], vec![false; 10], vec![root]).unwrap();
        let b = sim.push(vec![branch_b_kmer], 2, 11, vec![2; 10], vec![false; 10], vec![root]).unwrap();
        sim.push(vec![child_kmer], 3, 12, vec![4; 10], vec![false; 10], vec![a, b]).unwrap();
        sim.finish().unwrap();
        let out = sim.drain().unwrap();

        if identical {
            prop_assert_eq!(sim.summary().collapses_performed, 1);
            prop_assert_eq!(out.len(), 3);
        } else {
            prop_assert_eq!(sim.summary().collapses_performed, 0);
            prop_assert_eq!(out.len(), 4);
        }
    }
}
