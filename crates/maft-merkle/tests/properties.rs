//! Universal properties of construction and verification.
//!
//! These treat the builder as a black box: determinism over the block
//! list, proof shape, and round-trip verification for arbitrary inputs.

use proptest::collection::vec;
use proptest::prelude::*;

use maft_crypto::hash_leaf;
use maft_merkle::{verify_proof, TreeBuilder};

prop_compose! {
    /// 1..=24 blocks of 0..=64 arbitrary bytes (covers empty blocks,
    /// single-leaf trees, and several padding widths).
    fn arb_blocks()(blocks in vec(vec(any::<u8>(), 0..=64), 1..=24)) -> Vec<Vec<u8>> {
        blocks
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64, // keeps the parallel builder affordable in CI
        .. ProptestConfig::default()
    })]

    // The root is a pure function of the block list.
    #[test]
    fn construction_is_deterministic(blocks in arb_blocks()) {
        let a = TreeBuilder::new().build_from_blocks(&blocks).unwrap();
        let b = TreeBuilder::new().build_from_blocks(&blocks).unwrap();
        prop_assert_eq!(a.root(), b.root());
        prop_assert_eq!(a.proofs(), b.proofs());
    }

    // Every real leaf carries a depth-length path that reconstructs the root.
    #[test]
    fn proofs_round_trip(blocks in arb_blocks()) {
        let tree = TreeBuilder::new().build_from_blocks(&blocks).unwrap();
        let root = tree.root();
        let depth = tree.depth();
        prop_assert_eq!(tree.leaf_count(), blocks.len().next_power_of_two());
        for (i, block) in blocks.iter().enumerate() {
            let proof = tree.proof(i).unwrap();
            prop_assert_eq!(proof.len(), depth);
            prop_assert!(verify_proof(i, &hash_leaf(block), proof, &root));
        }
    }

    // A single flipped bit in any block moves the root.
    #[test]
    fn any_bit_flip_moves_the_root(
        blocks in arb_blocks(),
        pick in any::<proptest::sample::Index>(),
        bit in 0usize..8,
    ) {
        let i = pick.index(blocks.len());
        prop_assume!(!blocks[i].is_empty());
        let baseline = TreeBuilder::new().build_from_blocks(&blocks).unwrap();
        let mut mutated = blocks;
        let last = mutated[i].len() - 1;
        mutated[i][last] ^= 1 << bit;
        let changed = TreeBuilder::new().build_from_blocks(&mutated).unwrap();
        prop_assert_ne!(baseline.root(), changed.root());
    }
}
