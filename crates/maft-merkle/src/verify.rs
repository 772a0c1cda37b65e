// crates/maft-merkle/src/verify.rs

//! Stateless root reconstruction.

use maft_crypto::{fixed_time_eq, hash_inner, Hash};

/// Reconstruct a root from `(index, leaf_hash, path)` and compare it to
/// `expected_root` in fixed time.
///
/// At each level the parity of the running index decides whether the
/// current digest is the left or the right child; the branching mirrors
/// proof extraction exactly, so a path produced for leaf `index` verifies
/// if and only if leaf, index, path, and root all match.
#[must_use]
pub fn verify_proof(index: usize, leaf_hash: &Hash, path: &[Hash], expected_root: &Hash) -> bool {
    let mut digest = *leaf_hash;
    let mut k = index;
    for sibling in path {
        if k % 2 == 0 {
            digest = hash_inner(&digest, sibling);
            k /= 2;
        } else {
            digest = hash_inner(sibling, &digest);
            k = (k - 1) / 2;
        }
    }
    fixed_time_eq(&digest, expected_root)
}
