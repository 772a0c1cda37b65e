// crates/maft-merkle/src/builder.rs

//! Bottom-up parallel construction.
//!
//! Every phase follows the same worker/collector shape: leaves (or node
//! pairs, or proof ranges) are partitioned into contiguous batches, one
//! scoped thread per batch stamps each result with its absolute index and
//! publishes the batch on a bounded channel, and a collector places results
//! by stamp, restoring global order regardless of worker scheduling. Levels
//! are barriers: level `k + 1` starts only after level `k` is complete.

use std::thread;

use crossbeam_channel::{bounded, Receiver};
use maft_crypto::{hash_inner, hash_leaf, padding_leaf, Hash};

use crate::error::MerkleError;
use crate::tree::Tree;

/// Index-stamped results published by one worker.
struct Batch<T> {
    results: Vec<(usize, T)>,
}

/// Parallel Merkle tree builder.
///
/// The default worker count is `next_pow2(min(cores × 8, leaves))`,
/// computed against the padded leaf count so the contiguous partition is
/// exact at every level. An explicit count that cannot partition the
/// leaves evenly is refused with [`MerkleError::BatchMisalignment`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TreeBuilder {
    workers: Option<usize>,
}

impl TreeBuilder {
    /// Builder with the default, core-count-derived worker pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with an explicit worker count.
    ///
    /// The count is validated at build time: it must be a power of two
    /// that divides the padded leaf count.
    #[must_use]
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: Some(workers),
        }
    }

    /// Build a tree by hashing each block as a leaf.
    ///
    /// The block list is padded to the next power of two with empty
    /// blocks before hashing, so padding leaves carry `SHA-256("")`.
    ///
    /// # Errors
    /// [`MerkleError::EmptyInput`] for an empty block list,
    /// [`MerkleError::BatchMisalignment`] for an explicit worker count
    /// that cannot partition the padded leaves.
    pub fn build_from_blocks<B>(&self, blocks: &[B]) -> Result<Tree, MerkleError>
    where
        B: AsRef<[u8]> + Sync,
    {
        let n = blocks.len();
        if n == 0 {
            return Err(MerkleError::EmptyInput);
        }
        let padded = n.next_power_of_two();
        let workers = self.worker_count(padded)?;

        let leaves = hash_leaves(blocks, padded, workers);
        finish(leaves, n, workers)
    }

    /// Build a tree from exactly `n` precomputed leaf hashes.
    ///
    /// Leaf `i` is the `i`-th value received; arrival order is the leaf
    /// order. The leaf array is padded to the next power of two with the
    /// hashed empty block. After the `n`-th receive the builder performs
    /// one more blocking receive to confirm the producer closed its side;
    /// a producer that stalls without closing blocks the builder, and one
    /// that over-delivers is reported as [`MerkleError::StreamLong`].
    ///
    /// # Errors
    /// [`MerkleError::EmptyInput`] when `n == 0`,
    /// [`MerkleError::StreamShort`] when the stream disconnects early,
    /// [`MerkleError::StreamLong`] on over-delivery, and
    /// [`MerkleError::BatchMisalignment`] as for the block path.
    pub fn build_from_hash_stream(
        &self,
        hashes: &Receiver<Hash>,
        n: usize,
    ) -> Result<Tree, MerkleError> {
        if n == 0 {
            return Err(MerkleError::EmptyInput);
        }
        let padded = n.next_power_of_two();
        let workers = self.worker_count(padded)?;

        let leaves = adopt_leaves(hashes, n, padded, workers)?;
        if hashes.recv().is_ok() {
            return Err(MerkleError::StreamLong { want: n });
        }
        finish(leaves, n, workers)
    }

    /// Resolve and validate the worker count for `padded` leaves.
    fn worker_count(&self, padded: usize) -> Result<usize, MerkleError> {
        let workers = self.workers.unwrap_or_else(|| {
            let default_workers = num_cpus::get() * 8;
            default_workers.min(padded).next_power_of_two()
        });
        if workers == 0 || !workers.is_power_of_two() || padded % workers != 0 {
            return Err(MerkleError::BatchMisalignment {
                leaves: padded,
                workers,
            });
        }
        Ok(workers)
    }
}

/// Branch phase + proof extraction, shared by both entry points.
fn finish(leaves: Vec<Hash>, block_count: usize, workers: usize) -> Result<Tree, MerkleError> {
    let levels = build_branches(leaves, workers)?;
    let proofs = extract_proofs(&levels, workers);
    Ok(Tree::new(levels, proofs, block_count))
}

/// Leaf phase, block path: hash `blocks[i]` for real leaves, the empty
/// block for padding positions.
fn hash_leaves<B>(blocks: &[B], padded: usize, workers: usize) -> Vec<Hash>
where
    B: AsRef<[u8]> + Sync,
{
    let n = blocks.len();
    let batch_size = padded / workers;
    let mut leaves = vec![[0u8; 32]; padded];

    // Capacity = worker count and each worker sends exactly once, so a
    // send can never block even if the collector lags.
    let (tx, rx) = bounded::<Batch<Hash>>(workers);
    thread::scope(|s| {
        for w in 0..workers {
            let tx = tx.clone();
            let start = w * batch_size;
            s.spawn(move || {
                let mut results = Vec::with_capacity(batch_size);
                for i in start..start + batch_size {
                    let digest = if i < n {
                        hash_leaf(blocks[i].as_ref())
                    } else {
                        padding_leaf()
                    };
                    results.push((i, digest));
                }
                let _ = tx.send(Batch { results });
            });
        }
        drop(tx);
        collect_into(&rx, &mut leaves);
    });
    leaves
}

/// Leaf phase, stream path: drain `batch_size` hashes per worker in
/// arrival order, then let the worker stamp and publish them.
fn adopt_leaves(
    hashes: &Receiver<Hash>,
    n: usize,
    padded: usize,
    workers: usize,
) -> Result<Vec<Hash>, MerkleError> {
    let batch_size = padded / workers;
    let mut leaves = vec![[0u8; 32]; padded];
    let (tx, rx) = bounded::<Batch<Hash>>(workers);

    thread::scope(|s| {
        let mut received = 0usize;
        for w in 0..workers {
            let start = w * batch_size;
            let mut values = Vec::with_capacity(batch_size);
            for i in start..start + batch_size {
                if i < n {
                    match hashes.recv() {
                        Ok(h) => {
                            values.push(h);
                            received += 1;
                        }
                        Err(_) => {
                            return Err(MerkleError::StreamShort {
                                got: received,
                                want: n,
                            })
                        }
                    }
                } else {
                    values.push(padding_leaf());
                }
            }
            let tx = tx.clone();
            s.spawn(move || {
                let results = values
                    .into_iter()
                    .enumerate()
                    .map(|(j, h)| (start + j, h))
                    .collect();
                let _ = tx.send(Batch { results });
            });
        }
        drop(tx);
        collect_into(&rx, &mut leaves);
        Ok(())
    })?;
    Ok(leaves)
}

/// Branch phase: halve until one node remains, rescaling the pool so
/// every worker still owns at least one pair.
fn build_branches(leaves: Vec<Hash>, workers: usize) -> Result<Vec<Vec<Hash>>, MerkleError> {
    let mut levels = Vec::new();
    let mut nodes = leaves;

    while nodes.len() > 1 {
        let len = nodes.len();
        let level_workers = if len <= workers { len / 2 } else { workers };
        let batch_size = len / level_workers;
        if batch_size % 2 != 0 {
            // Unreachable once the leaf partition validated, but a worker
            // must never pair across a batch boundary.
            return Err(MerkleError::BatchMisalignment {
                leaves: len,
                workers: level_workers,
            });
        }

        let mut next = vec![[0u8; 32]; len / 2];
        let (tx, rx) = bounded::<Batch<Hash>>(level_workers);
        thread::scope(|s| {
            for w in 0..level_workers {
                let tx = tx.clone();
                let start = w * batch_size;
                let pairs = &nodes[start..start + batch_size];
                s.spawn(move || {
                    let mut results = Vec::with_capacity(batch_size / 2);
                    for k in (0..pairs.len()).step_by(2) {
                        let parent = hash_inner(&pairs[k], &pairs[k + 1]);
                        results.push(((start + k) / 2, parent));
                    }
                    let _ = tx.send(Batch { results });
                });
            }
            drop(tx);
            collect_into(&rx, &mut next);
        });

        levels.push(std::mem::replace(&mut nodes, next));
    }

    levels.push(nodes);
    Ok(levels)
}

/// Proof phase: partition the leaf range and walk each leaf's sibling
/// chain through the levels (`sibling = k ^ 1`, `parent = k >> 1`).
fn extract_proofs(levels: &[Vec<Hash>], workers: usize) -> Vec<Vec<Hash>> {
    let leaf_count = levels[0].len();
    let depth = levels.len() - 1;
    let mut proofs = vec![Vec::new(); leaf_count];
    if depth == 0 {
        return proofs;
    }

    let pool = workers.min(leaf_count);
    let batch_size = leaf_count / pool;
    let (tx, rx) = bounded::<Batch<Vec<Hash>>>(pool);
    thread::scope(|s| {
        for w in 0..pool {
            let tx = tx.clone();
            let start = w * batch_size;
            s.spawn(move || {
                let mut results = Vec::with_capacity(batch_size);
                for leaf in start..start + batch_size {
                    let mut path = Vec::with_capacity(depth);
                    let mut k = leaf;
                    for level in &levels[..depth] {
                        path.push(level[k ^ 1]);
                        k >>= 1;
                    }
                    results.push((leaf, path));
                }
                let _ = tx.send(Batch { results });
            });
        }
        drop(tx);
        collect_into(&rx, &mut proofs);
    });
    proofs
}

/// Collector half of every phase: place each stamped result at its index.
fn collect_into<T>(rx: &Receiver<Batch<T>>, out: &mut [T]) {
    for batch in rx {
        for (index, value) in batch.results {
            out[index] = value;
        }
    }
}
