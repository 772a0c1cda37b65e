// crates/maft-merkle/src/lib.rs

//! Parallel Merkle tree engine over 32-byte SHA-256 digests.
//!
//! - [`TreeBuilder`] constructs a [`Tree`] bottom-up with a worker pool,
//!   either from raw byte blocks or from a bounded stream of precomputed
//!   leaf hashes, and extracts a sibling path for every leaf.
//! - [`verify_proof`] reconstructs a root from
//!   `(index, leaf_hash, path)` without any tree state.
//! - [`ProofEnvelope`] and the sidecar helpers read/write the on-disk
//!   proof and root formats shared with the server.
//!
//! Short batches are padded to the next power of two with the hashed
//! empty block, so the block path and the stream path agree on the root
//! for every leaf count (see [`PADDING_SCHEME_VERSION`]).

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

pub mod builder;
pub mod envelope;
pub mod error;
pub mod tree;
pub mod verify;

pub use builder::TreeBuilder;
pub use envelope::{
    read_proof_file, read_root_file, write_proof_file, write_root_file, ProofEnvelope,
};
pub use error::MerkleError;
pub use tree::Tree;
pub use verify::verify_proof;

/// Version of the padding rule baked into this engine.
///
/// Version 1 (the historical scheme) padded stream-built trees with a
/// 32-zero-byte sentinel while block-built trees hashed empty blocks,
/// so the two paths disagreed for non-power-of-two batches. Version 2
/// pads both paths with `SHA-256("")`.
pub const PADDING_SCHEME_VERSION: u32 = 2;
