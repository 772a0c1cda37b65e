// crates/maft-merkle/src/error.rs

//! Error kinds surfaced by tree construction, proof access, and codecs.

use thiserror::Error;

/// Failures the tree engine reports to its callers.
#[derive(Debug, Error)]
pub enum MerkleError {
    /// Zero leaves were supplied; no root is defined.
    #[error("cannot build a tree over zero leaves")]
    EmptyInput,

    /// The hash stream disconnected before delivering the declared count.
    #[error("hash stream ended after {got} of {want} declared leaves")]
    StreamShort {
        /// Leaves actually received.
        got: usize,
        /// Leaves the caller declared.
        want: usize,
    },

    /// The hash stream held more values than the declared count.
    #[error("hash stream delivered more than the declared {want} leaves")]
    StreamLong {
        /// Leaves the caller declared.
        want: usize,
    },

    /// The configured worker count cannot partition the leaves evenly.
    ///
    /// Refusing the build is deliberate: truncating the tail would
    /// silently drop leaves from the tree.
    #[error("{leaves} leaves cannot be split evenly across {workers} workers")]
    BatchMisalignment {
        /// Padded leaf count being partitioned.
        leaves: usize,
        /// Offending worker count.
        workers: usize,
    },

    /// A proof was requested for a leaf with no parent chain to the root.
    #[error("leaf {index} has no parent chain to the root")]
    ParentMissing {
        /// The out-of-range leaf index.
        index: usize,
    },

    /// Malformed proof envelope, hex, or base64 material.
    #[error("malformed proof material: {0}")]
    Decode(String),
}
