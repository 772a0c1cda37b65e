// crates/maft-ingest/src/lib.rs

//! Batch ingestion: turn a stream of indexed file parts into a Merkle
//! tree, a content-addressed blob set, and a metadata set, atomically
//! from the caller's point of view.
//!
//! [`BatchIngestor`] collects the full batch (the tree cannot be built
//! without every leaf), builds the tree off the async runtime, then fans
//! one [`FileRecord`] and one [`FileMetadata`] per input, in ascending
//! index order from a single producer, into two bounded channels
//! consumed by the [`BlobSink`] and [`MetadataSink`] implementations.
//! A slow sink stalls the producer, which couples both pipelines at the
//! slowest consumer; the first sink error cancels the fan-out and the
//! other sink, and the batch is reported failed.

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

pub mod error;
pub mod ingestor;
pub mod sink;
pub mod types;

pub use error::{IngestError, SinkKind};
pub use ingestor::{BatchIngestor, IngestReport};
pub use sink::{BlobSink, MetadataSink};
pub use types::{FileMetadata, FileRecord, IndexedInput};
