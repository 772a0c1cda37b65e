// crates/maft-server/src/store/mod.rs

//! Boundary adapters and their read-side interfaces.
//!
//! The write side (draining one ingestion batch) comes from the
//! pipeline's sink traits; the read side below is what the download
//! path needs. Concrete adapters implement both.

use anyhow::Result;
use async_trait::async_trait;
use maft_ingest::{BlobSink, FileMetadata, MetadataSink};

pub mod blob;
pub mod meta;
mod schema;

pub use blob::OpendalBlobStore;
pub use meta::PgMetadataStore;

/// Metadata persistence keyed by leaf index.
#[async_trait]
pub trait MetadataStore: MetadataSink {
    /// Fetch one row; `None` when the index was never committed.
    async fn get(&self, index: u64) -> Result<Option<FileMetadata>>;
}

/// Content-addressed blob persistence keyed by lower-hex leaf hash.
#[async_trait]
pub trait BlobStore: BlobSink {
    /// Fetch one blob; `None` when the key is absent.
    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>>;
}
