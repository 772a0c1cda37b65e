// crates/maft-ingest/src/sink.rs

//! Sink interfaces the pipeline fans into.
//!
//! A sink owns its receiver: it drains records until the channel closes
//! (end of batch) or the cancellation token fires, committing however it
//! sees fit. Record order within one sink is ascending by index; sinks
//! may commit out of order as long as keys are respected.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;

use crate::types::{FileMetadata, FileRecord};

/// Consumer of content-addressed blob records.
#[async_trait]
pub trait BlobSink: Send + Sync {
    /// Drain and persist one batch of records.
    async fn store_batch(
        &self,
        records: Receiver<FileRecord>,
        cancel: CancellationToken,
    ) -> Result<()>;
}

/// Consumer of per-leaf metadata records.
#[async_trait]
pub trait MetadataSink: Send + Sync {
    /// Drain and persist one batch of metadata rows.
    async fn put_batch(
        &self,
        records: Receiver<FileMetadata>,
        cancel: CancellationToken,
    ) -> Result<()>;
}
