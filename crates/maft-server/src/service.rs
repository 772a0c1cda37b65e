// crates/maft-server/src/service.rs

//! Service layer joining the two stores.

use std::sync::Arc;

use anyhow::anyhow;
use maft_ingest::{BatchIngestor, FileMetadata, IndexedInput, IngestError, IngestReport};
use thiserror::Error;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;

use crate::store::{BlobStore, MetadataStore};

/// A committed file joined with its authentication metadata.
#[derive(Clone, Debug)]
pub struct StoredFile {
    /// Blob bytes.
    pub data: Vec<u8>,
    /// Matching metadata row.
    pub metadata: FileMetadata,
}

/// Failures of the download path.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The index was never committed.
    #[error("index {0} not found")]
    NotFound(u64),
    /// Store failures, including a blob missing for a committed index.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// File operations the HTTP surface exposes.
pub struct FileService<B, M> {
    blob: Arc<B>,
    meta: Arc<M>,
    ingestor: BatchIngestor<B, M>,
}

impl<B, M> FileService<B, M>
where
    B: BlobStore + 'static,
    M: MetadataStore + 'static,
{
    /// Service over the two stores.
    pub fn new(blob: Arc<B>, meta: Arc<M>) -> Self {
        let ingestor = BatchIngestor::new(Arc::clone(&blob), Arc::clone(&meta));
        Self {
            blob,
            meta,
            ingestor,
        }
    }

    /// Look up one committed file: metadata row first, then the blob it
    /// keys.
    ///
    /// # Errors
    /// [`ServiceError::NotFound`] for an uncommitted index;
    /// [`ServiceError::Internal`] for store failures.
    pub async fn get(&self, index: u64) -> Result<StoredFile, ServiceError> {
        let metadata = self
            .meta
            .get(index)
            .await?
            .ok_or(ServiceError::NotFound(index))?;
        let key = maft_crypto::to_hex(&metadata.hash);
        let data = self
            .blob
            .fetch(&key)
            .await?
            .ok_or_else(|| anyhow!("blob {key} missing for committed index {index}"))?;
        Ok(StoredFile { data, metadata })
    }

    /// Ingest one upload batch.
    ///
    /// # Errors
    /// Any [`IngestError`]; the batch is atomic from the caller's view.
    pub async fn save_stream(
        &self,
        inputs: Receiver<IndexedInput>,
        cancel: CancellationToken,
    ) -> Result<IngestReport, IngestError> {
        self.ingestor.ingest(inputs, cancel).await
    }
}
