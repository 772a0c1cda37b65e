// crates/maft-server/src/store/blob.rs

//! Content-addressed blob adapter over opendal.

use anyhow::{Context, Result};
use async_trait::async_trait;
use maft_ingest::{BlobSink, FileRecord};
use opendal::layers::{LoggingLayer, RetryLayer};
use opendal::{services, ErrorKind, Operator};
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::BlobStore;

/// Blob store keyed by the lower-hex leaf hash of each file.
#[derive(Clone, Debug)]
pub struct OpendalBlobStore {
    op: Operator,
}

impl OpendalBlobStore {
    /// Filesystem-backed store rooted at `root`.
    ///
    /// Creating the root is the bucket bootstrap: idempotent, tolerant
    /// of an existing directory.
    ///
    /// # Errors
    /// Unusable root directory or a failing backend health check.
    pub async fn new_fs(root: &str) -> Result<Self> {
        std::fs::create_dir_all(root)
            .with_context(|| format!("create blob root {root}"))?;
        let builder = services::Fs::default().root(root);
        let op = Operator::new(builder)
            .context("configure blob backend")?
            .finish()
            .layer(RetryLayer::new())
            .layer(LoggingLayer::default());
        op.check().await.context("blob backend health check")?;
        info!(root, "blob store ready");
        Ok(Self { op })
    }
}

#[async_trait]
impl BlobSink for OpendalBlobStore {
    async fn store_batch(
        &self,
        mut records: Receiver<FileRecord>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut stored = 0usize;
        loop {
            let record = tokio::select! {
                () = cancel.cancelled() => break,
                next = records.recv() => match next {
                    Some(record) => record,
                    None => break,
                },
            };
            let key = maft_crypto::to_hex(&record.metadata.hash);
            self.op
                .write(&key, record.data.to_vec())
                .await
                .with_context(|| format!("store blob {key}"))?;
            stored += 1;
        }
        debug!(stored, "blob batch drained");
        Ok(())
    }
}

#[async_trait]
impl BlobStore for OpendalBlobStore {
    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.op.read(key).await {
            Ok(buffer) => Ok(Some(buffer.to_vec())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("fetch blob {key}")),
        }
    }
}
