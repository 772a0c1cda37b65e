// crates/maft-ingest/src/ingestor.rs

//! The batch driver: receive, build, fan, drain.

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use bytes::Bytes;
use maft_merkle::{MerkleError, TreeBuilder};
use tokio::sync::mpsc::{channel, Receiver};
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{IngestError, SinkKind};
use crate::sink::{BlobSink, MetadataSink};
use crate::types::{FileMetadata, FileRecord, IndexedInput};

/// Outcome of a successful ingestion.
#[derive(Clone, Debug)]
pub struct IngestReport {
    /// Root of the batch tree.
    pub root: maft_crypto::Hash,
    /// Number of files committed.
    pub files: usize,
}

impl IngestReport {
    /// Lower-hex rendering of the batch root.
    #[must_use]
    pub fn root_hex(&self) -> String {
        maft_crypto::to_hex(&self.root)
    }
}

/// First sink error captured during a batch; later errors are dropped.
type FirstError = Arc<Mutex<Option<(SinkKind, anyhow::Error)>>>;

fn record_first(slot: &FirstError, kind: SinkKind, err: anyhow::Error) {
    if let Ok(mut guard) = slot.lock() {
        if guard.is_none() {
            *guard = Some((kind, err));
        }
    }
}

/// Drives one upload batch end to end.
///
/// Both sink channels are bounded (capacity 1 by default), so the
/// single fan-out producer blocks whenever either sink is slower and
/// the whole pipeline runs at the slowest consumer. The two fans are
/// deliberately coupled: a metadata record is only ever emitted next to
/// its blob record, so a committed blob can always be found again.
pub struct BatchIngestor<B, M> {
    blob: Arc<B>,
    meta: Arc<M>,
    builder: TreeBuilder,
    capacity: usize,
}

impl<B, M> BatchIngestor<B, M>
where
    B: BlobSink + 'static,
    M: MetadataSink + 'static,
{
    /// Ingestor over the two sinks with capacity-1 fan channels.
    pub fn new(blob: Arc<B>, meta: Arc<M>) -> Self {
        Self {
            blob,
            meta,
            builder: TreeBuilder::new(),
            capacity: 1,
        }
    }

    /// Widen the fan channels (throughput tuning; ordering is unchanged).
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Run one batch to completion.
    ///
    /// Succeeds only when the tree was built and both sinks drained
    /// without error; there is no partial-commit outcome. On
    /// cancellation the fan-out stops emitting, both channels close,
    /// and the batch is reported [`IngestError::Cancelled`].
    ///
    /// # Errors
    /// [`IngestError::Build`] when construction fails (including the
    /// empty batch), [`IngestError::Sink`] carrying the first sink
    /// failure, or [`IngestError::Cancelled`].
    pub async fn ingest(
        &self,
        mut inputs: Receiver<IndexedInput>,
        cancel: CancellationToken,
    ) -> Result<IngestReport, IngestError> {
        // Receiving: the tree needs every leaf, so collect the batch.
        let mut batch = Vec::new();
        loop {
            tokio::select! {
                () = cancel.cancelled() => return Err(IngestError::Cancelled),
                next = inputs.recv() => match next {
                    Some(part) => batch.push(part),
                    None => break,
                },
            }
        }

        // Canonical order: ascending by stamp; the position in sorted
        // order is the leaf index from here on.
        batch.sort_by_key(|part| part.index);
        let count = batch.len();
        debug!(files = count, "batch received, building tree");

        // Building: CPU-bound, keep it off the async workers.
        let blocks: Vec<Bytes> = batch.iter().map(|part| part.data.clone()).collect();
        let builder = self.builder;
        let tree = task::spawn_blocking(move || builder.build_from_blocks(&blocks))
            .await
            .map_err(|_| IngestError::BuildAborted)??;

        let mut records = Vec::with_capacity(count);
        for position in 0..count {
            let hash = tree
                .leaf(position)
                .copied()
                .ok_or(MerkleError::ParentMissing { index: position })?;
            let proof = tree.proof(position)?.to_vec();
            records.push(FileMetadata {
                index: position as u64,
                hash,
                proof,
            });
        }

        // Fanning: one producer, two bounded channels, lockstep emit.
        // Sink failures cancel a child token so the external one stays
        // under the driver's control.
        let local = cancel.child_token();
        let first_err: FirstError = Arc::new(Mutex::new(None));
        let (blob_tx, blob_rx) = channel::<FileRecord>(self.capacity);
        let (meta_tx, meta_rx) = channel::<FileMetadata>(self.capacity);

        let blob_handle = {
            let sink = Arc::clone(&self.blob);
            let token = local.clone();
            let first = Arc::clone(&first_err);
            tokio::spawn(async move {
                if let Err(err) = sink.store_batch(blob_rx, token.clone()).await {
                    record_first(&first, SinkKind::Blob, err);
                    token.cancel();
                }
            })
        };
        let meta_handle = {
            let sink = Arc::clone(&self.meta);
            let token = local.clone();
            let first = Arc::clone(&first_err);
            tokio::spawn(async move {
                if let Err(err) = sink.put_batch(meta_rx, token.clone()).await {
                    record_first(&first, SinkKind::Metadata, err);
                    token.cancel();
                }
            })
        };

        debug!(files = count, "fanning records to sinks");
        for (metadata, part) in records.into_iter().zip(batch) {
            if local.is_cancelled() {
                break;
            }
            let record = FileRecord {
                data: part.data,
                metadata: metadata.clone(),
            };
            // A closed channel means the sink is gone; its error (or the
            // cancellation) is picked up after the drain.
            if blob_tx.send(record).await.is_err() {
                break;
            }
            if meta_tx.send(metadata).await.is_err() {
                break;
            }
        }

        // Draining: close both channels, then wait for both sinks.
        drop(blob_tx);
        drop(meta_tx);
        if blob_handle.await.is_err() {
            record_first(&first_err, SinkKind::Blob, anyhow!("blob sink task panicked"));
        }
        if meta_handle.await.is_err() {
            record_first(
                &first_err,
                SinkKind::Metadata,
                anyhow!("metadata sink task panicked"),
            );
        }

        // Driver cancellation outranks whatever the sinks reported while
        // being torn down (a rolled-back sink errors on cancel too).
        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }
        if let Some((kind, source)) = first_err.lock().ok().and_then(|mut slot| slot.take()) {
            return Err(IngestError::Sink { kind, source });
        }

        let report = IngestReport {
            root: tree.root(),
            files: count,
        };
        info!(root = %report.root_hex(), files = count, "batch ingested");
        Ok(report)
    }
}
