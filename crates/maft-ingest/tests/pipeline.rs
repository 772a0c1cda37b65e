//! End-to-end pipeline tests over in-memory sinks.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use maft_crypto::hash_leaf;
use maft_ingest::{
    BatchIngestor, BlobSink, FileMetadata, FileRecord, IndexedInput, IngestError, MetadataSink,
    SinkKind,
};
use maft_merkle::verify_proof;
use tokio::sync::mpsc::{channel, Receiver};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct MemoryBlobSink {
    stored: Mutex<Vec<FileRecord>>,
}

#[async_trait]
impl BlobSink for MemoryBlobSink {
    async fn store_batch(
        &self,
        mut records: Receiver<FileRecord>,
        cancel: CancellationToken,
    ) -> Result<()> {
        loop {
            tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                next = records.recv() => match next {
                    Some(record) => self.stored.lock().unwrap().push(record),
                    None => return Ok(()),
                },
            }
        }
    }
}

#[derive(Default)]
struct MemoryMetadataSink {
    rows: Mutex<Vec<FileMetadata>>,
    fail_at: Option<usize>,
}

#[async_trait]
impl MetadataSink for MemoryMetadataSink {
    async fn put_batch(
        &self,
        mut records: Receiver<FileMetadata>,
        cancel: CancellationToken,
    ) -> Result<()> {
        loop {
            tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                next = records.recv() => match next {
                    Some(row) => {
                        let mut rows = self.rows.lock().unwrap();
                        if self.fail_at == Some(rows.len()) {
                            bail!("metadata store rejected row {}", rows.len());
                        }
                        rows.push(row);
                    }
                    None => return Ok(()),
                },
            }
        }
    }
}

fn inputs(contents: &[&str]) -> Vec<IndexedInput> {
    contents
        .iter()
        .enumerate()
        .map(|(index, c)| IndexedInput {
            index,
            data: Bytes::copy_from_slice(c.as_bytes()),
        })
        .collect()
}

async fn run_batch(
    parts: Vec<IndexedInput>,
    blob: Arc<MemoryBlobSink>,
    meta: Arc<MemoryMetadataSink>,
) -> Result<maft_ingest::IngestReport, IngestError> {
    let ingestor = BatchIngestor::new(blob, meta);
    let (tx, rx) = channel(1);
    let feeder = tokio::spawn(async move {
        for part in parts {
            if tx.send(part).await.is_err() {
                return;
            }
        }
    });
    let result = ingestor.ingest(rx, CancellationToken::new()).await;
    feeder.await.unwrap();
    result
}

#[tokio::test]
async fn batch_commits_both_fans_consistently() {
    let blob = Arc::new(MemoryBlobSink::default());
    let meta = Arc::new(MemoryMetadataSink::default());
    let contents = ["alpha", "beta", "gamma", "delta", "epsilon"];

    let report = run_batch(inputs(&contents), Arc::clone(&blob), Arc::clone(&meta))
        .await
        .expect("batch should succeed");
    assert_eq!(report.files, contents.len());

    let rows = meta.rows.lock().unwrap();
    let stored = blob.stored.lock().unwrap();
    assert_eq!(rows.len(), contents.len());
    assert_eq!(stored.len(), contents.len());

    for (i, content) in contents.iter().enumerate() {
        // Metadata arrives in ascending index order from the single producer.
        assert_eq!(rows[i].index, i as u64);
        assert_eq!(rows[i].hash, hash_leaf(content.as_bytes()));
        // Every persisted proof authenticates its blob against the root.
        assert!(verify_proof(i, &rows[i].hash, &rows[i].proof, &report.root));
        // Blob record carries the same metadata as the metadata fan.
        assert_eq!(stored[i].metadata, rows[i]);
        assert_eq!(stored[i].data.as_ref(), content.as_bytes());
    }
}

#[tokio::test]
async fn out_of_order_stamps_are_reordered_before_building() {
    let blob = Arc::new(MemoryBlobSink::default());
    let meta = Arc::new(MemoryMetadataSink::default());

    // Parts arrive 2, 0, 1; stamps carry the intended positions.
    let parts = vec![
        IndexedInput { index: 2, data: Bytes::from_static(b"third") },
        IndexedInput { index: 0, data: Bytes::from_static(b"first") },
        IndexedInput { index: 1, data: Bytes::from_static(b"second") },
    ];
    let report = run_batch(parts, Arc::clone(&blob), Arc::clone(&meta))
        .await
        .expect("batch should succeed");

    let rows = meta.rows.lock().unwrap();
    assert_eq!(rows[0].hash, hash_leaf(b"first"));
    assert_eq!(rows[1].hash, hash_leaf(b"second"));
    assert_eq!(rows[2].hash, hash_leaf(b"third"));

    // The root equals a tree built over the sorted blocks.
    let sorted = maft_merkle::TreeBuilder::new()
        .build_from_blocks(&[b"first".as_slice(), b"second", b"third"])
        .unwrap();
    assert_eq!(report.root, sorted.root());
}

#[tokio::test]
async fn first_sink_error_fails_the_whole_batch() {
    let blob = Arc::new(MemoryBlobSink::default());
    let meta = Arc::new(MemoryMetadataSink {
        rows: Mutex::new(Vec::new()),
        fail_at: Some(2),
    });

    let err = run_batch(
        inputs(&["a", "b", "c", "d", "e", "f"]),
        Arc::clone(&blob),
        Arc::clone(&meta),
    )
    .await
    .expect_err("batch must be reported failed");

    match err {
        IngestError::Sink { kind, .. } => assert_eq!(kind, SinkKind::Metadata),
        other => panic!("expected sink failure, got {other:?}"),
    }
    // No success was reported, and the failing sink stopped mid-batch.
    assert!(meta.rows.lock().unwrap().len() < 6);
}

#[tokio::test]
async fn empty_batch_is_refused() {
    let blob = Arc::new(MemoryBlobSink::default());
    let meta = Arc::new(MemoryMetadataSink::default());
    let err = run_batch(Vec::new(), blob, meta)
        .await
        .expect_err("empty batch has no root");
    assert!(matches!(
        err,
        IngestError::Build(maft_merkle::MerkleError::EmptyInput)
    ));
}

#[tokio::test]
async fn cancellation_fails_the_batch_after_draining() {
    let blob = Arc::new(MemoryBlobSink::default());
    let meta = Arc::new(MemoryMetadataSink::default());
    let ingestor = BatchIngestor::new(Arc::clone(&blob), Arc::clone(&meta));

    let (tx, rx) = channel(1);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = ingestor.ingest(rx, cancel).await;
    drop(tx);
    assert!(matches!(result, Err(IngestError::Cancelled)));
}
