// crates/maft-ingest/src/types.rs

//! Records exchanged between the decoder, the ingestor, and the sinks.

use bytes::Bytes;
use maft_crypto::Hash;

/// One decoded upload part: its position stamp and its bytes.
///
/// The stamp is the part filename parsed as a decimal index when
/// numeric, otherwise the decoder's receive-order counter.
#[derive(Clone, Debug)]
pub struct IndexedInput {
    /// Position stamp assigned by the decoder.
    pub index: usize,
    /// Full content of the part.
    pub data: Bytes,
}

/// Authentication metadata persisted per leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileMetadata {
    /// Leaf index within the batch.
    pub index: u64,
    /// SHA-256 of the file content; also the blob key (lower-hex).
    pub hash: Hash,
    /// Sibling path from the leaf to the batch root.
    pub proof: Vec<Hash>,
}

/// Blob-sink record: the content plus the metadata it is keyed by.
#[derive(Clone, Debug)]
pub struct FileRecord {
    /// Full file content.
    pub data: Bytes,
    /// The matching metadata record.
    pub metadata: FileMetadata,
}
