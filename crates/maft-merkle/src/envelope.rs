// crates/maft-merkle/src/envelope.rs

//! On-disk proof and root formats shared by the client and the tooling.
//!
//! - `<index>.proof`: JSON `{ "index": <int>, "proof": [<lower-hex>] }`.
//! - `merkle_root`: a single line of lower-hex, no trailing newline.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use maft_crypto::Hash;
use serde::{Deserialize, Serialize};

use crate::error::MerkleError;

/// Serialized sibling path for one leaf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofEnvelope {
    /// Leaf index the path belongs to.
    pub index: u64,
    /// Sibling digests bottom to top, lower-hex.
    pub proof: Vec<String>,
}

impl ProofEnvelope {
    /// Envelope for `index` over an in-memory sibling path.
    #[must_use]
    pub fn from_path(index: u64, path: &[Hash]) -> Self {
        Self {
            index,
            proof: path.iter().map(maft_crypto::to_hex).collect(),
        }
    }

    /// Decode the hex path back into digests.
    ///
    /// # Errors
    /// [`MerkleError::Decode`] on any malformed element.
    pub fn decode_path(&self) -> Result<Vec<Hash>, MerkleError> {
        self.proof
            .iter()
            .enumerate()
            .map(|(i, s)| {
                maft_crypto::from_hex(s)
                    .map_err(|e| MerkleError::Decode(format!("proof element {i}: {e}")))
            })
            .collect()
    }
}

/// Write a proof envelope as JSON.
///
/// # Errors
/// IO or serialization failures, with the path in context.
pub fn write_proof_file<P: AsRef<Path>>(path: P, envelope: &ProofEnvelope) -> Result<()> {
    let path = path.as_ref();
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer(&mut w, envelope).context("serialize proof envelope")?;
    w.flush().context("flush proof envelope")?;
    Ok(())
}

/// Read a proof envelope from JSON.
///
/// # Errors
/// IO or deserialization failures, with the path in context.
pub fn read_proof_file<P: AsRef<Path>>(path: P) -> Result<ProofEnvelope> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let envelope =
        serde_json::from_reader(BufReader::new(f)).context("deserialize proof envelope")?;
    Ok(envelope)
}

/// Write a root sidecar: lower-hex, no trailing newline.
///
/// # Errors
/// IO failures, with the path in context.
pub fn write_root_file<P: AsRef<Path>>(path: P, root: &Hash) -> Result<()> {
    let path = path.as_ref();
    let mut f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    f.write_all(maft_crypto::to_hex(root).as_bytes())
        .with_context(|| format!("write root to {}", path.display()))?;
    Ok(())
}

/// Read a root sidecar written by [`write_root_file`].
///
/// # Errors
/// IO failures or malformed hex, with the path in context.
pub fn read_root_file<P: AsRef<Path>>(path: P) -> Result<Hash> {
    let path = path.as_ref();
    let text =
        std::fs::read_to_string(path).with_context(|| format!("open {}", path.display()))?;
    let root = maft_crypto::from_hex(&text)
        .map_err(|e| MerkleError::Decode(format!("root sidecar: {e}")))
        .with_context(|| format!("decode root from {}", path.display()))?;
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use maft_crypto::hash_leaf;

    #[test]
    fn envelope_round_trips_through_hex() {
        let path = vec![hash_leaf(b"a"), hash_leaf(b"b")];
        let env = ProofEnvelope::from_path(7, &path);
        assert_eq!(env.decode_path().unwrap(), path);
    }

    #[test]
    fn malformed_hex_is_a_decode_error() {
        let env = ProofEnvelope {
            index: 0,
            proof: vec!["not-hex".into()],
        };
        assert!(matches!(env.decode_path(), Err(MerkleError::Decode(_))));
    }

    #[test]
    fn sidecars_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let root = hash_leaf(b"root material");
        let root_path = dir.path().join("merkle_root");
        write_root_file(&root_path, &root).unwrap();
        // Byte-exact: 64 hex digits, no newline.
        assert_eq!(std::fs::read(&root_path).unwrap().len(), 64);
        assert_eq!(read_root_file(&root_path).unwrap(), root);

        let env = ProofEnvelope::from_path(3, &[hash_leaf(b"sib")]);
        let proof_path = dir.path().join("3.proof");
        write_proof_file(&proof_path, &env).unwrap();
        assert_eq!(read_proof_file(&proof_path).unwrap(), env);
    }
}
