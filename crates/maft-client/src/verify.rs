// crates/maft-client/src/verify.rs

//! Verification entry point for a downloaded file.

use std::path::Path;

use anyhow::{Context, Result};
use maft_merkle::{read_proof_file, read_root_file, verify_proof};
use tracing::info;

/// Check a downloaded file against its proof sidecar and the retained
/// root. Returns whether the bytes are the ones originally uploaded.
///
/// # Errors
/// IO failures or malformed sidecar material; a clean mismatch is
/// `Ok(false)`, not an error.
pub fn verify_file(file_path: &Path, proof_path: &Path, root_path: &Path) -> Result<bool> {
    let content = std::fs::read(file_path)
        .with_context(|| format!("read {}", file_path.display()))?;
    let envelope = read_proof_file(proof_path)?;
    let path = envelope
        .decode_path()
        .with_context(|| format!("decode proof from {}", proof_path.display()))?;
    let root = read_root_file(root_path)?;

    let leaf = maft_crypto::hash_leaf(&content);
    let index = usize::try_from(envelope.index)
        .with_context(|| format!("proof index {} out of range", envelope.index))?;
    let valid = verify_proof(index, &leaf, &path, &root);
    info!(index, file = %file_path.display(), valid, "verified download");
    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use maft_merkle::{write_proof_file, write_root_file, ProofEnvelope, TreeBuilder};

    #[test]
    fn round_trip_through_sidecars() {
        let tmp = tempfile::tempdir().unwrap();
        let contents = ["f0", "f1", "f2"];
        let blocks: Vec<&[u8]> = contents.iter().map(|c| c.as_bytes()).collect();
        let tree = TreeBuilder::new().build_from_blocks(&blocks).unwrap();

        let root_path = tmp.path().join("merkle_root");
        write_root_file(&root_path, &tree.root()).unwrap();

        let index = 1usize;
        let file_path = tmp.path().join("1");
        std::fs::write(&file_path, contents[index]).unwrap();
        let proof_path = tmp.path().join("1.proof");
        let envelope = ProofEnvelope::from_path(index as u64, tree.proof(index).unwrap());
        write_proof_file(&proof_path, &envelope).unwrap();

        assert!(verify_file(&file_path, &proof_path, &root_path).unwrap());

        // One flipped byte in the downloaded content must fail.
        std::fs::write(&file_path, "fX").unwrap();
        assert!(!verify_file(&file_path, &proof_path, &root_path).unwrap());
    }

    #[test]
    fn wrong_root_fails_cleanly() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = TreeBuilder::new()
            .build_from_blocks(&[b"a".as_slice(), b"b"])
            .unwrap();

        let file_path = tmp.path().join("0");
        std::fs::write(&file_path, "a").unwrap();
        let proof_path = tmp.path().join("0.proof");
        write_proof_file(
            &proof_path,
            &ProofEnvelope::from_path(0, tree.proof(0).unwrap()),
        )
        .unwrap();
        let root_path = tmp.path().join("merkle_root");
        write_root_file(&root_path, &maft_crypto::hash_leaf(b"unrelated")).unwrap();

        assert!(!verify_file(&file_path, &proof_path, &root_path).unwrap());
    }
}
