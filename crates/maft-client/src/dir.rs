// crates/maft-client/src/dir.rs

//! Deterministic directory enumeration.
//!
//! Root computation and upload must walk files in the same order the
//! server assigns leaf indices, or the client's root will not match the
//! server's. The server indexes parts by their decimal filename, so when
//! every filename parses as a non-negative integer the enumeration is
//! ordered numerically; otherwise it falls back to lexicographic order
//! and the server's receive-order counter yields the same positions.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// List the regular files of `dir`, non-recursive, in upload order.
///
/// # Errors
/// IO failures reading the directory, with the path in context.
pub fn enumerate_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("read directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let meta = entry
            .metadata()
            .with_context(|| format!("stat {}", entry.path().display()))?;
        if meta.is_file() {
            files.push(entry.path());
        }
    }

    let numeric: Option<Vec<u64>> = files.iter().map(|p| numeric_name(p)).collect();
    if let Some(keys) = numeric {
        let mut keyed: Vec<(u64, PathBuf)> = keys.into_iter().zip(files).collect();
        keyed.sort_by_key(|(k, _)| *k);
        Ok(keyed.into_iter().map(|(_, p)| p).collect())
    } else {
        files.sort();
        Ok(files)
    }
}

fn numeric_name(path: &Path) -> Option<u64> {
    path.file_name()?.to_str()?.parse().ok()
}
