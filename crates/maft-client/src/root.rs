// crates/maft-client/src/root.rs

//! Batch root over a directory, computed before the files are let go.

use std::fs::File;
use std::path::Path;
use std::thread;

use anyhow::{bail, Context, Result};
use crossbeam_channel::bounded;
use maft_crypto::Hash;
use maft_merkle::{write_root_file, TreeBuilder};
use rayon::prelude::*;
use tracing::info;

use crate::dir::enumerate_files;

/// Hash every file of `dir` (one file = one leaf, in upload order),
/// stream the digests into the tree builder, write the hex root to
/// `out`, and return it.
///
/// File hashing fans out across cores; the digests are then delivered
/// to the builder strictly in enumeration order, since arrival order is
/// leaf order.
///
/// # Errors
/// Empty directories, unreadable files, and tree construction failures,
/// each with the offending path in context.
pub fn root_over_dir(dir: &Path, out: &Path) -> Result<String> {
    let files = enumerate_files(dir)?;
    let count = files.len();
    if count == 0 {
        bail!("no files to commit in {}", dir.display());
    }

    let (tx, rx) = bounded::<Hash>(1);
    let hasher = thread::spawn(move || -> Result<()> {
        let digests = files
            .par_iter()
            .map(|path| hash_file(path))
            .collect::<Result<Vec<Hash>>>()?;
        for digest in digests {
            if tx.send(digest).is_err() {
                break;
            }
        }
        Ok(())
    });

    let tree = TreeBuilder::new().build_from_hash_stream(&rx, count);
    // Unblock the hasher before joining: if the builder bailed early the
    // channel must disconnect or a pending send would wait forever.
    drop(rx);
    let hashed = hasher
        .join()
        .map_err(|_| anyhow::anyhow!("file hashing thread panicked"))?;
    hashed.with_context(|| format!("hashing files under {}", dir.display()))?;
    let tree = tree.with_context(|| format!("building tree over {}", dir.display()))?;

    write_root_file(out, &tree.root())?;
    let root = tree.root_hex();
    info!(root = %root, files = count, out = %out.display(), "committed directory root");
    Ok(root)
}

fn hash_file(path: &Path) -> Result<Hash> {
    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    maft_crypto::hash_reader(&mut file).with_context(|| format!("hash {}", path.display()))
}
