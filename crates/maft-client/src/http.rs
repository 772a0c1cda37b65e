// crates/maft-client/src/http.rs

//! HTTP half of the client: multipart batch upload and single-file
//! download with proof sidecar extraction.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use maft_merkle::{write_proof_file, ProofEnvelope};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::info;

use crate::dir::enumerate_files;

/// Download response body, as the server encodes it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadResponse {
    file_name: String,
    /// Base64 of the file bytes.
    file_content: String,
    /// Base64-encoded 32-byte sibling hashes, bottom to top.
    merkle_proof: Vec<String>,
}

/// Thin client over the transfer endpoints.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    /// Base endpoint, e.g. `http://localhost:8080/file`.
    base_url: String,
}

impl ApiClient {
    /// Client for the given `/file` endpoint.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Upload every regular file of `dir` as one multipart batch, in
    /// the same order [`enumerate_files`] yields for root computation.
    ///
    /// Returns the number of files uploaded.
    ///
    /// # Errors
    /// IO failures, transport failures, or a non-success status.
    pub async fn upload_dir(&self, dir: &Path) -> Result<usize> {
        let files = enumerate_files(dir)?;
        if files.is_empty() {
            bail!("nothing to upload in {}", dir.display());
        }

        let mut form = Form::new();
        for path in &files {
            let name = file_name(path)?;
            let data = tokio::fs::read(path)
                .await
                .with_context(|| format!("read {}", path.display()))?;
            form = form.part("files", Part::bytes(data).file_name(name));
        }

        let response = self
            .http
            .post(&self.base_url)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("POST {}", self.base_url))?;
        let status = response.status();
        if !status.is_success() {
            bail!("server rejected upload: {status}");
        }
        info!(files = files.len(), url = %self.base_url, "uploaded directory");
        Ok(files.len())
    }

    /// Fetch one file by index, write its bytes under the index name in
    /// `out_dir`, and write the `<index>.proof` sidecar next to it.
    ///
    /// Returns the paths of the file and the sidecar.
    ///
    /// # Errors
    /// Transport failures, non-success statuses (including 404 for an
    /// unknown index), malformed base64, or IO failures.
    pub async fn download(&self, index: u64, out_dir: &Path) -> Result<(PathBuf, PathBuf)> {
        let url = format!("{}/{}", self.base_url, index);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("server returned {status} for index {index}");
        }
        let body: DownloadResponse = response
            .json()
            .await
            .with_context(|| format!("decode download response for index {index}"))?;

        let content = BASE64
            .decode(&body.file_content)
            .context("decode file content")?;
        let file_path = out_dir.join(&body.file_name);
        tokio::fs::write(&file_path, &content)
            .await
            .with_context(|| format!("write {}", file_path.display()))?;

        // The wire carries base64; the sidecar keeps lower-hex.
        let mut path_hashes = Vec::with_capacity(body.merkle_proof.len());
        for (i, element) in body.merkle_proof.iter().enumerate() {
            let raw = BASE64
                .decode(element)
                .with_context(|| format!("decode proof element {i}"))?;
            let digest: maft_crypto::Hash = raw
                .as_slice()
                .try_into()
                .map_err(|_| anyhow::anyhow!("proof element {i} is not 32 bytes"))?;
            path_hashes.push(digest);
        }
        let envelope = ProofEnvelope::from_path(index, &path_hashes);
        let proof_path = out_dir.join(format!("{}.proof", body.file_name));
        write_proof_file(&proof_path, &envelope)?;

        info!(index, file = %file_path.display(), "downloaded file and proof");
        Ok((file_path, proof_path))
    }
}

fn file_name(path: &Path) -> Result<String> {
    Ok(path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("non-UTF-8 file name: {}", path.display()))?
        .to_owned())
}
