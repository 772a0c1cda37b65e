// crates/maft-server/src/http.rs

//! HTTP surface: one upload route, one download route.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use maft_ingest::{IndexedInput, IngestError};
use serde::Serialize;
use tokio::sync::mpsc::channel;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::service::{FileService, ServiceError, StoredFile};
use crate::store::{BlobStore, MetadataStore};

/// Body of a successful upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Always `"Success"`.
    pub status: &'static str,
}

/// Body of a successful download.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    /// The requested index as a decimal string.
    pub file_name: String,
    /// Base64 of the file bytes.
    pub file_content: String,
    /// Base64-encoded sibling hashes, bottom to top.
    pub merkle_proof: Vec<String>,
}

impl DownloadResponse {
    fn new(index: u64, file: &StoredFile) -> Self {
        Self {
            file_name: index.to_string(),
            file_content: BASE64.encode(&file.data),
            merkle_proof: file
                .metadata
                .proof
                .iter()
                .map(|h| BASE64.encode(h))
                .collect(),
        }
    }
}

/// Error responses of the HTTP surface.
#[derive(Debug)]
pub enum ApiError {
    /// 404: index not committed.
    NotFound(u64),
    /// 500: anything the caller cannot fix by changing the request.
    Internal(anyhow::Error),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(index) => Self::NotFound(index),
            ServiceError::Internal(source) => Self::Internal(source),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        Self::Internal(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(index) => {
                (StatusCode::NOT_FOUND, format!("file {index} not found")).into_response()
            }
            Self::Internal(err) => {
                error!(error = %format!("{err:#}"), "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}

/// Routes over a service instance.
pub fn router<B, M>(service: Arc<FileService<B, M>>) -> Router
where
    B: BlobStore + 'static,
    M: MetadataStore + 'static,
{
    Router::new()
        .route("/file", post(upload::<B, M>))
        .route("/file/:index", get(download::<B, M>))
        .with_state(service)
}

/// `POST /file`: decode the multipart stream into indexed inputs and
/// drive one ingestion batch; succeed only when the batch committed.
async fn upload<B, M>(
    State(service): State<Arc<FileService<B, M>>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError>
where
    B: BlobStore + 'static,
    M: MetadataStore + 'static,
{
    let (tx, rx) = channel::<IndexedInput>(1);
    let cancel = CancellationToken::new();

    let ingest = service.save_stream(rx, cancel.clone());
    let decode = {
        let cancel = cancel.clone();
        async move {
            let mut counter = 0usize;
            loop {
                let field = match multipart.next_field().await {
                    Ok(Some(field)) => field,
                    Ok(None) => break,
                    Err(err) => {
                        // A truncated stream must fail the batch, not
                        // commit the prefix that made it through.
                        cancel.cancel();
                        return Err(anyhow::Error::from(err).context("read multipart part"));
                    }
                };
                let Some(name) = field.file_name().map(ToOwned::to_owned) else {
                    continue;
                };
                let data = match field.bytes().await {
                    Ok(data) => data,
                    Err(err) => {
                        cancel.cancel();
                        return Err(anyhow::Error::from(err)
                            .context(format!("read part {name}")));
                    }
                };
                let index = name.parse::<usize>().unwrap_or(counter);
                if tx.send(IndexedInput { index, data }).await.is_err() {
                    break;
                }
                counter += 1;
            }
            Ok(())
        }
    };

    let (decoded, ingested) = tokio::join!(decode, ingest);
    decoded.map_err(ApiError::Internal)?;
    let report = ingested?;
    info!(root = %report.root_hex(), files = report.files, "upload committed");
    Ok(Json(UploadResponse { status: "Success" }))
}

/// `GET /file/{index}`: return the bytes and the sibling path.
async fn download<B, M>(
    State(service): State<Arc<FileService<B, M>>>,
    Path(index): Path<u64>,
) -> Result<Json<DownloadResponse>, ApiError>
where
    B: BlobStore + 'static,
    M: MetadataStore + 'static,
{
    let file = service.get(index).await?;
    Ok(Json(DownloadResponse::new(index, &file)))
}
