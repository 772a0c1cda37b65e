// crates/maft-server/src/lib.rs

//! The file server: multipart batch uploads in, proof-carrying
//! downloads out.
//!
//! The interesting work happens in `maft-ingest` and `maft-merkle`;
//! this crate supplies the HTTP surface and the two boundary adapters
//! (content-addressed blobs over opendal, metadata rows over diesel),
//! wired together at startup by [`run`].

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

pub mod config;
pub mod http;
pub mod service;
pub mod store;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::Config;
pub use http::router;
pub use service::{FileService, ServiceError, StoredFile};
pub use store::{BlobStore, MetadataStore, OpendalBlobStore, PgMetadataStore};

/// Start the server: migrate the metadata store, bootstrap the blob
/// root, and serve until interrupted.
///
/// # Errors
/// Startup failures (database, blob root, bind) and fatal serve errors.
pub async fn run(config: Config) -> Result<()> {
    let meta = Arc::new(
        PgMetadataStore::connect(&config.database_url).context("metadata store startup")?,
    );
    meta.run_migrations().context("metadata store migration")?;

    let blob = Arc::new(
        OpendalBlobStore::new_fs(&config.blob_root)
            .await
            .context("blob store startup")?,
    );

    let service = Arc::new(FileService::new(blob, meta));
    let app = router(service)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("bind {}", config.http_addr))?;
    info!(addr = %config.http_addr, "server ready to handle requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
