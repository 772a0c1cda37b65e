// crates/maft-server/src/store/meta.rs

//! Relational metadata adapter: diesel + postgres behind a small pool.
//!
//! One ingestion batch is one transaction: rows are inserted 100 per
//! statement with `ON CONFLICT ("index") DO NOTHING`, committed when the
//! record stream closes, rolled back on any error or cancellation.
//! Diesel is blocking, so every call runs under `spawn_blocking`.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use maft_ingest::{FileMetadata, MetadataSink};
use tokio::sync::mpsc::Receiver;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::schema::file_metadata;
use super::MetadataStore;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Rows per insert statement.
const INSERT_BATCH: usize = 100;

#[derive(Queryable, Insertable)]
#[diesel(table_name = file_metadata)]
struct FileMetadataRow {
    index: i64,
    hash: Vec<u8>,
    merkle_proof: Vec<Vec<u8>>,
}

impl From<FileMetadata> for FileMetadataRow {
    fn from(md: FileMetadata) -> Self {
        Self {
            index: md.index as i64,
            hash: md.hash.to_vec(),
            merkle_proof: md.proof.iter().map(|h| h.to_vec()).collect(),
        }
    }
}

impl TryFrom<FileMetadataRow> for FileMetadata {
    type Error = anyhow::Error;

    fn try_from(row: FileMetadataRow) -> Result<Self> {
        let hash: maft_crypto::Hash = row
            .hash
            .as_slice()
            .try_into()
            .map_err(|_| anyhow!("stored hash for index {} is not 32 bytes", row.index))?;
        let proof = row
            .merkle_proof
            .iter()
            .enumerate()
            .map(|(i, h)| {
                h.as_slice().try_into().map_err(|_| {
                    anyhow!("stored proof element {i} for index {} is not 32 bytes", row.index)
                })
            })
            .collect::<Result<Vec<maft_crypto::Hash>>>()?;
        Ok(Self {
            index: u64::try_from(row.index)
                .map_err(|_| anyhow!("negative index {} in metadata store", row.index))?,
            hash,
            proof,
        })
    }
}

/// Metadata store over a postgres connection pool.
#[derive(Clone)]
pub struct PgMetadataStore {
    pool: Pool<ConnectionManager<PgConnection>>,
}

impl PgMetadataStore {
    /// Connect a small pool to `database_url`.
    ///
    /// # Errors
    /// Unreachable database or pool construction failure.
    pub fn connect(database_url: &str) -> Result<Self> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .context("connect metadata store")?;
        Ok(Self { pool })
    }

    /// Apply pending embedded migrations.
    ///
    /// # Errors
    /// Connection or migration failures.
    pub fn run_migrations(&self) -> Result<()> {
        let mut conn = self.pool.get().context("checkout for migration")?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow!("run migrations: {e}"))?;
        info!(applied = applied.len(), "metadata store migrated");
        Ok(())
    }
}

fn insert_rows(conn: &mut PgConnection, rows: &[FileMetadataRow]) -> Result<()> {
    diesel::insert_into(file_metadata::table)
        .values(rows)
        .on_conflict(file_metadata::index)
        .do_nothing()
        .execute(conn)
        .context("insert metadata batch")?;
    Ok(())
}

#[async_trait]
impl MetadataSink for PgMetadataStore {
    async fn put_batch(
        &self,
        mut records: Receiver<FileMetadata>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let pool = self.pool.clone();
        task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool.get().context("checkout for batch insert")?;
            conn.transaction(|conn| {
                let mut batch: Vec<FileMetadataRow> = Vec::with_capacity(INSERT_BATCH);
                let mut total = 0usize;
                while let Some(row) = records.blocking_recv() {
                    if cancel.is_cancelled() {
                        break;
                    }
                    batch.push(row.into());
                    total += 1;
                    if batch.len() == INSERT_BATCH {
                        insert_rows(conn, &batch)?;
                        batch.clear();
                    }
                }
                // A cancelled batch must leave no rows behind: erroring
                // out of the closure rolls back everything inserted so
                // far. Commit only when the stream closed cleanly.
                if cancel.is_cancelled() {
                    bail!("metadata batch cancelled after {total} rows, rolling back");
                }
                if !batch.is_empty() {
                    insert_rows(conn, &batch)?;
                }
                debug!(rows = total, "metadata batch committed");
                Ok(())
            })
        })
        .await
        .context("metadata sink task")?
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn get(&self, index: u64) -> Result<Option<FileMetadata>> {
        let pool = self.pool.clone();
        let key = i64::try_from(index).map_err(|_| anyhow!("index {index} out of range"))?;
        task::spawn_blocking(move || -> Result<Option<FileMetadata>> {
            let mut conn = pool.get().context("checkout for lookup")?;
            let row: Option<FileMetadataRow> = file_metadata::table
                .find(key)
                .first(&mut conn)
                .optional()
                .with_context(|| format!("select metadata for index {key}"))?;
            row.map(FileMetadata::try_from).transpose()
        })
        .await
        .context("metadata lookup task")?
    }
}
