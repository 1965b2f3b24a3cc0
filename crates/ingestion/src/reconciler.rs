//! Transactional reconciliation engine
//!
//! Applies one `IngestionPayload` to its target table inside a single
//! transaction: explicit file deletions first, then delete-before-insert
//! replacement of every source touched by the upserted chunks. Replaying
//! the same payload never duplicates rows, and a failed run leaves no
//! visible trace.

use crate::batch::{self, TargetRow};
use crate::payload::IngestionPayload;
use crate::table::{self, ValidatedTable};
use pgvector::Vector;
use ragsync_common::config::IngestionConfig;
use ragsync_common::db::ConnectionProvider;
use ragsync_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tracing::{info, instrument};

/// Row counts observed while applying a payload
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReconcileCounts {
    /// Rows removed for explicitly deleted files
    pub files_deleted: u64,
    /// Old-generation rows removed for sources being upserted
    pub sources_replaced: u64,
    /// New rows inserted
    pub chunks_inserted: u64,
    /// Chunks skipped for lacking a document
    pub chunks_skipped: u64,
}

/// Success result of one reconciliation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub status: String,
    pub message: String,
    pub table: String,
    pub counts: ReconcileCounts,
}

impl ReconcileReport {
    fn success(table: &ValidatedTable, counts: ReconcileCounts) -> Self {
        Self {
            status: "success".to_string(),
            message: format!("Processed table '{}' successfully", table.name()),
            table: table.name().to_string(),
            counts,
        }
    }
}

/// The reconciliation engine.
///
/// Holds the connection provider and ingestion limits; one instance serves
/// arbitrarily many payloads, concurrently if the caller wishes.
pub struct Reconciler {
    connections: Arc<dyn ConnectionProvider>,
    config: IngestionConfig,
}

impl Reconciler {
    pub fn new(connections: Arc<dyn ConnectionProvider>, config: IngestionConfig) -> Self {
        Self {
            connections,
            config,
        }
    }

    /// Apply one payload atomically.
    ///
    /// Validation happens before any transaction opens; once open, the
    /// transaction rolls back on every exit path except the final commit
    /// (dropping an uncommitted `sqlx` transaction rolls it back).
    #[instrument(skip(self, payload), fields(table = %payload.table_name))]
    pub async fn reconcile(&self, payload: IngestionPayload) -> Result<ReconcileReport> {
        payload.validate(self.config.vector_dimension)?;

        let pool = self.connections.acquire().await?;
        let table = table::validate(&pool, &payload.table_name).await?;

        if payload.is_empty() {
            info!(table = table.name(), "Payload is empty, nothing to reconcile");
            return Ok(ReconcileReport::success(&table, ReconcileCounts::default()));
        }

        info!(
            table = table.name(),
            chunks_to_upsert = payload.chunks_to_upsert.len(),
            files_to_delete = payload.files_to_delete.len(),
            "Beginning database transaction"
        );

        let mut counts = ReconcileCounts::default();
        let mut tx = pool.begin().await.map_err(AppError::transaction)?;

        if !payload.files_to_delete.is_empty() {
            counts.files_deleted =
                delete_sources(&mut tx, &table, &payload.files_to_delete).await?;
            info!(
                files = payload.files_to_delete.len(),
                rows = counts.files_deleted,
                "Deleted rows for removed source files"
            );
        }

        if !payload.chunks_to_upsert.is_empty() {
            let sources = payload.distinct_sources()?;
            counts.sources_replaced = delete_sources(&mut tx, &table, &sources).await?;
            info!(
                sources = sources.len(),
                rows = counts.sources_replaced,
                "Cleared previous generation for upserted sources"
            );

            let total = payload.chunks_to_upsert.len();
            let rows: Vec<TargetRow> = payload
                .chunks_to_upsert
                .into_iter()
                .filter(|chunk| chunk.has_document())
                .map(|chunk| TargetRow {
                    id: chunk.id,
                    content: chunk.document.unwrap_or_default(),
                    metadata: chunk.metadata,
                    embedding: Vector::from(chunk.embedding),
                })
                .collect();
            counts.chunks_skipped = (total - rows.len()) as u64;

            if !rows.is_empty() {
                counts.chunks_inserted =
                    batch::insert_rows(&mut tx, &table, &rows, self.config.insert_batch_size)
                        .await?;
                info!(
                    rows = counts.chunks_inserted,
                    batches = batch::batch_count(rows.len(), self.config.insert_batch_size),
                    "Inserted new chunks"
                );
            }
        }

        tx.commit().await.map_err(AppError::transaction)?;
        info!(table = table.name(), "Transaction committed successfully");

        Ok(ReconcileReport::success(&table, counts))
    }
}

/// Delete every row whose metadata source matches one of `sources`
async fn delete_sources(
    tx: &mut Transaction<'_, Postgres>,
    table: &ValidatedTable,
    sources: &[String],
) -> Result<u64> {
    let sql = format!(
        "DELETE FROM {} WHERE metadata->>'source' = ANY($1)",
        table.quoted()
    );

    let result = sqlx::query(&sql)
        .bind(sources)
        .execute(&mut **tx)
        .await
        .map_err(AppError::transaction)?;

    Ok(result.rows_affected())
}
