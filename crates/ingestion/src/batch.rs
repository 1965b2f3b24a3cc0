//! Batched multi-row inserts
//!
//! Splits validated rows into fixed-size batches, each executed as one
//! multi-row INSERT inside the caller's transaction. A batch failure
//! aborts the whole transaction.

use crate::table::ValidatedTable;
use pgvector::Vector;
use ragsync_common::errors::{AppError, Result};
use serde_json::{Map, Value};
use sqlx::{Postgres, QueryBuilder, Transaction};
use tracing::debug;
use uuid::Uuid;

/// Rows per INSERT statement
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// A chunk ready for persistence
#[derive(Debug, Clone)]
pub struct TargetRow {
    pub id: Uuid,
    pub content: String,
    pub metadata: Map<String, Value>,
    pub embedding: Vector,
}

/// Number of INSERT statements needed for `n` rows
pub fn batch_count(n: usize, batch_size: usize) -> usize {
    n.div_ceil(batch_size.max(1))
}

/// Insert all rows in batches of `batch_size`, returning the number of
/// rows the database reports as inserted
pub async fn insert_rows(
    tx: &mut Transaction<'_, Postgres>,
    table: &ValidatedTable,
    rows: &[TargetRow],
    batch_size: usize,
) -> Result<u64> {
    let batch_size = batch_size.max(1);
    let mut inserted = 0u64;

    for (index, batch) in rows.chunks(batch_size).enumerate() {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {} (id, content, metadata, embedding) ",
            table.quoted()
        ));

        builder.push_values(batch, |mut b, row| {
            b.push_bind(row.id)
                .push_bind(&row.content)
                .push_bind(sqlx::types::Json(&row.metadata))
                .push_bind(&row.embedding);
        });

        let result = builder
            .build()
            .execute(&mut **tx)
            .await
            .map_err(AppError::transaction)?;

        inserted += result.rows_affected();
        debug!(
            batch = index + 1,
            rows = batch.len(),
            table = table.name(),
            "Inserted batch"
        );
    }

    Ok(inserted)
}
