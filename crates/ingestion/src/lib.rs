//! Ragsync Ingestion Service
//!
//! Reconciles batches of pre-embedded text chunks into a Postgres +
//! pgvector store, atomically and idempotently:
//! 1. Validates the payload and the dynamically named target table
//! 2. Deletes rows for removed source files
//! 3. Replaces every touched source's rows with the new generation
//! 4. Commits as one transaction, or rolls back leaving no trace

pub mod batch;
pub mod payload;
pub mod reconciler;
pub mod table;

pub use payload::{ContentChunk, IngestionPayload};
pub use reconciler::{ReconcileCounts, ReconcileReport, Reconciler};
pub use table::ValidatedTable;
