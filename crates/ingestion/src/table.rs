//! Target-table authorization
//!
//! Table names arrive inside the payload and cross the trust boundary, so
//! a name must pass two checks before any statement may reference it:
//! 1. Syntactic: fixed prefix plus alphanumeric/underscore characters only
//! 2. Existence: a parameterized probe of the schema catalog, so the
//!    engine only ever writes to tables provisioned out of band
//!
//! Identifiers are rendered double-quoted into SQL; data values always
//! bind as parameters.

use ragsync_common::errors::{AppError, Result};
use regex_lite::Regex;
use sqlx::PgPool;
use std::sync::OnceLock;
use tracing::{error, info};

/// Matches the naming scheme the indexer provisions tables under
const TABLE_NAME_PATTERN: &str = r"^codebase_collection_[a-zA-Z0-9_]+$";

fn table_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TABLE_NAME_PATTERN).expect("table name pattern must compile"))
}

/// A table name that has passed both authorization checks.
///
/// Only this type can render the identifier into SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTable(String);

impl ValidatedTable {
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Double-quoted identifier for dynamic statements. The pattern check
    /// already excludes quotes; the doubling is the standard quoting rule.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0.replace('"', "\"\""))
    }
}

/// Syntactic check alone; pure, no database access
pub fn check_syntax(table_name: &str) -> Result<()> {
    if table_name_regex().is_match(table_name) {
        Ok(())
    } else {
        error!(table_name, "Table name failed syntactic validation");
        Err(AppError::validation_field(
            format!("payload provides a syntactically invalid table name: {}", table_name),
            "table_name",
        ))
    }
}

/// Full two-phase validation against the live database
pub async fn validate(pool: &PgPool, table_name: &str) -> Result<ValidatedTable> {
    check_syntax(table_name)?;

    let exists: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM information_schema.tables \
         WHERE table_schema = 'public' AND table_name = $1",
    )
    .bind(table_name)
    .fetch_optional(pool)
    .await
    .map_err(AppError::transient)?;

    if exists.is_none() {
        error!(table_name, "Validation failed: table does not exist");
        return Err(AppError::validation_field(
            format!(
                "attempted to ingest data for non-existent table: {}; \
                 the provisioning pipeline must create it first",
                table_name
            ),
            "table_name",
        ));
    }

    info!(table_name, "Table validation successful");
    Ok(ValidatedTable(table_name.to_string()))
}
