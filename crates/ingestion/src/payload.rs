//! Ingestion payload model
//!
//! The parsed JSON object handed over by the upstream indexing process.
//! Owned exclusively by one reconciliation call; never persisted.

use ragsync_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use uuid::Uuid;

/// One pre-embedded text chunk produced by the indexer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentChunk {
    pub id: Uuid,

    /// Chunk text; chunks without one are skipped at insert time but still
    /// count toward the set of sources being replaced
    #[serde(default)]
    pub document: Option<String>,

    /// Must contain at least "source": the originating file path
    pub metadata: Map<String, Value>,

    /// Fixed-length embedding vector
    pub embedding: Vec<f32>,
}

impl ContentChunk {
    /// The source file this chunk belongs to
    pub fn source(&self) -> Result<&str> {
        self.metadata
            .get("source")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AppError::validation_field(
                    format!("chunk {} has no 'source' in its metadata", self.id),
                    "metadata.source",
                )
            })
    }

    /// Whether this chunk carries text worth inserting
    pub fn has_document(&self) -> bool {
        matches!(&self.document, Some(d) if !d.is_empty())
    }
}

/// A full reconciliation request for one target table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionPayload {
    pub table_name: String,

    #[serde(default)]
    pub chunks_to_upsert: Vec<ContentChunk>,

    #[serde(default)]
    pub files_to_delete: Vec<String>,
}

impl IngestionPayload {
    /// True when there is nothing to delete and nothing to upsert
    pub fn is_empty(&self) -> bool {
        self.chunks_to_upsert.is_empty() && self.files_to_delete.is_empty()
    }

    /// Distinct source files across all chunks, document-less ones
    /// included, in deterministic order
    pub fn distinct_sources(&self) -> Result<Vec<String>> {
        let mut sources = BTreeSet::new();
        for chunk in &self.chunks_to_upsert {
            sources.insert(chunk.source()?.to_string());
        }
        Ok(sources.into_iter().collect())
    }

    /// Shape checks that must pass before any statement executes
    pub fn validate(&self, vector_dimension: usize) -> Result<()> {
        if self.table_name.is_empty() {
            return Err(AppError::validation_field(
                "payload is missing required 'table_name' field",
                "table_name",
            ));
        }

        for chunk in &self.chunks_to_upsert {
            chunk.source()?;
            if chunk.embedding.len() != vector_dimension {
                return Err(AppError::validation_field(
                    format!(
                        "chunk {} embedding has dimension {}, expected {}",
                        chunk.id,
                        chunk.embedding.len(),
                        vector_dimension
                    ),
                    "embedding",
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragsync_common::errors::ErrorKind;

    fn chunk(id: &str, source: &str, document: Option<&str>, dim: usize) -> ContentChunk {
        let mut metadata = Map::new();
        metadata.insert("source".to_string(), Value::String(source.to_string()));
        ContentChunk {
            id: Uuid::parse_str(id).unwrap(),
            document: document.map(|d| d.to_string()),
            metadata,
            embedding: vec![0.1; dim],
        }
    }

    const ID_1: &str = "00000000-0000-0000-0000-000000000001";
    const ID_2: &str = "00000000-0000-0000-0000-000000000002";
    const ID_3: &str = "00000000-0000-0000-0000-000000000003";

    #[test]
    fn test_parse_full_payload() {
        let payload: IngestionPayload = serde_json::from_str(
            r#"{
                "table_name": "codebase_collection_x",
                "files_to_delete": ["a.py"],
                "chunks_to_upsert": [{
                    "id": "00000000-0000-0000-0000-000000000001",
                    "document": "hello",
                    "metadata": {"source": "b.py", "line": 3},
                    "embedding": [0.1, 0.2]
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(payload.table_name, "codebase_collection_x");
        assert_eq!(payload.files_to_delete, vec!["a.py"]);
        assert_eq!(payload.chunks_to_upsert.len(), 1);
        assert_eq!(payload.chunks_to_upsert[0].source().unwrap(), "b.py");
        assert!(payload.validate(2).is_ok());
    }

    #[test]
    fn test_lists_default_to_empty() {
        let payload: IngestionPayload =
            serde_json::from_str(r#"{"table_name": "codebase_collection_x"}"#).unwrap();
        assert!(payload.is_empty());
        assert!(payload.validate(1536).is_ok());
    }

    #[test]
    fn test_distinct_sources_includes_documentless_chunks() {
        let payload = IngestionPayload {
            table_name: "codebase_collection_x".to_string(),
            chunks_to_upsert: vec![
                chunk(ID_1, "b.py", Some("hello"), 2),
                chunk(ID_2, "b.py", Some("world"), 2),
                chunk(ID_3, "stale.py", None, 2),
            ],
            files_to_delete: vec![],
        };

        // stale.py still contributes even though nothing will be inserted
        // for it, so its old rows get cleared
        assert_eq!(payload.distinct_sources().unwrap(), vec!["b.py", "stale.py"]);
    }

    #[test]
    fn test_missing_source_is_validation_error() {
        let mut bad = chunk(ID_1, "b.py", Some("hello"), 2);
        bad.metadata.remove("source");
        let payload = IngestionPayload {
            table_name: "codebase_collection_x".to_string(),
            chunks_to_upsert: vec![bad],
            files_to_delete: vec![],
        };

        let err = payload.validate(2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_wrong_dimension_is_validation_error() {
        let payload = IngestionPayload {
            table_name: "codebase_collection_x".to_string(),
            chunks_to_upsert: vec![chunk(ID_1, "b.py", Some("hello"), 3)],
            files_to_delete: vec![],
        };

        let err = payload.validate(1536).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("dimension 3"));
    }

    #[test]
    fn test_missing_table_name_is_validation_error() {
        let payload = IngestionPayload {
            table_name: String::new(),
            chunks_to_upsert: vec![],
            files_to_delete: vec![],
        };
        let err = payload.validate(1536).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_empty_document_counts_as_documentless() {
        let c = chunk(ID_1, "b.py", Some(""), 2);
        assert!(!c.has_document());
        let c = chunk(ID_1, "b.py", Some("text"), 2);
        assert!(c.has_document());
        let c = chunk(ID_1, "b.py", None, 2);
        assert!(!c.has_document());
    }
}
