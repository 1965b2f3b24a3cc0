//! Secret resolution for database credentials
//!
//! Fetches a base64-encoded credential bundle from a secret source,
//! decodes it, and validates its shape. Client construction for a real
//! vault lives outside this crate; the sources shipped here cover
//! file-mounted and environment-injected secret bundles.

use crate::config::SecretConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Database credentials decoded from a secret bundle.
///
/// Immutable once resolved; lives for one connection-build attempt.
#[derive(Clone, Deserialize)]
pub struct SecretMaterial {
    pub username: String,
    pub password: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub dbname: String,
}

fn default_port() -> u16 {
    5432
}

// Keep the password out of logs and error messages.
impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretMaterial")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .finish()
    }
}

impl SecretMaterial {
    fn validate(self) -> Result<Self> {
        for (field, value) in [
            ("username", &self.username),
            ("password", &self.password),
            ("host", &self.host),
            ("dbname", &self.dbname),
        ] {
            if value.is_empty() {
                return Err(AppError::configuration(format!(
                    "secret is missing required field '{}'",
                    field
                )));
            }
        }
        Ok(self)
    }
}

/// Source of raw (base64-encoded) secret bundle content
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Fetch the raw bundle content for an opaque secret identifier
    async fn fetch(&self, secret_id: &str) -> Result<String>;
}

/// Reads file-mounted secrets from a directory, one file per secret id
pub struct FileSecretSource {
    dir: PathBuf,
}

impl FileSecretSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SecretSource for FileSecretSource {
    async fn fetch(&self, secret_id: &str) -> Result<String> {
        let path = self.dir.join(secret_id);
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            AppError::configuration(format!(
                "failed to read secret file {}: {}",
                path.display(),
                e
            ))
        })
    }
}

/// Reads the secret bundle from an environment variable named by the id
pub struct EnvSecretSource;

#[async_trait]
impl SecretSource for EnvSecretSource {
    async fn fetch(&self, secret_id: &str) -> Result<String> {
        std::env::var(secret_id).map_err(|_| {
            AppError::configuration(format!(
                "secret environment variable '{}' is not set",
                secret_id
            ))
        })
    }
}

/// Resolves an opaque secret identifier into validated credential material
#[derive(Clone)]
pub struct SecretResolver {
    source: Arc<dyn SecretSource>,
}

impl SecretResolver {
    pub fn new(source: Arc<dyn SecretSource>) -> Self {
        Self { source }
    }

    /// Build the source named by configuration ("file" or "env")
    pub fn from_config(config: &SecretConfig) -> Result<Self> {
        let source: Arc<dyn SecretSource> = match config.source.as_str() {
            "file" => Arc::new(FileSecretSource::new(&config.dir)),
            "env" => Arc::new(EnvSecretSource),
            other => {
                return Err(AppError::configuration(format!(
                    "unknown secret source '{}'",
                    other
                )))
            }
        };
        Ok(Self::new(source))
    }

    /// Fetch, decode, and validate the credential bundle.
    ///
    /// Every failure here is a configuration error: malformed secrets will
    /// not self-heal, so callers must not retry.
    pub async fn resolve(&self, secret_id: &str) -> Result<SecretMaterial> {
        let raw = self.source.fetch(secret_id).await?;
        let material = decode_bundle(&raw)?;
        info!(
            host = %material.host,
            port = material.port,
            dbname = %material.dbname,
            "Database secret resolved"
        );
        Ok(material)
    }
}

/// Decode a base64 bundle into validated credential material.
///
/// Bundles frequently carry a trailing newline, so the content is trimmed
/// before decoding.
fn decode_bundle(raw: &str) -> Result<SecretMaterial> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(raw.trim())
        .map_err(|e| AppError::configuration(format!("secret content is not valid base64: {}", e)))?;

    let content = String::from_utf8(decoded)
        .map_err(|e| AppError::configuration(format!("secret content is not valid UTF-8: {}", e)))?;

    let material: SecretMaterial = serde_json::from_str(&content)
        .map_err(|e| AppError::configuration(format!("secret content is not valid JSON: {}", e)))?;

    material.validate()
}
