//! Database connection management
//!
//! Provides:
//! - Pooled connection construction from resolved secret material
//! - A process-wide cached pool with liveness probing
//! - Bounded retry with exponential backoff for transient build failures

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use crate::retry::RetryPolicy;
use crate::secrets::SecretResolver;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Supplies live connection pools to the reconciliation engine.
///
/// Kept as a trait seam so tests can substitute a fixed pool for the
/// secret-backed manager.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Obtain a pool proven live within this call
    async fn acquire(&self) -> Result<PgPool>;
}

/// Owns the process-wide cached pool and rebuilds it when it goes stale.
///
/// Shared across concurrent invocations behind an `Arc`; the internal mutex
/// serializes probe/rebuild so only one invocation pays for a rebuild.
pub struct ConnectionManager {
    resolver: SecretResolver,
    secret_id: String,
    config: DatabaseConfig,
    retry: RetryPolicy,
    cached: Mutex<Option<PgPool>>,
}

impl ConnectionManager {
    pub fn new(
        resolver: SecretResolver,
        secret_id: impl Into<String>,
        config: DatabaseConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            resolver,
            secret_id: secret_id.into(),
            config,
            retry,
            cached: Mutex::new(None),
        }
    }

    /// Close and drop the cached pool (process shutdown)
    pub async fn dispose(&self) {
        if let Some(pool) = self.cached.lock().await.take() {
            pool.close().await;
            info!("Database pool closed");
        }
    }

    /// Build one pool attempt: resolve credentials, connect, validate.
    ///
    /// Secret failures surface as configuration errors and stop the retry
    /// loop immediately; everything else is transient.
    async fn build_pool(&self) -> Result<PgPool> {
        let creds = self.resolver.resolve(&self.secret_id).await?;

        let options = PgConnectOptions::new()
            .host(&creds.host)
            .port(creds.port)
            .username(&creds.username)
            .password(&creds.password)
            .database(&creds.dbname)
            .application_name(&self.config.application_name);

        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections())
            .acquire_timeout(self.config.connect_timeout())
            .max_lifetime(self.config.recycle())
            .test_before_acquire(true)
            .connect_with(options)
            .await
            .map_err(AppError::transient)?;

        // Diagnostic query doubles as validation of the fresh pool
        let db_version: String = sqlx::query_scalar("SELECT version()")
            .fetch_one(&pool)
            .await
            .map_err(AppError::transient)?;

        info!(db_version = %db_version, "Database pool initialized and validated");
        Ok(pool)
    }
}

#[async_trait]
impl ConnectionProvider for ConnectionManager {
    /// Return the cached pool if it passes a liveness probe, otherwise
    /// rebuild under the retry policy. Never returns a pool that was not
    /// just proven live in this call.
    async fn acquire(&self) -> Result<PgPool> {
        let mut cached = self.cached.lock().await;

        if let Some(pool) = cached.as_ref() {
            match sqlx::query("SELECT 1").execute(pool).await {
                Ok(_) => {
                    debug!("Reusing existing, healthy database pool");
                    return Ok(pool.clone());
                }
                Err(e) => {
                    warn!(error = %e, "Stale database pool detected, rebuilding");
                    *cached = None;
                }
            }
        }

        let pool = self
            .retry
            .run("database pool build", || self.build_pool())
            .await?;

        *cached = Some(pool.clone());
        Ok(pool)
    }
}

/// Wraps an already-built pool; used by tests and local harnesses that
/// connect directly instead of going through a secret store.
pub struct FixedPool(pub PgPool);

#[async_trait]
impl ConnectionProvider for FixedPool {
    async fn acquire(&self) -> Result<PgPool> {
        Ok(self.0.clone())
    }
}
