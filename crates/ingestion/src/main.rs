//! Ragsync Ingestion Service entry point
//!
//! Reads a parsed ingestion payload from a file path argument (or stdin),
//! reconciles it against the target table, and prints the structured
//! result. Transport, decompression, and event parsing live upstream.

use ragsync_common::config::Settings;
use ragsync_common::db::{ConnectionManager, ConnectionProvider};
use ragsync_common::errors::{AppError, FailureReport};
use ragsync_common::retry::RetryPolicy;
use ragsync_common::secrets::SecretResolver;
use ragsync_ingestion::{IngestionPayload, Reconciler};
use std::io::Read;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .json()
        .init();

    info!("Starting Ragsync Ingestion Service v{}", ragsync_common::VERSION);

    // Load configuration
    let settings = Settings::load().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    let invocation_id = Uuid::new_v4();
    let span = info_span!("invocation", invocation_id = %invocation_id);

    let exit_code = run(settings).instrument(span).await;
    std::process::exit(exit_code)
}

async fn run(settings: Settings) -> i32 {
    let payload = match read_payload() {
        Ok(payload) => payload,
        Err(err) => return fail(&err),
    };

    let resolver = match SecretResolver::from_config(&settings.secret) {
        Ok(resolver) => resolver,
        Err(err) => return fail(&err),
    };

    let manager = Arc::new(ConnectionManager::new(
        resolver,
        settings.secret.id.clone(),
        settings.database.clone(),
        RetryPolicy::from(&settings.retry),
    ));

    let provider: Arc<dyn ConnectionProvider> = manager.clone();
    let reconciler = Reconciler::new(provider, settings.ingestion.clone());

    let code = match reconciler.reconcile(payload).await {
        Ok(report) => {
            info!(table = %report.table, "Invocation completed successfully");
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => error!(error = %e, "Failed to render report"),
            }
            0
        }
        Err(err) => fail(&err),
    };

    manager.dispose().await;
    code
}

/// Parse the payload from the first argument (a file path) or stdin
fn read_payload() -> Result<IngestionPayload, AppError> {
    let contents = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path).map_err(|e| {
            AppError::validation(format!("failed to read payload file {}: {}", path, e))
        })?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| AppError::validation(format!("failed to read payload from stdin: {}", e)))?;
            buffer
        }
    };

    if contents.trim().is_empty() {
        return Err(AppError::validation("received empty payload"));
    }

    serde_json::from_str(&contents)
        .map_err(|e| AppError::validation(format!("payload is not valid JSON: {}", e)))
}

/// Log the failure and emit the structured error report
fn fail(err: &AppError) -> i32 {
    error!(kind = err.kind().as_str(), error = %err, "Invocation failed");
    if let Ok(json) = serde_json::to_string_pretty(&FailureReport::from(err)) {
        eprintln!("{}", json);
    }
    1
}
