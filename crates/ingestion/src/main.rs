//! DocForge Ingestion
//!
//! Ingests every supported document in a directory and writes the chunk
//! store:
//! 1. Loads configuration and the existing store
//! 2. Parses, segments and publishes each document
//! 3. Saves the store
//!
//! Usage: `ingestion [DOCUMENTS_DIR]` (defaults to `ingestion.documents_dir`).

use docforge_common::{config::AppConfig, metrics, store::ChunkStore, telemetry, VERSION};
use docforge_ingestion::IngestionProcessor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    config.validate()?;

    telemetry::init_tracing(&config.observability);
    metrics::register_metrics();

    info!("Starting DocForge Ingestion v{}", VERSION);

    let documents_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.ingestion.documents_dir.clone());
    let store_path = config.store.resolved_path();

    let store = Arc::new(ChunkStore::open(&store_path)?);
    let processor = IngestionProcessor::new(Arc::clone(&store), &config);

    let report = processor.process_directory(&documents_dir).await.map_err(|e| {
        error!(dir = %documents_dir.display(), error = %e, "Failed to read document directory");
        e
    })?;

    for failed in &report.failed {
        warn!(path = %failed.path, reason = failed.reason, "Document excluded from store");
    }

    store.save(&store_path)?;
    info!(
        store = %store_path.display(),
        published = report.published.len(),
        unchanged = report.unchanged.len(),
        failed = report.failed.len(),
        chunks = report.total_chunks(),
        "Ingestion finished"
    );
    Ok(())
}
