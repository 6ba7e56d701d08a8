//! DocForge Context Engine
//!
//! Answers one question against the chunk store written by `ingestion` and
//! prints the response as JSON.
//!
//! Usage: `context [--document ID]... QUESTION`

use anyhow::{bail, Context as _};
use docforge_common::{config::AppConfig, metrics, store::ChunkStore, telemetry, VERSION};
use docforge_context::QueryEngine;
use docforge_search::SearchRequest;
use std::sync::Arc;
use tracing::info;

fn parse_args(args: impl Iterator<Item = String>) -> anyhow::Result<SearchRequest> {
    let mut documents = Vec::new();
    let mut words = Vec::new();
    let mut args = args;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--document" | "-d" => documents.push(args.next().context("--document needs a value")?),
            _ => words.push(arg),
        }
    }
    if words.is_empty() {
        bail!("usage: context [--document ID]... QUESTION");
    }

    let request = SearchRequest::new(words.join(" "));
    Ok(if documents.is_empty() {
        request
    } else {
        request.with_documents(documents)
    })
}

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

    info!("Starting DocForge Context Engine v{}", VERSION);

    let request = parse_args(std::env::args().skip(1))?;
    let store_path = config.store.resolved_path();
    let store = Arc::new(ChunkStore::open(&store_path)?);
    let engine = QueryEngine::from_config(store, &config);

    let response = engine.answer(request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
