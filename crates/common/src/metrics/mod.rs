//! Metrics and observability utilities
//!
//! Metrics are recorded through the `metrics` facade with standardized
//! naming. Nothing is exported until the embedding application installs a
//! recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all DocForge metrics
pub const METRICS_PREFIX: &str = "docforge";

/// Register all metric descriptions
pub fn register_metrics() {
    // Ingestion metrics
    describe_counter!(
        format!("{}_documents_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total documents published to the chunk store"
    );

    describe_counter!(
        format!("{}_documents_rejected_total", METRICS_PREFIX),
        Unit::Count,
        "Total documents excluded after a load or parse failure"
    );

    describe_counter!(
        format!("{}_chunks_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total chunks created"
    );

    describe_histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Per-document ingestion latency in seconds"
    );

    // Query metrics
    describe_counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total queries answered, labelled by outcome"
    );

    describe_histogram!(
        format!("{}_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Retrieval latency in seconds"
    );

    describe_counter!(
        format!("{}_retrieval_expansions_total", METRICS_PREFIX),
        Unit::Count,
        "Candidate window expansions performed"
    );

    describe_counter!(
        format!("{}_extractions_total", METRICS_PREFIX),
        Unit::Count,
        "Deterministic extraction attempts, labelled by kind and outcome"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record ingestion metrics
pub fn record_ingestion(duration_secs: f64, chunks_created: usize, format: &str) {
    counter!(
        format!("{}_documents_ingested_total", METRICS_PREFIX),
        "format" => format.to_string()
    )
    .increment(1);

    counter!(
        format!("{}_chunks_created_total", METRICS_PREFIX),
        "format" => format.to_string()
    )
    .increment(chunks_created as u64);

    histogram!(format!("{}_ingestion_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

pub fn record_rejection(reason: &str) {
    counter!(
        format!("{}_documents_rejected_total", METRICS_PREFIX),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Helper to record query metrics
pub fn record_query(duration_secs: f64, expansions: u32, found: bool) {
    let outcome = if found { "found" } else { "not_found" };

    counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);

    histogram!(format!("{}_query_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    if expansions > 0 {
        counter!(format!("{}_retrieval_expansions_total", METRICS_PREFIX))
            .increment(u64::from(expansions));
    }
}

pub fn record_extraction(kind: &str, extracted: bool) {
    let outcome = if extracted { "extracted" } else { "missed" };
    counter!(
        format!("{}_extractions_total", METRICS_PREFIX),
        "kind" => kind.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
