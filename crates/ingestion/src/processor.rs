//! Ingestion processor
//!
//! Runs load → parse → segment for each document and publishes the finished
//! chunk set to the store in one swap. Documents are independent: each run
//! owns its element and chunk lists, so several documents are processed in
//! parallel and a failure only excludes that one document.

use crate::errors::IngestionError;
use crate::loader::{document_id_for, is_supported, load_document};
use crate::parser::StructuralParser;
use crate::segmenter::{DocumentRef, Segmenter};
use crate::source::SourceDocument;
use chrono::Utc;
use docforge_common::config::{AppConfig, IngestionConfig};
use docforge_common::metrics::{record_ingestion, record_rejection};
use docforge_common::models::{Chunk, DocumentRecord};
use docforge_common::store::ChunkStore;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tracing::{debug, error, info, instrument, warn};

/// Summary of one published document.
#[derive(Debug, Clone, Serialize)]
pub struct IngestedDocument {
    pub document_id: String,
    pub name: String,
    pub chunk_count: usize,
    pub table_chunks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub enum IngestOutcome {
    Published(IngestedDocument),
    /// Stored content hash matched; nothing was rebuilt
    Unchanged { document_id: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedDocument {
    pub path: String,
    pub reason: &'static str,
    pub message: String,
}

/// Result of a batch run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct IngestionReport {
    pub published: Vec<IngestedDocument>,
    pub unchanged: Vec<String>,
    pub unsupported: Vec<String>,
    pub failed: Vec<FailedDocument>,
}

impl IngestionReport {
    pub fn total_chunks(&self) -> usize {
        self.published.iter().map(|d| d.chunk_count).sum()
    }
}

struct Pipeline {
    parser: StructuralParser,
    segmenter: Segmenter,
}

/// Ingestion processor
#[derive(Clone)]
pub struct IngestionProcessor {
    store: Arc<ChunkStore>,
    pipeline: Arc<Pipeline>,
    config: IngestionConfig,
}

impl IngestionProcessor {
    pub fn new(store: Arc<ChunkStore>, config: &AppConfig) -> Self {
        Self {
            store,
            pipeline: Arc::new(Pipeline {
                parser: StructuralParser::new(config.segmenter.caption_lookback),
                segmenter: Segmenter::new(&config.segmenter),
            }),
            config: config.ingestion.clone(),
        }
    }

    pub fn store(&self) -> &Arc<ChunkStore> {
        &self.store
    }

    /// Parse and segment without touching the store.
    pub fn build_chunks(&self, source: &SourceDocument) -> Result<Vec<Chunk>, IngestionError> {
        let elements = self.pipeline.parser.parse(source)?;
        if elements.is_empty() {
            return Err(IngestionError::EmptyDocument {
                document: source.name.clone(),
            });
        }
        let document = DocumentRef {
            document_id: &source.document_id,
            name: &source.name,
        };
        Ok(self.pipeline.segmenter.segment(document, &elements))
    }

    /// Build and publish one already loaded document.
    ///
    /// A stored document with the same id but a different name is never
    /// overwritten; the new one fails with `DuplicateDocumentId`.
    #[instrument(skip(self, source), fields(document = %source.name))]
    pub fn ingest_source(&self, source: SourceDocument) -> Result<IngestOutcome, IngestionError> {
        let started = Instant::now();

        let snapshot = self.store.snapshot()?;
        if let Some(existing) = snapshot.document(&source.document_id) {
            if existing.name != source.name {
                return Err(IngestionError::DuplicateDocumentId {
                    document_id: source.document_id,
                    name: source.name,
                    existing: existing.name.clone(),
                });
            }
            if self.config.skip_unchanged && existing.content_hash == source.content_hash {
                debug!(document_id = %source.document_id, "Content hash unchanged, skipping");
                return Ok(IngestOutcome::Unchanged {
                    document_id: source.document_id,
                });
            }
        }

        let chunks = self.build_chunks(&source)?;
        let summary = IngestedDocument {
            document_id: source.document_id.clone(),
            name: source.name.clone(),
            chunk_count: chunks.len(),
            table_chunks: chunks.iter().filter(|c| c.is_table_chunk).count(),
        };

        let record = DocumentRecord {
            document_id: source.document_id,
            name: source.name,
            format: source.format,
            content_hash: source.content_hash,
            chunk_count: chunks.len(),
            pdf_kind: source.pdf_kind,
            ingested_at: Utc::now(),
        };
        let format = format!("{:?}", record.format).to_lowercase();
        self.store.replace_document(record, chunks)?;

        record_ingestion(started.elapsed().as_secs_f64(), summary.chunk_count, &format);
        info!(
            chunk_count = summary.chunk_count,
            table_chunks = summary.table_chunks,
            "Document ingested"
        );
        Ok(IngestOutcome::Published(summary))
    }

    /// Load a file and ingest it on the blocking pool.
    pub async fn ingest_path(&self, path: PathBuf) -> Result<IngestOutcome, IngestionError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || {
            let source = load_document(&path)?;
            this.ingest_source(source)
        })
        .await?
    }

    /// Ingest files concurrently, at most `max_parallel_documents` at a time.
    /// Per-file failures are collected, never propagated.
    ///
    /// Paths are taken in sorted order; a path whose document id an earlier
    /// path in the batch already claimed is rejected, not ingested.
    pub async fn ingest_paths(&self, mut paths: Vec<PathBuf>) -> IngestionReport {
        paths.sort();
        let limit = Arc::new(Semaphore::new(self.config.max_parallel_documents.max(1)));
        let mut tasks = JoinSet::new();
        let mut pending = HashMap::new();
        let mut claimed: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut results = Vec::new();

        for path in paths {
            let document_id = document_id_for(&path);
            if let Some(first) = claimed.get(&document_id) {
                let err = IngestionError::DuplicateDocumentId {
                    document_id,
                    name: file_name(&path),
                    existing: file_name(first),
                };
                results.push((path, Err(err)));
                continue;
            }
            claimed.insert(document_id, path.clone());

            let this = self.clone();
            let limit = Arc::clone(&limit);
            let task_path = path.clone();
            let handle = tasks.spawn(async move {
                let _permit = limit.acquire_owned().await;
                this.ingest_path(task_path).await
            });
            pending.insert(handle.id(), path);
        }

        results.extend(join_tasks(tasks, pending).await);
        results.sort_by(|a, b| a.0.cmp(&b.0));

        let mut report = IngestionReport::default();
        for (path, result) in results {
            match result {
                Ok(IngestOutcome::Published(doc)) => report.published.push(doc),
                Ok(IngestOutcome::Unchanged { document_id }) => report.unchanged.push(document_id),
                Err(e) => {
                    record_rejection(e.reason());
                    error!(path = %path.display(), error = %e, "Failed to ingest document");
                    report.failed.push(FailedDocument {
                        path: path.display().to_string(),
                        reason: e.reason(),
                        message: e.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Ingest every supported file directly inside `dir`.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn process_directory(&self, dir: &Path) -> Result<IngestionReport, IngestionError> {
        info!("Processing document directory");

        let mut supported = Vec::new();
        let mut unsupported = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if is_supported(&path) {
                supported.push(path);
            } else {
                warn!(path = %path.display(), "Unsupported file, skipping");
                unsupported.push(path.display().to_string());
            }
        }
        supported.sort();
        unsupported.sort();

        let mut report = self.ingest_paths(supported).await;
        report.unsupported = unsupported;

        info!(
            published = report.published.len(),
            unchanged = report.unchanged.len(),
            failed = report.failed.len(),
            chunks = report.total_chunks(),
            "Directory processing complete"
        );
        Ok(report)
    }
}

type TaskResult = Result<IngestOutcome, IngestionError>;

/// Drain `tasks`, pairing each result with its path. A task that panicked
/// is reported as a `Task` failure for its path.
async fn join_tasks(
    mut tasks: JoinSet<TaskResult>,
    mut pending: HashMap<Id, PathBuf>,
) -> Vec<(PathBuf, TaskResult)> {
    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, result) = match joined {
            Ok((id, result)) => (id, result),
            Err(e) => {
                error!(error = %e, "Ingestion task panicked");
                (e.id(), Err(IngestionError::from(e)))
            }
        };
        if let Some(path) = pending.remove(&id) {
            results.push((path, result));
        }
    }
    results
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
