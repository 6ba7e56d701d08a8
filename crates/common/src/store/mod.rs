//! In-process chunk store
//!
//! Provides:
//! - Copy-on-write snapshots shared with readers through `Arc`
//! - Whole-document replacement published in a single swap
//! - JSON persistence (write to temp file, then rename)
//!
//! Readers call [`ChunkStore::snapshot`] once per query and score against
//! that snapshot without holding any lock. A document's new chunk set is
//! fully built before the swap, so no reader observes a partial or mixed
//! set for one document.

use crate::errors::{AppError, Result};
use crate::models::{Chunk, DocumentRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Immutable view of the corpus at one point in time.
#[derive(Debug, Default)]
pub struct StoreSnapshot {
    documents: BTreeMap<String, DocumentRecord>,
    by_document: BTreeMap<String, Vec<Arc<Chunk>>>,
    /// All chunks ordered by document id, then chunk index
    corpus: Vec<Arc<Chunk>>,
}

impl StoreSnapshot {
    fn from_parts(
        documents: BTreeMap<String, DocumentRecord>,
        by_document: BTreeMap<String, Vec<Arc<Chunk>>>,
    ) -> Self {
        let corpus = by_document.values().flatten().cloned().collect();
        Self {
            documents,
            by_document,
            corpus,
        }
    }

    /// Every chunk in deterministic corpus order.
    pub fn chunks(&self) -> &[Arc<Chunk>] {
        &self.corpus
    }

    /// Chunks restricted to the given documents; all chunks when `None`.
    pub fn chunks_for(&self, document_ids: Option<&[String]>) -> Vec<Arc<Chunk>> {
        match document_ids {
            None => self.corpus.clone(),
            Some(ids) => {
                let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
                self.corpus
                    .iter()
                    .filter(|c| wanted.contains(c.document_id.as_str()))
                    .cloned()
                    .collect()
            }
        }
    }

    pub fn document_chunks(&self, document_id: &str) -> &[Arc<Chunk>] {
        self.by_document
            .get(document_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn document(&self, document_id: &str) -> Option<&DocumentRecord> {
        self.documents.get(document_id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.documents.values()
    }

    /// Fails with `DocumentNotFound` on the first id the snapshot does not hold.
    pub fn require_documents(&self, document_ids: &[String]) -> Result<()> {
        match document_ids.iter().find(|id| !self.documents.contains_key(id.as_str())) {
            Some(id) => Err(AppError::DocumentNotFound { id: id.clone() }),
            None => Ok(()),
        }
    }

    pub fn chunk(&self, chunk_id: &str) -> Option<&Arc<Chunk>> {
        self.corpus.iter().find(|c| c.id == chunk_id)
    }

    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedStore {
    documents: Vec<DocumentRecord>,
    chunks: Vec<Chunk>,
}

/// Chunk store keyed by document id.
#[derive(Debug, Default)]
pub struct ChunkStore {
    current: RwLock<Arc<StoreSnapshot>>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Result<Arc<StoreSnapshot>> {
        let guard = self.current.read().map_err(|_| AppError::StorePoisoned)?;
        Ok(Arc::clone(&guard))
    }

    /// Replace every chunk of `record.document_id` with `chunks`.
    pub fn replace_document(&self, record: DocumentRecord, chunks: Vec<Chunk>) -> Result<()> {
        validate_chunks(&record, &chunks)?;

        let document_id = record.document_id.clone();
        let chunk_count = chunks.len();
        let new_chunks: Vec<Arc<Chunk>> = chunks.into_iter().map(Arc::new).collect();

        let mut guard = self.current.write().map_err(|_| AppError::StorePoisoned)?;
        let mut documents = guard.documents.clone();
        let mut by_document = guard.by_document.clone();
        documents.insert(document_id.clone(), record);
        by_document.insert(document_id.clone(), new_chunks);
        *guard = Arc::new(StoreSnapshot::from_parts(documents, by_document));

        info!(document = %document_id, chunk_count, "Document published");
        Ok(())
    }

    /// Remove a document and its chunks. Returns whether it existed.
    pub fn remove_document(&self, document_id: &str) -> Result<bool> {
        let mut guard = self.current.write().map_err(|_| AppError::StorePoisoned)?;
        if !guard.documents.contains_key(document_id) {
            return Ok(false);
        }
        let mut documents = guard.documents.clone();
        let mut by_document = guard.by_document.clone();
        documents.remove(document_id);
        by_document.remove(document_id);
        *guard = Arc::new(StoreSnapshot::from_parts(documents, by_document));

        info!(document = %document_id, "Document removed");
        Ok(true)
    }

    /// Persist the current snapshot as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot()?;
        let persisted = PersistedStore {
            documents: snapshot.documents().cloned().collect(),
            chunks: snapshot.chunks().iter().map(|c| (**c).clone()).collect(),
        };
        let json = serde_json::to_vec_pretty(&persisted)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;

        debug!(path = %path.display(), chunks = snapshot.len(), "Chunk store saved");
        Ok(())
    }

    /// Load a store previously written by [`ChunkStore::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let persisted: PersistedStore = serde_json::from_slice(&bytes)?;

        let mut documents = BTreeMap::new();
        let mut by_document: BTreeMap<String, Vec<Arc<Chunk>>> = BTreeMap::new();
        for record in persisted.documents {
            by_document.entry(record.document_id.clone()).or_default();
            documents.insert(record.document_id.clone(), record);
        }
        for chunk in persisted.chunks {
            match by_document.get_mut(&chunk.document_id) {
                Some(list) => list.push(Arc::new(chunk)),
                None => {
                    return Err(AppError::Store {
                        message: format!(
                            "chunk {} references unknown document {}",
                            chunk.id, chunk.document_id
                        ),
                    })
                }
            }
        }
        for list in by_document.values_mut() {
            list.sort_by_key(|c| c.chunk_index);
        }

        let snapshot = StoreSnapshot::from_parts(documents, by_document);
        info!(path = %path.display(), chunks = snapshot.len(), "Chunk store loaded");
        Ok(Self {
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Load from `path` if it exists, otherwise start empty.
    pub fn open(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }
}

fn validate_chunks(record: &DocumentRecord, chunks: &[Chunk]) -> Result<()> {
    let mut seen = HashSet::with_capacity(chunks.len());
    for (position, chunk) in chunks.iter().enumerate() {
        if chunk.document_id != record.document_id {
            return Err(AppError::Validation {
                message: format!(
                    "chunk {} belongs to {}, not {}",
                    chunk.id, chunk.document_id, record.document_id
                ),
                field: Some("document_id".into()),
            });
        }
        if chunk.chunk_index != position {
            return Err(AppError::Validation {
                message: format!("chunk {} is out of sequence", chunk.id),
                field: Some("chunk_index".into()),
            });
        }
        if chunk.section_path.is_empty() {
            return Err(AppError::Validation {
                message: format!("chunk {} has an empty section path", chunk.id),
                field: Some("section_path".into()),
            });
        }
        if !seen.insert(chunk.id.as_str()) {
            return Err(AppError::Validation {
                message: format!("duplicate chunk id {}", chunk.id),
                field: Some("id".into()),
            });
        }
    }
    Ok(())
}
