//! Ingestion error types

use docforge_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    /// Document tree is malformed beyond recovery; the document is not published.
    #[error("Structural parse error in {document}: {message}")]
    StructuralParse { document: String, message: String },

    #[error("Failed to load {path}: {message}")]
    Load { path: String, message: String },

    #[error("No extractable content in {document}")]
    EmptyDocument { document: String },

    /// Two files slug to the same document id; the later one is not published.
    #[error("Document id {document_id} of {name} is already taken by {existing}")]
    DuplicateDocumentId {
        document_id: String,
        name: String,
        existing: String,
    },

    #[error("Unsupported document format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Chunk store error: {0}")]
    Store(#[from] AppError),

    #[error("Ingestion task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestionError {
    /// Short label used for rejection metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            IngestionError::StructuralParse { .. } => "structure",
            IngestionError::Load { .. } => "load",
            IngestionError::EmptyDocument { .. } => "empty",
            IngestionError::DuplicateDocumentId { .. } => "duplicate_id",
            IngestionError::UnsupportedFormat { .. } => "unsupported",
            IngestionError::FileNotFound(_) => "not_found",
            IngestionError::Store(_) => "store",
            IngestionError::Task(_) => "task",
            IngestionError::Io(_) => "io",
        }
    }
}

impl From<tokio::task::JoinError> for IngestionError {
    fn from(err: tokio::task::JoinError) -> Self {
        IngestionError::Task(err.to_string())
    }
}
