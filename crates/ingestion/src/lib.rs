//! DocForge Ingestion
//!
//! Turns source documents into published chunks:
//! - `loader`: HTML, PDF, spreadsheet and JSON tree loaders
//! - `parser`: structural parsing with an explicit heading stack
//! - `tables`: whole-table extraction with caption and tag detection
//! - `segmenter`: section-aware chunking
//! - `processor`: per-document pipeline with atomic publish

pub mod errors;
pub mod loader;
pub mod parser;
pub mod processor;
pub mod segmenter;
pub mod source;
pub mod tables;

pub use errors::IngestionError;
pub use parser::StructuralParser;
pub use processor::{IngestOutcome, IngestionProcessor, IngestionReport};
pub use segmenter::{DocumentRef, Segmenter};
pub use source::{SourceDocument, SourceNode};
pub use tables::TableExtractor;
