//! Chunk records and document bookkeeping.

use super::element::{ElementKind, TableData, ROOT_SECTION};
use crate::vocabulary::{EntityType, Unit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;

/// Coarse role of a chunk inside its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Title,
    Toc,
    References,
    Table,
}

/// The atomic retrievable unit. Immutable once published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `{document_id}#{chunk_index:04}`
    pub id: String,
    pub document_id: String,
    pub source_document_name: String,
    pub chunk_index: usize,
    pub text: String,
    pub section_title: String,
    pub section_path: Vec<String>,
    pub section_type: Option<SectionType>,
    pub element_types: BTreeSet<ElementKind>,
    pub is_table_chunk: bool,
    pub is_list_chunk: bool,
    pub is_atomic: bool,
    pub table_title: Option<String>,
    pub entity_types: BTreeSet<EntityType>,
    pub units: BTreeSet<Unit>,
    pub token_count: usize,
    pub page: Option<u32>,
    pub sheet: Option<String>,
    /// First source row of a table chunk
    pub row_index: Option<usize>,
    /// Half-open span of element indices this chunk was built from
    pub element_start: usize,
    pub element_end: usize,
    pub table: Option<TableData>,
}

impl Chunk {
    pub fn make_id(document_id: &str, chunk_index: usize) -> String {
        format!("{}#{:04}", document_id, chunk_index)
    }

    pub fn element_range(&self) -> Range<usize> {
        self.element_start..self.element_end
    }

    /// Section path joined for display, e.g. `Design > Electrical`.
    pub fn section_label(&self) -> String {
        if self.section_path.is_empty() {
            return ROOT_SECTION.to_string();
        }
        self.section_path.join(" > ")
    }

    /// Whether the chunk sits under a real heading.
    pub fn has_section(&self) -> bool {
        !(self.section_path.len() == 1 && self.section_path[0] == ROOT_SECTION)
    }

    /// Human readable provenance: section, then page or sheet/row.
    pub fn location(&self) -> String {
        let mut location = self.section_label();
        if let Some(page) = self.page {
            location.push_str(&format!(", Page {}", page));
        }
        if let Some(sheet) = &self.sheet {
            location.push_str(&format!(", Sheet {}", sheet));
            if let Some(row) = self.row_index {
                location.push_str(&format!(", Row {}", row + 1));
            }
        }
        location
    }
}

/// Source format of an ingested document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Html,
    Pdf,
    Spreadsheet,
    Tree,
}

/// Text density classification of PDF sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfKind {
    Text,
    Scanned,
    Mixed,
}

/// Bookkeeping for one ingested document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: String,
    pub name: String,
    pub format: DocumentFormat,
    /// SHA-256 of the raw source bytes, hex encoded
    pub content_hash: String,
    pub chunk_count: usize,
    pub pdf_kind: Option<PdfKind>,
    pub ingested_at: DateTime<Utc>,
}
