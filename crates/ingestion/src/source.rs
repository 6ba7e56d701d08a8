//! Structure-preserving document tree handed over by the loaders.
//!
//! Loaders never flatten a document to plain text; they keep heading levels,
//! paragraph, list and table boundaries so the parser can rebuild section
//! provenance. The same tree can be supplied directly as JSON.

use docforge_common::models::{DocumentFormat, PdfKind};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceNode {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
    },
    List {
        #[serde(default)]
        ordered: bool,
        items: Vec<String>,
    },
    Table {
        rows: Vec<Vec<String>>,
        /// First non-empty row holds column names
        #[serde(default = "default_true")]
        has_header: bool,
        #[serde(default)]
        caption: Option<String>,
    },
    /// Grouping without a heading of its own, e.g. a PDF page or a sheet
    Container {
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        page: Option<u32>,
        #[serde(default)]
        sheet: Option<String>,
        children: Vec<SourceNode>,
    },
}

impl SourceNode {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        SourceNode::Heading {
            level,
            text: text.into(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        SourceNode::Paragraph { text: text.into() }
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SourceNode::List {
            ordered: false,
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    pub fn table<R, C, S>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SourceNode::Table {
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(Into::into).collect())
                .collect(),
            has_header: true,
            caption: None,
        }
    }

    /// Plain text of a paragraph node, used for caption lookback.
    pub fn paragraph_text(&self) -> Option<&str> {
        match self {
            SourceNode::Paragraph { text } => Some(text),
            _ => None,
        }
    }
}

/// A loaded document ready for structural parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub document_id: String,
    pub name: String,
    pub format: DocumentFormat,
    /// SHA-256 of the raw bytes, hex encoded
    #[serde(default)]
    pub content_hash: String,
    #[serde(default)]
    pub pdf_kind: Option<PdfKind>,
    pub nodes: Vec<SourceNode>,
}

impl SourceDocument {
    pub fn new(document_id: impl Into<String>, name: impl Into<String>, nodes: Vec<SourceNode>) -> Self {
        Self {
            document_id: document_id.into(),
            name: name.into(),
            format: DocumentFormat::Tree,
            content_hash: String::new(),
            pdf_kind: None,
            nodes,
        }
    }
}
