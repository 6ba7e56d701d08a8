//! Document loaders
//!
//! Each loader converts a native file into the structure-preserving
//! [`SourceDocument`] tree. Format is chosen by file extension.

pub mod html;
pub mod pdf;
pub mod spreadsheet;

use crate::errors::IngestionError;
use crate::source::{SourceDocument, SourceNode};
use docforge_common::models::DocumentFormat;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, instrument};

/// Extensions accepted by [`load_document`].
pub const SUPPORTED_EXTENSIONS: &[&str] = &["html", "htm", "pdf", "xlsx", "xlsm", "xls", "ods", "json"];

pub fn is_supported(path: &Path) -> bool {
    extension(path).is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
}

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

/// Stable document id derived from the file name.
pub fn document_id_for(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut id = String::with_capacity(stem.len());
    let mut last_dash = true;
    for c in stem.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            id.push(c);
            last_dash = false;
        } else if !last_dash {
            id.push('-');
            last_dash = true;
        }
    }
    let id = id.trim_end_matches('-').to_string();
    if id.is_empty() {
        "document".to_string()
    } else {
        id
    }
}

pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Load a document from disk into its source tree.
#[instrument(fields(path = %path.display()))]
pub fn load_document(path: &Path) -> Result<SourceDocument, IngestionError> {
    if !path.exists() {
        return Err(IngestionError::FileNotFound(path.display().to_string()));
    }
    let ext = extension(path).unwrap_or_default();
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let mut pdf_kind = None;
    let (format, nodes) = match ext.as_str() {
        "html" | "htm" => {
            let text = String::from_utf8_lossy(&bytes);
            (DocumentFormat::Html, html::parse_html(&text))
        }
        "pdf" => {
            let loaded = pdf::load_pdf(&bytes, &name)?;
            pdf_kind = Some(loaded.kind);
            (DocumentFormat::Pdf, loaded.nodes)
        }
        "xlsx" | "xlsm" | "xls" | "ods" => (DocumentFormat::Spreadsheet, spreadsheet::load_workbook(path)?),
        "json" => {
            let nodes: Vec<SourceNode> = serde_json::from_slice(&bytes).map_err(|e| IngestionError::Load {
                path: path.display().to_string(),
                message: format!("invalid document tree: {}", e),
            })?;
            (DocumentFormat::Tree, nodes)
        }
        other => {
            return Err(IngestionError::UnsupportedFormat {
                extension: other.to_string(),
            })
        }
    };

    debug!(format = ?format, top_level_nodes = nodes.len(), "Document loaded");

    Ok(SourceDocument {
        document_id: document_id_for(path),
        name,
        format,
        content_hash: content_hash(&bytes),
        pdf_kind,
        nodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_slug() {
        assert_eq!(document_id_for(Path::new("/x/Plant A - Design Rev.2.pdf")), "plant-a-design-rev-2");
        assert_eq!(document_id_for(Path::new("___.html")), "document");
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported(Path::new("a.XLSX")));
        assert!(is_supported(Path::new("a.json")));
        assert!(!is_supported(Path::new("a.docx")));
        assert!(!is_supported(Path::new("README")));
    }

    #[test]
    fn test_content_hash_is_sha256() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_load_json_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Layout.json");
        std::fs::write(
            &path,
            r#"[{"type": "heading", "level": 1, "text": "Layout"}, {"type": "paragraph", "text": "Two rows"}]"#,
        )
        .unwrap();

        let doc = load_document(&path).unwrap();
        assert_eq!(doc.document_id, "layout");
        assert_eq!(doc.format, DocumentFormat::Tree);
        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.content_hash.len(), 64);
    }

    #[test]
    fn test_unsupported_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.docx");
        std::fs::write(&path, b"x").unwrap();
        assert!(matches!(load_document(&path), Err(IngestionError::UnsupportedFormat { .. })));
        assert!(matches!(
            load_document(&dir.path().join("missing.pdf")),
            Err(IngestionError::FileNotFound(_))
        ));
    }
}
