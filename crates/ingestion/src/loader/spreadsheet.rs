//! Spreadsheet loader (XLSX, XLSM, XLS, ODS)
//!
//! Every sheet becomes a container with sheet provenance holding a level-1
//! heading named after the sheet and the sheet's used range as one table.
//! Source row numbers are absolute sheet rows, so a chunk can point back to
//! the row a value came from.

use crate::errors::IngestionError;
use crate::source::SourceNode;
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::{debug, warn};

pub fn load_workbook(path: &Path) -> Result<Vec<SourceNode>, IngestionError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| IngestionError::Load {
        path: path.display().to_string(),
        message: format!("Failed to open workbook: {}", e),
    })?;

    let sheet_names = workbook.sheet_names().to_vec();
    let mut nodes = Vec::with_capacity(sheet_names.len());

    for name in &sheet_names {
        let range = match workbook.worksheet_range(name) {
            Ok(range) => range,
            Err(e) => {
                warn!(sheet = %name, error = %e, "Failed to read worksheet, skipping");
                continue;
            }
        };
        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
        if let Some(node) = sheet_to_node(name, first_row, range.rows()) {
            nodes.push(node);
        }
    }

    if nodes.is_empty() {
        return Err(IngestionError::EmptyDocument {
            document: path.display().to_string(),
        });
    }

    debug!(sheets = sheet_names.len(), kept = nodes.len(), "Workbook loaded");
    Ok(nodes)
}

/// One sheet as a container node, or `None` when it holds no values.
/// `first_row` is the sheet row of the first item yielded by `rows`.
pub fn sheet_to_node<'a, I>(name: &str, first_row: usize, rows: I) -> Option<SourceNode>
where
    I: IntoIterator<Item = &'a [Data]>,
{
    let mut table: Vec<Vec<String>> = vec![Vec::new(); first_row];
    table.extend(rows.into_iter().map(|row| row.iter().map(cell_to_string).collect()));

    if table.iter().all(|row| row.iter().all(|c| c.trim().is_empty())) {
        debug!(sheet = name, "Skipping empty sheet");
        return None;
    }

    Some(SourceNode::Container {
        label: Some(format!("sheet {}", name)),
        page: None,
        sheet: Some(name.to_string()),
        children: vec![
            SourceNode::heading(1, name),
            SourceNode::Table {
                rows: table,
                has_header: true,
                caption: Some(name.to_string()),
            },
        ],
    })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{:.0}", f)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => format!("{}", dt),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR:{:?}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_formatting_keeps_digits() {
        assert_eq!(cell_to_string(&Data::Float(1080.0)), "1080");
        assert_eq!(cell_to_string(&Data::Float(1.424)), "1.424");
        assert_eq!(cell_to_string(&Data::Int(27)), "27");
        assert_eq!(cell_to_string(&Data::String("kV".into())), "kV");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }

    #[test]
    fn test_sheet_becomes_heading_and_table() {
        let rows = vec![
            vec![Data::String("Parameter".into()), Data::String("Value".into()), Data::String("Unit".into())],
            vec![Data::String("Nominal Voltage".into()), Data::Float(1080.0), Data::String("V".into())],
        ];
        let node = sheet_to_node("Electrical", 2, rows.iter().map(Vec::as_slice)).unwrap();

        let SourceNode::Container { sheet, children, .. } = node else {
            panic!("expected container");
        };
        assert_eq!(sheet.as_deref(), Some("Electrical"));
        assert_eq!(children[0], SourceNode::heading(1, "Electrical"));
        match &children[1] {
            SourceNode::Table { rows, .. } => {
                assert_eq!(rows.len(), 4);
                assert!(rows[0].is_empty());
                assert_eq!(rows[3], vec!["Nominal Voltage", "1080", "V"]);
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_sheet_is_skipped() {
        let rows = vec![vec![Data::Empty, Data::String("  ".into())]];
        assert!(sheet_to_node("Blank", 0, rows.iter().map(Vec::as_slice)).is_none());
    }

    #[test]
    fn test_unreadable_workbook_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip archive").unwrap();
        assert!(matches!(load_workbook(&path), Err(IngestionError::Load { .. })));
    }
}
