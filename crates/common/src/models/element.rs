//! Structural elements produced by the parser.

use crate::vocabulary::{EntityType, Unit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Section path marker for content that precedes every heading.
pub const ROOT_SECTION: &str = "(root)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Heading,
    Paragraph,
    ListItem,
    Table,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Heading => "heading",
            ElementKind::Paragraph => "paragraph",
            ElementKind::ListItem => "list_item",
            ElementKind::Table => "table",
        }
    }
}

/// One data row of a table, values aligned with [`TableData::headers`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Zero-based row position in the source table, header row included
    pub source_row: usize,
    pub values: Vec<String>,
}

/// A complete table. Never truncated or sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
    pub table_title: Option<String>,
    pub entity_types: BTreeSet<EntityType>,
    pub units: BTreeSet<Unit>,
}

impl TableData {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Header/value pairs of one row, skipping empty cells.
    pub fn row_pairs<'a>(&'a self, row: &'a TableRow) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.headers
            .iter()
            .zip(row.values.iter())
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(h, v)| (h.as_str(), v.as_str()))
    }

    /// Value of `header` in `row`, if the column exists.
    pub fn cell<'a>(&self, row: &'a TableRow, header: &str) -> Option<&'a str> {
        let idx = self.headers.iter().position(|h| h == header)?;
        row.values.get(idx).map(String::as_str)
    }

    /// Serialized `key: value` form, one line per row.
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        if let Some(title) = &self.table_title {
            lines.push(format!("Table: {}", title));
        }
        for row in &self.rows {
            let line = self
                .row_pairs(row)
                .map(|(h, v)| format!("{}: {}", h, v))
                .collect::<Vec<_>>()
                .join(" | ");
            lines.push(line);
        }
        lines.join("\n")
    }
}

/// One structural unit of a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentElement {
    pub kind: ElementKind,
    pub text: String,
    /// Nearest enclosing heading, or [`ROOT_SECTION`]
    pub section_title: String,
    /// Heading titles from root to the immediate parent; never empty
    pub section_path: Vec<String>,
    pub heading_level: Option<u8>,
    /// Position in the element sequence
    pub index: usize,
    pub page: Option<u32>,
    pub sheet: Option<String>,
    /// Shared by all items of one list
    pub list_id: Option<usize>,
    pub table: Option<TableData>,
}

impl DocumentElement {
    pub fn is_table(&self) -> bool {
        self.kind == ElementKind::Table
    }

    pub fn is_list_item(&self) -> bool {
        self.kind == ElementKind::ListItem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableData {
        TableData {
            headers: vec!["Parameter".into(), "Value".into(), "Unit".into()],
            rows: vec![
                TableRow {
                    source_row: 1,
                    values: vec!["Nominal Voltage".into(), "1080".into(), "V".into()],
                },
                TableRow {
                    source_row: 2,
                    values: vec!["Max Current".into(), "".into(), "A".into()],
                },
            ],
            table_title: Some("Table 2 Inverter data".into()),
            entity_types: BTreeSet::new(),
            units: BTreeSet::new(),
        }
    }

    #[test]
    fn test_render_key_value_rows() {
        let rendered = table().render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Table: Table 2 Inverter data");
        assert_eq!(lines[1], "Parameter: Nominal Voltage | Value: 1080 | Unit: V");
        assert_eq!(lines[2], "Parameter: Max Current | Unit: A");
    }

    #[test]
    fn test_cell_lookup() {
        let t = table();
        assert_eq!(t.cell(&t.rows[0], "Value"), Some("1080"));
        assert_eq!(t.cell(&t.rows[0], "Missing"), None);
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.column_count(), 3);
    }
}
