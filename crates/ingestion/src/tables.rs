//! Table extraction
//!
//! Turns a table node into one complete [`TableData`]: header row, every
//! non-empty data row in source order, an optional caption, and the entity
//! categories and units found in its cells.

use docforge_common::models::{TableData, TableRow};
use docforge_common::text::collapse_whitespace;
use docforge_common::vocabulary::{detect_entity_types, detect_units, EntityType, Unit};
use regex_lite::Regex;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Longest paragraph (in words) still treated as a caption.
const MAX_CAPTION_WORDS: usize = 10;

pub struct TableExtractor {
    caption_lookback: usize,
    numbered_caption: Regex,
}

impl TableExtractor {
    pub fn new(caption_lookback: usize) -> Self {
        Self {
            caption_lookback,
            numbered_caption: Regex::new(r"(?i)^(table|tablo|tab\.)\s*[0-9]+")
                .expect("caption pattern"),
        }
    }

    /// Extract a table. `preceding` holds the texts of preceding sibling
    /// paragraphs, nearest first. Returns `None` when the node has no
    /// content at all.
    pub fn extract(
        &self,
        rows: &[Vec<String>],
        has_header: bool,
        caption: Option<&str>,
        preceding: &[&str],
    ) -> Option<TableData> {
        let cleaned: Vec<(usize, Vec<String>)> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (i, row.iter().map(|c| collapse_whitespace(c)).collect::<Vec<_>>()))
            .filter(|(_, row)| row.iter().any(|c| !c.is_empty()))
            .collect();

        if cleaned.is_empty() {
            debug!(raw_rows = rows.len(), "Skipping table without content");
            return None;
        }

        let width = cleaned.iter().map(|(_, r)| r.len()).max().unwrap_or(0);
        let (headers, body) = if has_header {
            let (_, header_row) = &cleaned[0];
            (name_headers(header_row, width), &cleaned[1..])
        } else {
            (name_headers(&[], width), &cleaned[..])
        };

        let data_rows: Vec<TableRow> = body
            .iter()
            .map(|(source_row, values)| {
                let mut values = values.clone();
                values.resize(width, String::new());
                TableRow {
                    source_row: *source_row,
                    values,
                }
            })
            .collect();

        let table_title = caption
            .map(collapse_whitespace)
            .filter(|c| !c.is_empty())
            .or_else(|| self.find_caption(preceding));

        let (entity_types, units) = tag_table(&headers, &data_rows, table_title.as_deref());

        debug!(
            columns = headers.len(),
            rows = data_rows.len(),
            dropped = rows.len() - cleaned.len(),
            title = table_title.as_deref().unwrap_or(""),
            "Table extracted"
        );

        Some(TableData {
            headers,
            rows: data_rows,
            table_title,
            entity_types,
            units,
        })
    }

    /// First caption-like text among the nearest preceding siblings.
    fn find_caption(&self, preceding: &[&str]) -> Option<String> {
        preceding
            .iter()
            .take(self.caption_lookback)
            .map(|text| collapse_whitespace(text))
            .find(|text| self.is_caption_like(text))
            .map(|text| text.trim_end_matches(':').trim().to_string())
    }

    fn is_caption_like(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        if self.numbered_caption.is_match(text) {
            return true;
        }
        text.split_whitespace().count() <= MAX_CAPTION_WORDS && !text.ends_with('.')
    }
}

/// Column names for the header row. Blank names become `Column_N`;
/// repeated names get a numeric suffix so every column stays addressable.
fn name_headers(header_row: &[String], width: usize) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    (0..width)
        .map(|i| {
            let raw = header_row.get(i).map(String::as_str).unwrap_or("");
            let base = if raw.is_empty() {
                format!("Column_{}", i + 1)
            } else {
                raw.to_string()
            };
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{} ({})", base, count)
            }
        })
        .collect()
}

/// Entity categories from the concatenated header and cell text, units
/// from each header and cell on its own.
fn tag_table(
    headers: &[String],
    rows: &[TableRow],
    title: Option<&str>,
) -> (BTreeSet<EntityType>, BTreeSet<Unit>) {
    let mut units = BTreeSet::new();
    let mut all_text = String::new();

    let cells = headers
        .iter()
        .chain(rows.iter().flat_map(|r| r.values.iter()))
        .filter(|c| !c.is_empty());
    for cell in cells {
        units.extend(detect_units(cell));
        all_text.push_str(cell);
        all_text.push('\n');
    }
    if let Some(title) = title {
        all_text.push_str(title);
    }

    let mut entity_types = detect_entity_types(&all_text);
    entity_types.extend(units.iter().map(Unit::category));
    (entity_types, units)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_header_and_rows() {
        let extractor = TableExtractor::new(3);
        let table = extractor
            .extract(
                &rows(&[
                    &["Parameter", "Value", "Unit"],
                    &["Nominal Voltage", "1080", "V"],
                    &["", "", ""],
                    &["Max Input Current", "  26 ", "A"],
                ]),
                true,
                None,
                &[],
            )
            .unwrap();

        assert_eq!(table.headers, vec!["Parameter", "Value", "Unit"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[1].values[1], "26");
        assert_eq!(table.rows[1].source_row, 3);
        assert!(table.entity_types.contains(&EntityType::Voltage));
        assert!(table.entity_types.contains(&EntityType::Current));
        assert!(table.units.contains(&Unit::Volt));
        assert!(table.units.contains(&Unit::Ampere));
    }

    #[test]
    fn test_blank_and_duplicate_headers() {
        let extractor = TableExtractor::new(3);
        let table = extractor
            .extract(&rows(&[&["Name", "", "Name"], &["a", "b", "c", "d"]]), true, None, &[])
            .unwrap();
        assert_eq!(table.headers, vec!["Name", "Column_2", "Name (2)", "Column_4"]);
        assert_eq!(table.rows[0].values.len(), 4);
    }

    #[test]
    fn test_caption_lookback() {
        let extractor = TableExtractor::new(3);
        let data = rows(&[&["Inverter", "Count"], &["SG350HX", "27"]]);

        let table = extractor
            .extract(
                &data,
                true,
                None,
                &["The inverter fleet is summarized below for each substation in the plant.", "Table 4: Inverter allocation"],
            )
            .unwrap();
        assert_eq!(table.table_title.as_deref(), Some("Table 4: Inverter allocation"));

        let table = extractor.extract(&data, true, Some("Explicit caption"), &["Tablo 2"]).unwrap();
        assert_eq!(table.table_title.as_deref(), Some("Explicit caption"));

        let table = extractor
            .extract(&data, true, None, &["A long sentence that describes the plant layout in detail."])
            .unwrap();
        assert!(table.table_title.is_none());
    }

    #[test]
    fn test_caption_lookback_limit() {
        let extractor = TableExtractor::new(1);
        let data = rows(&[&["A", "B"], &["1", "2"]]);
        let table = extractor
            .extract(
                &data,
                true,
                None,
                &["This sentence is long enough to never count as a caption line.", "Table 1"],
            )
            .unwrap();
        assert!(table.table_title.is_none());
    }

    #[test]
    fn test_headerless_table() {
        let extractor = TableExtractor::new(3);
        let table = extractor
            .extract(&rows(&[&["Voltage", "33 kV"]]), false, None, &[])
            .unwrap();
        assert_eq!(table.headers, vec!["Column_1", "Column_2"]);
        assert_eq!(table.row_count(), 1);
        assert!(table.units.contains(&Unit::Kilovolt));
    }

    #[test]
    fn test_empty_table_is_skipped() {
        let extractor = TableExtractor::new(3);
        assert!(extractor.extract(&rows(&[&["", " "]]), true, None, &[]).is_none());
    }
}
