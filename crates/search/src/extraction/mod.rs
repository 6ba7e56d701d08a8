//! Deterministic value extraction
//!
//! Pulls a literal numeric fact out of the top-ranked chunks so the answer
//! never depends on a generated paraphrase of the number. Each value type is
//! a [`ValueExtractor`] strategy; the registry picks one from the query
//! intent and scans chunks in rank order. The first valid match wins.
//!
//! Values keep every digit of the source. Only the decimal separator is
//! normalized.

mod capacity;
mod numbers;
mod ratio;
mod temperature;
mod voltage;

pub use capacity::CapacityExtractor;
pub use numbers::{normalize_decimal_comma, normalize_grouped, substation_scope, Qualifiers};
pub use ratio::RatioExtractor;
pub use temperature::TemperatureExtractor;
pub use voltage::VoltageExtractor;

use crate::retrieval::{QueryIntent, ScoredChunk};
use docforge_common::config::ExtractionConfig;
use docforge_common::metrics::record_extraction;
use docforge_common::models::{Chunk, TableData, TableRow};
use docforge_common::text::{fold_case, tokenize};
use docforge_common::vocabulary::EntityType;
use numbers::{
    header_unit, is_plain_number, is_substation_header, substation_in_cell, substation_mentions,
    temperature_near, temperature_tokens,
};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionKind {
    Ratio,
    Voltage,
    Capacity,
    Temperature,
    Generic,
}

impl ExtractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionKind::Ratio => "ratio",
            ExtractionKind::Voltage => "voltage",
            ExtractionKind::Capacity => "capacity",
            ExtractionKind::Temperature => "temperature",
            ExtractionKind::Generic => "generic",
        }
    }
}

impl fmt::Display for ExtractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Low,
}

/// One candidate value found in a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueMatch {
    /// Normalized numeral
    pub value: String,
    /// Canonical unit, or the reference-temperature qualifier for ratios
    pub unit: String,
    /// Source substring the value was read from
    pub matched_text: String,
    /// Reference temperature bound to the value, in °C
    pub temperature: Option<i32>,
}

/// Result of a deterministic extraction attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub extracted: bool,
    pub kind: ExtractionKind,
    pub value: Option<String>,
    pub unit: Option<String>,
    pub source_chunk_id: Option<String>,
    pub matched_text: Option<String>,
    pub confidence: Confidence,
}

impl Extraction {
    pub fn not_found(kind: ExtractionKind) -> Self {
        Self {
            extracted: false,
            kind,
            value: None,
            unit: None,
            source_chunk_id: None,
            matched_text: None,
            confidence: Confidence::Low,
        }
    }

    /// Value and unit as they should appear in an answer, e.g. `1080 V`.
    pub fn literal(&self) -> Option<String> {
        let value = self.value.as_deref()?;
        match self.unit.as_deref().filter(|u| !u.is_empty()) {
            Some(unit) if self.kind == ExtractionKind::Ratio => Some(format!("{} ({})", value, unit)),
            Some(unit) => Some(format!("{} {}", value, unit)),
            None => Some(value.to_string()),
        }
    }
}

/// Strategy for one value type.
pub trait ValueExtractor: Send + Sync {
    fn kind(&self) -> ExtractionKind;

    /// Intent category that triggers this extractor.
    fn entity(&self) -> EntityType;

    fn matches_query(&self, intent: &QueryIntent) -> bool {
        intent.categories.contains(&self.entity())
    }

    /// Every in-range value in `text`, in text order.
    fn candidates(&self, text: &str) -> Vec<ValueMatch>;

    /// `(alias, canonical)` units recognized in table headers.
    fn header_units(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    fn in_range(&self, _value: f64) -> bool {
        true
    }

    /// First candidate of `text` acceptable under `qualifiers`.
    fn try_extract(&self, text: &str, qualifiers: &Qualifiers) -> Option<ValueMatch> {
        self.candidates(text)
            .into_iter()
            .find(|m| satisfies_temperature(self.kind(), m, qualifiers))
    }
}

/// A temperature qualifier binds every kind but temperature itself, and a
/// match without a bound temperature does not satisfy it.
fn satisfies_temperature(kind: ExtractionKind, m: &ValueMatch, qualifiers: &Qualifiers) -> bool {
    match qualifiers.temperature {
        Some(wanted) if kind != ExtractionKind::Temperature => m.temperature == Some(wanted),
        _ => true,
    }
}

/// Number-plus-unit scan shared by the voltage, capacity and temperature
/// strategies. Group 1 of `pattern` is the numeral, group 2 the unit.
pub(crate) fn unit_candidates(
    extractor: &dyn ValueExtractor,
    pattern: &Regex,
    units: &[(&str, &str)],
    text: &str,
) -> Vec<ValueMatch> {
    let mut found = Vec::new();
    for caps in pattern.captures_iter(text) {
        let (Some(whole), Some(number), Some(unit)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        // no lookbehind: reject numerals glued to a preceding word or number
        let glued = text[..whole.start()]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '.' || c == ',');
        if glued {
            continue;
        }

        let value = normalize_grouped(number.as_str());
        let Ok(parsed) = value.parse::<f64>() else {
            continue;
        };
        if !extractor.in_range(parsed) {
            debug!(kind = %extractor.kind(), value = %value, "Value outside sane range, rejected");
            continue;
        }

        let folded = fold_case(unit.as_str());
        let canonical = units
            .iter()
            .find(|(alias, _)| fold_case(alias) == folded)
            .map_or(unit.as_str(), |(_, canonical)| *canonical);

        found.push(ValueMatch {
            value,
            unit: canonical.to_string(),
            matched_text: whole.as_str().trim().to_string(),
            temperature: if extractor.kind() == ExtractionKind::Temperature {
                None
            } else {
                temperature_near(text, whole.start(), whole.end())
            },
        });
    }
    found
}

struct ChunkMatch {
    found: ValueMatch,
    /// Every applicable query qualifier was satisfied
    qualified: bool,
    distinct_values: usize,
}

/// Strategy registry; precedence is ratio, voltage, capacity, temperature.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn ValueExtractor>>,
    config: ExtractionConfig,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

impl ExtractorRegistry {
    pub fn new(config: ExtractionConfig) -> Self {
        Self::with_extractors(
            config,
            vec![
                Box::new(RatioExtractor::new()),
                Box::new(VoltageExtractor::new()),
                Box::new(CapacityExtractor::new()),
                Box::new(TemperatureExtractor::new()),
            ],
        )
    }

    pub fn with_extractors(config: ExtractionConfig, extractors: Vec<Box<dyn ValueExtractor>>) -> Self {
        Self { extractors, config }
    }

    /// First strategy triggered by the intent.
    pub fn select(&self, intent: &QueryIntent) -> Option<&dyn ValueExtractor> {
        self.extractors
            .iter()
            .find(|e| e.matches_query(intent))
            .map(|e| e.as_ref())
    }

    /// Scan the top-ranked chunks for a literal value answering `query`.
    pub fn extract(&self, query: &str, intent: &QueryIntent, ranked: &[ScoredChunk]) -> Extraction {
        if !self.config.enabled {
            return Extraction::not_found(ExtractionKind::Generic);
        }
        let Some(extractor) = self.select(intent) else {
            debug!("No value type triggered, deferring to generation");
            return Extraction::not_found(ExtractionKind::Generic);
        };

        let kind = extractor.kind();
        let qualifiers = Qualifiers::from_query(query);

        for scored in ranked.iter().take(self.config.max_candidates) {
            let chunk = &scored.chunk;
            let Some(m) = scan_chunk(extractor, chunk, &qualifiers, &intent.terms) else {
                continue;
            };

            let confidence = if m.qualified || m.distinct_values <= 1 {
                Confidence::High
            } else {
                debug!(
                    chunk_id = %chunk.id,
                    distinct_values = m.distinct_values,
                    "Several candidate values and no disambiguating qualifier, keeping first"
                );
                Confidence::Low
            };

            record_extraction(kind.as_str(), true);
            info!(kind = %kind, value = %m.found.value, chunk_id = %chunk.id, "Value extracted");
            return Extraction {
                extracted: true,
                kind,
                value: Some(m.found.value),
                unit: Some(m.found.unit).filter(|u| !u.is_empty()),
                source_chunk_id: Some(chunk.id.clone()),
                matched_text: Some(m.found.matched_text),
                confidence,
            };
        }

        record_extraction(kind.as_str(), false);
        debug!(kind = %kind, scanned = ranked.len().min(self.config.max_candidates), "No value found");
        Extraction::not_found(kind)
    }
}

fn scan_chunk(
    extractor: &dyn ValueExtractor,
    chunk: &Chunk,
    qualifiers: &Qualifiers,
    terms: &[String],
) -> Option<ChunkMatch> {
    let temperature_applies = qualifiers.temperature.is_some() && extractor.kind() != ExtractionKind::Temperature;
    let mut substation_named = false;

    let (found, scanned_text) = match (&chunk.table, qualifiers.substation) {
        (Some(table), Some(number)) if table.headers.iter().any(|h| is_substation_header(h)) => {
            let column = table.headers.iter().position(|h| is_substation_header(h))?;
            let rows: Vec<&TableRow> = table
                .rows
                .iter()
                .filter(|r| r.values.get(column).and_then(|c| substation_in_cell(c)) == Some(number))
                .collect();
            if rows.is_empty() {
                debug!(chunk_id = %chunk.id, substation = number, "No row for substation");
                return None;
            }
            substation_named = true;
            let text = rows_text(rows.iter().copied());
            (scan_rows(extractor, table, rows, qualifiers, terms), text)
        }
        (Some(table), substation) => {
            // no substation column: the table's heading decides whose it is
            if let Some(number) = substation {
                let heading = table_heading(chunk);
                if substation_scope(&heading, number).is_none() {
                    debug!(chunk_id = %chunk.id, substation = number, "Table heading names other substations only");
                    return None;
                }
                substation_named = substation_mentions(&heading).iter().any(|m| m.number == number);
            }
            (
                scan_rows(extractor, table, table.rows.iter().collect(), qualifiers, terms),
                rows_text(&table.rows),
            )
        }
        (None, substation) => {
            let scoped = match substation {
                Some(number) => {
                    let Some(scoped) = substation_scope(&chunk.text, number) else {
                        debug!(chunk_id = %chunk.id, substation = number, "Chunk names other substations only");
                        return None;
                    };
                    substation_named = substation_mentions(&chunk.text).iter().any(|m| m.number == number);
                    scoped
                }
                None => chunk.text.clone(),
            };
            (extractor.try_extract(&scoped, qualifiers), scoped)
        }
    };

    let found = found?;
    let applicable = temperature_applies || qualifiers.substation.is_some();
    let qualified = applicable && (qualifiers.substation.is_none() || substation_named);
    let distinct_values = extractor
        .candidates(&scanned_text)
        .into_iter()
        .map(|m| m.value)
        .collect::<BTreeSet<_>>()
        .len();

    Some(ChunkMatch {
        found,
        qualified,
        distinct_values,
    })
}

/// Section path and table title of a table chunk, space-joined.
fn table_heading(chunk: &Chunk) -> String {
    chunk
        .section_path
        .iter()
        .chain(chunk.table_title.iter())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

fn joined_values(row: &TableRow) -> String {
    row.values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn rows_text<'a>(rows: impl IntoIterator<Item = &'a TableRow>) -> String {
    rows.into_iter().map(joined_values).collect::<Vec<_>>().join("\n")
}

/// Rows in order of query-term overlap (stable), each tried as joined
/// values, then as header/cell pairs, then by the header-unit rule.
fn scan_rows(
    extractor: &dyn ValueExtractor,
    table: &TableData,
    mut rows: Vec<&TableRow>,
    qualifiers: &Qualifiers,
    terms: &[String],
) -> Option<ValueMatch> {
    rows.sort_by_key(|row| {
        let row_terms: BTreeSet<String> = tokenize(&joined_values(row)).into_iter().collect();
        Reverse(terms.iter().filter(|t| row_terms.contains(*t)).count())
    });

    rows.into_iter().find_map(|row| {
        extractor
            .try_extract(&joined_values(row), qualifiers)
            .or_else(|| {
                table
                    .row_pairs(row)
                    .find_map(|(h, v)| extractor.try_extract(&format!("{} {}", h, v), qualifiers))
            })
            .or_else(|| header_unit_match(extractor, table, row, qualifiers))
    })
}

/// A header like `Voltage (kV)` over a bare numeric cell.
fn header_unit_match(
    extractor: &dyn ValueExtractor,
    table: &TableData,
    row: &TableRow,
    qualifiers: &Qualifiers,
) -> Option<ValueMatch> {
    table.row_pairs(row).find_map(|(header, cell)| {
        let unit = fold_case(&header_unit(header)?);
        let (_, canonical) = extractor
            .header_units()
            .iter()
            .find(|(alias, _)| fold_case(alias) == unit)?;
        if !is_plain_number(cell) {
            return None;
        }
        let value = normalize_grouped(cell);
        if !extractor.in_range(value.parse().ok()?) {
            debug!(kind = %extractor.kind(), value = %value, "Value outside sane range, rejected");
            return None;
        }
        let m = ValueMatch {
            value,
            unit: canonical.to_string(),
            matched_text: format!("{}: {}", header, cell.trim()),
            temperature: temperature_tokens(header).first().map(|t| t.celsius),
        };
        satisfies_temperature(extractor.kind(), &m, qualifiers).then_some(m)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{chunk, table_chunk};
    use std::sync::Arc;

    fn ranked(chunks: Vec<Arc<Chunk>>) -> Vec<ScoredChunk> {
        chunks
            .into_iter()
            .enumerate()
            .map(|(rank, chunk)| ScoredChunk {
                chunk,
                lexical_score: 1.0,
                lexical_rank: rank,
                boosts: Vec::new(),
                final_score: 1.0,
            })
            .collect()
    }

    fn extract(query: &str, chunks: Vec<Arc<Chunk>>) -> Extraction {
        ExtractorRegistry::default().extract(query, &QueryIntent::detect(query), &ranked(chunks))
    }

    #[test]
    fn test_ratio_keeps_every_digit() {
        let result = extract(
            "What is the DC/AC ratio at substation X at 40°C?",
            vec![chunk(0, "Design", "DC/AC Ratio (@40ºC) 1,424")],
        );
        assert!(result.extracted);
        assert_eq!(result.kind, ExtractionKind::Ratio);
        assert_eq!(result.value.as_deref(), Some("1.424"));
        assert_eq!(result.unit.as_deref(), Some("@40°C"));
        assert_eq!(result.source_chunk_id.as_deref(), Some("doc#0000"));
        assert_eq!(result.confidence, Confidence::High);
    }

    #[test]
    fn test_temperature_qualifier_picks_matching_chunk() {
        let chunks = vec![
            chunk(0, "Design", "DC/AC ratio at peak: 1.420 @40°C"),
            chunk(1, "Design", "DC/AC ratio at nominal: 1.291 @30°C"),
        ];
        let result = extract("DC/AC ratio @30°C", chunks.clone());
        assert_eq!(result.value.as_deref(), Some("1.291"));
        assert_eq!(result.source_chunk_id.as_deref(), Some("doc#0001"));

        let result = extract("DC/AC ratio at 40 °C", chunks);
        assert_eq!(result.value.as_deref(), Some("1.420"));
    }

    #[test]
    fn test_out_of_range_ratio_is_skipped() {
        let result = extract(
            "What is the DC/AC ratio?",
            vec![
                chunk(0, "Notes", "The DC/AC ratio table lists 47 entries"),
                chunk(1, "Design", "DC/AC ratio 1.25"),
            ],
        );
        assert_eq!(result.value.as_deref(), Some("1.25"));
        assert_eq!(result.source_chunk_id.as_deref(), Some("doc#0001"));
    }

    #[test]
    fn test_voltage_from_table_row() {
        let table = table_chunk(
            0,
            "Electrical Characteristics",
            &["Parameter", "Value", "Unit"],
            &[&["Nominal Voltage", "1080", "V"]],
        );
        let result = extract("What is the nominal voltage?", vec![table]);
        assert_eq!(result.kind, ExtractionKind::Voltage);
        assert_eq!(result.value.as_deref(), Some("1080"));
        assert_eq!(result.unit.as_deref(), Some("V"));
        assert_eq!(result.literal().as_deref(), Some("1080 V"));
    }

    #[test]
    fn test_header_unit_rule() {
        let table = table_chunk(
            0,
            "Grid",
            &["Connection point", "Voltage (kV)"],
            &[&["Main", "33"]],
        );
        let result = extract("grid connection voltage", vec![table]);
        assert_eq!(result.value.as_deref(), Some("33"));
        assert_eq!(result.unit.as_deref(), Some("kV"));
        assert_eq!(result.matched_text.as_deref(), Some("Voltage (kV): 33"));
    }

    #[test]
    fn test_substation_column_filters_rows() {
        let table = table_chunk(
            0,
            "Ratios",
            &["Substation", "DC/AC Ratio (@40ºC)"],
            &[&["SS-1", "1,380"], &["SS-4", "1,424"]],
        );
        let result = extract("DC/AC ratio of substation 4 at 40°C", vec![table.clone()]);
        assert_eq!(result.value.as_deref(), Some("1.424"));
        assert_eq!(result.confidence, Confidence::High);

        let result = extract("DC/AC ratio of substation 9", vec![table]);
        assert!(!result.extracted);
    }

    #[test]
    fn test_table_heading_scopes_substation() {
        let rows: &[&[&str]] = &[&["DC/AC Ratio (@40ºC)", "1,380"]];
        let other = table_chunk(0, "Substation 3 Design", &["Parameter", "Value"], rows);
        let result = extract("DC/AC ratio of substation 4", vec![other.clone()]);
        assert!(!result.extracted);

        let mut titled = (*table_chunk(1, "Design", &["Parameter", "Value"], &[&["DC/AC Ratio (@40ºC)", "1,424"]])).clone();
        titled.table_title = Some("Substation 4 ratios".into());
        let result = extract("DC/AC ratio of substation 4", vec![other, Arc::new(titled)]);
        assert_eq!(result.value.as_deref(), Some("1.424"));
        assert_eq!(result.source_chunk_id.as_deref(), Some("doc#0001"));
        assert_eq!(result.confidence, Confidence::High);

        // a heading naming no substation neither rejects nor qualifies
        let plain = table_chunk(0, "Design", &["Parameter", "Value"], &[&["DC/AC Ratio", "1,31"]]);
        let result = extract("DC/AC ratio of substation 4", vec![plain]);
        assert_eq!(result.value.as_deref(), Some("1.31"));
    }

    #[test]
    fn test_substation_qualifier_rejects_other_substations() {
        let chunks = vec![
            chunk(0, "Capacity", "Substation 3 installed capacity 4,950 kWp"),
            chunk(1, "Capacity", "Substation 4 installed capacity 5,120 kWp"),
        ];
        let result = extract("Installed capacity of Substation 4?", chunks);
        assert_eq!(result.value.as_deref(), Some("5120"));
        assert_eq!(result.unit.as_deref(), Some("kWp"));
        assert_eq!(result.source_chunk_id.as_deref(), Some("doc#0001"));
    }

    #[test]
    fn test_ambiguous_values_are_low_confidence() {
        let result = extract(
            "What is the rated power?",
            vec![chunk(0, "Design", "Inverter power 350 kW, plant power 12,5 MW")],
        );
        assert_eq!(result.value.as_deref(), Some("350"));
        assert_eq!(result.confidence, Confidence::Low);
    }

    #[test]
    fn test_no_trigger_and_empty_ranking() {
        let result = extract("Who prepared the report?", vec![chunk(0, "Intro", "Prepared by ACME")]);
        assert!(!result.extracted);
        assert_eq!(result.kind, ExtractionKind::Generic);

        let result = extract("What is the nominal voltage?", Vec::new());
        assert!(!result.extracted);
        assert_eq!(result.kind, ExtractionKind::Voltage);
    }

    #[test]
    fn test_precedence_prefers_ratio() {
        let registry = ExtractorRegistry::default();
        let intent = QueryIntent::detect("DC/AC ratio at 40°C");
        assert_eq!(registry.select(&intent).map(|e| e.kind()), Some(ExtractionKind::Ratio));
        let intent = QueryIntent::detect("ambient temperature");
        assert_eq!(registry.select(&intent).map(|e| e.kind()), Some(ExtractionKind::Temperature));
    }

    #[test]
    fn test_disabled_registry_extracts_nothing() {
        let registry = ExtractorRegistry::new(ExtractionConfig {
            enabled: false,
            ..ExtractionConfig::default()
        });
        let query = "What is the nominal voltage?";
        let chunks = ranked(vec![chunk(0, "Design", "Nominal voltage 1080 V")]);
        assert!(!registry.extract(query, &QueryIntent::detect(query), &chunks).extracted);
    }
}
