//! Closed tag vocabulary for entity categories and units.
//!
//! Chunks and queries are tagged only with the variants below; there is no
//! free-form metadata. Detection is keyword based and case-insensitive.

use crate::text::{fold_case, terms};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Semantic fact category a chunk or query is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Capacity,
    Voltage,
    Temperature,
    Current,
    Ratio,
    Cable,
    Configuration,
}

impl EntityType {
    pub const ALL: [EntityType; 7] = [
        EntityType::Capacity,
        EntityType::Voltage,
        EntityType::Temperature,
        EntityType::Current,
        EntityType::Ratio,
        EntityType::Cable,
        EntityType::Configuration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Capacity => "capacity",
            EntityType::Voltage => "voltage",
            EntityType::Temperature => "temperature",
            EntityType::Current => "current",
            EntityType::Ratio => "ratio",
            EntityType::Cable => "cable",
            EntityType::Configuration => "configuration",
        }
    }

    /// Whole-term triggers, already case-folded.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            EntityType::Capacity => &[
                "capacity", "capacities", "power", "kwp", "mwp", "kw", "mw", "kva", "mva",
                "kapasite", "kapasitesi", "güç", "gücü",
            ],
            EntityType::Voltage => &[
                "voltage", "voltages", "volt", "volts", "kv", "vdc", "vac", "gerilim",
                "gerilimi", "voltaj",
            ],
            EntityType::Temperature => &[
                "temperature", "temperatures", "temp", "celsius", "ambient", "sıcaklık",
                "sıcaklığı",
            ],
            EntityType::Current => &[
                "current", "currents", "ampere", "amperes", "amp", "amps", "isc", "imp", "akım",
                "akımı",
            ],
            EntityType::Ratio => &["ratio", "ratios", "oran", "oranı"],
            EntityType::Cable => &[
                "cable", "cables", "cabling", "conductor", "conductors", "kablo", "kablosu",
            ],
            EntityType::Configuration => &[
                "configuration", "inverter", "inverters", "substation", "substations", "string",
                "strings", "transformer", "transformers", "layout", "topology", "arrangement",
                "trafo", "evirici", "konfigürasyon", "yapılandırma",
            ],
        }
    }

    /// Substring triggers for terms the tokenizer would split apart.
    pub fn phrases(&self) -> &'static [&'static str] {
        match self {
            EntityType::Temperature => &["°c", "ºc"],
            EntityType::Ratio => &["dc/ac", "ac/dc"],
            EntityType::Cable => &["cross-section", "cross section", "mm²"],
            _ => &[],
        }
    }

    /// Units that typically express a value of this category.
    pub fn implied_units(&self) -> &'static [Unit] {
        match self {
            EntityType::Capacity => &[
                Unit::Kilowatt,
                Unit::KilowattPeak,
                Unit::Megawatt,
                Unit::MegawattPeak,
                Unit::KilovoltAmpere,
                Unit::MegavoltAmpere,
            ],
            EntityType::Voltage => &[Unit::Kilovolt, Unit::Volt],
            EntityType::Temperature => &[Unit::Celsius],
            EntityType::Current => &[Unit::Ampere],
            EntityType::Cable => &[Unit::SquareMillimetre],
            EntityType::Ratio | EntityType::Configuration => &[],
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit token recognized in document or query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "kV")]
    Kilovolt,
    #[serde(rename = "V")]
    Volt,
    #[serde(rename = "kW")]
    Kilowatt,
    #[serde(rename = "kWp")]
    KilowattPeak,
    #[serde(rename = "MW")]
    Megawatt,
    #[serde(rename = "MWp")]
    MegawattPeak,
    #[serde(rename = "kVA")]
    KilovoltAmpere,
    #[serde(rename = "MVA")]
    MegavoltAmpere,
    #[serde(rename = "°C")]
    Celsius,
    #[serde(rename = "A")]
    Ampere,
    #[serde(rename = "mm²")]
    SquareMillimetre,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Kilovolt => "kV",
            Unit::Volt => "V",
            Unit::Kilowatt => "kW",
            Unit::KilowattPeak => "kWp",
            Unit::Megawatt => "MW",
            Unit::MegawattPeak => "MWp",
            Unit::KilovoltAmpere => "kVA",
            Unit::MegavoltAmpere => "MVA",
            Unit::Celsius => "°C",
            Unit::Ampere => "A",
            Unit::SquareMillimetre => "mm²",
        }
    }

    pub fn category(&self) -> EntityType {
        match self {
            Unit::Kilovolt | Unit::Volt => EntityType::Voltage,
            Unit::Kilowatt
            | Unit::KilowattPeak
            | Unit::Megawatt
            | Unit::MegawattPeak
            | Unit::KilovoltAmpere
            | Unit::MegavoltAmpere => EntityType::Capacity,
            Unit::Celsius => EntityType::Temperature,
            Unit::Ampere => EntityType::Current,
            Unit::SquareMillimetre => EntityType::Cable,
        }
    }

    /// Map a case-folded unit spelling. Single-letter symbols are ambiguous
    /// with ordinary words and are reported separately.
    fn parse(suffix: &str) -> Option<(Unit, bool)> {
        let unit = match suffix {
            "kv" => (Unit::Kilovolt, false),
            "vdc" | "vac" => (Unit::Volt, false),
            "v" => (Unit::Volt, true),
            "kw" | "kwe" => (Unit::Kilowatt, false),
            "kwp" => (Unit::KilowattPeak, false),
            "mw" | "mwe" => (Unit::Megawatt, false),
            "mwp" => (Unit::MegawattPeak, false),
            "kva" => (Unit::KilovoltAmpere, false),
            "mva" => (Unit::MegavoltAmpere, false),
            "°c" | "ºc" => (Unit::Celsius, false),
            "a" => (Unit::Ampere, true),
            "mm²" | "mm2" => (Unit::SquareMillimetre, false),
            _ => return None,
        };
        Some(unit)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

struct RawToken<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

fn is_unit_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '°' | '.' | ',' | '-' | '+')
}

fn raw_tokens(text: &str) -> Vec<RawToken<'_>> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (is_unit_char(c), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                tokens.push(RawToken { text: &text[s..i], start: s, end: i });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(RawToken { text: &text[s..], start: s, end: text.len() });
    }
    tokens
}

fn is_number(token: &str) -> bool {
    let trimmed = token.trim_end_matches(['.', ',']);
    !trimmed.is_empty()
        && trimmed.chars().any(|c| c.is_ascii_digit())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+'))
}

/// Detect unit tokens in `text`.
///
/// `V` and `A` only count when attached to or following a number, when
/// parenthesized (`Voltage (V)`), or when they are the whole text (a unit
/// column cell).
pub fn detect_units(text: &str) -> BTreeSet<Unit> {
    let folded = fold_case(text);
    let tokens = raw_tokens(&folded);
    let mut units = BTreeSet::new();

    for (i, token) in tokens.iter().enumerate() {
        let body = token.text.trim_end_matches(['.', ',']);
        let suffix_at = body
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+')))
            .unwrap_or(body.len());
        let (number, suffix) = body.split_at(suffix_at);

        let Some((unit, ambiguous)) = Unit::parse(suffix) else {
            continue;
        };
        if ambiguous {
            let attached = number.chars().any(|c| c.is_ascii_digit());
            let follows_number = i > 0 && is_number(tokens[i - 1].text);
            let parenthesized = folded[..token.start].trim_end().ends_with('(')
                && folded[token.end..].trim_start().starts_with(')');
            let standalone = tokens.len() == 1;
            if !(attached || follows_number || parenthesized || standalone) {
                continue;
            }
        }
        units.insert(unit);
    }
    units
}

/// Detect entity categories from keywords, phrases and detected units.
pub fn detect_entity_types(text: &str) -> BTreeSet<EntityType> {
    let folded = fold_case(text);
    let term_set: HashSet<String> = terms(&folded).into_iter().collect();
    let mut found = BTreeSet::new();

    for entity in EntityType::ALL {
        let keyword_hit = entity.keywords().iter().any(|k| term_set.contains(*k));
        let phrase_hit = entity.phrases().iter().any(|p| folded.contains(p));
        if keyword_hit || phrase_hit {
            found.insert(entity);
        }
    }
    found.extend(detect_units(text).iter().map(Unit::category));
    found
}
