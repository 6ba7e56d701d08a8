//! Capacity strategy: a number followed by a power unit.

use super::{unit_candidates, ExtractionKind, ValueExtractor, ValueMatch};
use docforge_common::vocabulary::EntityType;
use regex_lite::Regex;

const UNITS: &[(&str, &str)] = &[
    ("kwp", "kWp"),
    ("mwp", "MWp"),
    ("kwe", "kWe"),
    ("mwe", "MWe"),
    ("kva", "kVA"),
    ("mva", "MVA"),
    ("kw", "kW"),
    ("mw", "MW"),
];

pub struct CapacityExtractor {
    pattern: Regex,
}

impl Default for CapacityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl CapacityExtractor {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(?i)(\d+(?:[.,]\d+)*)\s*(kwp|mwp|kwe|mwe|kva|mva|kw|mw)\b")
                .expect("capacity pattern"),
        }
    }
}

impl ValueExtractor for CapacityExtractor {
    fn kind(&self) -> ExtractionKind {
        ExtractionKind::Capacity
    }

    fn entity(&self) -> EntityType {
        EntityType::Capacity
    }

    fn header_units(&self) -> &'static [(&'static str, &'static str)] {
        UNITS
    }

    fn in_range(&self, value: f64) -> bool {
        value > 0.0
    }

    fn candidates(&self, text: &str) -> Vec<ValueMatch> {
        unit_candidates(self, &self.pattern, UNITS, text)
    }
}
