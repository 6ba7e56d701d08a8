//! Voltage strategy: a number followed by kV, VDC, VAC or V.

use super::{unit_candidates, ExtractionKind, ValueExtractor, ValueMatch};
use docforge_common::vocabulary::EntityType;
use regex_lite::Regex;

const UNITS: &[(&str, &str)] = &[
    ("kv", "kV"),
    ("vdc", "VDC"),
    ("vac", "VAC"),
    ("volts", "V"),
    ("volt", "V"),
    ("v", "V"),
];

pub struct VoltageExtractor {
    pattern: Regex,
}

impl Default for VoltageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl VoltageExtractor {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(?i)(\d+(?:[.,]\d+)*)\s*(kv|vdc|vac|volts?|v)\b").expect("voltage pattern"),
        }
    }
}

impl ValueExtractor for VoltageExtractor {
    fn kind(&self) -> ExtractionKind {
        ExtractionKind::Voltage
    }

    fn entity(&self) -> EntityType {
        EntityType::Voltage
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
