//! Temperature strategy: a number followed by °C or ºC.

use super::{unit_candidates, ExtractionKind, ValueExtractor, ValueMatch};
use docforge_common::vocabulary::EntityType;
use regex_lite::Regex;
use std::ops::RangeInclusive;

const UNITS: &[(&str, &str)] = &[("°c", "°C"), ("ºc", "°C")];

const VALID_RANGE: RangeInclusive<f64> = -60.0..=150.0;

pub struct TemperatureExtractor {
    pattern: Regex,
}

impl Default for TemperatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TemperatureExtractor {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(?i)(-?\d{1,3}(?:[.,]\d+)?)\s*([°º]\s*c)\b").expect("temperature pattern"),
        }
    }
}

impl ValueExtractor for TemperatureExtractor {
    fn kind(&self) -> ExtractionKind {
        ExtractionKind::Temperature
    }

    fn entity(&self) -> EntityType {
        EntityType::Temperature
    }

    fn header_units(&self) -> &'static [(&'static str, &'static str)] {
        UNITS
    }

    fn in_range(&self, value: f64) -> bool {
        VALID_RANGE.contains(&value)
    }

    fn candidates(&self, text: &str) -> Vec<ValueMatch> {
        unit_candidates(self, &self.pattern, UNITS, text)
    }
}
