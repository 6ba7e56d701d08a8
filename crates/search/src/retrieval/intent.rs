//! Query intent detection
//!
//! Provides:
//! - Fact categories from the closed vocabulary (keywords, phrases, units)
//! - Units implied by those categories
//! - Whether the query expects a numeric or tabular answer

use docforge_common::text::{fold_case, tokenize};
use docforge_common::vocabulary::{detect_entity_types, detect_units, EntityType, Unit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Phrases that ask for a number or a table cell (English and Turkish).
const NUMERIC_PATTERNS: &[&str] = &[
    "how many",
    "how much",
    "what is the",
    "what's the",
    "what are the",
    "total",
    "number of",
    "value of",
    "rated",
    "kaç",
    "ne kadar",
    "nedir",
    "toplam",
    "sayısı",
    "değeri",
];

/// Query understanding result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryIntent {
    /// Scoring terms of the query
    pub terms: Vec<String>,

    /// Detected fact categories
    pub categories: BTreeSet<EntityType>,

    /// Units named in the query or implied by its categories
    pub units: BTreeSet<Unit>,

    /// Query asks for a number or table value
    pub expects_numeric: bool,
}

impl QueryIntent {
    /// Classify `query` by keyword patterns against its raw text.
    pub fn detect(query: &str) -> Self {
        let folded = fold_case(query);
        let categories = detect_entity_types(query);

        let mut units = detect_units(query);
        for category in &categories {
            units.extend(category.implied_units().iter().copied());
        }

        let expects_numeric = NUMERIC_PATTERNS.iter().any(|p| folded.contains(p))
            || categories.iter().any(|c| !c.implied_units().is_empty() || *c == EntityType::Ratio);

        Self {
            terms: tokenize(query),
            categories,
            units,
            expects_numeric,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Whether `text` names any detected category by keyword.
    pub fn mentions_category(&self, text: &str) -> bool {
        let terms: BTreeSet<String> = tokenize(text).into_iter().collect();
        self.categories
            .iter()
            .any(|c| c.keywords().iter().any(|k| terms.contains(*k)))
    }
}
