//! Signal booster / re-ranker
//!
//! Adds independent, stackable boosts on top of the lexical score:
//! - section title overlaps the query (terms or intent keywords)
//! - chunk is a table
//! - table title shares keywords with the query
//! - entity categories shared with the query intent
//! - units shared with the units the intent implies
//! - chunk is atomic
//! - query wants a number and the chunk holds one
//!
//! All weights are non-negative, so the final score never decreases when a
//! signal is added. Ordering is a stable sort on the final score, so ties
//! keep their lexical order.

use super::intent::QueryIntent;
use docforge_common::config::BoostConfig;
use docforge_common::models::Chunk;
use docforge_common::text::{has_numeric_token, tokenize};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Table-title keywords must be longer than this (in characters).
const MIN_TITLE_KEYWORD_CHARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostSignal {
    SectionTitle,
    Table,
    TableTitleKeyword,
    EntityMatch,
    UnitMatch,
    Atomic,
    NumericContent,
}

/// One named contribution to a chunk's final score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Boost {
    pub signal: BoostSignal,
    /// What matched, e.g. the shared keyword or category
    pub detail: Option<String>,
    pub weight: f64,
}

/// A chunk with its query-specific ranking state.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Arc<Chunk>,
    pub lexical_score: f64,
    /// Position in the lexical ranking, 0-based
    pub lexical_rank: usize,
    pub boosts: Vec<Boost>,
    pub final_score: f64,
}

impl ScoredChunk {
    pub fn boost_total(&self) -> f64 {
        self.boosts.iter().map(|b| b.weight).sum()
    }

    pub fn has_signal(&self, signal: BoostSignal) -> bool {
        self.boosts.iter().any(|b| b.signal == signal)
    }
}

#[derive(Debug, Clone)]
pub struct SignalBooster {
    weights: BoostConfig,
}

impl Default for SignalBooster {
    fn default() -> Self {
        Self::new(BoostConfig::default())
    }
}

impl SignalBooster {
    pub fn new(weights: BoostConfig) -> Self {
        Self { weights }
    }

    /// Re-rank lexically scored candidates. `candidates` must be in lexical
    /// rank order.
    pub fn rerank(&self, intent: &QueryIntent, candidates: &[(Arc<Chunk>, f64)]) -> Vec<ScoredChunk> {
        let query_terms: BTreeSet<&str> = intent.terms.iter().map(String::as_str).collect();

        let mut scored: Vec<ScoredChunk> = candidates
            .iter()
            .enumerate()
            .map(|(rank, (chunk, lexical_score))| {
                let mut entry = ScoredChunk {
                    chunk: Arc::clone(chunk),
                    lexical_score: *lexical_score,
                    lexical_rank: rank,
                    boosts: self.boosts_for(chunk, intent, &query_terms),
                    final_score: *lexical_score,
                };
                entry.final_score += entry.boost_total();
                entry
            })
            .collect();

        scored.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        scored
    }

    fn boosts_for(&self, chunk: &Chunk, intent: &QueryIntent, query_terms: &BTreeSet<&str>) -> Vec<Boost> {
        let w = &self.weights;
        let mut boosts = Vec::new();
        let mut push = |signal, detail: Option<String>, weight: f64| {
            if weight > 0.0 {
                boosts.push(Boost { signal, detail, weight });
            }
        };

        if chunk.has_section() {
            let title_terms = tokenize(&chunk.section_title);
            let overlap = title_terms.iter().any(|t| query_terms.contains(t.as_str()));
            if overlap || intent.mentions_category(&chunk.section_title) {
                push(BoostSignal::SectionTitle, Some(chunk.section_title.clone()), w.section_title);
            }
        }

        if chunk.is_table_chunk {
            push(BoostSignal::Table, None, w.table);
        }

        if let Some(title) = &chunk.table_title {
            let keywords: BTreeSet<String> = tokenize(title)
                .into_iter()
                .filter(|t| t.chars().count() > MIN_TITLE_KEYWORD_CHARS && query_terms.contains(t.as_str()))
                .collect();
            for keyword in keywords {
                push(BoostSignal::TableTitleKeyword, Some(keyword), w.table_title_keyword);
            }
        }

        for entity in chunk.entity_types.intersection(&intent.categories) {
            push(BoostSignal::EntityMatch, Some(entity.to_string()), w.entity_match);
        }

        for unit in chunk.units.intersection(&intent.units) {
            push(BoostSignal::UnitMatch, Some(unit.to_string()), w.unit_match);
        }

        if chunk.is_atomic {
            push(BoostSignal::Atomic, None, w.atomic);
        }

        if intent.expects_numeric && has_numeric_token(&chunk.text) {
            push(BoostSignal::NumericContent, None, w.numeric_content);
        }

        boosts
    }
}
