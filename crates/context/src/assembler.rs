//! Context Assembler - Builds citation-tagged excerpts for the answer generator
//!
//! Provides:
//! - `[Source: <doc>, <section path>]` headers with page/sheet provenance
//! - Anchored fact line for an extracted value, placed first
//! - Optional grouping of chunks that share a section path
//! - Token budget management (excerpts are never cut)

use docforge_common::config::ContextConfig;
use docforge_common::models::Chunk;
use docforge_common::text::estimate_tokens;
use docforge_search::{Extraction, ScoredChunk};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Separator placed between excerpts in the rendered context.
pub const EXCERPT_SEPARATOR: &str = "\n\n---\n\n";

/// One ranked chunk, formatted for the generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Excerpt {
    pub chunk_id: String,
    /// Citation header, e.g. `[Source: plant.pdf, Design > Electrical, Page 4]`
    pub citation: String,
    pub text: String,
    pub section_path: Vec<String>,
    pub final_score: f64,
    pub token_count: usize,
}

impl Excerpt {
    pub fn from_scored(scored: &ScoredChunk) -> Self {
        let chunk = &scored.chunk;
        let citation = citation(chunk);
        let text = chunk.text.clone();
        let token_count = estimate_tokens(&citation) + estimate_tokens(&text);
        Self {
            chunk_id: chunk.id.clone(),
            citation,
            text,
            section_path: chunk.section_path.clone(),
            final_score: scored.final_score,
            token_count,
        }
    }

    pub fn render(&self) -> String {
        format!("{}\n{}", self.citation, self.text)
    }
}

/// `[Source: <doc>, <section path>(, Page N | , Sheet S, Row R)]`
pub fn citation(chunk: &Chunk) -> String {
    format!("[Source: {}, {}]", chunk.source_document_name, chunk.location())
}

/// Context handed to the answer generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssembledContext {
    /// Extracted literal value line, always rendered first
    pub fact: Option<String>,
    pub excerpts: Vec<Excerpt>,
    pub token_count: usize,
    /// Ranked chunks left out by the token budget
    pub omitted: usize,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.fact.is_none() && self.excerpts.is_empty()
    }

    pub fn render(&self) -> String {
        self.fact
            .iter()
            .cloned()
            .chain(self.excerpts.iter().map(Excerpt::render))
            .collect::<Vec<_>>()
            .join(EXCERPT_SEPARATOR)
    }
}

/// Context assembler
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    config: ContextConfig,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}

impl ContextAssembler {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Assemble excerpts in rank order until the budget is spent.
    ///
    /// The top-ranked excerpt is always kept, even when it alone exceeds the
    /// budget (a whole table is never cut). Grouping by section path only
    /// reorders the excerpts selected by rank.
    pub fn assemble(&self, ranked: &[ScoredChunk], extraction: Option<&Extraction>) -> AssembledContext {
        let fact = extraction.and_then(|e| fact_line(e, ranked));
        let mut token_count = fact.as_deref().map_or(0, estimate_tokens);

        let mut excerpts = Vec::new();
        let mut omitted = 0;
        for scored in ranked {
            let excerpt = Excerpt::from_scored(scored);
            let fits = token_count + excerpt.token_count <= self.config.max_tokens;
            if fits || excerpts.is_empty() {
                token_count += excerpt.token_count;
                excerpts.push(excerpt);
            } else {
                omitted += 1;
            }
        }

        if omitted > 0 {
            debug!(omitted, budget = self.config.max_tokens, "Excerpts left out by token budget");
        }
        if self.config.group_by_section {
            excerpts = group_by_section(excerpts);
        }

        AssembledContext {
            fact,
            excerpts,
            token_count,
            omitted,
        }
    }
}

/// Stable grouping: groups ordered by their best-ranked member, members in
/// rank order.
fn group_by_section(excerpts: Vec<Excerpt>) -> Vec<Excerpt> {
    let mut groups: Vec<(Vec<String>, Vec<Excerpt>)> = Vec::new();
    for excerpt in excerpts {
        match groups.iter_mut().find(|(path, _)| *path == excerpt.section_path) {
            Some((_, members)) => members.push(excerpt),
            None => groups.push((excerpt.section_path.clone(), vec![excerpt])),
        }
    }
    groups.into_iter().flat_map(|(_, members)| members).collect()
}

fn fact_line(extraction: &Extraction, ranked: &[ScoredChunk]) -> Option<String> {
    if !extraction.extracted {
        return None;
    }
    let literal = extraction.literal()?;
    let source = extraction
        .source_chunk_id
        .as_deref()
        .and_then(|id| ranked.iter().find(|s| s.chunk.id == id))
        .map(|s| citation(&s.chunk))
        .unwrap_or_default();
    let matched = extraction.matched_text.as_deref().unwrap_or_default();
    Some(
        format!(
            "[Extracted value] {} {} (verbatim: \"{}\"). Use this exact value.",
            literal, source, matched
        )
        .replace("  ", " "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use docforge_common::models::{ElementKind, ROOT_SECTION};
    use docforge_search::extraction::{Confidence, ExtractionKind};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn scored(index: usize, path: &[&str], text: &str) -> ScoredChunk {
        let chunk = Chunk {
            id: Chunk::make_id("plant", index),
            document_id: "plant".into(),
            source_document_name: "plant.pdf".into(),
            chunk_index: index,
            text: text.into(),
            section_title: path.last().copied().unwrap_or(ROOT_SECTION).into(),
            section_path: path.iter().map(|s| s.to_string()).collect(),
            section_type: None,
            element_types: BTreeSet::from([ElementKind::Paragraph]),
            is_table_chunk: false,
            is_list_chunk: false,
            is_atomic: false,
            table_title: None,
            entity_types: BTreeSet::new(),
            units: BTreeSet::new(),
            token_count: estimate_tokens(text),
            page: Some(4),
            sheet: None,
            row_index: None,
            element_start: index,
            element_end: index + 1,
            table: None,
        };
        ScoredChunk {
            chunk: Arc::new(chunk),
            lexical_score: 1.0,
            lexical_rank: index,
            boosts: Vec::new(),
            final_score: 10.0 - index as f64,
        }
    }

    #[test]
    fn test_citation_format() {
        let context = ContextAssembler::default().assemble(&[scored(0, &["Design", "Electrical"], "Nominal voltage 1080 V")], None);
        assert_eq!(
            context.render(),
            "[Source: plant.pdf, Design > Electrical, Page 4]\nNominal voltage 1080 V"
        );
    }

    #[test]
    fn test_grouping_only_reorders() {
        let ranked = vec![
            scored(0, &["Electrical"], "a"),
            scored(1, &["Civil"], "b"),
            scored(2, &["Electrical"], "c"),
        ];
        let grouped = ContextAssembler::default().assemble(&ranked, None);
        let ids: Vec<&str> = grouped.excerpts.iter().map(|e| e.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["plant#0000", "plant#0002", "plant#0001"]);

        let flat = ContextAssembler::new(ContextConfig {
            group_by_section: false,
            ..ContextConfig::default()
        })
        .assemble(&ranked, None);
        let ids: Vec<&str> = flat.excerpts.iter().map(|e| e.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["plant#0000", "plant#0001", "plant#0002"]);
        assert!(flat.render().contains(EXCERPT_SEPARATOR));
    }

    #[test]
    fn test_budget_never_cuts_an_excerpt() {
        let long = "word ".repeat(300);
        let ranked = vec![scored(0, &["A"], &long), scored(1, &["B"], "short text")];
        let context = ContextAssembler::new(ContextConfig {
            max_tokens: 50,
            group_by_section: false,
            ..ContextConfig::default()
        })
        .assemble(&ranked, None);

        assert_eq!(context.excerpts.len(), 1);
        assert_eq!(context.excerpts[0].text, long);
        assert_eq!(context.omitted, 1);
    }

    #[test]
    fn test_fact_line_comes_first() {
        let ranked = vec![scored(0, &["Design"], "DC/AC Ratio (@40ºC) 1,424")];
        let extraction = Extraction {
            extracted: true,
            kind: ExtractionKind::Ratio,
            value: Some("1.424".into()),
            unit: Some("@40°C".into()),
            source_chunk_id: Some("plant#0000".into()),
            matched_text: Some("DC/AC Ratio (@40ºC) 1,424".into()),
            confidence: Confidence::High,
        };
        let rendered = ContextAssembler::default().assemble(&ranked, Some(&extraction)).render();
        assert!(rendered.starts_with("[Extracted value] 1.424 (@40°C) [Source: plant.pdf, Design, Page 4]"));
        assert!(rendered.ends_with("[Source: plant.pdf, Design, Page 4]\nDC/AC Ratio (@40ºC) 1,424"));
    }

    #[test]
    fn test_empty_ranking() {
        let context = ContextAssembler::default().assemble(&[], None);
        assert!(context.is_empty());
        assert_eq!(context.render(), "");
    }
}
