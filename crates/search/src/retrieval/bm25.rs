//! BM25 lexical scoring over an in-memory chunk corpus
//!
//! No network and no embedding service: this is the retrieval path that is
//! always available. Section titles count as a separate, weighted field.

use docforge_common::config::LexicalConfig;
use docforge_common::models::Chunk;
use docforge_common::text::tokenize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// BM25 scorer with a weighted section-title field
#[derive(Debug, Clone)]
pub struct LexicalScorer {
    k1: f64,
    b: f64,
    title_multiplier: f64,
}

impl Default for LexicalScorer {
    fn default() -> Self {
        Self::from_config(&LexicalConfig::default())
    }
}

struct ChunkTerms {
    body: HashMap<String, usize>,
    length: usize,
    title: HashSet<String>,
}

impl ChunkTerms {
    fn new(chunk: &Chunk) -> Self {
        let tokens = tokenize(&chunk.text);
        let length = tokens.len();
        let mut body = HashMap::new();
        for token in tokens {
            *body.entry(token).or_insert(0) += 1;
        }
        let title = if chunk.has_section() {
            tokenize(&chunk.section_title).into_iter().collect()
        } else {
            HashSet::new()
        };
        Self { body, length, title }
    }

    fn contains(&self, term: &str) -> bool {
        self.body.contains_key(term) || self.title.contains(term)
    }
}

impl LexicalScorer {
    pub fn new(k1: f64, b: f64, title_multiplier: f64) -> Self {
        Self {
            k1,
            b,
            title_multiplier,
        }
    }

    pub fn from_config(config: &LexicalConfig) -> Self {
        Self::new(config.k1, config.b, config.section_title_multiplier)
    }

    /// Score every chunk against `query`; one score per chunk, in corpus
    /// order. Chunks without any query term score zero.
    pub fn scores(&self, query: &str, corpus: &[Arc<Chunk>]) -> Vec<f64> {
        if corpus.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let query_terms: Vec<String> = tokenize(query)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect();
        if query_terms.is_empty() {
            return vec![0.0; corpus.len()];
        }

        let docs: Vec<ChunkTerms> = corpus.iter().map(|c| ChunkTerms::new(c)).collect();
        let n = docs.len() as f64;
        let avg_len = docs.iter().map(|d| d.length).sum::<usize>() as f64 / n;
        let avg_len = if avg_len > 0.0 { avg_len } else { 1.0 };

        let idf: Vec<f64> = query_terms
            .iter()
            .map(|term| {
                let df = docs.iter().filter(|d| d.contains(term)).count() as f64;
                (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
            })
            .collect();

        docs.iter()
            .map(|doc| {
                let norm = self.k1 * (1.0 - self.b + self.b * doc.length as f64 / avg_len);
                let saturate = |tf: f64| tf * (self.k1 + 1.0) / (tf + norm);

                query_terms
                    .iter()
                    .zip(&idf)
                    .map(|(term, idf)| {
                        let tf = doc.body.get(term).copied().unwrap_or(0) as f64;
                        let mut score = if tf > 0.0 { idf * saturate(tf) } else { 0.0 };
                        if doc.title.contains(term) {
                            score += self.title_multiplier * idf * saturate(1.0);
                        }
                        score
                    })
                    .sum()
            })
            .collect()
    }

    /// `(chunk id, score)` for every chunk in the corpus.
    pub fn score<'c>(&self, query: &str, corpus: &'c [Arc<Chunk>]) -> Vec<(&'c str, f64)> {
        corpus
            .iter()
            .map(|c| c.id.as_str())
            .zip(self.scores(query, corpus))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::chunk;

    #[test]
    fn test_every_chunk_gets_a_score() {
        let corpus = vec![
            chunk(0, "Configuration", "Substation 4 uses 27 x Sungrow SG350HX inverters"),
            chunk(1, "Civil", "Fence and access roads"),
        ];
        let scored = LexicalScorer::default().score("inverters substation", &corpus);
        assert_eq!(scored.len(), 2);
        assert!(scored[0].1 > 0.0);
        assert_eq!(scored[1].1, 0.0);
        assert_eq!(scored[0].0, corpus[0].id);
    }

    #[test]
    fn test_empty_corpus_and_empty_query() {
        let scorer = LexicalScorer::default();
        assert!(scorer.scores("voltage", &[]).is_empty());
        let corpus = vec![chunk(0, "Design", "Nominal voltage 1080 V")];
        assert_eq!(scorer.scores("the of and", &corpus), vec![0.0]);
    }

    #[test]
    fn test_section_title_match_outweighs_body_match() {
        let corpus = vec![
            chunk(0, "Cables", "Routing follows the trench plan"),
            chunk(1, "Trench", "Cables follow the routing plan"),
            chunk(2, "Civil", "Unrelated filler text"),
        ];
        let scores = LexicalScorer::default().scores("cables", &corpus);
        assert!(scores[0] > scores[1]);
        assert!(scores[1] > 0.0);
    }

    #[test]
    fn test_root_section_is_never_matched() {
        let corpus = vec![chunk(0, docforge_common::models::ROOT_SECTION, "text")];
        assert_eq!(LexicalScorer::default().scores("root", &corpus), vec![0.0]);
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let corpus = vec![
            chunk(0, "A", "inverter inverter station"),
            chunk(1, "B", "inverter transformer"),
            chunk(2, "C", "inverter cabinet"),
        ];
        let scores = LexicalScorer::default().scores("inverter transformer", &corpus);
        assert!(scores[1] > scores[0]);
        assert!(scores[1] > scores[2]);
    }

    #[test]
    fn test_unicode_terms_match() {
        let corpus = vec![chunk(0, "Genel", "Ortam sıcaklığı 40 °C")];
        assert!(LexicalScorer::default().scores("Sıcaklığı", &corpus)[0] > 0.0);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let corpus = vec![
            chunk(0, "Electrical", "Nominal voltage 1080 V"),
            chunk(1, "Electrical", "Voltage drop below 1%"),
        ];
        let scorer = LexicalScorer::default();
        assert_eq!(scorer.scores("nominal voltage", &corpus), scorer.scores("nominal voltage", &corpus));
    }
}
