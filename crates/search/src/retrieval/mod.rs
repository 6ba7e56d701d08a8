//! Retrieval pipeline
//!
//! Lexical scoring over a store snapshot, intent detection, signal re-ranking
//! and a bounded widening of the candidate window when the first pass looks
//! under-confident.

mod bm25;
mod intent;
mod rerank;

pub use bm25::LexicalScorer;
pub use intent::QueryIntent;
pub use rerank::{Boost, BoostSignal, ScoredChunk, SignalBooster};

use docforge_common::config::{AppConfig, RetrievalConfig, MAX_EXPANSION_CEILING};
use docforge_common::models::Chunk;
use docforge_common::store::StoreSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Search request parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Query text
    pub query: String,

    /// Maximum results to return; `retrieval.top_k` when unset
    #[serde(default)]
    pub limit: Option<usize>,

    /// Restrict to these documents
    #[serde(default)]
    pub document_ids: Option<Vec<String>>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_documents(mut self, document_ids: Vec<String>) -> Self {
        self.document_ids = Some(document_ids);
        self
    }
}

/// Ranked results plus diagnostics of how they were obtained.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalOutcome {
    pub intent: QueryIntent,
    pub results: Vec<ScoredChunk>,
    /// Number of window widenings performed
    pub expansions: u32,
    /// Chunks with a positive lexical score
    pub candidate_pool: usize,
    /// Final re-rank window
    pub window: usize,
}

impl RetrievalOutcome {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Lexical retrieval with signal re-ranking
#[derive(Debug, Clone)]
pub struct Retriever {
    scorer: LexicalScorer,
    booster: SignalBooster,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(scorer: LexicalScorer, booster: SignalBooster, config: RetrievalConfig) -> Self {
        Self {
            scorer,
            booster,
            config,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            LexicalScorer::from_config(&config.lexical),
            SignalBooster::new(config.boosts.clone()),
            config.retrieval.clone(),
        )
    }

    /// Rank the snapshot's chunks for `request`.
    ///
    /// An empty corpus or a query matching nothing yields an empty result,
    /// never an error.
    pub fn retrieve(&self, snapshot: &StoreSnapshot, request: &SearchRequest) -> RetrievalOutcome {
        let intent = QueryIntent::detect(&request.query);
        let corpus = snapshot.chunks_for(request.document_ids.as_deref());
        self.retrieve_from(&corpus, intent, request)
    }

    fn retrieve_from(&self, corpus: &[Arc<Chunk>], intent: QueryIntent, request: &SearchRequest) -> RetrievalOutcome {
        let scores = self.scorer.scores(&request.query, corpus);

        let mut candidates: Vec<(Arc<Chunk>, f64)> = corpus
            .iter()
            .zip(scores)
            .filter(|(_, score)| *score > 0.0)
            .map(|(chunk, score)| (Arc::clone(chunk), score))
            .collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

        let limit = request.limit.unwrap_or(self.config.top_k).max(1);
        let mut window = limit.max(self.config.top_k);
        let max_expansions = self.config.max_expansions.min(MAX_EXPANSION_CEILING);
        let mut expansions = 0;

        let mut ranked = self.booster.rerank(&intent, &candidates[..window.min(candidates.len())]);
        while expansions < max_expansions && window < candidates.len() && self.under_confident(&ranked) {
            window = ((window as f64) * self.config.expansion_factor).ceil() as usize;
            expansions += 1;
            debug!(window, expansions, pool = candidates.len(), "Widening candidate window");
            ranked = self.booster.rerank(&intent, &candidates[..window.min(candidates.len())]);
        }

        ranked.truncate(limit);
        debug!(
            results = ranked.len(),
            pool = candidates.len(),
            expansions,
            categories = ?intent.categories,
            "Retrieval complete"
        );

        RetrievalOutcome {
            intent,
            results: ranked,
            expansions,
            candidate_pool: candidates.len(),
            window,
        }
    }

    fn under_confident(&self, ranked: &[ScoredChunk]) -> bool {
        if ranked.len() < self.config.min_candidates {
            return true;
        }
        let top: Vec<f64> = ranked.iter().take(3).map(|s| s.final_score).collect();
        let mean = top.iter().sum::<f64>() / top.len().max(1) as f64;
        mean < self.config.score_floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{chunk, table_chunk};
    use docforge_common::models::{DocumentFormat, DocumentRecord};
    use docforge_common::store::ChunkStore;

    fn retriever(top_k: usize, min_candidates: usize, score_floor: f64) -> Retriever {
        Retriever::new(
            LexicalScorer::default(),
            SignalBooster::default(),
            RetrievalConfig {
                top_k,
                min_candidates,
                score_floor,
                ..RetrievalConfig::default()
            },
        )
    }

    fn filler(n: usize) -> Vec<Arc<Chunk>> {
        (0..n).map(|i| chunk(i, "Notes", &format!("inverter note {}", i))).collect()
    }

    #[test]
    fn test_empty_corpus_returns_nothing() {
        let snapshot = StoreSnapshot::default();
        let outcome = Retriever::from_config(&AppConfig::default()).retrieve(&snapshot, &SearchRequest::new("voltage"));
        assert!(outcome.is_empty());
        assert_eq!(outcome.expansions, 0);
        assert_eq!(outcome.candidate_pool, 0);
    }

    #[test]
    fn test_only_matching_chunks_are_candidates() {
        let corpus = vec![chunk(0, "Civil", "fence"), chunk(1, "Electrical", "nominal voltage 1080 V")];
        let outcome = retriever(8, 1, 0.0).retrieve_from(
            &corpus,
            QueryIntent::detect("nominal voltage"),
            &SearchRequest::new("nominal voltage"),
        );
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].chunk.id, "doc#0001");
    }

    #[test]
    fn test_window_widens_until_confident_and_is_bounded() {
        let corpus = filler(40);
        let request = SearchRequest::new("inverter").with_limit(2);

        // floor can never be met: stops at max_expansions
        let outcome = retriever(2, 1, 1_000.0).retrieve_from(&corpus, QueryIntent::detect("inverter"), &request);
        assert_eq!(outcome.expansions, 2);
        assert_eq!(outcome.window, 8);
        assert_eq!(outcome.results.len(), 2);

        // already confident: no widening
        let outcome = retriever(2, 1, 0.0).retrieve_from(&corpus, QueryIntent::detect("inverter"), &request);
        assert_eq!(outcome.expansions, 0);
        assert_eq!(outcome.window, 2);
    }

    #[test]
    fn test_no_widening_past_the_pool() {
        let corpus = filler(3);
        let outcome = retriever(8, 5, 0.0).retrieve_from(
            &corpus,
            QueryIntent::detect("inverter"),
            &SearchRequest::new("inverter"),
        );
        assert_eq!(outcome.expansions, 0);
        assert_eq!(outcome.results.len(), 3);
    }

    #[test]
    fn test_wider_window_keeps_relative_order() {
        let mut corpus = filler(20);
        corpus.push(table_chunk(20, "Electrical", &["Parameter", "Value"], &[&["Inverter voltage", "1080 V"]]));
        let intent = QueryIntent::detect("inverter voltage");

        let narrow = retriever(4, 1, 0.0).retrieve_from(&corpus, intent.clone(), &SearchRequest::new("inverter voltage"));
        let wide = retriever(16, 1, 0.0).retrieve_from(&corpus, intent, &SearchRequest::new("inverter voltage").with_limit(16));

        let narrow_ids: Vec<&str> = narrow.results.iter().map(|s| s.chunk.id.as_str()).collect();
        let wide_ids: Vec<&str> = wide
            .results
            .iter()
            .map(|s| s.chunk.id.as_str())
            .filter(|id| narrow_ids.contains(id))
            .collect();
        assert_eq!(narrow_ids, wide_ids);
    }

    #[test]
    fn test_document_filter() {
        let store = ChunkStore::new();
        for id in ["a", "b"] {
            let mut c = (*chunk(0, "Electrical", "nominal voltage 1080 V")).clone();
            c.document_id = id.into();
            c.id = Chunk::make_id(id, 0);
            let record = DocumentRecord {
                document_id: id.into(),
                name: format!("{}.json", id),
                format: DocumentFormat::Tree,
                content_hash: String::new(),
                chunk_count: 1,
                pdf_kind: None,
                ingested_at: chrono::Utc::now(),
            };
            store.replace_document(record, vec![c]).unwrap();
        }
        let snapshot = store.snapshot().unwrap();
        let request = SearchRequest::new("nominal voltage").with_documents(vec!["b".into()]);
        let outcome = Retriever::from_config(&AppConfig::default()).retrieve(&snapshot, &request);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].chunk.document_id, "b");
    }
}
