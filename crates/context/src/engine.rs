//! Query engine
//!
//! Composes one query: store snapshot, retrieval, value extraction, context
//! assembly, generation and the answer guard. Read-only against the store, so
//! any number of queries may run concurrently.

use crate::assembler::{citation, AssembledContext, ContextAssembler};
use crate::errors::Result;
use crate::generator::{AnswerGenerator, ExtractiveGenerator, GenerationRequest};
use crate::guard::AnswerGuard;
use crate::language::Language;
use docforge_common::config::AppConfig;
use docforge_common::metrics::record_query;
use docforge_common::models::Chunk;
use docforge_common::store::ChunkStore;
use docforge_common::text::tokenize;
use docforge_search::{
    BoostSignal, Extraction, ExtractorRegistry, QueryIntent, Retriever, ScoredChunk, SearchRequest,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Found,
    NotFound,
}

/// One ranked chunk as reported to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub chunk_id: String,
    pub citation: String,
    pub final_score: f64,
    pub lexical_score: f64,
    pub boost_total: f64,
    pub boosts: Vec<BoostSignal>,
    pub is_table_chunk: bool,
}

impl From<&ScoredChunk> for SourceSummary {
    fn from(scored: &ScoredChunk) -> Self {
        Self {
            chunk_id: scored.chunk.id.clone(),
            citation: citation(&scored.chunk),
            final_score: scored.final_score,
            lexical_score: scored.lexical_score,
            boost_total: scored.boost_total(),
            boosts: scored.boosts.iter().map(|b| b.signal).collect(),
            is_table_chunk: scored.chunk.is_table_chunk,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryDiagnostics {
    pub intent: QueryIntent,
    pub expansions: u32,
    pub candidate_pool: usize,
    pub window: usize,
    pub context_tokens: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub status: AnswerStatus,
    pub language: Language,
    pub answer: String,
    pub extraction: Extraction,
    pub context: AssembledContext,
    pub sources: Vec<SourceSummary>,
    pub diagnostics: QueryDiagnostics,
}

impl QueryResponse {
    pub fn is_found(&self) -> bool {
        self.status == AnswerStatus::Found
    }
}

/// Decides whether the best chunk answers a query when no literal value was
/// extracted from it. The top chunk must reach the lexical score floor and
/// contain enough of the query's distinct content terms.
#[derive(Debug, Clone, Copy)]
pub struct EvidenceGate {
    score_floor: f64,
    min_term_coverage: f64,
}

impl EvidenceGate {
    pub fn new(score_floor: f64, min_term_coverage: f64) -> Self {
        Self {
            score_floor,
            min_term_coverage,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.retrieval.score_floor, config.context.min_term_coverage)
    }

    pub fn admits(&self, query: &str, top: &ScoredChunk) -> bool {
        let coverage = term_coverage(query, &top.chunk);
        let admitted = top.lexical_score >= self.score_floor && coverage >= self.min_term_coverage;
        if !admitted {
            debug!(
                chunk = %top.chunk.id,
                lexical_score = top.lexical_score,
                coverage,
                "Top chunk does not answer the query"
            );
        }
        admitted
    }
}

/// Share of the distinct content terms of `query` found in the chunk's text,
/// section path or table title. Zero when the query has no content terms.
pub fn term_coverage(query: &str, chunk: &Chunk) -> f64 {
    let mut evidence: BTreeSet<String> = tokenize(&chunk.text).into_iter().collect();
    for heading in chunk.section_path.iter().chain(chunk.table_title.iter()) {
        evidence.extend(tokenize(heading));
    }
    coverage(query, &evidence)
}

fn coverage(query: &str, evidence: &BTreeSet<String>) -> f64 {
    let wanted: BTreeSet<String> = tokenize(query).into_iter().collect();
    if wanted.is_empty() {
        return 0.0;
    }
    let matched = wanted.iter().filter(|t| evidence.contains(*t)).count();
    matched as f64 / wanted.len() as f64
}

pub struct QueryEngine {
    store: Arc<ChunkStore>,
    retriever: Retriever,
    registry: ExtractorRegistry,
    assembler: ContextAssembler,
    gate: EvidenceGate,
    generator: Arc<dyn AnswerGenerator>,
}

impl QueryEngine {
    pub fn new(
        store: Arc<ChunkStore>,
        retriever: Retriever,
        registry: ExtractorRegistry,
        assembler: ContextAssembler,
        gate: EvidenceGate,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            store,
            retriever,
            registry,
            assembler,
            gate,
            generator,
        }
    }

    /// Engine with the offline [`ExtractiveGenerator`].
    pub fn from_config(store: Arc<ChunkStore>, config: &AppConfig) -> Self {
        Self::new(
            store,
            Retriever::from_config(config),
            ExtractorRegistry::new(config.extraction.clone()),
            ContextAssembler::new(config.context.clone()),
            EvidenceGate::from_config(config),
            Arc::new(ExtractiveGenerator),
        )
    }

    pub fn with_generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Answer one query.
    ///
    /// Nothing relevant in the corpus is a `not_found` response carrying the
    /// refusal message, never an error. A document filter naming a document
    /// the store does not hold is an error.
    #[instrument(skip(self, request), fields(query = %request.query))]
    pub async fn answer(&self, request: SearchRequest) -> Result<QueryResponse> {
        let start = Instant::now();
        let language = Language::detect(&request.query);

        let snapshot = self.store.snapshot()?;
        if let Some(ids) = request.document_ids.as_deref() {
            snapshot.require_documents(ids)?;
        }
        let outcome = self.retriever.retrieve(&snapshot, &request);
        let extraction = self
            .registry
            .extract(&request.query, &outcome.intent, &outcome.results);
        let context = self.assembler.assemble(&outcome.results, Some(&extraction));

        let supported = !outcome.is_empty()
            && (extraction.extracted
                || outcome
                    .results
                    .first()
                    .is_some_and(|top| self.gate.admits(&request.query, top)));

        let (status, answer) = if !supported {
            (AnswerStatus::NotFound, language.refusal_message().to_string())
        } else {
            let generation = GenerationRequest {
                query: request.query.clone(),
                language,
                context: context.clone(),
                extraction: extraction.clone(),
            };
            let prose = self.generator.generate(&generation).await?;
            if !extraction.extracted && prose.trim() == language.refusal_message() {
                (AnswerStatus::NotFound, prose.trim().to_string())
            } else {
                (AnswerStatus::Found, AnswerGuard::finalize(&prose, &extraction))
            }
        };

        let elapsed = start.elapsed();
        record_query(elapsed.as_secs_f64(), outcome.expansions, status == AnswerStatus::Found);
        info!(
            status = ?status,
            language = %language,
            results = outcome.results.len(),
            extracted = extraction.extracted,
            duration_ms = elapsed.as_millis() as u64,
            "Query answered"
        );

        Ok(QueryResponse {
            query: request.query,
            status,
            language,
            answer,
            sources: outcome.results.iter().map(SourceSummary::from).collect(),
            diagnostics: QueryDiagnostics {
                intent: outcome.intent,
                expansions: outcome.expansions,
                candidate_pool: outcome.candidate_pool,
                window: outcome.window,
                context_tokens: context.token_count,
                duration_ms: elapsed.as_millis() as u64,
            },
            extraction,
            context,
        })
    }
}
