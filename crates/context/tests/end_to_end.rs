//! Ingest-then-query scenarios over an in-memory chunk store.

use async_trait::async_trait;
use docforge_common::config::AppConfig;
use docforge_common::errors::AppError;
use docforge_common::store::ChunkStore;
use docforge_context::{
    AnswerGenerator, AnswerStatus, ContextError, GenerationRequest, Language, QueryEngine,
};
use docforge_ingestion::{IngestionProcessor, SourceDocument, SourceNode};
use docforge_search::{BoostSignal, Confidence, SearchRequest};
use std::sync::Arc;

fn plant_documents() -> Vec<SourceDocument> {
    vec![
        SourceDocument::new(
            "electrical",
            "electrical.html",
            vec![
                SourceNode::heading(1, "Overview"),
                SourceNode::paragraph(
                    "The grid connection voltage is coordinated with the utility during commissioning.",
                ),
                SourceNode::heading(1, "Electrical Characteristics"),
                SourceNode::table(vec![
                    vec!["Parameter", "Value", "Unit"],
                    vec!["Nominal Voltage", "1080", "V"],
                ]),
            ],
        ),
        SourceDocument::new(
            "layout",
            "layout.html",
            vec![
                SourceNode::heading(1, "Configuration"),
                SourceNode::paragraph("Substation 4 uses 27 x Sungrow SG350HX inverters"),
                SourceNode::heading(1, "Site"),
                SourceNode::paragraph("Substation 2 hosts the control building and the spare parts store."),
            ],
        ),
        SourceDocument::new(
            "design",
            "design.html",
            vec![
                SourceNode::heading(1, "Design Parameters"),
                SourceNode::paragraph("DC/AC Ratio (@40ºC) 1,424"),
            ],
        ),
        SourceDocument::new(
            "ratings",
            "ratings.html",
            vec![
                SourceNode::heading(1, "Summer Rating"),
                SourceNode::paragraph("Design DC/AC ratio 1.291 @30°C for the summer rating."),
                SourceNode::heading(1, "Peak Rating"),
                SourceNode::paragraph("Peak DC/AC ratio 1.420 @40°C for the peak rating."),
            ],
        ),
    ]
}

fn ingested_store(config: &AppConfig) -> Arc<ChunkStore> {
    let store = Arc::new(ChunkStore::new());
    let processor = IngestionProcessor::new(Arc::clone(&store), config);
    for document in plant_documents() {
        processor.ingest_source(document).unwrap();
    }
    store
}

fn engine() -> QueryEngine {
    let config = AppConfig::default();
    QueryEngine::from_config(ingested_store(&config), &config)
}

#[tokio::test]
async fn nominal_voltage_table_ranks_first() {
    let response = engine()
        .answer(SearchRequest::new("What is the nominal voltage?"))
        .await
        .unwrap();

    assert_eq!(response.status, AnswerStatus::Found);
    let top = &response.sources[0];
    assert!(top.is_table_chunk);
    assert!(top.citation.contains("Electrical Characteristics"));
    assert!(top.boosts.contains(&BoostSignal::EntityMatch));

    assert!(response.extraction.extracted);
    assert_eq!(response.extraction.value.as_deref(), Some("1080"));
    assert_eq!(response.extraction.unit.as_deref(), Some("V"));
    assert!(response.answer.contains("1080 V"));
}

#[tokio::test]
async fn substation_inverter_count_ranks_top() {
    let response = engine()
        .answer(SearchRequest::new("How many inverters are installed in Substation 4?"))
        .await
        .unwrap();

    assert_eq!(response.status, AnswerStatus::Found);
    let top = &response.sources[0];
    assert!(top.citation.starts_with("[Source: layout.html, Configuration"));
    assert!(top.boosts.contains(&BoostSignal::SectionTitle));
    assert!(response.answer.contains("27 x Sungrow SG350HX"));
}

#[tokio::test]
async fn ratio_extraction_keeps_every_digit() {
    let response = engine()
        .answer(
            SearchRequest::new("What is the DC/AC ratio at substation X at 40°C?")
                .with_documents(vec!["design".into()]),
        )
        .await
        .unwrap();

    let extraction = &response.extraction;
    assert!(extraction.extracted);
    assert_eq!(extraction.value.as_deref(), Some("1.424"));
    assert!(response.answer.contains("1.424"));
    assert!(response
        .context
        .render()
        .starts_with("[Extracted value] 1.424 (@40°C)"));
}

#[tokio::test]
async fn temperature_qualifier_picks_matching_ratio() {
    let response = engine()
        .answer(SearchRequest::new("What is the DC/AC ratio @30°C?").with_documents(vec!["ratings".into()]))
        .await
        .unwrap();

    assert_eq!(response.extraction.value.as_deref(), Some("1.291"));
    assert_eq!(response.extraction.unit.as_deref(), Some("@30°C"));
    assert_eq!(response.extraction.confidence, Confidence::High);
}

#[tokio::test]
async fn empty_corpus_is_not_found() {
    let config = AppConfig::default();
    let engine = QueryEngine::from_config(Arc::new(ChunkStore::new()), &config);

    let response = engine
        .answer(SearchRequest::new("What is the nominal voltage?"))
        .await
        .unwrap();
    assert_eq!(response.status, AnswerStatus::NotFound);
    assert_eq!(response.language, Language::English);
    assert_eq!(response.answer, Language::English.refusal_message());
    assert!(!response.extraction.extracted);
    assert!(response.sources.is_empty());
}

#[tokio::test]
async fn turkish_query_gets_turkish_refusal() {
    let response = engine()
        .answer(SearchRequest::new("Bu tesisin sigorta poliçesi nedir?"))
        .await
        .unwrap();

    assert_eq!(response.status, AnswerStatus::NotFound);
    assert_eq!(response.language, Language::Turkish);
    assert_eq!(response.answer, Language::Turkish.refusal_message());
}

#[tokio::test]
async fn document_filter_excludes_other_documents() {
    let response = engine()
        .answer(SearchRequest::new("DC/AC ratio").with_documents(vec!["electrical".into()]))
        .await
        .unwrap();
    assert_eq!(response.status, AnswerStatus::NotFound);
}

#[tokio::test]
async fn unrelated_query_is_not_found() {
    let response = engine()
        .answer(SearchRequest::new("What is the warranty period for the spare parts?"))
        .await
        .unwrap();

    // The Site chunk shares "spare parts" but says nothing about a warranty.
    assert!(!response.sources.is_empty());
    assert!(!response.extraction.extracted);
    assert_eq!(response.status, AnswerStatus::NotFound);
    assert_eq!(response.answer, Language::English.refusal_message());
}

#[tokio::test]
async fn unknown_document_filter_is_an_error() {
    let result = engine()
        .answer(SearchRequest::new("What is the nominal voltage?").with_documents(vec!["missing".into()]))
        .await;
    assert!(matches!(
        result,
        Err(ContextError::Store(AppError::DocumentNotFound { ref id })) if id == "missing"
    ));
}

/// Generator that rounds the number it was given.
struct RoundingGenerator;

#[async_trait]
impl AnswerGenerator for RoundingGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, ContextError> {
        Ok("The DC/AC ratio is about 1.42 at 40°C.".into())
    }
}

#[tokio::test]
async fn guard_restores_value_omitted_by_generator() {
    let response = engine()
        .with_generator(Arc::new(RoundingGenerator))
        .answer(SearchRequest::new("What is the DC/AC ratio at 40°C?").with_documents(vec!["design".into()]))
        .await
        .unwrap();

    assert_eq!(response.status, AnswerStatus::Found);
    assert!(response.answer.starts_with("1.424 (@40°C)"));
    assert!(response.answer.ends_with("about 1.42 at 40°C."));
}

struct FailingGenerator;

#[async_trait]
impl AnswerGenerator for FailingGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, ContextError> {
        Err(ContextError::Generation {
            message: "upstream timeout".into(),
        })
    }
}

#[tokio::test]
async fn generator_failure_surfaces_as_error() {
    let result = engine()
        .with_generator(Arc::new(FailingGenerator))
        .answer(SearchRequest::new("What is the nominal voltage?"))
        .await;
    assert!(matches!(result, Err(ContextError::Generation { .. })));
}

#[tokio::test]
async fn concurrent_queries_agree() {
    let engine = Arc::new(engine());
    let queries = (0..8).map(|_| {
        let engine = Arc::clone(&engine);
        async move {
            engine
                .answer(SearchRequest::new("How many inverters are installed in Substation 4?"))
                .await
                .unwrap()
        }
    });
    let responses = futures::future::join_all(queries).await;

    let first: Vec<&str> = responses[0].sources.iter().map(|s| s.chunk_id.as_str()).collect();
    for response in &responses[1..] {
        let ids: Vec<&str> = response.sources.iter().map(|s| s.chunk_id.as_str()).collect();
        assert_eq!(ids, first);
    }
}

#[tokio::test]
async fn saved_store_answers_after_reload() {
    let config = AppConfig::default();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chunks.json");
    ingested_store(&config).save(&path).unwrap();

    let reopened = Arc::new(ChunkStore::open(&path).unwrap());
    let response = QueryEngine::from_config(reopened, &config)
        .answer(SearchRequest::new("What is the nominal voltage?"))
        .await
        .unwrap();
    assert_eq!(response.extraction.value.as_deref(), Some("1080"));
}
