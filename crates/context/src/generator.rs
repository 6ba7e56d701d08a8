//! Answer generation boundary
//!
//! The LLM client lives outside this workspace. It plugs in through
//! [`AnswerGenerator`]; [`ExtractiveGenerator`] is the offline stand-in that
//! answers from the context alone.

use crate::assembler::AssembledContext;
use crate::errors::Result;
use crate::language::Language;
use async_trait::async_trait;
use docforge_search::Extraction;
use serde::{Deserialize, Serialize};

/// Everything a generator may use to phrase an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub query: String,
    pub language: Language,
    pub context: AssembledContext,
    pub extraction: Extraction,
}

impl GenerationRequest {
    /// Prompt text for a chat-completion style model.
    pub fn prompt(&self) -> String {
        let language_instruction = match self.language {
            Language::English => "Answer in English.",
            Language::Turkish => "Answer in Turkish.",
        };
        let value_instruction = match self.extraction.literal() {
            Some(literal) if self.extraction.extracted => format!(
                "The value {} was extracted from the records. Quote it exactly; do not round or convert it.\n",
                literal
            ),
            _ => String::new(),
        };

        format!(
            "Answer the question using ONLY the excerpts below and cite the [Source: ...] tags you used. \
            If the excerpts do not contain the answer, reply exactly: \"{}\"\n\
            {}\n{}\n\
            Question: {}\n\n\
            Excerpts:\n{}\n\n\
            Answer:",
            self.language.refusal_message(),
            language_instruction,
            value_instruction,
            self.query,
            self.context.render()
        )
    }
}

/// Phrases an answer from assembled context.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Offline generator: the extracted value with its citation, otherwise the
/// top excerpt quoted under its citation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractiveGenerator;

#[async_trait]
impl AnswerGenerator for ExtractiveGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let top = request.context.excerpts.first();

        if request.extraction.extracted {
            if let Some(literal) = request.extraction.literal() {
                let source = request
                    .extraction
                    .source_chunk_id
                    .as_deref()
                    .and_then(|id| request.context.excerpts.iter().find(|e| e.chunk_id == id))
                    .or(top)
                    .map(|e| e.citation.as_str())
                    .unwrap_or_default();
                return Ok(format!("{} {}", literal, source).trim_end().to_string());
            }
        }

        Ok(top
            .map(|e| format!("{}\n{}", e.citation, e.text))
            .unwrap_or_else(|| request.language.refusal_message().to_string()))
    }
}
