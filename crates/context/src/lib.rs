//! DocForge Context Library
//!
//! Answer side of the query path:
//! - Citation-tagged context assembly under a token budget
//! - Answer guard anchoring extracted values verbatim
//! - EN/TR language detection and refusal messages
//! - `QueryEngine` facade over retrieval, extraction and generation

pub mod assembler;
pub mod engine;
pub mod errors;
pub mod generator;
pub mod guard;
pub mod language;

pub use assembler::{AssembledContext, ContextAssembler, Excerpt};
pub use engine::{AnswerStatus, EvidenceGate, QueryEngine, QueryResponse, SourceSummary};
pub use errors::{ContextError, Result};
pub use generator::{AnswerGenerator, ExtractiveGenerator, GenerationRequest};
pub use guard::AnswerGuard;
pub use language::Language;
