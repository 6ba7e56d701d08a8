//! DocForge Common Library
//!
//! Shared code for all DocForge crates including:
//! - Document element and chunk models
//! - Closed entity/unit tag vocabulary
//! - Unicode-aware tokenization
//! - In-process chunk store with atomic document replacement
//! - Error types and handling
//! - Configuration management
//! - Metrics and tracing bootstrap

pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod store;
pub mod telemetry;
pub mod text;
pub mod vocabulary;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use models::{Chunk, DocumentElement, DocumentRecord, ElementKind, TableData};
pub use store::{ChunkStore, StoreSnapshot};
pub use vocabulary::{EntityType, Unit};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
