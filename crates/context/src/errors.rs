//! Query path error types
//!
//! Empty corpora, low scores and failed extraction are outcomes, not
//! errors. Infrastructure faults and document filters naming an unknown
//! document end up here.

use docforge_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Chunk store error: {0}")]
    Store(#[from] AppError),

    /// The answer generator failed or returned nothing usable.
    #[error("Answer generation failed: {message}")]
    Generation { message: String },
}

pub type Result<T> = std::result::Result<T, ContextError>;
