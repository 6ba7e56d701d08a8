//! Document and chunk models shared across DocForge crates

mod chunk;
mod element;

pub use chunk::{Chunk, DocumentFormat, DocumentRecord, PdfKind, SectionType};
pub use element::{DocumentElement, ElementKind, TableData, TableRow, ROOT_SECTION};
