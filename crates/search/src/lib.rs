//! DocForge Search Library
//!
//! Query-time core, read-only against a chunk store snapshot:
//! - BM25 lexical scoring with a weighted section-title field
//! - Query intent detection over the closed tag vocabulary
//! - Additive signal re-ranking with bounded window expansion
//! - Deterministic value extraction (ratio, voltage, capacity, temperature)

pub mod extraction;
pub mod retrieval;

pub use extraction::{Confidence, Extraction, ExtractionKind, ExtractorRegistry, Qualifiers};
pub use retrieval::{
    Boost, BoostSignal, LexicalScorer, QueryIntent, RetrievalOutcome, Retriever, ScoredChunk,
    SearchRequest, SignalBooster,
};

#[cfg(test)]
pub(crate) mod test_support {
    use docforge_common::models::{Chunk, ElementKind, TableData, TableRow};
    use docforge_common::text::estimate_tokens;
    use docforge_common::vocabulary::{detect_entity_types, detect_units};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    /// Plain prose chunk of document `doc` under a single-level section.
    pub fn chunk(index: usize, section: &str, text: &str) -> Arc<Chunk> {
        Arc::new(Chunk {
            id: Chunk::make_id("doc", index),
            document_id: "doc".into(),
            source_document_name: "doc.html".into(),
            chunk_index: index,
            text: text.into(),
            section_title: section.into(),
            section_path: vec![section.into()],
            section_type: None,
            element_types: BTreeSet::from([ElementKind::Paragraph]),
            is_table_chunk: false,
            is_list_chunk: false,
            is_atomic: false,
            table_title: None,
            entity_types: BTreeSet::new(),
            units: BTreeSet::new(),
            token_count: estimate_tokens(text),
            page: None,
            sheet: None,
            row_index: None,
            element_start: index,
            element_end: index + 1,
            table: None,
        })
    }

    /// Atomic table chunk with tags detected from its cells.
    pub fn table_chunk(index: usize, section: &str, headers: &[&str], rows: &[&[&str]]) -> Arc<Chunk> {
        let mut cells: Vec<&str> = headers.to_vec();
        cells.extend(rows.iter().flat_map(|r| r.iter().copied()));
        let all_text = cells.join(" ");

        let table = TableData {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, r)| TableRow {
                    source_row: i + 1,
                    values: r.iter().map(|v| v.to_string()).collect(),
                })
                .collect(),
            table_title: None,
            entity_types: detect_entity_types(&all_text),
            units: cells.iter().flat_map(|c| detect_units(c)).collect(),
        };
        let text = table.render();

        let mut c = (*chunk(index, section, &text)).clone();
        c.element_types = BTreeSet::from([ElementKind::Table]);
        c.is_table_chunk = true;
        c.is_atomic = true;
        c.entity_types = table.entity_types.clone();
        c.units = table.units.clone();
        c.table = Some(table);
        Arc::new(c)
    }
}
