//! Section-aware segmentation
//!
//! Groups the element stream into chunks:
//! - a section path change always closes the pending chunk first
//! - a table closes the pending chunk and becomes its own atomic chunk
//! - a list that fits the list ceiling stays whole (atomic), together with
//!   its introductory text when that also fits
//! - an oversized list is split between items, never inside one
//! - anything else accumulates until the token ceiling would be exceeded
//!
//! Every element lands in exactly one chunk, in order.

use docforge_common::config::SegmenterConfig;
use docforge_common::models::{Chunk, DocumentElement, ElementKind, SectionType};
use docforge_common::text::{estimate_tokens, fold_case, has_numeric_token};
use docforge_common::vocabulary::{detect_entity_types, detect_units};
use std::collections::BTreeSet;
use tracing::debug;

const REFERENCE_TITLES: &[&str] = &["references", "bibliography", "kaynaklar", "kaynakça"];
const TOC_TITLES: &[&str] = &["contents", "table of contents", "içindekiler"];

/// Identity of the document being segmented.
#[derive(Debug, Clone)]
pub struct DocumentRef<'a> {
    pub document_id: &'a str,
    pub name: &'a str,
}

pub struct Segmenter {
    max_tokens: usize,
    list_max_tokens: usize,
}

/// Elements waiting to be emitted as one chunk.
#[derive(Default)]
struct Pending<'e> {
    elements: Vec<&'e DocumentElement>,
    tokens: usize,
}

impl<'e> Pending<'e> {
    fn push(&mut self, element: &'e DocumentElement) {
        self.tokens += element_tokens(element);
        self.elements.push(element);
    }

    fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn section_path(&self) -> Option<&[String]> {
        self.elements.first().map(|e| e.section_path.as_slice())
    }

    fn take(&mut self) -> Vec<&'e DocumentElement> {
        self.tokens = 0;
        std::mem::take(&mut self.elements)
    }
}

struct Emitter<'a> {
    document: DocumentRef<'a>,
    chunks: Vec<Chunk>,
}

impl Segmenter {
    pub fn new(config: &SegmenterConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            list_max_tokens: config.list_max_tokens.min(config.max_tokens),
        }
    }

    /// Segment one document's elements. Deterministic for identical input.
    pub fn segment(&self, document: DocumentRef<'_>, elements: &[DocumentElement]) -> Vec<Chunk> {
        let mut out = Emitter {
            document,
            chunks: Vec::new(),
        };
        let mut pending = Pending::default();
        let mut i = 0;

        while i < elements.len() {
            let element = &elements[i];

            if element.is_table() {
                out.flush(&mut pending);
                out.emit(&[element], true);
                i += 1;
                continue;
            }

            if let (true, Some(list_id)) = (element.is_list_item(), element.list_id) {
                let end = elements[i..]
                    .iter()
                    .position(|e| e.list_id != Some(list_id))
                    .map_or(elements.len(), |n| i + n);
                self.place_list(&elements[i..end], &mut pending, &mut out);
                i = end;
                continue;
            }

            let tokens = element_tokens(element);
            let section_changed = pending
                .section_path()
                .is_some_and(|p| p != element.section_path.as_slice());
            if section_changed || (!pending.is_empty() && pending.tokens + tokens > self.max_tokens) {
                out.flush(&mut pending);
            }
            pending.push(element);
            i += 1;
        }
        out.flush(&mut pending);

        debug!(
            document = %out.document.document_id,
            element_count = elements.len(),
            chunk_count = out.chunks.len(),
            max_tokens = self.max_tokens,
            "Document segmented"
        );
        out.chunks
    }

    fn place_list<'e>(&self, items: &'e [DocumentElement], pending: &mut Pending<'e>, out: &mut Emitter<'_>) {
        let list_tokens: usize = items.iter().map(element_tokens).sum();
        let same_section = pending.section_path() == Some(items[0].section_path.as_slice());
        if !same_section {
            out.flush(pending);
        }

        if list_tokens <= self.list_max_tokens {
            if !pending.is_empty() && pending.tokens + list_tokens <= self.max_tokens {
                let mut group = pending.take();
                group.extend(items.iter());
                out.emit(&group, true);
                return;
            }

            // Keep at least the sentence right before the list with it.
            let intro = pending
                .elements
                .last()
                .filter(|e| e.kind == ElementKind::Paragraph)
                .filter(|e| element_tokens(e) + list_tokens <= self.max_tokens)
                .copied();
            let mut group = Vec::with_capacity(items.len() + 1);
            if let Some(intro) = intro {
                pending.elements.pop();
                pending.tokens -= element_tokens(intro);
                group.push(intro);
            }
            out.flush(pending);
            group.extend(items.iter());
            out.emit(&group, true);
            return;
        }

        // Oversized list: split between items, opening with its intro.
        let intro = pending
            .elements
            .last()
            .filter(|e| e.kind == ElementKind::Paragraph)
            .copied();
        if let Some(intro) = intro {
            pending.elements.pop();
            pending.tokens -= element_tokens(intro);
        }
        out.flush(pending);
        if let Some(intro) = intro {
            pending.push(intro);
        }
        for item in items {
            let tokens = element_tokens(item);
            if !pending.is_empty() && pending.tokens + tokens > self.max_tokens {
                out.flush(pending);
            }
            pending.push(item);
        }
        out.flush(pending);
    }
}

impl<'a> Emitter<'a> {
    fn flush(&mut self, pending: &mut Pending<'_>) {
        if pending.is_empty() {
            return;
        }
        let elements = pending.take();
        self.emit(&elements, false);
    }

    fn emit(&mut self, elements: &[&DocumentElement], atomic: bool) {
        let chunk_index = self.chunks.len();
        let chunk = build_chunk(&self.document, chunk_index, elements, atomic);
        self.chunks.push(chunk);
    }
}

fn element_tokens(element: &DocumentElement) -> usize {
    estimate_tokens(&element.text)
}

fn build_chunk(
    document: &DocumentRef<'_>,
    chunk_index: usize,
    elements: &[&DocumentElement],
    atomic: bool,
) -> Chunk {
    let first = elements[0];
    let last = elements[elements.len() - 1];
    let text = elements
        .iter()
        .map(|e| e.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let element_types: BTreeSet<ElementKind> = elements.iter().map(|e| e.kind).collect();
    let table = elements.iter().find_map(|e| e.table.clone());
    let is_table_chunk = table.is_some();

    let (entity_types, units) = match &table {
        Some(t) => (t.entity_types.clone(), t.units.clone()),
        // Prose only carries a category when it also states a number.
        None if has_numeric_token(&text) => (detect_entity_types(&text), detect_units(&text)),
        None => (BTreeSet::new(), detect_units(&text)),
    };

    Chunk {
        id: Chunk::make_id(document.document_id, chunk_index),
        document_id: document.document_id.to_string(),
        source_document_name: document.name.to_string(),
        chunk_index,
        token_count: elements.iter().map(|e| element_tokens(e)).sum(),
        section_title: first.section_title.clone(),
        section_path: first.section_path.clone(),
        section_type: classify_section(chunk_index, &first.section_title, is_table_chunk),
        is_list_chunk: element_types.contains(&ElementKind::ListItem),
        is_table_chunk,
        is_atomic: atomic,
        table_title: table.as_ref().and_then(|t| t.table_title.clone()),
        row_index: table.as_ref().and_then(|t| t.rows.first()).map(|r| r.source_row),
        entity_types,
        units,
        page: first.page,
        sheet: first.sheet.clone(),
        element_start: first.index,
        element_end: last.index + 1,
        element_types,
        text,
        table,
    }
}

fn classify_section(chunk_index: usize, section_title: &str, is_table: bool) -> Option<SectionType> {
    if is_table {
        return Some(SectionType::Table);
    }
    let title = fold_case(section_title);
    let title = title.trim();
    if REFERENCE_TITLES.iter().any(|t| title.ends_with(t)) {
        Some(SectionType::References)
    } else if TOC_TITLES.contains(&title) {
        Some(SectionType::Toc)
    } else if chunk_index == 0 {
        Some(SectionType::Title)
    } else {
        None
    }
}
