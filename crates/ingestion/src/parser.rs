//! Structural parsing
//!
//! Walks a [`SourceDocument`] depth-first and emits the ordered
//! [`DocumentElement`] sequence. Section provenance comes from an explicit
//! [`HeadingStack`] owned by each parse call, so documents can be parsed
//! concurrently.

use crate::errors::IngestionError;
use crate::source::{SourceDocument, SourceNode};
use crate::tables::TableExtractor;
use docforge_common::models::{DocumentElement, ElementKind, ROOT_SECTION};
use docforge_common::text::collapse_whitespace;
use tracing::{debug, instrument};

/// Deepest container nesting accepted before the tree is considered malformed.
pub const MAX_NESTING_DEPTH: usize = 64;

const MAX_HEADING_LEVEL: u8 = 6;

#[derive(Debug, Clone)]
struct HeadingEntry {
    level: u8,
    title: String,
}

/// Open headings from the document root to the current position.
#[derive(Debug, Clone, Default)]
pub struct HeadingStack {
    entries: Vec<HeadingEntry>,
}

impl HeadingStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close every open heading at `level` or deeper, then open this one.
    pub fn push(&mut self, level: u8, title: &str) {
        while let Some(last) = self.entries.last() {
            if last.level >= level {
                self.entries.pop();
            } else {
                break;
            }
        }
        self.entries.push(HeadingEntry {
            level,
            title: title.to_string(),
        });
    }

    /// Titles from root to top; the synthetic root marker when empty.
    pub fn path(&self) -> Vec<String> {
        if self.entries.is_empty() {
            return vec![ROOT_SECTION.to_string()];
        }
        self.entries.iter().map(|e| e.title.clone()).collect()
    }

    pub fn title(&self) -> String {
        self.entries
            .last()
            .map(|e| e.title.clone())
            .unwrap_or_else(|| ROOT_SECTION.to_string())
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, Default)]
struct Provenance {
    page: Option<u32>,
    sheet: Option<String>,
}

struct ParseState {
    stack: HeadingStack,
    elements: Vec<DocumentElement>,
    next_list_id: usize,
}

impl ParseState {
    fn push(&mut self, kind: ElementKind, text: String, heading_level: Option<u8>, at: &Provenance) -> &mut DocumentElement {
        let index = self.elements.len();
        self.elements.push(DocumentElement {
            kind,
            text,
            section_title: self.stack.title(),
            section_path: self.stack.path(),
            heading_level,
            index,
            page: at.page,
            sheet: at.sheet.clone(),
            list_id: None,
            table: None,
        });
        &mut self.elements[index]
    }
}

pub struct StructuralParser {
    tables: TableExtractor,
    caption_lookback: usize,
}

impl StructuralParser {
    pub fn new(caption_lookback: usize) -> Self {
        Self {
            tables: TableExtractor::new(caption_lookback),
            caption_lookback,
        }
    }

    /// Parse a document tree into its element sequence.
    ///
    /// A tree with no headings and no tables is valid and yields paragraphs
    /// under the root section.
    #[instrument(skip(self, document), fields(document = %document.name))]
    pub fn parse(&self, document: &SourceDocument) -> Result<Vec<DocumentElement>, IngestionError> {
        let mut state = ParseState {
            stack: HeadingStack::new(),
            elements: Vec::new(),
            next_list_id: 0,
        };

        self.walk(&document.nodes, &Provenance::default(), 0, &mut state)
            .map_err(|message| IngestionError::StructuralParse {
                document: document.name.clone(),
                message,
            })?;

        debug!(
            element_count = state.elements.len(),
            tables = state.elements.iter().filter(|e| e.is_table()).count(),
            "Document parsed"
        );
        Ok(state.elements)
    }

    fn walk(
        &self,
        nodes: &[SourceNode],
        at: &Provenance,
        depth: usize,
        state: &mut ParseState,
    ) -> Result<(), String> {
        if depth > MAX_NESTING_DEPTH {
            return Err(format!("nesting exceeds {} levels", MAX_NESTING_DEPTH));
        }

        for (position, node) in nodes.iter().enumerate() {
            match node {
                SourceNode::Heading { level, text } => {
                    if *level == 0 || *level > MAX_HEADING_LEVEL {
                        return Err(format!("invalid heading level {} for {:?}", level, text));
                    }
                    let text = collapse_whitespace(text);
                    if text.is_empty() {
                        continue;
                    }
                    state.stack.push(*level, &text);
                    state.push(ElementKind::Heading, text, Some(*level), at);
                }
                SourceNode::Paragraph { text } => {
                    let text = collapse_whitespace(text);
                    if !text.is_empty() {
                        state.push(ElementKind::Paragraph, text, None, at);
                    }
                }
                SourceNode::List { ordered, items } => {
                    let list_id = state.next_list_id;
                    state.next_list_id += 1;
                    let items = items.iter().map(|i| collapse_whitespace(i)).filter(|i| !i.is_empty());
                    for (n, item) in items.enumerate() {
                        let text = if *ordered {
                            format!("{}. {}", n + 1, item)
                        } else {
                            format!("- {}", item)
                        };
                        state.push(ElementKind::ListItem, text, None, at).list_id = Some(list_id);
                    }
                }
                SourceNode::Table {
                    rows,
                    has_header,
                    caption,
                } => {
                    let preceding: Vec<&str> = nodes[..position]
                        .iter()
                        .rev()
                        .take(self.caption_lookback)
                        .filter_map(SourceNode::paragraph_text)
                        .collect();
                    let Some(table) = self.tables.extract(rows, *has_header, caption.as_deref(), &preceding) else {
                        continue;
                    };
                    let element = state.push(ElementKind::Table, table.render(), None, at);
                    element.table = Some(table);
                }
                SourceNode::Container {
                    label,
                    page,
                    sheet,
                    children,
                } => {
                    let inner = Provenance {
                        page: page.or(at.page),
                        sheet: sheet.clone().or_else(|| at.sheet.clone()),
                    };
                    if let Some(label) = label {
                        debug!(label = %label, depth, "Entering container");
                    }
                    self.walk(children, &inner, depth + 1, state)?;
                }
            }
        }
        Ok(())
    }
}
