//! HTML loader
//!
//! Keeps the block structure of the markup: `h1`-`h6` become headings,
//! `ul`/`ol` lists, `table` tables (with `caption`), and everything else that
//! carries text becomes paragraphs. Layout containers are walked through.
//! Word documents exported to HTML go through this loader as well.

use crate::source::SourceNode;
use docforge_common::text::collapse_whitespace;
use scraper::{ElementRef, Html, Selector};

const SKIPPED_TAGS: &[&str] = &["script", "style", "template", "noscript", "svg", "nav", "head", "iframe"];
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "data", "em", "font", "i", "kbd", "mark", "q",
    "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var", "wbr",
];
const TEXT_BLOCK_TAGS: &[&str] = &["p", "blockquote", "pre", "figcaption", "dt", "dd", "address", "summary"];

pub struct HtmlLoader {
    body: Selector,
    row: Selector,
    caption: Selector,
}

impl Default for HtmlLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlLoader {
    pub fn new() -> Self {
        Self {
            body: Selector::parse("body").expect("body selector"),
            row: Selector::parse("tr").expect("row selector"),
            caption: Selector::parse("caption").expect("caption selector"),
        }
    }

    pub fn parse(&self, html: &str) -> Vec<SourceNode> {
        let document = Html::parse_document(html);
        let root = document
            .select(&self.body)
            .next()
            .unwrap_or_else(|| document.root_element());
        self.collect_children(root)
    }

    /// Block nodes among `element`'s children. Loose text and inline
    /// elements between blocks are gathered into paragraphs.
    fn collect_children(&self, element: ElementRef<'_>) -> Vec<SourceNode> {
        let mut out = Vec::new();
        let mut inline = String::new();

        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                inline.push_str(text);
                continue;
            }
            let Some(child) = ElementRef::wrap(child) else {
                continue;
            };
            let tag = child.value().name();
            if SKIPPED_TAGS.contains(&tag) {
                continue;
            }
            if tag == "br" {
                inline.push(' ');
            } else if INLINE_TAGS.contains(&tag) {
                inline.push_str(&raw_text(child));
            } else {
                flush_inline(&mut inline, &mut out);
                out.extend(self.block(child));
            }
        }
        flush_inline(&mut inline, &mut out);
        out
    }

    fn block(&self, element: ElementRef<'_>) -> Vec<SourceNode> {
        let tag = element.value().name();
        if let Some(level) = heading_level(tag) {
            let text = element_text(element);
            return if text.is_empty() {
                Vec::new()
            } else {
                vec![SourceNode::heading(level, text)]
            };
        }
        if TEXT_BLOCK_TAGS.contains(&tag) {
            let text = element_text(element);
            return if text.is_empty() {
                Vec::new()
            } else {
                vec![SourceNode::paragraph(text)]
            };
        }
        match tag {
            "ul" | "ol" => {
                let mut items = Vec::new();
                list_items(element, &mut items);
                if items.is_empty() {
                    Vec::new()
                } else {
                    vec![SourceNode::List {
                        ordered: tag == "ol",
                        items,
                    }]
                }
            }
            "table" => vec![self.table(element)],
            _ => self.collect_children(element),
        }
    }

    fn table(&self, table: ElementRef<'_>) -> SourceNode {
        let rows = table
            .select(&self.row)
            .filter(|row| owning_table(*row).map(|t| t.id()) == Some(table.id()))
            .map(|row| {
                row.children()
                    .filter_map(ElementRef::wrap)
                    .filter(|cell| matches!(cell.value().name(), "td" | "th"))
                    .map(element_text)
                    .collect::<Vec<_>>()
            })
            .collect();

        let caption = table
            .select(&self.caption)
            .next()
            .map(element_text)
            .filter(|c| !c.is_empty());

        SourceNode::Table {
            rows,
            has_header: true,
            caption,
        }
    }
}

/// Parse an HTML document into its source tree.
pub fn parse_html(html: &str) -> Vec<SourceNode> {
    HtmlLoader::new().parse(html)
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn owning_table(row: ElementRef<'_>) -> Option<ElementRef<'_>> {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "table")
}

/// List items in document order; nested lists follow their parent item.
fn list_items(list: ElementRef<'_>, items: &mut Vec<String>) {
    for li in list.children().filter_map(ElementRef::wrap) {
        if li.value().name() != "li" {
            continue;
        }
        let mut own = String::new();
        let mut nested = Vec::new();
        for child in li.children() {
            if let Some(text) = child.value().as_text() {
                own.push_str(text);
            } else if let Some(el) = ElementRef::wrap(child) {
                match el.value().name() {
                    "ul" | "ol" => nested.push(el),
                    _ => {
                        own.push(' ');
                        own.push_str(&raw_text(el));
                    }
                }
            }
        }
        let own = collapse_whitespace(&own);
        if !own.is_empty() {
            items.push(own);
        }
        for sub in nested {
            list_items(sub, items);
        }
    }
}

fn raw_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&raw_text(element))
}

fn flush_inline(inline: &mut String, out: &mut Vec<SourceNode>) {
    let text = collapse_whitespace(inline);
    if !text.is_empty() {
        out.push(SourceNode::paragraph(text));
    }
    inline.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_paragraphs_and_tables() {
        let nodes = parse_html(
            r#"<html><head><title>x</title><style>p{}</style></head><body>
            <h1>Design</h1>
            <div class="wrap">
              <h2>Electrical Characteristics</h2>
              <p>Values at <b>STC</b>.</p>
              <table>
                <caption>Table 3 Inverter</caption>
                <tr><th>Parameter</th><th>Value</th><th>Unit</th></tr>
                <tr><td>Nominal Voltage</td><td>1080</td><td>V</td></tr>
              </table>
            </div>
            <script>var x = 1;</script>
            </body></html>"#,
        );

        assert_eq!(nodes[0], SourceNode::heading(1, "Design"));
        assert_eq!(nodes[1], SourceNode::heading(2, "Electrical Characteristics"));
        assert_eq!(nodes[2], SourceNode::paragraph("Values at STC."));
        match &nodes[3] {
            SourceNode::Table { rows, caption, .. } => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[1], vec!["Nominal Voltage", "1080", "V"]);
                assert_eq!(caption.as_deref(), Some("Table 3 Inverter"));
            }
            other => panic!("expected table, got {:?}", other),
        }
        assert_eq!(nodes.len(), 4);
    }

    #[test]
    fn test_nested_lists_flatten_in_order() {
        let nodes = parse_html("<ul><li>one<ul><li>one.a</li></ul></li><li>two</li></ul>");
        assert_eq!(
            nodes,
            vec![SourceNode::List {
                ordered: false,
                items: vec!["one".into(), "one.a".into(), "two".into()],
            }]
        );
    }

    #[test]
    fn test_loose_text_becomes_paragraph() {
        let nodes = parse_html("<div>Loose <em>text</em><br>here<p>Block</p>tail</div>");
        assert_eq!(
            nodes,
            vec![
                SourceNode::paragraph("Loose text here"),
                SourceNode::paragraph("Block"),
                SourceNode::paragraph("tail"),
            ]
        );
    }

    #[test]
    fn test_nested_table_rows_stay_with_their_table() {
        let nodes = parse_html(
            "<table><tr><th>A</th></tr><tr><td><table><tr><td>inner</td></tr></table></td></tr></table>",
        );
        match &nodes[0] {
            SourceNode::Table { rows, .. } => assert_eq!(rows.len(), 2),
            other => panic!("expected table, got {:?}", other),
        }
    }
}
