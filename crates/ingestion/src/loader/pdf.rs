//! PDF loader
//!
//! Reads page content streams with lopdf and rebuilds text lines from the
//! text-showing operators. Each page becomes a container carrying its page
//! number; lines are grouped into headings, bullet lists and paragraphs.

use crate::errors::IngestionError;
use crate::source::SourceNode;
use docforge_common::models::PdfKind;
use docforge_common::text::collapse_whitespace;
use regex_lite::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Pages with fewer non-whitespace characters than this are treated as
/// image-only.
const SCANNED_PAGE_CHARS: usize = 50;
const MAX_HEADING_CHARS: usize = 100;
const MAX_HEADING_WORDS: usize = 12;
/// TJ kerning offsets at or below this (thousandths of an em) are word gaps.
const KERNING_SPACE: f32 = -200.0;

const BULLETS: &[char] = &['•', '▪', '◦', '·', '-', '–', '*', '●'];

pub struct LoadedPdf {
    pub kind: PdfKind,
    pub nodes: Vec<SourceNode>,
}

/// Load a PDF from memory. `name` is used for error reporting only.
pub fn load_pdf(bytes: &[u8], name: &str) -> Result<LoadedPdf, IngestionError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| IngestionError::Load {
        path: name.to_string(),
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    debug!(page_count = pages.len(), "Extracting text from PDF");

    let mut nodes = Vec::new();
    let mut sparse_pages = 0;
    let mut total_chars = 0;

    for (page_number, page_id) in pages.iter() {
        let lines = match doc.get_page_content(*page_id) {
            Ok(content) => content_lines(&content),
            Err(e) => {
                warn!(page = page_number, error = %e, "Failed to read page content, skipping");
                Vec::new()
            }
        };

        let chars: usize = lines
            .iter()
            .map(|l| l.chars().filter(|c| !c.is_whitespace()).count())
            .sum();
        total_chars += chars;
        if chars < SCANNED_PAGE_CHARS {
            sparse_pages += 1;
        }

        let children = page_nodes(&lines);
        if !children.is_empty() {
            nodes.push(SourceNode::Container {
                label: Some(format!("page {}", page_number)),
                page: Some(*page_number),
                sheet: None,
                children,
            });
        }
    }

    if total_chars == 0 {
        warn!(document = name, pages = pages.len(), "PDF has no text layer");
        return Err(IngestionError::EmptyDocument {
            document: name.to_string(),
        });
    }

    let kind = classify(pages.len(), sparse_pages);
    debug!(kind = ?kind, sparse_pages, total_chars, "Text extraction complete");
    Ok(LoadedPdf { kind, nodes })
}

fn classify(pages: usize, sparse_pages: usize) -> PdfKind {
    if sparse_pages == 0 {
        PdfKind::Text
    } else if sparse_pages >= pages {
        PdfKind::Scanned
    } else {
        PdfKind::Mixed
    }
}

/// Text lines of one page content stream, in stream order.
fn content_lines(content: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut texts: Vec<String> = Vec::new();
    let mut numbers: Vec<f32> = Vec::new();
    let mut in_array = false;
    let mut i = 0;

    while i < content.len() {
        let b = content[i];
        match b {
            b'(' => {
                let (raw, next) = read_literal(content, i + 1);
                texts.push(decode_pdf_string(&raw));
                i = next;
            }
            b'<' if content.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if content.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                let (raw, next) = read_hex(content, i + 1);
                texts.push(decode_pdf_string(&raw));
                i = next;
            }
            b'[' => {
                in_array = true;
                i += 1;
            }
            b']' => {
                in_array = false;
                i += 1;
            }
            b'%' => {
                while i < content.len() && content[i] != b'\n' && content[i] != b'\r' {
                    i += 1;
                }
            }
            b'/' => {
                i += 1;
                while i < content.len() && is_regular(content[i]) {
                    i += 1;
                }
            }
            _ if b.is_ascii_whitespace() => i += 1,
            b'0'..=b'9' | b'-' | b'+' | b'.' => {
                let start = i;
                i += 1;
                while i < content.len() && matches!(content[i], b'0'..=b'9' | b'.') {
                    i += 1;
                }
                let value = std::str::from_utf8(&content[start..i])
                    .ok()
                    .and_then(|s| s.parse::<f32>().ok())
                    .unwrap_or(0.0);
                if in_array {
                    if value <= KERNING_SPACE {
                        texts.push(" ".to_string());
                    }
                } else {
                    numbers.push(value);
                }
            }
            _ if is_regular(b) => {
                let start = i;
                while i < content.len() && is_regular(content[i]) {
                    i += 1;
                }
                let op = String::from_utf8_lossy(&content[start..i]);
                match op.as_ref() {
                    "Tj" | "TJ" => current.push_str(&texts.concat()),
                    "'" | "\"" => {
                        end_line(&mut current, &mut lines);
                        current.push_str(&texts.concat());
                    }
                    "Td" | "TD" => {
                        let dy = numbers.get(1).copied().unwrap_or(0.0);
                        if dy.abs() > f32::EPSILON {
                            end_line(&mut current, &mut lines);
                        } else {
                            current.push(' ');
                        }
                    }
                    "T*" | "Tm" | "ET" => end_line(&mut current, &mut lines),
                    "ID" => i = skip_inline_image(content, i),
                    _ => {}
                }
                texts.clear();
                numbers.clear();
            }
            _ => i += 1,
        }
    }
    end_line(&mut current, &mut lines);
    lines
}

fn is_regular(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn end_line(current: &mut String, lines: &mut Vec<String>) {
    let line = clean_text(current);
    if !line.is_empty() {
        lines.push(line);
    }
    current.clear();
}

/// Inline image data runs until `EI`; none of it is text.
fn skip_inline_image(content: &[u8], from: usize) -> usize {
    let mut i = from;
    while i + 2 < content.len() {
        if content[i].is_ascii_whitespace() && content[i + 1] == b'E' && content[i + 2] == b'I' {
            return i + 3;
        }
        i += 1;
    }
    content.len()
}

/// Bytes of a literal string starting after its opening parenthesis.
fn read_literal(content: &[u8], from: usize) -> (Vec<u8>, usize) {
    let mut out = Vec::new();
    let mut depth = 1;
    let mut i = from;

    while i < content.len() {
        let b = content[i];
        i += 1;
        match b {
            b'\\' => {
                let Some(&next) = content.get(i) else { break };
                i += 1;
                match next {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0c),
                    b'\r' | b'\n' => {
                        if next == b'\r' && content.get(i) == Some(&b'\n') {
                            i += 1;
                        }
                    }
                    b'0'..=b'7' => {
                        let mut value = u32::from(next - b'0');
                        for _ in 0..2 {
                            match content.get(i) {
                                Some(&d @ b'0'..=b'7') => {
                                    value = value * 8 + u32::from(d - b'0');
                                    i += 1;
                                }
                                _ => break,
                            }
                        }
                        out.push((value & 0xff) as u8);
                    }
                    other => out.push(other),
                }
            }
            b'(' => {
                depth += 1;
                out.push(b);
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
                out.push(b);
            }
            _ => out.push(b),
        }
    }
    (out, i)
}

/// Bytes of a hex string starting after its opening angle bracket.
fn read_hex(content: &[u8], from: usize) -> (Vec<u8>, usize) {
    let mut digits = Vec::new();
    let mut i = from;
    while i < content.len() && content[i] != b'>' {
        if let Some(d) = (content[i] as char).to_digit(16) {
            digits.push(d as u8);
        }
        i += 1;
    }
    if digits.len() % 2 == 1 {
        digits.push(0);
    }
    let bytes = digits.chunks(2).map(|pair| pair[0] << 4 | pair[1]).collect();
    (bytes, (i + 1).min(content.len()))
}

/// UTF-16BE when the string carries a byte order mark, Latin-1 otherwise.
fn decode_pdf_string(raw: &[u8]) -> String {
    if raw.len() >= 2 && raw[0] == 0xfe && raw[1] == 0xff {
        let units = raw[2..]
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]));
        return char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
    }
    raw.iter().map(|&b| b as char).collect()
}

fn clean_text(text: &str) -> String {
    collapse_whitespace(text)
        .replace('\u{FEFF}', "")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

fn numbered_heading() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([0-9]{1,2}(?:\.[0-9]{1,2}){0,5})\.?\s+(\S.*)$").expect("numbered heading pattern")
    })
}

/// Heading level and title for lines that look like section headings.
fn heading_of(line: &str) -> Option<(u8, String)> {
    if line.chars().count() > MAX_HEADING_CHARS || line.split_whitespace().count() > MAX_HEADING_WORDS {
        return None;
    }

    if let Some(caps) = numbered_heading().captures(line) {
        let title = &caps[2];
        let starts_upper = title.chars().next().is_some_and(char::is_uppercase);
        let letters = title.chars().filter(|c| c.is_alphabetic()).count();
        if starts_upper && letters >= 2 && !title.ends_with('.') {
            let level = caps[1].split('.').count().min(6) as u8;
            return Some((level, line.to_string()));
        }
    }

    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() >= 4 && letters.iter().all(|c| c.is_uppercase()) {
        return Some((1, line.to_string()));
    }
    None
}

fn bullet_item(line: &str) -> Option<&str> {
    let mut chars = line.chars();
    let first = chars.next()?;
    if !BULLETS.contains(&first) {
        return None;
    }
    let rest = chars.as_str();
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Group a page's lines into headings, lists and paragraphs. A paragraph
/// ends at sentence-final punctuation or at the next heading or bullet.
fn page_nodes(lines: &[String]) -> Vec<SourceNode> {
    let mut nodes = Vec::new();
    let mut paragraph = String::new();
    let mut items: Vec<String> = Vec::new();

    fn flush_paragraph(paragraph: &mut String, nodes: &mut Vec<SourceNode>) {
        if !paragraph.is_empty() {
            nodes.push(SourceNode::paragraph(std::mem::take(paragraph)));
        }
    }
    fn flush_items(items: &mut Vec<String>, nodes: &mut Vec<SourceNode>) {
        if !items.is_empty() {
            nodes.push(SourceNode::list(std::mem::take(items)));
        }
    }

    for line in lines {
        if let Some((level, title)) = heading_of(line) {
            flush_paragraph(&mut paragraph, &mut nodes);
            flush_items(&mut items, &mut nodes);
            nodes.push(SourceNode::heading(level, title));
            continue;
        }
        if let Some(item) = bullet_item(line) {
            flush_paragraph(&mut paragraph, &mut nodes);
            if !item.is_empty() {
                items.push(item.to_string());
            }
            continue;
        }
        flush_items(&mut items, &mut nodes);
        if !paragraph.is_empty() {
            paragraph.push(' ');
        }
        paragraph.push_str(line);
        if line.ends_with(['.', ':', '!', '?']) {
            flush_paragraph(&mut paragraph, &mut nodes);
        }
    }
    flush_paragraph(&mut paragraph, &mut nodes);
    flush_items(&mut items, &mut nodes);
    nodes
}
