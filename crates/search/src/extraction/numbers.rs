//! Number normalization and query qualifiers shared by the extractors.

use docforge_common::text::fold_case;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn temperature_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // the leading guard keeps `1200°C` from reading as 200 and `10-40°C` as -40
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(?:^|[^0-9.])(@?\s*(-?\d{1,3})\s*[°º]\s*c)").expect("temperature pattern")
    })
}

fn substation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(?:substation|ss|sub|trafo\s*merkezi)\s*[-#no.]*\s*(\d{1,3})")
            .expect("substation pattern")
    })
}

fn plain_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*-?\d+(?:[.,]\d+)*\s*$").expect("plain number pattern"))
}

/// Normalize a numeral where a comma followed by exactly three digits is
/// digit grouping and any other comma is a decimal separator.
pub fn normalize_grouped(raw: &str) -> String {
    let chars: Vec<char> = raw.trim().chars().collect();
    let mut out = String::with_capacity(chars.len());
    for (i, c) in chars.iter().enumerate() {
        if *c != ',' {
            out.push(*c);
            continue;
        }
        let digits_after = chars[i + 1..].iter().take_while(|d| d.is_ascii_digit()).count();
        if digits_after != 3 {
            out.push('.');
        }
    }
    out
}

/// Normalize a numeral whose comma is always a decimal separator.
pub fn normalize_decimal_comma(raw: &str) -> String {
    raw.trim().replace(',', ".")
}

/// Whether the cell holds nothing but a number.
pub fn is_plain_number(cell: &str) -> bool {
    plain_number_pattern().is_match(cell)
}

/// True when `text[start..end]` is glued to a letter on either side, as in
/// model codes like `SG350HX`.
pub fn touches_letter(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    before.is_some_and(char::is_alphabetic) || after.is_some_and(char::is_alphabetic)
}

/// A `@40°C`-style reference temperature found in text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureToken {
    pub celsius: i32,
    pub start: usize,
    pub end: usize,
}

pub fn temperature_tokens(text: &str) -> Vec<TemperatureToken> {
    temperature_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(1)?;
            let celsius = caps.get(2)?.as_str().parse().ok()?;
            // leading whitespace is part of the match; keep the span tight
            let start = whole.start() + (whole.as_str().len() - whole.as_str().trim_start().len());
            Some(TemperatureToken {
                celsius,
                start,
                end: whole.end(),
            })
        })
        .collect()
}

/// Reference temperature on the same line as `text[start..end]`, the
/// nearest one when several are present.
pub fn temperature_near(text: &str, start: usize, end: usize) -> Option<i32> {
    let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
    let line_end = text[end..].find('\n').map_or(text.len(), |i| end + i);

    temperature_tokens(&text[line_start..line_end])
        .into_iter()
        .map(|t| (t.start + line_start, t.end + line_start, t.celsius))
        .filter(|(s, e, _)| *e <= start || *s >= end)
        .min_by_key(|(s, e, _)| if *e <= start { start - e } else { s - end })
        .map(|(_, _, celsius)| celsius)
}

/// One `Substation 4` style mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubstationMention {
    pub number: u32,
    pub start: usize,
    /// End of the whole mention, number included
    pub end: usize,
}

pub fn substation_mentions(text: &str) -> Vec<SubstationMention> {
    substation_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(SubstationMention {
                number: caps.get(1)?.as_str().parse().ok()?,
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// Slice `text` down to the parts that concern substation `number`: any
/// preamble before the first mention plus every segment opened by a mention
/// of `number`. `None` when the text names other substations but not this one.
pub fn substation_scope(text: &str, number: u32) -> Option<String> {
    let mentions = substation_mentions(text);
    if mentions.is_empty() {
        return Some(text.to_string());
    }
    if !mentions.iter().any(|m| m.number == number) {
        return None;
    }

    let mut scoped = String::from(&text[..mentions[0].start]);
    for (i, mention) in mentions.iter().enumerate() {
        let segment_end = mentions
            .iter()
            .skip(i + 1)
            .find(|m| m.number != number)
            .map_or(text.len(), |m| m.start);
        let previous_same = i > 0 && mentions[i - 1].number == number;
        if mention.number == number && !previous_same {
            if !scoped.is_empty() && !scoped.ends_with(char::is_whitespace) {
                scoped.push(' ');
            }
            scoped.push_str(&text[mention.start..segment_end]);
        }
    }
    Some(scoped)
}

/// Whether a table header names the substation column.
pub fn is_substation_header(header: &str) -> bool {
    let folded = fold_case(header);
    folded.contains("substation") || folded.contains("trafo") || folded.trim() == "ss"
}

/// Substation number held by a table cell such as `4`, `SS-4` or `Substation 4`.
pub fn substation_in_cell(cell: &str) -> Option<u32> {
    if let Some(mention) = substation_mentions(cell).first() {
        return Some(mention.number);
    }
    let digits: String = cell.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Unit written in a table header, as in `Voltage (kV)` or `Power [MWp]`.
pub fn header_unit(header: &str) -> Option<String> {
    let open = header.rfind(['(', '['])?;
    let close = header[open..].find([')', ']'])? + open;
    let inner = header[open + 1..close].trim();
    (!inner.is_empty()).then(|| inner.to_string())
}

/// Qualifiers in a query that narrow which value is acceptable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualifiers {
    /// Reference temperature in °C, e.g. from `at 40°C`
    pub temperature: Option<i32>,
    /// Substation number, e.g. from `Substation 4` or `SS-4`
    pub substation: Option<u32>,
}

impl Qualifiers {
    pub fn from_query(query: &str) -> Self {
        Self {
            temperature: temperature_tokens(query).first().map(|t| t.celsius),
            substation: substation_mentions(query).first().map(|m| m.number),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.substation.is_none()
    }
}
