//! Answer guard
//!
//! Generated prose may paraphrase a number ("about 1.42"). When a value was
//! extracted, the final answer must carry the literal exactly as extracted.

use docforge_search::Extraction;
use tracing::warn;

pub struct AnswerGuard;

impl AnswerGuard {
    /// Make sure `prose` contains the extracted value verbatim.
    ///
    /// Without an extraction the prose is returned as is. Empty prose becomes
    /// the bare literal.
    pub fn finalize(prose: &str, extraction: &Extraction) -> String {
        let prose = prose.trim();
        let (Some(value), Some(literal)) = (extraction.value.as_deref(), extraction.literal()) else {
            return prose.to_string();
        };
        if !extraction.extracted {
            return prose.to_string();
        }
        if prose.is_empty() {
            return literal;
        }
        if contains_value(prose, value) {
            return prose.to_string();
        }

        warn!(value = %value, "Generated answer omitted the extracted value, prepending it");
        format!("{}\n\n{}", literal, prose)
    }
}

/// `value` appears in `text` as a whole number token, so `1.42` does not
/// count as present inside `1.424` and `1.424` is not found in `11.4245`.
fn contains_value(text: &str, value: &str) -> bool {
    let numeric = |c: char| c.is_ascii_digit() || c == '.' || c == ',';
    text.match_indices(value).any(|(start, m)| {
        let before = text[..start].chars().next_back();
        let after = text[start + m.len()..].chars();
        let before_ok = !before.is_some_and(|c| c.is_ascii_digit());
        // a sentence-ending period after the value is fine
        let mut after = after.peekable();
        let after_ok = match after.next() {
            None => true,
            Some(c) if c.is_ascii_digit() => false,
            Some('.') | Some(',') => !after.peek().copied().is_some_and(numeric),
            Some(_) => true,
        };
        before_ok && after_ok
    })
}
