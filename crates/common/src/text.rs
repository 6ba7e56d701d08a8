//! Tokenization shared by ingestion, scoring and intent detection.
//!
//! Terms are maximal runs of alphanumeric characters (Unicode-aware),
//! lower-cased; everything else is a separator. No stemming is applied.

use std::collections::HashSet;
use std::sync::OnceLock;

/// Function words dropped from scoring terms (English and Turkish).
const STOP_WORDS: &[&str] = &[
    // English
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "of", "in", "on", "at",
    "to", "for", "with", "by", "from", "and", "or", "not", "what", "which", "who", "whom", "how",
    "many", "much", "does", "do", "did", "this", "that", "these", "those", "it", "its", "as",
    "there", "their", "than", "then", "into", "about", "can", "could", "should", "would", "will",
    "has", "have", "had", "i", "we", "you", "they", "me", "us", "our", "your", "please", "tell",
    "give", "show", "list", "any", "all", "also",
    // Turkish
    "ve", "ile", "bir", "bu", "şu", "o", "da", "de", "mi", "mı", "mu", "mü", "için", "ne",
    "nedir", "kaç", "hangi", "nasıl", "olan", "olarak", "gibi", "daha", "en", "ise", "ya",
    "veya", "ki", "her",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

/// All terms of `text`, lower-cased, in order, stop words included.
pub fn terms(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if c.is_alphanumeric() {
            push_folded(&mut current, c);
        } else if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Scoring terms: [`terms`] minus stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    terms(text)
        .into_iter()
        .filter(|t| !is_stop_word(t))
        .collect()
}

pub fn is_stop_word(term: &str) -> bool {
    stop_words().contains(term)
}

/// Case-fold one character. Dotted capital I folds to plain `i` so the
/// combining dot produced by `to_lowercase` does not split the term.
fn push_folded(buf: &mut String, c: char) {
    match c {
        'İ' => buf.push('i'),
        _ => buf.extend(c.to_lowercase()),
    }
}

/// Lower-case `text` with the same folding rules as [`terms`].
pub fn fold_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        push_folded(&mut out, c);
    }
    out
}

/// Approximate model tokens: about four tokens per three words.
pub fn estimate_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    (words * 4 + 2) / 3
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True if any term of `text` contains a digit.
pub fn has_numeric_token(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_split_on_punctuation() {
        assert_eq!(terms("DC/AC Ratio 1,424"), vec!["dc", "ac", "ratio", "1", "424"]);
        assert_eq!(terms("40°C ambient"), vec!["40", "c", "ambient"]);
    }

    #[test]
    fn test_unicode_letters_survive() {
        assert_eq!(terms("Sıcaklık, gücü"), vec!["sıcaklık", "gücü"]);
        assert_eq!(terms("İSTANBUL trafo"), vec!["istanbul", "trafo"]);
        assert_eq!(terms("Überspannung"), vec!["überspannung"]);
    }

    #[test]
    fn test_tokenize_drops_stop_words() {
        assert_eq!(
            tokenize("How many inverters are installed in Substation 4?"),
            vec!["inverters", "installed", "substation", "4"]
        );
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("one two three"), 4);
        assert_eq!(estimate_tokens("one"), 2);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  c "), "a b c");
    }
}
