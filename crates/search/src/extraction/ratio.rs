//! DC/AC ratio strategy
//!
//! A ratio follows its label (`DC/AC Ratio`, `ratio`, `oranı`). The text
//! after a label, up to the next label, is split into numbers and reference
//! temperatures. Temperatures written before the numbers (`(@40ºC) 1,424`)
//! bind to the numbers that follow them; otherwise a temperature binds to
//! the number right before it (`1.291 @30°C`).

use super::numbers::{normalize_decimal_comma, substation_mentions, temperature_tokens, touches_letter};
use super::{ExtractionKind, ValueExtractor, ValueMatch};
use docforge_common::vocabulary::EntityType;
use regex_lite::Regex;
use std::ops::RangeInclusive;
use tracing::debug;

/// Characters after a label that may hold its value.
const WINDOW_CHARS: usize = 120;

const VALID_RANGE: RangeInclusive<f64> = 0.5..=3.0;

#[derive(Debug, Clone, Copy)]
enum Token {
    Number { start: usize, end: usize },
    Temperature { celsius: i32, start: usize, end: usize },
}

impl Token {
    fn start(&self) -> usize {
        match self {
            Token::Number { start, .. } | Token::Temperature { start, .. } => *start,
        }
    }
}

pub struct RatioExtractor {
    label: Regex,
    number: Regex,
}

impl Default for RatioExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RatioExtractor {
    pub fn new() -> Self {
        Self {
            label: Regex::new(r"(?i)\b(?:dc\s*/\s*ac(?:\s+ratio)?|ac\s*/\s*dc(?:\s+ratio)?|ratio|oran[ıi]?)")
                .expect("ratio label pattern"),
            number: Regex::new(r"\d+(?:[.,]\d+)?").expect("ratio number pattern"),
        }
    }

    /// Numbers and temperatures of `text[start..end]`, absolute offsets,
    /// in text order. Substation numbers and numbers glued to letters are
    /// masked out.
    fn tokens(&self, text: &str, start: usize, end: usize) -> Vec<Token> {
        let window = &text[start..end];
        let temps: Vec<(usize, usize, i32)> = temperature_tokens(window)
            .into_iter()
            .map(|t| (t.start + start, t.end + start, t.celsius))
            .collect();
        let masked: Vec<(usize, usize)> = substation_mentions(window)
            .into_iter()
            .map(|m| (m.start + start, m.end + start))
            .chain(temps.iter().map(|(s, e, _)| (*s, *e)))
            .collect();

        let mut tokens: Vec<Token> = self
            .number
            .find_iter(window)
            .map(|m| (m.start() + start, m.end() + start))
            .filter(|(s, e)| !masked.iter().any(|(ms, me)| s < me && e > ms))
            .filter(|(s, e)| !touches_letter(text, *s, *e))
            .map(|(start, end)| Token::Number { start, end })
            .collect();
        tokens.extend(temps.iter().map(|(start, end, celsius)| Token::Temperature {
            celsius: *celsius,
            start: *start,
            end: *end,
        }));
        tokens.sort_by_key(Token::start);
        tokens
    }
}

impl ValueExtractor for RatioExtractor {
    fn kind(&self) -> ExtractionKind {
        ExtractionKind::Ratio
    }

    fn entity(&self) -> EntityType {
        EntityType::Ratio
    }

    fn in_range(&self, value: f64) -> bool {
        VALID_RANGE.contains(&value)
    }

    fn candidates(&self, text: &str) -> Vec<ValueMatch> {
        let labels: Vec<_> = self.label.find_iter(text).collect();
        let mut found = Vec::new();

        for (i, label) in labels.iter().enumerate() {
            let next_label = labels.get(i + 1).map_or(text.len(), |l| l.start());
            let window_end = text[label.end()..]
                .char_indices()
                .nth(WINDOW_CHARS)
                .map_or(text.len(), |(offset, _)| label.end() + offset)
                .min(next_label);

            let tokens = self.tokens(text, label.end(), window_end);
            let leading = matches!(tokens.first(), Some(Token::Temperature { .. }));
            let mut current_temp = None;

            for (j, token) in tokens.iter().enumerate() {
                let (start, end) = match *token {
                    Token::Temperature { celsius, .. } => {
                        current_temp = Some(celsius);
                        continue;
                    }
                    Token::Number { start, end } => (start, end),
                };

                let (temperature, match_end) = if leading {
                    (current_temp, end)
                } else {
                    match tokens.get(j + 1) {
                        Some(Token::Temperature { celsius, end: temp_end, .. }) => (Some(*celsius), *temp_end),
                        _ => (None, end),
                    }
                };

                let value = normalize_decimal_comma(&text[start..end]);
                let Ok(parsed) = value.parse::<f64>() else {
                    continue;
                };
                if !self.in_range(parsed) {
                    debug!(value = %value, "Ratio outside 0.5..=3.0, rejected");
                    continue;
                }

                found.push(ValueMatch {
                    value,
                    unit: temperature.map(|t| format!("@{}°C", t)).unwrap_or_default(),
                    matched_text: text[label.start()..match_end].trim().to_string(),
                    temperature,
                });
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::Qualifiers;

    fn values(text: &str) -> Vec<(String, Option<i32>)> {
        RatioExtractor::new()
            .candidates(text)
            .into_iter()
            .map(|m| (m.value, m.temperature))
            .collect()
    }

    #[test]
    fn test_leading_temperature_label() {
        let found = RatioExtractor::new().candidates("DC/AC Ratio (@40ºC) 1,424");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "1.424");
        assert_eq!(found[0].temperature, Some(40));
        assert_eq!(found[0].matched_text, "DC/AC Ratio (@40ºC) 1,424");
    }

    #[test]
    fn test_trailing_temperatures() {
        assert_eq!(
            values("DC/AC ratio 1.291 @30°C and 1.420 @40°C"),
            vec![("1.291".into(), Some(30)), ("1.420".into(), Some(40))]
        );
    }

    #[test]
    fn test_each_label_owns_its_window() {
        assert_eq!(
            values("DC/AC ratio (@30°C) 1,291; DC/AC ratio (@40°C) 1,420"),
            vec![("1.291".into(), Some(30)), ("1.420".into(), Some(40))]
        );
    }

    #[test]
    fn test_masked_numbers() {
        assert_eq!(values("DC/AC ratio of Substation 2 with SG350HX: 1.31"), vec![("1.31".into(), None)]);
    }

    #[test]
    fn test_out_of_range_and_far_values() {
        assert!(values("ratio 47.0").is_empty());
        let far = format!("DC/AC ratio {} 1.25", "x ".repeat(80));
        assert!(values(&far).is_empty());
    }

    #[test]
    fn test_turkish_label() {
        assert_eq!(values("DC/AC oranı 1,35"), vec![("1.35".into(), None)]);
    }

    #[test]
    fn test_strict_temperature_qualifier() {
        let extractor = RatioExtractor::new();
        let q = Qualifiers {
            temperature: Some(30),
            substation: None,
        };
        assert!(extractor.try_extract("DC/AC ratio 1.25", &q).is_none());
        let m = extractor.try_extract("ratio 1.420 @40°C, 1.291 @30°C", &q).unwrap();
        assert_eq!(m.value, "1.291");
        assert_eq!(m.unit, "@30°C");
    }
}
