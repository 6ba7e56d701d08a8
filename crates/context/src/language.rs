//! English/Turkish query language detection and refusal messages.

use docforge_common::text::terms;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

const TURKISH_CHARS: &[char] = &['ş', 'Ş', 'ğ', 'Ğ', 'ü', 'Ü', 'ç', 'Ç', 'ö', 'Ö', 'ı', 'İ'];

const TURKISH_WORDS: &[&str] = &[
    "ve", "veya", "için", "ile", "bu", "bir", "olan", "olarak", "da", "de", "mi", "mı", "ne",
    "nasıl", "neden", "kaç", "toplam", "tarafından", "göre", "arasında", "üzerinde", "altında",
    "sonra", "önce", "şu", "hangi", "kadar", "değil", "var", "yok", "evet", "hayır", "lütfen",
    "teşekkür", "merhaba", "günaydın", "iyi", "kötü", "büyük", "küçük", "çok", "az", "hepsi",
    "hiç", "bazı",
];

/// Distinct Turkish function words needed to call a query Turkish.
const MIN_TURKISH_WORDS: usize = 2;

fn turkish_question_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"\b(?:ne kadar|kaç tane|kac tane|kac|toplam ne|toplam kac|hangi|nedir|yapıldı|yapılmış|tamamlandı|bitti|taşeron|işçi|metre|gün)\b",
        )
        .expect("turkish question pattern")
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "tr")]
    Turkish,
}

impl Language {
    /// Turkish when the text has Turkish letters, at least two Turkish
    /// function words, or a Turkish question pattern; English otherwise.
    pub fn detect(text: &str) -> Self {
        if text.trim().is_empty() {
            return Language::English;
        }
        if text.chars().any(|c| TURKISH_CHARS.contains(&c)) {
            return Language::Turkish;
        }

        let words: HashSet<String> = terms(text).into_iter().collect();
        let turkish_words = TURKISH_WORDS.iter().filter(|w| words.contains(**w)).count();
        if turkish_words >= MIN_TURKISH_WORDS {
            return Language::Turkish;
        }

        if turkish_question_pattern().is_match(&text.to_lowercase()) {
            return Language::Turkish;
        }
        Language::English
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Turkish => "tr",
        }
    }

    /// Message returned instead of a guess when no evidence was found.
    pub fn refusal_message(&self) -> &'static str {
        match self {
            Language::English => "I cannot find this information in the provided records/documents.",
            Language::Turkish => "Bu bilgiyi mevcut kayıtlarda/belgelerde bulamıyorum.",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
