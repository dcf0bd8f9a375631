//! Language and tone normalization

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source code meaning "let the backend detect it"
pub const AUTO: &str = "auto";

/// Display name reported when detection yielded nothing
pub const AUTO_DETECTED: &str = "Auto-detected";

/// Fallback for unrecognised languages
const FALLBACK_CODE: &str = "en";

struct LanguageInfo {
    code: &'static str,
    name: &'static str,
    native: &'static str,
    markers: &'static [&'static str],
}

const LANGUAGES: &[LanguageInfo] = &[
    LanguageInfo {
        code: "en",
        name: "English",
        native: "English",
        markers: &["the", "and", "of", "to", "is", "in", "that", "it", "for", "you"],
    },
    LanguageInfo {
        code: "pt",
        name: "Portuguese",
        native: "Português",
        markers: &["de", "e", "a", "o", "da", "em", "que", "para", "um", "uma"],
    },
    LanguageInfo {
        code: "es",
        name: "Spanish",
        native: "Español",
        markers: &["de", "el", "la", "que", "y", "en", "los", "por", "un", "una"],
    },
    LanguageInfo {
        code: "fr",
        name: "French",
        native: "Français",
        markers: &["le", "la", "de", "et", "les", "des", "un", "une", "est", "pour"],
    },
    LanguageInfo {
        code: "de",
        name: "German",
        native: "Deutsch",
        markers: &["der", "die", "das", "und", "ist", "nicht", "ein", "eine", "zu", "mit"],
    },
    LanguageInfo {
        code: "it",
        name: "Italian",
        native: "Italiano",
        markers: &["il", "la", "di", "e", "che", "un", "una", "per", "non", "del"],
    },
    LanguageInfo {
        code: "nl",
        name: "Dutch",
        native: "Nederlands",
        markers: &["de", "het", "een", "en", "van", "is", "dat", "niet", "op", "te"],
    },
    LanguageInfo {
        code: "pl",
        name: "Polish",
        native: "Polski",
        markers: &["i", "w", "nie", "na", "jest", "to", "się", "z", "że", "do"],
    },
    LanguageInfo {
        code: "tr",
        name: "Turkish",
        native: "Türkçe",
        markers: &["ve", "bir", "bu", "da", "de", "için", "ile", "çok", "ne", "olarak"],
    },
    LanguageInfo {
        code: "ru",
        name: "Russian",
        native: "Русский",
        markers: &["и", "в", "не", "на", "что", "с", "это", "по", "как", "я"],
    },
    LanguageInfo {
        code: "ja",
        name: "Japanese",
        native: "日本語",
        markers: &[],
    },
    LanguageInfo {
        code: "zh",
        name: "Chinese",
        native: "中文",
        markers: &[],
    },
    LanguageInfo {
        code: "ko",
        name: "Korean",
        native: "한국어",
        markers: &[],
    },
    LanguageInfo {
        code: "ar",
        name: "Arabic",
        native: "العربية",
        markers: &[],
    },
    LanguageInfo {
        code: "hi",
        name: "Hindi",
        native: "हिन्दी",
        markers: &[],
    },
];

fn find(code: &str) -> Option<&'static LanguageInfo> {
    LANGUAGES.iter().find(|l| l.code == code)
}

fn is_auto_label(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    lower.is_empty()
        || lower == AUTO
        || lower == "auto detect"
        || lower == "auto-detect"
        || lower == "autodetect"
        || lower == "auto-detected"
        || lower == "detect"
}

/// Map a free-form display name, locale tag or code to a canonical code.
///
/// Returns `"auto"` for auto-detect labels and `"en"` for anything unknown.
pub fn normalize_code(input: &str) -> String {
    let trimmed = input.trim();
    if is_auto_label(trimmed) {
        return AUTO.to_string();
    }

    let lower = trimmed.to_lowercase();

    // "pt-BR", "en_US"
    let primary = lower.split(['-', '_']).next().unwrap_or(&lower);
    if primary.len() == 2 && primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return primary.to_string();
    }

    LANGUAGES
        .iter()
        .find(|l| l.name.to_lowercase() == lower || l.native.to_lowercase() == lower)
        .map(|l| l.code.to_string())
        .unwrap_or_else(|| FALLBACK_CODE.to_string())
}

/// Canonical source code: `"auto"` or a 2-letter code
pub fn normalize_source(input: &str) -> String {
    normalize_code(input)
}

/// Canonical target code: always a 2-letter code
pub fn normalize_target(input: &str) -> String {
    match normalize_code(input) {
        code if code == AUTO => FALLBACK_CODE.to_string(),
        code => code,
    }
}

/// English display name for prompts and status text
pub fn language_name(code: &str) -> String {
    let lower = code.trim().to_lowercase();
    if lower == AUTO {
        return AUTO_DETECTED.to_string();
    }
    find(&lower)
        .map(|l| l.name.to_string())
        .unwrap_or_else(|| code.trim().to_string())
}

/// Common short function words of a language, used for plausibility checks
pub fn marker_words(code: &str) -> &'static [&'static str] {
    find(&code.to_lowercase()).map(|l| l.markers).unwrap_or(&[])
}

/// Stylistic directive passed to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Neutral,
    Formal,
    Casual,
    Technical,
    Professional,
}

impl Tone {
    pub const ALL: [Tone; 5] = [
        Tone::Neutral,
        Tone::Formal,
        Tone::Casual,
        Tone::Technical,
        Tone::Professional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Neutral => "neutral",
            Tone::Formal => "formal",
            Tone::Casual => "casual",
            Tone::Technical => "technical",
            Tone::Professional => "professional",
        }
    }

    /// Lenient parse: unknown labels fall back to neutral
    pub fn normalize(input: &str) -> Self {
        input.parse().unwrap_or_default()
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "neutral" => Ok(Tone::Neutral),
            "formal" => Ok(Tone::Formal),
            "casual" | "informal" => Ok(Tone::Casual),
            "technical" => Ok(Tone::Technical),
            "professional" => Ok(Tone::Professional),
            other => Err(format!("unknown tone: {}", other)),
        }
    }
}
