//! Response cleanup: boilerplate prefixes, wrapping quotes, language annotations

use once_cell::sync::Lazy;
use regex::Regex;

/// Lead-ins models like to put before the actual translation
const BOILERPLATE_PREFIXES: &[&str] = &[
    "Here's the translation:",
    "Here is the translation:",
    "Translated text:",
    "The translation is:",
    "Translation:",
    "Aqui está a tradução:",
    "Texto traduzido:",
    "Tradução:",
    "Aquí está la traducción:",
    "Texto traducido:",
    "Traducción:",
    "Voici la traduction :",
    "Voici la traduction:",
    "Traduction :",
    "Traduction:",
    "Hier ist die Übersetzung:",
    "Übersetzung:",
    "Ecco la traduzione:",
    "Traduzione:",
];

const QUOTE_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('\'', '\''),
    ('“', '”'),
    ('„', '“'),
    ('«', '»'),
    ('「', '」'),
];

const ANNOTATION_LABELS: &str = "detected source language|detected language|source language|\
idioma detectado|idioma de origem|idioma de origen|langue détectée|langue source|\
erkannte sprache|ausgangssprache|lingua rilevata|lingua di origine";

/// A language name: letters, spaces and hyphens, no clause punctuation
const LANGUAGE_VALUE: &str = r"([\p{L}][\p{L} \-]{0,30}?)\s*\.?";

/// `... (Detected language: English)` at the very end
static TRAILING_GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\s*[(\[]\s*(?:{ANNOTATION_LABELS})\s*:\s*{LANGUAGE_VALUE}\s*[)\]]\s*$"
    ))
    .unwrap_or_else(|e| panic!("invalid annotation regex: {e}"))
});

/// `Detected language: English` as the whole last line
static TRAILING_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\n[ \t]*(?:{ANNOTATION_LABELS})[ \t]*:[ \t]*{LANGUAGE_VALUE}[ \t]*$"
    ))
    .unwrap_or_else(|e| panic!("invalid annotation regex: {e}"))
});

/// `Detected language: English` as the whole first line, translation below
static LEADING_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^[ \t]*[(\[]?[ \t]*(?:{ANNOTATION_LABELS})[ \t]*:[ \t]*{LANGUAGE_VALUE}[ \t]*[)\]]?[ \t]*\r?\n"
    ))
    .unwrap_or_else(|e| panic!("invalid annotation regex: {e}"))
});

/// Strip boilerplate the backend added around the translation
pub fn clean_response(response: &str) -> String {
    let mut cleaned = response.trim().to_string();

    cleaned = strip_annotation(&cleaned);

    // prefixes can stack ("Translation: Here's the translation: ...")
    while let Some(rest) = strip_prefix(&cleaned) {
        cleaned = rest;
    }

    strip_quotes(&cleaned).trim().to_string()
}

/// Read a "Detected language: X" hint out of the raw response
pub fn extract_detected_language(raw: &str) -> Option<String> {
    find_annotation(raw.trim()).map(|annotation| annotation.language)
}

struct Annotation {
    /// Byte range of `text` the annotation occupies
    start: usize,
    end: usize,
    language: String,
}

fn find_annotation(text: &str) -> Option<Annotation> {
    for pattern in [&*TRAILING_GROUP, &*TRAILING_LINE, &*LEADING_LINE] {
        let Some(caps) = pattern.captures(text) else {
            continue;
        };
        let (Some(whole), Some(value)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        // an annotation alone is not a translation
        let rest = format!("{}{}", &text[..whole.start()], &text[whole.end()..]);
        if rest.trim().is_empty() {
            continue;
        }

        let language = value.as_str().trim().to_string();
        if language.is_empty() {
            continue;
        }
        return Some(Annotation {
            start: whole.start(),
            end: whole.end(),
            language,
        });
    }
    None
}

fn strip_annotation(text: &str) -> String {
    match find_annotation(text) {
        Some(annotation) => format!("{}{}", &text[..annotation.start], &text[annotation.end..])
            .trim()
            .to_string(),
        None => text.to_string(),
    }
}

fn strip_prefix(text: &str) -> Option<String> {
    for prefix in BOILERPLATE_PREFIXES {
        let len = prefix.chars().count();
        let head: String = text.chars().take(len).collect();
        if head.to_lowercase() == prefix.to_lowercase() {
            let rest: String = text.chars().skip(len).collect();
            return Some(rest.trim().to_string());
        }
    }
    None
}

fn strip_quotes(text: &str) -> &str {
    for (open, close) in QUOTE_PAIRS {
        if text.chars().count() >= 2 && text.starts_with(*open) && text.ends_with(*close) {
            return &text[open.len_utf8()..text.len() - close.len_utf8()];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_prefixes_and_quotes() {
        assert_eq!(clean_response("Translation: \"Olá mundo\""), "Olá mundo");
        assert_eq!(clean_response("here's the translation:  Bonjour"), "Bonjour");
        assert_eq!(clean_response("Tradução: Olá"), "Olá");
        assert_eq!(clean_response("ÜBERSETZUNG: Hallo"), "Hallo");
        assert_eq!(clean_response("«Ciao»"), "Ciao");
        assert_eq!(clean_response("Translation: Here is the translation: Hola"), "Hola");
    }

    #[test]
    fn test_strips_trailing_annotation() {
        assert_eq!(clean_response("Olá, tudo bem?\n(Detected language: English)"), "Olá, tudo bem?");
        assert_eq!(clean_response("Hola (Idioma detectado: inglés)"), "Hola");
        assert_eq!(clean_response("Bonjour\nLangue détectée : anglais"), "Bonjour");
    }

    #[test]
    fn test_strips_leading_annotation_line() {
        assert_eq!(clean_response("Detected language: English\nOlá"), "Olá");
    }

    #[test]
    fn test_keeps_plain_text() {
        assert_eq!(clean_response("  Olá  "), "Olá");
        assert_eq!(clean_response("\""), "\"");
        assert_eq!(clean_response("It's fine"), "It's fine");
    }

    #[test]
    fn test_extract_detected_language() {
        assert_eq!(
            extract_detected_language("Olá\n(Detected language: English)").as_deref(),
            Some("English")
        );
        assert_eq!(
            extract_detected_language("Ciao\nErkannte Sprache: Italienisch.").as_deref(),
            Some("Italienisch")
        );
        assert_eq!(extract_detected_language("Olá"), None);
        assert_eq!(
            extract_detected_language("Detected language: English\nOlá").as_deref(),
            Some("English")
        );
    }

    #[test]
    fn test_keeps_label_phrases_inside_the_translation() {
        let texts = [
            "Configure the source language: choose English in the menu",
            "Selecione o idioma de origem: inglês, depois clique em salvar",
            "Wählen Sie die Ausgangssprache: Deutsch, dann weiter",
            "Set the source language: Spanish first, then continue",
        ];
        for text in texts {
            assert_eq!(clean_response(text), text);
            assert_eq!(extract_detected_language(text), None);
        }
    }

    #[test]
    fn test_sentence_on_last_line_is_not_an_annotation() {
        let text = "Step one is done.\nNext, set the source language: pick one from the list, then save";
        assert_eq!(clean_response(text), text);
        assert_eq!(extract_detected_language(text), None);
    }

    #[test]
    fn test_only_the_final_annotation_is_removed() {
        let text = "Mude o idioma de origem: português (Brasil)\n(Detected language: English)";
        assert_eq!(
            clean_response(text),
            "Mude o idioma de origem: português (Brasil)"
        );
        assert_eq!(extract_detected_language(text).as_deref(), Some("English"));
    }

    #[test]
    fn test_annotation_alone_is_kept() {
        assert_eq!(clean_response("Detected language: English"), "Detected language: English");
    }
}
