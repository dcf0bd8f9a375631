//! Heuristic check that a translation is written in the requested language

use crate::core::language::marker_words;

/// Texts with fewer words than this are accepted unconditionally
pub const MIN_WORDS_FOR_CHECK: usize = 5;

/// Retries with an intensified prompt after an implausible answer
pub const MAX_PLAUSIBILITY_RETRIES: u32 = 2;

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// True if `text` contains at least one common function word of `target`.
///
/// Short texts and languages without a marker list always pass.
pub fn is_plausible(text: &str, target: &str) -> bool {
    let words = words(text);
    if words.len() < MIN_WORDS_FOR_CHECK {
        return true;
    }

    let markers = marker_words(target);
    if markers.is_empty() {
        return true;
    }

    words.iter().any(|w| markers.contains(&w.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portuguese_markers() {
        assert!(is_plausible("O livro está em cima da mesa da cozinha", "pt"));
        assert!(!is_plausible("The book is on the kitchen table today", "pt"));
    }

    #[test]
    fn test_short_text_always_plausible() {
        assert!(is_plausible("Hello world", "pt"));
        assert!(is_plausible("Good morning, my friend!", "de"));
    }

    #[test]
    fn test_unknown_target_passes() {
        assert!(is_plausible("The book is on the kitchen table today", "ja"));
        assert!(is_plausible("The book is on the kitchen table today", "xx"));
    }

    #[test]
    fn test_punctuation_does_not_hide_markers() {
        assert!(is_plausible("Ele disse: \"vamos para casa, agora!\"", "pt"));
    }
}
