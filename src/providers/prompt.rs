//! Prompt construction for LLM backends

use crate::core::language::{language_name, Tone};
use crate::core::models::TranslationRequest;

const SYSTEM_PROMPT: &str = "You are a professional translator. Translate text accurately while \
keeping its original meaning, style and formatting. Respond only with the translation, with no \
explanations or additional text.";

/// System + user message pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Phrasing that steers the backend towards a tone
pub fn tone_directive(tone: Tone) -> &'static str {
    match tone {
        Tone::Neutral => "Use a neutral, natural tone.",
        Tone::Formal => "Use a formal tone, suitable for official or business correspondence.",
        Tone::Casual => "Use a casual, relaxed and conversational tone.",
        Tone::Technical => {
            "Use precise technical language and keep domain-specific terminology intact."
        }
        Tone::Professional => "Use a polished, professional tone that stays clear and concise.",
    }
}

/// Build the prompt for an attempt.
///
/// Attempt 0 is the regular prompt; later attempts are retries after the
/// answer came back in the wrong language and insist harder on the target.
pub fn build_prompt(request: &TranslationRequest, attempt: u32) -> Prompt {
    let target = language_name(&request.target_lang);
    let mut user = String::new();

    if attempt > 0 {
        user.push_str(&format!(
            "IMPORTANT: your ENTIRE response must be ONLY in {target}. Do not answer in the \
source language and do not mix languages. "
        ));
        if attempt > 1 {
            user.push_str(&format!(
                "The previous answer was not written in {target}; write every word in {target}. "
            ));
        }
        user.push('\n');
    }

    if request.is_auto_source() {
        user.push_str(&format!(
            "Translate the following text into {target}. {} Return only the translated text, \
without comments, explanations or quotes. After the translation, on a new line, add \
\"(Detected language: <source language name in English>)\".",
            tone_directive(request.tone)
        ));
    } else {
        let source = language_name(&request.source_lang);
        user.push_str(&format!(
            "Translate the following {source} text into {target}. {} Return only the translated \
text, without comments, explanations or quotes.",
            tone_directive(request.tone)
        ));
    }

    user.push_str("\n\n");
    user.push_str(&request.text);

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}
