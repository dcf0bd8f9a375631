//! Cheap request-size estimate used by the token-limit gate

/// Average characters per token for the estimate
const CHARS_PER_TOKEN: usize = 4;

/// Estimates the number of tokens as `ceil(chars / 4)`.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// True when the limit gate is on and the text is over it
pub fn exceeds_limit(text: &str, enabled: bool, max_tokens: usize) -> bool {
    enabled && estimate_tokens(text) > max_tokens
}
