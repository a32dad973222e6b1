//! Message body tokenization.
//!
//! Tokens are whatever falls between single spaces once newlines are turned
//! into spaces. Punctuation stays attached (`"hello,"` and `"hello"` are
//! different words) and there is no Unicode normalization. Word-usage rows
//! already persisted depend on this exact behavior.

/// Split a message body into lower-cased word tokens.
///
/// Empty tokens produced by runs of spaces are dropped. Tabs and carriage
/// returns are not separators.
pub fn tokenize(text: &str) -> Vec<String> {
    tokens(text).collect()
}

/// Lazy form of [`tokenize`] used by the aggregation pass.
pub fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(['\n', ' '])
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}
