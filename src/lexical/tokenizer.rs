//! Lexical tokenizer shared by document indexing and query parsing.
//!
//! Lowercases, splits on non-alphanumeric characters, and drops English stop
//! words and single-character tokens.

use ahash::AHashSet;
use std::sync::LazyLock;

static STOP_WORDS: LazyLock<AHashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any",
        "are", "as", "at", "be", "because", "been", "before", "being", "below", "between",
        "both", "but", "by", "can", "did", "do", "does", "doing", "down", "during", "each",
        "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
        "hers", "him", "his", "how", "if", "in", "into", "is", "it", "its", "itself", "just",
        "me", "more", "most", "my", "no", "nor", "not", "now", "of", "off", "on", "once",
        "only", "or", "other", "our", "ours", "out", "over", "own", "same", "she", "should",
        "so", "some", "such", "than", "that", "the", "their", "theirs", "them", "then",
        "there", "these", "they", "this", "those", "through", "to", "too", "under", "until",
        "up", "very", "was", "we", "were", "what", "when", "where", "which", "while", "who",
        "whom", "why", "will", "with", "you", "your", "yours",
    ]
    .into_iter()
    .collect()
});

/// Tokenize text into normalized lexical tokens, preserving order.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() > 1 && !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Whether `token` is discarded by [`tokenize`] as a stop word.
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(token)
}
