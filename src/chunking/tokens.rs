//! Token counting shared by the chunker and its overlap logic.

use super::ChunkingError;
use std::sync::Arc;
use tiktoken_rs::cl100k_base;

/// Counts tokens in a text segment.
pub type TokenCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// `cl100k_base` token counter.
pub fn cl100k_counter() -> Result<TokenCounter, ChunkingError> {
    let encoding = cl100k_base().map_err(|source| ChunkingError::Tokenizer {
        encoding: "cl100k_base".to_string(),
        source,
    })?;
    let encoding = Arc::new(encoding);
    Ok(Arc::new(move |segment: &str| {
        encoding.encode_ordinary(segment).len()
    }))
}

/// Whitespace token counter; every non-empty segment counts at least one token.
pub fn whitespace_counter() -> TokenCounter {
    Arc::new(|segment: &str| {
        let tokens = segment.split_whitespace().count();
        if tokens == 0 && !segment.trim().is_empty() {
            1
        } else {
            tokens
        }
    })
}

/// Longest word-aligned suffix of `text` whose token count fits `token_limit`.
pub(crate) fn tail_with_token_limit<'a>(
    text: &'a str,
    token_limit: usize,
    token_counter: &TokenCounter,
) -> &'a str {
    let text = text.trim_end();
    if token_limit == 0 || text.is_empty() {
        return "";
    }
    if token_counter.as_ref()(text) <= token_limit {
        return text.trim_start();
    }

    let word_starts: Vec<usize> = text
        .char_indices()
        .filter(|&(index, ch)| {
            !ch.is_whitespace()
                && text[..index]
                    .chars()
                    .next_back()
                    .is_some_and(char::is_whitespace)
        })
        .map(|(index, _)| index)
        .collect();

    // Suffix token counts shrink as the start moves right.
    let (mut low, mut high) = (0usize, word_starts.len());
    while low < high {
        let mid = (low + high) / 2;
        if token_counter.as_ref()(&text[word_starts[mid]..]) <= token_limit {
            high = mid;
        } else {
            low = mid + 1;
        }
    }

    word_starts
        .get(low)
        .map(|&start| &text[start..])
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_respects_token_limit() {
        let counter = whitespace_counter();
        assert_eq!(
            tail_with_token_limit("one two three four five", 2, &counter),
            "four five"
        );
        assert_eq!(tail_with_token_limit("one two", 5, &counter), "one two");
        assert_eq!(tail_with_token_limit("one two", 0, &counter), "");
    }

    #[test]
    fn tail_keeps_line_breaks_inside_suffix() {
        let counter = whitespace_counter();
        assert_eq!(
            tail_with_token_limit("alpha beta\n\ngamma delta\n", 3, &counter),
            "beta\n\ngamma delta"
        );
    }

    #[test]
    fn cl100k_counts_tokens() {
        let counter = cl100k_counter().expect("encoding");
        let count = counter.as_ref()("The quick brown fox jumps over the lazy dog.");
        assert!(count >= 9 && count <= 12, "unexpected token count {count}");
    }

    #[test]
    fn whitespace_counter_counts_words() {
        let counter = whitespace_counter();
        assert_eq!(counter.as_ref()("a b  c"), 3);
        assert_eq!(counter.as_ref()("   "), 0);
    }
}
