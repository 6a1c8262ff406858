//! Page-bounded word chunker.
//!
//! Each page is split on whitespace and words are packed greedily into
//! chunks whose token weight stays within `max_tokens`. A word weighs as
//! many tokens as it contains `\w+` runs (so `e-mail` weighs 2 and `--`
//! weighs 0). Chunks never span pages and empty pages yield none.

/// A chunk of one page's text, before embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct PageChunk {
    /// 1-based page number.
    pub page_number: i64,
    /// Words joined by single spaces.
    pub content: String,
    /// Number of whitespace-separated words in `content`.
    pub tokens: i64,
}

/// Chunk every page. `pages[0]` is page 1.
pub fn chunk_pages(pages: &[String], max_tokens: usize) -> Vec<PageChunk> {
    pages
        .iter()
        .enumerate()
        .flat_map(|(i, text)| {
            let page_number = i as i64 + 1;
            chunk_page(text, max_tokens)
                .into_iter()
                .map(move |content| PageChunk {
                    page_number,
                    tokens: content.split_whitespace().count() as i64,
                    content,
                })
        })
        .collect()
}

/// Chunk a single page of text.
///
/// A chunk is flushed when adding the next word would push its weight past
/// `max_tokens`. A word heavier than `max_tokens` on its own becomes a
/// chunk by itself.
pub fn chunk_page(text: &str, max_tokens: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_weight = 0usize;

    for word in text.split_whitespace() {
        let weight = token_weight(word);
        if current_weight + weight > max_tokens && !current.is_empty() {
            chunks.push(current.join(" "));
            current.clear();
            current_weight = 0;
        }
        current.push(word);
        current_weight += weight;
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}

/// Number of maximal runs of word characters (alphanumeric or `_`).
pub fn token_weight(word: &str) -> usize {
    let mut runs = 0;
    let mut in_run = false;
    for c in word.chars() {
        let is_word = c.is_alphanumeric() || c == '_';
        if is_word && !in_run {
            runs += 1;
        }
        in_run = is_word;
    }
    runs
}
