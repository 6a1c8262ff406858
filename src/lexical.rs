//! Web-search style lexical queries.
//!
//! Parses a free-form query into a [`WebQuery`]:
//!
//! - bare words are AND-ed together,
//! - `"quoted text"` is a phrase,
//! - `or` between two items forms an OR group,
//! - a leading `-` excludes an item.
//!
//! Words are lowercased and split on non-alphanumeric characters. A bare
//! stop word is dropped, but phrases keep every word so `"bank of america"`
//! still matches the indexed text. A word that splits into several tokens
//! (`state-of-the-art`) becomes a phrase. The parsed query can be rendered as
//! an SQLite FTS5 expression (where the `porter` tokenizer stems both sides)
//! or evaluated against a stream from [`index_tokens`], which stems with the
//! Snowball English stemmer.

use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::sync::LazyLock;

static STEMMER: LazyLock<Stemmer> = LazyLock::new(|| Stemmer::create(Algorithm::English));

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any",
        "are", "as", "at", "be", "because", "been", "before", "being", "below", "between",
        "both", "but", "by", "can", "did", "do", "does", "doing", "down", "during", "each",
        "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
        "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it",
        "its", "itself", "just", "me", "more", "most", "my", "myself", "no", "nor", "not",
        "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves",
        "out", "over", "own", "same", "she", "should", "so", "some", "such", "than", "that",
        "the", "their", "theirs", "them", "themselves", "then", "there", "these", "they",
        "this", "those", "through", "to", "too", "under", "until", "up", "very", "was", "we",
        "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will",
        "with", "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}

/// Lowercase and split on non-alphanumeric characters, keeping stop words.
pub fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// [`words`] without stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    words(text).into_iter().filter(|t| !is_stop_word(t)).collect()
}

pub fn stem(word: &str) -> String {
    STEMMER.stem(word).into_owned()
}

/// Stemmed tokens without stop words, for bag-of-words features.
pub fn analyze(text: &str) -> Vec<String> {
    tokenize(text).iter().map(|t| stem(t)).collect()
}

/// Stemmed tokens in document order with stop words kept, mirroring what
/// the FTS5 index stores. This is the stream [`WebQuery::matches`] expects.
pub fn index_tokens(text: &str) -> Vec<String> {
    words(text).iter().map(|t| stem(t)).collect()
}

/// A single query operand. Tokens are lowercased but not stemmed; phrase
/// tokens include stop words.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Term(String),
    Phrase(Vec<String>),
}

impl Item {
    fn from_text(text: &str) -> Option<Item> {
        let mut tokens = words(text);
        if tokens.iter().all(|t| is_stop_word(t)) {
            return None;
        }
        match tokens.len() {
            1 => tokens.pop().map(Item::Term),
            _ => Some(Item::Phrase(tokens)),
        }
    }

    fn to_fts5(&self) -> String {
        match self {
            Item::Term(t) => format!("\"{}\"", t.replace('"', "\"\"")),
            Item::Phrase(ts) => format!("\"{}\"", ts.join(" ").replace('"', "\"\"")),
        }
    }

    /// Number of occurrences in an [`index_tokens`] stream.
    fn occurrences(&self, tokens: &[String]) -> usize {
        match self {
            Item::Term(t) => {
                let s = stem(t);
                tokens.iter().filter(|tok| **tok == s).count()
            }
            Item::Phrase(ts) => {
                let stems: Vec<String> = ts.iter().map(|t| stem(t)).collect();
                if stems.is_empty() || tokens.len() < stems.len() {
                    return 0;
                }
                tokens
                    .windows(stems.len())
                    .filter(|w| w.iter().zip(stems.iter()).all(|(a, b)| a == b))
                    .count()
            }
        }
    }
}

/// A parsed web-search query: an AND of OR-groups, minus excluded items.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WebQuery {
    pub groups: Vec<Vec<Item>>,
    pub excluded: Vec<Item>,
}

#[derive(Debug)]
enum RawToken {
    Word { negated: bool, text: String },
    Quoted { negated: bool, text: String },
    Or,
}

fn lex(input: &str) -> Vec<RawToken> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }

        let mut negated = false;
        if chars[i] == '-' && i + 1 < chars.len() && !chars[i + 1].is_whitespace() {
            negated = true;
            i += 1;
        }

        if chars[i] == '"' {
            i += 1;
            let start = i;
            while i < chars.len() && chars[i] != '"' {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            i += 1; // closing quote, if any
            out.push(RawToken::Quoted { negated, text });
            continue;
        }

        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '"' {
            i += 1;
        }
        let text: String = chars[start..i].iter().collect();
        if !negated && text.eq_ignore_ascii_case("or") {
            out.push(RawToken::Or);
        } else {
            out.push(RawToken::Word { negated, text });
        }
    }

    out
}

impl WebQuery {
    pub fn parse(input: &str) -> WebQuery {
        let mut groups: Vec<Vec<(bool, Item)>> = Vec::new();
        let mut pending_or = false;

        for token in lex(input) {
            let (negated, text) = match token {
                RawToken::Or => {
                    pending_or = !groups.is_empty();
                    continue;
                }
                RawToken::Word { negated, text } | RawToken::Quoted { negated, text } => {
                    (negated, text)
                }
            };
            let Some(item) = Item::from_text(&text) else {
                continue;
            };
            match groups.last_mut() {
                Some(last) if pending_or => last.push((negated, item)),
                _ => groups.push(vec![(negated, item)]),
            }
            pending_or = false;
        }

        let mut query = WebQuery::default();
        for mut group in groups {
            if group.len() == 1 && group[0].0 {
                if let Some((_, item)) = group.pop() {
                    query.excluded.push(item);
                }
            } else {
                query
                    .groups
                    .push(group.into_iter().map(|(_, item)| item).collect());
            }
        }
        query
    }

    /// True when the query has nothing to match on.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.excluded.is_empty()
    }

    /// FTS5 expression for the positive part, if any.
    pub fn fts5_positive(&self) -> Option<String> {
        if self.groups.is_empty() {
            return None;
        }
        let rendered: Vec<String> = self
            .groups
            .iter()
            .map(|group| {
                if group.len() == 1 {
                    group[0].to_fts5()
                } else {
                    let alts: Vec<String> = group.iter().map(Item::to_fts5).collect();
                    format!("({})", alts.join(" OR "))
                }
            })
            .collect();
        Some(rendered.join(" AND "))
    }

    /// FTS5 expression matching any excluded item, if any.
    pub fn fts5_excluded(&self) -> Option<String> {
        if self.excluded.is_empty() {
            return None;
        }
        let alts: Vec<String> = self.excluded.iter().map(Item::to_fts5).collect();
        Some(alts.join(" OR "))
    }

    /// Evaluate against an [`index_tokens`] stream.
    pub fn matches(&self, tokens: &[String]) -> bool {
        if self.is_empty() {
            return false;
        }
        let groups_ok = self
            .groups
            .iter()
            .all(|group| group.iter().any(|item| item.occurrences(tokens) > 0));
        let excluded_ok = self
            .excluded
            .iter()
            .all(|item| item.occurrences(tokens) == 0);
        groups_ok && excluded_ok
    }

    /// Frequency-based rank for a matching token stream, `>= 0`.
    ///
    /// Queries without positive items rank every match at `0.0`.
    pub fn rank(&self, tokens: &[String]) -> f64 {
        if self.groups.is_empty() || tokens.is_empty() {
            return 0.0;
        }
        let hits: usize = self
            .groups
            .iter()
            .flat_map(|group| group.iter())
            .map(|item| item.occurrences(tokens))
            .sum();
        0.1 * hits as f64 / (1.0 + (tokens.len() as f64).ln())
    }
}
