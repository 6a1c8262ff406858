//! Retrieval over a single document's chunks.
//!
//! Three modes are supported, selected by [`SearchMode`]:
//!
//! | Mode | Candidates | Ordering | Limit |
//! |------|-----------|----------|-------|
//! | [`Lexical`](SearchMode::Lexical) | chunks matching the web-search query | rank, descending | 10 |
//! | [`Vector`](SearchMode::Vector) | every chunk of the document | cosine distance, ascending | 10 |
//! | [`Hybrid`](SearchMode::Hybrid) | both of the above, unioned | `rank + (1 - distance)`, descending | `n` |
//!
//! # Hybrid Ranking
//!
//! The default [`HybridStrategy::UnionAll`] concatenates the lexical rows
//! (`distance = 0`) and the vector rows (`rank = 0`) **without** merging rows
//! that share a chunk: a chunk matched by both branches appears twice. Each
//! row is scored on its own branch's value:
//!
//! ```text
//! combined = rank + (1 - distance)
//! ```
//!
//! Rows are stably sorted by `combined` descending and the first `n` kept.
//!
//! [`HybridStrategy::Fused`] is the alternative: one row per chunk, with
//! min-max normalized lexical rank `k` and similarity `v` combined as
//! `(1 - α)·k + α·v`, ties broken by chunk id.
//!
//! The query is embedded exactly once per vector or hybrid search.
//!
//! # Degraded Results
//!
//! When the store is unreachable ([`Error::Connection`]), every search
//! returns an empty list and logs a warning. Callers cannot tell this apart
//! from a genuine empty match. Embedding failures and statement errors are
//! propagated.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::config::{HybridStrategy, RetrievalConfig};
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::models::{ChunkHit, SearchResult};
use crate::store::Store;

/// Row cap for lexical and vector searches.
pub const RESULT_LIMIT: usize = 10;

/// Retrieval mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMode {
    Lexical,
    Vector,
    Hybrid,
}

impl SearchMode {
    pub const ALL: [SearchMode; 3] = [SearchMode::Lexical, SearchMode::Vector, SearchMode::Hybrid];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Lexical => "lexical",
            SearchMode::Vector => "vector",
            SearchMode::Hybrid => "hybrid",
        }
    }

    /// Whether this mode embeds the query.
    pub fn needs_embedding(&self) -> bool {
        !matches!(self, SearchMode::Lexical)
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexical" | "full_text" | "keyword" => Ok(SearchMode::Lexical),
            "vector" | "semantic" => Ok(SearchMode::Vector),
            "hybrid" => Ok(SearchMode::Hybrid),
            other => Err(Error::InvalidArgument(format!(
                "unknown search mode '{}'; use lexical, vector, or hybrid",
                other
            ))),
        }
    }
}

/// Runs searches against a [`Store`] with a given [`Embedder`].
pub struct Searcher<'a> {
    store: &'a dyn Store,
    embedder: &'a dyn Embedder,
    retrieval: &'a RetrievalConfig,
}

impl<'a> Searcher<'a> {
    pub fn new(
        store: &'a dyn Store,
        embedder: &'a dyn Embedder,
        retrieval: &'a RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            retrieval,
        }
    }

    /// Dispatch on `mode`. `limit` only applies to hybrid search, must be
    /// `>= 1`, and defaults to `retrieval.hybrid_limit`.
    pub async fn search(
        &self,
        mode: SearchMode,
        query: &str,
        document_id: i64,
        limit: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        if limit == Some(0) {
            return Err(Error::InvalidArgument("limit must be >= 1".into()));
        }
        match mode {
            SearchMode::Lexical => self.lexical_search(query, document_id).await,
            SearchMode::Vector => self.vector_search(query, document_id).await,
            SearchMode::Hybrid => {
                let n = limit.unwrap_or(self.retrieval.hybrid_limit);
                self.hybrid_search(query, document_id, n).await
            }
        }
    }

    /// Up to [`RESULT_LIMIT`] matching chunks by descending lexical rank.
    pub async fn lexical_search(&self, query: &str, document_id: i64) -> Result<Vec<SearchResult>> {
        let hits = match self.store.lexical_matches(document_id, query).await {
            Ok(hits) => hits,
            Err(e) if e.is_connection() => return Ok(degraded("lexical", &e)),
            Err(e) => return Err(e),
        };
        debug!(document_id, matches = hits.len(), "lexical candidates");
        Ok(rank_lexical(hits, RESULT_LIMIT))
    }

    /// Up to [`RESULT_LIMIT`] chunks by ascending cosine distance.
    pub async fn vector_search(&self, query: &str, document_id: i64) -> Result<Vec<SearchResult>> {
        let query_vec = self.embedder.embed(query).await?;
        let hits = match self.store.chunk_distances(document_id, &query_vec).await {
            Ok(hits) => hits,
            Err(e) if e.is_connection() => return Ok(degraded("vector", &e)),
            Err(e) => return Err(e),
        };
        debug!(document_id, candidates = hits.len(), "vector candidates");
        Ok(rank_vector(hits, RESULT_LIMIT))
    }

    /// Up to `n` rows from both branches, combined per the configured
    /// [`HybridStrategy`].
    pub async fn hybrid_search(
        &self,
        query: &str,
        document_id: i64,
        n: usize,
    ) -> Result<Vec<SearchResult>> {
        let query_vec = self.embedder.embed(query).await?;
        let (lexical, vector) = match self
            .store
            .hybrid_candidates(document_id, query, &query_vec)
            .await
        {
            Ok(sets) => sets,
            Err(e) if e.is_connection() => return Ok(degraded("hybrid", &e)),
            Err(e) => return Err(e),
        };
        debug!(
            document_id,
            lexical = lexical.len(),
            vector = vector.len(),
            strategy = ?self.retrieval.hybrid_strategy,
            "hybrid candidates"
        );

        Ok(match self.retrieval.hybrid_strategy {
            HybridStrategy::UnionAll => rank_union_all(lexical, vector, n),
            HybridStrategy::Fused => rank_fused(lexical, vector, self.retrieval.hybrid_alpha, n),
        })
    }
}

fn degraded(mode: &str, err: &Error) -> Vec<SearchResult> {
    warn!(mode, error = %err, "store unreachable; returning no results");
    Vec::new()
}

/// Lexical rows by descending rank, truncated to `n`.
pub fn rank_lexical(hits: Vec<ChunkHit>, n: usize) -> Vec<SearchResult> {
    let mut rows: Vec<SearchResult> = hits.into_iter().map(SearchResult::from_lexical).collect();
    rows.sort_by(|a, b| {
        b.rank
            .partial_cmp(&a.rank)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows.truncate(n);
    rows
}

/// Vector rows by ascending distance, truncated to `n`.
pub fn rank_vector(hits: Vec<ChunkHit>, n: usize) -> Vec<SearchResult> {
    let mut rows: Vec<SearchResult> = hits.into_iter().map(SearchResult::from_vector).collect();
    rows.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows.truncate(n);
    rows
}

/// Union of both branches, no deduplication, ordered by
/// [`SearchResult::combined_score`] descending. The sort is stable, so
/// equal scores keep lexical rows ahead of vector rows.
pub fn rank_union_all(lexical: Vec<ChunkHit>, vector: Vec<ChunkHit>, n: usize) -> Vec<SearchResult> {
    let mut rows: Vec<SearchResult> = lexical
        .into_iter()
        .map(SearchResult::from_lexical)
        .chain(vector.into_iter().map(SearchResult::from_vector))
        .collect();

    rows.sort_by(|a, b| {
        b.combined_score()
            .partial_cmp(&a.combined_score())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows.truncate(n);
    rows
}

/// One row per chunk, scored `(1 - alpha)·k + alpha·v` over min-max
/// normalized lexical rank `k` and similarity `v`. Rows carry the chunk's
/// real rank (0 when unmatched lexically) and distance.
pub fn rank_fused(
    lexical: Vec<ChunkHit>,
    vector: Vec<ChunkHit>,
    alpha: f64,
    n: usize,
) -> Vec<SearchResult> {
    let kw_norm = normalize_scores(&lexical.iter().map(|h| h.score.max(0.0)).collect::<Vec<_>>());
    let vec_norm = normalize_scores(&vector.iter().map(|h| 1.0 - h.score).collect::<Vec<_>>());

    struct Fused {
        row: SearchResult,
        k: f64,
        v: f64,
    }

    let mut merged: HashMap<i64, Fused> = HashMap::new();
    for (hit, k) in lexical.into_iter().zip(kw_norm) {
        let entry = merged.entry(hit.chunk_id).or_insert_with(|| Fused {
            row: SearchResult {
                chunk_id: hit.chunk_id,
                page_number: hit.page_number,
                content: hit.content.clone(),
                rank: 0.0,
                distance: 0.0,
            },
            k: 0.0,
            v: 0.0,
        });
        entry.row.rank = hit.score.max(0.0);
        entry.k = k;
    }
    for (hit, v) in vector.into_iter().zip(vec_norm) {
        let entry = merged.entry(hit.chunk_id).or_insert_with(|| Fused {
            row: SearchResult {
                chunk_id: hit.chunk_id,
                page_number: hit.page_number,
                content: hit.content.clone(),
                rank: 0.0,
                distance: 0.0,
            },
            k: 0.0,
            v: 0.0,
        });
        entry.row.distance = hit.score;
        entry.v = v;
    }

    let mut scored: Vec<(f64, SearchResult)> = merged
        .into_values()
        .map(|f| ((1.0 - alpha) * f.k + alpha * f.v, f.row))
        .collect();

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.chunk_id.cmp(&b.1.chunk_id))
    });
    scored.truncate(n);
    scored.into_iter().map(|(_, row)| row).collect()
}

/// Min-max normalize scores to `[0.0, 1.0]`.
///
/// ```text
/// norm(s) = (s - min) / (max - min)
/// ```
///
/// If all scores are equal, every value normalizes to `1.0`.
pub fn normalize_scores(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }

    let s_min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let s_max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    scores
        .iter()
        .map(|s| {
            if (s_max - s_min).abs() < f64::EPSILON {
                1.0
            } else {
                (s - s_min) / (s_max - s_min)
            }
        })
        .collect()
}
