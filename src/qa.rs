//! Question answering over retrieved chunks.
//!
//! Runs one search, joins the rows into a context string (one
//! `Page {n}: {content}` line per row, in result order), and hands
//! `{context, question}` to a [`LanguageModel`]. The answer is returned
//! exactly as the model produced it.

use tracing::info;

use crate::error::Result;
use crate::llm::LanguageModel;
use crate::models::{QaExchange, SearchResult};
use crate::search::{SearchMode, Searcher};

/// Inputs to one QA call. `mode` is parsed before any work happens.
#[derive(Debug, Clone)]
pub struct QaRequest<'a> {
    pub mode: &'a str,
    pub query: &'a str,
    pub document_id: i64,
    pub question: &'a str,
    pub model: &'a str,
}

pub struct QaEngine<'a> {
    searcher: Searcher<'a>,
    llm: &'a dyn LanguageModel,
}

impl<'a> QaEngine<'a> {
    pub fn new(searcher: Searcher<'a>, llm: &'a dyn LanguageModel) -> Self {
        Self { searcher, llm }
    }

    /// Answer `request.question` from the chunks retrieved for `request.query`.
    ///
    /// An unknown mode fails with `InvalidArgument` before the store, the
    /// embedder, or the model is touched. Model failures propagate.
    pub async fn ask(&self, request: &QaRequest<'_>) -> Result<QaExchange> {
        let mode: SearchMode = request.mode.parse()?;

        let rows = self
            .searcher
            .search(mode, request.query, request.document_id, None)
            .await?;
        let context = build_context(&rows);
        info!(mode = %mode, rows = rows.len(), model = request.model, "asking model");

        let answer = self
            .llm
            .answer(&context, request.question, request.model)
            .await?;

        Ok(QaExchange {
            search_type: mode.as_str().to_string(),
            query: request.query.to_string(),
            document_id: request.document_id,
            context,
            question: request.question.to_string(),
            model: request.model.to_string(),
            answer,
        })
    }
}

/// One `Page {n}: {content}` line per row, joined by `\n`.
pub fn build_context(rows: &[SearchResult]) -> String {
    rows.iter()
        .map(|r| format!("Page {}: {}", r.page_number, r.content))
        .collect::<Vec<_>>()
        .join("\n")
}
