//! Result artifacts written to the output directory.
//!
//! - **Search CSV**: `{mode}_search_{query}_doc{id}_{timestamp}.csv` with
//!   header `ID,Page Number,Content,Rank,Distance`, one row per result.
//! - **QA report**: `{mode}_search_llm_response_{timestamp}.txt` recording
//!   the query parameters, the context (or a placeholder), and the answer.
//!
//! Timestamps are local time formatted `%Y%m%d_%H%M%S`. The directory is
//! created when missing; write failures surface as [`Error::Io`](crate::error::Error::Io).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::models::{QaExchange, SearchResult};

pub const CSV_HEADER: &str = "ID,Page Number,Content,Rank,Distance";
pub const CONTEXT_PLACEHOLDER: &str = "Context not saved in file for brevity";

fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Filename-safe form of a query: lowercased, spaces become `_`, anything
/// other than alphanumerics, `_` and `-` is dropped.
pub fn sanitize_query(query: &str) -> String {
    query
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_alphanumeric() || c == '_' || c == '-' => Some(c),
            _ => None,
        })
        .collect()
}

/// Quote a CSV field when it contains a comma, quote, CR, or LF.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn csv_filename(mode: &str, query: &str, document_id: i64, timestamp: &str) -> String {
    format!(
        "{}_search_{}_doc{}_{}.csv",
        mode,
        sanitize_query(query),
        document_id,
        timestamp
    )
}

/// Render rows as CSV text, header included.
pub fn render_csv(rows: &[SearchResult]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push_str("\r\n");
    for r in rows {
        out.push_str(&format!(
            "{},{},{},{},{}\r\n",
            r.chunk_id,
            r.page_number,
            csv_field(&r.content),
            r.rank,
            r.distance
        ));
    }
    out
}

/// Write search results to a new CSV file under `dir`, returning its path.
pub fn write_search_csv(
    dir: &Path,
    mode: &str,
    query: &str,
    document_id: i64,
    rows: &[SearchResult],
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(csv_filename(mode, query, document_id, &timestamp()));
    fs::write(&path, render_csv(rows))?;
    debug!(path = %path.display(), rows = rows.len(), "wrote search results");
    Ok(path)
}

/// Render a QA exchange as the report text.
pub fn render_qa_report(exchange: &QaExchange, include_context: bool) -> String {
    let context = if include_context {
        exchange.context.as_str()
    } else {
        CONTEXT_PLACEHOLDER
    };
    format!(
        "Search Query: {}\nDocument ID: {}\nSearch Type: {}\nLLM Model: {}\nLLM Query: {}\n\nContext:\n{}\n\nLLM Response:\n{}",
        exchange.query,
        exchange.document_id,
        exchange.search_type,
        exchange.model,
        exchange.question,
        context,
        exchange.answer
    )
}

/// Write a QA report under `dir`, returning its path.
pub fn write_qa_report(dir: &Path, exchange: &QaExchange, include_context: bool) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "{}_search_llm_response_{}.txt",
        exchange.search_type,
        timestamp()
    ));
    let mut file = fs::File::create(&path)?;
    file.write_all(render_qa_report(exchange, include_context).as_bytes())?;
    debug!(path = %path.display(), "wrote QA report");
    Ok(path)
}
