//! # IntelliDoc CLI (`intellidoc`)
//!
//! Ingests PDFs, searches a document's chunks, and answers questions from
//! the retrieved context.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `intellidoc init` | Create the SQLite database and schema |
//! | `intellidoc ingest <pdf>` | Extract, chunk, embed, and store a PDF |
//! | `intellidoc documents` | List ingested documents |
//! | `intellidoc search <mode> "<query>" --document <id>` | Search and write a CSV |
//! | `intellidoc qa <mode> "<query>" --document <id> --question "<q>"` | Answer a question |
//!
//! Logging goes to stderr and is controlled by `INTELLIDOC_LOG` or `-v`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use intellidoc::config::{self, Config};
use intellidoc::embedding::{self, DisabledEmbedder, Embedder};
use intellidoc::ingest;
use intellidoc::llm::OpenAiChat;
use intellidoc::migrate;
use intellidoc::openai::OpenAiClient;
use intellidoc::output;
use intellidoc::qa::{QaEngine, QaRequest};
use intellidoc::search::{SearchMode, Searcher};
use intellidoc::sqlite_store::SqliteStore;
use intellidoc::store::Store;

/// IntelliDoc: PDF ingestion with lexical, vector, and hybrid search.
#[derive(Parser)]
#[command(name = "intellidoc", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/intellidoc.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema. Safe to run repeatedly.
    Init,

    /// Ingest a PDF as a new document.
    Ingest {
        /// Path to the PDF file.
        pdf: PathBuf,

        /// Name to store the document under (defaults to the file name).
        #[arg(long)]
        name: Option<String>,
    },

    /// List ingested documents with their chunk counts.
    Documents,

    /// Search one document and write the results to a CSV file.
    Search {
        /// lexical (full_text, keyword), vector (semantic), or hybrid.
        mode: String,

        query: String,

        #[arg(long)]
        document: i64,

        /// Maximum rows for hybrid search.
        #[arg(long)]
        limit: Option<usize>,

        /// Output directory (overrides `[output] dir`).
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Answer a question from the chunks a search retrieves.
    Qa {
        mode: String,

        query: String,

        #[arg(long)]
        document: i64,

        #[arg(long)]
        question: String,

        /// Chat model (overrides `[llm] model`).
        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    let filter = if let Ok(env) = std::env::var("INTELLIDOC_LOG") {
        EnvFilter::new(env)
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            _ => EnvFilter::new("debug"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Embedder for commands that need one; everything else gets the disabled
/// embedder so no API key is required.
fn build_embedder(cfg: &Config, needed: bool) -> anyhow::Result<Box<dyn Embedder>> {
    if !needed {
        return Ok(Box::new(DisabledEmbedder));
    }
    let client = if cfg.embedding.provider == "openai" {
        Some(OpenAiClient::from_env(&cfg.openai)?)
    } else {
        None
    };
    Ok(embedding::create_embedder(&cfg.embedding, client.as_ref())?)
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn snippet(text: &str, max: usize) -> String {
    let mut s: String = text.chars().take(max).collect();
    if text.chars().count() > max {
        s.push_str("...");
    }
    s
}

fn output_dir<'a>(cfg: &'a Config, flag: &'a Option<PathBuf>) -> &'a Path {
    flag.as_deref().unwrap_or(cfg.output.dir.as_path())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg.db.path)
                .await
                .with_context(|| format!("failed to initialize {}", cfg.db.path.display()))?;
            println!("Database initialized at {}", cfg.db.path.display());
        }
        Commands::Ingest { pdf, name } => {
            let name = match name {
                Some(n) => n,
                None => pdf
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .context("PDF path has no file name; pass --name")?,
            };
            let store = SqliteStore::open(&cfg.db.path)?;
            let embedder = build_embedder(&cfg, true)?;
            let report = ingest::ingest_pdf(&cfg, &store, embedder.as_ref(), &pdf, &name)
                .await
                .with_context(|| format!("failed to ingest {}", pdf.display()))?;
            println!(
                "Ingested document {} ({} chunks from {} pages)",
                report.document_id, report.chunks, report.pages
            );
        }
        Commands::Documents => {
            let store = SqliteStore::open(&cfg.db.path)?;
            let docs = store.list_documents().await?;
            if docs.is_empty() {
                println!("No documents.");
            }
            for d in docs {
                println!(
                    "{}\t{}\t{} chunks\t{}",
                    d.document.id,
                    d.document.file_name,
                    d.chunk_count,
                    format_ts_iso(d.document.upload_date)
                );
            }
        }
        Commands::Search {
            mode,
            query,
            document,
            limit,
            output,
        } => {
            let mode: SearchMode = mode.parse()?;
            let store = SqliteStore::open(&cfg.db.path)?;
            let embedder = build_embedder(&cfg, mode.needs_embedding())?;
            let searcher = Searcher::new(&store, embedder.as_ref(), &cfg.retrieval);

            let rows = searcher.search(mode, &query, document, limit).await?;
            if rows.is_empty() {
                println!("No results.");
            }
            for (i, r) in rows.iter().enumerate() {
                println!(
                    "{}. [chunk {}] page {}  rank={:.4} distance={:.4}",
                    i + 1,
                    r.chunk_id,
                    r.page_number,
                    r.rank,
                    r.distance
                );
                println!("   {}", snippet(&r.content, 120));
            }

            let path = output::write_search_csv(
                output_dir(&cfg, &output),
                mode.as_str(),
                &query,
                document,
                &rows,
            )?;
            println!("Results saved to {}", path.display());
        }
        Commands::Qa {
            mode,
            query,
            document,
            question,
            model,
            output,
        } => {
            let search_mode: SearchMode = mode.parse()?;
            let store = SqliteStore::open(&cfg.db.path)?;
            let embedder = build_embedder(&cfg, search_mode.needs_embedding())?;
            let chat = OpenAiChat::new(OpenAiClient::from_env(&cfg.openai)?, &cfg.llm);
            let engine = QaEngine::new(
                Searcher::new(&store, embedder.as_ref(), &cfg.retrieval),
                &chat,
            );

            let model = model.unwrap_or_else(|| cfg.llm.model.clone());
            let exchange = engine
                .ask(&QaRequest {
                    mode: search_mode.as_str(),
                    query: &query,
                    document_id: document,
                    question: &question,
                    model: &model,
                })
                .await?;

            println!("{}", exchange.answer);
            let path = output::write_qa_report(
                output_dir(&cfg, &output),
                &exchange,
                cfg.output.include_context,
            )?;
            println!("Response saved to {}", path.display());
        }
    }

    Ok(())
}
