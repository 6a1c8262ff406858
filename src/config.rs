use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/intellidoc.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_max_tokens() -> usize {
    500
}

/// How the hybrid ranker combines its two branches.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HybridStrategy {
    /// Union of both branches without deduplication, ordered by
    /// `rank + (1 - distance)`.
    #[default]
    UnionAll,
    /// Deduplicated by chunk with a min-max normalized weighted sum.
    Fused,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_hybrid_limit")]
    pub hybrid_limit: usize,
    #[serde(default)]
    pub hybrid_strategy: HybridStrategy,
    #[serde(default = "default_hybrid_alpha")]
    pub hybrid_alpha: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            hybrid_limit: default_hybrid_limit(),
            hybrid_strategy: HybridStrategy::default(),
            hybrid_alpha: default_hybrid_alpha(),
        }
    }
}

fn default_hybrid_limit() -> usize {
    10
}
fn default_hybrid_alpha() -> f64 {
    0.6
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            dims: default_dims(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_model() -> String {
    "gpt-4".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub include_context: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            include_context: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)
        .map_err(|e| Error::Config(format!("failed to parse config file: {}", e)))?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_tokens == 0 {
        return Err(Error::Config("chunking.max_tokens must be > 0".into()));
    }

    if config.retrieval.hybrid_limit < 1 {
        return Err(Error::Config("retrieval.hybrid_limit must be >= 1".into()));
    }

    if !(0.0..=1.0).contains(&config.retrieval.hybrid_alpha) {
        return Err(Error::Config(
            "retrieval.hybrid_alpha must be in [0.0, 1.0]".into(),
        ));
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "hash" => {}
        other => {
            return Err(Error::Config(format!(
                "unknown embedding provider: '{}'. Must be disabled, openai, or hash.",
                other
            )))
        }
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims == 0 {
            return Err(Error::Config(format!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            )));
        }
        if config.embedding.batch_size == 0 {
            return Err(Error::Config("embedding.batch_size must be > 0".into()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.chunking.max_tokens, 500);
        assert_eq!(config.retrieval.hybrid_limit, 10);
        assert_eq!(config.retrieval.hybrid_strategy, HybridStrategy::UnionAll);
        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.embedding.dims, 1536);
        assert_eq!(config.llm.model, "gpt-4");
        assert!(!config.output.include_context);
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_config(
            r#"
[db]
path = "/tmp/x.sqlite"

[retrieval]
hybrid_strategy = "fused"
hybrid_alpha = 0.25

[embedding]
provider = "hash"
dims = 64
"#,
        )
        .unwrap();
        assert_eq!(config.db.path, PathBuf::from("/tmp/x.sqlite"));
        assert_eq!(config.retrieval.hybrid_strategy, HybridStrategy::Fused);
        assert_eq!(config.retrieval.hybrid_alpha, 0.25);
        assert_eq!(config.embedding.dims, 64);
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
    }

    #[test]
    fn test_rejects_zero_max_tokens() {
        let err = parse_config("[chunking]\nmax_tokens = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_alpha_out_of_range() {
        assert!(parse_config("[retrieval]\nhybrid_alpha = 1.5\n").is_err());
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let err = parse_config("[embedding]\nprovider = \"cohere\"\n").unwrap_err();
        assert!(err.to_string().contains("unknown embedding provider"));
    }

    #[test]
    fn test_rejects_unknown_strategy() {
        assert!(parse_config("[retrieval]\nhybrid_strategy = \"rrf\"\n").is_err());
    }

    #[test]
    fn test_disabled_provider_skips_dims_check() {
        let config = parse_config("[embedding]\nprovider = \"disabled\"\ndims = 0\n").unwrap();
        assert!(!config.embedding.is_enabled());
    }
}
