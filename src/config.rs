//! TOML configuration.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all, via [`Config::default`]) is a valid configuration:
//!
//! ```toml
//! [chunking]
//! max_chars = 1000
//! overlap_chars = 200
//!
//! [retrieval]
//! top_k = 4
//!
//! [embedding]
//! provider = "local"          # local | hash | openai | ollama
//! model = "all-minilm-l6-v2"
//!
//! [llm]
//! base_url = "https://api.groq.com/openai/v1"
//! api_key_env = "GROQ_API_KEY"
//! model = "openai/gpt-oss-120b"
//! temperature = 0.0
//! max_tokens = 1024
//! timeout_secs = 60
//!
//! [prompt]
//! max_history_turns = 20
//! max_history_chars = 8000
//! ```

use anyhow::{Context, Result};
use athena_rag_core::chunk::{DEFAULT_MAX_CHARS, DEFAULT_OVERLAP_CHARS};
use athena_rag_core::prompt::PromptLimits;
use athena_rag_core::retrieve::DEFAULT_TOP_K;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub prompt: PromptConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            overlap_chars: DEFAULT_OVERLAP_CHARS,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: Option<String>,
    pub dims: Option<usize>,
    /// API root for the `openai` and `ollama` providers.
    pub url: Option<String>,
    pub batch_size: usize,
    pub max_retries: u32,
    /// Bounds model load plus embedding of a whole document.
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 120,
        }
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
fn default_embedding_provider() -> String {
    "local".to_string()
}

#[cfg(not(feature = "local-embeddings-fastembed"))]
fn default_embedding_provider() -> String {
    "hash".to_string()
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible API root (Groq by default).
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            model: "openai/gpt-oss-120b".to_string(),
            temperature: 0.0,
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PromptConfig {
    pub max_history_turns: usize,
    pub max_history_chars: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        let limits = PromptLimits::default();
        Self {
            max_history_turns: limits.max_history_turns,
            max_history_chars: limits.max_history_chars,
        }
    }
}

impl PromptConfig {
    pub fn limits(&self) -> PromptLimits {
        PromptLimits {
            max_history_turns: self.max_history_turns,
            max_history_chars: self.max_history_chars,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        // Validate chunking
        if self.chunking.max_chars == 0 {
            anyhow::bail!("chunking.max_chars must be > 0");
        }
        if self.chunking.overlap_chars >= self.chunking.max_chars {
            anyhow::bail!("chunking.overlap_chars must be smaller than chunking.max_chars");
        }

        // Validate retrieval
        if self.retrieval.top_k < 1 {
            anyhow::bail!("retrieval.top_k must be >= 1");
        }

        // Validate embedding
        match self.embedding.provider.as_str() {
            "local" | "hash" | "openai" | "ollama" => {}
            other => anyhow::bail!(
                "Unknown embedding provider: '{}'. Must be local, hash, openai, or ollama.",
                other
            ),
        }
        if self.embedding.provider == "openai" && self.embedding.model.is_none() {
            anyhow::bail!("embedding.model must be specified when provider is 'openai'");
        }
        if self.embedding.dims == Some(0) {
            anyhow::bail!("embedding.dims must be > 0");
        }
        if self.embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be > 0");
        }
        if self.embedding.timeout_secs == 0 {
            anyhow::bail!("embedding.timeout_secs must be > 0");
        }

        // Validate llm
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
        }
        if self.llm.max_tokens == 0 {
            anyhow::bail!("llm.max_tokens must be >= 1");
        }
        if self.llm.timeout_secs == 0 {
            anyhow::bail!("llm.timeout_secs must be > 0");
        }
        if self.llm.model.trim().is_empty() {
            anyhow::bail!("llm.model must not be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("");
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.chunking.max_chars, 1000);
        assert_eq!(cfg.chunking.overlap_chars, 200);
        assert_eq!(cfg.retrieval.top_k, 4);
        assert_eq!(cfg.llm.api_key_env, "GROQ_API_KEY");
        assert_eq!(cfg.llm.temperature, 0.0);
        assert_eq!(cfg.prompt.max_history_turns, 20);
    }

    #[test]
    fn test_partial_sections() {
        let file = write_config(
            r#"
[chunking]
max_chars = 500

[embedding]
provider = "hash"
dims = 64

[llm]
model = "llama-3.3-70b-versatile"
"#,
        );
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.chunking.max_chars, 500);
        assert_eq!(cfg.chunking.overlap_chars, 200);
        assert_eq!(cfg.embedding.provider, "hash");
        assert_eq!(cfg.embedding.dims, Some(64));
        assert_eq!(cfg.llm.model, "llama-3.3-70b-versatile");
        assert_eq!(cfg.llm.max_tokens, 1024);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let file = write_config("[chunking]\nmax_chars = 100\noverlap_chars = 100\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("overlap_chars"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let file = write_config("[embedding]\nprovider = \"quantum\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_temperature_range() {
        let file = write_config("[llm]\ntemperature = 3.5\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let file = write_config("[retrieval]\ntop_k = 0\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/athena.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_default_is_valid() {
        Config::default().validate().unwrap();
    }
}
