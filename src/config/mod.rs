//! Configuration management for civica
//!
//! A single TOML file drives corpus location, backend selection and every
//! retrieval tunable. Values can be overridden per named profile and through
//! `CIVICA_SECTION__KEY` environment variables.

use crate::error::{CivicaError, Result};
use crate::lexical::Bm25Params;
use crate::retrieval::RetrievalSettings;
use crate::vector::HnswParams;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub corpus: CorpusConfig,
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// JSON array or JSON-lines document file; `~/` is expanded
    pub path: PathBuf,
}

/// Query embedding backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "fastembed" or "http"
    pub backend: String,
    pub model: String,
    /// Base URL of an OpenAI-compatible API (http backend only)
    pub endpoint: String,
    pub api_key_env: String,
    pub dimension: usize,
    pub timeout_ms: u64,
    pub cache_capacity: usize,
}

/// Vector similarity backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// "memory" (in-process HNSW) or "http"
    pub backend: String,
    pub endpoint: String,
    pub api_key_env: String,
    #[serde(default)]
    pub namespace: String,
    pub dimension: usize,
    pub timeout_ms: u64,
    pub hnsw_m: usize,
    pub hnsw_ef_construction: usize,
    pub hnsw_ef_search: usize,
}

/// Fusion and lexical scoring parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub vector_weight: f64,
    pub lexical_weight: f64,
    pub rrf_k: f64,
    pub retrieval_depth: usize,
    pub top_k: usize,
    pub result_cache_capacity: usize,
    pub bm25_k1: f32,
    pub bm25_b: f32,
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub context_documents: usize,
    pub excerpt_chars: usize,
    pub timeout_ms: u64,
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval_depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::read(path)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        // Validate configuration
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CivicaError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CivicaError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to a file, stamping `_meta.last_modified`
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.meta.last_modified = current_timestamp();
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| CivicaError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.apply_profile(profile)?;
        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| CivicaError::Config(format!("Unknown profile: {}", profile)))?;

        if let Some(weight) = overrides.vector_weight {
            self.retrieval.vector_weight = weight;
        }
        if let Some(weight) = overrides.lexical_weight {
            self.retrieval.lexical_weight = weight;
        }
        if let Some(depth) = overrides.retrieval_depth {
            self.retrieval.retrieval_depth = depth;
        }
        if let Some(top_k) = overrides.top_k {
            self.retrieval.top_k = top_k;
        }
        if let Some(enabled) = overrides.llm_enabled {
            self.llm.enabled = enabled;
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }

        tracing::debug!("Applied profile '{}'", profile);
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: CIVICA_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("CIVICA_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "CORPUS__PATH" => self.corpus.path = PathBuf::from(value),
            "EMBEDDING__BACKEND" => self.embedding.backend = value.to_string(),
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "EMBEDDING__ENDPOINT" => self.embedding.endpoint = value.to_string(),
            "EMBEDDING__DIMENSION" => self.embedding.dimension = parse_env(path, value)?,
            "EMBEDDING__TIMEOUT_MS" => self.embedding.timeout_ms = parse_env(path, value)?,
            "VECTOR_STORE__BACKEND" => self.vector_store.backend = value.to_string(),
            "VECTOR_STORE__ENDPOINT" => self.vector_store.endpoint = value.to_string(),
            "VECTOR_STORE__NAMESPACE" => self.vector_store.namespace = value.to_string(),
            "VECTOR_STORE__DIMENSION" => self.vector_store.dimension = parse_env(path, value)?,
            "VECTOR_STORE__TIMEOUT_MS" => self.vector_store.timeout_ms = parse_env(path, value)?,
            "RETRIEVAL__VECTOR_WEIGHT" => self.retrieval.vector_weight = parse_env(path, value)?,
            "RETRIEVAL__LEXICAL_WEIGHT" => self.retrieval.lexical_weight = parse_env(path, value)?,
            "RETRIEVAL__RRF_K" => self.retrieval.rrf_k = parse_env(path, value)?,
            "RETRIEVAL__RETRIEVAL_DEPTH" => self.retrieval.retrieval_depth = parse_env(path, value)?,
            "RETRIEVAL__TOP_K" => self.retrieval.top_k = parse_env(path, value)?,
            "LLM__ENABLED" => self.llm.enabled = parse_env(path, value)?,
            "LLM__ENDPOINT" => self.llm.endpoint = value.to_string(),
            "LLM__MODEL" => self.llm.model = value.to_string(),
            "LOG" => {}
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Look up a value by dotted key, e.g. `retrieval.top_k`
    pub fn get_value(&self, key: &str) -> Result<toml::Value> {
        let root = toml::Value::try_from(self)?;
        key.split('.')
            .try_fold(&root, |value, part| value.get(part))
            .cloned()
            .ok_or_else(|| CivicaError::InvalidConfigValue {
                path: key.to_string(),
                message: "No such configuration key".to_string(),
            })
    }

    /// Engine tunables derived from the `retrieval` section
    pub fn retrieval_settings(&self) -> RetrievalSettings {
        RetrievalSettings {
            vector_weight: self.retrieval.vector_weight,
            lexical_weight: self.retrieval.lexical_weight,
            rrf_k: self.retrieval.rrf_k,
            retrieval_depth: self.retrieval.retrieval_depth,
            top_k: self.retrieval.top_k,
            cache_capacity: self.retrieval.result_cache_capacity,
        }
    }

    pub fn bm25_params(&self) -> Result<Bm25Params> {
        Ok(Bm25Params::new(
            self.retrieval.bm25_k1,
            self.retrieval.bm25_b,
        )?)
    }

    pub fn hnsw_params(&self) -> HnswParams {
        HnswParams {
            m: self.vector_store.hnsw_m,
            ef_construction: self.vector_store.hnsw_ef_construction,
            ef_search: self.vector_store.hnsw_ef_search,
        }
    }

    pub fn corpus_path(&self) -> Result<PathBuf> {
        expand_path(&self.corpus.path)
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CivicaError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("civica").join("config.toml"))
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl VectorStoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Read an API key from the named environment variable; empty counts as unset
pub fn api_key_from_env(env_var: &str) -> Option<String> {
    if env_var.is_empty() {
        return None;
    }
    std::env::var(env_var).ok().filter(|key| !key.is_empty())
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| CivicaError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| CivicaError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}

fn parse_env<T: FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| CivicaError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

impl Default for Config {
    fn default() -> Self {
        let defaults = RetrievalSettings::default();
        let bm25 = Bm25Params::default();
        let hnsw = HnswParams::default();

        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            corpus: CorpusConfig {
                path: PathBuf::from("~/.civica/corpus.jsonl"),
            },
            embedding: EmbeddingConfig {
                backend: "fastembed".to_string(),
                model: "all-MiniLM-L6-v2".to_string(),
                endpoint: "https://api.openai.com/v1".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                dimension: 384,
                timeout_ms: 5_000,
                cache_capacity: crate::embedding::DEFAULT_EMBEDDING_CACHE_CAPACITY,
            },
            vector_store: VectorStoreConfig {
                backend: "memory".to_string(),
                endpoint: String::new(),
                api_key_env: "PINECONE_API_KEY".to_string(),
                namespace: String::new(),
                dimension: 384,
                timeout_ms: 5_000,
                hnsw_m: hnsw.m,
                hnsw_ef_construction: hnsw.ef_construction,
                hnsw_ef_search: hnsw.ef_search,
            },
            retrieval: RetrievalConfig {
                vector_weight: defaults.vector_weight,
                lexical_weight: defaults.lexical_weight,
                rrf_k: defaults.rrf_k,
                retrieval_depth: defaults.retrieval_depth,
                top_k: defaults.top_k,
                result_cache_capacity: defaults.cache_capacity,
                bm25_k1: bm25.k1,
                bm25_b: bm25.b,
            },
            llm: LlmConfig {
                enabled: false,
                endpoint: "https://api.groq.com/openai/v1".to_string(),
                api_key_env: "GROQ_API_KEY".to_string(),
                model: "llama3-70b-8192".to_string(),
                temperature: 0.4,
                max_tokens: 800,
                top_p: 0.9,
                context_documents: 4,
                excerpt_chars: 800,
                timeout_ms: 30_000,
            },
            profiles: default_profiles(),
        }
    }
}

fn default_profiles() -> HashMap<String, ProfileOverrides> {
    let mut profiles = HashMap::new();
    profiles.insert(
        "keyword".to_string(),
        ProfileOverrides {
            vector_weight: Some(0.3),
            lexical_weight: Some(0.7),
            ..ProfileOverrides::default()
        },
    );
    profiles.insert(
        "semantic".to_string(),
        ProfileOverrides {
            vector_weight: Some(0.7),
            lexical_weight: Some(0.3),
            ..ProfileOverrides::default()
        },
    );
    profiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.retrieval.top_k = 9;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.retrieval.top_k, 9);
        assert_eq!(loaded.meta.schema_version, SCHEMA_VERSION);
        assert!(loaded.profiles.contains_key("keyword"));
    }

    #[test]
    fn test_save_stamps_last_modified() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.meta.last_modified = "2020-01-01T00:00:00+00:00".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_ne!(loaded.meta.last_modified, "2020-01-01T00:00:00+00:00");
        assert_eq!(loaded.meta.last_modified, config.meta.last_modified);
        assert!(chrono::DateTime::parse_from_rfc3339(&loaded.meta.last_modified).is_ok());
        assert_eq!(loaded.meta.created_at, config.meta.created_at);
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load(Path::new("/nonexistent/civica/config.toml"));
        assert!(matches!(result, Err(CivicaError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_apply_profile() {
        let mut config = Config::default();
        config.apply_profile("keyword").unwrap();
        assert_eq!(config.retrieval.vector_weight, 0.3);
        assert_eq!(config.retrieval.lexical_weight, 0.7);

        assert!(config.apply_profile("nope").is_err());
    }

    #[test]
    fn test_retrieval_settings_mapping() {
        let config = Config::default();
        let settings = config.retrieval_settings();
        assert_eq!(settings, RetrievalSettings::default());
        assert!(settings.fusion_config().is_ok());
    }

    #[test]
    fn test_get_value() {
        let config = Config::default();
        assert_eq!(
            config.get_value("retrieval.top_k").unwrap(),
            toml::Value::Integer(6)
        );
        assert_eq!(
            config.get_value("llm.model").unwrap().as_str(),
            Some("llama3-70b-8192")
        );
        assert!(config.get_value("retrieval.missing").is_err());
    }

    #[test]
    fn test_env_value_parsing() {
        let mut config = Config::default();
        config
            .set_value_from_env("RETRIEVAL__TOP_K", "12")
            .unwrap();
        assert_eq!(config.retrieval.top_k, 12);

        let err = config.set_value_from_env("LLM__ENABLED", "maybe");
        assert!(matches!(err, Err(CivicaError::InvalidConfigValue { .. })));
    }

    #[test]
    fn test_expand_path() {
        let plain = expand_path(Path::new("/tmp/corpus.jsonl")).unwrap();
        assert_eq!(plain, PathBuf::from("/tmp/corpus.jsonl"));

        if let Some(home) = dirs::home_dir() {
            let expanded = expand_path(Path::new("~/corpus.jsonl")).unwrap();
            assert_eq!(expanded, home.join("corpus.jsonl"));
        }
    }
}
