use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{CivicaError, Result, ValidationError};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every violation
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_corpus(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_vector_store(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_llm(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CivicaError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_corpus(config: &Config, errors: &mut Vec<ValidationError>) {
        // Existence is checked when the corpus is loaded
        if config.corpus.path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "corpus.path",
                "Corpus path cannot be empty",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let embedding = &config.embedding;

        match embedding.backend.as_str() {
            "fastembed" => {}
            "http" => {
                if embedding.endpoint.is_empty() {
                    errors.push(ValidationError::new(
                        "embedding.endpoint",
                        "Endpoint is required for the http backend",
                    ));
                }
            }
            other => errors.push(ValidationError::new(
                "embedding.backend",
                format!("Backend must be 'fastembed' or 'http', got '{}'", other),
            )),
        }

        if embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }

        if embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "Dimension must be greater than 0",
            ));
        }

        if embedding.timeout_ms == 0 {
            errors.push(ValidationError::new(
                "embedding.timeout_ms",
                "Timeout must be greater than 0",
            ));
        }

        if embedding.cache_capacity == 0 {
            errors.push(ValidationError::new(
                "embedding.cache_capacity",
                "Cache capacity must be greater than 0",
            ));
        }
    }

    fn validate_vector_store(config: &Config, errors: &mut Vec<ValidationError>) {
        let store = &config.vector_store;

        match store.backend.as_str() {
            "memory" => {
                if store.hnsw_m == 0 {
                    errors.push(ValidationError::new(
                        "vector_store.hnsw_m",
                        "HNSW M must be greater than 0",
                    ));
                }
                if store.hnsw_ef_construction == 0 {
                    errors.push(ValidationError::new(
                        "vector_store.hnsw_ef_construction",
                        "HNSW ef_construction must be greater than 0",
                    ));
                }
                if store.hnsw_ef_search == 0 {
                    errors.push(ValidationError::new(
                        "vector_store.hnsw_ef_search",
                        "HNSW ef_search must be greater than 0",
                    ));
                }
            }
            "http" => {
                if store.endpoint.is_empty() {
                    errors.push(ValidationError::new(
                        "vector_store.endpoint",
                        "Endpoint is required for the http backend",
                    ));
                }
            }
            other => errors.push(ValidationError::new(
                "vector_store.backend",
                format!("Backend must be 'memory' or 'http', got '{}'", other),
            )),
        }

        if store.dimension != config.embedding.dimension {
            errors.push(ValidationError::new(
                "vector_store.dimension",
                format!(
                    "Vector store dimension {} does not match embedding dimension {}",
                    store.dimension, config.embedding.dimension
                ),
            ));
        }

        if store.timeout_ms == 0 {
            errors.push(ValidationError::new(
                "vector_store.timeout_ms",
                "Timeout must be greater than 0",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let retrieval = &config.retrieval;

        for (path, weight) in [
            ("retrieval.vector_weight", retrieval.vector_weight),
            ("retrieval.lexical_weight", retrieval.lexical_weight),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                errors.push(ValidationError::new(
                    path,
                    format!("Weight must be between 0.0 and 1.0, got {}", weight),
                ));
            }
        }

        let sum = retrieval.vector_weight + retrieval.lexical_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            errors.push(ValidationError::new(
                "retrieval.lexical_weight",
                format!("Weights must sum to 1.0, got {}", sum),
            ));
        }

        if !retrieval.rrf_k.is_finite() || retrieval.rrf_k <= 0.0 {
            errors.push(ValidationError::new(
                "retrieval.rrf_k",
                format!("RRF constant must be greater than 0, got {}", retrieval.rrf_k),
            ));
        }

        if retrieval.retrieval_depth == 0 {
            errors.push(ValidationError::new(
                "retrieval.retrieval_depth",
                "Retrieval depth must be greater than 0",
            ));
        }

        if retrieval.top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.top_k",
                "top_k must be greater than 0",
            ));
        }

        if retrieval.result_cache_capacity == 0 {
            errors.push(ValidationError::new(
                "retrieval.result_cache_capacity",
                "Cache capacity must be greater than 0",
            ));
        }

        if !retrieval.bm25_k1.is_finite() || retrieval.bm25_k1 < 0.0 {
            errors.push(ValidationError::new(
                "retrieval.bm25_k1",
                format!("k1 must be non-negative, got {}", retrieval.bm25_k1),
            ));
        }

        if !(0.0..=1.0).contains(&retrieval.bm25_b) {
            errors.push(ValidationError::new(
                "retrieval.bm25_b",
                format!("b must be between 0.0 and 1.0, got {}", retrieval.bm25_b),
            ));
        }
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        let llm = &config.llm;

        // If LLM is enabled, validate API key environment variable is set
        if llm.enabled {
            let env_var = &llm.api_key_env;
            match std::env::var(env_var) {
                Ok(key) if key.is_empty() => errors.push(ValidationError::new(
                    "llm.api_key_env",
                    format!("Environment variable {} is empty", env_var),
                )),
                Ok(_) => {}
                Err(_) => errors.push(ValidationError::new(
                    "llm.api_key_env",
                    format!("Environment variable {} is not set", env_var),
                )),
            }

            if llm.endpoint.is_empty() {
                errors.push(ValidationError::new(
                    "llm.endpoint",
                    "Endpoint cannot be empty when the LLM is enabled",
                ));
            }
        }

        if !(0.0..=2.0).contains(&llm.temperature) {
            errors.push(ValidationError::new(
                "llm.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", llm.temperature),
            ));
        }

        if !(llm.top_p > 0.0 && llm.top_p <= 1.0) {
            errors.push(ValidationError::new(
                "llm.top_p",
                format!("top_p must be in (0.0, 1.0], got {}", llm.top_p),
            ));
        }

        if llm.max_tokens == 0 {
            errors.push(ValidationError::new(
                "llm.max_tokens",
                "max_tokens must be greater than 0",
            ));
        }

        if llm.context_documents == 0 {
            errors.push(ValidationError::new(
                "llm.context_documents",
                "At least one context document is required",
            ));
        }

        if llm.excerpt_chars == 0 {
            errors.push(ValidationError::new(
                "llm.excerpt_chars",
                "Excerpt length must be greater than 0",
            ));
        }

        if llm.timeout_ms == 0 {
            errors.push(ValidationError::new(
                "llm.timeout_ms",
                "Timeout must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn error_paths(config: &Config) -> Vec<String> {
        match ConfigValidator::validate(config) {
            Err(CivicaError::ConfigValidation { errors }) => {
                errors.into_iter().map(|e| e.path).collect()
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_empty_corpus_path() {
        let mut config = Config::default();
        config.corpus.path = PathBuf::new();
        assert_eq!(error_paths(&config), vec!["corpus.path"]);
    }

    #[test]
    fn test_invalid_backend() {
        let mut config = Config::default();
        config.embedding.backend = "invalid".to_string();
        assert_eq!(error_paths(&config), vec!["embedding.backend"]);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut config = Config::default();
        config.retrieval.vector_weight = 0.6;
        assert_eq!(error_paths(&config), vec!["retrieval.lexical_weight"]);

        // Within tolerance
        config.retrieval.vector_weight = 0.3;
        config.retrieval.lexical_weight = 0.7;
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = Config::default();
        config.retrieval.rrf_k = 0.0;
        config.retrieval.top_k = 0;
        config.retrieval.result_cache_capacity = 0;
        config.vector_store.dimension = 768;

        let paths = error_paths(&config);
        assert_eq!(paths.len(), 4);
        assert!(paths.contains(&"retrieval.rrf_k".to_string()));
        assert!(paths.contains(&"retrieval.top_k".to_string()));
        assert!(paths.contains(&"retrieval.result_cache_capacity".to_string()));
        assert!(paths.contains(&"vector_store.dimension".to_string()));
    }

    #[test]
    fn test_http_backends_need_endpoints() {
        let mut config = Config::default();
        config.embedding.backend = "http".to_string();
        config.embedding.endpoint = String::new();
        config.vector_store.backend = "http".to_string();

        let paths = error_paths(&config);
        assert!(paths.contains(&"embedding.endpoint".to_string()));
        assert!(paths.contains(&"vector_store.endpoint".to_string()));
    }

    #[test]
    fn test_enabled_llm_requires_key() {
        let mut config = Config::default();
        config.llm.enabled = true;
        config.llm.api_key_env = "CIVICA_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        assert_eq!(error_paths(&config), vec!["llm.api_key_env"]);
    }
}
