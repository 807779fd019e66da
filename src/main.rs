use civica::answer::{Answer, AnswerComposer, AnswerOptions, Assistant, ChatCompletionComposer, ChatOptions};
use civica::cli::{Cli, Commands, ConfigAction};
use civica::config::{api_key_from_env, Config};
use civica::corpus::Corpus;
use civica::embedding::{
    embed_corpus, EmbeddingClient, EmbeddingProvider, FastEmbedProvider, HttpEmbeddingProvider,
    DEFAULT_BATCH_SIZE,
};
use civica::error::{CivicaError, Result};
use civica::lexical::LexicalIndex;
use civica::retrieval::{HybridEngine, SearchOutcome};
use civica::vector::{HnswVectorStore, HttpVectorStore, VectorRetriever, VectorStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

const EXCERPT_PREVIEW_CHARS: usize = 160;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    match cli.command {
        Commands::Query { query, limit, json } => {
            let mut config = load_config(cli.config, cli.profile)?;
            if let Some(limit) = limit {
                config.retrieval.top_k = limit;
            }
            run_async(cmd_query(config, &query, json))?;
        }
        Commands::Ask {
            question,
            offline,
            json,
        } => {
            let mut config = load_config(cli.config, cli.profile)?;
            if offline {
                config.llm.enabled = false;
            }
            run_async(cmd_ask(config, &question, json))?;
        }
        Commands::Bench { queries, rounds } => {
            let config = load_config(cli.config, cli.profile)?;
            run_async(cmd_bench(config, &queries, rounds))?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, cli.profile, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("civica=debug")
    } else {
        EnvFilter::try_from_env("CIVICA_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("civica=info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_async<F>(future: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    let rt = tokio::runtime::Runtime::new().map_err(|e| CivicaError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })?;
    rt.block_on(future)
}

/// Wire corpus, indexes, backends and the optional answer composer
async fn build_assistant(config: &Config) -> Result<Assistant> {
    let start = Instant::now();

    let corpus_path = config.corpus_path()?;
    let corpus = Arc::new(Corpus::load(&corpus_path)?);

    let lexical = Arc::new(LexicalIndex::build(&corpus.to_vec(), config.bm25_params()?)?);

    let provider: Arc<dyn EmbeddingProvider> = match config.embedding.backend.as_str() {
        "http" => Arc::new(HttpEmbeddingProvider::new(
            config.embedding.endpoint.clone(),
            api_key_from_env(&config.embedding.api_key_env),
            config.embedding.model.clone(),
            config.embedding.dimension,
        )),
        _ => {
            let model = config.embedding.model.clone();
            let provider = tokio::task::spawn_blocking(move || FastEmbedProvider::new(&model))
                .await
                .map_err(|e| CivicaError::Other(e.into()))??;
            Arc::new(provider)
        }
    };

    let store: Arc<dyn VectorStore> = match config.vector_store.backend.as_str() {
        "http" => Arc::new(HttpVectorStore::new(
            config.vector_store.endpoint.clone(),
            api_key_from_env(&config.vector_store.api_key_env),
            Some(config.vector_store.namespace.clone()),
            config.vector_store.dimension,
        )),
        _ => {
            let embedded = embed_corpus(provider.as_ref(), &corpus, DEFAULT_BATCH_SIZE).await?;
            Arc::new(HnswVectorStore::build(
                config.vector_store.dimension,
                config.hnsw_params(),
                embedded,
            )?)
        }
    };

    let embedder = Arc::new(EmbeddingClient::new(
        provider,
        config.embedding.cache_capacity,
        config.embedding.timeout(),
    ));
    let vectors = Arc::new(VectorRetriever::new(store, config.vector_store.timeout()));
    let engine = Arc::new(HybridEngine::new(
        lexical,
        embedder,
        vectors,
        config.retrieval_settings(),
    )?);

    let composer: Option<Arc<dyn AnswerComposer>> = if config.llm.enabled {
        Some(Arc::new(ChatCompletionComposer::new(
            config.llm.endpoint.clone(),
            api_key_from_env(&config.llm.api_key_env),
            ChatOptions {
                model: config.llm.model.clone(),
                temperature: config.llm.temperature,
                max_tokens: config.llm.max_tokens,
                top_p: config.llm.top_p,
            },
        )))
    } else {
        None
    };

    let options = AnswerOptions {
        context_documents: config.llm.context_documents,
        excerpt_chars: config.llm.excerpt_chars,
        timeout: config.llm.timeout(),
    };

    tracing::info!(
        "Startup complete in {:.2}s",
        start.elapsed().as_secs_f64()
    );

    Ok(Assistant::new(engine, corpus, composer, options))
}

async fn cmd_query(config: Config, query: &str, json: bool) -> Result<()> {
    let assistant = build_assistant(&config).await?;
    let outcome = assistant.engine().search(query).await?;

    if json {
        print_json(&outcome)?;
    } else {
        print_outcome(&outcome, &assistant);
    }
    Ok(())
}

async fn cmd_ask(config: Config, question: &str, json: bool) -> Result<()> {
    let assistant = build_assistant(&config).await?;
    let answer = assistant.ask(question).await?;

    if json {
        print_json(&answer)?;
    } else {
        print_answer(&answer);
    }
    Ok(())
}

async fn cmd_bench(config: Config, queries: &[String], rounds: usize) -> Result<()> {
    let assistant = build_assistant(&config).await?;
    let engine = assistant.engine();

    println!("Running {} queries x {} rounds", queries.len(), rounds);
    for round in 1..=rounds {
        let start = Instant::now();
        let mut degraded = 0;
        for query in queries {
            let outcome = engine.search(query).await?;
            if outcome.is_degraded() {
                degraded += 1;
            }
        }
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        println!(
            "  Round {}: {:.2}ms total, {:.2}ms/query, {} degraded",
            round,
            elapsed_ms,
            elapsed_ms / queries.len().max(1) as f64,
            degraded
        );
    }

    let stats = engine.stats();
    println!("\nEngine statistics");
    println!("=================");
    println!("  Queries:          {}", stats.queries);
    println!(
        "  Cache hit rate:   {:.1}% ({} hits)",
        stats.cache_hit_rate * 100.0,
        stats.cache_hits
    );
    println!("  Average latency:  {:.2}ms", stats.average_latency_ms);
    println!("  Degraded queries: {}", stats.degraded_queries);
    println!("  No-result queries: {}", stats.no_result_queries);
    println!(
        "  Result cache:     {}/{}",
        stats.result_cache.entries, stats.result_cache.capacity
    );
    println!(
        "  Embedding cache:  {}/{}",
        stats.embedding_cache.entries, stats.embedding_cache.capacity
    );
    Ok(())
}

fn print_outcome(outcome: &SearchOutcome, assistant: &Assistant) {
    for degradation in &outcome.degradations {
        println!("⚠ Degraded: {:?}", degradation);
    }

    if outcome.results.is_empty() {
        println!("No results for '{}' ({:?})", outcome.query, outcome.status);
        return;
    }

    println!(
        "{} results for '{}' in {:.2}ms{}",
        outcome.results.len(),
        outcome.query,
        outcome.elapsed_ms,
        if outcome.cache_hit { " (cached)" } else { "" }
    );

    for (i, result) in outcome.results.iter().enumerate() {
        let rank = |r: Option<usize>| r.map_or_else(|| "-".to_string(), |r| r.to_string());
        println!(
            "\n{}. {} [score {:.5}, lexical #{}, vector #{}]",
            i + 1,
            result.doc_id,
            result.score,
            rank(result.lexical_rank),
            rank(result.vector_rank)
        );
        if let Some(doc) = assistant.corpus().get(&result.doc_id) {
            if !doc.metadata.policy.is_empty() {
                println!("   {}", doc.metadata.policy);
            }
            println!("   {}", doc.excerpt(EXCERPT_PREVIEW_CHARS));
        }
    }
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.text);

    if !answer.sources.is_empty() {
        println!("\nSources:");
        for source in &answer.sources {
            let label = if source.policy.is_empty() {
                source.id.as_str()
            } else {
                source.policy.as_str()
            };
            println!("  - {} ({}, score {:.5})", label, source.id, source.score);
        }
    }

    for degradation in &answer.degradations {
        println!("⚠ Degraded: {:?}", degradation);
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CivicaError::Json {
        source: e,
        context: "Failed to serialize output".to_string(),
    })?;
    println!("{}", json);
    Ok(())
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path, profile)?;
            let value = match section {
                Some(section) => config.get_value(&section)?,
                None => toml::Value::try_from(&config)?,
            };
            println!("{}", toml::to_string_pretty(&value)?);
        }
        ConfigAction::Get { key } => {
            let config = load_config(config_path, profile)?;
            match config.get_value(&key)? {
                toml::Value::String(s) => println!("{}", s),
                other => println!("{}", other),
            }
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
            println!(
                "  Backends: embedding={}, vector_store={}, llm={}",
                config.embedding.backend,
                config.vector_store.backend,
                if config.llm.enabled { "enabled" } else { "disabled" }
            );
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            // Create parent directory
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| CivicaError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
        ConfigAction::Path => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'civica config init' to create one."
        );
        let mut config = Config::default();
        if let Some(profile) = profile {
            config.apply_profile(&profile)?;
        }
        config.apply_env_overrides();
        civica::config::ConfigValidator::validate(&config)?;
        return Ok(config);
    }

    if let Some(profile) = profile {
        Config::load_with_profile(&path, &profile)
    } else {
        Config::load(&path)
    }
}
