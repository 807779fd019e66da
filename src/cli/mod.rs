//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "civica",
    version,
    about = "Hybrid keyword + semantic search over municipal policy documents",
    long_about = "Civica indexes a corpus of policy documents for BM25 keyword search and \
                  vector similarity search, fuses both rankings with weighted Reciprocal Rank \
                  Fusion, and optionally composes a grounded answer with an LLM."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/civica/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Profile to apply (e.g., "keyword", "semantic")
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the corpus with hybrid keyword and semantic retrieval
    Query {
        /// Search query text
        query: String,

        /// Maximum number of results to return (defaults to retrieval.top_k)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Ask a question and get an answer grounded in the corpus
    Ask {
        /// Question to ask
        question: String,

        /// Force offline mode (disable LLM even if configured)
        #[arg(long)]
        offline: bool,

        /// Show the answer in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Run queries repeatedly and report latency and cache statistics
    Bench {
        /// Queries to run
        #[arg(required = true)]
        queries: Vec<String>,

        /// How many times to run the full query list
        #[arg(short, long, default_value = "3")]
        rounds: usize,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section (e.g., "retrieval")
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Get a configuration value
    Get {
        /// Configuration key in dot notation (e.g., "retrieval.top_k")
        key: String,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Print the configuration file location
    Path,
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query() {
        let cli = Cli::parse_from(["civica", "--profile", "keyword", "query", "ev subsidy", "-l", "3"]);
        assert_eq!(cli.profile.as_deref(), Some("keyword"));
        match cli.command {
            Commands::Query { query, limit, json } => {
                assert_eq!(query, "ev subsidy");
                assert_eq!(limit, Some(3));
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_bench_requires_queries() {
        assert!(Cli::try_parse_from(["civica", "bench"]).is_err());
        let cli = Cli::try_parse_from(["civica", "bench", "a", "b", "--rounds", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Bench { ref queries, rounds: 5 } if queries.len() == 2
        ));
    }
}
