//! Command-line orchestrator for the Mnemo memory pipeline.
//!
//! `mnemo index` parses a raw memory file and builds the persisted vector
//! index; `mnemo ask` retrieves one user's relevant memories, composes the
//! prompt, and hands it to the generation service.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use mnemo_ai::{OllamaClient, OllamaConfig, TextGenerator};
use mnemo_memory::{
    index_memories, retrieve_context, DistanceMetric, EmbeddingProviderConfig, MemoryParser,
    RetrievalOptions, TextEmbedder, VectorIndex, DEFAULT_OWNER_PREFIX,
};
use mnemo_prompt::{compose_personalized_prompt, PromptContext};

const DEFAULT_MEMORY_FILE: &str = "./memories/sample_memories.json";
const DEFAULT_INDEX_PATH: &str = "./database/memories.jsonl";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 128;
const DEFAULT_EMBEDDING_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Parser)]
#[command(
    name = "mnemo",
    about = "Personalized answers grounded in per-user memory facts",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse a raw memory file and build the vector index.
    Index(IndexArgs),
    /// Answer a query grounded in one user's indexed memories.
    Ask(AskArgs),
}

#[derive(Debug, Args)]
struct EmbeddingArgs {
    #[arg(
        long,
        env = "MNEMO_EMBEDDING_DIMENSIONS",
        default_value_t = DEFAULT_EMBEDDING_DIMENSIONS,
        help = "Embedding vector width."
    )]
    embedding_dimensions: usize,

    #[arg(
        long,
        env = "MNEMO_EMBEDDING_MODEL",
        help = "Remote embedding model. Offline hash embeddings are used when unset."
    )]
    embedding_model: Option<String>,

    #[arg(
        long,
        env = "MNEMO_EMBEDDING_API_BASE",
        default_value = "https://api.openai.com/v1",
        help = "OpenAI-compatible embeddings endpoint base."
    )]
    embedding_api_base: String,

    #[arg(
        long,
        env = "MNEMO_EMBEDDING_API_KEY",
        help = "API key for the embeddings endpoint."
    )]
    embedding_api_key: Option<String>,
}

impl EmbeddingArgs {
    /// Remote embedder when a model and key are configured, offline hash
    /// embedder otherwise. Index and query must use the same backend.
    fn build_embedder(&self) -> TextEmbedder {
        match (&self.embedding_model, &self.embedding_api_key) {
            (Some(model), Some(api_key)) => TextEmbedder::Provider {
                config: EmbeddingProviderConfig {
                    model: model.clone(),
                    api_base: self.embedding_api_base.clone(),
                    api_key: api_key.clone(),
                    timeout_ms: DEFAULT_EMBEDDING_TIMEOUT_MS,
                },
                dimensions: self.embedding_dimensions,
            },
            _ => TextEmbedder::Hash {
                dimensions: self.embedding_dimensions,
            },
        }
    }
}

#[derive(Debug, Args)]
struct IndexArgs {
    #[arg(
        long,
        env = "MNEMO_MEMORY_FILE",
        default_value = DEFAULT_MEMORY_FILE,
        help = "JSON memory file with a top-level \"memories\" array of raw records."
    )]
    memory_file: PathBuf,

    #[arg(
        long,
        env = "MNEMO_INDEX_PATH",
        default_value = DEFAULT_INDEX_PATH,
        help = "Where the embedded index is persisted."
    )]
    index_path: PathBuf,

    #[arg(
        long,
        env = "MNEMO_OWNER_PREFIX",
        default_value = DEFAULT_OWNER_PREFIX,
        help = "Literal owner-tag prefix expected in memory records."
    )]
    owner_prefix: String,

    #[command(flatten)]
    embedding: EmbeddingArgs,
}

#[derive(Debug, Args)]
struct AskArgs {
    #[arg(help = "Query to answer.")]
    query: String,

    #[arg(
        long,
        env = "MNEMO_USER",
        default_value = "user-001",
        help = "Owner tag whose memories are searched."
    )]
    user: String,

    #[arg(
        long,
        env = "MNEMO_INDEX_PATH",
        default_value = DEFAULT_INDEX_PATH,
        help = "Index built by the index command."
    )]
    index_path: PathBuf,

    #[arg(
        long,
        env = "MNEMO_TOP_K",
        default_value_t = 3,
        help = "Maximum number of memories to retrieve."
    )]
    top_k: usize,

    #[arg(
        long,
        env = "MNEMO_RETRIEVAL_THRESHOLD",
        default_value_t = 0.5,
        help = "Minimum similarity for a memory to count as relevant."
    )]
    threshold: f32,

    #[arg(
        long,
        env = "MNEMO_MODEL",
        default_value = "gemma3:4b",
        help = "Generation model served by the Ollama endpoint."
    )]
    model: String,

    #[arg(
        long,
        env = "MNEMO_OLLAMA_API_BASE",
        default_value = "http://localhost:11434",
        help = "Ollama-compatible API base for generation."
    )]
    ollama_api_base: String,

    #[arg(
        long,
        help = "Print the composed prompt instead of calling the generation service."
    )]
    dry_run: bool,

    #[command(flatten)]
    embedding: EmbeddingArgs,
}

#[derive(Debug, Deserialize)]
struct MemoryFile {
    memories: Vec<String>,
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_memory_file(path: &Path) -> Result<MemoryFile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read memory file {}", path.display()))?;
    serde_json::from_str::<MemoryFile>(&raw)
        .with_context(|| format!("failed to parse memory file {}", path.display()))
}

fn run_index(args: &IndexArgs) -> Result<()> {
    let memory_file = load_memory_file(&args.memory_file)?;
    let parser = MemoryParser::new(&args.owner_prefix)?;
    let parsed = parser.parse_memories(&memory_file.memories);
    tracing::debug!(
        raw = memory_file.memories.len(),
        parsed = parsed.len(),
        "parsed memory records"
    );

    let mut index = VectorIndex::new(args.embedding.build_embedder());
    let indexed = index_memories(&mut index, &parsed)?;
    index.save(&args.index_path)?;
    println!("{indexed} memories indexed to {}.", args.index_path.display());
    Ok(())
}

fn run_ask(args: &AskArgs) -> Result<()> {
    let index = VectorIndex::load(&args.index_path, args.embedding.build_embedder())?;
    let options = RetrievalOptions {
        top_k: args.top_k,
        threshold: args.threshold,
        metric: DistanceMetric::CosineNormalized,
    };
    let context = retrieve_context(&args.query, &index, &args.user, &options)?;
    tracing::debug!(
        retrieved = context.len(),
        user = args.user.as_str(),
        "retrieved context for query"
    );

    let prompt = compose_personalized_prompt(&args.query, &PromptContext::Retrieved(context));
    if args.dry_run {
        println!("{prompt}");
        return Ok(());
    }

    let client = OllamaClient::new(OllamaConfig {
        api_base: args.ollama_api_base.clone(),
        model: args.model.clone(),
        ..OllamaConfig::default()
    })?;
    client.pull_model()?;
    let response = client.generate(&prompt)?;
    println!("{response}");
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match &cli.command {
        Command::Index(args) => run_index(args),
        Command::Ask(args) => run_ask(args),
    }
}

#[cfg(test)]
mod tests {
    use super::{load_memory_file, Cli, Command, EmbeddingArgs};
    use clap::Parser;
    use mnemo_memory::TextEmbedder;

    #[test]
    fn unit_embedder_defaults_to_hash_backend() {
        let args = EmbeddingArgs {
            embedding_dimensions: 64,
            embedding_model: None,
            embedding_api_base: "https://api.openai.com/v1".to_string(),
            embedding_api_key: None,
        };
        assert!(matches!(
            args.build_embedder(),
            TextEmbedder::Hash { dimensions: 64 }
        ));
    }

    #[test]
    fn unit_embedder_uses_provider_when_model_and_key_are_set() {
        let args = EmbeddingArgs {
            embedding_dimensions: 256,
            embedding_model: Some("text-embedding-3-small".to_string()),
            embedding_api_base: "https://api.openai.com/v1".to_string(),
            embedding_api_key: Some("key".to_string()),
        };
        match args.build_embedder() {
            TextEmbedder::Provider { config, dimensions } => {
                assert_eq!(config.model, "text-embedding-3-small");
                assert_eq!(dimensions, 256);
            }
            other => panic!("expected provider embedder, got {other:?}"),
        }
    }

    #[test]
    fn functional_ask_arguments_carry_retrieval_defaults() {
        let cli = Cli::parse_from(["mnemo", "ask", "What's my favorite movie?"]);
        let Command::Ask(args) = cli.command else {
            panic!("expected ask command");
        };
        assert_eq!(args.top_k, 3);
        assert!((args.threshold - 0.5).abs() < f32::EPSILON);
        assert_eq!(args.user, "user-001");
        assert_eq!(args.model, "gemma3:4b");
    }

    #[test]
    fn functional_memory_file_parses_top_level_memories_array() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("sample_memories.json");
        std::fs::write(
            &path,
            r#"{ "memories": ["user-1: \"Loves sci-fi movies\"", "not a record"] }"#,
        )
        .expect("write memory file");

        let memory_file = load_memory_file(&path).expect("load");
        assert_eq!(memory_file.memories.len(), 2);
    }

    #[test]
    fn regression_memory_file_without_memories_key_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("broken.json");
        std::fs::write(&path, r#"{ "records": [] }"#).expect("write memory file");
        assert!(load_memory_file(&path).is_err());
    }
}
