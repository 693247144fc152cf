use chrono::Utc;
use clap::{Parser, Subcommand};
use pdf_chat_core::{
    build_system_prompt, derive_namespace, ChatModel, ChunkingOptions, ContextBuilder, GeminiChat,
    GeminiEmbedder, IngestionOptions, IngestionPipeline, PineconeIndex, RetrievalOptions,
    RetryPolicy, DEFAULT_EMBEDDING_DIMENSIONS,
};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-chat", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Vector index data-plane URL
    #[arg(long, env = "PINECONE_INDEX_URL")]
    index_url: String,

    /// Vector index API key
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    index_api_key: String,

    /// Gemini API key, used for embeddings and answers
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    gemini_api_key: String,

    /// Number of candidates requested from the index per query.
    #[arg(long, default_value = "10")]
    top_k: usize,

    /// Relevance threshold; matches must score strictly above it.
    #[arg(long, default_value = "0.5")]
    min_score: f32,

    /// Total attempts for each network-backed step; 1 disables retries.
    #[arg(long, default_value = "1")]
    retry_attempts: u32,

    /// Overall per-operation timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest one PDF into its own vector namespace.
    Ingest {
        /// Path to the PDF file.
        #[arg(long)]
        file: String,
        /// Namespace key; derived from the file name and upload time when omitted.
        #[arg(long)]
        namespace: Option<String>,
        /// Window size in characters.
        #[arg(long, default_value = "1000")]
        window_size: usize,
        /// Window overlap in characters.
        #[arg(long, default_value = "200")]
        overlap: usize,
        /// Simultaneous in-flight embedding calls.
        #[arg(long, default_value = "8")]
        embed_concurrency: usize,
    },
    /// Print the raw context snippets retrieved for a query.
    Context {
        #[arg(long)]
        namespace: String,
        #[arg(long)]
        query: String,
    },
    /// Ask a question grounded in one ingested document.
    Ask {
        #[arg(long)]
        namespace: String,
        #[arg(long)]
        query: String,
    },
    /// Delete a document's namespace from the index.
    Delete {
        #[arg(long)]
        namespace: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let timeout = cli.timeout_secs.map(Duration::from_secs);
    let retry = RetryPolicy::with_attempts(cli.retry_attempts);

    let embedder = GeminiEmbedder::new(&cli.gemini_api_key);
    let index = PineconeIndex::new(
        &cli.index_url,
        &cli.index_api_key,
        DEFAULT_EMBEDDING_DIMENSIONS,
    );

    info!(version = env!("CARGO_PKG_VERSION"), "pdf-chat boot");

    match cli.command {
        Command::Ingest {
            file,
            namespace,
            window_size,
            overlap,
            embed_concurrency,
        } => {
            let namespace = match namespace {
                Some(namespace) => namespace,
                None => {
                    let file_name = Path::new(&file)
                        .file_name()
                        .and_then(|name| name.to_str())
                        .ok_or_else(|| anyhow::anyhow!("path has no file name: {file}"))?;
                    derive_namespace(file_name, Utc::now())
                }
            };

            let bytes = tokio::fs::read(&file).await?;
            let pipeline = IngestionPipeline::new(embedder, index).with_options(IngestionOptions {
                chunking: ChunkingOptions {
                    window_size,
                    overlap,
                },
                embed_concurrency,
                upsert_batch_size: 100,
                retry,
                timeout,
            });

            let report = pipeline.ingest(&bytes, &namespace).await?;
            println!(
                "{} chunks from {} pages written to namespace {} at {}",
                report.written,
                report.page_count,
                report.namespace,
                report.ingested_at.to_rfc3339()
            );
        }
        Command::Context { namespace, query } => {
            let builder = ContextBuilder::new(embedder, index).with_options(RetrievalOptions {
                top_k: cli.top_k,
                min_score: cli.min_score,
                retry,
                timeout,
            });

            let context = builder.get_context(&query, &namespace).await?;
            if context.is_empty() {
                println!("no snippets scored above {}", cli.min_score);
            }
            for (position, snippet) in context.iter().enumerate() {
                println!("[{position}]\n{snippet}\n");
            }
        }
        Command::Ask { namespace, query } => {
            let builder = ContextBuilder::new(embedder, index).with_options(RetrievalOptions {
                top_k: cli.top_k,
                min_score: cli.min_score,
                retry,
                timeout,
            });

            let context = builder.get_context(&query, &namespace).await?;
            if context.is_empty() {
                warn!(namespace = %namespace, "no relevant context; the model will decline");
            }

            let chat = GeminiChat::new(&cli.gemini_api_key);
            let answer = chat.generate(&build_system_prompt(&context), &query).await?;
            println!("{answer}");
        }
        Command::Delete { namespace } => {
            let builder = ContextBuilder::new(embedder, index);
            builder.delete_namespace(&namespace).await?;
            println!("namespace {namespace} deleted");
        }
    }

    Ok(())
}
