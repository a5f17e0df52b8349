//! `tome` command line interface.
//!
//! Runs the full pipeline in-process against the in-memory store:
//! ingest the given files, then split, search, or chat over them.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use tome::chat::{ChatRequest, ChatService};
use tome::llm::Provider;
use tome::rag::embeddings::create_embedder;
use tome::rag::ingest::IngestService;
use tome::rag::retriever::Retriever;
use tome::rag::splitter::TextSplitter;
use tome::store::MemoryStore;
use tome::tools::ToolRegistry;
use tome::types::StreamEvent;
use tome::utils::config::Config;

#[derive(Parser)]
#[command(name = "tome", version, about = "Retrieval-augmented chat engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split a file into chunks and print them
    Split {
        /// File to split
        file: PathBuf,
        /// Chunk size in characters
        #[arg(long, env = "TOME_CHUNK_SIZE", default_value_t = 3000)]
        chunk_size: usize,
        /// Overlap in characters
        #[arg(long, env = "TOME_CHUNK_OVERLAP", default_value_t = 200)]
        overlap: usize,
    },
    /// Ingest files and print the top matching snippets for a query
    Search {
        /// Query text
        query: String,
        /// Files to ingest before searching
        #[arg(short, long, required = true)]
        file: Vec<PathBuf>,
        /// Number of snippets to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Ingest files and answer a question over them
    Ask {
        /// The question
        question: String,
        /// Files to ingest as context
        #[arg(short, long)]
        file: Vec<PathBuf>,
        /// Skip retrieval and answer from the model alone
        #[arg(long)]
        no_rag: bool,
        /// Print the answer as one block instead of streaming
        #[arg(long)]
        no_stream: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tome=warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("config error: {}", e))?;

    match cli.command {
        Command::Split {
            file,
            chunk_size,
            overlap,
        } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let splitter = TextSplitter::new(chunk_size, overlap);
            for chunk in splitter.split(&text) {
                println!(
                    "--- chunk {} ({} chars) ---\n{}",
                    chunk.index,
                    chunk.text.chars().count(),
                    chunk.text
                );
            }
        }

        Command::Search { query, file, top_k } => {
            let pipeline = Pipeline::build(&config).await?;
            pipeline.ingest_files(&file).await?;
            let k = top_k.unwrap_or(config.rag.top_k);
            let snippets = pipeline.retriever.retrieve(&query, k).await?;
            if snippets.is_empty() {
                println!("No matches.");
            }
            for snippet in snippets {
                println!(
                    "{} (score {:.3})\n{}\n",
                    snippet.source_reference(),
                    snippet.score,
                    snippet.text
                );
            }
        }

        Command::Ask {
            question,
            file,
            no_rag,
            no_stream,
        } => {
            let pipeline = Pipeline::build(&config).await?;
            pipeline.ingest_files(&file).await?;

            let mut request = ChatRequest::new("cli", &question);
            request.use_rag = !no_rag && !file.is_empty();

            if no_stream {
                let response = pipeline.chat.chat(request).await?;
                println!("{}", response.text);
            } else {
                let mut events = Arc::clone(&pipeline.chat).chat_stream(request);
                let mut stdout = std::io::stdout();
                while let Some(event) = events.recv().await {
                    match event {
                        StreamEvent::Delta { text } => {
                            stdout.write_all(text.as_bytes())?;
                            stdout.flush()?;
                        }
                        StreamEvent::ToolCall { name, .. } => {
                            eprintln!("\n[tool: {}]", name);
                        }
                        StreamEvent::ToolResult { name, result } => {
                            eprintln!("[{} -> {}]", name, result);
                        }
                        StreamEvent::Done { .. } => {
                            println!();
                        }
                        StreamEvent::Error { message } => {
                            anyhow::bail!("{}", message);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

struct Pipeline {
    retriever: Arc<Retriever>,
    ingest: IngestService,
    chat: Arc<ChatService>,
}

impl Pipeline {
    async fn build(config: &Config) -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let embedder = create_embedder(config)?;

        let retriever = Arc::new(Retriever::new(
            Arc::clone(&embedder),
            store.clone(),
            store.clone(),
            config.rag.max_context_chars,
        ));

        let ingest = IngestService::new(
            store.clone(),
            store.clone(),
            Arc::clone(&embedder),
            Arc::new(tome::rag::extract::PlainTextExtractor),
            TextSplitter::new(config.rag.chunk_size, config.rag.chunk_overlap),
            Arc::clone(&retriever),
        );

        let provider = Provider::from_config(&config.llm)?;
        let llm: Arc<dyn tome::llm::LlmClient> = Arc::from(provider.create_client().await?);

        let chat = Arc::new(ChatService::new(
            store.clone(),
            Arc::clone(&retriever),
            llm,
            Arc::new(ToolRegistry::with_default_tools()),
            config.rag.clone(),
            config.chat.clone(),
            config.llm.temperature,
            config.llm.max_tokens,
        ));

        Ok(Self {
            retriever,
            ingest,
            chat,
        })
    }

    async fn ingest_files(&self, files: &[PathBuf]) -> Result<()> {
        for path in files {
            let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let outcome = self
                .ingest
                .ingest(&name, &guess_content_type(path), &data, vec![])
                .await?;
            eprintln!(
                "ingested {} ({} chunks{})",
                name,
                outcome.chunks_created,
                if outcome.deduplicated { ", cached" } else { "" }
            );
        }
        Ok(())
    }
}

fn guess_content_type(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some("md") => "text/markdown",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("html") | Some("htm") => "text/html",
        Some("csv") => "text/csv",
        _ => "text/plain",
    }
    .to_string()
}
