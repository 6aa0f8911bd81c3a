//! # Ragmill CLI (`ragmill`)
//!
//! Command-line front end for the retrieval-augmented question
//! answering engine. The index is in-memory and per-process, so `ask`
//! loads and ingests its input files before answering, and `serve`
//! keeps everything live behind the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! ragmill --config ./config/ragmill.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragmill ask "<query>" --path docs/` | Ingest files, answer a question, print citations |
//! | `ragmill chunks <file>` | Show chunk boundaries for a file |
//! | `ragmill serve` | Start the JSON HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # One-shot question over a docs directory
//! ragmill ask "how do I rotate credentials?" --path ./runbooks
//!
//! # Inspect how a file will be chunked
//! ragmill chunks ./runbooks/deploy.md
//!
//! # Serve the chat API for the web UI
//! ragmill serve --config ./config/ragmill.toml
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use ragmill::chunker::split_document;
use ragmill::config::load_config;
use ragmill::embedding::create_embedder;
use ragmill::extract::{collect_files, load_file};
use ragmill::knowledge::KnowledgeBase;
use ragmill::llm::create_model;
use ragmill::server::run_server;

/// Ragmill — retrieval-augmented question answering over your documents.
#[derive(Parser)]
#[command(
    name = "ragmill",
    about = "Ragmill — retrieval-augmented question answering over your documents",
    version,
    long_about = "Ragmill splits documents into overlapping chunks, embeds and indexes them \
    in memory, and answers questions grounded only in the uploaded content, with citations \
    back into the source files."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ragmill.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ingest documents and answer a question in one shot.
    Ask {
        /// The question to answer.
        query: String,

        /// Files or directories to ingest (txt, md, pdf).
        #[arg(long, required = true)]
        path: Vec<PathBuf>,
    },

    /// Print chunk boundaries for a file without embedding anything.
    Chunks {
        /// File to chunk (txt, md, pdf).
        file: PathBuf,
    },

    /// Start the JSON HTTP server.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Ask { query, path } => {
            let embedder = create_embedder(&config.embedding)?;
            let model = create_model(&config.llm)?;
            println!(
                "embedding: {} ({} dims), generation: {}",
                embedder.model_name(),
                embedder.dims(),
                model.model_name()
            );
            let kb = KnowledgeBase::new(&config, embedder, model);

            for root in &path {
                for file in collect_files(root)? {
                    let doc = load_file(&file)?;
                    let receipt = kb
                        .ingest_document(&doc.filename, &doc.text, doc.source_type.as_str())
                        .await?;
                    println!(
                        "ingested {} ({} chunks)",
                        doc.filename, receipt.chunks_created
                    );
                }
            }

            let response = kb.answer_query("cli", &query).await?;
            println!();
            println!("{}", response.answer);
            if !response.cited_sources.is_empty() {
                println!();
                println!("Sources:");
                for citation in &response.cited_sources {
                    println!("  {} (chunk {})", citation.source_file, citation.ordinal);
                }
            }
        }

        Commands::Chunks { file } => {
            let doc = load_file(&file)?;
            let chunks = split_document(
                "preview",
                &doc.text,
                config.chunking.chunk_size,
                config.chunking.chunk_overlap,
            )?;
            println!(
                "{}: {} chars, {} chunks",
                doc.filename,
                doc.text.chars().count(),
                chunks.len()
            );
            for chunk in &chunks {
                let preview: String = chunk.text.chars().take(60).collect();
                println!(
                    "  [{:>4}] chars {}..{}  {:?}",
                    chunk.ordinal, chunk.start_char, chunk.end_char, preview
                );
            }
        }

        Commands::Serve => {
            let embedder = create_embedder(&config.embedding)?;
            let model = create_model(&config.llm)?;
            println!(
                "embedding: {} ({} dims), generation: {}",
                embedder.model_name(),
                embedder.dims(),
                model.model_name()
            );
            let kb = Arc::new(KnowledgeBase::new(&config, embedder, model));
            run_server(kb, &config.server.bind).await?;
        }
    }

    Ok(())
}
