//! RAG chatbot server binary
//!
//! Run with: cargo run -p rag-chatbot --bin rag-chatbot-server -- --config rag.toml

use clap::Parser;
use rag_chatbot::{config::RagConfig, server::RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "rag-chatbot-server",
    version,
    about = "Document Q&A over a managed vector index"
)]
struct Args {
    /// TOML configuration file; environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to bind
    #[arg(long)]
    port: Option<u16>,

    /// Ingest this file or folder before serving
    #[arg(long)]
    ingest: Option<PathBuf>,

    /// Abort ingestion on the first unreadable file
    #[arg(long, requires = "ingest")]
    strict: bool,

    /// Exit after --ingest instead of starting the server
    #[arg(long, requires = "ingest")]
    ingest_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_chatbot=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                       RAG Chatbot                         ║
║        Grounded answers from your own documents           ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let mut config = RagConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Index: {:?} '{}' (namespace '{}')", config.index.backend, config.index.index_name, config.index.namespace);
    tracing::info!("  - Embeddings: {:?} {} ({} dims)", config.embeddings.backend, config.embeddings.model, config.embeddings.dimensions);
    tracing::info!("  - LLM: {:?}", config.llm.provider);
    tracing::info!("  - Chunking: {} chars, {} overlap", config.chunking.chunk_size, config.chunking.chunk_overlap);

    let server = RagServer::new(config).await?;

    if let Some(path) = args.ingest {
        let summary = server.state().pipeline().ingest_path(path, args.strict).await?;
        println!(
            "Ingested {} pages -> {} vectors ({} file(s) skipped)",
            summary.documents_processed,
            summary.vectors_stored,
            summary.files_skipped.len()
        );
        for skipped in &summary.files_skipped {
            println!("  skipped {}: {}", skipped.filename, skipped.reason);
        }
        if args.ingest_only {
            return Ok(());
        }
    }

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /upload - Upload documents (multipart field 'files')");
    println!("  POST /query  - Ask a question");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
