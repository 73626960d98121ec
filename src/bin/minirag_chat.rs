//! Terminal chat over the RAG engine.
//!
//! Optionally ingests files given on the command line, then reads one question per line from
//! stdin and prints the streamed answer. Lines starting with `/` are commands: `/history`,
//! `/clear` and `/quit`.
use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use futures_util::StreamExt;
use minirag::{config::EngineConfig, engine::RagEngine, extract::Document, logging};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(
    name = "minirag-chat",
    about = "Ask questions about your documents from the terminal"
)]
struct Cli {
    /// Documents (PDF or plain text) to ingest before chatting.
    #[arg(long, num_args = 1..)]
    ingest: Vec<PathBuf>,
    /// Fragments retrieved per question (defaults to RETRIEVAL_TOP_K).
    #[arg(long)]
    top_k: Option<usize>,
    /// Empty the collection before ingesting.
    #[arg(long)]
    clear: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();

    let mut config = EngineConfig::from_env().context("invalid configuration")?;
    if let Some(top_k) = cli.top_k {
        config.top_k = top_k;
    }
    let mut engine = RagEngine::new(config)
        .await
        .context("failed to initialise engine")?;

    if cli.clear && !engine.clear_collection().await {
        bail!("failed to clear collection {}", engine.config().collection_name);
    }
    for path in &cli.ingest {
        ingest_file(&engine, path).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        match line {
            "" => {}
            "/quit" | "/exit" => break,
            "/history" => {
                for entry in engine.history().entries() {
                    println!("{}: {}", entry.role.label(), entry.content);
                }
            }
            "/clear" => {
                if engine.clear_collection().await {
                    println!("Collection cleared.");
                } else {
                    println!("Could not clear the collection; see logs.");
                }
            }
            query => {
                if let Err(err) = answer(&mut engine, query).await {
                    eprintln!("error: {err:#}");
                }
            }
        }
        prompt()?;
    }
    Ok(())
}

async fn ingest_file(engine: &RagEngine, path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let outcome = engine
        .ingest(Document::from_upload(name, bytes))
        .await
        .with_context(|| format!("failed to ingest {}", path.display()))?;
    println!(
        "Ingested {}: {} fragments",
        path.display(),
        outcome.fragment_count
    );
    if outcome.degraded_embeddings > 0 {
        println!(
            "  warning: {} fragments could not be embedded and will not be searchable",
            outcome.degraded_embeddings
        );
    }
    Ok(())
}

async fn answer(engine: &mut RagEngine, query: &str) -> Result<()> {
    let k = engine.config().top_k;
    let retrieval = engine.retrieve(query, k).await?;
    let mut increments = engine.generate(query, &retrieval.fragments).await?;

    let mut stdout = std::io::stdout();
    let mut answer = String::new();
    let mut failure = None;
    while let Some(item) = increments.next().await {
        match item {
            Ok(text) => {
                write!(stdout, "{text}")?;
                stdout.flush()?;
                answer.push_str(&text);
            }
            Err(err) => {
                failure = Some(err);
                break;
            }
        }
    }
    writeln!(stdout)?;

    engine.record_exchange(query, &answer);
    match failure {
        Some(err) => Err(err).context("answer stream interrupted"),
        None => Ok(()),
    }
}

fn prompt() -> Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()?;
    Ok(())
}
