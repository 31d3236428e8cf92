use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use pdf_reports_core::FolderIndexer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod server;

#[derive(Parser)]
#[command(name = "pdf-reports-server", version)]
struct Cli {
    /// Root directory whose immediate subdirectories hold the PDF reports.
    #[arg(long, env = "REPORTS_ROOT", default_value = "reports")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
    },
    /// List folders and their PDFs on stdout.
    Folders {
        /// Only include documents modified at or before this RFC 3339 instant.
        #[arg(long)]
        cutoff: Option<String>,
    },
    /// Search filenames and extracted content on stdout.
    Search {
        /// Search term (literal, case-insensitive).
        #[arg(long)]
        query: String,
        /// Only include documents modified at or before this RFC 3339 instant.
        #[arg(long)]
        cutoff: Option<String>,
    },
}

fn parse_cutoff(raw: Option<&str>) -> anyhow::Result<Option<DateTime<Utc>>> {
    raw.map(|value| {
        DateTime::parse_from_rfc3339(value)
            .map(|parsed| parsed.with_timezone(&Utc))
            .with_context(|| format!("invalid cutoff datetime: {value}"))
    })
    .transpose()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let indexer = Arc::new(FolderIndexer::new(cli.root.clone()));

    match cli.command {
        Command::Serve { bind } => {
            let app = server::router(indexer);
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("failed to bind {bind}"))?;
            info!(%bind, root = %cli.root.display(), "pdf-reports-server boot");
            axum::serve(listener, app).await?;
        }
        Command::Folders { cutoff } => {
            let cutoff = parse_cutoff(cutoff.as_deref())?;
            let folders = indexer.list_folders(cutoff)?;
            for folder in &folders {
                println!("{} ({} pdfs)", folder.name, folder.pdf_count);
                for document in &folder.documents {
                    println!(
                        "  {}  {}  {} bytes",
                        document.filename,
                        document.modified_at.to_rfc3339(),
                        document.size_bytes
                    );
                }
            }
        }
        Command::Search { query, cutoff } => {
            let cutoff = parse_cutoff(cutoff.as_deref())?;
            let results = indexer.search(&query, cutoff)?;
            for result in &results {
                println!(
                    "{}/{} ({} matches)",
                    result.document.folder, result.document.filename, result.match_count
                );
                for entry in &result.matches {
                    println!("  {entry}");
                }
            }
        }
    }

    Ok(())
}
