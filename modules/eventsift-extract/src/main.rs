use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use eventsift_common::Config;
use eventsift_extract::{ExtractionRequest, MemorySink, Pipeline};

#[derive(Parser)]
#[command(name = "eventsift", about = "Extract evidence-verified events from listing pages")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print verified events for each URL as JSON
    Extract {
        #[arg(required = true)]
        urls: Vec<String>,
        /// Extra guidance passed to the generation step
        #[arg(long)]
        hint: Option<String>,
        /// Read the page from a file instead of fetching it (single URL only)
        #[arg(long)]
        html_file: Option<PathBuf>,
    },
    /// Extract, normalize and upsert into an in-memory store
    Ingest {
        #[arg(required = true)]
        urls: Vec<String>,
        #[arg(long)]
        hint: Option<String>,
        /// Mark upserted events as published
        #[arg(long)]
        publish: bool,
    },
}

fn requests(
    urls: Vec<String>,
    hint: Option<String>,
    html: Option<String>,
) -> Vec<ExtractionRequest> {
    urls.into_iter()
        .map(|url| {
            let mut request = ExtractionRequest::new(url);
            if let Some(hint) = &hint {
                request = request.with_hint(hint.clone());
            }
            if let Some(html) = &html {
                request = request.with_html(html.clone());
            }
            request
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("eventsift=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::from_env();
    config.log_redacted();
    let pipeline = Pipeline::from_config(&config)?;

    match cli.command {
        Command::Extract {
            urls,
            hint,
            html_file,
        } => {
            let html = match html_file {
                Some(_) if urls.len() > 1 => bail!("--html-file takes exactly one URL"),
                Some(path) => Some(
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                ),
                None => None,
            };
            let requests = requests(urls, hint, html);
            let results = join_all(requests.iter().map(|r| pipeline.extract(r))).await;
            for (request, result) in requests.iter().zip(results) {
                match result {
                    Ok(output) => println!("{}", serde_json::to_string_pretty(&output)?),
                    Err(e) => error!(url = %request.url, error = %e, "Extraction failed"),
                }
            }
        }
        Command::Ingest { urls, hint, publish } => {
            let sink = MemorySink::new();
            let requests = requests(urls, hint, None);
            let results =
                join_all(requests.iter().map(|r| pipeline.ingest(r, &sink, publish))).await;
            for (request, result) in requests.iter().zip(results) {
                match result {
                    Ok(report) => println!("{}", serde_json::to_string_pretty(&report)?),
                    Err(e) => error!(url = %request.url, error = %e, "Ingest failed"),
                }
            }
            info!(stored = sink.len(), "Done");
        }
    }

    Ok(())
}
