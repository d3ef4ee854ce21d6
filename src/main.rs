use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};

use adaptive_rag::core::config::AppPaths;
use adaptive_rag::core::logging;
use adaptive_rag::rag::{Document, DocumentType};
use adaptive_rag::AppState;

/// Command line: `adaptive-rag [--filter TYPE] [--ingest TYPE=PATH]... QUERY`
///
/// Each `--ingest` file is plain extracted text; form feeds separate pages.
struct Args {
    filter: Option<DocumentType>,
    ingest: Vec<(DocumentType, PathBuf)>,
    query: String,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut filter = None;
    let mut ingest = Vec::new();
    let mut query_parts = Vec::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--filter" => {
                let value = args.next().context("--filter needs a document type")?;
                filter = Some(value.parse::<DocumentType>()?);
            }
            "--ingest" => {
                let value = args.next().context("--ingest needs TYPE=PATH")?;
                let (doc_type, path) = value
                    .split_once('=')
                    .with_context(|| format!("expected TYPE=PATH, got {}", value))?;
                ingest.push((doc_type.parse::<DocumentType>()?, PathBuf::from(path)));
            }
            _ => query_parts.push(arg),
        }
    }

    let query = query_parts.join(" ");
    if query.trim().is_empty() {
        bail!("usage: adaptive-rag [--filter TYPE] [--ingest TYPE=PATH]... QUERY");
    }

    Ok(Args {
        filter,
        ingest,
        query,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    logging::init(&AppPaths::new());
    let state = AppState::initialize().await?;

    for (doc_type, path) in &args.ingest {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let pages: Vec<String> = text.split('\u{c}').map(str::to_string).collect();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let document = Document::new(filename, *doc_type, pages.len() as u32);
        state
            .ingestion
            .ingest(document, &pages)
            .await
            .with_context(|| format!("Failed to ingest {}", path.display()))?;
    }

    let result = state
        .orchestrator
        .run(&args.query, args.filter)
        .await
        .context("Query failed")?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
