//! Command implementations for the dualdex CLI.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use log::{info, warn};
use serde::Serialize;
use serde_json::{Value, json};

use crate::cli::args::*;
use crate::config::EngineConfig;
use crate::error::{DualdexError, Result};
use crate::handler::handle;
use crate::search::{IndexRequest, SearchEngine, SearchRequest, SearchResponse};

/// Execute a CLI command.
pub async fn execute_command(args: DualdexArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let engine = SearchEngine::from_config(config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &args.command {
        Command::Run(run_args) => run_envelopes(run_args, &engine, &args, &mut out).await,
        Command::Search(search_args) => search_documents(search_args, &engine, &args, &mut out).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            info!("Loading config from: {}", path.display());
            EngineConfig::from_file(path)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn open_lines(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    Ok(match path {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    })
}

fn write_json<T: Serialize, W: Write>(out: &mut W, value: &T, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, value)?;
    } else {
        serde_json::to_writer(&mut *out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Dispatch every envelope of the input through the handler.
pub async fn run_envelopes<W: Write>(
    run_args: &RunArgs,
    engine: &SearchEngine,
    cli_args: &DualdexArgs,
    out: &mut W,
) -> Result<()> {
    let reader = open_lines(run_args.input.as_deref())?;
    let mut handled = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;
        let outcome = match serde_json::from_str::<Value>(&line) {
            Ok(envelope) => handle(engine, envelope).await,
            Err(e) => Err(DualdexError::input(format!("line {line_no} is not JSON: {e}"))),
        };
        match outcome {
            Ok(response) => write_json(out, &response, cli_args.pretty)?,
            Err(e) if run_args.keep_going => {
                warn!("Envelope on line {line_no} failed: {e}");
                write_json(
                    out,
                    &json!({"line": line_no, "error": e.to_string()}),
                    cli_args.pretty,
                )?;
            }
            Err(e) => return Err(e),
        }
        handled += 1;
    }

    info!("Handled {handled} envelopes");
    Ok(())
}

/// Index a document file, then run the query and print each page.
pub async fn search_documents<W: Write>(
    search_args: &SearchArgs,
    engine: &SearchEngine,
    cli_args: &DualdexArgs,
    out: &mut W,
) -> Result<()> {
    let reader = open_lines(Some(search_args.documents.as_path()))?;
    let mut indexed = 0usize;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut request = IndexRequest::new(serde_json::from_str(&line)?);
        request.primary_field = search_args.primary_field.clone();
        request.index_field = search_args.field.clone();
        engine.index_document(request).await?;
        indexed += 1;
    }
    info!(
        "Indexed {indexed} documents from {}",
        search_args.documents.display()
    );

    let mut cursor = None;
    loop {
        let mut request = SearchRequest::new(search_args.query.clone()).with_cursor(cursor.take());
        request.limit = search_args.limit;
        request.index_field = search_args.field.clone();

        let response: SearchResponse = match search_args.mode {
            SearchMode::Lossy => engine.search_lossy(request).await?,
            SearchMode::Exact => engine.search_exact(request).await?,
        };
        write_json(out, &response, cli_args.pretty)?;

        match response.cursor {
            Some(next) if search_args.all_pages => cursor = Some(next),
            _ => break,
        }
    }
    Ok(())
}
