//! Command line argument parsing for the dualdex CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// dualdex - trigram recall and exact phrase search over JSON documents
#[derive(Parser, Debug, Clone)]
#[command(name = "dualdex")]
#[command(about = "Dual-mode (lossy + exact) full-text search over JSON documents")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct DualdexArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE", env = "DUALDEX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl DualdexArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n + 1,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Dispatch newline-delimited JSON envelopes, one response per line
    Run(RunArgs),

    /// Index a JSONL document file and run one query against it
    Search(SearchArgs),
}

/// Arguments for processing envelopes
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Envelope file (JSONL); reads stdin when omitted
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Report failed envelopes and continue instead of aborting
    #[arg(short, long)]
    pub keep_going: bool,
}

/// Arguments for searching a document file
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Document file (one JSON object per line)
    #[arg(value_name = "DOCUMENT_FILE")]
    pub documents: PathBuf,

    /// Query string
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Search mode
    #[arg(short = 'm', long, default_value = "lossy")]
    pub mode: SearchMode,

    /// Maximum number of results per page
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Field holding the document identifier
    #[arg(long)]
    pub primary_field: Option<String>,

    /// Field to index and search
    #[arg(long)]
    pub field: Option<String>,

    /// Follow cursors until the result set is exhausted
    #[arg(long)]
    pub all_pages: bool,
}

/// Search modes available in CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Trigram and prefix recall
    Lossy,
    /// Exact phrase match
    Exact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_ladder() {
        let args = DualdexArgs::parse_from(["dualdex", "run"]);
        assert_eq!(args.verbosity(), 1);
        let args = DualdexArgs::parse_from(["dualdex", "-vv", "run"]);
        assert_eq!(args.verbosity(), 3);
        let args = DualdexArgs::parse_from(["dualdex", "-q", "-v", "run"]);
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_search_args() {
        let args = DualdexArgs::parse_from([
            "dualdex", "--pretty", "search", "docs.jsonl", "hello world", "-m", "exact", "-l", "5",
        ]);
        assert!(args.pretty);
        let Command::Search(search) = args.command else {
            panic!("expected search command");
        };
        assert_eq!(search.mode, SearchMode::Exact);
        assert_eq!(search.limit, Some(5));
        assert_eq!(search.query, "hello world");
    }
}
