//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Download article PDFs from a document-delivery mirror.
///
/// Queries may be DOIs, URLs, or citation lines; citations are reduced to
/// their title before being submitted.
#[derive(Parser, Debug)]
#[command(name = "scihub")]
#[command(author, version, about)]
pub struct Args {
    /// Output directory for PDFs and the pdf_paths.csv index
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Mirror URL that answers search requests
    #[arg(short, long, global = true)]
    pub mirror: Option<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Download every query in a file (one per line)
    File {
        /// Path to the query file
        file_path: PathBuf,
    },
    /// Download a single query
    Single {
        /// DOI, URL, or citation line
        query: String,
    },
    /// Print how each query would be submitted, without network access
    Classify {
        /// Queries to classify
        #[arg(required = true)]
        queries: Vec<String>,
    },
}
