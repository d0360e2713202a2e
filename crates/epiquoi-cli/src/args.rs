//! CLI argument definitions using clap
//!
//! - epiquoi                       # Interactive chat
//! - epiquoi "question"            # Ask once and exit
//! - epiquoi --no-stream "..."     # Single-shot request, no progress labels

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "epiquoi")]
#[command(about = "EpiQuoi - chat with the Epitech assistant from your terminal")]
#[command(version)]
pub struct Cli {
    /// Message to send (omit for interactive mode)
    pub message: Option<String>,

    /// Path to a JSON, TOML or YAML configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Backend base URL, e.g. http://localhost:8000
    #[arg(long)]
    pub base_url: Option<String>,

    /// Use the single-shot endpoint instead of the event stream
    #[arg(long)]
    pub no_stream: bool,

    /// Enable verbose output and debug logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}
