//! CLI commands and argument parsing

use crate::types::LogLevel;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Paginate JSON record sets through the pagination controller
#[derive(Parser, Debug)]
#[command(name = "datapager")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Controller configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output (same as `--log-level debug`)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level; `RUST_LOG` directives still apply
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where pages come from
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// JSON file holding an array of records (or `{"data": [...]}`)
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Endpoint answering `GET ?page=&limit=` with a pagination response
    #[arg(long)]
    pub url: Option<String>,
}

/// Options shared by `page` and `walk`
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Page size (overrides the config file)
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// Filter as `field=value`; repeatable
    #[arg(long = "filter", value_name = "FIELD=VALUE")]
    pub filters: Vec<String>,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print one page
    Page {
        #[command(flatten)]
        query: QueryArgs,

        /// 1-based page number; clamped to the last page
        #[arg(short, long, default_value = "1")]
        page: u32,
    },

    /// Walk every page from the first to the last
    Walk {
        #[command(flatten)]
        query: QueryArgs,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<u32>,
    },

    /// Serve a record file over HTTP
    Serve {
        /// JSON file holding the records
        #[arg(long)]
        file: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

impl Cli {
    /// Log level implied by `--log-level` and `--verbose`
    pub fn log_level(&self) -> LogLevel {
        match (self.log_level, self.verbose) {
            (Some(level), _) => level,
            (None, true) => LogLevel::Debug,
            (None, false) => LogLevel::Info,
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
