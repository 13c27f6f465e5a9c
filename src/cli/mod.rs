//! CLI module
//!
//! Command-line interface over the pagination controller.
//!
//! # Commands
//!
//! - `page` - Print one page of a record file or endpoint
//! - `walk` - Walk every page with `next_page`
//! - `serve` - Serve a record file over HTTP

mod commands;
mod runner;
mod server;

pub use commands::{Cli, Commands, OutputFormat, QueryArgs, SourceArgs};
pub use runner::Runner;
pub use server::{router, serve, ServerConfig};
