//! CLI runner - executes commands

use crate::cache::QueryKey;
use crate::cli::commands::{Cli, Commands, OutputFormat, QueryArgs, SourceArgs};
use crate::config::ControllerConfig;
use crate::controller::PaginationController;
use crate::error::{Error, Result};
use crate::fetch::{HttpFetcherConfig, HttpPageFetcher, MemorySource, PageFetcher};
use crate::filters::parse_filter_pairs;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Page { query, page } => self.page(query, *page).await,
            Commands::Walk { query, max_pages } => self.walk(query, *max_pages).await,
            Commands::Serve { file, port } => {
                let config = crate::cli::ServerConfig { file: file.clone() };
                crate::cli::serve(config, *port).await
            }
        }
    }

    /// Load the controller config, then apply command-line overrides
    fn load_config(&self, query: &QueryArgs) -> Result<ControllerConfig> {
        let mut config = match &self.cli.config {
            Some(path) => ControllerConfig::from_file(path)?,
            None => ControllerConfig::default(),
        };

        if let Some(limit) = query.limit {
            config.limit = limit;
        }
        if !query.filters.is_empty() {
            let mut filters = config.filters.take().unwrap_or_default();
            filters.extend(parse_filter_pairs(&query.filters)?);
            config.filters = Some(filters);
        }

        // One-shot commands read pages in order; nothing to prefetch
        config.prefetch = false;
        config.validate()?;
        Ok(config)
    }

    /// Build the page source named on the command line
    fn build_source(source: &SourceArgs) -> Result<(String, Arc<dyn PageFetcher<Value>>)> {
        if let Some(path) = &source.file {
            let records = MemorySource::from_file(path)?;
            debug!("Loaded {} records from {}", records.len(), path.display());
            return Ok((path.display().to_string(), Arc::new(records)));
        }
        if let Some(url) = &source.url {
            let fetcher = HttpPageFetcher::new(HttpFetcherConfig::builder(url.clone()).build())?;
            return Ok((url.clone(), Arc::new(fetcher)));
        }
        Err(Error::config("Either --file or --url is required"))
    }

    fn build_controller(&self, query: &QueryArgs) -> Result<PaginationController<Value>> {
        let config = self.load_config(query)?;
        let (name, source) = Self::build_source(&query.source)?;
        PaginationController::builder(QueryKey::base(&["datapager", name.as_str()]), source)
            .config(config)
            .build()
    }

    /// Print one page
    async fn page(&self, query: &QueryArgs, page: u32) -> Result<()> {
        let controller = self.build_controller(query)?;

        controller.load().await;
        Self::ensure_loaded(&controller)?;
        controller.go_to_page(page).await;
        Self::ensure_loaded(&controller)?;

        let snapshot = controller.snapshot();
        self.output_message(&json!({
            "type": "PAGE",
            "pagination": snapshot.pagination,
            "data": snapshot.data(),
        }));
        Ok(())
    }

    /// Walk every page, printing one summary line per page
    async fn walk(&self, query: &QueryArgs, max_pages: Option<u32>) -> Result<()> {
        let controller = self.build_controller(query)?;

        controller.load().await;
        Self::ensure_loaded(&controller)?;

        let mut pages = 0u32;
        let mut items = 0usize;
        loop {
            let snapshot = controller.snapshot();
            let info = snapshot.pagination;
            pages += 1;
            items += snapshot.data().len();

            self.output_message(&json!({
                "type": "PAGE",
                "page": info.current_page,
                "count": snapshot.data().len(),
                "total": info.total,
                "totalPages": info.total_pages,
                "hasNextPage": info.has_next_page,
            }));

            if !info.has_next_page || max_pages.is_some_and(|max| pages >= max) {
                break;
            }

            controller.next_page().await;
            Self::ensure_loaded(&controller)?;
            if controller.current_page() == info.current_page {
                return Err(Error::Other(format!(
                    "Stuck on page {} of {}",
                    info.current_page, info.total_pages
                )));
            }
        }

        info!("Walked {} pages ({} items)", pages, items);
        self.output_message(&json!({
            "type": "SUMMARY",
            "pages": pages,
            "items": items,
        }));
        Ok(())
    }

    /// Turn a recorded controller error into a command failure
    fn ensure_loaded(controller: &PaginationController<Value>) -> Result<()> {
        match controller.error() {
            Some(e) => Err(Error::Other(format!(
                "Failed to load page {}: {}",
                controller.current_page(),
                e
            ))),
            None => Ok(()),
        }
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn runner(args: &[&str]) -> Runner {
        Runner::new(Cli::try_parse_from(args.iter().copied()).unwrap())
    }

    fn query(runner: &Runner) -> &QueryArgs {
        match &runner.cli.command {
            Commands::Page { query, .. } | Commands::Walk { query, .. } => query,
            Commands::Serve { .. } => panic!("no query args"),
        }
    }

    #[test]
    fn test_source_is_required() {
        assert!(Cli::try_parse_from(["datapager", "page"]).is_err());
        assert!(
            Cli::try_parse_from(["datapager", "page", "--file", "a.json", "--url", "http://x"])
                .is_err()
        );
    }

    #[test]
    fn test_command_line_overrides_config_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "limit: 20\nfilters:\n  status: open").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let runner = runner(&[
            "datapager",
            "--config",
            &path,
            "walk",
            "--file",
            "items.json",
            "--limit",
            "5",
            "--filter",
            "owner=7",
        ]);
        let config = runner.load_config(query(&runner)).unwrap();

        assert_eq!(config.limit, 5);
        assert!(!config.prefetch);
        let filters = config.filters.unwrap();
        assert_eq!(filters.get("status"), Some(&json!("open")));
        assert_eq!(filters.get("owner"), Some(&json!(7)));
    }

    #[test]
    fn test_log_level() {
        use crate::types::LogLevel;

        let level = |args: &[&str]| runner(args).cli.log_level();
        assert_eq!(level(&["datapager", "serve", "--file", "a.json"]), LogLevel::Info);
        assert_eq!(
            level(&["datapager", "-v", "serve", "--file", "a.json"]),
            LogLevel::Debug
        );
        assert_eq!(
            level(&["datapager", "-v", "--log-level", "warn", "serve", "--file", "a.json"]),
            LogLevel::Warn
        );
    }

    #[test]
    fn test_zero_limit_rejected() {
        let runner = runner(&["datapager", "page", "--file", "items.json", "--limit", "0"]);
        assert!(runner.load_config(query(&runner)).is_err());
    }

    #[test]
    fn test_missing_record_file() {
        let runner = runner(&["datapager", "page", "--file", "/no/such/items.json"]);
        let err = Runner::build_source(&query(&runner).source).err().unwrap();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
