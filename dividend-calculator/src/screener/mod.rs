//! Symbol screener.
//!
//! Two operations over the shared cache directory:
//!
//! - **scrape**: hand the whole universe to the external scraper, which
//!   writes one `ticker_<SYMBOL>.json` per symbol into `CACHE_PATH`.
//! - **query**: narrow the cached symbols with a chain of predicates. The
//!   first step scans every cached file; each later step reopens only the
//!   ticker files of the symbols that survived the step before.
//!
//! # Usage
//!
//! ```ignore
//! use dividend_calculator::screener::{Operator, Predicate, Screener};
//!
//! let screener = Screener::from_config(&config);
//! let symbols = screener
//!     .query(&[
//!         Predicate::new("price.exchange", Operator::Eq, "LSE"),
//!         Predicate::new("summaryDetail.dividendYield.raw", Operator::Gt, 0.04),
//!     ])
//!     .await?;
//! ```

pub mod query;
pub mod universe;

pub use query::{Operator, Predicate};
pub use universe::Universe;

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use dividend_common::config::Config;

/// Environment variable telling the scraper where to write.
pub const CACHE_PATH_ENV: &str = "CACHE_PATH";

pub type Result<T> = std::result::Result<T, ScreenerError>;

#[derive(Debug, Error)]
pub enum ScreenerError {
    #[error("Screener IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Screener JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to start scraper {executable}: {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Screener over one cache directory.
#[derive(Debug, Clone)]
pub struct Screener {
    cache_dir: PathBuf,
    scraper_executable: PathBuf,
    universe_path: Option<PathBuf>,
}

impl Screener {
    pub fn new(
        cache_dir: impl Into<PathBuf>,
        scraper_executable: impl Into<PathBuf>,
        universe_path: Option<PathBuf>,
    ) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            scraper_executable: scraper_executable.into(),
            universe_path,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.cache.dir,
            &config.screener.scraper_executable,
            config.screener.universe_path.clone(),
        )
    }

    /// Load the symbol universe. Without a configured file the bundled lists are used.
    pub async fn universe(&self) -> Result<Universe> {
        match &self.universe_path {
            Some(path) => Universe::load(path).await,
            None => Universe::bundled(),
        }
    }

    /// Run the external scraper over the whole universe.
    ///
    /// Returns whether it exited successfully. Its output is collected but
    /// not interpreted.
    pub async fn scrape(&self) -> Result<bool> {
        let symbols = self.universe().await?.symbols();
        let executable = self.scraper_executable.display().to_string();

        info!(
            executable = %executable,
            symbols = symbols.len(),
            cache_dir = %self.cache_dir.display(),
            "Starting scraper"
        );

        let output = Command::new(&self.scraper_executable)
            .args(&symbols)
            .env(CACHE_PATH_ENV, &self.cache_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ScreenerError::Spawn {
                executable: executable.clone(),
                source,
            })?;

        let success = output.status.success();
        if success {
            info!(executable = %executable, "Scraper finished");
        } else {
            warn!(
                executable = %executable,
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Scraper failed"
            );
        }

        Ok(success)
    }

    /// Run a query chain and return the symbols that pass every step.
    ///
    /// A step that leaves no survivors ends the chain with an empty result.
    /// An empty chain selects nothing.
    pub async fn query(&self, chain: &[Predicate]) -> Result<Vec<String>> {
        let mut survivors: Option<Vec<String>> = None;

        for (step, predicate) in chain.iter().enumerate() {
            let files = match &survivors {
                None => self.cached_files().await?,
                Some(symbols) if symbols.is_empty() => break,
                Some(symbols) => symbols.iter().map(|s| self.ticker_file(s)).collect(),
            };

            let mut matched = Vec::new();
            for file in &files {
                let doc = read_document(file).await?;
                if let Some(symbol) = predicate.select(&doc) {
                    matched.push(symbol);
                }
            }

            debug!(
                step = step + 1,
                predicate = %predicate,
                candidates = files.len(),
                matched = matched.len(),
                "Screener step"
            );
            survivors = Some(matched);
        }

        Ok(survivors.unwrap_or_default())
    }

    /// Cache file holding the ticker snapshot of `symbol`.
    pub fn ticker_file(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("ticker_{}.json", symbol))
    }

    /// Every `.json` file directly under the cache directory, sorted.
    async fn cached_files(&self) -> Result<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some("json")
            {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}

async fn read_document(path: &Path) -> Result<Value> {
    let content = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&content)?)
}
