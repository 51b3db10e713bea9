//! Dividend Calculator - equity dividend and valuation ratios over cached
//! finance data.
//!
//! Fetches quote summaries, dividend events, and price history from Yahoo
//! Finance, keeps every response in a time-to-live disk cache, derives
//! dividend and valuation ratios, screens cached symbols with predicate
//! chains, and serves all of it over a small REST API.
//!
//! # Modules
//! - **data**: safe JSON accessor, disk cache, data source trait, Yahoo client
//! - **ticker**: `Ticker` ratios and `Financial` statement views
//! - **screener**: external scraper invocation and predicate queries
//! - **routes**: axum router and handlers

pub mod data;
pub mod error;
pub mod routes;
pub mod screener;
pub mod ticker;

use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use dividend_common::config::Config;

pub use data::{FinanceDataSource, YahooFinance};
pub use error::ApiError;
pub use routes::{build_router, AppState};
pub use screener::Screener;
pub use ticker::{Financial, Ticker};

/// The HTTP service.
pub struct CalculatorService {
    config: Config,
    state: AppState,
}

impl CalculatorService {
    /// Create the service backed by Yahoo Finance.
    pub fn new(config: Config) -> Self {
        let source: Arc<dyn FinanceDataSource> = Arc::new(YahooFinance::from_config(&config));
        Self::with_source(config, source)
    }

    /// Create the service over any data source.
    pub fn with_source(config: Config, source: Arc<dyn FinanceDataSource>) -> Self {
        let screener = Screener::from_config(&config);
        Self {
            state: AppState::new(source, screener),
            config,
        }
    }

    /// Router with CORS applied.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        build_router(self.state.clone()).layer(cors)
    }

    /// Bind and serve until Ctrl-C.
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr =
            format!("{}:{}", self.config.server.host, self.config.server.port).parse()?;

        tracing::info!(
            address = %addr,
            source = self.state.source.name(),
            cache_dir = %self.config.cache.dir.display(),
            "Starting HTTP server"
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
