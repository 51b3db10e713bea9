//! Dividend Calculator - REST API over cached finance data.

use anyhow::Result;
use dividend_calculator::CalculatorService;
use dividend_common::config::Config;
use dividend_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Start timing immediately for cold-start measurement
    let startup_start = std::time::Instant::now();

    // Load configuration (file, then environment overrides)
    let config = Config::load_with_env()?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Dividend Calculator v{}", env!("CARGO_PKG_VERSION"));

    let service = CalculatorService::new(config);

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    service.start().await
}
