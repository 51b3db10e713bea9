//! Logging setup and request tracing helpers.
//!
//! `RUST_LOG` wins when set. Otherwise the configured level applies to
//! everything except the HTTP and TLS stacks, which only log warnings.

use std::str::FromStr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Error;

/// HTTP/TLS crates that only log at warn and above.
pub const NOISY_MODULES: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls", "tower_http"];

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, with the current span's fields
    Json,
    /// Compact human-readable lines
    Pretty,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => Err(Error::UnknownLogFormat(s.to_string())),
        }
    }
}

fn noise_directives() -> impl Iterator<Item = String> {
    NOISY_MODULES.iter().map(|module| format!("{}=warn", module))
}

fn env_filter(log_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    noise_directives().fold(EnvFilter::new(log_level), |filter, directive| {
        match directive.parse() {
            Ok(d) => filter.add_directive(d),
            Err(_) => filter,
        }
    })
}

/// Install the global subscriber. Later calls are no-ops.
///
/// An unknown `log_format` falls back to pretty output.
pub fn init_logging(log_level: &str, log_format: &str) {
    let format = log_format.parse().unwrap_or(LogFormat::Pretty);
    let registry = tracing_subscriber::registry().with(env_filter(log_level));

    let installed = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().compact()).try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(log_level = %log_level, format = ?format, "Logging initialized");
    }
}

/// Fresh trace id for one API request.
pub fn generate_trace_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Open the `api_request` span for one request.
///
/// ```ignore
/// let span = request_span!(generate_trace_id(), route = "ratios", symbol = %symbol);
/// async { ... }.instrument(span).await
/// ```
#[macro_export]
macro_rules! request_span {
    ($trace_id:expr) => {
        tracing::info_span!("api_request", trace_id = %$trace_id)
    };
    ($trace_id:expr, $($field:tt)*) => {
        tracing::info_span!("api_request", trace_id = %$trace_id, $($field)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_directives_parse() {
        let directives: Vec<String> = noise_directives().collect();
        assert_eq!(directives.len(), NOISY_MODULES.len());
        assert!(directives.contains(&"reqwest=warn".to_string()));
        for d in directives {
            assert!(d.parse::<tracing_subscriber::filter::Directive>().is_ok());
        }
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("Pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_trace_ids_are_unique_uuids() {
        let a = generate_trace_id();
        assert_ne!(a, generate_trace_id());
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }
}
