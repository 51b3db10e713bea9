//! Errors raised while assembling the service configuration.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// A setting holds a value the service cannot run with
    #[error("Invalid setting {field}: {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    #[error("Unknown log format \"{0}\" (expected \"json\" or \"pretty\")")]
    UnknownLogFormat(String),
}

impl Error {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            field,
            reason: reason.into(),
        }
    }

    /// Dotted name of the offending setting.
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidSetting { field, .. } => field,
            Self::UnknownLogFormat(_) => "observability.log_format",
        }
    }
}
