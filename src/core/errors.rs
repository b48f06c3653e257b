use crate::core::kernel::envelope::ApiErrorKind;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Request timed out: {0}")]
    TimeoutError(String),

    #[error("Rate limited by exchange (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {code} - {message}")]
    ApiError { code: String, message: String },

    #[error("Decode error: {message}")]
    DecodeError { message: String, payload: String },

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),
}

impl ExchangeError {
    /// Build a `DecodeError` carrying the offending payload verbatim.
    pub fn decode(message: impl Into<String>, payload: &[u8]) -> Self {
        Self::DecodeError {
            message: message.into(),
            payload: String::from_utf8_lossy(payload).into_owned(),
        }
    }

    /// Network-level failures and throttling, the only errors an idempotent
    /// request may be retried on.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransportError(_) | Self::TimeoutError(_) | Self::RateLimited { .. }
        )
    }

    /// Server-provided backoff hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Category of an exchange-level rejection.
    pub fn api_error_kind(&self) -> Option<ApiErrorKind> {
        match self {
            Self::ApiError { code, .. } => Some(ApiErrorKind::from_code(code)),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
            || self.api_error_kind() == Some(ApiErrorKind::RateLimited)
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TimeoutError(err.to_string())
        } else {
            Self::TransportError(err.to_string())
        }
    }
}
