use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Validation errors for user input and configuration exposed by `tickerwatch-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid history range '{value}', expected e.g. 1D, 1W, 1M, 3M, 1Y, 5Y")]
    InvalidRange { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("quote service base url is not configured (set TICKERWATCH_BASE_URL)")]
    MissingBaseUrl,
    #[error("quote service base url must start with http:// or https://: '{value}'")]
    InvalidBaseUrl { value: String },
}

/// Classification of a failed remote fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Transport failure, or a non-2xx status without a parseable error body.
    Network,
    /// The service answered with an `{error}`/`{message}` payload.
    Api,
    /// The response did not match the contract of the requested operation.
    Parse,
    /// The requested symbol is absent from the response.
    NotFound,
    /// The request was rejected before any I/O.
    InvalidRequest,
    Internal,
}

/// Structured fetch error surfaced by the cache managers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    kind: FetchErrorKind,
    message: String,
    status: Option<u16>,
}

impl FetchError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Network,
            message: message.into(),
            status: None,
        }
    }

    pub fn http_status(status: u16) -> Self {
        Self {
            kind: FetchErrorKind::Network,
            message: format!("quote service returned status {status}"),
            status: Some(status),
        }
    }

    pub fn api(message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            kind: FetchErrorKind::Api,
            message: message.into(),
            status,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Parse,
            message: message.into(),
            status: None,
        }
    }

    pub fn not_found(symbol: impl Display) -> Self {
        Self {
            kind: FetchErrorKind::NotFound,
            message: format!("symbol '{symbol}' was not found"),
            status: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::InvalidRequest,
            message: message.into(),
            status: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Internal,
            message: message.into(),
            status: None,
        }
    }

    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind, FetchErrorKind::NotFound)
    }

    /// Whether a manual retry by the user has a reasonable chance to succeed.
    pub const fn retryable(&self) -> bool {
        match self.kind {
            FetchErrorKind::Network => true,
            FetchErrorKind::Api => matches!(self.status, Some(429) | Some(500..=599)),
            _ => false,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            FetchErrorKind::Network => "fetch.network",
            FetchErrorKind::Api => "fetch.api",
            FetchErrorKind::Parse => "fetch.parse",
            FetchErrorKind::NotFound => "fetch.not_found",
            FetchErrorKind::InvalidRequest => "fetch.invalid_request",
            FetchErrorKind::Internal => "fetch.internal",
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for FetchError {}

impl From<ValidationError> for FetchError {
    fn from(value: ValidationError) -> Self {
        Self::invalid_request(value.to_string())
    }
}

/// Errors raised by the persistent key-value substrate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage i/o failed for '{name}': {message}")]
    Io { name: String, message: String },
    #[error("persisted state for '{name}' could not be (de)serialized: {message}")]
    Serialization { name: String, message: String },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
