use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{source_id} responded with status {status}")]
    Upstream { source_id: String, status: u16 },

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limit reached")]
    RateLimited,

    #[error("{message}")]
    Validation { code: &'static str, message: String },

    #[error("{message}")]
    Auth { code: &'static str, message: String },

    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { code, message: message.into() }
    }

    pub fn auth(code: &'static str, message: impl Into<String>) -> Self {
        Self::Auth { code, message: message.into() }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict { code, message: message.into() }
    }

    /// Network-level failures worth another attempt against the same upstream.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Timeout => true,
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// Upstream status 426, the quota-exceeded signal used by the news APIs.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Error::Upstream { status: 426, .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
