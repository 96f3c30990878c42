use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnPoolError {
    #[error("Failed to resolve {address}: {source}")]
    Resolution {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to connect to {address}: {source}")]
    Dial {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection to {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConnPoolError {
    /// True only when a bounded dial ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConnPoolError::Timeout { .. })
    }

    /// True for every dial failure, timeouts included.
    pub fn is_dial(&self) -> bool {
        matches!(
            self,
            ConnPoolError::Dial { .. } | ConnPoolError::Timeout { .. }
        )
    }

    pub fn is_resolution(&self) -> bool {
        matches!(self, ConnPoolError::Resolution { .. })
    }
}

pub type Result<T> = std::result::Result<T, ConnPoolError>;
