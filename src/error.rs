//! Error types for the DSM control plane

use thiserror::Error;

/// Result type alias for control-plane operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the control plane
///
/// Per-target failures during a dispatch are never represented here; they
/// are recorded as outcomes in the report instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad caller input, rejected before any network activity
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Action is stubbed out and must not reach any node
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Fleet listing could not be obtained
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// RPC transport failure outside of a dispatch batch
    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Fleet listing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The control host returned nothing usable
    #[error("DSM server not responding ({host}:{port}): {reason}")]
    Unavailable {
        host: String,
        port: u16,
        reason: String,
    },
}

/// Transport-level failures of a single remote call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    /// No answer within the request timeout
    #[error("request timed out")]
    Timeout,

    /// Connection could not be established or was dropped
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// Reply arrived but its shape is not one the transport understands
    #[error("malformed reply: {shape}")]
    Malformed { shape: String },
}

impl RpcError {
    /// Whether this failure means the remote simply did not answer
    #[must_use]
    pub const fn is_no_response(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unreachable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_and_unreachable_are_no_response() {
        assert!(RpcError::Timeout.is_no_response());
        assert!(RpcError::Unreachable("refused".to_string()).is_no_response());
        assert!(
            !RpcError::Malformed {
                shape: "array".to_string()
            }
            .is_no_response()
        );
    }

    #[test]
    fn registry_error_names_the_server() {
        let err = Error::from(RegistryError::Unavailable {
            host: "localhost".to_string(),
            port: 30003,
            reason: "empty listing".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "DSM server not responding (localhost:30003): empty listing"
        );
    }
}
