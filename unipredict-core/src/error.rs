//! Error types shared by every adapter, the registry, and the router

use thiserror::Error;

/// Unified error type for chain, market, and routing operations
///
/// Variants carry plain messages so errors can be cloned into per-platform
/// failure summaries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TradingError {
    /// Endpoint unreachable or handshake failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// Signing material is malformed or missing where required
    #[error("Credential error: {0}")]
    Credential(String),

    /// Operation requires a connected adapter
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// Transaction or order broadcast failed
    #[error("Submission failed: {0}")]
    Submission(String),

    /// Asset balance requested that the adapter cannot resolve
    #[error("Unsupported asset: {0}")]
    UnsupportedAsset(String),

    /// Capability intentionally not implemented by this adapter
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// No adapter registered under the requested platform name
    #[error("Platform not found: {0}")]
    PlatformNotFound(String),

    /// Upstream payload could not be mapped onto a shared record
    #[error("Decode error: {0}")]
    Decode(String),

    /// Upstream reported the requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream answered with a non-success status
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Call did not complete within its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Caller supplied an argument the operation cannot accept
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TradingError {
    pub fn connection(msg: impl Into<String>) -> Self {
        TradingError::Connection(msg.into())
    }

    pub fn credential(msg: impl Into<String>) -> Self {
        TradingError::Credential(msg.into())
    }

    pub fn not_connected(msg: impl Into<String>) -> Self {
        TradingError::NotConnected(msg.into())
    }

    pub fn submission(msg: impl Into<String>) -> Self {
        TradingError::Submission(msg.into())
    }

    pub fn unsupported_asset(msg: impl Into<String>) -> Self {
        TradingError::UnsupportedAsset(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        TradingError::UnsupportedOperation(msg.into())
    }

    pub fn platform_not_found(platform: impl Into<String>) -> Self {
        TradingError::PlatformNotFound(platform.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        TradingError::Decode(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        TradingError::NotFound(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        TradingError::Upstream(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        TradingError::Timeout(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        TradingError::InvalidInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        TradingError::Config(msg.into())
    }

    /// Stable machine-readable code for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            TradingError::Connection(_) => "connection",
            TradingError::Credential(_) => "credential",
            TradingError::NotConnected(_) => "not_connected",
            TradingError::Submission(_) => "submission",
            TradingError::UnsupportedAsset(_) => "unsupported_asset",
            TradingError::UnsupportedOperation(_) => "unsupported_operation",
            TradingError::PlatformNotFound(_) => "platform_not_found",
            TradingError::Decode(_) => "decode",
            TradingError::NotFound(_) => "not_found",
            TradingError::Upstream(_) => "upstream",
            TradingError::Timeout(_) => "timeout",
            TradingError::InvalidInput(_) => "invalid_input",
            TradingError::Config(_) => "config",
        }
    }

    /// Whether retrying the same call could succeed
    ///
    /// Transient faults (network, upstream, broadcast, deadline) are
    /// retryable. Unsupported capabilities, bad input, unknown platforms and
    /// malformed data will fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TradingError::Connection(_)
                | TradingError::Submission(_)
                | TradingError::Upstream(_)
                | TradingError::Timeout(_)
        )
    }
}

/// Result type alias for trading operations
pub type TradingResult<T> = Result<T, TradingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_per_kind() {
        assert_eq!(TradingError::platform_not_found("x").code(), "platform_not_found");
        assert_eq!(TradingError::unsupported("x").code(), "unsupported_operation");
        assert_eq!(TradingError::decode("x").code(), "decode");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(TradingError::timeout("slow").is_retryable());
        assert!(TradingError::submission("nonce too low").is_retryable());
        assert!(!TradingError::unsupported("no orders").is_retryable());
        assert!(!TradingError::platform_not_found("augur").is_retryable());
        assert!(!TradingError::decode("status").is_retryable());
    }

    #[test]
    fn test_display_includes_message() {
        let err = TradingError::platform_not_found("polymarket");
        assert_eq!(err.to_string(), "Platform not found: polymarket");
    }
}
