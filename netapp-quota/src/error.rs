//! Error types for netapp-quota

use thiserror::Error;

use crate::transition::TransitionTarget;

/// Result type alias for quota operations
pub type Result<T> = std::result::Result<T, QuotaError>;

/// Transport-level failure of a storage client call
#[derive(Error, Debug)]
pub enum ClientError {
    /// Request could not be sent or the connection failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Controller answered with an error status and no usable error body
    #[error("Unexpected HTTP status {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    Decode(String),
}

/// Why a single controller operation did not succeed
#[derive(Error, Debug)]
pub enum FailureCause {
    /// The call itself failed
    #[error(transparent)]
    Transport(#[from] ClientError),

    /// The controller answered but reported `passed = false`
    #[error("controller reported failure: {0}")]
    Rejected(String),

    /// Quota status was neither `on` nor `off`
    #[error("unexpected quota status '{0}'")]
    UnexpectedStatus(String),
}

impl FailureCause {
    /// Server-supplied reason, if the controller rejected the call
    pub fn reason(&self) -> Option<&str> {
        match self {
            FailureCause::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Quota daemon error types
#[derive(Error, Debug)]
pub enum QuotaError {
    /// Volume listing failed
    #[error("Volume inventory unavailable: {0}")]
    Inventory(FailureCause),

    /// Quota status query failed
    #[error("getQuotaStatus failed for volume {volume}: {cause}")]
    StatusQuery { volume: String, cause: FailureCause },

    /// Quota entry lookup failed
    #[error("Quota lookup failed for volume {volume}: {cause}")]
    QuotaLookup { volume: String, cause: FailureCause },

    /// Enabling or disabling quota failed
    #[error("switchQuota {target} failed for volume {volume}: {cause}")]
    Transition {
        volume: String,
        target: TransitionTarget,
        cause: FailureCause,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QuotaError {
    /// Server-supplied reason carried by the underlying cause
    pub fn reason(&self) -> Option<&str> {
        match self {
            QuotaError::Inventory(cause)
            | QuotaError::StatusQuery { cause, .. }
            | QuotaError::QuotaLookup { cause, .. }
            | QuotaError::Transition { cause, .. } => cause.reason(),
            QuotaError::Config(_) | QuotaError::Io(_) => None,
        }
    }
}
