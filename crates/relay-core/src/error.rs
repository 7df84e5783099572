use thiserror::Error;

/// Error kinds surfaced by the relay core.
///
/// Only `InferenceFailure` ever reaches a chat user, and then only as a
/// generic apology. Everything else is operator-visible through logs.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("Inference failed (status {status:?}): {body}")]
    InferenceFailure { status: Option<u16>, body: String },

    #[error("Delivery failed, undelivered text: {text}")]
    DeliveryFailure { text: String },

    #[error("Persistence error: {0}")]
    PersistenceFailure(String),
}

impl RelayError {
    /// Short, stable error code for log correlation.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::Config(_) => "CONFIG_ERROR",
            RelayError::PermissionDenied { .. } => "PERMISSION_DENIED",
            RelayError::InferenceFailure { .. } => "INFERENCE_FAILURE",
            RelayError::DeliveryFailure { .. } => "DELIVERY_FAILURE",
            RelayError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
        }
    }
}

/// Failure reported by the chat gateway when signalling or sending.
///
/// The split matters: a permission error is an expected, local condition
/// (skip or stop quietly), anything else is logged as a real fault.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("missing permission: {0}")]
    PermissionDenied(String),

    #[error("channel error: {0}")]
    Other(String),
}

impl ChannelError {
    pub fn is_permission(&self) -> bool {
        matches!(self, ChannelError::PermissionDenied(_))
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
