use async_trait::async_trait;

use relay_core::RelayError;

/// A remote text-generation endpoint: one prompt in, one full completion out.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`. No streaming, no retries.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, InferenceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Endpoint unavailable: {0}")]
    Unavailable(String),
}

impl InferenceError {
    /// Upstream HTTP status, when the endpoint answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            InferenceError::Api { status, .. } => Some(*status),
            InferenceError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<InferenceError> for RelayError {
    fn from(err: InferenceError) -> Self {
        let status = err.status();
        let body = match err {
            InferenceError::Api { message, .. } => message,
            other => other.to_string(),
        };
        RelayError::InferenceFailure { status, body }
    }
}
