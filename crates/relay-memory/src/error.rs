use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MemoryError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        MemoryError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl From<MemoryError> for relay_core::RelayError {
    fn from(err: MemoryError) -> Self {
        relay_core::RelayError::PersistenceFailure(err.to_string())
    }
}
