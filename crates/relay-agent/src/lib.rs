pub mod keepalive;
pub mod ollama;
pub mod pipeline;
pub mod postprocess;
pub mod prompt;
pub mod provider;
pub mod reasoning;
pub mod runtime;
pub mod truncate;

pub use ollama::OllamaClient;
pub use pipeline::{handle_mention, ChatChannel, Outcome};
pub use provider::{InferenceClient, InferenceError};
pub use runtime::RelayRuntime;
