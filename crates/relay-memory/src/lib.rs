pub mod archive;
pub mod error;
pub mod reaper;
pub mod session;
pub mod sink;
pub mod transcript;
pub mod types;

pub use error::MemoryError;
pub use reaper::InactivityReaper;
pub use session::SessionStore;
pub use sink::PersistenceSink;
pub use types::{Session, TranscriptRecord, Turn};
