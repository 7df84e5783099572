pub mod adapter;
pub mod channel;
pub mod error;
pub mod handler;

pub use adapter::DiscordAdapter;
pub use channel::DiscordChannel;
pub use error::DiscordError;
pub use handler::RelayHandler;
