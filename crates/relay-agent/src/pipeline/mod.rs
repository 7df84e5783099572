//! Mention pipeline, shared by every chat adapter.
//!
//! Adapters implement [`ChatChannel`] for their transport and call
//! [`handle_mention`]; everything between permission check and persistence
//! happens here, once.

pub mod channel;
pub mod process;

pub use channel::ChatChannel;
pub use process::{handle_mention, Outcome, APOLOGY};
