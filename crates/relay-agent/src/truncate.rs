//! Message length capping.
//!
//! Discord rejects messages over 2000 characters, so replies are cut down
//! and marked with an ellipsis instead of being split.

pub use relay_core::config::MESSAGE_CHAR_LIMIT;

/// Marker appended to a capped message.
pub const ELLIPSIS: &str = "...";

/// Cap `text` at `limit` characters.
///
/// If `text` fits it is returned unchanged. Otherwise the result is the
/// first `limit - 3` characters followed by `...`, exactly `limit`
/// characters long. Counting is by `char`, so multi-byte sequences are
/// never split.
pub fn cap_message(text: &str, limit: usize) -> String {
    let total = text.chars().count();
    if total <= limit {
        return text.to_owned();
    }

    let keep = limit.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
