use tracing::{debug, warn};

use relay_core::config::ReasoningMode;

use crate::reasoning;
use crate::truncate::{cap_message, MESSAGE_CHAR_LIMIT};

/// Turns raw model output into the text that is actually sent.
///
/// Reasoning blocks are handled first, then the result is capped, so a long
/// hidden deliberation never eats into the visible answer's budget.
#[derive(Debug, Clone, Copy)]
pub struct ResponsePostProcessor {
    mode: ReasoningMode,
    limit: usize,
}

impl ResponsePostProcessor {
    pub fn new(mode: ReasoningMode) -> Self {
        Self {
            mode,
            limit: MESSAGE_CHAR_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn mode(&self) -> ReasoningMode {
        self.mode
    }

    pub fn process(&self, raw: &str) -> String {
        let text = if reasoning::has_reasoning(raw) {
            debug!(mode = %self.mode, "found reasoning block in response");
            reasoning::apply(raw, self.mode)
        } else {
            raw.to_string()
        };

        let chars = text.chars().count();
        if chars > self.limit {
            warn!(chars, limit = self.limit, "response exceeds message limit, truncating");
        }
        cap_message(&text, self.limit)
    }
}

impl Default for ResponsePostProcessor {
    fn default() -> Self {
        Self::new(ReasoningMode::default())
    }
}
