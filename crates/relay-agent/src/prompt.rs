use relay_core::config::MentionFormat;
use relay_core::types::Author;
use relay_memory::Turn;

/// Header line introducing the remembered exchanges.
pub const HISTORY_HEADER: &str = "Previous conversation:";
/// Lead-in for the message being answered in [`MentionFormat::Plain`].
pub const PLAIN_LEAD: &str = "Message you're responding to: ";

/// Assembles the single text prompt sent to the model.
///
/// ```text
/// <static context>
///
/// Previous conversation:        (only when history is non-empty)
/// alice: hi
/// relay: hello!
///
/// Message you're responding to: <content>
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    context: String,
    format: MentionFormat,
}

impl PromptBuilder {
    pub fn new(context: impl Into<String>, format: MentionFormat) -> Self {
        Self {
            context: context.into(),
            format,
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn build(&self, history: &[Turn], message: &str, author: &Author) -> String {
        let mut prompt = String::with_capacity(self.context.len() + message.len() + 64);
        prompt.push_str(&self.context);
        prompt.push_str("\n\n");

        if !history.is_empty() {
            prompt.push_str(HISTORY_HEADER);
            prompt.push('\n');
            for turn in history {
                prompt.push_str(&format_turn(turn));
                prompt.push('\n');
            }
            prompt.push('\n');
        }

        prompt.push_str(&self.current_line(message, author));
        prompt
    }

    fn current_line(&self, message: &str, author: &Author) -> String {
        match self.format {
            MentionFormat::Plain => format!("{PLAIN_LEAD}{message}"),
            MentionFormat::Attributed => format!(
                "{} (id: {}) says: {}",
                author.display_name, author.id, message
            ),
        }
    }
}

/// `"<speaker>: <content>"`
pub fn format_turn(turn: &Turn) -> String {
    format!("{}: {}", turn.speaker, turn.content)
}
