use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tracing::info;

use relay_core::RelayConfig;
use relay_memory::{PersistenceSink, SessionStore};

use crate::keepalive;
use crate::postprocess::ResponsePostProcessor;
use crate::prompt::PromptBuilder;
use crate::provider::InferenceClient;

/// Speaker label for bot turns until the gateway reports the bot's name.
pub const DEFAULT_BOT_NAME: &str = "assistant";

/// Everything a mention cycle needs, shared across tasks via `Arc`.
pub struct RelayRuntime {
    client: Box<dyn InferenceClient>,
    model: String,
    prompt: PromptBuilder,
    postprocess: ResponsePostProcessor,
    sessions: Arc<SessionStore>,
    sink: Option<Arc<PersistenceSink>>,
    typing_interval: Duration,
    bot_name: OnceLock<String>,
}

impl RelayRuntime {
    pub fn new(
        client: Box<dyn InferenceClient>,
        model: impl Into<String>,
        prompt: PromptBuilder,
        postprocess: ResponsePostProcessor,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            prompt,
            postprocess,
            sessions,
            sink: None,
            typing_interval: keepalive::default_interval(),
            bot_name: OnceLock::new(),
        }
    }

    /// Build from the loaded config. The session store is passed in so the
    /// reaper can share it.
    pub fn from_config(
        config: &RelayConfig,
        client: Box<dyn InferenceClient>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        let conv = &config.conversation;
        let model_label = match config.ollama.model.as_str() {
            "" => "default",
            m => m,
        };
        info!(
            model = model_label,
            provider = client.name(),
            reasoning = %conv.reasoning,
            history_limit = conv.history_limit,
            "relay runtime ready"
        );
        Self::new(
            client,
            config.ollama.model.clone(),
            PromptBuilder::new(conv.bot_context.clone(), conv.mention_format),
            ResponsePostProcessor::new(conv.reasoning),
            sessions,
        )
    }

    pub fn with_sink(mut self, sink: Arc<PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_typing_interval(mut self, interval: Duration) -> Self {
        self.typing_interval = interval;
        self
    }

    pub fn client(&self) -> &dyn InferenceClient {
        &*self.client
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn prompt(&self) -> &PromptBuilder {
        &self.prompt
    }

    pub fn postprocess(&self) -> &ResponsePostProcessor {
        &self.postprocess
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn sink(&self) -> Option<&Arc<PersistenceSink>> {
        self.sink.as_ref()
    }

    pub fn typing_interval(&self) -> Duration {
        self.typing_interval
    }

    /// Record the connected bot's username. Only the first call sticks;
    /// returns `false` when a name was already set.
    pub fn set_bot_name(&self, name: impl Into<String>) -> bool {
        self.bot_name.set(name.into()).is_ok()
    }

    pub fn bot_name(&self) -> &str {
        self.bot_name
            .get()
            .map(String::as_str)
            .unwrap_or(DEFAULT_BOT_NAME)
    }
}
