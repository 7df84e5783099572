use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Discord's hard cap on a single message, in characters.
pub const MESSAGE_CHAR_LIMIT: usize = 2000;
/// Route appended to the Ollama base URL when it is not already present.
pub const GENERATE_ROUTE: &str = "/api/generate";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const DEFAULT_INACTIVITY_TIMEOUT_SECS: u64 = 5 * 60;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
/// Typing indicator refresh cadence. Discord shows "typing..." for ~10s.
pub const TYPING_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_BOT_CONTEXT: &str =
    "You are a helpful and friendly Discord assistant. Respond concisely and relevantly.";

/// Top-level config (relay.toml + RELAY_* env overrides + legacy env names).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RelayConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiscordConfig {
    /// Gateway authentication secret. Required.
    #[serde(default)]
    pub bot_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL or full generate URL; see [`OllamaConfig::generate_url`].
    #[serde(default = "default_ollama_url")]
    pub api_url: String,
    /// Empty means "let Ollama pick its default model".
    #[serde(default)]
    pub model: String,
    /// Optional transport timeout for a single generate call.
    pub timeout_secs: Option<u64>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            api_url: default_ollama_url(),
            model: String::new(),
            timeout_secs: None,
        }
    }
}

impl OllamaConfig {
    /// The endpoint every generate call is posted to.
    pub fn generate_url(&self) -> String {
        normalize_generate_url(&self.api_url)
    }
}

/// How `<think>` reasoning blocks in model output are shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningMode {
    /// Reasoning blocks are removed before the reply is sent.
    #[default]
    Suppress,
    /// Reasoning blocks are rendered as block quotes in place.
    Surface,
}

impl std::fmt::Display for ReasoningMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReasoningMode::Suppress => f.write_str("suppress"),
            ReasoningMode::Surface => f.write_str("surface"),
        }
    }
}

/// How the message being answered is introduced in the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MentionFormat {
    /// `Message you're responding to: <content>`
    #[default]
    Plain,
    /// `<name> (id: <id>) says: <content>`
    Attributed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Number of exchanges (user + bot turn pairs) remembered per channel.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Static context placed at the top of every prompt.
    #[serde(default = "default_bot_context")]
    pub bot_context: String,
    #[serde(default)]
    pub reasoning: ReasoningMode,
    #[serde(default)]
    pub mention_format: MentionFormat,
    #[serde(default = "default_inactivity_timeout")]
    pub inactivity_timeout_secs: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            bot_context: default_bot_context(),
            reasoning: ReasoningMode::default(),
            mention_format: MentionFormat::default(),
            inactivity_timeout_secs: DEFAULT_INACTIVITY_TIMEOUT_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

/// Optional durable side effects. Both are off unless enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub transcripts: bool,
    #[serde(default = "default_transcript_path")]
    pub transcript_path: String,
    #[serde(default)]
    pub raw_prompts: bool,
    #[serde(default = "default_raw_prompt_dir")]
    pub raw_prompt_dir: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            transcripts: false,
            transcript_path: default_transcript_path(),
            raw_prompts: false,
            raw_prompt_dir: default_raw_prompt_dir(),
        }
    }
}

fn default_ollama_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}
fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}
fn default_bot_context() -> String {
    DEFAULT_BOT_CONTEXT.to_string()
}
fn default_inactivity_timeout() -> u64 {
    DEFAULT_INACTIVITY_TIMEOUT_SECS
}
fn default_sweep_interval() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}
fn default_transcript_path() -> String {
    "logs/transcripts.json".to_string()
}
fn default_raw_prompt_dir() -> String {
    "logs/prompts".to_string()
}

/// Append the generate route to `base` unless it already ends with it.
pub fn normalize_generate_url(base: &str) -> String {
    let trimmed = base.trim().trim_end_matches('/');
    if trimmed.ends_with(GENERATE_ROUTE) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{GENERATE_ROUTE}")
    }
}

impl RelayConfig {
    /// Load config from a TOML file with env var overrides, then validate.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.ollama-relay/relay.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: RelayConfig = Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::RelayError::Config(e.to_string()))?;

        if std::path::Path::new(&path).exists() {
            tracing::debug!(path = %path, "config file loaded");
        } else {
            tracing::debug!(path = %path, "no config file, using defaults and environment");
        }

        config.validate()?;
        Ok(config)
    }

    /// Provider stack: defaults < TOML file < `RELAY_*` < legacy env names.
    ///
    /// `RELAY_OLLAMA__MODEL=llama3` sets `ollama.model`.
    pub fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(RelayConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("RELAY_").split("__"))
            .merge(legacy_env())
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.discord.bot_token.trim().is_empty() {
            return Err(crate::error::RelayError::Config(
                "discord.bot_token is not set (DISCORD_TOKEN or RELAY_DISCORD__BOT_TOKEN)".into(),
            ));
        }
        if self.conversation.sweep_interval_secs == 0 {
            return Err(crate::error::RelayError::Config(
                "conversation.sweep_interval_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Unprefixed variable names from the plain `.env` layout, mapped to the
/// string fields they set.
const LEGACY_STRING_VARS: &[(&str, &str)] = &[
    ("DISCORD_TOKEN", "discord.bot_token"),
    ("OLLAMA_API_URL", "ollama.api_url"),
    ("OLLAMA_MODEL", "ollama.model"),
    ("BOT_CONTEXT", "conversation.bot_context"),
];

/// Legacy variables, read verbatim.
///
/// `Env` would guess `42` or `true` into numbers and booleans, so string
/// fields are fed as strings. Only `HISTORY_LIMIT` is parsed.
fn legacy_env() -> Figment {
    let mut figment = Figment::new();
    for (var, key) in LEGACY_STRING_VARS {
        if let Ok(value) = std::env::var(var) {
            figment = figment.merge(Serialized::default(key, value));
        }
    }
    if let Ok(raw) = std::env::var("HISTORY_LIMIT") {
        figment = match raw.trim().parse::<usize>() {
            Ok(limit) => figment.merge(Serialized::default("conversation.history_limit", limit)),
            // Left as text so extraction reports the bad value.
            Err(_) => figment.merge(Serialized::default("conversation.history_limit", raw)),
        };
    }
    figment
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.ollama-relay/relay.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn normalize_appends_route_once() {
        assert_eq!(
            normalize_generate_url("http://localhost:11434"),
            "http://localhost:11434/api/generate"
        );
        assert_eq!(
            normalize_generate_url("http://localhost:11434/"),
            "http://localhost:11434/api/generate"
        );
        assert_eq!(
            normalize_generate_url("http://gpu-box:11434/api/generate"),
            "http://gpu-box:11434/api/generate"
        );
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = RelayConfig::default();
        assert_eq!(config.conversation.history_limit, 10);
        assert_eq!(config.conversation.inactivity_timeout_secs, 300);
        assert_eq!(config.conversation.reasoning, ReasoningMode::Suppress);
        assert_eq!(config.conversation.mention_format, MentionFormat::Plain);
        assert_eq!(config.ollama.api_url, DEFAULT_OLLAMA_URL);
        assert!(!config.persistence.transcripts);
        assert!(!config.persistence.raw_prompts);
    }

    #[test]
    fn toml_and_prefixed_env_are_layered() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "relay.toml",
                r#"
                [discord]
                bot_token = "from-file"

                [ollama]
                model = "llama3"

                [conversation]
                history_limit = 4
                reasoning = "surface"
                "#,
            )?;
            jail.set_env("RELAY_OLLAMA__MODEL", "qwen3");

            let config = RelayConfig::load(Some("relay.toml")).expect("load");
            assert_eq!(config.discord.bot_token, "from-file");
            assert_eq!(config.ollama.model, "qwen3");
            assert_eq!(config.conversation.history_limit, 4);
            assert_eq!(config.conversation.reasoning, ReasoningMode::Surface);
            Ok(())
        });
    }

    #[test]
    fn legacy_env_names_are_honoured() {
        Jail::expect_with(|jail| {
            jail.set_env("DISCORD_TOKEN", "legacy-token");
            jail.set_env("OLLAMA_API_URL", "http://box:11434");
            jail.set_env("HISTORY_LIMIT", "3");
            jail.set_env("BOT_CONTEXT", "Be terse.");

            let config = RelayConfig::load(Some("missing.toml")).expect("load");
            assert_eq!(config.discord.bot_token, "legacy-token");
            assert_eq!(config.ollama.generate_url(), "http://box:11434/api/generate");
            assert_eq!(config.conversation.history_limit, 3);
            assert_eq!(config.conversation.bot_context, "Be terse.");
            Ok(())
        });
    }

    #[test]
    fn legacy_values_stay_strings() {
        Jail::expect_with(|jail| {
            jail.set_env("DISCORD_TOKEN", "12345");
            jail.set_env("BOT_CONTEXT", "42");
            jail.set_env("OLLAMA_MODEL", "true");

            let config = RelayConfig::load(Some("none.toml")).expect("load");
            assert_eq!(config.discord.bot_token, "12345");
            assert_eq!(config.conversation.bot_context, "42");
            assert_eq!(config.ollama.model, "true");
            Ok(())
        });
    }

    #[test]
    fn unparseable_history_limit_is_a_config_error() {
        Jail::expect_with(|jail| {
            jail.set_env("DISCORD_TOKEN", "t");
            jail.set_env("HISTORY_LIMIT", "lots");

            let err = RelayConfig::load(Some("none.toml")).unwrap_err();
            assert_eq!(err.code(), "CONFIG_ERROR");
            Ok(())
        });
    }

    #[test]
    fn missing_token_is_a_config_error() {
        Jail::expect_with(|_jail| {
            let err = RelayConfig::load(Some("missing.toml")).unwrap_err();
            assert_eq!(err.code(), "CONFIG_ERROR");
            Ok(())
        });
    }
}
