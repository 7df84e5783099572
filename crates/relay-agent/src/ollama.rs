use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use relay_core::config::OllamaConfig;

use crate::provider::{InferenceClient, InferenceError};

/// Client for Ollama's non-streaming `/api/generate` route.
pub struct OllamaClient {
    client: reqwest::Client,
    /// Full generate URL, already normalized.
    url: String,
}

impl OllamaClient {
    /// `generate_url` must already end with `/api/generate`;
    /// see [`relay_core::config::normalize_generate_url`].
    pub fn new(generate_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: generate_url.into(),
        }
    }

    pub fn from_config(config: &OllamaConfig) -> Result<Self, InferenceError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
            url: config.generate_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl InferenceClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, InferenceError> {
        let body = GenerateBody {
            model,
            prompt,
            stream: false,
        };

        debug!(model = %model, prompt_len = prompt.len(), "sending request to Ollama");

        let resp = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    InferenceError::Unavailable(e.to_string())
                } else {
                    InferenceError::Http(e)
                }
            })?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Ollama API error");
            return Err(InferenceError::Api {
                status,
                message: text,
            });
        }

        let api_resp: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| InferenceError::Parse(e.to_string()))?;

        debug!(
            model = %api_resp.model,
            tokens_in = api_resp.prompt_eval_count.unwrap_or(0),
            tokens_out = api_resp.eval_count.unwrap_or(0),
            "received response from Ollama"
        );

        Ok(api_resp.response)
    }
}

// Ollama wire types (private)

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    model: String,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}
