// src/review/openai.rs
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::review::{BackendError, GenerationBackend};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI Chat Completions backend. Requires an API key; the model id is
/// caller-supplied configuration.
pub struct OpenAiBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(anyhow!("OPENAI_API_KEY is not set"));
        }
        let http = reqwest::Client::builder()
            .user_agent("ai-review-updater/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()
            .context("building http client")?;
        Ok(Self {
            http,
            api_key,
            model,
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}
#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
}
#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}
#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}
#[derive(Deserialize)]
struct ChoiceMsg {
    content: String,
}

fn retry_after_hint(resp: &reqwest::Response) -> Option<Duration> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: 0.7,
        };

        let resp = self
            .http
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("sending chat completion request")?;

        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = retry_after_hint(&resp);
            return Err(BackendError::RateLimited { retry_after });
        }
        if !resp.status().is_success() {
            return Err(BackendError::Fatal(anyhow!(
                "chat completion returned {}",
                resp.status()
            )));
        }

        let body: Resp = resp
            .json()
            .await
            .context("decoding chat completion response")?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.trim())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(BackendError::Fatal(anyhow!("empty completion")));
        }
        Ok(content.to_string())
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
