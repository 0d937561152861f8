#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;

use crate::backend::{ArcBackend, Backend};
use crate::config::{Profile, constants::DEFAULT_ENDPOINT, user_agent};
use crate::models::{BackendPrompt, BackendResponse, BackendUsage, PromptEntry, ResponseTx};
use async_trait::async_trait;
use eyre::{Context, Result, bail};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::{fmt::Display, time};
use thiserror::Error;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;

pub struct OpenAI {
    endpoint: String,
    api_key: Option<String>,
    timeout: Option<time::Duration>,
}

#[async_trait]
impl Backend for OpenAI {
    async fn get_completion(&self, prompt: BackendPrompt, response_tx: ResponseTx) -> Result<()> {
        if prompt.model().is_empty() {
            bail!("no model is set");
        }

        let completion_req = CompletionRequest {
            model: prompt.model().to_string(),
            messages: prompt.messages().to_vec(),
            stream: true,
            temperature: prompt.temperature(),
        };

        let mut req = reqwest::Client::new()
            .post(format!("{}/v1/chat/completions", self.endpoint))
            .header("Content-Type", "application/json")
            .header("User-Agent", user_agent());

        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        if let Some(token) = &self.api_key {
            req = req.bearer_auth(token);
        }

        log::trace!("Sending completion request: {:?}", completion_req);

        let res = req
            .json(&completion_req)
            .send()
            .await
            .wrap_err("sending completion request")?;

        if !res.status().is_success() {
            let http_code = res.status().as_u16();
            let resp = res.text().await.wrap_err("reading error response")?;
            log::error!("Error response: {}", resp);
            let mut err = match serde_json::from_str::<ErrorResponse>(&resp) {
                Ok(err) => err.error,
                Err(_) => OpenAIError {
                    message: resp,
                    ..Default::default()
                },
            };
            err.http_code = http_code;
            return Err(err.into());
        }

        let stream = res.bytes_stream().map_err(|e| {
            let err_msg = e.to_string();
            std::io::Error::new(std::io::ErrorKind::Interrupted, err_msg)
        });

        let mut line_readers = StreamReader::new(stream).lines();

        let mut message_id = String::new();
        let mut usage: Option<BackendUsage> = None;

        while let Some(line) = line_readers
            .next_line()
            .await
            .wrap_err("reading completion stream")?
        {
            let line = line.trim();
            log::trace!("streaming response: {}", line);
            let Some(data) = line.strip_prefix("data: ") else {
                continue;
            };

            if data == "[DONE]" {
                break;
            }

            let data = serde_json::from_str::<CompletionResponse>(data)
                .wrap_err(format!("parsing completion response line: {}", data))?;

            if message_id.is_empty() {
                message_id = data.id;
            }

            if let Some(usage_data) = data.usage {
                usage = Some(BackendUsage {
                    prompt_tokens: usage_data.prompt_tokens,
                    completion_tokens: usage_data.completion_tokens,
                    total_tokens: usage_data.total_tokens,
                });
            }

            let text = match data.choices.into_iter().next().and_then(|c| c.delta.content) {
                Some(text) => text,
                None => continue,
            };

            response_tx.send(BackendResponse {
                id: message_id.clone(),
                model: prompt.model().to_string(),
                text,
                done: false,
                usage: None,
            })?;
        }

        response_tx.send(BackendResponse {
            id: message_id,
            model: prompt.model().to_string(),
            text: String::new(),
            done: true,
            usage,
        })?;
        Ok(())
    }
}

impl From<OpenAI> for ArcBackend {
    fn from(value: OpenAI) -> Self {
        Arc::new(value)
    }
}

impl From<&Profile> for OpenAI {
    fn from(value: &Profile) -> Self {
        let mut openai = OpenAI::default();

        if let Some(base_url) = value.base_url.as_deref() {
            openai = openai.with_endpoint(base_url);
        }

        if let Some(api_key) = value.api_key.as_deref() {
            openai = openai.with_api_key(api_key);
        }

        if let Some(timeout) = value.timeout_secs {
            openai = openai.with_timeout(time::Duration::from_secs(timeout));
        }
        openai
    }
}

impl OpenAI {
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn timeout(&self) -> Option<time::Duration> {
        self.timeout
    }
}

impl Default for OpenAI {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            timeout: None,
        }
    }
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<PromptEntry>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct CompletionDeltaResponse {
    content: Option<String>,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct CompletionChoiceResponse {
    delta: CompletionDeltaResponse,
    finish_reason: Option<String>,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct CompletionResponse {
    id: String,
    choices: Vec<CompletionChoiceResponse>,
    usage: Option<CompletionUsageResponse>,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct CompletionUsageResponse {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct ErrorResponse {
    error: OpenAIError,
}

#[derive(Default, Error, Debug, Serialize, Deserialize)]
pub struct OpenAIError {
    #[serde(skip)]
    pub http_code: u16,
    pub message: String,
    #[serde(rename = "type", default)]
    pub err_type: String,
    pub param: Option<String>,
    pub code: Option<String>,
}

impl Display for OpenAIError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OpenAI error ({}): {}", self.http_code, self.message)
    }
}
