#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use serde::Deserialize;
use serde::Serialize;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Backend;
use crate::domain::models::BackendName;
use crate::domain::models::BackendPrompt;
use crate::domain::models::FragmentSender;

const DEFAULT_MODEL: &str = "gpt-4o-mini";

fn convert_err(err: reqwest::Error) -> std::io::Error {
    let err_msg = err.to_string();
    return std::io::Error::new(std::io::ErrorKind::Interrupted, err_msg);
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct MessageRequest {
    role: String,
    content: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<MessageRequest>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CompletionDeltaResponse {
    content: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CompletionChoiceResponse {
    delta: CompletionDeltaResponse,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoiceResponse>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct JsonChoiceResponse {
    message: MessageResponse,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct JsonCompletionResponse {
    choices: Vec<JsonChoiceResponse>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ErrorDetails {
    message: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ErrorResponse {
    error: ErrorDetails,
}

pub struct OpenAI {
    url: String,
    token: String,
    model: String,
    timeout: String,
}

impl Default for OpenAI {
    fn default() -> OpenAI {
        let mut model = Config::get(ConfigKey::Model);
        if model.is_empty() {
            model = DEFAULT_MODEL.to_string();
        }

        return OpenAI {
            url: Config::get(ConfigKey::OpenaiURL),
            token: Config::get(ConfigKey::OpenaiToken),
            model,
            timeout: Config::get(ConfigKey::BackendHealthCheckTimeout),
        };
    }
}

impl OpenAI {
    async fn send(&self, prompt: BackendPrompt, json: bool) -> Result<reqwest::Response> {
        let response_format = if json {
            Some(ResponseFormat {
                format_type: "json_object".to_string(),
            })
        } else {
            None
        };

        let req = CompletionRequest {
            model: self.model.to_string(),
            messages: vec![MessageRequest {
                role: "user".to_string(),
                content: prompt.text,
            }],
            stream: !json,
            response_format,
        };

        let res = reqwest::Client::new()
            .post(format!("{url}/v1/chat/completions", url = self.url))
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&req)
            .send()
            .await?;

        let status = res.status().as_u16();
        if !res.status().is_success() {
            let body = res.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(parsed) => parsed.error.message,
                Err(_) => format!("status {status}"),
            };
            tracing::error!(
                status = status,
                message = message,
                "Failed to make completion request to OpenAI"
            );
            bail!(format!("OpenAI request failed: {message}"));
        }

        return Ok(res);
    }
}

#[async_trait]
impl Backend for OpenAI {
    fn name(&self) -> BackendName {
        return BackendName::OpenAI;
    }

    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        if self.url.is_empty() {
            bail!("OpenAI URL is not defined");
        }
        if self.token.is_empty() {
            bail!("OpenAI token is not defined");
        }

        // The official API answers its index with a 404 or a 418, so it isn't
        // probed.
        if self.url == "https://api.openai.com" {
            return Ok(());
        }

        let res = reqwest::Client::new()
            .get(&self.url)
            .timeout(Duration::from_millis(self.timeout.parse::<u64>()?))
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(error = ?err, "OpenAI is not reachable");
                bail!("OpenAI is not reachable");
            }
        };

        let status = res.status().as_u16();
        if status >= 400 {
            tracing::error!(status = status, "OpenAI health check failed");
            bail!("OpenAI health check failed");
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn get_json_completion(&self, prompt: BackendPrompt) -> Result<String> {
        let res = self
            .send(prompt, true)
            .await?
            .json::<JsonCompletionResponse>()
            .await?;

        tracing::debug!(body = ?res, "Completion response");
        let text = res
            .choices
            .into_iter()
            .next()
            .and_then(|choice| {
                return choice.message.content;
            })
            .unwrap_or_default();

        return Ok(text);
    }

    #[allow(clippy::implicit_return)]
    async fn get_completion<'a>(
        &self,
        prompt: BackendPrompt,
        tx: &'a FragmentSender,
    ) -> Result<()> {
        let res = self.send(prompt, false).await?;

        let stream = res.bytes_stream().map_err(convert_err);
        let mut lines_reader = StreamReader::new(stream).lines();

        let mut finished = false;
        while let Some(line) = lines_reader.next_line().await? {
            let mut cleaned_line = line.trim();
            if let Some(data) = cleaned_line.strip_prefix("data:") {
                cleaned_line = data.trim();
            }
            if cleaned_line.is_empty() {
                continue;
            }
            if cleaned_line == "[DONE]" {
                finished = true;
                break;
            }

            let ores: CompletionResponse = serde_json::from_str(cleaned_line)?;
            tracing::debug!(body = ?ores, "Completion response");

            for choice in ores.choices {
                if let Some(text) = choice.delta.content {
                    tx.send(&text)?;
                }
            }
        }

        if !finished {
            bail!("OpenAI stream ended before completion");
        }

        return Ok(());
    }
}
