#[cfg(test)]
#[path = "gemini_test.rs"]
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

const DEFAULT_MODEL: &str = "gemini-2.0-flash";

fn convert_err(err: reqwest::Error) -> std::io::Error {
    let err_msg = err.to_string();
    return std::io::Error::new(std::io::ErrorKind::Interrupted, err_msg);
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    finish_reason: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl CompletionResponse {
    fn text(&self) -> String {
        return self
            .candidates
            .iter()
            .flat_map(|candidate| {
                return candidate.content.parts.iter();
            })
            .map(|part| {
                return part.text.as_str();
            })
            .collect::<Vec<&str>>()
            .join("");
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ErrorDetails {
    message: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ErrorResponse {
    error: ErrorDetails,
}

pub struct Gemini {
    url: String,
    token: String,
    model: String,
    timeout: String,
}

impl Default for Gemini {
    fn default() -> Gemini {
        let mut model = Config::get(ConfigKey::Model);
        if model.is_empty() {
            model = DEFAULT_MODEL.to_string();
        }

        return Gemini {
            url: Config::get(ConfigKey::GeminiURL),
            token: Config::get(ConfigKey::GeminiToken),
            model,
            timeout: Config::get(ConfigKey::BackendHealthCheckTimeout),
        };
    }
}

impl Gemini {
    fn endpoint(&self, method: &str, query: &str) -> String {
        return format!(
            "{url}/v1beta/models/{model}:{method}?{query}key={key}",
            url = self.url,
            model = self.model,
            key = self.token,
        );
    }

    fn request(prompt: BackendPrompt, json: bool) -> CompletionRequest {
        let generation_config = if json {
            Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
            })
        } else {
            None
        };

        return CompletionRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part { text: prompt.text }],
            }],
            generation_config,
        };
    }

    async fn send(&self, url: String, req: &CompletionRequest) -> Result<reqwest::Response> {
        let res = reqwest::Client::new().post(url).json(req).send().await?;

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
                "Failed to make completion request to Gemini"
            );
            bail!(format!("Gemini request failed: {message}"));
        }

        return Ok(res);
    }
}

#[async_trait]
impl Backend for Gemini {
    fn name(&self) -> BackendName {
        return BackendName::Gemini;
    }

    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        if self.url.is_empty() {
            bail!("Gemini URL is not defined");
        }
        if self.token.is_empty() {
            bail!("Gemini token is not defined");
        }

        let url = format!(
            "{url}/v1beta/models/{model}?key={key}",
            url = self.url,
            model = self.model,
            key = self.token
        );

        let res = reqwest::Client::new()
            .get(&url)
            .timeout(Duration::from_millis(self.timeout.parse::<u64>()?))
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(error = ?err, "Gemini is not reachable");
                bail!("Gemini is not reachable");
            }
        };

        let status = res.status().as_u16();
        if status >= 400 {
            tracing::error!(status = status, "Gemini health check failed");
            bail!("Gemini health check failed");
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn get_json_completion(&self, prompt: BackendPrompt) -> Result<String> {
        let req = Gemini::request(prompt, true);
        let res = self
            .send(self.endpoint("generateContent", ""), &req)
            .await?
            .json::<CompletionResponse>()
            .await?;

        tracing::debug!(body = ?res, "Completion response");
        return Ok(res.text());
    }

    #[allow(clippy::implicit_return)]
    async fn get_completion<'a>(
        &self,
        prompt: BackendPrompt,
        tx: &'a FragmentSender,
    ) -> Result<()> {
        let req = Gemini::request(prompt, false);
        let res = self
            .send(self.endpoint("streamGenerateContent", "alt=sse&"), &req)
            .await?;

        let stream = res.bytes_stream().map_err(convert_err);
        let mut lines_reader = StreamReader::new(stream).lines();

        let mut finished = false;
        while let Some(line) = lines_reader.next_line().await? {
            let cleaned_line = line.trim();
            let Some(data) = cleaned_line.strip_prefix("data:") else {
                continue;
            };

            let ores: CompletionResponse = serde_json::from_str(data.trim())?;
            tx.send(&ores.text())?;

            if ores.candidates.iter().any(|candidate| {
                return candidate.finish_reason.is_some();
            }) {
                finished = true;
                break;
            }
        }

        if !finished {
            bail!("Gemini stream ended before completion");
        }

        return Ok(());
    }
}
