#[cfg(test)]
#[path = "gateway_client_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use serde_derive::Deserialize;
use serde_json::json;
use tokio::time;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::fragment_channel;
use crate::domain::models::CodePilotError;
use crate::domain::models::FragmentStream;
use crate::domain::models::GenerationRequest;
use crate::domain::models::GenerationResult;
use crate::domain::models::GenerationSource;
use crate::domain::models::ImprovementRequest;
use crate::domain::models::PromptSuggestions;

const GENERATE_STREAM_PATH: &str = "/api/generate-code-stream";
const GENERATE_PATH: &str = "/api/generate-code";
const SUGGEST_PATH: &str = "/api/suggest-prompt-improvements";
const MODEL_ERROR_PREFIX: &str = "Failed to generate code: ";

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Decodes a byte stream as UTF-8 without splitting a character across
/// chunks. Invalid sequences become U+FFFD.
#[derive(Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn push(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut text = "".to_string();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(decoded) => {
                    text.push_str(decoded);
                    self.pending.clear();
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match err.error_len() {
                        // Incomplete trailing character, wait for more bytes.
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }

        return text;
    }

    /// Bytes held back waiting for the rest of a character.
    pub fn pending_len(&self) -> usize {
        return self.pending.len();
    }
}

/// Reaches a gateway served by `codepilot serve` over HTTP.
pub struct GatewayClient {
    url: String,
    timeout: Duration,
}

impl Default for GatewayClient {
    fn default() -> GatewayClient {
        return GatewayClient::new(
            &Config::get(ConfigKey::ServerURL),
            Duration::from_millis(Config::get_u64(ConfigKey::GenerationTimeout)),
        );
    }
}

impl GatewayClient {
    pub fn new(url: &str, timeout: Duration) -> GatewayClient {
        return GatewayClient {
            url: url.trim_end_matches('/').to_string(),
            timeout,
        };
    }

    pub async fn health_check(&self) -> Result<()> {
        let res = reqwest::Client::new()
            .get(&self.url)
            .timeout(Duration::from_millis(Config::get_u64(
                ConfigKey::BackendHealthCheckTimeout,
            )))
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(error = ?err, url = self.url, "CodePilot server is not reachable");
                bail!(format!("CodePilot server at {} is not reachable", self.url));
            }
        };

        if !res.status().is_success() {
            tracing::error!(status = res.status().as_u16(), "CodePilot server health check failed");
            bail!("CodePilot server health check failed");
        }

        return Ok(());
    }

    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, CodePilotError> {
        let req = reqwest::Client::new()
            .post(format!("{url}{path}", url = self.url))
            .json(&body)
            .send();

        let res = match time::timeout(self.timeout, req).await {
            Ok(Ok(res)) => res,
            Ok(Err(err)) => {
                tracing::error!(error = ?err, path = path, "Request to CodePilot server failed");
                return Err(CodePilotError::ModelInvocation(err.to_string()));
            }
            Err(_) => {
                return Err(CodePilotError::ModelInvocation(format!(
                    "timed out after {}ms",
                    self.timeout.as_millis()
                )));
            }
        };

        if !res.status().is_success() {
            return Err(GatewayClient::error_from(res).await);
        }

        return Ok(res);
    }

    /// Maps an error response back onto the failure the server reported.
    async fn error_from(res: reqwest::Response) -> CodePilotError {
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(parsed) => parsed.error,
            Err(_) => format!("server responded with status {status}"),
        };
        tracing::error!(status = status, message = message, "CodePilot server returned an error");

        if status == 502 {
            return CodePilotError::EmptyOutput;
        }
        if (400..500).contains(&status) {
            return CodePilotError::Validation(message);
        }

        let message = message
            .strip_prefix(MODEL_ERROR_PREFIX)
            .unwrap_or(&message)
            .to_string();
        return CodePilotError::ModelInvocation(message);
    }
}

#[async_trait]
impl GenerationSource for GatewayClient {
    #[allow(clippy::implicit_return)]
    async fn open_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<FragmentStream, CodePilotError> {
        let res = self
            .post(
                GENERATE_STREAM_PATH,
                json!({ "prompt": request.prompt, "language": request.language }),
            )
            .await?;

        let (tx, stream) = fragment_channel();
        let worker = tokio::spawn(async move {
            let mut body = res.bytes_stream();
            let mut decoder = Utf8Decoder::default();

            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        tracing::error!(error = ?err, "Code stream body failed");
                        tx.fail(CodePilotError::StreamTruncation(err.to_string()));
                        return;
                    }
                };

                if tx.send(&decoder.push(&chunk)).is_err() {
                    return;
                }
            }

            if decoder.pending_len() > 0 {
                tx.fail(CodePilotError::StreamTruncation(
                    "the stream ended inside a UTF-8 character".to_string(),
                ));
                return;
            }

            tx.finish();
        });

        return Ok(stream
            .with_worker(worker.abort_handle())
            .with_idle_timeout(self.timeout));
    }

    #[allow(clippy::implicit_return)]
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, CodePilotError> {
        let res = self
            .post(
                GENERATE_PATH,
                json!({ "prompt": request.prompt, "language": request.language }),
            )
            .await?;

        let result = res.json::<GenerationResult>().await.map_err(|err| {
            return CodePilotError::ModelInvocation(err.to_string());
        })?;
        if result.is_empty() {
            return Err(CodePilotError::EmptyOutput);
        }

        return Ok(result);
    }

    #[allow(clippy::implicit_return)]
    async fn suggest_improvements(
        &self,
        request: &ImprovementRequest,
    ) -> Result<Vec<String>, CodePilotError> {
        let res = self.post(SUGGEST_PATH, json!(request)).await?;

        let suggestions = res.json::<PromptSuggestions>().await.map_err(|err| {
            return CodePilotError::ModelInvocation(err.to_string());
        })?;

        return Ok(suggestions.suggested_improvements);
    }
}
