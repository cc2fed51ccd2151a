#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_derive::Deserialize;
use tokio::time;

use crate::domain::models::Backend;
use crate::domain::models::BackendBox;
use crate::domain::models::BackendPrompt;
use crate::domain::models::fragment_channel;
use crate::domain::models::CodePilotError;
use crate::domain::models::FragmentStream;
use crate::domain::models::GenerationRequest;
use crate::domain::models::GenerationResult;
use crate::domain::models::GenerationSource;
use crate::domain::models::ImprovementRequest;
use crate::domain::models::PromptSuggestions;

#[derive(Deserialize)]
struct CompleteResponse {
    code: Option<String>,
}

/// Turns validated requests into model calls, either as a single structured
/// reply or as a raw fragment sequence.
pub struct Gateway {
    backend: Arc<dyn Backend + Send + Sync>,
    timeout: Duration,
}

impl Gateway {
    pub fn new(backend: BackendBox, timeout: Duration) -> Gateway {
        return Gateway {
            backend: Arc::from(backend),
            timeout,
        };
    }

    async fn json_completion(&self, prompt: BackendPrompt) -> Result<String, CodePilotError> {
        let res = time::timeout(self.timeout, self.backend.get_json_completion(prompt)).await;
        match res {
            Ok(Ok(text)) => return Ok(text),
            Ok(Err(err)) => {
                tracing::error!(backend = %self.backend.name(), error = ?err, "Model call failed");
                return Err(CodePilotError::ModelInvocation(err.to_string()));
            }
            Err(_) => {
                tracing::error!(
                    backend = %self.backend.name(),
                    timeout_ms = self.timeout.as_millis(),
                    "Model call timed out"
                );
                return Err(CodePilotError::ModelInvocation(format!(
                    "timed out after {}ms",
                    self.timeout.as_millis()
                )));
            }
        }
    }

    /// Single structured reply. A reply with no usable `code` field is
    /// reported as empty output, never as success.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, CodePilotError> {
        let text = self
            .json_completion(BackendPrompt::complete_response(request))
            .await?;

        let code = match serde_json::from_str::<CompleteResponse>(text.trim()) {
            Ok(res) => res.code.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = ?err, "Model reply is not the expected JSON object");
                "".to_string()
            }
        };

        let result = GenerationResult { code };
        if result.is_empty() {
            return Err(CodePilotError::EmptyOutput);
        }

        return Ok(result);
    }

    /// Raw fragment sequence. The model call runs on its own task, which is
    /// aborted when the returned stream fails, times out or is dropped.
    pub fn stream(&self, request: &GenerationRequest) -> FragmentStream {
        let (tx, stream) = fragment_channel();
        let backend = self.backend.clone();
        let prompt = BackendPrompt::raw_stream(request);

        let worker = tokio::spawn(async move {
            let res = backend.get_completion(prompt, &tx).await;
            match res {
                Ok(()) => tx.finish(),
                Err(err) => {
                    tracing::error!(backend = %backend.name(), error = ?err, "Model stream failed");
                    tx.fail(CodePilotError::ModelInvocation(err.to_string()));
                }
            }
        });

        return stream
            .with_worker(worker.abort_handle())
            .with_idle_timeout(self.timeout);
    }

    pub async fn suggest_improvements(
        &self,
        request: &ImprovementRequest,
    ) -> Result<Vec<String>, CodePilotError> {
        let text = self
            .json_completion(BackendPrompt::prompt_improvements(request))
            .await?;

        let suggestions = serde_json::from_str::<PromptSuggestions>(text.trim())
            .map_err(|err| {
                return CodePilotError::ModelInvocation(format!(
                    "unexpected suggestion format: {err}"
                ));
            })?
            .suggested_improvements
            .into_iter()
            .filter(|suggestion| return !suggestion.trim().is_empty())
            .collect::<Vec<String>>();

        return Ok(suggestions);
    }
}

#[async_trait]
impl GenerationSource for Gateway {
    #[allow(clippy::implicit_return)]
    async fn open_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<FragmentStream, CodePilotError> {
        return Ok(self.stream(request));
    }

    #[allow(clippy::implicit_return)]
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, CodePilotError> {
        return Gateway::generate(self, request).await;
    }

    #[allow(clippy::implicit_return)]
    async fn suggest_improvements(
        &self,
        request: &ImprovementRequest,
    ) -> Result<Vec<String>, CodePilotError> {
        return Gateway::suggest_improvements(self, request).await;
    }
}
