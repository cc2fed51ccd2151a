use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::Backend;
use crate::domain::models::BackendName;
use crate::domain::models::BackendPrompt;
use crate::domain::models::CodePilotError;
use crate::domain::models::FragmentSender;
use crate::domain::models::FragmentStream;
use crate::domain::models::SessionView;
use crate::domain::models::ViewUpdate;

/// Backend replaying a fixed script, for exercising everything above the
/// wire.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    pub fragments: Vec<String>,
    pub json: String,
    pub failure: Option<String>,
    pub stall: bool,
    pub delay: Duration,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedBackend {
    pub fn streaming(fragments: Vec<&str>) -> ScriptedBackend {
        return ScriptedBackend {
            fragments: fragments.iter().map(|e| return e.to_string()).collect(),
            ..ScriptedBackend::default()
        };
    }

    pub fn replying(json: &str) -> ScriptedBackend {
        return ScriptedBackend {
            json: json.to_string(),
            ..ScriptedBackend::default()
        };
    }

    pub fn failing_after(fragments: Vec<&str>, failure: &str) -> ScriptedBackend {
        return ScriptedBackend {
            failure: Some(failure.to_string()),
            ..ScriptedBackend::streaming(fragments)
        };
    }

    pub fn with_delay(mut self, delay: Duration) -> ScriptedBackend {
        self.delay = delay;
        return self;
    }

    pub fn stalling(mut self) -> ScriptedBackend {
        self.stall = true;
        return self;
    }

    pub fn recorded_prompts(&self) -> Vec<String> {
        return self.prompts.lock().unwrap().clone();
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> BackendName {
        return BackendName::Gemini;
    }

    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn get_json_completion(&self, prompt: BackendPrompt) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.text);
        if self.stall {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if let Some(failure) = &self.failure {
            bail!(failure.to_string());
        }

        return Ok(self.json.to_string());
    }

    #[allow(clippy::implicit_return)]
    async fn get_completion<'a>(
        &self,
        prompt: BackendPrompt,
        tx: &'a FragmentSender,
    ) -> Result<()> {
        self.prompts.lock().unwrap().push(prompt.text);
        for fragment in &self.fragments {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            tx.send(fragment)?;
        }

        if self.stall {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if let Some(failure) = &self.failure {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            bail!(failure.to_string());
        }

        return Ok(());
    }
}

/// View keeping every update it was sent.
#[derive(Clone, Default)]
pub struct RecordingView {
    updates: Arc<Mutex<Vec<ViewUpdate>>>,
}

impl RecordingView {
    pub fn updates(&self) -> Vec<ViewUpdate> {
        return self.updates.lock().unwrap().clone();
    }

    pub fn toast_titles(&self) -> Vec<String> {
        return self
            .updates()
            .iter()
            .filter_map(|update| {
                if let ViewUpdate::Notice(toast) = update {
                    return Some(toast.title.to_string());
                }
                return None;
            })
            .collect();
    }
}

impl SessionView for RecordingView {
    fn update(&mut self, update: ViewUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}

/// Drains a fragment sequence into one buffer.
pub async fn collect_code(mut stream: FragmentStream) -> Result<String, CodePilotError> {
    let mut code = "".to_string();
    while let Some(fragment) = stream.next().await {
        code += &fragment?;
    }

    return Ok(code);
}
