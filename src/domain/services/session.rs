#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::HistoryStore;
use super::PreviewHandoff;
use super::StreamAccumulator;
use crate::domain::models::CodePilotError;
use crate::domain::models::Event;
use crate::domain::models::GenerationRequest;
use crate::domain::models::GenerationSource;
use crate::domain::models::HistoryItem;
use crate::domain::models::ImprovementRequest;
use crate::domain::models::Language;
use crate::domain::models::PreviewPayload;
use crate::domain::models::SessionState;
use crate::domain::models::SessionView;
use crate::domain::models::Settlement;
use crate::domain::models::SourceBox;
use crate::domain::models::Toast;
use crate::domain::models::ViewUpdate;

/// Sole writer of session state. Drives one generation at a time, publishes
/// every change to its view and records successful results in history.
///
/// Generation workers report back through the event channel handed out by
/// `new`; the owner feeds those events into `handle_event`.
pub struct SessionController<V: SessionView> {
    source: SourceBox,
    history: HistoryStore,
    handoff: PreviewHandoff,
    accumulator: StreamAccumulator,
    view: V,
    events_tx: mpsc::UnboundedSender<Event>,
    worker: Option<JoinHandle<()>>,
    request: Option<GenerationRequest>,
    code: String,
    prompt: String,
    pub language: Language,
}

impl<V: SessionView> SessionController<V> {
    pub fn new(
        source: SourceBox,
        history: HistoryStore,
        handoff: PreviewHandoff,
        view: V,
    ) -> (SessionController<V>, mpsc::UnboundedReceiver<Event>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel::<Event>();
        let controller = SessionController {
            source,
            history,
            handoff,
            accumulator: StreamAccumulator::default(),
            view,
            events_tx,
            worker: None,
            request: None,
            code: "".to_string(),
            prompt: "".to_string(),
            language: Language::default(),
        };

        return (controller, events_rx);
    }

    pub fn state(&self) -> &SessionState {
        return self.accumulator.state();
    }

    pub fn is_active(&self) -> bool {
        return self.accumulator.is_active();
    }

    /// The code currently on display.
    pub fn code(&self) -> &str {
        return &self.code;
    }

    /// The prompt that produced the code on display.
    pub fn prompt(&self) -> &str {
        return &self.prompt;
    }

    pub fn history(&self) -> &HistoryStore {
        return &self.history;
    }

    #[cfg(test)]
    pub fn view(&self) -> &V {
        return &self.view;
    }

    fn notify(&mut self, toast: Toast) {
        self.view.update(ViewUpdate::Notice(toast));
    }

    /// Validates before anything else. An invalid request leaves the session
    /// untouched.
    fn validate(
        &mut self,
        prompt: &str,
        language: &str,
    ) -> Result<GenerationRequest, CodePilotError> {
        match GenerationRequest::new(prompt, language) {
            Ok(request) => return Ok(request),
            Err(err) => {
                tracing::debug!(error = ?err, "Rejected generation request");
                self.notify(Toast::from_error(&err));
                return Err(err);
            }
        }
    }

    fn stop_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }

    fn begin(&mut self, request: &GenerationRequest) -> u64 {
        self.stop_worker();
        let generation = self.accumulator.begin();
        self.code.clear();
        self.prompt = request.prompt.to_string();
        self.language = request.language;
        self.request = Some(request.clone());
        self.view.update(ViewUpdate::Busy(request.clone()));

        tracing::debug!(generation, language = %request.language, "Started generation");
        return generation;
    }

    /// Starts a streamed generation, superseding any active one. Returns the
    /// generation number the session's events are tagged with.
    pub fn submit(&mut self, prompt: &str, language: &str) -> Result<u64, CodePilotError> {
        let request = self.validate(prompt, language)?;
        let generation = self.begin(&request);

        let source = self.source.clone();
        let tx = self.events_tx.clone();
        self.worker = Some(tokio::spawn(async move {
            let mut stream = match source.open_stream(&request).await {
                Ok(stream) => stream,
                Err(err) => {
                    let _ = tx.send(Event::StreamFailed(generation, err));
                    return;
                }
            };

            while let Some(fragment) = stream.next().await {
                match fragment {
                    Ok(text) => {
                        if tx.send(Event::Fragment(generation, text)).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Event::StreamFailed(generation, err));
                        return;
                    }
                }
            }

            let _ = tx.send(Event::StreamDone(generation));
        }));

        return Ok(generation);
    }

    /// Generates without streaming. The result settles the session the same
    /// way a drained stream would.
    pub async fn generate_complete(
        &mut self,
        prompt: &str,
        language: &str,
    ) -> Result<Settlement, CodePilotError> {
        let request = self.validate(prompt, language)?;
        let generation = self.begin(&request);

        let settlement = match self.source.generate(&request).await {
            Ok(result) => {
                if self.accumulator.push(generation, &result.code) {
                    self.code = result.code.to_string();
                    self.view.update(ViewUpdate::Fragment(result.code));
                }
                self.accumulator.finish(generation)
            }
            Err(CodePilotError::EmptyOutput) => self.accumulator.finish(generation),
            Err(err) => self.accumulator.fail(generation, err),
        };

        let settlement = settlement.unwrap_or_else(|| {
            return Settlement::Error(CodePilotError::ModelInvocation(
                "the session was superseded".to_string(),
            ));
        });
        self.settle(settlement.clone()).await;

        return Ok(settlement);
    }

    /// Applies one worker event. Events from superseded sessions are dropped.
    /// Returns the settlement once the active session has settled.
    pub async fn handle_event(&mut self, event: Event) -> Option<Settlement> {
        let generation = event.generation();
        let settlement = match event {
            Event::Fragment(generation, text) => {
                if self.accumulator.push(generation, &text) {
                    self.code += &text;
                    self.view.update(ViewUpdate::Fragment(text));
                } else {
                    tracing::debug!(generation, "Dropped stale fragment");
                }
                return None;
            }
            Event::StreamDone(generation) => self.accumulator.finish(generation),
            Event::StreamFailed(generation, err) => self.accumulator.fail(generation, err),
        };

        let Some(settlement) = settlement else {
            tracing::debug!(generation, "Dropped stale terminal event");
            return None;
        };

        self.settle(settlement.clone()).await;
        return Some(settlement);
    }

    async fn settle(&mut self, settlement: Settlement) {
        self.worker = None;
        let request = self.request.take();

        match &settlement {
            Settlement::Success(result) => {
                if let Some(request) = request {
                    if let Err(err) = self
                        .history
                        .append(&request.prompt, request.language, &result.code)
                        .await
                    {
                        tracing::error!(error = ?err, "Failed to save history");
                    }
                }
                self.view.update(ViewUpdate::Settled(settlement.clone()));
                self.notify(Toast::new("Success", "Code generated successfully!"));
            }
            Settlement::Empty => {
                self.view.update(ViewUpdate::Settled(settlement.clone()));
                self.notify(Toast::from_error(&CodePilotError::EmptyOutput));
            }
            Settlement::Error(err) => {
                tracing::error!(error = ?err, "Generation failed");
                self.code.clear();
                self.view.update(ViewUpdate::Cleared());
                self.view.update(ViewUpdate::Settled(settlement.clone()));
                self.notify(Toast::from_error(err));
            }
        }
    }

    /// Pumps worker events until the active session settles. Returns `None`
    /// straight away when nothing is running.
    pub async fn run_until_settled(
        &mut self,
        events_rx: &mut mpsc::UnboundedReceiver<Event>,
    ) -> Option<Settlement> {
        while self.is_active() {
            let event = events_rx.recv().await?;
            if let Some(settlement) = self.handle_event(event).await {
                return Some(settlement);
            }
        }

        return None;
    }

    /// Cancels the active session. Partial output is discarded.
    pub fn abort(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }

        self.stop_worker();
        self.accumulator.abandon();
        self.request = None;
        self.code.clear();
        self.view.update(ViewUpdate::Cleared());
        self.notify(Toast::new("Cancelled", "Code generation was cancelled."));

        return true;
    }

    /// Restores a history item into the session without contacting the
    /// model.
    pub fn load_history_item(&mut self, id: &str) -> Result<HistoryItem, CodePilotError> {
        let item = match self.history.get(id) {
            Ok(item) => item.clone(),
            Err(err) => {
                self.notify(Toast::from_error(&err));
                return Err(err);
            }
        };

        self.stop_worker();
        self.accumulator.abandon();
        self.request = None;
        self.language = item.language;
        self.prompt = item.prompt.to_string();
        self.code = item.code.to_string();
        self.view.update(ViewUpdate::Loaded(item.code.to_string()));
        self.notify(Toast::new(
            "History Loaded",
            "Loaded the selected generation from history.",
        ));

        return Ok(item);
    }

    pub async fn clear_history(&mut self) -> Result<()> {
        self.history.clear().await?;
        self.notify(Toast::new("History Cleared", "All history items have been removed."));

        return Ok(());
    }

    /// Hands the code on display to the preview surface. Fails without
    /// writing anything when there is no code or the language can't be
    /// previewed.
    pub async fn open_preview(&mut self) -> Result<PreviewPayload> {
        if self.code.trim().is_empty() {
            let err = CodePilotError::Validation("There is no code to preview.".to_string());
            self.notify(Toast::from_error(&err));
            return Err(err.into());
        }
        if !self.language.is_previewable() {
            let err = CodePilotError::UnsupportedLanguageForPreview(
                self.language.to_string().to_uppercase(),
            );
            self.notify(Toast::from_error(&err));
            return Err(err.into());
        }

        let payload = PreviewPayload {
            code: self.code.to_string(),
            language: self.language,
        };
        self.handoff.write(&payload).await?;

        return Ok(payload);
    }

    /// Asks the model how the prompt behind the code on display could be
    /// improved, given the user's feedback on that code.
    pub async fn suggest_improvements(
        &mut self,
        feedback: &str,
    ) -> Result<Vec<String>, CodePilotError> {
        if self.code.trim().is_empty() {
            let err = CodePilotError::Validation(
                "Generate some code before asking for improvements.".to_string(),
            );
            self.notify(Toast::from_error(&err));
            return Err(err);
        }

        let request = match ImprovementRequest::new(&self.prompt, &self.code, feedback) {
            Ok(request) => request,
            Err(err) => {
                self.notify(Toast::from_error(&err));
                return Err(err);
            }
        };

        let res = self.source.suggest_improvements(&request).await;
        if let Err(err) = &res {
            self.notify(Toast::from_error(err));
        }

        return res;
    }
}

impl<V: SessionView> Drop for SessionController<V> {
    fn drop(&mut self) {
        self.stop_worker();
    }
}
