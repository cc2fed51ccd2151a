#[cfg(test)]
#[path = "fragment_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time;

use super::CodePilotError;

#[derive(Debug)]
pub enum StreamSignal {
    Fragment(String),
    Done(),
    Failed(CodePilotError),
}

/// Producer half of a fragment sequence. Terminal signals consume the sender,
/// so a sequence can complete or fail at most once.
pub struct FragmentSender {
    tx: mpsc::UnboundedSender<StreamSignal>,
}

impl FragmentSender {
    /// Forwards a fragment verbatim. Empty fragments are skipped. Fails when
    /// the consumer has gone away, which producers treat as a cue to stop.
    pub fn send(&self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        self.tx.send(StreamSignal::Fragment(text.to_string()))?;
        return Ok(());
    }

    pub fn finish(self) {
        let _ = self.tx.send(StreamSignal::Done());
    }

    pub fn fail(self, err: CodePilotError) {
        let _ = self.tx.send(StreamSignal::Failed(err));
    }
}

/// Consumer half of a fragment sequence, read through `next()`:
///
/// - `Some(Ok(fragment))` for every fragment, in arrival order.
/// - `Some(Err(err))` exactly once when the sequence fails.
/// - `None` once it has ended, cleanly or not.
///
/// A producer that disappears without calling `finish` is reported as a
/// truncation rather than a clean end.
pub struct FragmentStream {
    rx: mpsc::UnboundedReceiver<StreamSignal>,
    finished: bool,
    idle_timeout: Option<Duration>,
    worker: Option<AbortHandle>,
}

pub fn fragment_channel() -> (FragmentSender, FragmentStream) {
    let (tx, rx) = mpsc::unbounded_channel::<StreamSignal>();
    let stream = FragmentStream {
        rx,
        finished: false,
        idle_timeout: None,
        worker: None,
    };

    return (FragmentSender { tx }, stream);
}

impl FragmentStream {
    /// Bounds the wait for each individual fragment.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> FragmentStream {
        self.idle_timeout = Some(timeout);
        return self;
    }

    /// Ties the producing task to this stream: it is aborted once the stream
    /// fails, times out or is dropped.
    pub fn with_worker(mut self, worker: AbortHandle) -> FragmentStream {
        self.worker = Some(worker);
        return self;
    }

    pub async fn next(&mut self) -> Option<Result<String, CodePilotError>> {
        if self.finished {
            return None;
        }

        let signal = match self.idle_timeout {
            Some(timeout) => match time::timeout(timeout, self.rx.recv()).await {
                Ok(signal) => signal,
                Err(_) => {
                    tracing::warn!(timeout_ms = timeout.as_millis(), "Fragment stream timed out");
                    return self.terminate(CodePilotError::ModelInvocation(format!(
                        "timed out after waiting {}ms for the model",
                        timeout.as_millis()
                    )));
                }
            },
            None => self.rx.recv().await,
        };

        match signal {
            Some(StreamSignal::Fragment(text)) => return Some(Ok(text)),
            Some(StreamSignal::Done()) => {
                self.finished = true;
                return None;
            }
            Some(StreamSignal::Failed(err)) => return self.terminate(err),
            None => {
                return self.terminate(CodePilotError::StreamTruncation(
                    "the producer stopped without completing".to_string(),
                ));
            }
        }
    }

    fn terminate(&mut self, err: CodePilotError) -> Option<Result<String, CodePilotError>> {
        self.finished = true;
        self.rx.close();
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }

        return Some(Err(err));
    }
}

impl Drop for FragmentStream {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}
