use super::CodePilotError;
use super::GenerationRequest;
use super::GenerationResult;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Settlement {
    Success(GenerationResult),
    Empty,
    Error(CodePilotError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Requesting,
    Streaming,
    Settled(Settlement),
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        return matches!(self, SessionState::Requesting | SessionState::Streaming);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Normal,
    Error,
}

/// A short user facing notice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub title: String,
    pub description: String,
}

impl Toast {
    pub fn new(title: &str, description: &str) -> Toast {
        return Toast {
            kind: ToastKind::Normal,
            title: title.to_string(),
            description: description.to_string(),
        };
    }

    pub fn error(title: &str, description: &str) -> Toast {
        return Toast {
            kind: ToastKind::Error,
            title: title.to_string(),
            description: description.to_string(),
        };
    }

    pub fn from_error(err: &CodePilotError) -> Toast {
        return Toast::error(err.title(), &err.to_string());
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewUpdate {
    Busy(GenerationRequest),
    Fragment(String),
    Cleared(),
    Settled(Settlement),
    Loaded(String),
    Notice(Toast),
}

/// Where a session publishes its display state.
pub trait SessionView {
    fn update(&mut self, update: ViewUpdate);
}
