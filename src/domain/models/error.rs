/// Every failure a generation session can surface. None of these are fatal to
/// the session: callers recover to an empty or default state and report the
/// message.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum CodePilotError {
    #[error("{0}")]
    Validation(String),

    #[error("Failed to generate code: {0}")]
    ModelInvocation(String),

    #[error("The AI returned an empty response. Try a different prompt.")]
    EmptyOutput,

    #[error("The code stream ended before it completed: {0}")]
    StreamTruncation(String),

    #[error("Stored {slot} is malformed: {reason}")]
    PersistenceCorruption { slot: String, reason: String },

    #[error("Preview is not supported for {0}.")]
    UnsupportedLanguageForPreview(String),

    #[error("No history item found for id {0}")]
    HistoryItemNotFound(String),
}

impl CodePilotError {
    pub fn corrupt(slot: &str, reason: impl ToString) -> CodePilotError {
        return CodePilotError::PersistenceCorruption {
            slot: slot.to_string(),
            reason: reason.to_string(),
        };
    }

    /// A short title for toast style notices.
    pub fn title(&self) -> &'static str {
        match self {
            CodePilotError::Validation(_) => return "Validation Error",
            CodePilotError::EmptyOutput => return "Empty Response",
            CodePilotError::StreamTruncation(_) => return "Stream Interrupted",
            CodePilotError::PersistenceCorruption { .. } => return "Storage Error",
            CodePilotError::UnsupportedLanguageForPreview(_) => return "Cannot Preview",
            CodePilotError::HistoryItemNotFound(_) => return "Not Found",
            CodePilotError::ModelInvocation(_) => return "Error",
        }
    }
}
