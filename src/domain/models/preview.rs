use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::Language;

/// One-shot hand-off of a result to the preview surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewPayload {
    pub code: String,
    pub language: Language,
}
