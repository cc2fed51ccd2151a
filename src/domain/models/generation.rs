#[cfg(test)]
#[path = "generation_test.rs"]
mod tests;

use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::CodePilotError;
use super::Language;

/// A validated request. The only way to build one is through
/// `GenerationRequest::new`, so holding a value means validation already ran.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub language: Language,
}

impl GenerationRequest {
    pub fn new(prompt: &str, language: &str) -> Result<GenerationRequest, CodePilotError> {
        if prompt.trim().is_empty() {
            return Err(CodePilotError::Validation(
                "Prompt cannot be empty.".to_string(),
            ));
        }
        if language.trim().is_empty() {
            return Err(CodePilotError::Validation(
                "Language must be selected.".to_string(),
            ));
        }

        let Some(parsed) = Language::parse(language) else {
            return Err(CodePilotError::Validation(format!(
                "Unsupported language: {language}"
            )));
        };

        return Ok(GenerationRequest {
            prompt: prompt.to_string(),
            language: parsed,
        });
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub code: String,
}

impl GenerationResult {
    pub fn is_empty(&self) -> bool {
        return self.code.trim().is_empty();
    }
}

/// Input for asking the model how a prompt could be improved, given what it
/// produced and what the user thought of it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImprovementRequest {
    pub original_prompt: String,
    pub generated_code: String,
    pub user_feedback: String,
}

impl ImprovementRequest {
    pub fn new(
        original_prompt: &str,
        generated_code: &str,
        user_feedback: &str,
    ) -> Result<ImprovementRequest, CodePilotError> {
        if original_prompt.trim().is_empty() {
            return Err(CodePilotError::Validation(
                "Original prompt cannot be empty.".to_string(),
            ));
        }
        if user_feedback.trim().is_empty() {
            return Err(CodePilotError::Validation(
                "Feedback cannot be empty.".to_string(),
            ));
        }

        return Ok(ImprovementRequest {
            original_prompt: original_prompt.to_string(),
            generated_code: generated_code.to_string(),
            user_feedback: user_feedback.to_string(),
        });
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSuggestions {
    pub suggested_improvements: Vec<String>,
}
