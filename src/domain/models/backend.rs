#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;

use anyhow::Result;
use async_trait::async_trait;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;

use super::FragmentSender;
use super::GenerationRequest;
use super::ImprovementRequest;

const PERSONA: &str =
    "You are an expert software developer who specializes in generating code snippets from user prompts.";

/// An instruction ready to send to a model backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendPrompt {
    pub text: String,
}

impl BackendPrompt {
    pub fn new(text: String) -> BackendPrompt {
        return BackendPrompt { text };
    }

    /// Template for the synchronous path, where the model answers with a
    /// single JSON object holding the code.
    pub fn complete_response(request: &GenerationRequest) -> BackendPrompt {
        let language = request.language;
        let prompt = &request.prompt;

        let text = format!(
            "{PERSONA}

Generate code based on the following prompt in the specified language. Return only the code and nothing else: no explanations, no commentary and no markdown code fences.
Respond with a single JSON object whose only field is \"code\", containing the code as a string.

Language: {language}
Prompt: {prompt}"
        );

        return BackendPrompt::new(text);
    }

    /// Template for the streaming path. Output is shown verbatim as it
    /// arrives, so anything other than code would leak into the result.
    pub fn raw_stream(request: &GenerationRequest) -> BackendPrompt {
        let language = request.language;
        let prompt = &request.prompt;

        let text = format!(
            "{PERSONA}

Generate code based on the following prompt in the specified language.
Return ONLY the raw code. Do not include any markdown formatting like ```{language} ... ``` or explanations.
Just the code itself.

Language: {language}
Prompt: {prompt}"
        );

        return BackendPrompt::new(text);
    }

    pub fn prompt_improvements(request: &ImprovementRequest) -> BackendPrompt {
        let text = format!(
            "You are an AI assistant designed to help users improve their code generation prompts.

Based on the original prompt, the generated code, and the user's feedback, suggest specific improvements to the prompt.
Focus on how to make the prompt clearer, more specific, or more effective in generating the desired code.
Respond with a single JSON object whose only field is \"suggested_improvements\", an array of strings.

Original Prompt: {original_prompt}
Generated Code: {generated_code}
User Feedback: {user_feedback}",
            original_prompt = request.original_prompt,
            generated_code = request.generated_code,
            user_feedback = request.user_feedback,
        );

        return BackendPrompt::new(text);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum BackendName {
    Gemini,
    Ollama,
    OpenAI,
}

impl BackendName {
    pub fn parse(text: String) -> Option<BackendName> {
        return BackendName::iter().find(|e| return e.to_string() == text);
    }
}

#[async_trait]
pub trait Backend {
    fn name(&self) -> BackendName;

    /// Used at startup to verify all configurations are available to work with
    /// the backend.
    async fn health_check(&self) -> Result<()>;

    /// Requests a single structured reply. The returned text is the raw JSON
    /// the model produced; shaping it is up to the caller.
    async fn get_json_completion(&self, prompt: BackendPrompt) -> Result<String>;

    /// Requests completions from the backend, pushing every text fragment
    /// through `tx` as it arrives. Returning `Ok` means the model finished;
    /// the caller is responsible for signalling completion or failure on the
    /// sender.
    async fn get_completion<'a>(&self, prompt: BackendPrompt, tx: &'a FragmentSender)
        -> Result<()>;
}

pub type BackendBox = Box<dyn Backend + Send + Sync>;
