pub mod gemini;
pub mod ollama;
pub mod openai;

use crate::domain::models::BackendBox;
use crate::domain::models::BackendName;

pub struct BackendManager {}

impl BackendManager {
    pub fn get(name: BackendName) -> BackendBox {
        match name {
            BackendName::Gemini => return Box::<gemini::Gemini>::default(),
            BackendName::Ollama => return Box::<ollama::Ollama>::default(),
            BackendName::OpenAI => return Box::<openai::OpenAI>::default(),
        }
    }
}
