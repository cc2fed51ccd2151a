use std::sync::Arc;

use async_trait::async_trait;

use super::CodePilotError;
use super::FragmentStream;
use super::GenerationRequest;
use super::GenerationResult;
use super::ImprovementRequest;

/// Anything able to serve a generation request: the in-process gateway or a
/// remote gateway reached over HTTP.
#[async_trait]
pub trait GenerationSource {
    /// Opens a fragment sequence for the request.
    async fn open_stream(&self, request: &GenerationRequest)
        -> Result<FragmentStream, CodePilotError>;

    /// Generates the whole result in one reply.
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GenerationResult, CodePilotError>;

    async fn suggest_improvements(
        &self,
        request: &ImprovementRequest,
    ) -> Result<Vec<String>, CodePilotError>;
}

pub type SourceBox = Arc<dyn GenerationSource + Send + Sync>;
