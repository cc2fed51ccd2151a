#[cfg(test)]
#[path = "server_test.rs"]
mod tests;

use std::io;

use anyhow::Result;
use axum::body::Body;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use futures::stream;
use futures::StreamExt;
use serde_derive::Deserialize;
use serde_json::json;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;

use crate::domain::models::CodePilotError;
use crate::domain::models::FragmentStream;
use crate::domain::models::GenerationRequest;
use crate::domain::models::ImprovementRequest;
use crate::domain::models::PromptSuggestions;
use crate::domain::models::SourceBox;

pub const GENERATE_STREAM_PATH: &str = "/api/generate-code-stream";
pub const GENERATE_PATH: &str = "/api/generate-code";
pub const SUGGEST_PATH: &str = "/api/suggest-prompt-improvements";

#[derive(Deserialize)]
struct GenerateBody {
    prompt: Option<String>,
    language: Option<String>,
}

#[derive(Deserialize)]
struct SuggestBody {
    original_prompt: Option<String>,
    generated_code: Option<String>,
    user_feedback: Option<String>,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    return (status, Json(json!({ "error": message }))).into_response();
}

fn status_for(err: &CodePilotError) -> StatusCode {
    match err {
        CodePilotError::Validation(_) => return StatusCode::BAD_REQUEST,
        CodePilotError::EmptyOutput => return StatusCode::BAD_GATEWAY,
        _ => return StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn invalid_json() -> CodePilotError {
    return CodePilotError::Validation("Request body must be a JSON object.".to_string());
}

fn parse_generation_request(body: &[u8]) -> Result<GenerationRequest, CodePilotError> {
    let parsed = serde_json::from_slice::<GenerateBody>(body).map_err(|_| {
        return invalid_json();
    })?;

    let prompt = parsed.prompt.unwrap_or_default();
    let language = parsed.language.unwrap_or_default();
    if prompt.trim().is_empty() || language.trim().is_empty() {
        return Err(CodePilotError::Validation(
            "Prompt and language are required.".to_string(),
        ));
    }

    return GenerationRequest::new(&prompt, &language);
}

/// Remaining fragments as body chunks. A failure becomes a body error, which
/// aborts the response without a clean terminator.
fn body_stream(
    fragments: FragmentStream,
) -> impl futures::Stream<Item = Result<Bytes, io::Error>> + Send {
    return stream::unfold(fragments, |mut fragments| {
        return async move {
            let chunk = match fragments.next().await? {
                Ok(text) => Ok(Bytes::from(text)),
                Err(err) => {
                    tracing::error!(error = ?err, "Aborting code stream");
                    Err(io::Error::new(io::ErrorKind::Other, err.to_string()))
                }
            };

            return Some((chunk, fragments));
        };
    });
}

async fn generate_code_stream(State(source): State<SourceBox>, body: Bytes) -> Response {
    let request = match parse_generation_request(&body) {
        Ok(request) => request,
        Err(err) => return error_response(status_for(&err), &err.to_string()),
    };

    let mut fragments = match source.open_stream(&request).await {
        Ok(fragments) => fragments,
        Err(err) => {
            tracing::error!(error = ?err, "Failed to open code stream");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string());
        }
    };

    // Failures before the first byte can still be reported as a status.
    let body = match fragments.next().await {
        Some(Ok(first)) => {
            let first = stream::once(async move {
                return Ok::<Bytes, io::Error>(Bytes::from(first));
            });
            Body::from_stream(first.chain(body_stream(fragments)))
        }
        Some(Err(err)) => {
            tracing::error!(error = ?err, "Code stream failed before any output");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string());
        }
        None => Body::empty(),
    };

    return (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        body,
    )
        .into_response();
}

async fn generate_code(State(source): State<SourceBox>, body: Bytes) -> Response {
    let request = match parse_generation_request(&body) {
        Ok(request) => request,
        Err(err) => return error_response(status_for(&err), &err.to_string()),
    };

    match source.generate(&request).await {
        Ok(result) => return Json(result).into_response(),
        Err(err) => {
            tracing::error!(error = ?err, "Code generation failed");
            return error_response(status_for(&err), &err.to_string());
        }
    }
}

async fn suggest_prompt_improvements(State(source): State<SourceBox>, body: Bytes) -> Response {
    let parsed = match serde_json::from_slice::<SuggestBody>(&body) {
        Ok(parsed) => parsed,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, &invalid_json().to_string()),
    };

    let request = match ImprovementRequest::new(
        &parsed.original_prompt.unwrap_or_default(),
        &parsed.generated_code.unwrap_or_default(),
        &parsed.user_feedback.unwrap_or_default(),
    ) {
        Ok(request) => request,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    };

    match source.suggest_improvements(&request).await {
        Ok(suggested_improvements) => {
            return Json(PromptSuggestions {
                suggested_improvements,
            })
            .into_response();
        }
        Err(err) => {
            tracing::error!(error = ?err, "Prompt suggestions failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string());
        }
    }
}

async fn health() -> &'static str {
    return "ok";
}

pub fn router(source: SourceBox) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    return Router::new()
        .route("/", get(health))
        .route(GENERATE_STREAM_PATH, post(generate_code_stream))
        .route(GENERATE_PATH, post(generate_code))
        .route(SUGGEST_PATH, post(suggest_prompt_improvements))
        .layer(cors)
        .with_state(source);
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?err, "Failed to listen for shutdown signal");
    }
}

pub async fn start(source: SourceBox, address: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!(address = address, "Listening");
    println!("CodePilot listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(source))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    return Ok(());
}
