use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use serde_json::Value;
use test_utils::add_function_fixture;
use test_utils::add_function_fragments;
use test_utils::add_function_prompt;

use super::router;
use super::GENERATE_PATH;
use super::GENERATE_STREAM_PATH;
use super::SUGGEST_PATH;
use crate::domain::services::Gateway;
use crate::domain::testing::ScriptedBackend;

async fn spawn_server(backend: ScriptedBackend) -> Result<String> {
    let gateway = Gateway::new(Box::new(backend), Duration::from_secs(2));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;

    tokio::spawn(async move {
        return axum::serve(listener, router(Arc::new(gateway))).await;
    });

    return Ok(format!("http://{address}"));
}

async fn post(url: &str, path: &str, body: Value) -> Result<reqwest::Response> {
    let res = reqwest::Client::new()
        .post(format!("{url}{path}"))
        .json(&body)
        .send()
        .await?;

    return Ok(res);
}

#[tokio::test]
async fn it_streams_raw_code_as_plain_text() -> Result<()> {
    let url = spawn_server(ScriptedBackend::streaming(add_function_fragments())).await?;

    let res = post(
        &url,
        GENERATE_STREAM_PATH,
        json!({ "prompt": add_function_prompt(), "language": "javascript" }),
    )
    .await?;

    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
    assert_eq!(res.headers()["x-content-type-options"], "nosniff");
    assert_eq!(res.text().await?, add_function_fixture());

    return Ok(());
}

#[tokio::test]
async fn it_rejects_invalid_requests() -> Result<()> {
    let url = spawn_server(ScriptedBackend::streaming(add_function_fragments())).await?;

    let cases = vec![
        (json!({ "prompt": "", "language": "javascript" }), "Prompt and language are required."),
        (json!({ "prompt": "   ", "language": "javascript" }), "Prompt and language are required."),
        (json!({ "prompt": "add" }), "Prompt and language are required."),
        (json!({ "prompt": "add", "language": "cobol" }), "Unsupported language: cobol"),
        (json!("add two numbers"), "Request body must be a JSON object."),
    ];

    for (body, message) in cases {
        let res = post(&url, GENERATE_STREAM_PATH, body).await?;
        assert_eq!(res.status(), 400);
        assert_eq!(res.json::<Value>().await?, json!({ "error": message }));
    }

    let res = reqwest::Client::new()
        .post(format!("{url}{GENERATE_STREAM_PATH}"))
        .body("{\"prompt\": ")
        .send()
        .await?;
    assert_eq!(res.status(), 400);

    return Ok(());
}

#[tokio::test]
async fn it_reports_failures_before_the_first_byte_as_500() -> Result<()> {
    let url = spawn_server(ScriptedBackend::failing_after(vec![], "quota exceeded")).await?;

    let res = post(
        &url,
        GENERATE_STREAM_PATH,
        json!({ "prompt": "add", "language": "javascript" }),
    )
    .await?;

    assert_eq!(res.status(), 500);
    assert_eq!(
        res.json::<Value>().await?,
        json!({ "error": "Failed to generate code: quota exceeded" })
    );

    return Ok(());
}

#[tokio::test]
async fn it_aborts_the_body_on_failures_after_the_first_byte() -> Result<()> {
    let url = spawn_server(ScriptedBackend::failing_after(
        vec!["function add(a"],
        "connection reset",
    )
    .with_delay(Duration::from_millis(100)))
    .await?;

    let res = post(
        &url,
        GENERATE_STREAM_PATH,
        json!({ "prompt": "add", "language": "javascript" }),
    )
    .await?;

    assert_eq!(res.status(), 200);
    assert!(res.bytes().await.is_err());

    return Ok(());
}

#[tokio::test]
async fn it_generates_complete_responses() -> Result<()> {
    let url = spawn_server(ScriptedBackend::replying(
        r#"{"code": "function add(a, b) {\n  return a + b;\n}"}"#,
    ))
    .await?;

    let res = post(
        &url,
        GENERATE_PATH,
        json!({ "prompt": add_function_prompt(), "language": "javascript" }),
    )
    .await?;

    assert_eq!(res.status(), 200);
    assert_eq!(
        res.json::<Value>().await?,
        json!({ "code": add_function_fixture() })
    );

    return Ok(());
}

#[tokio::test]
async fn it_maps_empty_complete_responses_to_502() -> Result<()> {
    let url = spawn_server(ScriptedBackend::replying(r#"{"code": ""}"#)).await?;

    let res = post(
        &url,
        GENERATE_PATH,
        json!({ "prompt": "add", "language": "javascript" }),
    )
    .await?;

    assert_eq!(res.status(), 502);
    assert_eq!(
        res.json::<Value>().await?,
        json!({ "error": "The AI returned an empty response. Try a different prompt." })
    );

    return Ok(());
}

#[tokio::test]
async fn it_suggests_prompt_improvements() -> Result<()> {
    let url = spawn_server(ScriptedBackend::replying(
        r#"{"suggested_improvements": ["Name the parameters."]}"#,
    ))
    .await?;

    let res = post(
        &url,
        SUGGEST_PATH,
        json!({
            "original_prompt": add_function_prompt(),
            "generated_code": add_function_fixture(),
            "user_feedback": "Use TypeScript types",
        }),
    )
    .await?;
    assert_eq!(res.status(), 200);
    assert_eq!(
        res.json::<Value>().await?,
        json!({ "suggested_improvements": ["Name the parameters."] })
    );

    let res = post(
        &url,
        SUGGEST_PATH,
        json!({ "original_prompt": add_function_prompt() }),
    )
    .await?;
    assert_eq!(res.status(), 400);

    return Ok(());
}

#[tokio::test]
async fn it_answers_health_checks() -> Result<()> {
    let url = spawn_server(ScriptedBackend::default()).await?;

    let res = reqwest::get(&url).await?;
    assert_eq!(res.status(), 200);

    return Ok(());
}
