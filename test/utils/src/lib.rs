pub fn add_function_prompt() -> &'static str {
    return "a function that adds two numbers";
}

pub fn add_function_fragments() -> Vec<&'static str> {
    return vec!["function add(a", ", b) {\n", "  return a + b;\n}"];
}

pub fn add_function_fixture() -> &'static str {
    return "function add(a, b) {\n  return a + b;\n}";
}

pub fn html_fixture() -> &'static str {
    return r#"
<main>
  <h1>Hello</h1>
  <p>A tiny page.</p>
</main>
"#
    .trim();
}

pub fn styled_html_fixture() -> &'static str {
    return r#"
<!DOCTYPE html>
<html>
<head>
  <style>h1 { color: tomato; }</style>
</head>
<body><h1>Styled</h1></body>
</html>
"#
    .trim();
}

/// Server-sent events as returned by Gemini's `streamGenerateContent?alt=sse`.
pub fn gemini_stream_fixture() -> String {
    return add_function_fragments()
        .iter()
        .map(|fragment| {
            let text = fragment.replace('\n', "\\n");
            return format!(
                "data: {{\"candidates\": [{{\"content\": {{\"parts\": [{{\"text\": \"{text}\"}}],\"role\": \"model\"}}}}]}}\r\n\r\n"
            );
        })
        .chain(std::iter::once(
            "data: {\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"\"}],\"role\": \"model\"},\"finishReason\": \"STOP\"}]}\r\n\r\n".to_string(),
        ))
        .collect::<Vec<String>>()
        .join("");
}
