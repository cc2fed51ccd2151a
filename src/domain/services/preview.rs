#[cfg(test)]
#[path = "preview_test.rs"]
mod tests;

use html_escape::encode_double_quoted_attribute;
use html_escape::encode_text;

use crate::domain::models::CodePilotError;
use crate::domain::models::Language;
use crate::domain::models::PreviewPayload;

const SAMPLE_BODY: &str = r#"<div style="padding: 20px; border: 2px dashed #ccc; margin: 20px; background-color: #f0f0f0;">
      <h1>Sample Content for CSS Preview</h1>
      <h2>A secondary heading</h2>
      <p>This is a paragraph to demonstrate the styles. It has some <strong>strong</strong> text and <em>emphasized</em> text.</p>
      <button style="padding: 10px 15px; margin: 5px; border: 1px solid #333; background-color: #eee;">A Button</button>
      <input type="text" placeholder="Text Input" style="padding: 10px; margin: 5px; border: 1px solid #333;"/>
      <div class="box" style="width: 100px; height: 100px; background-color: lightblue; margin-top: 10px; border: 1px solid blue; display: flex; align-items: center; justify-content: center; text-align: center;">A styled box.</div>
    </div>"#;

const CONSOLE_CAPTURE: &str = r#"const outputDiv = document.getElementById('output');
      const escapeHtml = (text) => String(text).replace(/&/g, '&amp;').replace(/</g, '&lt;').replace(/>/g, '&gt;');
      const format = (args) => args.map((arg) => escapeHtml(typeof arg === 'object' ? JSON.stringify(arg) : String(arg))).join(' ');
      const originalLog = console.log;
      const originalWarn = console.warn;
      const originalError = console.error;
      console.log = (...args) => {
        outputDiv.innerHTML += format(args) + '\n';
        originalLog.apply(console, args);
      };
      console.warn = (...args) => {
        outputDiv.innerHTML += '<span class="warn">WARN: ' + format(args) + '</span>\n';
        originalWarn.apply(console, args);
      };
      console.error = (...args) => {
        outputDiv.innerHTML += '<span class="error">ERROR: ' + format(args) + '</span>\n';
        originalError.apply(console, args);
      };"#;

/// Outcome of synthesizing a previewable document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreviewDocument {
    Document(String),
    Unsupported(Language),
}

/// What the preview surface shows once it has read its hand-off.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreviewPage {
    Ready {
        language: Language,
        document: String,
    },
    Unavailable {
        language: Option<Language>,
        message: String,
    },
}

impl PreviewPage {
    /// Builds the page from a hand-off read. The document is synthesized here
    /// exactly once.
    pub fn from_handoff(handoff: Result<Option<PreviewPayload>, CodePilotError>) -> PreviewPage {
        let payload = match handoff {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                return PreviewPage::Unavailable {
                    language: None,
                    message: "No preview data found. Generate code and open the preview again."
                        .to_string(),
                };
            }
            Err(err) => {
                tracing::error!(error = ?err, "Failed to load preview");
                return PreviewPage::Unavailable {
                    language: None,
                    message: format!("Failed to load preview: {err}"),
                };
            }
        };

        match PreviewRenderer::synthesize(&payload.code, payload.language) {
            PreviewDocument::Document(document) => {
                return PreviewPage::Ready {
                    language: payload.language,
                    document,
                };
            }
            PreviewDocument::Unsupported(language) => {
                let err = CodePilotError::UnsupportedLanguageForPreview(
                    language.to_string().to_uppercase(),
                );
                return PreviewPage::Unavailable {
                    language: Some(language),
                    message: err.to_string(),
                };
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        return matches!(self, PreviewPage::Ready { .. });
    }

    /// Host page. A ready document is mounted in a sandboxed frame so it has
    /// no access to the host's state.
    pub fn to_html(&self) -> String {
        match self {
            PreviewPage::Ready { language, document } => {
                let title = format!("Code Preview ({})", language.to_string().to_uppercase());
                let frame = format!(
                    "<iframe title=\"Code Preview\" sandbox=\"allow-scripts\" srcdoc=\"{}\"></iframe>",
                    encode_double_quoted_attribute(document)
                );
                return host_page(&title, &frame);
            }
            PreviewPage::Unavailable { language, message } => {
                let title = match language {
                    Some(language) => {
                        format!("Code Preview ({})", language.to_string().to_uppercase())
                    }
                    None => "Code Preview".to_string(),
                };
                let body = format!("<p class=\"message\">{}</p>", encode_text(message));
                return host_page(&title, &body);
            }
        }
    }
}

fn host_page(title: &str, content: &str) -> String {
    let title = encode_text(title);
    return format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
      html, body {{ margin: 0; height: 100%; font-family: sans-serif; }}
      body {{ display: flex; flex-direction: column; }}
      header {{ padding: 12px 16px; border-bottom: 1px solid #ddd; }}
      main {{ flex-grow: 1; display: flex; }}
      iframe {{ flex-grow: 1; border: 0; }}
      .message {{ margin: auto; color: #b00020; }}
    </style>
  </head>
  <body>
    <header><h1>{title}</h1></header>
    <main>{content}</main>
  </body>
</html>
"#
    );
}

pub struct PreviewRenderer {}

impl PreviewRenderer {
    pub fn synthesize(code: &str, language: Language) -> PreviewDocument {
        match language {
            Language::Html => return PreviewDocument::Document(PreviewRenderer::html(code)),
            Language::Css => return PreviewDocument::Document(PreviewRenderer::css(code)),
            Language::Javascript => {
                return PreviewDocument::Document(PreviewRenderer::javascript(code))
            }
            _ => return PreviewDocument::Unsupported(language),
        }
    }

    fn has_styles(code: &str) -> bool {
        let lowered = code.to_lowercase();
        return lowered.contains("<style>")
            || lowered.contains("</style>")
            || lowered.contains("<link rel=\"stylesheet\"")
            || lowered.contains("<link rel='stylesheet'");
    }

    fn html(code: &str) -> String {
        if PreviewRenderer::has_styles(code) {
            return code.to_string();
        }

        return format!(
            r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>HTML Preview</title>
    <style>
      body {{ margin: 0; padding: 10px; font-family: sans-serif; line-height: 1.6; }}
    </style>
  </head>
  <body>
{code}
  </body>
</html>
"#
        );
    }

    fn css(code: &str) -> String {
        return format!(
            r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>CSS Preview</title>
    <style>
{code}
    </style>
  </head>
  <body>
    {SAMPLE_BODY}
  </body>
</html>
"#
        );
    }

    fn javascript(code: &str) -> String {
        let code = escape_script_close(code);

        return format!(
            r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>JavaScript Preview</title>
    <style>
      body {{ margin: 8px; font-family: sans-serif; background-color: #f9f9f9; color: #333; }}
      #output {{ padding: 10px; border: 1px solid #ccc; background-color: #fff; min-height: 50px; margin-top: 10px; white-space: pre-wrap; }}
      .error {{ color: red; font-weight: bold; }}
      .warn {{ color: orange; }}
    </style>
  </head>
  <body>
    <h1>JavaScript Output:</h1>
    <div id="output"></div>
    <script>
      {CONSOLE_CAPTURE}
      try {{
{code}
        if (outputDiv.innerHTML.trim() === '') {{
          outputDiv.innerHTML = '(No output to console)';
        }}
      }} catch (e) {{
        outputDiv.innerHTML = '<span class="error">Runtime Error: ' + escapeHtml(e.message) + '</span>\nStack: ' + escapeHtml(e.stack);
      }}
    </script>
  </body>
</html>
"#
        );
    }
}

/// Breaks up `</script` in any letter case so user code cannot close the
/// capture script early.
fn escape_script_close(code: &str) -> String {
    let lowered = code.to_ascii_lowercase();
    let mut escaped = String::with_capacity(code.len());
    let mut last = 0;
    for (start, _) in lowered.match_indices("</script") {
        escaped.push_str(&code[last..start]);
        escaped.push_str("<\\/");
        last = start + 2;
    }
    escaped.push_str(&code[last..]);

    return escaped;
}
