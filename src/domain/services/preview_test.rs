use test_utils::html_fixture;
use test_utils::styled_html_fixture;

use super::PreviewDocument;
use super::PreviewPage;
use super::PreviewRenderer;
use crate::domain::models::CodePilotError;
use crate::domain::models::Language;
use crate::domain::models::PreviewPayload;

fn document(code: &str, language: Language) -> String {
    match PreviewRenderer::synthesize(code, language) {
        PreviewDocument::Document(html) => return html,
        PreviewDocument::Unsupported(language) => panic!("{language} is not previewable"),
    }
}

#[test]
fn it_wraps_unstyled_html_in_a_document() {
    let html = document(html_fixture(), Language::Html);
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>HTML Preview</title>"));
    assert!(html.contains(html_fixture()));
}

#[test]
fn it_passes_styled_html_through_verbatim() {
    let html = document(styled_html_fixture(), Language::Html);
    assert_eq!(html, styled_html_fixture());
}

#[test]
fn it_passes_html_with_linked_stylesheets_through() {
    let code = "<link rel='stylesheet' href='app.css'><p>hi</p>";
    assert_eq!(document(code, Language::Html), code);
}

#[test]
fn it_applies_css_to_a_sample_body() {
    let html = document("body{color:red}", Language::Css);
    assert!(html.contains("<style>\nbody{color:red}\n    </style>"));
    assert!(html.contains("Sample Content for CSS Preview"));
    assert!(html.contains("A Button"));
    assert!(html.contains("placeholder=\"Text Input\""));
    assert!(html.contains("A styled box."));
}

#[test]
fn it_captures_console_output_for_javascript() {
    let html = document("console.log('hi');", Language::Javascript);
    assert!(html.contains("<h1>JavaScript Output:</h1>"));
    assert!(html.contains("console.log = (...args)"));
    assert!(html.contains("console.log('hi');"));
    assert!(html.contains("(No output to console)"));
    assert!(html.contains("Runtime Error: "));
}

#[test]
fn it_keeps_closing_script_tags_inside_the_script() {
    let html = document("console.log('</script>');", Language::Javascript);
    assert!(html.contains("console.log('<\\/script>');"));
    assert_eq!(html.matches("</script>").count(), 1);

    let html = document(
        "console.log('</SCRIPT><b>x</b>', '</Script >');",
        Language::Javascript,
    );
    assert!(html.contains("console.log('<\\/SCRIPT><b>x</b>', '<\\/Script >');"));
    assert_eq!(html.to_ascii_lowercase().matches("</script").count(), 1);
}

#[test]
fn it_refuses_non_previewable_languages() {
    for language in Language::all() {
        let res = PreviewRenderer::synthesize("code", language);
        if language.is_previewable() {
            assert!(matches!(res, PreviewDocument::Document(_)));
        } else {
            assert_eq!(res, PreviewDocument::Unsupported(language));
        }
    }
}

#[test]
fn it_builds_a_ready_page_from_a_hand_off() {
    let page = PreviewPage::from_handoff(Ok(Some(PreviewPayload {
        code: "<p>a & b</p>".to_string(),
        language: Language::Html,
    })));
    assert!(page.is_ready());

    let html = page.to_html();
    assert!(html.contains("<title>Code Preview (HTML)</title>"));
    assert!(html.contains("sandbox=\"allow-scripts\""));
    assert!(html.contains("&lt;p&gt;a &amp; b&lt;/p&gt;"));
    assert!(!html.contains("<p>a & b</p>"));
}

#[test]
fn it_builds_an_unsupported_page() {
    let page = PreviewPage::from_handoff(Ok(Some(PreviewPayload {
        code: "print(1)".to_string(),
        language: Language::Python,
    })));

    assert_eq!(
        page,
        PreviewPage::Unavailable {
            language: Some(Language::Python),
            message: "Preview is not supported for PYTHON.".to_string(),
        }
    );
    assert!(!page.to_html().contains("<iframe"));
}

#[test]
fn it_builds_a_missing_page() {
    let page = PreviewPage::from_handoff(Ok(None));
    assert!(!page.is_ready());
    assert!(page.to_html().contains("No preview data found"));
}

#[test]
fn it_builds_a_corrupt_page() {
    let page = PreviewPage::from_handoff(Err(CodePilotError::corrupt("preview", "eof")));
    match page {
        PreviewPage::Unavailable { language, message } => {
            assert_eq!(language, None);
            assert_eq!(
                message,
                "Failed to load preview: Stored preview is malformed: eof"
            );
        }
        _ => panic!("expected an unavailable page"),
    }
}
