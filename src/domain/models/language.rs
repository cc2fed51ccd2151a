#[cfg(test)]
#[path = "language_test.rs"]
mod tests;

use std::str::FromStr;

use serde_derive::Deserialize;
use serde_derive::Serialize;
use strum::EnumIter;
use strum::EnumString;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;

/// The closed set of target languages. The lowercase identifier is the only
/// legal `language` value anywhere else in the system.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    EnumVariantNames,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    Html,
    Css,
    #[default]
    Javascript,
    Typescript,
    Python,
    Json,
    Sql,
    Java,
    Csharp,
    Php,
    Ruby,
    Go,
    Rust,
    Kotlin,
    Swift,
}

impl Language {
    pub fn parse(identifier: &str) -> Option<Language> {
        return Language::from_str(identifier.trim()).ok();
    }

    pub fn label(&self) -> &'static str {
        match self {
            Language::Html => return "HTML",
            Language::Css => return "CSS",
            Language::Javascript => return "JavaScript",
            Language::Typescript => return "TypeScript",
            Language::Python => return "Python",
            Language::Json => return "JSON",
            Language::Sql => return "SQL",
            Language::Java => return "Java",
            Language::Csharp => return "C#",
            Language::Php => return "PHP",
            Language::Ruby => return "Ruby",
            Language::Go => return "Go",
            Language::Rust => return "Rust",
            Language::Kotlin => return "Kotlin",
            Language::Swift => return "Swift",
        }
    }

    /// File extension used when saving a snippet to disk.
    pub fn extension(&self) -> String {
        match self {
            Language::Javascript => return "js".to_string(),
            Language::Typescript => return "ts".to_string(),
            Language::Python => return "py".to_string(),
            _ => return self.to_string(),
        }
    }

    pub fn is_previewable(&self) -> bool {
        return matches!(self, Language::Html | Language::Css | Language::Javascript);
    }

    pub fn all() -> Vec<Language> {
        return Language::iter().collect();
    }
}
