use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::settings::Settings;
use crate::errors::{Error, Result};

pub const DEFAULT_LANGUAGE: &str = "Solidity";

/// Standard JSON compiler input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Input {
  #[serde(default = "default_language")]
  pub language: String,
  /// Logical path -> source. The import resolver only ever adds entries.
  #[serde(default)]
  pub sources: BTreeMap<String, SourceIn>,
  #[serde(default)]
  pub settings: Settings,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceIn {
  pub content: String,
}

impl SourceIn {
  pub fn new(content: impl Into<String>) -> Self {
    Self {
      content: content.into(),
    }
  }
}

impl Default for Input {
  fn default() -> Self {
    Input {
      language: default_language(),
      sources: BTreeMap::new(),
      settings: Settings::default(),
    }
  }
}

impl Input {
  pub fn new(settings: Settings) -> Self {
    Input {
      settings,
      ..Default::default()
    }
  }

  /// Add a source under `path`, replacing any previous entry.
  pub fn with_source(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
    self.sources.insert(path.into(), SourceIn::new(content));
    self
  }

  /// Parse a standard JSON document, rejecting anything that is not a well-formed input.
  pub fn from_json(json: &str) -> Result<Self> {
    let input: Input =
      serde_json::from_str(json).map_err(|err| Error::InvalidInput(err.to_string()))?;
    input.validate()?;
    Ok(input)
  }

  pub(crate) fn validate(&self) -> Result<()> {
    if self.language.trim().is_empty() {
      return Err(Error::InvalidInput("language must not be empty".into()));
    }
    Ok(())
  }
}

fn default_language() -> String {
  DEFAULT_LANGUAGE.to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_minimal_document_with_defaults() {
    let input =
      Input::from_json(r#"{ "sources": { "A.sol": { "content": "contract A {}" } } }"#).unwrap();
    assert_eq!(input.language, DEFAULT_LANGUAGE);
    assert_eq!(input.sources["A.sol"].content, "contract A {}");
    assert!(!input.settings.optimizer.enabled);
  }

  #[test]
  fn rejects_malformed_documents() {
    assert!(matches!(
      Input::from_json("not json"),
      Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
      Input::from_json(r#"{ "sources": { "A.sol": 1 } }"#),
      Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
      Input::from_json(r#"{ "language": "  " }"#),
      Err(Error::InvalidInput(_))
    ));
  }
}
