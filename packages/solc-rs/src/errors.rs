use std::fmt::Display;

use thiserror::Error;

/// Canonical error type returned by every fallible operation in the crate.
///
/// Compiler diagnostics (syntax or type errors in the compiled sources) are never
/// reported through this type; they are ordinary data in [`crate::Output::errors`].
#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Artifact(#[from] ArtifactError),

  #[error("failed to initialize compiler engine: {0}")]
  EngineInit(String),

  #[error("failed to bind compiler entry point: {0}")]
  Binding(String),

  #[error("engine call `{operation}` failed: {message}")]
  Engine { operation: &'static str, message: String },

  #[error("invalid compiler input: {0}")]
  InvalidInput(String),

  #[error("import resolution failed: {0}")]
  ImportResolution(#[from] ResolveError),

  #[error("failed to marshal {what}: {source}")]
  Marshal {
    what: &'static str,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to unmarshal {what}: {source}")]
  Unmarshal {
    what: &'static str,
    #[source]
    source: serde_json::Error,
  },

  #[error("compiler has been closed")]
  ClosedSession,
}

/// Failures while acquiring a compiler artifact for a version.
#[derive(Debug, Error)]
pub enum ArtifactError {
  #[error("solc version {version} not found in the release catalog")]
  UnknownVersion { version: String },

  #[error("failed to fetch version list from {url}: {message}")]
  CatalogFetch { url: String, message: String },

  #[error("failed to download solc {version} from {url}: {message}")]
  Download {
    version: String,
    url: String,
    message: String,
  },
}

/// Failures raised by the import resolver. Any of them aborts the compile before
/// the foreign compiler runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
  #[error("import callback failed for {path}: {message}")]
  Callback { path: String, message: String },

  #[error("maximum import depth of {max_depth} exceeded for file: {path}")]
  MaxDepthExceeded { path: String, max_depth: usize },
}

impl ResolveError {
  /// Logical path of the file the failure is attributed to.
  pub fn path(&self) -> &str {
    match self {
      ResolveError::Callback { path, .. } | ResolveError::MaxDepthExceeded { path, .. } => path,
    }
  }
}

/// Result alias bound to [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Build an engine error for `operation`, annotating the cause.
pub(crate) fn engine_error(operation: &'static str, cause: impl Display) -> Error {
  Error::Engine {
    operation,
    message: cause.to_string(),
  }
}

#[cfg(feature = "node")]
impl From<Error> for napi::Error {
  fn from(err: Error) -> Self {
    napi_error(err.to_string())
  }
}

/// Create a `napi::Error` with the provided message.
#[cfg(feature = "node")]
pub(crate) fn napi_error(message: impl Into<String>) -> napi::Error {
  napi::Error::new(napi::Status::GenericFailure, message.into())
}

/// Map an errorful result into a `napi::Result`, annotating `context`.
#[cfg(feature = "node")]
pub(crate) fn map_napi_error<T, E>(
  result: std::result::Result<T, E>,
  context: &str,
) -> napi::Result<T>
where
  E: Display,
{
  result.map_err(|err| napi_error(format!("{context}: {err}")))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn resolve_errors_name_the_offending_path() {
    let err = ResolveError::MaxDepthExceeded {
      path: "lib/Deep.sol".into(),
      max_depth: 50,
    };
    assert_eq!(err.path(), "lib/Deep.sol");
    assert!(err.to_string().contains("lib/Deep.sol"));

    let wrapped: Error = err.into();
    assert!(matches!(wrapped, Error::ImportResolution(_)));
    assert!(wrapped.to_string().starts_with("import resolution failed"));
  }

  #[test]
  fn artifact_errors_carry_version_context() {
    let err: Error = ArtifactError::UnknownVersion {
      version: "0.0.1".into(),
    }
    .into();
    assert_eq!(
      err.to_string(),
      "solc version 0.0.1 not found in the release catalog"
    );
  }
}
