use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::artifact::{ArtifactStore, CompilerArtifact};
use crate::config::{debug_enabled, SolcConfig, DEFAULT_MAX_IMPORT_DEPTH};
use crate::engine::{DefaultEngine, Engine};
use crate::errors::{Error, Result};
use crate::resolver::{ImportCallback, ImportResolver};
use crate::types::{Input, Output};

/// A loaded Solidity compiler.
///
/// Every call takes the same lock, so a `Solc` can be shared across threads while the
/// engine only ever sees one call at a time. Once [`Solc::close`] runs the session stays
/// closed: `compile` fails and `version`/`license` return empty strings.
pub struct Solc {
  engine: Mutex<Option<Box<dyn Engine>>>,
  max_import_depth: usize,
}

impl Solc {
  /// Load the given soljson source text.
  pub fn new(artifact_source: &str) -> Result<Self> {
    let engine = DefaultEngine::from_source(artifact_source, debug_enabled())?;
    Ok(Self::from_engine(engine))
  }

  /// Acquire `version` with settings from the environment and load it.
  pub fn with_version(version: &str) -> Result<Self> {
    Self::with_config(version, &SolcConfig::from_env())
  }

  pub fn with_config(version: &str, config: &SolcConfig) -> Result<Self> {
    let artifact = ArtifactStore::new(config)?.resolve_artifact(version)?;
    Self::from_artifact(&artifact, config)
  }

  pub fn from_artifact(artifact: &CompilerArtifact, config: &SolcConfig) -> Result<Self> {
    debug!(
      version = artifact.version(),
      origin = ?artifact.origin(),
      "loading solc artifact"
    );
    let engine = DefaultEngine::new(artifact, config.debug)?;
    Ok(Self::from_engine(engine).with_max_import_depth(config.max_import_depth))
  }

  /// Wrap an already constructed engine.
  pub fn from_engine(engine: impl Engine + 'static) -> Self {
    Self {
      engine: Mutex::new(Some(Box::new(engine))),
      max_import_depth: DEFAULT_MAX_IMPORT_DEPTH,
    }
  }

  pub fn with_max_import_depth(mut self, max_import_depth: usize) -> Self {
    self.max_import_depth = max_import_depth;
    self
  }

  /// Full compiler version, or `""` once closed or when the engine call fails.
  pub fn version(&self) -> String {
    let mut guard = self.lock();
    let Some(engine) = guard.as_mut() else {
      return String::new();
    };
    engine.version().unwrap_or_else(|err| {
      warn!(error = %err, "failed to query solc version");
      String::new()
    })
  }

  /// License text, or `""` when closed or the artifact has no license export.
  pub fn license(&self) -> String {
    let mut guard = self.lock();
    let Some(engine) = guard.as_mut() else {
      return String::new();
    };
    match engine.license() {
      Ok(license) => license.unwrap_or_default(),
      Err(err) => {
        warn!(error = %err, "failed to query solc license");
        String::new()
      }
    }
  }

  /// Compile `input`. With a callback, missing imports are resolved first and a
  /// resolution failure aborts before the compiler runs.
  ///
  /// Compiler diagnostics, errors included, come back in [`Output::errors`].
  pub fn compile(
    &self,
    input: &Input,
    callback: Option<&mut dyn ImportCallback>,
  ) -> Result<Output> {
    input.validate()?;

    let mut guard = self.lock();
    let engine = guard.as_mut().ok_or(Error::ClosedSession)?;

    let resolved;
    let input = match callback {
      Some(callback) => {
        let mut augmented = input.clone();
        ImportResolver::new(callback)
          .with_max_depth(self.max_import_depth)
          .resolve_imports(&mut augmented)?;
        resolved = augmented;
        &resolved
      }
      None => input,
    };

    let request = serde_json::to_string(input).map_err(|source| Error::Marshal {
      what: "compiler input",
      source,
    })?;
    debug!(sources = input.sources.len(), "invoking solc compile");
    let response = engine.compile(&request)?;

    serde_json::from_str(&response).map_err(|source| Error::Unmarshal {
      what: "compiler output",
      source,
    })
  }

  /// Parse a standard JSON input document and compile it.
  pub fn compile_json(
    &self,
    input_json: &str,
    callback: Option<&mut dyn ImportCallback>,
  ) -> Result<Output> {
    let input = Input::from_json(input_json)?;
    self.compile(&input, callback)
  }

  /// Release the engine. Calling it again is a no-op.
  pub fn close(&self) -> Result<()> {
    if let Some(mut engine) = self.lock().take() {
      engine.dispose();
      debug!("closed solc session");
    }
    Ok(())
  }

  pub fn is_closed(&self) -> bool {
    self.lock().is_none()
  }

  fn lock(&self) -> MutexGuard<'_, Option<Box<dyn Engine>>> {
    // A panicking import callback poisons the lock; the engine itself is still intact.
    self.engine.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl Drop for Solc {
  fn drop(&mut self) {
    let engine = self
      .engine
      .get_mut()
      .unwrap_or_else(PoisonError::into_inner);
    if let Some(mut engine) = engine.take() {
      engine.dispose();
    }
  }
}
