use std::env;
use std::path::{Path, PathBuf};

/// Remote location of the official soljson builds and their `list.json` catalog.
pub const DEFAULT_BINARIES_URL: &str = "https://binaries.soliditylang.org/bin";

/// Maximum distance from an originally supplied source to a discovered import.
pub const DEFAULT_MAX_IMPORT_DEPTH: usize = 50;

pub const ENV_CACHE_DIR: &str = "SOLC_CACHE_DIR";
pub const ENV_BINARIES_URL: &str = "SOLC_BINARIES_URL";
pub const ENV_DEBUG: &str = "SOLC_DEBUG";

/// Settings shared by artifact acquisition, engine construction and import resolution.
///
/// Start from [`SolcConfig::default`] or [`SolcConfig::from_env`] and layer overrides with
/// the `with_*` methods.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolcConfig {
  /// Root of the on-disk artifact cache (`<cache_dir>/<version>/soljson.js`).
  pub cache_dir: PathBuf,
  /// Base URL serving `list.json` and the artifact files it names.
  pub binaries_url: String,
  /// Forward the engine's `print`/`console`/`debugLog` output to `tracing`.
  pub debug: bool,
  pub max_import_depth: usize,
}

impl Default for SolcConfig {
  fn default() -> Self {
    SolcConfig {
      cache_dir: default_cache_dir(),
      binaries_url: DEFAULT_BINARIES_URL.to_string(),
      debug: false,
      max_import_depth: DEFAULT_MAX_IMPORT_DEPTH,
    }
  }
}

impl SolcConfig {
  /// Defaults overridden by `SOLC_CACHE_DIR`, `SOLC_BINARIES_URL` and `SOLC_DEBUG=1`.
  pub fn from_env() -> Self {
    let mut config = SolcConfig::default();
    if let Some(dir) = env::var_os(ENV_CACHE_DIR).filter(|dir| !dir.is_empty()) {
      config.cache_dir = PathBuf::from(dir);
    }
    if let Ok(url) = env::var(ENV_BINARIES_URL) {
      let trimmed = url.trim();
      if !trimmed.is_empty() {
        config.binaries_url = trimmed.to_string();
      }
    }
    config.debug = debug_enabled();
    config
  }

  pub fn with_cache_dir(mut self, dir: impl AsRef<Path>) -> Self {
    self.cache_dir = dir.as_ref().to_path_buf();
    self
  }

  pub fn with_binaries_url(mut self, url: impl Into<String>) -> Self {
    self.binaries_url = url.into();
    self
  }

  pub fn with_debug(mut self, debug: bool) -> Self {
    self.debug = debug;
    self
  }

  pub fn with_max_import_depth(mut self, depth: usize) -> Self {
    self.max_import_depth = depth;
    self
  }

  /// URL of the version catalog under [`SolcConfig::binaries_url`].
  pub fn catalog_url(&self) -> String {
    join_url(&self.binaries_url, "list.json")
  }

  /// URL of a single artifact file listed in the catalog.
  pub fn artifact_url(&self, filename: &str) -> String {
    join_url(&self.binaries_url, filename)
  }
}

/// Whether the `SOLC_DEBUG` toggle is switched on for this process.
pub fn debug_enabled() -> bool {
  matches!(
    env::var(ENV_DEBUG).as_deref().map(str::trim),
    Ok("1") | Ok("true")
  )
}

fn default_cache_dir() -> PathBuf {
  dirs::home_dir()
    .unwrap_or_else(env::temp_dir)
    .join("solc")
}

fn join_url(base: &str, file: &str) -> String {
  format!("{}/{}", base.trim_end_matches('/'), file.trim_start_matches('/'))
}
