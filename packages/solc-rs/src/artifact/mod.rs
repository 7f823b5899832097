//! Compiler artifact acquisition: bundled table, on-disk cache, then the remote catalog.

use std::borrow::Cow;
use std::fmt;

use semver::Version;
use tracing::{debug, warn};

use crate::config::SolcConfig;
use crate::errors::ArtifactError;

mod bundled;
mod cache;
mod catalog;
mod fetch;

pub use bundled::BundledArtifacts;
pub use cache::{BinaryCache, ARTIFACT_FILE_NAME};
pub use catalog::{Build, VersionCatalog};
pub use fetch::{Fetch, FetchError, HttpFetcher};

/// Where an artifact was served from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactOrigin {
  Bundled,
  Cache,
  Download,
}

/// A loaded soljson build and the version it was resolved for. Immutable once created.
#[derive(Clone)]
pub struct CompilerArtifact {
  version: String,
  source: Cow<'static, str>,
  origin: ArtifactOrigin,
}

impl CompilerArtifact {
  pub fn new(version: impl Into<String>, source: impl Into<Cow<'static, str>>) -> Self {
    Self {
      version: version.into(),
      source: source.into(),
      origin: ArtifactOrigin::Download,
    }
  }

  fn with_origin(mut self, origin: ArtifactOrigin) -> Self {
    self.origin = origin;
    self
  }

  pub fn version(&self) -> &str {
    &self.version
  }

  pub fn source(&self) -> &str {
    &self.source
  }

  pub fn origin(&self) -> ArtifactOrigin {
    self.origin
  }
}

impl fmt::Debug for CompilerArtifact {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CompilerArtifact")
      .field("version", &self.version)
      .field("origin", &self.origin)
      .field("len", &self.source.len())
      .finish()
  }
}

/// Resolves a version identifier to compiler artifact text.
///
/// Concurrent first use of an uncached version may download it twice; both writes land on
/// the same cache file and the last one wins. Either copy is valid.
pub struct ArtifactStore {
  bundled: BundledArtifacts,
  cache: BinaryCache,
  fetcher: Box<dyn Fetch>,
  catalog_url: String,
  config: SolcConfig,
}

impl ArtifactStore {
  /// Store backed by the built-in bundle, `config.cache_dir` and an HTTP fetcher.
  pub fn new(config: &SolcConfig) -> Result<Self, ArtifactError> {
    let fetcher = HttpFetcher::new().map_err(|err| ArtifactError::CatalogFetch {
      url: config.catalog_url(),
      message: err.to_string(),
    })?;
    Ok(Self::with_fetcher(
      config,
      BundledArtifacts::builtin(),
      fetcher,
    ))
  }

  pub fn with_fetcher(
    config: &SolcConfig,
    bundled: BundledArtifacts,
    fetcher: impl Fetch + 'static,
  ) -> Self {
    Self {
      bundled,
      cache: BinaryCache::new(&config.cache_dir),
      fetcher: Box::new(fetcher),
      catalog_url: config.catalog_url(),
      config: config.clone(),
    }
  }

  pub fn cache(&self) -> &BinaryCache {
    &self.cache
  }

  /// Versions served without any I/O, newest first.
  pub fn bundled_versions(&self) -> Vec<&'static str> {
    self.bundled.versions()
  }

  pub fn fetch_catalog(&self) -> Result<VersionCatalog, ArtifactError> {
    VersionCatalog::fetch(self.fetcher.as_ref(), &self.catalog_url)
  }

  /// Resolve `version` to an artifact: bundled table, then cache, then download.
  pub fn resolve_artifact(&self, version: &str) -> Result<CompilerArtifact, ArtifactError> {
    let version = normalize_version(version);

    if let Some(source) = self.bundled.get(&version) {
      debug!(%version, "serving bundled solc artifact");
      return Ok(CompilerArtifact::new(version, source).with_origin(ArtifactOrigin::Bundled));
    }

    if let Some(source) = self.cache.load(&version) {
      debug!(%version, root = %self.cache.root().display(), "serving cached solc artifact");
      return Ok(CompilerArtifact::new(version, source).with_origin(ArtifactOrigin::Cache));
    }

    let catalog = self.fetch_catalog()?;
    let filename = catalog
      .release_filename(&version)
      .ok_or_else(|| ArtifactError::UnknownVersion {
        version: version.clone(),
      })?;

    let source = self.download(&catalog, &version, filename)?;

    match self.cache.store(&version, &source) {
      Ok(path) => debug!(%version, path = %path.display(), "cached solc artifact"),
      Err(err) => warn!(%version, error = %err, "failed to cache solc artifact"),
    }

    Ok(CompilerArtifact::new(version, source).with_origin(ArtifactOrigin::Download))
  }

  fn download(
    &self,
    catalog: &VersionCatalog,
    version: &str,
    filename: &str,
  ) -> Result<String, ArtifactError> {
    let url = self.config.artifact_url(filename);
    let download_error = |message: String| ArtifactError::Download {
      version: version.to_string(),
      url: url.clone(),
      message,
    };

    debug!(%version, %url, "downloading solc artifact");
    let bytes = self
      .fetcher
      .fetch(&url)
      .map_err(|err| download_error(err.to_string()))?;

    if let Some(build) = catalog.build_for(filename) {
      build.verify(&bytes).map_err(download_error)?;
    }

    String::from_utf8(bytes)
      .map_err(|err| download_error(format!("artifact is not valid UTF-8: {err}")))
  }
}

/// Canonical lookup key for a version string: trimmed, without a leading `v` and without
/// `+commit...` build metadata. Strings that are not semver are returned trimmed.
pub fn normalize_version(version: &str) -> String {
  let trimmed = version.trim();
  let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
  match Version::parse(bare) {
    Ok(parsed) if parsed.pre.is_empty() => {
      format!("{}.{}.{}", parsed.major, parsed.minor, parsed.patch)
    }
    Ok(parsed) => format!(
      "{}.{}.{}-{}",
      parsed.major, parsed.minor, parsed.patch, parsed.pre
    ),
    Err(_) => bare.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use sha2::{Digest, Sha256};
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  const BASE: &str = "mem://bin";
  const FILE_0821: &str = "soljson-v0.8.21+commit.d9974bed.js";
  const SOURCE_0821: &str = "var Module = { v: 21 };";

  static BUNDLE: &[(&str, &str)] = &[("0.8.30", "var Module = { v: 30 };")];

  #[derive(Clone, Default)]
  struct MockFetch {
    responses: Arc<HashMap<String, Result<Vec<u8>, u16>>>,
    calls: Arc<AtomicUsize>,
  }

  impl MockFetch {
    fn new(responses: Vec<(String, Result<Vec<u8>, u16>)>) -> Self {
      Self {
        responses: Arc::new(responses.into_iter().collect()),
        calls: Arc::default(),
      }
    }

    fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }
  }

  impl Fetch for MockFetch {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      match self.responses.get(url) {
        Some(Ok(body)) => Ok(body.clone()),
        Some(Err(status)) => Err(FetchError::Status(*status)),
        None => Err(FetchError::Transport(format!("no route to {url}"))),
      }
    }
  }

  fn catalog(sha256: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
      "builds": [{ "path": FILE_0821, "version": "0.8.21", "sha256": sha256 }],
      "releases": { "0.8.21": FILE_0821 }
    }))
    .unwrap()
  }

  fn store_with(fetch: MockFetch, cache_dir: &std::path::Path) -> ArtifactStore {
    let config = SolcConfig::default()
      .with_cache_dir(cache_dir)
      .with_binaries_url(BASE);
    ArtifactStore::with_fetcher(&config, BundledArtifacts::new(BUNDLE), fetch)
  }

  #[test]
  fn bundled_versions_never_touch_the_network() {
    let dir = tempfile::tempdir().unwrap();
    let fetch = MockFetch::default();
    let store = store_with(fetch.clone(), dir.path());

    for requested in ["0.8.30", "v0.8.30", "0.8.30+commit.73712a01"] {
      let artifact = store.resolve_artifact(requested).unwrap();
      assert_eq!(artifact.origin(), ArtifactOrigin::Bundled);
      assert_eq!(artifact.version(), "0.8.30");
    }
    assert_eq!(fetch.calls(), 0);
    assert!(!dir.path().join("0.8.30").exists());
  }

  #[test]
  fn downloads_then_serves_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let checksum = format!("0x{}", hex::encode(Sha256::digest(SOURCE_0821.as_bytes())));
    let fetch = MockFetch::new(vec![
      (format!("{BASE}/list.json"), Ok(catalog(&checksum))),
      (format!("{BASE}/{FILE_0821}"), Ok(SOURCE_0821.as_bytes().to_vec())),
    ]);
    let store = store_with(fetch.clone(), dir.path());

    let first = store.resolve_artifact("0.8.21").unwrap();
    assert_eq!(first.origin(), ArtifactOrigin::Download);
    assert_eq!(first.source(), SOURCE_0821);
    assert_eq!(fetch.calls(), 2);
    assert_eq!(
      std::fs::read_to_string(dir.path().join("0.8.21").join(ARTIFACT_FILE_NAME)).unwrap(),
      SOURCE_0821
    );

    let second = store.resolve_artifact("0.8.21").unwrap();
    assert_eq!(second.origin(), ArtifactOrigin::Cache);
    assert_eq!(second.source(), SOURCE_0821);
    assert_eq!(fetch.calls(), 2);
  }

  #[test]
  fn unknown_versions_fail_after_catalog_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let fetch = MockFetch::new(vec![(format!("{BASE}/list.json"), Ok(catalog("")))]);
    let store = store_with(fetch.clone(), dir.path());

    let err = store.resolve_artifact("0.0.1").unwrap_err();
    assert!(matches!(err, ArtifactError::UnknownVersion { ref version } if version == "0.0.1"));
    assert_eq!(fetch.calls(), 1);
  }

  #[test]
  fn catalog_and_download_failures_are_distinguished() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with(
      MockFetch::new(vec![(format!("{BASE}/list.json"), Err(500))]),
      dir.path(),
    );
    assert!(matches!(
      store.resolve_artifact("0.8.21"),
      Err(ArtifactError::CatalogFetch { .. })
    ));

    let store = store_with(
      MockFetch::new(vec![
        (format!("{BASE}/list.json"), Ok(catalog(""))),
        (format!("{BASE}/{FILE_0821}"), Err(404)),
      ]),
      dir.path(),
    );
    let err = store.resolve_artifact("0.8.21").unwrap_err();
    assert!(matches!(err, ArtifactError::Download { .. }));
    assert!(err.to_string().contains("HTTP 404"));
    assert!(store.cache().load("0.8.21").is_none());
  }

  #[test]
  fn checksum_mismatch_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let fetch = MockFetch::new(vec![
      (format!("{BASE}/list.json"), Ok(catalog("0xdeadbeef"))),
      (format!("{BASE}/{FILE_0821}"), Ok(SOURCE_0821.as_bytes().to_vec())),
    ]);
    let store = store_with(fetch, dir.path());

    let err = store.resolve_artifact("0.8.21").unwrap_err();
    assert!(err.to_string().contains("sha256 mismatch"));
    assert!(store.cache().load("0.8.21").is_none());
  }

  #[test]
  fn cache_write_failures_do_not_fail_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let blocked_root = dir.path().join("not-a-dir");
    std::fs::write(&blocked_root, "file in the way").unwrap();
    let fetch = MockFetch::new(vec![
      (format!("{BASE}/list.json"), Ok(catalog(""))),
      (format!("{BASE}/{FILE_0821}"), Ok(SOURCE_0821.as_bytes().to_vec())),
    ]);
    let store = store_with(fetch, &blocked_root);

    let artifact = store.resolve_artifact("0.8.21").unwrap();
    assert_eq!(artifact.source(), SOURCE_0821);
  }

  #[test]
  fn normalizes_version_strings() {
    assert_eq!(normalize_version(" v0.8.30 "), "0.8.30");
    assert_eq!(normalize_version("0.8.30+commit.73712a01"), "0.8.30");
    assert_eq!(
      normalize_version("0.8.31-nightly.2025.5.1+commit.abc"),
      "0.8.31-nightly.2025.5.1"
    );
    assert_eq!(normalize_version("latest"), "latest");
  }
}
