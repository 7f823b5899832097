use std::collections::BTreeMap;

use semver::Version;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::fetch::Fetch;
use crate::errors::ArtifactError;

/// Remote `list.json` describing every published soljson build.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionCatalog {
  #[serde(default)]
  pub builds: Vec<Build>,
  /// Release version -> artifact filename.
  #[serde(default)]
  pub releases: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub latest_release: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
  pub path: String,
  pub version: String,
  #[serde(default)]
  pub build: String,
  #[serde(default)]
  pub long_version: String,
  #[serde(default)]
  pub keccak256: String,
  #[serde(default)]
  pub sha256: String,
}

impl VersionCatalog {
  /// Download and parse the catalog at `url`.
  pub fn fetch(fetcher: &dyn Fetch, url: &str) -> Result<Self, ArtifactError> {
    let body = fetcher
      .fetch(url)
      .map_err(|err| ArtifactError::CatalogFetch {
        url: url.to_string(),
        message: err.to_string(),
      })?;
    serde_json::from_slice(&body).map_err(|err| ArtifactError::CatalogFetch {
      url: url.to_string(),
      message: format!("failed to parse version list: {err}"),
    })
  }

  pub fn release_filename(&self, version: &str) -> Option<&str> {
    self.releases.get(version).map(String::as_str)
  }

  pub fn build_for(&self, filename: &str) -> Option<&Build> {
    self.builds.iter().find(|build| build.path == filename)
  }

  /// Highest release by semantic version, falling back to the catalog's own marker.
  pub fn latest_release(&self) -> Option<&str> {
    self
      .releases
      .keys()
      .filter_map(|key| Version::parse(key).ok().map(|version| (version, key)))
      .max_by(|(a, _), (b, _)| a.cmp(b))
      .map(|(_, key)| key.as_str())
      .or(self.latest_release.as_deref())
  }
}

impl Build {
  /// Compare `bytes` against the published sha256. Builds without a published hash pass.
  pub fn verify(&self, bytes: &[u8]) -> Result<(), String> {
    let expected = self.sha256.trim().trim_start_matches("0x");
    if expected.is_empty() {
      return Ok(());
    }
    let actual = hex::encode(Sha256::digest(bytes));
    if actual.eq_ignore_ascii_case(expected) {
      Ok(())
    } else {
      Err(format!("sha256 mismatch: expected {expected}, got {actual}"))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::artifact::fetch::FetchError;
  use serde_json::json;

  struct StaticFetch(Result<Vec<u8>, u16>);

  impl Fetch for StaticFetch {
    fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
      self.0.clone().map_err(FetchError::Status)
    }
  }

  fn catalog_json() -> Vec<u8> {
    serde_json::to_vec(&json!({
      "builds": [
        {
          "path": "soljson-v0.8.21+commit.d9974bed.js",
          "version": "0.8.21",
          "build": "commit.d9974bed",
          "longVersion": "0.8.21+commit.d9974bed",
          "keccak256": "0x00",
          "sha256": ""
        }
      ],
      "releases": {
        "0.8.21": "soljson-v0.8.21+commit.d9974bed.js",
        "0.8.9": "soljson-v0.8.9+commit.e5eed63a.js",
        "0.4.26": "soljson-v0.4.26+commit.4563c3fc.js"
      },
      "latestRelease": "0.8.21"
    }))
    .unwrap()
  }

  #[test]
  fn parses_catalog_and_looks_up_releases() {
    let catalog = VersionCatalog::fetch(&StaticFetch(Ok(catalog_json())), "mem://list.json")
      .expect("catalog");
    assert_eq!(
      catalog.release_filename("0.8.21"),
      Some("soljson-v0.8.21+commit.d9974bed.js")
    );
    assert!(catalog.release_filename("0.8.22").is_none());
    assert_eq!(
      catalog
        .build_for("soljson-v0.8.21+commit.d9974bed.js")
        .map(|build| build.long_version.as_str()),
      Some("0.8.21+commit.d9974bed")
    );
    assert_eq!(catalog.latest_release(), Some("0.8.21"));
  }

  #[test]
  fn fetch_failures_are_catalog_errors() {
    let err = VersionCatalog::fetch(&StaticFetch(Err(503)), "mem://list.json").unwrap_err();
    assert!(matches!(err, ArtifactError::CatalogFetch { .. }));
    assert!(err.to_string().contains("HTTP 503"));

    let err = VersionCatalog::fetch(&StaticFetch(Ok(b"<html>".to_vec())), "mem://list.json")
      .unwrap_err();
    assert!(err.to_string().contains("failed to parse version list"));
  }

  #[test]
  fn verifies_published_sha256() {
    let bytes = b"var Module = {};";
    let mut build = Build {
      sha256: format!("0x{}", hex::encode(Sha256::digest(bytes))),
      ..Default::default()
    };
    assert!(build.verify(bytes).is_ok());
    assert!(build.verify(b"tampered").is_err());

    build.sha256.clear();
    assert!(build.verify(b"anything").is_ok());
  }
}
