use semver::Version;

// Generated by build.rs from the soljson builds found in the bundle directory.
include!(concat!(env!("OUT_DIR"), "/bundled_artifacts.rs"));

/// Immutable version -> artifact table compiled into the binary. Lookups never touch the
/// filesystem or the network.
#[derive(Clone, Copy, Debug)]
pub struct BundledArtifacts {
  entries: &'static [(&'static str, &'static str)],
}

impl BundledArtifacts {
  pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
    Self { entries }
  }

  pub const fn empty() -> Self {
    Self { entries: &[] }
  }

  /// The table generated at build time.
  pub fn builtin() -> Self {
    Self::new(BUNDLED_ARTIFACTS)
  }

  pub fn get(&self, version: &str) -> Option<&'static str> {
    self
      .entries
      .iter()
      .find(|(bundled, _)| *bundled == version)
      .map(|(_, source)| *source)
  }

  pub fn contains(&self, version: &str) -> bool {
    self.get(version).is_some()
  }

  /// Bundled versions, newest first.
  pub fn versions(&self) -> Vec<&'static str> {
    let mut versions: Vec<&'static str> = self.entries.iter().map(|(version, _)| *version).collect();
    versions.sort_by(|a, b| match (Version::parse(a), Version::parse(b)) {
      (Ok(a), Ok(b)) => b.cmp(&a),
      _ => b.cmp(a),
    });
    versions.dedup();
    versions
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl Default for BundledArtifacts {
  fn default() -> Self {
    Self::builtin()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  static TABLE: &[(&str, &str)] = &[
    ("0.8.9", "var Module = { v: 9 };"),
    ("0.8.30", "var Module = { v: 30 };"),
    ("0.8.21", "var Module = { v: 21 };"),
  ];

  #[test]
  fn looks_up_exact_versions() {
    let bundled = BundledArtifacts::new(TABLE);
    assert_eq!(bundled.get("0.8.30"), Some("var Module = { v: 30 };"));
    assert!(bundled.get("0.8.3").is_none());
    assert!(bundled.contains("0.8.21"));
    assert_eq!(bundled.len(), 3);
  }

  #[test]
  fn lists_versions_newest_first() {
    let bundled = BundledArtifacts::new(TABLE);
    assert_eq!(bundled.versions(), vec!["0.8.30", "0.8.21", "0.8.9"]);
    assert!(BundledArtifacts::empty().versions().is_empty());
  }

  #[test]
  fn builtin_table_holds_loadable_entries() {
    let bundled = BundledArtifacts::builtin();
    let versions = bundled.versions();
    assert_eq!(versions.len(), bundled.len());
    for version in versions {
      assert!(Version::parse(version).is_ok(), "bad bundled version {version}");
      let source = bundled.get(version).expect("listed version is bundled");
      assert!(!source.trim().is_empty(), "empty bundled build {version}");
    }
  }
}
