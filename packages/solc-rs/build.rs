use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const ARTIFACT_PREFIX: &str = "soljson-v";
const ARTIFACT_SUFFIX: &str = ".js";

fn main() {
  #[cfg(feature = "node")]
  napi_build::setup();

  println!("cargo:rerun-if-changed=build.rs");
  println!("cargo:rerun-if-env-changed=SOLC_BUNDLE_DIR");

  let manifest_dir =
    PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("cargo sets CARGO_MANIFEST_DIR"));
  let out_dir = PathBuf::from(env::var("OUT_DIR").expect("cargo sets OUT_DIR"));
  let bundle_dir = env::var_os("SOLC_BUNDLE_DIR")
    .map(PathBuf::from)
    .unwrap_or_else(|| manifest_dir.join("bundled"));

  if bundle_dir.is_dir() {
    println!("cargo:rerun-if-changed={}", bundle_dir.display());
  }

  let mut entries = collect_bundled(&bundle_dir);
  entries.sort();

  let mut generated =
    String::from("pub(crate) static BUNDLED_ARTIFACTS: &[(&str, &str)] = &[\n");
  for (version, path) in &entries {
    let path = path.display().to_string();
    generated.push_str(&format!("  ({version:?}, include_str!({path:?})),\n"));
  }
  generated.push_str("];\n");

  fs::write(out_dir.join("bundled_artifacts.rs"), generated)
    .expect("failed to write bundled artifact table");
}

/// Collect `(version, path)` pairs for every `soljson-v<version>+commit.<hash>.js`
/// file in `dir`. A missing directory yields an empty table.
fn collect_bundled(dir: &Path) -> Vec<(String, PathBuf)> {
  let Ok(read_dir) = fs::read_dir(dir) else {
    return Vec::new();
  };

  let mut entries = Vec::new();
  for entry in read_dir.flatten() {
    let path = entry.path();
    if !path.is_file() {
      continue;
    }
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
      continue;
    };
    let Some(stem) = name
      .strip_prefix(ARTIFACT_PREFIX)
      .and_then(|rest| rest.strip_suffix(ARTIFACT_SUFFIX))
    else {
      continue;
    };
    let version = stem.split('+').next().unwrap_or(stem).to_string();
    if version.is_empty() {
      continue;
    }
    let absolute = path.canonicalize().unwrap_or(path);
    entries.push((version, absolute));
  }
  entries
}
