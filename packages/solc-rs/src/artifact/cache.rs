use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// File name every cached artifact is stored under, one per version directory.
pub const ARTIFACT_FILE_NAME: &str = "soljson.js";

/// On-disk artifact cache laid out as `<root>/<version>/soljson.js`.
///
/// A non-empty file is the only "present" signal; nothing else is recorded.
#[derive(Clone, Debug)]
pub struct BinaryCache {
  root: PathBuf,
}

impl BinaryCache {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Location of the cached artifact for `version`, if `version` is usable as a directory name.
  pub fn path_for(&self, version: &str) -> Option<PathBuf> {
    is_safe_component(version).then(|| self.root.join(version).join(ARTIFACT_FILE_NAME))
  }

  pub fn load(&self, version: &str) -> Option<String> {
    let path = self.path_for(version)?;
    fs::read_to_string(path)
      .ok()
      .filter(|contents| !contents.is_empty())
  }

  /// Persist `contents` for `version`. The file is written next to its final location and
  /// renamed into place, so concurrent writers race on the rename only.
  pub fn store(&self, version: &str, contents: &str) -> io::Result<PathBuf> {
    let target = self.path_for(version).ok_or_else(|| {
      io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("version {version:?} cannot be used as a cache directory"),
      )
    })?;
    let dir = self.root.join(version);
    fs::create_dir_all(&dir)?;

    let mut staged = NamedTempFile::new_in(&dir)?;
    staged.write_all(contents.as_bytes())?;
    staged.flush()?;
    staged.persist(&target).map_err(|err| err.error)?;
    Ok(target)
  }
}

fn is_safe_component(version: &str) -> bool {
  !version.is_empty()
    && version != "."
    && version != ".."
    && !version.contains(['/', '\\'])
}
