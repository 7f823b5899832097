//! Import discovery and resolution for standard JSON inputs.
//!
//! The compiler only sees the sources handed to it. Before a compile, the resolver walks
//! every `import` reachable from the input, asks the caller for files it does not have,
//! and inserts them so one compiler invocation succeeds.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::DEFAULT_MAX_IMPORT_DEPTH;
use crate::errors::ResolveError;
use crate::types::{Input, SourceIn};

static IMPORT_PATTERN: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r#"import\s+(?:(?:\{[^}]*\}|\*\s+as\s+\w+|\w+)\s+from\s+)?["']([^"']+)["']"#)
    .expect("import pattern is valid")
});

/// Answer from an [`ImportCallback`]: exactly one of `contents` or `error` is set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub contents: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl ImportResult {
  pub fn contents(contents: impl Into<String>) -> Self {
    Self {
      contents: Some(contents.into()),
      error: None,
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      contents: None,
      error: Some(message.into()),
    }
  }

  fn into_contents(self) -> Result<String, String> {
    match (self.contents, self.error) {
      (_, Some(error)) if !error.is_empty() => Err(error),
      (Some(contents), _) => Ok(contents),
      _ => Err("callback returned neither contents nor an error".to_string()),
    }
  }
}

/// Supplies the contents of a logical path the input does not contain.
///
/// Runs while the session lock is held, so it must not call back into the session.
pub trait ImportCallback {
  fn resolve(&mut self, path: &str) -> ImportResult;
}

impl<F> ImportCallback for F
where
  F: FnMut(&str) -> ImportResult,
{
  fn resolve(&mut self, path: &str) -> ImportResult {
    self(path)
  }
}

/// State for one resolution run. Not reused across compiles.
pub struct ImportResolver<'a> {
  callback: &'a mut dyn ImportCallback,
  visited: HashSet<String>,
  context_stack: Vec<String>,
  max_depth: usize,
}

impl<'a> ImportResolver<'a> {
  pub fn new(callback: &'a mut dyn ImportCallback) -> Self {
    Self {
      callback,
      visited: HashSet::new(),
      context_stack: Vec::new(),
      max_depth: DEFAULT_MAX_IMPORT_DEPTH,
    }
  }

  pub fn with_max_depth(mut self, max_depth: usize) -> Self {
    self.max_depth = max_depth;
    self
  }

  /// Add every transitively imported file missing from `input.sources`.
  ///
  /// Existing entries are never overwritten. On error, files resolved so far stay in
  /// `input`, but the caller must not compile it.
  pub fn resolve_imports(&mut self, input: &mut Input) -> Result<(), ResolveError> {
    let roots: Vec<String> = input.sources.keys().cloned().collect();
    for root in roots {
      self.resolve_file_imports(input, &root, 0)?;
    }
    debug!(
      files = input.sources.len(),
      visited = self.visited.len(),
      "import resolution complete"
    );
    Ok(())
  }

  fn resolve_file_imports(
    &mut self,
    input: &mut Input,
    path: &str,
    depth: usize,
  ) -> Result<(), ResolveError> {
    if depth > self.max_depth {
      return Err(self.depth_exceeded(path));
    }
    if !self.visited.insert(path.to_string()) {
      return Ok(());
    }

    self.context_stack.push(path.to_string());
    let result = self.resolve_children(input, path, depth);
    self.context_stack.pop();
    result
  }

  fn resolve_children(
    &mut self,
    input: &mut Input,
    path: &str,
    depth: usize,
  ) -> Result<(), ResolveError> {
    // Visited paths are roots or were inserted before recursing.
    let content = input
      .sources
      .get(path)
      .map(|source| source.content.clone())
      .unwrap_or_default();

    for import in find_imports(&content) {
      let resolved = resolve_import_path(path, &import);
      trace!(from = path, import = %resolved, depth, "found import");

      if !input.sources.contains_key(&resolved) {
        if depth + 1 > self.max_depth {
          return Err(self.depth_exceeded(&resolved));
        }
        let contents = self.fetch(&resolved)?;
        input.sources.insert(resolved.clone(), SourceIn::new(contents));
      }

      self.resolve_file_imports(input, &resolved, depth + 1)?;
    }
    Ok(())
  }

  fn fetch(&mut self, path: &str) -> Result<String, ResolveError> {
    debug!(
      path,
      importer = self.context_stack.last().map(String::as_str).unwrap_or_default(),
      "resolving import through callback"
    );
    self
      .callback
      .resolve(path)
      .into_contents()
      .map_err(|message| ResolveError::Callback {
        path: path.to_string(),
        message,
      })
  }

  fn depth_exceeded(&self, path: &str) -> ResolveError {
    debug!(path, chain = ?self.context_stack, "import depth limit reached");
    ResolveError::MaxDepthExceeded {
      path: path.to_string(),
      max_depth: self.max_depth,
    }
  }
}

/// Import literals in `content`, in source order.
pub fn find_imports(content: &str) -> Vec<String> {
  IMPORT_PATTERN
    .captures_iter(content)
    .filter_map(|captures| captures.get(1))
    .map(|literal| literal.as_str().to_string())
    .collect()
}

/// Resolve `import` as written in `importer`. Relative imports are joined onto the
/// importer's directory and cleaned; anything else is already a logical path.
pub fn resolve_import_path(importer: &str, import: &str) -> String {
  if !is_relative(import) {
    return import.to_string();
  }
  let directory = match importer.rfind('/') {
    Some(index) => &importer[..index],
    None => "",
  };
  if directory.is_empty() {
    clean_path(import)
  } else {
    clean_path(&format!("{directory}/{import}"))
  }
}

fn is_relative(import: &str) -> bool {
  import.starts_with('.')
}

/// Lexically normalize a slash-separated path: collapse `//`, drop `.` segments and
/// fold `..` into its parent where one exists.
pub fn clean_path(path: &str) -> String {
  let rooted = path.starts_with('/');
  let mut segments: Vec<&str> = Vec::new();

  for segment in path.split('/') {
    match segment {
      "" | "." => {}
      ".." => {
        if segments.last().is_some_and(|last| *last != "..") {
          segments.pop();
        } else if !rooted {
          segments.push("..");
        }
      }
      other => segments.push(other),
    }
  }

  let joined = segments.join("/");
  match (rooted, joined.is_empty()) {
    (true, _) => format!("/{joined}"),
    (false, true) => ".".to_string(),
    (false, false) => joined,
  }
}
