//! The foreign compiler behind a three-call interface.

use crate::errors::{Error, Result};

mod quickjs;
#[cfg(feature = "v8")]
mod v8_engine;

pub use quickjs::QuickJsEngine;
#[cfg(feature = "v8")]
pub use v8_engine::V8Engine;

/// Backend used by [`crate::Solc::new`] and the version-based constructors. V8 runs the
/// WebAssembly soljson builds; QuickJS only runs asm.js builds.
#[cfg(feature = "v8")]
pub type DefaultEngine = V8Engine;
#[cfg(not(feature = "v8"))]
pub type DefaultEngine = QuickJsEngine;

/// Candidate export names, newest convention first.
pub const VERSION_ENTRY_POINTS: &[&str] = &["solidity_version", "version"];
pub const LICENSE_ENTRY_POINTS: &[&str] = &["solidity_license", "license"];
pub const COMPILE_ENTRY_POINTS: &[&str] = &["solidity_compile", "compileStandard"];

/// Global holding the bound entry points inside the engine context.
pub(crate) const BRIDGE_GLOBAL: &str = "__solcBridge";
/// Native sink for the script-side logging hooks.
pub(crate) const LOG_GLOBAL: &str = "__solcLog";

/// Routes emscripten's `print`/`printErr`, `console.*` and the `debugLog` hook into the
/// native log sink. Installed before the artifact runs so early output is captured too.
pub(crate) const HOST_HOOKS: &str = r#"
(function (global) {
  var sink = global.__solcLog;
  var emit = function () {
    var parts = [];
    for (var i = 0; i < arguments.length; i++) {
      parts.push(String(arguments[i]));
    }
    sink(parts.join(" "));
  };
  global.debugLog = emit;
  if (typeof global.print !== "function") {
    global.print = emit;
  }
  if (typeof global.printErr !== "function") {
    global.printErr = emit;
  }
  if (typeof global.console !== "object" || global.console === null) {
    global.console = { log: emit, info: emit, warn: emit, error: emit, debug: emit };
  }
})(globalThis);
"#;

/// Evaluates to `true` when the artifact exposes emscripten's `Module.cwrap`.
pub(crate) const HAS_CWRAP: &str =
  "typeof Module === 'object' && Module !== null && typeof Module.cwrap === 'function'";

/// A loaded compiler artifact.
///
/// Implementations are single-threaded and stateful; `&mut self` on every call keeps them
/// exclusive, and the session adds the lock that makes sharing across threads safe.
pub trait Engine: Send {
  fn version(&mut self) -> Result<String>;

  /// `None` when the artifact does not export a license entry point.
  fn license(&mut self) -> Result<Option<String>>;

  /// One standard JSON document in, one out.
  fn compile(&mut self, input: &str) -> Result<String>;

  /// Release the underlying engine. Must be idempotent.
  fn dispose(&mut self);
}

/// The export names an artifact was bound with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryPoints {
  pub version: &'static str,
  pub license: Option<&'static str>,
  pub compile: &'static str,
}

impl EntryPoints {
  /// Pick the first exported candidate for each call. `exports` answers whether the
  /// artifact exports a symbol (without emscripten's leading underscore).
  pub fn detect(mut exports: impl FnMut(&str) -> bool) -> Result<Self> {
    let mut pick = |candidates: &[&'static str]| {
      candidates.iter().copied().find(|name| exports(name))
    };

    let version =
      pick(VERSION_ENTRY_POINTS).ok_or_else(|| missing("version", VERSION_ENTRY_POINTS))?;
    let compile =
      pick(COMPILE_ENTRY_POINTS).ok_or_else(|| missing("compile", COMPILE_ENTRY_POINTS))?;
    let license = pick(LICENSE_ENTRY_POINTS);

    Ok(EntryPoints {
      version,
      license,
      compile,
    })
  }

  /// Script that stores `Module.cwrap` wrappers for these exports under [`BRIDGE_GLOBAL`]
  /// and evaluates to `true` when both required wrappers are callable.
  pub(crate) fn bridge_script(&self) -> String {
    let license = match self.license {
      Some(name) => format!("Module.cwrap('{name}', 'string', [])"),
      None => "null".to_string(),
    };
    format!(
      r#"
globalThis.{BRIDGE_GLOBAL} = {{
  version: Module.cwrap('{version}', 'string', []),
  license: {license},
  compile: Module.cwrap('{compile}', 'string', ['string'])
}};
typeof globalThis.{BRIDGE_GLOBAL}.version === 'function' &&
  typeof globalThis.{BRIDGE_GLOBAL}.compile === 'function';
"#,
      version = self.version,
      compile = self.compile,
    )
  }
}

/// Script evaluating to `true` when `Module` exports `_<symbol>` as a function.
pub(crate) fn export_check(symbol: &str) -> String {
  format!(
    "typeof Module === 'object' && Module !== null && typeof Module['_{symbol}'] === 'function'"
  )
}

fn missing(call: &str, candidates: &[&str]) -> Error {
  Error::Binding(format!(
    "artifact exports no {call} entry point (tried {})",
    candidates.join(", ")
  ))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn prefers_newer_export_names() {
    let exports = ["solidity_version", "version", "solidity_license", "solidity_compile"];
    let points = EntryPoints::detect(|name| exports.contains(&name)).unwrap();
    assert_eq!(
      points,
      EntryPoints {
        version: "solidity_version",
        license: Some("solidity_license"),
        compile: "solidity_compile",
      }
    );
  }

  #[test]
  fn falls_back_to_legacy_names_and_optional_license() {
    let exports = ["version", "compileStandard"];
    let points = EntryPoints::detect(|name| exports.contains(&name)).unwrap();
    assert_eq!(points.version, "version");
    assert_eq!(points.compile, "compileStandard");
    assert!(points.license.is_none());
  }

  #[test]
  fn missing_required_exports_fail_binding() {
    let err = EntryPoints::detect(|name| name == "solidity_version").unwrap_err();
    assert!(matches!(err, Error::Binding(ref message) if message.contains("compile")));

    let err = EntryPoints::detect(|_| false).unwrap_err();
    assert!(matches!(err, Error::Binding(ref message) if message.contains("version")));
  }

  #[test]
  fn detection_may_carry_mutable_state() {
    let mut asked = Vec::new();
    EntryPoints::detect(|name| {
      asked.push(name.to_string());
      name == "version" || name == "compileStandard"
    })
    .unwrap();
    assert_eq!(
      asked,
      vec![
        "solidity_version",
        "version",
        "solidity_compile",
        "compileStandard",
        "solidity_license",
        "license",
      ]
    );
  }

  #[test]
  fn bridge_script_binds_only_exported_license() {
    let script = EntryPoints {
      version: "version",
      license: None,
      compile: "compileStandard",
    }
    .bridge_script();
    assert!(script.contains("license: null"));
    assert!(script.contains("Module.cwrap('compileStandard', 'string', ['string'])"));
  }
}
