//! Compile Solidity with version-pinned `soljson.js` builds running in an embedded
//! JavaScript engine, resolving missing imports through a caller-supplied callback.

#[cfg(feature = "node")]
#[macro_use]
extern crate napi_derive;

pub mod artifact;
mod config;
pub mod engine;
mod errors;
#[cfg(feature = "node")]
mod node;
mod resolver;
mod session;
mod types;

pub use artifact::{
  normalize_version, ArtifactOrigin, ArtifactStore, BundledArtifacts, CompilerArtifact,
  VersionCatalog,
};
pub use config::{
  debug_enabled, SolcConfig, DEFAULT_BINARIES_URL, DEFAULT_MAX_IMPORT_DEPTH, ENV_BINARIES_URL,
  ENV_CACHE_DIR, ENV_DEBUG,
};
pub use engine::{DefaultEngine, Engine, QuickJsEngine};
#[cfg(feature = "v8")]
pub use engine::V8Engine;
pub use errors::{ArtifactError, Error, ResolveError, Result};
#[cfg(feature = "node")]
pub use node::JsSolc;
pub use resolver::{
  clean_path, find_imports, resolve_import_path, ImportCallback, ImportResolver, ImportResult,
};
pub use session::Solc;
pub use types::{
  Bytecode, CompilerError, Contract, Evm, Input, LinkReference, Optimizer, Output,
  OutputSelection, Settings, Severity, SourceIn, SourceLocation, SourceOut, DEFAULT_LANGUAGE,
};
