mod input;
mod output;
mod settings;

pub use input::{Input, SourceIn, DEFAULT_LANGUAGE};
pub use output::{
  Bytecode, CompilerError, Contract, Evm, LinkReference, Output, Severity, SourceLocation,
  SourceOut,
};
pub use settings::{Optimizer, OutputSelection, Settings};
