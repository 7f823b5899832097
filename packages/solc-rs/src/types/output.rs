use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard JSON compiler output. Produced fresh for every compile call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Output {
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub errors: Vec<CompilerError>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub sources: BTreeMap<String, SourceOut>,
  /// File -> contract name -> artifacts.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub contracts: BTreeMap<String, BTreeMap<String, Contract>>,
}

impl Output {
  /// True when any diagnostic carries the `error` severity.
  pub fn has_errors(&self) -> bool {
    self
      .errors
      .iter()
      .any(|error| error.level() == Some(Severity::Error))
  }

  pub fn contract(&self, file: &str, name: &str) -> Option<&Contract> {
    self.contracts.get(file).and_then(|contracts| contracts.get(name))
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
  Error,
  Warning,
  Info,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerError {
  #[serde(rename = "type", default)]
  pub error_type: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub component: Option<String>,
  #[serde(default)]
  pub severity: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error_code: Option<String>,
  #[serde(default)]
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub formatted_message: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_location: Option<SourceLocation>,
}

impl CompilerError {
  /// Parsed severity; `None` for values this crate does not know about.
  pub fn level(&self) -> Option<Severity> {
    match self.severity.to_ascii_lowercase().as_str() {
      "error" => Some(Severity::Error),
      "warning" => Some(Severity::Warning),
      "info" => Some(Severity::Info),
      _ => None,
    }
  }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
  pub file: String,
  pub start: i64,
  pub end: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceOut {
  #[serde(default)]
  pub id: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ast: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Contract {
  #[serde(default)]
  pub abi: Vec<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata: Option<String>,
  #[serde(default)]
  pub evm: Evm,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evm {
  #[serde(default)]
  pub bytecode: Bytecode,
  #[serde(default)]
  pub deployed_bytecode: Bytecode,
  #[serde(default)]
  pub method_identifiers: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gas_estimates: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bytecode {
  #[serde(default)]
  pub object: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub opcodes: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_map: Option<String>,
  /// File -> library -> placeholder offsets.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub link_references: BTreeMap<String, BTreeMap<String, Vec<LinkReference>>>,
}

impl Bytecode {
  /// Decode the hex object. Fails for unlinked bytecode that still carries
  /// `__$...$__` placeholders.
  pub fn bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(self.object.trim_start_matches("0x"))
  }

  pub fn is_linked(&self) -> bool {
    self.link_references.is_empty()
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReference {
  pub start: u32,
  pub length: u32,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn sample_output() -> Value {
    json!({
      "errors": [
        {
          "type": "Warning",
          "component": "general",
          "severity": "warning",
          "message": "Unused variable.",
          "formattedMessage": "Warning: Unused variable.",
          "sourceLocation": { "file": "One.sol", "start": 10, "end": 20 }
        }
      ],
      "sources": { "One.sol": { "id": 0 } },
      "contracts": {
        "One.sol": {
          "One": {
            "abi": [{ "type": "function", "name": "one" }],
            "evm": {
              "bytecode": { "object": "6080", "sourceMap": "0:1:0" },
              "deployedBytecode": { "object": "0x6080" },
              "methodIdentifiers": { "one()": "901717d1" },
              "gasEstimates": { "creation": { "totalCost": "1" } }
            }
          }
        }
      }
    })
  }

  #[test]
  fn diagnostics_and_contracts_coexist() {
    let output: Output = serde_json::from_value(sample_output()).unwrap();
    assert!(!output.has_errors());
    assert_eq!(output.errors[0].level(), Some(Severity::Warning));

    let contract = output.contract("One.sol", "One").expect("contract");
    assert_eq!(contract.abi.len(), 1);
    assert_eq!(contract.evm.method_identifiers["one()"], "901717d1");
    assert_eq!(contract.evm.bytecode.bytes().unwrap(), vec![0x60, 0x80]);
    assert_eq!(contract.evm.deployed_bytecode.bytes().unwrap(), vec![0x60, 0x80]);
    assert!(contract.evm.bytecode.is_linked());
  }

  #[test]
  fn error_severity_is_reported_as_data() {
    let output: Output = serde_json::from_value(json!({
      "errors": [{ "type": "ParserError", "severity": "error", "message": "Expected ';'" }]
    }))
    .unwrap();
    assert!(output.has_errors());
    assert!(output.contracts.is_empty());
  }

  #[test]
  fn unlinked_bytecode_reports_references() {
    let bytecode: Bytecode = serde_json::from_value(json!({
      "object": "73__$abc$__",
      "linkReferences": { "Lib.sol": { "Lib": [{ "start": 1, "length": 20 }] } }
    }))
    .unwrap();
    assert!(!bytecode.is_linked());
    assert!(bytecode.bytes().is_err());
  }
}
