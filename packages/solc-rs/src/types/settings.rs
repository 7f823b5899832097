use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `file -> contract -> [selector, ...]`; `"*"` matches every file or contract.
pub type OutputSelection = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Compiler settings forwarded to solc's standard JSON interface.
///
/// Only the fields this crate reads or defaults are typed; anything else supplied by the
/// caller is kept in [`Settings::extra`] and passed through unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
  #[serde(default)]
  pub optimizer: Optimizer,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub evm_version: Option<String>,
  #[serde(default)]
  pub output_selection: OutputSelection,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub remappings: Option<Vec<String>>,
  #[serde(rename = "viaIR", skip_serializing_if = "Option::is_none")]
  pub via_ir: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub libraries: Option<BTreeMap<String, BTreeMap<String, String>>>,
  #[serde(flatten)]
  pub extra: BTreeMap<String, Value>,
}

impl Settings {
  /// Request `selectors` for every contract in every file.
  pub fn select_all(mut self, selectors: &[&str]) -> Self {
    self.output_selection.insert(
      "*".to_string(),
      BTreeMap::from([(
        "*".to_string(),
        selectors.iter().map(|s| s.to_string()).collect(),
      )]),
    );
    self
  }

  pub fn with_optimizer(mut self, enabled: bool, runs: u32) -> Self {
    self.optimizer = Optimizer { enabled, runs };
    self
  }

  pub fn with_evm_version(mut self, evm_version: impl Into<String>) -> Self {
    self.evm_version = Some(evm_version.into());
    self
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Optimizer {
  #[serde(default)]
  pub enabled: bool,
  #[serde(default = "default_runs")]
  pub runs: u32,
}

impl Default for Optimizer {
  fn default() -> Self {
    Optimizer {
      enabled: false,
      runs: default_runs(),
    }
  }
}

fn default_runs() -> u32 {
  200
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn serializes_with_solc_field_names() {
    let settings = Settings::default()
      .with_optimizer(true, 200)
      .with_evm_version("byzantium")
      .select_all(&["abi", "evm.bytecode"]);
    let value = serde_json::to_value(&settings).unwrap();
    assert_eq!(
      value,
      json!({
        "optimizer": { "enabled": true, "runs": 200 },
        "evmVersion": "byzantium",
        "outputSelection": { "*": { "*": ["abi", "evm.bytecode"] } }
      })
    );
  }

  #[test]
  fn unknown_settings_pass_through() {
    let raw = json!({
      "optimizer": { "enabled": false, "runs": 1 },
      "outputSelection": {},
      "metadata": { "bytecodeHash": "none" },
      "viaIR": true
    });
    let settings: Settings = serde_json::from_value(raw.clone()).unwrap();
    assert_eq!(settings.via_ir, Some(true));
    assert!(settings.extra.contains_key("metadata"));
    assert_eq!(serde_json::to_value(&settings).unwrap(), raw);
  }
}
