use napi::bindgen_prelude::*;
use napi::{Env, JsFunction, JsUnknown, ValueType};
use serde_json::Value;

use crate::errors::{map_napi_error, napi_error};
use crate::resolver::ImportResult;
use crate::session::Solc;

/// Node handle over a [`Solc`] session. Import callbacks run synchronously on the calling
/// JS thread while the session lock is held.
#[napi(js_name = "Solc")]
pub struct JsSolc {
  inner: Solc,
}

#[napi]
impl JsSolc {
  #[napi(constructor, ts_args_type = "soljson: string")]
  pub fn new(soljson: String) -> napi::Result<Self> {
    Ok(Self {
      inner: Solc::new(&soljson)?,
    })
  }

  #[napi(factory, ts_args_type = "version: string")]
  pub fn with_version(version: String) -> napi::Result<Self> {
    Ok(Self {
      inner: Solc::with_version(&version)?,
    })
  }

  #[napi]
  pub fn version(&self) -> String {
    self.inner.version()
  }

  #[napi]
  pub fn license(&self) -> String {
    self.inner.license()
  }

  #[napi(
    ts_args_type = "input: string, importCallback?: (path: string) => { contents?: string; error?: string }",
    ts_return_type = "object"
  )]
  pub fn compile(
    &self,
    env: Env,
    input: String,
    import_callback: Option<JsFunction>,
  ) -> napi::Result<Value> {
    let output = match import_callback {
      Some(callback) => {
        let mut resolve = |path: &str| {
          call_import_callback(&env, &callback, path)
            .unwrap_or_else(|err| ImportResult::error(err.reason))
        };
        self.inner.compile_json(&input, Some(&mut resolve))?
      }
      None => self.inner.compile_json(&input, None)?,
    };
    map_napi_error(serde_json::to_value(&output), "failed to convert compiler output")
  }

  #[napi]
  pub fn close(&self) -> napi::Result<()> {
    Ok(self.inner.close()?)
  }

  #[napi(getter)]
  pub fn is_closed(&self) -> bool {
    self.inner.is_closed()
  }
}

fn call_import_callback(env: &Env, callback: &JsFunction, path: &str) -> napi::Result<ImportResult> {
  let argument = env.create_string(path)?;
  let result: JsUnknown = callback.call(None, &[argument])?;
  match result.get_type()? {
    ValueType::Object => env.from_js_value(result),
    ValueType::String => {
      let contents = result.coerce_to_string()?.into_utf8()?.into_owned()?;
      Ok(ImportResult::contents(contents))
    }
    other => Err(napi_error(format!(
      "import callback for {path} returned {other:?}, expected {{ contents }} or {{ error }}"
    ))),
  }
}
