use rquickjs::context::EvalOptions;
use rquickjs::{CatchResultExt, Context, Ctx, Function, Object, Runtime};
use tracing::{debug, trace};

use super::{export_check, EntryPoints, Engine, BRIDGE_GLOBAL, HAS_CWRAP, HOST_HOOKS, LOG_GLOBAL};
use crate::artifact::CompilerArtifact;
use crate::errors::{engine_error, Error, Result};

/// Owned QuickJS runtime and context. Field order matters: the context drops first.
struct Instance {
  context: Context,
  #[allow(dead_code)]
  runtime: Runtime,
}

/// A soljson build loaded into its own QuickJS runtime.
///
/// QuickJS has no `WebAssembly`, so only asm.js builds of soljson can be evaluated here.
pub struct QuickJsEngine {
  instance: Option<Instance>,
  entry_points: EntryPoints,
}

impl QuickJsEngine {
  pub fn new(artifact: &CompilerArtifact, debug: bool) -> Result<Self> {
    Self::from_source(artifact.source(), debug)
  }

  /// Evaluate `source` in a fresh runtime and bind its compiler entry points.
  pub fn from_source(source: &str, debug: bool) -> Result<Self> {
    if source.trim().is_empty() {
      return Err(Error::EngineInit("soljson source cannot be empty".into()));
    }

    let runtime = Runtime::new()
      .map_err(|err| Error::EngineInit(format!("failed to create runtime: {err}")))?;
    let context = Context::full(&runtime)
      .map_err(|err| Error::EngineInit(format!("failed to create context: {err}")))?;

    let entry_points = context.with(|ctx| -> Result<EntryPoints> {
      install_host_hooks(&ctx, debug)?;

      let mut options = EvalOptions::default();
      options.strict = false;
      ctx
        .eval_with_options::<(), _>(source, options)
        .catch(&ctx)
        .map_err(|err| Error::EngineInit(format!("failed to execute soljson.js: {err}")))?;

      let entry_points = EntryPoints::detect(|symbol| is_exported(&ctx, symbol))?;
      bind_entry_points(&ctx, &entry_points)?;
      Ok(entry_points)
    })?;

    debug!(
      version = entry_points.version,
      license = ?entry_points.license,
      compile = entry_points.compile,
      "bound soljson entry points"
    );

    Ok(Self {
      instance: Some(Instance { context, runtime }),
      entry_points,
    })
  }

  pub fn entry_points(&self) -> EntryPoints {
    self.entry_points
  }

  fn call<R>(
    &self,
    operation: &'static str,
    invoke: impl for<'js> FnOnce(&Ctx<'js>, Object<'js>) -> rquickjs::Result<R>,
  ) -> Result<R> {
    let instance = self
      .instance
      .as_ref()
      .ok_or_else(|| engine_error(operation, "engine has been disposed"))?;

    trace!(operation, "engine bridge call");
    instance.context.with(|ctx| {
      let bridge: Object = ctx
        .globals()
        .get(BRIDGE_GLOBAL)
        .catch(&ctx)
        .map_err(|err| engine_error(operation, err))?;
      invoke(&ctx, bridge)
        .catch(&ctx)
        .map_err(|err| engine_error(operation, err))
    })
  }
}

impl Engine for QuickJsEngine {
  fn version(&mut self) -> Result<String> {
    self.call("version", |_, bridge| {
      let version: Function = bridge.get("version")?;
      version.call(())
    })
  }

  fn license(&mut self) -> Result<Option<String>> {
    if self.entry_points.license.is_none() {
      return Ok(None);
    }
    self.call("license", |_, bridge| {
      let license: Option<Function> = bridge.get("license")?;
      match license {
        Some(license) => license.call(()).map(Some),
        None => Ok(None),
      }
    })
  }

  fn compile(&mut self, input: &str) -> Result<String> {
    self.call("compile", |_, bridge| {
      let compile: Function = bridge.get("compile")?;
      compile.call((input,))
    })
  }

  fn dispose(&mut self) {
    if self.instance.take().is_some() {
      debug!("disposed soljson engine");
    }
  }
}

impl Drop for QuickJsEngine {
  fn drop(&mut self) {
    self.dispose();
  }
}

fn install_host_hooks(ctx: &Ctx<'_>, debug: bool) -> Result<()> {
  let hook_error = |err: String| Error::EngineInit(format!("failed to install host hooks: {err}"));

  let sink = Function::new(ctx.clone(), move |message: String| {
    if debug {
      debug!(target: "embedded_solc::js", "JS DEBUG: {message}");
    }
  })
  .map_err(|err| hook_error(err.to_string()))?;
  ctx
    .globals()
    .set(LOG_GLOBAL, sink)
    .map_err(|err| hook_error(err.to_string()))?;
  ctx
    .eval::<(), _>(HOST_HOOKS)
    .catch(ctx)
    .map_err(|err| hook_error(err.to_string()))
}

fn is_exported(ctx: &Ctx<'_>, symbol: &str) -> bool {
  ctx.eval::<bool, _>(export_check(symbol)).unwrap_or(false)
}

fn bind_entry_points(ctx: &Ctx<'_>, entry_points: &EntryPoints) -> Result<()> {
  let has_cwrap = ctx.eval::<bool, _>(HAS_CWRAP).unwrap_or(false);
  if !has_cwrap {
    return Err(Error::Binding(
      "artifact does not expose Module.cwrap".into(),
    ));
  }

  let bound = ctx
    .eval::<bool, _>(entry_points.bridge_script())
    .catch(ctx)
    .map_err(|err| Error::Binding(err.to_string()))?;
  if !bound {
    return Err(Error::Binding(
      "Module.cwrap did not return callable entry points".into(),
    ));
  }
  Ok(())
}
