use std::sync::{mpsc, Once};
use std::thread::{self, JoinHandle};

use tracing::{debug, trace, warn};

use super::{export_check, EntryPoints, Engine, BRIDGE_GLOBAL, HAS_CWRAP, HOST_HOOKS, LOG_GLOBAL};
use crate::artifact::CompilerArtifact;
use crate::errors::{engine_error, Error, Result};

/// soljson's emscripten runtime recurses deeply while compiling.
const WORKER_STACK_SIZE: usize = 8 << 20;

static PLATFORM: Once = Once::new();

fn init_platform() {
  PLATFORM.call_once(|| {
    let platform = v8::new_default_platform(0, false).make_shared();
    v8::V8::initialize_platform(platform);
    v8::V8::initialize();
  });
}

enum Request {
  Version(mpsc::Sender<Result<String>>),
  License(mpsc::Sender<Result<Option<String>>>),
  Compile(String, mpsc::Sender<Result<String>>),
}

/// A soljson build loaded into a V8 isolate, including the WebAssembly builds.
///
/// Isolates are pinned to the thread that created them, so each engine owns one worker
/// thread and every call is a request to it.
pub struct V8Engine {
  requests: Option<mpsc::Sender<Request>>,
  worker: Option<JoinHandle<()>>,
  entry_points: EntryPoints,
}

impl V8Engine {
  pub fn new(artifact: &CompilerArtifact, debug: bool) -> Result<Self> {
    Self::from_source(artifact.source(), debug)
  }

  /// Evaluate `source` in a fresh isolate and bind its compiler entry points.
  pub fn from_source(source: &str, debug: bool) -> Result<Self> {
    if source.trim().is_empty() {
      return Err(Error::EngineInit("soljson source cannot be empty".into()));
    }
    init_platform();

    let source = source.to_owned();
    let (requests, inbox) = mpsc::channel();
    let (ready, startup) = mpsc::channel();
    let worker = thread::Builder::new()
      .name("solc-v8".into())
      .stack_size(WORKER_STACK_SIZE)
      .spawn(move || run_worker(&source, debug, inbox, ready))
      .map_err(|err| Error::EngineInit(format!("failed to spawn engine thread: {err}")))?;

    let entry_points = match startup.recv() {
      Ok(Ok(entry_points)) => entry_points,
      Ok(Err(err)) => {
        let _ = worker.join();
        return Err(err);
      }
      Err(_) => {
        let _ = worker.join();
        return Err(Error::EngineInit("engine thread exited during startup".into()));
      }
    };

    debug!(
      version = entry_points.version,
      license = ?entry_points.license,
      compile = entry_points.compile,
      "bound soljson entry points"
    );

    Ok(Self {
      requests: Some(requests),
      worker: Some(worker),
      entry_points,
    })
  }

  pub fn entry_points(&self) -> EntryPoints {
    self.entry_points
  }

  fn request<R>(
    &self,
    operation: &'static str,
    build: impl FnOnce(mpsc::Sender<Result<R>>) -> Request,
  ) -> Result<R> {
    let requests = self
      .requests
      .as_ref()
      .ok_or_else(|| engine_error(operation, "engine has been disposed"))?;

    trace!(operation, "engine bridge call");
    let (reply, response) = mpsc::channel();
    requests
      .send(build(reply))
      .map_err(|_| engine_error(operation, "engine thread has stopped"))?;
    response
      .recv()
      .map_err(|_| engine_error(operation, "engine thread has stopped"))?
  }
}

impl Engine for V8Engine {
  fn version(&mut self) -> Result<String> {
    self.request("version", Request::Version)
  }

  fn license(&mut self) -> Result<Option<String>> {
    if self.entry_points.license.is_none() {
      return Ok(None);
    }
    self.request("license", Request::License)
  }

  fn compile(&mut self, input: &str) -> Result<String> {
    self.request("compile", |reply| Request::Compile(input.to_owned(), reply))
  }

  fn dispose(&mut self) {
    self.requests.take();
    if let Some(worker) = self.worker.take() {
      if worker.join().is_err() {
        warn!("soljson engine thread panicked");
      }
      debug!("disposed soljson engine");
    }
  }
}

impl Drop for V8Engine {
  fn drop(&mut self) {
    self.dispose();
  }
}

fn run_worker(
  source: &str,
  debug: bool,
  inbox: mpsc::Receiver<Request>,
  ready: mpsc::Sender<Result<EntryPoints>>,
) {
  let mut isolate = v8::Isolate::new(v8::CreateParams::default());
  let context = match load(&mut isolate, source, debug) {
    Ok((context, entry_points)) => {
      if ready.send(Ok(entry_points)).is_err() {
        return;
      }
      context
    }
    Err(err) => {
      let _ = ready.send(Err(err));
      return;
    }
  };

  let scope = &mut v8::HandleScope::with_context(&mut isolate, &context);
  for request in inbox {
    let call_scope = &mut v8::HandleScope::new(scope);
    match request {
      Request::Version(reply) => {
        let _ = reply.send(call_string(call_scope, "version", &[]));
      }
      Request::License(reply) => {
        let _ = reply.send(call_bridge(call_scope, "license", &[]));
      }
      Request::Compile(input, reply) => {
        let _ = reply.send(call_string(call_scope, "compile", &[&input]));
      }
    }
  }
}

fn load(
  isolate: &mut v8::OwnedIsolate,
  source: &str,
  debug: bool,
) -> Result<(v8::Global<v8::Context>, EntryPoints)> {
  let scope = &mut v8::HandleScope::new(isolate);
  let context = v8::Context::new(scope);
  let scope = &mut v8::ContextScope::new(scope, context);

  install_host_hooks(scope, debug)?;
  evaluate(scope, source)
    .map_err(|err| Error::EngineInit(format!("failed to execute soljson.js: {err}")))?;
  scope.perform_microtask_checkpoint();

  let entry_points =
    EntryPoints::detect(|symbol| evaluate(scope, &export_check(symbol)).unwrap_or(false))?;
  bind_entry_points(scope, &entry_points)?;
  Ok((v8::Global::new(scope, context), entry_points))
}

fn log_sink(
  scope: &mut v8::HandleScope,
  args: v8::FunctionCallbackArguments,
  _: v8::ReturnValue,
) {
  let message = args.get(0).to_rust_string_lossy(scope);
  debug!(target: "embedded_solc::js", "JS DEBUG: {message}");
}

fn install_host_hooks(scope: &mut v8::HandleScope, debug: bool) -> Result<()> {
  let hook_error = |err: String| Error::EngineInit(format!("failed to install host hooks: {err}"));

  if debug {
    let sink = v8::Function::new(scope, log_sink)
      .ok_or_else(|| hook_error("cannot create log sink".into()))?;
    let key = v8::String::new(scope, LOG_GLOBAL)
      .ok_or_else(|| hook_error("cannot allocate global name".into()))?;
    let global = scope.get_current_context().global(scope);
    global.set(scope, key.into(), sink.into());
  } else {
    evaluate(scope, &format!("globalThis.{LOG_GLOBAL} = function () {{}};"))
      .map_err(hook_error)?;
  }
  evaluate(scope, HOST_HOOKS).map(drop).map_err(hook_error)
}

fn bind_entry_points(scope: &mut v8::HandleScope, entry_points: &EntryPoints) -> Result<()> {
  if !evaluate(scope, HAS_CWRAP).unwrap_or(false) {
    return Err(Error::Binding(
      "artifact does not expose Module.cwrap".into(),
    ));
  }

  let bound = evaluate(scope, &entry_points.bridge_script()).map_err(Error::Binding)?;
  if !bound {
    return Err(Error::Binding(
      "Module.cwrap did not return callable entry points".into(),
    ));
  }
  Ok(())
}

/// Run `code` as a classic script; `Ok(true)` only when it evaluates to `true`.
fn evaluate(scope: &mut v8::HandleScope, code: &str) -> std::result::Result<bool, String> {
  let scope = &mut v8::TryCatch::new(scope);
  let code = v8::String::new(scope, code).ok_or_else(|| "script is too large".to_string())?;
  match v8::Script::compile(scope, code, None).and_then(|script| script.run(scope)) {
    Some(value) => Ok(value.is_true()),
    None => Err(exception_message(scope)),
  }
}

fn exception_message(scope: &mut v8::TryCatch<v8::HandleScope>) -> String {
  match scope.exception() {
    Some(exception) => exception.to_rust_string_lossy(scope),
    None => "execution terminated".to_string(),
  }
}

fn call_string(scope: &mut v8::HandleScope, operation: &'static str, args: &[&str]) -> Result<String> {
  call_bridge(scope, operation, args)?
    .ok_or_else(|| engine_error(operation, "entry point is not bound"))
}

/// Call `<bridge>.<operation>(...args)`. `None` when the bridge slot holds no function.
fn call_bridge(
  scope: &mut v8::HandleScope,
  operation: &'static str,
  args: &[&str],
) -> Result<Option<String>> {
  let scope = &mut v8::TryCatch::new(scope);
  let global = scope.get_current_context().global(scope);
  let bridge = property(scope, global, BRIDGE_GLOBAL)
    .and_then(|value| v8::Local::<v8::Object>::try_from(value).ok())
    .ok_or_else(|| engine_error(operation, "bridge object is missing"))?;
  let function = match property(scope, bridge, operation) {
    Some(value) if value.is_function() => v8::Local::<v8::Function>::try_from(value)
      .map_err(|err| engine_error(operation, err))?,
    _ => return Ok(None),
  };

  let mut argv = Vec::with_capacity(args.len());
  for arg in args {
    let arg = v8::String::new(scope, arg)
      .ok_or_else(|| engine_error(operation, "argument is too large"))?;
    argv.push(arg.into());
  }

  let receiver = v8::undefined(scope).into();
  match function.call(scope, receiver, &argv) {
    Some(value) => Ok(Some(value.to_rust_string_lossy(scope))),
    None => Err(engine_error(operation, exception_message(scope))),
  }
}

fn property<'s>(
  scope: &mut v8::HandleScope<'s>,
  object: v8::Local<'s, v8::Object>,
  key: &str,
) -> Option<v8::Local<'s, v8::Value>> {
  let key = v8::String::new(scope, key)?;
  object.get(scope, key.into())
}
