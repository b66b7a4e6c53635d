//! The public `Engine` interface.
//!
//! An engine owns one heap, one scope arena, one event loop, and one module
//! cache. `evaluate` parses and runs source synchronously, draining
//! microtasks but abandoning timers; `run` keeps draining both queues until
//! idle and then reports unhandled rejections once.

use ahash::AHashMap;

use crate::{
    builtins,
    error::{EngineError, ErrorKind, ParseError, RunError, RuntimeError, StackFrame},
    eval::{Interp, SymbolTable},
    event_loop::{EventLoop, Job},
    heap::{Heap, HeapData},
    host::{HostFn, HostValue, from_host_value, to_host_value},
    intern::{HostFnId, Interns},
    io::{ConsoleWriter, StdConsole},
    modules::ModuleMap,
    scope::{ScopeId, Scopes},
    types::{ClassTag, JsObject, ObjectPayload, PromiseState, PropKey, Property},
    value::Value,
};

/// An embeddable JavaScript engine instance.
///
/// # Example
/// ```
/// use krait::{Engine, HostValue};
///
/// let mut engine = Engine::new();
/// let result = engine.evaluate("(function(){ return (1 + 2) * 3; })();").unwrap();
/// assert_eq!(result, HostValue::Int(9));
/// ```
pub struct Engine {
    interp: Interp,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Constructs an engine with the standard globals and empty host state.
    #[must_use]
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let realm = builtins::create_realm(&mut heap);
        let mut interp = Interp {
            heap,
            interns: Interns::new(),
            scopes: Scopes::new(),
            funcs: Vec::new(),
            symbols: SymbolTable::new(),
            realm,
            event_loop: EventLoop::new(),
            modules: ModuleMap::new(),
            host_fns: Vec::new(),
            module_resolver: None,
            console: Box::new(StdConsole),
            resume_slots: Vec::new(),
            call_stack: Vec::new(),
            ctor_stack: Vec::new(),
            ir_cache: AHashMap::new(),
            script_path: "main.js".to_owned(),
            unhandled_hook: None,
        };
        builtins::install_globals(&mut interp);
        Self { interp }
    }

    /// Adds or replaces a binding on the global object.
    pub fn set_global(&mut self, name: &str, value: HostValue) {
        let v = from_host_value(&mut self.interp, value);
        let key = crate::types::PropKey::Str(self.interp.interns.intern(name));
        let global = self.interp.realm.global_obj;
        self.interp.heap.object_mut(global).set_data(key, v);
    }

    /// Registers a host-callable function under a global name.
    pub fn set_global_function(
        &mut self,
        name: &str,
        handler: impl FnMut(Vec<HostValue>) -> Result<HostValue, String> + 'static,
    ) {
        self.install_host_fn(name, HostFn::Plain(Box::new(handler)));
    }

    /// Two-arity form: the handler also receives the call's `this`.
    pub fn set_global_function_with_this(
        &mut self,
        name: &str,
        handler: impl FnMut(HostValue, Vec<HostValue>) -> Result<HostValue, String> + 'static,
    ) {
        self.install_host_fn(name, HostFn::WithThis(Box::new(handler)));
    }

    fn install_host_fn(&mut self, name: &str, f: HostFn) {
        let id = HostFnId(u32::try_from(self.interp.host_fns.len()).expect("host fn table overflow"));
        self.interp.host_fns.push(f);
        let proto = self.interp.realm.function_proto;
        let mut obj = JsObject::with_payload(ClassTag::Function, Some(proto), ObjectPayload::HostFn(id));
        let name_key = PropKey::Str(self.interp.interns.intern("name"));
        let name_val = Value::Str(self.interp.interns.intern(name));
        obj.define(name_key, Property::method(name_val));
        let fn_val = Value::Ref(self.interp.heap.alloc_object(obj));
        let key = PropKey::Str(self.interp.interns.intern(name));
        let global = self.interp.realm.global_obj;
        self.interp.heap.object_mut(global).set_data(key, fn_val);
    }

    /// Supplies module source resolution for `import`.
    pub fn set_module_loader(&mut self, resolver: impl FnMut(&str) -> Option<String> + 'static) {
        self.interp.module_resolver = Some(Box::new(resolver));
    }

    /// Replaces the console sink (default: process stdout/stderr).
    pub fn set_console(&mut self, console: Box<dyn ConsoleWriter>) {
        self.interp.console = console;
    }

    /// Registers the unhandled-rejection hook; without one, rejections are
    /// logged to the console sink and ignored.
    pub fn on_unhandled_rejection(&mut self, hook: impl FnMut(HostValue) + 'static) {
        self.interp.unhandled_hook = Some(Box::new(hook));
    }

    /// Sets the script path used in stack frames.
    pub fn set_script_path(&mut self, path: &str) {
        self.interp.script_path = path.to_owned();
    }

    /// Parses and executes synchronously; drains microtasks but not timers.
    /// Returns the completion value of the last expression statement.
    pub fn evaluate(&mut self, source: &str) -> Result<HostValue, EngineError> {
        let value = self.eval_source(source)?;
        self.drain_microtasks().map_err(|e| self.map_error(e))?;
        Ok(to_host_value(&self.interp, value, 0))
    }

    /// Like [`Engine::evaluate`], but keeps draining microtasks and timers
    /// until both queues are idle, then reports unhandled rejections.
    pub fn run(&mut self, source: &str) -> Result<HostValue, EngineError> {
        let value = self.eval_source(source)?;
        self.run_to_idle().map_err(|e| self.map_error(e))?;
        self.report_unhandled_rejections();
        Ok(to_host_value(&self.interp, value, 0))
    }

    fn eval_source(&mut self, source: &str) -> Result<Value, EngineError> {
        let func_start = self.interp.funcs.len();
        let mut program = crate::parse::parse_program(source, &mut self.interp.interns, &mut self.interp.funcs)?;
        crate::fold::fold_program(&mut program, &mut self.interp.funcs[func_start..], &mut self.interp.interns);
        self.interp
            .eval_program(&program, ScopeId::GLOBAL)
            .map_err(|e| self.map_error(e))
    }

    fn drain_microtasks(&mut self) -> Result<(), RunError> {
        while let Some(job) = self.interp.event_loop.pop_micro() {
            match job {
                Job::Reaction { reaction, value } => {
                    builtins::promise::run_reaction(&mut self.interp, reaction, value)?;
                }
            }
        }
        Ok(())
    }

    fn run_to_idle(&mut self) -> Result<(), RunError> {
        loop {
            self.drain_microtasks()?;
            let Some(timer) = self.interp.event_loop.pop_due_timer() else {
                break;
            };
            // A throw from a macrotask surfaces as an engine-level error.
            self.interp
                .call_value(timer.callback, Value::Undefined, &timer.args)?;
            self.interp.event_loop.requeue_interval(&timer);
        }
        Ok(())
    }

    fn report_unhandled_rejections(&mut self) {
        let pending = std::mem::take(&mut self.interp.event_loop.pending_rejections);
        for promise in pending {
            let reason = match self.interp.heap.get(promise) {
                HeapData::Object(obj) => match &obj.payload {
                    ObjectPayload::Promise(data) if !data.handled => match data.state {
                        PromiseState::Rejected(reason) => Some(reason),
                        _ => None,
                    },
                    _ => None,
                },
                _ => None,
            };
            let Some(reason) = reason else { continue };
            let host_reason = to_host_value(&self.interp, reason, 0);
            if let Some(mut hook) = self.interp.unhandled_hook.take() {
                hook(host_reason);
                self.interp.unhandled_hook = Some(hook);
            } else {
                let text = builtins::console::display_value(&mut self.interp, reason, 1)
                    .unwrap_or_else(|_| "<unprintable>".to_owned());
                self.interp
                    .console
                    .write_line(crate::io::ConsoleStream::Error, &format!("Unhandled promise rejection: {text}"));
            }
        }
    }

    /// Converts an internal error to the public taxonomy.
    fn map_error(&mut self, error: RunError) -> EngineError {
        match error {
            RunError::NotSupported(feature) => EngineError::NotSupported { feature },
            RunError::ModuleNotFound(path) => EngineError::ModuleNotFound { path },
            RunError::Parse(e) => EngineError::Parse(e),
            RunError::Throw(value) => EngineError::Runtime(self.classify_thrown(value)),
        }
    }

    fn classify_thrown(&mut self, value: Value) -> RuntimeError {
        // Error objects carry name/message/stack; anything else stringifies.
        if value.is_object(&self.interp.heap) {
            let name_key = PropKey::Str(self.interp.interns.intern("name"));
            let msg_key = PropKey::Str(self.interp.interns.intern("message"));
            let stack_key = PropKey::Str(self.interp.interns.intern("stack"));
            let name = self
                .interp
                .get_property(value, name_key)
                .ok()
                .and_then(|v| self.interp.string_content(v));
            if let Some(name) = name {
                let kind = name.parse::<ErrorKind>().unwrap_or(ErrorKind::Error);
                let message = self
                    .interp
                    .get_property(value, msg_key)
                    .ok()
                    .and_then(|v| self.interp.string_content(v))
                    .unwrap_or_default();
                let stack = self
                    .interp
                    .get_property(value, stack_key)
                    .ok()
                    .and_then(|v| self.interp.string_content(v))
                    .unwrap_or_default();
                return RuntimeError {
                    kind,
                    message,
                    script_stack: parse_stack_frames(&stack),
                };
            }
        }
        let message = self
            .interp
            .to_string_value(value)
            .unwrap_or_else(|_| "<unprintable thrown value>".to_owned());
        RuntimeError {
            kind: ErrorKind::Error,
            message,
            script_stack: Vec::new(),
        }
    }
}

/// Parses `at <fn> (<path>:<line>:<col>)` lines back into frames.
fn parse_stack_frames(stack: &str) -> Vec<StackFrame> {
    let mut frames = Vec::new();
    for line in stack.lines().skip(1) {
        let line = line.trim();
        let Some(rest) = line.strip_prefix("at ") else { continue };
        let Some((function, location)) = rest.split_once(" (") else { continue };
        let Some(location) = location.strip_suffix(')') else { continue };
        let mut parts = location.rsplitn(3, ':');
        let col = parts.next().and_then(|c| c.parse().ok()).unwrap_or(0);
        let line_no = parts.next().and_then(|l| l.parse().ok()).unwrap_or(0);
        let path = parts.next().unwrap_or("").to_owned();
        frames.push(StackFrame {
            function: function.to_owned(),
            path,
            line: line_no,
            col,
        });
    }
    frames
}

/// Convenience: parse-only check used by embedders and the CLI.
pub fn check_syntax(source: &str) -> Result<(), ParseError> {
    let mut interns = Interns::new();
    let mut funcs = Vec::new();
    crate::parse::parse_program(source, &mut interns, &mut funcs).map(|_| ())
}
