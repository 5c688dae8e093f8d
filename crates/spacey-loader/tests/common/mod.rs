//! Scripted host and converter used by the integration tests
//!
//! The host understands a line-oriented subset of classic module code:
//!
//! ```text
//! exports.NAME = <json | require("id") | require("id").NAME | require.resolve("id")>
//! module.exports = <same expressions>
//! require("id")
//! throw MESSAGE
//! // comment
//! ```
//!
//! The converter rewrites `export const`, `export default` and `import`
//! lines into that subset and drops type-only lines.

#![allow(dead_code)]

use regex::Regex;
use spacey_loader::{
    wrap_module, EngineError, Host, HostError, ModuleScope, TransformRequest, Transformer,
};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::LazyLock;

static EXPORT_CONST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^export\s+const\s+(\w+)(?:\s*:\s*[^=]+?)?\s*=\s*(.+?);?$").unwrap()
});
static EXPORT_DEFAULT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^export\s+default\s+(.+?);?$").unwrap());
static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^import\s+(?:.+\s+from\s+)?["']([^"']+)["'];?$"#).unwrap());
static ASSIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(exports\.(\w+)|module\.exports)\s*=\s*(.+?);?$").unwrap());
static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^require(\.resolve)?\(["']([^"']+)["']\)(?:\.(\w+))?;?$"#).unwrap()
});

/// Runtime value of the scripted host
#[derive(Clone)]
pub enum Val {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Arr(Vec<Val>),
    Obj(Rc<RefCell<BTreeMap<String, Val>>>),
}

impl Val {
    pub fn object() -> Self {
        Val::Obj(Rc::new(RefCell::new(BTreeMap::new())))
    }

    pub fn get(&self, key: &str) -> Option<Val> {
        match self {
            Val::Obj(map) => map.borrow().get(key).cloned(),
            _ => None,
        }
    }

    pub fn set(&self, key: &str, value: Val) {
        if let Val::Obj(map) = self {
            map.borrow_mut().insert(key.to_string(), value);
        }
    }

    pub fn keys(&self) -> Vec<String> {
        match self {
            Val::Obj(map) => map.borrow().keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Val::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Val::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn ptr_eq(&self, other: &Val) -> bool {
        match (self, other) {
            (Val::Obj(a), Val::Obj(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Val::Null,
            serde_json::Value::Bool(b) => Val::Bool(*b),
            serde_json::Value::Number(n) => Val::Num(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => Val::Str(s.clone()),
            serde_json::Value::Array(items) => Val::Arr(items.iter().map(Val::from_json).collect()),
            serde_json::Value::Object(map) => {
                let obj = Val::object();
                for (k, v) in map {
                    obj.set(k, Val::from_json(v));
                }
                obj
            }
        }
    }
}

// Shallow: objects may contain themselves through `default`.
impl fmt::Debug for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Null => write!(f, "null"),
            Val::Bool(b) => write!(f, "{b}"),
            Val::Num(n) => write!(f, "{n}"),
            Val::Str(s) => write!(f, "{s:?}"),
            Val::Arr(items) => write!(f, "[{} items]", items.len()),
            Val::Obj(_) => write!(f, "{{{}}}", self.keys().join(", ")),
        }
    }
}

#[derive(Debug, Clone)]
enum Expr {
    Literal(serde_json::Value),
    Require { id: String, field: Option<String> },
    Resolve(String),
}

#[derive(Debug, Clone)]
enum Stmt {
    ExportAssign(String, Expr),
    ModuleExports(Expr),
    Require(String),
    Throw(String),
}

/// Compiled module body
#[derive(Debug)]
pub struct Script(Vec<Stmt>);

fn parse_expr(raw: &str) -> Option<Expr> {
    if let Some(caps) = REQUIRE_RE.captures(raw) {
        let id = caps[2].to_string();
        return Some(if caps.get(1).is_some() {
            Expr::Resolve(id)
        } else {
            Expr::Require {
                id,
                field: caps.get(3).map(|m| m.as_str().to_string()),
            }
        });
    }
    serde_json::from_str(raw).ok().map(Expr::Literal)
}

fn parse(body: &str) -> Result<Vec<Stmt>, HostError> {
    let mut stmts = Vec::new();
    for line in body.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("//") || line == "\"use strict\";" {
            continue;
        }
        if let Some(msg) = line.strip_prefix("throw ") {
            stmts.push(Stmt::Throw(msg.trim_end_matches(';').to_string()));
            continue;
        }
        if let Some(caps) = ASSIGN_RE.captures(line) {
            let expr = parse_expr(&caps[3])
                .ok_or_else(|| HostError::syntax(format!("Unexpected token '{}'", &caps[3])))?;
            stmts.push(match caps.get(2) {
                Some(name) => Stmt::ExportAssign(name.as_str().to_string(), expr),
                None => Stmt::ModuleExports(expr),
            });
            continue;
        }
        if let Some(Expr::Require { id, field: None }) = parse_expr(line) {
            stmts.push(Stmt::Require(id));
            continue;
        }
        return Err(HostError::syntax(format!("Unexpected token '{}'", line)));
    }
    Ok(stmts)
}

/// Scripted host runtime
#[derive(Default)]
pub struct ToyHost {
    /// Files whose module body ran through `execute`, in order
    pub executed: RefCell<Vec<PathBuf>>,
    /// Requests handed to the native loader, in order
    pub native: RefCell<Vec<String>>,
}

impl ToyHost {
    pub fn executions_of(&self, name: &str) -> usize {
        self.executed
            .borrow()
            .iter()
            .filter(|p| p.file_name().is_some_and(|n| n == name))
            .count()
    }

    fn native_file(&self, path: &Path) -> Result<Val, HostError> {
        let source = std::fs::read_to_string(path).map_err(|e| HostError::thrown(e.to_string()))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !matches!(ext, "js" | "cjs" | "mjs" | "ts" | "mts" | "cts") {
            let exports = Val::object();
            exports.set("raw", Val::Str(source));
            return Ok(exports);
        }

        let exports = Val::object();
        for stmt in parse(&source)? {
            match stmt {
                Stmt::ExportAssign(name, Expr::Literal(value)) => {
                    exports.set(&name, Val::from_json(&value));
                }
                Stmt::Throw(msg) => return Err(HostError::thrown(msg)),
                _ => return Err(HostError::thrown("native loader cannot require")),
            }
        }
        Ok(exports)
    }

    fn eval(&self, expr: &Expr, scope: &ModuleScope<'_, Val>) -> Result<Val, HostError> {
        match expr {
            Expr::Literal(value) => Ok(Val::from_json(value)),
            Expr::Require { id, field } => {
                let value = scope.require.require(id)?;
                Ok(match field {
                    Some(field) => value.get(field).unwrap_or(Val::Null),
                    None => value,
                })
            }
            Expr::Resolve(id) => {
                let path = scope.require.resolve(id, None)?;
                Ok(Val::Str(path.display().to_string()))
            }
        }
    }
}

impl Host for ToyHost {
    type Value = Val;
    type Script = Script;

    fn is_builtin(&self, id: &str) -> bool {
        matches!(id, "fs" | "path")
    }

    fn require_native(&self, id: &str, _anchor: &Path) -> Result<Val, HostError> {
        self.native.borrow_mut().push(id.to_string());
        if self.is_builtin(id) {
            let exports = Val::object();
            exports.set("builtin", Val::Str(id.to_string()));
            return Ok(exports);
        }
        if id == ".pnp.js" {
            return Ok(Val::object());
        }
        self.native_file(Path::new(id))
    }

    fn new_exports(&self) -> Val {
        Val::object()
    }

    fn from_json(&self, value: &serde_json::Value) -> Val {
        Val::from_json(value)
    }

    fn set_default(&self, target: &Val, value: Val) {
        target.set("default", value);
    }

    fn interop_default(&self, value: &Val) -> Val {
        value.get("default").unwrap_or_else(|| value.clone())
    }

    fn compile(&self, _filename: &Path, wrapped: &str) -> Result<Script, HostError> {
        let envelope = wrap_module("");
        let (prefix, suffix) = envelope.split_at(envelope.len() - "\n});".len());
        let body = wrapped
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix))
            .ok_or_else(|| HostError::syntax("missing module envelope"))?;
        parse(body).map(Script)
    }

    fn execute(&self, script: &Script, scope: ModuleScope<'_, Val>) -> Result<(), HostError> {
        self.executed.borrow_mut().push(scope.filename.to_path_buf());
        for stmt in &script.0 {
            match stmt {
                Stmt::ExportAssign(name, expr) => {
                    let value = self.eval(expr, &scope)?;
                    scope.exports.set(name, value);
                }
                Stmt::ModuleExports(expr) => {
                    let value = self.eval(expr, &scope)?;
                    scope.module.set_exports(value);
                }
                Stmt::Require(id) => {
                    scope.require.require(id)?;
                }
                Stmt::Throw(msg) => return Err(HostError::thrown(msg.clone())),
            }
        }
        Ok(())
    }
}

/// Scripted conversion engine
#[derive(Clone, Default)]
pub struct ToyEngine {
    calls: Rc<Cell<usize>>,
}

impl ToyEngine {
    /// Shared invocation counter
    pub fn counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.calls)
    }
}

impl Transformer for ToyEngine {
    fn transform(&self, request: &TransformRequest<'_>) -> Result<String, EngineError> {
        self.calls.set(self.calls.get() + 1);
        let mut out = Vec::new();
        for (index, raw) in request.source.lines().enumerate() {
            let line = raw.trim();
            if let Some(column) = line.find("@@") {
                let (line_no, column) = (index as u32 + 1, column as u32);
                return Err(EngineError::new(format!(
                    "/: Unexpected token ({}:{})",
                    line_no, column
                ))
                .at(line_no, column)
                .with_code("TOY_PARSE_ERROR"));
            }
            if request.typescript
                && (line.starts_with("interface ")
                    || line.starts_with("type ")
                    || line.starts_with("declare "))
            {
                continue;
            }
            if let Some(caps) = EXPORT_CONST_RE.captures(line) {
                out.push(format!("exports.{} = {}", &caps[1], &caps[2]));
            } else if let Some(caps) = EXPORT_DEFAULT_RE.captures(line) {
                out.push(format!("exports.default = {}", &caps[1]));
            } else if let Some(caps) = IMPORT_RE.captures(line) {
                out.push(format!("require(\"{}\")", &caps[1]));
            } else {
                out.push(line.to_string());
            }
        }
        Ok(out.join("\n"))
    }
}
