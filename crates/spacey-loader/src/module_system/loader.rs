// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module loader - resolves, converts and executes modules
//!
//! A load runs synchronously to completion. Every top-level [`Loader::load`]
//! opens a fresh pending map; nested requests issued by a running module go
//! through a [`Require`] bound to that module and share the map, so a cycle
//! returns the in-flight module's exports instead of running it again.

use crate::config::{EnvSnapshot, LoaderConfig, LoaderOptions};
use crate::error::{ConversionError, HostError, LoaderError, Result};
use crate::host::{Host, ModuleScope, Require};
use crate::logging::{self, trace_load};
use crate::module_system::cache::{MemoryModuleCache, ModuleCache};
use crate::module_system::esm::{has_esm_syntax, is_native_esm};
use crate::module_system::kind::{extension, is_typescript_file};
use crate::module_system::record::ModuleRecord;
use crate::module_system::resolver::ModuleResolver;
use crate::patterns::ModulePatterns;
use crate::transform::{TransformBridge, TransformCache, TransformRequest, TransformResult, Transformer};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;
use url::Url;

type Pending<V> = RefCell<HashMap<PathBuf, Rc<ModuleRecord<V>>>>;

/// Wrap a module body in the classic module function envelope
pub fn wrap_module(source: &str) -> String {
    format!(
        "(function (exports, require, module, __filename, __dirname) {{ {}\n}});",
        source
    )
}

/// Native load-interception API a loader can register its conversion with
pub trait HookRegistry {
    /// Run `hook(source, filename)` on every file with one of `extensions`
    fn add_hook(&mut self, extensions: &[String], hook: Box<dyn Fn(&str, &Path) -> String>);
}

/// How evaluating one module ended
enum Outcome {
    Loaded,
    ExecutionFailed(LoaderError),
    ConversionFailed(ConversionError),
    /// A nested load failed and the error handler already saw it
    Nested(LoaderError),
}

impl Outcome {
    /// `nested_reported` tells whether the last failed nested load went
    /// through the error handler
    fn from_host(path: &Path, err: HostError, nested_reported: bool) -> Self {
        match err {
            HostError::Load(inner) if nested_reported => Outcome::Nested(*inner),
            HostError::Load(inner) => Outcome::ExecutionFailed(*inner),
            other => Outcome::ExecutionFailed(LoaderError::Execution {
                path: path.to_path_buf(),
                message: other.to_string(),
            }),
        }
    }
}

/// A failed load, tagged with whether the error handler has seen it
struct Failure {
    error: LoaderError,
    reported: bool,
}

impl Failure {
    fn reported(error: LoaderError) -> Self {
        Self {
            error,
            reported: true,
        }
    }
}

impl From<LoaderError> for Failure {
    fn from(error: LoaderError) -> Self {
        Self {
            error,
            reported: false,
        }
    }
}

/// Per-chain state handed down to nested loads
struct LoadContext<'a, V> {
    anchor: PathBuf,
    parent: Option<Rc<ModuleRecord<V>>>,
    pending: &'a Pending<V>,
}

/// `require` bound to one running module
struct BoundRequire<'a, H: Host, T> {
    loader: &'a Loader<H, T>,
    context: LoadContext<'a, H::Value>,
    last_reported: Cell<bool>,
}

impl<H: Host, T: Transformer> Require<H::Value> for BoundRequire<'_, H, T> {
    fn require(&self, id: &str) -> Result<H::Value> {
        self.loader.load_in(id, &self.context).map_err(|failure| {
            self.last_reported.set(failure.reported);
            failure.error
        })
    }

    fn resolve(&self, id: &str, paths: Option<&[PathBuf]>) -> Result<PathBuf> {
        self.loader.resolver.resolve(id, &self.context.anchor, paths)
    }
}

/// Builder for [`Loader`]
pub struct LoaderBuilder<H: Host, T> {
    host: H,
    engine: T,
    options: LoaderOptions,
    env: Option<EnvSnapshot>,
    anchor: Option<PathBuf>,
    modules: Option<Rc<dyn ModuleCache<H::Value>>>,
}

impl<H: Host, T: Transformer> LoaderBuilder<H, T> {
    /// Explicit options; they win over the environment
    pub fn options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    /// Environment snapshot to merge; captured from the process when unset
    pub fn env(mut self, env: EnvSnapshot) -> Self {
        self.env = Some(env);
        self
    }

    /// File (or directory, or `file:` URL) relative requests resolve from
    pub fn anchor(mut self, anchor: impl Into<PathBuf>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    /// Share a persistent module cache with the embedder
    pub fn module_cache(mut self, modules: Rc<dyn ModuleCache<H::Value>>) -> Self {
        self.modules = Some(modules);
        self
    }

    /// Merge configuration and build the loader
    pub fn build(self) -> Result<Loader<H, T>> {
        let env = self.env.unwrap_or_else(EnvSnapshot::capture);
        let config = LoaderConfig::resolve(self.options, &env);
        if config.debug {
            logging::init(true);
        }

        let anchor = normalize_anchor(self.anchor, &env)?;
        let patterns = ModulePatterns::new(&config.native_modules, &config.transform_modules)?;
        let transform_cache =
            TransformCache::open(config.cache_dir.clone(), config.cache_version.clone(), config.debug);
        let modules: Rc<dyn ModuleCache<H::Value>> = match self.modules {
            Some(modules) => modules,
            None => Rc::new(MemoryModuleCache::new()),
        };

        Ok(Loader {
            host: self.host,
            bridge: TransformBridge::new(self.engine),
            resolver: ModuleResolver::new(&config),
            patterns,
            transform_cache,
            modules,
            anchor,
            config,
        })
    }
}

/// A configured loader instance
pub struct Loader<H: Host, T> {
    host: H,
    bridge: TransformBridge<T>,
    config: LoaderConfig,
    resolver: ModuleResolver,
    patterns: ModulePatterns,
    transform_cache: TransformCache,
    modules: Rc<dyn ModuleCache<H::Value>>,
    anchor: PathBuf,
}

impl<H: Host, T: Transformer> Loader<H, T> {
    /// Start building a loader over `host` and conversion `engine`
    pub fn builder(host: H, engine: T) -> LoaderBuilder<H, T> {
        LoaderBuilder {
            host,
            engine,
            options: LoaderOptions::default(),
            env: None,
            anchor: None,
            modules: None,
        }
    }

    /// Load `id` relative to the anchor and return its exports.
    ///
    /// Resolution failures of `id` itself are returned directly. Conversion
    /// and execution failures go through the configured error handler, and
    /// so does any failure of a nested request, as a failure of the module
    /// that issued it. When the handler recovers, the partially populated
    /// exports are returned.
    pub fn load(&self, id: &str) -> Result<H::Value> {
        let pending = RefCell::new(HashMap::new());
        let context = LoadContext {
            anchor: self.anchor.clone(),
            parent: None,
            pending: &pending,
        };
        self.load_in(id, &context).map_err(|failure| failure.error)
    }

    /// Resolve `id` relative to the anchor without loading it
    pub fn resolve(&self, id: &str, paths: Option<&[PathBuf]>) -> Result<PathBuf> {
        self.resolver.resolve(id, &self.anchor, paths)
    }

    /// Run the conversion engine directly, bypassing the cache
    pub fn convert(&self, request: &TransformRequest<'_>) -> TransformResult {
        self.bridge.convert(request)
    }

    /// Converted code for `source`, through the conversion cache
    pub fn transform(&self, filename: &Path, source: &str, typescript: bool) -> String {
        self.transform_checked(filename, source, typescript).0
    }

    /// Attach [`Loader::transform`] to a native load-interception API for
    /// every recognized extension
    pub fn register(self: &Rc<Self>, registry: &mut impl HookRegistry)
    where
        H: 'static,
        T: 'static,
    {
        let loader = Rc::clone(self);
        registry.add_hook(
            &self.config.extensions,
            Box::new(move |source: &str, filename: &Path| {
                loader.transform(filename, source, is_typescript_file(filename))
            }),
        );
    }

    /// Effective configuration
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The host runtime
    pub fn host(&self) -> &H {
        &self.host
    }

    /// File relative requests resolve from
    pub fn anchor(&self) -> &Path {
        &self.anchor
    }

    /// Persistent module cache
    pub fn module_cache(&self) -> &Rc<dyn ModuleCache<H::Value>> {
        &self.modules
    }

    /// Conversion cache
    pub fn transform_cache(&self) -> &TransformCache {
        &self.transform_cache
    }

    fn load_in(
        &self,
        id: &str,
        context: &LoadContext<'_, H::Value>,
    ) -> std::result::Result<H::Value, Failure> {
        let id = if let Some(builtin) = id.strip_prefix("node:") {
            builtin.to_string()
        } else if id.starts_with("file:") {
            file_url_to_path(id)?.to_string_lossy().into_owned()
        } else {
            id.to_string()
        };

        if self.host.is_builtin(&id) || id == ".pnp.js" {
            return Ok(self.native(&id, &context.anchor)?);
        }

        let filename = self.resolver.resolve(&id, &context.anchor, None)?;
        let ext = extension(&filename);

        if ext == ".json" {
            return Ok(self.load_json(&filename, context)?);
        }

        if !ext.is_empty() && !self.config.is_recognized(&ext) {
            trace_load!(self.config, "[unknown] {}", filename.display());
            return Ok(self.native(&filename.to_string_lossy(), &context.anchor)?);
        }

        if self.patterns.is_native(&filename) {
            trace_load!(self.config, "[native] {}", filename.display());
            return Ok(self.native(&filename.to_string_lossy(), &context.anchor)?);
        }

        let in_flight = context.pending.borrow().get(&filename).cloned();
        if let Some(record) = in_flight {
            return Ok(self.interop(record.exports()));
        }
        if self.config.persistent_module_cache {
            if let Some(record) = self.modules.get(&filename) {
                return Ok(self.interop(record.exports()));
            }
        }

        let source = std::fs::read_to_string(&filename).map_err(LoaderError::from)?;
        let typescript = is_typescript_file(&filename);
        let native_esm = is_native_esm(&filename);
        let needs_conversion = ext != ".cjs"
            && (typescript
                || native_esm
                || self.patterns.is_transform(&filename)
                || has_esm_syntax(&source));

        let (code, failure) = if needs_conversion {
            let start = Instant::now();
            let converted = self.transform_checked(&filename, &source, typescript);
            let tag = if native_esm { " [esm]" } else { "" };
            trace_load!(
                self.config,
                "[transpile]{} {} ({:?})",
                tag,
                filename.display(),
                start.elapsed()
            );
            converted
        } else {
            trace_load!(self.config, "[native] {}", filename.display());
            match self.host.require_native(&filename.to_string_lossy(), &context.anchor) {
                Ok(exports) => return Ok(self.interop(exports)),
                Err(err) => {
                    trace_load!(self.config, "Native require error: {}", err);
                    trace_load!(self.config, "[fallback] {}", filename.display());
                    self.transform_checked(&filename, &source, typescript)
                }
            }
        };

        let record = Rc::new(ModuleRecord::new(
            filename.clone(),
            self.host.new_exports(),
            context.parent.as_ref(),
        ));
        if let Some(parent) = &context.parent {
            parent.add_child(&record);
        }

        context
            .pending
            .borrow_mut()
            .insert(filename.clone(), Rc::clone(&record));
        if self.config.persistent_module_cache {
            self.modules.insert(filename.clone(), Rc::clone(&record));
        }

        let outcome = match failure {
            Some(err) => Outcome::ConversionFailed(err),
            None => self.evaluate(&record, &code, context.pending),
        };

        context.pending.borrow_mut().remove(&filename);

        match outcome {
            Outcome::Loaded => {}
            Outcome::Nested(err) => {
                self.purge(&filename);
                return Err(Failure::reported(err));
            }
            Outcome::ExecutionFailed(err) => {
                self.purge(&filename);
                self.config.on_error.call(err).map_err(Failure::reported)?;
            }
            Outcome::ConversionFailed(err) => {
                self.purge(&filename);
                self.config
                    .on_error
                    .call(LoaderError::Conversion(err))
                    .map_err(Failure::reported)?;
            }
        }

        record.mark_loaded();
        Ok(self.interop(record.exports()))
    }

    /// Compile and run one module body
    fn evaluate(
        &self,
        record: &Rc<ModuleRecord<H::Value>>,
        code: &str,
        pending: &Pending<H::Value>,
    ) -> Outcome {
        let script = match self.host.compile(record.filename(), &wrap_module(code)) {
            Ok(script) => script,
            Err(err) => return Outcome::from_host(record.filename(), err, false),
        };

        let require = BoundRequire {
            loader: self,
            context: LoadContext {
                anchor: record.filename().to_path_buf(),
                parent: Some(Rc::clone(record)),
                pending,
            },
            last_reported: Cell::new(false),
        };
        let scope = ModuleScope {
            exports: record.exports(),
            require: &require,
            module: record,
            filename: record.filename(),
            dirname: record.dirname(),
        };

        match self.host.execute(&script, scope) {
            Ok(()) => Outcome::Loaded,
            Err(err) => {
                Outcome::from_host(record.filename(), err, require.last_reported.get())
            }
        }
    }

    /// Cached conversion plus the engine failure, when this call ran the
    /// engine and it failed
    fn transform_checked(
        &self,
        filename: &Path,
        source: &str,
        typescript: bool,
    ) -> (String, Option<ConversionError>) {
        let failure = Cell::new(None);
        let mut code = self.transform_cache.get(filename, source, || {
            trace_load!(self.config, "[cache miss] {}", filename.display());
            let request = TransformRequest::new(filename, source)
                .typescript(typescript)
                .with_options(&self.config.transform_options);
            let result = self.bridge.convert(&request);
            if let Some(err) = &result.error {
                trace_load!(self.config, "{}", err);
            }
            failure.set(result.error);
            result.code
        });
        if code.starts_with("#!") {
            code = format!("// {}", code);
        }
        (code, failure.into_inner())
    }

    /// Parse a data module once; later requests share the same value
    fn load_json(
        &self,
        filename: &Path,
        context: &LoadContext<'_, H::Value>,
    ) -> Result<H::Value> {
        if self.config.persistent_module_cache {
            if let Some(record) = self.modules.get(filename) {
                return Ok(record.exports());
            }
        }

        trace_load!(self.config, "[json] {}", filename.display());
        let content = std::fs::read_to_string(filename)?;
        let parsed: serde_json::Value =
            serde_json::from_str(&content).map_err(|source| LoaderError::Json {
                path: filename.to_path_buf(),
                source,
            })?;
        let value = self.host.from_json(&parsed);
        self.host.set_default(&value, value.clone());

        let record = Rc::new(ModuleRecord::new(
            filename.to_path_buf(),
            value.clone(),
            context.parent.as_ref(),
        ));
        if let Some(parent) = &context.parent {
            parent.add_child(&record);
        }
        record.mark_loaded();
        if self.config.persistent_module_cache {
            self.modules.insert(filename.to_path_buf(), record);
        }
        Ok(value)
    }

    fn native(&self, id: &str, anchor: &Path) -> Result<H::Value> {
        match self.host.require_native(id, anchor) {
            Ok(exports) => Ok(self.interop(exports)),
            Err(HostError::Load(inner)) => Err(*inner),
            Err(err) => Err(LoaderError::Native {
                id: id.to_string(),
                message: err.to_string(),
            }),
        }
    }

    fn interop(&self, exports: H::Value) -> H::Value {
        if self.config.interop_default {
            self.host.interop_default(&exports)
        } else {
            exports
        }
    }

    fn purge(&self, filename: &Path) {
        if self.config.persistent_module_cache {
            self.modules.remove(filename);
        }
    }
}

fn file_url_to_path(raw: &str) -> Result<PathBuf> {
    Url::parse(raw)
        .ok()
        .and_then(|url| url.to_file_path().ok())
        .ok_or_else(|| LoaderError::InvalidUrl(raw.to_string()))
}

/// Empty anchor means the working directory; a directory anchor stands for
/// its `index.js`.
fn normalize_anchor(anchor: Option<PathBuf>, env: &EnvSnapshot) -> Result<PathBuf> {
    let anchor = match anchor {
        Some(path) if path.to_string_lossy().starts_with("file:") => {
            file_url_to_path(&path.to_string_lossy())?
        }
        Some(path) if !path.as_os_str().is_empty() => env.cwd().join(path),
        _ => env.cwd().to_path_buf(),
    };
    if anchor.is_dir() {
        Ok(anchor.join("index.js"))
    } else {
        Ok(anchor)
    }
}
