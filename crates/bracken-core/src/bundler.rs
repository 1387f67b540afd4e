//! The bundler.
//!
//! Walks the module graph depth-first from the entry file, generating
//! each module body as it goes, and stitches the results into a single
//! script behind a `require` runtime with a module cache.
//!
//! Module records are created before their bodies exist; a record whose
//! body is still `None` is currently being loaded, so re-entering it
//! means the import graph has a cycle and the bundle is rejected.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bracken_parser::{LineIndex, ModuleResolver, ParseErrors, Parser};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::codegen;
use crate::loader::{run_chain, Loader};
use crate::resolver::{ResolveError, Resolver};

/// Fixed preamble: module table, module cache, `process.env` stub.
const GLOBAL_JS: &str = "\
var require;
var process = { env: {} };
var __go_bundle_modules__ = {};
var __go_bundle_module_cache__ = {};
";

/// Fixed runtime: look up by name, cache, return the exports.
const REQUIRE_JS: &str = "
require = function (module) {
  var result = __go_bundle_module_cache__[module];
  if (!result) {
    result = __go_bundle_modules__[module]();
    __go_bundle_module_cache__[module] = result;
  }
  return result;
};
";

/// Bundler error. The first error aborts the bundle; no output is
/// produced.
#[derive(Debug, Error)]
pub enum BundleError {
    /// Pre-rendered `path:line:col: message` lines.
    #[error("{0}")]
    Parse(String),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("circular imports not allowed: {path}")]
    Circular { path: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("loader failed for {path}: {message}")]
    Loader { path: String, message: String },
    #[error("{path}: module source is not valid UTF-8")]
    InvalidUtf8 { path: String },
}

/// One discovered module: its sequential name, canonical path, the
/// generated body (None while the module is being loaded) and the
/// dependency map recorded at parse time.
#[derive(Debug)]
pub struct ModuleRecord {
    pub name: String,
    pub path: PathBuf,
    pub body: Option<String>,
    pub dependencies: HashMap<String, PathBuf>,
}

/// Bundle state for one invocation.
pub struct Bundle {
    records: Vec<ModuleRecord>,
    index: FxHashMap<PathBuf, usize>,
    counter: u32,
    cwd: PathBuf,
    resolver: Resolver,
    loaders: HashMap<String, Vec<Box<dyn Loader>>>,
}

impl Bundle {
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            records: Vec::new(),
            index: FxHashMap::default(),
            counter: 0,
            cwd,
            resolver: Resolver::new(),
            loaders: HashMap::new(),
        }
    }

    /// Register a loader for an extension (without the dot). Loaders on
    /// the same extension compose in registration order.
    pub fn add_loader(&mut self, extension: &str, loader: Box<dyn Loader>) {
        self.loaders
            .entry(extension.trim_start_matches('.').to_string())
            .or_default()
            .push(loader);
    }

    /// The modules discovered so far, in first-discovery order.
    pub fn modules(&self) -> &[ModuleRecord] {
        &self.records
    }

    /// Bundle the entry file and everything it transitively imports.
    pub fn bundle(&mut self, entry: &str) -> Result<String, BundleError> {
        let specifier = if entry.starts_with('.') || entry.starts_with('/') {
            entry.to_string()
        } else {
            format!("./{entry}")
        };
        let cwd = self.cwd.clone();
        let entry_path = self.resolver.resolve_entry(&specifier, &cwd)?;
        tracing::debug!(entry = %entry_path.display(), "bundling");

        let entry_name = self.load_module(&entry_path)?;
        tracing::debug!(modules = self.records.len(), "emitting bundle");
        Ok(self.render(&entry_name))
    }

    /// Load one module, returning its bundle name. Idempotent for
    /// already-loaded modules; re-entering an in-flight module is a
    /// circular import.
    pub(crate) fn load_module(&mut self, path: &Path) -> Result<String, BundleError> {
        if let Some(&i) = self.index.get(path) {
            let record = &self.records[i];
            return match record.body {
                Some(_) => Ok(record.name.clone()),
                None => Err(BundleError::Circular { path: path.display().to_string() }),
            };
        }

        self.counter += 1;
        let name = format!("m{}", self.counter);
        tracing::debug!(name = %name, path = %path.display(), "loading module");

        let idx = self.records.len();
        self.index.insert(path.to_path_buf(), idx);
        self.records.push(ModuleRecord {
            name: name.clone(),
            path: path.to_path_buf(),
            body: None,
            dependencies: HashMap::new(),
        });

        let raw = std::fs::read(path).map_err(|source| BundleError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string();
        let data = match self.loaders.get(&ext) {
            Some(chain) => run_chain(chain, raw).map_err(|e| BundleError::Loader {
                path: path.display().to_string(),
                message: e.to_string(),
            })?,
            None => raw,
        };

        // Anything that is not JavaScript goes into the module body
        // verbatim; a loader may already have produced a JS stub.
        if ext != "js" && ext != "jsx" {
            let body = String::from_utf8_lossy(&data).into_owned();
            self.records[idx].body = Some(body);
            return Ok(name);
        }

        let source = String::from_utf8(data)
            .map_err(|_| BundleError::InvalidUtf8 { path: path.display().to_string() })?;

        let module = {
            let mut adapter = ResolverAdapter { resolver: &self.resolver };
            Parser::new_module(&source, path.to_path_buf(), &mut adapter)
                .parse_module()
                .map_err(|errors| {
                    BundleError::Parse(render_parse_errors(path, &source, &errors))
                })?
        };
        self.records[idx].dependencies = module.dependencies;

        // Generation resolves imports through this bundle, loading
        // dependencies depth-first as their require sites are emitted.
        let body = codegen::generate_module(&module.program, path, self)?;
        self.records[idx].body = Some(body);
        Ok(name)
    }

    /// Resolve and load an import target; imports must resolve.
    pub(crate) fn require_name(
        &mut self,
        specifier: &str,
        importer: &Path,
    ) -> Result<String, BundleError> {
        let path = self.resolver.resolve(specifier, importer)?;
        self.load_module(&path)
    }

    /// Resolve and load a literal `require()` target; an unresolvable
    /// specifier is left for the runtime.
    pub(crate) fn try_require_name(
        &mut self,
        specifier: &str,
        importer: &Path,
    ) -> Result<Option<String>, BundleError> {
        match self.resolver.resolve(specifier, importer) {
            Ok(path) => self.load_module(&path).map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Assemble the final output in first-discovery order.
    fn render(&self, entry: &str) -> String {
        let mut out = String::from(GLOBAL_JS);
        for record in &self.records {
            out.push_str("\n// ");
            out.push_str(&record.path.display().to_string());
            out.push('\n');
            out.push_str("__go_bundle_modules__.");
            out.push_str(&record.name);
            out.push_str(" = function() {\n");
            out.push_str("var exports = {};\n");
            out.push_str("var module = { exports: exports };\n");
            out.push_str(record.body.as_deref().unwrap_or(""));
            out.push_str("\nreturn module.exports;\n};\n");
        }
        out.push_str(REQUIRE_JS);
        out.push_str(&format!("require('{entry}');"));
        out
    }
}

/// Adapter giving the parser read access to the resolver.
struct ResolverAdapter<'a> {
    resolver: &'a Resolver,
}

impl ModuleResolver for ResolverAdapter<'_> {
    fn resolve_specifier(&mut self, specifier: &str, importer: &Path) -> Option<PathBuf> {
        self.resolver.resolve(specifier, importer).ok()
    }
}

/// `path:line:col: message`, one line per collected error.
fn render_parse_errors(path: &Path, source: &str, errors: &ParseErrors) -> String {
    let index = LineIndex::new(source);
    errors
        .0
        .iter()
        .map(|e| {
            let pos = index.position(e.span.start);
            format!("{}:{}: {}", path.display(), pos, e.message)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Bundle `entry` (resolved against `cwd`) with no loaders registered.
pub fn bundle(entry: &str, cwd: PathBuf) -> Result<String, BundleError> {
    Bundle::new(cwd).bundle(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preamble_declares_table_cache_and_process_stub() {
        assert!(GLOBAL_JS.contains("var process = { env: {} };"));
        assert!(GLOBAL_JS.contains("var __go_bundle_modules__ = {};"));
        assert!(GLOBAL_JS.contains("var __go_bundle_module_cache__ = {};"));
    }

    #[test]
    fn runtime_looks_up_and_caches_by_name() {
        assert!(REQUIRE_JS.contains("__go_bundle_module_cache__[module] = result;"));
        assert!(REQUIRE_JS.contains("__go_bundle_modules__[module]()"));
    }
}
