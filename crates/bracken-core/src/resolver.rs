//! Import specifier resolution.
//!
//! Maps a specifier plus the importing file to a canonical absolute
//! path, which doubles as the bundle key.
//!
//! Search rules:
//! - `./x`, `../x`: joined against the importer's directory, then file
//!   probing.
//! - bare specifiers: `node_modules/<spec>` probed while walking up
//!   from the importer's directory, bounded to 10 hops.
//!
//! File probing on a candidate `P`: a path with an extension must exist
//! as-is; otherwise `P.js`, `P.json`, then `P` as a directory — its
//! `package.json#main` (default `index.js`) re-probed, else `P/index.js`.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error during resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("cannot resolve module '{specifier}' imported from '{importer}'")]
    NotFound { specifier: String, importer: String },
    #[error("failed to read {path}: {source}")]
    PackageRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid package.json at {path}: {source}")]
    PackageJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to canonicalize {path}: {source}")]
    Canonicalize {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Maximum `node_modules` walk-up depth for bare specifiers.
const MAX_HOPS: usize = 10;

/// The module resolver. Stateless; every lookup goes to the filesystem.
#[derive(Debug, Default)]
pub struct Resolver;

impl Resolver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolve `specifier` as written in the file `importer`.
    pub fn resolve(&self, specifier: &str, importer: &Path) -> Result<PathBuf, ResolveError> {
        let dir = importer.parent().unwrap_or_else(|| Path::new("."));
        self.resolve_from_dir(specifier, dir, importer)
    }

    /// Resolve `specifier` against a directory (used for the entry
    /// point, which has no importing file).
    pub fn resolve_entry(&self, specifier: &str, dir: &Path) -> Result<PathBuf, ResolveError> {
        self.resolve_from_dir(specifier, dir, dir)
    }

    fn resolve_from_dir(
        &self,
        specifier: &str,
        dir: &Path,
        importer: &Path,
    ) -> Result<PathBuf, ResolveError> {
        let not_found = || ResolveError::NotFound {
            specifier: specifier.to_string(),
            importer: importer.display().to_string(),
        };

        if specifier.starts_with("./") || specifier.starts_with("../") {
            let target = dir.join(specifier);
            return match self.probe(&target)? {
                Some(found) => canonicalize(&found),
                None => Err(not_found()),
            };
        }

        // Absolute specifiers skip the node_modules search.
        if Path::new(specifier).is_absolute() {
            return match self.probe(Path::new(specifier))? {
                Some(found) => canonicalize(&found),
                None => Err(not_found()),
            };
        }

        // Bare specifier: walk up looking for node_modules.
        let mut search = dir.to_path_buf();
        for _ in 0..MAX_HOPS {
            let candidate = search.join("node_modules").join(specifier);
            if candidate.parent().is_some_and(Path::exists) {
                if let Some(found) = self.probe(&candidate)? {
                    return canonicalize(&found);
                }
            }
            match search.parent() {
                Some(parent) => search = parent.to_path_buf(),
                None => break,
            }
        }
        Err(not_found())
    }

    /// File probing. Returns `Ok(None)` when nothing matches.
    fn probe(&self, target: &Path) -> Result<Option<PathBuf>, ResolveError> {
        if target.extension().is_some() {
            return Ok(target.is_file().then(|| target.to_path_buf()));
        }

        let with_js = target.with_extension("js");
        if with_js.is_file() {
            return Ok(Some(with_js));
        }
        let with_json = target.with_extension("json");
        if with_json.is_file() {
            return Ok(Some(with_json));
        }

        if target.is_dir() {
            let pkg_json = target.join("package.json");
            if pkg_json.is_file() {
                let main = self.package_main(&pkg_json)?;
                return self.probe(&target.join(main));
            }
            let index = target.join("index.js");
            if index.is_file() {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// `main` field of a package.json, defaulting to `index.js`.
    fn package_main(&self, pkg_json: &Path) -> Result<String, ResolveError> {
        let content = std::fs::read_to_string(pkg_json).map_err(|source| {
            ResolveError::PackageRead { path: pkg_json.display().to_string(), source }
        })?;
        let json: serde_json::Value = serde_json::from_str(&content).map_err(|source| {
            ResolveError::PackageJson { path: pkg_json.display().to_string(), source }
        })?;
        Ok(json
            .get("main")
            .and_then(|v| v.as_str())
            .unwrap_or("index.js")
            .to_string())
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf, ResolveError> {
    std::fs::canonicalize(path).map_err(|source| ResolveError::Canonicalize {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn resolves_relative_with_extension_probing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("index.js"), "require('./a');").unwrap();
        fs::write(dir.path().join("a.js"), "module.exports.x = 1;").unwrap();

        let resolver = Resolver::new();
        let resolved = resolver
            .resolve("./a", &dir.path().join("index.js"))
            .unwrap();
        assert!(resolved.ends_with("a.js"));
        assert!(resolved.is_absolute());
    }

    #[test]
    fn resolves_explicit_extension() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("data.json"), "{}").unwrap();

        let resolver = Resolver::new();
        let resolved = resolver
            .resolve("./data.json", &dir.path().join("index.js"))
            .unwrap();
        assert!(resolved.ends_with("data.json"));
    }

    #[test]
    fn json_probe_comes_after_js() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "1;").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();

        let resolver = Resolver::new();
        let resolved = resolver.resolve("./a", &dir.path().join("index.js")).unwrap();
        assert!(resolved.ends_with("a.js"));
    }

    #[test]
    fn resolves_directory_index() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/index.js"), "1;").unwrap();

        let resolver = Resolver::new();
        let resolved = resolver.resolve("./lib", &dir.path().join("index.js")).unwrap();
        assert!(resolved.ends_with("lib/index.js"));
    }

    #[test]
    fn resolves_node_modules_package_main() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("node_modules/widget");
        fs::create_dir_all(pkg.join("lib")).unwrap();
        fs::write(pkg.join("package.json"), r#"{"main": "lib/widget.js"}"#).unwrap();
        fs::write(pkg.join("lib/widget.js"), "module.exports.w = 1;").unwrap();

        let resolver = Resolver::new();
        let resolved = resolver
            .resolve("widget", &dir.path().join("src/app.js"))
            .unwrap();
        assert!(resolved.ends_with("lib/widget.js"));
    }

    #[test]
    fn package_without_main_falls_back_to_index() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("node_modules/plain");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("package.json"), "{}").unwrap();
        fs::write(pkg.join("index.js"), "1;").unwrap();

        let resolver = Resolver::new();
        let resolved = resolver
            .resolve("plain", &dir.path().join("app.js"))
            .unwrap();
        assert!(resolved.ends_with("index.js"));
    }

    #[test]
    fn walks_up_to_parent_node_modules() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("node_modules/up");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("index.js"), "1;").unwrap();
        fs::create_dir_all(dir.path().join("src/deep")).unwrap();

        let resolver = Resolver::new();
        let resolved = resolver
            .resolve("up", &dir.path().join("src/deep/mod.js"))
            .unwrap();
        assert!(resolved.ends_with("up/index.js"));
    }

    #[test]
    fn missing_module_is_not_found() {
        let dir = tempdir().unwrap();
        let resolver = Resolver::new();
        let err = resolver
            .resolve("./nope", &dir.path().join("index.js"))
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));
        assert!(err.to_string().contains("./nope"));
    }

    #[test]
    fn broken_package_json_is_reported() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("node_modules/broken");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("package.json"), "not json").unwrap();

        let resolver = Resolver::new();
        let err = resolver
            .resolve("broken", &dir.path().join("app.js"))
            .unwrap_err();
        assert!(matches!(err, ResolveError::PackageJson { .. }));
    }
}
