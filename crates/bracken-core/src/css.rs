//! CSS loader.
//!
//! Rewrites class selectors with a content-hash prefix and emits two
//! things: a transformed stylesheet written to the configured output
//! path, and a JavaScript stub (the loader's byte output) mapping the
//! original class names to the hashed ones:
//!
//! ```css
//! .btn { color: red; }
//! ```
//!
//! becomes `.a1b2c3_btn { ... }` in the output file and
//! `module.exports.btn = 'a1b2c3_btn';` in the stub.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::loader::{Loader, LoaderError};

pub struct CssLoader {
    out_file: PathBuf,
}

impl CssLoader {
    pub fn new(out_file: impl Into<PathBuf>) -> Self {
        Self { out_file: out_file.into() }
    }
}

impl Loader for CssLoader {
    fn load(&self, input: Vec<u8>) -> Result<Vec<u8>, LoaderError> {
        let source = String::from_utf8_lossy(&input);
        let digest = format!("{:x}", md5::compute(&input));
        let prefix = &digest[..6];

        let mut stub = String::new();
        let mut sheet = String::new();
        let mut mapped: HashSet<String> = HashSet::new();

        for block in source.split('}') {
            let Some((selectors, declarations)) = block.split_once('{') else {
                continue;
            };

            let rewritten: Vec<String> = selectors
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|selector| {
                    selector
                        .split_whitespace()
                        .map(|part| rewrite_class(part, prefix, &mut stub, &mut mapped))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect();
            if rewritten.is_empty() {
                continue;
            }

            sheet.push_str(&rewritten.join(", "));
            sheet.push_str(" {");
            for declaration in declarations.split(';') {
                let declaration = declaration.trim();
                if declaration.is_empty() {
                    continue;
                }
                sheet.push_str("\n  ");
                sheet.push_str(declaration);
                sheet.push(';');
            }
            sheet.push_str("\n}\n");
        }

        std::fs::write(&self.out_file, sheet).map_err(|e| {
            LoaderError::new(format!(
                "failed to write {}: {e}",
                self.out_file.display()
            ))
        })?;

        Ok(stub.into_bytes())
    }
}

/// Prefix one selector token when it is a class selector; pseudo-class
/// suffixes survive the rewrite.
fn rewrite_class(
    selector: &str,
    prefix: &str,
    stub: &mut String,
    mapped: &mut HashSet<String>,
) -> String {
    let Some(rest) = selector.strip_prefix('.') else {
        return selector.to_string();
    };

    let (class, pseudo) = match rest.split_once(':') {
        Some((class, pseudo)) => (class, Some(pseudo)),
        None => (rest, None),
    };
    let hashed = format!("{prefix}_{class}");
    if mapped.insert(hashed.clone()) {
        stub.push_str(&format!("module.exports.{class} = '{hashed}';\n"));
    }

    match pseudo {
        Some(pseudo) => format!(".{hashed}:{pseudo}"),
        None => format!(".{hashed}"),
    }
}
