//! End-to-end bundling scenarios against real file trees.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use bracken_core::{Bundle, BundleError, CssLoader};
use tempfile::{tempdir, TempDir};

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempdir().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    dir
}

fn bundle_in(dir: &Path, entry: &str) -> Result<String, BundleError> {
    Bundle::new(dir.to_path_buf()).bundle(entry)
}

/// The body of one module definition in the output.
fn module_body<'a>(output: &'a str, name: &str) -> &'a str {
    let open = format!("__go_bundle_modules__.{name} = function() {{\n");
    let start = output.find(&open).unwrap_or_else(|| panic!("no module {name}")) + open.len();
    let end = output[start..]
        .find("\nreturn module.exports;\n};\n")
        .expect("unterminated module definition");
    &output[start..start + end]
}

#[test]
fn hello_single_module() {
    let dir = project(&[("index.js", "console.log(\"hi\");\n")]);
    let output = bundle_in(dir.path(), "index.js").unwrap();

    assert!(output.starts_with("var require;\n"), "{output}");
    assert!(output.contains("var process = { env: {} };"));
    assert!(output.contains("var __go_bundle_modules__ = {};"));
    assert!(output.contains("var __go_bundle_module_cache__ = {};"));

    let body = module_body(&output, "m1");
    assert!(body.contains("console.log(\"hi\");"), "{body}");

    assert!(output.contains("require = function (module) {"));
    assert!(output.ends_with("require('m1');"), "{output}");
}

#[test]
fn relative_require_is_rewritten_to_module_key() {
    let dir = project(&[
        ("index.js", "var a = require(\"./a\");\nconsole.log(a.x);\n"),
        ("a.js", "module.exports.x = 1;\n"),
    ]);
    let output = bundle_in(dir.path(), "index.js").unwrap();

    let entry = module_body(&output, "m1");
    assert!(entry.contains("var a = require('m2');"), "{entry}");

    let dep = module_body(&output, "m2");
    assert!(dep.contains("module.exports.x = 1;"), "{dep}");

    assert!(output.ends_with("require('m1');"));
}

#[test]
fn es_module_import_export() {
    let dir = project(&[
        ("index.js", "import {x} from \"./a\";\nconsole.log(x);\n"),
        ("a.js", "export const x = 1;\n"),
    ]);
    let output = bundle_in(dir.path(), "index.js").unwrap();

    let entry = module_body(&output, "m1");
    assert!(entry.contains("var x = require('m2').x;"), "{entry}");

    let dep = module_body(&output, "m2");
    assert!(dep.contains("module.exports.x = 1;"), "{dep}");
}

#[test]
fn default_and_namespace_imports() {
    let dir = project(&[
        (
            "index.js",
            "import D from \"./a\";\nimport * as NS from \"./b\";\nconsole.log(D, NS);\n",
        ),
        ("a.js", "export default function (x) { return x; }\n"),
        ("b.js", "export var n = 2;\n"),
    ]);
    let output = bundle_in(dir.path(), "index.js").unwrap();

    let entry = module_body(&output, "m1");
    assert!(
        entry.contains("var D = require('m2').default || require('m2');"),
        "{entry}"
    );
    assert!(entry.contains("var NS = require('m3');"), "{entry}");
}

#[test]
fn circular_imports_are_rejected() {
    let dir = project(&[
        ("a.js", "var b = require(\"./b\");\nmodule.exports.a = 1;\n"),
        ("b.js", "var a = require(\"./a\");\nmodule.exports.b = 2;\n"),
    ]);
    let err = bundle_in(dir.path(), "a.js").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("circular imports not allowed"), "{message}");
    assert!(message.contains("a.js"), "{message}");
}

#[test]
fn shared_dependency_is_bundled_once() {
    let dir = project(&[
        (
            "index.js",
            "var a = require(\"./a\");\nvar b = require(\"./b\");\nconsole.log(a, b);\n",
        ),
        ("a.js", "var shared = require(\"./shared\");\nmodule.exports.a = shared.s;\n"),
        ("b.js", "var shared = require(\"./shared\");\nmodule.exports.b = shared.s;\n"),
        ("shared.js", "module.exports.s = 1;\n"),
    ]);
    let output = bundle_in(dir.path(), "index.js").unwrap();

    assert_eq!(output.matches("__go_bundle_modules__.m").count(), 4, "{output}");
    // Both importers point at the same key.
    let a = module_body(&output, "m2");
    let b = module_body(&output, "m4");
    assert!(a.contains("require('m3')"), "{a}");
    assert!(b.contains("require('m3')"), "{b}");
}

#[test]
fn bundling_is_deterministic() {
    let files: &[(&str, &str)] = &[
        ("index.js", "var a = require(\"./a\");\nvar b = require(\"./b\");\n"),
        ("a.js", "module.exports.a = 1;\n"),
        ("b.js", "module.exports.b = 2;\n"),
    ];
    let dir = project(files);
    let first = bundle_in(dir.path(), "index.js").unwrap();
    let second = bundle_in(dir.path(), "index.js").unwrap();
    assert_eq!(first, second);
}

#[test]
fn every_require_key_has_a_matching_definition() {
    let dir = project(&[
        ("index.js", "var a = require(\"./a\");\nconsole.log(a);\n"),
        ("a.js", "var b = require(\"./b\");\nmodule.exports.a = b.b;\n"),
        ("b.js", "module.exports.b = 1;\n"),
    ]);
    let output = bundle_in(dir.path(), "index.js").unwrap();

    let mut pos = 0;
    while let Some(found) = output[pos..].find("require('m") {
        let at = pos + found;
        let rest = &output[at + "require('".len()..];
        let key: String = rest.chars().take_while(|c| *c != '\'').collect();
        let definition = format!("__go_bundle_modules__.{key} = ");
        assert!(output.contains(&definition), "no definition for {key}");
        pos = at + 1;
    }

    // All definitions precede the final entry require.
    let entry_require = output.rfind("require('m1');").expect("entry require");
    let last_definition = output.rfind("__go_bundle_modules__.").expect("definitions");
    assert!(last_definition < entry_require);
}

#[test]
fn module_names_are_unique_per_path_and_reachable_from_entry() {
    let dir = project(&[
        ("index.js", "var a = require(\"./lib/a\");\nconsole.log(a);\n"),
        ("lib/a.js", "var b = require(\"./b\");\nmodule.exports.a = b.b;\n"),
        ("lib/b.js", "module.exports.b = 1;\n"),
    ]);
    let mut bundle = Bundle::new(dir.path().to_path_buf());
    bundle.bundle("index.js").unwrap();

    let records = bundle.modules();
    let names: HashSet<_> = records.iter().map(|r| r.name.as_str()).collect();
    let paths: HashSet<_> = records.iter().map(|r| r.path.as_path()).collect();
    assert_eq!(names.len(), records.len());
    assert_eq!(paths.len(), records.len());

    // Transitive reachability from the entry (first discovered).
    let mut reachable: HashSet<&Path> = HashSet::new();
    let mut queue = vec![records[0].path.as_path()];
    while let Some(path) = queue.pop() {
        if !reachable.insert(path) {
            continue;
        }
        if let Some(record) = records.iter().find(|r| r.path == path) {
            queue.extend(record.dependencies.values().map(|p| p.as_path()));
        }
    }
    for record in records {
        assert!(
            reachable.contains(record.path.as_path()),
            "orphan module {}",
            record.path.display()
        );
    }
}

#[test]
fn node_modules_package_is_resolved_through_main() {
    let dir = project(&[
        ("index.js", "import { w } from \"widget\";\nconsole.log(w);\n"),
        ("node_modules/widget/package.json", r#"{"main": "lib/widget.js"}"#),
        ("node_modules/widget/lib/widget.js", "export var w = 7;\n"),
    ]);
    let output = bundle_in(dir.path(), "index.js").unwrap();

    let entry = module_body(&output, "m1");
    assert!(entry.contains("var w = require('m2').w;"), "{entry}");
    let dep = module_body(&output, "m2");
    assert!(dep.contains("module.exports.w = 7;"), "{dep}");
}

#[test]
fn json_module_is_copied_verbatim() {
    let dir = project(&[
        ("index.js", "var d = require(\"./data.json\");\nconsole.log(d);\n"),
        ("data.json", "{\"a\": 1}"),
    ]);
    let output = bundle_in(dir.path(), "index.js").unwrap();

    let dep = module_body(&output, "m2");
    assert!(dep.contains("{\"a\": 1}"), "{dep}");
}

#[test]
fn unresolvable_bare_require_is_left_for_the_runtime() {
    let dir = project(&[("index.js", "var fs = require(\"fs\");\nconsole.log(fs);\n")]);
    let output = bundle_in(dir.path(), "index.js").unwrap();

    let entry = module_body(&output, "m1");
    assert!(entry.contains("require(\"fs\")"), "{entry}");
}

#[test]
fn missing_import_fails_with_specifier_and_importer() {
    let dir = project(&[("index.js", "import { x } from \"./missing\";\n")]);
    let err = bundle_in(dir.path(), "index.js").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Could not open module './missing'"), "{message}");
    assert!(message.contains("index.js"), "{message}");
}

#[test]
fn parse_errors_carry_path_line_and_column() {
    let dir = project(&[("index.js", "var ok = 1;\nvar = 2;\n")]);
    let err = bundle_in(dir.path(), "index.js").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("index.js:2:"), "{message}");
    assert!(message.contains("Expected identifier"), "{message}");
}

#[test]
fn css_loader_emits_stub_and_stylesheet() {
    let dir = project(&[
        (
            "index.js",
            "var styles = require(\"./styles.css\");\nconsole.log(styles.btn);\n",
        ),
        ("styles.css", ".btn { color: red; }\n"),
    ]);
    let css_out = dir.path().join("out.css");

    let mut bundle = Bundle::new(dir.path().to_path_buf());
    bundle.add_loader("css", Box::new(CssLoader::new(&css_out)));
    let output = bundle.bundle("index.js").unwrap();

    let entry = module_body(&output, "m1");
    assert!(entry.contains("require('m2')"), "{entry}");

    let stub = module_body(&output, "m2");
    assert!(stub.contains("module.exports.btn = '"), "{stub}");
    assert!(stub.contains("_btn';"), "{stub}");

    let sheet = fs::read_to_string(&css_out).unwrap();
    assert!(sheet.contains("_btn {"), "{sheet}");
    assert!(sheet.contains("color: red;"), "{sheet}");
}

#[test]
fn jsx_entry_bundles_through_create_element() {
    let dir = project(&[
        (
            "index.jsx",
            "import Button from \"./button.jsx\";\nvar el = <Button label=\"go\" />;\nconsole.log(el);\n",
        ),
        (
            "button.jsx",
            "export default function (props) { return <button>{props.label}</button>; }\n",
        ),
    ]);
    let output = bundle_in(dir.path(), "index.jsx").unwrap();

    let entry = module_body(&output, "m1");
    assert!(
        entry.contains("React.createElement(Button, { \"label\": \"go\" })"),
        "{entry}"
    );
    let dep = module_body(&output, "m2");
    assert!(
        dep.contains("React.createElement(\"button\", null, props.label)"),
        "{dep}"
    );
}

#[test]
fn io_failure_on_entry_is_reported() {
    let dir = tempdir().unwrap();
    let err = bundle_in(dir.path(), "index.js").unwrap_err();
    assert!(matches!(err, BundleError::Resolve(_)), "{err}");
}
