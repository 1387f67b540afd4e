//! ES5 code generator.
//!
//! Walks a parsed program and prints it back as plain ES5, lowering the
//! module-era constructs on the way: `import`/`export` become
//! `require`/`module.exports`, template literals become string
//! concatenation, JSX becomes `React.createElement` calls, and object
//! spread becomes `Object.assign`.
//!
//! When generating for a bundle, import specifiers and literal
//! `require("...")` arguments are resolved through the bundle so the
//! emitted keys match the module table; loading happens depth-first at
//! the moment an import is emitted.

use std::path::Path;

use bracken_parser::*;

use crate::bundler::{Bundle, BundleError};

const INDENT: &str = "    ";

/// Generate standalone output for a program, outside any bundle.
/// Import specifiers are kept verbatim.
pub fn generate_program(program: &Program) -> Result<String, BundleError> {
    Codegen::new(None, None).generate(program)
}

/// Generate the module body for `path` inside `bundle`.
pub(crate) fn generate_module(
    program: &Program,
    path: &Path,
    bundle: &mut Bundle,
) -> Result<String, BundleError> {
    Codegen::new(Some(path), Some(bundle)).generate(program)
}

/// Generator state: output buffer plus the bookkeeping that decides
/// indentation and parenthesization.
struct Codegen<'a> {
    out: String,
    indent_level: usize,
    /// Expression nesting depth; assignments, sequences and conditionals
    /// are parenthesized only when nested inside another expression.
    expr_level: u32,
    /// Inside a `for (...)` header initializer, which is already
    /// statement-scoped, assignment parens are suppressed.
    in_initializer: bool,
    module_path: Option<&'a Path>,
    bundle: Option<&'a mut Bundle>,
}

impl<'a> Codegen<'a> {
    fn new(module_path: Option<&'a Path>, bundle: Option<&'a mut Bundle>) -> Self {
        Self {
            out: String::new(),
            indent_level: 0,
            expr_level: 0,
            in_initializer: false,
            module_path,
            bundle,
        }
    }

    fn generate(mut self, program: &Program) -> Result<String, BundleError> {
        for decl in &program.declarations {
            self.emit_decl(decl)?;
        }
        for stmt in &program.body {
            self.emit_stmt(stmt)?;
        }
        Ok(self.out)
    }

    // =========================================================================
    // Output helpers
    // =========================================================================

    fn write(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent_level {
            self.out.push_str(INDENT);
        }
    }

    fn line(&mut self, s: &str) {
        self.newline();
        self.write(s);
    }

    fn in_expression(&self) -> bool {
        self.expr_level > 0
    }

    // =========================================================================
    // Bundle access
    // =========================================================================

    /// Resolve and load an import target, yielding its module key.
    /// Outside a bundle the specifier is kept as written.
    fn import_target(&mut self, specifier: &str) -> Result<String, BundleError> {
        match (self.module_path, self.bundle.as_deref_mut()) {
            (Some(path), Some(bundle)) => bundle.require_name(specifier, path),
            _ => Ok(specifier.to_string()),
        }
    }

    /// Rewrite target for a literal `require("...")` argument, if it
    /// resolves to a bundled module.
    fn require_target(&mut self, specifier: &str) -> Result<Option<String>, BundleError> {
        match (self.module_path, self.bundle.as_deref_mut()) {
            (Some(path), Some(bundle)) => bundle.try_require_name(specifier, path),
            _ => Ok(None),
        }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn emit_decl(&mut self, decl: &Decl) -> Result<(), BundleError> {
        match decl {
            Decl::Function(func) => self.emit_function(func),
            // Variable names are hoisted for scope bookkeeping only; the
            // statements that declared them emit the initializers.
            Decl::Variable(_) => Ok(()),
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), BundleError> {
        match &stmt.kind {
            StmtKind::Empty | StmtKind::Function(_) => Ok(()),
            StmtKind::Block(stmts) => self.emit_block(stmts, &[]),
            StmtKind::Expr(expr) => {
                self.newline();
                self.emit_expr(expr)?;
                self.write(";");
                Ok(())
            }
            StmtKind::Variable(decls) => self.emit_variable_stmt(decls),
            StmtKind::If { test, consequent, alternate } => {
                self.emit_if(test, consequent, alternate.as_deref(), false)
            }
            StmtKind::DoWhile { body, test } => {
                self.line("do ");
                self.emit_stmt(body)?;
                self.write(" while (");
                self.expr_level += 1;
                self.emit_expr(test)?;
                self.expr_level -= 1;
                self.write(");");
                Ok(())
            }
            StmtKind::While { test, body } => {
                self.line("while (");
                self.expr_level += 1;
                self.emit_expr(test)?;
                self.expr_level -= 1;
                self.write(") ");
                self.emit_stmt(body)
            }
            StmtKind::For { init, test, update, body } => {
                self.line("for (");
                if let Some(init) = init {
                    self.in_initializer = true;
                    let result = self.emit_for_init(init);
                    self.in_initializer = false;
                    result?;
                }
                self.write("; ");
                if let Some(test) = test {
                    self.emit_expr(test)?;
                }
                self.write("; ");
                if let Some(update) = update {
                    self.emit_expr(update)?;
                }
                self.write(") ");
                self.emit_stmt(body)
            }
            StmtKind::ForIn { left, right, body } => {
                self.line("for (");
                match left {
                    ForInTarget::Var(decl) => {
                        self.write("var ");
                        self.write(&decl.name);
                    }
                    ForInTarget::Expr(expr) => self.emit_expr(expr)?,
                }
                self.write(" in ");
                self.emit_expr(right)?;
                self.write(") ");
                self.emit_stmt(body)
            }
            StmtKind::Return(arg) => {
                self.line("return");
                if let Some(arg) = arg {
                    self.write(" ");
                    self.expr_level += 1;
                    self.emit_expr(arg)?;
                    self.expr_level -= 1;
                }
                self.write(";");
                Ok(())
            }
            StmtKind::Throw(arg) => {
                self.line("throw ");
                self.emit_expr(arg)?;
                self.write(";");
                Ok(())
            }
            StmtKind::Try { body, catch, finally } => {
                self.line("try ");
                self.emit_block(body, &[])?;
                if let Some(catch) = catch {
                    self.write(" catch (");
                    self.write(&catch.param);
                    self.write(") ");
                    self.emit_block(&catch.body, &[])?;
                }
                if let Some(finally) = finally {
                    self.write(" finally ");
                    self.emit_block(finally, &[])?;
                }
                Ok(())
            }
            StmtKind::Switch { discriminant, cases, .. } => {
                self.line("switch (");
                self.expr_level += 1;
                self.emit_expr(discriminant)?;
                self.expr_level -= 1;
                self.write(") {");
                self.indent_level += 1;
                for case in cases {
                    self.newline();
                    match &case.test {
                        Some(test) => {
                            self.write("case ");
                            self.emit_expr(test)?;
                            self.write(":");
                        }
                        None => self.write("default:"),
                    }
                    self.indent_level += 1;
                    for stmt in &case.body {
                        self.emit_stmt(stmt)?;
                    }
                    self.indent_level -= 1;
                }
                self.indent_level -= 1;
                self.newline();
                self.write("}");
                Ok(())
            }
            StmtKind::With { object, body } => {
                self.line("with (");
                self.emit_expr(object)?;
                self.write(") ");
                self.emit_stmt(body)
            }
            StmtKind::Break(label) => {
                self.line("break");
                if let Some(label) = label {
                    self.write(" ");
                    self.write(label);
                }
                self.write(";");
                Ok(())
            }
            StmtKind::Continue(label) => {
                self.line("continue");
                if let Some(label) = label {
                    self.write(" ");
                    self.write(label);
                }
                self.write(";");
                Ok(())
            }
            StmtKind::Labelled { label, body } => {
                self.line(label);
                self.write(": ");
                self.emit_stmt(body)
            }
            StmtKind::Debugger => {
                self.line("debugger;");
                Ok(())
            }
            StmtKind::Import(decl) => self.emit_import(decl),
            StmtKind::Export(inner) => self.emit_export(inner),
            StmtKind::ExportDefault(arg) => {
                self.line("module.exports.default = ");
                self.emit_expr(arg)?;
                self.write(";");
                Ok(())
            }
        }
    }

    fn emit_block(&mut self, stmts: &[Stmt], decls: &[Decl]) -> Result<(), BundleError> {
        self.write("{");
        self.indent_level += 1;
        for stmt in stmts {
            self.emit_stmt(stmt)?;
        }
        for decl in decls {
            self.emit_decl(decl)?;
        }
        self.indent_level -= 1;
        self.newline();
        self.write("}");
        Ok(())
    }

    fn emit_variable_stmt(&mut self, decls: &[VarDeclarator]) -> Result<(), BundleError> {
        self.line("var ");
        for (i, decl) in decls.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_var_declarator(decl)?;
        }
        self.write(";");
        Ok(())
    }

    fn emit_var_declarator(&mut self, decl: &VarDeclarator) -> Result<(), BundleError> {
        self.write(&decl.name);
        if let Some(init) = &decl.init {
            self.write(" = ");
            self.emit_expr(init)?;
        }
        Ok(())
    }

    fn emit_for_init(&mut self, init: &ForInit) -> Result<(), BundleError> {
        match init {
            ForInit::Var(decls) => {
                self.write("var ");
                for (i, decl) in decls.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.emit_var_declarator(decl)?;
                }
                Ok(())
            }
            ForInit::Expr(expr) => self.emit_expr(expr),
        }
    }

    fn emit_if(
        &mut self,
        test: &Expr,
        consequent: &Stmt,
        alternate: Option<&Stmt>,
        as_else: bool,
    ) -> Result<(), BundleError> {
        if !as_else {
            self.newline();
        }
        self.write("if (");
        self.expr_level += 1;
        self.emit_expr(test)?;
        self.expr_level -= 1;
        self.write(") ");
        self.emit_stmt(consequent)?;

        if let Some(alt) = alternate {
            self.write(" else ");
            if let StmtKind::If { test, consequent, alternate } = &alt.kind {
                return self.emit_if(test, consequent, alternate.as_deref(), true);
            }
            self.emit_stmt(alt)?;
        }
        Ok(())
    }

    // =========================================================================
    // Module lowering
    // =========================================================================

    fn emit_import(&mut self, decl: &ImportDecl) -> Result<(), BundleError> {
        let target = self.import_target(&decl.specifier)?;

        if let Some(default) = &decl.default {
            self.line("var ");
            self.write(default);
            self.write(" = require('");
            self.write(&target);
            self.write("').default || require('");
            self.write(&target);
            self.write("');");
        }

        for binding in &decl.named {
            self.line("var ");
            self.write(&binding.alias);
            self.write(" = require('");
            self.write(&target);
            self.write("').");
            self.write(&binding.name);
            self.write(";");
        }

        if let Some(all) = &decl.all {
            self.line("var ");
            self.write(all);
            self.write(" = require('");
            self.write(&target);
            self.write("');");
        }

        // Side-effect-only import.
        if decl.default.is_none() && decl.named.is_empty() && decl.all.is_none() {
            self.line("require('");
            self.write(&target);
            self.write("');");
        }
        Ok(())
    }

    fn emit_export(&mut self, inner: &ExportInner) -> Result<(), BundleError> {
        match inner {
            ExportInner::Variable(decls) => {
                for decl in decls {
                    self.line("module.exports.");
                    self.emit_var_declarator(decl)?;
                    self.write(";");
                }
                Ok(())
            }
            ExportInner::Function(func) => {
                let name = func.name.as_deref().unwrap_or_default();
                self.line("module.exports.");
                self.write(name);
                self.write(" = (function ");
                self.emit_params(&func.params);
                self.write(" ");
                self.emit_block(&func.body, &func.declarations)?;
                self.write(");");
                Ok(())
            }
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn emit_expr(&mut self, expr: &Expr) -> Result<(), BundleError> {
        match &expr.kind {
            ExprKind::Ident(name) => {
                self.write(name);
                Ok(())
            }
            ExprKind::This => {
                self.write("this");
                Ok(())
            }
            ExprKind::Null => {
                self.write("null");
                Ok(())
            }
            ExprKind::Bool(value) => {
                self.write(if *value { "true" } else { "false" });
                Ok(())
            }
            ExprKind::Number { raw, .. } => {
                self.write(raw);
                Ok(())
            }
            ExprKind::String { raw, .. } => {
                self.write(raw);
                Ok(())
            }
            ExprKind::Regex(raw) => {
                self.write("(");
                self.write(raw);
                self.write(")");
                Ok(())
            }
            ExprKind::Array(elements) => {
                self.write("[");
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    if let Some(element) = element {
                        self.emit_expr(element)?;
                    }
                }
                self.write("]");
                Ok(())
            }
            ExprKind::Object(props) => {
                if props.iter().any(|p| p.kind == PropertyKind::Spread) {
                    self.emit_object_assign(props, false)
                } else {
                    self.emit_object_literal(props)
                }
            }
            ExprKind::Function(func) => self.emit_function(func),
            ExprKind::Unary { op, operand, postfix } => {
                if !postfix {
                    self.write(op.as_str());
                    if op.is_word() {
                        self.write(" ");
                    }
                }
                self.emit_expr(operand)?;
                if *postfix {
                    self.write(op.as_str());
                }
                Ok(())
            }
            ExprKind::Binary { op, left, right, .. } => {
                self.write("(");
                self.emit_expr(left)?;
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                self.expr_level += 1;
                self.emit_expr(right)?;
                self.expr_level -= 1;
                self.write(")");
                Ok(())
            }
            ExprKind::Assign { op, left, right } => {
                let parens = self.in_expression() && !self.in_initializer;
                if parens {
                    self.write("(");
                }
                self.expr_level += 1;
                self.emit_expr(left)?;
                match op {
                    Some(op) => {
                        self.write(" ");
                        self.write(op.as_str());
                        self.write("= ");
                    }
                    None => self.write(" = "),
                }
                self.emit_expr(right)?;
                self.expr_level -= 1;
                if parens {
                    self.write(")");
                }
                Ok(())
            }
            ExprKind::Call { callee, args } => self.emit_call(callee, args),
            ExprKind::Dot { object, name } => {
                self.emit_expr(object)?;
                self.write(".");
                self.write(name);
                Ok(())
            }
            ExprKind::Bracket { object, member } => {
                self.emit_expr(object)?;
                self.write("[");
                self.emit_expr(member)?;
                self.write("]");
                Ok(())
            }
            ExprKind::Conditional { test, consequent, alternate } => {
                let parens = self.in_expression();
                if parens {
                    self.write("(");
                }
                self.expr_level += 1;
                self.emit_expr(test)?;
                self.write(" ? ");
                self.emit_expr(consequent)?;
                self.write(" : ");
                self.emit_expr(alternate)?;
                self.expr_level -= 1;
                if parens {
                    self.write(")");
                }
                Ok(())
            }
            ExprKind::New { callee, args } => {
                self.write("new ");
                self.emit_expr(callee)?;
                self.emit_arguments(args)?;
                Ok(())
            }
            ExprKind::Sequence(items) => {
                let parens = self.in_expression();
                if parens {
                    self.write("(");
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.emit_expr(item)?;
                }
                if parens {
                    self.write(")");
                }
                Ok(())
            }
            ExprKind::DynamicString(parts) => {
                if parts.is_empty() {
                    self.write("''");
                    return Ok(());
                }
                self.write("(");
                self.expr_level += 1;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        self.write(" + ");
                    }
                    self.emit_expr(part)?;
                }
                self.expr_level -= 1;
                self.write(")");
                Ok(())
            }
            ExprKind::Jsx(block) => self.emit_jsx(block),
        }
    }

    fn emit_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<(), BundleError> {
        // Literal require("...") calls are rewritten to the bundle's
        // module key when the specifier resolves.
        if let ExprKind::Ident(name) = &callee.kind {
            if name == "require" && args.len() == 1 {
                if let ExprKind::String { value, .. } = &args[0].kind {
                    if let Some(key) = self.require_target(value)? {
                        self.write("require('");
                        self.write(&key);
                        self.write("')");
                        return Ok(());
                    }
                }
            }
        }
        self.emit_expr(callee)?;
        self.emit_arguments(args)
    }

    fn emit_arguments(&mut self, args: &[Expr]) -> Result<(), BundleError> {
        self.write("(");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_expr(arg)?;
        }
        self.write(")");
        Ok(())
    }

    fn emit_function(&mut self, func: &Function) -> Result<(), BundleError> {
        let anonymous = func.name.is_none();
        if anonymous {
            self.write("(function ");
        } else {
            self.line("function ");
            self.write(func.name.as_deref().unwrap_or_default());
        }
        self.emit_params(&func.params);
        self.write(" ");
        self.emit_block(&func.body, &func.declarations)?;
        if anonymous {
            self.write(")");
        }
        Ok(())
    }

    fn emit_params(&mut self, params: &[String]) {
        self.write("(");
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(param);
        }
        self.write(")");
    }

    // =========================================================================
    // Objects
    // =========================================================================

    fn emit_object_literal(&mut self, props: &[Property]) -> Result<(), BundleError> {
        if props.is_empty() {
            self.write("{}");
            return Ok(());
        }
        self.write("{");
        self.indent_level += 1;
        for (i, prop) in props.iter().enumerate() {
            self.newline();
            self.emit_property(prop, false)?;
            if i < props.len() - 1 {
                self.write(",");
            }
        }
        self.indent_level -= 1;
        self.newline();
        self.write("}");
        Ok(())
    }

    /// Object with spread properties: runs of plain properties become
    /// inline object groups, stitched with `Object.assign`.
    fn emit_object_assign(&mut self, props: &[Property], quote_keys: bool) -> Result<(), BundleError> {
        self.write("Object.assign({}");
        let mut group: Vec<&Property> = Vec::new();
        for prop in props {
            if prop.kind == PropertyKind::Spread {
                if !group.is_empty() {
                    self.write(", ");
                    self.emit_inline_object(&group, quote_keys)?;
                    group.clear();
                }
                self.write(", ");
                self.emit_expr(&prop.value)?;
            } else {
                group.push(prop);
            }
        }
        if !group.is_empty() {
            self.write(", ");
            self.emit_inline_object(&group, quote_keys)?;
        }
        self.write(")");
        Ok(())
    }

    fn emit_inline_object(&mut self, props: &[&Property], quote_keys: bool) -> Result<(), BundleError> {
        self.write("{ ");
        for (i, prop) in props.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_property(prop, quote_keys)?;
        }
        self.write(" }");
        Ok(())
    }

    fn emit_property(&mut self, prop: &Property, quote_key: bool) -> Result<(), BundleError> {
        match prop.kind {
            PropertyKind::Get | PropertyKind::Set => {
                self.write(if prop.kind == PropertyKind::Get { "get " } else { "set " });
                self.write(&prop.key);
                if let ExprKind::Function(func) = &prop.value.kind {
                    self.emit_params(&func.params);
                    self.write(" ");
                    self.emit_block(&func.body, &func.declarations)?;
                }
                Ok(())
            }
            _ => {
                let key = if quote_key {
                    quote_double(&prop.key)
                } else {
                    escape_key_if_required(&prop.key)
                };
                self.write(&key);
                self.write(": ");
                self.emit_expr(&prop.value)
            }
        }
    }

    // =========================================================================
    // JSX lowering
    // =========================================================================

    fn emit_jsx(&mut self, block: &JsxBlock) -> Result<(), BundleError> {
        self.write("React.createElement(");

        let name = block.opening.name.as_deref().unwrap_or("null");
        if is_intrinsic_tag(name) {
            let quoted = quote_double(name);
            self.write(&quoted);
        } else {
            self.write(name);
        }

        self.write(", ");
        let props = &block.opening.props;
        if props.is_empty() {
            self.write("null");
        } else if props.iter().any(|p| p.kind == PropertyKind::Spread) {
            self.emit_object_assign(props, true)?;
        } else {
            self.emit_inline_object(&props.iter().collect::<Vec<_>>(), true)?;
        }

        for child in &block.children {
            match child {
                JsxChild::Text(text) => {
                    // Text is cut at the first line terminator; purely
                    // structural whitespace disappears with it.
                    let text = text.split(['\n', '\r']).next().unwrap_or("");
                    if text.is_empty() {
                        continue;
                    }
                    self.write(", ");
                    let quoted = quote_double(text);
                    self.write(&quoted);
                }
                JsxChild::Expr(expr) => {
                    self.write(", ");
                    self.expr_level += 1;
                    self.emit_expr(expr)?;
                    self.expr_level -= 1;
                }
                JsxChild::Element(element) => {
                    self.write(", ");
                    self.emit_jsx(element)?;
                }
            }
        }

        self.write(")");
        Ok(())
    }
}

/// A lowercase tag is an intrinsic element and is passed as a string;
/// anything else is a component reference.
fn is_intrinsic_tag(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_lowercase())
}

fn is_identifier_start(c: char) -> bool {
    c == '$' || c == '_' || c == '\\' || c.is_alphabetic()
}

fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_numeric()
}

/// Print a property key bare when it is identifier-shaped, quoted
/// otherwise.
fn escape_key_if_required(key: &str) -> String {
    let mut chars = key.chars();
    let valid = match chars.next() {
        Some(first) => is_identifier_start(first) && chars.all(is_identifier_part),
        None => false,
    };
    if valid {
        key.to_string()
    } else {
        quote_double(key)
    }
}
