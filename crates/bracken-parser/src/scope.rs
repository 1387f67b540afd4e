//! Parse-time lexical scope.
//!
//! One scope is opened for the program and one per function body. The
//! scope answers three questions during parsing: is `return` legal, are
//! `break`/`continue` legal (and does their label exist), and is `in`
//! currently a binary operator (it is not inside a `for (...)` header
//! initializer). It also accumulates the hoisted declaration list.

use crate::ast::Decl;

#[derive(Debug, Default)]
pub(crate) struct Scope {
    pub in_function: bool,
    pub in_iteration: bool,
    pub in_switch: bool,
    pub allow_in: bool,
    pub labels: Vec<String>,
    pub declarations: Vec<Decl>,
}

impl Scope {
    pub fn new(in_function: bool) -> Self {
        Self {
            in_function,
            allow_in: true,
            ..Self::default()
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn declare(&mut self, decl: Decl) {
        self.declarations.push(decl);
    }
}
