//! Recursive-descent parser with single-token lookahead.
//!
//! Statement-level errors are collected into a list; after each one the
//! parser synchronizes to the next statement boundary and continues, so a
//! single run can report several syntax errors. Any non-empty error list
//! is a failed parse.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ast::*;
use crate::lexer::Lexer;
use crate::scope::Scope;
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Resolves an import specifier against the module that imports it.
/// Implemented by the bundler's resolver; the parser only needs this one
/// seam to accumulate module dependencies.
pub trait ModuleResolver {
    fn resolve_specifier(&mut self, specifier: &str, importer: &Path) -> Option<PathBuf>;
}

/// A single parse error.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self { message: message.into(), span }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}..{}", self.message, self.span.start, self.span.end)
    }
}

impl std::error::Error for ParseError {}

/// All errors collected during one parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseErrors(pub Vec<ParseError>);

impl std::fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseErrors {}

/// Module-mode state: where we are parsing from and what we found.
struct ModuleCx<'a> {
    path: PathBuf,
    resolver: &'a mut dyn ModuleResolver,
    dependencies: HashMap<String, PathBuf>,
}

/// Maximum consecutive no-progress recoveries before the synchronizer
/// force-consumes a token.
const MAX_RECOVER: u32 = 10;

/// The parser.
pub struct Parser<'a> {
    pub(crate) lexer: Lexer<'a>,
    pub(crate) current: Token,
    scopes: Vec<Scope>,
    errors: Vec<ParseError>,
    recover_idx: u32,
    recover_count: u32,
    module: Option<ModuleCx<'a>>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            scopes: vec![Scope::new(false)],
            errors: Vec::new(),
            recover_idx: 0,
            recover_count: 0,
            module: None,
        }
    }

    /// Create a parser in module mode: `require`/`import` specifiers are
    /// resolved as they are encountered and recorded as dependencies.
    pub fn new_module(
        source: &'a str,
        path: PathBuf,
        resolver: &'a mut dyn ModuleResolver,
    ) -> Self {
        let mut parser = Self::new(source);
        parser.module = Some(ModuleCx {
            path,
            resolver,
            dependencies: HashMap::new(),
        });
        parser
    }

    /// Parse the source into a program.
    pub fn parse(mut self) -> Result<Program, ParseErrors> {
        let program = self.run();
        if self.errors.is_empty() {
            Ok(program)
        } else {
            Err(ParseErrors(self.errors))
        }
    }

    /// Parse the source into a module with its dependency map.
    pub fn parse_module(mut self) -> Result<Module, ParseErrors> {
        let program = self.run();
        if !self.errors.is_empty() {
            return Err(ParseErrors(self.errors));
        }
        let cx = self.module.take().expect("parser not in module mode");
        Ok(Module {
            path: cx.path,
            program,
            dependencies: cx.dependencies,
        })
    }

    fn run(&mut self) -> Program {
        let mut body = Vec::new();
        while !self.is_eof() {
            match self.parse_stmt() {
                Ok(stmt) => body.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.next_statement();
                }
            }
        }
        let scope = self.scopes.pop().expect("program scope");
        Program {
            body,
            declarations: scope.declarations,
        }
    }

    // =========================================================================
    // Token handling
    // =========================================================================

    pub(crate) fn advance(&mut self) -> Token {
        std::mem::replace(&mut self.current, self.lexer.next_token())
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn is_eof(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    pub(crate) fn expect(&mut self, kind: &TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::new(
                format!("Expected {}, got {}", kind, self.current.kind),
                self.current.span,
            ))
        }
    }

    /// An unexpected-token error at the current position, with lexer
    /// detail when the token itself is malformed.
    pub(crate) fn unexpected(&mut self) -> ParseError {
        if matches!(self.current.kind, TokenKind::Invalid) {
            let detail = self.lexer.take_error().unwrap_or("invalid token");
            return ParseError::new(detail, self.current.span);
        }
        ParseError::new(
            format!("Unexpected token {}", self.current.kind),
            self.current.span,
        )
    }

    /// Consume an identifier, allowing the contextual keywords that are
    /// valid binding names.
    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        let name = match &self.current.kind {
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::From | TokenKind::As | TokenKind::Get | TokenKind::Set => {
                self.current.kind.keyword_name().unwrap_or_default().to_string()
            }
            _ => {
                return Err(ParseError::new(
                    format!("Expected identifier, got {}", self.current.kind),
                    self.current.span,
                ))
            }
        };
        self.advance();
        Ok(name)
    }

    /// Member name after `.`: any identifier or keyword.
    fn member_name(&mut self) -> Result<String, ParseError> {
        let name = match &self.current.kind {
            TokenKind::Identifier(name) => name.clone(),
            kind => match kind.keyword_name() {
                Some(kw) => kw.to_string(),
                None => {
                    return Err(ParseError::new(
                        format!("Expected identifier, got {}", self.current.kind),
                        self.current.span,
                    ))
                }
            },
        };
        self.advance();
        Ok(name)
    }

    /// Automatic semicolon insertion: an explicit `;` is consumed; a
    /// closing brace or paren, end of file, or a preceding line
    /// terminator satisfy the rule without consuming anything.
    fn semicolon(&mut self) -> Result<(), ParseError> {
        if matches!(self.current.kind, TokenKind::RParen | TokenKind::RBrace) {
            return Ok(());
        }
        if self.check(&TokenKind::Semicolon) {
            self.advance();
            return Ok(());
        }
        if self.current.newline_before || self.is_eof() {
            return Ok(());
        }
        Err(ParseError::new(
            format!("Expected semicolon, got {}", self.current.kind),
            self.current.span,
        ))
    }

    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.current.span.start.max(start))
    }

    // =========================================================================
    // Scope
    // =========================================================================

    pub(crate) fn scope(&self) -> &Scope {
        self.scopes.last().expect("scope stack")
    }

    pub(crate) fn scope_mut(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack")
    }

    // =========================================================================
    // Error recovery
    // =========================================================================

    /// Skip tokens until something that can start a statement. Progress
    /// is tracked so a stuck parse consumes at least one token every
    /// `MAX_RECOVER` synchronizations.
    fn next_statement(&mut self) {
        loop {
            match self.current.kind {
                TokenKind::Eof => return,
                TokenKind::Break
                | TokenKind::Continue
                | TokenKind::For
                | TokenKind::If
                | TokenKind::Return
                | TokenKind::Switch
                | TokenKind::Var
                | TokenKind::Let
                | TokenKind::Const
                | TokenKind::Do
                | TokenKind::Try
                | TokenKind::With
                | TokenKind::While
                | TokenKind::Throw
                | TokenKind::Function
                | TokenKind::Import
                | TokenKind::Export => {
                    let idx = self.current.span.start;
                    if idx == self.recover_idx && self.recover_count < MAX_RECOVER {
                        self.recover_count += 1;
                        return;
                    }
                    if idx > self.recover_idx {
                        self.recover_idx = idx;
                        self.recover_count = 0;
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    pub(crate) fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        match self.current.kind {
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::new(StmtKind::Empty, self.span_from(start)))
            }
            TokenKind::LBrace => {
                let body = self.parse_block_list()?;
                Ok(Stmt::new(StmtKind::Block(body), self.span_from(start)))
            }
            TokenKind::Var | TokenKind::Let | TokenKind::Const => self.parse_variable_stmt(),
            TokenKind::Function => {
                let func = self.parse_function(true)?;
                self.scope_mut().declare(Decl::Function(func.clone()));
                Ok(Stmt::new(StmtKind::Function(Box::new(func)), self.span_from(start)))
            }
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::Do => self.parse_do_while_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Break => self.parse_break_stmt(),
            TokenKind::Continue => self.parse_continue_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Throw => self.parse_throw_stmt(),
            TokenKind::Try => self.parse_try_stmt(),
            TokenKind::Switch => self.parse_switch_stmt(),
            TokenKind::With => self.parse_with_stmt(),
            TokenKind::Debugger => {
                self.advance();
                self.semicolon()?;
                Ok(Stmt::new(StmtKind::Debugger, self.span_from(start)))
            }
            TokenKind::Import => self.parse_import_stmt(),
            TokenKind::Export => self.parse_export_stmt(),
            TokenKind::Eof => Err(self.unexpected()),
            _ => self.parse_expression_stmt(),
        }
    }

    /// `{ stmt* }` returning the inner list.
    fn parse_block_list(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        let mut list = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_eof() {
            list.push(self.parse_stmt()?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(list)
    }

    fn parse_expression_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        let expr = self.parse_expression()?;

        // A bare identifier followed by ':' is a label.
        if let ExprKind::Ident(name) = &expr.kind {
            if self.check(&TokenKind::Colon) {
                let label = name.clone();
                self.advance();
                if self.scope().has_label(&label) {
                    return Err(ParseError::new(
                        format!("Label '{label}' already exists"),
                        expr.span,
                    ));
                }
                self.scope_mut().labels.push(label.clone());
                let body = self.parse_stmt();
                self.scope_mut().labels.pop();
                let body = Box::new(body?);
                return Ok(Stmt::new(StmtKind::Labelled { label, body }, self.span_from(start)));
            }
        }

        self.semicolon()?;
        Ok(Stmt::new(StmtKind::Expr(expr), self.span_from(start)))
    }

    fn parse_variable_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        self.advance(); // var / let / const
        let decls = self.parse_var_declaration_list()?;
        self.semicolon()?;
        Ok(Stmt::new(StmtKind::Variable(decls), self.span_from(start)))
    }

    fn parse_var_declaration_list(&mut self) -> Result<Vec<VarDeclarator>, ParseError> {
        let mut list = Vec::new();
        loop {
            if self.check(&TokenKind::LBrace) {
                self.parse_destructuring_declarators(&mut list)?;
            } else {
                list.push(self.parse_var_declarator()?);
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let names = list.iter().map(|d| d.name.clone()).collect();
        self.scope_mut().declare(Decl::Variable(names));
        Ok(list)
    }

    fn parse_var_declarator(&mut self) -> Result<VarDeclarator, ParseError> {
        let start = self.current.span.start;
        let name = self.expect_identifier()?;
        let init = if self.eat(&TokenKind::Eq) {
            Some(self.parse_assign_expr()?)
        } else {
            None
        };
        Ok(VarDeclarator { name, init, span: self.span_from(start) })
    }

    /// `{ a, b } = rhs` desugars into one declarator per name, each
    /// initialized from a member access on the right-hand side.
    fn parse_destructuring_declarators(
        &mut self,
        out: &mut Vec<VarDeclarator>,
    ) -> Result<(), ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::LBrace)?;
        let mut names = Vec::new();
        loop {
            names.push(self.expect_identifier()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        self.expect(&TokenKind::Eq)?;
        let rhs = self.parse_assign_expr()?;
        let span = self.span_from(start);
        for name in names {
            let init = Expr::new(
                ExprKind::Dot { object: Box::new(rhs.clone()), name: name.clone() },
                rhs.span,
            );
            out.push(VarDeclarator { name, init: Some(init), span });
        }
        Ok(())
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::If)?;
        self.expect(&TokenKind::LParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RParen)?;
        let consequent = Box::new(self.parse_stmt()?);
        let alternate = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt::new(
            StmtKind::If { test, consequent, alternate },
            self.span_from(start),
        ))
    }

    fn parse_iteration_body(&mut self) -> Result<Stmt, ParseError> {
        let saved = self.scope().in_iteration;
        self.scope_mut().in_iteration = true;
        let body = self.parse_stmt();
        self.scope_mut().in_iteration = saved;
        body
    }

    fn parse_do_while_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Do)?;
        let body = Box::new(self.parse_iteration_body()?);
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RParen)?;
        // The trailing semicolon of do-while is optional.
        self.eat(&TokenKind::Semicolon);
        Ok(Stmt::new(StmtKind::DoWhile { body, test }, self.span_from(start)))
    }

    fn parse_while_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RParen)?;
        let body = Box::new(self.parse_iteration_body()?);
        Ok(Stmt::new(StmtKind::While { test, body }, self.span_from(start)))
    }

    fn parse_for_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::For)?;
        self.expect(&TokenKind::LParen)?;

        // `in` is not an operator inside the header initializer.
        let saved = self.scope().allow_in;
        self.scope_mut().allow_in = false;
        let header = self.parse_for_header();
        self.scope_mut().allow_in = saved;

        match header? {
            ForHeader::In(left) => {
                let right = self.parse_expression()?;
                self.expect(&TokenKind::RParen)?;
                let body = Box::new(self.parse_iteration_body()?);
                Ok(Stmt::new(StmtKind::ForIn { left, right, body }, self.span_from(start)))
            }
            ForHeader::Classic(init) => {
                self.expect(&TokenKind::Semicolon)?;
                let test = if !self.check(&TokenKind::Semicolon) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                self.expect(&TokenKind::Semicolon)?;
                let update = if !self.check(&TokenKind::RParen) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                self.expect(&TokenKind::RParen)?;
                let body = Box::new(self.parse_iteration_body()?);
                Ok(Stmt::new(
                    StmtKind::For { init, test, update, body },
                    self.span_from(start),
                ))
            }
        }
    }

    fn parse_for_header(&mut self) -> Result<ForHeader, ParseError> {
        if self.check(&TokenKind::Semicolon) {
            return Ok(ForHeader::Classic(None));
        }

        if matches!(self.current.kind, TokenKind::Var | TokenKind::Let | TokenKind::Const) {
            self.advance();
            let list = self.parse_var_declaration_list()?;
            // A single declarator followed by `in` is the for-in form.
            if list.len() == 1 && self.check(&TokenKind::In) {
                self.advance();
                let decl = list.into_iter().next().expect("one declarator");
                return Ok(ForHeader::In(ForInTarget::Var(decl)));
            }
            return Ok(ForHeader::Classic(Some(ForInit::Var(list))));
        }

        let expr = self.parse_expression()?;
        if self.check(&TokenKind::In) {
            match expr.kind {
                ExprKind::Ident(_) | ExprKind::Dot { .. } | ExprKind::Bracket { .. } => {}
                _ => {
                    return Err(ParseError::new(
                        "Invalid left-hand side in for-in",
                        expr.span,
                    ))
                }
            }
            self.advance();
            return Ok(ForHeader::In(ForInTarget::Expr(Box::new(expr))));
        }
        Ok(ForHeader::Classic(Some(ForInit::Expr(Box::new(expr)))))
    }

    fn parse_break_stmt(&mut self) -> Result<Stmt, ParseError> {
        let tok = self.expect(&TokenKind::Break)?;
        let start = tok.span.start;

        let mut terminated = self.current.newline_before;
        if self.check(&TokenKind::Semicolon) {
            terminated = true;
            self.advance();
        }

        if terminated || self.check(&TokenKind::RBrace) || self.is_eof() {
            if !self.scope().in_iteration && !self.scope().in_switch {
                return Err(ParseError::new("Illegal break statement", Span::empty(start)));
            }
            return Ok(Stmt::new(StmtKind::Break(None), self.span_from(start)));
        }

        if let TokenKind::Identifier(name) = &self.current.kind {
            let name = name.clone();
            if !self.scope().has_label(&name) {
                return Err(ParseError::new(
                    format!("Undefined label '{name}'"),
                    self.current.span,
                ));
            }
            self.advance();
            self.semicolon()?;
            return Ok(Stmt::new(StmtKind::Break(Some(name)), self.span_from(start)));
        }

        Err(ParseError::new("Illegal break statement", Span::empty(start)))
    }

    fn parse_continue_stmt(&mut self) -> Result<Stmt, ParseError> {
        let tok = self.expect(&TokenKind::Continue)?;
        let start = tok.span.start;

        let mut terminated = self.current.newline_before;
        if self.check(&TokenKind::Semicolon) {
            terminated = true;
            self.advance();
        }

        if terminated || self.check(&TokenKind::RBrace) || self.is_eof() {
            if !self.scope().in_iteration {
                return Err(ParseError::new(
                    "Illegal continue statement",
                    Span::empty(start),
                ));
            }
            return Ok(Stmt::new(StmtKind::Continue(None), self.span_from(start)));
        }

        if let TokenKind::Identifier(name) = &self.current.kind {
            let name = name.clone();
            if !self.scope().has_label(&name) {
                return Err(ParseError::new(
                    format!("Undefined label '{name}'"),
                    self.current.span,
                ));
            }
            if !self.scope().in_iteration {
                return Err(ParseError::new(
                    "Illegal continue statement",
                    Span::empty(start),
                ));
            }
            self.advance();
            self.semicolon()?;
            return Ok(Stmt::new(StmtKind::Continue(Some(name)), self.span_from(start)));
        }

        Err(ParseError::new("Illegal continue statement", Span::empty(start)))
    }

    fn parse_return_stmt(&mut self) -> Result<Stmt, ParseError> {
        let tok = self.expect(&TokenKind::Return)?;
        let start = tok.span.start;

        if !self.scope().in_function {
            return Err(ParseError::new("Illegal return statement", Span::empty(start)));
        }

        let arg = if !self.current.newline_before
            && !matches!(
                self.current.kind,
                TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
            ) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.semicolon()?;
        Ok(Stmt::new(StmtKind::Return(arg), self.span_from(start)))
    }

    fn parse_throw_stmt(&mut self) -> Result<Stmt, ParseError> {
        let tok = self.expect(&TokenKind::Throw)?;
        let start = tok.span.start;

        if self.current.newline_before {
            return Err(ParseError::new("Illegal newline after throw", Span::empty(start)));
        }
        if self.is_eof() {
            return Err(ParseError::new("Unexpected end of input", Span::empty(start)));
        }

        let arg = self.parse_expression()?;
        self.semicolon()?;
        Ok(Stmt::new(StmtKind::Throw(arg), self.span_from(start)))
    }

    fn parse_try_stmt(&mut self) -> Result<Stmt, ParseError> {
        let tok = self.expect(&TokenKind::Try)?;
        let start = tok.span.start;
        let body = self.parse_block_list()?;

        let catch = if self.eat(&TokenKind::Catch) {
            self.expect(&TokenKind::LParen)?;
            let param = self.expect_identifier()?;
            self.expect(&TokenKind::RParen)?;
            let body = self.parse_block_list()?;
            Some(Catch { param, body })
        } else {
            None
        };

        let finally = if self.eat(&TokenKind::Finally) {
            Some(self.parse_block_list()?)
        } else {
            None
        };

        if catch.is_none() && finally.is_none() {
            return Err(ParseError::new(
                "Missing catch or finally after try",
                Span::empty(start),
            ));
        }

        Ok(Stmt::new(
            StmtKind::Try { body, catch, finally },
            self.span_from(start),
        ))
    }

    fn parse_switch_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Switch)?;
        self.expect(&TokenKind::LParen)?;
        let discriminant = self.parse_expression()?;
        self.expect(&TokenKind::RParen)?;
        self.expect(&TokenKind::LBrace)?;

        let saved = self.scope().in_switch;
        self.scope_mut().in_switch = true;
        let result = self.parse_switch_cases();
        self.scope_mut().in_switch = saved;
        let (cases, default) = result?;

        Ok(Stmt::new(
            StmtKind::Switch { discriminant, cases, default },
            self.span_from(start),
        ))
    }

    fn parse_switch_cases(&mut self) -> Result<(Vec<SwitchCase>, Option<usize>), ParseError> {
        let mut cases = Vec::new();
        let mut default = None;
        while !self.is_eof() {
            if self.eat(&TokenKind::RBrace) {
                break;
            }
            let case_span = self.current.span;
            let test = if self.eat(&TokenKind::Default) {
                if default.is_some() {
                    return Err(ParseError::new("Already saw a default in switch", case_span));
                }
                default = Some(cases.len());
                None
            } else {
                self.expect(&TokenKind::Case)?;
                Some(self.parse_expression()?)
            };
            self.expect(&TokenKind::Colon)?;

            let mut body = Vec::new();
            while !matches!(
                self.current.kind,
                TokenKind::Eof | TokenKind::RBrace | TokenKind::Case | TokenKind::Default
            ) {
                body.push(self.parse_stmt()?);
            }
            cases.push(SwitchCase { test, body });
        }
        Ok((cases, default))
    }

    fn parse_with_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::With)?;
        self.expect(&TokenKind::LParen)?;
        let object = self.parse_expression()?;
        self.expect(&TokenKind::RParen)?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::new(StmtKind::With { object, body }, self.span_from(start)))
    }

    // =========================================================================
    // Modules: import / export
    // =========================================================================

    fn parse_import_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Import)?;

        let mut decl = ImportDecl {
            default: None,
            named: Vec::new(),
            all: None,
            specifier: String::new(),
        };

        if !self.check(&TokenKind::String { value: String::new(), raw: String::new() }) {
            if self.eat(&TokenKind::Star) {
                if !self.eat(&TokenKind::As) {
                    return Err(ParseError::new(
                        "Expected 'as' after '*' in import statement",
                        self.current.span,
                    ));
                }
                decl.all = Some(self.expect_identifier()?);
            } else {
                if matches!(self.current.kind, TokenKind::Identifier(_)) {
                    decl.default = Some(self.expect_identifier()?);
                    self.eat(&TokenKind::Comma);
                }
                if self.eat(&TokenKind::LBrace) {
                    loop {
                        let name = self.expect_identifier()?;
                        let alias = if self.eat(&TokenKind::As) {
                            self.expect_identifier()?
                        } else {
                            name.clone()
                        };
                        decl.named.push(ImportBinding { name, alias });
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(&TokenKind::RBrace)?;
                }
            }

            if !self.eat(&TokenKind::From) {
                return Err(ParseError::new(
                    "Expected import statement to be followed by 'from'",
                    self.current.span,
                ));
            }
        }

        let spec_span = self.current.span;
        decl.specifier = match &self.current.kind {
            TokenKind::String { value, .. } => value.clone(),
            _ => {
                return Err(ParseError::new(
                    "Expected a string literal after import ... from",
                    spec_span,
                ))
            }
        };
        self.advance();
        self.semicolon()?;

        self.note_import_dependency(&decl.specifier, spec_span)?;
        Ok(Stmt::new(StmtKind::Import(decl), self.span_from(start)))
    }

    fn parse_export_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Export)?;

        match self.current.kind {
            TokenKind::Default => {
                self.advance();
                let arg = self.parse_expression()?;
                self.semicolon()?;
                Ok(Stmt::new(StmtKind::ExportDefault(arg), self.span_from(start)))
            }
            TokenKind::Function => {
                let func = self.parse_function(false)?;
                if func.name.is_none() {
                    return Err(ParseError::new(
                        "Expected a name on an exported function",
                        func.span,
                    ));
                }
                Ok(Stmt::new(
                    StmtKind::Export(ExportInner::Function(Box::new(func))),
                    self.span_from(start),
                ))
            }
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                self.advance();
                let decls = self.parse_var_declaration_list()?;
                self.semicolon()?;
                Ok(Stmt::new(
                    StmtKind::Export(ExportInner::Variable(decls)),
                    self.span_from(start),
                ))
            }
            TokenKind::LBrace => Err(ParseError::new(
                "Re-export lists are not supported; export the bindings directly",
                self.current.span,
            )),
            _ => Err(self.unexpected()),
        }
    }

    /// Record an `import` dependency. Imports must resolve at parse time
    /// in module mode.
    fn note_import_dependency(&mut self, specifier: &str, span: Span) -> Result<(), ParseError> {
        let Some(module) = self.module.as_mut() else {
            return Ok(());
        };
        if module.dependencies.contains_key(specifier) {
            return Ok(());
        }
        match module.resolver.resolve_specifier(specifier, &module.path) {
            Some(path) => {
                module.dependencies.insert(specifier.to_string(), path);
                Ok(())
            }
            None => Err(ParseError::new(
                format!(
                    "Could not open module '{}' from '{}'",
                    specifier,
                    module.path.display()
                ),
                span,
            )),
        }
    }

    /// Record a `require("...")` dependency if the specifier resolves;
    /// unresolvable require calls are left for the runtime.
    fn note_require(&mut self, callee: &Expr, args: &[Expr]) {
        let Some(module) = self.module.as_mut() else {
            return;
        };
        let ExprKind::Ident(name) = &callee.kind else {
            return;
        };
        if name != "require" || args.len() != 1 {
            return;
        }
        let ExprKind::String { value, .. } = &args[0].kind else {
            return;
        };
        if module.dependencies.contains_key(value) {
            return;
        }
        if let Some(path) = module.resolver.resolve_specifier(value, &module.path) {
            module.dependencies.insert(value.clone(), path);
        }
    }

    // =========================================================================
    // Functions
    // =========================================================================

    fn parse_function(&mut self, declaration: bool) -> Result<Function, ParseError> {
        let tok = self.expect(&TokenKind::Function)?;
        let start = tok.span.start;

        let name = match &self.current.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ if declaration => {
                return Err(ParseError::new(
                    format!("Expected identifier, got {}", self.current.kind),
                    self.current.span,
                ))
            }
            _ => None,
        };

        let params = self.parse_function_params()?;
        let (body, declarations) = self.parse_function_block()?;
        Ok(Function {
            name,
            params,
            body,
            declarations,
            span: self.span_from(start),
        })
    }

    fn parse_function_params(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.is_eof() {
            params.push(self.expect_identifier()?);
            if !self.check(&TokenKind::RParen) {
                self.expect(&TokenKind::Comma)?;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_function_block(&mut self) -> Result<(Vec<Stmt>, Vec<Decl>), ParseError> {
        self.scopes.push(Scope::new(true));
        let body = self.parse_block_list();
        let scope = self.scopes.pop().expect("function scope");
        Ok((body?, scope.declarations))
    }

    /// Arrow function after its parameter list: `=> expr` or `=> { ... }`.
    /// An expression body is lifted to a single `return`.
    fn parse_arrow_function(&mut self, params: Vec<String>, start: u32) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::Arrow)?;

        self.scopes.push(Scope::new(true));
        let body = if self.check(&TokenKind::LBrace) {
            self.parse_block_list()
        } else {
            self.parse_assign_expr().map(|arg| {
                let span = arg.span;
                vec![Stmt::new(StmtKind::Return(Some(arg)), span)]
            })
        };
        let scope = self.scopes.pop().expect("arrow scope");
        let body = body?;

        let span = self.span_from(start);
        Ok(Expr::new(
            ExprKind::Function(Box::new(Function {
                name: None,
                params,
                body,
                declarations: scope.declarations,
                span,
            })),
            span,
        ))
    }

    /// Reinterpret a parenthesized expression as an arrow parameter list.
    fn arrow_params_from_expr(expr: &Expr) -> Result<Vec<String>, ParseError> {
        match &expr.kind {
            ExprKind::Ident(name) => Ok(vec![name.clone()]),
            ExprKind::Sequence(items) => {
                let mut params = Vec::with_capacity(items.len());
                for item in items {
                    match &item.kind {
                        ExprKind::Ident(name) => params.push(name.clone()),
                        _ => {
                            return Err(ParseError::new(
                                "Invalid arrow-function parameter list",
                                item.span,
                            ))
                        }
                    }
                }
                Ok(params)
            }
            _ => Err(ParseError::new(
                "Invalid arrow-function parameter list",
                expr.span,
            )),
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_assign_expr()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut span = first.span;
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            let next = self.parse_assign_expr()?;
            span = span.merge(next.span);
            items.push(next);
        }
        Ok(Expr::new(ExprKind::Sequence(items), span))
    }

    pub(crate) fn parse_assign_expr(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_conditional_expr()?;

        if self.check(&TokenKind::Arrow) && !self.current.newline_before {
            if let ExprKind::Ident(name) = &left.kind {
                let name = name.clone();
                return self.parse_arrow_function(vec![name], left.span.start);
            }
        }

        let Some(op) = self.current.kind.assignment_operator() else {
            return Ok(left);
        };
        match left.kind {
            ExprKind::Ident(_) | ExprKind::Dot { .. } | ExprKind::Bracket { .. } => {}
            _ => {
                return Err(ParseError::new(
                    "Invalid left-hand side in assignment",
                    left.span,
                ))
            }
        }
        self.advance();
        let right = self.parse_assign_expr()?;
        let span = left.span.merge(right.span);
        Ok(Expr::new(
            ExprKind::Assign { op, left: Box::new(left), right: Box::new(right) },
            span,
        ))
    }

    fn parse_conditional_expr(&mut self) -> Result<Expr, ParseError> {
        let test = self.parse_binary_expr(1)?;
        if !self.eat(&TokenKind::Question) {
            return Ok(test);
        }
        let consequent = self.parse_assign_expr()?;
        self.expect(&TokenKind::Colon)?;
        let alternate = self.parse_assign_expr()?;
        let span = test.span.merge(alternate.span);
        Ok(Expr::new(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        ))
    }

    fn parse_binary_expr(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let Some(prec) = self.current.kind.binary_precedence() else {
                break;
            };
            if prec < min_prec {
                break;
            }
            if matches!(self.current.kind, TokenKind::In) && !self.scope().allow_in {
                break;
            }
            let (op, comparison) = binary_op_of(&self.current.kind);
            self.advance();
            let right = self.parse_binary_expr(prec + 1)?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                    comparison,
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        let op = match self.current.kind {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Delete => Some(UnaryOp::Delete),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            TokenKind::PlusPlus => Some(UnaryOp::Increment),
            TokenKind::MinusMinus => Some(UnaryOp::Decrement),
            _ => None,
        };
        let Some(op) = op else {
            return self.parse_postfix_expr();
        };
        self.advance();
        let operand = self.parse_unary_expr()?;
        if matches!(op, UnaryOp::Increment | UnaryOp::Decrement) {
            Self::check_update_target(&operand)?;
        }
        let span = Span::new(start, operand.span.end);
        Ok(Expr::new(
            ExprKind::Unary { op, operand: Box::new(operand), postfix: false },
            span,
        ))
    }

    fn parse_postfix_expr(&mut self) -> Result<Expr, ParseError> {
        let operand = self.parse_lhs_expr_allow_call()?;
        let op = match self.current.kind {
            TokenKind::PlusPlus if !self.current.newline_before => UnaryOp::Increment,
            TokenKind::MinusMinus if !self.current.newline_before => UnaryOp::Decrement,
            _ => return Ok(operand),
        };
        Self::check_update_target(&operand)?;
        let end = self.current.span.end;
        self.advance();
        let span = Span::new(operand.span.start, end);
        Ok(Expr::new(
            ExprKind::Unary { op, operand: Box::new(operand), postfix: true },
            span,
        ))
    }

    fn check_update_target(operand: &Expr) -> Result<(), ParseError> {
        match operand.kind {
            ExprKind::Ident(_) | ExprKind::Dot { .. } | ExprKind::Bracket { .. } => Ok(()),
            _ => Err(ParseError::new(
                "Invalid left-hand side in assignment",
                operand.span,
            )),
        }
    }

    fn parse_lhs_expr_allow_call(&mut self) -> Result<Expr, ParseError> {
        let saved = self.scope().allow_in;
        self.scope_mut().allow_in = true;
        let result = self.parse_lhs_inner(true);
        self.scope_mut().allow_in = saved;
        result
    }

    /// Member/call chain. `allow_call` is off while parsing a `new`
    /// callee so that `new a.B()` binds the argument list to `new`.
    fn parse_lhs_inner(&mut self, allow_call: bool) -> Result<Expr, ParseError> {
        let mut left = if self.check(&TokenKind::New) {
            self.parse_new_expr()?
        } else {
            self.parse_primary_expr()?
        };

        loop {
            match self.current.kind {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.member_name()?;
                    let span = self.span_from(left.span.start);
                    left = Expr::new(ExprKind::Dot { object: Box::new(left), name }, span);
                }
                TokenKind::LBracket => {
                    self.advance();
                    let member = self.parse_expression()?;
                    let end = self.expect(&TokenKind::RBracket)?.span.end;
                    let span = Span::new(left.span.start, end);
                    left = Expr::new(
                        ExprKind::Bracket { object: Box::new(left), member: Box::new(member) },
                        span,
                    );
                }
                TokenKind::LParen if allow_call => {
                    let (args, end) = self.parse_argument_list()?;
                    self.note_require(&left, &args);
                    let span = Span::new(left.span.start, end);
                    left = Expr::new(ExprKind::Call { callee: Box::new(left), args }, span);
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_new_expr(&mut self) -> Result<Expr, ParseError> {
        let tok = self.expect(&TokenKind::New)?;
        let start = tok.span.start;
        let callee = self.parse_lhs_inner(false)?;
        let args = if self.check(&TokenKind::LParen) {
            self.parse_argument_list()?.0
        } else {
            Vec::new()
        };
        let span = self.span_from(start);
        Ok(Expr::new(ExprKind::New { callee: Box::new(callee), args }, span))
    }

    fn parse_argument_list(&mut self) -> Result<(Vec<Expr>, u32), ParseError> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_assign_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(&TokenKind::RParen)?.span.end;
        Ok((args, end))
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ParseError> {
        let span = self.current.span;
        match self.current.kind.clone() {
            TokenKind::Lt => self.parse_jsx_expr(),
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Ident(name), span))
            }
            // Contextual keywords usable as plain identifiers.
            TokenKind::From | TokenKind::As | TokenKind::Get | TokenKind::Set => {
                let name = self.current.kind.keyword_name().unwrap_or_default().to_string();
                self.advance();
                Ok(Expr::new(ExprKind::Ident(name), span))
            }
            TokenKind::This => {
                self.advance();
                Ok(Expr::new(ExprKind::This, span))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::new(ExprKind::Null, span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(true), span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(false), span))
            }
            TokenKind::Number(raw) => {
                let value = parse_number_literal(&raw)
                    .map_err(|msg| ParseError::new(msg, span))?;
                self.advance();
                Ok(Expr::new(ExprKind::Number { value, raw }, span))
            }
            TokenKind::String { value, raw } => {
                self.advance();
                Ok(Expr::new(ExprKind::String { value, raw }, span))
            }
            TokenKind::Regex(raw) => {
                self.advance();
                Ok(Expr::new(ExprKind::Regex(raw), span))
            }
            TokenKind::TemplateNoSub(_) | TokenKind::TemplateHead(_) => self.parse_template(),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            TokenKind::LParen => self.parse_paren_or_arrow(),
            TokenKind::Function => {
                let func = self.parse_function(false)?;
                let span = func.span;
                Ok(Expr::new(ExprKind::Function(Box::new(func)), span))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_paren_or_arrow(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::LParen)?;

        // `()` is only valid as an empty arrow parameter list.
        if self.eat(&TokenKind::RParen) {
            if !self.check(&TokenKind::Arrow) {
                return Err(self.unexpected());
            }
            return self.parse_arrow_function(Vec::new(), start);
        }

        let expr = self.parse_expression()?;
        self.expect(&TokenKind::RParen)?;

        if self.check(&TokenKind::Arrow) {
            let params = Self::arrow_params_from_expr(&expr)?;
            return self.parse_arrow_function(params, start);
        }
        // Grouping parens are not kept in the AST; the generator
        // parenthesizes structurally.
        Ok(expr)
    }

    fn parse_array_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::LBracket)?;
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RBracket) && !self.is_eof() {
            if self.check(&TokenKind::Comma) {
                self.advance();
                elements.push(None);
                continue;
            }
            elements.push(Some(self.parse_assign_expr()?));
            if !self.check(&TokenKind::RBracket) {
                self.expect(&TokenKind::Comma)?;
            }
        }
        let end = self.expect(&TokenKind::RBracket)?.span.end;
        Ok(Expr::new(ExprKind::Array(elements), Span::new(start, end)))
    }

    fn parse_object_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        self.expect(&TokenKind::LBrace)?;
        let mut props = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_eof() {
            props.push(self.parse_object_property()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(&TokenKind::RBrace)?.span.end;
        Ok(Expr::new(ExprKind::Object(props), Span::new(start, end)))
    }

    fn parse_object_property(&mut self) -> Result<Property, ParseError> {
        if self.eat(&TokenKind::Spread) {
            let value = self.parse_assign_expr()?;
            return Ok(Property { key: String::new(), kind: PropertyKind::Spread, value });
        }

        let accessor = match self.current.kind {
            TokenKind::Get => Some(PropertyKind::Get),
            TokenKind::Set => Some(PropertyKind::Set),
            _ => None,
        };
        let key = self.parse_property_key()?;

        // `get name() {...}` / `set name(v) {...}`
        if let Some(kind) = accessor {
            if !matches!(
                self.current.kind,
                TokenKind::Colon | TokenKind::Comma | TokenKind::RBrace
            ) {
                let start = self.current.span.start;
                let name = self.parse_property_key()?;
                let params = self.parse_function_params()?;
                let (body, declarations) = self.parse_function_block()?;
                let span = self.span_from(start);
                return Ok(Property {
                    key: name,
                    kind,
                    value: Expr::new(
                        ExprKind::Function(Box::new(Function {
                            name: None,
                            params,
                            body,
                            declarations,
                            span,
                        })),
                        span,
                    ),
                });
            }
        }

        self.expect(&TokenKind::Colon)?;
        let value = self.parse_assign_expr()?;
        Ok(Property { key, kind: PropertyKind::Value, value })
    }

    fn parse_property_key(&mut self) -> Result<String, ParseError> {
        let key = match &self.current.kind {
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::String { value, .. } => value.clone(),
            TokenKind::Number(raw) => {
                parse_number_literal(raw).map_err(|msg| ParseError::new(msg, self.current.span))?;
                raw.clone()
            }
            kind => match kind.keyword_name() {
                Some(kw) => kw.to_string(),
                None => {
                    return Err(ParseError::new(
                        format!("Expected property key, got {}", self.current.kind),
                        self.current.span,
                    ))
                }
            },
        };
        self.advance();
        Ok(key)
    }

    /// Template literal. The string parts arrive pre-decoded from the
    /// lexer and are stored as single-quoted string literals; the parts
    /// list alternates strings and substitution expressions.
    fn parse_template(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        let mut parts: Vec<Expr> = Vec::new();

        match self.current.kind.clone() {
            TokenKind::TemplateNoSub(text) => {
                let span = self.current.span;
                self.advance();
                if !text.is_empty() {
                    parts.push(string_part(text, span));
                }
                return Ok(Expr::new(ExprKind::DynamicString(parts), self.span_from(start)));
            }
            TokenKind::TemplateHead(text) => {
                let span = self.current.span;
                parts.push(string_part(text, span));
                self.advance();
            }
            _ => return Err(self.unexpected()),
        }

        loop {
            parts.push(self.parse_expression()?);
            if !self.check(&TokenKind::RBrace) {
                return Err(ParseError::new(
                    "Expected '}' in template string",
                    self.current.span,
                ));
            }
            // Continue scanning the raw template body right after `}`.
            let tok = self.lexer.scan_template_continuation();
            match tok.kind {
                TokenKind::TemplateMiddle(text) => {
                    parts.push(string_part(text, tok.span));
                    self.current = self.lexer.next_token();
                }
                TokenKind::TemplateTail(text) => {
                    parts.push(string_part(text, tok.span));
                    self.current = self.lexer.next_token();
                    break;
                }
                _ => {
                    return Err(ParseError::new("Unterminated template literal", tok.span));
                }
            }
        }

        Ok(Expr::new(ExprKind::DynamicString(parts), self.span_from(start)))
    }
}

enum ForHeader {
    Classic(Option<ForInit>),
    In(ForInTarget),
}

fn string_part(text: String, span: Span) -> Expr {
    let raw = quote_single(&text);
    Expr::new(ExprKind::String { value: text, raw }, span)
}

fn binary_op_of(kind: &TokenKind) -> (BinaryOp, bool) {
    match kind {
        TokenKind::PipePipe => (BinaryOp::Or, false),
        TokenKind::AmpAmp => (BinaryOp::And, false),
        TokenKind::Pipe => (BinaryOp::BitOr, false),
        TokenKind::Caret => (BinaryOp::BitXor, false),
        TokenKind::Amp => (BinaryOp::BitAnd, false),
        TokenKind::EqEq => (BinaryOp::Eq, true),
        TokenKind::EqEqEq => (BinaryOp::StrictEq, true),
        TokenKind::BangEq => (BinaryOp::NotEq, true),
        TokenKind::BangEqEq => (BinaryOp::StrictNotEq, true),
        TokenKind::Lt => (BinaryOp::Lt, true),
        TokenKind::LtEq => (BinaryOp::LtEq, true),
        TokenKind::Gt => (BinaryOp::Gt, true),
        TokenKind::GtEq => (BinaryOp::GtEq, true),
        TokenKind::In => (BinaryOp::In, false),
        TokenKind::Instanceof => (BinaryOp::Instanceof, false),
        TokenKind::LtLt => (BinaryOp::Shl, false),
        TokenKind::GtGt => (BinaryOp::Shr, false),
        TokenKind::GtGtGt => (BinaryOp::UShr, false),
        TokenKind::Plus => (BinaryOp::Add, false),
        TokenKind::Minus => (BinaryOp::Sub, false),
        TokenKind::Star => (BinaryOp::Mul, false),
        TokenKind::Slash => (BinaryOp::Div, false),
        TokenKind::Percent => (BinaryOp::Mod, false),
        _ => unreachable!("not a binary operator"),
    }
}

fn parse_number_literal(raw: &str) -> Result<f64, String> {
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .map_err(|_| format!("Illegal number literal '{raw}'"));
    }
    raw.parse::<f64>()
        .map_err(|_| format!("Illegal number literal '{raw}'"))
}
