//! JSX parsing, integrated into the parser as extension methods.
//!
//! JSX is entered when `<` shows up in expression position. Tags and
//! attribute values tokenize normally; the text between tags is read in
//! raw mode by rewinding the lexer to the byte just past the previous
//! structural token, so whitespace and punctuation inside text survive.

use crate::ast::*;
use crate::parser::{ParseError, Parser};
use crate::span::Span;
use crate::token::TokenKind;

impl<'a> Parser<'a> {
    /// Entry point from primary-expression parsing at a `<` token.
    pub(crate) fn parse_jsx_expr(&mut self) -> Result<Expr, ParseError> {
        let (block, _) = self.parse_jsx_block()?;
        let span = block.span;
        Ok(Expr::new(ExprKind::Jsx(Box::new(block)), span))
    }

    fn parse_jsx_block(&mut self) -> Result<(JsxBlock, u32), ParseError> {
        let lt = self.expect(&TokenKind::Lt)?;
        self.parse_jsx_block_after_lt(lt.span.start)
    }

    /// Parse an element whose `<` has already been consumed. Returns the
    /// block and the byte offset just past its final `>`.
    fn parse_jsx_block_after_lt(&mut self, start: u32) -> Result<(JsxBlock, u32), ParseError> {
        let (opening, raw_end) = self.parse_jsx_opening_element(start)?;

        if opening.self_closing {
            let span = Span::new(start, raw_end);
            return Ok((
                JsxBlock { opening, children: Vec::new(), closing: None, span },
                raw_end,
            ));
        }

        let (children, closing, end) = self.parse_jsx_children(raw_end)?;
        let span = Span::new(start, end);
        Ok((
            JsxBlock { opening, children, closing: Some(closing), span },
            end,
        ))
    }

    fn parse_jsx_opening_element(&mut self, start: u32) -> Result<(JsxElement, u32), ParseError> {
        let name = if matches!(self.current.kind, TokenKind::Identifier(_)) {
            Some(self.parse_jsx_name()?)
        } else {
            None
        };

        let mut props = Vec::new();
        loop {
            if self.check(&TokenKind::LBrace) {
                // `{...expr}` spread property
                self.advance();
                self.expect(&TokenKind::Spread)?;
                let value = self.parse_assign_expr()?;
                self.lexer.set_regex_allowed(false);
                self.expect(&TokenKind::RBrace)?;
                props.push(Property { key: String::new(), kind: PropertyKind::Spread, value });
            } else if matches!(self.current.kind, TokenKind::Identifier(_))
                || self.current.kind.keyword_name().is_some()
            {
                props.push(self.parse_jsx_property()?);
            } else {
                break;
            }
        }

        if self.check(&TokenKind::Slash) {
            self.advance();
            let gt = self.expect(&TokenKind::Gt)?;
            return Ok((
                JsxElement {
                    name,
                    props,
                    self_closing: true,
                    span: Span::new(start, gt.span.end),
                },
                gt.span.end,
            ));
        }

        let gt = self.expect(&TokenKind::Gt)?;
        Ok((
            JsxElement {
                name,
                props,
                self_closing: false,
                span: Span::new(start, gt.span.end),
            },
            gt.span.end,
        ))
    }

    /// Tag name, possibly dotted: `div`, `Foo`, `Foo.Bar`.
    fn parse_jsx_name(&mut self) -> Result<String, ParseError> {
        let mut name = match &self.current.kind {
            TokenKind::Identifier(n) => n.clone(),
            _ => return Err(self.unexpected()),
        };
        self.advance();
        while self.eat(&TokenKind::Dot) {
            match &self.current.kind {
                TokenKind::Identifier(part) => {
                    name.push('.');
                    name.push_str(part);
                    self.advance();
                }
                _ => return Err(self.unexpected()),
            }
        }
        Ok(name)
    }

    /// `name="literal"` or `name={expression}`.
    fn parse_jsx_property(&mut self) -> Result<Property, ParseError> {
        let key = match &self.current.kind {
            TokenKind::Identifier(n) => Some(n.clone()),
            kind => kind.keyword_name().map(str::to_string),
        };
        let Some(key) = key else {
            return Err(self.unexpected());
        };
        self.advance();
        self.expect(&TokenKind::Eq)?;

        let value = match self.current.kind.clone() {
            TokenKind::String { value, raw } => {
                let span = self.current.span;
                self.advance();
                Expr::new(ExprKind::String { value, raw }, span)
            }
            TokenKind::LBrace => {
                self.advance();
                let expr = self.parse_assign_expr()?;
                self.lexer.set_regex_allowed(false);
                self.expect(&TokenKind::RBrace)?;
                expr
            }
            _ => return Err(self.unexpected()),
        };

        Ok(Property { key, kind: PropertyKind::Value, value })
    }

    /// Children plus the closing tag. `raw_from` is the byte offset just
    /// past the opening tag's `>`; raw text restarts there after every
    /// structural child.
    fn parse_jsx_children(
        &mut self,
        mut raw_from: u32,
    ) -> Result<(Vec<JsxChild>, JsxElement, u32), ParseError> {
        let mut children = Vec::new();
        loop {
            self.lexer.set_pos(raw_from);
            let (text, _) = self.lexer.scan_jsx_text();
            if !text.is_empty() {
                children.push(JsxChild::Text(text));
            }
            self.lexer.set_regex_allowed(false);
            self.current = self.lexer.next_token();

            match self.current.kind {
                TokenKind::Lt => {
                    let lt_start = self.current.span.start;
                    self.lexer.set_regex_allowed(false);
                    self.advance();
                    if self.check(&TokenKind::Slash) {
                        self.advance();
                        let name = if matches!(self.current.kind, TokenKind::Identifier(_)) {
                            Some(self.parse_jsx_name()?)
                        } else {
                            None
                        };
                        let gt = self.expect(&TokenKind::Gt)?;
                        let closing = JsxElement {
                            name,
                            props: Vec::new(),
                            self_closing: false,
                            span: Span::new(lt_start, gt.span.end),
                        };
                        return Ok((children, closing, gt.span.end));
                    }
                    let (child, end) = self.parse_jsx_block_after_lt(lt_start)?;
                    children.push(JsxChild::Element(child));
                    raw_from = end;
                }
                TokenKind::LBrace => {
                    self.advance();
                    let expr = self.parse_expression()?;
                    if !self.check(&TokenKind::RBrace) {
                        return Err(ParseError::new(
                            "Expected '}' in JSX expression",
                            self.current.span,
                        ));
                    }
                    raw_from = self.current.span.end;
                    children.push(JsxChild::Expr(expr));
                    // The lexer is rewound at the top of the loop; the
                    // stale lookahead after `}` is discarded there.
                }
                _ => {
                    return Err(ParseError::new(
                        "Unterminated JSX element",
                        self.current.span,
                    ))
                }
            }
        }
    }
}
