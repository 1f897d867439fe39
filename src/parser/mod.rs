pub mod ast;

use crate::diagnostics::UnbedError;
use crate::lexer::{self, Token};
use crate::span::{Span, Spanned};
use ast::*;

/// Lex and parse a whole source file.
pub fn parse_file(source: &str, file_id: u32) -> Result<File, UnbedError> {
    let tokens = lexer::lex(source, file_id)?;
    let mut parser = Parser::new(&tokens, source, file_id);
    parser.parse_file()
}

/// Lex and parse a standalone expression. Trailing input is an error.
pub fn parse_expr(source: &str) -> Result<Spanned<Expr>, UnbedError> {
    let tokens = lexer::lex(source, 0)?;
    let mut parser = Parser::new(&tokens, source, 0);
    let expr = parser.parse_expr()?;
    parser.eat(Token::Semi);
    match parser.peek_tok() {
        None => Ok(expr),
        Some(tok) => Err(UnbedError::syntax(format!("unexpected {} after expression", tok.node), tok.span)),
    }
}

pub struct Parser<'a> {
    tokens: &'a [Spanned<Token>],
    source: &'a str,
    pos: usize,
    file_id: u32,
    next_id: ExprId,
    /// Set while parsing an `if`/`for`/`switch` header, where `T {` opens the body.
    no_composite: bool,
}

struct RangeClause {
    key: Option<Spanned<Expr>>,
    value: Option<Spanned<Expr>>,
    define: bool,
    iterable: Spanned<Expr>,
}

/// First clause of a `for` header.
enum ForClause {
    Stmt(Spanned<Stmt>),
    Range(RangeClause),
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Spanned<Token>], source: &'a str, file_id: u32) -> Self {
        Self { tokens, source, pos: 0, file_id, next_id: 0, no_composite: false }
    }

    // ── token plumbing ───────────────────────────────────────────────

    fn peek_tok(&self) -> Option<&Spanned<Token>> {
        self.tokens.get(self.pos)
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|t| t.node)
    }

    fn peek_at(&self, n: usize) -> Option<Token> {
        self.tokens.get(self.pos + n).map(|t| t.node)
    }

    fn at(&self, tok: Token) -> bool {
        self.peek() == Some(tok)
    }

    fn advance(&mut self) -> Option<&Spanned<Token>> {
        let tok = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(tok)
    }

    fn eat(&mut self, tok: Token) -> bool {
        if self.at(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<Span, UnbedError> {
        match self.tokens.get(self.pos) {
            Some(tok) if tok.node == expected => {
                self.pos += 1;
                Ok(tok.span)
            }
            Some(tok) => Err(UnbedError::syntax(format!("expected {expected}, found {}", tok.node), tok.span)),
            None => Err(UnbedError::syntax(format!("expected {expected}, found end of file"), self.eof_span())),
        }
    }

    fn expect_ident(&mut self) -> Result<Spanned<String>, UnbedError> {
        match self.tokens.get(self.pos) {
            Some(tok) if tok.node == Token::Ident => {
                self.pos += 1;
                Ok(Spanned::new(self.text(tok.span).to_string(), tok.span))
            }
            Some(tok) => Err(UnbedError::syntax(format!("expected identifier, found {}", tok.node), tok.span)),
            None => Err(UnbedError::syntax("expected identifier, found end of file", self.eof_span())),
        }
    }

    /// A statement terminator; optional before a closing `)` or `}`.
    fn expect_semi(&mut self) -> Result<(), UnbedError> {
        match self.peek() {
            Some(Token::Semi) => {
                self.pos += 1;
                Ok(())
            }
            Some(Token::RParen) | Some(Token::RBrace) | None => Ok(()),
            Some(_) => {
                let tok = &self.tokens[self.pos];
                Err(UnbedError::syntax(format!("unexpected {} at end of statement", tok.node), tok.span))
            }
        }
    }

    fn eof_span(&self) -> Span {
        Span::with_file(self.source.len(), self.source.len(), self.file_id)
    }

    fn current_span(&self) -> Span {
        self.peek_tok().map(|t| t.span).unwrap_or_else(|| self.eof_span())
    }

    fn prev_end(&self) -> usize {
        if self.pos == 0 { 0 } else { self.tokens[self.pos - 1].span.end }
    }

    fn text(&self, span: Span) -> &'a str {
        &self.source[span.start..span.end]
    }

    fn span_from(&self, start: usize) -> Span {
        Span::with_file(start, self.prev_end().max(start), self.file_id)
    }

    fn mk(&mut self, kind: ExprKind, span: Span) -> Spanned<Expr> {
        let id = self.next_id;
        self.next_id += 1;
        Spanned::new(Expr { id, kind }, span)
    }

    fn unsupported(&self, what: &str) -> UnbedError {
        UnbedError::syntax(format!("{what} is not supported"), self.current_span())
    }

    fn with_composites<T>(&mut self, allowed: bool, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = self.no_composite;
        self.no_composite = !allowed;
        let out = f(self);
        self.no_composite = saved;
        out
    }

    // ── file level ───────────────────────────────────────────────────

    pub fn parse_file(&mut self) -> Result<File, UnbedError> {
        self.expect(Token::Package)?;
        let package = self.expect_ident()?;
        self.expect_semi()?;

        let mut imports = Vec::new();
        while self.at(Token::Import) {
            self.advance();
            if self.eat(Token::LParen) {
                while !self.at(Token::RParen) {
                    imports.push(self.parse_import_spec()?);
                    self.expect_semi()?;
                }
                self.expect(Token::RParen)?;
            } else {
                imports.push(self.parse_import_spec()?);
            }
            self.expect_semi()?;
        }

        let mut decls = Vec::new();
        while let Some(tok) = self.peek_tok() {
            match tok.node {
                Token::Type => decls.extend(self.parse_type_decl()?.into_iter().map(Decl::Type)),
                Token::Var => decls.extend(self.parse_value_decl(false)?.into_iter().map(Decl::Var)),
                Token::Const => decls.extend(self.parse_value_decl(true)?.into_iter().map(Decl::Const)),
                Token::Func => decls.push(Decl::Func(self.parse_func_decl()?)),
                Token::Import => {
                    return Err(UnbedError::syntax("imports must appear before other declarations", tok.span));
                }
                Token::Semi => {
                    self.advance();
                    continue;
                }
                other => {
                    return Err(UnbedError::syntax(
                        format!("expected declaration, found {other}"),
                        tok.span,
                    ));
                }
            }
            self.expect_semi()?;
        }

        Ok(File { package, imports, decls, expr_count: self.next_id })
    }

    fn parse_import_spec(&mut self) -> Result<Spanned<ImportSpec>, UnbedError> {
        let start = self.current_span().start;
        let alias = match self.peek() {
            Some(Token::Ident) => Some(self.expect_ident()?),
            Some(Token::Dot) => {
                let span = self.expect(Token::Dot)?;
                Some(Spanned::new(".".to_string(), span))
            }
            _ => None,
        };
        let path = self.parse_string_lit()?;
        Ok(Spanned::new(ImportSpec { alias, path }, self.span_from(start)))
    }

    fn parse_string_lit(&mut self) -> Result<Spanned<String>, UnbedError> {
        match self.peek_tok() {
            Some(tok) if matches!(tok.node, Token::StringLit | Token::RawStringLit) => {
                let span = tok.span;
                self.advance();
                let value = unquote(self.text(span)).map_err(|msg| UnbedError::syntax(msg, span))?;
                Ok(Spanned::new(value, span))
            }
            Some(tok) => Err(UnbedError::syntax(format!("expected string literal, found {}", tok.node), tok.span)),
            None => Err(UnbedError::syntax("expected string literal, found end of file", self.eof_span())),
        }
    }

    /// `type T U`, `type T = U`, or a parenthesized group of either.
    fn parse_type_decl(&mut self) -> Result<Vec<Spanned<TypeSpec>>, UnbedError> {
        self.expect(Token::Type)?;
        let mut specs = Vec::new();
        if self.eat(Token::LParen) {
            while !self.at(Token::RParen) {
                specs.push(self.parse_type_spec()?);
                self.expect_semi()?;
            }
            self.expect(Token::RParen)?;
        } else {
            specs.push(self.parse_type_spec()?);
        }
        Ok(specs)
    }

    fn parse_type_spec(&mut self) -> Result<Spanned<TypeSpec>, UnbedError> {
        let name = self.expect_ident()?;
        let start = name.span.start;
        if self.at(Token::LBracket) && self.peek_at(1) == Some(Token::Ident) && self.peek_at(2) != Some(Token::RBracket) {
            return Err(self.unsupported("generic type declaration"));
        }
        let alias = self.eat(Token::Eq);
        let ty = self.parse_type()?;
        Ok(Spanned::new(TypeSpec { name, alias, ty }, self.span_from(start)))
    }

    /// `var`/`const` declarations. Const groups track `iota`.
    fn parse_value_decl(&mut self, is_const: bool) -> Result<Vec<Spanned<ValueSpec>>, UnbedError> {
        self.advance();
        let mut specs = Vec::new();
        if self.eat(Token::LParen) {
            let mut iota = 0;
            while !self.at(Token::RParen) {
                specs.push(self.parse_value_spec(is_const, iota)?);
                iota += 1;
                self.expect_semi()?;
            }
            self.expect(Token::RParen)?;
        } else {
            specs.push(self.parse_value_spec(is_const, 0)?);
        }
        Ok(specs)
    }

    fn parse_value_spec(&mut self, is_const: bool, iota: usize) -> Result<Spanned<ValueSpec>, UnbedError> {
        let start = self.current_span().start;
        let mut names = vec![self.expect_ident()?];
        while self.eat(Token::Comma) {
            names.push(self.expect_ident()?);
        }
        let ty = if !self.at(Token::Eq) && !self.at(Token::Semi) && !self.at(Token::RParen) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let values = if self.eat(Token::Eq) { self.parse_expr_list()? } else { Vec::new() };
        if !is_const && ty.is_none() && values.is_empty() {
            return Err(UnbedError::syntax("missing variable type or initialization", self.span_from(start)));
        }
        if is_const && iota == 0 && values.is_empty() {
            return Err(UnbedError::syntax("missing init expr for const declaration", self.span_from(start)));
        }
        Ok(Spanned::new(ValueSpec { names, ty, values, iota }, self.span_from(start)))
    }

    fn parse_func_decl(&mut self) -> Result<Spanned<FuncDecl>, UnbedError> {
        let start = self.expect(Token::Func)?.start;
        let recv = if self.at(Token::LParen) { Some(self.parse_receiver()?) } else { None };
        let name = self.expect_ident()?;
        if self.at(Token::LBracket) {
            return Err(self.unsupported("generic function"));
        }
        let sig = self.parse_signature()?;
        let body = if self.at(Token::LBrace) {
            Some(self.with_composites(true, |p| p.parse_block())?)
        } else {
            None
        };
        Ok(Spanned::new(FuncDecl { recv, name, sig, body }, self.span_from(start)))
    }

    fn parse_receiver(&mut self) -> Result<Receiver, UnbedError> {
        self.expect(Token::LParen)?;
        let name = if self.at(Token::Ident) && matches!(self.peek_at(1), Some(Token::Ident) | Some(Token::Star)) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        let pointer = self.eat(Token::Star);
        let base = self.expect_ident()?;
        self.eat(Token::Comma);
        self.expect(Token::RParen)?;
        Ok(Receiver { name, pointer, base })
    }

    // ── types ────────────────────────────────────────────────────────

    fn parse_signature(&mut self) -> Result<Signature, UnbedError> {
        let (params, variadic) = self.parse_params()?;
        let results = if self.at(Token::LParen) {
            let (results, variadic) = self.parse_params()?;
            if variadic {
                return Err(UnbedError::syntax("can only use ... with final parameter", self.current_span()));
            }
            results
        } else if self.at_type_start() {
            let ty = self.parse_type()?;
            vec![Param { name: None, ty }]
        } else {
            Vec::new()
        };
        Ok(Signature { params, results, variadic })
    }

    fn at_type_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Ident | Token::Star | Token::LBracket | Token::Map | Token::Func | Token::Struct | Token::Interface | Token::Chan)
        )
    }

    /// Parameter list with Go's grouping rules: `(a, b int, c string)` or `(int, string)`.
    fn parse_params(&mut self) -> Result<(Vec<Param>, bool), UnbedError> {
        self.expect(Token::LParen)?;
        let mut entries: Vec<(Option<Spanned<String>>, Option<Spanned<TypeExpr>>, bool)> = Vec::new();
        while !self.at(Token::RParen) {
            if self.eat(Token::Ellipsis) {
                let ty = self.parse_type()?;
                entries.push((None, Some(ty), true));
            } else {
                let ty = self.parse_type()?;
                if !self.at(Token::Comma) && !self.at(Token::RParen) {
                    let name = match &ty.node {
                        TypeExpr::Name(n) => Spanned::new(n.clone(), ty.span),
                        _ => return Err(UnbedError::syntax("expected parameter name", ty.span)),
                    };
                    let dots = self.eat(Token::Ellipsis);
                    let pty = self.parse_type()?;
                    entries.push((Some(name), Some(pty), dots));
                } else {
                    entries.push((None, Some(ty), false));
                }
            }
            if !self.eat(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen)?;

        let variadic = entries.last().is_some_and(|e| e.2);
        if entries.iter().rev().skip(1).any(|e| e.2) {
            return Err(UnbedError::syntax("can only use ... with final parameter", self.span_from(self.prev_end())));
        }

        let named = entries.iter().any(|e| e.0.is_some());
        if !named {
            let params = entries.into_iter().filter_map(|(_, ty, _)| ty).map(|ty| Param { name: None, ty }).collect();
            return Ok((params, variadic));
        }

        // Named: bare identifiers before a typed entry share its type.
        let mut params = Vec::new();
        let mut pending: Vec<Spanned<String>> = Vec::new();
        for (name, ty, _) in entries {
            let Some(ty) = ty else { continue };
            match name {
                None => match &ty.node {
                    TypeExpr::Name(n) => pending.push(Spanned::new(n.clone(), ty.span)),
                    _ => return Err(UnbedError::syntax("mixed named and unnamed parameters", ty.span)),
                },
                Some(name) => {
                    for p in pending.drain(..) {
                        params.push(Param { name: Some(p), ty: ty.clone() });
                    }
                    params.push(Param { name: Some(name), ty });
                }
            }
        }
        if let Some(p) = pending.first() {
            return Err(UnbedError::syntax("mixed named and unnamed parameters", p.span));
        }
        Ok((params, variadic))
    }

    pub fn parse_type(&mut self) -> Result<Spanned<TypeExpr>, UnbedError> {
        let start = self.current_span().start;
        let ty = match self.peek() {
            Some(Token::Ident) => {
                let name = self.expect_ident()?;
                if self.at(Token::Dot) && self.peek_at(1) == Some(Token::Ident) {
                    self.advance();
                    let member = self.expect_ident()?;
                    TypeExpr::Qualified { pkg: name, name: member }
                } else {
                    TypeExpr::Name(name.node)
                }
            }
            Some(Token::Star) => {
                self.advance();
                TypeExpr::Pointer(Box::new(self.parse_type()?))
            }
            Some(Token::LBracket) => {
                self.advance();
                if self.eat(Token::RBracket) {
                    TypeExpr::Slice(Box::new(self.parse_type()?))
                } else if self.eat(Token::Ellipsis) {
                    self.expect(Token::RBracket)?;
                    TypeExpr::Array { len: None, elem: Box::new(self.parse_type()?) }
                } else {
                    let len = self.with_composites(true, |p| p.parse_expr())?;
                    self.expect(Token::RBracket)?;
                    TypeExpr::Array { len: Some(Box::new(len)), elem: Box::new(self.parse_type()?) }
                }
            }
            Some(Token::Map) => {
                self.advance();
                self.expect(Token::LBracket)?;
                let key = self.parse_type()?;
                self.expect(Token::RBracket)?;
                let value = self.parse_type()?;
                TypeExpr::Map { key: Box::new(key), value: Box::new(value) }
            }
            Some(Token::Func) => {
                self.advance();
                TypeExpr::Func(Box::new(self.parse_signature()?))
            }
            Some(Token::Struct) => self.parse_struct_type()?,
            Some(Token::Interface) => self.parse_interface_type()?,
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_type()?;
                self.expect(Token::RParen)?;
                return Ok(Spanned::new(inner.node, self.span_from(start)));
            }
            Some(Token::Chan) | Some(Token::Arrow) => return Err(self.unsupported("channel type")),
            Some(other) => {
                return Err(UnbedError::syntax(format!("expected type, found {other}"), self.current_span()));
            }
            None => return Err(UnbedError::syntax("expected type, found end of file", self.eof_span())),
        };
        Ok(Spanned::new(ty, self.span_from(start)))
    }

    fn parse_struct_type(&mut self) -> Result<TypeExpr, UnbedError> {
        self.expect(Token::Struct)?;
        self.expect(Token::LBrace)?;
        let mut fields = Vec::new();
        while !self.at(Token::RBrace) {
            let embedded = match (self.peek(), self.peek_at(1)) {
                (Some(Token::Star), _) => true,
                (Some(Token::Ident), Some(Token::Semi | Token::RBrace | Token::StringLit | Token::RawStringLit | Token::Dot)) => true,
                _ => false,
            };
            let (names, ty) = if embedded {
                let ty = self.parse_type()?;
                if ty.node.embedded_name().is_none() {
                    return Err(UnbedError::syntax("embedded field must be a type name or pointer to a type name", ty.span));
                }
                (Vec::new(), ty)
            } else {
                let mut names = vec![self.expect_ident()?];
                while self.eat(Token::Comma) {
                    names.push(self.expect_ident()?);
                }
                (names, self.parse_type()?)
            };
            let tag = if matches!(self.peek(), Some(Token::StringLit | Token::RawStringLit)) {
                Some(self.parse_string_lit()?.node)
            } else {
                None
            };
            fields.push(FieldDecl { names, ty, tag });
            self.expect_semi()?;
        }
        self.expect(Token::RBrace)?;
        Ok(TypeExpr::Struct(fields))
    }

    fn parse_interface_type(&mut self) -> Result<TypeExpr, UnbedError> {
        self.expect(Token::Interface)?;
        self.expect(Token::LBrace)?;
        let mut elems = Vec::new();
        while !self.at(Token::RBrace) {
            if self.at(Token::Ident) && self.peek_at(1) == Some(Token::LParen) {
                let name = self.expect_ident()?;
                let sig = self.parse_signature()?;
                elems.push(InterfaceElem::Method { name, sig });
            } else {
                if matches!(self.peek(), Some(Token::Tilde | Token::Pipe)) {
                    return Err(self.unsupported("type constraint"));
                }
                elems.push(InterfaceElem::Embed(self.parse_type()?));
            }
            self.expect_semi()?;
        }
        self.expect(Token::RBrace)?;
        Ok(TypeExpr::Interface(elems))
    }

    // ── statements ───────────────────────────────────────────────────

    fn parse_block(&mut self) -> Result<Spanned<Block>, UnbedError> {
        let start = self.expect(Token::LBrace)?.start;
        let stmts = self.with_composites(true, |p| p.parse_stmt_list())?;
        self.expect(Token::RBrace)?;
        Ok(Spanned::new(Block { stmts }, self.span_from(start)))
    }

    fn parse_stmt_list(&mut self) -> Result<Vec<Spanned<Stmt>>, UnbedError> {
        let mut stmts = Vec::new();
        while !matches!(self.peek(), None | Some(Token::RBrace | Token::Case | Token::Default)) {
            if self.eat(Token::Semi) {
                continue;
            }
            stmts.push(self.parse_stmt()?);
            if !matches!(self.peek(), Some(Token::Case | Token::Default)) {
                self.expect_semi()?;
            }
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Spanned<Stmt>, UnbedError> {
        let start = self.current_span().start;
        let stmt = match self.peek() {
            Some(Token::Var) => {
                let specs = self.parse_value_decl(false)?;
                return Ok(self.decl_stmt(specs.into_iter().map(Decl::Var).collect(), start));
            }
            Some(Token::Const) => {
                let specs = self.parse_value_decl(true)?;
                return Ok(self.decl_stmt(specs.into_iter().map(Decl::Const).collect(), start));
            }
            Some(Token::Type) => {
                let specs = self.parse_type_decl()?;
                return Ok(self.decl_stmt(specs.into_iter().map(Decl::Type).collect(), start));
            }
            Some(Token::LBrace) => Stmt::Block(self.parse_block()?),
            Some(Token::If) => return self.parse_if(),
            Some(Token::For) => return self.parse_for(),
            Some(Token::Switch) => return self.parse_switch(),
            Some(Token::Return) => {
                self.advance();
                let values = if matches!(self.peek(), Some(Token::Semi | Token::RBrace)) {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                Stmt::Return(values)
            }
            Some(Token::Break) => {
                self.advance();
                self.reject_label()?;
                Stmt::Branch(BranchKind::Break)
            }
            Some(Token::Continue) => {
                self.advance();
                self.reject_label()?;
                Stmt::Branch(BranchKind::Continue)
            }
            Some(Token::Go) => {
                self.advance();
                Stmt::Go(self.parse_expr()?)
            }
            Some(Token::Defer) => {
                self.advance();
                Stmt::Defer(self.parse_expr()?)
            }
            Some(Token::Goto) => return Err(self.unsupported("goto")),
            Some(Token::Fallthrough) => return Err(self.unsupported("fallthrough")),
            Some(Token::Select) => return Err(self.unsupported("select")),
            Some(Token::Semi) => Stmt::Empty,
            _ => return self.parse_simple_stmt(),
        };
        Ok(Spanned::new(stmt, self.span_from(start)))
    }

    fn decl_stmt(&self, decls: Vec<Decl>, start: usize) -> Spanned<Stmt> {
        Spanned::new(Stmt::Decl(decls), self.span_from(start))
    }

    fn reject_label(&self) -> Result<(), UnbedError> {
        if self.at(Token::Ident) {
            return Err(self.unsupported("labeled branch"));
        }
        Ok(())
    }

    fn parse_simple_stmt(&mut self) -> Result<Spanned<Stmt>, UnbedError> {
        let start = self.current_span().start;
        let lhs = self.parse_expr_list()?;
        self.finish_simple_stmt(lhs, start)
    }

    /// A simple statement or a range clause.
    fn parse_for_clause(&mut self) -> Result<ForClause, UnbedError> {
        let start = self.current_span().start;
        if self.eat(Token::Range) {
            let iterable = self.parse_expr()?;
            return Ok(ForClause::Range(RangeClause { key: None, value: None, define: false, iterable }));
        }

        let mut lhs = self.parse_expr_list()?;
        if matches!(self.peek(), Some(Token::ColonEq) | Some(Token::Eq)) && self.peek_at(1) == Some(Token::Range) {
            let define = self.at(Token::ColonEq);
            self.advance();
            self.advance();
            if lhs.len() > 2 {
                return Err(UnbedError::syntax("range clause permits at most two iteration variables", lhs[2].span));
            }
            let iterable = self.parse_expr()?;
            let value = if lhs.len() == 2 { lhs.pop() } else { None };
            let key = lhs.pop();
            return Ok(ForClause::Range(RangeClause { key, value, define, iterable }));
        }
        self.finish_simple_stmt(lhs, start).map(ForClause::Stmt)
    }

    /// The rest of a simple statement whose leading expressions are parsed.
    fn finish_simple_stmt(&mut self, lhs: Vec<Spanned<Expr>>, start: usize) -> Result<Spanned<Stmt>, UnbedError> {
        let stmt = match self.peek() {
            Some(Token::ColonEq) | Some(Token::Eq) => {
                let define = self.at(Token::ColonEq);
                self.advance();
                let rhs = self.parse_expr_list()?;
                if define {
                    let mut names = Vec::new();
                    for e in lhs {
                        match e.ident_name() {
                            Some(n) => names.push(Spanned::new(n.to_string(), e.span)),
                            None => return Err(UnbedError::syntax("non-name on left side of :=", e.span)),
                        }
                    }
                    Stmt::ShortVarDecl { names, values: rhs }
                } else {
                    Stmt::Assign { lhs, op: None, rhs }
                }
            }
            Some(tok) if assign_op(tok).is_some() => {
                self.advance();
                let rhs = self.parse_expr_list()?;
                if lhs.len() != 1 || rhs.len() != 1 {
                    return Err(UnbedError::syntax(format!("assignment operator {tok} requires single-valued expressions"), self.span_from(start)));
                }
                Stmt::Assign { lhs, op: assign_op(tok), rhs }
            }
            Some(Token::PlusPlus) | Some(Token::MinusMinus) => {
                let inc = self.at(Token::PlusPlus);
                self.advance();
                let target = single(lhs, "++/--")?;
                Stmt::IncDec { target, inc }
            }
            Some(Token::Colon) if lhs.len() == 1 && lhs[0].ident_name().is_some() => {
                return Err(self.unsupported("labeled statement"));
            }
            Some(Token::Arrow) => return Err(self.unsupported("channel send")),
            _ => Stmt::Expr(single(lhs, "expression statement")?),
        };
        Ok(Spanned::new(stmt, self.span_from(start)))
    }

    fn parse_if(&mut self) -> Result<Spanned<Stmt>, UnbedError> {
        let start = self.expect(Token::If)?.start;
        let (init, cond) = self.with_composites(false, |p| -> Result<_, UnbedError> {
            let first = p.parse_simple_stmt()?;
            if p.eat(Token::Semi) {
                let cond = p.parse_expr()?;
                Ok((Some(Box::new(first)), cond))
            } else {
                Ok((None, stmt_as_expr(first, "if")?))
            }
        })?;
        let then_block = self.parse_block()?;
        let else_branch = if self.eat(Token::Else) {
            match self.peek() {
                Some(Token::If) => Some(Box::new(self.parse_if()?)),
                Some(Token::LBrace) => {
                    let block = self.parse_block()?;
                    let span = block.span;
                    Some(Box::new(Spanned::new(Stmt::Block(block), span)))
                }
                _ => return Err(UnbedError::syntax("else must be followed by if or statement block", self.current_span())),
            }
        } else {
            None
        };
        Ok(Spanned::new(Stmt::If { init, cond, then_block, else_branch }, self.span_from(start)))
    }

    fn parse_for(&mut self) -> Result<Spanned<Stmt>, UnbedError> {
        let start = self.expect(Token::For)?.start;
        if self.at(Token::LBrace) {
            let body = self.parse_block()?;
            return Ok(Spanned::new(Stmt::For { init: None, cond: None, post: None, body }, self.span_from(start)));
        }

        enum Header {
            Range(RangeClause),
            Clauses(Option<Box<Spanned<Stmt>>>, Option<Spanned<Expr>>, Option<Box<Spanned<Stmt>>>),
        }

        let header = self.with_composites(false, |p| -> Result<Header, UnbedError> {
            let first = if p.at(Token::Semi) { None } else { Some(p.parse_for_clause()?) };
            let first = match first {
                Some(ForClause::Range(range)) => return Ok(Header::Range(range)),
                Some(ForClause::Stmt(s)) => Some(s),
                None => None,
            };
            if p.eat(Token::Semi) {
                let cond = if p.at(Token::Semi) { None } else { Some(p.parse_expr()?) };
                p.expect(Token::Semi)?;
                let post = if p.at(Token::LBrace) { None } else { Some(Box::new(p.parse_simple_stmt()?)) };
                Ok(Header::Clauses(first.map(Box::new), cond, post))
            } else {
                let cond = match first {
                    Some(s) => Some(stmt_as_expr(s, "for")?),
                    None => None,
                };
                Ok(Header::Clauses(None, cond, None))
            }
        })?;

        let body = self.parse_block()?;
        let stmt = match header {
            Header::Range(RangeClause { key, value, define, iterable }) => {
                Stmt::ForRange { key, value, define, iterable, body }
            }
            Header::Clauses(init, cond, post) => Stmt::For { init, cond, post, body },
        };
        Ok(Spanned::new(stmt, self.span_from(start)))
    }

    fn parse_switch(&mut self) -> Result<Spanned<Stmt>, UnbedError> {
        let start = self.expect(Token::Switch)?.start;
        let (init, tag) = self.with_composites(false, |p| -> Result<_, UnbedError> {
            if p.at(Token::LBrace) {
                return Ok((None, None));
            }
            let first = if p.at(Token::Semi) { None } else { Some(p.parse_simple_stmt()?) };
            if p.eat(Token::Semi) {
                let tag = if p.at(Token::LBrace) { None } else { Some(p.parse_expr()?) };
                Ok((first.map(Box::new), tag))
            } else {
                match first {
                    Some(s) => Ok((None, Some(stmt_as_expr(s, "switch")?))),
                    None => Ok((None, None)),
                }
            }
        })?;

        self.expect(Token::LBrace)?;
        let mut cases = Vec::new();
        while !self.at(Token::RBrace) {
            let case_start = self.current_span().start;
            let (exprs, is_default) = if self.eat(Token::Default) {
                (Vec::new(), true)
            } else {
                self.expect(Token::Case)?;
                (self.with_composites(true, |p| p.parse_expr_list())?, false)
            };
            self.expect(Token::Colon)?;
            let body = self.with_composites(true, |p| p.parse_stmt_list())?;
            cases.push(Spanned::new(CaseClause { exprs, is_default, body }, self.span_from(case_start)));
        }
        self.expect(Token::RBrace)?;
        Ok(Spanned::new(Stmt::Switch { init, tag, cases }, self.span_from(start)))
    }

    // ── expressions ──────────────────────────────────────────────────

    fn parse_expr_list(&mut self) -> Result<Vec<Spanned<Expr>>, UnbedError> {
        let mut exprs = vec![self.parse_expr()?];
        while self.eat(Token::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    pub fn parse_expr(&mut self) -> Result<Spanned<Expr>, UnbedError> {
        self.parse_binary(1)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Spanned<Expr>, UnbedError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let Some((op, prec)) = self.peek().and_then(binary_op) else { break };
            if prec < min_prec {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(prec + 1)?;
            let span = lhs.span.to(rhs.span);
            lhs = self.mk(ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }, span);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Spanned<Expr>, UnbedError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Caret) => UnaryOp::BitNot,
            Some(Token::Amp) => UnaryOp::Addr,
            Some(Token::Star) => UnaryOp::Deref,
            Some(Token::Arrow) => return Err(self.unsupported("channel receive")),
            _ => return self.parse_primary(),
        };
        let start = self.current_span().start;
        self.advance();
        let operand = self.parse_unary()?;
        let span = self.span_from(start);
        Ok(self.mk(ExprKind::Unary { op, operand: Box::new(operand) }, span))
    }

    fn parse_primary(&mut self) -> Result<Spanned<Expr>, UnbedError> {
        let mut expr = self.parse_operand()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.advance();
                    if self.eat(Token::LParen) {
                        if self.at(Token::Type) {
                            return Err(self.unsupported("type switch"));
                        }
                        let ty = self.parse_type()?;
                        self.expect(Token::RParen)?;
                        let span = self.span_from(expr.span.start);
                        expr = self.mk(ExprKind::TypeAssert { object: Box::new(expr), ty }, span);
                    } else {
                        let field = self.expect_ident()?;
                        let span = expr.span.to(field.span);
                        expr = self.mk(ExprKind::Selector { object: Box::new(expr), field }, span);
                    }
                }
                Some(Token::LBracket) => {
                    self.advance();
                    expr = self.with_composites(true, |p| p.parse_index_or_slice(expr))?;
                }
                Some(Token::LParen) => {
                    self.advance();
                    let (args, spread) = self.with_composites(true, |p| -> Result<_, UnbedError> {
                        let mut args = Vec::new();
                        let mut spread = false;
                        while !p.at(Token::RParen) {
                            args.push(p.parse_expr()?);
                            if p.eat(Token::Ellipsis) {
                                spread = true;
                            }
                            if !p.eat(Token::Comma) {
                                break;
                            }
                        }
                        p.expect(Token::RParen)?;
                        Ok((args, spread))
                    })?;
                    let span = self.span_from(expr.span.start);
                    expr = self.mk(ExprKind::Call { func: Box::new(expr), args, spread }, span);
                }
                Some(Token::LBrace) if is_literal_type(&expr) && (!self.no_composite || !is_type_name(&expr)) => {
                    expr = self.parse_composite_body(Some(expr))?;
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_index_or_slice(&mut self, object: Spanned<Expr>) -> Result<Spanned<Expr>, UnbedError> {
        let start = object.span.start;
        let low = if self.at(Token::Colon) { None } else { Some(Box::new(self.parse_expr()?)) };
        if self.eat(Token::RBracket) {
            let index = low.ok_or_else(|| UnbedError::syntax("expected operand", self.current_span()))?;
            let span = self.span_from(start);
            return Ok(self.mk(ExprKind::Index { object: Box::new(object), index }, span));
        }
        self.expect(Token::Colon)?;
        let high = if matches!(self.peek(), Some(Token::Colon | Token::RBracket)) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        let max = if self.eat(Token::Colon) { Some(Box::new(self.parse_expr()?)) } else { None };
        self.expect(Token::RBracket)?;
        let span = self.span_from(start);
        Ok(self.mk(ExprKind::Slice { object: Box::new(object), low, high, max }, span))
    }

    fn parse_composite_body(&mut self, ty: Option<Spanned<Expr>>) -> Result<Spanned<Expr>, UnbedError> {
        let start = ty.as_ref().map(|t| t.span.start).unwrap_or_else(|| self.current_span().start);
        self.expect(Token::LBrace)?;
        let elements = self.with_composites(true, |p| -> Result<_, UnbedError> {
            let mut elements = Vec::new();
            while !p.at(Token::RBrace) {
                let first = p.parse_element_value()?;
                let element = if p.eat(Token::Colon) {
                    Element { key: Some(first), value: p.parse_element_value()? }
                } else {
                    Element { key: None, value: first }
                };
                elements.push(element);
                if !p.eat(Token::Comma) {
                    break;
                }
            }
            Ok(elements)
        })?;
        if !self.at(Token::RBrace) {
            return Err(UnbedError::syntax(
                "unexpected newline in composite literal; possibly missing comma or }",
                self.current_span(),
            ));
        }
        self.expect(Token::RBrace)?;
        let span = self.span_from(start);
        Ok(self.mk(ExprKind::CompositeLit { ty: ty.map(Box::new), elements }, span))
    }

    fn parse_element_value(&mut self) -> Result<Spanned<Expr>, UnbedError> {
        if self.at(Token::LBrace) {
            self.parse_composite_body(None)
        } else {
            self.parse_expr()
        }
    }

    fn parse_operand(&mut self) -> Result<Spanned<Expr>, UnbedError> {
        let Some(tok) = self.peek_tok() else {
            return Err(UnbedError::syntax("expected expression, found end of file", self.eof_span()));
        };
        let span = tok.span;
        match tok.node {
            Token::Ident => {
                self.advance();
                let name = self.text(span).to_string();
                Ok(self.mk(ExprKind::Ident(name), span))
            }
            Token::IntLit => {
                self.advance();
                let text = self.text(span).to_string();
                Ok(self.mk(ExprKind::IntLit(text), span))
            }
            Token::FloatLit => {
                self.advance();
                let text = self.text(span).to_string();
                Ok(self.mk(ExprKind::FloatLit(text), span))
            }
            Token::RuneLit => {
                self.advance();
                let text = self.text(span).to_string();
                Ok(self.mk(ExprKind::RuneLit(text), span))
            }
            Token::StringLit | Token::RawStringLit => {
                let value = self.parse_string_lit()?;
                Ok(self.mk(ExprKind::StringLit(value.node), span))
            }
            Token::LParen => {
                self.advance();
                let inner = self.with_composites(true, |p| p.parse_expr())?;
                self.expect(Token::RParen)?;
                let span = self.span_from(span.start);
                Ok(self.mk(ExprKind::Paren(Box::new(inner)), span))
            }
            Token::Func => {
                self.advance();
                let sig = self.parse_signature()?;
                if self.at(Token::LBrace) {
                    let body = self.with_composites(true, |p| p.parse_block())?;
                    let span = self.span_from(span.start);
                    Ok(self.mk(ExprKind::FuncLit { sig, body }, span))
                } else {
                    let span = self.span_from(span.start);
                    let ty = Spanned::new(TypeExpr::Func(Box::new(sig)), span);
                    Ok(self.mk(ExprKind::Type(ty), span))
                }
            }
            Token::LBracket | Token::Map | Token::Struct | Token::Interface | Token::Chan => {
                let ty = self.parse_type()?;
                let span = ty.span;
                Ok(self.mk(ExprKind::Type(ty), span))
            }
            other => Err(UnbedError::syntax(format!("expected expression, found {other}"), span)),
        }
    }
}

fn single(mut exprs: Vec<Spanned<Expr>>, ctx: &str) -> Result<Spanned<Expr>, UnbedError> {
    if exprs.len() != 1 {
        let span = exprs[1].span;
        return Err(UnbedError::syntax(format!("expected 1 expression in {ctx}, found {}", exprs.len()), span));
    }
    Ok(exprs.remove(0))
}

fn stmt_as_expr(stmt: Spanned<Stmt>, ctx: &str) -> Result<Spanned<Expr>, UnbedError> {
    match stmt.node {
        Stmt::Expr(e) => Ok(e),
        _ => Err(UnbedError::syntax(format!("cannot use statement as value in {ctx} header"), stmt.span)),
    }
}

/// Can `expr` be the type of a composite literal?
fn is_literal_type(expr: &Spanned<Expr>) -> bool {
    match &expr.node.kind {
        ExprKind::Ident(_) => true,
        ExprKind::Selector { object, .. } => matches!(object.node.kind, ExprKind::Ident(_)),
        ExprKind::Type(ty) => matches!(
            ty.node,
            TypeExpr::Slice(_) | TypeExpr::Array { .. } | TypeExpr::Map { .. } | TypeExpr::Struct(_)
        ),
        _ => false,
    }
}

fn is_type_name(expr: &Spanned<Expr>) -> bool {
    matches!(expr.node.kind, ExprKind::Ident(_) | ExprKind::Selector { .. })
}

fn binary_op(tok: Token) -> Option<(BinOp, u8)> {
    let entry = match tok {
        Token::PipePipe => (BinOp::Or, 1),
        Token::AmpAmp => (BinOp::And, 2),
        Token::EqEq => (BinOp::Eq, 3),
        Token::BangEq => (BinOp::Neq, 3),
        Token::Lt => (BinOp::Lt, 3),
        Token::LtEq => (BinOp::LtEq, 3),
        Token::Gt => (BinOp::Gt, 3),
        Token::GtEq => (BinOp::GtEq, 3),
        Token::Plus => (BinOp::Add, 4),
        Token::Minus => (BinOp::Sub, 4),
        Token::Pipe => (BinOp::BitOr, 4),
        Token::Caret => (BinOp::BitXor, 4),
        Token::Star => (BinOp::Mul, 5),
        Token::Slash => (BinOp::Div, 5),
        Token::Percent => (BinOp::Mod, 5),
        Token::Shl => (BinOp::Shl, 5),
        Token::Shr => (BinOp::Shr, 5),
        Token::Amp => (BinOp::BitAnd, 5),
        Token::AmpCaret => (BinOp::AndNot, 5),
        _ => return None,
    };
    Some(entry)
}

fn assign_op(tok: Token) -> Option<BinOp> {
    let op = match tok {
        Token::PlusEq => BinOp::Add,
        Token::MinusEq => BinOp::Sub,
        Token::StarEq => BinOp::Mul,
        Token::SlashEq => BinOp::Div,
        Token::PercentEq => BinOp::Mod,
        Token::AmpEq => BinOp::BitAnd,
        Token::PipeEq => BinOp::BitOr,
        Token::CaretEq => BinOp::BitXor,
        Token::ShlEq => BinOp::Shl,
        Token::ShrEq => BinOp::Shr,
        Token::AmpCaretEq => BinOp::AndNot,
        _ => return None,
    };
    Some(op)
}

/// Decode an interpreted (`"..."`) or raw (`` `...` ``) string literal.
pub fn unquote(lit: &str) -> Result<String, String> {
    if let Some(raw) = lit.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        return Ok(raw.replace('\r', ""));
    }
    let Some(body) = lit.strip_prefix('"').and_then(|s| s.strip_suffix('"')) else {
        return Err(format!("invalid string literal {lit}"));
    };

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let esc = chars.next().ok_or("string literal ends in backslash")?;
        match esc {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            'x' | 'u' | 'U' => {
                let width = match esc {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = (0..width).filter_map(|_| chars.next()).collect();
                let code = u32::from_str_radix(&digits, 16)
                    .map_err(|_| format!("invalid escape \\{esc}{digits}"))?;
                let ch = char::from_u32(code).ok_or_else(|| format!("escape \\{esc}{digits} is not a valid code point"))?;
                out.push(ch);
            }
            '0'..='7' => {
                let mut digits = String::from(esc);
                for _ in 0..2 {
                    if let Some(d) = chars.next() {
                        digits.push(d);
                    }
                }
                let code = u32::from_str_radix(&digits, 8).map_err(|_| format!("invalid octal escape \\{digits}"))?;
                let ch = char::from_u32(code).ok_or_else(|| format!("octal escape \\{digits} out of range"))?;
                out.push(ch);
            }
            other => return Err(format!("unknown escape sequence \\{other}")),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> File {
        parse_file(src, 0).unwrap_or_else(|e| panic!("parse failed: {e}"))
    }

    fn func_body(file: &File, name: &str) -> Vec<Spanned<Stmt>> {
        for d in &file.decls {
            if let Decl::Func(f) = d {
                if f.node.name.node == name {
                    return f.node.body.as_ref().unwrap().node.stmts.clone();
                }
            }
        }
        panic!("no func {name}");
    }

    #[test]
    fn parse_package_and_imports() {
        let file = parse("package main\n\nimport (\n\t\"fmt\"\n\tu \"unsafe\"\n)\nimport \"os\"\n");
        assert_eq!(file.package.node, "main");
        assert_eq!(file.imports.len(), 3);
        assert_eq!(file.imports[1].node.alias.as_ref().unwrap().node, "u");
        assert_eq!(file.imports[1].node.path.node, "unsafe");
        assert_eq!(file.imports[2].node.path.node, "os");
    }

    #[test]
    fn parse_struct_with_embedded_fields() {
        let file = parse("package p\ntype Outer struct {\n\tBase\n\t*Other\n\tio.Reader\n\tX, Y int `json:\"x\"`\n}\n");
        let Decl::Type(spec) = &file.decls[0] else { panic!() };
        let TypeExpr::Struct(fields) = &spec.node.ty.node else { panic!() };
        assert_eq!(fields.len(), 4);
        assert!(fields[0].is_embedded());
        assert_eq!(fields[0].ty.node.embedded_name(), Some("Base"));
        assert_eq!(fields[1].ty.node.embedded_name(), Some("Other"));
        assert_eq!(fields[2].ty.node.embedded_name(), Some("Reader"));
        assert_eq!(fields[3].names.len(), 2);
        assert_eq!(fields[3].tag.as_deref(), Some("json:\"x\""));
    }

    #[test]
    fn parse_method_with_pointer_receiver() {
        let file = parse("package p\nfunc (o *Outer) Get(a, b int, s string) (int, error) { return 0, nil }\n");
        let Decl::Func(f) = &file.decls[0] else { panic!() };
        let recv = f.node.recv.as_ref().unwrap();
        assert!(recv.pointer);
        assert_eq!(recv.base.node, "Outer");
        assert_eq!(f.node.sig.params.len(), 3);
        assert_eq!(f.node.sig.params[1].name.as_ref().unwrap().node, "b");
        assert!(matches!(f.node.sig.params[1].ty.node, TypeExpr::Name(ref n) if n == "int"));
        assert_eq!(f.node.sig.results.len(), 2);
    }

    #[test]
    fn parse_unnamed_params_and_variadic() {
        let file = parse("package p\nfunc f(int, string)\nfunc g(xs ...int) {}\n");
        let Decl::Func(f) = &file.decls[0] else { panic!() };
        assert!(f.node.sig.params.iter().all(|p| p.name.is_none()));
        assert!(f.node.body.is_none());
        let Decl::Func(g) = &file.decls[1] else { panic!() };
        assert!(g.node.sig.variadic);
    }

    #[test]
    fn parse_selector_chain_positions() {
        let src = "package p\nfunc f() { x := outer.Base.N }\n";
        let file = parse(src);
        let stmts = func_body(&file, "f");
        let Stmt::ShortVarDecl { values, .. } = &stmts[0].node else { panic!() };
        let ExprKind::Selector { object, field } = &values[0].node.kind else { panic!() };
        assert_eq!(field.node, "N");
        assert_eq!(&src[field.span.start..field.span.end], "N");
        assert!(matches!(object.node.kind, ExprKind::Selector { .. }));
    }

    #[test]
    fn composite_literal_not_parsed_in_if_header() {
        let file = parse("package p\nfunc f() {\n\tif x == y {\n\t\treturn\n\t}\n\tif v := (T{}); v.ok {\n\t}\n}\n");
        let stmts = func_body(&file, "f");
        assert_eq!(stmts.len(), 2);
        let Stmt::If { init, .. } = &stmts[1].node else { panic!() };
        assert!(init.is_some());
    }

    #[test]
    fn slice_literal_allowed_in_range_header() {
        let file = parse("package p\nfunc f() {\n\tfor _, v := range []int{1, 2} {\n\t\t_ = v\n\t}\n}\n");
        let stmts = func_body(&file, "f");
        let Stmt::ForRange { define, key, value, .. } = &stmts[0].node else { panic!() };
        assert!(*define);
        assert!(key.is_some() && value.is_some());
    }

    #[test]
    fn range_clause_forms_in_for_header() {
        let src = "package p\nfunc f(xs []int) {\n\tfor range xs {\n\t}\n\tvar i int\n\tfor i = range xs {\n\t}\n\t_ = i\n}\n";
        let stmts = func_body(&parse(src), "f");
        assert!(matches!(stmts[0].node, Stmt::ForRange { key: None, value: None, define: false, .. }));
        assert!(matches!(stmts[2].node, Stmt::ForRange { key: Some(_), value: None, define: false, .. }));
    }

    #[test]
    fn range_clause_outside_for_header_is_error() {
        assert!(parse_file("package p\nfunc f(xs []int) {\n\tk := range xs\n}\n", 0).is_err());
        assert!(parse_file("package p\nfunc f(xs []int) {\n\tif k := range xs; k {\n\t}\n}\n", 0).is_err());
        assert!(parse_file("package p\nfunc f(xs []int) {\n\tfor i := 0; i < 3; i = range xs {\n\t}\n}\n", 0).is_err());
        let err = parse_file("package p\nfunc f(xs []int) {\n\tfor a, b, c := range xs {\n\t}\n}\n", 0).unwrap_err();
        assert!(err.to_string().contains("at most two"), "{err}");
    }

    #[test]
    fn parse_three_clause_for_and_switch() {
        let src = "package p\nfunc f(n int) {\n\tfor i := 0; i < n; i++ {\n\t}\n\tswitch x := n; x {\n\tcase 1, 2:\n\t\tn++\n\tdefault:\n\t}\n}\n";
        let stmts = func_body(&parse(src), "f");
        assert!(matches!(stmts[0].node, Stmt::For { init: Some(_), cond: Some(_), post: Some(_), .. }));
        let Stmt::Switch { cases, tag, init } = &stmts[1].node else { panic!() };
        assert!(init.is_some() && tag.is_some());
        assert_eq!(cases.len(), 2);
        assert!(cases[1].node.is_default);
    }

    #[test]
    fn parse_offsetof_call_and_method_expression() {
        let src = "package p\nfunc f() {\n\t_ = unsafe.Offsetof(o.N)\n\tg := (*Outer).M\n\th := Outer.M\n}\n";
        let stmts = func_body(&parse(src), "f");
        let Stmt::Assign { rhs, .. } = &stmts[0].node else { panic!() };
        assert!(matches!(rhs[0].node.kind, ExprKind::Call { .. }));
        let Stmt::ShortVarDecl { values, .. } = &stmts[1].node else { panic!() };
        let ExprKind::Selector { object, .. } = &values[0].node.kind else { panic!() };
        assert!(matches!(object.node.kind, ExprKind::Paren(_)));
        assert!(matches!(stmts[2].node, Stmt::ShortVarDecl { .. }));
    }

    #[test]
    fn parse_keyed_and_elided_composites() {
        let src = "package p\nvar xs = []Point{{1, 2}, {X: 3}}\nvar m = map[string]*Point{\"a\": {1, 2}}\n";
        let file = parse(src);
        let Decl::Var(spec) = &file.decls[0] else { panic!() };
        let ExprKind::CompositeLit { elements, ty } = &spec.node.values[0].node.kind else { panic!() };
        assert!(ty.is_some());
        assert_eq!(elements.len(), 2);
        assert!(matches!(elements[0].value.node.kind, ExprKind::CompositeLit { ty: None, .. }));
    }

    #[test]
    fn parse_const_group_tracks_iota() {
        let file = parse("package p\nconst (\n\tA = iota\n\tB\n\tC\n)\n");
        assert_eq!(file.decls.len(), 3);
        let Decl::Const(c) = &file.decls[2] else { panic!() };
        assert_eq!(c.node.iota, 2);
        assert!(c.node.values.is_empty());
    }

    #[test]
    fn expr_ids_are_dense_and_unique() {
        let file = parse("package p\nvar x = a.b + c(d, e[f])\n");
        assert_eq!(file.expr_count, 9);
    }

    #[test]
    fn parse_expr_rejects_trailing_input() {
        assert!(parse_expr("a.b.c").is_ok());
        assert!(parse_expr("a.b c").is_err());
    }

    #[test]
    fn missing_comma_in_composite_is_error() {
        let err = parse_file("package p\nvar x = T{\n\tA: 1\n}\n", 0).unwrap_err();
        assert!(err.to_string().contains("composite literal"), "{err}");
    }

    #[test]
    fn unsupported_constructs_are_errors() {
        assert!(parse_file("package p\nfunc f() { goto L }\n", 0).is_err());
        assert!(parse_file("package p\nvar c chan int\n", 0).is_err());
        assert!(parse_file("package p\nfunc f[T any]() {}\n", 0).is_err());
    }

    #[test]
    fn unquote_interpreted_and_raw() {
        assert_eq!(unquote(r#""a\tb\"c\x41é""#).unwrap(), "a\tb\"cAé");
        assert_eq!(unquote("`x\\n`").unwrap(), "x\\n");
        assert!(unquote(r#""\q""#).is_err());
    }
}
