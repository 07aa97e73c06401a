//! Statement and declaration parser for Alterion.
//!
//! Recursive descent over the token stream from `alterion-lexer`. Expressions
//! live in [`expr`], markup in [`markup`]. Every list of statements (program,
//! component body, block) is a synchronization point: a failed statement is
//! recorded, the parser skips to the next statement boundary and continues.

mod expr;
mod markup;

use crate::ast::{
    AssignOp, Block, CatchClause, Component, Export, ExportItem, Expr, ExprKind, Function,
    Import, Literal, Markup, NodeId, Param, Program, Stmt, StmtKind, TypeExpr, TypeExprKind,
    VarKind, VariableDecl, BinaryOp,
};
use crate::{Diagnostic, ParseError};
use alterion_lexer::{Keyword, NumberKind, Scanner, Span, Token, TokenKind};

pub(crate) type ParseResult<T> = Result<T, ParseError>;

/// A parsed unit together with everything that went wrong on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
}

/// A top-level item before it is filed into the program's lists.
enum Item {
    Import(Import),
    Export(Export),
    Function(Function),
    Component(Component),
    Statement(Stmt),
}

/// Alterion parser.
///
/// Converts a flat token stream into a [`Program`]. Lexer `Error` tokens are
/// dropped up front: they were already reported as lexical diagnostics.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
    next_id: u32,
    iterations: usize,
    iteration_limit: usize,
    /// Parsing an `if`/`while`/`for` head, where `[` may open the body.
    in_head: bool,
}

impl Parser {
    /// Create a new parser for the given tokens.
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut tokens: Vec<Token> = tokens.into_iter().filter(|t| !t.kind.is_error()).collect();
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", span));
        }
        let iteration_limit = tokens.len().saturating_mul(64) + 1024;

        Self {
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
            next_id: 0,
            iterations: 0,
            iteration_limit,
            in_head: false,
        }
    }

    /// Tokenize and parse source code. Lexical diagnostics come first.
    pub fn parse(source: &str) -> Parsed {
        let lexed = Scanner::tokenize(source);
        let mut diagnostics = lexed.diagnostics();
        let mut parsed = Parser::new(lexed.tokens).parse_program();
        diagnostics.append(&mut parsed.diagnostics);
        parsed.diagnostics = diagnostics;
        parsed
    }

    /// Parse the whole unit. Always produces a program.
    pub fn parse_program(mut self) -> Parsed {
        let mut program = Program::default();

        while !self.is_at_end() {
            let before = self.pos;
            if self.eat(TokenKind::Semicolon) {
                continue;
            }

            match self.parse_item() {
                Ok(Item::Import(import)) => program.imports.push(import),
                Ok(Item::Export(export)) => program.exports.push(export),
                Ok(Item::Function(function)) => program.functions.push(function),
                Ok(Item::Component(component)) => program.components.push(component),
                Ok(Item::Statement(stmt)) => program.statements.push(stmt),
                Err(error) => {
                    let stmt = self.recover(error);
                    program.statements.push(stmt);
                    // Nothing is open at top level: a closer here belonged to
                    // the broken item.
                    if matches!(
                        self.peek().kind,
                        TokenKind::RBrace | TokenKind::RBracket | TokenKind::RParen
                    ) {
                        self.advance();
                    }
                }
            }
            self.ensure_progress(before);
        }

        log::debug!(
            "parsed {} components, {} functions, {} statements ({} diagnostics)",
            program.components.len(),
            program.functions.len(),
            program.statements.len(),
            self.diagnostics.len()
        );

        Parsed {
            program,
            diagnostics: self.diagnostics,
        }
    }

    fn parse_item(&mut self) -> ParseResult<Item> {
        match self.peek().kind {
            TokenKind::Keyword(Keyword::Import) => Ok(Item::Import(self.parse_import()?)),
            TokenKind::Keyword(Keyword::Export) => Ok(Item::Export(self.parse_export()?)),
            TokenKind::Keyword(Keyword::Component)
            | TokenKind::Keyword(Keyword::Function | Keyword::Fn | Keyword::Async)
            | TokenKind::AtModifier => {
                let modifiers = self.parse_modifiers();
                self.parse_declaration(modifiers)
            }
            _ => Ok(Item::Statement(self.parse_statement()?)),
        }
    }

    /// A function or component after optional `@modifiers`.
    fn parse_declaration(&mut self, modifiers: Vec<String>) -> ParseResult<Item> {
        match self.peek().kind {
            TokenKind::Keyword(Keyword::Component) => {
                Ok(Item::Component(self.parse_component(modifiers)?))
            }
            TokenKind::Keyword(Keyword::Function | Keyword::Fn | Keyword::Async) => {
                Ok(Item::Function(self.parse_function(modifiers)?))
            }
            _ => Err(self.unexpected("'function' or 'component' after modifiers")),
        }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// `import { a, b } from "mod"` or `import name from "mod"`
    fn parse_import(&mut self) -> ParseResult<Import> {
        let start = self.advance().span;
        let mut names = Vec::new();
        let mut default = None;

        if self.eat(TokenKind::LBrace) {
            while !self.check(TokenKind::RBrace) && !self.is_at_end() {
                names.push(self.expect_identifier("an imported name")?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RBrace, "'}' after imported names")?;
        } else {
            default = Some(self.expect_identifier("an imported name or '{'")?);
        }

        if !self.eat_keyword(Keyword::From) {
            return Err(self.unexpected("'from'"));
        }
        let source = self.expect(TokenKind::String, "a module path string")?.lexeme;

        Ok(Import {
            names,
            default,
            source,
            span: self.span_from(start),
        })
    }

    /// `export [default] function | component | statement`
    fn parse_export(&mut self) -> ParseResult<Export> {
        let start = self.advance().span;
        let is_default = self.eat_keyword(Keyword::Default);

        let item = match self.peek().kind {
            TokenKind::Keyword(Keyword::Component)
            | TokenKind::Keyword(Keyword::Function | Keyword::Fn | Keyword::Async)
            | TokenKind::AtModifier => {
                let modifiers = self.parse_modifiers();
                match self.parse_declaration(modifiers)? {
                    Item::Component(component) => ExportItem::Component(component),
                    Item::Function(function) => ExportItem::Function(function),
                    _ => return Err(self.unexpected("a declaration to export")),
                }
            }
            _ => ExportItem::Statement(self.parse_statement()?),
        };

        Ok(Export {
            is_default,
            item,
            span: self.span_from(start),
        })
    }

    /// Leading `@name` modifiers, without the `@`.
    fn parse_modifiers(&mut self) -> Vec<String> {
        let mut modifiers = Vec::new();
        while self.check(TokenKind::AtModifier) {
            modifiers.push(self.advance().lexeme);
        }
        modifiers
    }

    /// `[async] function|fn name(a: T, b) [: R] { ... }`
    fn parse_function(&mut self, modifiers: Vec<String>) -> ParseResult<Function> {
        let start = self.peek().span;
        let mut is_async = modifiers.iter().any(|m| m == "async");
        if self.eat_keyword(Keyword::Async) {
            is_async = true;
        }
        if !self.eat_keyword(Keyword::Function) && !self.eat_keyword(Keyword::Fn) {
            return Err(self.unexpected("'function'"));
        }

        let name = self.expect_identifier("a function name")?;
        self.expect(TokenKind::LParen, "'(' after function name")?;

        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            let param_start = self.peek().span;
            let param_name = self.expect_identifier("a parameter name")?;
            let ty = if self.eat(TokenKind::Colon) {
                Some(self.parse_type()?)
            } else {
                None
            };
            params.push(Param {
                name: param_name,
                ty,
                span: self.span_from(param_start),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')' after parameters")?;

        let return_type = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = self.parse_brace_block()?;

        Ok(Function {
            name,
            params,
            return_type,
            body,
            is_async,
            modifiers,
            span: self.span_from(start),
        })
    }

    /// `component Name { ... }`
    fn parse_component(&mut self, modifiers: Vec<String>) -> ParseResult<Component> {
        let start = self.advance().span;
        let name = self.expect_identifier("a component name")?;
        self.expect(TokenKind::LBrace, "'{' after component name")?;

        let mut statements = Vec::new();
        let mut body = Vec::new();

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let before = self.pos;
            if self.eat(TokenKind::Semicolon) {
                continue;
            }
            if let Err(error) = self.parse_component_member(&mut statements, &mut body) {
                let stmt = self.recover(error);
                statements.push(stmt);
            }
            self.ensure_progress(before);
        }
        self.expect(TokenKind::RBrace, "'}' to close component")?;

        Ok(Component {
            name,
            modifiers,
            statements,
            body,
            span: self.span_from(start),
        })
    }

    /// One member of a component body: state initializer, method, render
    /// section, markup, or any other statement.
    fn parse_component_member(
        &mut self,
        statements: &mut Vec<Stmt>,
        body: &mut Vec<Markup>,
    ) -> ParseResult<()> {
        match self.peek().kind {
            TokenKind::Keyword(Keyword::Render) => self.parse_render(body)?,
            TokenKind::TagOpen => body.push(Markup::Tag(self.parse_tag()?)),
            TokenKind::Identifier if self.peek_at(1).kind == TokenKind::LBrace => {
                statements.push(self.parse_method()?);
            }
            _ => statements.push(self.parse_statement()?),
        }
        Ok(())
    }

    /// `name { ... }` inside a component.
    fn parse_method(&mut self) -> ParseResult<Stmt> {
        let start = self.peek().span;
        let name = self.expect_identifier("a method name")?;
        let body = self.parse_brace_block()?;
        let span = self.span_from(start);

        Ok(Stmt {
            kind: StmtKind::Function(Function {
                name,
                params: Vec::new(),
                return_type: None,
                body,
                is_async: false,
                modifiers: Vec::new(),
                span,
            }),
            span,
        })
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        let stmt = match self.peek().kind {
            TokenKind::Keyword(Keyword::Let | Keyword::Const | Keyword::Var) => {
                self.parse_variable()?
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if()?,
            TokenKind::Keyword(Keyword::While) => self.parse_while()?,
            TokenKind::Keyword(Keyword::For) => self.parse_for()?,
            TokenKind::Keyword(Keyword::Return) => {
                let start = self.advance().span;
                let value = if self.starts_expression() {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                self.stmt(StmtKind::Return(value), start)
            }
            TokenKind::Keyword(Keyword::Break) => {
                let start = self.advance().span;
                self.stmt(StmtKind::Break, start)
            }
            TokenKind::Keyword(Keyword::Continue) => {
                let start = self.advance().span;
                self.stmt(StmtKind::Continue, start)
            }
            TokenKind::Keyword(Keyword::Throw) => {
                let start = self.advance().span;
                let value = self.parse_expression()?;
                self.stmt(StmtKind::Throw(value), start)
            }
            TokenKind::Keyword(Keyword::Try) => self.parse_try()?,
            TokenKind::AsyncBlock => self.parse_async_block()?,
            TokenKind::Keyword(Keyword::Function | Keyword::Fn | Keyword::Async)
            | TokenKind::AtModifier => {
                let start = self.peek().span;
                let modifiers = self.parse_modifiers();
                let function = self.parse_function(modifiers)?;
                self.stmt(StmtKind::Function(function), start)
            }
            TokenKind::Keyword(Keyword::Import) => {
                let start = self.peek().span;
                let import = self.parse_import()?;
                self.stmt(StmtKind::Import(import), start)
            }
            TokenKind::Keyword(Keyword::Export) => {
                let start = self.peek().span;
                let export = self.parse_export()?;
                self.stmt(StmtKind::Export(Box::new(export)), start)
            }
            TokenKind::LBrace => {
                let block = self.parse_brace_block()?;
                Stmt {
                    span: block.span,
                    kind: StmtKind::Block(block),
                }
            }
            _ => self.parse_simple_statement()?,
        };

        self.eat(TokenKind::Semicolon);
        Ok(stmt)
    }

    /// An expression statement or an assignment.
    fn parse_simple_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.peek().span;
        let target = self.parse_expression()?;

        let op = match self.peek().kind {
            TokenKind::Equals => AssignOp::Assign,
            TokenKind::PlusEquals => AssignOp::Add,
            TokenKind::MinusEquals => AssignOp::Sub,
            TokenKind::StarEquals => AssignOp::Mul,
            TokenKind::SlashEquals => AssignOp::Div,
            TokenKind::PercentEquals => AssignOp::Mod,
            _ => return Ok(self.stmt(StmtKind::Expression(target), start)),
        };

        if !target.is_assignable() {
            return Err(self.error_at(target.span, "invalid assignment target".into()));
        }
        self.advance();
        let value = self.parse_expression()?;
        Ok(self.stmt(StmtKind::Assignment { target, op, value }, start))
    }

    /// `let|const|var name [: Type] [= value]`
    fn parse_variable(&mut self) -> ParseResult<Stmt> {
        let keyword = self.advance();
        let kind = match keyword.kind {
            TokenKind::Keyword(Keyword::Const) => VarKind::Const,
            TokenKind::Keyword(Keyword::Var) => VarKind::Var,
            _ => VarKind::Let,
        };
        let name = self.expect_identifier("a variable name")?;
        let ty = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let init = if self.eat(TokenKind::Equals) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(self.stmt(
            StmtKind::Variable(VariableDecl {
                kind,
                name,
                ty,
                init,
            }),
            keyword.span,
        ))
    }

    /// `if cond body [else (if ... | body)]`
    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let start = self.advance().span;
        let test = self.parse_head()?;
        let consequent = self.parse_body()?;

        let alternate = if self.eat_keyword(Keyword::Else) {
            if self.check_keyword(Keyword::If) {
                Some(Box::new(self.parse_if()?))
            } else {
                let block = self.parse_body()?;
                Some(Box::new(Stmt {
                    span: block.span,
                    kind: StmtKind::Block(block),
                }))
            }
        } else {
            None
        };

        Ok(self.stmt(
            StmtKind::If {
                test,
                consequent,
                alternate,
            },
            start,
        ))
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        let start = self.advance().span;
        let test = self.parse_head()?;
        let body = self.parse_body()?;
        Ok(self.stmt(StmtKind::While { test, body }, start))
    }

    /// `for (init; test; update) body`, `for x in items body`,
    /// `for i (n) body` or `for i (from, to) body`.
    fn parse_for(&mut self) -> ParseResult<Stmt> {
        let start = self.advance().span;

        if self.check(TokenKind::LParen) {
            return self.parse_c_for(start);
        }

        let var_span = self.peek().span;
        let variable = self.expect_identifier("a loop variable")?;

        if self.eat_keyword(Keyword::In) {
            let iterable = self.parse_head()?;
            let body = self.parse_body()?;
            return Ok(self.stmt(
                StmtKind::ForIn {
                    variable,
                    iterable,
                    body,
                },
                start,
            ));
        }

        if !self.eat(TokenKind::LParen) {
            return Err(self.unexpected("'in' or '(' after loop variable"));
        }
        let first = self.parse_expression()?;
        let (from, to) = if self.eat(TokenKind::Comma) {
            (first, self.parse_expression()?)
        } else {
            (self.number("0", var_span), first)
        };
        self.expect(TokenKind::RParen, "')' after loop bounds")?;
        let body = self.parse_body()?;

        // i = from; i < to; i += 1
        let init = Stmt {
            kind: StmtKind::Variable(VariableDecl {
                kind: VarKind::Let,
                name: variable.clone(),
                ty: None,
                init: Some(from),
            }),
            span: var_span,
        };
        let counter = self.node(ExprKind::Identifier(variable.clone()), var_span);
        let test = self.node(
            ExprKind::Binary {
                left: Box::new(counter),
                op: BinaryOp::Lt,
                right: Box::new(to),
            },
            var_span,
        );
        let target = self.node(ExprKind::Identifier(variable), var_span);
        let one = self.number("1", var_span);
        let update = Stmt {
            kind: StmtKind::Assignment {
                target,
                op: AssignOp::Add,
                value: one,
            },
            span: var_span,
        };

        Ok(self.stmt(
            StmtKind::For {
                init: Some(Box::new(init)),
                test: Some(test),
                update: Some(Box::new(update)),
                body,
            },
            start,
        ))
    }

    fn parse_c_for(&mut self, start: Span) -> ParseResult<Stmt> {
        self.expect(TokenKind::LParen, "'(' after 'for'")?;

        let init = if self.check(TokenKind::Semicolon) {
            None
        } else if self.check_keyword(Keyword::Let)
            || self.check_keyword(Keyword::Const)
            || self.check_keyword(Keyword::Var)
        {
            Some(Box::new(self.parse_variable()?))
        } else {
            Some(Box::new(self.parse_simple_statement()?))
        };
        self.expect(TokenKind::Semicolon, "';' after loop initializer")?;

        let test = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon, "';' after loop condition")?;

        let update = if self.check(TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_simple_statement()?))
        };
        self.expect(TokenKind::RParen, "')' after loop clauses")?;
        let body = self.parse_body()?;

        Ok(self.stmt(
            StmtKind::For {
                init,
                test,
                update,
                body,
            },
            start,
        ))
    }

    /// `try body [catch [(name)] body] [finally body]`
    fn parse_try(&mut self) -> ParseResult<Stmt> {
        let start = self.advance().span;
        let block = self.parse_body()?;

        let catch = if self.eat_keyword(Keyword::Catch) {
            Some(self.parse_catch_clause()?)
        } else {
            None
        };
        let finally = if self.eat_keyword(Keyword::Finally) {
            Some(self.parse_body()?)
        } else {
            None
        };

        if catch.is_none() && finally.is_none() {
            return Err(self.unexpected("'catch' or 'finally' after try block"));
        }

        Ok(self.stmt(
            StmtKind::Try {
                block,
                catch,
                finally,
            },
            start,
        ))
    }

    /// After `catch`: optional `(name)`, then the handler body.
    fn parse_catch_clause(&mut self) -> ParseResult<CatchClause> {
        let param = if self.eat(TokenKind::LParen) {
            let name = self.expect_identifier("an error name")?;
            self.expect(TokenKind::RParen, "')' after error name")?;
            Some(name)
        } else {
            None
        };
        let body = self.parse_body()?;
        Ok(CatchClause { param, body })
    }

    /// `async { [ ... ] [ catch (e) { ... } ] [ finally { ... } ] }`
    fn parse_async_block(&mut self) -> ParseResult<Stmt> {
        let start = self.advance().span;
        self.expect(TokenKind::LBrace, "'{' after 'async'")?;

        if !self.check(TokenKind::LBracket) {
            return Err(self.unexpected("'[' to open the async try segment"));
        }
        let block = self.parse_block(TokenKind::LBracket, TokenKind::RBracket)?;

        let mut catch = None;
        if self.check(TokenKind::LBracket) && self.peek_at(1).is_keyword(Keyword::Catch) {
            self.advance();
            self.advance();
            catch = Some(self.parse_catch_clause()?);
            self.expect(TokenKind::RBracket, "']' to close the catch segment")?;
        }

        let mut finally = None;
        if self.check(TokenKind::LBracket) && self.peek_at(1).is_keyword(Keyword::Finally) {
            self.advance();
            self.advance();
            finally = Some(self.parse_body()?);
            self.expect(TokenKind::RBracket, "']' to close the finally segment")?;
        }

        self.expect(TokenKind::RBrace, "'}' to close async block")?;

        Ok(self.stmt(
            StmtKind::Async {
                block,
                catch,
                finally,
            },
            start,
        ))
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// A `{ ... }` or `[ ... ]` body.
    fn parse_body(&mut self) -> ParseResult<Block> {
        match self.peek().kind {
            TokenKind::LBrace => self.parse_block(TokenKind::LBrace, TokenKind::RBrace),
            TokenKind::LBracket => self.parse_block(TokenKind::LBracket, TokenKind::RBracket),
            _ => Err(self.unexpected("'{' or '[' to start a block")),
        }
    }

    fn parse_brace_block(&mut self) -> ParseResult<Block> {
        self.parse_block(TokenKind::LBrace, TokenKind::RBrace)
    }

    fn parse_block(&mut self, open: TokenKind, close: TokenKind) -> ParseResult<Block> {
        let start = self.peek().span;
        if !self.eat(open) {
            return Err(self.unexpected("a block"));
        }

        let mut statements = Vec::new();
        while !self.check(close) && !self.is_at_end() {
            let before = self.pos;
            if self.eat(TokenKind::Semicolon) {
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(error) => {
                    let stmt = self.recover(error);
                    statements.push(stmt);
                }
            }
            self.ensure_progress(before);
        }

        let closer = if close == TokenKind::RBracket { "']'" } else { "'}'" };
        if !self.eat(close) {
            return Err(self.unexpected(&format!("{closer} to close block")));
        }

        Ok(Block {
            statements,
            span: self.span_from(start),
        })
    }

    // =========================================================================
    // Type annotations
    // =========================================================================

    /// `T`, `Array<T>`, `T[]`, `T?`, `A | B`
    fn parse_type(&mut self) -> ParseResult<TypeExpr> {
        let first = self.parse_type_postfix()?;
        if !self.check(TokenKind::Pipe) {
            return Ok(first);
        }

        let start = first.span;
        let mut members = vec![first];
        while self.eat(TokenKind::Pipe) {
            members.push(self.parse_type_postfix()?);
        }
        Ok(TypeExpr {
            kind: TypeExprKind::Union(members),
            span: self.span_from(start),
        })
    }

    fn parse_type_postfix(&mut self) -> ParseResult<TypeExpr> {
        let start = self.peek().span;
        let mut ty = self.parse_type_atom()?;

        loop {
            if self.eat(TokenKind::Question) {
                ty = TypeExpr {
                    kind: TypeExprKind::Optional(Box::new(ty)),
                    span: self.span_from(start),
                };
            } else if self.check(TokenKind::LBracket)
                && self.peek_at(1).kind == TokenKind::RBracket
            {
                self.advance();
                self.advance();
                ty = TypeExpr {
                    kind: TypeExprKind::Array(Box::new(ty)),
                    span: self.span_from(start),
                };
            } else {
                return Ok(ty);
            }
        }
    }

    fn parse_type_atom(&mut self) -> ParseResult<TypeExpr> {
        let start = self.peek().span;
        match self.peek().kind {
            TokenKind::Identifier | TokenKind::Null => {
                let name = self.advance().lexeme;
                if name == "Array" && self.eat(TokenKind::Lt) {
                    let element = self.parse_type()?;
                    self.expect(TokenKind::Gt, "'>' after array element type")?;
                    return Ok(TypeExpr {
                        kind: TypeExprKind::Array(Box::new(element)),
                        span: self.span_from(start),
                    });
                }
                Ok(TypeExpr {
                    kind: TypeExprKind::Named(name),
                    span: start,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let ty = self.parse_type()?;
                self.expect(TokenKind::RParen, "')' after type")?;
                Ok(ty)
            }
            _ => Err(self.unexpected("a type")),
        }
    }

    // =========================================================================
    // Error recovery
    // =========================================================================

    /// Record `error`, skip to the next statement boundary and return the
    /// placeholder that stands in for the failed statement.
    fn recover(&mut self, error: ParseError) -> Stmt {
        log::trace!(
            "parse error at {}:{}: {}; synchronizing",
            error.line,
            error.column,
            error.message
        );
        let span = Span::new(self.peek().span.start, self.peek().span.start, error.line, error.column);
        let message = error.message.clone();
        self.diagnostics.push(error.into());
        self.synchronize();

        Stmt {
            kind: StmtKind::Error(message),
            span,
        }
    }

    /// Discard tokens until just after a `;`, or until a closing bracket or a
    /// keyword that starts a new statement.
    fn synchronize(&mut self) {
        while !self.is_at_end() {
            match self.peek().kind {
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::RBrace | TokenKind::RBracket | TokenKind::RParen => return,
                TokenKind::AtModifier | TokenKind::AsyncBlock => return,
                TokenKind::Keyword(keyword) if keyword.starts_statement() => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Called once per iteration of every statement loop. Skips a token when
    /// the iteration consumed nothing, and stops the parse outright if the
    /// iteration cap is exceeded.
    fn ensure_progress(&mut self, before: usize) {
        self.iterations += 1;
        if self.iterations > self.iteration_limit && !self.is_at_end() {
            let error = self.error("parser iteration limit reached".into());
            self.diagnostics.push(error.into());
            self.pos = self.tokens.len().saturating_sub(1);
            return;
        }
        if self.pos == before && !self.is_at_end() {
            self.advance();
        }
    }

    // =========================================================================
    // Node construction
    // =========================================================================

    fn node(&mut self, kind: ExprKind, span: Span) -> Expr {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        Expr { id, kind, span }
    }

    fn number(&mut self, raw: &str, span: Span) -> Expr {
        self.node(
            ExprKind::Literal(Literal::Number {
                raw: raw.into(),
                kind: NumberKind::Int,
            }),
            span,
        )
    }

    fn stmt(&self, kind: StmtKind, start: Span) -> Stmt {
        Stmt {
            kind,
            span: self.span_from(start),
        }
    }

    /// From `start` through the last consumed token.
    fn span_from(&self, start: Span) -> Span {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(previous) => start.to(previous.span),
            None => start,
        }
    }

    // =========================================================================
    // Token navigation helpers
    // =========================================================================

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        static EOF: std::sync::LazyLock<Token> =
            std::sync::LazyLock::new(|| Token::new(TokenKind::Eof, "", Span::default()));
        self.tokens
            .get(self.pos + offset)
            .or_else(|| self.tokens.last())
            .unwrap_or(&EOF)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len() || self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.peek().is_keyword(keyword)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        self.eat(TokenKind::Keyword(keyword))
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> ParseResult<String> {
        Ok(self.expect(TokenKind::Identifier, expected)?.lexeme)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        let found = if token.kind == TokenKind::Eof {
            "end of input".to_string()
        } else {
            format!("'{}'", token.lexeme)
        };
        self.error(format!("expected {expected}, found {found}"))
    }

    fn error(&self, message: String) -> ParseError {
        self.error_at(self.peek().span, message)
    }

    fn error_at(&self, span: Span, message: String) -> ParseError {
        ParseError {
            message,
            line: span.line,
            column: span.column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Program {
        let parsed = Parser::parse(source);
        assert_eq!(parsed.diagnostics, vec![], "unexpected diagnostics for {source:?}");
        parsed.program
    }

    fn messages(source: &str) -> Vec<String> {
        Parser::parse(source)
            .diagnostics
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    fn first_statement(source: &str) -> StmtKind {
        parse(source).statements.remove(0).kind
    }

    fn first_component(source: &str) -> Component {
        parse(source).components.remove(0)
    }

    // =========================================================================
    // Empty / simple
    // =========================================================================

    #[test]
    fn test_empty_program() {
        assert_eq!(parse(""), Program::default());
        assert_eq!(parse(";;"), Program::default());
    }

    #[test]
    fn test_expression_statement() {
        assert!(matches!(first_statement("foo(1)"), StmtKind::Expression(_)));
    }

    #[test]
    fn test_optional_semicolons() {
        assert_eq!(parse("a = 1; b = 2\nc = 3").statements.len(), 3);
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    #[test]
    fn test_function_declaration() {
        let program = parse("function add(a: Int, b) : Int { return a + b }");
        let function = &program.functions[0];
        assert_eq!(function.name, "add");
        assert_eq!(function.params.len(), 2);
        assert_eq!(function.params[0].ty.as_ref().map(|t| t.to_string()), Some("Int".into()));
        assert_eq!(function.params[1].ty, None);
        assert_eq!(function.return_type.as_ref().map(|t| t.to_string()), Some("Int".into()));
        assert!(!function.is_async);
        assert!(matches!(function.body.statements[0].kind, StmtKind::Return(Some(_))));
    }

    #[test]
    fn test_fn_keyword_and_async() {
        let program = parse("fn a() {}\nasync function b() {}\n@async fn c() {}");
        let flags: Vec<_> = program.functions.iter().map(|f| (f.name.as_str(), f.is_async)).collect();
        assert_eq!(flags, vec![("a", false), ("b", true), ("c", true)]);
        assert_eq!(program.functions[2].modifiers, vec!["async".to_string()]);
    }

    #[test]
    fn test_imports() {
        let program = parse("import { a, b } from \"lib\"\nimport React from 'react'");
        assert_eq!(program.imports[0].names, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(program.imports[0].source, "lib");
        assert_eq!(program.imports[1].default.as_deref(), Some("React"));
    }

    #[test]
    fn test_exports() {
        let program = parse("export default component App { }\nexport function f() {}\nexport let x = 1");
        assert_eq!(program.exports.len(), 3);
        assert!(program.exports[0].is_default);
        assert!(matches!(program.exports[0].item, ExportItem::Component(ref c) if c.name == "App"));
        assert!(matches!(program.exports[1].item, ExportItem::Function(ref f) if f.name == "f"));
        assert!(matches!(program.exports[2].item, ExportItem::Statement(_)));
    }

    #[test]
    fn test_component_modifiers() {
        let component = first_component("@async component Loader { }");
        assert_eq!(component.modifiers, vec!["async".to_string()]);
    }

    // =========================================================================
    // Components
    // =========================================================================

    #[test]
    fn test_counter_component() {
        let source = "component Counter {\n    count = 0\n    increment { count = count + 1 }\n    render:\n        <div>{count}</div>\n}";
        let program = parse(source);
        assert_eq!(program.components.len(), 1);

        let counter = &program.components[0];
        assert_eq!(counter.name, "Counter");
        assert_eq!(counter.statements.len(), 2);

        match &counter.statements[0].kind {
            StmtKind::Assignment { target, op, value } => {
                assert_eq!(target.kind, ExprKind::Identifier("count".into()));
                assert_eq!(*op, AssignOp::Assign);
                assert!(matches!(
                    value.kind,
                    ExprKind::Literal(Literal::Number { ref raw, kind: NumberKind::Int }) if raw == "0"
                ));
            }
            other => panic!("Expected state assignment, got {other:?}"),
        }
        match &counter.statements[1].kind {
            StmtKind::Function(method) => {
                assert_eq!(method.name, "increment");
                assert!(method.params.is_empty());
                assert_eq!(method.body.statements.len(), 1);
            }
            other => panic!("Expected method, got {other:?}"),
        }

        assert_eq!(counter.body.len(), 1);
        let Markup::Tag(div) = &counter.body[0] else {
            panic!("Expected tag, got {:?}", counter.body[0]);
        };
        assert_eq!(div.name, "div");
        assert_eq!(div.children.len(), 1);
        assert!(matches!(
            &div.children[0],
            Markup::Expr(Expr { kind: ExprKind::Identifier(name), .. }) if name == "count"
        ));
    }

    #[test]
    fn test_render_brace_form_and_members_after_render() {
        let component = first_component(
            "component A {\n render { <p>hi</p> <br/> }\n reset { x = 0 }\n x = 1\n}",
        );
        assert_eq!(component.body.len(), 2);
        assert_eq!(component.statements.len(), 2);
    }

    #[test]
    fn test_render_embedded_expression() {
        let component = first_component("component A { render: {label} }");
        assert!(matches!(&component.body[0], Markup::Expr(_)));
    }

    #[test]
    fn test_component_markup_without_render() {
        let component = first_component("component A { <span/> }");
        assert_eq!(component.body.len(), 1);
    }

    #[test]
    fn test_component_error_recovers_inside_body() {
        let parsed = Parser::parse("component A {\n x = \n render: <p/>\n}\nfunction ok() {}");
        assert!(!parsed.diagnostics.is_empty());
        assert_eq!(parsed.program.components.len(), 1);
        assert_eq!(parsed.program.functions.len(), 1);
    }

    // =========================================================================
    // Statements
    // =========================================================================

    #[test]
    fn test_variable_declarations() {
        let program = parse("let a = 1\nconst b: String = \"x\"\nvar c: Array<Int>\nlet d: Int[]?");
        let decls: Vec<_> = program
            .statements
            .iter()
            .map(|s| match &s.kind {
                StmtKind::Variable(v) => (v.kind, v.name.clone(), v.ty.as_ref().map(|t| t.to_string()), v.init.is_some()),
                other => panic!("Expected variable, got {other:?}"),
            })
            .collect();
        assert_eq!(
            decls,
            vec![
                (VarKind::Let, "a".into(), None, true),
                (VarKind::Const, "b".into(), Some("String".into()), true),
                (VarKind::Var, "c".into(), Some("Array<Int>".into()), false),
                (VarKind::Let, "d".into(), Some("Array<Int>?".into()), false),
            ]
        );
    }

    #[test]
    fn test_union_type_annotation() {
        let program = parse("let v: Int | String | null = 1");
        let StmtKind::Variable(decl) = &program.statements[0].kind else {
            panic!("Expected variable");
        };
        assert_eq!(decl.ty.as_ref().map(|t| t.to_string()), Some("Int | String | null".into()));
    }

    #[test]
    fn test_compound_assignment() {
        assert!(matches!(
            first_statement("total += 2"),
            StmtKind::Assignment { op: AssignOp::Add, .. }
        ));
        assert!(matches!(
            first_statement("user.name = \"x\""),
            StmtKind::Assignment { op: AssignOp::Assign, target: Expr { kind: ExprKind::Member { .. }, .. }, .. }
        ));
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert_eq!(messages("1 = 2"), vec!["invalid assignment target".to_string()]);
    }

    #[test]
    fn test_if_else_chain() {
        let stmt = first_statement("if a { x = 1 } else if b [ x = 2 ] else { x = 3 }");
        let StmtKind::If { alternate: Some(alternate), .. } = stmt else {
            panic!("Expected if with else");
        };
        let StmtKind::If { alternate: Some(last), .. } = &alternate.kind else {
            panic!("Expected else-if");
        };
        assert!(matches!(last.kind, StmtKind::Block(_)));
    }

    #[test]
    fn test_bracket_body_after_parenthesized_condition() {
        let stmt = first_statement("while (n > 0) [ n -= 1 ]");
        let StmtKind::While { body, .. } = stmt else {
            panic!("Expected while");
        };
        assert_eq!(body.statements.len(), 1);
    }

    #[test]
    fn test_index_in_condition_still_parses() {
        assert!(matches!(
            first_statement("if items[0] > 1 { }"),
            StmtKind::If { test: Expr { kind: ExprKind::Binary { .. }, .. }, .. }
        ));
    }

    #[test]
    fn test_c_style_for() {
        let stmt = first_statement("for (let i = 0; i < 10; i += 1) { log(i) }");
        assert!(matches!(
            stmt,
            StmtKind::For { init: Some(_), test: Some(_), update: Some(_), .. }
        ));
    }

    #[test]
    fn test_for_count_shorthand() {
        let stmt = first_statement("for i (5) [ log(i) ]");
        let StmtKind::For { init: Some(init), test: Some(test), update: Some(update), body } = stmt else {
            panic!("Expected desugared for");
        };
        match init.kind {
            StmtKind::Variable(decl) => {
                assert_eq!(decl.name, "i");
                assert!(matches!(
                    decl.init,
                    Some(Expr { kind: ExprKind::Literal(Literal::Number { ref raw, .. }), .. }) if raw == "0"
                ));
            }
            other => panic!("Expected variable, got {other:?}"),
        }
        assert!(matches!(test.kind, ExprKind::Binary { op: BinaryOp::Lt, .. }));
        assert!(matches!(update.kind, StmtKind::Assignment { op: AssignOp::Add, .. }));
        assert_eq!(body.statements.len(), 1);
    }

    #[test]
    fn test_for_range_shorthand() {
        let stmt = first_statement("for i (2, n) { }");
        let StmtKind::For { init: Some(init), .. } = stmt else {
            panic!("Expected for");
        };
        assert!(matches!(
            init.kind,
            StmtKind::Variable(VariableDecl { init: Some(Expr { kind: ExprKind::Literal(_), .. }), .. })
        ));
    }

    #[test]
    fn test_for_in() {
        let stmt = first_statement("for item in items [ total += item ]");
        assert!(matches!(
            stmt,
            StmtKind::ForIn { ref variable, iterable: Expr { kind: ExprKind::Identifier(_), .. }, .. } if variable == "item"
        ));
    }

    #[test]
    fn test_try_catch_finally() {
        let stmt = first_statement("try { risky() } catch (e) { log(e) } finally { done() }");
        let StmtKind::Try { catch: Some(catch), finally: Some(_), .. } = stmt else {
            panic!("Expected try");
        };
        assert_eq!(catch.param.as_deref(), Some("e"));
    }

    #[test]
    fn test_try_requires_handler() {
        assert_eq!(
            messages("try { }"),
            vec!["expected 'catch' or 'finally' after try block, found end of input".to_string()]
        );
    }

    #[test]
    fn test_throw_break_continue() {
        let program = parse("while true { break; continue }\nthrow \"bad\"");
        let StmtKind::While { body, .. } = &program.statements[0].kind else {
            panic!("Expected while");
        };
        assert!(matches!(body.statements[0].kind, StmtKind::Break));
        assert!(matches!(body.statements[1].kind, StmtKind::Continue));
        assert!(matches!(program.statements[1].kind, StmtKind::Throw(_)));
    }

    #[test]
    fn test_async_block() {
        let stmt = first_statement(
            "async { [ data = await load() ] [ catch (err) { log(err) } ] [ finally { done() } ] }",
        );
        let StmtKind::Async { block, catch: Some(catch), finally: Some(finally) } = stmt else {
            panic!("Expected full async block");
        };
        assert_eq!(block.statements.len(), 1);
        assert_eq!(catch.param.as_deref(), Some("err"));
        assert_eq!(finally.statements.len(), 1);
    }

    #[test]
    fn test_async_block_try_only() {
        assert!(matches!(
            first_statement("async { [ work() ] }"),
            StmtKind::Async { catch: None, finally: None, .. }
        ));
    }

    #[test]
    fn test_async_block_catch_without_name() {
        assert!(matches!(
            first_statement("async { [ work() ] [ catch { retry() } ] }"),
            StmtKind::Async { catch: Some(CatchClause { param: None, .. }), .. }
        ));
    }

    #[test]
    fn test_async_block_requires_try_segment() {
        assert_eq!(
            messages("async { }"),
            vec!["expected '[' to open the async try segment, found '}'".to_string()]
        );
    }

    // =========================================================================
    // Error recovery
    // =========================================================================

    #[test]
    fn test_broken_statement_between_functions() {
        let parsed = Parser::parse(
            "function first() { return 1 }\nlet = ;\nfunction second() { return 2 }",
        );
        let names: Vec<_> = parsed.program.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(!parsed.diagnostics.is_empty());
        assert!(parsed.diagnostics.iter().all(|d| d.stage == crate::Stage::Parse));
        assert!(matches!(parsed.program.statements[0].kind, StmtKind::Error(_)));
    }

    #[test]
    fn test_broken_expression_without_semicolon() {
        let parsed = Parser::parse("function a() {}\nx = (1 + \nfunction b() {}");
        assert_eq!(parsed.program.functions.len(), 2);
        assert_eq!(parsed.diagnostics.len(), 1);
    }

    #[test]
    fn test_broken_statement_keeps_following_variables() {
        let parsed = Parser::parse("let a = 1\nlet b = 2 *\nlet c = 3\nlet d = 4");
        let kinds: Vec<_> = parsed.program.statements.iter().map(Stmt::kind_name).collect();
        assert_eq!(
            kinds,
            vec!["VariableDeclaration", "Error", "VariableDeclaration", "VariableDeclaration"]
        );
        assert_eq!(parsed.diagnostics.len(), 1);
    }

    #[test]
    fn test_recovery_stops_at_every_declaration_start() {
        let cases: [(&str, fn(&Program) -> bool); 10] = [
            ("fn b() {}", |p| p.functions.len() == 1),
            ("function b() {}", |p| p.functions.len() == 1),
            ("async function b() {}", |p| p.functions.len() == 1),
            ("@async function b() {}", |p| p.functions.len() == 1),
            ("export function b() {}", |p| p.exports.len() == 1),
            ("component B {}", |p| p.components.len() == 1),
            ("const b = 1", |p| p.statements.len() == 2),
            ("var b = 1", |p| p.statements.len() == 2),
            ("throw b", |p| p.statements.len() == 2),
            ("async { [ b() ] }", |p| p.statements.len() == 2),
        ];
        for (declaration, kept) in cases {
            let source = format!("x = (1 + \n{declaration}");
            let parsed = Parser::parse(&source);
            assert_eq!(parsed.diagnostics.len(), 1, "{source}");
            assert!(matches!(parsed.program.statements[0].kind, StmtKind::Error(_)), "{source}");
            assert!(kept(&parsed.program), "{declaration} was swallowed by recovery");
        }
    }

    #[test]
    fn test_closer_of_broken_item_is_not_reported_again() {
        let parsed = Parser::parse("let a = (1 + ]\nlet b = 2");
        assert_eq!(
            parsed.diagnostics.iter().map(|d| d.message.as_str()).collect::<Vec<_>>(),
            vec!["expected an expression, found ']'"]
        );
        let kinds: Vec<_> = parsed.program.statements.iter().map(Stmt::kind_name).collect();
        assert_eq!(kinds, vec!["Error", "VariableDeclaration"]);
    }

    #[test]
    fn test_error_inside_block_keeps_block() {
        let parsed = Parser::parse("function f() { let = 1; return 2 }");
        assert_eq!(parsed.diagnostics.len(), 1);
        let body = &parsed.program.functions[0].body.statements;
        assert!(matches!(body[0].kind, StmtKind::Error(_)));
        assert!(matches!(body.last().map(|s| &s.kind), Some(StmtKind::Return(Some(_)))));
    }

    #[test]
    fn test_stray_closers_are_skipped() {
        let parsed = Parser::parse(") ] } function f() {}");
        assert_eq!(parsed.program.functions.len(), 1);
        assert_eq!(parsed.diagnostics.len(), 3);
    }

    #[test]
    fn test_unexpected_end_of_input() {
        assert_eq!(
            messages("function f() {"),
            vec!["expected '}' to close block, found end of input".to_string()]
        );
    }

    #[test]
    fn test_diagnostic_positions() {
        let parsed = Parser::parse("let a = 1\nlet = 2");
        assert_eq!((parsed.diagnostics[0].line, parsed.diagnostics[0].column), (2, 5));
    }

    #[test]
    fn test_lexer_errors_are_reported_and_skipped() {
        let parsed = Parser::parse("let a = 1 # \nlet b = 2");
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].stage, crate::Stage::Lex);
        assert_eq!(parsed.program.statements.len(), 2);
    }

    #[test]
    fn test_node_ids_are_unique() {
        let program = parse("let a = b + c * d");
        let StmtKind::Variable(VariableDecl { init: Some(init), .. }) = &program.statements[0].kind else {
            panic!("Expected initializer");
        };
        let ExprKind::Binary { left, right, .. } = &init.kind else {
            panic!("Expected binary");
        };
        assert_ne!(left.id, right.id);
        assert_ne!(init.id, left.id);
    }
}
