//! Expression parsing: precedence climbing over binary operators, then
//! unary, postfix and primary forms.

use super::{ParseResult, Parser};
use crate::ast::{BinaryOp, Expr, ExprKind, Literal, ObjectProperty, PropertyKey, UnaryOp};
use alterion_lexer::{Keyword, TokenKind};

/// Binding power of a binary operator token. Higher binds tighter.
fn binary_op(kind: TokenKind) -> Option<(BinaryOp, u8)> {
    let op = match kind {
        TokenKind::OrOr => (BinaryOp::Or, 1),
        TokenKind::AndAnd => (BinaryOp::And, 2),
        TokenKind::EqEq => (BinaryOp::Eq, 3),
        TokenKind::NotEq => (BinaryOp::NotEq, 3),
        TokenKind::Lt => (BinaryOp::Lt, 4),
        TokenKind::LtEq => (BinaryOp::LtEq, 4),
        TokenKind::Gt => (BinaryOp::Gt, 4),
        TokenKind::GtEq => (BinaryOp::GtEq, 4),
        TokenKind::Plus => (BinaryOp::Add, 5),
        TokenKind::Minus => (BinaryOp::Sub, 5),
        TokenKind::Star => (BinaryOp::Mul, 6),
        TokenKind::Slash => (BinaryOp::Div, 6),
        TokenKind::Percent => (BinaryOp::Mod, 6),
        TokenKind::StarStar => (BinaryOp::Pow, 7),
        _ => return None,
    };
    Some(op)
}

impl Parser {
    pub(super) fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_conditional()
    }

    /// The condition of `if`/`while` or the iterable of `for ... in`. A `[`
    /// separated from the expression by whitespace opens the body rather
    /// than indexing.
    pub(super) fn parse_head(&mut self) -> ParseResult<Expr> {
        let outer = std::mem::replace(&mut self.in_head, true);
        let result = self.parse_expression();
        self.in_head = outer;
        result
    }

    /// Run `parse` with the head restriction lifted, for bracketed
    /// sub-expressions.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        let outer = std::mem::replace(&mut self.in_head, false);
        let result = parse(self);
        self.in_head = outer;
        result
    }

    /// Whether the current token can begin an expression.
    pub(super) fn starts_expression(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Number(_)
                | TokenKind::String
                | TokenKind::Boolean
                | TokenKind::Null
                | TokenKind::Identifier
                | TokenKind::ValueBinding
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::TagOpen
                | TokenKind::Bang
                | TokenKind::Minus
                | TokenKind::Plus
                | TokenKind::Keyword(Keyword::Await)
        )
    }

    /// `test ? consequent : alternate`, right-associative.
    fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let test = self.parse_binary(1)?;
        if !self.eat(TokenKind::Question) {
            return Ok(test);
        }

        let consequent = self.nested(|p| p.parse_expression())?;
        self.expect(TokenKind::Colon, "':' in conditional expression")?;
        let alternate = self.parse_conditional()?;
        let span = test.span.to(alternate.span);

        Ok(self.node(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        ))
    }

    fn parse_binary(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;

        while let Some((op, prec)) = binary_op(self.peek().kind) {
            if prec < min_prec {
                break;
            }
            self.advance();

            // `**` is right-associative, everything else left.
            let next = if op == BinaryOp::Pow { prec } else { prec + 1 };
            let right = self.parse_binary(next)?;
            let span = left.span.to(right.span);
            left = self.node(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    /// Prefix operators bind tighter than every binary operator, `**`
    /// included: `-2 ** 2` is `(-2) ** 2`.
    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Plus),
            _ => None,
        };

        if let Some(op) = op {
            let start = self.advance().span;
            let operand = self.parse_unary()?;
            let span = start.to(operand.span);
            return Ok(self.node(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ));
        }

        if self.check_keyword(Keyword::Await) {
            let start = self.advance().span;
            let operand = self.parse_unary()?;
            let span = start.to(operand.span);
            return Ok(self.node(ExprKind::Await(Box::new(operand)), span));
        }

        self.parse_postfix()
    }

    /// Calls, member access and indexing.
    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek().kind {
                TokenKind::LParen => {
                    self.advance();
                    let arguments =
                        self.nested(|p| p.parse_list(TokenKind::RParen, "')' after arguments"))?;
                    let span = self.span_from(expr.span);
                    expr = self.node(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            arguments,
                        },
                        span,
                    );
                }
                TokenKind::Dot => {
                    self.advance();
                    let property = match self.peek().kind {
                        TokenKind::Identifier
                        | TokenKind::Keyword(_)
                        | TokenKind::Boolean
                        | TokenKind::Null => self.advance().lexeme,
                        _ => return Err(self.unexpected("a property name after '.'")),
                    };
                    let span = self.span_from(expr.span);
                    expr = self.node(
                        ExprKind::Member {
                            object: Box::new(expr),
                            property,
                        },
                        span,
                    );
                }
                TokenKind::LBracket if self.indexes(&expr) => {
                    self.advance();
                    let index = self.nested(|p| p.parse_expression())?;
                    self.expect(TokenKind::RBracket, "']' after index")?;
                    let span = self.span_from(expr.span);
                    expr = self.node(
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    /// In a control-flow head only a `[` touching the previous token indexes.
    fn indexes(&self, object: &Expr) -> bool {
        !self.in_head || self.peek().span.start == object.span.end
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();

        let kind = match token.kind {
            TokenKind::Number(kind) => ExprKind::Literal(Literal::Number {
                raw: token.lexeme,
                kind,
            }),
            TokenKind::String => ExprKind::Literal(Literal::String(token.lexeme)),
            TokenKind::Boolean => ExprKind::Literal(Literal::Bool(token.lexeme == "true")),
            TokenKind::Null => ExprKind::Literal(Literal::Null),
            TokenKind::Identifier => ExprKind::Identifier(token.lexeme),
            TokenKind::ValueBinding => ExprKind::ValueBinding(token.lexeme),

            TokenKind::LParen => {
                self.advance();
                let inner = self.nested(|p| p.parse_expression())?;
                self.expect(TokenKind::RParen, "')' after expression")?;
                return Ok(inner);
            }
            TokenKind::LBracket => {
                self.advance();
                let elements =
                    self.nested(|p| p.parse_list(TokenKind::RBracket, "']' after array elements"))?;
                let span = self.span_from(token.span);
                return Ok(self.node(ExprKind::Array(elements), span));
            }
            TokenKind::LBrace => return self.nested(|p| p.parse_object()),
            TokenKind::TagOpen => {
                let tag = self.nested(|p| p.parse_tag())?;
                let span = tag.span;
                return Ok(self.node(ExprKind::Tag(Box::new(tag)), span));
            }

            _ => return Err(self.unexpected("an expression")),
        };

        self.advance();
        Ok(self.node(kind, token.span))
    }

    /// Comma-separated expressions up to and including `close`. A trailing
    /// comma is allowed.
    fn parse_list(&mut self, close: TokenKind, expected: &str) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.check(close) && !self.is_at_end() {
            items.push(self.parse_expression()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(close, expected)?;
        Ok(items)
    }

    /// `{ key: value, "quoted": value, [computed]: value, shorthand }`
    fn parse_object(&mut self) -> ParseResult<Expr> {
        let start = self.advance().span;
        let mut properties = Vec::new();

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let key_token = self.peek().clone();
            let key = match key_token.kind {
                TokenKind::LBracket => {
                    self.advance();
                    let key = self.parse_expression()?;
                    self.expect(TokenKind::RBracket, "']' after computed key")?;
                    PropertyKey::Computed(key)
                }
                TokenKind::Identifier
                | TokenKind::String
                | TokenKind::Keyword(_)
                | TokenKind::Number(_)
                | TokenKind::Boolean
                | TokenKind::Null => {
                    self.advance();
                    PropertyKey::Named(key_token.lexeme.clone())
                }
                _ => return Err(self.unexpected("a property key")),
            };

            let value = if self.eat(TokenKind::Colon) {
                self.parse_expression()?
            } else if key_token.kind == TokenKind::Identifier {
                self.node(ExprKind::Identifier(key_token.lexeme), key_token.span)
            } else {
                return Err(self.unexpected("':' after property key"));
            };
            properties.push(ObjectProperty { key, value });

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}' after object properties")?;

        let span = self.span_from(start);
        Ok(self.node(ExprKind::Object(properties), span))
    }
}
