//! Markup parsing: render sections, tags, attributes and children.

use super::{ParseResult, Parser};
use crate::ast::{Attribute, Expr, ExprKind, Literal, Markup, Tag, Text};
use crate::style::parse_style;
use alterion_lexer::TokenKind;

impl Parser {
    /// `render: <markup>...` or `render { <markup>... }`
    pub(super) fn parse_render(&mut self, body: &mut Vec<Markup>) -> ParseResult<()> {
        self.advance(); // `render`

        if self.eat(TokenKind::Colon) {
            self.parse_markup_sequence(body)?;
            return Ok(());
        }

        if self.eat(TokenKind::LBrace) {
            self.parse_markup_sequence(body)?;
            self.expect(TokenKind::RBrace, "'}' to close render block")?;
            return Ok(());
        }

        Err(self.unexpected("':' or '{' after 'render'"))
    }

    /// Tags, `{expr}` and quoted text, until something else shows up.
    fn parse_markup_sequence(&mut self, body: &mut Vec<Markup>) -> ParseResult<()> {
        loop {
            match self.peek().kind {
                TokenKind::TagOpen => body.push(Markup::Tag(self.parse_tag()?)),
                TokenKind::LBrace => {
                    self.advance();
                    let expr = self.parse_expression()?;
                    self.expect(TokenKind::RBrace, "'}' after embedded expression")?;
                    body.push(Markup::Expr(expr));
                }
                TokenKind::String => {
                    let token = self.advance();
                    body.push(Markup::Text(Text {
                        content: token.lexeme,
                        span: token.span,
                    }));
                }
                _ => return Ok(()),
            }
        }
    }

    /// `<name attr...>children</name>` or `<name attr... />`
    pub(super) fn parse_tag(&mut self) -> ParseResult<Tag> {
        let open = self.expect(TokenKind::TagOpen, "a tag")?;
        let name = open.lexeme;
        let mut attributes = Vec::new();
        let mut styles = Vec::new();

        loop {
            match self.peek().kind {
                TokenKind::AttributeName | TokenKind::AtModifier => {
                    attributes.push(self.parse_attribute()?);
                }
                TokenKind::StyleProperty => {
                    let token = self.advance();
                    styles.extend(parse_style(&token.lexeme));
                }
                TokenKind::TagSelfClose => {
                    self.advance();
                    return Ok(Tag {
                        name,
                        attributes,
                        styles,
                        children: Vec::new(),
                        self_closing: true,
                        span: self.span_from(open.span),
                    });
                }
                TokenKind::TagEnd => {
                    self.advance();
                    break;
                }
                _ => return Err(self.unexpected(&format!("an attribute or '>' in <{name}>"))),
            }
        }

        let children = self.parse_children(&name)?;

        Ok(Tag {
            name,
            attributes,
            styles,
            children,
            self_closing: false,
            span: self.span_from(open.span),
        })
    }

    /// `name`, `name=value` or `@event=value`.
    fn parse_attribute(&mut self) -> ParseResult<Attribute> {
        let token = self.advance();
        let event = token.kind == TokenKind::AtModifier;

        let value = if self.eat(TokenKind::Equals) {
            Some(self.parse_attribute_value()?)
        } else {
            None
        };

        Ok(Attribute {
            name: token.lexeme,
            value,
            event,
            span: self.span_from(token.span),
        })
    }

    fn parse_attribute_value(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();
        let kind = match token.kind {
            TokenKind::ExpressionStart => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::ExpressionEnd, "'}' after attribute expression")?;
                return Ok(expr);
            }
            TokenKind::String | TokenKind::AttributeName => {
                ExprKind::Literal(Literal::String(token.lexeme))
            }
            TokenKind::Number(kind) => ExprKind::Literal(Literal::Number {
                raw: token.lexeme,
                kind,
            }),
            TokenKind::ValueBinding => ExprKind::ValueBinding(token.lexeme),
            _ => return Err(self.unexpected("an attribute value")),
        };
        self.advance();
        Ok(self.node(kind, token.span))
    }

    /// Children up to and including `</name>`. Adjacent text tokens are
    /// merged, with a single space wherever the source had whitespace.
    fn parse_children(&mut self, name: &str) -> ParseResult<Vec<Markup>> {
        let mut children: Vec<Markup> = Vec::new();

        loop {
            match self.peek().kind {
                TokenKind::TagClose => {
                    let close = self.peek();
                    if close.lexeme != name {
                        let message = format!(
                            "mismatched closing tag: expected </{name}> but got </{}>",
                            close.lexeme
                        );
                        return Err(self.error(message));
                    }
                    self.advance();
                    return Ok(children);
                }
                TokenKind::TagOpen => children.push(Markup::Tag(self.parse_tag()?)),
                TokenKind::ExpressionStart => {
                    self.advance();
                    let expr = self.parse_expression()?;
                    self.expect(TokenKind::ExpressionEnd, "'}' after embedded expression")?;
                    children.push(Markup::Expr(expr));
                }
                TokenKind::Text => {
                    let token = self.advance();
                    match children.last_mut() {
                        Some(Markup::Text(text)) => {
                            if token.span.start != text.span.end {
                                text.content.push(' ');
                            }
                            text.content.push_str(&token.lexeme);
                            text.span = text.span.to(token.span);
                        }
                        _ => children.push(Markup::Text(Text {
                            content: token.lexeme,
                            span: token.span,
                        })),
                    }
                }
                TokenKind::Eof => return Err(self.error(format!("unclosed tag <{name}>"))),
                _ => return Err(self.unexpected(&format!("content or </{name}>"))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::Parser;
    use pretty_assertions::assert_eq;

    fn render(markup: &str) -> Vec<Markup> {
        let parsed = Parser::parse(&format!("component Probe {{ render: {markup} }}"));
        assert_eq!(parsed.diagnostics, vec![], "unexpected diagnostics for {markup:?}");
        let mut components = parsed.program.components;
        components.remove(0).body
    }

    fn tag(markup: &str) -> Tag {
        match render(markup).remove(0) {
            Markup::Tag(tag) => tag,
            other => panic!("Expected tag, got {other:?}"),
        }
    }

    fn messages(source: &str) -> Vec<String> {
        Parser::parse(source)
            .diagnostics
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    #[test]
    fn test_nested_tags_and_text() {
        let div = tag("<div><h1>Hello, world!</h1><p>Count: {count}</p></div>");
        assert_eq!(div.children.len(), 2);

        let Markup::Tag(h1) = &div.children[0] else {
            panic!("Expected h1");
        };
        assert_eq!(h1.name, "h1");
        assert!(matches!(&h1.children[..], [Markup::Text(t)] if t.content == "Hello, world!"));

        let Markup::Tag(p) = &div.children[1] else {
            panic!("Expected p");
        };
        assert!(matches!(
            &p.children[..],
            [Markup::Text(t), Markup::Expr(_)] if t.content == "Count:"
        ));
    }

    #[test]
    fn test_text_merging_keeps_adjacency() {
        let p = tag("<p>a<1 c  d</p>");
        assert!(matches!(&p.children[..], [Markup::Text(t)] if t.content == "a<1 c d"));
    }

    #[test]
    fn test_attributes() {
        let input = tag("<input type=\"text\" disabled value={name} size=3 data-id=!id @click={save} />");
        assert!(input.self_closing);

        let names: Vec<_> = input
            .attributes
            .iter()
            .map(|a| (a.name.as_str(), a.event, a.value.as_ref().map(|v| v.kind_name())))
            .collect();
        assert_eq!(
            names,
            vec![
                ("type", false, Some("Literal")),
                ("disabled", false, None),
                ("value", false, Some("Identifier")),
                ("size", false, Some("Literal")),
                ("data-id", false, Some("ValueBinding")),
                ("click", true, Some("Identifier")),
            ]
        );
    }

    #[test]
    fn test_unquoted_attribute_value() {
        let a = tag("<a target=blank/>");
        assert_eq!(
            a.attributes[0].value.as_ref().map(|v| v.kind.clone()),
            Some(ExprKind::Literal(Literal::String("blank".into())))
        );
    }

    #[test]
    fn test_style_shorthand() {
        let p = tag("<p style: color: red; margin: 0 auto>x</p>");
        assert_eq!(
            p.styles,
            vec![
                StyleDecl {
                    property: "color".into(),
                    value: "red".into()
                },
                StyleDecl {
                    property: "margin".into(),
                    value: "0 auto".into()
                },
            ]
        );
    }

    #[test]
    fn test_component_tag() {
        let tag = tag("<Counter start={5}/>");
        assert!(tag.is_component());
    }

    #[test]
    fn test_render_sequence_mixed_items() {
        let body = render("<h1/> {title} \"caption\"");
        let kinds: Vec<_> = body.iter().map(|m| m.kind_name()).collect();
        assert_eq!(kinds, vec!["Tag", "EmbeddedExpression", "TextContent"]);
    }

    #[test]
    fn test_mismatched_closing_tag() {
        assert_eq!(
            messages("component A { render: <a>x</b> }"),
            vec!["mismatched closing tag: expected </a> but got </b>".to_string()]
        );
    }

    #[test]
    fn test_unclosed_tag() {
        assert_eq!(
            messages("component A { render: <div><p>text"),
            vec![
                "unclosed tag <p>".to_string(),
                "expected '}' to close component, found end of input".to_string(),
            ]
        );
    }

    #[test]
    fn test_render_requires_colon_or_brace() {
        assert_eq!(
            messages("component A { render <p/> }"),
            vec!["expected ':' or '{' after 'render', found 'p'".to_string()]
        );
    }
}
