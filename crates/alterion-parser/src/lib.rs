//! Alterion Parser
//!
//! Parses the token stream from `alterion-lexer` into a [`Program`]. Statements
//! and declarations use recursive descent, expressions use precedence
//! climbing, and inline markup (`<tag>...</tag>`) is parsed from the markup
//! tokens the lexer produces.
//!
//! Parsing never aborts. A failed statement is recorded as a [`Diagnostic`],
//! the parser skips to the next statement boundary, and an `Error` node takes
//! the statement's place in the tree.
//!
//! # Example
//!
//! ```
//! use alterion_parser::Parser;
//!
//! let parsed = Parser::parse("function double(x) { return x * 2 }");
//! assert!(parsed.diagnostics.is_empty());
//! assert_eq!(parsed.program.functions[0].name, "double");
//! ```

pub mod ast;
pub mod parser;
pub mod style;
pub mod visit;

pub use alterion_lexer::{Diagnostic, Stage};
pub use ast::{Component, Expr, ExprKind, Function, Markup, NodeId, Program, Stmt, StmtKind, Tag};
pub use parser::{Parsed, Parser};
pub use visit::Visitor;

/// Parser error with position information.
///
/// Returned by the individual parse functions; the statement loops turn it
/// into a recorded [`Diagnostic`] and an `Error` node.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Parse error at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl From<ParseError> for Diagnostic {
    fn from(error: ParseError) -> Self {
        Diagnostic {
            message: error.message,
            line: error.line,
            column: error.column,
            stage: Stage::Parse,
        }
    }
}

/// Parse an already tokenized unit.
pub fn parse(tokens: Vec<alterion_lexer::Token>) -> Parsed {
    Parser::new(tokens).parse_program()
}
