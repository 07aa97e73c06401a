//! Alterion Lexer
//!
//! Tokenizes Alterion source into a flat token stream. A single scanning loop
//! handles ordinary code and inline markup (`<tag attr={expr}>text</tag>`),
//! switching between them with an explicit stack of lexical modes.
//! Malformed input never aborts the scan: it yields `Error` tokens, which
//! [`Lexed::diagnostics`] turns into [`Diagnostic`]s.
//!
//! # Example
//!
//! ```
//! use alterion_lexer::{LexMode, Scanner, TokenKind};
//!
//! let lexed = Scanner::tokenize("<p>{!title}</p>");
//! assert_eq!(lexed.tokens[3].kind, TokenKind::ValueBinding);
//! assert_eq!(lexed.tokens[3].lexeme, "title");
//! assert_eq!(lexed.final_mode(), LexMode::Normal);
//! ```

pub mod config;
pub mod mode;
pub mod scanner;
pub mod token;

use serde::Serialize;

pub use config::{KeywordCase, LexerConfig};
pub use mode::{LexMode, ModeStack};
pub use scanner::{Lexed, Scanner};
pub use token::{Keyword, NumberKind, Span, Token, TokenKind};

/// Pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Lex,
    Parse,
    Type,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Lex => "lex",
            Stage::Parse => "parse",
            Stage::Type => "type",
        })
    }
}

/// A non-fatal problem found by one of the pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("{stage} error at line {line}, column {column}: {message}")]
pub struct Diagnostic {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub stage: Stage,
}

impl Diagnostic {
    pub fn new(stage: Stage, message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            line: span.line,
            column: span.column,
            stage,
        }
    }
}
