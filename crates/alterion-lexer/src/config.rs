//! Lexer configuration.

/// Default cap on lexical errors before scanning gives up.
pub const DEFAULT_MAX_ERRORS: usize = 1000;

/// How identifiers are matched against the keyword set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeywordCase {
    /// `Component` is an identifier, `component` a keyword.
    #[default]
    Sensitive,
    /// Identifiers are lower-cased before keyword lookup.
    Insensitive,
}

/// Options controlling the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerConfig {
    /// Errors tolerated before a terminal "too many errors" token is emitted.
    pub max_errors: usize,
    pub keyword_case: KeywordCase,
    /// Accept `1e10` / `2.5E-3` exponent suffixes on decimal literals.
    pub scientific_notation: bool,
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            max_errors: DEFAULT_MAX_ERRORS,
            keyword_case: KeywordCase::Sensitive,
            scientific_notation: true,
        }
    }
}
