use crate::config::{KeywordCase, LexerConfig};
use crate::mode::{LexMode, ModeStack};
use crate::token::{Keyword, NumberKind, Span, Token, TokenKind};
use crate::{Diagnostic, Stage};

/// Result of scanning one compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexed {
    /// All tokens, always terminated by exactly one `Eof`.
    pub tokens: Vec<Token>,
    /// The mode stack as it was when input ran out.
    pub modes: Vec<LexMode>,
}

impl Lexed {
    /// The innermost mode at end of input.
    pub fn final_mode(&self) -> LexMode {
        self.modes.last().copied().unwrap_or_default()
    }

    /// Lexical diagnostics, one per `Error` token, in source order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Error)
            .map(|t| Diagnostic {
                message: t.error.clone().unwrap_or_else(|| "invalid token".into()),
                line: t.span.line,
                column: t.span.column,
                stage: Stage::Lex,
            })
            .collect()
    }
}

/// Alterion source scanner.
///
/// One cursor walks the whole unit; an explicit [`ModeStack`] decides whether
/// the next characters are code, tag attributes, tag text, an embedded
/// `{expression}` or a `style:` value. Lexical errors never abort the scan:
/// they become `Error` tokens and the cursor skips ahead to the next
/// whitespace, delimiter or alphanumeric run.
///
/// Input is decoded up front into units: one per character, and one per
/// byte of any invalid UTF-8 sequence (`None`), so bad bytes can be reported
/// with a position instead of being replaced silently.
pub struct Scanner {
    units: Vec<Option<char>>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    modes: ModeStack,
    config: LexerConfig,
    errors: usize,
    halted: bool,
}

impl Scanner {
    /// Create a new scanner for the given source.
    pub fn new(source: &str) -> Self {
        Self::from_units(source.chars().map(Some).collect())
    }

    /// Create a scanner over raw bytes that may not be valid UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut units = Vec::with_capacity(bytes.len());
        for chunk in bytes.utf8_chunks() {
            units.extend(chunk.valid().chars().map(Some));
            units.extend(chunk.invalid().iter().map(|_| None));
        }
        Self::from_units(units)
    }

    fn from_units(units: Vec<Option<char>>) -> Self {
        Self {
            units,
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            modes: ModeStack::new(),
            config: LexerConfig::default(),
            errors: 0,
            halted: false,
        }
    }

    /// Replace the default configuration.
    pub fn with_config(mut self, config: LexerConfig) -> Self {
        self.config = config;
        self
    }

    /// Tokenize a source string with the default configuration.
    pub fn tokenize(source: &str) -> Lexed {
        Scanner::new(source).scan()
    }

    /// Tokenize raw bytes with the default configuration.
    pub fn tokenize_bytes(bytes: &[u8]) -> Lexed {
        Scanner::from_bytes(bytes).scan()
    }

    /// Scan the whole unit.
    pub fn scan(mut self) -> Lexed {
        while !self.is_at_end() && !self.halted {
            self.scan_token();
        }

        let mark = self.mark();
        self.push(TokenKind::Eof, "", mark);

        log::debug!(
            "lexed {} tokens ({} errors), final mode {:?}",
            self.tokens.len(),
            self.errors,
            self.modes.current()
        );

        Lexed {
            tokens: self.tokens,
            modes: self.modes.into_vec(),
        }
    }

    /// Scan the next token according to the current mode.
    fn scan_token(&mut self) {
        if self.peek_unit().is_none() {
            self.error_unit("invalid UTF-8 byte sequence");
            return;
        }

        match self.modes.current() {
            LexMode::Normal | LexMode::Expression => self.scan_code(),
            LexMode::TagAttribute => self.scan_attribute(),
            LexMode::TagContent => self.scan_content(),
            LexMode::StyleValue => self.scan_style_value(),
        }
    }

    // --- Code (Normal / Expression) ---

    fn scan_code(&mut self) {
        let ch = self.peek();

        match ch {
            ' ' | '\t' | '\r' | '\n' => self.advance(),

            '/' if self.peek_next() == '/' => self.skip_line_comment(),
            '/' if self.peek_next() == '*' => self.skip_block_comment(),

            '"' | '\'' => self.scan_string(),
            '0'..='9' => self.scan_number(),

            // `!name` wins over the `!` operator
            '!' if self.peek_next().is_ascii_alphabetic() => self.scan_value_binding(),
            '@' => self.scan_at_modifier(),

            '<' if self.starts_tag() => self.scan_tag_open(),

            '{' => {
                self.punct(TokenKind::LBrace, 1);
                self.modes.push(LexMode::Normal);
            }
            '}' => {
                if self.modes.current() == LexMode::Expression {
                    self.punct(TokenKind::ExpressionEnd, 1);
                } else {
                    self.punct(TokenKind::RBrace, 1);
                }
                self.modes.pop();
            }

            '+' => self.operator('=', TokenKind::PlusEquals, TokenKind::Plus),
            '-' => self.operator('=', TokenKind::MinusEquals, TokenKind::Minus),
            '*' if self.peek_next() == '*' => self.punct(TokenKind::StarStar, 2),
            '*' => self.operator('=', TokenKind::StarEquals, TokenKind::Star),
            '/' => self.operator('=', TokenKind::SlashEquals, TokenKind::Slash),
            '%' => self.operator('=', TokenKind::PercentEquals, TokenKind::Percent),
            '=' => self.operator('=', TokenKind::EqEq, TokenKind::Equals),
            '!' => self.operator('=', TokenKind::NotEq, TokenKind::Bang),
            '<' => self.operator('=', TokenKind::LtEq, TokenKind::Lt),
            '>' => self.operator('=', TokenKind::GtEq, TokenKind::Gt),
            '|' => self.operator('|', TokenKind::OrOr, TokenKind::Pipe),
            '&' if self.peek_next() == '&' => self.punct(TokenKind::AndAnd, 2),

            '?' => self.punct(TokenKind::Question, 1),
            '(' => self.punct(TokenKind::LParen, 1),
            ')' => self.punct(TokenKind::RParen, 1),
            '[' => self.punct(TokenKind::LBracket, 1),
            ']' => self.punct(TokenKind::RBracket, 1),
            ',' => self.punct(TokenKind::Comma, 1),
            '.' => self.punct(TokenKind::Dot, 1),
            ':' => self.punct(TokenKind::Colon, 1),
            ';' => self.punct(TokenKind::Semicolon, 1),

            c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(),

            c => self.error_unexpected(c),
        }
    }

    /// `<` opens a tag when followed by a letter, outside Expression mode,
    /// and not directly after an operand (`a <b` and `Array<Int>` compare).
    fn starts_tag(&self) -> bool {
        self.modes.current() == LexMode::Normal
            && self.peek_next().is_ascii_alphabetic()
            && !self.tokens.last().is_some_and(|t| t.kind.ends_operand())
    }

    // --- Markup ---

    /// Inside `<name ...`: attributes until `>` or `/>`.
    fn scan_attribute(&mut self) {
        let ch = self.peek();

        match ch {
            ' ' | '\t' | '\r' | '\n' => self.advance(),

            '/' if self.peek_next() == '/' => self.skip_line_comment(),
            '/' if self.peek_next() == '*' => self.skip_block_comment(),

            '>' => {
                self.punct(TokenKind::TagEnd, 1);
                self.modes.replace(LexMode::TagContent);
            }
            '/' if self.peek_next() == '>' => {
                self.punct(TokenKind::TagSelfClose, 2);
                self.modes.pop();
            }
            '{' => {
                self.punct(TokenKind::ExpressionStart, 1);
                self.modes.push(LexMode::Expression);
            }

            '=' => self.punct(TokenKind::Equals, 1),
            '"' | '\'' => self.scan_string(),
            '0'..='9' => self.scan_number(),
            '!' if self.peek_next().is_ascii_alphabetic() => self.scan_value_binding(),
            '@' => self.scan_at_modifier(),

            c if c.is_ascii_alphabetic() || c == '_' => {
                let mark = self.mark();
                let name = self.read_name();
                if name == "style" && self.peek() == ':' {
                    self.advance();
                    self.modes.push(LexMode::StyleValue);
                } else {
                    self.push(TokenKind::AttributeName, name, mark);
                }
            }

            c => self.error_unexpected(c),
        }
    }

    /// Between `>` and the closing tag: text runs, nested tags and `{expr}`.
    fn scan_content(&mut self) {
        let ch = self.peek();

        match ch {
            ' ' | '\t' | '\r' | '\n' => self.advance(),

            '<' if self.peek_next() == '/' => self.scan_tag_close(),
            '<' if self.peek_next().is_ascii_alphabetic() => self.scan_tag_open(),
            '<' => self.punct(TokenKind::Text, 1),

            '{' => {
                self.punct(TokenKind::ExpressionStart, 1);
                self.modes.push(LexMode::Expression);
            }

            c if c.is_ascii_control() => self.error_unexpected(c),

            _ => {
                let mark = self.mark();
                while !self.is_at_end() {
                    match self.peek_unit() {
                        Some(c) if Self::is_text_char(c) => self.advance(),
                        _ => break,
                    }
                }
                let text = self.text_from(mark.start);
                self.push(TokenKind::Text, text, mark);
            }
        }
    }

    fn is_text_char(c: char) -> bool {
        !matches!(c, '<' | '{') && !c.is_whitespace() && !c.is_ascii_control()
    }

    /// `<name`: emit the tag opener and enter the attribute list.
    fn scan_tag_open(&mut self) {
        let mark = self.mark();
        self.advance(); // `<`
        let name = self.read_name();
        self.push(TokenKind::TagOpen, name, mark);
        self.modes.push(LexMode::TagAttribute);
    }

    /// `</name>`: emit the closer and leave the tag's content.
    fn scan_tag_close(&mut self) {
        let mark = self.mark();
        self.advance(); // `<`
        self.advance(); // `/`
        let name = if self.peek().is_ascii_alphabetic() || self.peek() == '_' {
            self.read_name()
        } else {
            String::new()
        };
        self.skip_inline_whitespace();

        if self.peek() == '>' {
            self.advance();
            self.push(TokenKind::TagClose, name, mark);
        } else {
            self.push(TokenKind::TagClose, name.clone(), mark);
            let here = self.mark();
            self.push_error(
                String::new(),
                format!("expected '>' to close </{name}"),
                here,
            );
        }
        self.modes.pop();
    }

    /// Raw `key: value; ...` text after `style:`, up to `>` or `/>`.
    /// A quoted value is taken verbatim up to the matching quote.
    fn scan_style_value(&mut self) {
        self.skip_inline_whitespace();
        let mark = self.mark();

        let quote = self.peek();
        if quote == '"' || quote == '\'' {
            self.advance();
            let start = self.pos;
            while !self.is_at_end() && self.peek() != quote {
                self.advance();
            }
            let text = self.text_from(start);
            if self.is_at_end() {
                self.push_error(text, "unterminated style value", mark);
            } else {
                self.advance();
                self.push(TokenKind::StyleProperty, text.trim(), mark);
            }
        } else {
            let start = self.pos;
            while !self.is_at_end()
                && self.peek() != '>'
                && !(self.peek() == '/' && self.peek_next() == '>')
            {
                self.advance();
            }
            let text = self.text_from(start);
            self.push(TokenKind::StyleProperty, text.trim(), mark);
        }

        self.modes.pop();
    }

    // --- Literals and names ---

    /// Scan a string literal, resolving escapes into the lexeme.
    fn scan_string(&mut self) {
        let mark = self.mark();
        let quote = self.peek();
        self.advance(); // opening quote

        let mut value = String::new();
        let mut problem: Option<String> = None;

        loop {
            if self.is_at_end() || self.peek() == '\n' {
                self.push_error(value, "unterminated string", mark);
                return;
            }

            if self.peek_unit().is_none() {
                problem.get_or_insert_with(|| "invalid UTF-8 byte sequence in string".into());
                value.push(char::REPLACEMENT_CHARACTER);
                self.advance();
                continue;
            }

            let c = self.peek();
            if c == quote {
                self.advance();
                break;
            }

            if c == '\\' {
                self.advance();
                if self.is_at_end() {
                    self.push_error(value, "unterminated string", mark);
                    return;
                }
                match self.peek() {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '0' => value.push('\0'),
                    '\\' => value.push('\\'),
                    '"' => value.push('"'),
                    '\'' => value.push('\''),
                    other => {
                        problem
                            .get_or_insert_with(|| format!("invalid escape sequence '\\{other}'"));
                        value.push(other);
                    }
                }
                self.advance();
            } else {
                value.push(c);
                self.advance();
            }
        }

        match problem {
            Some(message) => self.push_error(value, message, mark),
            None => self.push(TokenKind::String, value, mark),
        }
    }

    /// Scan a number literal: `0x`/`0b` integers, or decimal with optional
    /// fraction and exponent.
    fn scan_number(&mut self) {
        let mark = self.mark();
        let mut kind = NumberKind::Int;

        let radix = match (self.peek(), self.peek_next()) {
            ('0', 'x' | 'X') => Some(16),
            ('0', 'b' | 'B') => Some(2),
            _ => None,
        };

        if let Some(radix) = radix {
            self.advance();
            self.advance();
            let digits_start = self.pos;
            while self.peek().is_digit(radix) {
                self.advance();
            }
            if self.pos == digits_start {
                self.consume_word();
                let text = self.text_from(mark.start);
                self.push_error(text.clone(), format!("malformed number literal '{text}'"), mark);
                return;
            }
        } else {
            while self.peek().is_ascii_digit() {
                self.advance();
            }
            if self.peek() == '.' && self.peek_next().is_ascii_digit() {
                kind = NumberKind::Float;
                self.advance();
                while self.peek().is_ascii_digit() {
                    self.advance();
                }
            }
            if self.config.scientific_notation && matches!(self.peek(), 'e' | 'E') {
                let next = self.peek_next();
                let signed = matches!(next, '+' | '-') && self.peek_at(2).is_ascii_digit();
                if next.is_ascii_digit() || signed {
                    kind = NumberKind::Float;
                    self.advance(); // e
                    if signed {
                        self.advance();
                    }
                    while self.peek().is_ascii_digit() {
                        self.advance();
                    }
                }
            }
        }

        if self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.consume_word();
            let text = self.text_from(mark.start);
            self.push_error(text.clone(), format!("malformed number literal '{text}'"), mark);
            return;
        }

        let text = self.text_from(mark.start);
        self.push(TokenKind::Number(kind), text, mark);
    }

    /// Scan an identifier, keyword, boolean or null literal.
    fn scan_identifier(&mut self) {
        let mark = self.mark();
        let ident = self.read_name();

        let word = match self.config.keyword_case {
            KeywordCase::Sensitive => ident.clone(),
            KeywordCase::Insensitive => ident.to_ascii_lowercase(),
        };

        let kind = match word.as_str() {
            "true" | "false" => TokenKind::Boolean,
            "null" | "none" => TokenKind::Null,
            _ => match Keyword::lookup(&word) {
                Some(Keyword::Async) if self.next_significant() == '{' => TokenKind::AsyncBlock,
                Some(keyword) => TokenKind::Keyword(keyword),
                None => TokenKind::Identifier,
            },
        };
        self.push(kind, ident, mark);
    }

    /// `!name`: a value supplied from outside the component.
    fn scan_value_binding(&mut self) {
        let mark = self.mark();
        self.advance(); // `!`
        let name = self.read_name();
        self.push(TokenKind::ValueBinding, name, mark);
    }

    /// `@name`: a modifier such as `@async` or an event attribute `@click`.
    fn scan_at_modifier(&mut self) {
        let mark = self.mark();
        self.advance(); // `@`
        if self.peek().is_ascii_alphabetic() || self.peek() == '_' {
            let name = self.read_name();
            self.push(TokenKind::AtModifier, name, mark);
        } else {
            self.push_error("@", "expected a name after '@'", mark);
            self.recover();
        }
    }

    /// Read a name: letters, digits and `_`, plus `-` when another
    /// alphanumeric follows (`data-id`, `my-widget`).
    fn read_name(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_ascii_alphanumeric()
            || self.peek() == '_'
            || (self.peek() == '-' && self.peek_next().is_ascii_alphanumeric())
        {
            self.advance();
        }
        self.text_from(start)
    }

    // --- Comments and whitespace ---

    fn skip_line_comment(&mut self) {
        while !self.is_at_end() && self.peek() != '\n' {
            self.advance();
        }
    }

    /// `/* ... */`; an unterminated comment runs to end of input.
    fn skip_block_comment(&mut self) {
        self.advance();
        self.advance();
        while !self.is_at_end() {
            if self.peek() == '*' && self.peek_next() == '/' {
                self.advance();
                self.advance();
                return;
            }
            self.advance();
        }
    }

    fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), ' ' | '\t' | '\r' | '\n') {
            self.advance();
        }
    }

    /// The next character that is not whitespace, without consuming anything.
    fn next_significant(&self) -> char {
        self.units[self.pos..]
            .iter()
            .map(|u| u.unwrap_or(char::REPLACEMENT_CHARACTER))
            .find(|c| !c.is_whitespace())
            .unwrap_or('\0')
    }

    // --- Errors ---

    fn error_unexpected(&mut self, c: char) {
        if c.is_ascii_control() {
            self.error_unit(&format!("disallowed control character U+{:04X}", c as u32));
        } else {
            self.error_unit(&format!("unexpected character '{c}'"));
        }
    }

    /// Report the unit under the cursor, then skip ahead.
    fn error_unit(&mut self, message: &str) {
        let mark = self.mark();
        self.advance();
        let lexeme = self.text_from(mark.start);
        self.push_error(lexeme, message, mark);
        self.recover();
    }

    /// Class-based recovery: skip to the next whitespace, delimiter
    /// (`; { } < >`) or alphanumeric character.
    fn recover(&mut self) {
        let mark = self.mark();
        while !self.is_at_end() {
            match self.peek_unit() {
                Some(c)
                    if c.is_whitespace()
                        || c.is_ascii_alphanumeric()
                        || matches!(c, ';' | '{' | '}' | '<' | '>') =>
                {
                    break
                }
                _ => self.advance(),
            }
        }
        if self.pos > mark.start {
            let skipped = self.text_from(mark.start);
            self.push(TokenKind::ErrorRecovery, skipped, mark);
        }
    }

    fn push_error(&mut self, lexeme: impl Into<String>, message: impl Into<String>, mark: Span) {
        if self.halted {
            return;
        }
        let span = self.span_from(mark);
        self.tokens.push(Token::error(lexeme, message, span));
        self.errors += 1;

        if self.errors > self.config.max_errors {
            log::debug!("lexer error cap of {} exceeded", self.config.max_errors);
            let here = self.mark();
            self.tokens.push(Token::error(
                "",
                format!("too many errors ({}); lexing stopped", self.errors),
                here,
            ));
            self.halted = true;
        }
    }

    // --- Helpers ---

    fn mark(&self) -> Span {
        Span::new(self.pos, self.pos, self.line, self.column)
    }

    fn span_from(&self, mark: Span) -> Span {
        Span::new(mark.start, self.pos, mark.line, mark.column)
    }

    fn push(&mut self, kind: TokenKind, lexeme: impl Into<String>, mark: Span) {
        let span = self.span_from(mark);
        self.tokens.push(Token::new(kind, lexeme, span));
    }

    /// Consume `len` characters as a single token.
    fn punct(&mut self, kind: TokenKind, len: usize) {
        let mark = self.mark();
        for _ in 0..len {
            self.advance();
        }
        let text = self.text_from(mark.start);
        self.push(kind, text, mark);
    }

    /// One- or two-character operator, depending on the following character.
    fn operator(&mut self, second: char, long: TokenKind, short: TokenKind) {
        if self.peek_next() == second {
            self.punct(long, 2);
        } else {
            self.punct(short, 1);
        }
    }

    fn consume_word(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }
    }

    fn text_from(&self, start: usize) -> String {
        self.units[start..self.pos]
            .iter()
            .map(|u| u.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }

    fn peek_unit(&self) -> Option<char> {
        self.units.get(self.pos).copied().flatten()
    }

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn peek_next(&self) -> char {
        self.peek_at(1)
    }

    /// Character `offset` units ahead; `'\0'` past the end, U+FFFD for invalid bytes.
    fn peek_at(&self, offset: usize) -> char {
        match self.units.get(self.pos + offset) {
            Some(Some(c)) => *c,
            Some(None) => char::REPLACEMENT_CHARACTER,
            None => '\0',
        }
    }

    fn advance(&mut self) {
        if let Some(unit) = self.units.get(self.pos) {
            self.pos += 1;
            if *unit == Some('\n') {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.units.len()
    }
}
