use serde::Serialize;

/// A position in source text, tracking line and column for error reporting.
///
/// `start` and `end` index decoded source units (characters, or single
/// invalid bytes), not byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Span covering `self` through `other`, keeping the start position of `self`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end.max(self.end),
            line: self.line,
            column: self.column,
        }
    }
}

/// Whether a number literal denotes an integer or a float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NumberKind {
    Int,
    Float,
}

/// Reserved words of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Keyword {
    As,
    Async,
    Await,
    Break,
    Catch,
    Component,
    Const,
    Continue,
    Default,
    Else,
    Export,
    Finally,
    Fn,
    For,
    From,
    Function,
    If,
    Import,
    In,
    Let,
    Render,
    Return,
    Throw,
    Try,
    Var,
    While,
}

impl Keyword {
    /// Look up a keyword by its exact spelling.
    pub fn lookup(word: &str) -> Option<Keyword> {
        let keyword = match word {
            "as" => Keyword::As,
            "async" => Keyword::Async,
            "await" => Keyword::Await,
            "break" => Keyword::Break,
            "catch" => Keyword::Catch,
            "component" => Keyword::Component,
            "const" => Keyword::Const,
            "continue" => Keyword::Continue,
            "default" => Keyword::Default,
            "else" => Keyword::Else,
            "export" => Keyword::Export,
            "finally" => Keyword::Finally,
            "fn" => Keyword::Fn,
            "for" => Keyword::For,
            "from" => Keyword::From,
            "function" => Keyword::Function,
            "if" => Keyword::If,
            "import" => Keyword::Import,
            "in" => Keyword::In,
            "let" => Keyword::Let,
            "render" => Keyword::Render,
            "return" => Keyword::Return,
            "throw" => Keyword::Throw,
            "try" => Keyword::Try,
            "var" => Keyword::Var,
            "while" => Keyword::While,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::As => "as",
            Keyword::Async => "async",
            Keyword::Await => "await",
            Keyword::Break => "break",
            Keyword::Catch => "catch",
            Keyword::Component => "component",
            Keyword::Const => "const",
            Keyword::Continue => "continue",
            Keyword::Default => "default",
            Keyword::Else => "else",
            Keyword::Export => "export",
            Keyword::Finally => "finally",
            Keyword::Fn => "fn",
            Keyword::For => "for",
            Keyword::From => "from",
            Keyword::Function => "function",
            Keyword::If => "if",
            Keyword::Import => "import",
            Keyword::In => "in",
            Keyword::Let => "let",
            Keyword::Render => "render",
            Keyword::Return => "return",
            Keyword::Throw => "throw",
            Keyword::Try => "try",
            Keyword::Var => "var",
            Keyword::While => "while",
        }
    }

    /// Keywords that may begin a new declaration or statement. The parser
    /// stops discarding tokens at these when recovering from an error.
    pub fn starts_statement(self) -> bool {
        matches!(
            self,
            Keyword::Component
                | Keyword::Import
                | Keyword::Export
                | Keyword::Function
                | Keyword::Fn
                | Keyword::Async
                | Keyword::Let
                | Keyword::Const
                | Keyword::Var
                | Keyword::If
                | Keyword::While
                | Keyword::For
                | Keyword::Return
                | Keyword::Break
                | Keyword::Continue
                | Keyword::Throw
                | Keyword::Try
        )
    }
}

/// Token classification for Alterion source.
///
/// The token text lives in [`Token::lexeme`]; kinds only carry the extra
/// classification the parser needs (numeric kind, which keyword).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    // Literals
    Number(NumberKind),
    String,
    Boolean,
    Null,
    Identifier,
    Keyword(Keyword),

    // Operators
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Bang,
    Equals,
    PlusEquals,
    MinusEquals,
    StarEquals,
    SlashEquals,
    PercentEquals,
    Question,
    Pipe,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,

    // Markup
    TagOpen,      // `<name`, lexeme is the tag name
    TagEnd,       // `>` closing an opening tag
    TagSelfClose, // `/>`
    TagClose,     // `</name>`, lexeme is the tag name
    AttributeName,
    Text,
    ExpressionStart, // `{` inside markup
    ExpressionEnd,   // the matching `}`
    StyleProperty,   // raw `key: value; ...` text after `style:`

    // Special forms
    AtModifier,   // `@name`, lexeme is the name
    ValueBinding, // `!name`, lexeme is the name
    AsyncBlock,   // `async` directly introducing a `{` block

    // Terminal
    Error,
    ErrorRecovery,
    Eof,
}

impl TokenKind {
    /// Tokens after which a `<` reads as "less than" rather than a tag opener.
    pub fn ends_operand(self) -> bool {
        matches!(
            self,
            TokenKind::Number(_)
                | TokenKind::String
                | TokenKind::Boolean
                | TokenKind::Null
                | TokenKind::Identifier
                | TokenKind::ValueBinding
                | TokenKind::RParen
                | TokenKind::RBracket
        )
    }

    pub fn is_error(self) -> bool {
        matches!(self, TokenKind::Error | TokenKind::ErrorRecovery)
    }
}

/// A token produced by the Alterion lexer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
            error: None,
        }
    }

    /// An `Error` token carrying a message.
    pub fn error(lexeme: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: TokenKind::Error,
            lexeme: lexeme.into(),
            span,
            error: Some(message.into()),
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }
}
