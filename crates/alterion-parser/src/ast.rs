//! Abstract Syntax Tree for Alterion.
//!
//! A strictly owned tree: every node owns its children and nothing points
//! back up. Expressions carry a [`NodeId`] so later stages can attach
//! information (inferred types) in side tables instead of mutating nodes.

use alterion_lexer::{NumberKind, Span};
use std::fmt;

/// Identity of an expression node, unique within one parsed unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// Root of one compilation unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub imports: Vec<Import>,
    pub exports: Vec<Export>,
    pub functions: Vec<Function>,
    pub components: Vec<Component>,
    /// Top-level statements, including `Error` placeholders.
    pub statements: Vec<Stmt>,
}

/// `import { a, b } from "mod"` or `import name from "mod"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub names: Vec<String>,
    pub default: Option<String>,
    pub source: String,
    pub span: Span,
}

/// `export [default] <declaration>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub is_default: bool,
    pub item: ExportItem,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportItem {
    Function(Function),
    Component(Component),
    Statement(Stmt),
}

/// `function name(params): Type { ... }`, also used for component methods.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: Block,
    pub is_async: bool,
    /// `@modifier` names preceding the declaration, without the `@`.
    pub modifiers: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub span: Span,
}

/// `component Name { state, methods, render: markup }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    pub modifiers: Vec<String>,
    /// State initializers (`count = 0`), methods and other statements, in order.
    pub statements: Vec<Stmt>,
    /// Markup from `render:` / `render { ... }` sections.
    pub body: Vec<Markup>,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expression(Expr),
    Block(Block),
    Variable(VariableDecl),
    Assignment {
        target: Expr,
        op: AssignOp,
        value: Expr,
    },
    If {
        test: Expr,
        consequent: Block,
        /// Either another `If` (for `else if`) or a `Block`.
        alternate: Option<Box<Stmt>>,
    },
    While {
        test: Expr,
        body: Block,
    },
    For {
        init: Option<Box<Stmt>>,
        test: Option<Expr>,
        update: Option<Box<Stmt>>,
        body: Block,
    },
    ForIn {
        variable: String,
        iterable: Expr,
        body: Block,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Try {
        block: Block,
        catch: Option<CatchClause>,
        finally: Option<Block>,
    },
    Throw(Expr),
    /// `async { [ ... ] [ catch (e) { ... } ] [ finally { ... } ] }`
    Async {
        block: Block,
        catch: Option<CatchClause>,
        finally: Option<Block>,
    },
    Function(Function),
    Import(Import),
    Export(Box<Export>),
    /// Placeholder for a statement that failed to parse.
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Let,
    Const,
    Var,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub kind: VarKind,
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: Option<String>,
    pub body: Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl AssignOp {
    /// The arithmetic operator a compound assignment applies.
    pub fn binary(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
            AssignOp::Mod => Some(BinaryOp::Mod),
        }
    }
}

impl Stmt {
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            StmtKind::Expression(_) => "ExpressionStatement",
            StmtKind::Block(_) => "BlockStatement",
            StmtKind::Variable(_) => "VariableDeclaration",
            StmtKind::Assignment { .. } => "Assignment",
            StmtKind::If { .. } => "IfStatement",
            StmtKind::While { .. } => "WhileStatement",
            StmtKind::For { .. } => "ForStatement",
            StmtKind::ForIn { .. } => "ForInStatement",
            StmtKind::Return(_) => "ReturnStatement",
            StmtKind::Break => "BreakStatement",
            StmtKind::Continue => "ContinueStatement",
            StmtKind::Try { .. } => "TryStatement",
            StmtKind::Throw(_) => "ThrowStatement",
            StmtKind::Async { .. } => "AsyncBlock",
            StmtKind::Function(_) => "FunctionDeclaration",
            StmtKind::Import(_) => "ImportDeclaration",
            StmtKind::Export(_) => "ExportDeclaration",
            StmtKind::Error(_) => "Error",
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    /// A name resolved in scope: component state, a local, a function.
    Identifier(String),
    /// `!name`: a value supplied from outside the component.
    ValueBinding(String),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Await(Box<Expr>),
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Array(Vec<Expr>),
    Object(Vec<ObjectProperty>),
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    /// Markup used as a value (`return <div/>`).
    Tag(Box<Tag>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Source text is kept as written; `kind` records the lexer's classification.
    Number { raw: String, kind: NumberKind },
    String(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectProperty {
    pub key: PropertyKey,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    /// `name: value` or `"name": value`
    Named(String),
    /// `[expr]: value`
    Computed(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Pow
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
        })
    }
}

impl Expr {
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Literal(_) => "Literal",
            ExprKind::Identifier(_) => "Identifier",
            ExprKind::ValueBinding(_) => "ValueBinding",
            ExprKind::Binary { .. } => "BinaryExpression",
            ExprKind::Unary { .. } => "UnaryExpression",
            ExprKind::Await(_) => "AwaitExpression",
            ExprKind::Call { .. } => "CallExpression",
            ExprKind::Member { .. } => "MemberExpression",
            ExprKind::Index { .. } => "IndexExpression",
            ExprKind::Array(_) => "ArrayLiteral",
            ExprKind::Object(_) => "ObjectLiteral",
            ExprKind::Conditional { .. } => "ConditionalExpression",
            ExprKind::Tag(_) => "Tag",
        }
    }

    /// Whether the expression can appear on the left of `=`.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Identifier(_) | ExprKind::Member { .. } | ExprKind::Index { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Markup
// ---------------------------------------------------------------------------

/// A child of a tag or of a component's render body.
#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    Tag(Tag),
    Text(Text),
    /// `{expr}` embedded in markup.
    Expr(Expr),
}

impl Markup {
    pub fn span(&self) -> Span {
        match self {
            Markup::Tag(tag) => tag.span,
            Markup::Text(text) => text.span,
            Markup::Expr(expr) => expr.span,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Markup::Tag(_) => "Tag",
            Markup::Text(_) => "TextContent",
            Markup::Expr(_) => "EmbeddedExpression",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub attributes: Vec<Attribute>,
    /// Declarations from the `style:` shorthand.
    pub styles: Vec<StyleDecl>,
    pub children: Vec<Markup>,
    pub self_closing: bool,
    pub span: Span,
}

impl Tag {
    /// Capitalized tag names refer to components.
    pub fn is_component(&self) -> bool {
        self.name.starts_with(|c: char| c.is_ascii_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub content: String,
    pub span: Span,
}

/// `name`, `name="value"`, `name={expr}` or `@event={handler}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    /// `None` for boolean attributes (`<input disabled>`).
    pub value: Option<Expr>,
    /// Written with `@` (an event handler).
    pub event: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleDecl {
    pub property: String,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Type annotations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    Named(String),
    /// `Array<T>` or `T[]`
    Array(Box<TypeExpr>),
    /// `T?`
    Optional(Box<TypeExpr>),
    /// `A | B`
    Union(Vec<TypeExpr>),
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeExprKind::Named(name) => f.write_str(name),
            TypeExprKind::Array(inner) => write!(f, "Array<{inner}>"),
            TypeExprKind::Optional(inner) => write!(f, "{inner}?"),
            TypeExprKind::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_type_expr_display() {
        let span = Span::default();
        let named = |name: &str| TypeExpr {
            kind: TypeExprKind::Named(name.into()),
            span,
        };
        let ty = TypeExpr {
            kind: TypeExprKind::Union(vec![
                TypeExpr {
                    kind: TypeExprKind::Array(Box::new(named("Int"))),
                    span,
                },
                TypeExpr {
                    kind: TypeExprKind::Optional(Box::new(named("String"))),
                    span,
                },
            ]),
            span,
        };
        assert_eq!(ty.to_string(), "Array<Int> | String?");
    }

    #[test]
    fn test_component_tag_names() {
        let tag = |name: &str| Tag {
            name: name.into(),
            attributes: vec![],
            styles: vec![],
            children: vec![],
            self_closing: true,
            span: Span::default(),
        };
        assert!(tag("Counter").is_component());
        assert!(!tag("div").is_component());
    }
}
