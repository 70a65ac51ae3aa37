//! Abstract syntax tree for the Kotlin subset the migration reads
//!
//! Every node keeps a byte [`Span`] into the original source so passes can
//! plan text edits without re-rendering the file. Constructs the migration
//! has no interest in are carried as opaque spans instead of failing the
//! parse.

use crate::edit::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct KotlinFile {
    pub package_name: Option<String>,
    pub imports: Vec<Import>,
    /// Offset where appended imports land: just past the newline of the
    /// last import (or of the package line when there are no imports)
    pub import_insert_offset: usize,
    pub classes: Vec<KotlinClass>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub path: String,
    /// Covers the whole directive line including the trailing newline
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KotlinClass {
    pub name: String,
    pub super_entries: Vec<SuperTypeEntry>,
    pub body: Option<ClassBody>,
    pub span: Span,
    /// object / companion object / interface declarations share the shape
    /// but are never migrated directly
    pub is_class: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuperTypeEntry {
    pub text: String,
    pub span: Span,
}

impl SuperTypeEntry {
    /// `BaseHolder<Foo>(bar)` -> `BaseHolder`
    pub fn base_name(&self) -> &str {
        let end = self
            .text
            .find(|c| c == '<' || c == '(' || c == ' ')
            .unwrap_or(self.text.len());
        &self.text[..end]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassBody {
    pub l_brace: usize,
    pub r_brace: usize,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Property(Property),
    Function(Function),
    Init(InitBlock),
    Class(KotlinClass),
    Other(Span),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub initializer: Option<Expr>,
    pub delegate: Option<Expr>,
    /// get()/set() accessor bodies following the declaration
    pub accessors: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub type_text: String,
    pub type_span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    /// Extension receiver type, e.g. `GroupieViewHolder` in
    /// `fun GroupieViewHolder.bind()`
    pub receiver: Option<(String, Span)>,
    pub params: Vec<Param>,
    pub body: Option<Block>,
    /// `= expr` single-expression body
    pub expr_body: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitBlock {
    pub block: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub l_brace: usize,
    pub r_brace: usize,
    pub statements: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhenEntry {
    pub conditions: Vec<Expr>,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name {
        text: String,
        span: Span,
    },
    Literal {
        span: Span,
    },
    /// `a.b` / `a?.b`
    Qualified {
        receiver: Box<Expr>,
        selector: Box<Expr>,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        lambda: Option<Block>,
        span: Span,
    },
    Index {
        receiver: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Lambda {
        block: Block,
        span: Span,
    },
    /// Any binary operation including assignment, elvis, `is`, `as`
    Binary {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
    Unary {
        operand: Box<Expr>,
        span: Span,
    },
    StringTemplate {
        entries: Vec<Expr>,
        span: Span,
    },
    Paren {
        inner: Box<Expr>,
        span: Span,
    },
    BlockExpr(Block),
    If {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
        span: Span,
    },
    When {
        subject: Option<Box<Expr>>,
        entries: Vec<WhenEntry>,
        span: Span,
    },
    For {
        iterable: Box<Expr>,
        body: Box<Expr>,
        span: Span,
    },
    While {
        condition: Box<Expr>,
        body: Box<Expr>,
        span: Span,
    },
    DoWhile {
        body: Box<Expr>,
        condition: Box<Expr>,
        span: Span,
    },
    Try {
        body: Block,
        catches: Vec<Block>,
        finally: Option<Block>,
        span: Span,
    },
    /// `return x` / `throw x` / `break` / `continue`
    Jump {
        value: Option<Box<Expr>>,
        span: Span,
    },
    /// `val x = ...` / `var x by ...` inside a block
    LocalProperty {
        name: String,
        initializer: Option<Box<Expr>>,
        delegate: Option<Box<Expr>>,
        span: Span,
    },
    LocalFunction(Box<Function>),
    /// Anything the grammar does not model, consumed without recursion
    Opaque {
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Name { span, .. }
            | Expr::Literal { span }
            | Expr::Qualified { span, .. }
            | Expr::Call { span, .. }
            | Expr::Index { span, .. }
            | Expr::Lambda { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::StringTemplate { span, .. }
            | Expr::Paren { span, .. }
            | Expr::If { span, .. }
            | Expr::When { span, .. }
            | Expr::For { span, .. }
            | Expr::While { span, .. }
            | Expr::DoWhile { span, .. }
            | Expr::Try { span, .. }
            | Expr::Jump { span, .. }
            | Expr::LocalProperty { span, .. }
            | Expr::Opaque { span } => *span,
            Expr::BlockExpr(block) => Span::new(block.l_brace, block.r_brace + 1),
            Expr::LocalFunction(function) => function.span,
        }
    }
}
