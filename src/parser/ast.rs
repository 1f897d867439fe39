use crate::span::Spanned;

/// Dense per-file expression index. Type information is keyed by it.
pub type ExprId = u32;

#[derive(Debug, Clone)]
pub struct File {
    pub package: Spanned<String>,
    pub imports: Vec<Spanned<ImportSpec>>,
    pub decls: Vec<Decl>,
    /// Number of `ExprId`s handed out while parsing this file.
    pub expr_count: u32,
}

#[derive(Debug, Clone)]
pub struct ImportSpec {
    pub alias: Option<Spanned<String>>,
    pub path: Spanned<String>,
}

#[derive(Debug, Clone)]
pub enum Decl {
    Type(Spanned<TypeSpec>),
    Func(Spanned<FuncDecl>),
    Var(Spanned<ValueSpec>),
    Const(Spanned<ValueSpec>),
}

#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub name: Spanned<String>,
    /// `type A = B`
    pub alias: bool,
    pub ty: Spanned<TypeExpr>,
}

#[derive(Debug, Clone)]
pub struct ValueSpec {
    pub names: Vec<Spanned<String>>,
    pub ty: Option<Spanned<TypeExpr>>,
    pub values: Vec<Spanned<Expr>>,
    /// Position inside a const group, the value of `iota`.
    pub iota: usize,
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub recv: Option<Receiver>,
    pub name: Spanned<String>,
    pub sig: Signature,
    pub body: Option<Spanned<Block>>,
}

#[derive(Debug, Clone)]
pub struct Receiver {
    pub name: Option<Spanned<String>>,
    pub pointer: bool,
    pub base: Spanned<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Signature {
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    pub variadic: bool,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Option<Spanned<String>>,
    pub ty: Spanned<TypeExpr>,
}

#[derive(Debug, Clone)]
pub enum TypeExpr {
    Name(String),
    Qualified { pkg: Spanned<String>, name: Spanned<String> },
    Pointer(Box<Spanned<TypeExpr>>),
    Slice(Box<Spanned<TypeExpr>>),
    /// `[N]T`; `len` is `None` for `[...]T` in composite literals.
    Array { len: Option<Box<Spanned<Expr>>>, elem: Box<Spanned<TypeExpr>> },
    Map { key: Box<Spanned<TypeExpr>>, value: Box<Spanned<TypeExpr>> },
    Func(Box<Signature>),
    Struct(Vec<FieldDecl>),
    Interface(Vec<InterfaceElem>),
}

impl TypeExpr {
    /// Implicit field name for an embedded field of this type (`*pkg.T` => `T`).
    pub fn embedded_name(&self) -> Option<&str> {
        match self {
            TypeExpr::Name(n) => Some(n),
            TypeExpr::Qualified { name, .. } => Some(&name.node),
            TypeExpr::Pointer(inner) => match &inner.node {
                TypeExpr::Name(n) => Some(n),
                TypeExpr::Qualified { name, .. } => Some(&name.node),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// Empty for an embedded field.
    pub names: Vec<Spanned<String>>,
    pub ty: Spanned<TypeExpr>,
    pub tag: Option<String>,
}

impl FieldDecl {
    pub fn is_embedded(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum InterfaceElem {
    Method { name: Spanned<String>, sig: Signature },
    Embed(Spanned<TypeExpr>),
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Break,
    Continue,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Block(Spanned<Block>),
    /// One `var`/`const`/`type` declaration, possibly grouped.
    Decl(Vec<Decl>),
    ShortVarDecl {
        names: Vec<Spanned<String>>,
        values: Vec<Spanned<Expr>>,
    },
    Assign {
        lhs: Vec<Spanned<Expr>>,
        /// `None` for plain `=`.
        op: Option<BinOp>,
        rhs: Vec<Spanned<Expr>>,
    },
    IncDec {
        target: Spanned<Expr>,
        inc: bool,
    },
    Expr(Spanned<Expr>),
    Return(Vec<Spanned<Expr>>),
    If {
        init: Option<Box<Spanned<Stmt>>>,
        cond: Spanned<Expr>,
        then_block: Spanned<Block>,
        /// Either another `If` or a `Block`.
        else_branch: Option<Box<Spanned<Stmt>>>,
    },
    For {
        init: Option<Box<Spanned<Stmt>>>,
        cond: Option<Spanned<Expr>>,
        post: Option<Box<Spanned<Stmt>>>,
        body: Spanned<Block>,
    },
    ForRange {
        key: Option<Spanned<Expr>>,
        value: Option<Spanned<Expr>>,
        /// `:=` rather than `=`.
        define: bool,
        iterable: Spanned<Expr>,
        body: Spanned<Block>,
    },
    Switch {
        init: Option<Box<Spanned<Stmt>>>,
        tag: Option<Spanned<Expr>>,
        cases: Vec<Spanned<CaseClause>>,
    },
    Branch(BranchKind),
    Go(Spanned<Expr>),
    Defer(Spanned<Expr>),
    Empty,
}

#[derive(Debug, Clone)]
pub struct CaseClause {
    /// Empty for `default:`.
    pub exprs: Vec<Spanned<Expr>>,
    pub is_default: bool,
    pub body: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Ident(String),
    IntLit(String),
    FloatLit(String),
    RuneLit(String),
    /// Unquoted value.
    StringLit(String),
    CompositeLit {
        /// `None` when the type is elided inside an enclosing literal.
        ty: Option<Box<Spanned<Expr>>>,
        elements: Vec<Element>,
    },
    FuncLit {
        sig: Signature,
        body: Spanned<Block>,
    },
    Paren(Box<Spanned<Expr>>),
    Selector {
        object: Box<Spanned<Expr>>,
        field: Spanned<String>,
    },
    Index {
        object: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },
    Slice {
        object: Box<Spanned<Expr>>,
        low: Option<Box<Spanned<Expr>>>,
        high: Option<Box<Spanned<Expr>>>,
        max: Option<Box<Spanned<Expr>>>,
    },
    TypeAssert {
        object: Box<Spanned<Expr>>,
        ty: Spanned<TypeExpr>,
    },
    Call {
        func: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
        /// `f(xs...)`
        spread: bool,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Spanned<Expr>>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    /// A type literal in expression position: `[]byte(s)`, `map[K]V{}`.
    Type(Spanned<TypeExpr>),
}

#[derive(Debug, Clone)]
pub struct Element {
    pub key: Option<Spanned<Expr>>,
    pub value: Spanned<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    Addr,
    Deref,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    AndNot,
    Shl,
    Shr,
    Eq,
    Neq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinOp::Shl | BinOp::Shr)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

/// Strip any number of enclosing parentheses.
pub fn unparen(mut e: &Spanned<Expr>) -> &Spanned<Expr> {
    while let ExprKind::Paren(inner) = &e.node.kind {
        e = inner;
    }
    e
}

impl Spanned<Expr> {
    pub fn id(&self) -> ExprId {
        self.node.id
    }

    pub fn ident_name(&self) -> Option<&str> {
        match &self.node.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}
