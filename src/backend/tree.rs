//! The mid-level IR: a typed, scoped tree with the same statement shape as
//! the source, but with resolved global symbol names, explicit casts,
//! explicit address-of/deref, address computations for indexing and pointer
//! arithmetic, and block labels reconstructed from scope ordinals. Each top
//! level declaration is lowered to one [`Root`] which the linearizer
//! consumes; nothing in here outlives a compilation.

use crate::backend::ty::Type;

/// A resolved symbol reference. Globals print as `@"name"`, everything else
/// as `%"name"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Global(String),
    Local(String),
}

impl core::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Global(name) => write!(f, "@\"{name}\""),
            Symbol::Local(name) => write!(f, "%\"{name}\""),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    /// An inline string constant; materialized on the stack at use sites
    Str(String),
    /// A reference to a named private string global of `len` bytes
    GlobalStr { name: String, len: usize },
}

/// A typed mid-IR expression. `ty` is always the type of the *result*.
#[derive(Debug)]
pub struct Expr {
    pub ty: Type,
    pub kind: ExprKind,
}

#[derive(Debug)]
pub enum ExprKind {
    /// A resolved variable or function reference
    Identifier(Symbol),
    /// The raw incoming value of a function parameter, read once in the
    /// prologue to initialize the parameter's stack slot
    ParamIdentifier(String),
    Literal(Literal),
    /// Built field-by-field from `undef`; also covers named struct
    /// construction (the result type is then the alias)
    StructLiteral(Vec<Expr>),
    /// Array value with explicit elements
    ArrayElems(Vec<Expr>),
    /// Zero-initialized aggregate of the carried type
    ArrayInit,
    /// Scalar store to a named stack slot or global
    Assignment { target: Symbol, value: Box<Expr> },
    /// Store through a computed pointer
    Write { ptr: Box<Expr>, value: Box<Expr> },
    FunctionCall {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary { op: UnOp, operand: Box<Expr> },
    /// The result type is the cast target
    Cast { op: CastKind, operand: Box<Expr> },
    /// Destructuring update: evaluate `base` once, then run the per-field
    /// expressions, which refer back to it through [`ExprKind::Temporary`]
    StructAssign { base: Box<Expr>, fields: Vec<Expr> },
    /// Field extraction by position
    StructAccess { base: Box<Expr>, index: usize },
    /// Address computation through an aggregate or pointer
    GetElemPtr {
        pointee: Type,
        base: Box<Expr>,
        indices: Vec<Expr>,
    },
    /// The scratch struct value installed by an enclosing `StructAssign`
    Temporary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Lt,
    Gt,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
    Deref,
    AddressOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    IntToFloat,
    FloatToInt,
    BitCast,
    PtrToInt,
    IntToPtr,
    Trunc,
    Ext,
}

#[derive(Debug)]
pub enum Stmt {
    Empty,
    /// Stack slot declaration: alloca + initializing store
    Decl { ty: Type, name: String, value: Expr },
    Expr(Expr),
    Block { label: String, body: Vec<Stmt> },
    IfElse {
        then_label: String,
        else_label: String,
        condition: Expr,
        positive: Vec<Stmt>,
        negative: Vec<Stmt>,
    },
    While {
        label: String,
        condition: Expr,
        body: Vec<Stmt>,
    },
    For {
        label: String,
        init: Box<Stmt>,
        condition: Expr,
        increment: Expr,
        body: Vec<Stmt>,
    },
    Continue,
    Break,
    Return(Option<Expr>),
}

#[derive(Debug)]
pub enum Root {
    StaticDecl {
        ty: Type,
        public: bool,
        name: String,
        value: Literal,
    },
    FuncDecl {
        return_type: Type,
        public: bool,
        name: String,
        params: Vec<(Type, String)>,
        body: Vec<Stmt>,
    },
    FuncFwdDecl {
        return_type: Type,
        name: String,
        params: Vec<Type>,
        is_extern: bool,
    },
    TypeDef { name: String, ty: Type },
}
