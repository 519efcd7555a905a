//! Semantic analysis. Names are resolved against a tree of nested scopes,
//! every expression is assigned a source type, and ill-typed programs are
//! rejected before any lowering happens.

pub mod primitive;
pub mod symtab;
pub mod ty;
pub mod type_check;
