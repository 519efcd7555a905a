//! Errors produced by the backend passes. Every pass returns a `Result` and
//! aborts on the first error; no recovery or multi-error reporting is
//! attempted, so the emitter is never reached for an invalid module.

use crate::middle::ty::SourceType;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /* Resolution */
    #[error("undefined identifier `{0}`")]
    UndefinedIdentifier(String),
    #[error("unknown type name `{0}`")]
    UndefinedType(String),
    #[error("expected a value, but `{0}` names a type")]
    ExpectedValue(String),
    #[error("expected a type, but `{0}` names a value")]
    ExpectedType(String),

    /* Duplication */
    #[error("symbol `{0}` is already defined")]
    DuplicateSymbol(String),
    #[error("duplicate parameter `{0}`")]
    DuplicateParameter(String),

    /* Typing */
    #[error("mismatched types: expected {expected}, found {found}")]
    TypeMismatch {
        expected: SourceType,
        found: SourceType,
    },
    #[error("operator `{operator}` cannot be applied to type {ty}")]
    InvalidOperand { operator: String, ty: SourceType },
    #[error("non-trivial cast from {from} to {to}")]
    InvalidCast { from: SourceType, to: SourceType },
    #[error("condition must be bool, found {0}")]
    NonBooleanCondition(SourceType),
    #[error("type {0} is not callable")]
    NotAFunction(SourceType),
    #[error("expected {expected} argument(s) to this call, found {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("cannot assign to immutable binding `{0}`")]
    AssignToImmutable(String),
    #[error("cannot infer type of {0}")]
    CannotInfer(&'static str),

    /* Structural */
    #[error("invalid left-hand side of assignment")]
    InvalidLValue,
    #[error("member access on non-struct type {0}")]
    MemberAccessOnNonStruct(SourceType),
    #[error("named field access on unlabeled struct type {0}")]
    FieldNameOnUnlabeledStruct(SourceType),
    #[error("no field `{field}` on type {ty}")]
    UnknownField { field: String, ty: SourceType },
    #[error("cannot index non-array type {0}")]
    IndexOfNonArray(SourceType),
    #[error("no block scope `{0}` where one is required")]
    NotABlock(String),
    #[error("cannot take the address of a temporary value")]
    AddressOfTemporary,

    /* Control */
    #[error("`break` outside of a loop")]
    BreakOutsideLoop,
    #[error("`continue` outside of a loop")]
    ContinueOutsideLoop,

    /* Forward declarations */
    #[error("definition of `{0}` does not match its forward declaration")]
    ForwardDeclMismatch(String),

    /* Unsupported */
    #[error("unsupported in the backend: {0}")]
    Unsupported(&'static str),
}
