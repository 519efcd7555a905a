//! The backend of the Rill compiler. Takes the typed, scope-resolved parse
//! tree produced by the upstream parser and template-instantiation passes
//! and emits a textual SSA module suitable for a conventional
//! optimizer/linker.
//!
//! The pipeline is two passes plus serialisation:
//!
//! 1. Semantic analysis builds a tree of nested scopes, resolves every
//!    identifier, and type checks the whole module (`middle`).
//! 2. Lowering rewrites the checked tree into a typed mid-level IR and
//!    flattens that into linear SSA instructions (`backend`).
//!
//! The output is deterministic: for a given input tree, temporaries, label
//! names and declaration order are byte-identical across runs.

pub mod ast;
pub mod backend;
pub mod error;
pub mod index;
pub mod middle;

pub use error::CompileError;

/// Runs the full pipeline over one module and returns the serialised target
/// IR. Aborts on the first error.
pub fn compile_module(module: &ast::Module) -> Result<String, CompileError> {
    let symtab = middle::type_check::construct_symtab(module)?;
    let roots = backend::tree_build::construct_ir_tree(module, &symtab)?;
    let ssa = backend::linearize::linearize_module(&roots)?;

    Ok(backend::emit::emit_module(&ssa))
}
