//! The scope tree. Each scope maps names to bindings, where a binding is
//! either a type or a value (mutability × type × optional nested scope).
//! Scopes nest following the source program's block structure and are keyed
//! by source name for functions and by the decimal ordinal of the block
//! statement within its parent otherwise. The ordinal keys are a contract
//! with the mid-IR builder, which re-walks statements with the same counter
//! to reconstruct scope paths and label names.

use std::collections::BTreeMap;

use crate::{
    ast::Mutability,
    error::CompileError,
    index::{simple_index, IndexVec},
    middle::ty::SourceType,
};

simple_index! {
    /// Identifies a scope in a [`ScopeTree`]
    pub struct ScopeId;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Type(SourceType),
    Value(ValueBinding),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueBinding {
    pub mutability: Mutability,
    pub ty: SourceType,
    /// Present for function definitions (the parameter/body scope) and
    /// absent for forward declarations, locals and statics
    pub inner: Option<ScopeId>,
}

#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    /// The key this scope is registered under in its parent: a function
    /// name, or the decimal ordinal of the block statement. Empty for the
    /// root scope.
    pub key: String,
    bindings: BTreeMap<String, Binding>,
    children: BTreeMap<String, ScopeId>,
}

#[derive(Debug)]
pub struct ScopeTree {
    scopes: IndexVec<ScopeId, Scope>,
    root: ScopeId,
}

impl ScopeTree {
    pub fn new() -> Self {
        let mut scopes = IndexVec::new();
        let root = scopes.push(Scope {
            parent: None,
            key: String::new(),
            bindings: BTreeMap::new(),
            children: BTreeMap::new(),
        });

        Self { scopes, root }
    }

    pub fn root(&self) -> ScopeId {
        self.root
    }

    /// Creates a scope nested in `parent` and registers it under `key`
    pub fn new_scope(&mut self, parent: ScopeId, key: &str) -> ScopeId {
        let id = self.scopes.push(Scope {
            parent: Some(parent),
            key: key.to_owned(),
            bindings: BTreeMap::new(),
            children: BTreeMap::new(),
        });

        self.scopes[parent].children.insert(key.to_owned(), id);
        id
    }

    /// Adds a binding, rejecting redefinitions within the same scope
    pub fn bind(
        &mut self,
        scope: ScopeId,
        name: &str,
        binding: Binding,
    ) -> Result<(), CompileError> {
        let bindings = &mut self.scopes[scope].bindings;

        if bindings.contains_key(name) {
            return Err(CompileError::DuplicateSymbol(name.to_owned()));
        }

        bindings.insert(name.to_owned(), binding);
        Ok(())
    }

    /// Replaces an existing binding. Used to close forward declarations;
    /// callers must have verified compatibility first.
    pub fn rebind(&mut self, scope: ScopeId, name: &str, binding: Binding) {
        self.scopes[scope].bindings.insert(name.to_owned(), binding);
    }

    /// Looks for a binding only within `scope` itself
    pub fn binding(&self, scope: ScopeId, name: &str) -> Option<&Binding> {
        self.scopes[scope].bindings.get(name)
    }

    /// Resolves a name through the scope stack, innermost first. Returns the
    /// scope the binding was found in so callers can reconstruct its path.
    pub fn lookup(&self, from: ScopeId, name: &str) -> Option<(ScopeId, &Binding)> {
        let mut current = Some(from);

        while let Some(id) = current {
            let scope = &self.scopes[id];
            if let Some(binding) = scope.bindings.get(name) {
                return Some((id, binding));
            }
            current = scope.parent;
        }

        None
    }

    pub fn child(&self, scope: ScopeId, key: &str) -> Option<ScopeId> {
        self.scopes[scope].children.get(key).copied()
    }

    /// The dot-joined key path of a scope from the root, e.g. `f.0.1` for
    /// the second nested block of the first block of function `f`. Empty for
    /// the root scope.
    pub fn path(&self, scope: ScopeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(scope);

        while let Some(id) = current {
            let scope = &self.scopes[id];
            if scope.parent.is_some() {
                segments.push(scope.key.as_str());
            }
            current = scope.parent;
        }

        segments.reverse();
        segments.join(".")
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middle::primitive::IntWidth;

    #[test]
    fn lookup_walks_outward() {
        let mut tree = ScopeTree::new();
        let f = tree.new_scope(tree.root(), "f");
        let b0 = tree.new_scope(f, "0");

        tree.bind(
            f,
            "x",
            Binding::Value(ValueBinding {
                mutability: Mutability::Var,
                ty: SourceType::Int(IntWidth::I32),
                inner: None,
            }),
        )
        .unwrap();

        let (found_in, _) = tree.lookup(b0, "x").unwrap();
        assert_eq!(found_in, f);
        assert!(tree.lookup(b0, "y").is_none());
    }

    #[test]
    fn paths_follow_block_ordinals() {
        let mut tree = ScopeTree::new();
        let f = tree.new_scope(tree.root(), "f");
        let b0 = tree.new_scope(f, "0");
        let b0_1 = tree.new_scope(b0, "1");

        assert_eq!(tree.path(f), "f");
        assert_eq!(tree.path(b0_1), "f.0.1");
        assert_eq!(tree.child(b0, "1"), Some(b0_1));
    }

    #[test]
    fn duplicate_binding_is_rejected() {
        let mut tree = ScopeTree::new();
        let f = tree.new_scope(tree.root(), "f");

        let binding = Binding::Value(ValueBinding {
            mutability: Mutability::Val,
            ty: SourceType::Bool,
            inner: None,
        });

        tree.bind(f, "x", binding.clone()).unwrap();
        assert_eq!(
            tree.bind(f, "x", binding),
            Err(CompileError::DuplicateSymbol("x".to_owned()))
        );
    }
}
