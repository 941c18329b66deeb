//! The type registry.
//!
//! A two-way associative store from node identity to inferred type, with
//! per-expression capability bits (l-value, compile-time constant), a
//! canonical-type intern table, and the substitution accumulated across all
//! unifications of one checker run. The registry is owned by the caller and
//! rebuilt per top-level invocation; the traversal is its only mutator
//! while running.

use rustc_hash::{FxHashMap, FxHashSet};
use weft_ast::ast::NodeId;

use crate::subst::Substitution;
use crate::ty::Type;

#[derive(Debug, Default)]
pub struct TypeMap {
    types: FxHashMap<NodeId, Type>,
    left_values: FxHashSet<NodeId>,
    constants: FxHashSet<NodeId>,
    canonical: FxHashSet<Type>,
    substitution: Substitution,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The type previously recorded for a node, if any. Callers decide
    /// whether a missing entry is an error.
    pub fn get_type(&self, node: NodeId) -> Option<&Type> {
        self.types.get(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.types.contains_key(&node)
    }

    /// Record a node's type. Recording the same node twice is allowed only
    /// with an equivalent type; two distinct types for one node is a bug in
    /// the caller.
    pub fn set_type(&mut self, node: NodeId, ty: Type) {
        if let Some(existing) = self.types.get(&node) {
            assert!(
                Self::equivalent(existing, &ty),
                "node {node} already has type {existing}, cannot record {ty}"
            );
        }
        self.types.insert(node, ty);
    }

    pub fn is_left_value(&self, expr: NodeId) -> bool {
        self.left_values.contains(&expr)
    }

    pub fn set_left_value(&mut self, expr: NodeId) {
        self.left_values.insert(expr);
    }

    pub fn is_compile_time_constant(&self, expr: NodeId) -> bool {
        self.constants.contains(&expr)
    }

    pub fn set_compile_time_constant(&mut self, expr: NodeId) {
        self.constants.insert(expr);
    }

    /// Copy a node's type and capability bits onto another node.
    pub fn copy_entry(&mut self, from: NodeId, to: NodeId) {
        if let Some(ty) = self.types.get(&from).cloned() {
            self.types.insert(to, ty);
        }
        if self.left_values.contains(&from) {
            self.left_values.insert(to);
        }
        if self.constants.contains(&from) {
            self.constants.insert(to);
        }
    }

    /// Intern a type: returns the previously stored structurally-equal
    /// representative, or stores and returns the argument.
    pub fn get_canonical(&mut self, ty: Type) -> Type {
        match self.canonical.get(&ty) {
            Some(existing) => existing.clone(),
            None => {
                self.canonical.insert(ty.clone());
                ty
            }
        }
    }

    /// Structural equivalence. `Type`'s equality implements the relation:
    /// compound types compare by structure, nominal types by declaration
    /// identity.
    pub fn equivalent(a: &Type, b: &Type) -> bool {
        a == b
    }

    /// Merge a solved substitution into the accumulated one. Conflicting
    /// bindings are a bug in the unifier.
    pub fn add_substitutions(&mut self, tvs: &Substitution) {
        let ok = self.substitution.merge(tvs);
        assert!(ok, "conflicting type-variable bindings reached the registry");
    }

    /// The substitution accumulated over this run.
    pub fn substitution(&self) -> &Substitution {
        &self.substitution
    }

    /// Drop entries for nodes that no longer appear under the traversal
    /// root. Invoked once at the end of a run with the set of live ids.
    pub fn update_map(&mut self, live: &FxHashSet<NodeId>) {
        self.types.retain(|id, _| live.contains(id));
        self.left_values.retain(|id| live.contains(id));
        self.constants.retain(|id| live.contains(id));
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
