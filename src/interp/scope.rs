//! Lexical environment chain.
//!
//! Scopes live in an arena and are referenced by index, so `Function` values
//! can hold a non-owning reference to their defining scope. The active chain
//! is whatever hangs off the traverser's current scope via parent links; the
//! global scope (id 0) persists for the whole file and is handed back to the
//! caller as the final context.

use std::collections::BTreeMap;

use crate::interp::value::JsValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

/// How a name entered its scope. `var` redeclaration overwrites silently;
/// shadowing a protected global is the traverser's business, not ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Lexical,
    Function,
    Param,
    /// Created by assignment to a name no scope declares.
    Implicit,
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub value: JsValue,
    pub decl: DeclKind,
}

#[derive(Debug, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    bindings: BTreeMap<String, Binding>,
}

#[derive(Debug)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

pub const GLOBAL_SCOPE: ScopeId = ScopeId(0);

impl ScopeArena {
    /// Arena with the global scope already present.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn push(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(parent),
            ..Default::default()
        });
        id
    }

    /// Declare (or overwrite, per `var` semantics) a name in one scope.
    pub fn declare(&mut self, scope: ScopeId, name: &str, value: JsValue, decl: DeclKind) {
        self.scopes[scope.0]
            .bindings
            .insert(name.to_string(), Binding { value, decl });
    }

    /// Innermost-first search for the scope that binds `name`.
    pub fn resolve(&self, from: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = Some(from);
        while let Some(id) = current {
            if self.scopes[id.0].bindings.contains_key(name) {
                return Some(id);
            }
            current = self.scopes[id.0].parent;
        }
        None
    }

    pub fn get(&self, from: ScopeId, name: &str) -> Option<&Binding> {
        let holder = self.resolve(from, name)?;
        self.scopes[holder.0].bindings.get(name)
    }

    /// Assign through the chain: write to the binding scope if one exists,
    /// otherwise create an implicit global.
    pub fn assign(&mut self, from: ScopeId, name: &str, value: JsValue) {
        match self.resolve(from, name) {
            Some(holder) => {
                if let Some(binding) = self.scopes[holder.0].bindings.get_mut(name) {
                    binding.value = value;
                }
            }
            None => self.declare(GLOBAL_SCOPE, name, value, DeclKind::Implicit),
        }
    }

    pub fn local(&self, scope: ScopeId, name: &str) -> Option<&Binding> {
        self.scopes[scope.0].bindings.get(name)
    }

    /// Iterate one scope's bindings (used by the final-context view).
    pub fn bindings(&self, scope: ScopeId) -> impl Iterator<Item = (&String, &Binding)> {
        self.scopes[scope.0].bindings.iter()
    }
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_walks_innermost_first() {
        let mut arena = ScopeArena::new();
        arena.declare(GLOBAL_SCOPE, "x", JsValue::number(1.0), DeclKind::Var);
        let inner = arena.push(GLOBAL_SCOPE);
        arena.declare(inner, "x", JsValue::number(2.0), DeclKind::Var);

        let binding = arena.get(inner, "x").unwrap();
        match binding.value.as_literal() {
            Some(crate::ast::LiteralValue::Num(n)) => assert_eq!(*n, 2.0),
            other => panic!("expected number, got {other:?}"),
        }
    }

    #[test]
    fn missing_name_assignment_creates_implicit_global() {
        let mut arena = ScopeArena::new();
        let inner = arena.push(GLOBAL_SCOPE);
        arena.assign(inner, "ghost", JsValue::string("boo"));
        assert!(arena.local(GLOBAL_SCOPE, "ghost").is_some());
        assert!(arena.local(inner, "ghost").is_none());
    }

    #[test]
    fn assignment_reaches_the_binding_scope() {
        let mut arena = ScopeArena::new();
        arena.declare(GLOBAL_SCOPE, "x", JsValue::number(1.0), DeclKind::Var);
        let inner = arena.push(GLOBAL_SCOPE);
        arena.assign(inner, "x", JsValue::number(9.0));
        let binding = arena.local(GLOBAL_SCOPE, "x").unwrap();
        match binding.value.as_literal() {
            Some(crate::ast::LiteralValue::Num(n)) => assert_eq!(*n, 9.0),
            other => panic!("expected number, got {other:?}"),
        }
    }
}
