//! Abstract runtime values.
//!
//! A `JsValue` is what the traverser knows about one runtime value: an exact
//! literal, a structural object, a closure, a reference to a well-known
//! global, or nothing (`Unknown`). Unknown values are never trusted for
//! literal decisions; they only poison further folding.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::ast::LiteralValue;
use crate::interp::scope::ScopeId;

/// Shared property storage. Clones of an `Object` value alias the same map,
/// matching JS reference semantics for member writes.
pub type PropMap = Rc<RefCell<BTreeMap<String, JsValue>>>;

#[derive(Debug, Clone)]
pub enum ValueKind {
    Literal(LiteralValue),
    Object {
        props: PropMap,
        /// Names a known global/XPCOM type when the object was produced by a
        /// tracked constructor (`getService`, `createElement`, ...).
        class_hint: Option<String>,
    },
    /// A closure. The body is re-entered lazily; `scope` is a non-owning
    /// reference into the scope arena where it was defined.
    Function { params: Vec<String>, scope: ScopeId },
    /// Identifier resolved to a well-known global from the entity catalog.
    GlobalRef(String),
    Unknown,
}

#[derive(Debug, Clone)]
pub struct JsValue {
    pub kind: ValueKind,
    /// Derived from at least one unmodeled operand.
    pub dirty: bool,
    /// Produced by unwrapping a foreign object and not yet rewrapped.
    /// Property writes through such a value are reported.
    pub unwrapped: bool,
}

impl JsValue {
    pub fn unknown() -> Self {
        Self {
            kind: ValueKind::Unknown,
            dirty: false,
            unwrapped: false,
        }
    }

    /// Unknown that remembers it came from an unmodeled computation.
    pub fn dirty_unknown() -> Self {
        Self {
            kind: ValueKind::Unknown,
            dirty: true,
            unwrapped: false,
        }
    }

    pub fn literal(value: LiteralValue) -> Self {
        Self {
            kind: ValueKind::Literal(value),
            dirty: false,
            unwrapped: false,
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::literal(LiteralValue::Str(s.into()))
    }

    pub fn number(n: f64) -> Self {
        Self::literal(LiteralValue::Num(n))
    }

    pub fn boolean(b: bool) -> Self {
        Self::literal(LiteralValue::Bool(b))
    }

    pub fn null() -> Self {
        Self::literal(LiteralValue::Null)
    }

    pub fn object() -> Self {
        Self {
            kind: ValueKind::Object {
                props: Rc::new(RefCell::new(BTreeMap::new())),
                class_hint: None,
            },
            dirty: false,
            unwrapped: false,
        }
    }

    pub fn object_of_class(class_hint: impl Into<String>) -> Self {
        Self {
            kind: ValueKind::Object {
                props: Rc::new(RefCell::new(BTreeMap::new())),
                class_hint: Some(class_hint.into()),
            },
            dirty: false,
            unwrapped: false,
        }
    }

    pub fn global(name: impl Into<String>) -> Self {
        Self {
            kind: ValueKind::GlobalRef(name.into()),
            dirty: false,
            unwrapped: false,
        }
    }

    pub fn function(params: Vec<String>, scope: ScopeId) -> Self {
        Self {
            kind: ValueKind::Function { params, scope },
            dirty: false,
            unwrapped: false,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.kind, ValueKind::Unknown)
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, ValueKind::Function { .. })
    }

    pub fn as_literal(&self) -> Option<&LiteralValue> {
        match &self.kind {
            ValueKind::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.as_literal() {
            Some(LiteralValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn class_hint(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Object { class_hint, .. } => class_hint.as_deref(),
            _ => None,
        }
    }

    /// Property lookup on a structural object. The result inherits this
    /// value's unwrapped marker so taint survives chained access.
    pub fn get_property(&self, name: &str) -> Option<JsValue> {
        match &self.kind {
            ValueKind::Object { props, .. } => {
                let mut value = props.borrow().get(name).cloned()?;
                value.unwrapped |= self.unwrapped;
                value.dirty |= self.dirty;
                Some(value)
            }
            _ => None,
        }
    }

    /// Property write. Only structural objects store anything; other kinds
    /// swallow the write (their shape is not modeled).
    pub fn set_property(&self, name: &str, value: JsValue) {
        if let ValueKind::Object { props, .. } = &self.kind {
            props.borrow_mut().insert(name.to_string(), value);
        }
    }

    /// Copy of this value's shape with the unwrapped marker set. Objects get
    /// a fresh property map (shallow copy) so the wrapped original keeps its
    /// own identity.
    pub fn unwrapped_copy(&self) -> JsValue {
        let mut copy = self.shape_copy();
        copy.unwrapped = true;
        copy
    }

    /// Copy with the unwrapped marker cleared (`XPCNativeWrapper(x)`).
    pub fn rewrapped_copy(&self) -> JsValue {
        let mut copy = self.shape_copy();
        copy.unwrapped = false;
        copy
    }

    fn shape_copy(&self) -> JsValue {
        let kind = match &self.kind {
            ValueKind::Object { props, class_hint } => ValueKind::Object {
                props: Rc::new(RefCell::new(props.borrow().clone())),
                class_hint: class_hint.clone(),
            },
            other => other.clone(),
        };
        JsValue {
            kind,
            dirty: self.dirty,
            unwrapped: self.unwrapped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_clones_share_property_storage() {
        let obj = JsValue::object();
        let alias = obj.clone();
        alias.set_property("x", JsValue::number(1.0));
        assert!(obj.get_property("x").is_some());
    }

    #[test]
    fn unwrapped_copy_detaches_property_storage() {
        let obj = JsValue::object();
        obj.set_property("x", JsValue::number(1.0));
        let raw = obj.unwrapped_copy();
        assert!(raw.unwrapped);
        raw.set_property("y", JsValue::number(2.0));
        assert!(obj.get_property("y").is_none());
        assert!(raw.get_property("x").is_some());
    }

    #[test]
    fn rewrap_clears_the_marker() {
        let raw = JsValue::object().unwrapped_copy();
        let wrapped = raw.rewrapped_copy();
        assert!(!wrapped.unwrapped);
    }

    #[test]
    fn chained_access_inherits_the_marker() {
        let inner = JsValue::object();
        let outer = JsValue::object();
        outer.set_property("inner", inner);
        let raw = outer.unwrapped_copy();
        let via = raw.get_property("inner").unwrap();
        assert!(via.unwrapped);
    }

    #[test]
    fn non_objects_swallow_property_writes() {
        let v = JsValue::string("s");
        v.set_property("x", JsValue::number(1.0));
        assert!(v.get_property("x").is_none());
    }
}
