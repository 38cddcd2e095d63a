pub mod builtin;

use crate::ast::SyntaxNode;
use crate::interp::value::JsValue;
use crate::interp::Traverser;
use crate::report::{FindingId, Severity};

/// One call expression, as seen by a check function: the raw argument nodes,
/// their already-evaluated abstract values (evaluated exactly once by the
/// dispatcher), and the structural callee name that selected the check.
pub struct CallSite<'a> {
    pub call: &'a SyntaxNode,
    pub callee_name: &'a str,
    pub args: &'a [SyntaxNode],
    pub values: &'a [JsValue],
}

/// Check invoked when a call expression's callee resolves structurally to a
/// registered name.
pub type CallCheck = fn(&mut Traverser<'_>, &CallSite<'_>);

/// Check invoked when a member-set expression's property name is registered.
/// Receives the site node and the assigned value.
pub type SetCheck = fn(&mut Traverser<'_>, &SyntaxNode, &JsValue);

/// Metadata describing a registered rule, for `list-rules` output.
#[derive(Debug, Clone, Copy)]
pub struct RuleInfo {
    pub id: FindingId,
    pub severity: Severity,
    pub summary: &'static str,
}

/// Look up the check for a called name. Resolution is structural: only the
/// literal member or identifier name matters, never the receiver's runtime
/// identity (which is frequently unknown).
pub fn call_check(name: &str) -> Option<CallCheck> {
    builtin::CALL_CHECKS.get(name).copied()
}

/// Look up the check for a member-set property name.
pub fn member_set_check(name: &str) -> Option<SetCheck> {
    builtin::SET_CHECKS.get(name).copied()
}

/// All registered rules, for documentation output.
pub fn all_rules() -> &'static [RuleInfo] {
    builtin::RULES
}
