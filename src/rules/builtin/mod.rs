//! Built-in dangerous-API checks, grouped by family. The registry maps a
//! structural call or member-set name to its check function; the traversal
//! dispatcher consults it on every call and member assignment.

pub mod dom;
pub mod events;
pub mod evalish;
pub mod sql;

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::{CallCheck, RuleInfo, SetCheck};
use crate::report::{FindingId, Severity};

pub static CALL_CHECKS: Lazy<HashMap<&'static str, CallCheck>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, CallCheck> = HashMap::new();
    map.insert("createElement", dom::check_create_element);
    map.insert("createElementNS", dom::check_create_element);
    map.insert("setAttribute", dom::check_set_attribute);
    map.insert("insertAdjacentHTML", dom::check_insert_adjacent_html);
    map.insert("write", dom::check_document_write);
    map.insert("writeln", dom::check_document_write);
    map.insert("addEventListener", events::check_add_event_listener);
    map.insert("createStatement", sql::check_synchronous_sql);
    map.insert("createAsyncStatement", sql::check_dynamic_sql_only);
    map.insert("executeSimpleSQL", sql::check_synchronous_sql);
    map.insert("eval", evalish::check_eval);
    map.insert("Function", evalish::check_eval);
    map.insert("setTimeout", evalish::check_deferred_script);
    map.insert("setInterval", evalish::check_deferred_script);
    map
});

pub static SET_CHECKS: Lazy<HashMap<&'static str, SetCheck>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, SetCheck> = HashMap::new();
    map.insert("innerHTML", dom::check_html_assignment);
    map.insert("outerHTML", dom::check_html_assignment);
    map
});

pub static RULES: &[RuleInfo] = &[
    RuleInfo {
        id: FindingId("javascript", "call", "dangerous_eval"),
        severity: Severity::Error,
        summary: "eval() and the Function constructor execute arbitrary strings",
    },
    RuleInfo {
        id: FindingId("javascript", "timers", "string_callback"),
        severity: Severity::Error,
        summary: "setTimeout/setInterval with a string or unknown callback",
    },
    RuleInfo {
        id: FindingId("javascript", "dom", "script_tag_create"),
        severity: Severity::Warning,
        summary: "Dynamic creation of <script> elements",
    },
    RuleInfo {
        id: FindingId("javascript", "dom", "variable_element_type"),
        severity: Severity::Notice,
        summary: "createElement with a non-literal tag name",
    },
    RuleInfo {
        id: FindingId("javascript", "dom", "setattribute_on_handler"),
        severity: Severity::Notice,
        summary: "Inline event handler installed via setAttribute",
    },
    RuleInfo {
        id: FindingId("javascript", "dom", "insert_adjacent_html"),
        severity: Severity::Error,
        summary: "insertAdjacentHTML with event-handler markup or unknown content",
    },
    RuleInfo {
        id: FindingId("javascript", "dom", "unsafe_html_assignment"),
        severity: Severity::Error,
        summary: "innerHTML/outerHTML assigned event-handler markup or unknown content",
    },
    RuleInfo {
        id: FindingId("javascript", "dom", "document_write"),
        severity: Severity::Warning,
        summary: "document.write/writeln in extension code",
    },
    RuleInfo {
        id: FindingId("javascript", "storage", "synchronous_sql"),
        severity: Severity::Warning,
        summary: "Synchronous SQL execution",
    },
    RuleInfo {
        id: FindingId("javascript", "storage", "dynamic_sql"),
        severity: Severity::Warning,
        summary: "SQL built from non-literal parts",
    },
    RuleInfo {
        id: FindingId("javascript", "events", "untrusted_mutation_events"),
        severity: Severity::Notice,
        summary: "addEventListener opting into untrusted event delivery",
    },
    RuleInfo {
        id: FindingId("javascript", "unwrapped", "assignment"),
        severity: Severity::Error,
        summary: "Assignment through an unwrapped foreign object",
    },
    RuleInfo {
        id: FindingId("javascript", "global", "protected_redefinition"),
        severity: Severity::Error,
        summary: "Redefinition of a protected global",
    },
    RuleInfo {
        id: FindingId("javascript", "global", "protected_shadowing"),
        severity: Severity::Warning,
        summary: "Declaration shadows a protected global",
    },
    RuleInfo {
        id: FindingId("javascript", "xpcom", "banned_member"),
        severity: Severity::Warning,
        summary: "Use of an interface member banned for this add-on mode",
    },
];
