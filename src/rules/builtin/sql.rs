//! Storage-API checks.

use crate::interp::Traverser;
use crate::report::{FindingId, Severity};
use crate::rules::CallSite;

/// Synchronous SQL entry points (`createStatement`, `executeSimpleSQL`).
/// Always reported; a second, distinct finding covers dynamically built SQL.
pub fn check_synchronous_sql(t: &mut Traverser<'_>, site: &CallSite<'_>) {
    t.report(
        site.call,
        FindingId("javascript", "storage", "synchronous_sql"),
        Severity::Warning,
        format!("Synchronous SQL via {}", site.callee_name),
        "Synchronous storage calls block the main thread. Use the async \
         statement APIs.",
        Some(site.callee_name.to_string()),
    );
    check_dynamic_sql_only(t, site);
}

/// Dynamic-SQL construction: any argument that did not fold to a literal was
/// built at runtime (concatenation with unknown operands, variables, ...).
pub fn check_dynamic_sql_only(t: &mut Traverser<'_>, site: &CallSite<'_>) {
    if site.values.iter().any(|v| v.as_literal().is_none()) {
        t.report(
            site.call,
            FindingId("javascript", "storage", "dynamic_sql"),
            Severity::Warning,
            format!("Dynamically built SQL passed to {}", site.callee_name),
            "SQL assembled from non-literal parts risks injection. Use bound \
             parameters.",
            Some(site.callee_name.to_string()),
        );
    }
}
