//! Code-from-string checks: `eval`, the `Function` constructor, and string
//! callbacks handed to the scheduling timers.

use crate::interp::Traverser;
use crate::report::{FindingId, Severity};
use crate::rules::CallSite;

/// `eval(...)` and `Function(...)` always raise, regardless of argument
/// shape; there is no safe statically-checkable use in extension code.
pub fn check_eval(t: &mut Traverser<'_>, site: &CallSite<'_>) {
    t.report(
        site.call,
        FindingId("javascript", "call", "dangerous_eval"),
        Severity::Error,
        format!("{}() evaluates a string as code", site.callee_name),
        "Evaluating strings at runtime defeats review of the packaged code. \
         Restructure to call the code directly.",
        Some(site.callee_name.to_string()),
    );
}

/// `setTimeout`/`setInterval`: a string first argument is deferred eval; an
/// unknown first argument may be. Actual function values pass silently.
pub fn check_deferred_script(t: &mut Traverser<'_>, site: &CallSite<'_>) {
    let Some(callback) = site.values.first() else {
        return;
    };
    if callback.is_function() {
        return;
    }
    let is_string = callback.as_str().is_some();
    if is_string || callback.is_unknown() {
        let message = if is_string {
            format!("{}() called with a string callback", site.callee_name)
        } else {
            format!(
                "{}() called with a callback that could not be verified",
                site.callee_name
            )
        };
        t.report(
            site.call,
            FindingId("javascript", "timers", "string_callback"),
            Severity::Error,
            message,
            "String callbacks are evaluated as code when the timer fires. \
             Pass a function instead.",
            callback.as_str().map(str::to_string),
        );
    }
}
