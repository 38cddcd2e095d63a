//! Event-registration checks.

use crate::interp::fold::truthiness;
use crate::interp::Traverser;
use crate::report::{FindingId, Severity};
use crate::rules::CallSite;

/// `addEventListener(type, listener, useCapture, wantsUntrusted)`: a truthy
/// fourth argument together with a truthy third opts into receiving events
/// synthesized by untrusted content.
pub fn check_add_event_listener(t: &mut Traverser<'_>, site: &CallSite<'_>) {
    if site.values.len() < 4 {
        return;
    }
    let wants_untrusted = truthiness(&site.values[3]) == Some(true);
    let use_capture = truthiness(&site.values[2]) == Some(true);
    if wants_untrusted && use_capture {
        t.report(
            site.call,
            FindingId("javascript", "events", "untrusted_mutation_events"),
            Severity::Notice,
            "addEventListener accepts events from untrusted content",
            "Passing true as the fourth argument delivers events that web \
             content can synthesize, which can be used to drive privileged \
             handlers.",
            None,
        );
    }
}
