//! DOM construction and markup-injection checks.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{NodeKind, SyntaxNode};
use crate::interp::fold::to_js_string;
use crate::interp::value::JsValue;
use crate::interp::Traverser;
use crate::report::{FindingId, Severity};
use crate::rules::CallSite;

/// Inline event-handler attribute inside markup: `onclick=`, `onLoad =`, ...
static EVENT_HANDLER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bon\w+\s*=").unwrap());

/// `createElement`/`createElementNS`: a folded `"script"` tag is a script
/// injection point; an unfoldable tag name is reported at lower severity.
pub fn check_create_element(t: &mut Traverser<'_>, site: &CallSite<'_>) {
    let Some(tag_value) = site.values.first() else {
        return;
    };
    match tag_value.as_literal() {
        Some(lit) => {
            if to_js_string(lit).eq_ignore_ascii_case("script") {
                t.report(
                    site.call,
                    FindingId("javascript", "dom", "script_tag_create"),
                    Severity::Warning,
                    "Dynamic script tag creation",
                    "Creating <script> elements at runtime loads code outside \
                     the reviewed package. Load scripts through the package \
                     instead.",
                    Some(site.callee_name.to_string()),
                );
            }
        }
        None => {
            t.report(
                site.call,
                FindingId("javascript", "dom", "variable_element_type"),
                Severity::Notice,
                "Variable element type created",
                "The tag name passed to createElement could not be determined \
                 statically. If it can ever be \"script\", this is a script \
                 injection point.",
                Some(site.callee_name.to_string()),
            );
        }
    }
}

/// `setAttribute` with an `on*` attribute name installs an inline handler.
pub fn check_set_attribute(t: &mut Traverser<'_>, site: &CallSite<'_>) {
    let Some(name_value) = site.values.first() else {
        return;
    };
    let Some(lit) = name_value.as_literal() else {
        return;
    };
    let attr = to_js_string(lit);
    if attr.len() >= 2 && attr[..2].eq_ignore_ascii_case("on") {
        t.report(
            site.call,
            FindingId("javascript", "dom", "setattribute_on_handler"),
            Severity::Notice,
            format!("Event handler attribute '{attr}' set via setAttribute"),
            "Inline event handlers set through attributes are evaluated as \
             code. Use addEventListener instead.",
            Some(attr),
        );
    }
}

/// `insertAdjacentHTML`: event-handler markup in the content argument, or
/// content that cannot be folded at all, is treated as unsafe.
pub fn check_insert_adjacent_html(t: &mut Traverser<'_>, site: &CallSite<'_>) {
    let Some(content) = site.values.get(1) else {
        return;
    };
    report_unsafe_html(
        t,
        site.call,
        content,
        FindingId("javascript", "dom", "insert_adjacent_html"),
        "insertAdjacentHTML",
    );
}

/// Member-set check for `innerHTML`/`outerHTML` assignments; same policy as
/// `insertAdjacentHTML`.
pub fn check_html_assignment(t: &mut Traverser<'_>, site: &SyntaxNode, assigned: &JsValue) {
    report_unsafe_html(
        t,
        site,
        assigned,
        FindingId("javascript", "dom", "unsafe_html_assignment"),
        "markup assignment",
    );
}

fn report_unsafe_html(
    t: &mut Traverser<'_>,
    site: &SyntaxNode,
    content: &JsValue,
    id: FindingId,
    what: &str,
) {
    match content.as_literal() {
        Some(lit) => {
            let markup = to_js_string(lit);
            if EVENT_HANDLER_RE.is_match(&markup) {
                t.report(
                    site,
                    id,
                    Severity::Error,
                    format!("Event-handler attribute in {what} content"),
                    "Markup containing on* attributes executes code when \
                     inserted. Attach handlers with addEventListener after \
                     insertion.",
                    Some(markup),
                );
            }
        }
        None => {
            t.report(
                site,
                id,
                Severity::Error,
                format!("Unknown content passed to {what}"),
                "The inserted markup could not be determined statically and \
                 is treated as unsafe.",
                None,
            );
        }
    }
}

/// `document.write`/`writeln`. Keyed structurally on the member name but only
/// reported when the receiver is literally `document`, since bare `write` is
/// far too common a method name.
pub fn check_document_write(t: &mut Traverser<'_>, site: &CallSite<'_>) {
    let NodeKind::CallExpression { callee, .. } = &site.call.kind else {
        return;
    };
    let NodeKind::MemberExpression { object, .. } = &callee.kind else {
        return;
    };
    if !matches!(&object.kind, NodeKind::Identifier { name } if name == "document") {
        return;
    }
    t.report(
        site.call,
        FindingId("javascript", "dom", "document_write"),
        Severity::Warning,
        format!("document.{} is disallowed", site.callee_name),
        "document.write interacts badly with defer/async loading and can \
         clobber the document. Use DOM insertion methods.",
        None,
    );
}
