//! Entity catalog: static descriptions of well-known globals and XPCOM
//! interfaces, with per-member danger annotations. Loaded once, immutable,
//! O(1) lookup by name.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::report::Severity;

/// A well-known global object.
#[derive(Debug, Clone, Copy)]
pub struct GlobalEntity {
    pub name: &'static str,
    /// Assignment to this name (or its `prototype`) is reported as a
    /// redefinition of a protected global.
    pub protected: bool,
}

/// Gate controlling when a member annotation applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeGate {
    Always,
    /// Applies only when the add-on did not declare itself bootstrapped.
    UnlessBootstrapped,
    /// Applies when any supported target version is in the listed set.
    TargetsAny(&'static [&'static str]),
}

/// Danger annotation on an interface member.
#[derive(Debug, Clone, Copy)]
pub struct MemberDanger {
    pub member: &'static str,
    pub severity: Severity,
    pub gate: ModeGate,
    pub message: &'static str,
    pub description: &'static str,
}

/// An XPCOM interface whose construction is tracked through
/// `getService`/`createInstance` so later member calls resolve against it.
#[derive(Debug, Clone, Copy)]
pub struct Interface {
    pub name: &'static str,
    pub dangers: &'static [MemberDanger],
}

static GLOBALS: Lazy<HashMap<&'static str, GlobalEntity>> = Lazy::new(|| {
    let entries = [
        // Host globals resolved to GlobalRef values.
        ("window", false),
        ("document", false),
        ("navigator", false),
        ("Components", false),
        ("Services", false),
        ("XPCNativeWrapper", true),
        // Constructor globals: redefinition is an attack primitive.
        ("Object", true),
        ("Function", true),
        ("String", true),
        ("Number", true),
        ("Boolean", true),
        ("Array", true),
        ("RegExp", true),
        ("Date", true),
        ("Math", true),
        ("JSON", true),
        ("eval", true),
    ];
    entries
        .into_iter()
        .map(|(name, protected)| (name, GlobalEntity { name, protected }))
        .collect()
});

static INTERFACES: Lazy<HashMap<&'static str, Interface>> = Lazy::new(|| {
    const CATEGORY_MANAGER: &[MemberDanger] = &[MemberDanger {
        member: "addCategoryEntry",
        severity: Severity::Warning,
        gate: ModeGate::UnlessBootstrapped,
        message: "Category registration requires a bootstrapped add-on",
        description: "Registering category entries from an add-on that cannot \
                      clean up after itself leaves the registration behind on \
                      uninstall. Declare the add-on bootstrapped or register \
                      through the manifest.",
    }];

    const COMPONENT_REGISTRAR: &[MemberDanger] = &[MemberDanger {
        member: "registerFactory",
        severity: Severity::Warning,
        gate: ModeGate::UnlessBootstrapped,
        message: "Factory registration requires a bootstrapped add-on",
        description: "registerFactory performed outside a bootstrapped \
                      lifecycle cannot be undone when the add-on is disabled.",
    }];

    const PROCESS: &[MemberDanger] = &[MemberDanger {
        member: "run",
        severity: Severity::Warning,
        gate: ModeGate::Always,
        message: "nsIProcess.run launches a native process",
        description: "Launching external processes from extension code is \
                      rarely justified and is a common malware vector.",
    }];

    const JSON_IFACE: &[MemberDanger] = &[
        MemberDanger {
            member: "encode",
            severity: Severity::Notice,
            gate: ModeGate::TargetsAny(&["7.0", "8.0"]),
            message: "nsIJSON.encode is obsolete on targeted versions",
            description: "Use the native JSON object instead of nsIJSON on \
                          applications where it has been removed.",
        },
        MemberDanger {
            member: "decode",
            severity: Severity::Notice,
            gate: ModeGate::TargetsAny(&["7.0", "8.0"]),
            message: "nsIJSON.decode is obsolete on targeted versions",
            description: "Use the native JSON object instead of nsIJSON on \
                          applications where it has been removed.",
        },
    ];

    let entries = [
        Interface {
            name: "nsICategoryManager",
            dangers: CATEGORY_MANAGER,
        },
        Interface {
            name: "nsIComponentRegistrar",
            dangers: COMPONENT_REGISTRAR,
        },
        Interface {
            name: "nsIProcess",
            dangers: PROCESS,
        },
        Interface {
            name: "nsIJSON",
            dangers: JSON_IFACE,
        },
        // Tracked for class hints even without member annotations; the SQL
        // rules fire structurally on member names.
        Interface {
            name: "mozIStorageService",
            dangers: &[],
        },
        Interface {
            name: "mozIStorageConnection",
            dangers: &[],
        },
        Interface {
            name: "nsIObserverService",
            dangers: &[],
        },
        Interface {
            name: "nsIPrefBranch",
            dangers: &[],
        },
    ];
    entries.into_iter().map(|i| (i.name, i)).collect()
});

pub fn global(name: &str) -> Option<&'static GlobalEntity> {
    GLOBALS.get(name)
}

/// Whether assigning to this top-level name must be reported.
pub fn is_protected_global(name: &str) -> bool {
    global(name).is_some_and(|g| g.protected)
}

pub fn interface(name: &str) -> Option<&'static Interface> {
    INTERFACES.get(name)
}

pub fn interface_member(iface: &str, member: &str) -> Option<&'static MemberDanger> {
    interface(iface)?.dangers.iter().find(|d| d.member == member)
}
