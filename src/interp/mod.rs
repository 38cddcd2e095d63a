//! The traversal dispatcher: an abstract interpreter over the syntax tree.
//!
//! Given a root node and a filename it produces findings and a final global
//! context, and never lets an internal fault escape: a panic during the walk
//! becomes a single `unexpected_exception` finding and the host continues
//! with the next file.
//!
//! Statement sequences are executed in two passes. Pass 1 runs everything
//! except function declarations in source order; pass 2 then runs function
//! declarations and the queued bodies of function expressions. Top-level side
//! effects are therefore visible before any callback body is analyzed, which
//! is what actually happens at runtime for callbacks that fire later. Both
//! passes share the block's scope.

pub mod fold;
pub mod scope;
pub mod value;

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::ast::{NodeKind, SyntaxNode};
use crate::catalog;
use crate::report::{Finding, FindingId, FindingSink, Severity};
use crate::rules::{self, CallSite};
use crate::ModeFlags;

use fold::{fold_binary, fold_unary, to_js_string, truthiness};
use scope::{DeclKind, ScopeArena, ScopeId, GLOBAL_SCOPE};
use value::{JsValue, ValueKind};

/// A function body deferred to pass 2 of its enclosing block.
struct PendingFn<'a> {
    /// `Some` for declarations; the binding is created when the body runs.
    name: Option<&'a str>,
    params: &'a [String],
    body: &'a SyntaxNode,
    scope: ScopeId,
}

/// The terminal global scope of one file's analysis, kept for inspection
/// after the walk completes.
pub struct FinalContext {
    arena: ScopeArena,
}

impl FinalContext {
    pub fn global(&self, name: &str) -> Option<&JsValue> {
        self.arena.local(GLOBAL_SCOPE, name).map(|b| &b.value)
    }

    /// Folded string form of a global literal binding, if it is one.
    pub fn global_string(&self, name: &str) -> Option<String> {
        self.global(name)?.as_literal().map(to_js_string)
    }

    pub fn global_names(&self) -> Vec<&str> {
        self.arena
            .bindings(GLOBAL_SCOPE)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

pub struct Traverser<'a> {
    filename: &'a str,
    flags: &'a ModeFlags,
    sink: &'a mut dyn FindingSink,
    arena: ScopeArena,
    current: ScopeId,
    queues: Vec<Vec<PendingFn<'a>>>,
    // Position cursor, updated before each handler runs.
    line: u32,
    column: u32,
}

impl<'a> Traverser<'a> {
    pub fn new(filename: &'a str, flags: &'a ModeFlags, sink: &'a mut dyn FindingSink) -> Self {
        Self {
            filename,
            flags,
            sink,
            arena: ScopeArena::new(),
            current: GLOBAL_SCOPE,
            queues: Vec::new(),
            line: 0,
            column: 0,
        }
    }

    pub fn flags(&self) -> &ModeFlags {
        self.flags
    }

    /// Walk the tree. Internal faults are converted into a single
    /// `unexpected_exception` finding; the returned context is whatever had
    /// been built when analysis stopped.
    pub fn run(mut self, root: &'a SyntaxNode) -> FinalContext {
        let outcome = catch_unwind(AssertUnwindSafe(|| match &root.kind {
            NodeKind::Program { body } => self.exec_statements(body),
            _ => self.exec_statement(root),
        }));
        if outcome.is_err() {
            tracing::error!(file = self.filename, "analysis aborted by internal fault");
            self.report(
                root,
                FindingId("javascript", "traversal", "unexpected_exception"),
                Severity::Error,
                "Analysis of this file failed unexpectedly",
                "An internal fault interrupted analysis of this file. The \
                 rest of the package was analyzed normally.",
                None,
            );
        }
        FinalContext { arena: self.arena }
    }

    pub fn report(
        &mut self,
        node: &SyntaxNode,
        id: FindingId,
        severity: Severity,
        message: impl Into<String>,
        description: impl Into<String>,
        context: Option<String>,
    ) {
        let (line, column) = if node.line > 0 {
            (node.line, node.column)
        } else {
            (self.line, self.column)
        };
        self.sink.emit(Finding {
            id,
            severity,
            message: message.into(),
            description: description.into(),
            filename: self.filename.to_string(),
            line,
            column,
            context,
        });
    }

    fn cursor(&mut self, node: &SyntaxNode) {
        if node.line > 0 {
            self.line = node.line;
            self.column = node.column;
        }
    }

    // ── Statements ──────────────────────────────────────────────

    fn exec_statements(&mut self, stmts: &'a [SyntaxNode]) {
        self.queues.push(Vec::new());
        for stmt in stmts {
            if let NodeKind::FunctionDeclaration { name, params, body } = &stmt.kind {
                let scope = self.current;
                self.queues.last_mut().unwrap().push(PendingFn {
                    name: Some(name.as_str()),
                    params,
                    body,
                    scope,
                });
            } else {
                self.exec_statement(stmt);
            }
        }
        let pending = self.queues.pop().unwrap();
        for f in pending {
            self.run_function_body(f);
        }
    }

    fn run_function_body(&mut self, f: PendingFn<'a>) {
        if let Some(name) = f.name {
            if catalog::is_protected_global(name) {
                self.report(
                    f.body,
                    FindingId("javascript", "global", "protected_shadowing"),
                    Severity::Warning,
                    format!("Function declaration shadows protected global '{name}'"),
                    "Shadowing a built-in constructor changes the meaning of \
                     every later use in this file.",
                    Some(name.to_string()),
                );
            }
            self.arena.declare(
                f.scope,
                name,
                JsValue::function(f.params.to_vec(), f.scope),
                DeclKind::Function,
            );
        }
        let body_scope = self.arena.push(f.scope);
        for param in f.params {
            self.arena
                .declare(body_scope, param, JsValue::unknown(), DeclKind::Param);
        }
        let saved = self.current;
        self.current = body_scope;
        self.exec_statement(f.body);
        self.current = saved;
    }

    fn exec_statement(&mut self, stmt: &'a SyntaxNode) {
        self.cursor(stmt);
        match &stmt.kind {
            NodeKind::EmptyStatement
            | NodeKind::BreakStatement
            | NodeKind::ContinueStatement => {}
            NodeKind::ExpressionStatement { expression } => {
                self.eval_expr(expression);
            }
            NodeKind::BlockStatement { body } => self.exec_statements(body),
            NodeKind::VariableDeclaration {
                kind,
                declarations,
            } => {
                for decl in declarations {
                    self.exec_declarator(decl, *kind);
                }
            }
            NodeKind::FunctionDeclaration { name, params, body } => {
                // Normally queued by exec_statements; reachable directly when
                // a declaration is the sole body of another construct.
                let scope = self.current;
                let pending = PendingFn {
                    name: Some(name.as_str()),
                    params,
                    body,
                    scope,
                };
                match self.queues.last_mut() {
                    Some(queue) => queue.push(pending),
                    None => self.run_function_body(pending),
                }
            }
            NodeKind::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                self.eval_expr(test);
                // Both branches are walked; the analysis is path-insensitive.
                self.exec_statement(consequent);
                if let Some(alt) = alternate {
                    self.exec_statement(alt);
                }
            }
            NodeKind::WhileStatement { test, body } => {
                self.eval_expr(test);
                self.exec_statement(body);
            }
            NodeKind::DoWhileStatement { body, test } => {
                self.exec_statement(body);
                self.eval_expr(test);
            }
            NodeKind::ForStatement {
                init,
                test,
                update,
                body,
            } => {
                if let Some(init) = init {
                    match &init.kind {
                        NodeKind::VariableDeclaration { .. } => self.exec_statement(init),
                        _ => {
                            self.eval_expr(init);
                        }
                    }
                }
                if let Some(test) = test {
                    self.eval_expr(test);
                }
                if let Some(update) = update {
                    self.eval_expr(update);
                }
                self.exec_statement(body);
            }
            NodeKind::ForInStatement { left, right, body } => {
                self.eval_expr(right);
                match &left.kind {
                    NodeKind::VariableDeclaration { .. } => self.exec_statement(left),
                    NodeKind::Identifier { name } => {
                        self.arena.assign(self.current, name, JsValue::unknown());
                    }
                    _ => {
                        self.eval_expr(left);
                    }
                }
                self.exec_statement(body);
            }
            NodeKind::SwitchStatement {
                discriminant,
                cases,
            } => {
                self.eval_expr(discriminant);
                for case in cases {
                    if let NodeKind::SwitchCase { test, consequent } = &case.kind {
                        if let Some(test) = test {
                            self.eval_expr(test);
                        }
                        self.exec_statements(consequent);
                    }
                }
            }
            NodeKind::ReturnStatement { argument } => {
                if let Some(argument) = argument {
                    self.eval_expr(argument);
                }
            }
            NodeKind::ThrowStatement { argument } => {
                self.eval_expr(argument);
            }
            NodeKind::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                self.exec_statement(block);
                if let Some(handler) = handler {
                    if let NodeKind::CatchClause { param, body } = &handler.kind {
                        if let Some(param) = param {
                            if let NodeKind::Identifier { name } = &param.kind {
                                self.arena.declare(
                                    self.current,
                                    name,
                                    JsValue::unknown(),
                                    DeclKind::Param,
                                );
                            }
                        }
                        self.exec_statement(body);
                    }
                }
                if let Some(finalizer) = finalizer {
                    self.exec_statement(finalizer);
                }
            }
            NodeKind::WithStatement { object, body } => {
                self.eval_expr(object);
                self.exec_statement(body);
            }
            NodeKind::LabeledStatement { body } => self.exec_statement(body),
            // Expression used in statement position, or an opaque construct.
            _ => {
                self.eval_expr(stmt);
            }
        }
    }

    fn exec_declarator(&mut self, decl: &'a SyntaxNode, kind: crate::ast::VarKind) {
        let NodeKind::VariableDeclarator { id, init } = &decl.kind else {
            return;
        };
        let value = match init {
            Some(init) => self.eval_expr(init),
            None => JsValue::unknown(),
        };
        if let NodeKind::Identifier { name } = &id.kind {
            if catalog::is_protected_global(name) {
                self.report(
                    decl,
                    FindingId("javascript", "global", "protected_shadowing"),
                    Severity::Warning,
                    format!("Declaration shadows protected global '{name}'"),
                    "Shadowing a built-in constructor changes the meaning of \
                     every later use in this file.",
                    Some(name.to_string()),
                );
            }
            let decl_kind = match kind {
                crate::ast::VarKind::Var => DeclKind::Var,
                crate::ast::VarKind::Let | crate::ast::VarKind::Const => DeclKind::Lexical,
            };
            self.arena.declare(self.current, name, value, decl_kind);
        }
        // Destructuring patterns: the initializer was evaluated above; the
        // individual bindings degrade to implicit globals on first write.
    }

    // ── Expressions ─────────────────────────────────────────────

    pub(crate) fn eval_expr(&mut self, node: &'a SyntaxNode) -> JsValue {
        self.cursor(node);
        match &node.kind {
            NodeKind::Literal { value: Some(lit) } => JsValue::literal(lit.clone()),
            NodeKind::Literal { value: None } => JsValue::dirty_unknown(),
            NodeKind::Identifier { name } => self.eval_identifier(name),
            NodeKind::ThisExpression => JsValue::unknown(),
            NodeKind::BinaryExpression {
                operator,
                left,
                right,
            } => {
                let l = self.eval_expr(left);
                let r = self.eval_expr(right);
                fold_binary(operator, &l, &r)
            }
            NodeKind::LogicalExpression {
                operator,
                left,
                right,
            } => {
                let l = self.eval_expr(left);
                let r = self.eval_expr(right);
                match (operator.as_str(), truthiness(&l)) {
                    ("&&", Some(false)) => l,
                    ("&&", Some(true)) => r,
                    ("||", Some(true)) => l,
                    ("||", Some(false)) => r,
                    _ => JsValue::dirty_unknown(),
                }
            }
            NodeKind::UnaryExpression { operator, argument } => {
                let v = self.eval_expr(argument);
                fold_unary(operator, &v)
            }
            NodeKind::UpdateExpression { argument } => {
                self.eval_expr(argument);
                if let NodeKind::Identifier { name } = &argument.kind {
                    self.arena
                        .assign(self.current, name, JsValue::dirty_unknown());
                }
                JsValue::dirty_unknown()
            }
            NodeKind::AssignmentExpression {
                operator,
                left,
                right,
            } => self.eval_assignment(node, operator, left, right),
            NodeKind::SequenceExpression { expressions } => {
                let mut last = JsValue::unknown();
                for expr in expressions {
                    last = self.eval_expr(expr);
                }
                last
            }
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                let t = self.eval_expr(test);
                let c = self.eval_expr(consequent);
                let a = self.eval_expr(alternate);
                match truthiness(&t) {
                    Some(true) => c,
                    Some(false) => a,
                    None => JsValue::dirty_unknown(),
                }
            }
            NodeKind::FunctionExpression { params, body, .. } => {
                let scope = self.current;
                let pending = PendingFn {
                    name: None,
                    params,
                    body,
                    scope,
                };
                match self.queues.last_mut() {
                    Some(queue) => queue.push(pending),
                    None => self.run_function_body(pending),
                }
                JsValue::function(params.clone(), scope)
            }
            NodeKind::ObjectExpression { properties } => {
                let obj = JsValue::object();
                for prop in properties {
                    if let NodeKind::Property { key, value } = &prop.kind {
                        let name = match &key.kind {
                            NodeKind::Identifier { name } => Some(name.clone()),
                            NodeKind::Literal { value: Some(lit) } => Some(to_js_string(lit)),
                            _ => None,
                        };
                        let v = self.eval_expr(value);
                        if let Some(name) = name {
                            obj.set_property(&name, v);
                        }
                    }
                }
                obj
            }
            NodeKind::ArrayExpression { elements } => {
                let arr = JsValue::object();
                for (i, element) in elements.iter().enumerate() {
                    let v = self.eval_expr(element);
                    arr.set_property(&i.to_string(), v);
                }
                arr
            }
            NodeKind::MemberExpression {
                object,
                property,
                computed,
            } => self.eval_member_read(object, property, *computed),
            NodeKind::CallExpression { callee, arguments } => {
                self.eval_call(node, callee, arguments)
            }
            NodeKind::NewExpression { callee, arguments } => {
                self.eval_call(node, callee, arguments)
            }
            // Statement kinds reached through expression position, and opaque
            // nodes: walk every child so nested dangerous calls are found,
            // contribute Unknown.
            _ => {
                for child in node.children() {
                    if is_statement_kind(child) {
                        self.exec_statement(child);
                    } else {
                        self.eval_expr(child);
                    }
                }
                JsValue::dirty_unknown()
            }
        }
    }

    fn eval_identifier(&mut self, name: &str) -> JsValue {
        if let Some(binding) = self.arena.get(self.current, name) {
            return binding.value.clone();
        }
        if catalog::global(name).is_some() {
            return JsValue::global(name);
        }
        // Forward reference to a hoisted binding or an undeclared name; JS
        // permits both on read, so no finding.
        JsValue::unknown()
    }

    /// Resolve the name of a member access. Computed accesses fold the
    /// property expression; non-literal computed names stay unresolved.
    fn member_prop_name(&mut self, property: &'a SyntaxNode, computed: bool) -> Option<String> {
        if computed {
            let v = self.eval_expr(property);
            v.as_literal().map(to_js_string)
        } else {
            match &property.kind {
                NodeKind::Identifier { name } => Some(name.clone()),
                NodeKind::Literal { value: Some(lit) } => Some(to_js_string(lit)),
                _ => None,
            }
        }
    }

    fn eval_member_read(
        &mut self,
        object: &'a SyntaxNode,
        property: &'a SyntaxNode,
        computed: bool,
    ) -> JsValue {
        let recv = self.eval_expr(object);
        let Some(name) = self.member_prop_name(property, computed) else {
            return tagged_unknown(&recv);
        };

        // Unwrapping a foreign object: shape copy, taint bit set.
        if name == "wrappedJSObject" {
            return recv.unwrapped_copy();
        }

        match &recv.kind {
            ValueKind::Object { .. } => recv
                .get_property(&name)
                .unwrap_or_else(|| tagged_unknown(&recv)),
            ValueKind::GlobalRef(global) => {
                // Keep Components.* chains symbolic so interface tokens
                // survive to getService/createInstance calls.
                if global == "Components" || global.starts_with("Components.") {
                    JsValue::global(format!("{global}.{name}"))
                } else {
                    tagged_unknown(&recv)
                }
            }
            _ => tagged_unknown(&recv),
        }
    }

    fn eval_assignment(
        &mut self,
        node: &'a SyntaxNode,
        operator: &str,
        left: &'a SyntaxNode,
        right: &'a SyntaxNode,
    ) -> JsValue {
        let rhs = self.eval_expr(right);
        let value = if operator == "=" {
            rhs
        } else {
            // Compound assignment folds through the underlying operator.
            let current = self.eval_expr(left);
            fold_binary(operator.trim_end_matches('='), &current, &rhs)
        };

        match &left.kind {
            NodeKind::Identifier { name } => {
                let shadowed = self
                    .arena
                    .get(self.current, name)
                    .map(|b| b.decl != DeclKind::Implicit)
                    .unwrap_or(false);
                if catalog::is_protected_global(name) && !shadowed {
                    self.report(
                        node,
                        FindingId("javascript", "global", "protected_redefinition"),
                        Severity::Error,
                        format!("Redefinition of protected global '{name}'"),
                        "Overwriting a built-in global lets later code in this \
                         file run against an attacker-controlled value. The \
                         assignment is honored for the rest of the analysis.",
                        Some(name.to_string()),
                    );
                }
                self.arena.assign(self.current, name, value.clone());
                value
            }
            NodeKind::MemberExpression {
                object,
                property,
                computed,
            } => {
                let recv = self.eval_expr(object);
                let name = self.member_prop_name(property, *computed);

                if recv.unwrapped {
                    self.report(
                        node,
                        FindingId("javascript", "unwrapped", "assignment"),
                        Severity::Error,
                        "Assignment to an unwrapped foreign object",
                        "Writing through wrappedJSObject/XPCNativeWrapper.unwrap \
                         mutates an object owned by untrusted content. Rewrap \
                         with XPCNativeWrapper() before writing.",
                        name.clone(),
                    );
                }

                if let Some(name) = &name {
                    if name == "prototype" {
                        if let NodeKind::Identifier { name: global } = &object.kind {
                            if catalog::is_protected_global(global) {
                                self.report(
                                    node,
                                    FindingId("javascript", "global", "protected_redefinition"),
                                    Severity::Error,
                                    format!("Redefinition of protected global '{global}.prototype'"),
                                    "Replacing a built-in prototype changes the \
                                     behavior of every object in the compartment.",
                                    Some(format!("{global}.prototype")),
                                );
                            }
                        }
                    }
                    recv.set_property(name, value.clone());
                    if let Some(check) = rules::member_set_check(name) {
                        check(self, node, &value);
                    }
                }
                value
            }
            _ => {
                self.eval_expr(left);
                value
            }
        }
    }

    fn eval_call(
        &mut self,
        node: &'a SyntaxNode,
        callee: &'a SyntaxNode,
        arguments: &'a [SyntaxNode],
    ) -> JsValue {
        // Structural callee resolution: a literal member name or identifier.
        // Receiver identity is deliberately not required.
        let (recv, name) = match &callee.kind {
            NodeKind::MemberExpression {
                object,
                property,
                computed,
            } => {
                let recv = self.eval_expr(object);
                let name = self.member_prop_name(property, *computed);
                (Some((recv, object)), name)
            }
            NodeKind::Identifier { name } => (None, Some(name.clone())),
            _ => {
                self.eval_expr(callee);
                (None, None)
            }
        };

        let values: Vec<JsValue> = arguments.iter().map(|a| self.eval_expr(a)).collect();

        // Wrapper plumbing changes the produced value rather than reporting.
        if let Some(name) = name.as_deref() {
            match name {
                "unwrap" => {
                    if let Some((_, object)) = &recv {
                        if matches!(&object.kind, NodeKind::Identifier { name } if name == "XPCNativeWrapper")
                        {
                            return values
                                .first()
                                .map(JsValue::unwrapped_copy)
                                .unwrap_or_else(JsValue::unknown);
                        }
                    }
                }
                "XPCNativeWrapper" => {
                    return values
                        .first()
                        .map(JsValue::rewrapped_copy)
                        .unwrap_or_else(JsValue::unknown);
                }
                "getService" | "createInstance" => {
                    if let Some(ValueKind::GlobalRef(token)) = values.first().map(|v| &v.kind) {
                        if let Some(iface) = token.strip_prefix("Components.interfaces.") {
                            return JsValue::object_of_class(iface);
                        }
                    }
                    return JsValue::dirty_unknown();
                }
                _ => {}
            }
        }

        // Catalog gating: member calls on a value whose class hint names a
        // known interface check that interface's danger annotations.
        if let (Some((recv_value, _)), Some(member)) = (&recv, name.as_deref()) {
            if let Some(hint) = recv_value.class_hint() {
                if let Some(danger) = catalog::interface_member(hint, member) {
                    if self.gate_applies(danger.gate) {
                        self.report(
                            node,
                            FindingId("javascript", "xpcom", "banned_member"),
                            danger.severity,
                            danger.message,
                            danger.description,
                            Some(format!("{hint}.{member}")),
                        );
                    }
                }
            }
        }

        if let Some(name) = name.as_deref() {
            if let Some(check) = rules::call_check(name) {
                let site = CallSite {
                    call: node,
                    callee_name: name,
                    args: arguments,
                    values: &values,
                };
                check(self, &site);
            }
        }

        JsValue::dirty_unknown()
    }

    fn gate_applies(&self, gate: catalog::ModeGate) -> bool {
        match gate {
            catalog::ModeGate::Always => true,
            catalog::ModeGate::UnlessBootstrapped => !self.flags.bootstrapped,
            catalog::ModeGate::TargetsAny(targets) => self
                .flags
                .supported_targets
                .iter()
                .any(|t| targets.contains(&t.as_str())),
        }
    }
}

fn tagged_unknown(from: &JsValue) -> JsValue {
    let mut v = JsValue::dirty_unknown();
    v.unwrapped = from.unwrapped;
    v
}

fn is_statement_kind(node: &SyntaxNode) -> bool {
    matches!(
        node.kind,
        NodeKind::Program { .. }
            | NodeKind::EmptyStatement
            | NodeKind::ExpressionStatement { .. }
            | NodeKind::BlockStatement { .. }
            | NodeKind::IfStatement { .. }
            | NodeKind::LabeledStatement { .. }
            | NodeKind::BreakStatement
            | NodeKind::ContinueStatement
            | NodeKind::WithStatement { .. }
            | NodeKind::SwitchStatement { .. }
            | NodeKind::SwitchCase { .. }
            | NodeKind::ReturnStatement { .. }
            | NodeKind::ThrowStatement { .. }
            | NodeKind::TryStatement { .. }
            | NodeKind::CatchClause { .. }
            | NodeKind::WhileStatement { .. }
            | NodeKind::DoWhileStatement { .. }
            | NodeKind::ForStatement { .. }
            | NodeKind::ForInStatement { .. }
            | NodeKind::VariableDeclaration { .. }
            | NodeKind::VariableDeclarator { .. }
            | NodeKind::FunctionDeclaration { .. }
    )
}
