//! Syntax tree received from the engine process.
//!
//! The engine replies with one JSON document per parse in the Parser-API
//! shape (`{"type": "Program", "loc": {...}, ...}`). That document is
//! converted once into `SyntaxNode`, a closed sum type with named fields.
//! Node kinds the converter does not recognize become `Opaque` nodes that
//! keep their child subtrees, so unfamiliar AST shapes degrade to generic
//! child traversal instead of a conversion failure.

use serde_json::Value as Json;

/// A node of the syntax tree, tagged with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub line: u32,
    pub column: u32,
}

/// Exact value of a source literal.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

/// Declaration kind of a `var`/`let`/`const` statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Program {
        body: Vec<SyntaxNode>,
    },
    EmptyStatement,
    ExpressionStatement {
        expression: Box<SyntaxNode>,
    },
    BlockStatement {
        body: Vec<SyntaxNode>,
    },
    IfStatement {
        test: Box<SyntaxNode>,
        consequent: Box<SyntaxNode>,
        alternate: Option<Box<SyntaxNode>>,
    },
    LabeledStatement {
        body: Box<SyntaxNode>,
    },
    BreakStatement,
    ContinueStatement,
    WithStatement {
        object: Box<SyntaxNode>,
        body: Box<SyntaxNode>,
    },
    SwitchStatement {
        discriminant: Box<SyntaxNode>,
        cases: Vec<SyntaxNode>,
    },
    SwitchCase {
        test: Option<Box<SyntaxNode>>,
        consequent: Vec<SyntaxNode>,
    },
    ReturnStatement {
        argument: Option<Box<SyntaxNode>>,
    },
    ThrowStatement {
        argument: Box<SyntaxNode>,
    },
    TryStatement {
        block: Box<SyntaxNode>,
        handler: Option<Box<SyntaxNode>>,
        finalizer: Option<Box<SyntaxNode>>,
    },
    CatchClause {
        param: Option<Box<SyntaxNode>>,
        body: Box<SyntaxNode>,
    },
    WhileStatement {
        test: Box<SyntaxNode>,
        body: Box<SyntaxNode>,
    },
    DoWhileStatement {
        body: Box<SyntaxNode>,
        test: Box<SyntaxNode>,
    },
    ForStatement {
        init: Option<Box<SyntaxNode>>,
        test: Option<Box<SyntaxNode>>,
        update: Option<Box<SyntaxNode>>,
        body: Box<SyntaxNode>,
    },
    ForInStatement {
        left: Box<SyntaxNode>,
        right: Box<SyntaxNode>,
        body: Box<SyntaxNode>,
    },
    VariableDeclaration {
        kind: VarKind,
        declarations: Vec<SyntaxNode>,
    },
    VariableDeclarator {
        id: Box<SyntaxNode>,
        init: Option<Box<SyntaxNode>>,
    },
    FunctionDeclaration {
        name: String,
        params: Vec<String>,
        body: Box<SyntaxNode>,
    },
    /// Also covers arrow functions; the analyzer treats both the same way.
    FunctionExpression {
        name: Option<String>,
        params: Vec<String>,
        body: Box<SyntaxNode>,
    },
    SequenceExpression {
        expressions: Vec<SyntaxNode>,
    },
    ConditionalExpression {
        test: Box<SyntaxNode>,
        consequent: Box<SyntaxNode>,
        alternate: Box<SyntaxNode>,
    },
    UnaryExpression {
        operator: String,
        argument: Box<SyntaxNode>,
    },
    BinaryExpression {
        operator: String,
        left: Box<SyntaxNode>,
        right: Box<SyntaxNode>,
    },
    LogicalExpression {
        operator: String,
        left: Box<SyntaxNode>,
        right: Box<SyntaxNode>,
    },
    AssignmentExpression {
        operator: String,
        left: Box<SyntaxNode>,
        right: Box<SyntaxNode>,
    },
    UpdateExpression {
        argument: Box<SyntaxNode>,
    },
    NewExpression {
        callee: Box<SyntaxNode>,
        arguments: Vec<SyntaxNode>,
    },
    CallExpression {
        callee: Box<SyntaxNode>,
        arguments: Vec<SyntaxNode>,
    },
    MemberExpression {
        object: Box<SyntaxNode>,
        property: Box<SyntaxNode>,
        computed: bool,
    },
    ObjectExpression {
        properties: Vec<SyntaxNode>,
    },
    Property {
        key: Box<SyntaxNode>,
        value: Box<SyntaxNode>,
    },
    ArrayExpression {
        elements: Vec<SyntaxNode>,
    },
    Identifier {
        name: String,
    },
    /// `value` is `None` for literals the wire format cannot represent as a
    /// primitive (regex literals arrive as empty objects).
    Literal {
        value: Option<LiteralValue>,
    },
    ThisExpression,
    /// Unrecognized node kind. Children are every subtree found in its
    /// fields, in field order, so nested dangerous calls are still visited.
    Opaque {
        kind: String,
        children: Vec<SyntaxNode>,
    },
}

impl SyntaxNode {
    /// Convert one Parser-API JSON document into a `SyntaxNode`.
    /// Returns `None` if `json` is not an object carrying a `type` tag.
    pub fn from_json(json: &Json) -> Option<SyntaxNode> {
        let obj = json.as_object()?;
        let ty = obj.get("type")?.as_str()?;
        let (line, column) = position(json);

        let kind = match ty {
            "Program" => NodeKind::Program {
                body: node_list(json, "body"),
            },
            "EmptyStatement" => NodeKind::EmptyStatement,
            "ExpressionStatement" => NodeKind::ExpressionStatement {
                expression: req_node(json, "expression")?,
            },
            "BlockStatement" => NodeKind::BlockStatement {
                body: node_list(json, "body"),
            },
            "IfStatement" => NodeKind::IfStatement {
                test: req_node(json, "test")?,
                consequent: req_node(json, "consequent")?,
                alternate: opt_node(json, "alternate"),
            },
            "LabeledStatement" => NodeKind::LabeledStatement {
                body: req_node(json, "body")?,
            },
            "BreakStatement" => NodeKind::BreakStatement,
            "ContinueStatement" => NodeKind::ContinueStatement,
            "WithStatement" => NodeKind::WithStatement {
                object: req_node(json, "object")?,
                body: req_node(json, "body")?,
            },
            "SwitchStatement" => NodeKind::SwitchStatement {
                discriminant: req_node(json, "discriminant")?,
                cases: node_list(json, "cases"),
            },
            "SwitchCase" => NodeKind::SwitchCase {
                test: opt_node(json, "test"),
                consequent: node_list(json, "consequent"),
            },
            "ReturnStatement" => NodeKind::ReturnStatement {
                argument: opt_node(json, "argument"),
            },
            "ThrowStatement" => NodeKind::ThrowStatement {
                argument: req_node(json, "argument")?,
            },
            "TryStatement" => NodeKind::TryStatement {
                block: req_node(json, "block")?,
                // Older engines report a `handlers` array, newer a single
                // `handler` object.
                handler: opt_node(json, "handler")
                    .or_else(|| node_list(json, "handlers").into_iter().next().map(Box::new)),
                finalizer: opt_node(json, "finalizer"),
            },
            "CatchClause" => NodeKind::CatchClause {
                param: opt_node(json, "param"),
                body: req_node(json, "body")?,
            },
            "WhileStatement" => NodeKind::WhileStatement {
                test: req_node(json, "test")?,
                body: req_node(json, "body")?,
            },
            "DoWhileStatement" => NodeKind::DoWhileStatement {
                body: req_node(json, "body")?,
                test: req_node(json, "test")?,
            },
            "ForStatement" => NodeKind::ForStatement {
                init: opt_node(json, "init"),
                test: opt_node(json, "test"),
                update: opt_node(json, "update"),
                body: req_node(json, "body")?,
            },
            "ForInStatement" | "ForOfStatement" => NodeKind::ForInStatement {
                left: req_node(json, "left")?,
                right: req_node(json, "right")?,
                body: req_node(json, "body")?,
            },
            "VariableDeclaration" => NodeKind::VariableDeclaration {
                kind: match obj.get("kind").and_then(Json::as_str) {
                    Some("let") => VarKind::Let,
                    Some("const") => VarKind::Const,
                    _ => VarKind::Var,
                },
                declarations: node_list(json, "declarations"),
            },
            "VariableDeclarator" => NodeKind::VariableDeclarator {
                id: req_node(json, "id")?,
                init: opt_node(json, "init"),
            },
            "FunctionDeclaration" => NodeKind::FunctionDeclaration {
                name: identifier_name(obj.get("id")).unwrap_or_default(),
                params: param_names(json),
                body: req_node(json, "body")?,
            },
            "FunctionExpression" | "ArrowFunctionExpression" | "ArrowExpression" => {
                NodeKind::FunctionExpression {
                    name: identifier_name(obj.get("id")),
                    params: param_names(json),
                    body: req_node(json, "body")?,
                }
            }
            "SequenceExpression" => NodeKind::SequenceExpression {
                expressions: node_list(json, "expressions"),
            },
            "ConditionalExpression" => NodeKind::ConditionalExpression {
                test: req_node(json, "test")?,
                consequent: req_node(json, "consequent")?,
                alternate: req_node(json, "alternate")?,
            },
            "UnaryExpression" => NodeKind::UnaryExpression {
                operator: str_field(obj, "operator"),
                argument: req_node(json, "argument")?,
            },
            "BinaryExpression" => NodeKind::BinaryExpression {
                operator: str_field(obj, "operator"),
                left: req_node(json, "left")?,
                right: req_node(json, "right")?,
            },
            "LogicalExpression" => NodeKind::LogicalExpression {
                operator: str_field(obj, "operator"),
                left: req_node(json, "left")?,
                right: req_node(json, "right")?,
            },
            "AssignmentExpression" => NodeKind::AssignmentExpression {
                operator: str_field(obj, "operator"),
                left: req_node(json, "left")?,
                right: req_node(json, "right")?,
            },
            "UpdateExpression" => NodeKind::UpdateExpression {
                argument: req_node(json, "argument")?,
            },
            "NewExpression" => NodeKind::NewExpression {
                callee: req_node(json, "callee")?,
                arguments: node_list(json, "arguments"),
            },
            "CallExpression" => NodeKind::CallExpression {
                callee: req_node(json, "callee")?,
                arguments: node_list(json, "arguments"),
            },
            "MemberExpression" => NodeKind::MemberExpression {
                object: req_node(json, "object")?,
                property: req_node(json, "property")?,
                computed: obj.get("computed").and_then(Json::as_bool).unwrap_or(false),
            },
            "ObjectExpression" => NodeKind::ObjectExpression {
                properties: node_list(json, "properties"),
            },
            "Property" => NodeKind::Property {
                key: req_node(json, "key")?,
                value: req_node(json, "value")?,
            },
            "ArrayExpression" => NodeKind::ArrayExpression {
                elements: node_list(json, "elements"),
            },
            "Identifier" => NodeKind::Identifier {
                name: str_field(obj, "name"),
            },
            "Literal" => NodeKind::Literal {
                value: literal_value(obj.get("value")),
            },
            "ThisExpression" => NodeKind::ThisExpression,
            other => NodeKind::Opaque {
                kind: other.to_string(),
                children: collect_subtrees(json),
            },
        };

        Some(SyntaxNode { kind, line, column })
    }

    /// Tag name, mainly for logs.
    pub fn kind_name(&self) -> &str {
        match &self.kind {
            NodeKind::Program { .. } => "Program",
            NodeKind::EmptyStatement => "EmptyStatement",
            NodeKind::ExpressionStatement { .. } => "ExpressionStatement",
            NodeKind::BlockStatement { .. } => "BlockStatement",
            NodeKind::IfStatement { .. } => "IfStatement",
            NodeKind::LabeledStatement { .. } => "LabeledStatement",
            NodeKind::BreakStatement => "BreakStatement",
            NodeKind::ContinueStatement => "ContinueStatement",
            NodeKind::WithStatement { .. } => "WithStatement",
            NodeKind::SwitchStatement { .. } => "SwitchStatement",
            NodeKind::SwitchCase { .. } => "SwitchCase",
            NodeKind::ReturnStatement { .. } => "ReturnStatement",
            NodeKind::ThrowStatement { .. } => "ThrowStatement",
            NodeKind::TryStatement { .. } => "TryStatement",
            NodeKind::CatchClause { .. } => "CatchClause",
            NodeKind::WhileStatement { .. } => "WhileStatement",
            NodeKind::DoWhileStatement { .. } => "DoWhileStatement",
            NodeKind::ForStatement { .. } => "ForStatement",
            NodeKind::ForInStatement { .. } => "ForInStatement",
            NodeKind::VariableDeclaration { .. } => "VariableDeclaration",
            NodeKind::VariableDeclarator { .. } => "VariableDeclarator",
            NodeKind::FunctionDeclaration { .. } => "FunctionDeclaration",
            NodeKind::FunctionExpression { .. } => "FunctionExpression",
            NodeKind::SequenceExpression { .. } => "SequenceExpression",
            NodeKind::ConditionalExpression { .. } => "ConditionalExpression",
            NodeKind::UnaryExpression { .. } => "UnaryExpression",
            NodeKind::BinaryExpression { .. } => "BinaryExpression",
            NodeKind::LogicalExpression { .. } => "LogicalExpression",
            NodeKind::AssignmentExpression { .. } => "AssignmentExpression",
            NodeKind::UpdateExpression { .. } => "UpdateExpression",
            NodeKind::NewExpression { .. } => "NewExpression",
            NodeKind::CallExpression { .. } => "CallExpression",
            NodeKind::MemberExpression { .. } => "MemberExpression",
            NodeKind::ObjectExpression { .. } => "ObjectExpression",
            NodeKind::Property { .. } => "Property",
            NodeKind::ArrayExpression { .. } => "ArrayExpression",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::Literal { .. } => "Literal",
            NodeKind::ThisExpression => "ThisExpression",
            NodeKind::Opaque { kind, .. } => kind,
        }
    }

    /// All direct child nodes, used for generic traversal of constructs the
    /// dispatcher has no dedicated handler for.
    pub fn children(&self) -> Vec<&SyntaxNode> {
        fn one<'a>(out: &mut Vec<&'a SyntaxNode>, n: &'a SyntaxNode) {
            out.push(n);
        }
        fn opt<'a>(out: &mut Vec<&'a SyntaxNode>, n: &'a Option<Box<SyntaxNode>>) {
            if let Some(n) = n {
                out.push(n);
            }
        }
        fn many<'a>(out: &mut Vec<&'a SyntaxNode>, ns: &'a [SyntaxNode]) {
            out.extend(ns.iter());
        }

        let mut out = Vec::new();
        match &self.kind {
            NodeKind::Program { body } | NodeKind::BlockStatement { body } => many(&mut out, body),
            NodeKind::EmptyStatement
            | NodeKind::BreakStatement
            | NodeKind::ContinueStatement
            | NodeKind::Identifier { .. }
            | NodeKind::Literal { .. }
            | NodeKind::ThisExpression => {}
            NodeKind::ExpressionStatement { expression } => one(&mut out, expression),
            NodeKind::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                one(&mut out, test);
                one(&mut out, consequent);
                opt(&mut out, alternate);
            }
            NodeKind::LabeledStatement { body } => one(&mut out, body),
            NodeKind::WithStatement { object, body } => {
                one(&mut out, object);
                one(&mut out, body);
            }
            NodeKind::SwitchStatement {
                discriminant,
                cases,
            } => {
                one(&mut out, discriminant);
                many(&mut out, cases);
            }
            NodeKind::SwitchCase { test, consequent } => {
                opt(&mut out, test);
                many(&mut out, consequent);
            }
            NodeKind::ReturnStatement { argument } => opt(&mut out, argument),
            NodeKind::ThrowStatement { argument } => one(&mut out, argument),
            NodeKind::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                one(&mut out, block);
                opt(&mut out, handler);
                opt(&mut out, finalizer);
            }
            NodeKind::CatchClause { param, body } => {
                opt(&mut out, param);
                one(&mut out, body);
            }
            NodeKind::WhileStatement { test, body } => {
                one(&mut out, test);
                one(&mut out, body);
            }
            NodeKind::DoWhileStatement { body, test } => {
                one(&mut out, body);
                one(&mut out, test);
            }
            NodeKind::ForStatement {
                init,
                test,
                update,
                body,
            } => {
                opt(&mut out, init);
                opt(&mut out, test);
                opt(&mut out, update);
                one(&mut out, body);
            }
            NodeKind::ForInStatement { left, right, body } => {
                one(&mut out, left);
                one(&mut out, right);
                one(&mut out, body);
            }
            NodeKind::VariableDeclaration { declarations, .. } => many(&mut out, declarations),
            NodeKind::VariableDeclarator { id, init } => {
                one(&mut out, id);
                opt(&mut out, init);
            }
            NodeKind::FunctionDeclaration { body, .. } => one(&mut out, body),
            NodeKind::FunctionExpression { body, .. } => one(&mut out, body),
            NodeKind::SequenceExpression { expressions } => many(&mut out, expressions),
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                one(&mut out, test);
                one(&mut out, consequent);
                one(&mut out, alternate);
            }
            NodeKind::UnaryExpression { argument, .. }
            | NodeKind::UpdateExpression { argument } => one(&mut out, argument),
            NodeKind::BinaryExpression { left, right, .. }
            | NodeKind::LogicalExpression { left, right, .. }
            | NodeKind::AssignmentExpression { left, right, .. } => {
                one(&mut out, left);
                one(&mut out, right);
            }
            NodeKind::NewExpression { callee, arguments }
            | NodeKind::CallExpression { callee, arguments } => {
                one(&mut out, callee);
                many(&mut out, arguments);
            }
            NodeKind::MemberExpression {
                object, property, ..
            } => {
                one(&mut out, object);
                one(&mut out, property);
            }
            NodeKind::ObjectExpression { properties } => many(&mut out, properties),
            NodeKind::Property { key, value } => {
                one(&mut out, key);
                one(&mut out, value);
            }
            NodeKind::ArrayExpression { elements } => many(&mut out, elements),
            NodeKind::Opaque { children, .. } => many(&mut out, children),
        }
        out
    }
}

fn position(json: &Json) -> (u32, u32) {
    let start = json.pointer("/loc/start");
    let line = start
        .and_then(|s| s.get("line"))
        .and_then(Json::as_u64)
        .unwrap_or(0) as u32;
    let column = start
        .and_then(|s| s.get("column"))
        .and_then(Json::as_u64)
        .unwrap_or(0) as u32;
    (line, column)
}

fn req_node(json: &Json, field: &str) -> Option<Box<SyntaxNode>> {
    SyntaxNode::from_json(json.get(field)?).map(Box::new)
}

fn opt_node(json: &Json, field: &str) -> Option<Box<SyntaxNode>> {
    match json.get(field) {
        Some(v) if !v.is_null() => SyntaxNode::from_json(v).map(Box::new),
        _ => None,
    }
}

fn node_list(json: &Json, field: &str) -> Vec<SyntaxNode> {
    json.get(field)
        .and_then(Json::as_array)
        .map(|items| items.iter().filter_map(SyntaxNode::from_json).collect())
        .unwrap_or_default()
}

fn str_field(obj: &serde_json::Map<String, Json>, field: &str) -> String {
    obj.get(field)
        .and_then(Json::as_str)
        .unwrap_or_default()
        .to_string()
}

fn identifier_name(v: Option<&Json>) -> Option<String> {
    let v = v?;
    if v.get("type")?.as_str()? == "Identifier" {
        Some(v.get("name")?.as_str()?.to_string())
    } else {
        None
    }
}

/// Parameter names; destructuring patterns contribute nothing (their
/// bindings degrade to implicit globals, which the scope model tolerates).
fn param_names(json: &Json) -> Vec<String> {
    json.get("params")
        .and_then(Json::as_array)
        .map(|params| {
            params
                .iter()
                .filter_map(|p| identifier_name(Some(p)))
                .collect()
        })
        .unwrap_or_default()
}

fn literal_value(v: Option<&Json>) -> Option<LiteralValue> {
    match v? {
        Json::String(s) => Some(LiteralValue::Str(s.clone())),
        Json::Number(n) => n.as_f64().map(LiteralValue::Num),
        Json::Bool(b) => Some(LiteralValue::Bool(*b)),
        Json::Null => Some(LiteralValue::Null),
        _ => None,
    }
}

/// Depth-one sweep of an unknown node's fields for anything node-shaped.
fn collect_subtrees(json: &Json) -> Vec<SyntaxNode> {
    let mut out = Vec::new();
    if let Some(obj) = json.as_object() {
        for (field, value) in obj {
            if field == "loc" {
                continue;
            }
            match value {
                Json::Object(_) => {
                    if let Some(node) = SyntaxNode::from_json(value) {
                        out.push(node);
                    }
                }
                Json::Array(items) => {
                    out.extend(items.iter().filter_map(SyntaxNode::from_json));
                }
                _ => {}
            }
        }
    }
    out
}

#[cfg(test)]
pub mod build;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn converts_expression_statement_with_position() {
        let doc = json!({
            "type": "ExpressionStatement",
            "loc": {"start": {"line": 3, "column": 7}},
            "expression": {
                "type": "Literal",
                "loc": {"start": {"line": 3, "column": 7}},
                "value": 42
            }
        });
        let node = SyntaxNode::from_json(&doc).unwrap();
        assert_eq!(node.line, 3);
        assert_eq!(node.column, 7);
        match node.kind {
            NodeKind::ExpressionStatement { expression } => match expression.kind {
                NodeKind::Literal { value } => {
                    assert_eq!(value, Some(LiteralValue::Num(42.0)))
                }
                other => panic!("expected literal, got {other:?}"),
            },
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_becomes_opaque_with_children() {
        let doc = json!({
            "type": "YieldExpression",
            "argument": {"type": "Identifier", "name": "x"},
            "extras": [{"type": "Identifier", "name": "y"}]
        });
        let node = SyntaxNode::from_json(&doc).unwrap();
        match &node.kind {
            NodeKind::Opaque { kind, children } => {
                assert_eq!(kind, "YieldExpression");
                assert_eq!(children.len(), 2);
            }
            other => panic!("expected opaque, got {other:?}"),
        }
    }

    #[test]
    fn regex_literal_value_is_unrepresentable() {
        let doc = json!({"type": "Literal", "value": {}});
        let node = SyntaxNode::from_json(&doc).unwrap();
        assert_eq!(node.kind, NodeKind::Literal { value: None });
    }

    #[test]
    fn older_try_handlers_array_is_accepted() {
        let doc = json!({
            "type": "TryStatement",
            "block": {"type": "BlockStatement", "body": []},
            "handlers": [{
                "type": "CatchClause",
                "param": {"type": "Identifier", "name": "e"},
                "body": {"type": "BlockStatement", "body": []}
            }],
            "finalizer": null
        });
        let node = SyntaxNode::from_json(&doc).unwrap();
        match node.kind {
            NodeKind::TryStatement { handler, .. } => assert!(handler.is_some()),
            other => panic!("expected try, got {other:?}"),
        }
    }

    #[test]
    fn non_node_json_is_rejected() {
        assert!(SyntaxNode::from_json(&json!("just a string")).is_none());
        assert!(SyntaxNode::from_json(&json!({"no_type": true})).is_none());
    }

    #[test]
    fn children_cover_every_field_of_a_call() {
        let doc = json!({
            "type": "CallExpression",
            "callee": {"type": "Identifier", "name": "f"},
            "arguments": [
                {"type": "Literal", "value": 1},
                {"type": "Literal", "value": 2}
            ]
        });
        let node = SyntaxNode::from_json(&doc).unwrap();
        assert_eq!(node.children().len(), 3);
    }
}
