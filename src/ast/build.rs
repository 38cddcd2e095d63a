//! Hand-built syntax trees for tests. Mirrors what the engine would produce
//! for small programs without needing the external process.

use super::{LiteralValue, NodeKind, SyntaxNode, VarKind};

pub fn node(kind: NodeKind) -> SyntaxNode {
    SyntaxNode {
        kind,
        line: 1,
        column: 0,
    }
}

pub fn at(mut n: SyntaxNode, line: u32, column: u32) -> SyntaxNode {
    n.line = line;
    n.column = column;
    n
}

pub fn program(body: Vec<SyntaxNode>) -> SyntaxNode {
    node(NodeKind::Program { body })
}

pub fn block(body: Vec<SyntaxNode>) -> SyntaxNode {
    node(NodeKind::BlockStatement { body })
}

pub fn expr_stmt(expression: SyntaxNode) -> SyntaxNode {
    node(NodeKind::ExpressionStatement {
        expression: Box::new(expression),
    })
}

pub fn ident(name: &str) -> SyntaxNode {
    node(NodeKind::Identifier { name: name.into() })
}

pub fn lit_str(value: &str) -> SyntaxNode {
    node(NodeKind::Literal {
        value: Some(LiteralValue::Str(value.into())),
    })
}

pub fn lit_num(value: f64) -> SyntaxNode {
    node(NodeKind::Literal {
        value: Some(LiteralValue::Num(value)),
    })
}

pub fn lit_bool(value: bool) -> SyntaxNode {
    node(NodeKind::Literal {
        value: Some(LiteralValue::Bool(value)),
    })
}

pub fn lit_null() -> SyntaxNode {
    node(NodeKind::Literal {
        value: Some(LiteralValue::Null),
    })
}

pub fn binop(operator: &str, left: SyntaxNode, right: SyntaxNode) -> SyntaxNode {
    node(NodeKind::BinaryExpression {
        operator: operator.into(),
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn assign(left: SyntaxNode, right: SyntaxNode) -> SyntaxNode {
    node(NodeKind::AssignmentExpression {
        operator: "=".into(),
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn var_decl(name: &str, init: Option<SyntaxNode>) -> SyntaxNode {
    node(NodeKind::VariableDeclaration {
        kind: VarKind::Var,
        declarations: vec![node(NodeKind::VariableDeclarator {
            id: Box::new(ident(name)),
            init: init.map(Box::new),
        })],
    })
}

pub fn func_decl(name: &str, params: &[&str], body: Vec<SyntaxNode>) -> SyntaxNode {
    node(NodeKind::FunctionDeclaration {
        name: name.into(),
        params: params.iter().map(|p| p.to_string()).collect(),
        body: Box::new(block(body)),
    })
}

pub fn func_expr(params: &[&str], body: Vec<SyntaxNode>) -> SyntaxNode {
    node(NodeKind::FunctionExpression {
        name: None,
        params: params.iter().map(|p| p.to_string()).collect(),
        body: Box::new(block(body)),
    })
}

pub fn call(callee: SyntaxNode, arguments: Vec<SyntaxNode>) -> SyntaxNode {
    node(NodeKind::CallExpression {
        callee: Box::new(callee),
        arguments,
    })
}

pub fn member(object: SyntaxNode, property: &str) -> SyntaxNode {
    node(NodeKind::MemberExpression {
        object: Box::new(object),
        property: Box::new(ident(property)),
        computed: false,
    })
}

pub fn member_computed(object: SyntaxNode, property: SyntaxNode) -> SyntaxNode {
    node(NodeKind::MemberExpression {
        object: Box::new(object),
        property: Box::new(property),
        computed: true,
    })
}

pub fn ret(argument: Option<SyntaxNode>) -> SyntaxNode {
    node(NodeKind::ReturnStatement {
        argument: argument.map(Box::new),
    })
}
