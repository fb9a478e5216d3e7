//! Construction helpers for program-tree nodes.
//!
//! External collaborators (the parser, quasi-quote expanders) and the test
//! suite build trees through these helpers so every node gets a fresh id.
//! All helpers use `Span::default()`; callers that track real source
//! positions set `node.span` afterwards.

use super::{
    BinOpKind, CompClause, CompKind, Keyword, Literal, Node, NodeKind, Params, Span, WithItem,
};

fn node(kind: NodeKind) -> Node {
    Node::new(kind, Span::default())
}

pub fn module(body: Vec<Node>) -> Node {
    node(NodeKind::Module { body })
}

pub fn name(ident: &str) -> Node {
    node(NodeKind::Name {
        ident: ident.to_string(),
    })
}

pub fn num(value: f64) -> Node {
    node(NodeKind::Literal(Literal::Number(value)))
}

pub fn str(value: &str) -> Node {
    node(NodeKind::Literal(Literal::Str(value.to_string())))
}

pub fn bool(value: bool) -> Node {
    node(NodeKind::Literal(Literal::Bool(value)))
}

pub fn none() -> Node {
    node(NodeKind::Literal(Literal::None))
}

pub fn tuple(elts: Vec<Node>) -> Node {
    node(NodeKind::TupleExpr { elts })
}

pub fn list(elts: Vec<Node>) -> Node {
    node(NodeKind::ListExpr { elts })
}

pub fn attribute(value: Node, attr: &str) -> Node {
    node(NodeKind::Attribute {
        value: Box::new(value),
        attr: attr.to_string(),
    })
}

pub fn subscript(value: Node, index: Node) -> Node {
    node(NodeKind::Subscript {
        value: Box::new(value),
        index: Box::new(index),
    })
}

pub fn call(func: Node, args: Vec<Node>) -> Node {
    node(NodeKind::Call {
        func: Box::new(func),
        args,
        keywords: vec![],
    })
}

pub fn call_kw(func: Node, args: Vec<Node>, keywords: Vec<(&str, Node)>) -> Node {
    node(NodeKind::Call {
        func: Box::new(func),
        args,
        keywords: keywords
            .into_iter()
            .map(|(arg, value)| Keyword {
                arg: arg.to_string(),
                value,
            })
            .collect(),
    })
}

pub fn binop(op: BinOpKind, left: Node, right: Node) -> Node {
    node(NodeKind::BinOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn assign(target: Node, value: Node) -> Node {
    node(NodeKind::Assign {
        targets: vec![target],
        value: Box::new(value),
    })
}

pub fn assign_many(targets: Vec<Node>, value: Node) -> Node {
    node(NodeKind::Assign {
        targets,
        value: Box::new(value),
    })
}

pub fn expr_stmt(value: Node) -> Node {
    node(NodeKind::ExprStmt {
        value: Box::new(value),
    })
}

pub fn ret(value: Option<Node>) -> Node {
    node(NodeKind::Return {
        value: value.map(Box::new),
    })
}

/// Positional-only parameter list.
pub fn params(args: &[&str]) -> Params {
    Params {
        args: args.iter().map(|a| a.to_string()).collect(),
        defaults: vec![],
        vararg: None,
        kwarg: None,
    }
}

pub fn function_def(name: &str, params: Params, body: Vec<Node>) -> Node {
    node(NodeKind::FunctionDef {
        name: name.to_string(),
        params,
        body,
    })
}

pub fn lambda(params: Params, body: Node) -> Node {
    node(NodeKind::Lambda {
        params,
        body: Box::new(body),
    })
}

pub fn class_def(name: &str, bases: Vec<Node>, body: Vec<Node>) -> Node {
    node(NodeKind::ClassDef {
        name: name.to_string(),
        bases,
        body,
    })
}

pub fn if_stmt(test: Node, body: Vec<Node>, orelse: Vec<Node>) -> Node {
    node(NodeKind::If {
        test: Box::new(test),
        body,
        orelse,
    })
}

pub fn for_loop(target: Node, iter: Node, body: Vec<Node>) -> Node {
    node(NodeKind::For {
        target: Box::new(target),
        iter: Box::new(iter),
        body,
        orelse: vec![],
    })
}

pub fn while_loop(test: Node, body: Vec<Node>) -> Node {
    node(NodeKind::While {
        test: Box::new(test),
        body,
    })
}

pub fn with_block(items: Vec<(Node, Option<Node>)>, body: Vec<Node>) -> Node {
    node(NodeKind::With {
        items: items
            .into_iter()
            .map(|(context_expr, target)| WithItem {
                context_expr,
                target,
            })
            .collect(),
        body,
    })
}

pub fn try_stmt(body: Vec<Node>, handlers: Vec<Node>) -> Node {
    node(NodeKind::Try {
        body,
        handlers,
        orelse: vec![],
        finalbody: vec![],
    })
}

pub fn except_handler(typ: Option<Node>, name: Option<&str>, body: Vec<Node>) -> Node {
    node(NodeKind::ExceptHandler {
        typ: typ.map(Box::new),
        name: name.map(|n| n.to_string()),
        body,
    })
}

pub fn comp_clause(target: Node, iter: Node, ifs: Vec<Node>) -> CompClause {
    CompClause { target, iter, ifs }
}

pub fn comprehension(kind: CompKind, elt: Node, generators: Vec<CompClause>) -> Node {
    node(NodeKind::Comprehension {
        kind,
        elt: Box::new(elt),
        generators,
    })
}

pub fn dict_comp(key: Node, value: Node, generators: Vec<CompClause>) -> Node {
    node(NodeKind::DictComp {
        key: Box::new(key),
        value: Box::new(value),
        generators,
    })
}
