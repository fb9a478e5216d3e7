//! End-to-end traversal behavior: rewriting, splicing, deletion, stop
//! control, context threading, and re-entrancy.

use mantra::ast::{builder as b, BinOpKind, NodeKind};
use mantra::walker::{Action, Walker};
use mantra::ErrorType;

#[test]
fn noop_walk_returns_an_equal_tree() {
    let walker: Walker = Walker::new(|_node, _walk, _ctx| Ok(Action::Keep));
    let tree = b::module(vec![
        b::assign(b::name("x"), b::num(1.0)),
        b::expr_stmt(b::call(b::name("f"), vec![b::name("x")])),
    ]);
    let original = tree.clone();
    let rewritten = walker.recurse(tree).unwrap();
    assert_eq!(rewritten, original);
    assert!(walker.collect(&original).unwrap().is_empty());
}

#[test]
fn replacement_rewrites_in_place() {
    // Rename every `x` to `y`.
    let walker: Walker = Walker::new(|node, _walk, _ctx| {
        if matches!(&node.kind, NodeKind::Name { ident } if ident == "x") {
            return Ok(Action::Replace(b::name("y")));
        }
        Ok(Action::Keep)
    });
    let tree = b::binop(BinOpKind::Add, b::name("x"), b::name("z"));
    let rewritten = walker.recurse(tree).unwrap();
    assert_eq!(rewritten, b::binop(BinOpKind::Add, b::name("y"), b::name("z")));
}

#[test]
fn replacement_children_are_still_visited() {
    // Replace the whole binop with a call, then rewrite the call's argument
    // in the same pass. The argument rewrite proves the replacement subtree
    // was recursed into.
    let walker: Walker = Walker::new(|node, _walk, _ctx| match &node.kind {
        NodeKind::BinOp { .. } => Ok(Action::Replace(b::call(
            b::name("add"),
            vec![b::name("old")],
        ))),
        NodeKind::Name { ident } if ident == "old" => Ok(Action::Replace(b::name("new"))),
        _ => Ok(Action::Keep),
    });
    let tree = b::binop(BinOpKind::Add, b::num(1.0), b::num(2.0));
    let rewritten = walker.recurse(tree).unwrap();
    assert_eq!(rewritten, b::call(b::name("add"), vec![b::name("new")]));
}

#[test]
fn splice_expands_statement_lists() {
    // Expand `x = 1` into the assignment plus a trace call after it.
    let walker: Walker = Walker::new(|node, _walk, _ctx| {
        if let NodeKind::Assign { targets, .. } = &node.kind {
            if matches!(&targets[0].kind, NodeKind::Name { ident } if ident == "x") {
                return Ok(Action::Splice(vec![
                    b::assign(b::name("x"), b::num(1.0)),
                    b::expr_stmt(b::call(b::name("trace"), vec![b::name("x")])),
                ]));
            }
        }
        Ok(Action::Keep)
    });
    let tree = b::module(vec![
        b::assign(b::name("x"), b::num(1.0)),
        b::assign(b::name("y"), b::num(2.0)),
    ]);
    let rewritten = walker.recurse(tree).unwrap();
    let NodeKind::Module { body } = &rewritten.kind else {
        panic!("module expected");
    };
    assert_eq!(body.len(), 3);
    assert!(matches!(&body[1].kind, NodeKind::ExprStmt { .. }));
}

#[test]
fn deletion_drops_sequence_elements() {
    // Strip every bare expression statement.
    let walker: Walker = Walker::new(|node, _walk, _ctx| {
        if matches!(node.kind, NodeKind::ExprStmt { .. }) {
            return Ok(Action::Delete);
        }
        Ok(Action::Keep)
    });
    let tree = b::module(vec![
        b::expr_stmt(b::str("docstring")),
        b::assign(b::name("x"), b::num(1.0)),
        b::expr_stmt(b::name("x")),
    ]);
    let rewritten = walker.recurse(tree).unwrap();
    let NodeKind::Module { body } = &rewritten.kind else {
        panic!("module expected");
    };
    assert_eq!(body.len(), 1);
    assert!(matches!(&body[0].kind, NodeKind::Assign { .. }));
}

#[test]
fn splice_into_required_position_aborts() {
    let walker: Walker = Walker::new(|node, _walk, _ctx| {
        if matches!(node.kind, NodeKind::Literal(_)) {
            return Ok(Action::Splice(vec![b::num(1.0), b::num(2.0)]));
        }
        Ok(Action::Keep)
    });
    let tree = b::assign(b::name("x"), b::num(0.0));
    let err = walker.recurse(tree).unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Traversal);
    assert!(err.span().is_some());
}

#[test]
fn stop_suppresses_descent() {
    // Collect names, but never look inside function bodies.
    let walker: Walker<String> = Walker::new(|node, walk, _ctx| {
        match &node.kind {
            NodeKind::FunctionDef { .. } => walk.stop(),
            NodeKind::Name { ident } => walk.collect(ident.clone()),
            _ => {}
        }
        Ok(Action::Keep)
    });
    let tree = b::module(vec![
        b::expr_stmt(b::name("outer")),
        b::function_def("f", b::params(&[]), vec![b::expr_stmt(b::name("inner"))]),
    ]);
    let names = walker.collect(&tree).unwrap();
    assert_eq!(names, vec!["outer"]);
}

#[test]
fn collect_flattens_across_the_whole_walk() {
    let walker: Walker<String> = Walker::new(|node, walk, _ctx| {
        if let NodeKind::Name { ident } = &node.kind {
            walk.collect(ident.clone());
        }
        Ok(Action::Keep)
    });
    let tree = b::call(b::name("f"), vec![b::name("a"), b::name("b")]);
    let names = walker.collect(&tree).unwrap();
    assert_eq!(names, vec!["f", "a", "b"]);
    // Collection does not disturb the tree.
    assert!(matches!(tree.kind, NodeKind::Call { .. }));
}

#[test]
fn post_visitor_rewrites_after_children() {
    // Pre-order renames operands; the post-order pass then folds the binop
    // whose operands were already renamed, proving it ran second.
    let walker: Walker = Walker::with_post(
        |node, _walk, _ctx| {
            if matches!(&node.kind, NodeKind::Name { ident } if ident == "a") {
                return Ok(Action::Replace(b::name("b")));
            }
            Ok(Action::Keep)
        },
        |node, _walk, _ctx| {
            if let NodeKind::BinOp { left, right, .. } = &node.kind {
                let both_b = [left, right].iter().all(
                    |n| matches!(&n.kind, NodeKind::Name { ident } if ident == "b"),
                );
                if both_b {
                    return Ok(Action::Replace(b::call(b::name("double"), vec![b::name("b")])));
                }
            }
            Ok(Action::Keep)
        },
    );
    let tree = b::expr_stmt(b::binop(BinOpKind::Add, b::name("a"), b::name("b")));
    let rewritten = walker.recurse(tree).unwrap();
    assert_eq!(
        rewritten,
        b::expr_stmt(b::call(b::name("double"), vec![b::name("b")]))
    );
}

#[test]
fn context_overrides_reach_descendants() {
    // Mark function bodies with a label; every node below the body sees it.
    let walker: Walker<(String, String), String> = Walker::new(|node, walk, ctx| {
        if let NodeKind::FunctionDef { body, .. } = &node.kind {
            for stmt in body {
                walk.set_ctx_for(stmt.id, "inside".to_string());
            }
        }
        if let NodeKind::Name { ident } = &node.kind {
            walk.collect((ident.clone(), ctx.clone()));
        }
        Ok(Action::Keep)
    });
    let tree = b::module(vec![
        b::expr_stmt(b::name("top")),
        b::function_def("f", b::params(&[]), vec![b::expr_stmt(b::name("deep"))]),
    ]);
    let seen = walker.collect(&tree).unwrap();
    let ctx_of = |wanted: &str| {
        seen.iter()
            .find(|(name, _)| name == wanted)
            .map(|(_, ctx)| ctx.clone())
            .unwrap()
    };
    assert_eq!(ctx_of("top"), "");
    assert_eq!(ctx_of("deep"), "inside");
}

#[test]
fn later_context_override_wins() {
    let walker: Walker<String, String> = Walker::new(|node, walk, ctx| {
        if let NodeKind::ExprStmt { value } = &node.kind {
            walk.set_ctx_for(value.id, "first".to_string());
            walk.set_ctx_for(value.id, "second".to_string());
        }
        if matches!(node.kind, NodeKind::Name { .. }) {
            walk.collect(ctx.clone());
        }
        Ok(Action::Keep)
    });
    let tree = b::expr_stmt(b::name("x"));
    let seen = walker.collect(&tree).unwrap();
    assert_eq!(seen, vec!["second"]);
}

#[test]
fn visitors_may_run_nested_traversals() {
    // While one traversal is rewriting, its visitor runs a second,
    // collection-only traversal over the subtree it is looking at.
    let walker: Walker = Walker::new(|node, _walk, _ctx| {
        if let NodeKind::FunctionDef { body, .. } = &node.kind {
            let counter: Walker<()> = Walker::new(|inner, walk, _ctx| {
                if matches!(inner.kind, NodeKind::Name { .. }) {
                    walk.collect(());
                }
                Ok(Action::Keep)
            });
            let count = counter.collect_all(body).unwrap().len();
            let marker = b::assign(b::name("name_count"), b::num(count as f64));
            let NodeKind::FunctionDef { name, params, body } = node.kind.clone() else {
                unreachable!();
            };
            let mut new_body = vec![marker];
            new_body.extend(body);
            return Ok(Action::Replace(b::function_def(&name, params, new_body)));
        }
        Ok(Action::Keep)
    });
    let tree = b::function_def(
        "f",
        b::params(&["a"]),
        vec![b::expr_stmt(b::binop(
            BinOpKind::Add,
            b::name("a"),
            b::name("a"),
        ))],
    );
    let rewritten = walker.recurse(tree).unwrap();
    let NodeKind::FunctionDef { body, .. } = &rewritten.kind else {
        panic!("function expected");
    };
    assert_eq!(body.len(), 2);
    // The inserted marker itself contains names; the nested count saw 2,
    // then the outer walk revisits the new body. The count reflects the
    // original body only.
    let NodeKind::Assign { value, .. } = &body[0].kind else {
        panic!("marker expected");
    };
    assert_eq!(**value, b::num(2.0));
}

#[test]
fn overrides_follow_ids_across_deep_copies() {
    // An override keyed on the original subtree does not leak onto a
    // deep copy, whose ids are fresh.
    let probe = b::name("probe");
    let probe_id = probe.id;
    let copy = probe.deep_copy();
    let tree = b::module(vec![b::expr_stmt(probe), b::expr_stmt(copy)]);

    let walker: Walker<String, String> = Walker::new(move |node, walk, ctx| {
        if matches!(node.kind, NodeKind::Module { .. }) {
            walk.set_ctx_for(probe_id, "tagged".to_string());
        }
        if matches!(node.kind, NodeKind::Name { .. }) {
            walk.collect(ctx.clone());
        }
        Ok(Action::Keep)
    });
    let seen = walker.collect(&tree).unwrap();
    assert_eq!(seen, vec!["tagged".to_string(), "".to_string()]);
}
