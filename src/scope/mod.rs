//! Lexical name-binding analysis layered over the generic walker.
//!
//! [`Scoped`] wraps a visitor so that every visit receives, as its keyword
//! context, the [`Scope`] of names lexically bound at that point in the
//! tree. The wrapper is plain composition: a scope-computing closure runs
//! before the wrapped visitor and attaches extended scopes to the children
//! that open a new binding region (function bodies, class bodies,
//! comprehension clauses, exception handlers, loop and with targets).
//!
//! Scopes are persistent `im` maps. Extension always builds a new map, so
//! sibling subtrees keep the unextended scope; a binding introduced for one
//! child is invisible to the child's siblings.

use im::HashMap;

use crate::ast::{CompClause, Node, NodeId, NodeKind, Params};
use crate::walker::{Action, Walk, Walker};
use crate::MantraError;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Names visible at one point of the tree, mapped to the binding that
/// introduced each. Inner bindings shadow outer ones of the same name.
pub type Scope = HashMap<String, Binding>;

/// What introduced a name into scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Assignment,
    Function,
    Class,
    Param,
    LoopTarget,
    ExceptName,
    WithTarget,
    CompTarget,
}

/// A single scope entry: the node that bound the name and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub node: NodeId,
    pub kind: BindingKind,
}

impl Binding {
    pub fn new(node: NodeId, kind: BindingKind) -> Self {
        Binding { node, kind }
    }
}

// ============================================================================
// BINDING SCANS
// ============================================================================

/// Collects the names a target expression binds, left to right. Attribute
/// and subscript roots bind nothing and are not descended into: `a.b = ...`
/// rebinds no name, and neither does `a[i] = ...`.
pub fn bound_names(node: &Node) -> Result<Vec<(String, NodeId)>, MantraError> {
    name_scan().collect(node)
}

/// [`bound_names`] over an ordered node sequence, into one list.
pub fn bound_names_all(nodes: &[Node]) -> Result<Vec<(String, NodeId)>, MantraError> {
    name_scan().collect_all(nodes)
}

fn name_scan() -> Walker<(String, NodeId)> {
    Walker::new(|node, walk, _ctx| {
        match &node.kind {
            NodeKind::Attribute { .. } | NodeKind::Subscript { .. } => walk.stop(),
            NodeKind::Name { ident } => walk.collect((ident.clone(), node.id)),
            _ => {}
        }
        Ok(Action::Keep)
    })
}

/// Scans a block for hoisted bindings: assignment targets plus nested
/// function/class definitions. The scan collects a nested def's own name
/// but never descends into its interior, so inner assignments stay out of
/// the outer scope.
pub fn hoisted_scope(node: &Node) -> Result<Scope, MantraError> {
    Ok(scope_from(hoist_scan().collect(node)?))
}

/// [`hoisted_scope`] over a statement sequence (a block body).
pub fn hoisted_scope_all(nodes: &[Node]) -> Result<Scope, MantraError> {
    Ok(scope_from(hoist_scan().collect_all(nodes)?))
}

fn hoist_scan() -> Walker<(String, Binding)> {
    Walker::new(|node, walk, _ctx| {
        match &node.kind {
            NodeKind::FunctionDef { name, .. } => {
                walk.collect((name.clone(), Binding::new(node.id, BindingKind::Function)));
                walk.stop();
            }
            NodeKind::ClassDef { name, .. } => {
                walk.collect((name.clone(), Binding::new(node.id, BindingKind::Class)));
                walk.stop();
            }
            NodeKind::Assign { targets, .. } => {
                for (name, id) in bound_names_all(targets)? {
                    walk.collect((name, Binding::new(id, BindingKind::Assignment)));
                }
            }
            _ => {}
        }
        Ok(Action::Keep)
    })
}

fn scope_from(pairs: Vec<(String, Binding)>) -> Scope {
    pairs.into_iter().collect()
}

// ============================================================================
// SCOPED WALKER
// ============================================================================

/// A walker whose visitor always sees the current lexical scope as its
/// context. Built by wrapping the visitor, not by inheriting from the
/// walker: the scope pass runs first, attaches extended scopes to the
/// relevant children, then delegates.
pub struct Scoped<C = ()>
where
    C: 'static,
{
    walker: Walker<C, Scope>,
}

impl<C: 'static> Scoped<C> {
    pub fn new(
        inner: impl Fn(&Node, &mut Walk<'_, C, Scope>, &Scope) -> Result<Action, MantraError>
            + 'static,
    ) -> Self {
        Scoped {
            walker: Walker::new(wrap_with_scope(inner)),
        }
    }

    /// Scoped walker with a post-order visitor. Only the pre-order pass
    /// computes scope extensions; the post visitor sees the same scope the
    /// node itself was visited with.
    pub fn with_post(
        pre: impl Fn(&Node, &mut Walk<'_, C, Scope>, &Scope) -> Result<Action, MantraError>
            + 'static,
        post: impl Fn(&Node, &mut Walk<'_, C, Scope>, &Scope) -> Result<Action, MantraError>
            + 'static,
    ) -> Self {
        Scoped {
            walker: Walker::with_post(wrap_with_scope(pre), post),
        }
    }

    /// Full traversal. The root scope is the hoisted-binding scan of the
    /// root node itself.
    pub fn recurse(&self, node: Node) -> Result<Node, MantraError> {
        let scope = hoisted_scope(&node)?;
        self.walker.recurse_with(node, scope)
    }

    /// Full traversal from an externally supplied initial scope.
    pub fn recurse_with(&self, node: Node, scope: Scope) -> Result<Node, MantraError> {
        self.walker.recurse_with(node, scope)
    }

    /// Full traversal returning the rewritten root and the accumulator.
    pub fn recurse_collect(&self, node: Node, scope: Scope) -> Result<(Node, Vec<C>), MantraError> {
        self.walker.recurse_collect(node, scope)
    }

    /// Collection-only traversal; the tree is left untouched.
    pub fn collect(&self, node: &Node) -> Result<Vec<C>, MantraError> {
        let scope = hoisted_scope(node)?;
        self.walker.collect_with(node, scope)
    }
}

/// Builds the visitor that computes child scopes before delegating.
fn wrap_with_scope<C: 'static>(
    inner: impl Fn(&Node, &mut Walk<'_, C, Scope>, &Scope) -> Result<Action, MantraError> + 'static,
) -> impl Fn(&Node, &mut Walk<'_, C, Scope>, &Scope) -> Result<Action, MantraError> {
    move |node, walk, scope| {
        extend_children(node, scope, walk)?;
        inner(node, walk, scope)
    }
}

// ------------------------------------------------------------------------
// Per-node scope extension
// ------------------------------------------------------------------------

/// Attaches extended scopes to the children of `node` that open a new
/// binding region. Every extension builds a fresh map; the parent scope is
/// never mutated.
fn extend_children<C>(
    node: &Node,
    scope: &Scope,
    walk: &mut Walk<'_, C, Scope>,
) -> Result<(), MantraError> {
    match &node.kind {
        NodeKind::Lambda { params, body } => {
            let ext = merge(scope, &param_scope(params, node.id));
            walk.set_ctx_for(body.id, ext);
        }
        NodeKind::FunctionDef { name, params, body } => {
            // The signature (parameter defaults) sees the function's own
            // name, for recursion, but not the parameters themselves.
            let own = scope.update(
                name.clone(),
                Binding::new(node.id, BindingKind::Function),
            );
            for default in &params.defaults {
                walk.set_ctx_for(default.id, own.clone());
            }
            let body_scope = merge(
                &merge(&own, &param_scope(params, node.id)),
                &hoisted_scope_all(body)?,
            );
            set_ctx_for_all(walk, body, &body_scope);
        }
        NodeKind::ClassDef { name, bases, body } => {
            // A class cannot see itself while its bases are evaluated, nor
            // from inside its own body; the name only binds in the
            // enclosing scope.
            let without_self = scope.without(name);
            for base in bases {
                walk.set_ctx_for(base.id, without_self.clone());
            }
            let body_scope = merge(scope, &hoisted_scope_all(body)?).without(name);
            set_ctx_for_all(walk, body, &body_scope);
        }
        NodeKind::Comprehension {
            elt, generators, ..
        } => {
            let result_scope = thread_clauses(scope, generators, walk)?;
            walk.set_ctx_for(elt.id, result_scope);
        }
        NodeKind::DictComp {
            key,
            value,
            generators,
        } => {
            let result_scope = thread_clauses(scope, generators, walk)?;
            walk.set_ctx_for(key.id, result_scope.clone());
            walk.set_ctx_for(value.id, result_scope);
        }
        NodeKind::ExceptHandler {
            name: Some(name),
            body,
            ..
        } => {
            let ext = scope.update(
                name.clone(),
                Binding::new(node.id, BindingKind::ExceptName),
            );
            set_ctx_for_all(walk, body, &ext);
        }
        NodeKind::For { target, body, .. } => {
            let mut ext = scope.clone();
            for (name, id) in bound_names(target)? {
                ext.insert(name, Binding::new(id, BindingKind::LoopTarget));
            }
            set_ctx_for_all(walk, body, &ext);
        }
        NodeKind::With { items, body } => {
            let mut ext = scope.clone();
            for item in items {
                let Some(target) = &item.target else {
                    continue;
                };
                for (name, id) in bound_names(target)? {
                    ext.insert(name, Binding::new(id, BindingKind::WithTarget));
                }
            }
            set_ctx_for_all(walk, body, &ext);
        }
        _ => {}
    }
    Ok(())
}

/// Threads comprehension clauses left to right: each clause's target and
/// iterable see the targets of the clauses to their left, the clause's own
/// conditions additionally see its own target, and the returned scope (for
/// the result expression) sees all of them.
fn thread_clauses<C>(
    scope: &Scope,
    generators: &[CompClause],
    walk: &mut Walk<'_, C, Scope>,
) -> Result<Scope, MantraError> {
    let mut iter_vars = Scope::new();
    for clause in generators {
        let seen = merge(scope, &iter_vars);
        walk.set_ctx_for(clause.target.id, seen.clone());
        walk.set_ctx_for(clause.iter.id, seen);
        for (name, id) in bound_names(&clause.target)? {
            iter_vars.insert(name, Binding::new(id, BindingKind::CompTarget));
        }
        let with_own = merge(scope, &iter_vars);
        for cond in &clause.ifs {
            walk.set_ctx_for(cond.id, with_own.clone());
        }
    }
    Ok(merge(scope, &iter_vars))
}

/// Right-biased scope merge: entries of `ext` shadow entries of `base`.
fn merge(base: &Scope, ext: &Scope) -> Scope {
    ext.clone().union(base.clone())
}

/// Parameter names (positional, var-positional, var-keyword) as bindings
/// attributed to the defining node.
fn param_scope(params: &Params, owner: NodeId) -> Scope {
    params
        .names()
        .map(|name| {
            (
                name.to_string(),
                Binding::new(owner, BindingKind::Param),
            )
        })
        .collect()
}

fn set_ctx_for_all<C>(walk: &mut Walk<'_, C, Scope>, nodes: &[Node], scope: &Scope) {
    for node in nodes {
        walk.set_ctx_for(node.id, scope.clone());
    }
}
