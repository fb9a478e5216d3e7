//! Generic tree walker for the Mantra engine.
//!
//! A [`Walker`] owns a pre-order visitor (and optionally a post-order one)
//! and traverses a program tree by value, rebuilding each node around the
//! possibly-rewritten children. At every node the visitor receives the node,
//! a [`Walk`] control handle, and the keyword context threaded down from the
//! parent, and answers with an [`Action`]: keep the node, replace it, splice
//! a sequence in its place, or delete it.
//!
//! Splice and delete are legal only where the parent holds a sequence or an
//! optional child; in a required single-child position they abort the whole
//! traversal. There is no partial-result recovery: any error surfaced from a
//! visitor or from an illegal rewrite leaves the tree unusable and must be
//! treated as aborting the expansion.
//!
//! Traversal state (the `collect` accumulator, the per-node context
//! overrides) lives in a per-call structure, never in the `Walker` itself,
//! so a visitor may freely run nested traversals over subtrees without
//! corrupting the traversal that invoked it.

use std::collections::HashMap;

use crate::ast::{Node, NodeId, NodeKind};
use crate::diagnostics::traversal_error;
use crate::MantraError;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// What the visitor wants done with the node it was shown.
#[derive(Debug)]
pub enum Action {
    /// Leave the node in place (children are still recursed into).
    Keep,
    /// Substitute a single replacement node; its children are then visited.
    Replace(Node),
    /// Substitute a sequence of nodes (statement-list contexts only).
    Splice(Vec<Node>),
    /// Remove the node from its parent.
    Delete,
}

/// Visitor callable: inspects a node, drives the [`Walk`] controls, and
/// returns the rewrite action. Errors abort the traversal.
pub type Visitor<C, K> =
    Box<dyn Fn(&Node, &mut Walk<'_, C, K>, &K) -> Result<Action, MantraError>>;

/// Per-traversal state shared by every visit of one `recurse`/`collect`
/// call.
struct Traversal<C, K> {
    collected: Vec<C>,
    overrides: HashMap<NodeId, K>,
}

impl<C, K> Traversal<C, K> {
    fn new() -> Self {
        Traversal {
            collected: Vec::new(),
            overrides: HashMap::new(),
        }
    }
}

/// Control handle passed to visitors.
pub struct Walk<'t, C, K> {
    stopped: bool,
    traversal: &'t mut Traversal<C, K>,
}

impl<C, K> Walk<'_, C, K> {
    /// Suppresses recursion into the current node's children.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Appends a value to the accumulator returned by the current
    /// traversal invocation.
    pub fn collect(&mut self, value: C) {
        self.traversal.collected.push(value);
    }

    /// Overrides the context that `node` (identified by id) and its
    /// descendants will see. Later calls for the same id win.
    pub fn set_ctx_for(&mut self, node: NodeId, ctx: K) {
        self.traversal.overrides.insert(node, ctx);
    }
}

/// Outcome of walking one node, as seen by its parent.
enum Rewrite {
    One(Node),
    Many(Vec<Node>),
    Removed,
}

/// A reusable traversal engine: a pre-order visitor, an optional post-order
/// visitor, and nothing else. `C` is the element type of the `collect`
/// accumulator; `K` is the keyword context cloned down the tree.
pub struct Walker<C = (), K = ()>
where
    C: 'static,
    K: 'static,
{
    pre: Visitor<C, K>,
    post: Option<Visitor<C, K>>,
}

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl<C: 'static, K: Clone + 'static> Walker<C, K> {
    pub fn new(
        pre: impl Fn(&Node, &mut Walk<'_, C, K>, &K) -> Result<Action, MantraError> + 'static,
    ) -> Self {
        Walker {
            pre: Box::new(pre),
            post: None,
        }
    }

    /// Registers a second visitor invoked after a node's children have been
    /// processed; it may perform a second rewrite pass.
    pub fn with_post(
        pre: impl Fn(&Node, &mut Walk<'_, C, K>, &K) -> Result<Action, MantraError> + 'static,
        post: impl Fn(&Node, &mut Walk<'_, C, K>, &K) -> Result<Action, MantraError> + 'static,
    ) -> Self {
        Walker {
            pre: Box::new(pre),
            post: Some(Box::new(post)),
        }
    }

    /// Full traversal: returns the possibly-rewritten root. The root itself
    /// may be replaced but not spliced or deleted.
    pub fn recurse(&self, node: Node) -> Result<Node, MantraError>
    where
        K: Default,
    {
        self.recurse_with(node, K::default())
    }

    /// Full traversal with an explicit root context.
    pub fn recurse_with(&self, node: Node, ctx: K) -> Result<Node, MantraError> {
        let (node, _) = self.recurse_collect(node, ctx)?;
        Ok(node)
    }

    /// Full traversal returning both the rewritten root and the accumulator.
    pub fn recurse_collect(&self, node: Node, ctx: K) -> Result<(Node, Vec<C>), MantraError> {
        let mut traversal = Traversal::new();
        let rewrite = self.walk_node(node, &ctx, &mut traversal)?;
        let Rewrite::One(node) = rewrite else {
            return Err(traversal_error(
                "root node cannot be spliced or deleted",
                None,
            ));
        };
        Ok((node, traversal.collected))
    }

    /// Collection-only traversal: runs the walk purely for its `collect`
    /// side effects over a structural clone and returns the flattened
    /// accumulator. The tree itself is left untouched.
    pub fn collect(&self, node: &Node) -> Result<Vec<C>, MantraError>
    where
        K: Default,
    {
        self.collect_with(node, K::default())
    }

    /// Collection-only traversal with an explicit root context.
    pub fn collect_with(&self, node: &Node, ctx: K) -> Result<Vec<C>, MantraError> {
        let (_, collected) = self.recurse_collect(node.clone(), ctx)?;
        Ok(collected)
    }

    /// Collection-only traversal over a node sequence, in order, into one
    /// accumulator.
    pub fn collect_all(&self, nodes: &[Node]) -> Result<Vec<C>, MantraError>
    where
        K: Default,
    {
        let ctx = K::default();
        let mut traversal = Traversal::new();
        for node in nodes {
            self.walk_node(node.clone(), &ctx, &mut traversal)?;
        }
        Ok(traversal.collected)
    }

    // ------------------------------------------------------------------------
    // Traversal core
    // ------------------------------------------------------------------------

    fn walk_node(
        &self,
        node: Node,
        ctx: &K,
        traversal: &mut Traversal<C, K>,
    ) -> Result<Rewrite, MantraError> {
        // A context override attached to this node wins over the context
        // propagated from the parent, for this visit and all descendants.
        let override_ctx = traversal.overrides.get(&node.id).cloned();
        let ctx = override_ctx.as_ref().unwrap_or(ctx);

        let mut walk = Walk {
            stopped: false,
            traversal,
        };
        let action = (self.pre)(&node, &mut walk, ctx)?;
        let stopped = walk.stopped;

        match action {
            Action::Keep => self.finish_node(node, stopped, ctx, traversal),
            Action::Replace(replacement) => self.finish_node(replacement, stopped, ctx, traversal),
            Action::Splice(nodes) => {
                let mut out = Vec::with_capacity(nodes.len());
                for node in nodes {
                    match self.finish_node(node, stopped, ctx, traversal)? {
                        Rewrite::One(n) => out.push(n),
                        Rewrite::Many(ns) => out.extend(ns),
                        Rewrite::Removed => {}
                    }
                }
                Ok(Rewrite::Many(out))
            }
            Action::Delete => Ok(Rewrite::Removed),
        }
    }

    /// Recurses into children (unless stopped) and runs the post-order
    /// visitor on the result.
    fn finish_node(
        &self,
        node: Node,
        stopped: bool,
        ctx: &K,
        traversal: &mut Traversal<C, K>,
    ) -> Result<Rewrite, MantraError> {
        let node = if stopped {
            node
        } else {
            self.walk_children(node, ctx, traversal)?
        };

        let Some(post) = &self.post else {
            return Ok(Rewrite::One(node));
        };
        let mut walk = Walk {
            stopped: false,
            traversal,
        };
        let action = post(&node, &mut walk, ctx)?;
        Ok(match action {
            Action::Keep => Rewrite::One(node),
            Action::Replace(replacement) => Rewrite::One(replacement),
            Action::Splice(nodes) => Rewrite::Many(nodes),
            Action::Delete => Rewrite::Removed,
        })
    }

    /// Rebuilds the node around its walked children, in natural
    /// left-to-right field order.
    fn walk_children(
        &self,
        node: Node,
        ctx: &K,
        traversal: &mut Traversal<C, K>,
    ) -> Result<Node, MantraError> {
        let Node { id, span, kind } = node;
        let kind = match kind {
            leaf @ (NodeKind::Name { .. } | NodeKind::Literal(_)) => leaf,
            NodeKind::Module { body } => NodeKind::Module {
                body: self.walk_seq(body, ctx, traversal)?,
            },
            NodeKind::TupleExpr { elts } => NodeKind::TupleExpr {
                elts: self.walk_seq(elts, ctx, traversal)?,
            },
            NodeKind::ListExpr { elts } => NodeKind::ListExpr {
                elts: self.walk_seq(elts, ctx, traversal)?,
            },
            NodeKind::Attribute { value, attr } => NodeKind::Attribute {
                value: self.walk_required(value, ctx, traversal, "attribute value")?,
                attr,
            },
            NodeKind::Subscript { value, index } => NodeKind::Subscript {
                value: self.walk_required(value, ctx, traversal, "subscript value")?,
                index: self.walk_required(index, ctx, traversal, "subscript index")?,
            },
            NodeKind::Call {
                func,
                args,
                keywords,
            } => NodeKind::Call {
                func: self.walk_required(func, ctx, traversal, "call target")?,
                args: self.walk_seq(args, ctx, traversal)?,
                keywords: keywords
                    .into_iter()
                    .map(|mut kw| {
                        kw.value = self.walk_one(kw.value, ctx, traversal, "keyword argument")?;
                        Ok(kw)
                    })
                    .collect::<Result<_, MantraError>>()?,
            },
            NodeKind::BinOp { op, left, right } => NodeKind::BinOp {
                op,
                left: self.walk_required(left, ctx, traversal, "operand")?,
                right: self.walk_required(right, ctx, traversal, "operand")?,
            },
            NodeKind::Assign { targets, value } => NodeKind::Assign {
                targets: self.walk_seq(targets, ctx, traversal)?,
                value: self.walk_required(value, ctx, traversal, "assignment value")?,
            },
            NodeKind::ExprStmt { value } => NodeKind::ExprStmt {
                value: self.walk_required(value, ctx, traversal, "expression statement")?,
            },
            NodeKind::Return { value } => NodeKind::Return {
                value: self.walk_opt(value, ctx, traversal)?,
            },
            NodeKind::FunctionDef { name, params, body } => NodeKind::FunctionDef {
                name,
                params: self.walk_params(params, ctx, traversal)?,
                body: self.walk_seq(body, ctx, traversal)?,
            },
            NodeKind::Lambda { params, body } => NodeKind::Lambda {
                params: self.walk_params(params, ctx, traversal)?,
                body: self.walk_required(body, ctx, traversal, "lambda body")?,
            },
            NodeKind::ClassDef { name, bases, body } => NodeKind::ClassDef {
                name,
                bases: self.walk_seq(bases, ctx, traversal)?,
                body: self.walk_seq(body, ctx, traversal)?,
            },
            NodeKind::If { test, body, orelse } => NodeKind::If {
                test: self.walk_required(test, ctx, traversal, "if test")?,
                body: self.walk_seq(body, ctx, traversal)?,
                orelse: self.walk_seq(orelse, ctx, traversal)?,
            },
            NodeKind::For {
                target,
                iter,
                body,
                orelse,
            } => NodeKind::For {
                target: self.walk_required(target, ctx, traversal, "loop target")?,
                iter: self.walk_required(iter, ctx, traversal, "loop iterable")?,
                body: self.walk_seq(body, ctx, traversal)?,
                orelse: self.walk_seq(orelse, ctx, traversal)?,
            },
            NodeKind::While { test, body } => NodeKind::While {
                test: self.walk_required(test, ctx, traversal, "while test")?,
                body: self.walk_seq(body, ctx, traversal)?,
            },
            NodeKind::With { items, body } => NodeKind::With {
                items: items
                    .into_iter()
                    .map(|mut item| {
                        item.context_expr =
                            self.walk_one(item.context_expr, ctx, traversal, "context manager")?;
                        item.target = self.walk_opt_node(item.target, ctx, traversal)?;
                        Ok(item)
                    })
                    .collect::<Result<_, MantraError>>()?,
                body: self.walk_seq(body, ctx, traversal)?,
            },
            NodeKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => NodeKind::Try {
                body: self.walk_seq(body, ctx, traversal)?,
                handlers: self.walk_seq(handlers, ctx, traversal)?,
                orelse: self.walk_seq(orelse, ctx, traversal)?,
                finalbody: self.walk_seq(finalbody, ctx, traversal)?,
            },
            NodeKind::ExceptHandler { typ, name, body } => NodeKind::ExceptHandler {
                typ: self.walk_opt(typ, ctx, traversal)?,
                name,
                body: self.walk_seq(body, ctx, traversal)?,
            },
            NodeKind::Comprehension {
                kind,
                elt,
                generators,
            } => NodeKind::Comprehension {
                kind,
                elt: self.walk_required(elt, ctx, traversal, "comprehension result")?,
                generators: self.walk_clauses(generators, ctx, traversal)?,
            },
            NodeKind::DictComp {
                key,
                value,
                generators,
            } => NodeKind::DictComp {
                key: self.walk_required(key, ctx, traversal, "comprehension key")?,
                value: self.walk_required(value, ctx, traversal, "comprehension value")?,
                generators: self.walk_clauses(generators, ctx, traversal)?,
            },
        };
        Ok(Node { id, span, kind })
    }

    // ------------------------------------------------------------------------
    // Child-field helpers
    // ------------------------------------------------------------------------

    /// Walks a required single-child field; splice and delete are illegal
    /// here and abort the traversal.
    fn walk_one(
        &self,
        node: Node,
        ctx: &K,
        traversal: &mut Traversal<C, K>,
        what: &str,
    ) -> Result<Node, MantraError> {
        let span = node.span;
        match self.walk_node(node, ctx, traversal)? {
            Rewrite::One(n) => Ok(n),
            Rewrite::Many(_) => Err(traversal_error(
                format!("cannot splice a node sequence into a {} position", what),
                Some(span),
            )),
            Rewrite::Removed => Err(traversal_error(
                format!("cannot delete a required {} child", what),
                Some(span),
            )),
        }
    }

    fn walk_required(
        &self,
        node: Box<Node>,
        ctx: &K,
        traversal: &mut Traversal<C, K>,
        what: &str,
    ) -> Result<Box<Node>, MantraError> {
        Ok(Box::new(self.walk_one(*node, ctx, traversal, what)?))
    }

    /// Walks an optional child; a missing child is a no-op and deletion
    /// clears the slot.
    fn walk_opt(
        &self,
        node: Option<Box<Node>>,
        ctx: &K,
        traversal: &mut Traversal<C, K>,
    ) -> Result<Option<Box<Node>>, MantraError> {
        Ok(self
            .walk_opt_node(node.map(|b| *b), ctx, traversal)?
            .map(Box::new))
    }

    fn walk_opt_node(
        &self,
        node: Option<Node>,
        ctx: &K,
        traversal: &mut Traversal<C, K>,
    ) -> Result<Option<Node>, MantraError> {
        let Some(node) = node else {
            return Ok(None);
        };
        let span = node.span;
        match self.walk_node(node, ctx, traversal)? {
            Rewrite::One(n) => Ok(Some(n)),
            Rewrite::Removed => Ok(None),
            Rewrite::Many(_) => Err(traversal_error(
                "cannot splice a node sequence into an optional child position",
                Some(span),
            )),
        }
    }

    /// Walks an ordered child sequence, flattening visitor splices and
    /// dropping deleted nodes.
    fn walk_seq(
        &self,
        nodes: Vec<Node>,
        ctx: &K,
        traversal: &mut Traversal<C, K>,
    ) -> Result<Vec<Node>, MantraError> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match self.walk_node(node, ctx, traversal)? {
                Rewrite::One(n) => out.push(n),
                Rewrite::Many(ns) => out.extend(ns),
                Rewrite::Removed => {}
            }
        }
        Ok(out)
    }

    fn walk_params(
        &self,
        mut params: crate::ast::Params,
        ctx: &K,
        traversal: &mut Traversal<C, K>,
    ) -> Result<crate::ast::Params, MantraError> {
        params.defaults = self.walk_seq(params.defaults, ctx, traversal)?;
        Ok(params)
    }

    fn walk_clauses(
        &self,
        clauses: Vec<crate::ast::CompClause>,
        ctx: &K,
        traversal: &mut Traversal<C, K>,
    ) -> Result<Vec<crate::ast::CompClause>, MantraError> {
        clauses
            .into_iter()
            .map(|mut clause| {
                clause.target =
                    self.walk_one(clause.target, ctx, traversal, "comprehension target")?;
                clause.iter =
                    self.walk_one(clause.iter, ctx, traversal, "comprehension iterable")?;
                clause.ifs = self.walk_seq(clause.ifs, ctx, traversal)?;
                Ok(clause)
            })
            .collect()
    }
}
