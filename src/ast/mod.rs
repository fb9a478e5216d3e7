//! Program tree for the Mantra engine.
//!
//! The tree is a mutable, heterogeneous representation of a Python-shaped
//! surface language, produced by an external parser and rewritten in place
//! by walker passes. Every node carries a [`Span`] for source tracking and a
//! [`NodeId`] for identity.
//!
//! **Ownership invariant:** children are exclusively owned by their parent.
//! A subtree that must appear in two rewritten locations is duplicated with
//! [`Node::deep_copy`], which refreshes every id in the copy; plain `clone`
//! preserves ids and is reserved for read-only scans.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Represents a span in the source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Identity of a single tree node. Fresh ids come from a process-wide
/// counter; two nodes with the same id are the same node (or a structural
/// clone of it made for a read-only scan).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

impl NodeId {
    pub fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A single node of the program tree: identity, source span, and syntactic
/// kind. Equality is structural (span and kind); ids never participate, so
/// a rewritten tree can be compared against an expected shape directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub span: Span,
    pub kind: NodeKind,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.span == other.span && self.kind == other.kind
    }
}

/// Literal constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Number(f64),
    Str(String),
    Bool(bool),
    None,
}

/// Binary operators. `BitAnd` doubles as the parallel-pattern connective in
/// pattern position; `LShift` is the match operator in the surface macros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    LShift,
    BitAnd,
}

/// Function/lambda signature. `defaults` align with the trailing entries of
/// `args`, exactly as the surface grammar pairs them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Params {
    pub args: Vec<String>,
    pub defaults: Vec<Node>,
    pub vararg: Option<String>,
    pub kwarg: Option<String>,
}

impl Params {
    /// All parameter names in declaration order, including `*args`/`**kwargs`.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.args
            .iter()
            .map(|s| s.as_str())
            .chain(self.vararg.as_deref())
            .chain(self.kwarg.as_deref())
    }
}

/// One `for target in iter [if cond]*` clause of a comprehension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompClause {
    pub target: Node,
    pub iter: Node,
    pub ifs: Vec<Node>,
}

/// Comprehension flavor for the single-result-expression forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompKind {
    List,
    Set,
    Generator,
}

/// One `expr [as target]` item of a with block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithItem {
    pub context_expr: Node,
    pub target: Option<Node>,
}

/// A keyword argument at a call site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub arg: String,
    pub value: Node,
}

/// The closed set of syntactic kinds the engine rewrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Module {
        body: Vec<Node>,
    },
    Name {
        ident: String,
    },
    Literal(Literal),
    TupleExpr {
        elts: Vec<Node>,
    },
    ListExpr {
        elts: Vec<Node>,
    },
    Attribute {
        value: Box<Node>,
        attr: String,
    },
    Subscript {
        value: Box<Node>,
        index: Box<Node>,
    },
    Call {
        func: Box<Node>,
        args: Vec<Node>,
        keywords: Vec<Keyword>,
    },
    BinOp {
        op: BinOpKind,
        left: Box<Node>,
        right: Box<Node>,
    },
    Assign {
        targets: Vec<Node>,
        value: Box<Node>,
    },
    ExprStmt {
        value: Box<Node>,
    },
    Return {
        value: Option<Box<Node>>,
    },
    FunctionDef {
        name: String,
        params: Params,
        body: Vec<Node>,
    },
    Lambda {
        params: Params,
        body: Box<Node>,
    },
    ClassDef {
        name: String,
        bases: Vec<Node>,
        body: Vec<Node>,
    },
    If {
        test: Box<Node>,
        body: Vec<Node>,
        orelse: Vec<Node>,
    },
    For {
        target: Box<Node>,
        iter: Box<Node>,
        body: Vec<Node>,
        orelse: Vec<Node>,
    },
    While {
        test: Box<Node>,
        body: Vec<Node>,
    },
    With {
        items: Vec<WithItem>,
        body: Vec<Node>,
    },
    Try {
        body: Vec<Node>,
        handlers: Vec<Node>,
        orelse: Vec<Node>,
        finalbody: Vec<Node>,
    },
    ExceptHandler {
        typ: Option<Box<Node>>,
        name: Option<String>,
        body: Vec<Node>,
    },
    Comprehension {
        kind: CompKind,
        elt: Box<Node>,
        generators: Vec<CompClause>,
    },
    DictComp {
        key: Box<Node>,
        value: Box<Node>,
        generators: Vec<CompClause>,
    },
}

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl Node {
    /// Wraps a kind with a fresh id.
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Node {
            id: NodeId::fresh(),
            span,
            kind,
        }
    }

    /// Duplicates the subtree with fresh ids throughout. This is the
    /// copy-on-share rule: rewrites that re-inject a subtree in a second
    /// location must use this, never `clone`, or id-keyed context
    /// overrides would apply to both copies.
    pub fn deep_copy(&self) -> Node {
        let mut copy = self.clone();
        copy.refresh_ids();
        copy
    }

    fn refresh_ids(&mut self) {
        self.id = NodeId::fresh();
        self.for_each_child_mut(&mut |child| child.refresh_ids());
    }

    /// Applies `f` to every direct child node, in natural left-to-right
    /// order. Does not recurse; callers recurse inside `f` if they need to.
    pub fn for_each_child_mut(&mut self, f: &mut dyn FnMut(&mut Node)) {
        match &mut self.kind {
            NodeKind::Module { body } => body.iter_mut().for_each(&mut *f),
            NodeKind::Name { .. } | NodeKind::Literal(_) => {}
            NodeKind::TupleExpr { elts } | NodeKind::ListExpr { elts } => {
                elts.iter_mut().for_each(&mut *f)
            }
            NodeKind::Attribute { value, .. } => f(value),
            NodeKind::Subscript { value, index } => {
                f(value);
                f(index);
            }
            NodeKind::Call {
                func,
                args,
                keywords,
            } => {
                f(func);
                args.iter_mut().for_each(&mut *f);
                keywords.iter_mut().for_each(|kw| f(&mut kw.value));
            }
            NodeKind::BinOp { left, right, .. } => {
                f(left);
                f(right);
            }
            NodeKind::Assign { targets, value } => {
                targets.iter_mut().for_each(&mut *f);
                f(value);
            }
            NodeKind::ExprStmt { value } => f(value),
            NodeKind::Return { value } => {
                if let Some(value) = value {
                    f(value);
                }
            }
            NodeKind::FunctionDef { params, body, .. } => {
                params.defaults.iter_mut().for_each(&mut *f);
                body.iter_mut().for_each(&mut *f);
            }
            NodeKind::Lambda { params, body } => {
                params.defaults.iter_mut().for_each(&mut *f);
                f(body);
            }
            NodeKind::ClassDef { bases, body, .. } => {
                bases.iter_mut().for_each(&mut *f);
                body.iter_mut().for_each(&mut *f);
            }
            NodeKind::If { test, body, orelse } => {
                f(test);
                body.iter_mut().for_each(&mut *f);
                orelse.iter_mut().for_each(&mut *f);
            }
            NodeKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                f(target);
                f(iter);
                body.iter_mut().for_each(&mut *f);
                orelse.iter_mut().for_each(&mut *f);
            }
            NodeKind::While { test, body } => {
                f(test);
                body.iter_mut().for_each(&mut *f);
            }
            NodeKind::With { items, body } => {
                for item in items {
                    f(&mut item.context_expr);
                    if let Some(target) = &mut item.target {
                        f(target);
                    }
                }
                body.iter_mut().for_each(&mut *f);
            }
            NodeKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                body.iter_mut().for_each(&mut *f);
                handlers.iter_mut().for_each(&mut *f);
                orelse.iter_mut().for_each(&mut *f);
                finalbody.iter_mut().for_each(&mut *f);
            }
            NodeKind::ExceptHandler { typ, body, .. } => {
                if let Some(typ) = typ {
                    f(typ);
                }
                body.iter_mut().for_each(&mut *f);
            }
            NodeKind::Comprehension {
                elt, generators, ..
            } => {
                f(elt);
                for gen in generators.iter_mut() {
                    f(&mut gen.target);
                    f(&mut gen.iter);
                    gen.ifs.iter_mut().for_each(&mut *f);
                }
            }
            NodeKind::DictComp {
                key,
                value,
                generators,
            } => {
                f(key);
                f(value);
                for gen in generators.iter_mut() {
                    f(&mut gen.target);
                    f(&mut gen.iter);
                    gen.ifs.iter_mut().for_each(&mut *f);
                }
            }
        }
    }

    /// Pretty-prints the node as a compact s-expression, for diagnostics
    /// and test failure output.
    pub fn pretty(&self) -> String {
        match &self.kind {
            NodeKind::Module { body } => format!("(module {})", pretty_seq(body)),
            NodeKind::Name { ident } => ident.clone(),
            NodeKind::Literal(lit) => lit.pretty(),
            NodeKind::TupleExpr { elts } => format!("(tuple {})", pretty_seq(elts)),
            NodeKind::ListExpr { elts } => format!("(list {})", pretty_seq(elts)),
            NodeKind::Attribute { value, attr } => format!("(attr {} {})", value.pretty(), attr),
            NodeKind::Subscript { value, index } => {
                format!("(subscript {} {})", value.pretty(), index.pretty())
            }
            NodeKind::Call { func, args, .. } => {
                format!("(call {} {})", func.pretty(), pretty_seq(args))
            }
            NodeKind::BinOp { op, left, right } => {
                format!("({} {} {})", op.symbol(), left.pretty(), right.pretty())
            }
            NodeKind::Assign { targets, value } => {
                format!("(= {} {})", pretty_seq(targets), value.pretty())
            }
            NodeKind::ExprStmt { value } => format!("(expr {})", value.pretty()),
            NodeKind::Return { value } => match value {
                Some(v) => format!("(return {})", v.pretty()),
                None => "(return)".to_string(),
            },
            NodeKind::FunctionDef { name, params, body } => format!(
                "(def {} ({}) {})",
                name,
                params.names().collect::<Vec<_>>().join(" "),
                pretty_seq(body)
            ),
            NodeKind::Lambda { params, body } => format!(
                "(lambda ({}) {})",
                params.names().collect::<Vec<_>>().join(" "),
                body.pretty()
            ),
            NodeKind::ClassDef { name, bases, body } => format!(
                "(class {} ({}) {})",
                name,
                pretty_seq(bases),
                pretty_seq(body)
            ),
            NodeKind::If { test, .. } => format!("(if {} ...)", test.pretty()),
            NodeKind::For { target, iter, .. } => {
                format!("(for {} {} ...)", target.pretty(), iter.pretty())
            }
            NodeKind::While { test, .. } => format!("(while {} ...)", test.pretty()),
            NodeKind::With { items, .. } => format!("(with {} items ...)", items.len()),
            NodeKind::Try { handlers, .. } => format!("(try {} handlers ...)", handlers.len()),
            NodeKind::ExceptHandler { name, .. } => match name {
                Some(n) => format!("(except as {} ...)", n),
                None => "(except ...)".to_string(),
            },
            NodeKind::Comprehension { kind, elt, .. } => {
                let tag = match kind {
                    CompKind::List => "list-comp",
                    CompKind::Set => "set-comp",
                    CompKind::Generator => "gen-comp",
                };
                format!("({} {} ...)", tag, elt.pretty())
            }
            NodeKind::DictComp { key, value, .. } => {
                format!("(dict-comp {} {} ...)", key.pretty(), value.pretty())
            }
        }
    }
}

impl Literal {
    pub fn pretty(&self) -> String {
        match self {
            Literal::Number(n) => n.to_string(),
            Literal::Str(s) => format!("\"{}\"", s),
            Literal::Bool(b) => b.to_string(),
            Literal::None => "none".to_string(),
        }
    }
}

impl BinOpKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Div => "/",
            BinOpKind::LShift => "<<",
            BinOpKind::BitAnd => "&",
        }
    }
}

fn pretty_seq(nodes: &[Node]) -> String {
    nodes
        .iter()
        .map(|n| n.pretty())
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// MODULE EXPORTS
// ============================================================================

pub mod builder;
