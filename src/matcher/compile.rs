//! Compiles pattern-shaped expression trees into [`Matcher`]s.
//!
//! Rewrite passes hand the left side of a case-clause here as an ordinary
//! expression node; this module interprets the expression grammar as a
//! pattern grammar. Only a small subset of expression shapes is
//! recognizable as a pattern; anything else is a fatal
//! [`MantraError::Pattern`] carrying the offending node's span.

use crate::ast::{BinOpKind, Literal, Node, NodeKind};
use crate::diagnostics::pattern_error;
use crate::matcher::value::{TypeRegistry, Value};
use crate::matcher::Matcher;
use crate::MantraError;

/// Interprets `node` as a pattern. Recognized shapes:
///
/// - literals become [`Matcher::Literal`]
/// - the name `_` becomes [`Matcher::Wildcard`]; any other name becomes
///   a binding [`Matcher::Name`]
/// - tuple and list displays become element-wise matchers
/// - `p & q` becomes [`Matcher::Parallel`]
/// - `Type(p, .., key=q, ..)` becomes [`Matcher::Class`] for a type
///   registered in `registry`
pub fn compile_pattern(node: &Node, registry: &TypeRegistry) -> Result<Matcher, MantraError> {
    match &node.kind {
        NodeKind::Literal(lit) => Ok(Matcher::Literal(literal_value(lit))),
        NodeKind::Name { ident } if ident == "_" => Ok(Matcher::wildcard()),
        NodeKind::Name { ident } => Ok(Matcher::name(ident)),
        NodeKind::TupleExpr { elts } => Matcher::tuple(compile_all(elts, registry)?),
        NodeKind::ListExpr { elts } => Matcher::list(compile_all(elts, registry)?),
        NodeKind::BinOp {
            op: BinOpKind::BitAnd,
            left,
            right,
        } => Matcher::parallel(
            compile_pattern(left, registry)?,
            compile_pattern(right, registry)?,
        ),
        NodeKind::Call {
            func,
            args,
            keywords,
        } => {
            let NodeKind::Name { ident } = &func.kind else {
                return Err(pattern_error(
                    format!("pattern constructor must be a plain name: {}", func.pretty()),
                    Some(func.span),
                ));
            };
            let Some(spec) = registry.get(ident) else {
                return Err(pattern_error(
                    format!("unknown pattern type '{}'", ident),
                    Some(func.span),
                ));
            };
            let positional = compile_all(args, registry)?;
            let mut keyword = Vec::with_capacity(keywords.len());
            for kw in keywords {
                keyword.push((kw.arg.clone(), compile_pattern(&kw.value, registry)?));
            }
            Matcher::class(spec.clone(), positional, keyword)
        }
        _ => Err(pattern_error(
            format!("not a recognizable pattern: {}", node.pretty()),
            Some(node.span),
        )),
    }
}

fn compile_all(nodes: &[Node], registry: &TypeRegistry) -> Result<Vec<Matcher>, MantraError> {
    nodes
        .iter()
        .map(|node| compile_pattern(node, registry))
        .collect()
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Number(n) => Value::Number(*n),
        Literal::Str(s) => Value::String(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::None => Value::None,
    }
}
