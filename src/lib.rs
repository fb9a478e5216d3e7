//! # Mantra
//!
//! Mantra is the rewriting core of a macro-expansion engine for a dynamic,
//! Python-shaped language. An external loader parses source into the program
//! tree defined in [`ast`], hands it to visitor passes built on the generic
//! [`walker`], and compiles whatever comes back. The [`scope`] module wraps
//! the walker so that every visit also sees the set of names lexically bound
//! at that point, and the [`matcher`] module provides the composable pattern
//! algebra that rewrite passes use to destructure runtime values.
//!
//! ## Pipeline position
//!
//! source text -> parse (external) -> [`scope::Scoped`] over [`walker::Walker`]
//! -> visitor callbacks using [`matcher`] -> rewritten tree -> compile (external)
//!
//! Import hooks, expanded-source caching, quasi-quote tree builders, and CLI
//! activation are external collaborators and live outside this crate.

pub use crate::ast::{Node, NodeId, Span};
pub use crate::diagnostics::{ErrorType, MantraError};

pub mod ast;
pub mod diagnostics;
pub mod matcher;
pub mod scope;
pub mod walker;
