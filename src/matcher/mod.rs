//! Structural pattern matching over runtime values.
//!
//! A [`Matcher`] is a tree of sub-matchers mirroring the shape it accepts.
//! Matching is pure: [`Matcher::match_value`] either returns the full set of
//! variable [`Bindings`] or a [`MantraError::MatchFailure`] describing the
//! first structural mismatch, and never mutates the matcher or the value.
//! Callers branch on the failure to implement switch-style dispatch.
//!
//! Composite matchers enforce one structural rule at construction time:
//! sibling sub-matchers must bind disjoint variable names. Violations are
//! [`MantraError::PatternConflict`], raised before any value is ever seen.

pub mod compile;
pub mod value;

use crate::diagnostics::{match_failure, variable_conflict};
use crate::MantraError;

pub use compile::compile_pattern;
pub use value::{Record, TypeRegistry, TypeSpec, UnapplyFn, Value};

// ============================================================================
// BINDINGS
// ============================================================================

/// Variable bindings produced by a successful match, in binding order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bindings {
    pairs: Vec<(String, Value)>,
}

impl Bindings {
    /// The value bound to `name`, if the pattern bound it.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.pairs
            .iter()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.pairs.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl From<Vec<(String, Value)>> for Bindings {
    fn from(pairs: Vec<(String, Value)>) -> Self {
        Bindings { pairs }
    }
}

// ============================================================================
// MATCHERS
// ============================================================================

/// A compiled structural pattern.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Matches exactly one value, binds nothing.
    Literal(Value),
    /// Matches any value, binds it to the variable.
    Name(String),
    /// Matches any value. Reserves the name `_` and records a fixed
    /// placeholder binding instead of the matched value, so two wildcards
    /// under one composite conflict like two uses of the same variable.
    Wildcard,
    /// Matches a tuple of the same length, element-wise.
    Tuple(Vec<Matcher>),
    /// Matches a list of the same length, element-wise.
    List(Vec<Matcher>),
    /// Matches when both branches match; bindings are concatenated.
    Parallel(Box<Matcher>, Box<Matcher>),
    /// Matches a record of a declared type by destructuring its fields.
    Class(ClassMatcher),
}

/// Record destructuring: positional sub-matchers line up with the type's
/// declared field order, keyword sub-matchers address fields by name.
#[derive(Debug, Clone)]
pub struct ClassMatcher {
    spec: TypeSpec,
    positional: Vec<Matcher>,
    keyword: Vec<(String, Matcher)>,
}

impl Matcher {
    pub fn literal(value: impl Into<Value>) -> Matcher {
        Matcher::Literal(value.into())
    }

    pub fn name(name: &str) -> Matcher {
        Matcher::Name(name.to_string())
    }

    pub fn wildcard() -> Matcher {
        Matcher::Wildcard
    }

    /// Element-wise tuple matcher. Fails construction if the elements bind
    /// overlapping variable names.
    pub fn tuple(elements: Vec<Matcher>) -> Result<Matcher, MantraError> {
        check_disjoint(&elements)?;
        Ok(Matcher::Tuple(elements))
    }

    /// Element-wise list matcher. Fails construction if the elements bind
    /// overlapping variable names.
    pub fn list(elements: Vec<Matcher>) -> Result<Matcher, MantraError> {
        check_disjoint(&elements)?;
        Ok(Matcher::List(elements))
    }

    /// Conjunction of two matchers over the same value. Fails construction
    /// if the branches bind overlapping variable names.
    pub fn parallel(left: Matcher, right: Matcher) -> Result<Matcher, MantraError> {
        check_disjoint(&[left.clone(), right.clone()])?;
        Ok(Matcher::Parallel(Box::new(left), Box::new(right)))
    }

    /// Record destructuring matcher for the type described by `spec`.
    /// Fails construction if the sub-matchers bind overlapping names.
    pub fn class(
        spec: TypeSpec,
        positional: Vec<Matcher>,
        keyword: Vec<(String, Matcher)>,
    ) -> Result<Matcher, MantraError> {
        let mut all: Vec<&Matcher> = positional.iter().collect();
        all.extend(keyword.iter().map(|(_, m)| m));
        check_disjoint_refs(&all)?;
        Ok(Matcher::Class(ClassMatcher {
            spec,
            positional,
            keyword,
        }))
    }

    /// Every variable name this matcher can bind, in binding order.
    /// Wildcards report the reserved name `_`.
    pub fn var_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_var_names(&mut names);
        names
    }

    fn collect_var_names<'m>(&'m self, names: &mut Vec<&'m str>) {
        match self {
            Matcher::Literal(_) => {}
            Matcher::Name(name) => names.push(name),
            Matcher::Wildcard => names.push("_"),
            Matcher::Tuple(elements) | Matcher::List(elements) => {
                for element in elements {
                    element.collect_var_names(names);
                }
            }
            Matcher::Parallel(left, right) => {
                left.collect_var_names(names);
                right.collect_var_names(names);
            }
            Matcher::Class(class) => {
                for element in &class.positional {
                    element.collect_var_names(names);
                }
                for (_, element) in &class.keyword {
                    element.collect_var_names(names);
                }
            }
        }
    }

    /// Matches `value`, returning all bindings on success or the first
    /// structural mismatch as a recoverable failure.
    pub fn match_value(&self, value: &Value) -> Result<Bindings, MantraError> {
        let mut pairs = Vec::new();
        self.match_into(value, &mut pairs)?;
        Ok(Bindings { pairs })
    }

    fn match_into(
        &self,
        value: &Value,
        pairs: &mut Vec<(String, Value)>,
    ) -> Result<(), MantraError> {
        match self {
            Matcher::Literal(expected) => {
                if expected == value {
                    Ok(())
                } else {
                    Err(match_failure(format!(
                        "value {} does not equal literal {}",
                        value, expected
                    )))
                }
            }
            Matcher::Name(name) => {
                pairs.push((name.clone(), value.clone()));
                Ok(())
            }
            Matcher::Wildcard => {
                // Placeholder, not the matched value.
                pairs.push(("_".to_string(), Value::None));
                Ok(())
            }
            Matcher::Tuple(elements) => {
                let Value::Tuple(items) = value else {
                    return Err(match_failure(format!(
                        "expected a tuple, got {} ({})",
                        value,
                        value.type_name()
                    )));
                };
                match_elements("tuple", elements, items, pairs)
            }
            Matcher::List(elements) => {
                let Value::List(items) = value else {
                    return Err(match_failure(format!(
                        "expected a list, got {} ({})",
                        value,
                        value.type_name()
                    )));
                };
                match_elements("list", elements, items, pairs)
            }
            Matcher::Parallel(left, right) => {
                left.match_into(value, pairs)?;
                right.match_into(value, pairs)
            }
            Matcher::Class(class) => class.match_into(value, pairs),
        }
    }
}

impl ClassMatcher {
    pub fn type_name(&self) -> &str {
        &self.spec.name
    }

    fn match_into(
        &self,
        value: &Value,
        pairs: &mut Vec<(String, Value)>,
    ) -> Result<(), MantraError> {
        let Value::Record(record) = value else {
            return Err(match_failure(format!(
                "expected an instance of {}, got {} ({})",
                self.spec.name,
                value,
                value.type_name()
            )));
        };
        if record.type_name != self.spec.name {
            return Err(match_failure(format!(
                "expected an instance of {}, got an instance of {}",
                self.spec.name, record.type_name
            )));
        }
        let kw_keys: Vec<String> = self.keyword.iter().map(|(key, _)| key.clone()).collect();
        let (pos_values, kw_values) = self.spec.unapply(record, self.positional.len(), &kw_keys)?;
        if pos_values.len() != self.positional.len() {
            return Err(match_failure(format!(
                "{} deconstructed into {} positional values, pattern has {} sub-patterns",
                self.spec.name,
                pos_values.len(),
                self.positional.len()
            )));
        }
        for (matcher, field_value) in self.positional.iter().zip(&pos_values) {
            matcher.match_into(field_value, pairs)?;
        }
        for (key, matcher) in &self.keyword {
            let Some((_, field_value)) = kw_values.iter().find(|(k, _)| k == key) else {
                return Err(match_failure(format!(
                    "keyword match failed: no attribute '{}' on {}",
                    key, value
                )));
            };
            matcher.match_into(field_value, pairs)?;
        }
        Ok(())
    }
}

fn match_elements(
    what: &str,
    elements: &[Matcher],
    items: &[Value],
    pairs: &mut Vec<(String, Value)>,
) -> Result<(), MantraError> {
    if elements.len() != items.len() {
        return Err(match_failure(format!(
            "{} length mismatch: pattern has {} elements, value has {}",
            what,
            elements.len(),
            items.len()
        )));
    }
    for (element, item) in elements.iter().zip(items) {
        element.match_into(item, pairs)?;
    }
    Ok(())
}

// ============================================================================
// CONSTRUCTION-TIME DISJOINTNESS
// ============================================================================

fn check_disjoint(matchers: &[Matcher]) -> Result<(), MantraError> {
    let refs: Vec<&Matcher> = matchers.iter().collect();
    check_disjoint_refs(&refs)
}

fn check_disjoint_refs(matchers: &[&Matcher]) -> Result<(), MantraError> {
    let mut seen: Vec<&str> = Vec::new();
    for matcher in matchers {
        for name in matcher.var_names() {
            if seen.contains(&name) {
                return Err(variable_conflict(name));
            }
            seen.push(name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod matcher_unit_tests {
    use super::*;

    #[test]
    fn name_binds_the_whole_value() {
        let m = Matcher::name("x");
        let bindings = m.match_value(&Value::Number(5.0)).unwrap();
        assert_eq!(bindings.get("x"), Some(&Value::Number(5.0)));
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn literal_mismatch_is_recoverable() {
        let m = Matcher::literal(1.0);
        let err = m.match_value(&Value::Number(2.0)).unwrap_err();
        assert!(err.is_match_failure());
    }

    #[test]
    fn tuple_binds_left_to_right() {
        let m = Matcher::tuple(vec![
            Matcher::name("a"),
            Matcher::literal(2.0),
            Matcher::name("b"),
        ])
        .unwrap();
        let value = Value::Tuple(vec![1.0.into(), 2.0.into(), 3.0.into()]);
        let bindings = m.match_value(&value).unwrap();
        let collected: Vec<_> = bindings.iter().map(|(n, _)| n.to_string()).collect();
        assert_eq!(collected, vec!["a", "b"]);
        assert_eq!(bindings.get("b"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn duplicate_names_rejected_at_construction() {
        let err = Matcher::tuple(vec![Matcher::name("x"), Matcher::name("x")]).unwrap_err();
        assert_eq!(
            err.error_type(),
            crate::diagnostics::ErrorType::PatternConflict
        );
    }

    #[test]
    fn nested_duplicates_also_rejected() {
        let inner = Matcher::tuple(vec![Matcher::name("x"), Matcher::name("y")]).unwrap();
        let err = Matcher::list(vec![inner, Matcher::name("y")]).unwrap_err();
        assert!(err.to_string().contains("'y'"));
    }

    #[test]
    fn two_wildcards_conflict_on_the_reserved_name() {
        // The reserved name `_` counts as a binding, so two wildcards under
        // one composite collide exactly like two uses of one variable.
        let err = Matcher::tuple(vec![Matcher::wildcard(), Matcher::wildcard()]).unwrap_err();
        assert!(err.to_string().contains("'_'"));
    }

    #[test]
    fn wildcard_binds_placeholder_not_value() {
        let m = Matcher::tuple(vec![Matcher::wildcard(), Matcher::name("x")]).unwrap();
        let value = Value::Tuple(vec![7.0.into(), 8.0.into()]);
        let bindings = m.match_value(&value).unwrap();
        assert_eq!(bindings.get("_"), Some(&Value::None));
        assert_eq!(bindings.get("x"), Some(&Value::Number(8.0)));
    }

    #[test]
    fn parallel_requires_both_branches() {
        let m = Matcher::parallel(
            Matcher::name("whole"),
            Matcher::tuple(vec![Matcher::name("first"), Matcher::wildcard()]).unwrap(),
        )
        .unwrap();
        let value = Value::Tuple(vec![1.0.into(), 2.0.into()]);
        let bindings = m.match_value(&value).unwrap();
        assert_eq!(bindings.get("whole"), Some(&value));
        assert_eq!(bindings.get("first"), Some(&Value::Number(1.0)));

        let err = m.match_value(&Value::Number(3.0)).unwrap_err();
        assert!(err.is_match_failure());
    }

    #[test]
    fn class_matches_positionally_in_declared_field_order() {
        let spec = TypeSpec::new("Point", &["x", "y"]);
        let m = Matcher::class(spec, vec![Matcher::name("px"), Matcher::name("py")], vec![])
            .unwrap();
        let point = Value::Record(Record::new(
            "Point",
            vec![("y", 2.0.into()), ("x", 1.0.into())],
        ));
        let bindings = m.match_value(&point).unwrap();
        assert_eq!(bindings.get("px"), Some(&Value::Number(1.0)));
        assert_eq!(bindings.get("py"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn class_rejects_wrong_type_name() {
        let spec = TypeSpec::new("Point", &["x", "y"]);
        let m = Matcher::class(spec, vec![Matcher::wildcard()], vec![]).unwrap();
        let other = Value::Record(Record::new("Size", vec![("x", 1.0.into())]));
        let err = m.match_value(&other).unwrap_err();
        assert!(err.is_match_failure());
        assert!(err.to_string().contains("Point"));
    }

    #[test]
    fn class_keyword_subpatterns_address_fields_by_name() {
        let spec = TypeSpec::new("Point", &["x", "y"]);
        let m = Matcher::class(
            spec,
            vec![],
            vec![("y".to_string(), Matcher::name("vertical"))],
        )
        .unwrap();
        let point = Value::Record(Record::new(
            "Point",
            vec![("x", 1.0.into()), ("y", 2.0.into())],
        ));
        let bindings = m.match_value(&point).unwrap();
        assert_eq!(bindings.get("vertical"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn class_rejects_excess_positional_patterns() {
        let spec = TypeSpec::new("Point", &["x", "y"]);
        let m = Matcher::class(
            spec,
            vec![Matcher::name("a"), Matcher::name("b"), Matcher::name("c")],
            vec![],
        )
        .unwrap();
        let point = Value::Record(Record::new(
            "Point",
            vec![("x", 1.0.into()), ("y", 2.0.into())],
        ));
        let err = m.match_value(&point).unwrap_err();
        assert!(err.is_match_failure());
    }

    #[test]
    fn failed_match_leaves_no_observable_state() {
        let m = Matcher::tuple(vec![Matcher::name("a"), Matcher::literal(9.0)]).unwrap();
        let bad = Value::Tuple(vec![1.0.into(), 2.0.into()]);
        assert!(m.match_value(&bad).is_err());
        // A later match against the same matcher starts clean.
        let good = Value::Tuple(vec![5.0.into(), 9.0.into()]);
        let bindings = m.match_value(&good).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings.get("a"), Some(&Value::Number(5.0)));
    }
}
