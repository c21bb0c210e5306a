//! WHERE-clause and argument-marker text for parameterized statements.
//!
//! Predicates express optional filters: only truthy values restrict the
//! result, so `0`, `""`, `false` and null leave a field unfiltered. Marker
//! lists express required call arguments and include every value.

use crate::model::{FieldMap, Value};

/// `WHERE a.x = ? and a.y = ?` plus its arguments, or empty when nothing qualifies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    pub clause: String,
    pub args: Vec<Value>,
}

impl Predicate {
    pub fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }
}

/// `?, ?, ?` plus the values in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Markers {
    pub text: String,
    pub args: Vec<Value>,
}

pub fn build_predicate(fields: &FieldMap, alias: Option<&str>) -> Predicate {
    predicate_from(
        fields.iter().filter(|(_, value)| value.is_truthy()),
        alias,
    )
}

/// Like [`build_predicate`] but keeps falsy values, so every key restricts the match.
pub fn build_key_predicate(keys: &FieldMap, alias: Option<&str>) -> Predicate {
    predicate_from(keys.iter(), alias)
}

fn predicate_from<'a, I>(entries: I, alias: Option<&str>) -> Predicate
where
    I: Iterator<Item = (&'a String, &'a Value)>,
{
    let prefix = alias.map(|a| format!("{a}.")).unwrap_or_default();
    let mut terms = Vec::new();
    let mut args = Vec::new();
    for (key, value) in entries {
        terms.push(format!("{prefix}{key} = ?"));
        args.push(value.clone());
    }
    if terms.is_empty() {
        return Predicate::default();
    }
    Predicate {
        clause: format!("WHERE {}", terms.join(" and ")),
        args,
    }
}

pub fn build_markers(values: &FieldMap) -> Markers {
    Markers {
        text: marker_list(values.len()),
        args: values.values().cloned().collect(),
    }
}

pub fn marker_list(count: usize) -> String {
    vec!["?"; count].join(", ")
}
