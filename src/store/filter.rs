//! Query vocabulary shared by every store implementation
//!
//! Filters and updates address top-level document fields only.

use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

/// A single predicate over a top-level field
#[derive(Debug, Clone)]
pub enum Condition {
    /// Field equals the value; `null` also matches a missing field
    Eq(String, Value),
    Ne(String, Value),
    /// Numeric field is greater than or equal to the bound
    Gte(String, f64),
    /// Field equals one of the values
    In(String, Vec<Value>),
    /// Case-insensitive substring match on a string field
    Contains(String, String),
    /// Array field does not contain the value (missing counts as empty)
    Lacks(String, Value),
    /// At least one of the nested filters matches
    AnyOf(Vec<Filter>),
}

/// Conjunction of conditions. An empty filter matches every document.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
}

fn to_value<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `Filter::new().eq("id", id)`
    pub fn by_id<T: Serialize>(id: T) -> Self {
        Self::new().eq("id", id)
    }

    pub fn eq<T: Serialize>(mut self, field: &str, value: T) -> Self {
        self.conditions
            .push(Condition::Eq(field.to_string(), to_value(value)));
        self
    }

    pub fn ne<T: Serialize>(mut self, field: &str, value: T) -> Self {
        self.conditions
            .push(Condition::Ne(field.to_string(), to_value(value)));
        self
    }

    pub fn gte(mut self, field: &str, bound: f64) -> Self {
        self.conditions.push(Condition::Gte(field.to_string(), bound));
        self
    }

    pub fn is_in<T: Serialize>(mut self, field: &str, values: impl IntoIterator<Item = T>) -> Self {
        let values = values.into_iter().map(to_value).collect();
        self.conditions.push(Condition::In(field.to_string(), values));
        self
    }

    pub fn contains(mut self, field: &str, needle: &str) -> Self {
        self.conditions
            .push(Condition::Contains(field.to_string(), needle.to_string()));
        self
    }

    pub fn lacks<T: Serialize>(mut self, field: &str, value: T) -> Self {
        self.conditions
            .push(Condition::Lacks(field.to_string(), to_value(value)));
        self
    }

    pub fn any_of(mut self, alternatives: Vec<Filter>) -> Self {
        self.conditions.push(Condition::AnyOf(alternatives));
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Evaluate the filter against a document in process
    pub fn matches(&self, document: &Value) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition_matches(condition, document))
    }
}

fn field<'a>(document: &'a Value, name: &str) -> &'a Value {
    document.get(name).unwrap_or(&Value::Null)
}

fn condition_matches(condition: &Condition, document: &Value) -> bool {
    match condition {
        Condition::Eq(name, value) => json_eq(field(document, name), value),
        Condition::Ne(name, value) => !json_eq(field(document, name), value),
        Condition::Gte(name, bound) => field(document, name)
            .as_f64()
            .map(|n| n >= *bound)
            .unwrap_or(false),
        Condition::In(name, values) => {
            let current = field(document, name);
            values.iter().any(|v| json_eq(current, v))
        }
        Condition::Contains(name, needle) => field(document, name)
            .as_str()
            .map(|s| s.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false),
        Condition::Lacks(name, value) => match field(document, name) {
            Value::Array(items) => !items.iter().any(|item| json_eq(item, value)),
            _ => true,
        },
        Condition::AnyOf(alternatives) => alternatives.iter().any(|f| f.matches(document)),
    }
}

/// Equality that treats `1` and `1.0` alike, the way jsonb does
pub(crate) fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Paging and ordering for multi-document reads
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Option<(String, SortOrder)>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort_desc(mut self, field: &str) -> Self {
        self.sort = Some((field.to_string(), SortOrder::Descending));
        self
    }

    pub fn sort_asc(mut self, field: &str) -> Self {
        self.sort = Some((field.to_string(), SortOrder::Ascending));
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Total order used for in-process sorting
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
            Value::Bool(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&y.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Field-level modifications applied atomically to one document
#[derive(Debug, Clone, Default)]
pub struct Update {
    pub(crate) set: Vec<(String, Value)>,
    pub(crate) unset: Vec<String>,
    pub(crate) inc: Vec<(String, f64)>,
    pub(crate) push: Vec<(String, Value)>,
    pub(crate) pull: Vec<(String, Value)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Serialize>(mut self, field: &str, value: T) -> Self {
        self.set.push((field.to_string(), to_value(value)));
        self
    }

    pub fn unset(mut self, field: &str) -> Self {
        self.unset.push(field.to_string());
        self
    }

    pub fn inc(mut self, field: &str, delta: f64) -> Self {
        self.inc.push((field.to_string(), delta));
        self
    }

    pub fn push<T: Serialize>(mut self, field: &str, value: T) -> Self {
        self.push.push((field.to_string(), to_value(value)));
        self
    }

    pub fn pull<T: Serialize>(mut self, field: &str, value: T) -> Self {
        self.pull.push((field.to_string(), to_value(value)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
            && self.unset.is_empty()
            && self.inc.is_empty()
            && self.push.is_empty()
            && self.pull.is_empty()
    }

    /// Apply the modifications to a document in process
    pub fn apply(&self, document: &mut Value) {
        let Some(object) = document.as_object_mut() else {
            return;
        };

        for (name, value) in &self.set {
            object.insert(name.clone(), value.clone());
        }
        for name in &self.unset {
            object.remove(name);
        }
        for (name, delta) in &self.inc {
            let next = match object.get(name) {
                Some(Value::Number(n)) if n.is_i64() && delta.fract() == 0.0 => {
                    Value::from(n.as_i64().unwrap_or(0) + *delta as i64)
                }
                Some(Value::Number(n)) => Value::from(n.as_f64().unwrap_or(0.0) + delta),
                _ if delta.fract() == 0.0 => Value::from(*delta as i64),
                _ => Value::from(*delta),
            };
            object.insert(name.clone(), next);
        }
        for (name, value) in &self.push {
            match object.get_mut(name) {
                Some(Value::Array(items)) => items.push(value.clone()),
                _ => {
                    object.insert(name.clone(), Value::Array(vec![value.clone()]));
                }
            }
        }
        for (name, value) in &self.pull {
            if let Some(Value::Array(items)) = object.get_mut(name) {
                items.retain(|item| !json_eq(item, value));
            }
        }
    }
}
