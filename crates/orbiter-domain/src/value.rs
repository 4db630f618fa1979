use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A heterogeneous input/output value.
///
/// `Map` is `BTreeMap`-backed (not `HashMap`) so iteration order, `Display`
/// output, and hashing are all deterministic without a separate
/// key-sorting pass — this replaces the teacher's `sort_json_keys` helper
/// (`nclav_store::state::sort_json_keys`) by making the type itself
/// canonical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `true` for `Null` and for the empty string, matching the hook
    /// binder's "drop if null or empty" rule (spec.md §4.3).
    pub fn is_null_or_empty(&self) -> bool {
        matches!(self, Value::Null) || matches!(self, Value::String(s) if s.is_empty())
    }

    /// Stable `%v`-style stringification used by the expression resolver's
    /// concatenation rule (spec.md §4.2(a).3): numbers as decimal, booleans
    /// as `true`/`false`, strings verbatim. Non-scalar values have no
    /// stable textual form here — the caller is expected to leave the
    /// surrounding literal text unresolved in that case (spec.md §4.2(a).3).
    pub fn stringify_scalar(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::List(_) | Value::Map(_) => None,
        }
    }

    pub fn from_json(v: serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::String(n.to_string())
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => Value::List(a.into_iter().map(Value::from_json).collect()),
            serde_json::Value::Object(o) => {
                Value::Map(o.into_iter().map(|(k, v)| (k, Value::from_json(v))).collect())
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(l) => serde_json::Value::Array(l.iter().map(Value::to_json).collect()),
            Value::Map(m) => {
                serde_json::Value::Object(m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_equality_is_order_independent() {
        let mut a = BTreeMap::new();
        a.insert("x".to_string(), Value::Int(1));
        a.insert("y".to_string(), Value::Int(2));
        let mut b = BTreeMap::new();
        b.insert("y".to_string(), Value::Int(2));
        b.insert("x".to_string(), Value::Int(1));
        assert_eq!(Value::Map(a), Value::Map(b));
    }

    #[test]
    fn stringify_scalar_formats_like_pct_v() {
        assert_eq!(Value::Int(42).stringify_scalar().unwrap(), "42");
        assert_eq!(Value::Bool(true).stringify_scalar().unwrap(), "true");
        assert_eq!(Value::Bool(false).stringify_scalar().unwrap(), "false");
        assert!(Value::List(vec![]).stringify_scalar().is_none());
    }

    #[test]
    fn is_null_or_empty_covers_both_forms() {
        assert!(Value::Null.is_null_or_empty());
        assert!(Value::String(String::new()).is_null_or_empty());
        assert!(!Value::String("x".to_string()).is_null_or_empty());
    }

    #[test]
    fn json_round_trip_preserves_structure() {
        let mut m = BTreeMap::new();
        m.insert("a".to_string(), Value::List(vec![Value::Int(1), Value::Null]));
        let v = Value::Map(m);
        let json = v.to_json();
        let back = Value::from_json(json);
        assert_eq!(v, back);
    }
}
