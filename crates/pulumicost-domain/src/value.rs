use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A recursively-typed JSON-like scalar/list/object tree.
///
/// `Object` uses a `BTreeMap` rather than a `HashMap` so that any iteration
/// over a resource's properties is lexicographically ordered for free —
/// the rendering and rollup paths depend on this (see the determinism
/// invariant in spec §8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Flatten to a string for RPC transport, where the wire format only
    /// carries string-valued properties. Scalars stringify directly;
    /// compound values fall back to their JSON rendering.
    pub fn stringify(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Value::String(s) => s.clone(),
            Value::List(_) | Value::Object(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }

    /// Convert from a parsed `serde_json::Value` (the shape Ingest reads
    /// plan/state files into before normalizing to `ResourceDescriptor`).
    pub fn from_json(v: serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => {
                Value::List(a.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(o) => Value::Object(
                o.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stringify_integral_number_has_no_decimal() {
        assert_eq!(Value::Number(730.0).stringify(), "730");
    }

    #[test]
    fn stringify_fractional_number_keeps_decimal() {
        assert_eq!(Value::Number(0.0104).stringify(), "0.0104");
    }

    #[test]
    fn object_iteration_is_lexicographic() {
        let mut m = BTreeMap::new();
        m.insert("zebra".to_string(), Value::Bool(true));
        m.insert("alpha".to_string(), Value::Bool(false));
        let obj = Value::Object(m);
        if let Value::Object(m) = obj {
            let keys: Vec<&String> = m.keys().collect();
            assert_eq!(keys, vec!["alpha", "zebra"]);
        } else {
            unreachable!();
        }
    }
}
