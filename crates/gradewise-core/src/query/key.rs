//! Cache keys
//!
//! Filters are compared by value, never by identity: the key stores a
//! canonical JSON rendering with object keys sorted and null fields dropped,
//! so two structurally equal filter values always land on the same entry.

use serde::Serialize;
use serde_json::Value;

use crate::api::ResourceKind;
use crate::error::Result;

/// What a cached read covers within one resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryScope {
    /// A list read, holding the canonical filter JSON
    List(String),
    /// A single entity by id
    Item(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    pub kind: ResourceKind,
    pub scope: QueryScope,
}

impl QueryKey {
    pub fn list<F: Serialize>(kind: ResourceKind, filters: &F) -> Result<Self> {
        let value = serde_json::to_value(filters)?;
        Ok(Self {
            kind,
            scope: QueryScope::List(canonical_json(&value)),
        })
    }

    pub fn item(kind: ResourceKind, id: &str) -> Self {
        Self {
            kind,
            scope: QueryScope::Item(id.trim().to_string()),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self.scope, QueryScope::List(_))
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.scope {
            QueryScope::List(filters) => write!(f, "{}{}", self.kind, filters),
            QueryScope::Item(id) => write!(f, "{}/{}", self.kind, id),
        }
    }
}

/// Render `value` with sorted object keys and without null members
///
/// Independent of whether serde_json preserves insertion order.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut members: Vec<(&String, &Value)> =
                map.iter().filter(|(_, v)| !v.is_null()).collect();
            members.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, member)) in members.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(member, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
