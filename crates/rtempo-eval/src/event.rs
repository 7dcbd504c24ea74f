//! Event wrapper with dot-notation field access.
//!
//! Events are borrowed `serde_json::Value` objects. The engine only ever
//! reads them; matchers that need to retain an event clone its value.

use serde_json::Value;

/// A read-only view of one structured event.
///
/// Flat keys win over nested traversal: `"actor.id"` as a single key takes
/// precedence over `{"actor": {"id": ...}}`.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    inner: &'a Value,
}

impl<'a> Event<'a> {
    pub fn from_value(value: &'a Value) -> Self {
        Event { inner: value }
    }

    /// Look up a field by name or dot-separated path.
    ///
    /// Arrays met along the path are searched element by element and the
    /// first element that resolves the rest of the path wins.
    pub fn get_field(&self, path: &str) -> Option<&'a Value> {
        if let Some(obj) = self.inner.as_object()
            && let Some(v) = obj.get(path)
        {
            return Some(v);
        }

        if path.contains('.') {
            let parts: Vec<&str> = path.split('.').collect();
            return traverse(self.inner, &parts);
        }

        None
    }

    /// Whether a field resolves to a present, non-null value.
    pub fn has_field(&self, path: &str) -> bool {
        self.get_field(path).is_some_and(|v| !v.is_null())
    }

    pub fn as_value(&self) -> &'a Value {
        self.inner
    }

    /// Owned copy of the event, for buffering inside temporal state.
    pub fn to_owned_value(&self) -> Value {
        self.inner.clone()
    }
}

fn traverse<'a>(current: &'a Value, parts: &[&str]) -> Option<&'a Value> {
    let Some((head, rest)) = parts.split_first() else {
        return Some(current);
    };

    match current {
        Value::Object(map) => traverse(map.get(*head)?, rest),
        Value::Array(arr) => arr.iter().find_map(|item| traverse(item, parts)),
        _ => None,
    }
}
