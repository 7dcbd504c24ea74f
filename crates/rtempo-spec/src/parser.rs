//! Loading pattern definitions from YAML.
//!
//! A definition file holds one or more YAML documents, each describing one
//! pattern:
//!
//! ```yaml
//! id: alert-ack
//! title: Alert acknowledged
//! correlation:
//!     window: 5s
//!     trigger: { type: alert }
//!     response: { type: ack }
//! ```
//!
//! Filters are mappings of `field` or `field|op` keys (implicitly AND-ed),
//! lists (OR-ed), or the `all` / `any` / `not` combinators.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::ast::{FieldOp, FilterSpec, PatternCollection, PatternDefinition, PatternSpec};
use crate::error::{Result, SpecError};
use crate::value::{FilterValue, Timespan};

// =============================================================================
// Collections
// =============================================================================

/// Parse a (possibly multi-document) YAML string into a pattern collection.
///
/// Per-document failures are collected in [`PatternCollection::errors`];
/// the remaining documents are still loaded. Duplicate ids keep the first
/// definition.
pub fn parse_pattern_yaml(yaml: &str) -> Result<PatternCollection> {
    let mut collection = PatternCollection::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (index, doc) in serde_yaml::Deserializer::from_str(yaml).enumerate() {
        let value = match Value::deserialize(doc) {
            Ok(v) => v,
            Err(e) => {
                collection.errors.push(format!("YAML parse error: {e}"));
                // A syntax error leaves the deserializer unusable.
                break;
            }
        };

        if value.is_null() {
            continue;
        }

        match parse_pattern_document(&value) {
            Ok(def) => {
                if seen.insert(def.id.clone()) {
                    collection.patterns.push(def);
                } else {
                    collection
                        .errors
                        .push(format!("document {}: duplicate pattern id '{}'", index + 1, def.id));
                }
            }
            Err(e) => collection.errors.push(format!("document {}: {e}", index + 1)),
        }
    }

    Ok(collection)
}

/// Parse a single definition file.
pub fn parse_pattern_file(path: &Path) -> Result<PatternCollection> {
    let content = std::fs::read_to_string(path)?;
    parse_pattern_yaml(&content)
}

/// Parse all `.yml` / `.yaml` files under a directory (recursively).
pub fn parse_pattern_directory(dir: &Path) -> Result<PatternCollection> {
    let mut collection = PatternCollection::new();

    fn walk(dir: &Path, collection: &mut PatternCollection) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
        entries.sort_by_key(|e| e.path());
        for entry in entries {
            let path = entry.path();
            if path.is_dir() {
                walk(&path, collection)?;
            } else if matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yml" | "yaml")
            ) {
                match parse_pattern_file(&path) {
                    Ok(sub) => {
                        for err in sub.errors {
                            collection.errors.push(format!("{}: {err}", path.display()));
                        }
                        collection.patterns.extend(sub.patterns);
                    }
                    Err(e) => {
                        collection.errors.push(format!("{}: {e}", path.display()));
                    }
                }
            }
        }
        Ok(())
    }

    walk(dir, &mut collection)?;
    Ok(collection)
}

// =============================================================================
// Documents
// =============================================================================

/// Parse one YAML document into a pattern definition.
pub fn parse_pattern_document(value: &Value) -> Result<PatternDefinition> {
    let Some(mapping) = value.as_mapping() else {
        return Err(SpecError::InvalidPattern(
            "document is not a YAML mapping".to_string(),
        ));
    };

    let id = get_str(mapping, "id")
        .ok_or_else(|| SpecError::MissingField("id".to_string()))?
        .to_string();
    let title = get_str(mapping, "title").map(str::to_string);

    let kinds: Vec<&str> = ["sequence", "frequency", "correlation"]
        .into_iter()
        .filter(|k| mapping.contains_key(*k))
        .collect();

    let spec = match kinds.as_slice() {
        ["sequence"] => parse_sequence(section(mapping, "sequence")?)?,
        ["frequency"] => parse_frequency(section(mapping, "frequency")?)?,
        ["correlation"] => parse_correlation(section(mapping, "correlation")?)?,
        [] => {
            return Err(SpecError::MissingField(
                "sequence, frequency or correlation".to_string(),
            ));
        }
        _ => {
            return Err(SpecError::InvalidPattern(format!(
                "pattern '{id}' declares more than one kind: {}",
                kinds.join(", ")
            )));
        }
    };

    Ok(PatternDefinition { id, title, spec })
}

fn section<'a>(mapping: &'a Mapping, key: &str) -> Result<&'a Mapping> {
    mapping
        .get(key)
        .and_then(Value::as_mapping)
        .ok_or_else(|| SpecError::InvalidPattern(format!("'{key}' must be a mapping")))
}

fn parse_sequence(m: &Mapping) -> Result<PatternSpec> {
    let steps = m
        .get("steps")
        .ok_or_else(|| SpecError::MissingField("sequence.steps".to_string()))?
        .as_sequence()
        .ok_or_else(|| SpecError::InvalidPattern("sequence.steps must be a list".to_string()))?
        .iter()
        .map(parse_filter)
        .collect::<Result<Vec<_>>>()?;

    Ok(PatternSpec::Sequence {
        steps,
        window_ms: parse_window(m, "sequence")?,
    })
}

fn parse_frequency(m: &Mapping) -> Result<PatternSpec> {
    let filter = parse_filter(
        m.get("filter")
            .ok_or_else(|| SpecError::MissingField("frequency.filter".to_string()))?,
    )?;
    let threshold = m
        .get("threshold")
        .ok_or_else(|| SpecError::MissingField("frequency.threshold".to_string()))?
        .as_u64()
        .ok_or_else(|| {
            SpecError::InvalidPattern("frequency.threshold must be a non-negative integer".to_string())
        })?;

    Ok(PatternSpec::Frequency {
        filter,
        threshold,
        window_ms: parse_window(m, "frequency")?,
    })
}

fn parse_correlation(m: &Mapping) -> Result<PatternSpec> {
    let trigger = parse_filter(
        m.get("trigger")
            .ok_or_else(|| SpecError::MissingField("correlation.trigger".to_string()))?,
    )?;
    let response = parse_filter(
        m.get("response")
            .ok_or_else(|| SpecError::MissingField("correlation.response".to_string()))?,
    )?;

    Ok(PatternSpec::Correlation {
        trigger,
        response,
        window_ms: parse_window(m, "correlation")?,
    })
}

/// Read `window` (duration string or integer millis) or `window_ms`.
fn parse_window(m: &Mapping, kind: &str) -> Result<u64> {
    if let Some(v) = m.get("window_ms") {
        return v.as_u64().ok_or_else(|| {
            SpecError::InvalidTimespan(format!("{kind}.window_ms: {}", yaml_scalar_repr(v)))
        });
    }
    match m.get("window") {
        Some(Value::String(s)) => Ok(Timespan::parse(s)?.millis),
        Some(v @ Value::Number(_)) => v
            .as_u64()
            .ok_or_else(|| SpecError::InvalidTimespan(yaml_scalar_repr(v))),
        Some(v) => Err(SpecError::InvalidTimespan(yaml_scalar_repr(v))),
        None => Err(SpecError::MissingField(format!("{kind}.window"))),
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Parse a filter expression from YAML.
pub fn parse_filter(value: &Value) -> Result<FilterSpec> {
    match value {
        Value::Mapping(m) => parse_filter_mapping(m),
        Value::Sequence(items) => Ok(FilterSpec::Any(
            items.iter().map(parse_filter).collect::<Result<_>>()?,
        )),
        other => Err(SpecError::InvalidFilter(format!(
            "expected a mapping or list, found {}",
            yaml_scalar_repr(other)
        ))),
    }
}

fn parse_filter_mapping(m: &Mapping) -> Result<FilterSpec> {
    let mut preds = Vec::with_capacity(m.len());

    for (key, val) in m {
        let Some(key) = key.as_str() else {
            return Err(SpecError::InvalidFilter(format!(
                "non-string key {}",
                yaml_scalar_repr(key)
            )));
        };

        let pred = match key {
            "all" | "any" => {
                let items = val.as_sequence().ok_or_else(|| {
                    SpecError::InvalidFilter(format!("'{key}' expects a list of filters"))
                })?;
                let children = items.iter().map(parse_filter).collect::<Result<Vec<_>>>()?;
                if key == "all" {
                    FilterSpec::All(children)
                } else {
                    FilterSpec::Any(children)
                }
            }
            "not" => FilterSpec::Not(Box::new(parse_filter(val)?)),
            _ => parse_field_predicate(key, val)?,
        };
        preds.push(pred);
    }

    if preds.len() == 1 {
        Ok(preds.remove(0))
    } else {
        Ok(FilterSpec::All(preds))
    }
}

/// Parse a `field|op: value` entry.
fn parse_field_predicate(key: &str, val: &Value) -> Result<FilterSpec> {
    let (field, op_str) = match key.split_once('|') {
        Some((f, op)) => (f.trim(), Some(op.trim())),
        None => (key.trim(), None),
    };
    if field.is_empty() {
        return Err(SpecError::InvalidFilter(format!("empty field name in '{key}'")));
    }

    if op_str == Some("exists") {
        let expected = val.as_bool().ok_or_else(|| {
            SpecError::InvalidFilter(format!("'{key}' expects true or false"))
        })?;
        return Ok(FilterSpec::Exists {
            field: field.to_string(),
            expected,
        });
    }

    let op = match op_str {
        None => FieldOp::Eq,
        Some(s) => FieldOp::parse(s).ok_or_else(|| SpecError::UnknownOperator(s.to_string()))?,
    };

    let single = |v: &Value| -> Result<FilterSpec> {
        let value = FilterValue::from_yaml(v).ok_or_else(|| {
            SpecError::InvalidFilter(format!("'{key}' expects a scalar value"))
        })?;
        Ok(FilterSpec::Field {
            field: field.to_string(),
            op,
            value,
        })
    };

    match val {
        Value::Sequence(items) => {
            let children = items.iter().map(single).collect::<Result<Vec<_>>>()?;
            // `ne` over a list means "none of these"; everything else means "any of these".
            if op == FieldOp::Ne {
                Ok(FilterSpec::All(children))
            } else {
                Ok(FilterSpec::Any(children))
            }
        }
        v => single(v),
    }
}

fn get_str<'a>(m: &'a Mapping, key: &str) -> Option<&'a str> {
    m.get(key).and_then(Value::as_str)
}

fn yaml_scalar_repr(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{s}'"),
        Value::Sequence(_) => "a list".to_string(),
        Value::Mapping(_) => "a mapping".to_string(),
        Value::Tagged(t) => format!("tagged value {}", t.tag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::PatternKind;

    #[test]
    fn test_parse_sequence() {
        let yaml = r#"
id: recon
title: Recon chain
sequence:
    window: 1m
    steps:
        - CommandLine|contains: whoami
        - CommandLine|contains: ipconfig
"#;
        let c = parse_pattern_yaml(yaml).unwrap();
        assert!(c.errors.is_empty(), "{:?}", c.errors);
        let def = &c.patterns[0];
        assert_eq!(def.id, "recon");
        assert_eq!(def.title.as_deref(), Some("Recon chain"));
        match &def.spec {
            PatternSpec::Sequence { steps, window_ms } => {
                assert_eq!(*window_ms, 60_000);
                assert_eq!(
                    steps[0],
                    FilterSpec::field("CommandLine", FieldOp::Contains, "whoami")
                );
            }
            other => panic!("unexpected spec {other:?}"),
        }
    }

    #[test]
    fn test_parse_frequency_window_ms() {
        let yaml = r#"
id: burst
frequency:
    filter: { EventType: login_failed, User|exists: true }
    threshold: 5
    window_ms: 30000
"#;
        let c = parse_pattern_yaml(yaml).unwrap();
        let def = &c.patterns[0];
        assert_eq!(def.spec.kind(), PatternKind::Frequency);
        match &def.spec {
            PatternSpec::Frequency {
                filter,
                threshold,
                window_ms,
            } => {
                assert_eq!(*threshold, 5);
                assert_eq!(*window_ms, 30_000);
                assert_eq!(
                    *filter,
                    FilterSpec::All(vec![
                        FilterSpec::eq("EventType", "login_failed"),
                        FilterSpec::exists("User"),
                    ])
                );
            }
            other => panic!("unexpected spec {other:?}"),
        }
    }

    #[test]
    fn test_parse_correlation_with_combinators() {
        let yaml = r#"
id: alert-ack
correlation:
    window: 5s
    trigger:
        any:
            - type: alert
            - severity|gte: 8
    response:
        all:
            - type: ack
            - not: { operator: bot }
"#;
        let c = parse_pattern_yaml(yaml).unwrap();
        match &c.patterns[0].spec {
            PatternSpec::Correlation {
                trigger,
                response,
                window_ms,
            } => {
                assert_eq!(*window_ms, 5000);
                assert_eq!(
                    *trigger,
                    FilterSpec::Any(vec![
                        FilterSpec::eq("type", "alert"),
                        FilterSpec::field("severity", FieldOp::Gte, 8_i64),
                    ])
                );
                assert!(matches!(response, FilterSpec::All(children) if children.len() == 2));
            }
            other => panic!("unexpected spec {other:?}"),
        }
    }

    #[test]
    fn test_list_value_is_any_except_ne() {
        let v: Value = serde_yaml::from_str("{ user: [alice, bob] }").unwrap();
        assert!(matches!(parse_filter(&v).unwrap(), FilterSpec::Any(c) if c.len() == 2));

        let v: Value = serde_yaml::from_str("{ user|ne: [alice, bob] }").unwrap();
        assert!(matches!(parse_filter(&v).unwrap(), FilterSpec::All(c) if c.len() == 2));
    }

    #[test]
    fn test_multi_document_collects_errors() {
        let yaml = r#"
id: good
frequency:
    filter: { type: x }
    threshold: 2
    window: 1s
---
id: bad
frequency:
    filter: { type|bogus: x }
    threshold: 2
    window: 1s
---
id: good
correlation:
    window: 1s
    trigger: { type: a }
    response: { type: b }
"#;
        let c = parse_pattern_yaml(yaml).unwrap();
        assert_eq!(c.patterns.len(), 1);
        assert_eq!(c.errors.len(), 2);
        assert!(c.errors[0].contains("Unknown operator 'bogus'"));
        assert!(c.errors[1].contains("duplicate pattern id 'good'"));
    }

    #[test]
    fn test_two_kinds_rejected() {
        let v: Value = serde_yaml::from_str(
            "{ id: x, sequence: { steps: [], window: 1s }, frequency: { filter: {a: 1}, threshold: 1, window: 1s } }",
        )
        .unwrap();
        let err = parse_pattern_document(&v).unwrap_err();
        assert!(matches!(err, SpecError::InvalidPattern(_)));
    }

    #[test]
    fn test_missing_window() {
        let v: Value =
            serde_yaml::from_str("{ id: x, frequency: { filter: {a: 1}, threshold: 1 } }").unwrap();
        let err = parse_pattern_document(&v).unwrap_err();
        assert!(matches!(err, SpecError::MissingField(f) if f == "frequency.window"));
    }
}
