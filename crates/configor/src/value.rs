//! tree representation
//!
//! Every source is turned into a [serde_yaml::Value] tree before it reaches the
//! target type:
//! - files are decoded (whatever their format) into a tree
//! - trees of consecutive files are combined with [deep_merge]
//! - environment variables and defaults are written into the combined tree
//! - the final tree is deserialized into the configuration struct
//!
//! A node is considered *zero* when it would deserialize to the zero value of
//! its field: absent, `null`, `false`, `0`, `""`, an empty sequence or a
//! mapping with only zero values.
use serde_yaml::{Mapping, Value};

pub trait ValueExt {
    fn is_zero(&self) -> bool;
}

impl ValueExt for Value {
    fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(value) => !value,
            Value::Number(number) => number.as_f64() == Some(0.0),
            Value::String(value) => value.is_empty(),
            Value::Sequence(values) => values.is_empty(),
            Value::Mapping(mapping) => mapping.values().all(ValueExt::is_zero),
            Value::Tagged(tagged) => tagged.value.is_zero(),
        }
    }
}

/// Merges `overlay` into `base`
///
/// - mappings are merged key by key, recursively
/// - a `null` overlay keeps the base (nothing was specified)
/// - everything else, sequences included, is replaced by the overlay
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(mut base_mapping), Value::Mapping(overlay_mapping)) => {
            merge_mapping(&mut base_mapping, overlay_mapping);
            Value::Mapping(base_mapping)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// [deep_merge] for two mappings, in place
pub fn merge_mapping(base: &mut Mapping, overlay: Mapping) {
    for (key, overlay_value) in overlay {
        match base.get_mut(&key) {
            Some(base_value) => {
                let merged = deep_merge(std::mem::replace(base_value, Value::Null), overlay_value);
                *base_value = merged;
            }
            None => {
                base.insert(key, overlay_value);
            }
        }
    }
}

/// Human readable form of a mapping key
pub fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(key) => key.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(value) => value.to_string(),
        other => format!("{other:?}"),
    }
}

/// An empty mapping node
pub fn empty() -> Value {
    Value::Mapping(Mapping::new())
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn zero_values() {
        for text in ["~", "false", "0", "0.0", "''", "[]", "{}", "a: ''\nb: {c: 0}"] {
            assert!(yaml(text).is_zero(), "{text} must be zero");
        }

        for text in ["true", "1", "x", "[0]", "a: 1"] {
            assert!(!yaml(text).is_zero(), "{text} must not be zero");
        }
    }

    #[test]
    fn merge_nested_mappings() {
        let base = yaml("server: {host: localhost, port: 8080}\ndebug: true");
        let overlay = yaml("server: {port: 9000}");

        assert_eq!(
            deep_merge(base, overlay),
            yaml("server: {host: localhost, port: 9000}\ndebug: true")
        );
    }

    #[test]
    fn merge_replaces_sequences() {
        let base = yaml("hosts: [a, b]");
        let overlay = yaml("hosts: [c]");

        assert_eq!(deep_merge(base, overlay), yaml("hosts: [c]"));
    }

    #[test]
    fn merge_keeps_base_on_null() {
        let base = yaml("name: base\nport: 1");
        let overlay = yaml("name: ~\nport: 2");

        assert_eq!(deep_merge(base, overlay), yaml("name: base\nport: 2"));
    }
}
