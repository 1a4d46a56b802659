//! decoding of configuration files
//!
//! Supported formats are json, yaml and toml. The format of a file is taken
//! from its extension. Files without a known extension are tried as toml, then
//! json, then yaml. See [decode] for how failures during that search are
//! treated.
use crate::error::{DecodeError, UnmatchedKeysError};
use crate::schema::{Configurable, Field, Kind};
use crate::value::{self, key_to_string};
use serde_yaml::{Mapping, Value};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
    Toml,
}

impl Format {
    /// Order in which formats are tried for files without a known extension
    pub const FALLBACK_ORDER: [Format; 3] = [Format::Toml, Format::Json, Format::Yaml];

    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yaml" | "yml" => Some(Format::Yaml),
            "toml" => Some(Format::Toml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }

    /// Parses a document into a tree with a mapping at its root
    pub fn parse(self, text: &str) -> Result<Value, DecodeError> {
        let document: Value = match self {
            Format::Json => serde_json::from_str(text)?,
            Format::Yaml => serde_yaml::from_str(text)?,
            Format::Toml => from_toml(toml::Value::Table(toml::from_str(text)?)),
        };

        match document {
            Value::Null => Ok(value::empty()),
            Value::Mapping(_) => Ok(document),
            _ => Err(DecodeError::NotAMapping(self)),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Json => f.write_str("json"),
            Format::Yaml => f.write_str("yaml"),
            Format::Toml => f.write_str("toml"),
        }
    }
}

/// Decodes a document for target `T`
///
/// With `strict` set, keys the target does not declare are reported as
/// [DecodeError::UnmatchedKeys]. Plain values are read as the type of their
/// field, see [conform].
///
/// Without a `format` the fallback search runs: a toml or json document that
/// does not parse moves on to the next format, while unmatched keys in a
/// document that did parse end the search. yaml is tried last; if it does not
/// parse either the search fails with [DecodeError::Unrecognized].
pub fn decode<T: Configurable>(
    text: &str,
    format: Option<Format>,
    strict: bool,
) -> Result<Value, DecodeError> {
    let fields = T::fields();
    let mut document = decode_with(text, format, strict.then_some(fields.as_slice()))?;
    conform(&mut document, &fields)?;
    Ok(document)
}

/// Decodes a document without checking its keys
pub fn decode_untyped(text: &str, format: Option<Format>) -> Result<Value, DecodeError> {
    decode_with(text, format, None)
}

fn decode_with(
    text: &str,
    format: Option<Format>,
    fields: Option<&[Field]>,
) -> Result<Value, DecodeError> {
    let check = |document: Value| match fields {
        Some(fields) => ensure_matched(document, fields),
        None => Ok(document),
    };

    if let Some(format) = format {
        return check(format.parse(text)?);
    }

    for format in Format::FALLBACK_ORDER {
        match format.parse(text) {
            Ok(document) => return check(document),
            Err(err) if format == Format::Yaml => {
                tracing::trace!(%format, error = %err, "no format matched");
                return Err(DecodeError::Unrecognized);
            }
            Err(err) => tracing::trace!(%format, error = %err, "not a match"),
        }
    }

    Err(DecodeError::Unrecognized)
}

fn ensure_matched(document: Value, fields: &[Field]) -> Result<Value, DecodeError> {
    let keys = unmatched_keys(&document, fields);
    if keys.is_empty() {
        Ok(document)
    } else {
        Err(UnmatchedKeysError::new(keys).into())
    }
}

/// Paths of all keys in `document` that no field declares
///
/// Paths are dotted, sequence elements are addressed by their index
/// (`Contacts.0.Phone`). Fields of kind [Kind::Scalar] are not inspected.
pub fn unmatched_keys(document: &Value, fields: &[Field]) -> Vec<String> {
    let mut keys = vec![];
    if let Value::Mapping(mapping) = document {
        collect_unmatched(mapping, fields, "", &mut keys);
    }
    keys
}

fn collect_unmatched(mapping: &Mapping, fields: &[Field], path: &str, keys: &mut Vec<String>) {
    let declared = declared_fields(fields);

    for (key, value) in mapping {
        let key = key_to_string(key);
        let key_path = if path.is_empty() {
            key.clone()
        } else {
            format!("{path}.{key}")
        };

        let Some(field) = declared.iter().find(|field| field.key() == key) else {
            keys.push(key_path);
            continue;
        };

        match (field.kind(), value) {
            (Kind::Record(nested) | Kind::Pointer(nested), Value::Mapping(mapping)) => {
                collect_unmatched(mapping, &nested(), &key_path, keys)
            }
            (Kind::Sequence(nested, _), Value::Sequence(elements)) => {
                let nested = nested();
                for (index, element) in elements.iter().enumerate() {
                    if let Value::Mapping(mapping) = element {
                        collect_unmatched(mapping, &nested, &format!("{key_path}.{index}"), keys);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Re-reads every plain value in `document` as the type of its field
///
/// Documents are parsed without knowing the target, so an unquoted `1.0` in
/// yaml is a number even when its field holds text. Each value of a
/// [Kind::Scalar] field is rendered back to yaml and parsed by the field.
/// Values that do not fit their field fail with [DecodeError::InvalidValue].
pub fn conform(document: &mut Value, fields: &[Field]) -> Result<(), DecodeError> {
    if let Value::Mapping(mapping) = document {
        conform_mapping(mapping, fields, "")?;
    }
    Ok(())
}

fn conform_mapping(mapping: &mut Mapping, fields: &[Field], path: &str) -> Result<(), DecodeError> {
    for field in declared_fields(fields) {
        let Some(node) = mapping.get_mut(field.key()) else {
            continue;
        };
        if node.is_null() {
            continue;
        }

        let key_path = if path.is_empty() {
            field.key().to_string()
        } else {
            format!("{path}.{}", field.key())
        };

        match (field.kind(), node) {
            (Kind::Scalar(parse), node) => {
                let typed = serde_yaml::to_string(&*node).and_then(|text| parse(&text));
                *node = typed.map_err(|source| DecodeError::InvalidValue {
                    key: key_path,
                    source,
                })?;
            }
            (Kind::Record(nested) | Kind::Pointer(nested), Value::Mapping(nested_mapping)) => {
                conform_mapping(nested_mapping, &nested(), &key_path)?
            }
            (Kind::Sequence(nested, _), Value::Sequence(elements)) => {
                let nested = nested();
                for (index, element) in elements.iter_mut().enumerate() {
                    if let Value::Mapping(element_mapping) = element {
                        conform_mapping(element_mapping, &nested, &format!("{key_path}.{index}"))?;
                    }
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// toml values as tree nodes, datetimes become their rfc 3339 text
fn from_toml(value: toml::Value) -> Value {
    match value {
        toml::Value::String(text) => Value::String(text),
        toml::Value::Integer(number) => Value::Number(number.into()),
        toml::Value::Float(number) => Value::Number(number.into()),
        toml::Value::Boolean(flag) => Value::Bool(flag),
        toml::Value::Datetime(datetime) => Value::String(datetime.to_string()),
        toml::Value::Array(values) => Value::Sequence(values.into_iter().map(from_toml).collect()),
        toml::Value::Table(table) => Value::Mapping(
            table
                .into_iter()
                .map(|(key, value)| (Value::String(key), from_toml(value)))
                .collect(),
        ),
    }
}

/// Fields addressable by key, with embedded structs flattened
fn declared_fields(fields: &[Field]) -> Vec<Field> {
    let mut declared = vec![];
    for field in fields {
        match (field.is_embedded(), field.kind().fields()) {
            (true, Some(nested)) => declared.extend(declared_fields(&nested())),
            _ => declared.push(field.clone()),
        }
    }
    declared
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct Named {
        #[serde(rename = "Name")]
        name: String,
    }

    impl Configurable for Named {
        fn fields() -> Vec<Field> {
            vec![Field::scalar::<String>("Name")]
        }
    }

    const TOML: &str = "Name = \"test\"\nTest = \"ATest\"\n";
    const JSON: &str = r#"{"Name": "test", "Test": "ATest"}"#;
    const YAML: &str = "Name: test\nTest: ATest\n";

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a.yml")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("a.yaml")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("a.toml")), Some(Format::Toml));
        assert_eq!(Format::from_path(Path::new("a.json")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("config")), None);
        assert_eq!(Format::from_path(Path::new("config.toml12345")), None);
    }

    #[test]
    fn lenient_decoding_ignores_unknown_keys() {
        for (text, format) in [(TOML, Format::Toml), (JSON, Format::Json), (YAML, Format::Yaml)] {
            assert!(decode::<Named>(text, Some(format), false).is_ok());
            assert!(decode::<Named>(text, None, false).is_ok());
        }
    }

    #[test]
    fn strict_decoding_reports_unknown_keys() {
        for (text, format) in [(TOML, Some(Format::Toml)), (JSON, None), (YAML, None)] {
            let err = decode::<Named>(text, format, true).expect_err("must error");
            let DecodeError::UnmatchedKeys(err) = err else {
                panic!("expected unmatched keys, got {err:?}");
            };
            assert_eq!(err.keys(), &["Test".to_string()]);
        }
    }

    #[test]
    fn fallback_tries_toml_then_json_then_yaml() {
        let toml = decode_untyped("a = 1", None).unwrap();
        let json = decode_untyped(r#"{"a": [1, 2]}"#, None).unwrap();
        let yaml = decode_untyped("a:\n  - 1\n", None).unwrap();

        assert_eq!(toml.get("a").and_then(Value::as_i64), Some(1));
        assert_eq!(json, serde_yaml::from_str::<Value>("a: [1, 2]").unwrap());
        assert_eq!(yaml, serde_yaml::from_str::<Value>("a: [1]").unwrap());
    }

    #[test]
    fn fallback_gives_up_after_yaml() {
        let err = decode_untyped("a: [unclosed", None).expect_err("must error");
        assert!(matches!(err, DecodeError::Unrecognized));
    }

    #[test]
    fn root_must_be_a_mapping() {
        let err = Format::Json.parse("[1, 2]").expect_err("must error");
        assert!(matches!(err, DecodeError::NotAMapping(Format::Json)));

        assert_eq!(Format::Yaml.parse("").unwrap(), value::empty());
    }

    #[test]
    fn plain_values_take_the_type_of_their_field() {
        let document = decode::<Named>("Name: 123\n", Some(Format::Yaml), false).unwrap();
        assert_eq!(document, serde_yaml::from_str::<Value>("Name: '123'").unwrap());

        let document = decode::<Named>("Name = 1.0\n", None, false).unwrap();
        assert_eq!(document.get("Name").and_then(Value::as_str), Some("1.0"));
    }

    #[test]
    fn toml_datetimes_are_text() {
        let document = decode::<Named>("Name = 1979-05-27T07:32:00Z\n", Some(Format::Toml), false).unwrap();
        assert_eq!(document.get("Name").and_then(Value::as_str), Some("1979-05-27T07:32:00Z"));
    }

    #[test]
    fn values_that_do_not_fit_their_field() {
        #[derive(Debug, Default, Serialize, Deserialize)]
        #[serde(default)]
        struct Server {
            #[serde(rename = "Port")]
            port: u16,
        }

        impl Configurable for Server {
            fn fields() -> Vec<Field> {
                vec![Field::scalar::<u16>("Port")]
            }
        }

        #[derive(Debug, Default, Serialize, Deserialize)]
        #[serde(default)]
        struct Servers {
            #[serde(rename = "Servers")]
            servers: Vec<Server>,
        }

        impl Configurable for Servers {
            fn fields() -> Vec<Field> {
                vec![Field::sequence::<Server>("Servers")]
            }
        }

        let err = decode::<Servers>("Servers: [{Port: 80}, {Port: http}]", Some(Format::Yaml), false)
            .expect_err("must error");
        assert!(matches!(err, DecodeError::InvalidValue { key, .. } if key == "Servers.1.Port"));
    }

    #[test]
    fn unmatched_keys_are_reported_with_their_path() {
        #[derive(Debug, Default, Serialize, Deserialize)]
        #[serde(default)]
        struct Outer {
            #[serde(rename = "Inner")]
            inner: Named,
            #[serde(rename = "List")]
            list: Vec<Named>,
        }

        impl Configurable for Outer {
            fn fields() -> Vec<Field> {
                vec![
                    Field::record::<Named>("Inner"),
                    Field::sequence::<Named>("List"),
                ]
            }
        }

        let document = Format::Yaml
            .parse("Inner: {Name: a, Extra: 1}\nList: [{Name: b}, {Other: c}]\nTop: 1")
            .unwrap();

        assert_eq!(
            unmatched_keys(&document, &Outer::fields()),
            vec!["Inner.Extra", "List.1.Other", "Top"]
        );
    }
}
