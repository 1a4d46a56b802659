//! resolution of struct fields from environment variables and defaults
//!
//! [FieldResolver] walks a decoded tree along the field description of the
//! target type. For every field it
//! 1. materializes missing nested structs (so their fields can be visited)
//! 2. looks for an environment variable among the field's candidate names
//! 3. applies the default, or fails if the field is required, when the field
//!    is still zero
//! 4. recurses into nested structs and into each struct of a sequence
//!
//! ### Candidate names
//!
//! Variable names are derived from *prefixes*. The walk starts with the global
//! prefix (or none at all) and every nested struct extends each prefix by its
//! field name and, if it has one, its serialized name.
//!
//! | field                               | prefixes                                     | candidates                                   |
//! |-------------------------------------|----------------------------------------------|----------------------------------------------|
//! | `APPName`                           | `Configor`                                   | `Configor_APPName`, `CONFIGOR_APPNAME`       |
//! | `Name` in `DB`                      | `Configor_DB`                                | `Configor_DB_Name`, `CONFIGOR_DB_NAME`       |
//! | `Name` (`first_name`) in `Contacts` | `Configor_Contacts_0`                        | `…_Contacts_0_Name`, `…_Contacts_0_first_name` and upper-case forms |
//! | `Password` with `env("DBPassword")` |                                              | `DBPassword`, `Configor_DBPassword`, `CONFIGOR_DBPassword` |
//!
//! The first candidate that is set to a non-empty value wins.
use crate::environment::EnvironmentReader;
use crate::error::Error;
use crate::schema::{Field, Kind};
use crate::value::{self, deep_merge, merge_mapping, ValueExt};
use serde_yaml::{Mapping, Value};

#[derive(derive_new::new)]
pub struct FieldResolver<'a, E> {
    environment: &'a E,
    global_prefix: Option<&'a str>,
    debug: bool,
    verbose: bool,
}

impl<'a, E: EnvironmentReader> FieldResolver<'a, E> {
    /// Resolves all `fields` of the struct at the root of `tree`
    pub fn apply(&self, tree: &mut Value, fields: &[Field], prefixes: &[String]) -> Result<(), Error> {
        if tree.is_null() {
            *tree = value::empty();
        }

        let Value::Mapping(mapping) = tree else {
            return Err(Error::InvalidTarget("configuration".to_string()));
        };

        self.apply_mapping(mapping, fields, prefixes, &[])
    }

    /// `filled` holds the types of the absent structs that enclose `mapping`
    fn apply_mapping(
        &self,
        mapping: &mut Mapping,
        fields: &[Field],
        prefixes: &[String],
        filled: &[&'static str],
    ) -> Result<(), Error> {
        for field in fields {
            if field.is_embedded() {
                self.apply_embedded(mapping, field, prefixes, filled)?;
            } else {
                self.apply_field(mapping, field, prefixes, filled)?;
            }
        }

        Ok(())
    }

    fn apply_field(
        &self,
        mapping: &mut Mapping,
        field: &Field,
        prefixes: &[String],
        filled: &[&'static str],
    ) -> Result<(), Error> {
        let key = Value::String(field.key().to_string());
        let node = mapping.entry(key.clone()).or_insert(Value::Null);

        let recursive = matches!(field.kind(), Kind::Pointer(_))
            && field.type_name().is_some_and(|name| filled.contains(&name));
        if node.is_null() && recursive {
            tracing::trace!(field = field.name(), "not filling in recursive pointer");
            mapping.remove(&key);
            return Ok(());
        }

        let materialized = node.is_null() && matches!(field.kind(), Kind::Record(_) | Kind::Pointer(_));
        if materialized {
            *node = value::empty();
        }

        let names = self.candidate_names(field, prefixes);
        if let Some((name, literal)) = self.find_variable(field, &names) {
            let parsed = parse(field, &literal).map_err(|source| Error::Literal {
                origin: name.to_string(),
                source,
            })?;
            assign(node, field, parsed);
        }

        if is_unset(node, field) {
            if let Some(literal) = field.default_literal() {
                tracing::trace!(field = field.name(), literal, "applying default");
                let parsed = parse(field, literal).map_err(|source| Error::Literal {
                    origin: format!("default of {}", field.name()),
                    source,
                })?;
                assign(node, field, parsed);
            } else if field.is_required() {
                return Err(Error::MissingRequiredField(required_name(field, &names)));
            }
        }

        match field.kind() {
            Kind::Scalar(_) => {}
            Kind::Record(nested) | Kind::Pointer(nested) => {
                let Value::Mapping(nested_mapping) = node else {
                    return Err(Error::InvalidTarget(field.name().to_string()));
                };

                let mut nested_filled = filled.to_vec();
                if materialized {
                    nested_filled.extend(field.type_name());
                }
                self.apply_mapping(
                    nested_mapping,
                    &nested(),
                    &nested_prefixes(prefixes, field),
                    &nested_filled,
                )?;
            }
            Kind::Sequence(nested, _) => match node {
                Value::Null => {}
                Value::Sequence(elements) => {
                    let nested = nested();
                    let nested_prefixes = nested_prefixes(prefixes, field);

                    for (index, element) in elements.iter_mut().enumerate() {
                        if element.is_null() {
                            *element = value::empty();
                        }

                        let Value::Mapping(element_mapping) = element else {
                            return Err(Error::InvalidTarget(format!("{}[{index}]", field.name())));
                        };

                        let element_prefixes: Vec<String> = nested_prefixes
                            .iter()
                            .map(|prefix| format!("{prefix}_{index}"))
                            .collect();
                        self.apply_mapping(element_mapping, &nested, &element_prefixes, filled)?;
                    }
                }
                _ => return Err(Error::InvalidTarget(field.name().to_string())),
            },
        }

        // leave nothing behind that serde would not accept for an absent field
        let prune = node.is_null() || (materialized && is_unset(node, field));
        if prune {
            mapping.remove(&key);
        }

        Ok(())
    }

    /// Embedded structs have no node of their own, their keys live in `mapping`
    fn apply_embedded(
        &self,
        mapping: &mut Mapping,
        field: &Field,
        prefixes: &[String],
        filled: &[&'static str],
    ) -> Result<(), Error> {
        let Some(nested) = field.kind().fields() else {
            return Ok(());
        };
        let nested = nested();

        let names = self.candidate_names(field, prefixes);
        if let Some((name, literal)) = self.find_variable(field, &names) {
            let parsed = serde_yaml::from_str(&literal).map_err(|source| Error::Literal {
                origin: name.to_string(),
                source,
            })?;
            merge_embedded(mapping, field, parsed)?;
        }

        if is_unset_struct(mapping, &nested) {
            if let Some(literal) = field.default_literal() {
                let parsed = serde_yaml::from_str(literal).map_err(|source| Error::Literal {
                    origin: format!("default of {}", field.name()),
                    source,
                })?;
                merge_embedded(mapping, field, parsed)?;
            } else if field.is_required() {
                return Err(Error::MissingRequiredField(required_name(field, &names)));
            }
        }

        self.apply_mapping(mapping, &nested, &nested_prefixes(prefixes, field), filled)
    }

    /// Environment variable names checked for `field`, in order
    pub fn candidate_names(&self, field: &Field, prefixes: &[String]) -> Vec<String> {
        if let Some(env) = field.env_name() {
            let mut names = vec![env.to_string()];
            if let Some(prefix) = self.global_prefix {
                names.push(format!("{prefix}_{env}"));
                names.push(format!("{}_{env}", prefix.to_uppercase()));
            }
            return names;
        }

        let mut names = vec![];
        for prefix in prefixes {
            push_with_upper(&mut names, format!("{prefix}_{}", field.name()));
            if let Some(serialized) = field.serialized_name() {
                push_with_upper(&mut names, format!("{prefix}_{serialized}"));
            }
        }

        if names.is_empty() {
            push_with_upper(&mut names, field.name().to_string());
            if let Some(serialized) = field.serialized_name() {
                push_with_upper(&mut names, serialized.to_string());
            }
        }

        names
    }

    fn find_variable<'n>(&self, field: &Field, names: &'n [String]) -> Option<(&'n str, String)> {
        if self.verbose {
            tracing::info!(
                field = field.name(),
                candidates = names.join(", "),
                "Trying to load field from env"
            );
        }

        let found = names
            .iter()
            .find_map(|name| self.environment.lookup(name).map(|value| (name.as_str(), value)));

        if let Some((name, _)) = &found {
            if self.debug || self.verbose {
                tracing::info!(field = field.name(), variable = *name, "Loading field from env");
            }
        }

        found
    }
}

/// Prefixes for the fields of the struct held by `field`
pub fn nested_prefixes(prefixes: &[String], field: &Field) -> Vec<String> {
    if field.is_transparent() {
        return prefixes.to_vec();
    }

    let mut nested: Vec<String> = prefixes
        .iter()
        .map(|prefix| format!("{prefix}_{}", field.name()))
        .collect();

    if let Some(serialized) = field.serialized_name() {
        nested.extend(prefixes.iter().map(|prefix| format!("{prefix}_{serialized}")));
    }

    if nested.is_empty() {
        nested.push(field.name().to_string());
        nested.extend(field.serialized_name().map(str::to_string));
    }

    nested
}

fn push_with_upper(names: &mut Vec<String>, name: String) {
    let upper = name.to_uppercase();
    names.push(name);
    names.push(upper);
}

fn required_name(field: &Field, names: &[String]) -> String {
    names
        .last()
        .map(|name| name.to_uppercase())
        .unwrap_or_else(|| field.name().to_string())
}

fn parse(field: &Field, literal: &str) -> Result<Value, serde_yaml::Error> {
    match field.kind() {
        Kind::Scalar(parse) | Kind::Sequence(_, parse) => parse(literal),
        Kind::Record(_) | Kind::Pointer(_) => serde_yaml::from_str(literal),
    }
}

/// Structs are merged into, everything else is replaced
fn assign(node: &mut Value, field: &Field, parsed: Value) {
    match field.kind() {
        Kind::Record(_) | Kind::Pointer(_) => {
            let current = std::mem::replace(node, Value::Null);
            *node = deep_merge(current, parsed);
        }
        Kind::Scalar(_) | Kind::Sequence(..) => *node = parsed,
    }
}

fn merge_embedded(mapping: &mut Mapping, field: &Field, parsed: Value) -> Result<(), Error> {
    match parsed {
        Value::Mapping(parsed) => {
            merge_mapping(mapping, parsed);
            Ok(())
        }
        Value::Null => Ok(()),
        _ => Err(Error::InvalidTarget(field.name().to_string())),
    }
}

/// Zero test along the field description
///
/// Only struct mappings are zero when all their fields are. A mapping held by
/// a plain field (a `HashMap`) is zero when it is empty.
fn is_unset(node: &Value, field: &Field) -> bool {
    match (field.kind(), node) {
        (Kind::Scalar(_), Value::Mapping(mapping)) => mapping.is_empty(),
        (Kind::Record(nested) | Kind::Pointer(nested), Value::Mapping(mapping)) => {
            is_unset_struct(mapping, &nested())
        }
        _ => node.is_zero(),
    }
}

fn is_unset_struct(mapping: &Mapping, fields: &[Field]) -> bool {
    fields.iter().all(|field| match (field.is_embedded(), field.kind().fields()) {
        (true, Some(nested)) => is_unset_struct(mapping, &nested()),
        _ => mapping.get(field.key()).map_or(true, |node| is_unset(node, field)),
    })
}
