//! field descriptions of configuration structs
//!
//! Rust has no runtime reflection, so every configuration type describes its
//! own fields by implementing [Configurable]. The description mirrors what the
//! type's serde implementation does: the wire key of a [Field] must match the
//! (possibly renamed) serde field name.
//!
//! ```
//! use configor::schema::{Configurable, Field};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Default, Serialize, Deserialize)]
//! #[serde(default)]
//! struct Database {
//!     #[serde(rename = "Host")]
//!     host: String,
//!     #[serde(rename = "Port")]
//!     port: u16,
//!     #[serde(rename = "pass")]
//!     password: String,
//! }
//!
//! impl Configurable for Database {
//!     fn fields() -> Vec<Field> {
//!         vec![
//!             Field::scalar::<String>("Host").default("localhost"),
//!             Field::scalar::<u16>("Port").default("5432"),
//!             Field::scalar::<String>("Password")
//!                 .serialized("pass")
//!                 .env("DB_PASSWORD")
//!                 .required(),
//!         ]
//!     }
//! }
//! ```
use serde::{de::DeserializeOwned, Serialize};
use serde_yaml::Value;

/// A struct that can be resolved from files, environment and defaults
///
/// Implementors should carry `#[serde(default)]` so partially specified
/// sources deserialize.
pub trait Configurable: Serialize + DeserializeOwned {
    fn fields() -> Vec<Field>;
}

/// Lazily produced field list of a nested struct
pub type Fields = fn() -> Vec<Field>;

/// Turns a literal (env value or default) into a tree node of the field's type
pub type Parser = fn(&str) -> Result<Value, serde_yaml::Error>;

/// What a field holds, as far as resolution is concerned
#[derive(Clone, Copy)]
pub enum Kind {
    /// Anything that is not walked into, including sequences of plain values
    Scalar(Parser),
    /// A nested struct
    Record(Fields),
    /// An optional nested struct (`Option<T>` or `Option<Box<T>>`)
    Pointer(Fields),
    /// A sequence of nested structs
    Sequence(Fields, Parser),
}

impl Kind {
    /// Field list of the struct this kind leads to, if any
    pub fn fields(&self) -> Option<Fields> {
        match self {
            Kind::Scalar(_) => None,
            Kind::Record(fields) | Kind::Pointer(fields) | Kind::Sequence(fields, _) => {
                Some(*fields)
            }
        }
    }
}

impl std::fmt::Debug for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Scalar(_) => f.write_str("Scalar"),
            Kind::Record(_) => f.write_str("Record"),
            Kind::Pointer(_) => f.write_str("Pointer"),
            Kind::Sequence(..) => f.write_str("Sequence"),
        }
    }
}

/// Metadata of one field
#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    serialized: Option<&'static str>,
    env: Option<&'static str>,
    default: Option<&'static str>,
    required: bool,
    embedded: bool,
    anonymous: bool,
    kind: Kind,
    type_name: Option<&'static str>,
}

impl Field {
    fn new(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            serialized: None,
            env: None,
            default: None,
            required: false,
            embedded: false,
            anonymous: false,
            kind,
            type_name: None,
        }
    }

    fn nested<T: Configurable>(name: &'static str, kind: Kind) -> Self {
        Self {
            type_name: Some(std::any::type_name::<T>()),
            ..Self::new(name, kind)
        }
    }

    /// A plain value of type `V`
    pub fn scalar<V: Serialize + DeserializeOwned>(name: &'static str) -> Self {
        Self::new(name, Kind::Scalar(parse_literal::<V>))
    }

    pub fn record<T: Configurable>(name: &'static str) -> Self {
        Self::nested::<T>(name, Kind::Record(T::fields))
    }

    /// An optional struct, `Option<T>` or `Option<Box<T>>`
    ///
    /// An absent pointer is filled in while its fields are resolved and left
    /// out again when nothing set it. Inside such a filled in pointer, absent
    /// pointers to the same type are not filled in, so a type may point to
    /// itself. Variables for fields below that point are not read.
    pub fn pointer<T: Configurable>(name: &'static str) -> Self {
        Self::nested::<T>(name, Kind::Pointer(T::fields))
    }

    pub fn sequence<T: Configurable>(name: &'static str) -> Self {
        Self::nested::<T>(name, Kind::Sequence(T::fields, parse_literal::<Vec<T>>))
    }

    /// A struct whose keys are flattened into the parent (`#[serde(flatten)]`)
    pub fn embedded<T: Configurable>(name: &'static str) -> Self {
        Self {
            embedded: true,
            ..Self::nested::<T>(name, Kind::Record(T::fields))
        }
    }

    /// Wire name of the field in files, also used to derive variable names
    pub fn serialized(mut self, name: &'static str) -> Self {
        self.serialized = Some(name).filter(|name| !name.is_empty() && *name != "-");
        self
    }

    /// Explicit environment variable name
    pub fn env(mut self, name: &'static str) -> Self {
        self.env = Some(name).filter(|name| !name.is_empty());
        self
    }

    /// Literal applied when no source provided a value
    pub fn default(mut self, literal: &'static str) -> Self {
        self.default = Some(literal).filter(|literal| !literal.is_empty());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Keep an embedded struct out of variable name prefixes
    ///
    /// Has no effect on fields that are not [embedded](Field::embedded).
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn serialized_name(&self) -> Option<&'static str> {
        self.serialized
    }

    /// Key of this field in a decoded document
    pub fn key(&self) -> &'static str {
        self.serialized.unwrap_or(self.name)
    }

    pub fn env_name(&self) -> Option<&'static str> {
        self.env
    }

    pub fn default_literal(&self) -> Option<&'static str> {
        self.default
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    /// Embedded and anonymous: prefixes pass through unchanged
    pub fn is_transparent(&self) -> bool {
        self.embedded && self.anonymous
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Name of the struct type a nested field holds
    pub fn type_name(&self) -> Option<&'static str> {
        self.type_name
    }
}

fn parse_literal<V: Serialize + DeserializeOwned>(literal: &str) -> Result<Value, serde_yaml::Error> {
    let value: V = serde_yaml::from_str(literal)?;
    serde_yaml::to_value(value)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn literals_follow_the_field_type() {
        let Kind::Scalar(as_text) = Field::scalar::<String>("Port").kind() else {
            panic!("scalar field must have scalar kind");
        };
        let Kind::Scalar(as_number) = Field::scalar::<u32>("Port").kind() else {
            panic!("scalar field must have scalar kind");
        };

        assert_eq!(as_text("3306").unwrap(), Value::String("3306".into()));
        assert_eq!(as_number("3306").unwrap(), serde_yaml::to_value(3306u32).unwrap());
        assert!(as_number("not a number").is_err());
    }

    #[test]
    fn sequence_literals() {
        let Kind::Scalar(parse) = Field::scalar::<Vec<String>>("Hosts").kind() else {
            panic!("scalar field must have scalar kind");
        };

        let parsed = parse("- http://example.org\n- http://xitonix.me").unwrap();
        assert_eq!(
            parsed,
            Value::Sequence(vec![
                Value::String("http://example.org".into()),
                Value::String("http://xitonix.me".into()),
            ])
        );
    }

    #[test]
    fn key_prefers_serialized_name() {
        let plain = Field::scalar::<String>("Name");
        let renamed = Field::scalar::<String>("Name").serialized("first_name");
        let ignored = Field::scalar::<String>("Name").serialized("-");

        assert_eq!(plain.key(), "Name");
        assert_eq!(renamed.key(), "first_name");
        assert_eq!(ignored.serialized_name(), None);
    }
}
