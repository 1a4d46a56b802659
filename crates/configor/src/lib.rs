//! # configor - environment-aware configuration
//!
//! Resolves a configuration struct from three layered sources:
//! - structured files (json, yaml, toml)
//! - environment variables
//! - defaults and required markers declared per field
//!
//! ## Introduction for developers
//!
//! Read this to understand how `configor` works internally.
//!
//! ### Describing the target
//!
//! Rust has no runtime reflection. A target type implements
//! [schema::Configurable] and lists its [schema::Field]s: the field name (used
//! to derive environment variable names), the serialized name (the key in
//! files), default literal, `required`, an explicit variable name and whether
//! the field is a nested struct, an optional nested struct, a sequence of
//! structs or an embedded (`#[serde(flatten)]`) struct.
//!
//! ### Environment
//!
//! The environment name decides which files are loaded in addition to the ones
//! asked for (see [session::Configor::environment]):
//! 1. [session::Config::environment]
//! 2. `CONFIGOR_ENV`
//! 3. `test` when the program name looks like a test binary
//! 4. `development`
//!
//! ### Loading files
//!
//! see [files::resolve]
//!
//! Given `config.yml` and the environment `production`, we load `config.yml`
//! and then `config.production.yml`, each only if it exists. If neither exists
//! `config.example.yml` is used. Multiple files are loaded last to first so
//! the first file wins.
//!
//! Each file is decoded by [format::decode] into a [serde_yaml::Value] tree and
//! merged into the trees of the files before it ([value::deep_merge]). Keys no
//! field declares are an error when
//! [session::Config::error_on_unmatched_keys] is set.
//!
//! ### Resolving fields
//!
//! see [fields::FieldResolver]
//!
//! The merged tree is walked along the field description. Every field may be
//! overridden by an environment variable. Variable names are built from the
//! global prefix (`Configor` unless configured otherwise) and the names of all
//! enclosing fields:
//!
//! | **field**              | **variables** (first match wins)                          |
//! |------------------------|-----------------------------------------------------------|
//! | `APPName`              | `Configor_APPName`, `CONFIGOR_APPNAME`                    |
//! | `DB.Name`              | `Configor_DB_Name`, `CONFIGOR_DB_NAME`                    |
//! | `Contacts[0].Email`    | `Configor_Contacts_0_Email`, `CONFIGOR_CONTACTS_0_EMAIL`  |
//!
//! Values are parsed as yaml into the type of the field. A field that is still
//! zero afterwards gets its default, or fails when it is required.
//!
//! ### Output
//!
//! Finally the tree is deserialized into the target type with serde.
//!
//! ## Example
//!
//! ```
//! use configor::environment::MapEnvironment;
//! use configor::schema::{Configurable, Field};
//! use configor::session::{Config, Configor};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! #[serde(default)]
//! struct Settings {
//!     #[serde(rename = "APPName")]
//!     app_name: String,
//!     #[serde(rename = "Port")]
//!     port: u16,
//! }
//!
//! impl Configurable for Settings {
//!     fn fields() -> Vec<Field> {
//!         vec![
//!             Field::scalar::<String>("APPName").default("configor"),
//!             Field::scalar::<u16>("Port").required(),
//!         ]
//!     }
//! }
//!
//! let env = MapEnvironment::default().set("APP_PORT", "8080");
//! let config = Config {
//!     env_prefix: Some("APP".to_string()),
//!     ..Default::default()
//! };
//!
//! let no_files: [&str; 0] = [];
//! let settings: Settings = Configor::with_environment(config, env).load(&no_files)?;
//!
//! assert_eq!(settings.app_name, "configor");
//! assert_eq!(settings.port, 8080);
//! # Ok::<(), configor::Error>(())
//! ```
pub mod environment;
mod error;
pub mod fields;
pub mod files;
pub mod format;
pub mod schema;
pub mod session;
pub mod value;

pub use error::{DecodeError, Error, UnmatchedKeysError};
pub use schema::{Configurable, Field};
pub use session::{Config, Configor};

/// Loads `T` from `files` with default options and the process environment
pub fn load<T: Configurable, P: AsRef<std::path::Path>>(files: &[P]) -> Result<T, Error> {
    Configor::default().load(files)
}

/// Name of the current environment, see [Configor::environment]
pub fn env() -> String {
    Configor::default().environment()
}
