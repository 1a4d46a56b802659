//! the loading session
use crate::environment::{EnvironmentReader, ProcessEnvironment};
use crate::error::{DecodeError, Error};
use crate::fields::FieldResolver;
use crate::files::{self, ConfigurationFile};
use crate::format::{self, Format};
use crate::schema::Configurable;
use crate::value::{self, deep_merge};
use serde_yaml::Value;
use std::path::Path;
use std::sync::OnceLock;

/// Explicit environment name
pub const ENV_VAR: &str = "CONFIGOR_ENV";
/// Prefix override, `-` disables prefixing
pub const ENV_PREFIX_VAR: &str = "CONFIGOR_ENV_PREFIX";
pub const DEBUG_MODE_VAR: &str = "CONFIGOR_DEBUG_MODE";
pub const VERBOSE_MODE_VAR: &str = "CONFIGOR_VERBOSE_MODE";

/// Prefix used when none is configured
pub const DEFAULT_PREFIX: &str = "Configor";

/// Options of a [Configor]
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Environment name, e.g. `production`. Detected when not set.
    pub environment: Option<String>,
    /// Prefix of environment variable names. `-` disables prefixing, unset or
    /// empty means [DEFAULT_PREFIX].
    pub env_prefix: Option<String>,
    pub debug: bool,
    pub verbose: bool,
    /// Fail on keys in files that the target does not declare
    pub error_on_unmatched_keys: bool,
}

impl Config {
    /// The configured prefix, `None` when prefixing is disabled
    fn prefix(&self) -> Option<String> {
        match self.env_prefix.as_deref() {
            Some("-") => None,
            None | Some("") => Some(DEFAULT_PREFIX.to_string()),
            Some(prefix) => Some(prefix.to_string()),
        }
    }
}

/// Loads configuration structs from files, environment variables and defaults
#[derive(Debug)]
pub struct Configor<E = ProcessEnvironment> {
    config: Config,
    global_prefix: Option<String>,
    environment: E,
}

impl Configor<ProcessEnvironment> {
    pub fn new(config: Config) -> Self {
        Self::with_environment(config, ProcessEnvironment)
    }
}

impl Default for Configor<ProcessEnvironment> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<E: EnvironmentReader> Configor<E> {
    /// Uses `environment` instead of the process environment
    pub fn with_environment(mut config: Config, environment: E) -> Self {
        if environment.lookup(DEBUG_MODE_VAR).is_some() {
            config.debug = true;
        }

        if environment.lookup(VERBOSE_MODE_VAR).is_some() {
            config.verbose = true;
        }

        let global_prefix = match environment.lookup(ENV_PREFIX_VAR) {
            Some(prefix) if prefix == "-" => None,
            Some(prefix) => Some(prefix),
            None => config.prefix(),
        };

        Self {
            config,
            global_prefix,
            environment,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Prefix at the root of all environment variable names
    pub fn global_prefix(&self) -> Option<&str> {
        self.global_prefix.as_deref()
    }

    pub fn error_on_unmatched_keys(&self) -> bool {
        self.config.error_on_unmatched_keys
    }

    /// Name of the current environment
    ///
    /// The configured name, else `CONFIGOR_ENV`, else `test` when running as a
    /// test binary, else `development`.
    pub fn environment(&self) -> String {
        if let Some(environment) = self.config.environment.as_deref().filter(|e| !e.is_empty()) {
            return environment.to_string();
        }

        if let Some(environment) = self.environment.lookup(ENV_VAR) {
            return environment;
        }

        let is_test = self
            .environment
            .program_name()
            .is_some_and(|program| test_program_pattern().is_match(&program));

        if is_test {
            "test".to_string()
        } else {
            "development".to_string()
        }
    }

    /// Files that [load](Self::load) decodes for `files`, in order
    pub fn configuration_files<P: AsRef<Path>>(&self, files: &[P]) -> Vec<ConfigurationFile> {
        let environment = self.environment();
        if self.diagnostics() {
            tracing::info!(%environment, "Current environment");
        }

        files::resolve(files, &environment)
    }

    /// Resolves a `T` from `files`, environment variables and defaults
    pub fn load<T: Configurable, P: AsRef<Path>>(&self, files: &[P]) -> Result<T, Error> {
        self.resolve::<T, P>(value::empty(), files)
    }

    /// Like [load](Self::load), starting from the values already in `target`
    ///
    /// `target` is only updated when resolution succeeds.
    pub fn load_into<T: Configurable, P: AsRef<Path>>(&self, target: &mut T, files: &[P]) -> Result<(), Error> {
        let seed = serde_yaml::to_value(&*target).map_err(Error::Convert)?;
        *target = self.resolve::<T, P>(seed, files)?;
        Ok(())
    }

    /// Decodes and merges `files` without a target type
    ///
    /// Environment variables and defaults are not applied.
    pub fn merge<P: AsRef<Path>>(&self, files: &[P]) -> Result<Value, Error> {
        let mut tree = value::empty();
        for file in self.configuration_files(files) {
            let text = self.read(&file.path)?;
            let document = format::decode_untyped(&text, Format::from_path(&file.path))
                .map_err(|source| Error::Decode {
                    path: file.path.clone(),
                    source,
                })?;
            tree = deep_merge(tree, document);
        }

        Ok(tree)
    }

    fn resolve<T: Configurable, P: AsRef<Path>>(&self, mut tree: Value, files: &[P]) -> Result<T, Error> {
        for file in self.configuration_files(files) {
            if self.diagnostics() {
                tracing::info!(path = %file.path.display(), origin = %file.origin, "Loading configurations from file");
            }

            let document = self.decode_file::<T>(&file.path)?;
            tree = deep_merge(tree, document);
        }

        let prefixes: Vec<String> = self.global_prefix.iter().cloned().collect();
        FieldResolver::new(
            &self.environment,
            self.global_prefix(),
            self.config.debug,
            self.config.verbose,
        )
        .apply(&mut tree, &T::fields(), &prefixes)?;

        if self.diagnostics() {
            tracing::info!(configuration = ?tree, "Configuration");
        }

        serde_yaml::from_value(tree).map_err(Error::Convert)
    }

    fn decode_file<T: Configurable>(&self, path: &Path) -> Result<Value, Error> {
        let text = self.read(path)?;
        format::decode::<T>(&text, Format::from_path(path), self.error_on_unmatched_keys()).map_err(
            |source| match source {
                DecodeError::UnmatchedKeys(err) => Error::UnmatchedKeys(err),
                source => Error::Decode {
                    path: path.to_owned(),
                    source,
                },
            },
        )
    }

    fn read(&self, path: &Path) -> Result<String, Error> {
        std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })
    }

    fn diagnostics(&self) -> bool {
        self.config.debug || self.config.verbose
    }
}

fn test_program_pattern() -> &'static regex_lite::Regex {
    static PATTERN: OnceLock<regex_lite::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex_lite::Regex::new(r"_test|(\.test$)").expect("pattern is valid"))
}
