//! access to environment variables and the program name
//!
//! Resolution only ever reads the environment. Everything goes through
//! [EnvironmentReader] so callers (and tests) can substitute their own source.
use indexmap::IndexMap;

/// Read-only view of environment variables
pub trait EnvironmentReader {
    /// Raw value of a variable, if it is set
    fn var(&self, name: &str) -> Option<String>;

    /// Name the current process was started as
    fn program_name(&self) -> Option<String> {
        std::env::args().next()
    }

    /// Value of a variable that is set and not empty
    fn lookup(&self, name: &str) -> Option<String> {
        self.var(name).filter(|value| !value.is_empty())
    }
}

// blanket impl for lookup closures
impl<F> EnvironmentReader for F
where
    F: Fn(&str) -> Option<String>,
{
    fn var(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// The real process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl EnvironmentReader for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// A fixed set of variables
///
/// ```
/// # use configor::environment::{EnvironmentReader, MapEnvironment};
/// let env = MapEnvironment::default()
///     .set("CONFIGOR_ENV", "production")
///     .set("EMPTY", "");
///
/// assert_eq!(env.lookup("CONFIGOR_ENV").as_deref(), Some("production"));
/// assert_eq!(env.lookup("EMPTY"), None);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MapEnvironment {
    vars: IndexMap<String, String>,
    program: Option<String>,
}

impl MapEnvironment {
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn program(mut self, name: impl Into<String>) -> Self {
        self.program = Some(name.into());
        self
    }
}

impl EnvironmentReader for MapEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn program_name(&self) -> Option<String> {
        self.program.clone()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnvironment {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            program: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn closures_are_readers() {
        let reader = |name: &str| (name == "HOME").then(|| "/root".to_string());

        assert_eq!(reader.lookup("HOME").as_deref(), Some("/root"));
        assert_eq!(reader.lookup("PATH"), None);
    }

    #[test]
    fn collect_into_map_environment() {
        let env: MapEnvironment = [("A", "1"), ("B", "2")].into_iter().collect();

        assert_eq!(env.var("B").as_deref(), Some("2"));
        assert_eq!(env.program_name(), None);
    }
}
