//! discovery of the files to load
//!
//! Every candidate path handed to [resolve] expands into up to two files:
//! - the candidate itself (`config.yaml`)
//! - its environment sibling (`config.production.yaml`)
//!
//! and only when neither exists, the example sibling (`config.example.yaml`).
//!
//! Candidates are visited last to first. Later files overwrite earlier ones
//! when merged, so the first candidate wins and environment siblings win over
//! their base file.
use std::path::{Path, PathBuf};

/// Why a file was picked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The candidate path itself
    Base,
    /// `name.ENV.ext` next to the candidate
    Environment,
    /// `name.example.ext`, used because nothing else was found
    Example,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Base => f.write_str("base"),
            Origin::Environment => f.write_str("environment"),
            Origin::Example => f.write_str("example"),
        }
    }
}

#[derive(derive_new::new, Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationFile {
    pub path: PathBuf,
    pub origin: Origin,
}

/// Files to decode, in decoding order
pub fn resolve<P: AsRef<Path>>(candidates: &[P], environment: &str) -> Vec<ConfigurationFile> {
    let mut files = vec![];

    for candidate in candidates.iter().rev() {
        let candidate = candidate.as_ref();
        let mut found = false;

        if is_regular_file(candidate) {
            found = true;
            files.push(ConfigurationFile::new(candidate.to_owned(), Origin::Base));
        }

        let environment_file = with_environment(candidate, environment);
        if is_regular_file(&environment_file) {
            found = true;
            files.push(ConfigurationFile::new(environment_file, Origin::Environment));
        }

        if found {
            continue;
        }

        let example = with_environment(candidate, "example");
        if is_regular_file(&example) {
            tracing::warn!(
                path = %candidate.display(),
                example = %example.display(),
                "Failed to find configuration, using example file"
            );
            files.push(ConfigurationFile::new(example, Origin::Example));
        } else {
            tracing::warn!(path = %candidate.display(), "Failed to find configuration");
        }
    }

    files
}

/// `dir/name.ext` becomes `dir/name.ENV.ext`, `dir/name` becomes `dir/name.ENV`
pub fn with_environment(path: &Path, environment: &str) -> PathBuf {
    let Some(file_name) = path.file_name() else {
        return path.to_owned();
    };

    let file_name = match (path.file_stem(), path.extension()) {
        (Some(stem), Some(extension)) => format!(
            "{}.{environment}.{}",
            stem.to_string_lossy(),
            extension.to_string_lossy()
        ),
        _ => format!("{}.{environment}", file_name.to_string_lossy()),
    };

    path.with_file_name(file_name)
}

fn is_regular_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn environment_file_names() {
        assert_eq!(
            with_environment(Path::new("/etc/app/config.yaml"), "production"),
            PathBuf::from("/etc/app/config.production.yaml")
        );
        assert_eq!(
            with_environment(Path::new("config"), "test"),
            PathBuf::from("config.test")
        );
        assert_eq!(
            with_environment(Path::new("dir/app.config.json"), "example"),
            PathBuf::from("dir/app.config.example.json")
        );
    }

    #[test]
    fn base_and_environment_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("config.yaml");
        let production = dir.path().join("config.production.yaml");
        std::fs::write(&base, "").unwrap();
        std::fs::write(&production, "").unwrap();

        assert_eq!(
            resolve(&[&base], "production"),
            vec![
                ConfigurationFile::new(base.clone(), Origin::Base),
                ConfigurationFile::new(production, Origin::Environment),
            ]
        );
        assert_eq!(
            resolve(&[&base], "development"),
            vec![ConfigurationFile::new(base.clone(), Origin::Base)]
        );
    }

    #[test]
    fn environment_file_without_base() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("config.toml");
        let test = dir.path().join("config.test.toml");
        std::fs::write(&test, "").unwrap();

        assert_eq!(
            resolve(&[&base], "test"),
            vec![ConfigurationFile::new(test, Origin::Environment)]
        );
    }

    #[test]
    fn candidates_are_reversed() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");
        std::fs::write(&first, "{}").unwrap();
        std::fs::write(&second, "{}").unwrap();

        let paths: Vec<_> = resolve(&[&first, &second], "development")
            .into_iter()
            .map(|file| file.path)
            .collect();

        assert_eq!(paths, vec![second, first]);
    }

    #[test]
    fn example_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("database.yml");
        let example = dir.path().join("database.example.yml");

        assert_eq!(resolve(&[&missing], "development"), Vec::<ConfigurationFile>::new());

        std::fs::write(&example, "").unwrap();
        assert_eq!(
            resolve(&[&missing], "development"),
            vec![ConfigurationFile::new(example, Origin::Example)]
        );
    }

    #[test]
    fn directories_are_not_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("config.development")).unwrap();

        assert_eq!(resolve(&[dir.path().join("config")], "development"), Vec::<ConfigurationFile>::new());
    }
}
