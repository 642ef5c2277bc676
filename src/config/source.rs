use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::ConfigValue;
use crate::{ApplicationContext, Error};

/// A unit of configuration that is evaluated against the application context.
///
/// The primary source must produce an [`ApplicationContext`] (or a TOML
/// manifest describing one); secondary sources may produce anything.
pub trait ConfigSource: Send + Sync + fmt::Debug {
    fn load(&self, context: &ApplicationContext) -> Result<ConfigValue, Error>;
}

/// Turns the resolved path of a config file into a [`ConfigSource`].
///
/// Opening must not evaluate anything that depends on the context; that
/// happens later in [`ConfigSource::load`]. Implementations report
/// [`Error::MissingConfigFile`] when nothing can be read at `path`.
pub trait SourceLoader: Send + Sync + fmt::Debug {
    fn open(&self, path: &Path) -> Result<Arc<dyn ConfigSource>, Error>;
}

/// A config source backed by a closure.
pub struct FnSource<F> {
    name: String,
    func: F,
}

impl<F> FnSource<F>
where
    F: Fn(&ApplicationContext) -> Result<ConfigValue, Error> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> fmt::Debug for FnSource<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSource").field("name", &self.name).finish()
    }
}

impl<F> ConfigSource for FnSource<F>
where
    F: Fn(&ApplicationContext) -> Result<ConfigValue, Error> + Send + Sync,
{
    fn load(&self, context: &ApplicationContext) -> Result<ConfigValue, Error> {
        (self.func)(context)
    }
}

/// In-memory loader, mostly useful as a test double.
///
/// Sources are registered under a relative file name such as `app.toml` or
/// `mail/smtp.toml` and match any resolved path ending with those components.
#[derive(Debug, Default, Clone)]
#[must_use = "loaders do nothing until handed to a Bootstrap"]
pub struct MemoryLoader {
    sources: BTreeMap<PathBuf, Arc<dyn ConfigSource>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(
        mut self,
        filename: impl AsRef<Path>,
        source: impl ConfigSource + 'static,
    ) -> Self {
        self.sources
            .insert(filename.as_ref().to_path_buf(), Arc::new(source));
        self
    }

    /// Registers a closure as the source for `filename`.
    pub fn with_fn<F>(self, filename: impl AsRef<Path>, func: F) -> Self
    where
        F: Fn(&ApplicationContext) -> Result<ConfigValue, Error> + Send + Sync + 'static,
    {
        let name = filename.as_ref().display().to_string();
        self.with_source(filename, FnSource::new(name, func))
    }
}

impl SourceLoader for MemoryLoader {
    fn open(&self, path: &Path) -> Result<Arc<dyn ConfigSource>, Error> {
        // Longest registration wins so `db/app.toml` beats `app.toml`.
        self.sources
            .iter()
            .filter(|(name, _)| path.ends_with(name))
            .max_by_key(|(name, _)| name.components().count())
            .map(|(_, source)| Arc::clone(source))
            .ok_or_else(|| Error::MissingConfigFile(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(n: u32) -> impl Fn(&ApplicationContext) -> Result<ConfigValue, Error> + Send + Sync {
        move |_| Ok(ConfigValue::new(n))
    }

    #[test]
    fn test_memory_loader_matches_path_suffix() {
        let loader = MemoryLoader::new()
            .with_fn("app.toml", number(1))
            .with_fn("db/app.toml", number(2));

        let source = loader.open(Path::new("/srv/config/db/app.toml")).unwrap();
        assert_eq!(format!("{source:?}"), r#"FnSource { name: "db/app.toml" }"#);

        let source = loader.open(Path::new("/srv/config/app.toml")).unwrap();
        assert_eq!(format!("{source:?}"), r#"FnSource { name: "app.toml" }"#);
    }

    #[test]
    fn test_memory_loader_missing_source() {
        let loader = MemoryLoader::new().with_fn("app.toml", number(1));
        let err = loader.open(Path::new("/srv/config/mail.toml")).unwrap_err();

        assert!(
            matches!(err, Error::MissingConfigFile(ref p) if p == Path::new("/srv/config/mail.toml"))
        );
    }

    #[test]
    fn test_suffix_match_is_per_component() {
        let loader = MemoryLoader::new().with_fn("app.toml", number(1));
        assert!(loader.open(Path::new("/srv/config/webapp.toml")).is_err());
    }
}
