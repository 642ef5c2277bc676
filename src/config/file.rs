//! File-backed TOML configuration sources.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::resolve::resolve_references;
use super::source::{ConfigSource, SourceLoader};
use super::ConfigValue;
use crate::{ApplicationContext, Error};

/// Loader that reads TOML files from disk.
///
/// This is the loader a [`Bootstrap`](crate::Bootstrap) uses unless another
/// one is injected.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl SourceLoader for FileLoader {
    fn open(&self, path: &Path) -> Result<Arc<dyn ConfigSource>, Error> {
        Ok(Arc::new(TomlSource::from_file(path)?))
    }
}

/// A parsed TOML file, interpreted against the context when loaded.
///
/// Loading resolves `${...}` references (see [`APP_SCOPE`](super::APP_SCOPE)
/// for the context values they can reach) and yields the resulting
/// [`toml::Table`].
#[derive(Debug, Clone)]
pub struct TomlSource {
    origin: PathBuf,
    table: toml::Table,
}

impl TomlSource {
    /// Reads and parses the file at `path`.
    ///
    /// A file that cannot be read is a [`Error::MissingConfigFile`]; a file that
    /// is not a TOML table breaks the source contract.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            debug!(path = %path.display(), error = %e, "config file unreadable");
            Error::MissingConfigFile(path.to_path_buf())
        })?;
        Self::parse(path, &contents)
    }

    /// Parses `contents` as if read from `origin`.
    pub fn parse(origin: impl AsRef<Path>, contents: &str) -> Result<Self, Error> {
        let origin = origin.as_ref().to_path_buf();
        let table = toml::from_str(contents).map_err(|e: toml::de::Error| {
            Error::contract(
                origin.display().to_string(),
                format!("not a valid TOML table: {}", e.message()),
            )
        })?;
        Ok(Self { origin, table })
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }
}

impl ConfigSource for TomlSource {
    fn load(&self, context: &ApplicationContext) -> Result<ConfigValue, Error> {
        let mut table = self.table.clone();
        resolve_references(&mut table, &context.app_scope())?;
        Ok(ConfigValue::new(table))
    }
}
