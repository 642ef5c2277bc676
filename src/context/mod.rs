//! The immutable application context and the bootstrap that creates it.

mod directories;
mod environment;

use std::any::{self, Any};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::{self, ConfigCache, ConfigError, ConfigValue, FileLoader, SourceLoader};
use crate::Error;

pub use directories::{Directories, DirectoryRole};
pub use environment::{Environment, DEVELOPMENT_KEY};

/// File name of the primary config, looked up in the `config` directory.
pub const PRIMARY_CONFIG_FILE: &str = "app.toml";

/// Immutable description of a running application.
///
/// Nothing on a context mutates it: [`with_name`](Self::with_name),
/// [`configure_directories`](Self::configure_directories) and
/// [`with_directory`](Self::with_directory) return a new context and leave the
/// receiver as it was. Copies share the secondary [`ConfigCache`], so a config
/// file loaded through one copy is never evaluated again through another.
///
/// ## Example
///
/// ```no_run
/// use app_bootstrap::ApplicationContext;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Database {
///     url: String,
/// }
///
/// let ctx = ApplicationContext::create("/srv/storefront")?;
/// let logs = ctx.get_directory("logs");
/// let db: Database = ctx.deserialize_config("database.toml")?;
/// # Ok::<(), app_bootstrap::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ApplicationContext {
    name: String,
    directories: Directories,
    environment: Environment,
    loader: Arc<dyn SourceLoader>,
    cache: ConfigCache,
}

impl ApplicationContext {
    /// Bootstraps a context rooted at `base` with the default loader,
    /// the process environment and a fresh config cache.
    pub fn create(base: impl AsRef<Path>) -> Result<Self, Error> {
        Bootstrap::new(base).create()
    }

    /// Free-form name of the application, empty unless configured.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a copy named `name`.
    #[must_use]
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Returns a copy whose directory mapping is exactly `dirs`.
    ///
    /// The mapping is replaced, not merged: roles missing from `dirs` are gone.
    #[must_use]
    pub fn configure_directories(&self, dirs: impl Into<Directories>) -> Self {
        Self {
            directories: dirs.into(),
            ..self.clone()
        }
    }

    /// Returns a copy with a single role set, keeping all others.
    #[must_use]
    pub fn with_directory(&self, role: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            directories: self.directories.with(role.into(), path.into()),
            ..self.clone()
        }
    }

    /// Every configured role and its path.
    pub fn directories(&self) -> &Directories {
        &self.directories
    }

    /// Path of `role`, or `None` when the role is not configured.
    pub fn get_directory(&self, role: &str) -> Option<&Path> {
        self.directories.get(role)
    }

    /// Typed form of [`get_directory`](Self::get_directory) for built-in roles.
    pub fn directory(&self, role: DirectoryRole) -> Option<&Path> {
        self.get_directory(role.as_str())
    }

    /// The environment variables this context reads.
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// See [`Environment::get`].
    pub fn get_from_environment(&self, key: &str, default: Option<&str>) -> Result<String, Error> {
        self.environment.get(key, default)
    }

    /// See [`Environment::in_development`].
    pub fn in_development(&self) -> bool {
        self.environment.in_development()
    }

    /// The secondary config cache shared by all copies of this context.
    pub fn cache(&self) -> &ConfigCache {
        &self.cache
    }

    /// Loads the secondary config `filename` from the `config` directory.
    ///
    /// The first successful call evaluates the source with this context and
    /// caches the result; every later call for the same filename, through any
    /// copy sharing the cache, returns that value without touching the source.
    pub fn get_config_from_file(&self, filename: &str) -> Result<ConfigValue, Error> {
        self.cache.get_or_load(filename, || {
            let path = self.config_path(filename)?;
            let source = self.loader.open(&path)?;
            source.load(self)
        })
    }

    /// Like [`get_config_from_file`](Self::get_config_from_file), for a source
    /// known to produce a `T`.
    pub fn config_from_file<T: Any + Send + Sync>(&self, filename: &str) -> Result<Arc<T>, Error> {
        self.get_config_from_file(filename)?
            .downcast::<T>()
            .ok_or_else(|| Error::ConfigTypeMismatch {
                filename: filename.to_owned(),
                expected: any::type_name::<T>(),
            })
    }

    /// Deserializes a TOML secondary config into `T`.
    ///
    /// The resolved table is cached; deserialization runs on every call.
    pub fn deserialize_config<T: DeserializeOwned>(&self, filename: &str) -> Result<T, Error> {
        let table = self.config_from_file::<toml::Table>(filename)?;
        let value = toml::Value::Table(table.as_ref().clone());
        Ok(value.try_into::<T>().map_err(ConfigError::from)?)
    }

    /// Values of this context visible to `${app.*}` references.
    pub(crate) fn app_scope(&self) -> toml::Table {
        let mut scope = toml::Table::new();
        scope.insert("name".into(), toml::Value::String(self.name.clone()));
        scope.insert(
            "directories".into(),
            toml::Value::Table(self.directories.to_table()),
        );
        scope
    }

    /// Location of `filename` below the `config` directory.
    ///
    /// Names that carry a root or drive prefix would escape that directory and
    /// are reported as missing, as is every name once the role is gone.
    fn config_path(&self, filename: &str) -> Result<PathBuf, Error> {
        let relative = Path::new(filename);
        let escapes = relative
            .components()
            .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)));

        match self.directory(DirectoryRole::Config) {
            Some(dir) if !escapes => Ok(dir.join(relative)),
            _ => Err(Error::MissingConfigFile(relative.to_path_buf())),
        }
    }

    /// Runs the primary config against this context and returns its result.
    ///
    /// Deliberately bypasses the cache: every bootstrap evaluates it afresh.
    fn configure_from_file(self, filename: &str) -> Result<Self, Error> {
        let path = self.config_path(filename)?;
        debug!(path = %path.display(), "loading primary config");

        let source = self.loader.open(&path)?;
        let value = source.load(&self)?;
        config::into_context(value, self, &path.display().to_string())
    }
}

/// Builder for the first [`ApplicationContext`] of a process.
///
/// Collects the collaborators a context needs (where the primary config lives,
/// how sources are loaded, which environment is read, which cache is shared)
/// and runs the bootstrap in [`create`](Self::create).
#[derive(Debug)]
#[must_use = "builders do nothing until .create() is called"]
pub struct Bootstrap {
    base: PathBuf,
    primary_file: String,
    loader: Arc<dyn SourceLoader>,
    environment: Environment,
    cache: ConfigCache,
}

impl Bootstrap {
    /// Starts a bootstrap for the installation rooted at `base`.
    ///
    /// Defaults to [`FileLoader`], the process environment and an empty cache.
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
            primary_file: PRIMARY_CONFIG_FILE.to_owned(),
            loader: Arc::new(FileLoader),
            environment: Environment::Process,
            cache: ConfigCache::new(),
        }
    }

    /// Overrides the primary config file name (default [`PRIMARY_CONFIG_FILE`]).
    pub fn with_primary_file(mut self, filename: impl Into<String>) -> Self {
        self.primary_file = filename.into();
        self
    }

    /// Replaces the strategy used to open config sources.
    pub fn with_loader(mut self, loader: impl SourceLoader + 'static) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    /// Replaces the environment the context reads variables from.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Shares an existing cache instead of starting with an empty one.
    pub fn with_cache(mut self, cache: ConfigCache) -> Self {
        self.cache = cache;
        self
    }

    /// Validates the root, lays out the default directories and applies the
    /// primary config.
    ///
    /// Fails with [`Error::Environment`] before touching any config when `base`
    /// is not an existing directory.
    pub fn create(self) -> Result<ApplicationContext, Error> {
        if !self.base.is_dir() {
            return Err(Error::Environment { path: self.base });
        }

        let context = ApplicationContext {
            name: String::new(),
            directories: Directories::defaults_for(&self.base),
            environment: self.environment,
            loader: self.loader,
            cache: self.cache,
        }
        .configure_from_file(&self.primary_file)?;

        info!(
            name = %context.name,
            root = %self.base.display(),
            directories = context.directories.len(),
            "application context created"
        );
        Ok(context)
    }
}
