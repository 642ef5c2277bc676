//! Directory roles and their paths.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The directory roles every freshly created context knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DirectoryRole {
    Root,
    Web,
    Bin,
    Runtime,
    Cache,
    Temp,
    Logs,
    Config,
    Resources,
    Storage,
    Backups,
    Data,
    Themes,
}

impl DirectoryRole {
    pub const ALL: [DirectoryRole; 13] = [
        DirectoryRole::Root,
        DirectoryRole::Web,
        DirectoryRole::Bin,
        DirectoryRole::Runtime,
        DirectoryRole::Cache,
        DirectoryRole::Temp,
        DirectoryRole::Logs,
        DirectoryRole::Config,
        DirectoryRole::Resources,
        DirectoryRole::Storage,
        DirectoryRole::Backups,
        DirectoryRole::Data,
        DirectoryRole::Themes,
    ];

    /// Key of the role in a [`Directories`] map.
    pub fn as_str(self) -> &'static str {
        match self {
            DirectoryRole::Root => "root",
            DirectoryRole::Web => "web",
            DirectoryRole::Bin => "bin",
            DirectoryRole::Runtime => "runtime",
            DirectoryRole::Cache => "cache",
            DirectoryRole::Temp => "temp",
            DirectoryRole::Logs => "logs",
            DirectoryRole::Config => "config",
            DirectoryRole::Resources => "resources",
            DirectoryRole::Storage => "storage",
            DirectoryRole::Backups => "backups",
            DirectoryRole::Data => "data",
            DirectoryRole::Themes => "themes",
        }
    }

    /// Path segment below the installation root. `None` for the root itself.
    pub fn segment(self) -> Option<&'static str> {
        match self {
            DirectoryRole::Root => None,
            DirectoryRole::Web => Some("public"),
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for DirectoryRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Open mapping of role name to path.
///
/// Roles are plain strings so applications can add their own next to the
/// built-in [`DirectoryRole`]s. The map is shared between context copies and
/// copied only when a context changes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directories {
    entries: Arc<BTreeMap<String, PathBuf>>,
}

impl Directories {
    /// The built-in roles laid out below `base`.
    pub fn defaults_for(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        DirectoryRole::ALL
            .iter()
            .map(|role| {
                let path = match role.segment() {
                    Some(segment) => base.join(segment),
                    None => base.to_path_buf(),
                };
                (role.as_str(), path)
            })
            .collect()
    }

    /// Path of `role`, if the map has it.
    pub fn get(&self, role: &str) -> Option<&Path> {
        self.entries.get(role).map(PathBuf::as_path)
    }

    pub fn contains(&self, role: &str) -> bool {
        self.entries.contains_key(role)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Roles and paths in role-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }

    /// Copy of this map with `role` set to `path`.
    pub(crate) fn with(&self, role: String, path: PathBuf) -> Self {
        let mut entries = (*self.entries).clone();
        entries.insert(role, path);
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Same mapping as a TOML table, for `${app.directories.*}` references.
    pub(crate) fn to_table(&self) -> toml::Table {
        self.entries
            .iter()
            .map(|(role, path)| {
                let path = path.to_string_lossy().into_owned();
                (role.clone(), toml::Value::String(path))
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<PathBuf>> FromIterator<(K, V)> for Directories {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: Arc::new(
                iter.into_iter()
                    .map(|(role, path)| (role.into(), path.into()))
                    .collect(),
            ),
        }
    }
}

impl<K: Into<String>, V: Into<PathBuf>, const N: usize> From<[(K, V); N]> for Directories {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<PathBuf>> From<HashMap<K, V>> for Directories {
    fn from(entries: HashMap<K, V>) -> Self {
        entries.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<PathBuf>> From<BTreeMap<K, V>> for Directories {
    fn from(entries: BTreeMap<K, V>) -> Self {
        entries.into_iter().collect()
    }
}
