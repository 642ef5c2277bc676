//! Configuration sources, loaders and the shared memo cache.

mod cache;
mod error;
mod file;
mod manifest;
mod resolve;
mod source;
mod value;

pub use cache::ConfigCache;
pub use error::ConfigError;
pub use file::{FileLoader, TomlSource};
pub use resolve::APP_SCOPE;
pub use source::{ConfigSource, FnSource, MemoryLoader, SourceLoader};
pub use value::ConfigValue;

pub(crate) use manifest::into_context;
