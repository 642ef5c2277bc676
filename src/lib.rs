pub mod config;
pub mod context;
mod error;

pub use config::{ConfigCache, ConfigError, ConfigSource, ConfigValue, SourceLoader};
pub use context::{ApplicationContext, Bootstrap, Directories, DirectoryRole, Environment};
pub use error::Error;
