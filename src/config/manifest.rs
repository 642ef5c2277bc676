//! Interpretation of the primary config value.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use super::ConfigValue;
use crate::context::Directories;
use crate::{ApplicationContext, Error};

/// Context settings a TOML primary config may carry.
///
/// ```toml
/// name = "storefront"
/// replace_directories = false
///
/// [directories]
/// logs = "/var/log/storefront"
/// uploads = "${app.directories.storage}/uploads"
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContextManifest {
    name: Option<String>,
    #[serde(default)]
    replace_directories: bool,
    #[serde(default)]
    directories: BTreeMap<String, PathBuf>,
}

/// Turns the value produced by the primary source into the final context.
///
/// A source may hand back a context directly or a TOML table that is applied
/// to `current`. Anything else breaks the contract.
pub(crate) fn into_context(
    value: ConfigValue,
    current: ApplicationContext,
    source_name: &str,
) -> Result<ApplicationContext, Error> {
    if let Some(context) = value.downcast::<ApplicationContext>() {
        return Ok(Arc::unwrap_or_clone(context));
    }

    if let Some(table) = value.downcast::<toml::Table>() {
        let manifest: ContextManifest = toml::Value::Table(Arc::unwrap_or_clone(table))
            .try_into()
            .map_err(|e: toml::de::Error| Error::contract(source_name, e.message()))?;
        return Ok(manifest.apply(current));
    }

    Err(Error::contract(
        source_name,
        format!(
            "must return an ApplicationContext, returned {}",
            value.type_name()
        ),
    ))
}

impl ContextManifest {
    fn apply(self, current: ApplicationContext) -> ApplicationContext {
        let root = current.get_directory("root").map(PathBuf::from);
        let absolute = |path: PathBuf| match &root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        };
        let overrides = self
            .directories
            .into_iter()
            .map(|(role, path)| (role, absolute(path)));

        let context = if self.replace_directories {
            current.configure_directories(overrides.collect::<Directories>())
        } else {
            overrides.fold(current, |ctx, (role, path)| ctx.with_directory(role, path))
        };

        match self.name {
            Some(name) => context.with_name(name),
            None => context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryLoader;
    use crate::{Bootstrap, Environment};
    use std::path::Path;
    use tempfile::TempDir;

    fn base_context(root: &TempDir) -> ApplicationContext {
        Bootstrap::new(root.path())
            .with_environment(Environment::empty())
            .with_loader(
                MemoryLoader::new().with_fn("app.toml", |ctx| Ok(ConfigValue::new(ctx.clone()))),
            )
            .create()
            .unwrap()
    }

    fn table(toml_str: &str) -> ConfigValue {
        ConfigValue::new(toml::from_str::<toml::Table>(toml_str).unwrap())
    }

    #[test]
    fn test_manifest_overlays_directories() {
        let root = TempDir::new().unwrap();
        let ctx = base_context(&root);

        let value = table(
            r#"
            name = "storefront"
            [directories]
            logs = "/var/log/storefront"
            uploads = "public/uploads"
            "#,
        );
        let ctx = into_context(value, ctx, "app.toml").unwrap();

        assert_eq!(ctx.name(), "storefront");
        assert_eq!(ctx.get_directory("logs"), Some(Path::new("/var/log/storefront")));
        assert_eq!(
            ctx.get_directory("uploads"),
            Some(root.path().join("public/uploads").as_path())
        );
        assert_eq!(ctx.get_directory("cache"), Some(root.path().join("cache").as_path()));
        assert_eq!(ctx.directories().len(), 14);
    }

    #[test]
    fn test_manifest_replaces_directories() {
        let root = TempDir::new().unwrap();
        let ctx = base_context(&root);

        let value = table(
            r#"
            replace_directories = true
            [directories]
            config = "/etc/storefront"
            "#,
        );
        let ctx = into_context(value, ctx, "app.toml").unwrap();

        assert_eq!(ctx.directories().len(), 1);
        assert_eq!(ctx.get_directory("config"), Some(Path::new("/etc/storefront")));
        assert_eq!(ctx.get_directory("root"), None);
        assert_eq!(ctx.name(), "");
    }

    #[test]
    fn test_manifest_rejects_unknown_keys_and_types() {
        let root = TempDir::new().unwrap();

        for bad in ["nmae = \"typo\"", "name = 5", "[directories]\nlogs = 3"] {
            let err = into_context(table(bad), base_context(&root), "app.toml").unwrap_err();
            assert!(
                matches!(err, Error::ConfigContractViolation { .. }),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_other_values_break_contract() {
        let root = TempDir::new().unwrap();
        let err = into_context(
            ConfigValue::new(String::from("not a context")),
            base_context(&root),
            "app.toml",
        )
        .unwrap_err();

        match err {
            Error::ConfigContractViolation { source_name, reason } => {
                assert_eq!(source_name, "app.toml");
                assert!(reason.contains("String"), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
