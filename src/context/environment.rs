//! Environment variable lookup.

use std::collections::HashMap;
use std::sync::Arc;

use crate::Error;

/// Variable that switches a context into development mode.
pub const DEVELOPMENT_KEY: &str = "DEVELOPMENT";

/// Where a context reads environment variables from.
#[derive(Debug, Clone, Default)]
pub enum Environment {
    /// The variables of the running process.
    #[default]
    Process,
    /// A fixed set of variables.
    Fixed(Arc<HashMap<String, String>>),
}

impl Environment {
    /// Lookups go to the variables of the running process.
    pub fn process() -> Self {
        Environment::Process
    }

    /// A fixed set of variables, independent of the process.
    pub fn from_pairs<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Environment::Fixed(Arc::new(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    /// An environment with no variables at all.
    pub fn empty() -> Self {
        Environment::Fixed(Arc::default())
    }

    /// Raw lookup. Non-UTF-8 process values are converted lossily.
    pub fn var(&self, key: &str) -> Option<String> {
        match self {
            Environment::Process => {
                std::env::var_os(key).map(|v| v.to_string_lossy().into_owned())
            }
            Environment::Fixed(vars) => vars.get(key).cloned(),
        }
    }

    /// Looks up `key`, falling back to `default` when it is not set.
    ///
    /// A set variable is returned verbatim, even when empty or `"0"`. Any
    /// supplied default is honoured, including an empty one; only a missing
    /// default makes an unset variable an error.
    pub fn get(&self, key: &str, default: Option<&str>) -> Result<String, Error> {
        if let Some(value) = self.var(key) {
            return Ok(value);
        }
        default
            .map(str::to_owned)
            .ok_or_else(|| Error::MissingEnvironmentVariable(key.to_owned()))
    }

    /// True iff [`DEVELOPMENT_KEY`] is set to exactly `true`.
    pub fn in_development(&self) -> bool {
        self.var(DEVELOPMENT_KEY)
            .is_some_and(|v| v == "true")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment::from_pairs([("APP_PORT", "8080"), ("EMPTY", ""), ("ZERO", "0")])
    }

    #[test]
    fn test_set_values_are_verbatim() {
        let env = env();
        assert_eq!(env.get("APP_PORT", None).unwrap(), "8080");
        assert_eq!(env.get("EMPTY", Some("fallback")).unwrap(), "");
        assert_eq!(env.get("ZERO", Some("fallback")).unwrap(), "0");
    }

    #[test]
    fn test_unset_without_default_fails() {
        let err = env().get("UNSET_KEY", None).unwrap_err();
        assert!(matches!(err, Error::MissingEnvironmentVariable(ref k) if k == "UNSET_KEY"));
    }

    #[test]
    fn test_unset_with_default() {
        assert_eq!(env().get("UNSET_KEY", Some("fallback")).unwrap(), "fallback");
    }

    #[test]
    fn test_empty_default_is_honoured() {
        assert_eq!(env().get("UNSET_KEY", Some("")).unwrap(), "");
        assert_eq!(env().get("UNSET_KEY", Some("0")).unwrap(), "0");
    }

    #[test]
    fn test_in_development() {
        assert!(Environment::from_pairs([(DEVELOPMENT_KEY, "true")]).in_development());
        assert!(!Environment::from_pairs([(DEVELOPMENT_KEY, "TRUE")]).in_development());
        assert!(!Environment::from_pairs([(DEVELOPMENT_KEY, " true")]).in_development());
        assert!(!Environment::from_pairs([(DEVELOPMENT_KEY, "1")]).in_development());
        assert!(!Environment::from_pairs([(DEVELOPMENT_KEY, "false")]).in_development());
        assert!(!Environment::empty().in_development());
    }

    #[test]
    fn test_process_environment() {
        // Cargo exports this to test processes.
        let env = Environment::process();
        assert_eq!(
            env.var("CARGO_MANIFEST_DIR").as_deref(),
            Some(env!("CARGO_MANIFEST_DIR"))
        );
        assert!(env.var("APP_BOOTSTRAP_SURELY_UNSET_7f3a").is_none());
    }
}
