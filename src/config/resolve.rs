//! `${path.to.field}` reference resolution for TOML config sources.
//!
//! A reference is looked up in the file itself, or in the read-only `app`
//! scope describing the context that is loading the file:
//!
//! ```toml
//! uploads = "${app.directories.storage}/uploads"
//! avatars = "${uploads}/avatars"
//! ```
//!
//! `$$` produces a literal `$`, so `$${HOME}` becomes `${HOME}`.

use toml::{Table, Value};

use super::ConfigError;

/// Name of the scope that exposes the loading context to references.
pub const APP_SCOPE: &str = "app";

const MAX_PASSES: usize = 64;

/// Resolves every reference in `table` in place.
///
/// Substitutions may chain, so passes repeat until one changes nothing. A table
/// that keeps changing after `MAX_PASSES` is treated as circular. Escapes are
/// only collapsed once every reference is resolved.
pub fn resolve_references(table: &mut Table, app: &Table) -> Result<(), ConfigError> {
    for _ in 0..MAX_PASSES {
        let scope = Scope {
            file: table.clone(),
            app,
        };
        if scope.resolve_table(table)? == 0 {
            table.iter_mut().for_each(|(_, v)| unescape(v));
            return Ok(());
        }
    }

    Err(ConfigError::CircularReference)
}

fn unescape(value: &mut Value) {
    match value {
        Value::String(s) if s.contains("$$") => *s = s.replace("$$", "$"),
        Value::Table(t) => t.iter_mut().for_each(|(_, v)| unescape(v)),
        Value::Array(items) => items.iter_mut().for_each(unescape),
        _ => {}
    }
}

struct Scope<'a> {
    file: Table,
    app: &'a Table,
}

impl Scope<'_> {
    fn resolve_table(&self, table: &mut Table) -> Result<usize, ConfigError> {
        let mut count = 0;
        for (_, value) in table.iter_mut() {
            count += self.resolve_value(value)?;
        }
        Ok(count)
    }

    fn resolve_value(&self, value: &mut Value) -> Result<usize, ConfigError> {
        match value {
            Value::String(s) => self.resolve_string(s),
            Value::Table(t) => self.resolve_table(t),
            Value::Array(items) => {
                let mut count = 0;
                for item in items.iter_mut() {
                    count += self.resolve_value(item)?;
                }
                Ok(count)
            }
            _ => Ok(0),
        }
    }

    fn resolve_string(&self, s: &mut String) -> Result<usize, ConfigError> {
        if !s.contains('$') {
            return Ok(0);
        }

        let mut out = String::with_capacity(s.len());
        let mut substitutions = 0;
        let mut rest = s.as_str();

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos + 1..];

            if let Some(after) = tail.strip_prefix('$') {
                out.push_str("$$");
                rest = after;
            } else if let Some(body) = tail.strip_prefix('{') {
                let (path, after) = body
                    .split_once('}')
                    .ok_or(ConfigError::UnclosedReference)?;
                out.push_str(&self.lookup(path)?);
                substitutions += 1;
                rest = after;
            } else {
                out.push('$');
                rest = tail;
            }
        }
        out.push_str(rest);

        if substitutions > 0 {
            *s = out;
        }
        Ok(substitutions)
    }

    fn lookup(&self, path: &str) -> Result<String, ConfigError> {
        let parts: Vec<&str> = path.split('.').collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidReferencePath(path.to_string()));
        }

        let not_found = || ConfigError::ReferenceNotFound(path.to_string());

        let (root, segments) = match parts.split_first() {
            Some((&APP_SCOPE, rest)) if !rest.is_empty() => (self.app, rest),
            _ => (&self.file, &parts[..]),
        };

        let (first, rest) = segments.split_first().ok_or_else(not_found)?;
        let mut current = root.get(*first).ok_or_else(not_found)?;
        for part in rest {
            current = current
                .as_table()
                .and_then(|t| t.get(*part))
                .ok_or_else(not_found)?;
        }

        scalar_to_string(current).ok_or_else(|| ConfigError::NonScalarReference(path.to_string()))
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Datetime(dt) => Some(dt.to_string()),
        Value::Array(_) | Value::Table(_) => None,
    }
}
