//! Step target directories.
//!
//! A step's directory is either a static string or a function of the record's
//! attributes. Static strings go through alias substitution, `{attribute}`
//! placeholders and slash normalization; function results are used exactly as
//! returned. Because file paths are built by appending the stored name to the
//! directory string, a dynamic path without a trailing `/` places files next
//! to the directory rather than inside it.
//!
//! ```text
//! "@webroot/uploads/{id}//"   →  "public/uploads/42/"
//! Dynamic(|a| "/srv/u/42")    →  "/srv/u/42"
//! ```

use crate::record::Attributes;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PathError {
    #[error("unknown path alias '@{0}'")]
    UnknownAlias(String),
    #[error("path '{path}' refers to unknown attribute '{name}'")]
    UnknownPlaceholder { path: String, name: String },
    #[error("path '{0}' has an unterminated '{{' placeholder")]
    UnterminatedPlaceholder(String),
}

/// Alias name (without `@`) to replacement path.
pub type Aliases = BTreeMap<String, String>;

/// Function computing a directory from the record's attributes.
pub type PathFn = dyn Fn(&Attributes) -> String + Send + Sync;

/// Where a step writes.
#[derive(Clone)]
pub enum PathExpr {
    /// Alias/placeholder string, normalized to end in exactly one `/`.
    Static(String),
    /// Computed per record, used verbatim.
    Dynamic(Arc<PathFn>),
}

impl PathExpr {
    pub fn dynamic(f: impl Fn(&Attributes) -> String + Send + Sync + 'static) -> Self {
        Self::Dynamic(Arc::new(f))
    }

    /// Resolve against the aliases and the record's current attributes.
    pub fn resolve(
        &self,
        aliases: &Aliases,
        attributes: &Attributes,
    ) -> Result<TargetDirectory, PathError> {
        match self {
            Self::Static(expr) => {
                let path = substitute_alias(expr, aliases)?;
                let path = substitute_placeholders(&path, attributes)?;
                Ok(TargetDirectory::normalized(&path))
            }
            Self::Dynamic(f) => Ok(TargetDirectory(f(attributes))),
        }
    }
}

impl fmt::Debug for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(s) => f.debug_tuple("Static").field(s).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(<fn>)"),
        }
    }
}

impl From<&str> for PathExpr {
    fn from(s: &str) -> Self {
        Self::Static(s.to_string())
    }
}

impl From<String> for PathExpr {
    fn from(s: String) -> Self {
        Self::Static(s)
    }
}

/// Replace a leading `@alias` segment.
fn substitute_alias(expr: &str, aliases: &Aliases) -> Result<String, PathError> {
    let Some(rest) = expr.strip_prefix('@') else {
        return Ok(expr.to_string());
    };
    let (name, tail) = match rest.find(['/', '\\']) {
        Some(pos) => rest.split_at(pos),
        None => (rest, ""),
    };
    let root = aliases
        .get(name)
        .ok_or_else(|| PathError::UnknownAlias(name.to_string()))?;
    Ok(format!("{root}{tail}"))
}

/// Replace every `{name}` with the record's attribute value.
fn substitute_placeholders(path: &str, attributes: &Attributes) -> Result<String, PathError> {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| PathError::UnterminatedPlaceholder(path.to_string()))?;
        let name = &after[..close];
        let value = attributes
            .get(name)
            .ok_or_else(|| PathError::UnknownPlaceholder {
                path: path.to_string(),
                name: name.to_string(),
            })?;
        out.push_str(value);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// A resolved step directory, as a string ready for name concatenation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDirectory(String);

impl TargetDirectory {
    /// Strip every trailing `/` and append exactly one.
    pub fn normalized(path: &str) -> Self {
        Self(format!("{}/", path.trim_end_matches('/')))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// Directory string + file name.
    pub fn file(&self, name: &str) -> String {
        format!("{}{}", self.0, name)
    }

    /// Whether this is exactly the filesystem root.
    pub fn is_root(&self) -> bool {
        let path = self.as_path();
        path.has_root() && path.parent().is_none()
    }
}

impl fmt::Display for TargetDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
