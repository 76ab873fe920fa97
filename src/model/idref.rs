/*!
 * Id-ref syntax.
 *
 * An id-ref designates an element relative to an owning package:
 * - `id` for an element of the owner itself,
 * - `imp:id` (or `imp1:imp2:id`) for an element reached through the owner's
 *   import elements,
 * - `package-id#id` for the absolute form.
 *
 * Resolution itself is done by `Package`, which knows its imports.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

use crate::errors::ModelError;

static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("valid id regex"));

/// Whether `id` is a valid element (or import) identifier
pub fn is_valid_id(id: &str) -> bool {
    ID_PATTERN.is_match(id)
}

/// Whether `id` can name a package
pub fn is_valid_package_id(id: &str) -> bool {
    !id.is_empty() && !id.contains('#') && !id.chars().any(char::is_whitespace)
}

/// Parsed id-ref
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdRef {
    /// Import path (possibly empty) followed by the element id
    Relative { imports: Vec<String>, id: String },
    /// Package id and element id
    Absolute { package: String, id: String },
}

impl IdRef {
    pub fn local(id: impl Into<String>) -> Self {
        IdRef::Relative {
            imports: Vec::new(),
            id: id.into(),
        }
    }

    /// Id of the designated element, whatever the form
    pub fn id(&self) -> &str {
        match self {
            IdRef::Relative { id, .. } | IdRef::Absolute { id, .. } => id,
        }
    }

    /// True for a plain id of the owner's own element
    pub fn is_local(&self) -> bool {
        matches!(self, IdRef::Relative { imports, .. } if imports.is_empty())
    }

    /// Prepend an import step, used when an id-ref valid in an imported
    /// package is re-expressed for the importing one
    pub fn through(self, import_id: &str) -> Self {
        match self {
            IdRef::Relative { mut imports, id } => {
                imports.insert(0, import_id.to_string());
                IdRef::Relative { imports, id }
            }
            absolute => absolute,
        }
    }
}

impl FromStr for IdRef {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidIdRef(s.to_string());

        if let Some((package, id)) = s.rsplit_once('#') {
            if !is_valid_package_id(package) || !is_valid_id(id) {
                return Err(invalid());
            }
            return Ok(IdRef::Absolute {
                package: package.to_string(),
                id: id.to_string(),
            });
        }

        let mut parts: Vec<&str> = s.split(':').collect();
        let id = parts.pop().ok_or_else(invalid)?;
        if !is_valid_id(id) || !parts.iter().all(|p| is_valid_id(p)) {
            return Err(invalid());
        }
        Ok(IdRef::Relative {
            imports: parts.into_iter().map(str::to_string).collect(),
            id: id.to_string(),
        })
    }
}

impl fmt::Display for IdRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdRef::Relative { imports, id } => {
                for import in imports {
                    write!(f, "{}:", import)?;
                }
                f.write_str(id)
            }
            IdRef::Absolute { package, id } => write!(f, "{}#{}", package, id),
        }
    }
}
