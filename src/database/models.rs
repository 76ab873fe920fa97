/*!
 * Database entity models.
 *
 * These structures map directly to database rows.
 */

use rusqlite::Row;
use rusqlite::types::Type;
use serde::{Deserialize, Serialize};

use crate::backend::ElementRecord;
use crate::model::{Content, ElementKind};

/// Package row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Package id
    pub id: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last modification timestamp (RFC 3339)
    pub updated_at: String,
}

impl PackageRecord {
    /// Create a new package record stamped with the current time
    pub fn new(id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            created_at: row.get(1)?,
            updated_at: row.get(2)?,
        })
    }
}

/// Map an `elements` row selected as
/// `id, kind, mimetype, schema, url, uri`
pub(crate) fn element_from_row(row: &Row<'_>) -> rusqlite::Result<ElementRecord> {
    let kind: String = row.get(1)?;
    let kind: ElementKind = kind.parse().map_err(|e: anyhow::Error| {
        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, e.into())
    })?;

    let content = match row.get::<_, Option<String>>(2)? {
        Some(mimetype) => Some(Content {
            mimetype,
            schema: row.get(3)?,
            url: row.get(4)?,
        }),
        None => None,
    };

    Ok(ElementRecord {
        id: row.get(0)?,
        kind,
        content,
        uri: row.get(5)?,
    })
}
