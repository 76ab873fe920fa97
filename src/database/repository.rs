/*!
 * Repository layer for database operations.
 *
 * `Repository` is the SQLite implementation of `Backend`. Every write runs
 * in its own transaction, so a failed member operation leaves the stored
 * sequence untouched.
 */

use anyhow::Result;
use log::{debug, trace};
use rusqlite::{params, Connection, OptionalExtension};

use super::connection::{DatabaseConnection, JournalMode};
use super::models::{element_from_row, PackageRecord};
use crate::backend::{Backend, BackendResult, ElementRecord, MemberPosition};
use crate::errors::BackendError;
use crate::model::ElementKind;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open a repository on a database file
    pub fn open(path: impl AsRef<std::path::Path>, journal_mode: JournalMode) -> Result<Self> {
        let db = DatabaseConnection::open(path, journal_mode)?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// The underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Package rows, sorted by id
    pub fn package_records(&self) -> Result<Vec<PackageRecord>> {
        self.db.execute(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, created_at, updated_at FROM packages ORDER BY id")?;
            let rows = stmt.query_map([], PackageRecord::from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn package_exists(conn: &Connection, package: &str) -> Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM packages WHERE id = ?1",
            [package],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn require_package(conn: &Connection, package: &str) -> Result<()> {
        if !Self::package_exists(conn, package)? {
            return Err(BackendError::NoSuchPackage(package.to_string()).into());
        }
        Ok(())
    }

    fn require_relation(conn: &Connection, package: &str, relation: &str) -> Result<()> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM elements WHERE package_id = ?1 AND id = ?2 AND kind = ?3",
            params![package, relation, ElementKind::Relation.as_str()],
            |row| row.get(0),
        )?;
        if count == 0 {
            return Err(BackendError::NoSuchRelation {
                package: package.to_string(),
                relation: relation.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn member_count(conn: &Connection, package: &str, relation: &str) -> Result<usize> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM relation_members WHERE package_id = ?1 AND relation_id = ?2",
            [package, relation],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn touch_package(conn: &Connection, package: &str) -> Result<()> {
        conn.execute(
            "UPDATE packages SET updated_at = ?1 WHERE id = ?2",
            params![chrono::Utc::now().to_rfc3339(), package],
        )?;
        Ok(())
    }
}

/// Recover the typed backend error raised inside a database closure
fn into_backend<T>(result: Result<T>) -> BackendResult<T> {
    result.map_err(|error| match error.downcast::<BackendError>() {
        Ok(error) => error,
        Err(error) => match error.downcast::<rusqlite::Error>() {
            Ok(error) => BackendError::from(error),
            Err(error) => BackendError::from(error),
        },
    })
}

fn no_such_member(relation: &str, index: usize) -> anyhow::Error {
    BackendError::NoSuchMember {
        relation: relation.to_string(),
        index,
    }
    .into()
}

impl Backend for Repository {
    fn count_members(&self, package: &str, relation: &str) -> BackendResult<usize> {
        into_backend(self.db.execute(|conn| {
            Self::require_relation(conn, package, relation)?;
            Self::member_count(conn, package, relation)
        }))
    }

    fn get_member(&self, package: &str, relation: &str, index: usize) -> BackendResult<String> {
        trace!("get_member({}, {}, {})", package, relation, index);
        into_backend(self.db.execute(|conn| {
            Self::require_relation(conn, package, relation)?;
            conn.query_row(
                r#"
                SELECT idref FROM relation_members
                WHERE package_id = ?1 AND relation_id = ?2 AND ord = ?3
                "#,
                params![package, relation, index as i64],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| no_such_member(relation, index))
        }))
    }

    fn update_member(
        &self,
        package: &str,
        relation: &str,
        idref: &str,
        index: usize,
    ) -> BackendResult<()> {
        into_backend(self.db.transaction(|tx| {
            Self::require_relation(tx, package, relation)?;
            let changed = tx.execute(
                r#"
                UPDATE relation_members SET idref = ?1
                WHERE package_id = ?2 AND relation_id = ?3 AND ord = ?4
                "#,
                params![idref, package, relation, index as i64],
            )?;
            if changed == 0 {
                return Err(no_such_member(relation, index));
            }
            Self::touch_package(tx, package)
        }))
    }

    fn insert_member(
        &self,
        package: &str,
        relation: &str,
        idref: &str,
        position: MemberPosition,
        pre_len: usize,
    ) -> BackendResult<()> {
        into_backend(self.db.transaction(|tx| {
            Self::require_relation(tx, package, relation)?;
            let len = Self::member_count(tx, package, relation)?;
            if len != pre_len {
                return Err(BackendError::PositionMismatch {
                    relation: relation.to_string(),
                    expected: pre_len,
                    actual: len,
                }
                .into());
            }
            let index = position.resolve(len);
            if index > len {
                return Err(no_such_member(relation, index));
            }

            tx.execute(
                r#"
                UPDATE relation_members SET ord = ord + 1
                WHERE package_id = ?1 AND relation_id = ?2 AND ord >= ?3
                "#,
                params![package, relation, index as i64],
            )?;
            tx.execute(
                r#"
                INSERT INTO relation_members (package_id, relation_id, ord, idref)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![package, relation, index as i64, idref],
            )?;
            Self::touch_package(tx, package)
        }))
    }

    fn remove_member(&self, package: &str, relation: &str, index: usize) -> BackendResult<()> {
        into_backend(self.db.transaction(|tx| {
            Self::require_relation(tx, package, relation)?;
            let removed = tx.execute(
                r#"
                DELETE FROM relation_members
                WHERE package_id = ?1 AND relation_id = ?2 AND ord = ?3
                "#,
                params![package, relation, index as i64],
            )?;
            if removed == 0 {
                return Err(no_such_member(relation, index));
            }
            tx.execute(
                r#"
                UPDATE relation_members SET ord = ord - 1
                WHERE package_id = ?1 AND relation_id = ?2 AND ord > ?3
                "#,
                params![package, relation, index as i64],
            )?;
            Self::touch_package(tx, package)
        }))
    }

    fn create_package(&self, package: &str) -> BackendResult<()> {
        let record = PackageRecord::new(package);
        into_backend(self.db.execute(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO packages (id, created_at, updated_at) VALUES (?1, ?2, ?3)",
                params![record.id, record.created_at, record.updated_at],
            )?;
            if inserted > 0 {
                debug!("Created package {}", record.id);
            }
            Ok(())
        }))
    }

    fn has_package(&self, package: &str) -> BackendResult<bool> {
        into_backend(self.db.execute(|conn| Self::package_exists(conn, package)))
    }

    fn list_packages(&self) -> BackendResult<Vec<String>> {
        into_backend(self.db.execute(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM packages ORDER BY id")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
        }))
    }

    fn list_elements(&self, package: &str) -> BackendResult<Vec<ElementRecord>> {
        into_backend(self.db.execute(|conn| {
            Self::require_package(conn, package)?;
            let mut stmt = conn.prepare(
                r#"
                SELECT id, kind, mimetype, schema, url, uri
                FROM elements WHERE package_id = ?1
                ORDER BY id
                "#,
            )?;
            let rows = stmt.query_map([package], element_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        }))
    }

    fn create_element(&self, package: &str, record: &ElementRecord) -> BackendResult<()> {
        into_backend(self.db.transaction(|tx| {
            Self::require_package(tx, package)?;
            let exists: i64 = tx.query_row(
                "SELECT COUNT(*) FROM elements WHERE package_id = ?1 AND id = ?2",
                [package, record.id.as_str()],
                |row| row.get(0),
            )?;
            if exists > 0 {
                return Err(BackendError::DuplicateElement {
                    package: package.to_string(),
                    id: record.id.clone(),
                }
                .into());
            }

            let content = record.content.as_ref();
            tx.execute(
                r#"
                INSERT INTO elements (package_id, id, kind, mimetype, schema, url, uri, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    package,
                    record.id,
                    record.kind.as_str(),
                    content.map(|c| c.mimetype.as_str()),
                    content.and_then(|c| c.schema.as_deref()),
                    content.and_then(|c| c.url.as_deref()),
                    record.uri,
                    chrono::Utc::now().to_rfc3339(),
                ],
            )?;
            Self::touch_package(tx, package)
        }))
    }

    fn delete_element(&self, package: &str, id: &str) -> BackendResult<()> {
        into_backend(self.db.transaction(|tx| {
            Self::require_package(tx, package)?;
            // relation_members rows go with the element (ON DELETE CASCADE)
            tx.execute(
                "DELETE FROM elements WHERE package_id = ?1 AND id = ?2",
                [package, id],
            )?;
            Self::touch_package(tx, package)
        }))
    }
}
