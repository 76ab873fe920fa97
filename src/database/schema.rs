/*!
 * Database schema definitions and versioning.
 *
 * Tables:
 * - `schema_version`: single row holding the schema version
 * - `packages`: one row per package
 * - `elements`: element catalog of every package
 * - `relation_members`: ordered id-refs of every relation
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    // Foreign keys are per connection, not stored in the file
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;

    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Initializing database schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version != SCHEMA_VERSION {
        return Err(anyhow::anyhow!(
            "Unsupported database schema v{} (expected v{})",
            current_version,
            SCHEMA_VERSION
        ));
    } else {
        debug!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get the current schema version from the database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version in the database
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

/// Create all database tables
fn create_all_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS packages (
            id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    // mimetype is NULL for kinds without content; uri holds a media
    // location or the package id an import points at
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS elements (
            package_id TEXT NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
            id TEXT NOT NULL,
            kind TEXT NOT NULL,
            mimetype TEXT,
            schema TEXT,
            url TEXT,
            uri TEXT,
            created_at TEXT NOT NULL,
            PRIMARY KEY (package_id, id)
        );

        CREATE INDEX IF NOT EXISTS idx_elements_kind ON elements(package_id, kind);
        "#,
    )?;

    // ord is not unique: positions are shifted one row at a time
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS relation_members (
            package_id TEXT NOT NULL,
            relation_id TEXT NOT NULL,
            ord INTEGER NOT NULL,
            idref TEXT NOT NULL,
            FOREIGN KEY (package_id, relation_id)
                REFERENCES elements(package_id, id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_members_position ON relation_members(package_id, relation_id, ord);
        "#,
    )?;

    info!("Database schema created successfully");
    Ok(())
}
