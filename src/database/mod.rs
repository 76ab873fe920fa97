/*!
 * Database module for persistent storage of packages.
 *
 * This module provides SQLite-based persistence for:
 * - Package catalogs (elements and their content)
 * - Ordered relation membership, behind the `Backend` trait
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats, JournalMode};
pub use models::PackageRecord;
pub use repository::Repository;
