/*!
 * # annograph - annotation graph documents
 *
 * A Rust library for annotation packages: medias, annotations and the
 * relations linking them, stored behind a pluggable backend.
 *
 * ## Features
 *
 * - Packages holding elements of nine kinds, with imports of other packages
 * - Relations: ordered, mutable sequences of annotation references,
 *   resolved lazily and persisted through a deferred write queue
 * - Id-refs in local, relative (`import:id`) and absolute (`package#id`) forms
 * - Per-kind views over any element collection
 * - In-memory and SQLite storage backends
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `model`: the document model:
 *   - `model::package`: element catalogs, imports and id-ref resolution
 *   - `model::relation`: lazily resolved member sequences
 *   - `model::cleaning`: the deferred write queue
 *   - `model::group`: per-kind views
 * - `backend`: the storage contract and the in-memory backend
 * - `database`: SQLite storage
 * - `app_config`: Configuration management
 * - `errors`: Custom error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod backend;
pub mod database;
pub mod errors;
pub mod model;

// Re-export main types for easier usage
pub use app_config::Config;
pub use backend::{Backend, ElementRecord, MemberPosition, MemoryBackend};
pub use database::Repository;
pub use errors::{BackendError, ModelError, ModelResult};
pub use model::{
    Content, Element, ElementKind, Group, IdRef, KindView, Member, Package, Relation, Resolution,
    Slice,
};
