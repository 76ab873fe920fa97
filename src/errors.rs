/*!
 * Error types for the annograph document model.
 *
 * `ModelError` is what the document model (packages, relations, id-refs)
 * reports to its callers. `BackendError` is what storage backends report;
 * it is wrapped by `ModelError` when it surfaces through the model.
 */

use thiserror::Error;

/// Errors reported by a storage backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The underlying store failed (SQL error, lock poisoning, ...)
    #[error("Storage error: {0}")]
    Storage(String),

    /// The package is not known to the backend
    #[error("Unknown package: {0}")]
    NoSuchPackage(String),

    /// The relation is not known to the backend
    #[error("Unknown relation {relation} in package {package}")]
    NoSuchRelation {
        /// Owning package id
        package: String,
        /// Relation id
        relation: String,
    },

    /// No member is stored at the requested position
    #[error("Relation {relation} has no member at index {index}")]
    NoSuchMember {
        /// Relation id
        relation: String,
        /// Requested position
        index: usize,
    },

    /// The pre-operation length sent with an insertion does not match the stored count
    #[error("Position mismatch on {relation}: caller saw {expected} members, backend has {actual}")]
    PositionMismatch {
        /// Relation id
        relation: String,
        /// Length the caller observed before the operation
        expected: usize,
        /// Length the backend holds
        actual: usize,
    },

    /// An element with the same id already exists in the package
    #[error("Element {id} already exists in package {package}")]
    DuplicateElement {
        /// Owning package id
        package: String,
        /// Element id
        id: String,
    },

    /// Failure injected by a test backend
    #[error("Injected failure: {0}")]
    Injected(String),
}

impl From<rusqlite::Error> for BackendError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<anyhow::Error> for BackendError {
    fn from(error: anyhow::Error) -> Self {
        Self::Storage(format!("{:#}", error))
    }
}

/// Errors reported by the document model
#[derive(Error, Debug)]
pub enum ModelError {
    /// A positional access was outside `[0, len)`
    #[error("Index {index} out of range for relation of length {len}")]
    IndexOutOfRange {
        /// Position as given by the caller (possibly negative)
        index: isize,
        /// Length of the sequence at the time of the call
        len: usize,
    },

    /// A member id-ref could not be resolved to a live element
    #[error("Unreachable element: {idref}")]
    Unreachable {
        /// The id-ref that failed to resolve
        idref: String,
    },

    /// Extended slice assignment with a replacement of the wrong size
    #[error("Attempt to assign sequence of size {actual} to extended slice of size {expected}")]
    LengthMismatch {
        /// Number of positions selected by the slice
        expected: usize,
        /// Number of replacement elements
        actual: usize,
    },

    /// The element cannot be stored as a relation member
    #[error("Cannot reference {element}: {reason}")]
    ReferenceRejected {
        /// Element id
        element: String,
        /// Why it was rejected
        reason: String,
    },

    /// Flushing the write queue stopped at a failing backend call
    #[error("Flush aborted after {applied} operation(s), {remaining} still queued: {source}")]
    FlushAborted {
        /// Operations applied before the failure
        applied: usize,
        /// Operations left in the queue, the failing one included
        remaining: usize,
        /// The backend failure
        #[source]
        source: BackendError,
    },

    /// Backend failure outside of a flush
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// A slice with a zero step
    #[error("Slice step cannot be zero")]
    InvalidSlice,

    /// Malformed element or package identifier
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Malformed id-ref string
    #[error("Invalid id-ref: {0:?}")]
    InvalidIdRef(String),

    /// No element with this id in the package
    #[error("No element {id} in package {package}")]
    NoSuchElement {
        /// Package id
        package: String,
        /// Element id
        id: String,
    },

    /// The package does not exist in the backend
    #[error("No such package: {0}")]
    NoSuchPackage(String),

    /// A package with this id already exists in the backend
    #[error("Package already exists: {0}")]
    PackageExists(String),

    /// Element id already taken
    #[error("Element {id} already exists in package {package}")]
    DuplicateElement {
        /// Package id
        package: String,
        /// Element id
        id: String,
    },

    /// The element exists but has another kind
    #[error("Element {id} is a {actual}, expected a {expected}")]
    WrongKind {
        /// Element id
        id: String,
        /// Kind the caller asked for
        expected: crate::model::ElementKind,
        /// Kind of the stored element
        actual: crate::model::ElementKind,
    },

    /// Adding the import would make a package import itself
    #[error("Importing {imported} into {package} would create an import cycle")]
    ImportCycle {
        /// Importing package
        package: String,
        /// Package that would be imported
        imported: String,
    },
}

/// Result alias used across the model
pub type ModelResult<T> = std::result::Result<T, ModelError>;
