/*!
 * Storage backends.
 *
 * A backend stores package catalogs and the ordered membership of
 * relations. The document model only talks to storage through the
 * `Backend` trait; positions are always those of the backend's current
 * state, i.e. the state produced by every operation flushed so far.
 *
 * Implementations:
 * - `memory::MemoryBackend`: in-process store recording every member call
 * - `crate::database::Repository`: SQLite store
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::BackendError;
use crate::model::{Content, ElementKind};

pub mod memory;

pub use memory::{BackendCall, MemoryBackend};

/// Result type of backend calls
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Raw value of the append marker
pub const APPEND_MARKER: i64 = -1;

/// Where an inserted member goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberPosition {
    /// Before the member currently at this index
    At(usize),
    /// After the last member
    Append,
}

impl MemberPosition {
    /// Integer form used by storage: the index, or `-1` for append
    pub fn to_marker(self) -> i64 {
        match self {
            MemberPosition::At(index) => index as i64,
            MemberPosition::Append => APPEND_MARKER,
        }
    }

    /// Inverse of `to_marker`
    pub fn from_marker(marker: i64) -> Option<Self> {
        match marker {
            APPEND_MARKER => Some(MemberPosition::Append),
            m if m >= 0 => Some(MemberPosition::At(m as usize)),
            _ => None,
        }
    }

    /// Concrete index for a sequence of length `len`
    pub fn resolve(self, len: usize) -> usize {
        match self {
            MemberPosition::At(index) => index,
            MemberPosition::Append => len,
        }
    }
}

impl fmt::Display for MemberPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_marker())
    }
}

/// Persisted form of an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRecord {
    /// Element id, unique in its package
    pub id: String,
    /// Element kind
    pub kind: ElementKind,
    /// Content triple, for kinds that carry one
    #[serde(default)]
    pub content: Option<Content>,
    /// Media location, or imported package id for imports
    #[serde(default)]
    pub uri: Option<String>,
}

impl ElementRecord {
    pub fn new(id: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            kind,
            content: None,
            uri: None,
        }
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Record of an import element pointing at `package_id`
    pub fn import(id: impl Into<String>, package_id: impl Into<String>) -> Self {
        Self::new(id, ElementKind::Import).with_uri(package_id)
    }
}

/// Storage contract of the document model.
///
/// All calls are synchronous. Member positions are 0-based.
pub trait Backend {
    // Membership of relations

    /// Number of members of a relation
    fn count_members(&self, package: &str, relation: &str) -> BackendResult<usize>;

    /// Id-ref of the member at `index`
    fn get_member(&self, package: &str, relation: &str, index: usize) -> BackendResult<String>;

    /// Replace the id-ref at `index`
    fn update_member(
        &self,
        package: &str,
        relation: &str,
        idref: &str,
        index: usize,
    ) -> BackendResult<()>;

    /// Insert a member. `pre_len` is the member count the caller saw right
    /// before this operation; backends reject it when it disagrees with
    /// their own count.
    fn insert_member(
        &self,
        package: &str,
        relation: &str,
        idref: &str,
        position: MemberPosition,
        pre_len: usize,
    ) -> BackendResult<()>;

    /// Remove the member at `index`, shifting the following ones down
    fn remove_member(&self, package: &str, relation: &str, index: usize) -> BackendResult<()>;

    // Package catalog

    /// Register a new, empty package
    fn create_package(&self, package: &str) -> BackendResult<()>;

    fn has_package(&self, package: &str) -> BackendResult<bool>;

    /// Ids of all packages, sorted
    fn list_packages(&self) -> BackendResult<Vec<String>>;

    /// Element records of a package, sorted by id
    fn list_elements(&self, package: &str) -> BackendResult<Vec<ElementRecord>>;

    fn create_element(&self, package: &str, record: &ElementRecord) -> BackendResult<()>;

    /// Delete an element; the membership of a deleted relation goes with it
    fn delete_element(&self, package: &str, id: &str) -> BackendResult<()>;
}
