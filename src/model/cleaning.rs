/*!
 * Deferred write queue.
 *
 * Relation mutations do not touch storage directly. Each one enqueues the
 * backend call it implies, with its exact arguments, on the owning
 * package's queue. Cleaning replays the queue against the backend strictly
 * in enqueue order; nothing is merged or dropped, so two successive writes
 * at the same position reach the backend twice.
 *
 * When a backend call fails, cleaning stops there: operations already
 * replayed stay applied, the failing operation and everything after it stay
 * queued, and the next cleaning resumes with the failing operation.
 */

use log::{debug, warn};
use std::collections::VecDeque;
use std::fmt;

use crate::backend::{Backend, MemberPosition};
use crate::errors::{BackendError, ModelError, ModelResult};

/// A queued relation-membership write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberOperation {
    Update {
        package: String,
        relation: String,
        idref: String,
        index: usize,
    },
    Insert {
        package: String,
        relation: String,
        idref: String,
        position: MemberPosition,
        pre_len: usize,
    },
    Remove {
        package: String,
        relation: String,
        index: usize,
    },
}

impl MemberOperation {
    /// Relation the operation applies to
    pub fn relation(&self) -> &str {
        match self {
            MemberOperation::Update { relation, .. }
            | MemberOperation::Insert { relation, .. }
            | MemberOperation::Remove { relation, .. } => relation,
        }
    }

    /// Issue the corresponding backend call
    pub fn apply(&self, backend: &dyn Backend) -> Result<(), BackendError> {
        match self {
            MemberOperation::Update {
                package,
                relation,
                idref,
                index,
            } => backend.update_member(package, relation, idref, *index),
            MemberOperation::Insert {
                package,
                relation,
                idref,
                position,
                pre_len,
            } => backend.insert_member(package, relation, idref, *position, *pre_len),
            MemberOperation::Remove {
                package,
                relation,
                index,
            } => backend.remove_member(package, relation, *index),
        }
    }
}

impl fmt::Display for MemberOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberOperation::Update {
                relation,
                idref,
                index,
                ..
            } => write!(f, "update_member({}, {}, {})", relation, idref, index),
            MemberOperation::Insert {
                relation,
                idref,
                position,
                pre_len,
                ..
            } => write!(
                f,
                "insert_member({}, {}, {}, {})",
                relation, idref, position, pre_len
            ),
            MemberOperation::Remove {
                relation, index, ..
            } => write!(f, "remove_member({}, {})", relation, index),
        }
    }
}

/// FIFO of pending member operations
#[derive(Debug, Default)]
pub struct WriteQueue {
    pending: VecDeque<MemberOperation>,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, operation: MemberOperation) {
        debug!("Queued {}", operation);
        self.pending.push_back(operation);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending operations, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &MemberOperation> {
        self.pending.iter()
    }

    /// Whether operations are pending for `relation`
    pub fn has_pending_for(&self, relation: &str) -> bool {
        self.pending.iter().any(|op| op.relation() == relation)
    }

    /// Drop the pending operations of a relation that no longer exists.
    /// Returns how many were dropped.
    pub fn discard_relation(&mut self, relation: &str) -> usize {
        let before = self.pending.len();
        self.pending.retain(|op| op.relation() != relation);
        before - self.pending.len()
    }

    /// Replay pending operations in order. Returns how many were applied.
    pub fn flush(&mut self, backend: &dyn Backend) -> ModelResult<usize> {
        let mut applied = 0;
        while let Some(operation) = self.pending.front() {
            if let Err(source) = operation.apply(backend) {
                warn!(
                    "Cleaning stopped at {} after {} operation(s): {}",
                    operation, applied, source
                );
                return Err(ModelError::FlushAborted {
                    applied,
                    remaining: self.pending.len(),
                    source,
                });
            }
            self.pending.pop_front();
            applied += 1;
        }
        Ok(applied)
    }
}
