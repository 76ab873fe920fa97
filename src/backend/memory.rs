/*!
 * In-memory backend.
 *
 * Keeps everything in process and records every relation-membership call,
 * in order, so tests can check exactly what the model sent to storage:
 * - `MemoryBackend::new()` - plain store
 * - `MemoryBackend::fail_on_write(n)` - the n-th following member write fails once
 * - `MemoryBackend::calls()` - recorded member calls
 */

use log::trace;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

use super::{Backend, BackendResult, ElementRecord, MemberPosition};
use crate::errors::BackendError;
use crate::model::ElementKind;

/// A relation-membership call received by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    CountMembers {
        package: String,
        relation: String,
    },
    GetMember {
        package: String,
        relation: String,
        index: usize,
    },
    UpdateMember {
        package: String,
        relation: String,
        idref: String,
        index: usize,
    },
    InsertMember {
        package: String,
        relation: String,
        idref: String,
        position: MemberPosition,
        pre_len: usize,
    },
    RemoveMember {
        package: String,
        relation: String,
        index: usize,
    },
}

impl BackendCall {
    /// Whether the call modifies stored membership
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            BackendCall::UpdateMember { .. }
                | BackendCall::InsertMember { .. }
                | BackendCall::RemoveMember { .. }
        )
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    packages: BTreeMap<String, BTreeMap<String, ElementRecord>>,
    members: HashMap<(String, String), Vec<String>>,
}

impl MemoryState {
    fn members(&self, package: &str, relation: &str) -> BackendResult<&Vec<String>> {
        self.members
            .get(&(package.to_string(), relation.to_string()))
            .ok_or_else(|| no_such_relation(package, relation))
    }

    fn members_mut(&mut self, package: &str, relation: &str) -> BackendResult<&mut Vec<String>> {
        self.members
            .get_mut(&(package.to_string(), relation.to_string()))
            .ok_or_else(|| no_such_relation(package, relation))
    }
}

fn no_such_relation(package: &str, relation: &str) -> BackendError {
    BackendError::NoSuchRelation {
        package: package.to_string(),
        relation: relation.to_string(),
    }
}

/// In-memory backend with call recording
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RefCell<MemoryState>,
    calls: RefCell<Vec<BackendCall>>,
    /// Member writes still allowed before the injected failure
    fail_countdown: Cell<Option<usize>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the member write issued after `n` more successful writes fail once
    pub fn fail_on_write(&self, n: usize) {
        self.fail_countdown.set(Some(n));
    }

    /// Member calls received so far, oldest first
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.borrow().clone()
    }

    /// Member writes received so far, oldest first
    pub fn writes(&self) -> Vec<BackendCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.is_write())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Stored id-refs of a relation, bypassing call recording
    pub fn stored_members(&self, package: &str, relation: &str) -> Vec<String> {
        self.state
            .borrow()
            .members(package, relation)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: BackendCall) -> BackendResult<()> {
        trace!("memory backend: {:?}", call);
        let write = call.is_write();
        self.calls.borrow_mut().push(call);
        if write {
            match self.fail_countdown.get() {
                Some(0) => {
                    self.fail_countdown.set(None);
                    return Err(BackendError::Injected("member write refused".to_string()));
                }
                Some(n) => self.fail_countdown.set(Some(n - 1)),
                None => {}
            }
        }
        Ok(())
    }
}

impl Backend for MemoryBackend {
    fn count_members(&self, package: &str, relation: &str) -> BackendResult<usize> {
        self.record(BackendCall::CountMembers {
            package: package.to_string(),
            relation: relation.to_string(),
        })?;
        Ok(self.state.borrow().members(package, relation)?.len())
    }

    fn get_member(&self, package: &str, relation: &str, index: usize) -> BackendResult<String> {
        self.record(BackendCall::GetMember {
            package: package.to_string(),
            relation: relation.to_string(),
            index,
        })?;
        let state = self.state.borrow();
        state
            .members(package, relation)?
            .get(index)
            .cloned()
            .ok_or_else(|| BackendError::NoSuchMember {
                relation: relation.to_string(),
                index,
            })
    }

    fn update_member(
        &self,
        package: &str,
        relation: &str,
        idref: &str,
        index: usize,
    ) -> BackendResult<()> {
        self.record(BackendCall::UpdateMember {
            package: package.to_string(),
            relation: relation.to_string(),
            idref: idref.to_string(),
            index,
        })?;
        let mut state = self.state.borrow_mut();
        let slot = state
            .members_mut(package, relation)?
            .get_mut(index)
            .ok_or_else(|| BackendError::NoSuchMember {
                relation: relation.to_string(),
                index,
            })?;
        *slot = idref.to_string();
        Ok(())
    }

    fn insert_member(
        &self,
        package: &str,
        relation: &str,
        idref: &str,
        position: MemberPosition,
        pre_len: usize,
    ) -> BackendResult<()> {
        self.record(BackendCall::InsertMember {
            package: package.to_string(),
            relation: relation.to_string(),
            idref: idref.to_string(),
            position,
            pre_len,
        })?;
        let mut state = self.state.borrow_mut();
        let members = state.members_mut(package, relation)?;
        if members.len() != pre_len {
            return Err(BackendError::PositionMismatch {
                relation: relation.to_string(),
                expected: pre_len,
                actual: members.len(),
            });
        }
        let index = position.resolve(pre_len);
        if index > pre_len {
            return Err(BackendError::NoSuchMember {
                relation: relation.to_string(),
                index,
            });
        }
        members.insert(index, idref.to_string());
        Ok(())
    }

    fn remove_member(&self, package: &str, relation: &str, index: usize) -> BackendResult<()> {
        self.record(BackendCall::RemoveMember {
            package: package.to_string(),
            relation: relation.to_string(),
            index,
        })?;
        let mut state = self.state.borrow_mut();
        let members = state.members_mut(package, relation)?;
        if index >= members.len() {
            return Err(BackendError::NoSuchMember {
                relation: relation.to_string(),
                index,
            });
        }
        members.remove(index);
        Ok(())
    }

    fn create_package(&self, package: &str) -> BackendResult<()> {
        self.state
            .borrow_mut()
            .packages
            .entry(package.to_string())
            .or_default();
        Ok(())
    }

    fn has_package(&self, package: &str) -> BackendResult<bool> {
        Ok(self.state.borrow().packages.contains_key(package))
    }

    fn list_packages(&self) -> BackendResult<Vec<String>> {
        Ok(self.state.borrow().packages.keys().cloned().collect())
    }

    fn list_elements(&self, package: &str) -> BackendResult<Vec<ElementRecord>> {
        let state = self.state.borrow();
        let elements = state
            .packages
            .get(package)
            .ok_or_else(|| BackendError::NoSuchPackage(package.to_string()))?;
        Ok(elements.values().cloned().collect())
    }

    fn create_element(&self, package: &str, record: &ElementRecord) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        let elements = state
            .packages
            .get_mut(package)
            .ok_or_else(|| BackendError::NoSuchPackage(package.to_string()))?;
        if elements.contains_key(&record.id) {
            return Err(BackendError::DuplicateElement {
                package: package.to_string(),
                id: record.id.clone(),
            });
        }
        elements.insert(record.id.clone(), record.clone());
        if record.kind == ElementKind::Relation {
            state
                .members
                .insert((package.to_string(), record.id.clone()), Vec::new());
        }
        Ok(())
    }

    fn delete_element(&self, package: &str, id: &str) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        let elements = state
            .packages
            .get_mut(package)
            .ok_or_else(|| BackendError::NoSuchPackage(package.to_string()))?;
        elements.remove(id);
        state.members.remove(&(package.to_string(), id.to_string()));
        Ok(())
    }
}
