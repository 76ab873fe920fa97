/*!
 * Tests for package cleaning: the order in which queued member operations
 * reach the backend and what happens when one of them fails
 */

use annograph::backend::{BackendCall, MemberPosition};
use annograph::errors::{BackendError, ModelError};
use annograph::model::{Content, MemberOperation};

use crate::common::{create_annotations, memory_package};

#[test]
fn test_flush_shouldReplayOperationsInEnqueueOrder() {
    let (backend, package) = memory_package("p");
    let a = create_annotations(&package, "a", 3);
    let mut relation = package.create_relation("r", Content::default()).unwrap();

    relation.append(&a[0]).unwrap();
    relation.append(&a[1]).unwrap();
    relation.set(0, &a[2]).unwrap();
    relation.delete(1).unwrap();
    assert!(backend.writes().is_empty(), "nothing is written before cleaning");

    let applied = package.flush().unwrap();

    assert_eq!(applied, 4);
    assert_eq!(package.pending_operations(), 0);
    let writes = backend.writes();
    assert!(matches!(
        &writes[2],
        BackendCall::UpdateMember { idref, index: 0, .. } if idref == "a2"
    ));
    assert!(matches!(&writes[3], BackendCall::RemoveMember { index: 1, .. }));
    assert_eq!(backend.stored_members("p", "r"), vec!["a2"]);
}

#[test]
fn test_flush_acrossRelations_shouldKeepGlobalOrder() {
    let (backend, package) = memory_package("p");
    let a = create_annotations(&package, "a", 2);
    let mut first = package.create_relation("r1", Content::default()).unwrap();
    let mut second = package.create_relation("r2", Content::default()).unwrap();

    first.append(&a[0]).unwrap();
    second.append(&a[1]).unwrap();
    first.append(&a[1]).unwrap();

    package.flush().unwrap();

    let relations: Vec<String> = backend
        .writes()
        .into_iter()
        .map(|call| match call {
            BackendCall::InsertMember { relation, .. } => relation,
            other => panic!("unexpected call {:?}", other),
        })
        .collect();
    assert_eq!(relations, vec!["r1", "r2", "r1"]);
}

#[test]
fn test_flush_withFailingWrite_shouldKeepTailAndResume() {
    let (backend, package) = memory_package("p");
    let a = create_annotations(&package, "a", 4);
    let mut relation = package.create_relation("r", Content::default()).unwrap();
    relation.extend(&a).unwrap();

    backend.fail_on_write(2);
    let error = package.flush().unwrap_err();

    match error {
        ModelError::FlushAborted {
            applied,
            remaining,
            source,
        } => {
            assert_eq!(applied, 2);
            assert_eq!(remaining, 2);
            assert!(matches!(source, BackendError::Injected(_)));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(backend.stored_members("p", "r"), vec!["a0", "a1"]);
    assert_eq!(package.pending_operations(), 2);

    // the in-memory relation stays usable
    assert_eq!(relation.len(), 4);
    assert_eq!(relation.get(3).unwrap(), a[3]);

    assert_eq!(package.flush().unwrap(), 2);
    assert_eq!(backend.stored_members("p", "r"), vec!["a0", "a1", "a2", "a3"]);
}

#[test]
fn test_queuedOperations_shouldDescribeBackendCalls() {
    let (_backend, package) = memory_package("p");
    let a = create_annotations(&package, "a", 2);
    let mut relation = package.create_relation("r", Content::default()).unwrap();

    relation.append(&a[0]).unwrap();
    relation.insert(0, &a[1]).unwrap();

    let described: Vec<String> = package
        .queued_operations()
        .iter()
        .map(|op| op.to_string())
        .collect();
    assert_eq!(
        described,
        vec!["insert_member(r, a0, -1, 0)", "insert_member(r, a1, 0, 1)"]
    );
    assert!(matches!(
        package.queued_operations()[1],
        MemberOperation::Insert {
            position: MemberPosition::At(0),
            ..
        }
    ));
}

#[test]
fn test_deleteRelation_shouldDropItsPendingOperations() {
    let (backend, package) = memory_package("p");
    let a = create_annotations(&package, "a", 2);
    let mut kept = package.create_relation("kept", Content::default()).unwrap();
    let mut dropped = package.create_relation("dropped", Content::default()).unwrap();
    kept.append(&a[0]).unwrap();
    dropped.append(&a[1]).unwrap();

    package.delete_element("dropped").unwrap();

    assert_eq!(package.pending_operations(), 1);
    package.flush().unwrap();
    assert_eq!(backend.stored_members("p", "kept"), vec!["a0"]);
}

#[test]
fn test_deletedRelationHandle_shouldRejectWritesAndLeaveQueueUsable() {
    let (backend, package) = memory_package("p");
    let a = create_annotations(&package, "a", 2);
    let mut deleted = package.create_relation("r", Content::default()).unwrap();
    let mut other = package.create_relation("s", Content::default()).unwrap();
    deleted.append(&a[0]).unwrap();

    package.delete_element("r").unwrap();

    assert!(matches!(
        deleted.append(&a[0]),
        Err(ModelError::NoSuchElement { ref id, .. }) if id == "r"
    ));
    assert!(deleted.set(0, &a[1]).is_err());
    assert!(deleted.insert(0, &a[1]).is_err());
    assert!(deleted.delete(0).is_err());
    assert_eq!(package.pending_operations(), 0);

    other.append(&a[1]).unwrap();
    assert_eq!(package.flush().unwrap(), 1);
    assert_eq!(backend.stored_members("p", "s"), vec!["a1"]);
    package.save().unwrap();
}

#[test]
fn test_openRelation_shouldCleanFirst() {
    let (backend, package) = memory_package("p");
    let a = create_annotations(&package, "a", 2);
    let mut relation = package.create_relation("r", Content::default()).unwrap();
    relation.extend(&a).unwrap();

    let hydrated = package.relation("r").unwrap();

    assert_eq!(hydrated.len(), 2);
    assert_eq!(package.pending_operations(), 0);
    assert_eq!(backend.stored_members("p", "r"), vec!["a0", "a1"]);
}
