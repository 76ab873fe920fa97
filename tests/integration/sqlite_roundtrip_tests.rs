/*!
 * Integration tests for packages and relations stored in SQLite
 */

use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::rc::Rc;

use annograph::backend::{Backend, MemberPosition};
use annograph::errors::{BackendError, ModelError};
use annograph::model::{Content, Element, ElementKind, Group, Package};

use crate::common::{create_temp_dir, ids, init_logger, open_repository};

#[test]
fn test_relation_afterReopen_shouldReadBackInAnyOrder() -> Result<()> {
    init_logger();
    let dir = create_temp_dir()?;
    let mut rng = StdRng::seed_from_u64(7);
    let mut expected: Vec<String> = Vec::new();

    {
        let backend: Rc<dyn Backend> = Rc::new(open_repository(&dir)?);
        let package = Package::create(backend, "movie")?;
        let annotations: Vec<Element> = (0..10)
            .map(|i| package.create_annotation(&format!("a{}", i), Content::new("text/plain")))
            .collect::<Result<_, _>>()?;
        let mut relation = package.create_relation("r", Content::default())?;
        let mut model: Vec<Element> = Vec::new();

        for _ in 0..40 {
            let element = annotations[rng.random_range(0..annotations.len())].clone();
            if model.is_empty() || rng.random_bool(0.6) {
                let index = rng.random_range(0..=model.len());
                relation.insert(index as isize, &element)?;
                model.insert(index, element);
            } else if rng.random_bool(0.5) {
                let index = rng.random_range(0..model.len());
                relation.delete(index as isize)?;
                model.remove(index);
            } else {
                let index = rng.random_range(0..model.len());
                relation.set(index as isize, &element)?;
                model[index] = element;
            }
        }
        package.save()?;
        expected.extend(ids(&model));
    }

    let backend: Rc<dyn Backend> = Rc::new(open_repository(&dir)?);
    let package = Package::open(backend, "movie")?;
    let mut relation = package.relation("r")?;
    assert_eq!(relation.len(), expected.len());

    let mut order: Vec<usize> = (0..expected.len()).collect();
    order.shuffle(&mut rng);
    for pos in order {
        assert_eq!(relation.get(pos as isize)?.id(), expected[pos]);
    }
    Ok(())
}

#[test]
fn test_catalog_afterReopen_shouldKeepKindsAndContent() -> Result<()> {
    init_logger();
    let dir = create_temp_dir()?;

    {
        let backend: Rc<dyn Backend> = Rc::new(open_repository(&dir)?);
        let package = Package::create(backend, "p")?;
        package.create_media("m", "file:///movie.mp4")?;
        package.create_annotation(
            "a",
            Content::new("application/json").with_schema("s").with_url("http://x/a"),
        )?;
        package.create_relation("r", Content::new("text/plain"))?;
    }

    let backend: Rc<dyn Backend> = Rc::new(open_repository(&dir)?);
    let package = Package::open(backend, "p")?;

    assert_eq!(package.element_count(), 3);
    assert_eq!(package.medias().count(), 1);
    assert_eq!(
        package.record("m").and_then(|r| r.uri),
        Some("file:///movie.mp4".to_string())
    );
    assert_eq!(
        package.record("a").and_then(|r| r.content),
        Some(Content::new("application/json").with_schema("s").with_url("http://x/a"))
    );
    assert_eq!(package.relation("r")?.content(), &Content::new("text/plain"));
    assert!(matches!(
        package.relation("a"),
        Err(ModelError::WrongKind {
            expected: ElementKind::Relation,
            actual: ElementKind::Annotation,
            ..
        })
    ));
    Ok(())
}

#[test]
fn test_flush_withStaleLength_shouldAbortAndKeepQueue() -> Result<()> {
    init_logger();
    let dir = create_temp_dir()?;
    let repository = open_repository(&dir)?;
    let backend: Rc<dyn Backend> = Rc::new(repository.clone());
    let package = Package::create(backend, "p")?;
    let a = package.create_annotation("a", Content::default())?;
    let mut relation = package.create_relation("r", Content::default())?;
    relation.append(&a)?;

    // another writer appends behind the package's back
    repository.insert_member("p", "r", "a", MemberPosition::Append, 0)?;

    let error = package.flush().unwrap_err();
    assert!(matches!(
        error,
        ModelError::FlushAborted {
            applied: 0,
            remaining: 1,
            source: BackendError::PositionMismatch {
                expected: 0,
                actual: 1,
                ..
            },
        }
    ));
    assert_eq!(package.pending_operations(), 1);
    assert_eq!(repository.count_members("p", "r")?, 1);
    Ok(())
}

#[test]
fn test_deleteElement_shouldCascadeStoredMembership() -> Result<()> {
    init_logger();
    let dir = create_temp_dir()?;
    let repository = open_repository(&dir)?;
    let backend: Rc<dyn Backend> = Rc::new(repository.clone());
    let package = Package::create(backend, "p")?;
    let a = package.create_annotation("a", Content::default())?;
    let mut relation = package.create_relation("r", Content::default())?;
    relation.extend([&a, &a])?;
    package.save()?;

    package.delete_element("r")?;

    assert!(package.record("r").is_none());
    assert_eq!(repository.connection().stats()?.member_count, 0);
    assert!(matches!(
        repository.count_members("p", "r"),
        Err(BackendError::NoSuchRelation { .. })
    ));
    Ok(())
}
