/*!
 * Integration tests for documents spread over several packages
 */

use anyhow::Result;
use std::rc::Rc;

use annograph::backend::Backend;
use annograph::model::{Content, Group, Member, Package};

use crate::common::{create_temp_dir, init_logger, open_repository};

#[test]
fn test_importedMembers_afterReopen_shouldResolveThroughImports() -> Result<()> {
    init_logger();
    let dir = create_temp_dir()?;

    {
        let backend: Rc<dyn Backend> = Rc::new(open_repository(&dir)?);
        let base = Package::create(backend.clone(), "base")?;
        let notes = Package::create(backend, "notes")?;
        let shot = base.create_annotation("shot1", Content::new("text/plain"))?;
        let comment = notes.create_annotation("c1", Content::new("text/plain"))?;
        notes.add_import("b", &base)?;

        let mut relation = notes.create_relation("links", Content::default())?;
        relation.append(&comment)?;
        relation.append(&shot)?;
        notes.save()?;
    }

    let backend: Rc<dyn Backend> = Rc::new(open_repository(&dir)?);
    let notes = Package::open(backend, "notes")?;
    let base = notes.import("b").expect("import should be loaded");
    assert_eq!(base.id(), "base");
    assert_eq!(notes.imports().count(), 1);

    let mut relation = notes.relation("links")?;
    let idrefs: Vec<String> = relation.iter_member_idrefs().collect::<Result<_, _>>()?;
    assert_eq!(idrefs, vec!["c1", "b:shot1"]);
    assert_eq!(relation.get(1)?.package_id(), "base");
    assert!(notes.same_element("b:shot1", "base#shot1"));
    Ok(())
}

#[test]
fn test_deletedImport_shouldLeaveDanglingMembers() -> Result<()> {
    init_logger();
    let dir = create_temp_dir()?;
    let backend: Rc<dyn Backend> = Rc::new(open_repository(&dir)?);
    let base = Package::create(backend.clone(), "base")?;
    let notes = Package::create(backend.clone(), "notes")?;
    let shot = base.create_annotation("shot1", Content::default())?;
    let own = notes.create_annotation("c1", Content::default())?;
    notes.add_import("b", &base)?;
    let mut relation = notes.create_relation("links", Content::default())?;
    relation.extend([&shot, &own])?;
    notes.save()?;

    notes.delete_element("b")?;
    let reopened = Package::open(backend, "notes")?;
    let mut relation = reopened.relation("links")?;

    let members: Vec<Member> = relation.iter_members().collect::<Result<_, _>>()?;
    assert_eq!(
        members,
        vec![Member::Dangling("b:shot1".to_string()), Member::Element(own)]
    );
    assert!(relation.get(0).is_err());
    assert_eq!(relation.len(), 2);
    Ok(())
}

#[test]
fn test_openOrCreate_shouldReuseExistingPackage() -> Result<()> {
    init_logger();
    let dir = create_temp_dir()?;
    let backend: Rc<dyn Backend> = Rc::new(open_repository(&dir)?);

    let created = Package::open_or_create(backend.clone(), "p")?;
    created.create_annotation("a", Content::default())?;
    let reopened = Package::open_or_create(backend.clone(), "p")?;

    assert_eq!(reopened.element_count(), 1);
    assert_eq!(backend.list_packages()?, vec!["p"]);
    assert!(Package::create(backend, "p").is_err());
    Ok(())
}
