/*!
 * Tests for id-ref creation and resolution across package imports
 */

use std::rc::Rc;

use annograph::backend::{Backend, MemoryBackend};
use annograph::errors::ModelError;
use annograph::model::{Content, Element, IdRef, Package};

use crate::common::init_logger;

/// Three packages over one backend: `main` imports `lib` as `l`, `lib`
/// imports `base` as `b`
fn chain() -> (Rc<Package>, Rc<Package>, Rc<Package>) {
    init_logger();
    let backend: Rc<dyn Backend> = Rc::new(MemoryBackend::new());
    let base = Package::create(backend.clone(), "base").unwrap();
    let lib = Package::create(backend.clone(), "lib").unwrap();
    let main = Package::create(backend, "main").unwrap();
    lib.add_import("b", &base).unwrap();
    main.add_import("l", &lib).unwrap();
    (main, lib, base)
}

#[test]
fn test_makeIdref_shouldFollowImportChain() {
    let (main, lib, base) = chain();
    let local = main.create_annotation("x", Content::default()).unwrap();
    let in_lib = lib.create_annotation("y", Content::default()).unwrap();
    let in_base = base.create_annotation("z", Content::default()).unwrap();

    assert_eq!(main.make_idref_in(&local).as_deref(), Some("x"));
    assert_eq!(main.make_idref_in(&in_lib).as_deref(), Some("l:y"));
    assert_eq!(main.make_idref_in(&in_base).as_deref(), Some("l:b:z"));
    assert_eq!(in_base.make_idref_in(&lib).as_deref(), Some("b:z"));
    assert_eq!(base.make_idref_in(&local), None);
}

#[test]
fn test_getElement_shouldResolveEveryForm() {
    let (main, _lib, base) = chain();
    let z = base.create_annotation("z", Content::default()).unwrap();

    assert_eq!(main.get_element("l:b:z"), Some(z.clone()));
    assert_eq!(main.get_element("base#z"), Some(z.clone()));
    assert_eq!(base.get_element("z"), Some(z.clone()));
    assert!(main.same_element("l:b:z", "base#z"));

    assert_eq!(main.get_element("z"), None);
    assert_eq!(main.get_element("l:z"), None);
    assert_eq!(main.get_element("nowhere#z"), None);
    assert_eq!(main.get_element("not an id"), None);
    assert!(matches!(
        main.require_element("l:nope"),
        Err(ModelError::Unreachable { .. })
    ));
}

#[test]
fn test_relation_shouldStoreMembersAsRelativeIdrefs() {
    let (main, lib, _base) = chain();
    let y = lib.create_annotation("y", Content::default()).unwrap();
    let mut relation = main.create_relation("r", Content::default()).unwrap();

    relation.append(&y).unwrap();
    main.flush().unwrap();

    let mut hydrated = main.relation("r").unwrap();
    assert_eq!(hydrated.get_idref(0).unwrap(), "l:y");
    assert_eq!(hydrated.get(0).unwrap(), y);
}

#[test]
fn test_relation_withUnreachablePackage_shouldRejectMember() {
    let (_main, lib, _base) = chain();
    let backend: Rc<dyn Backend> = lib.backend().clone();
    let stranger = Package::create(backend, "stranger").unwrap();
    let foreign = stranger.create_annotation("f", Content::default()).unwrap();
    let mut relation = lib.create_relation("r", Content::default()).unwrap();

    assert!(!lib.can_reference(&foreign));
    assert!(matches!(
        relation.append(&foreign),
        Err(ModelError::ReferenceRejected { .. })
    ));
    assert!(relation.is_empty());
}

#[test]
fn test_addImport_withCycle_shouldFail() {
    let (main, _lib, base) = chain();

    assert!(matches!(
        base.add_import("m", &main),
        Err(ModelError::ImportCycle { .. })
    ));
    assert!(matches!(
        main.add_import("self", &main),
        Err(ModelError::ImportCycle { .. })
    ));
}

#[test]
fn test_forgetDangling_afterImport_shouldRetryResolution() {
    init_logger();
    let backend: Rc<dyn Backend> = Rc::new(MemoryBackend::new());
    let other = Package::create(backend.clone(), "other").unwrap();
    let target = other.create_annotation("t", Content::default()).unwrap();
    let package = Package::create(backend.clone(), "p").unwrap();
    let imported = package.add_import("o", &other).unwrap();
    let mut relation = package.create_relation("r", Content::default()).unwrap();
    relation.append(&target).unwrap();
    package.flush().unwrap();

    package.delete_element(imported.id()).unwrap();
    let mut hydrated = package.relation("r").unwrap();
    assert_eq!(hydrated.get_member(0).unwrap(), None);

    package.add_import("o", &other).unwrap();
    assert_eq!(hydrated.get_member(0).unwrap(), None, "dangling is sticky");
    assert_eq!(hydrated.forget_dangling(), 1);
    assert_eq!(hydrated.get(0).unwrap(), target);
}

#[test]
fn test_idRef_display_shouldRoundTripThroughParse() {
    for text in ["a", "imp:a", "i1:i2:a", "pkg#a"] {
        let parsed: IdRef = text.parse().unwrap();
        assert_eq!(parsed.to_string(), text);
    }
    assert!("a:".parse::<IdRef>().is_err());
    assert!("#a".parse::<IdRef>().is_err());
}

#[test]
fn test_element_absoluteIdref_shouldNamePackage() {
    let element = Element::new("pkg", "a", annograph::model::ElementKind::Annotation);
    assert_eq!(element.absolute_idref(), "pkg#a");
}
