/*!
 * Tests for per-kind views over packages and element lists
 */

use annograph::backend::ElementRecord;
use annograph::model::{Content, Element, ElementKind, Group};

use crate::common::{create_annotations, ids, memory_package};

#[test]
fn test_packageViews_shouldExposeEveryKind() {
    let (_backend, package) = memory_package("p");
    create_annotations(&package, "a", 2);
    package.create_media("m", "file:///m.mp4").unwrap();
    package.create_relation("r", Content::default()).unwrap();
    package
        .create_element(ElementRecord::new("t", ElementKind::Tag))
        .unwrap();
    package
        .create_element(ElementRecord::new("l", ElementKind::List))
        .unwrap();
    package
        .create_element(
            ElementRecord::new("v", ElementKind::View).with_content(Content::new("text/html")),
        )
        .unwrap();
    package
        .create_element(
            ElementRecord::new("qry", ElementKind::Query).with_content(Content::default()),
        )
        .unwrap();
    package
        .create_element(
            ElementRecord::new("res", ElementKind::Resource).with_content(Content::default()),
        )
        .unwrap();

    let annotations: Vec<Element> = package.annotations().iter().collect();
    assert_eq!(ids(&annotations), vec!["a0", "a1"]);
    assert_eq!(package.medias().count(), 1);
    assert_eq!(package.relations().count(), 1);
    assert_eq!(package.tags().count(), 1);
    assert_eq!(package.lists().count(), 1);
    assert_eq!(package.views().count(), 1);
    assert_eq!(package.queries().count(), 1);
    assert_eq!(package.resources().count(), 1);
    assert!(package.imports().is_empty());
}

#[test]
fn test_kindView_contains_shouldAgreeWithKindAndGroup() {
    let (_backend, package) = memory_package("p");
    let annotations = create_annotations(&package, "a", 2);
    let media = package.create_media("m", "file:///m.mp4").unwrap();
    let outsider = Element::new("elsewhere", "a0", ElementKind::Annotation);

    for kind in ElementKind::ALL {
        let view = package.of_kind(kind);
        for element in annotations.iter().chain([&media, &outsider]) {
            let expected = element.kind() == kind && package.contains(element);
            assert_eq!(view.contains(element), expected, "{} in {}", element, kind.plural());
        }
    }
    assert!(!package.contains(&outsider));
}

#[test]
fn test_views_shouldPartitionTheElements() {
    let (_backend, package) = memory_package("p");
    create_annotations(&package, "a", 3);
    package.create_media("m", "file:///m.mp4").unwrap();
    package.create_relation("r", Content::default()).unwrap();

    let total: usize = ElementKind::ALL
        .iter()
        .map(|kind| package.of_kind(*kind).count())
        .sum();
    assert_eq!(total, package.element_count());
}

#[test]
fn test_sliceGroup_shouldFilterPlainLists() {
    let elements = vec![
        Element::new("p", "a", ElementKind::Annotation),
        Element::new("p", "m", ElementKind::Media),
        Element::new("p", "b", ElementKind::Annotation),
    ];
    let slice: &[Element] = &elements[1..];

    assert_eq!(slice.annotations().count(), 1);
    assert_eq!(slice.medias().count(), 1);
    assert!(!slice.annotations().contains(&elements[0]));
    assert_eq!(
        ids(&elements.annotations().into_iter().collect::<Vec<_>>()),
        vec!["a", "b"]
    );
}

#[test]
fn test_relationMembers_shouldFormAGroup() {
    let (_backend, package) = memory_package("p");
    let annotations = create_annotations(&package, "a", 3);
    let mut relation = package.create_relation("r", Content::default()).unwrap();
    relation.extend(&annotations[..2]).unwrap();

    let members: Vec<Element> = relation.iter().collect::<Result<_, _>>().unwrap();

    assert!(members.annotations().contains(&annotations[1]));
    assert!(!members.annotations().contains(&annotations[2]));
    assert!(members.relations().is_empty());
}
