/*!
 * Typed views over heterogeneous element collections.
 *
 * A `Group` only has to provide `iter_elements`. Every per-kind view is
 * derived from it by filtering on the element kind, and holds no state of
 * its own: each call walks the underlying collection again, so views always
 * reflect its current content.
 */

use super::element::{Element, ElementKind};
use super::package::Package;

/// A collection of elements of any kind
pub trait Group {
    /// The elements of the group
    fn iter_elements(&self) -> Box<dyn Iterator<Item = Element> + '_>;

    /// Whether `element` belongs to the group
    fn contains(&self, element: &Element) -> bool {
        self.iter_elements().any(|e| e == *element)
    }

    /// Elements of one kind
    fn iter_kind(&self, kind: ElementKind) -> Box<dyn Iterator<Item = Element> + '_> {
        Box::new(self.iter_elements().filter(move |e| e.kind() == kind))
    }

    /// View restricted to one kind
    fn of_kind(&self, kind: ElementKind) -> KindView<'_, Self> {
        KindView { group: self, kind }
    }

    fn medias(&self) -> KindView<'_, Self> {
        self.of_kind(ElementKind::Media)
    }

    fn annotations(&self) -> KindView<'_, Self> {
        self.of_kind(ElementKind::Annotation)
    }

    fn relations(&self) -> KindView<'_, Self> {
        self.of_kind(ElementKind::Relation)
    }

    fn lists(&self) -> KindView<'_, Self> {
        self.of_kind(ElementKind::List)
    }

    fn tags(&self) -> KindView<'_, Self> {
        self.of_kind(ElementKind::Tag)
    }

    fn views(&self) -> KindView<'_, Self> {
        self.of_kind(ElementKind::View)
    }

    fn queries(&self) -> KindView<'_, Self> {
        self.of_kind(ElementKind::Query)
    }

    fn resources(&self) -> KindView<'_, Self> {
        self.of_kind(ElementKind::Resource)
    }

    fn imports(&self) -> KindView<'_, Self> {
        self.of_kind(ElementKind::Import)
    }
}

/// Read-only view of the elements of one kind in a group
#[derive(Debug)]
pub struct KindView<'g, G: Group + ?Sized> {
    group: &'g G,
    kind: ElementKind,
}

impl<G: Group + ?Sized> Clone for KindView<'_, G> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<G: Group + ?Sized> Copy for KindView<'_, G> {}

impl<'g, G: Group + ?Sized> KindView<'g, G> {
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = Element> + 'g> {
        self.group.iter_kind(self.kind)
    }

    /// Kind is checked before the group is searched
    pub fn contains(&self, element: &Element) -> bool {
        element.kind() == self.kind && self.group.contains(element)
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<'g, G: Group + ?Sized> IntoIterator for KindView<'g, G> {
    type Item = Element;
    type IntoIter = Box<dyn Iterator<Item = Element> + 'g>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Group for Package {
    fn iter_elements(&self) -> Box<dyn Iterator<Item = Element> + '_> {
        Box::new(self.elements().into_iter())
    }

    fn contains(&self, element: &Element) -> bool {
        element.package_id() == self.id() && self.element(element.id()).as_ref() == Some(element)
    }
}

impl Group for [Element] {
    fn iter_elements(&self) -> Box<dyn Iterator<Item = Element> + '_> {
        Box::new(self.iter().cloned())
    }
}

impl Group for Vec<Element> {
    fn iter_elements(&self) -> Box<dyn Iterator<Item = Element> + '_> {
        Box::new(self.iter().cloned())
    }
}
