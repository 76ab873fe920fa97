/*!
 * Relations: ordered, lazily resolved sequences of annotation references.
 *
 * A relation keeps two arrays in lockstep, one slot per member:
 * - `cache`: the resolved element, `Unresolved` when not looked up yet, or
 *   `Dangling` when the lookup failed;
 * - `idrefs`: the member's id-ref, `None` when not fetched from the
 *   backend yet.
 *
 * A hydrated relation starts with both arrays full of empty slots and only
 * its member count known. Reads fill the slots on demand: cache first, then
 * the id-ref slot, then the backend.
 *
 * Mutations update both arrays immediately and enqueue the matching backend
 * write on the owning package; nothing is written until the package is
 * cleaned. Before a mutation that shifts positions, any id-ref still unknown
 * is fetched, so later backend reads never use positions that the queued
 * writes have moved.
 *
 * Positions are `isize`; negative positions count from the end.
 */

use log::{debug, trace};
use std::rc::Rc;

use super::cleaning::MemberOperation;
use super::element::{Content, Element, ElementKind};
use super::package::Package;
use super::slice::Slice;
use crate::backend::MemberPosition;
use crate::errors::{ModelError, ModelResult};

/// State of a member's cache slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Not looked up yet
    Unresolved,
    /// Looked up and found
    Resolved(Element),
    /// Looked up and not found
    Dangling,
}

/// Item of tolerant iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    /// Resolved member
    Element(Element),
    /// Member whose id-ref does not resolve
    Dangling(String),
}

impl Member {
    pub fn element(&self) -> Option<&Element> {
        match self {
            Member::Element(element) => Some(element),
            Member::Dangling(_) => None,
        }
    }
}

/// Ordered collection of annotation references
pub struct Relation {
    owner: Rc<Package>,
    id: String,
    content: Content,
    cache: Vec<Resolution>,
    idrefs: Vec<Option<String>>,
}

impl Relation {
    /// Fresh relation with no members
    pub(crate) fn new(owner: Rc<Package>, id: &str, content: Content) -> Self {
        Self {
            owner,
            id: id.to_string(),
            content,
            cache: Vec::new(),
            idrefs: Vec::new(),
        }
    }

    /// Relation sized from the backend, members unresolved
    pub(crate) fn hydrate(owner: Rc<Package>, id: &str, content: Content) -> ModelResult<Self> {
        let count = owner.backend().count_members(owner.id(), id)?;
        debug!("Hydrated relation {} with {} member(s)", id, count);
        Ok(Self {
            owner,
            id: id.to_string(),
            content,
            cache: vec![Resolution::Unresolved; count],
            idrefs: vec![None; count],
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn owner(&self) -> &Rc<Package> {
        &self.owner
    }

    /// Handle of the relation itself
    pub fn element(&self) -> Element {
        Element::new(self.owner.id(), self.id.as_str(), ElementKind::Relation)
    }

    /// Number of members, known without resolving any
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Member at `index`, or `Unreachable` when its id-ref does not resolve
    pub fn get(&mut self, index: isize) -> ModelResult<Element> {
        let pos = self.position(index)?;
        match self.resolve_at(pos)? {
            Some(element) => Ok(element),
            None => Err(ModelError::Unreachable {
                idref: self.idref_at(pos)?,
            }),
        }
    }

    /// Member at `index`, or `None` when its id-ref does not resolve.
    /// An invalid index is still an error.
    pub fn get_member(&mut self, index: isize) -> ModelResult<Option<Element>> {
        let pos = self.position(index)?;
        self.resolve_at(pos)
    }

    /// Member at `index`, or `default` when its id-ref does not resolve
    pub fn get_or(&mut self, index: isize, default: Element) -> ModelResult<Element> {
        Ok(self.get_member(index)?.unwrap_or(default))
    }

    /// Id-ref of the member at `index`, without resolving it
    pub fn get_idref(&mut self, index: isize) -> ModelResult<String> {
        let pos = self.position(index)?;
        self.idref_at(pos)
    }

    /// Whether the member at `index` was looked up and not found
    pub fn is_dangling(&self, index: isize) -> ModelResult<bool> {
        let pos = self.position(index)?;
        Ok(self.cache[pos] == Resolution::Dangling)
    }

    /// Forget failed lookups so they are attempted again, e.g. after an
    /// import was added. Returns how many slots were reset.
    pub fn forget_dangling(&mut self) -> usize {
        let mut reset = 0;
        for slot in self.cache.iter_mut() {
            if *slot == Resolution::Dangling {
                *slot = Resolution::Unresolved;
                reset += 1;
            }
        }
        reset
    }

    /// Members selected by `slice`; fails on the first unreachable one
    pub fn get_slice(&mut self, slice: &Slice) -> ModelResult<Vec<Element>> {
        slice
            .indices(self.len())?
            .into_iter()
            .map(|pos| self.get(pos as isize))
            .collect()
    }

    /// Tolerant iteration: unreachable members come out as their id-ref
    pub fn iter_members(&mut self) -> Members<'_> {
        Members {
            relation: self,
            next: 0,
        }
    }

    /// Strict iteration: an unreachable member yields `Err(Unreachable)`
    /// and iteration goes on with the next one
    pub fn iter(&mut self) -> Iter<'_> {
        Iter {
            relation: self,
            next: 0,
        }
    }

    /// Id-refs of the members, without resolving them
    pub fn iter_member_idrefs(&mut self) -> IdRefs<'_> {
        IdRefs {
            relation: self,
            next: 0,
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Replace the member at `index`
    pub fn set(&mut self, index: isize, element: &Element) -> ModelResult<()> {
        self.ensure_live()?;
        let pos = self.position(index)?;
        let idref = self.check_reference(element)?;
        self.set_at(pos, element, idref);
        Ok(())
    }

    /// Remove the member at `index`
    pub fn delete(&mut self, index: isize) -> ModelResult<()> {
        self.ensure_live()?;
        let pos = self.position(index)?;
        self.fetch_missing_idrefs()?;
        self.cache.remove(pos);
        self.idrefs.remove(pos);
        self.owner.enqueue(MemberOperation::Remove {
            package: self.owner.id().to_string(),
            relation: self.id.clone(),
            index: pos,
        });
        Ok(())
    }

    /// Insert before `index`. Out-of-range indices are clamped: beyond the
    /// end appends, before the start inserts first.
    pub fn insert(&mut self, index: isize, element: &Element) -> ModelResult<()> {
        self.ensure_live()?;
        let idref = self.check_reference(element)?;
        self.fetch_missing_idrefs()?;
        let pos = clamp_insertion(index, self.len());
        self.insert_at(pos, element, idref);
        Ok(())
    }

    /// Add a member at the end. Existing positions do not move, so
    /// unfetched id-refs stay unfetched.
    pub fn append(&mut self, element: &Element) -> ModelResult<()> {
        self.ensure_live()?;
        let idref = self.check_reference(element)?;
        let pre_len = self.len();
        self.cache.push(Resolution::Resolved(element.clone()));
        self.idrefs.push(Some(idref.clone()));
        self.owner.enqueue(MemberOperation::Insert {
            package: self.owner.id().to_string(),
            relation: self.id.clone(),
            idref,
            position: MemberPosition::Append,
            pre_len,
        });
        Ok(())
    }

    /// Append each element in turn; one queued operation per element
    pub fn extend<'a, I>(&mut self, elements: I) -> ModelResult<()>
    where
        I: IntoIterator<Item = &'a Element>,
    {
        for element in elements {
            self.append(element)?;
        }
        Ok(())
    }

    /// Replace the members selected by `slice`.
    ///
    /// A contiguous slice may be replaced by a sequence of another length;
    /// a stepped slice must be replaced by exactly as many elements as it
    /// selects.
    pub fn set_slice(&mut self, slice: &Slice, elements: &[Element]) -> ModelResult<()> {
        self.ensure_live()?;
        let indices = slice.indices(self.len())?;
        let idrefs = elements
            .iter()
            .map(|element| self.check_reference(element))
            .collect::<ModelResult<Vec<_>>>()?;

        if indices.len() == elements.len() {
            for ((pos, element), idref) in indices.into_iter().zip(elements).zip(idrefs) {
                self.set_at(pos, element, idref);
            }
            return Ok(());
        }
        if !slice.is_contiguous() {
            return Err(ModelError::LengthMismatch {
                expected: indices.len(),
                actual: elements.len(),
            });
        }

        let (start, _, _) = slice.bounds(self.len())?;
        self.del_slice(slice)?;
        let mut pos = start as usize;
        for (element, idref) in elements.iter().zip(idrefs) {
            self.insert_at(pos, element, idref);
            pos += 1;
        }
        Ok(())
    }

    /// Remove the members selected by `slice`, highest position first
    pub fn del_slice(&mut self, slice: &Slice) -> ModelResult<()> {
        let mut indices = slice.indices(self.len())?;
        indices.sort_unstable_by(|a, b| b.cmp(a));
        for pos in indices {
            self.delete(pos as isize)?;
        }
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Writes through a handle whose relation was deleted would never apply
    fn ensure_live(&self) -> ModelResult<()> {
        match self.owner.record(&self.id) {
            Some(record) if record.kind == ElementKind::Relation => Ok(()),
            _ => Err(ModelError::NoSuchElement {
                package: self.owner.id().to_string(),
                id: self.id.clone(),
            }),
        }
    }

    /// Normalize a read/write/delete position
    fn position(&self, index: isize) -> ModelResult<usize> {
        let len = self.len();
        let pos = if index < 0 { index + len as isize } else { index };
        if pos < 0 || pos as usize >= len {
            return Err(ModelError::IndexOutOfRange { index, len });
        }
        Ok(pos as usize)
    }

    /// Kind and scope checks; returns the id-ref to store
    fn check_reference(&self, element: &Element) -> ModelResult<String> {
        if element.kind() != ElementKind::Annotation {
            return Err(ModelError::ReferenceRejected {
                element: element.absolute_idref(),
                reason: format!("members must be annotations, not {}", element.kind()),
            });
        }
        if !self.owner.can_reference(element) {
            return Err(ModelError::ReferenceRejected {
                element: element.absolute_idref(),
                reason: format!("not reachable from package {}", self.owner.id()),
            });
        }
        self.owner
            .make_idref_in(element)
            .ok_or_else(|| ModelError::ReferenceRejected {
                element: element.absolute_idref(),
                reason: format!("no id-ref in package {}", self.owner.id()),
            })
    }

    fn set_at(&mut self, pos: usize, element: &Element, idref: String) {
        self.cache[pos] = Resolution::Resolved(element.clone());
        self.idrefs[pos] = Some(idref.clone());
        self.owner.enqueue(MemberOperation::Update {
            package: self.owner.id().to_string(),
            relation: self.id.clone(),
            idref,
            index: pos,
        });
    }

    fn insert_at(&mut self, pos: usize, element: &Element, idref: String) {
        let pre_len = self.len();
        self.cache.insert(pos, Resolution::Resolved(element.clone()));
        self.idrefs.insert(pos, Some(idref.clone()));
        self.owner.enqueue(MemberOperation::Insert {
            package: self.owner.id().to_string(),
            relation: self.id.clone(),
            idref,
            position: MemberPosition::At(pos),
            pre_len,
        });
    }

    /// Id-ref at a normalized position, fetched from the backend if needed
    fn idref_at(&mut self, pos: usize) -> ModelResult<String> {
        if let Some(idref) = &self.idrefs[pos] {
            return Ok(idref.clone());
        }
        let idref = self
            .owner
            .backend()
            .get_member(self.owner.id(), &self.id, pos)?;
        trace!("Fetched member {} of {}: {}", pos, self.id, idref);
        self.idrefs[pos] = Some(idref.clone());
        Ok(idref)
    }

    /// Element at a normalized position; `None` when it does not resolve
    fn resolve_at(&mut self, pos: usize) -> ModelResult<Option<Element>> {
        match &self.cache[pos] {
            Resolution::Resolved(element) => return Ok(Some(element.clone())),
            Resolution::Dangling => return Ok(None),
            Resolution::Unresolved => {}
        }
        let idref = self.idref_at(pos)?;
        match self.owner.get_element(&idref) {
            Some(element) => {
                self.cache[pos] = Resolution::Resolved(element.clone());
                Ok(Some(element))
            }
            None => {
                debug!("Member {} of {} is dangling: {}", pos, self.id, idref);
                self.cache[pos] = Resolution::Dangling;
                Ok(None)
            }
        }
    }

    fn fetch_missing_idrefs(&mut self) -> ModelResult<()> {
        for pos in 0..self.idrefs.len() {
            if self.idrefs[pos].is_none() {
                self.idref_at(pos)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relation")
            .field("package", &self.owner.id())
            .field("id", &self.id)
            .field("len", &self.len())
            .field("idrefs", &self.idrefs)
            .finish()
    }
}

/// Insertion point for `index` in a sequence of length `len`
fn clamp_insertion(index: isize, len: usize) -> usize {
    let len = len as isize;
    let pos = if index > len {
        len
    } else if index < -len {
        0
    } else if index < 0 {
        index + len
    } else {
        index
    };
    pos as usize
}

/// Tolerant member iterator, see `Relation::iter_members`
pub struct Members<'a> {
    relation: &'a mut Relation,
    next: usize,
}

impl Iterator for Members<'_> {
    type Item = ModelResult<Member>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.relation.len() {
            return None;
        }
        let pos = self.next;
        self.next += 1;
        let member = match self.relation.resolve_at(pos) {
            Ok(Some(element)) => Ok(Member::Element(element)),
            Ok(None) => self.relation.idref_at(pos).map(Member::Dangling),
            Err(e) => Err(e),
        };
        Some(member)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.relation.len().saturating_sub(self.next);
        (left, Some(left))
    }
}

/// Strict member iterator, see `Relation::iter`
pub struct Iter<'a> {
    relation: &'a mut Relation,
    next: usize,
}

impl Iterator for Iter<'_> {
    type Item = ModelResult<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.relation.len() {
            return None;
        }
        let pos = self.next;
        self.next += 1;
        Some(self.relation.get(pos as isize))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.relation.len().saturating_sub(self.next);
        (left, Some(left))
    }
}

/// Id-ref iterator, see `Relation::iter_member_idrefs`
pub struct IdRefs<'a> {
    relation: &'a mut Relation,
    next: usize,
}

impl Iterator for IdRefs<'_> {
    type Item = ModelResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.relation.len() {
            return None;
        }
        let pos = self.next;
        self.next += 1;
        Some(self.relation.idref_at(pos))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.relation.len().saturating_sub(self.next);
        (left, Some(left))
    }
}
