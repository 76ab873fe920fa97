/*!
 * Packages: element catalogs, imports and the deferred write queue.
 *
 * A package owns its elements and is the scope in which id-refs are made
 * and resolved. It also owns the write queue that every relation of the
 * package feeds; `flush` (or `save`) is the single point where queued
 * membership writes reach the backend.
 *
 * Packages are single-threaded and shared as `Rc<Package>`.
 */

use log::{debug, info, trace};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

use super::cleaning::{MemberOperation, WriteQueue};
use super::element::{Content, Element, ElementKind};
use super::idref::{is_valid_id, is_valid_package_id, IdRef};
use super::relation::Relation;
use crate::backend::{Backend, ElementRecord};
use crate::errors::{ModelError, ModelResult};

/// A package of elements backed by a storage backend
pub struct Package {
    id: String,
    backend: Rc<dyn Backend>,
    elements: RefCell<BTreeMap<String, ElementRecord>>,
    imports: RefCell<BTreeMap<String, Rc<Package>>>,
    queue: RefCell<WriteQueue>,
}

impl Package {
    /// Create a new, empty package in the backend
    pub fn create(backend: Rc<dyn Backend>, id: &str) -> ModelResult<Rc<Package>> {
        if !is_valid_package_id(id) {
            return Err(ModelError::InvalidIdentifier(id.to_string()));
        }
        if backend.has_package(id)? {
            return Err(ModelError::PackageExists(id.to_string()));
        }
        backend.create_package(id)?;
        info!("Created package {}", id);
        Ok(Rc::new(Self::empty(backend, id)))
    }

    /// Load a package and, recursively, the packages it imports
    pub fn open(backend: Rc<dyn Backend>, id: &str) -> ModelResult<Rc<Package>> {
        let mut loaded = HashMap::new();
        Self::open_with(backend, id, &mut loaded)
    }

    /// Open the package if it exists, create it otherwise
    pub fn open_or_create(backend: Rc<dyn Backend>, id: &str) -> ModelResult<Rc<Package>> {
        if backend.has_package(id)? {
            Self::open(backend, id)
        } else {
            Self::create(backend, id)
        }
    }

    fn empty(backend: Rc<dyn Backend>, id: &str) -> Self {
        Self {
            id: id.to_string(),
            backend,
            elements: RefCell::new(BTreeMap::new()),
            imports: RefCell::new(BTreeMap::new()),
            queue: RefCell::new(WriteQueue::new()),
        }
    }

    fn open_with(
        backend: Rc<dyn Backend>,
        id: &str,
        loaded: &mut HashMap<String, Rc<Package>>,
    ) -> ModelResult<Rc<Package>> {
        if let Some(package) = loaded.get(id) {
            return Ok(package.clone());
        }
        if !backend.has_package(id)? {
            return Err(ModelError::NoSuchPackage(id.to_string()));
        }

        let records = backend.list_elements(id)?;
        let package = Rc::new(Self::empty(backend.clone(), id));
        loaded.insert(id.to_string(), package.clone());

        for record in records {
            if record.kind == ElementKind::Import {
                let target = record
                    .uri
                    .clone()
                    .ok_or_else(|| ModelError::NoSuchPackage(format!("{}:{}", id, record.id)))?;
                let imported = Self::open_with(backend.clone(), &target, loaded)?;
                package
                    .imports
                    .borrow_mut()
                    .insert(record.id.clone(), imported);
            }
            package
                .elements
                .borrow_mut()
                .insert(record.id.clone(), record);
        }

        debug!(
            "Opened package {} ({} elements)",
            id,
            package.elements.borrow().len()
        );
        Ok(package)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn backend(&self) -> &Rc<dyn Backend> {
        &self.backend
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Element of this package with the given id
    pub fn element(&self, id: &str) -> Option<Element> {
        self.elements
            .borrow()
            .get(id)
            .map(|record| Element::new(self.id.as_str(), record.id.as_str(), record.kind))
    }

    /// Stored record of an element of this package
    pub fn record(&self, id: &str) -> Option<ElementRecord> {
        self.elements.borrow().get(id).cloned()
    }

    /// Elements of this package, sorted by id
    pub fn elements(&self) -> Vec<Element> {
        self.elements
            .borrow()
            .values()
            .map(|record| Element::new(self.id.as_str(), record.id.as_str(), record.kind))
            .collect()
    }

    pub fn element_count(&self) -> usize {
        self.elements.borrow().len()
    }

    /// Store a new element. Imports are added with `add_import` instead.
    pub fn create_element(&self, record: ElementRecord) -> ModelResult<Element> {
        if record.kind == ElementKind::Import {
            return Err(ModelError::ReferenceRejected {
                element: record.id,
                reason: "imports are created with add_import".to_string(),
            });
        }
        self.insert_record(record)
    }

    pub fn create_annotation(&self, id: &str, content: Content) -> ModelResult<Element> {
        self.create_element(ElementRecord::new(id, ElementKind::Annotation).with_content(content))
    }

    pub fn create_media(&self, id: &str, url: &str) -> ModelResult<Element> {
        self.create_element(ElementRecord::new(id, ElementKind::Media).with_uri(url))
    }

    /// Create an empty relation
    pub fn create_relation(self: &Rc<Self>, id: &str, content: Content) -> ModelResult<Relation> {
        self.create_element(ElementRecord::new(id, ElementKind::Relation).with_content(content.clone()))?;
        Ok(Relation::new(self.clone(), id, content))
    }

    /// Relation stored under `id`, hydrated from the backend.
    ///
    /// Pending writes are flushed first so the member count read from the
    /// backend is current.
    pub fn relation(self: &Rc<Self>, id: &str) -> ModelResult<Relation> {
        let record = self.record(id).ok_or_else(|| ModelError::NoSuchElement {
            package: self.id.clone(),
            id: id.to_string(),
        })?;
        if record.kind != ElementKind::Relation {
            return Err(ModelError::WrongKind {
                id: id.to_string(),
                expected: ElementKind::Relation,
                actual: record.kind,
            });
        }
        if !self.queue.borrow().is_empty() {
            self.flush()?;
        }
        Relation::hydrate(self.clone(), id, record.content.unwrap_or_default())
    }

    /// Delete an element. Pending writes of a deleted relation are dropped.
    pub fn delete_element(&self, id: &str) -> ModelResult<()> {
        let kind = self
            .record(id)
            .map(|record| record.kind)
            .ok_or_else(|| ModelError::NoSuchElement {
                package: self.id.clone(),
                id: id.to_string(),
            })?;

        if kind == ElementKind::Relation {
            let dropped = self.queue.borrow_mut().discard_relation(id);
            if dropped > 0 {
                debug!("Dropped {} pending operation(s) of relation {}", dropped, id);
            }
        }
        self.backend.delete_element(&self.id, id)?;
        self.elements.borrow_mut().remove(id);
        if kind == ElementKind::Import {
            self.imports.borrow_mut().remove(id);
        }
        Ok(())
    }

    fn insert_record(&self, record: ElementRecord) -> ModelResult<Element> {
        if !is_valid_id(&record.id) {
            return Err(ModelError::InvalidIdentifier(record.id));
        }
        if self.elements.borrow().contains_key(&record.id) {
            return Err(ModelError::DuplicateElement {
                package: self.id.clone(),
                id: record.id,
            });
        }
        self.backend.create_element(&self.id, &record)?;
        let element = Element::new(self.id.as_str(), record.id.as_str(), record.kind);
        trace!("Created {}", element);
        self.elements.borrow_mut().insert(record.id.clone(), record);
        Ok(element)
    }

    // =========================================================================
    // Imports
    // =========================================================================

    /// Import `package` under `import_id`
    pub fn add_import(&self, import_id: &str, package: &Rc<Package>) -> ModelResult<Element> {
        if package.id == self.id || package.reaches(&self.id) {
            return Err(ModelError::ImportCycle {
                package: self.id.clone(),
                imported: package.id.clone(),
            });
        }
        let element = self.insert_record(ElementRecord::import(import_id, package.id.as_str()))?;
        self.imports
            .borrow_mut()
            .insert(import_id.to_string(), package.clone());
        Ok(element)
    }

    /// Package imported under `import_id`
    pub fn import(&self, import_id: &str) -> Option<Rc<Package>> {
        self.imports.borrow().get(import_id).cloned()
    }

    /// Direct imports, sorted by import id
    pub fn imported_packages(&self) -> Vec<(String, Rc<Package>)> {
        self.imports
            .borrow()
            .iter()
            .map(|(id, package)| (id.clone(), package.clone()))
            .collect()
    }

    /// Whether `package_id` is reachable through imports (self excluded)
    pub fn reaches(&self, package_id: &str) -> bool {
        self.import_path(package_id).is_some_and(|path| !path.is_empty())
    }

    /// Shortest chain of import ids leading to `package_id`; empty for self
    fn import_path(&self, package_id: &str) -> Option<Vec<String>> {
        if package_id == self.id {
            return Some(Vec::new());
        }
        let mut seen = HashSet::new();
        let mut queue: VecDeque<(Rc<Package>, Vec<String>)> = self
            .imported_packages()
            .into_iter()
            .map(|(import_id, package)| (package, vec![import_id]))
            .collect();

        while let Some((package, path)) = queue.pop_front() {
            if package.id == package_id {
                return Some(path);
            }
            if !seen.insert(package.id.clone()) {
                continue;
            }
            for (import_id, imported) in package.imported_packages() {
                let mut next = path.clone();
                next.push(import_id);
                queue.push_back((imported, next));
            }
        }
        None
    }

    // =========================================================================
    // Id-refs
    // =========================================================================

    /// Whether this package may hold a reference to `element`: the element
    /// belongs to the package or to a package reachable through imports
    pub fn can_reference(&self, element: &Element) -> bool {
        self.import_path(element.package_id()).is_some()
    }

    /// Id-ref of `element` in the scope of this package
    pub fn make_idref_in(&self, element: &Element) -> Option<String> {
        let path = self.import_path(element.package_id())?;
        let idref = path
            .iter()
            .rev()
            .fold(IdRef::local(element.id()), |idref, import| idref.through(import));
        Some(idref.to_string())
    }

    /// Element designated by `idref`, or `None` when it cannot be resolved
    pub fn get_element(&self, idref: &str) -> Option<Element> {
        match idref.parse::<IdRef>() {
            Ok(parsed) => self.resolve(&parsed),
            Err(_) => {
                debug!("Malformed id-ref {:?} in package {}", idref, self.id);
                None
            }
        }
    }

    /// Element designated by `idref`, or `Unreachable`
    pub fn require_element(&self, idref: &str) -> ModelResult<Element> {
        self.get_element(idref).ok_or_else(|| ModelError::Unreachable {
            idref: idref.to_string(),
        })
    }

    /// Whether two id-refs designate the same live element
    pub fn same_element(&self, a: &str, b: &str) -> bool {
        match (self.get_element(a), self.get_element(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    fn resolve(&self, idref: &IdRef) -> Option<Element> {
        match idref {
            IdRef::Relative { imports, id } => match imports.split_first() {
                None => self.element(id),
                Some((first, rest)) => {
                    let imported = self.import(first)?;
                    imported.resolve(&IdRef::Relative {
                        imports: rest.to_vec(),
                        id: id.clone(),
                    })
                }
            },
            IdRef::Absolute { package, id } => {
                self.find_absolute(package, id, &mut HashSet::new())
            }
        }
    }

    /// Search this package and its imports for `package#id`; `seen` guards
    /// against import cycles already present in storage
    fn find_absolute(
        &self,
        package_id: &str,
        id: &str,
        seen: &mut HashSet<String>,
    ) -> Option<Element> {
        if !seen.insert(self.id.clone()) {
            return None;
        }
        if package_id == self.id {
            return self.element(id);
        }
        self.imported_packages()
            .into_iter()
            .find_map(|(_, imported)| imported.find_absolute(package_id, id, seen))
    }

    // =========================================================================
    // Cleaning
    // =========================================================================

    pub(crate) fn enqueue(&self, operation: MemberOperation) {
        self.queue.borrow_mut().push(operation);
    }

    /// Number of queued member operations
    pub fn pending_operations(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Snapshot of the queued member operations, oldest first
    pub fn queued_operations(&self) -> Vec<MemberOperation> {
        self.queue.borrow().iter().cloned().collect()
    }

    /// Replay every queued member operation against the backend, in order.
    /// Returns the number of operations applied.
    pub fn flush(&self) -> ModelResult<usize> {
        let mut queue = self.queue.borrow_mut();
        if queue.is_empty() {
            return Ok(0);
        }
        debug!("Cleaning {} operation(s) of package {}", queue.len(), self.id);
        queue.flush(self.backend.as_ref())
    }

    /// Flush pending writes, logging the outcome
    pub fn save(&self) -> ModelResult<()> {
        let applied = self.flush()?;
        info!("Saved package {} ({} member operation(s))", self.id, applied);
        Ok(())
    }
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("id", &self.id)
            .field("elements", &self.elements.borrow().len())
            .field("imports", &self.imports.borrow().keys().collect::<Vec<_>>())
            .field("pending", &self.queue.borrow().len())
            .finish()
    }
}
