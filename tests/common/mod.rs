/*!
 * Common test utilities for the annograph test suite
 */

use anyhow::Result;
use std::path::PathBuf;
use std::rc::Rc;
use tempfile::TempDir;

use annograph::backend::{Backend, MemoryBackend};
use annograph::database::{JournalMode, Repository};
use annograph::model::{Content, Element, Package};

/// Route library logs to the test harness
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Path of a database file inside `dir`
pub fn database_path(dir: &TempDir) -> PathBuf {
    dir.path().join("annograph-test.db")
}

/// SQLite repository on a fresh file in `dir`
pub fn open_repository(dir: &TempDir) -> Result<Repository> {
    Repository::open(database_path(dir), JournalMode::Delete)
}

/// Package `id` over a fresh in-memory backend, returning both
pub fn memory_package(id: &str) -> (Rc<MemoryBackend>, Rc<Package>) {
    init_logger();
    let backend = Rc::new(MemoryBackend::new());
    let dyn_backend: Rc<dyn Backend> = backend.clone();
    let package = Package::create(dyn_backend, id).expect("package should be created");
    (backend, package)
}

/// Creates annotations `prefix0`..`prefix{count-1}` in `package`
pub fn create_annotations(package: &Package, prefix: &str, count: usize) -> Vec<Element> {
    (0..count)
        .map(|i| {
            package
                .create_annotation(&format!("{}{}", prefix, i), Content::new("text/plain"))
                .expect("annotation should be created")
        })
        .collect()
}

/// Ids of a list of elements
pub fn ids(elements: &[Element]) -> Vec<String> {
    elements.iter().map(|e| e.id().to_string()).collect()
}
