//! Template stores: named, read-only sources of template PDF bytes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use crate::error::Result;
use crate::util::is_plain_file_name;

/// Trait for template sources
pub trait TemplateStore: Send + Sync {
    /// Read a template by file name; `Ok(None)` when it does not exist.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Names of the available templates, sorted.
    fn list(&self) -> Result<Vec<String>>;
}

/// Templates stored as `.pdf` files in one directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateStore for DirectoryStore {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        // Names never escape the template directory
        if !is_plain_file_name(name) {
            debug!("Rejecting template name {:?}", name);
            return Ok(None);
        }

        let path = self.root.join(name);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(std::fs::read(path)?))
    }

    fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            debug!("Template directory {} does not exist", self.root.display());
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.to_lowercase().ends_with(".pdf") {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

/// In-memory templates, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    templates: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_template(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.templates.insert(name.into(), bytes);
    }
}

impl TemplateStore for MemoryStore {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.templates.get(name).cloned())
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.templates.keys().cloned().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_store_lists_pdfs_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"%PDF-b").unwrap();
        std::fs::write(dir.path().join("a.PDF"), b"%PDF-a").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("sub.pdf")).unwrap();

        let store = DirectoryStore::new(dir.path());
        assert_eq!(store.list().unwrap(), vec!["a.PDF", "b.pdf"]);
        assert_eq!(store.read("b.pdf").unwrap().unwrap(), b"%PDF-b");
        assert!(store.read("missing.pdf").unwrap().is_none());
    }

    #[test]
    fn test_directory_store_rejects_paths() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("pdf");
        std::fs::create_dir(&inner).unwrap();
        std::fs::write(dir.path().join("secret.pdf"), b"%PDF").unwrap();

        let store = DirectoryStore::new(&inner);
        assert!(store.read("../secret.pdf").unwrap().is_none());
    }

    #[test]
    fn test_missing_directory_lists_nothing() {
        let store = DirectoryStore::new("/nonexistent/shipping-mark/pdf");
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new().with_template("label.pdf", vec![1, 2, 3]);
        assert_eq!(store.read("label.pdf").unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.list().unwrap(), vec!["label.pdf"]);
    }
}
