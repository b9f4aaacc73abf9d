//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with in-memory implementations.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use crate::domain::{LineId, LineSubtree};

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

/// Persistence lookup for lines that were saved before the current edit.
pub trait LineRepository: Send + Sync {
    /// Persisted line with its persisted sub-lines.
    fn find_by_id(&self, id: LineId) -> io::Result<Option<LineSubtree>>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
                std::fs::create_dir_all(parent)
            }
            _ => Ok(()),
        }
    }
}

/// Repository over the persisted state of one document, every subtree indexed by id.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLineRepository {
    by_id: HashMap<LineId, LineSubtree>,
}

impl InMemoryLineRepository {
    pub fn from_subtrees(subtrees: &[LineSubtree]) -> Self {
        let mut by_id = HashMap::new();
        let mut stack: Vec<&LineSubtree> = subtrees.iter().collect();
        while let Some(current) = stack.pop() {
            if let Some(id) = current.line.id {
                by_id.entry(id).or_insert_with(|| current.clone());
            }
            stack.extend(current.children.iter());
        }
        Self { by_id }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl LineRepository for InMemoryLineRepository {
    fn find_by_id(&self, id: LineId) -> io::Result<Option<LineSubtree>> {
        Ok(self.by_id.get(&id).cloned())
    }
}
