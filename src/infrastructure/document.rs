//! JSON document files: the line tree, its flat projection and a tax rate table.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::{rebuild, LineData, LineSubtree, LineTree, TaxConverter};
use crate::infrastructure::tax::{NoTaxConverter, RateTableTaxConverter};
use crate::infrastructure::traits::{FileSystem, InMemoryLineRepository};
use crate::infrastructure::{InfraError, InfraResult};

/// One commercial document as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Hierarchical lines
    #[serde(default)]
    pub lines: Vec<LineSubtree>,
    /// Flat persisted projection of `lines`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flat_lines: Vec<LineData>,
    /// Tax code -> rate (`0.2` for 20%)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tax_rates: BTreeMap<String, Decimal>,
}

impl Document {
    /// Live tree of the document; a document holding only a flat list is regrouped by index.
    pub fn tree(&self) -> LineTree {
        if self.lines.is_empty() && !self.flat_lines.is_empty() {
            debug!("rebuilding tree from {} flat lines", self.flat_lines.len());
            return rebuild(self.flat_lines.clone());
        }
        LineTree::from_subtrees(self.lines.clone())
    }

    pub fn set_tree(&mut self, tree: &LineTree, flat_lines: Vec<LineData>) {
        self.lines = tree.to_subtrees();
        self.flat_lines = flat_lines;
    }

    /// Persisted state, used to resolve sub-lines an edit payload did not send.
    pub fn repository(&self) -> InMemoryLineRepository {
        InMemoryLineRepository::from_subtrees(&self.lines)
    }

    pub fn tax_converter(&self) -> Box<dyn TaxConverter> {
        if self.tax_rates.is_empty() {
            Box::new(NoTaxConverter)
        } else {
            Box::new(RateTableTaxConverter::new(self.tax_rates.clone()))
        }
    }
}

/// Loads and saves [`Document`] files through the filesystem boundary.
pub struct DocumentStore {
    fs: Arc<dyn FileSystem>,
}

impl DocumentStore {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> InfraResult<Document> {
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| InfraError::io(format!("read document {}", path.display()), e))?;
        serde_json::from_str(&content)
            .map_err(|e| InfraError::json(format!("parse document {}", path.display()), e))
    }

    #[instrument(level = "debug", skip(self, document))]
    pub fn save(&self, path: &Path, document: &Document) -> InfraResult<()> {
        let content = serde_json::to_string_pretty(document)
            .map_err(|e| InfraError::json(format!("serialize document {}", path.display()), e))?;
        self.fs
            .ensure_parent(path)
            .and_then(|_| self.fs.write(path, &format!("{content}\n")))
            .map_err(|e| InfraError::io(format!("write document {}", path.display()), e))
    }

    /// Read a JSON file that is not a document (edit payloads).
    pub fn read_text(&self, path: &Path) -> InfraResult<String> {
        self.fs
            .read_to_string(path)
            .map_err(|e| InfraError::io(format!("read {}", path.display()), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::traits::RealFileSystem;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    #[test]
    fn given_document_when_saved_and_loaded_then_lines_survive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("order.json");
        let store = DocumentStore::new(Arc::new(RealFileSystem));
        let document = Document {
            lines: vec![LineSubtree::with_children(
                LineData::new(dec!(1), dec!(10)).with_id(1).with_index("1"),
                vec![LineSubtree::leaf(LineData::new(dec!(2), dec!(5)).with_id(2).with_index("1.1"))],
            )],
            tax_rates: BTreeMap::from([("VAT20".to_string(), dec!(0.2))]),
            ..Document::default()
        };

        store.save(&path, &document).unwrap();
        let loaded = store.load(&path).unwrap();

        assert_eq!(loaded, document);
    }

    #[test]
    fn given_only_flat_lines_when_building_tree_then_regroups_by_index() {
        let document = Document {
            flat_lines: vec![
                LineData::new(dec!(1), dec!(1)).with_index("1"),
                LineData::new(dec!(1), dec!(1)).with_index("1.1"),
            ],
            ..Document::default()
        };

        let tree = document.tree();

        assert_eq!(tree.roots().len(), 1);
        assert_eq!(tree.children(tree.roots()[0]).len(), 1);
    }

    #[test]
    fn given_missing_file_when_loading_then_io_error() {
        let store = DocumentStore::new(Arc::new(RealFileSystem));
        let result = store.load(Path::new("/nonexistent/order.json"));
        assert!(matches!(result, Err(InfraError::Io { .. })));
    }

    #[test]
    fn given_invalid_json_when_loading_then_json_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = DocumentStore::new(Arc::new(RealFileSystem)).load(&path);

        assert!(matches!(result, Err(InfraError::Json { .. })));
    }
}
