//! Portable document-tree records.
//!
//! These are the on-disk shapes of an export manifest:
//!
//! ```json
//! { "documents": [ { "id": "alice", "path": "users/alice", "data": {},
//!                    "subcollections": { "orders": [ ... ] } } ] }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A single exported document, optionally carrying its subcollections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Document ID (last path segment).
    pub id: String,
    /// Fully-qualified slash path.
    pub path: String,
    /// Document fields.
    pub data: Map<String, Value>,
    /// Exported documents of each subcollection, keyed by subcollection name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcollections: Option<BTreeMap<String, Vec<DocumentRecord>>>,
}

impl DocumentRecord {
    /// Creates a record without subcollections.
    #[must_use]
    pub fn new(id: impl Into<String>, path: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            data,
            subcollections: None,
        }
    }

    /// Number of documents in this record's tree, itself included.
    #[must_use]
    pub fn tree_size(&self) -> usize {
        1 + self
            .subcollections
            .iter()
            .flat_map(BTreeMap::values)
            .flatten()
            .map(Self::tree_size)
            .sum::<usize>()
    }
}

/// The payload of an export file, and the input of an import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportManifest {
    /// Top-level documents, in export order.
    pub documents: Vec<DocumentRecord>,
}

impl ImportManifest {
    /// Creates a manifest from top-level documents.
    #[must_use]
    pub const fn new(documents: Vec<DocumentRecord>) -> Self {
        Self { documents }
    }

    /// Walks the tree depth-first, each parent before its subcollections.
    #[must_use]
    pub fn flatten(&self) -> Vec<&DocumentRecord> {
        let mut out = Vec::with_capacity(self.documents.len());
        for record in &self.documents {
            push_tree(record, &mut out);
        }
        out
    }
}

fn push_tree<'a>(record: &'a DocumentRecord, out: &mut Vec<&'a DocumentRecord>) {
    out.push(record);
    for children in record.subcollections.iter().flat_map(BTreeMap::values) {
        for child in children {
            push_tree(child, out);
        }
    }
}
