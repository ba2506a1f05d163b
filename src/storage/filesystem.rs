//! Filesystem-backed document store.
//!
//! Layout mirrors the path hierarchy:
//!
//! ```text
//! <root>/users/alice.json              document users/alice
//! <root>/users/alice/orders/o1.json    document users/alice/orders/o1
//! ```
//!
//! # Commit semantics
//!
//! Commits are serialised through a mutex. Every `set` is rendered to a
//! hidden temporary file first; only when all of them are on disk are they
//! renamed into place and deletes applied. Files being replaced or deleted
//! are moved to hidden backups until the whole batch has been applied, and
//! restored if any step fails, so a failed commit leaves the store unchanged.
//!
//! Directories hold no state of their own: once a delete leaves one empty,
//! it is removed, and a collection is listed only while it has documents.
//!
//! # Security
//!
//! Paths are validated segment by segment: empty, `.`-prefixed and
//! backslash-containing segments are rejected so a document path can never
//! escape the root. Files larger than [`MAX_FILE_SIZE`] are refused.

use super::batch::WriteOperation;
use super::error::StoreError;
use super::traits::{DocumentRef, DocumentSnapshot, DocumentStore, check_collection_path};
use super::transforms::{commit_timestamp, render_set};
use crate::models::path::SEPARATOR;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Maximum size of a stored document file (16 MiB).
pub const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

const DOCUMENT_EXTENSION: &str = "json";

/// Document store rooted at a directory.
#[derive(Debug)]
pub struct FilesystemStore {
    root: PathBuf,
    commit_lock: Mutex<()>,
}

impl FilesystemStore {
    /// Creates a store rooted at `root` (created lazily on first write).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            commit_lock: Mutex::new(()),
        }
    }

    /// Creates a store and its root directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_create(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::new(root);
        std::fs::create_dir_all(&store.root)
            .map_err(|e| StoreError::io("create_store_root", &store.root, e))?;
        Ok(store)
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn segments_to_path(&self, path: &str) -> PathBuf {
        let mut out = self.root.clone();
        out.extend(path.split(SEPARATOR));
        out
    }

    fn collection_dir(&self, collection_path: &str) -> Result<PathBuf, StoreError> {
        check_collection_path(collection_path)?;
        Ok(self.segments_to_path(collection_path))
    }

    fn document_file(&self, doc: &DocumentRef) -> PathBuf {
        let mut file = self.segments_to_path(doc.collection_path());
        file.push(format!("{}.{DOCUMENT_EXTENSION}", doc.id()));
        file
    }

    fn subcollection_dir(&self, doc: &DocumentRef) -> PathBuf {
        self.segments_to_path(doc.path())
    }

    async fn read_document(&self, doc: &DocumentRef) -> Result<Option<Map<String, Value>>, StoreError> {
        let file = self.document_file(doc);
        let metadata = match tokio::fs::metadata(&file).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io("stat_document", &file, e)),
        };
        if metadata.len() > MAX_FILE_SIZE {
            return Err(StoreError::Serialization {
                path: doc.path().to_string(),
                cause: format!(
                    "file size {} exceeds maximum {MAX_FILE_SIZE}",
                    metadata.len()
                ),
            });
        }
        let bytes = tokio::fs::read(&file)
            .await
            .map_err(|e| StoreError::io("read_document", &file, e))?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Serialization {
                path: doc.path().to_string(),
                cause: e.to_string(),
            })
    }

    /// Sorted visible entries of a directory; a missing directory is empty.
    async fn list_dir(&self, dir: &Path, want_dirs: bool) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io("read_dir", dir, e)),
        };
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io("read_dir", dir, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StoreError::io("file_type", &entry.path(), e))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if want_dirs && file_type.is_dir() {
                names.push(name);
            } else if !want_dirs
                && file_type.is_file()
                && let Some(id) = name.strip_suffix(&format!(".{DOCUMENT_EXTENSION}"))
            {
                names.push(id.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn document_ids(&self, collection_path: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.collection_dir(collection_path)?;
        self.list_dir(&dir, false).await
    }

    fn child_ref(collection_path: &str, id: &str) -> Result<DocumentRef, StoreError> {
        DocumentRef::parse(&format!("{collection_path}{SEPARATOR}{id}"))
    }

    async fn write_temp(&self, target: &Path, data: &Map<String, Value>) -> Result<PathBuf, StoreError> {
        let parent = target.parent().unwrap_or(&self.root);
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io("create_collection_dir", parent, e))?;
        let temp = hidden_sibling(target, "tmp");
        let bytes = serde_json::to_vec_pretty(data).map_err(|e| StoreError::Serialization {
            path: target.display().to_string(),
            cause: e.to_string(),
        })?;
        tokio::fs::write(&temp, bytes)
            .await
            .map_err(|e| StoreError::io("write_temp_document", &temp, e))?;
        Ok(temp)
    }

    async fn discard(temps: &[(PathBuf, PathBuf)]) {
        for (temp, _) in temps {
            match tokio::fs::remove_file(temp).await {
                Ok(()) => {},
                Err(e) if e.kind() == ErrorKind::NotFound => {},
                Err(e) => {
                    tracing::warn!(path = %temp.display(), error = %e, "Failed to remove temporary file");
                },
            }
        }
    }

    /// Moves `staged` temp files onto their targets and removes `deletes`.
    ///
    /// Either every step succeeds or the previous files are put back.
    async fn apply(staged: &[(PathBuf, PathBuf)], deletes: &[PathBuf]) -> Result<(), StoreError> {
        let mut journal = Vec::with_capacity(staged.len() + deletes.len());
        if let Err(e) = Self::apply_journaled(staged, deletes, &mut journal).await {
            Self::roll_back(&journal).await;
            Self::discard(staged).await;
            return Err(e);
        }
        for (_, backup) in &journal {
            if let Some(backup) = backup
                && let Err(e) = tokio::fs::remove_file(backup).await
            {
                tracing::warn!(path = %backup.display(), error = %e, "Failed to remove backup file");
            }
        }
        Ok(())
    }

    /// Records `(target, backup)` for each file touched, before touching it.
    async fn apply_journaled(
        staged: &[(PathBuf, PathBuf)],
        deletes: &[PathBuf],
        journal: &mut Vec<(PathBuf, Option<PathBuf>)>,
    ) -> Result<(), StoreError> {
        for (temp, target) in staged {
            let backup = back_up(target).await?;
            journal.push((target.clone(), backup));
            tokio::fs::rename(temp, target)
                .await
                .map_err(|e| StoreError::io("rename_document", target, e))?;
        }
        for target in deletes {
            let backup = back_up(target).await?;
            journal.push((target.clone(), backup));
        }
        Ok(())
    }

    async fn roll_back(journal: &[(PathBuf, Option<PathBuf>)]) {
        for (target, backup) in journal.iter().rev() {
            match tokio::fs::remove_file(target).await {
                Ok(()) => {},
                Err(e) if e.kind() == ErrorKind::NotFound => {},
                Err(e) => {
                    tracing::error!(path = %target.display(), error = %e, "Failed to undo document write");
                },
            }
            if let Some(backup) = backup
                && let Err(e) = tokio::fs::rename(backup, target).await
            {
                tracing::error!(
                    path = %target.display(),
                    backup = %backup.display(),
                    error = %e,
                    "Failed to restore document from backup"
                );
            }
        }
    }

    /// Removes empty directories from `dir` upwards, stopping below the root.
    async fn prune_empty_dirs(&self, mut dir: Option<&Path>) {
        while let Some(current) = dir {
            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            // Fails on a non-empty directory, which ends the walk.
            if tokio::fs::remove_dir(current).await.is_err() {
                break;
            }
            dir = current.parent();
        }
    }
}

/// Hidden per-process sibling of `target`, e.g. `.alice.json.tmp-42`.
fn hidden_sibling(target: &Path, tag: &str) -> PathBuf {
    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");
    target.with_file_name(format!(".{file_name}.{tag}-{}", std::process::id()))
}

/// Moves an existing file to a backup; `None` if there was nothing to move.
async fn back_up(target: &Path) -> Result<Option<PathBuf>, StoreError> {
    let backup = hidden_sibling(target, "bak");
    match tokio::fs::rename(target, &backup).await {
        Ok(()) => Ok(Some(backup)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io("backup_document", target, e)),
    }
}

#[async_trait]
impl DocumentStore for FilesystemStore {
    async fn get_all_documents(
        &self,
        collection_path: &str,
    ) -> Result<Vec<DocumentSnapshot>, StoreError> {
        let mut snapshots = Vec::new();
        for id in self.document_ids(collection_path).await? {
            let doc = Self::child_ref(collection_path, &id)?;
            if let Some(data) = self.read_document(&doc).await? {
                snapshots.push(DocumentSnapshot {
                    id,
                    path: doc.path().to_string(),
                    data,
                });
            }
        }
        Ok(snapshots)
    }

    async fn list_subcollection_names(
        &self,
        document_path: &str,
    ) -> Result<Vec<String>, StoreError> {
        let doc = DocumentRef::parse(document_path)?;
        self.list_dir(&self.subcollection_dir(&doc), true).await
    }

    async fn get_documents_page(
        &self,
        collection_path: &str,
        limit: usize,
    ) -> Result<Vec<DocumentRef>, StoreError> {
        self.document_ids(collection_path)
            .await?
            .iter()
            .take(limit)
            .map(|id| Self::child_ref(collection_path, id))
            .collect()
    }

    async fn get_document(&self, path: &str) -> Result<Option<DocumentSnapshot>, StoreError> {
        let doc = DocumentRef::parse(path)?;
        Ok(self.read_document(&doc).await?.map(|data| DocumentSnapshot {
            id: doc.id().to_string(),
            path: doc.path().to_string(),
            data,
        }))
    }

    async fn list_collections(&self, parent: Option<&str>) -> Result<Vec<String>, StoreError> {
        match parent {
            Some(document_path) => self.list_subcollection_names(document_path).await,
            None => self.list_dir(&self.root, true).await,
        }
    }

    async fn commit_writes(&self, writes: Vec<WriteOperation>) -> Result<(), StoreError> {
        let _guard = self.commit_lock.lock().await;
        let now = commit_timestamp();

        let mut overlay: BTreeMap<DocumentRef, Option<Map<String, Value>>> = BTreeMap::new();
        for write in &writes {
            let doc = write.doc();
            match write {
                WriteOperation::Set { data, .. } => {
                    let previous = match overlay.get(doc) {
                        Some(staged) => staged.clone(),
                        None => self.read_document(doc).await?,
                    };
                    let rendered = render_set(doc.path(), previous.as_ref(), data, &now)?;
                    overlay.insert(doc.clone(), Some(rendered));
                },
                WriteOperation::Delete { .. } => {
                    overlay.insert(doc.clone(), None);
                },
            }
        }

        let mut staged_files = Vec::new();
        let mut deletes = Vec::new();
        for (doc, data) in &overlay {
            let target = self.document_file(doc);
            match data {
                Some(data) => match self.write_temp(&target, data).await {
                    Ok(temp) => staged_files.push((temp, target)),
                    Err(e) => {
                        Self::discard(&staged_files).await;
                        return Err(e);
                    },
                },
                None => deletes.push(target),
            }
        }

        Self::apply(&staged_files, &deletes).await?;
        for target in &deletes {
            self.prune_empty_dirs(target.parent()).await;
        }
        tracing::trace!(
            sets = staged_files.len(),
            deletes = deletes.len(),
            "Applied filesystem commit"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::value::map_from_json;
    use serde_json::json;
    use tempfile::TempDir;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    async fn put(store: &FilesystemStore, path: &str, data: Value) {
        let doc = DocumentRef::parse(path).unwrap();
        let store_ref: &dyn DocumentStore = store;
        let mut batch = store_ref.batch();
        batch.set(&doc, map_from_json(object(data)));
        batch.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemStore::new(dir.path());
        put(&store, "users/alice", json!({"name": "Alice"})).await;

        let snapshot = store.get_document("users/alice").await.unwrap().unwrap();
        assert_eq!(snapshot.id, "alice");
        assert_eq!(snapshot.data["name"], "Alice");
        assert!(dir.path().join("users").join("alice.json").exists());
    }

    #[tokio::test]
    async fn test_get_missing_document() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemStore::new(dir.path());
        assert!(store.get_document("users/nobody").await.unwrap().is_none());
        assert!(store.get_all_documents("users").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_and_pages() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemStore::new(dir.path());
        put(&store, "users/alice", json!({})).await;
        put(&store, "users/bob", json!({})).await;
        put(&store, "users/alice/orders/o1", json!({"n": 1})).await;

        let docs = store.get_all_documents("users").await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(
            store.list_subcollection_names("users/alice").await.unwrap(),
            vec!["orders"]
        );
        assert_eq!(store.list_collections(None).await.unwrap(), vec!["users"]);

        let page = store.get_documents_page("users", 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].path(), "users/alice");
    }

    #[tokio::test]
    async fn test_delete_removes_file_only() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemStore::new(dir.path());
        put(&store, "users/alice", json!({})).await;
        put(&store, "users/alice/orders/o1", json!({})).await;

        let doc = DocumentRef::parse("users/alice").unwrap();
        let store_ref: &dyn DocumentStore = &store;
        let mut batch = store_ref.batch();
        batch.delete(&doc);
        batch.commit().await.unwrap();

        assert!(store.get_document("users/alice").await.unwrap().is_none());
        assert!(
            store
                .get_document("users/alice/orders/o1")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemStore::new(dir.path());
        assert!(store.get_document("../etc").await.is_err());
        assert!(store.get_all_documents("..").await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_file_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("users")).unwrap();
        std::fs::write(dir.path().join("users").join("bad.json"), b"not json").unwrap();
        let store = FilesystemStore::new(dir.path());
        assert!(matches!(
            store.get_document("users/bad").await,
            Err(StoreError::Serialization { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_apply_restores_previous_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::write(root.join("a.json"), b"old a").unwrap();
        std::fs::write(root.join("c.json"), b"old c").unwrap();
        std::fs::write(root.join(".a.json.tmp-1"), b"new a").unwrap();
        let staged = vec![
            (root.join(".a.json.tmp-1"), root.join("a.json")),
            (root.join(".b.json.tmp-1"), root.join("b.json")),
        ];
        let deletes = vec![root.join("c.json")];

        let err = FilesystemStore::apply(&staged, &deletes).await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }), "unexpected error: {err}");

        assert_eq!(std::fs::read(root.join("a.json")).unwrap(), b"old a");
        assert_eq!(std::fs::read(root.join("c.json")).unwrap(), b"old c");
        assert!(!root.join("b.json").exists());
        let mut names: Vec<String> = std::fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.json", "c.json"]);
    }

    #[tokio::test]
    async fn test_emptied_directories_removed() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemStore::new(dir.path());
        put(&store, "users/alice", json!({})).await;
        put(&store, "users/alice/orders/o1", json!({})).await;
        put(&store, "users/alice/orders/o1/items/i1", json!({})).await;

        let store_ref: &dyn DocumentStore = &store;
        let mut batch = store_ref.batch();
        batch.delete(&DocumentRef::parse("users/alice/orders/o1/items/i1").unwrap());
        batch.delete(&DocumentRef::parse("users/alice/orders/o1").unwrap());
        batch.commit().await.unwrap();

        assert!(
            store
                .list_subcollection_names("users/alice")
                .await
                .unwrap()
                .is_empty()
        );
        assert!(!dir.path().join("users").join("alice").exists());
        assert!(dir.path().join("users").join("alice.json").exists());
        assert_eq!(store.list_collections(None).await.unwrap(), vec!["users"]);
    }
}
