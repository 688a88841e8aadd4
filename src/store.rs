//! The hierarchical in-memory document store.
//!
//! `projects: P -> (D -> (collectionPath -> (docId -> Document)))`,
//! flattened here into a single map keyed by `(projectId, databaseId,
//! collectionPath)` since the three-level nesting and a flat key over the
//! same tuple are equivalent for every operation this store exposes. Each
//! collection is guarded by its own `parking_lot::Mutex`; there is no
//! store-wide lock.

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};

use crate::document::Document;

type CollectionKey = (String, String, String);

/// A single collection's documents, insertion-ordered by `docId`.
#[derive(Default)]
struct Collection {
    docs: Vec<(String, Document)>,
}

impl Collection {
    fn get(&self, doc_id: &str) -> Option<Document> {
        self.docs
            .iter()
            .find(|(id, _)| id == doc_id)
            .map(|(_, doc)| doc.clone())
    }

    fn set(&mut self, doc_id: &str, doc: Document) {
        if let Some(entry) = self.docs.iter_mut().find(|(id, _)| id == doc_id) {
            entry.1 = doc;
        } else {
            self.docs.push((doc_id.to_string(), doc));
        }
    }

    fn delete(&mut self, doc_id: &str) -> bool {
        let before = self.docs.len();
        self.docs.retain(|(id, _)| id != doc_id);
        self.docs.len() != before
    }
}

/// The emulator's document store. Cheap to clone (an `Arc` internally via
/// the caller holding `Arc<Store>`), safe to share across concurrently
/// running RPC handlers.
#[derive(Default)]
pub struct Store {
    collections: RwLock<HashMap<CollectionKey, Mutex<Collection>>>,
}

impl Store {
    /// Build an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a single document, or `None` if it (or its collection)
    /// does not exist.
    pub fn get(
        &self,
        project_id: &str,
        database_id: &str,
        collection_path: &str,
        doc_id: &str,
    ) -> Option<Document> {
        let key = (
            project_id.to_string(),
            database_id.to_string(),
            collection_path.to_string(),
        );
        let collections = self.collections.read();
        collections.get(&key)?.lock().get(doc_id)
    }

    /// Insert or replace a document.
    pub fn set(
        &self,
        project_id: &str,
        database_id: &str,
        collection_path: &str,
        doc_id: &str,
        doc: Document,
    ) {
        let key = (
            project_id.to_string(),
            database_id.to_string(),
            collection_path.to_string(),
        );
        {
            let collections = self.collections.read();
            if let Some(collection) = collections.get(&key) {
                collection.lock().set(doc_id, doc);
                return;
            }
        }
        let mut collections = self.collections.write();
        collections
            .entry(key)
            .or_default()
            .lock()
            .set(doc_id, doc);
    }

    /// Remove a document. Returns `true` if it was present. Drops the
    /// collection entirely once it becomes empty, so it stops appearing
    /// in [`Store::list_collection_ids`].
    pub fn delete(
        &self,
        project_id: &str,
        database_id: &str,
        collection_path: &str,
        doc_id: &str,
    ) -> bool {
        let key = (
            project_id.to_string(),
            database_id.to_string(),
            collection_path.to_string(),
        );
        let now_empty;
        let removed;
        {
            let collections = self.collections.read();
            let Some(collection) = collections.get(&key) else {
                return false;
            };
            let mut guard = collection.lock();
            removed = guard.delete(doc_id);
            now_empty = guard.docs.is_empty();
        }
        if removed && now_empty {
            let mut collections = self.collections.write();
            if let Some(collection) = collections.get(&key) {
                if collection.lock().docs.is_empty() {
                    collections.remove(&key);
                }
            }
        }
        removed
    }

    /// List all documents in a collection path, in insertion order, as
    /// deep copies.
    pub fn list(
        &self,
        project_id: &str,
        database_id: &str,
        collection_path: &str,
    ) -> Vec<Document> {
        let key = (
            project_id.to_string(),
            database_id.to_string(),
            collection_path.to_string(),
        );
        let collections = self.collections.read();
        match collections.get(&key) {
            Some(collection) => collection.lock().docs.iter().map(|(_, d)| d.clone()).collect(),
            None => Vec::new(),
        }
    }

    /// List the distinct immediate child collection names under
    /// `parent_path` (the empty string denotes the database root),
    /// lexicographically sorted.
    pub fn list_collection_ids(
        &self,
        project_id: &str,
        database_id: &str,
        parent_path: &str,
    ) -> Vec<String> {
        let collections = self.collections.read();
        let mut names: Vec<String> = collections
            .keys()
            .filter(|(p, d, _)| p == project_id && d == database_id)
            .filter_map(|(_, _, collection_path)| immediate_child(collection_path, parent_path))
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

fn immediate_child(collection_path: &str, parent_path: &str) -> Option<String> {
    let rest = if parent_path.is_empty() {
        collection_path
    } else {
        collection_path
            .strip_prefix(parent_path)?
            .strip_prefix('/')?
    };
    rest.split('/').next().map(|s| s.to_string())
}
