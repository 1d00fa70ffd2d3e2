//! Versioned snapshot storage

use chrono::Utc;
use form_types::{Extraction, VersionSnapshot};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Persists extractions as immutable, numbered versions of a template
pub trait SnapshotStore: Send + Sync {
    /// Store `extraction` as the next version of `template_id`
    fn save(&self, template_id: &str, extraction: Extraction) -> Arc<VersionSnapshot>;

    fn get(&self, version_id: Uuid) -> Option<Arc<VersionSnapshot>>;

    /// All versions of a template, oldest first
    fn versions(&self, template_id: &str) -> Vec<Arc<VersionSnapshot>>;

    fn latest(&self, template_id: &str) -> Option<Arc<VersionSnapshot>> {
        self.versions(template_id).pop()
    }
}

impl<T: SnapshotStore + ?Sized> SnapshotStore for Arc<T> {
    fn save(&self, template_id: &str, extraction: Extraction) -> Arc<VersionSnapshot> {
        (**self).save(template_id, extraction)
    }

    fn get(&self, version_id: Uuid) -> Option<Arc<VersionSnapshot>> {
        (**self).get(version_id)
    }

    fn versions(&self, template_id: &str) -> Vec<Arc<VersionSnapshot>> {
        (**self).versions(template_id)
    }
}

#[derive(Default)]
struct Inner {
    by_id: HashMap<Uuid, Arc<VersionSnapshot>>,
    /// Version ids per template, ordered by version number
    by_template: HashMap<String, Vec<Uuid>>,
}

impl Inner {
    fn add(&mut self, snapshot: Arc<VersionSnapshot>) -> Option<Arc<VersionSnapshot>> {
        let id = snapshot.version_id();
        let template_id = snapshot.template_id().to_string();
        let previous = self.by_id.insert(id, snapshot);
        if previous.is_some() {
            return previous;
        }

        let by_id = &self.by_id;
        let ids = self.by_template.entry(template_id).or_default();
        ids.push(id);
        ids.sort_by_key(|id| by_id.get(id).map(|s| s.version_number()));
        None
    }
}

/// Process-local store
#[derive(Default)]
pub struct InMemorySnapshotStore {
    inner: RwLock<Inner>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an existing snapshot, e.g. one loaded from disk
    ///
    /// Returns the previously stored snapshot with the same id, if any; it
    /// is replaced.
    pub fn insert(&self, snapshot: VersionSnapshot) -> Option<Arc<VersionSnapshot>> {
        self.write().add(Arc::new(snapshot))
    }

    pub fn len(&self) -> usize {
        self.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Snapshots are immutable once stored, so a poisoned lock still guards
    // consistent data.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn save(&self, template_id: &str, extraction: Extraction) -> Arc<VersionSnapshot> {
        let mut inner = self.write();
        let version_number = inner
            .by_template
            .get(template_id)
            .and_then(|ids| ids.last())
            .and_then(|id| inner.by_id.get(id))
            .map_or(1, |latest| latest.version_number() + 1);

        let snapshot = Arc::new(VersionSnapshot::new(
            Uuid::new_v4(),
            template_id,
            version_number,
            extraction,
            Utc::now(),
        ));
        inner.add(Arc::clone(&snapshot));

        tracing::info!(
            template_id,
            version_id = %snapshot.version_id(),
            version_number,
            fields = snapshot.field_count(),
            "Stored snapshot"
        );
        snapshot
    }

    fn get(&self, version_id: Uuid) -> Option<Arc<VersionSnapshot>> {
        self.read().by_id.get(&version_id).cloned()
    }

    fn versions(&self, template_id: &str) -> Vec<Arc<VersionSnapshot>> {
        let inner = self.read();
        inner
            .by_template
            .get(template_id)
            .map(|ids| ids.iter().filter_map(|id| inner.by_id.get(id).cloned()).collect())
            .unwrap_or_default()
    }
}
