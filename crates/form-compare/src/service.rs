//! Caller-side comparison: resolves versions through a store and memoizes
//! results

use form_types::ComparisonResult;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::engine::Comparator;
use crate::error::CompareError;
use crate::store::SnapshotStore;

pub struct ComparisonService<S> {
    store: S,
    comparator: Comparator,
    cache: Mutex<HashMap<(Uuid, Uuid), Arc<ComparisonResult>>>,
}

impl<S: SnapshotStore> ComparisonService<S> {
    pub fn new(store: S, comparator: Comparator) -> Self {
        Self {
            store,
            comparator,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Compare two stored versions
    ///
    /// Snapshots never change once stored, so results are cached per
    /// ordered `(source, target)` pair.
    pub fn compare(
        &self,
        source_id: Uuid,
        target_id: Uuid,
    ) -> Result<Arc<ComparisonResult>, CompareError> {
        if source_id == target_id {
            return Err(CompareError::SameVersion(source_id));
        }
        let source = self
            .store
            .get(source_id)
            .ok_or(CompareError::VersionNotFound(source_id))?;
        let target = self
            .store
            .get(target_id)
            .ok_or(CompareError::VersionNotFound(target_id))?;

        let key = (source_id, target_id);
        if let Some(hit) = self.lock_cache().get(&key) {
            tracing::debug!(%source_id, %target_id, "Comparison cache hit");
            return Ok(Arc::clone(hit));
        }

        let result = Arc::new(self.comparator.compare(&source, &target));
        self.lock_cache().insert(key, Arc::clone(&result));
        Ok(result)
    }

    /// Compare the two most recent versions of a template
    ///
    /// Fails with `VersionNotFound` (nil id) when fewer than two exist.
    pub fn compare_latest(&self, template_id: &str) -> Result<Arc<ComparisonResult>, CompareError> {
        let versions = self.store.versions(template_id);
        match versions.as_slice() {
            [.., previous, latest] => self.compare(previous.version_id(), latest.version_id()),
            _ => Err(CompareError::VersionNotFound(Uuid::nil())),
        }
    }

    pub fn cached_results(&self) -> usize {
        self.lock_cache().len()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<(Uuid, Uuid), Arc<ComparisonResult>>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}
