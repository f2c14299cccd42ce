use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use vellum_sfc::{Block, SfcDescriptor};

use crate::error::PluginResult;
use crate::id::VirtualModuleId;

/// Everything known about one component file after it was split.
#[derive(Debug)]
pub struct RootEntry {
    pub path: PathBuf,
    pub source: String,
    pub descriptor: SfcDescriptor,
    pub ids: Vec<VirtualModuleId>,
}

impl RootEntry {
    /// The block an id points at, if this file exposes exactly that id
    /// (path, kind, index and query all equal).
    pub fn block(&self, id: &VirtualModuleId) -> Option<&Block> {
        self.ids
            .iter()
            .zip(&self.descriptor.blocks)
            .find(|(known, _)| *known == id)
            .map(|(_, block)| block)
    }
}

type Slot = Arc<Mutex<Option<Arc<RootEntry>>>>;

/// Root path to its split block list. Each path has its own slot lock, so
/// files never contend with each other and a path is split at most once
/// until it is invalidated.
#[derive(Debug, Default)]
pub struct RootCache {
    slots: Mutex<HashMap<PathBuf, Slot>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RootCache {
    pub fn get(&self, path: &Path) -> Option<Arc<RootEntry>> {
        let slot = lock(&self.slots).get(path).cloned()?;
        let entry = lock(&slot).clone();
        entry
    }

    /// Return the cached entry or build it while holding the path's slot.
    /// A failed build leaves the slot empty. The flag is `true` when this
    /// call did the build.
    pub fn get_or_try_insert<F>(&self, path: &Path, build: F) -> PluginResult<(Arc<RootEntry>, bool)>
    where
        F: FnOnce() -> PluginResult<RootEntry>,
    {
        let slot = lock(&self.slots).entry(path.to_path_buf()).or_default().clone();
        let mut guard = lock(&slot);
        if let Some(entry) = guard.as_ref() {
            return Ok((Arc::clone(entry), false));
        }
        let entry = Arc::new(build()?);
        *guard = Some(Arc::clone(&entry));
        Ok((entry, true))
    }

    pub fn remove(&self, path: &Path) -> bool {
        lock(&self.slots).remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        lock(&self.slots)
            .values()
            .filter(|slot| lock(slot).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
