use crate::GraphModel;
use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use std::{collections::hash_map::Entry as MapEntry, sync::Arc};
use tracing::{debug, info};

/// A graph model guarded by its own mutation lock.
pub type SharedModel = Arc<Mutex<GraphModel>>;

/// Holds at most one graph model per shard, keyed by model name.
///
/// The store's own lock is only held to look up, insert, or remove an entry. Mutations happen
/// under each model's lock, and [`ModelStore::save`] must be called while that lock is held.
#[derive(Debug, Default)]
pub struct ModelStore {
    models: RwLock<AHashMap<String, Entry>>,
}

/// The outcome of saving a model.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Saved {
    /// The model's content matches what was last saved.
    Unchanged,

    /// The model's content changed since it was last saved.
    Changed,

    /// The model was empty and has been removed from the store.
    Deleted,
}

#[derive(Debug)]
struct Entry {
    model: SharedModel,
    checksum: Option<u64>,
}

// === impl ModelStore ===

impl ModelStore {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(&self, name: &str) -> Option<SharedModel> {
        self.models.read().get(name).map(|e| e.model.clone())
    }

    /// Returns the model stored under `name`, creating it with `init` if there is none.
    ///
    /// The returned flag is true when the model was created by this call.
    pub fn get_or_create(
        &self,
        name: &str,
        init: impl FnOnce() -> GraphModel,
    ) -> (SharedModel, bool) {
        if let Some(model) = self.get(name) {
            return (model, false);
        }
        match self.models.write().entry(name.to_string()) {
            MapEntry::Occupied(entry) => (entry.get().model.clone(), false),
            MapEntry::Vacant(entry) => {
                info!(model = %name, "Creating graph model");
                let model = Arc::new(Mutex::new(init()));
                entry.insert(Entry {
                    model: model.clone(),
                    checksum: None,
                });
                (model, true)
            }
        }
    }

    /// Records the content of `model`, which must be the locked contents of `shared`.
    ///
    /// Unchanged models are not recorded again. Empty models are removed from the store and
    /// always reported as deleted so that the removal propagates downstream.
    pub fn save(&self, shared: &SharedModel, model: &GraphModel) -> Saved {
        let name = model.name();
        if model.is_empty() {
            let mut models = self.models.write();
            if models
                .get(name)
                .is_some_and(|entry| Arc::ptr_eq(&entry.model, shared))
            {
                models.remove(name);
            }
            info!(model = %name, "Removing empty graph model");
            return Saved::Deleted;
        }

        // Hashed before taking the store lock; only the model's own lock covers it.
        let checksum = model.checksum();
        let mut models = self.models.write();
        match models.get_mut(name) {
            Some(entry) if Arc::ptr_eq(&entry.model, shared) => {
                if entry.checksum == Some(checksum) {
                    debug!(model = %name, checksum, "Graph model unchanged");
                    return Saved::Unchanged;
                }
                entry.checksum = Some(checksum);
            }
            Some(_) => {
                // Another instance was created after this one was removed; it stays
                // authoritative.
                debug!(model = %name, "Graph model was replaced concurrently");
            }
            None => {
                debug!(model = %name, "Restoring removed graph model");
                models.insert(
                    name.to_string(),
                    Entry {
                        model: shared.clone(),
                        checksum: Some(checksum),
                    },
                );
            }
        }
        debug!(model = %name, checksum, "Graph model changed");
        Saved::Changed
    }

    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.read().is_empty()
    }

    /// The names of all stored models, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names = self.models.read().keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }
}

// === impl Saved ===

impl Saved {
    /// True when the save must be propagated downstream.
    pub fn is_publishable(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}
