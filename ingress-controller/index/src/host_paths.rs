use ahash::AHashMap;
use ingress_controller_core::{HostRecord, ObjectRef};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

/// Indexes the routing objects that claim each hostname and path.
///
/// This is bookkeeping only: it is derived from stored host state and never consulted when
/// building graph models.
#[derive(Debug, Default)]
pub struct HostPathCache {
    index: RwLock<AHashMap<String, BTreeMap<String, BTreeSet<String>>>>,
}

// === impl HostPathCache ===

impl HostPathCache {
    pub fn save(&self, host: &str, path: &str, owner: &str) {
        self.index
            .write()
            .entry(host.to_string())
            .or_default()
            .entry(path.to_string())
            .or_default()
            .insert(owner.to_string());
    }

    pub fn remove(&self, host: &str, path: &str, owner: &str) {
        let mut index = self.index.write();
        let Some(paths) = index.get_mut(host) else {
            return;
        };
        if let Some(owners) = paths.get_mut(path) {
            owners.remove(owner);
            if owners.is_empty() {
                paths.remove(path);
            }
        }
        if paths.is_empty() {
            index.remove(host);
        }
    }

    /// The `namespace/name` of every object that claims `host` + `path`.
    pub fn owners(&self, host: &str, path: &str) -> Vec<String> {
        self.index
            .read()
            .get(host)
            .and_then(|paths| paths.get(path))
            .map(|owners| owners.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn paths(&self, host: &str) -> Vec<String> {
        self.index
            .read()
            .get(host)
            .map(|paths| paths.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Moves `obj`'s claims from its `old` hosts to its `new` hosts.
    pub fn update(
        &self,
        obj: &ObjectRef,
        old: &BTreeMap<String, HostRecord>,
        new: Option<&BTreeMap<String, HostRecord>>,
    ) {
        let owner = obj.to_string();
        for (host, record) in old {
            for path in record.paths() {
                self.remove(host, path, &owner);
            }
        }
        for (host, record) in new.into_iter().flatten() {
            for path in record.paths() {
                self.save(host, path, &owner);
            }
        }
    }
}
