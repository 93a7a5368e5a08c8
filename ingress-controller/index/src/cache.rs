//! In-memory implementations of the stored-state and infra lookups.

use ahash::AHashMap;
use ingress_controller_core::{
    source::{HostStateStore, InfraLookup, StoredState},
    InfraOverride, ObjectRef,
};
use parking_lot::RwLock;

/// Holds the host state recorded for each routing object.
#[derive(Debug, Default)]
pub struct HostStateCache {
    states: RwLock<AHashMap<ObjectRef, StoredState>>,
}

/// Holds infra overrides by object and tenants by namespace.
#[derive(Debug, Default)]
pub struct InfraCache {
    overrides: RwLock<AHashMap<ObjectRef, InfraOverride>>,
    tenants: RwLock<AHashMap<String, String>>,
}

// === impl HostStateCache ===

impl HostStateCache {
    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }
}

impl HostStateStore for HostStateCache {
    fn get(&self, obj: &ObjectRef) -> Option<StoredState> {
        self.states.read().get(obj).cloned()
    }

    fn set(&self, obj: &ObjectRef, state: StoredState) {
        self.states.write().insert(obj.clone(), state);
    }

    fn remove(&self, obj: &ObjectRef) -> Option<StoredState> {
        self.states.write().remove(obj)
    }
}

// === impl InfraCache ===

impl InfraCache {
    pub fn set_override(&self, obj: ObjectRef, infra: InfraOverride) {
        self.overrides.write().insert(obj, infra);
    }

    pub fn clear_override(&self, obj: &ObjectRef) -> Option<InfraOverride> {
        self.overrides.write().remove(obj)
    }

    pub fn set_tenant(&self, namespace: impl ToString, tenant: impl ToString) {
        self.tenants
            .write()
            .insert(namespace.to_string(), tenant.to_string());
    }
}

impl InfraLookup for InfraCache {
    fn infra_override(&self, obj: &ObjectRef) -> Option<InfraOverride> {
        self.overrides.read().get(obj).cloned()
    }

    fn namespace_tenant(&self, namespace: &str) -> Option<String> {
        self.tenants.read().get(namespace).cloned()
    }
}
