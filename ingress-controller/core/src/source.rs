//! Interfaces to the collaborators that surround the reconciliation core.
//!
//! The core never talks to the cluster or the load balancer directly. Parsed routing objects,
//! node addresses, and persisted host state are all obtained through these traits, and changed
//! models are handed off through [`Publish`].

use crate::{HostRecord, InfraOverride, ObjectKind, ObjectRef, RoutingInput};
use anyhow::Result;
use std::{
    collections::BTreeMap,
    net::{Ipv4Addr, Ipv6Addr},
};

/// The state recorded for a routing object at the end of its last successful reconciliation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoredState {
    pub hosts: BTreeMap<String, HostRecord>,

    /// The infra override in effect when the hosts were placed.
    pub infra: Option<InfraOverride>,

    /// The tenant the hosts were placed in.
    pub tenant: Option<String>,
}

/// The addresses a node exposes, by family.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeAddresses {
    pub v4: Option<Ipv4Addr>,
    pub v6: Option<Ipv6Addr>,
}

/// Parses and validates routing objects.
pub trait RoutingSource: Send + Sync {
    /// Returns `Ok(None)` when the object no longer exists or must not be processed. Errors are
    /// transient and the caller is expected to retry.
    fn routing_input(&self, kind: ObjectKind, obj: &ObjectRef) -> Result<Option<RoutingInput>>;
}

/// Persists per-object host state between reconciliations.
pub trait HostStateStore: Send + Sync {
    fn get(&self, obj: &ObjectRef) -> Option<StoredState>;

    fn set(&self, obj: &ObjectRef, state: StoredState);

    fn remove(&self, obj: &ObjectRef) -> Option<StoredState>;
}

/// Resolves infra overrides and tenants for routing objects.
pub trait InfraLookup: Send + Sync {
    fn infra_override(&self, obj: &ObjectRef) -> Option<InfraOverride>;

    fn namespace_tenant(&self, namespace: &str) -> Option<String>;
}

/// Looks up node networking details.
pub trait NodeSource: Send + Sync {
    /// Returns `Ok(None)` when the node no longer exists.
    fn pod_cidrs(&self, node: &str) -> Result<Option<Vec<String>>>;

    fn addresses(&self, node: &str) -> NodeAddresses;
}

/// Hands a changed model to the downstream translation layer.
pub trait Publish: Send + Sync {
    fn publish(&self, model_name: &str, key: &str);
}
