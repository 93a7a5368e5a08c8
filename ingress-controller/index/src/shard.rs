use crate::ClusterInfo;
use ingress_controller_core::{source::StoredState, InfraOverride, ShardIdentity, ShardSize};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Maps `key` onto one of `n` buckets, where `n` is a power of two.
///
/// This is the same hash-and-mask function the dispatcher uses to assign keys to workers, so a
/// hostname always lands on the same shard bucket and the same worker.
pub fn bucket(key: &str, n: u32) -> u32 {
    let hash = key.bytes().fold(FNV_OFFSET_BASIS, |hash, b| {
        (hash ^ u32::from(b)).wrapping_mul(FNV_PRIME)
    });
    hash & n.saturating_sub(1)
}

/// The sharding inputs of a routing object before and after the current reconciliation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub old: ShardInputs,
    pub new: ShardInputs,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShardInputs {
    pub tenant: String,
    pub infra: Option<InfraOverride>,
}

/// Resolves hostnames to the shards that carry them.
#[derive(Clone, Debug)]
pub struct ShardResolver<'c> {
    cluster: &'c ClusterInfo,
}

// === impl Placement ===

impl Placement {
    /// Builds the placement of an object from what was stored for it and what applies now.
    ///
    /// When the object no longer exists, the new side equals the old one so that its hosts are
    /// reclaimed from where they currently live.
    pub fn new(
        cluster: &ClusterInfo,
        stored: Option<&StoredState>,
        infra: Option<InfraOverride>,
        tenant: Option<String>,
        exists: bool,
    ) -> Self {
        let new = ShardInputs {
            tenant: tenant.unwrap_or_else(|| cluster.tenant.clone()),
            infra,
        };
        let old = match stored {
            Some(stored) => ShardInputs {
                tenant: stored
                    .tenant
                    .clone()
                    .unwrap_or_else(|| cluster.tenant.clone()),
                infra: stored.infra.clone(),
            },
            None => new.clone(),
        };
        if exists {
            Self { old, new }
        } else {
            Self {
                new: old.clone(),
                old,
            }
        }
    }

    /// Places an object whose sharding inputs have not changed.
    pub fn unchanged(side: ShardInputs) -> Self {
        Self {
            old: side.clone(),
            new: side,
        }
    }
}

// === impl ShardResolver ===

impl<'c> ShardResolver<'c> {
    pub fn new(cluster: &'c ClusterInfo) -> Self {
        Self { cluster }
    }

    /// Resolves the L7 shard of `host` as `(old, new)`.
    ///
    /// Callers must compare the two identities to detect that a host has to move.
    pub fn resolve(&self, host: &str, placement: &Placement) -> (ShardIdentity, ShardIdentity) {
        (
            self.l7_shard(host, &placement.old),
            self.l7_shard(host, &placement.new),
        )
    }

    /// Resolves the passthrough shard of `host` as `(old, new)`.
    ///
    /// Passthrough shards are always shared and never colocated with terminated traffic.
    pub fn resolve_passthrough(
        &self,
        host: &str,
        placement: &Placement,
    ) -> (ShardIdentity, ShardIdentity) {
        (
            self.passthrough_shard(host, &placement.old),
            self.passthrough_shard(host, &placement.new),
        )
    }

    fn l7_shard(&self, host: &str, side: &ShardInputs) -> ShardIdentity {
        let size = side
            .infra
            .as_ref()
            .and_then(|infra| infra.shard_size)
            .unwrap_or(self.cluster.shard_size);
        let prefix = side.infra.as_ref().and_then(InfraOverride::name_prefix);
        if size == ShardSize::Dedicated {
            return ShardIdentity {
                tenant: side.tenant.clone(),
                name: self.cluster.dedicated_vs_name(host, prefix),
                dedicated: true,
            };
        }
        ShardIdentity {
            tenant: side.tenant.clone(),
            name: self
                .cluster
                .shared_vs_name(bucket(host, size.buckets()), prefix),
            dedicated: false,
        }
    }

    fn passthrough_shard(&self, host: &str, side: &ShardInputs) -> ShardIdentity {
        let prefix = side.infra.as_ref().and_then(InfraOverride::name_prefix);
        let buckets = self.cluster.passthrough_shard_size.buckets().max(1);
        ShardIdentity {
            tenant: side.tenant.clone(),
            name: self
                .cluster
                .passthrough_vs_name(bucket(host, buckets), prefix),
            dedicated: false,
        }
    }
}
