//! Ingress Controller Reconciliation Index
//!
//! Converts parsed routing objects (ingresses and routes) and node pod-CIDR assignments into a
//! sharded graph of load-balancer objects, and keeps that graph consistent as inputs change.
//!
//! - Each hostname is placed on a shard (a virtual service) by the [`ShardResolver`]. Shared
//!   shards hash hostnames into a fixed number of buckets; dedicated shards carry exactly one
//!   hostname; passthrough hosts live on their own family of shards.
//! - Each shard's objects are held by a [`GraphModel`] in the [`ModelStore`]. Saving a model
//!   compares its checksum against the last saved one so that unchanged models are never
//!   republished.
//! - A routing object's hosts are diffed against the state stored for it by the previous
//!   reconciliation. Hosts that changed class or disappeared are reclaimed from the shard that
//!   still holds them.
//! - Node pod-CIDRs become static routes in the cluster's single [`Vrf`], whose route IDs are
//!   compacted as nodes come and go.
//!
//! ```text
//! [ RoutingInput ] -> [ ShardResolver ] -> [ GraphModel ] <- [ stale reclamation ]
//!                                               |
//! [ Node ] -> [ Vrf ] --------------------> [ ModelStore ] -> [ Publish ]
//! ```
//!
//! Reconciliations run synchronously on the calling worker. The store is locked only for
//! lookups and inserts; every sequence of mutations against one model holds that model's own
//! lock, so workers that resolve to the same shard serialize on the model rather than on the
//! worker that happened to receive the key.

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

mod cache;
mod cluster_info;
mod differ;
pub mod graph;
mod host_paths;
mod metrics;
mod publish;
mod reconcile;
mod shard;
mod store;


pub use self::{
    cache::{HostStateCache, InfraCache},
    cluster_info::ClusterInfo,
    graph::{vrf::Vrf, GraphModel, ModelNode},
    host_paths::HostPathCache,
    metrics::ReconcileMetrics,
    publish::{ChannelPublisher, ModelUpdate, PublishSet},
    reconcile::{Collaborators, Reconciler},
    shard::{bucket, Placement, ShardInputs, ShardResolver},
    store::{ModelStore, Saved, SharedModel},
};
