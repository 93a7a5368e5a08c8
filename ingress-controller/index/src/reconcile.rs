//! Drives the reconciliation of routing objects and nodes.
//!
//! A routing object is reconciled in four steps:
//!
//! 1. Hosts whose shard changed since the last reconciliation are removed from the shard that
//!    still holds them.
//! 2. Every host in the object's current routing input is classified against the stored state
//!    and built into the graph model of its shard.
//! 3. Whatever the stored state still marks as active was not carried forward and is
//!    reclaimed.
//! 4. The new host state is stored and every model that changed is published once.

mod reclaim;

use crate::{
    differ::HostStates,
    graph::{ObjectScope, VirtualService, VsKind},
    ClusterInfo, GraphModel, HostPathCache, ModelNode, ModelStore, Placement, PublishSet,
    ReconcileMetrics, ShardInputs, ShardResolver,
};
use anyhow::{Context, Result};
use ingress_controller_core::{
    source::{HostStateStore, InfraLookup, NodeSource, Publish, RoutingSource, StoredState},
    InfraOverride, ObjectKind, ObjectRef, RoutingInput, ShardIdentity,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The services a reconciler consults.
#[derive(Clone)]
pub struct Collaborators {
    pub routing: Arc<dyn RoutingSource>,
    pub states: Arc<dyn HostStateStore>,
    pub infra: Arc<dyn InfraLookup>,
    pub nodes: Arc<dyn NodeSource>,
    pub publisher: Arc<dyn Publish>,
}

pub struct Reconciler {
    cluster: ClusterInfo,
    models: Arc<ModelStore>,
    host_paths: Arc<HostPathCache>,
    sources: Collaborators,
    metrics: ReconcileMetrics,
    check_svc: bool,
}

/// One routing object being reconciled.
struct ObjectPass<'a> {
    kind: ObjectKind,
    obj: &'a ObjectRef,
    placement: Placement,
}

// === impl Reconciler ===

impl Reconciler {
    pub fn new(cluster: ClusterInfo, sources: Collaborators, metrics: ReconcileMetrics) -> Self {
        Self {
            cluster,
            models: ModelStore::shared(),
            host_paths: Arc::new(HostPathCache::default()),
            sources,
            metrics,
            check_svc: false,
        }
    }

    /// Makes ingress diffs compare the services behind each path, as route diffs always do.
    pub fn with_service_checks(mut self, check_svc: bool) -> Self {
        self.check_svc = check_svc;
        self
    }

    pub fn cluster(&self) -> &ClusterInfo {
        &self.cluster
    }

    pub fn models(&self) -> &Arc<ModelStore> {
        &self.models
    }

    pub fn host_paths(&self) -> &Arc<HostPathCache> {
        &self.host_paths
    }

    /// Reconciles a routing object, returning the names of the models it changed.
    ///
    /// In full-sync mode the changed models are returned without being published.
    pub fn reconcile_object(
        &self,
        kind: ObjectKind,
        obj: &ObjectRef,
        full_sync: bool,
    ) -> Result<Vec<String>> {
        let key = format!("{kind}/{obj}");
        let label = kind_label(kind);
        self.metrics.reconcile_started(label);
        let res = self.sync_object(kind, obj, &key, full_sync);
        if res.is_err() {
            self.metrics.reconcile_failed(label);
        }
        self.metrics.set_store_size(self.models.len());
        res
    }

    /// Reconciles a node's static routes, returning the names of the models it changed.
    pub fn reconcile_node(&self, node: &str, full_sync: bool) -> Result<Vec<String>> {
        let key = format!("Node/{node}");
        self.metrics.reconcile_started("Node");
        let res = self.sync_node(node, &key, full_sync);
        if res.is_err() {
            self.metrics.reconcile_failed("Node");
        }
        self.metrics.set_store_size(self.models.len());
        res
    }

    #[instrument(skip_all, fields(%key))]
    fn sync_object(
        &self,
        kind: ObjectKind,
        obj: &ObjectRef,
        key: &str,
        full_sync: bool,
    ) -> Result<Vec<String>> {
        let input = self
            .sources
            .routing
            .routing_input(kind, obj)
            .with_context(|| format!("failed to parse {key}"))?;
        let stored = self.sources.states.get(obj);

        let mut published = PublishSet::default();
        match input {
            Some(input) => self.apply_object(kind, obj, input, stored, &mut published),
            None => self.remove_object(kind, obj, stored, &mut published),
        }
        Ok(self.finish(published, key, full_sync))
    }

    fn apply_object(
        &self,
        kind: ObjectKind,
        obj: &ObjectRef,
        input: RoutingInput,
        stored: Option<StoredState>,
        published: &mut PublishSet,
    ) {
        let placement = Placement::new(
            &self.cluster,
            stored.as_ref(),
            self.sources.infra.infra_override(obj),
            self.sources.infra.namespace_tenant(&obj.namespace),
            true,
        );
        let pass = ObjectPass {
            kind,
            obj,
            placement,
        };
        let old_hosts = stored.map(|s| s.hosts).unwrap_or_default();
        self.migrate_moved_hosts(&pass, &old_hosts, published);

        let resolver = ShardResolver::new(&self.cluster);
        let infra = pass.placement.new.infra.as_ref();
        let scope = pass.scope(&self.cluster, &pass.placement.new);
        let mut states = HostStates::new(old_hosts.clone(), self.check_svc);

        for (host, paths) in &input.insecure {
            let (_, shard) = resolver.resolve(host, &pass.placement);
            if shard.dedicated && input.is_secure(host) {
                debug!(%host, %shard, "TLS takes precedence on a dedicated shard");
                continue;
            }
            debug!(%host, %shard, "Insecure host");
            states.classify_insecure(kind, host, paths, shard.dedicated);
            self.with_shard(&shard, l7_kind(&shard), infra, published, |vs| {
                vs.add_insecure_host(scope, host, paths)
            });
        }

        for tls in &input.tls {
            for (host, paths) in &tls.hosts {
                let (_, shard) = resolver.resolve(host, &pass.placement);
                debug!(%host, %shard, redirect = tls.redirect, "Secure host");
                states.classify_secure(kind, host, paths, tls.redirect, shard.dedicated);
                self.with_shard(&shard, l7_kind(&shard), infra, published, |vs| {
                    vs.add_secure_host(scope, host, paths, &tls.secret_name, tls.redirect)
                });
            }
        }

        for (host, binding) in &input.passthrough {
            let (_, shard) = resolver.resolve_passthrough(host, &pass.placement);
            debug!(%host, %shard, "Passthrough host");
            states.classify_passthrough(host, &binding.path_svc, binding.redirect);
            self.with_shard(&shard, VsKind::Passthrough, infra, published, |vs| {
                vs.add_passthrough_host(scope, host, &binding.path_svc, binding.redirect)
            });
        }

        self.reclaim_stale(&pass, &states, published);

        self.host_paths.update(obj, &old_hosts, Some(&states.new));
        let ShardInputs { tenant, infra } = pass.placement.new;
        self.sources.states.set(
            obj,
            StoredState {
                hosts: states.new,
                infra,
                tenant: Some(tenant),
            },
        );
    }

    fn remove_object(
        &self,
        kind: ObjectKind,
        obj: &ObjectRef,
        stored: Option<StoredState>,
        published: &mut PublishSet,
    ) {
        let Some(stored) = stored else {
            debug!("Object has no stored state");
            return;
        };
        info!(hosts = stored.hosts.len(), "Removing deleted object");
        let pass = ObjectPass {
            kind,
            obj,
            placement: Placement::new(&self.cluster, Some(&stored), None, None, false),
        };
        self.remove_all_hosts(&pass, &stored.hosts, published);
        self.sources.states.remove(obj);
        self.host_paths.update(obj, &stored.hosts, None);
    }

    #[instrument(skip(self, key, full_sync))]
    fn sync_node(&self, node: &str, key: &str, full_sync: bool) -> Result<Vec<String>> {
        let cidrs = self
            .sources
            .nodes
            .pod_cidrs(node)
            .with_context(|| format!("failed to look up pod CIDRs for node {node}"))?;

        let name = self.cluster.vrf_model_name();
        let (shared, _) = self.models.get_or_create(&name, || {
            let mut model = GraphModel::new(&name);
            model.vrf_mut(&self.cluster.vrf_name);
            model
        });

        let mut published = PublishSet::default();
        {
            let mut model = shared.lock();
            let cluster = &self.cluster.cluster_name;
            let vrf = model.vrf_mut(&self.cluster.vrf_name);
            match cidrs {
                Some(cidrs) => {
                    let addrs = self.sources.nodes.addresses(node);
                    vrf.apply_node(cluster, node, &cidrs, &addrs)
                        .with_context(|| format!("failed to build static routes for {node}"))?;
                }
                None => {
                    if !vrf.delete_node(cluster, node) {
                        warn!("Deleted node had no static routes");
                    }
                }
            }
            self.metrics.set_static_routes(vrf.static_routes().len());
            if self.models.save(&shared, &model).is_publishable() {
                published.insert(name);
            }
        }
        Ok(self.finish(published, key, full_sync))
    }

    /// Runs `build` against the virtual service of `shard`, creating the shard if needed.
    fn with_shard(
        &self,
        shard: &ShardIdentity,
        kind: VsKind,
        infra: Option<&InfraOverride>,
        published: &mut PublishSet,
        build: impl FnOnce(&mut VirtualService),
    ) {
        let name = shard.model_name();
        let new_vs =
            || VirtualService::new(&shard.name, &shard.tenant, kind, &self.cluster, infra);
        let (shared, created) = self.models.get_or_create(&name, || {
            GraphModel::new(&name).with_node(ModelNode::VirtualService(new_vs()))
        });

        let mut model = shared.lock();
        if model.virtual_service().is_none() {
            // A dedicated shard that was torn down while this model was held.
            model.add_node(ModelNode::VirtualService(new_vs()));
        }
        let Some(vs) = model.virtual_service_mut() else {
            return;
        };
        if !created {
            if let Some(infra) = infra {
                vs.apply_infra(infra, &self.cluster.se_group);
            }
        }
        build(vs);

        if self.models.save(&shared, &model).is_publishable() {
            published.insert(name);
        }
    }

    /// Runs `remove` against the virtual service of an existing shard.
    ///
    /// A dedicated shard left without hosts is torn down.
    fn reclaim_from(
        &self,
        shard: &ShardIdentity,
        published: &mut PublishSet,
        remove: impl FnOnce(&mut VirtualService),
    ) {
        let name = shard.model_name();
        let Some(shared) = self.models.get(&name) else {
            warn!(model = %name, "Graph model not found; skipping reclamation");
            return;
        };

        let mut model = shared.lock();
        let Some(vs) = model.virtual_service_mut() else {
            warn!(model = %name, "Graph model has no virtual service; skipping reclamation");
            return;
        };
        remove(vs);
        let vacant = vs.is_vacant();
        if shard.dedicated && vacant {
            info!(model = %name, "Tearing down vacant dedicated shard");
            model.remove_virtual_service();
        }

        if self.models.save(&shared, &model).is_publishable() {
            published.insert(name);
        }
    }

    fn finish(&self, published: PublishSet, key: &str, full_sync: bool) -> Vec<String> {
        if !full_sync && !published.is_empty() {
            published.publish(self.sources.publisher.as_ref(), key);
            self.metrics.published(published.len());
        }
        published.into_names()
    }
}

// === impl ObjectPass ===

impl ObjectPass<'_> {
    fn scope<'s>(&'s self, cluster: &'s ClusterInfo, side: &'s ShardInputs) -> ObjectScope<'s> {
        ObjectScope {
            cluster,
            obj: self.obj,
            kind: self.kind,
            infra: side.infra.as_ref().and_then(InfraOverride::name_prefix),
        }
    }
}

fn l7_kind(shard: &ShardIdentity) -> VsKind {
    if shard.dedicated {
        VsKind::Dedicated
    } else {
        VsKind::Shared
    }
}

fn kind_label(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Ingress => "Ingress",
        ObjectKind::Route => "Route",
    }
}
