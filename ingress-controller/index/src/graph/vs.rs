use crate::ClusterInfo;
use ingress_controller_core::{HostPathSvc, InfraOverride, ObjectKind, ObjectRef, PathSvc};

/// A virtual service: the front-end of one shard.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct VirtualService {
    pub name: String,
    pub tenant: String,
    pub kind: VsKind,
    pub fqdns: Vec<String>,
    pub se_group: String,
    pub vip_network: Option<String>,

    /// Pools attached directly to the virtual service.
    pub pools: Vec<Pool>,
    pub pool_groups: Vec<PoolGroup>,
    pub redirects: Vec<HttpRedirect>,

    /// Per-host TLS children of a shared virtual service.
    pub sni_children: Vec<SniChild>,

    /// The certificate of a dedicated virtual service that terminates TLS.
    pub certificate: Option<String>,
}

#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq)]
pub enum VsKind {
    #[default]
    Shared,
    Dedicated,
    Passthrough,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Pool {
    pub name: String,
    pub host: String,
    pub path: String,
    pub service: String,

    /// The `namespace/name` of the routing object the pool was built for.
    pub owner: String,

    /// The pool group this pool is a member of.
    pub group: String,
    pub tls: bool,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct PoolGroup {
    pub name: String,
    pub members: Vec<String>,
}

/// Redirects insecure requests for `host` to HTTPS.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct HttpRedirect {
    pub name: String,
    pub host: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct SniChild {
    pub name: String,
    pub host: String,
    pub certificate: String,
    pub pools: Vec<Pool>,
    pub pool_groups: Vec<PoolGroup>,
}

/// The traffic class a set of pools serves.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrafficClass {
    Insecure,
    Secure,
    Passthrough,
}

/// Controls whether removing a host's pools also drops its FQDN and redirect.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RemovalFlags {
    pub fqdn: bool,
    pub redirect: bool,
}

/// The routing object on whose behalf pools are built or removed.
#[derive(Copy, Clone, Debug)]
pub(crate) struct ObjectScope<'a> {
    pub cluster: &'a ClusterInfo,
    pub obj: &'a ObjectRef,
    pub kind: ObjectKind,

    /// The infra prefix that was in effect when the pools were named.
    pub infra: Option<&'a str>,
}

// === impl VirtualService ===

impl VirtualService {
    pub fn new(
        name: impl ToString,
        tenant: impl ToString,
        kind: VsKind,
        cluster: &ClusterInfo,
        infra: Option<&InfraOverride>,
    ) -> Self {
        let mut vs = Self {
            name: name.to_string(),
            tenant: tenant.to_string(),
            kind,
            se_group: cluster.se_group.clone(),
            ..Default::default()
        };
        if let Some(infra) = infra {
            vs.apply_infra(infra, &cluster.se_group);
        }
        vs
    }

    /// Applies an infra override's service-engine group and VIP network in place.
    pub fn apply_infra(&mut self, infra: &InfraOverride, default_se_group: &str) {
        self.se_group = infra
            .se_group
            .clone()
            .unwrap_or_else(|| default_se_group.to_string());
        self.vip_network = infra.vip_network.clone();
    }

    /// True when the virtual service no longer carries any host.
    pub fn is_vacant(&self) -> bool {
        self.fqdns.is_empty()
            && self.pools.is_empty()
            && self.sni_children.is_empty()
            && self.redirects.is_empty()
    }

    pub(crate) fn add_insecure_host(
        &mut self,
        scope: ObjectScope<'_>,
        host: &str,
        paths: &[HostPathSvc],
    ) {
        for HostPathSvc { path, service } in paths {
            let pool = Pool {
                name: scope.cluster.pool_name(
                    host,
                    path,
                    scope.obj,
                    scope.kind,
                    service,
                    scope.infra,
                ),
                host: host.to_string(),
                path: path.clone(),
                service: service.clone(),
                owner: scope.obj.to_string(),
                group: self.name.clone(),
                tls: false,
            };
            upsert_pool(&mut self.pools, pool);
        }
        self.pool_groups = regroup(&self.pools);
        self.add_fqdn(host);
    }

    pub(crate) fn add_secure_host(
        &mut self,
        scope: ObjectScope<'_>,
        host: &str,
        paths: &[HostPathSvc],
        secret: &str,
        redirect: bool,
    ) {
        let pools = paths
            .iter()
            .map(|HostPathSvc { path, service }| Pool {
                name: scope.cluster.secure_pool_name(
                    host,
                    path,
                    scope.obj,
                    scope.kind,
                    service,
                    scope.infra,
                ),
                host: host.to_string(),
                path: path.clone(),
                service: service.clone(),
                owner: scope.obj.to_string(),
                group: match self.kind {
                    VsKind::Dedicated => self.name.clone(),
                    _ => scope
                        .cluster
                        .secure_pool_group_name(host, path, scope.obj, scope.infra),
                },
                tls: true,
            })
            .collect::<Vec<_>>();

        if self.kind == VsKind::Dedicated {
            for pool in pools {
                upsert_pool(&mut self.pools, pool);
            }
            self.pool_groups = regroup(&self.pools);
            self.certificate = Some(secret.to_string());
        } else {
            let name = scope.cluster.sni_child_name(host, scope.infra);
            let idx = match self.sni_children.iter().position(|c| c.name == name) {
                Some(idx) => idx,
                None => {
                    self.sni_children.push(SniChild {
                        name,
                        host: host.to_string(),
                        certificate: String::new(),
                        pools: Vec::new(),
                        pool_groups: Vec::new(),
                    });
                    self.sni_children.len() - 1
                }
            };
            let child = &mut self.sni_children[idx];
            child.certificate = secret.to_string();
            for pool in pools {
                upsert_pool(&mut child.pools, pool);
            }
            child.pool_groups = regroup(&child.pools);
        }

        self.add_fqdn(host);
        self.set_redirect(scope.cluster, host, redirect);
    }

    /// Replaces the pools that forward `host`'s TLS traffic unterminated.
    pub(crate) fn add_passthrough_host(
        &mut self,
        scope: ObjectScope<'_>,
        host: &str,
        paths: &[HostPathSvc],
        redirect: bool,
    ) {
        let group = scope
            .cluster
            .passthrough_pool_group_name(host, scope.infra);
        self.pools.retain(|pool| pool.group != group);
        for HostPathSvc { path, service } in paths {
            let pool = Pool {
                name: scope
                    .cluster
                    .passthrough_pool_name(host, service, scope.infra),
                host: host.to_string(),
                path: path.clone(),
                service: service.clone(),
                owner: scope.obj.to_string(),
                group: group.clone(),
                tls: true,
            };
            upsert_pool(&mut self.pools, pool);
        }
        self.pool_groups = regroup(&self.pools);
        self.add_fqdn(host);
        self.set_redirect(scope.cluster, host, redirect);
    }

    /// Removes the pools `path_svc` describes for `host`.
    ///
    /// The host's FQDN and redirect are dropped only when the flags allow it and no TLS child
    /// still serves the host.
    pub(crate) fn remove_host(
        &mut self,
        scope: ObjectScope<'_>,
        host: &str,
        path_svc: &PathSvc,
        class: TrafficClass,
        flags: RemovalFlags,
    ) {
        let mut still_served = false;
        match class {
            TrafficClass::Insecure => {
                let names = pool_names(path_svc, |path, svc| {
                    scope
                        .cluster
                        .pool_name(host, path, scope.obj, scope.kind, svc, scope.infra)
                });
                self.pools.retain(|pool| !names.contains(&pool.name));
                self.pool_groups = regroup(&self.pools);
            }
            TrafficClass::Secure => {
                let names = pool_names(path_svc, |path, svc| {
                    scope.cluster.secure_pool_name(
                        host,
                        path,
                        scope.obj,
                        scope.kind,
                        svc,
                        scope.infra,
                    )
                });
                if self.kind == VsKind::Dedicated {
                    self.pools.retain(|pool| !names.contains(&pool.name));
                    self.pool_groups = regroup(&self.pools);
                    if !self.pools.iter().any(|pool| pool.tls) {
                        self.certificate = None;
                    }
                } else {
                    let name = scope.cluster.sni_child_name(host, scope.infra);
                    if let Some(idx) = self.sni_children.iter().position(|c| c.name == name) {
                        let child = &mut self.sni_children[idx];
                        child.pools.retain(|pool| !names.contains(&pool.name));
                        child.pool_groups = regroup(&child.pools);
                        if child.pools.is_empty() {
                            self.sni_children.remove(idx);
                        } else {
                            still_served = true;
                        }
                    }
                }
            }
            TrafficClass::Passthrough => {
                let names = pool_names(path_svc, |_, svc| {
                    scope
                        .cluster
                        .passthrough_pool_name(host, svc, scope.infra)
                });
                self.pools.retain(|pool| !names.contains(&pool.name));
                self.pool_groups = regroup(&self.pools);
            }
        }

        if still_served {
            return;
        }
        if flags.fqdn {
            self.fqdns.retain(|fqdn| fqdn != host);
        }
        if flags.redirect {
            self.redirects.retain(|redirect| redirect.host != host);
        }
    }

    fn add_fqdn(&mut self, host: &str) {
        if !self.fqdns.iter().any(|fqdn| fqdn == host) {
            self.fqdns.push(host.to_string());
        }
    }

    fn set_redirect(&mut self, cluster: &ClusterInfo, host: &str, redirect: bool) {
        if !redirect {
            self.redirects.retain(|r| r.host != host);
            return;
        }
        if !self.redirects.iter().any(|r| r.host == host) {
            self.redirects.push(HttpRedirect {
                name: cluster.redirect_policy_name(&self.name, host),
                host: host.to_string(),
            });
        }
    }
}

fn upsert_pool(pools: &mut Vec<Pool>, pool: Pool) {
    match pools.iter_mut().find(|p| p.name == pool.name) {
        Some(existing) => *existing = pool,
        None => pools.push(pool),
    }
}

fn pool_names(path_svc: &PathSvc, name: impl Fn(&str, &str) -> String) -> Vec<String> {
    path_svc
        .iter()
        .flat_map(|(path, services)| services.iter().map(|svc| name(path, svc)))
        .collect()
}

/// Derives pool groups from the pools' group names, in first-seen order.
fn regroup(pools: &[Pool]) -> Vec<PoolGroup> {
    let mut groups = Vec::<PoolGroup>::new();
    for pool in pools {
        match groups.iter_mut().find(|g| g.name == pool.group) {
            Some(group) => group.members.push(pool.name.clone()),
            None => groups.push(PoolGroup {
                name: pool.group.clone(),
                members: vec![pool.name.clone()],
            }),
        }
    }
    groups
}
