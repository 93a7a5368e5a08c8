use super::{ObjectPass, Reconciler};
use crate::{
    differ::HostStates,
    graph::{RemovalFlags, TrafficClass},
    PublishSet, ShardResolver,
};
use ingress_controller_core::{HostRecord, Policy, ShardIdentity};
use std::collections::BTreeMap;
use tracing::{debug, info};

const FULL_REMOVAL: RemovalFlags = RemovalFlags {
    fqdn: true,
    redirect: true,
};

/// Decides how much of a stale host to remove.
///
/// A host that is still present and neither was nor is passthrough is only changing traffic
/// class, so it keeps its FQDN. It also keeps its redirect if it still redirects to HTTPS,
/// either through its record or through a redirecting TLS binding in this pass.
pub(crate) fn removal_flags(
    old: &HostRecord,
    new: Option<&HostRecord>,
    redirecting: bool,
) -> RemovalFlags {
    match new {
        Some(new) if old.secure_policy != Policy::Pass && new.secure_policy != Policy::Pass => {
            RemovalFlags {
                fqdn: false,
                redirect: !redirecting && new.insecure_policy != Policy::Redirect,
            }
        }
        _ => FULL_REMOVAL,
    }
}

/// The traffic classes a record still holds objects for.
pub(crate) fn active_classes(record: &HostRecord) -> Vec<TrafficClass> {
    let mut classes = Vec::with_capacity(2);
    match record.secure_policy {
        Policy::Pass => classes.push(TrafficClass::Passthrough),
        Policy::EdgeTerminate => classes.push(TrafficClass::Secure),
        _ => {}
    }
    if record.insecure_policy == Policy::Allow {
        classes.push(TrafficClass::Insecure);
    }
    classes
}

// === impl Reconciler ===

impl Reconciler {
    /// Fully removes every stored host whose shard identity changed.
    pub(super) fn migrate_moved_hosts(
        &self,
        pass: &ObjectPass<'_>,
        hosts: &BTreeMap<String, HostRecord>,
        published: &mut PublishSet,
    ) {
        for (host, record) in hosts {
            for class in active_classes(record) {
                let (old, new) = self.resolve(class, host, pass);
                if old == new {
                    continue;
                }
                info!(%host, from = %old, to = %new, ?class, "Moving host to a new shard");
                self.remove_class(pass, &old, host, record, class, FULL_REMOVAL, published);
            }
        }
    }

    /// Removes whatever classification left active in the old host state.
    pub(super) fn reclaim_stale(
        &self,
        pass: &ObjectPass<'_>,
        states: &HostStates,
        published: &mut PublishSet,
    ) {
        for (host, record) in &states.old {
            let redirecting = states.is_redirecting(host);
            let flags = removal_flags(record, states.new.get(host), redirecting);
            for class in active_classes(record) {
                let (old, _) = self.resolve(class, host, pass);
                self.remove_class(pass, &old, host, record, class, flags, published);
            }
        }
    }

    pub(super) fn remove_all_hosts(
        &self,
        pass: &ObjectPass<'_>,
        hosts: &BTreeMap<String, HostRecord>,
        published: &mut PublishSet,
    ) {
        for (host, record) in hosts {
            for class in active_classes(record) {
                let (old, _) = self.resolve(class, host, pass);
                self.remove_class(pass, &old, host, record, class, FULL_REMOVAL, published);
            }
        }
    }

    fn resolve(
        &self,
        class: TrafficClass,
        host: &str,
        pass: &ObjectPass<'_>,
    ) -> (ShardIdentity, ShardIdentity) {
        let resolver = ShardResolver::new(&self.cluster);
        match class {
            TrafficClass::Passthrough => resolver.resolve_passthrough(host, &pass.placement),
            TrafficClass::Insecure | TrafficClass::Secure => {
                resolver.resolve(host, &pass.placement)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn remove_class(
        &self,
        pass: &ObjectPass<'_>,
        shard: &ShardIdentity,
        host: &str,
        record: &HostRecord,
        class: TrafficClass,
        flags: RemovalFlags,
        published: &mut PublishSet,
    ) {
        debug!(%host, %shard, ?class, ?flags, "Reclaiming host");
        // Pools were named under the infra override that placed them.
        let scope = pass.scope(&self.cluster, &pass.placement.old);
        self.reclaim_from(shard, published, |vs| {
            vs.remove_host(scope, host, &record.path_svc, class, flags)
        });
    }
}
