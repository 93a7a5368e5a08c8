use ingress_controller_core::{
    host::{diff_path_svc, path_svc},
    HostPathSvc, HostRecord, ObjectKind, PathSvc, Policy,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// The stored and newly derived host records of one routing object.
///
/// Classification consumes `old`: once a host has been carried into `new` with the same
/// class, its old policy for that class is cleared so that reclamation leaves it alone. What
/// remains active in `old` afterwards is exactly what must be reclaimed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct HostStates {
    pub old: BTreeMap<String, HostRecord>,
    pub new: BTreeMap<String, HostRecord>,

    /// Hosts whose TLS binding redirects insecure requests in this pass. A shared-shard host
    /// that also serves insecure paths keeps `Allow`, so its record alone cannot tell.
    redirects: BTreeSet<String>,
    check_svc: bool,
}

// === impl HostStates ===

impl HostStates {
    pub fn new(old: BTreeMap<String, HostRecord>, check_svc: bool) -> Self {
        Self {
            old,
            new: BTreeMap::new(),
            redirects: BTreeSet::new(),
            check_svc,
        }
    }

    /// Returns true if `host` requested an HTTPS redirect in this pass.
    pub fn is_redirecting(&self, host: &str) -> bool {
        self.redirects.contains(host)
    }

    /// Carries an insecure host into the new state.
    pub fn classify_insecure(
        &mut self,
        kind: ObjectKind,
        host: &str,
        paths: &[HostPathSvc],
        dedicated: bool,
    ) {
        if let Some(old) = self.old.get_mut(host) {
            if old.insecure_policy.is_active() {
                let diff = diff_path_svc(kind, &old.path_svc, paths, self.check_svc);
                if diff.is_empty() {
                    old.insecure_policy = Policy::None;
                    if dedicated {
                        old.secure_policy = Policy::None;
                    }
                } else {
                    debug!(%host, paths = diff.len(), "Insecure paths removed");
                    old.path_svc = diff;
                }
            }
        }

        let record = self.new.entry(host.to_string()).or_default();
        record.insecure_policy = Policy::Allow;
        extend(&mut record.path_svc, paths);
    }

    /// Carries an edge-terminated host into the new state.
    pub fn classify_secure(
        &mut self,
        kind: ObjectKind,
        host: &str,
        paths: &[HostPathSvc],
        redirect: bool,
        dedicated: bool,
    ) {
        if let Some(old) = self.old.get_mut(host) {
            if old.secure_policy == Policy::EdgeTerminate {
                let diff = diff_path_svc(kind, &old.path_svc, paths, self.check_svc);
                if diff.is_empty() {
                    old.secure_policy = Policy::None;
                    if dedicated {
                        old.insecure_policy = Policy::None;
                    }
                } else {
                    debug!(%host, paths = diff.len(), "Secure paths removed");
                    old.path_svc = diff;
                }
            }
        }

        if redirect {
            self.redirects.insert(host.to_string());
        }
        let record = self.new.entry(host.to_string()).or_default();
        record.secure_policy = Policy::EdgeTerminate;
        // A shared shard keeps serving the host's insecure paths alongside TLS.
        if dedicated || record.insecure_policy != Policy::Allow {
            record.insecure_policy = if redirect {
                Policy::Redirect
            } else {
                Policy::None
            };
        }
        extend(&mut record.path_svc, paths);
    }

    /// Carries a passthrough host into the new state.
    ///
    /// Passthrough pools are rebuilt whole for each host, so a host that stays passthrough
    /// never has anything to reclaim.
    pub fn classify_passthrough(&mut self, host: &str, paths: &[HostPathSvc], redirect: bool) {
        if let Some(old) = self.old.get_mut(host) {
            if old.secure_policy == Policy::Pass {
                old.secure_policy = Policy::None;
            }
        }

        let record = self.new.entry(host.to_string()).or_default();
        record.secure_policy = Policy::Pass;
        if redirect {
            record.insecure_policy = Policy::Redirect;
            self.redirects.insert(host.to_string());
        }
        extend(&mut record.path_svc, paths);
    }
}

fn extend(target: &mut PathSvc, paths: &[HostPathSvc]) {
    for (path, services) in path_svc(paths) {
        let entry = target.entry(path).or_default();
        for svc in services {
            if !entry.contains(&svc) {
                entry.push(svc);
            }
        }
    }
}
