use crate::{ObjectKind, Policy};
use std::collections::BTreeMap;

/// Maps a path to the ordered list of backend services that serve it.
pub type PathSvc = BTreeMap<String, Vec<String>>;

/// A single parsed path-to-service binding for a host.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct HostPathSvc {
    pub path: String,
    pub service: String,
}

/// The stored state of one hostname within one routing object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostRecord {
    pub insecure_policy: Policy,
    pub secure_policy: Policy,
    pub path_svc: PathSvc,
}

// === impl HostPathSvc ===

impl HostPathSvc {
    pub fn new(path: impl ToString, service: impl ToString) -> Self {
        Self {
            path: path.to_string(),
            service: service.to_string(),
        }
    }
}

/// Groups parsed bindings by path, preserving the order in which services were listed.
pub fn path_svc(bindings: &[HostPathSvc]) -> PathSvc {
    let mut map = PathSvc::new();
    for HostPathSvc { path, service } in bindings {
        map.entry(path.clone()).or_default().push(service.clone());
    }
    map
}

/// Returns the subset of `stored` that is no longer served by `current`.
///
/// A path that is still present in `current` is dropped from the result entirely unless
/// services are compared, in which case only the services that disappeared from that path are
/// kept. Routes always compare services; ingresses only do so when `check_svc` is set.
pub fn diff_path_svc(
    kind: ObjectKind,
    stored: &PathSvc,
    current: &[HostPathSvc],
    check_svc: bool,
) -> PathSvc {
    let check_svc = check_svc || kind == ObjectKind::Route;
    let mut diff = stored.clone();
    for (path, services) in path_svc(current) {
        let Some(stored_services) = diff.get_mut(&path) else {
            continue;
        };
        if check_svc {
            stored_services.retain(|svc| !services.contains(svc));
            if stored_services.is_empty() {
                diff.remove(&path);
            }
        } else {
            diff.remove(&path);
        }
    }
    diff
}

// === impl HostRecord ===

impl HostRecord {
    pub fn insecure(path_svc: PathSvc) -> Self {
        Self {
            insecure_policy: Policy::Allow,
            secure_policy: Policy::None,
            path_svc,
        }
    }

    pub fn secure(path_svc: PathSvc, redirect: bool) -> Self {
        Self {
            insecure_policy: if redirect {
                Policy::Redirect
            } else {
                Policy::None
            },
            secure_policy: Policy::EdgeTerminate,
            path_svc,
        }
    }

    /// Iterates over the paths held by the record.
    pub fn paths(&self) -> impl Iterator<Item = &str> + '_ {
        self.path_svc.keys().map(String::as_str)
    }
}
