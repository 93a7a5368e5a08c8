use crate::HostPathSvc;
use std::{collections::BTreeMap, fmt, str::FromStr};

/// The kind of routing object being reconciled.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum ObjectKind {
    Ingress,
    Route,
}

/// The parsed routing intents of one routing object.
///
/// Hosts are kept in sorted maps so that a reconciliation visits them in a stable order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutingInput {
    pub kind: ObjectKind,

    /// Hostname to path-service bindings served without TLS.
    pub insecure: BTreeMap<String, Vec<HostPathSvc>>,

    /// TLS bindings terminated at the load balancer.
    pub tls: Vec<TlsBinding>,

    /// Hostname to bindings forwarded without terminating TLS.
    pub passthrough: BTreeMap<String, PassthroughBinding>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsBinding {
    pub secret_name: String,
    pub hosts: BTreeMap<String, Vec<HostPathSvc>>,

    /// Insecure requests to these hosts are redirected to HTTPS.
    pub redirect: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassthroughBinding {
    pub path_svc: Vec<HostPathSvc>,
    pub redirect: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown object kind: {0}")]
pub struct UnknownKind(String);

// === impl ObjectKind ===

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingress => "Ingress".fmt(f),
            Self::Route => "Route".fmt(f),
        }
    }
}

impl FromStr for ObjectKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ingress" => Ok(Self::Ingress),
            "Route" => Ok(Self::Route),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

// === impl RoutingInput ===

impl RoutingInput {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            insecure: BTreeMap::new(),
            tls: Vec::new(),
            passthrough: BTreeMap::new(),
        }
    }

    /// True when `host` is terminated by any TLS binding.
    pub fn is_secure(&self, host: &str) -> bool {
        self.tls.iter().any(|tls| tls.hosts.contains_key(host))
    }

    pub fn is_empty(&self) -> bool {
        self.insecure.is_empty()
            && self.tls.iter().all(|tls| tls.hosts.is_empty())
            && self.passthrough.is_empty()
    }
}
