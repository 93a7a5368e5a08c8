use ingress_controller_core::{ObjectKind, ObjectRef, ShardSize, DEFAULT_TENANT};

const SHARED_L7_PREFIX: &str = "Shared-L7";
const SHARED_PASSTHROUGH_PREFIX: &str = "Shared-Passthrough-";
const DEDICATED_SUFFIX: &str = "-L7-dedicated";
const DEFAULT_SE_GROUP: &str = "Default-Group";
const DEFAULT_VRF: &str = "global";

/// Holds cluster metadata and derives the names of load-balancer objects.
#[derive(Clone, Debug)]
pub struct ClusterInfo {
    /// Prefixes every object name owned by this cluster.
    pub cluster_name: String,

    /// The tenant used when a namespace does not map to one.
    pub tenant: String,

    /// The default number of shared L7 shards.
    pub shard_size: ShardSize,

    /// The default number of passthrough shards. Passthrough hosts are never dedicated.
    pub passthrough_shard_size: ShardSize,

    /// The VRF context that holds node static routes.
    pub vrf_name: String,

    /// The service-engine group used when no infra override names one.
    pub se_group: String,
}

impl Default for ClusterInfo {
    fn default() -> Self {
        Self {
            cluster_name: "cluster".to_string(),
            tenant: DEFAULT_TENANT.to_string(),
            shard_size: ShardSize::Large,
            passthrough_shard_size: ShardSize::Small,
            vrf_name: DEFAULT_VRF.to_string(),
            se_group: DEFAULT_SE_GROUP.to_string(),
        }
    }
}

impl ClusterInfo {
    pub(crate) fn name_prefix(&self) -> String {
        format!("{}--", self.cluster_name)
    }

    pub(crate) fn shared_vs_name(&self, bucket: u32, infra_prefix: Option<&str>) -> String {
        match infra_prefix {
            Some(infra) => format!(
                "{}{SHARED_L7_PREFIX}-{infra}-{bucket}",
                self.name_prefix()
            ),
            None => format!("{}{SHARED_L7_PREFIX}-{bucket}", self.name_prefix()),
        }
    }

    pub(crate) fn dedicated_vs_name(&self, host: &str, infra_prefix: Option<&str>) -> String {
        match infra_prefix {
            Some(infra) => format!("{}{infra}-{host}{DEDICATED_SUFFIX}", self.name_prefix()),
            None => format!("{}{host}{DEDICATED_SUFFIX}", self.name_prefix()),
        }
    }

    pub(crate) fn passthrough_vs_name(&self, bucket: u32, infra_prefix: Option<&str>) -> String {
        match infra_prefix {
            Some(infra) => format!(
                "{}{SHARED_PASSTHROUGH_PREFIX}{infra}-{bucket}",
                self.name_prefix()
            ),
            None => format!("{}{SHARED_PASSTHROUGH_PREFIX}{bucket}", self.name_prefix()),
        }
    }

    /// The model that holds the cluster's VRF context.
    pub fn vrf_model_name(&self) -> String {
        format!("{}/{}", self.tenant, self.vrf_name)
    }

    /// Names an insecure pool serving `host` + `path`.
    ///
    /// Routes may split a path across services, so their pools also carry the service name.
    pub(crate) fn pool_name(
        &self,
        host: &str,
        path: &str,
        obj: &ObjectRef,
        kind: ObjectKind,
        service: &str,
        infra: Option<&str>,
    ) -> String {
        let mut name = self.name_prefix();
        if let Some(infra) = infra {
            name.push_str(infra);
            name.push('-');
        }
        name.push_str(&priority_label(host, path).replace('/', "_"));
        name.push('-');
        name.push_str(&obj.namespace);
        name.push('-');
        name.push_str(&obj.name);
        if kind == ObjectKind::Route {
            name.push('-');
            name.push_str(service);
        }
        name
    }

    /// Names a pool serving `host` + `path` behind TLS termination.
    pub(crate) fn secure_pool_name(
        &self,
        host: &str,
        path: &str,
        obj: &ObjectRef,
        kind: ObjectKind,
        service: &str,
        infra: Option<&str>,
    ) -> String {
        let mut name = self.name_prefix();
        if let Some(infra) = infra {
            name.push_str(infra);
            name.push('-');
        }
        name.push_str(&obj.namespace);
        name.push('-');
        name.push_str(host);
        name.push('_');
        name.push_str(&path.replace('/', "_"));
        name.push('-');
        name.push_str(&obj.name);
        if kind == ObjectKind::Route {
            name.push('-');
            name.push_str(service);
        }
        name
    }

    pub(crate) fn secure_pool_group_name(
        &self,
        host: &str,
        path: &str,
        obj: &ObjectRef,
        infra: Option<&str>,
    ) -> String {
        let mut name = self.name_prefix();
        if let Some(infra) = infra {
            name.push_str(infra);
            name.push('-');
        }
        format!(
            "{name}{}-{host}_{}-{}",
            obj.namespace,
            path.replace('/', "_"),
            obj.name
        )
    }

    pub(crate) fn sni_child_name(&self, host: &str, infra: Option<&str>) -> String {
        match infra {
            Some(infra) => format!("{}{infra}-{host}", self.name_prefix()),
            None => format!("{}{host}", self.name_prefix()),
        }
    }

    pub(crate) fn passthrough_pool_group_name(&self, host: &str, infra: Option<&str>) -> String {
        self.sni_child_name(host, infra)
    }

    pub(crate) fn passthrough_pool_name(
        &self,
        host: &str,
        service: &str,
        infra: Option<&str>,
    ) -> String {
        format!("{}-{service}", self.passthrough_pool_group_name(host, infra))
    }

    pub(crate) fn redirect_policy_name(&self, vs_name: &str, host: &str) -> String {
        format!("{vs_name}--redirect--{host}")
    }
}

pub(crate) fn priority_label(host: &str, path: &str) -> String {
    format!("{host}{path}")
}
