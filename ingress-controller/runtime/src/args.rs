use crate::Controller;
use anyhow::{Context, Result};
use clap::Parser;
use ingress_controller_core::ShardSize;
use ingress_controller_index::{ClusterInfo, Collaborators, ReconcileMetrics, Reconciler};
use prometheus_client::registry::Registry;
use std::{fmt, str::FromStr};
use tracing_subscriber::{fmt as logfmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[clap(
    name = "ingress-controller",
    about = "Reconciles routing objects into load-balancer graph models"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "ingress_controller=info,warn",
        env = "INGRESS_CONTROLLER_LOG"
    )]
    pub(crate) log_level: String,

    #[clap(long, default_value = "plain")]
    pub(crate) log_format: LogFormat,

    /// Prefixes the name of every load-balancer object this controller owns.
    #[clap(long, env = "CLUSTER_NAME")]
    pub(crate) cluster_name: String,

    #[clap(long, default_value = "admin")]
    pub(crate) tenant: String,

    /// One of LARGE, MEDIUM, SMALL, or DEDICATED.
    #[clap(long, default_value = "LARGE")]
    pub(crate) shard_size: ShardSize,

    #[clap(long, default_value = "SMALL")]
    pub(crate) passthrough_shard_size: ShardSize,

    #[clap(long, default_value = "global")]
    pub(crate) vrf_name: String,

    #[clap(long, default_value = "Default-Group")]
    pub(crate) se_group: String,

    /// Compares the services behind ingress paths, not only the paths themselves.
    #[clap(long)]
    pub(crate) check_services: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid log format {0:?}: expected plain or json")]
pub struct InvalidLogFormat(String);

// === impl Args ===

impl Args {
    pub fn cluster_info(&self) -> ClusterInfo {
        ClusterInfo {
            cluster_name: self.cluster_name.clone(),
            tenant: self.tenant.clone(),
            shard_size: self.shard_size,
            passthrough_shard_size: self.passthrough_shard_size,
            vrf_name: self.vrf_name.clone(),
            se_group: self.se_group.clone(),
        }
    }

    /// Installs the global tracing subscriber.
    pub fn init_logging(&self) -> Result<()> {
        let filter = EnvFilter::try_new(&self.log_level)
            .with_context(|| format!("invalid log filter {:?}", self.log_level))?;
        let registry = tracing_subscriber::registry().with(filter);
        match self.log_format {
            LogFormat::Plain => registry.with(logfmt::layer()).try_init()?,
            LogFormat::Json => registry.with(logfmt::layer().json()).try_init()?,
        }
        Ok(())
    }

    /// Builds a controller around the given collaborators, registering its metrics.
    pub fn build(self, sources: Collaborators, prom: &mut Registry) -> Controller {
        let cluster = self.cluster_info();
        tracing::info!(
            cluster = %cluster.cluster_name,
            tenant = %cluster.tenant,
            shard_size = %cluster.shard_size,
            passthrough_shard_size = %cluster.passthrough_shard_size,
            "Starting ingress controller"
        );
        let publisher = sources.publisher.clone();
        let metrics = ReconcileMetrics::register(prom.sub_registry_with_prefix("ingress_controller"));
        let reconciler = Reconciler::new(cluster, sources, metrics)
            .with_service_checks(self.check_services);
        Controller::new(reconciler, publisher)
    }
}

// === impl LogFormat ===

impl FromStr for LogFormat {
    type Err = InvalidLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            _ => Err(InvalidLogFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => "plain".fmt(f),
            Self::Json => "json".fmt(f),
        }
    }
}
