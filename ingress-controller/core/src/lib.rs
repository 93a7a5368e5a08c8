#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod host;
pub mod infra;
mod object_ref;
mod policy;
pub mod routing;
mod shard;
pub mod source;

pub use self::{
    host::{HostPathSvc, HostRecord, PathSvc},
    infra::{InfraOverride, ShardSize},
    object_ref::ObjectRef,
    policy::Policy,
    routing::{ObjectKind, PassthroughBinding, RoutingInput, TlsBinding},
    shard::ShardIdentity,
};
pub use ipnet::{IpNet, Ipv4Net, Ipv6Net};

pub const DEFAULT_TENANT: &str = "admin";
