use std::fmt;

/// Identifies the virtual service that carries a host's configuration.
///
/// Two identities are equal only if the tenant, the name, and the dedicated flag all match.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ShardIdentity {
    pub tenant: String,
    pub name: String,
    pub dedicated: bool,
}

impl ShardIdentity {
    /// The key under which the shard's graph model is stored.
    pub fn model_name(&self) -> String {
        format!("{}/{}", self.tenant, self.name)
    }
}

impl fmt::Display for ShardIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant, self.name)
    }
}
