use std::{fmt, str::FromStr};

/// Per-object infrastructure settings that override the cluster-wide defaults.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct InfraOverride {
    pub name: String,

    /// Namespace-scoped settings do not contribute a prefix to shard names.
    pub namespace_scoped: bool,

    pub shard_size: Option<ShardSize>,
    pub se_group: Option<String>,
    pub vip_network: Option<String>,
}

/// The number of shared virtual services hostnames are hashed across.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq)]
pub enum ShardSize {
    #[default]
    Large,
    Medium,
    Small,

    /// Every hostname gets its own virtual service.
    Dedicated,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid shard size {0:?}: expected one of LARGE, MEDIUM, SMALL, or DEDICATED")]
pub struct InvalidShardSize(String);

// === impl InfraOverride ===

impl InfraOverride {
    /// The prefix this setting adds to shard names, if any.
    pub fn name_prefix(&self) -> Option<&str> {
        if self.namespace_scoped || self.name.is_empty() {
            return None;
        }
        Some(&self.name)
    }
}

// === impl ShardSize ===

impl ShardSize {
    /// The number of hash buckets. Zero means dedicated.
    pub fn buckets(&self) -> u32 {
        match self {
            Self::Large => 8,
            Self::Medium => 4,
            Self::Small => 1,
            Self::Dedicated => 0,
        }
    }
}

impl FromStr for ShardSize {
    type Err = InvalidShardSize;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LARGE" => Ok(Self::Large),
            "MEDIUM" => Ok(Self::Medium),
            "SMALL" => Ok(Self::Small),
            "DEDICATED" => Ok(Self::Dedicated),
            _ => Err(InvalidShardSize(s.to_string())),
        }
    }
}

impl fmt::Display for ShardSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Large => "LARGE".fmt(f),
            Self::Medium => "MEDIUM".fmt(f),
            Self::Small => "SMALL".fmt(f),
            Self::Dedicated => "DEDICATED".fmt(f),
        }
    }
}
