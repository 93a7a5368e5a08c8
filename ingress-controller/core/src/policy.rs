use std::fmt;

/// The traffic policy a host carries for one traffic class.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq)]
pub enum Policy {
    #[default]
    None,
    Allow,
    Redirect,
    EdgeTerminate,
    Pass,
}

impl Policy {
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns true if the policy serves traffic on its own. A redirect only decorates a secure
    /// host and is not counted as an active insecure policy.
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Allow | Self::EdgeTerminate | Self::Pass)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => "none".fmt(f),
            Self::Allow => "allow".fmt(f),
            Self::Redirect => "redirect".fmt(f),
            Self::EdgeTerminate => "edge".fmt(f),
            Self::Pass => "passthrough".fmt(f),
        }
    }
}
