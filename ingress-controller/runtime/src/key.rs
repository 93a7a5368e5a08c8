use ingress_controller_core::{ObjectKind, ObjectRef};
use std::{fmt, str::FromStr};

/// A key delivered by the dispatcher.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum DispatchKey {
    /// `Ingress/<namespace>/<name>` or `Route/<namespace>/<name>`.
    Object { kind: ObjectKind, obj: ObjectRef },

    /// `Node/<name>`.
    Node(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("unknown key kind in {0:?}")]
    UnknownKind(String),

    #[error("key {0:?} must have the form <kind>/<namespace>/<name>")]
    MalformedObject(String),

    #[error("key {0:?} must have the form Node/<name>")]
    MalformedNode(String),
}

// === impl DispatchKey ===

impl FromStr for DispatchKey {
    type Err = KeyError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = key
            .split_once('/')
            .ok_or_else(|| KeyError::UnknownKind(key.to_string()))?;

        if kind == "Node" {
            if rest.is_empty() || rest.contains('/') {
                return Err(KeyError::MalformedNode(key.to_string()));
            }
            return Ok(Self::Node(rest.to_string()));
        }

        let kind = kind
            .parse::<ObjectKind>()
            .map_err(|_| KeyError::UnknownKind(key.to_string()))?;
        match rest.split_once('/') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::Object {
                    kind,
                    obj: ObjectRef::new(ns, name),
                })
            }
            _ => Err(KeyError::MalformedObject(key.to_string())),
        }
    }
}

impl fmt::Display for DispatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object { kind, obj } => write!(f, "{kind}/{obj}"),
            Self::Node(name) => write!(f, "Node/{name}"),
        }
    }
}
