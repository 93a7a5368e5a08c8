//! The per-shard graph of load-balancer objects.

pub mod vrf;
mod vs;

pub use self::{
    vrf::{NodeRoutes, RouteError, StaticRoute, Vrf},
    vs::{
        HttpRedirect, Pool, PoolGroup, RemovalFlags, SniChild, TrafficClass, VirtualService,
        VsKind,
    },
};
pub(crate) use self::vs::ObjectScope;
use std::hash::{BuildHasher, Hash, Hasher};

// Fixed seeds so that checksums are comparable across model instances.
const CHECKSUM_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// The complete object set of one shard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphModel {
    name: String,
    nodes: Vec<ModelNode>,
}

/// A typed node held by a [`GraphModel`].
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum ModelNode {
    VirtualService(VirtualService),
    Vrf(Vrf),
}

// === impl GraphModel ===

impl GraphModel {
    pub fn new(name: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            nodes: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: ModelNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn add_node(&mut self, node: ModelNode) {
        self.nodes.push(node);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[ModelNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn virtual_service(&self) -> Option<&VirtualService> {
        self.nodes.iter().find_map(|node| match node {
            ModelNode::VirtualService(vs) => Some(vs),
            ModelNode::Vrf(_) => None,
        })
    }

    pub fn virtual_service_mut(&mut self) -> Option<&mut VirtualService> {
        self.nodes.iter_mut().find_map(|node| match node {
            ModelNode::VirtualService(vs) => Some(vs),
            ModelNode::Vrf(_) => None,
        })
    }

    /// Drops the model's virtual service, returning it if there was one.
    pub fn remove_virtual_service(&mut self) -> Option<VirtualService> {
        let idx = self
            .nodes
            .iter()
            .position(|node| matches!(node, ModelNode::VirtualService(_)))?;
        match self.nodes.remove(idx) {
            ModelNode::VirtualService(vs) => Some(vs),
            ModelNode::Vrf(_) => None,
        }
    }

    pub fn vrf(&self) -> Option<&Vrf> {
        self.nodes.iter().find_map(|node| match node {
            ModelNode::Vrf(vrf) => Some(vrf),
            ModelNode::VirtualService(_) => None,
        })
    }

    /// Returns the model's VRF node, adding an empty one named `name` if it has none.
    pub fn vrf_mut(&mut self, name: &str) -> &mut Vrf {
        let idx = match self
            .nodes
            .iter()
            .position(|node| matches!(node, ModelNode::Vrf(_)))
        {
            Some(idx) => idx,
            None => {
                self.nodes.push(ModelNode::Vrf(Vrf::new(name)));
                self.nodes.len() - 1
            }
        };
        match &mut self.nodes[idx] {
            ModelNode::Vrf(vrf) => vrf,
            ModelNode::VirtualService(_) => unreachable!("node at {idx} is a VRF"),
        }
    }

    /// A content checksum over every node in the model.
    ///
    /// Two models with the same nodes in the same order always produce the same checksum.
    pub fn checksum(&self) -> u64 {
        let [k0, k1, k2, k3] = CHECKSUM_SEEDS;
        let mut hasher = ahash::RandomState::with_seeds(k0, k1, k2, k3).build_hasher();
        self.nodes.hash(&mut hasher);
        hasher.finish()
    }
}
