//! Node pod-CIDR static routes held by the cluster's VRF context.
//!
//! Routes live in one flat array. Each node owns a contiguous window of that array, and the
//! routes in a window are named `<cluster>-<id>` with consecutive IDs starting at the node's
//! route ID. Every resize of a window goes through [`Vrf::splice`], which shifts and renames
//! the windows that follow it so that a route's ID always equals its position plus one.

use ingress_controller_core::{source::NodeAddresses, IpNet};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    collections::{BTreeMap, BTreeSet},
    net::IpAddr,
};
use tracing::{debug, error, warn};

static IPV4_CIDR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,3}\.){3}\d{1,3}/\d{1,2}$").expect("IPv4 CIDR regex must compile")
});

static IPV6_CIDR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{0,4}(:[0-9a-fA-F]{0,4}){1,7}(:(\d{1,3}\.){3}\d{1,3})?/\d{1,3}$")
        .expect("IPv6 CIDR regex must compile")
});

const CLUSTER_NAME_LABEL: &str = "clustername";

#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct Vrf {
    name: String,
    static_routes: Vec<StaticRoute>,
    node_routes: BTreeMap<String, NodeRoutes>,
    route_ids: BTreeSet<u32>,

    /// Node names in the order their windows appear in `static_routes`.
    nodes: Vec<String>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct StaticRoute {
    pub name: String,
    pub prefix: IpNet,
    pub next_hop: IpAddr,
    pub labels: BTreeMap<String, String>,
}

/// A node's window into the VRF's static routes.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct NodeRoutes {
    pub start: usize,
    pub count: usize,
    pub route_id: u32,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("pod CIDR {0:?} has no mask")]
    MissingMask(String),

    #[error("pod CIDR {0:?} has an invalid mask")]
    InvalidMask(String),

    #[error("pod CIDR {0:?} is not a valid prefix")]
    InvalidPrefix(String),

    #[error("node {0} has no usable address")]
    NoNodeAddress(String),
}

// === impl Vrf ===

impl Vrf {
    pub fn new(name: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn static_routes(&self) -> &[StaticRoute] {
        &self.static_routes
    }

    pub fn node_routes(&self, node: &str) -> Option<NodeRoutes> {
        self.node_routes.get(node).copied()
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Adds or updates the static routes of `node` from its pod CIDRs.
    ///
    /// On error the VRF is left unchanged. A new node whose routes would overlap an existing
    /// route is logged and skipped; updates to a known node are applied as given.
    pub fn apply_node(
        &mut self,
        cluster: &str,
        node: &str,
        cidrs: &[String],
        addrs: &NodeAddresses,
    ) -> Result<(), RouteError> {
        match self.node_routes(node) {
            None => self.add_node(cluster, node, cidrs, addrs),
            Some(window) => self.update_node(cluster, node, window, cidrs, addrs),
        }
    }

    /// Removes `node`'s routes, returning false if the node was unknown.
    pub fn delete_node(&mut self, cluster: &str, node: &str) -> bool {
        let Some(window) = self.node_routes(node) else {
            debug!(%node, "Node has no static routes");
            return false;
        };
        self.splice(cluster, node, window, Vec::new());
        true
    }

    fn add_node(
        &mut self,
        cluster: &str,
        node: &str,
        cidrs: &[String],
        addrs: &NodeAddresses,
    ) -> Result<(), RouteError> {
        let route_id = self.lowest_free_id();
        self.route_ids.insert(route_id);

        let routes = match build_routes(cluster, node, cidrs, addrs, route_id) {
            Ok(routes) => routes,
            Err(error) => {
                self.route_ids.remove(&route_id);
                return Err(error);
            }
        };
        if routes.is_empty() {
            debug!(%node, "Node has no routable pod CIDRs");
            self.route_ids.remove(&route_id);
            return Ok(());
        }
        if let Some(prefix) = self.overlapping(&routes) {
            error!(%node, %prefix, "Pod CIDR overlaps an existing static route");
            self.route_ids.remove(&route_id);
            return Ok(());
        }

        let window = NodeRoutes {
            start: self.static_routes.len(),
            count: routes.len(),
            route_id,
        };
        debug!(%node, route_id, count = window.count, "Adding static routes");
        self.static_routes.extend(routes);
        self.node_routes.insert(node.to_string(), window);
        self.nodes.push(node.to_string());
        self.sync_route_ids();
        Ok(())
    }

    fn update_node(
        &mut self,
        cluster: &str,
        node: &str,
        window: NodeRoutes,
        cidrs: &[String],
        addrs: &NodeAddresses,
    ) -> Result<(), RouteError> {
        let routes = build_routes(cluster, node, cidrs, addrs, window.route_id)?;
        debug!(%node, from = window.count, to = routes.len(), "Updating static routes");
        self.splice(cluster, node, window, routes);
        Ok(())
    }

    /// Replaces `node`'s window with `routes`.
    ///
    /// Windows after the node shift by the change in length and are renamed, walking from the
    /// last node back so that no shifted window is read after it was rewritten. A node left
    /// with no routes is dropped.
    fn splice(&mut self, cluster: &str, node: &str, window: NodeRoutes, routes: Vec<StaticRoute>) {
        let count = routes.len();
        let end = window.start + window.count;
        self.static_routes.splice(window.start..end, routes);

        let Some(idx) = self.nodes.iter().position(|n| n == node) else {
            return;
        };
        let diff = count as isize - window.count as isize;
        if diff != 0 {
            for later in self.nodes[idx + 1..].iter().rev() {
                let Some(entry) = self.node_routes.get_mut(later) else {
                    continue;
                };
                entry.start = entry.start.wrapping_add_signed(diff);
                entry.route_id = entry.start as u32 + 1;
                let routes = &mut self.static_routes[entry.start..entry.start + entry.count];
                for (id, route) in (entry.route_id..).zip(routes) {
                    route.name = route_name(cluster, id);
                }
            }
        }

        if count == 0 {
            debug!(%node, route_id = window.route_id, "Releasing static routes");
            self.node_routes.remove(node);
            self.nodes.remove(idx);
        } else if let Some(entry) = self.node_routes.get_mut(node) {
            entry.count = count;
        }
        self.sync_route_ids();
    }

    /// Returns the first prefix in `routes` whose address is already routed.
    fn overlapping(&self, routes: &[StaticRoute]) -> Option<IpNet> {
        routes
            .iter()
            .find(|route| {
                self.static_routes
                    .iter()
                    .any(|existing| existing.prefix.addr() == route.prefix.addr())
            })
            .map(|route| route.prefix)
    }

    fn lowest_free_id(&self) -> u32 {
        let mut id = 1;
        while self.route_ids.contains(&id) {
            id += 1;
        }
        id
    }

    // Route IDs are positions in the array, so exactly 1..=len are allocated.
    fn sync_route_ids(&mut self) {
        let len = self.static_routes.len() as u32;
        self.route_ids.retain(|id| *id <= len);
        self.route_ids.extend(1..=len);
    }

    /// Panics unless every window is contiguous, in node order, and named after its IDs.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self, cluster: &str) {
        let mut next = 0;
        for node in &self.nodes {
            let window = self.node_routes[node];
            assert_eq!(window.start, next, "{node} window is not contiguous");
            assert!(window.count > 0, "{node} has an empty window");
            assert_eq!(window.route_id as usize, window.start + 1);
            for (i, route) in self.static_routes[window.start..window.start + window.count]
                .iter()
                .enumerate()
            {
                assert_eq!(route.name, route_name(cluster, window.route_id + i as u32));
            }
            next += window.count;
        }
        assert_eq!(next, self.static_routes.len());
        assert_eq!(self.node_routes.len(), self.nodes.len());
        assert!(self.route_ids.iter().copied().eq(1..=next as u32));
    }
}

fn route_name(cluster: &str, id: u32) -> String {
    format!("{cluster}-{id}")
}

fn build_routes(
    cluster: &str,
    node: &str,
    cidrs: &[String],
    addrs: &NodeAddresses,
    first_id: u32,
) -> Result<Vec<StaticRoute>, RouteError> {
    if addrs.v4.is_none() && addrs.v6.is_none() {
        return Err(RouteError::NoNodeAddress(node.to_string()));
    }

    let mut routes = Vec::with_capacity(cidrs.len());
    for cidr in cidrs {
        let (addr, mask) = cidr
            .split_once('/')
            .ok_or_else(|| RouteError::MissingMask(cidr.clone()))?;
        let mask = mask
            .parse::<u8>()
            .map_err(|_| RouteError::InvalidMask(cidr.clone()))?;

        let next_hop = if IPV4_CIDR.is_match(cidr) {
            addrs.v4.map(IpAddr::from)
        } else if IPV6_CIDR.is_match(cidr) {
            addrs.v6.map(IpAddr::from)
        } else {
            warn!(%node, %cidr, "Skipping pod CIDR that is neither IPv4 nor IPv6");
            continue;
        };
        let Some(next_hop) = next_hop else {
            warn!(%node, %cidr, "Node has no address in the pod CIDR's family");
            continue;
        };

        let addr = addr
            .parse::<IpAddr>()
            .map_err(|_| RouteError::InvalidPrefix(cidr.clone()))?;
        let prefix = IpNet::new(addr, mask).map_err(|_| RouteError::InvalidMask(cidr.clone()))?;
        let id = first_id + routes.len() as u32;
        routes.push(StaticRoute {
            name: route_name(cluster, id),
            prefix,
            next_hop,
            labels: BTreeMap::from([(CLUSTER_NAME_LABEL.to_string(), cluster.to_string())]),
        });
    }
    Ok(routes)
}
