use super::*;
use crate::graph::RouteError;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::net::{IpAddr, Ipv6Addr};

const CLUSTER: &str = "cluster";

fn cidrs(cidrs: &[&str]) -> Vec<String> {
    cidrs.iter().map(|c| c.to_string()).collect()
}

fn names(vrf: &Vrf) -> Vec<&str> {
    vrf.static_routes()
        .iter()
        .map(|r| r.name.as_str())
        .collect()
}

fn apply(vrf: &mut Vrf, node: &str, node_cidrs: &[&str]) {
    vrf.apply_node(CLUSTER, node, &cidrs(node_cidrs), &v4_node())
        .expect("routes must build");
    vrf.assert_consistent(CLUSTER);
}

fn delete(vrf: &mut Vrf, node: &str) {
    assert!(vrf.delete_node(CLUSTER, node));
    vrf.assert_consistent(CLUSTER);
}

#[test]
fn route_ids_are_reused_after_delete() {
    let mut vrf = Vrf::new("global");

    apply(&mut vrf, "a", &["10.0.1.0/24"]);
    assert_eq!(vrf.node_routes("a").map(|w| w.route_id), Some(1));
    assert_eq!(names(&vrf), vec!["cluster-1"]);

    apply(&mut vrf, "b", &["10.0.2.0/24"]);
    assert_eq!(vrf.node_routes("b").map(|w| w.route_id), Some(2));
    assert_eq!(names(&vrf), vec!["cluster-1", "cluster-2"]);

    delete(&mut vrf, "a");
    assert_eq!(vrf.static_routes().len(), 1);
    assert_eq!(
        vrf.static_routes()[0].prefix,
        "10.0.2.0/24".parse::<ingress_controller_core::IpNet>().unwrap()
    );
    assert_eq!(vrf.node_routes("b").map(|w| w.route_id), Some(1));
    assert_eq!(names(&vrf), vec!["cluster-1"]);

    apply(&mut vrf, "c", &["10.0.3.0/24"]);
    assert_eq!(vrf.node_routes("c").map(|w| w.route_id), Some(2));
    assert_eq!(vrf.static_routes().len(), 2);
    assert_eq!(vrf.nodes(), ["b".to_string(), "c".to_string()]);
}

#[test]
fn growing_a_window_shifts_later_nodes() {
    let mut vrf = Vrf::new("global");
    apply(&mut vrf, "a", &["10.0.1.0/24"]);
    apply(&mut vrf, "b", &["10.0.2.0/24"]);
    apply(&mut vrf, "c", &["10.0.3.0/24"]);

    apply(&mut vrf, "a", &["10.0.1.0/24", "10.1.1.0/24"]);
    assert_eq!(vrf.node_routes("a").map(|w| w.count), Some(2));
    assert_eq!(vrf.node_routes("b").map(|w| (w.start, w.route_id)), Some((2, 3)));
    assert_eq!(vrf.node_routes("c").map(|w| (w.start, w.route_id)), Some((3, 4)));
    assert_eq!(
        vrf.static_routes()[2].prefix.to_string(),
        "10.0.2.0/24".to_string()
    );
    assert_eq!(names(&vrf), vec!["cluster-1", "cluster-2", "cluster-3", "cluster-4"]);

    apply(&mut vrf, "a", &["10.1.1.0/24"]);
    assert_eq!(vrf.node_routes("b").map(|w| w.route_id), Some(2));
    assert_eq!(vrf.static_routes()[0].prefix.to_string(), "10.1.1.0/24");
}

#[test]
fn update_to_no_routes_drops_the_node() {
    let mut vrf = Vrf::new("global");
    apply(&mut vrf, "a", &["10.0.1.0/24"]);
    apply(&mut vrf, "b", &["10.0.2.0/24", "10.1.2.0/24"]);
    apply(&mut vrf, "a", &[]);
    assert_eq!(vrf.node_routes("a"), None);
    assert_eq!(vrf.nodes(), ["b".to_string()]);
    assert_eq!(names(&vrf), vec!["cluster-1", "cluster-2"]);
}

#[test]
fn node_without_routes_gets_no_id() {
    let mut vrf = Vrf::new("global");
    apply(&mut vrf, "a", &[]);
    // A v6 CIDR on a v4-only node is skipped.
    apply(&mut vrf, "b", &["fd00:10:244::/64"]);
    assert!(vrf.nodes().is_empty());

    apply(&mut vrf, "c", &["10.0.3.0/24"]);
    assert_eq!(vrf.node_routes("c").map(|w| w.route_id), Some(1));
}

#[test]
fn next_hop_matches_family() {
    let mut vrf = Vrf::new("global");
    let addrs = NodeAddresses {
        v4: Some(Ipv4Addr::new(192, 168, 0, 10)),
        v6: Some(Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 10)),
    };
    vrf.apply_node(
        CLUSTER,
        "a",
        &cidrs(&["10.0.1.0/24", "fd00:10:244::/64"]),
        &addrs,
    )
    .expect("routes must build");
    vrf.assert_consistent(CLUSTER);

    let hops = vrf
        .static_routes()
        .iter()
        .map(|r| r.next_hop)
        .collect::<Vec<_>>();
    assert_eq!(
        hops,
        vec![
            IpAddr::from(Ipv4Addr::new(192, 168, 0, 10)),
            IpAddr::from(Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 10)),
        ]
    );
    assert_eq!(
        vrf.static_routes()[0].labels.get("clustername").map(String::as_str),
        Some(CLUSTER)
    );
}

#[rstest]
#[case::missing_mask("10.0.1.0", RouteError::MissingMask("10.0.1.0".to_string()))]
#[case::invalid_mask("10.0.1.0/x", RouteError::InvalidMask("10.0.1.0/x".to_string()))]
#[case::mask_too_long("10.0.1.0/40", RouteError::InvalidMask("10.0.1.0/40".to_string()))]
#[case::invalid_prefix("999.0.1.0/24", RouteError::InvalidPrefix("999.0.1.0/24".to_string()))]
fn malformed_cidr_is_rejected(#[case] cidr: &str, #[case] expected: RouteError) {
    let mut vrf = Vrf::new("global");
    apply(&mut vrf, "a", &["10.0.1.0/24"]);
    let before = vrf.clone();

    let err = vrf
        .apply_node(CLUSTER, "b", &cidrs(&["10.0.2.0/24", cidr]), &v4_node())
        .expect_err("must fail");
    assert_eq!(err, expected);
    assert_eq!(vrf, before);

    // An update that fails leaves the node's routes as they were.
    vrf.apply_node(CLUSTER, "a", &cidrs(&[cidr]), &v4_node())
        .expect_err("must fail");
    assert_eq!(vrf, before);
}

#[test]
fn cidr_of_unknown_family_is_skipped() {
    let mut vrf = Vrf::new("global");
    apply(&mut vrf, "a", &["10.0.1.0/24", "garbage/24", "10.0.2.0/24"]);
    assert_eq!(
        vrf.node_routes("a").map(|w| (w.start, w.count, w.route_id)),
        Some((0, 2, 1))
    );
    assert_eq!(names(&vrf), vec!["cluster-1", "cluster-2"]);
}

#[test]
fn node_without_addresses_is_rejected() {
    let mut vrf = Vrf::new("global");
    let err = vrf
        .apply_node(CLUSTER, "a", &cidrs(&["10.0.1.0/24"]), &NodeAddresses::default())
        .expect_err("must fail");
    assert_eq!(err, RouteError::NoNodeAddress("a".to_string()));
    assert!(vrf.nodes().is_empty());

    apply(&mut vrf, "b", &["10.0.2.0/24"]);
    assert_eq!(vrf.node_routes("b").map(|w| w.route_id), Some(1));
}

#[test]
fn overlapping_prefix_is_skipped() {
    let mut vrf = Vrf::new("global");
    apply(&mut vrf, "a", &["10.0.1.0/24"]);
    apply(&mut vrf, "b", &["10.0.1.0/24"]);
    assert_eq!(vrf.node_routes("b"), None);
    assert_eq!(vrf.static_routes().len(), 1);

    apply(&mut vrf, "c", &["10.0.3.0/24"]);
    assert_eq!(vrf.node_routes("c").map(|w| w.route_id), Some(2));

    // A node may keep its own prefix across updates.
    apply(&mut vrf, "a", &["10.0.1.0/24", "10.9.1.0/24"]);
    assert_eq!(vrf.node_routes("a").map(|w| w.count), Some(2));
}

#[test]
fn updates_are_not_checked_for_overlap() {
    let mut vrf = Vrf::new("global");
    apply(&mut vrf, "a", &["10.0.1.0/24"]);
    apply(&mut vrf, "b", &["10.0.2.0/24"]);

    apply(&mut vrf, "b", &["10.0.1.0/24", "10.0.3.0/24"]);
    let prefixes = vrf
        .static_routes()
        .iter()
        .map(|r| r.prefix.to_string())
        .collect::<Vec<_>>();
    assert_eq!(prefixes, vec!["10.0.1.0/24", "10.0.1.0/24", "10.0.3.0/24"]);
    assert_eq!(vrf.node_routes("b").map(|w| w.count), Some(2));
}

#[test]
fn deleting_an_unknown_node_is_a_no_op() {
    let mut vrf = Vrf::new("global");
    apply(&mut vrf, "a", &["10.0.1.0/24"]);
    let before = vrf.clone();
    assert!(!vrf.delete_node(CLUSTER, "b"));
    assert_eq!(vrf, before);
}

#[test]
fn windows_stay_consistent_across_operations() {
    let mut vrf = Vrf::new("global");
    let subnets = |node: usize, n: usize| {
        (0..n)
            .map(|i| format!("10.{node}.{i}.0/24"))
            .collect::<Vec<_>>()
    };

    // Add, resize, and delete nodes in an interleaved order.
    let ops: &[(usize, Option<usize>)] = &[
        (0, Some(1)),
        (1, Some(3)),
        (2, Some(2)),
        (3, Some(1)),
        (1, Some(1)),
        (0, None),
        (4, Some(2)),
        (2, Some(4)),
        (3, None),
        (5, Some(1)),
        (1, Some(0)),
        (0, Some(2)),
        (4, None),
        (2, None),
    ];
    for (node, op) in ops {
        let name = format!("node-{node}");
        match op {
            Some(n) => {
                let cidrs = subnets(*node, *n);
                vrf.apply_node(CLUSTER, &name, &cidrs, &v4_node())
                    .expect("routes must build");
            }
            None => {
                vrf.delete_node(CLUSTER, &name);
            }
        }
        vrf.assert_consistent(CLUSTER);
    }
    assert_eq!(vrf.nodes(), ["node-5".to_string(), "node-0".to_string()]);
    assert_eq!(names(&vrf), vec!["cluster-1", "cluster-2", "cluster-3"]);
}

#[test]
fn checksum_follows_route_changes() {
    let mut model = GraphModel::new("admin/global");
    model.vrf_mut("global");
    let empty = model.checksum();

    let vrf = model.vrf_mut("global");
    apply(vrf, "a", &["10.0.1.0/24"]);
    let one = model.checksum();
    assert_ne!(empty, one);

    let vrf = model.vrf_mut("global");
    delete(vrf, "a");
    assert_eq!(model.checksum(), empty);
}
