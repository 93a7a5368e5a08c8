use super::*;
use ingress_controller_core::{HostRecord, InfraOverride, Policy, ShardSize};
use maplit::btreemap;
use pretty_assertions::assert_eq;

fn has_host(vs: &graph::VirtualService, host: &str) -> bool {
    vs.fqdns.iter().any(|f| f == host)
        || vs.pools.iter().any(|p| p.host == host)
        || vs.sni_children.iter().any(|c| c.host == host)
        || vs.redirects.iter().any(|r| r.host == host)
}

#[test]
fn insecure_host_is_recorded_and_published() {
    let test = Harness::new(cluster());
    let obj = ObjectRef::new("ns", "ing");
    let changed = test.apply(&obj, Input::ingress().insecure("foo.com", &[("/", "svc1")]).build());

    let model = test.l7_model("foo.com");
    assert_eq!(changed, vec![model.clone()]);
    assert_eq!(test.published(), vec![model.clone()]);
    assert_eq!(
        test.record(&obj, "foo.com"),
        Some(HostRecord {
            insecure_policy: Policy::Allow,
            secure_policy: Policy::None,
            path_svc: btreemap! { "/".to_string() => vec!["svc1".to_string()] },
        })
    );

    let vs = test.vs(&model).expect("shard must exist");
    assert_eq!(vs.fqdns, vec!["foo.com".to_string()]);
    assert_eq!(vs.pools.len(), 1);
    assert_eq!(vs.pools[0].owner, "ns/ing");
    assert_eq!(test.reconciler.host_paths().owners("foo.com", "/"), vec!["ns/ing"]);
}

#[test]
fn unchanged_input_publishes_nothing() {
    let test = Harness::new(cluster());
    let obj = ObjectRef::new("ns", "ing");
    let input = Input::ingress()
        .insecure("foo.com", &[("/", "svc1")])
        .tls("bar-tls", "bar.com", &[("/", "svc2")], true)
        .build();
    assert!(!test.apply(&obj, input.clone()).is_empty());
    test.published();

    assert!(test.apply(&obj, input).is_empty());
    assert!(test.published().is_empty());
}

#[test]
fn host_with_insecure_and_redirecting_tls_paths_is_stable() {
    let test = Harness::new(cluster());
    let obj = ObjectRef::new("ns", "ing");
    let input = Input::ingress()
        .insecure("foo.com", &[("/a", "svc1")])
        .tls("foo-tls", "foo.com", &[("/b", "svc2")], true)
        .build();
    let model = test.l7_model("foo.com");
    assert_eq!(test.apply(&obj, input.clone()), vec![model.clone()]);
    test.published();

    for _ in 0..2 {
        assert!(test.apply(&obj, input.clone()).is_empty());
        assert!(test.published().is_empty());

        let vs = test.vs(&model).expect("shard");
        assert_eq!(vs.redirects.len(), 1);
        assert_eq!(vs.redirects[0].host, "foo.com");
        assert_eq!(vs.pools.len(), 1);
        assert_eq!(vs.sni_children.len(), 1);
    }

    let record = test.record(&obj, "foo.com").expect("record");
    assert_eq!(record.insecure_policy, Policy::Allow);
    assert_eq!(record.secure_policy, Policy::EdgeTerminate);
}

#[test]
fn removed_host_is_reclaimed() {
    let test = Harness::new(cluster());
    let obj = ObjectRef::new("ns", "ing");
    test.apply(
        &obj,
        Input::ingress()
            .insecure("foo.com", &[("/", "svc1")])
            .insecure("bar.com", &[("/", "svc2")])
            .build(),
    );
    test.published();

    test.apply(&obj, Input::ingress().insecure("bar.com", &[("/", "svc2")]).build());
    let model = test.l7_model("foo.com");
    assert!(test.published().contains(&model));
    assert_eq!(test.record(&obj, "foo.com"), None);
    assert!(!has_host(&test.vs(&model).expect("shard must exist"), "foo.com"));
    assert!(has_host(
        &test.vs(&test.l7_model("bar.com")).expect("shard must exist"),
        "bar.com"
    ));
    assert!(test.reconciler.host_paths().owners("foo.com", "/").is_empty());
}

#[test]
fn removed_path_keeps_host() {
    let test = Harness::new(cluster());
    let obj = ObjectRef::new("ns", "ing");
    test.apply(
        &obj,
        Input::ingress()
            .insecure("foo.com", &[("/", "svc1"), ("/api", "api")])
            .build(),
    );
    test.apply(&obj, Input::ingress().insecure("foo.com", &[("/", "svc1")]).build());

    let vs = test.vs(&test.l7_model("foo.com")).expect("shard must exist");
    assert_eq!(
        vs.pools.iter().map(|p| p.path.as_str()).collect::<Vec<_>>(),
        vec!["/"]
    );
    assert_eq!(vs.fqdns, vec!["foo.com".to_string()]);
    assert_eq!(
        test.record(&obj, "foo.com").map(|r| r.path_svc),
        Some(btreemap! { "/".to_string() => vec!["svc1".to_string()] })
    );
}

#[test]
fn route_diff_removes_dropped_services() {
    let test = Harness::new(cluster());
    let obj = ObjectRef::new("ns", "route");
    test.apply(
        &obj,
        Input::route()
            .insecure("foo.com", &[("/", "a"), ("/", "b")])
            .build(),
    );
    let model = test.l7_model("foo.com");
    assert_eq!(test.vs(&model).expect("shard").pools.len(), 2);

    test.apply(&obj, Input::route().insecure("foo.com", &[("/", "a")]).build());
    let vs = test.vs(&model).expect("shard");
    assert_eq!(
        vs.pools.iter().map(|p| p.service.as_str()).collect::<Vec<_>>(),
        vec!["a"]
    );
    assert_eq!(vs.fqdns, vec!["foo.com".to_string()]);
}

#[test]
fn insecure_to_secure_keeps_fqdn_and_redirect() {
    let test = Harness::new(cluster());
    let obj = ObjectRef::new("ns", "ing");
    test.apply(&obj, Input::ingress().insecure("foo.com", &[("/", "svc1")]).build());
    test.apply(
        &obj,
        Input::ingress()
            .tls("foo-tls", "foo.com", &[("/", "svc1")], true)
            .build(),
    );

    let vs = test.vs(&test.l7_model("foo.com")).expect("shard must exist");
    assert!(vs.pools.is_empty());
    assert_eq!(vs.sni_children.len(), 1);
    assert_eq!(vs.sni_children[0].certificate, "foo-tls");
    assert_eq!(vs.fqdns, vec!["foo.com".to_string()]);
    assert_eq!(vs.redirects.len(), 1);

    let record = test.record(&obj, "foo.com").expect("record");
    assert_eq!(record.insecure_policy, Policy::Redirect);
    assert_eq!(record.secure_policy, Policy::EdgeTerminate);
}

#[test]
fn secure_to_insecure_drops_tls_objects() {
    let test = Harness::new(cluster());
    let obj = ObjectRef::new("ns", "ing");
    test.apply(
        &obj,
        Input::ingress()
            .tls("foo-tls", "foo.com", &[("/", "svc1")], true)
            .build(),
    );
    test.apply(&obj, Input::ingress().insecure("foo.com", &[("/", "svc1")]).build());

    let vs = test.vs(&test.l7_model("foo.com")).expect("shard must exist");
    assert!(vs.sni_children.is_empty());
    assert!(vs.redirects.is_empty());
    assert_eq!(vs.pools.len(), 1);
    assert_eq!(vs.fqdns, vec!["foo.com".to_string()]);
}

#[test]
fn passthrough_to_insecure_moves_shards() {
    let test = Harness::new(cluster());
    let obj = ObjectRef::new("ns", "route");
    test.apply(&obj, Input::route().passthrough("foo.com", &["a"], true).build());
    let pass_model = test.passthrough_model("foo.com");
    let pass = test.vs(&pass_model).expect("passthrough shard");
    assert_eq!(pass.fqdns, vec!["foo.com".to_string()]);
    assert_eq!(pass.redirects.len(), 1);
    assert_eq!(
        test.record(&obj, "foo.com").map(|r| r.secure_policy),
        Some(Policy::Pass)
    );
    test.published();

    test.apply(&obj, Input::route().insecure("foo.com", &[("/", "a")]).build());
    let published = test.published();
    assert!(published.contains(&pass_model));
    assert!(published.contains(&test.l7_model("foo.com")));
    assert!(test.vs(&pass_model).expect("passthrough shard").is_vacant());
    assert!(has_host(
        &test.vs(&test.l7_model("foo.com")).expect("l7 shard"),
        "foo.com"
    ));
}

#[test]
fn deleted_object_is_fully_reclaimed() {
    let test = Harness::new(cluster());
    let obj = ObjectRef::new("ns", "ing");
    test.apply(
        &obj,
        Input::ingress()
            .insecure("foo.com", &[("/", "svc1")])
            .tls("bar-tls", "bar.com", &[("/", "svc2")], true)
            .build(),
    );
    test.published();

    let changed = test.delete(ObjectKind::Ingress, &obj);
    assert!(changed.contains(&test.l7_model("foo.com")));
    assert!(changed.contains(&test.l7_model("bar.com")));
    assert_eq!(test.stored(&obj), None);
    assert!(test.states.is_empty());
    assert!(!has_host(&test.vs(&test.l7_model("foo.com")).expect("shard"), "foo.com"));
    assert!(!has_host(&test.vs(&test.l7_model("bar.com")).expect("shard"), "bar.com"));
    assert!(test.reconciler.host_paths().paths("foo.com").is_empty());

    // Deleting again is a no-op.
    assert!(test.delete(ObjectKind::Ingress, &obj).is_empty());
}

#[test]
fn full_sync_returns_changes_without_publishing() {
    let test = Harness::new(cluster());
    let obj = ObjectRef::new("ns", "ing");
    test.source.objects.lock().insert(
        (ObjectKind::Ingress, obj.clone()),
        Input::ingress().insecure("foo.com", &[("/", "svc1")]).build(),
    );
    let changed = test
        .reconciler
        .reconcile_object(ObjectKind::Ingress, &obj, true)
        .expect("reconcile must succeed");
    assert_eq!(changed, vec![test.l7_model("foo.com")]);
    assert!(test.published().is_empty());
}

#[test]
fn infra_override_migrates_hosts() {
    let test = Harness::new(cluster());
    let obj = ObjectRef::new("ns", "ing");
    let input = Input::ingress().insecure("foo.com", &[("/", "svc1")]).build();
    test.apply(&obj, input.clone());
    test.published();

    let infra = InfraOverride {
        name: "blue".to_string(),
        shard_size: Some(ShardSize::Dedicated),
        se_group: Some("blue-seg".to_string()),
        ..Default::default()
    };
    test.infra.set_override(obj.clone(), infra.clone());
    test.apply(&obj, input.clone());

    let shared = test.l7_model("foo.com");
    let dedicated = "admin/cluster--blue-foo.com-L7-dedicated".to_string();
    let published = test.published();
    assert!(published.contains(&shared));
    assert!(published.contains(&dedicated));

    assert!(!has_host(&test.vs(&shared).expect("shared shard"), "foo.com"));
    let vs = test.vs(&dedicated).expect("dedicated shard");
    assert_eq!(vs.fqdns, vec!["foo.com".to_string()]);
    assert_eq!(vs.se_group, "blue-seg");
    assert_eq!(test.stored(&obj).and_then(|s| s.infra), Some(infra));

    assert!(test.apply(&obj, input.clone()).is_empty());

    // Dropping the override moves the host back and tears the dedicated shard down.
    test.infra.clear_override(&obj);
    test.apply(&obj, input);
    assert!(test.published().contains(&dedicated));
    assert!(test.vs(&dedicated).is_none());
    assert!(has_host(&test.vs(&shared).expect("shared shard"), "foo.com"));
    assert_eq!(test.stored(&obj).and_then(|s| s.infra), None);
}

#[test]
fn tenant_change_migrates_hosts() {
    let test = Harness::new(cluster());
    let obj = ObjectRef::new("ns", "ing");
    let input = Input::ingress().insecure("foo.com", &[("/", "svc1")]).build();
    test.apply(&obj, input.clone());
    let old_model = test.l7_model("foo.com");

    test.infra.set_tenant("ns", "red");
    test.apply(&obj, input);
    let new_model = old_model.replacen("admin/", "red/", 1);
    assert!(!has_host(&test.vs(&old_model).expect("old shard"), "foo.com"));
    assert!(has_host(&test.vs(&new_model).expect("new shard"), "foo.com"));
    assert_eq!(
        test.stored(&obj).and_then(|s| s.tenant).as_deref(),
        Some("red")
    );
}

#[test]
fn override_fields_apply_to_existing_shards() {
    let test = Harness::new(cluster());
    let a = ObjectRef::new("ns", "a");
    let b = ObjectRef::new("ns", "b");
    test.apply(&a, Input::ingress().insecure("foo.com", &[("/", "svc1")]).build());

    // Namespace-scoped overrides do not rename shards, so `b` lands on `a`'s shard.
    test.infra.set_override(
        b.clone(),
        InfraOverride {
            name: "ns-scoped".to_string(),
            namespace_scoped: true,
            vip_network: Some("vip-net".to_string()),
            ..Default::default()
        },
    );
    test.apply(&b, Input::ingress().insecure("foo.com", &[("/b", "svc2")]).build());

    let vs = test.vs(&test.l7_model("foo.com")).expect("shard");
    assert_eq!(vs.vip_network.as_deref(), Some("vip-net"));
    assert_eq!(vs.pools.len(), 2);
    assert_eq!(test.reconciler.host_paths().paths("foo.com"), vec!["/", "/b"]);
}

#[test]
fn objects_sharing_a_shard_publish_it_once() {
    let test = Harness::new(ClusterInfo {
        shard_size: ShardSize::Small,
        ..cluster()
    });
    let obj = ObjectRef::new("ns", "ing");
    let changed = test.apply(
        &obj,
        Input::ingress()
            .insecure("a.com", &[("/", "svc")])
            .insecure("b.com", &[("/", "svc")])
            .insecure("c.com", &[("/", "svc")])
            .build(),
    );
    assert_eq!(changed, vec!["admin/cluster--Shared-L7-0".to_string()]);
    assert_eq!(test.published().len(), 1);
}
