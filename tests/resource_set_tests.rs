//! Resource collection invariants, end to end

use deckhand::error::ResourceError;
use deckhand::resources::{
    Binding, Client, Hook, PatternSet, Resource, ResourceSet, Role, Secret, WorkerPool,
};
use rstest::rstest;
use serde_json::json;

fn role(id: &str, scopes: &[&str]) -> Resource {
    Resource::Role(Role::new(
        id,
        "test role",
        scopes.iter().map(|s| s.to_string()).collect(),
    ))
}

fn every_kind() -> Vec<Resource> {
    vec![
        role("proj/admin", &["queue:*"]),
        Resource::Client(Client::new("proj/ci", "ci client", vec![])),
        Resource::Hook(Hook {
            hook_group_id: "proj".into(),
            hook_id: "nightly".into(),
            name: "nightly".into(),
            description: "runs nightly".into(),
            owner: "ops@example.com".into(),
            email_on_error: false,
            schedule: vec!["0 0 4 * * *".into()],
            bindings: vec![Binding {
                exchange: "exchange/builds".into(),
                routing_key_pattern: "#".into(),
            }],
            task: json!({"payload": {}}),
            trigger_schema: json!({}),
        }),
        Resource::WorkerPool(WorkerPool {
            worker_pool_id: "proj/ci-small".into(),
            description: "small ci pool".into(),
            owner: "ops@example.com".into(),
            config: json!({"maxCapacity": 5}),
            email_on_error: false,
            provider_id: "cloud-a".into(),
        }),
        Resource::Secret(Secret::new("proj/deploy-key")),
    ]
}

#[test]
fn every_kind_is_rejected_when_unmanaged() {
    for resource in every_kind() {
        let mut set = ResourceSet::new();
        set.manage("Role=some-other-namespace/*").unwrap();

        let err = set.add(resource.clone()).unwrap_err();
        match err {
            ResourceError::Unmanaged { id } => assert_eq!(id, resource.id()),
            other => panic!("expected Unmanaged for {}, got {:?}", resource.id(), other),
        }
        assert!(set.is_empty(), "{} leaked into the set", resource.id());
    }
}

#[test]
fn every_kind_round_trips_through_the_document_form() {
    let mut set = ResourceSet::new();
    set.manage("Role=proj/*").unwrap();
    set.manage("Client=proj/*").unwrap();
    set.manage("Hook=proj/*").unwrap();
    set.manage("WorkerPool=proj/*").unwrap();
    set.manage("Secret=proj/*").unwrap();
    set.update(every_kind()).unwrap();

    let document = serde_json::to_value(&set).unwrap();
    let back: ResourceSet = serde_json::from_value(document).unwrap();
    assert_eq!(back, set);
}

#[test]
fn document_output_is_sorted_by_id() {
    let mut set = ResourceSet::new();
    set.manage("*").unwrap();
    set.update(every_kind()).unwrap();

    let document = serde_json::to_value(&set).unwrap();
    let ids: Vec<String> = document["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| serde_json::from_value::<Resource>(r.clone()).unwrap().id())
        .collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[test]
fn merging_roles_collapses_subsumed_scopes() {
    let mut set = ResourceSet::new();
    set.manage("Role=r").unwrap();
    set.add(role("r", &["a", "b*"])).unwrap();
    set.add(role("r", &["a", "bcdef", "c*"])).unwrap();

    match set.get("Role=r").unwrap() {
        Resource::Role(merged) => assert_eq!(merged.scopes, vec!["a", "b*", "c*"]),
        other => panic!("unexpected kind: {}", other.kind()),
    }
}

#[test]
fn merge_order_does_not_matter() {
    let forward = {
        let mut set = ResourceSet::new();
        set.manage("Role=r").unwrap();
        set.add(role("r", &["a", "b*"])).unwrap();
        set.add(role("r", &["a", "bcdef", "c*"])).unwrap();
        set
    };
    let reverse = {
        let mut set = ResourceSet::new();
        set.manage("Role=r").unwrap();
        set.add(role("r", &["a", "bcdef", "c*"])).unwrap();
        set.add(role("r", &["a", "b*"])).unwrap();
        set
    };
    assert_eq!(forward, reverse);
}

#[rstest]
#[case("Role=proj/*", "Role=proj/worker", true)]
#[case("Role=proj/*", "Role=proj/", true)]
#[case("Role=proj/*", "Role=proj", false)]
#[case("Role=proj/*", "Role=other/worker", false)]
#[case("*", "anything=at/all", true)]
fn star_patterns_match_by_literal_prefix(
    #[case] pattern: &str,
    #[case] id: &str,
    #[case] expected: bool,
) {
    let set = PatternSet::new([pattern]).unwrap();
    assert_eq!(set.matches(id), expected);
}

#[test]
fn pattern_sets_stay_minimal_under_any_add_sequence() {
    // every permutation of these adds must land on the same minimal set
    let patterns = ["Role=a/*", "Role=a/narrow", "Role=a/narrow-too", "Role=b"];
    let expected = vec!["Role=a/*", "Role=b"];

    let mut order: Vec<usize> = (0..patterns.len()).collect();
    // Heap's algorithm, iterative
    let mut c = vec![0usize; patterns.len()];
    let mut check = |order: &[usize]| {
        let mut set = PatternSet::empty();
        for &i in order {
            set.add(patterns[i]).unwrap();
        }
        assert_eq!(set.sorted_sources(), expected, "order {:?}", order);
    };
    check(&order);
    let mut i = 0;
    while i < patterns.len() {
        if c[i] < i {
            if i % 2 == 0 {
                order.swap(0, i);
            } else {
                order.swap(c[i], i);
            }
            check(&order);
            c[i] += 1;
            i = 0;
        } else {
            c[i] = 0;
            i += 1;
        }
    }
}

#[test]
fn pattern_minimization_is_idempotent() {
    let set = PatternSet::new(["Role=a/*", "Role=a/x", "Role=b*"]).unwrap();
    let again = PatternSet::new(set.sorted_sources()).unwrap();
    assert_eq!(set, again);
}

#[test]
fn duplicate_unmergeable_kinds_fail_loudly() {
    let mut set = ResourceSet::new();
    set.manage("Hook=proj/*").unwrap();
    let hook = every_kind().remove(2);
    set.add(hook.clone()).unwrap();

    let err = set.add(hook).unwrap_err();
    assert!(matches!(err, ResourceError::Duplicate { kind: "Hook", .. }));
}

#[test]
fn filter_and_map_compose_without_touching_ownership() {
    let mut set = ResourceSet::new();
    set.manage("Role=proj/*").unwrap();
    set.add(role("proj/a", &["s1"])).unwrap();
    set.add(role("proj/b", &["s2"])).unwrap();

    let transformed = set
        .filter("proj/a")
        .unwrap()
        .map(|r| match r {
            Resource::Role(mut role) => {
                role.scopes.push("extra".into());
                Resource::Role(role)
            }
            other => other,
        })
        .unwrap();

    assert_eq!(transformed.len(), 1);
    // ownership survives both derivations
    assert!(transformed.is_managed("Role=proj/b"));
    match transformed.get("Role=proj/a").unwrap() {
        Resource::Role(r) => assert!(r.scopes.contains(&"extra".to_string())),
        other => panic!("unexpected kind: {}", other.kind()),
    }
}
