use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use gatehouse_authz::{
    AccessAttempt, AuthzConfig, AuthzContext, BasicPrincipal, CompositeOwnershipProvider, Effect,
    GroupingPolicy, Model, OwnerLookupProvider, OwnershipProvider, OwnershipRegistry, Params,
    Permission, Policy, PolicyStore, Principal, Privilege, REASON_CANCELLED, REASON_UNSATISFIED,
    Requirement, ResourceId, SuperadminOwnershipProvider,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct CountingProvider {
    answer: bool,
    calls: AtomicUsize,
}

impl CountingProvider {
    fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OwnershipProvider for CountingProvider {
    async fn check(&self, _: &dyn Principal, _: &str, _: &ResourceId) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

struct StalledProvider;

#[async_trait]
impl OwnershipProvider for StalledProvider {
    async fn check(&self, _: &dyn Principal, _: &str, _: &ResourceId) -> bool {
        tokio::time::sleep(Duration::from_secs(30)).await;
        true
    }
}

fn task_owners(id: ResourceId) -> BoxFuture<'static, Option<String>> {
    async move {
        match id.as_str() {
            "t-1" => Some("alice".to_string()),
            "t-2" => Some("bob".to_string()),
            _ => None,
        }
    }
    .boxed()
}

fn task_params(id: &str) -> Params {
    Params::from([("task_id".to_string(), id.to_string())])
}

#[tokio::test]
async fn transitive_grouping_chain_inherits_permissions() {
    let mut store = PolicyStore::new();
    store.add_policy("c", "report", "read", Effect::Allow);
    store.add_grouping("a", "b", None).expect("a->b");
    store.add_grouping("b", "c", None).expect("b->c");
    let evaluator = store
        .build_evaluator(&Model::default_rbac())
        .await
        .expect("evaluator");

    assert!(evaluator.allowed("a", "report", "read"));
    assert!(evaluator.allowed("b", "report", "read"));
    assert!(!evaluator.allowed("a", "report", "write"));
}

#[tokio::test]
async fn deep_grouping_chain_inherits_permissions() {
    let mut store = PolicyStore::new();
    for level in 0..15 {
        store
            .add_grouping(format!("team-{level}"), format!("team-{}", level + 1), None)
            .expect("chain link");
    }
    store.add_policy("team-15", "report", "read", Effect::Allow);
    let evaluator = store
        .build_evaluator(&Model::default_rbac())
        .await
        .expect("evaluator");

    for level in 0..=15 {
        let subject = format!("team-{level}");
        assert!(evaluator.allowed(&subject, "report", "read"), "{subject}");
        assert!(
            level == 15
                || evaluator
                    .implicit_roles(&subject, None)
                    .contains(&"team-15".to_string())
        );
    }
}

#[tokio::test]
async fn grouping_cycle_terminates() {
    let mut store = PolicyStore::new();
    store.add_policy("c", "report", "read", Effect::Allow);
    store.add_grouping("a", "b", None).expect("a->b");
    store.add_grouping("b", "c", None).expect("b->c");
    store.add_grouping("c", "a", None).expect("c->a");
    let evaluator = store
        .build_evaluator(&Model::default_rbac())
        .await
        .expect("evaluator");

    assert!(evaluator.allowed("a", "report", "read"));
    assert!(!evaluator.allowed("a", "report", "delete"));
    assert_eq!(evaluator.implicit_roles("a", None).len(), 2);
}

#[tokio::test]
async fn editor_scenario() {
    let mut store = PolicyStore::new();
    store.add_policy("editor", "doc", "read", Effect::Allow);
    store.add_grouping("alice", "editor", None).expect("grouping");
    let evaluator = store
        .build_evaluator(&Model::default_rbac())
        .await
        .expect("evaluator");

    assert!(evaluator.allowed("alice", "doc", "read"));
    assert!(!evaluator.allowed("alice", "doc", "write"));
}

#[tokio::test]
async fn model_text_from_config_file_drives_evaluator() {
    let text = "\
# exact-match model without roles
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act, eft

[policy_effect]
e = some(where (p.eft == allow)) && !some(where (p.eft == deny))

[matchers]
m = r.sub == p.sub && r.obj == p.obj && r.act == p.act
";
    let model = Model::from_text_strict(text).expect("strict parse");
    let mut store = PolicyStore::new();
    store.insert_policy(Policy::allow("svc", "queue", "publish"));
    let evaluator = store.build_evaluator(&model).await.expect("evaluator");

    assert!(evaluator.allowed("svc", "queue", "publish"));
    assert!(!evaluator.allowed("svc", "queue/other", "publish"));
}

#[tokio::test]
async fn superadmin_wrapped_provider_overrides_denial() {
    let inner = CountingProvider::new(false);
    let wrapped = SuperadminOwnershipProvider::new(inner.clone(), "admin");
    let admin = BasicPrincipal::new("root", "admin");

    assert!(
        wrapped
            .check(&admin, "document", &ResourceId::from("d-1"))
            .await
    );
    assert_eq!(inner.calls(), 0);
}

#[tokio::test]
async fn ownership_failure_falls_back_to_permission() {
    let mut store = PolicyStore::new();
    store.add_policy("alice", "task", "update", Effect::Allow);

    let owners = CountingProvider::new(false);
    let mut registry = OwnershipRegistry::new();
    registry.register("task", owners.clone());

    let context = AuthzContext::builder(AuthzConfig::default())
        .policies(store)
        .ownership(registry)
        .build()
        .await
        .expect("context");

    let principal = BasicPrincipal::new("alice", "user");
    let params = task_params("t-2");
    let requirements = [
        Requirement::ownership_of("task", "task_id"),
        Requirement::permission("task", "update"),
    ];
    let decision = context
        .authorize(AccessAttempt::new(&principal, "task", &params), &requirements)
        .await;

    assert!(decision.granted);
    assert_eq!(owners.calls(), 1);
}

#[tokio::test]
async fn owner_lookup_through_context() {
    let mut registry = OwnershipRegistry::new();
    registry.register(
        "task",
        Arc::new(SuperadminOwnershipProvider::new(
            Arc::new(OwnerLookupProvider::new(task_owners)),
            "admin",
        )),
    );
    let context = AuthzContext::builder(AuthzConfig::default())
        .ownership(registry)
        .build()
        .await
        .expect("context");

    let requirements = [Requirement::ownership_of("task", "task_id")];
    let alice = BasicPrincipal::new("alice", "user");
    let root = BasicPrincipal::new("root", "admin");

    let own = task_params("t-1");
    let foreign = task_params("t-2");
    let missing = Params::new();

    let cases = [
        (&alice, &own, true),
        (&alice, &foreign, false),
        (&alice, &missing, false),
        (&root, &foreign, true),
    ];
    for (principal, params, expected) in cases {
        let decision = context
            .authorize(AccessAttempt::new(principal, "task", params), &requirements)
            .await;
        assert_eq!(decision.granted, expected, "{} on {:?}", principal.id, params);
    }
}

#[tokio::test]
async fn composite_all_provider_in_registry() {
    let first = CountingProvider::new(false);
    let second = CountingProvider::new(true);
    let providers: Vec<Arc<dyn OwnershipProvider>> = vec![first.clone(), second.clone()];
    let mut registry = OwnershipRegistry::new();
    registry.register("project", Arc::new(CompositeOwnershipProvider::all(providers)));
    let context = AuthzContext::builder(AuthzConfig::default())
        .ownership(registry)
        .build()
        .await
        .expect("context");

    let principal = BasicPrincipal::new("alice", "user");
    let params = Params::from([("project_id".to_string(), "p-1".to_string())]);
    let decision = context
        .authorize(
            AccessAttempt::new(&principal, "project", &params),
            &[Requirement::ownership_of("project", "project_id")],
        )
        .await;

    assert!(!decision.granted);
    assert_eq!(decision.reason.as_deref(), Some(REASON_UNSATISFIED));
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 0);
}

#[tokio::test]
async fn privilege_bundle_alternatives() {
    let mut store = PolicyStore::new();
    store.add_policy("carol", "task", "assign", Effect::Allow);
    store.add_policy("carol", "task", "close", Effect::Allow);

    let mut registry = OwnershipRegistry::new();
    registry.register("task", Arc::new(OwnerLookupProvider::new(task_owners)));

    let config = AuthzConfig {
        roles: gatehouse_authz::RoleCatalog::new(["admin", "user", "manager"]),
        ..AuthzConfig::default()
    };
    let context = AuthzContext::builder(config)
        .policies(store)
        .ownership(registry)
        .build()
        .await
        .expect("context");

    let manage = Privilege::new("manage_task")
        .with_role("manager")
        .with_permission(Permission::new("task", "assign"))
        .with_permission(Permission::new("task", "close"))
        .with_ownership("task");
    let requirements = [context.privilege(manage).expect("roles known")];

    let params = Params::new();
    let id = ResourceId::from("t-1");
    let manager = BasicPrincipal::new("mallory", "manager");
    let carol = BasicPrincipal::new("carol", "user");
    let alice = BasicPrincipal::new("alice", "user");
    let bob = BasicPrincipal::new("bob", "user");

    for (principal, expected) in [(&manager, true), (&carol, true), (&alice, true), (&bob, false)] {
        let attempt = AccessAttempt::new(principal, "task", &params).with_resource_id(&id);
        let decision = context.authorize(attempt, &requirements).await;
        assert_eq!(decision.granted, expected, "principal {}", principal.id);
    }
}

#[tokio::test]
async fn timeout_cancels_without_granting() {
    let mut registry = OwnershipRegistry::new();
    registry.register("task", Arc::new(StalledProvider));
    let context = AuthzContext::builder(AuthzConfig::default())
        .ownership(registry)
        .build()
        .await
        .expect("context");

    let principal = BasicPrincipal::new("alice", "user");
    let params = task_params("t-1");
    let decision = context
        .authorize_within(
            Duration::from_millis(20),
            AccessAttempt::new(&principal, "task", &params),
            &[Requirement::ownership_of("task", "task_id")],
        )
        .await;

    assert!(!decision.granted);
    assert_eq!(decision.reason.as_deref(), Some(REASON_CANCELLED));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_readers_see_whole_snapshots() {
    let mut store = PolicyStore::new();
    store.add_policy("editor", "doc/*", "read", Effect::Allow);
    store.add_policy("editor", "doc/*", "write", Effect::Allow);
    let context = Arc::new(
        AuthzContext::builder(AuthzConfig::default())
            .policies(store)
            .build()
            .await
            .expect("context"),
    );
    let principal = BasicPrincipal::new("alice", "user");
    let params = Params::new();
    let read = [Requirement::permission("doc/1", "read")];
    let before = context.policies().snapshot();
    assert!(
        !context
            .authorize(AccessAttempt::new(&principal, "doc", &params), &read)
            .await
            .granted
    );

    context
        .policies()
        .add_grouping(GroupingPolicy::new("alice", "editor").expect("grouping"))
        .expect("append");

    let mut tasks = Vec::new();
    for n in 0..16 {
        let context = context.clone();
        let committed_after = before.generation();
        tasks.push(tokio::spawn(async move {
            for _ in 0..50 {
                let snapshot = context.policies().snapshot();
                let object = format!("doc/{n}");
                let read = snapshot.allowed("alice", &object, "read");
                let write = snapshot.allowed("alice", &object, "write");
                let committed = snapshot.generation() > committed_after;
                assert_eq!(read, committed, "read on generation {}", snapshot.generation());
                assert_eq!(write, committed, "write on generation {}", snapshot.generation());
                tokio::task::yield_now().await;
            }
        }));
    }

    let generation = context.commit_policies().await.expect("commit");
    assert!(generation > before.generation());
    for task in tasks {
        task.await.expect("reader");
    }

    assert!(
        context
            .authorize(AccessAttempt::new(&principal, "doc", &params), &read)
            .await
            .granted
    );
    assert!(!before.allowed("alice", "doc/1", "read"));
}
