use gatehouse_authz::{AuthzConfig, AuthzError, Model, PolicyStore};

const TENANT_DOCUMENT: &str = r#"
policies:
  - { subject: operator, domain: acme, object: "/queues/:name", action: "*" }
  - { subject: operator, domain: acme, object: "/queues/audit", action: purge, effect: deny }
  - { subject: viewer, domain: globex, object: "/queues/:name", action: read }
groupings:
  - { child: alice, parent: operator, domain: acme }
  - { child: alice, parent: viewer, domain: globex }
"#;

#[tokio::test]
async fn tenant_rows_stay_inside_their_domain() {
    let mut store = PolicyStore::new();
    store.load_yaml(TENANT_DOCUMENT).expect("load document");
    let evaluator = store
        .build_evaluator(&Model::default_domain_rbac())
        .await
        .expect("evaluator");

    assert!(evaluator.allowed_in("alice", "acme", "/queues/orders", "publish"));
    assert!(!evaluator.allowed_in("alice", "acme", "/queues/audit", "purge"));
    assert!(evaluator.allowed_in("alice", "globex", "/queues/orders", "read"));
    assert!(!evaluator.allowed_in("alice", "globex", "/queues/orders", "publish"));
    assert!(!evaluator.allowed_in("alice", "initech", "/queues/orders", "read"));

    assert_eq!(evaluator.implicit_roles("alice", Some("acme")), vec!["operator"]);
    assert_eq!(evaluator.implicit_roles("alice", Some("globex")), vec!["viewer"]);
    assert!(evaluator.implicit_roles("alice", Some("initech")).is_empty());

    let acme = evaluator.implicit_permissions("alice", Some("acme"));
    assert_eq!(
        acme,
        vec![("/queues/:name".to_string(), "*".to_string())]
    );
}

#[tokio::test]
async fn global_rows_apply_in_every_domain() {
    let mut store = PolicyStore::new();
    store
        .load_yaml(
            r#"
policies:
  - { subject: editor, domain: acme, object: doc, action: read }
  - { subject: publisher, domain: acme, object: doc, action: publish }
  - { subject: auditor, object: "/logs/*", action: read }
groupings:
  - { child: alice, parent: editor }
  - { child: editor, parent: publisher, domain: acme }
  - { child: carol, parent: auditor }
"#,
        )
        .expect("load document");
    let evaluator = store
        .build_evaluator(&Model::default_domain_rbac())
        .await
        .expect("global rows build under the domain model");

    assert!(evaluator.allowed_in("alice", "acme", "doc", "read"));
    assert!(evaluator.allowed_in("alice", "acme", "doc", "publish"));
    assert!(!evaluator.allowed_in("alice", "globex", "doc", "read"));
    assert!(!evaluator.allowed_in("editor", "globex", "doc", "publish"));

    for domain in ["acme", "globex", "initech"] {
        assert!(evaluator.allowed_in("carol", domain, "/logs/2024", "read"), "{domain}");
        assert!(!evaluator.allowed_in("carol", domain, "/logs/2024", "delete"), "{domain}");
    }

    let mut roles = evaluator.implicit_roles("alice", Some("acme"));
    roles.sort();
    assert_eq!(roles, vec!["editor", "publisher"]);
}

#[tokio::test]
async fn rejected_document_leaves_store_untouched() {
    let mut store = PolicyStore::new();
    store.load_yaml(TENANT_DOCUMENT).expect("load document");
    let revision = store.revision();

    let err = store
        .load_yaml("policies: [{ subject: a, object: b, action: c, effect: maybe }]\n")
        .expect_err("unknown effect");
    assert!(matches!(err, AuthzError::PolicyDocument(_)));
    assert_eq!(store.revision(), revision);
}

#[tokio::test]
async fn model_file_from_config_is_used() {
    let dir = std::env::temp_dir().join(format!("gatehouse-model-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("model.conf");
    std::fs::write(&path, gatehouse_authz::default_model_string()).expect("write model");

    let mut config = AuthzConfig::default();
    config
        .apply_yaml(&format!(
            "model_path: {}\nstrict_model: true\n",
            path.display()
        ))
        .expect("apply yaml");
    let model = config.load_model().expect("load model");
    assert_eq!(model, Model::default_rbac());

    std::fs::write(&path, "[matchers]\nnot a definition\n").expect("rewrite model");
    assert!(matches!(
        config.load_model(),
        Err(AuthzError::MalformedModelLine { .. })
    ));

    config.strict_model = false;
    let lenient = config.load_model().expect("lenient load");
    assert!(!lenient.has_definition("m"));

    std::fs::remove_dir_all(&dir).ok();
}
