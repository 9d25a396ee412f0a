//! Error classification, status conditions and requeue behavior.

use super::*;
use agent_pool_controller::crd::AgentToken;
use agent_pool_controller::runtime::error_policy::handle_reconciliation_error;

fn backoff(seconds: u64) -> Action {
    Action::requeue(Duration::from_secs(seconds))
}

#[tokio::test]
async fn test_organization_change_is_terminal_drift() {
    let harness = Harness::new(&["a"]);
    harness.converge().await;
    harness.journal.clear();

    harness
        .cluster
        .edit_spec(|pool| pool.spec.organization = "globex".to_string());
    assert_eq!(harness.reconcile().await.unwrap(), backoff(5));

    let pool = harness.pool();
    assert_eq!(ready_condition(&pool), ("False".to_string(), "TerminalDrift".to_string()));
    assert_eq!(pool.status.unwrap().observed_generation, 1);
    assert!(harness.journal.entries().is_empty());
    assert_eq!(harness.tfc.pools().len(), 1);

    assert_eq!(harness.reconcile().await.unwrap(), backoff(10));

    harness
        .cluster
        .edit_spec(|pool| pool.spec.organization = "acme".to_string());
    harness.converge().await;
    let pool = harness.pool();
    assert_eq!(ready_condition(&pool).0, "True");
    assert_eq!(pool.status.unwrap().observed_generation, 3);
}

#[tokio::test]
async fn test_invalid_spec_is_reported_without_remote_calls() {
    let harness = Harness::new(&["a"]);
    harness
        .cluster
        .edit_spec(|pool| pool.spec.organization = "acme corp".to_string());

    assert_eq!(harness.reconcile().await.unwrap(), backoff(5));

    assert_eq!(harness.journal.entries(), vec!["add_finalizer"]);
    assert!(harness.tfc.pools().is_empty());
    assert_eq!(
        ready_condition(&harness.pool()),
        ("False".to_string(), "InvalidSpec".to_string())
    );
}

#[tokio::test]
async fn test_token_name_unusable_as_secret_key_is_never_issued() {
    let harness = Harness::new(&["a"]);
    harness.converge().await;
    harness.journal.clear();

    harness.cluster.edit_spec(|pool| {
        pool.spec.agent_tokens = Some(vec![AgentToken::named("a"), AgentToken::named("ci/runner")]);
    });
    assert_eq!(harness.reconcile().await.unwrap(), backoff(5));
    assert_eq!(harness.reconcile().await.unwrap(), backoff(10));

    assert!(harness
        .journal
        .entries()
        .iter()
        .all(|entry| !entry.starts_with("create_token") && !entry.starts_with("revoke_token")));
    assert_eq!(harness.tfc.token_names("apool-1"), vec!["a"]);
    assert_eq!(
        ready_condition(&harness.pool()),
        ("False".to_string(), "InvalidSpec".to_string())
    );
}

#[tokio::test]
async fn test_missing_credentials_are_reported() {
    let harness = Harness::new(&["a"]);
    harness.credentials.set_unavailable(true);

    assert_eq!(harness.reconcile().await.unwrap(), backoff(5));
    assert_eq!(
        ready_condition(&harness.pool()),
        ("False".to_string(), "CredentialsUnavailable".to_string())
    );

    harness.credentials.set_unavailable(false);
    harness.converge().await;
    assert_eq!(ready_condition(&harness.pool()).0, "True");
}

#[tokio::test]
async fn test_rejected_request_is_reported() {
    let harness = Harness::new(&["a"]);
    harness.tfc.fail("find_pool", Failure::Rejected);

    assert_eq!(harness.reconcile().await.unwrap(), backoff(5));
    assert_eq!(
        ready_condition(&harness.pool()),
        ("False".to_string(), "APIRequestRejected".to_string())
    );
}

#[tokio::test]
async fn test_transient_error_leaves_status_untouched() {
    let harness = Harness::new(&["a"]);
    harness.tfc.fail("create_pool", Failure::Transient);

    let err = harness.reconcile().await.unwrap_err();

    assert!(err.is_transient());
    assert!(!err.is_terminal());
    assert!(harness.pool().status.is_none());
    assert_eq!(harness.cluster.status_writes(), 0);

    let ctx = harness.reconciler.clone();
    let pool = Arc::new(harness.pool());
    assert_eq!(handle_reconciliation_error(pool.clone(), &err, ctx.clone()), backoff(5));
    assert_eq!(handle_reconciliation_error(pool, &err, ctx), backoff(10));
}

#[tokio::test]
async fn test_status_conflict_retries_quickly_and_adopts_created_pool() {
    let harness = Harness::new(&["a"]);
    harness.cluster.conflict_next_status_write();

    let err = harness.reconcile().await.unwrap_err();

    assert!(matches!(err, ReconcilerError::Conflict(_)));
    assert_eq!(
        handle_reconciliation_error(Arc::new(harness.pool()), &err, harness.reconciler.clone()),
        Action::requeue(Duration::from_secs(1))
    );

    harness.converge().await;
    assert_eq!(harness.journal.matching("create_pool").len(), 1);
    assert_eq!(harness.pool().status.unwrap().agent_pool_id, "apool-1");
    assert_eq!(harness.tfc.token_names("apool-1"), vec!["a"]);
}

#[tokio::test]
async fn test_secret_store_failure_revokes_issued_token() {
    let harness = Harness::new(&["a"]);
    harness.cluster.fail_secret_persist(true);

    let err = harness.reconcile().await.unwrap_err();

    assert!(matches!(err, ReconcilerError::SecretStore { .. }));
    assert_eq!(
        harness.journal.entries(),
        vec![
            "add_finalizer",
            "create_pool builders",
            "create_token a",
            "revoke_token a at-2",
        ]
    );
    assert!(harness.tfc.token_names("apool-1").is_empty());
    assert!(tracked_tokens(&harness.pool()).is_empty());

    harness.cluster.fail_secret_persist(false);
    harness.converge().await;
    assert_eq!(tracked_tokens(&harness.pool()), vec!["a"]);
}

#[tokio::test]
async fn test_partial_token_progress_is_recorded() {
    let harness = Harness::new(&["a", "b"]);
    harness.tfc.fail("create_token:b", Failure::Transient);

    assert!(harness.reconcile().await.is_err());

    let pool = harness.pool();
    assert_eq!(tracked_tokens(&pool), vec!["a"]);
    assert_eq!(pool.status.unwrap().observed_generation, 0);

    harness.tfc.clear_failures();
    harness.journal.clear();
    harness.converge().await;

    assert_eq!(harness.journal.matching("create_token"), vec!["create_token b"]);
    assert_eq!(tracked_tokens(&harness.pool()), vec!["a", "b"]);
}
