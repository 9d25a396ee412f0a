//! Pool and token provisioning, and convergence after spec changes.

use super::*;
use agent_pool_controller::crd::AgentToken;
use agent_pool_controller::config::ControllerConfig;
use agent_pool_controller::provider::AgentPoolApi;

#[tokio::test]
async fn test_creates_pool_and_tokens() {
    let harness = Harness::new(&["a", "b"]);

    harness.converge().await;

    assert_eq!(
        harness.journal.entries(),
        vec![
            "add_finalizer",
            "create_pool builders",
            "create_token a",
            "persist_secret a",
            "create_token b",
            "persist_secret b",
        ]
    );

    let pool = harness.pool();
    assert!(has_finalizer(&pool));
    let status = pool.status.clone().unwrap();
    assert_eq!(status.agent_pool_id, "apool-1");
    assert_eq!(status.observed_generation, 1);
    assert_eq!(tracked_tokens(&pool), vec!["a", "b"]);
    assert!(status.agent_tokens.iter().all(|t| !t.id.is_empty()));
    assert_eq!(ready_condition(&pool), ("True".to_string(), "ReconciliationSucceeded".to_string()));

    let secrets = harness.cluster.secrets();
    assert_eq!(secrets.len(), 2);
    assert_eq!(secrets["a"], format!("secret-{}", status.token("a").unwrap().id));

    let outputs = harness.cluster.outputs();
    assert_eq!(outputs["agentPoolID"], "apool-1");
    assert_eq!(outputs["name"], "builders");
    assert_eq!(outputs["organization-scoped"], "true");
    assert_eq!(outputs["agent-count"], "0");
}

#[tokio::test]
async fn test_second_pass_is_idempotent() {
    let harness = Harness::new(&["a", "b"]);
    harness.converge().await;
    let writes = harness.cluster.status_writes();
    let status = harness.pool().status;
    harness.journal.clear();

    harness.converge().await;

    assert!(harness.journal.entries().is_empty());
    assert_eq!(harness.cluster.status_writes(), writes);
    assert_eq!(harness.pool().status, status);
    assert_eq!(harness.tfc.pools().len(), 1);
}

#[tokio::test]
async fn test_removing_a_token_revokes_only_that_token() {
    let harness = Harness::new(&["a", "b"]);
    harness.converge().await;
    let removed = harness.pool().status.unwrap().token("b").unwrap().id.clone();
    harness.journal.clear();

    harness
        .cluster
        .edit_spec(|pool| pool.spec.agent_tokens = Some(vec![AgentToken::named("a")]));
    harness.converge().await;

    assert_eq!(
        harness.journal.entries(),
        vec![format!("revoke_token b {removed}"), "remove_secret b".to_string()]
    );
    let pool = harness.pool();
    assert_eq!(tracked_tokens(&pool), vec!["a"]);
    assert_eq!(pool.status.unwrap().observed_generation, 2);
    assert_eq!(harness.tfc.token_names("apool-1"), vec!["a"]);
    assert!(!harness.cluster.secrets().contains_key("b"));
}

#[tokio::test]
async fn test_replacing_a_token_issues_before_revoking() {
    let harness = Harness::new(&["a"]);
    harness.converge().await;
    harness.journal.clear();

    harness
        .cluster
        .edit_spec(|pool| pool.spec.agent_tokens = Some(vec![AgentToken::named("c")]));
    harness.converge().await;

    let entries = harness.journal.entries();
    let created = entries.iter().position(|e| e == "create_token c").unwrap();
    let revoked = entries
        .iter()
        .position(|e| e.starts_with("revoke_token a"))
        .unwrap();
    assert!(created < revoked);
    assert_eq!(tracked_tokens(&harness.pool()), vec!["c"]);
}

#[tokio::test]
async fn test_dropping_agent_tokens_revokes_everything() {
    let harness = Harness::new(&["a", "b"]);
    harness.converge().await;

    harness
        .cluster
        .edit_spec(|pool| pool.spec.agent_tokens = None);
    harness.converge().await;

    assert_eq!(harness.journal.matching("revoke_token").len(), 2);
    assert!(tracked_tokens(&harness.pool()).is_empty());
    assert!(harness.tfc.token_names("apool-1").is_empty());
}

#[tokio::test]
async fn test_pool_rename_updates_remote_pool() {
    let harness = Harness::new(&["a"]);
    harness.converge().await;
    harness.journal.clear();

    harness
        .cluster
        .edit_spec(|pool| pool.spec.name = "runners".to_string());
    harness.converge().await;

    assert_eq!(harness.journal.entries(), vec!["update_pool apool-1 runners"]);
    assert_eq!(harness.tfc.pools()[0].name, "runners");
    let pool = harness.pool();
    assert_eq!(pool.status.clone().unwrap().agent_pool_id, "apool-1");
    assert_eq!(pool.status.unwrap().observed_generation, 2);
    assert_eq!(harness.cluster.outputs()["name"], "runners");
}

#[tokio::test]
async fn test_adopts_existing_pool_with_same_name() {
    let harness = Harness::new(&["a"]);
    let existing = harness.tfc.create_pool("acme", "builders").await.unwrap();
    harness.journal.clear();

    harness.converge().await;

    assert!(harness.journal.matching("create_pool").is_empty());
    assert_eq!(
        harness.pool().status.unwrap().agent_pool_id,
        existing.id
    );
    assert_eq!(harness.tfc.token_names(&existing.id), vec!["a"]);
}

#[tokio::test]
async fn test_recreates_pool_deleted_out_of_band() {
    let harness = Harness::new(&["a", "b"]);
    harness.converge().await;
    harness.tfc.delete_out_of_band("apool-1");
    harness.journal.clear();

    harness.converge().await;

    let entries = harness.journal.entries();
    assert_eq!(entries[0], "create_pool builders");
    assert_eq!(harness.journal.matching("create_token").len(), 2);
    let pool = harness.pool();
    let pool_id = pool.status.clone().unwrap().agent_pool_id;
    assert_ne!(pool_id, "apool-1");
    assert_eq!(tracked_tokens(&pool), vec!["a", "b"]);
    assert_eq!(harness.tfc.token_names(&pool_id).len(), 2);
}

#[tokio::test]
async fn test_reissues_token_revoked_out_of_band() {
    let harness = Harness::new(&["a", "b"]);
    harness.converge().await;
    let revoked = harness.pool().status.unwrap().token("a").unwrap().id.clone();
    harness.tfc.revoke_out_of_band(&revoked);
    harness.journal.clear();

    harness.converge().await;

    assert_eq!(harness.journal.matching("create_token"), vec!["create_token a"]);
    assert!(harness.journal.matching("revoke_token").is_empty());
    let status = harness.pool().status.unwrap();
    assert_ne!(status.token("a").unwrap().id, revoked);
    let mut names = tracked_tokens(&harness.pool());
    names.sort();
    assert_eq!(names, vec!["a", "b"]);
}

#[tokio::test]
async fn test_without_sync_period_waits_for_changes() {
    let harness = Harness::with_config(
        &["a"],
        ControllerConfig {
            sync_period: None,
            ..test_config()
        },
    );

    let action = harness.reconcile().await.unwrap();

    assert_eq!(action, Action::await_change());
    assert_eq!(tracked_tokens(&harness.pool()), vec!["a"]);
}
