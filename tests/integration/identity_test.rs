// tests/integration/identity_test.rs

//! Integration tests for the cluster identity store

use super::test_helpers::TestContext;
use clusterjoin::cluster::ClusterIdentityStore;
use clusterjoin::core::persistence::QueryExecutor;

#[tokio::test]
async fn test_cluster_id_unset_on_fresh_database() {
    let ctx = TestContext::new().await;
    let store = ClusterIdentityStore::new(ctx.db.clone());

    assert_eq!(store.cluster_id().await, None);
}

#[tokio::test]
async fn test_ensure_cluster_id_is_idempotent() {
    let ctx = TestContext::new().await;
    let store = ClusterIdentityStore::new(ctx.db.clone());

    let first = store.ensure_cluster_id().await.unwrap();
    let second = store.ensure_cluster_id().await.unwrap();

    assert_eq!(first, second);
    assert!(uuid::Uuid::parse_str(&first).is_ok(), "id should be a UUID");
    assert_eq!(
        ctx.db.count_containing("INSERT INTO cluster"),
        1,
        "second call must not insert"
    );
    assert_eq!(store.cluster_id().await, Some(first));
}

#[tokio::test]
async fn test_cluster_id_read_failure_is_reported_as_unset() {
    let ctx = TestContext::new().await;
    let store = ClusterIdentityStore::new(ctx.db.clone());
    store.ensure_cluster_id().await.unwrap();

    ctx.db.fail_on("FROM cluster");

    assert_eq!(store.cluster_id().await, None);
}

#[tokio::test]
async fn test_concurrent_creation_returns_existing_id() {
    let ctx = TestContext::new().await;
    let store = ClusterIdentityStore::new(ctx.db.clone());
    let winner = store.ensure_cluster_id().await.unwrap();

    // Simulate another node winning the race: our read sees no row, our insert
    // then hits the storage-level uniqueness guarantee.
    ctx.db.empty_once("FROM cluster");
    let observed = store.ensure_cluster_id().await.unwrap();

    assert_eq!(observed, winner);
    let rows = ctx
        .db
        .query("SELECT cluster_id FROM cluster", vec![])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1, "at most one cluster id may ever be stored");
}

#[tokio::test]
async fn test_insert_failure_propagates() {
    let ctx = TestContext::new().await;
    let store = ClusterIdentityStore::new(ctx.db.clone());
    ctx.db.fail_on("INSERT INTO cluster");

    let err = store.ensure_cluster_id().await.unwrap_err();
    assert!(err.is_data_access(), "unexpected error: {err:?}");
}
