// tests/integration/search_join_test.rs

//! Integration tests for the search-engine join and its settings-file client

use super::fixtures::*;
use super::test_helpers::TestContext;
use clusterjoin::cluster::{ClusterJoinProperties, JoinProperty};
use clusterjoin::core::ClusterJoinError;
use clusterjoin::core::search::{SearchEngineClient, SearchEngineJoiner, SettingsFileClient};
use std::fs;
use std::sync::Arc;

fn complete_properties() -> ClusterJoinProperties {
    let mut props = ClusterJoinProperties::new();
    props.insert(JoinProperty::NetworkHost, HOST_A);
    props.insert(JoinProperty::TransportTcpPort, "9300");
    props.insert(JoinProperty::HttpPort, "9200");
    props.insert(JoinProperty::MulticastEnabled, "false");
    props.insert(JoinProperty::PingTimeout, "5s");
    props.insert(JoinProperty::UnicastHosts, "10.0.0.1[9300], 10.0.0.2[9301]");
    props
}

#[tokio::test]
async fn test_complete_properties_reach_the_client() {
    let ctx = TestContext::new().await;
    let joiner = SearchEngineJoiner::new(ctx.search_client.clone());

    joiner.join(&complete_properties()).await.unwrap();

    assert_eq!(ctx.search_client.last_applied(), Some(complete_properties()));
}

#[tokio::test]
async fn test_incomplete_properties_are_rejected() {
    let ctx = TestContext::new().await;
    let joiner = SearchEngineJoiner::new(ctx.search_client.clone());
    let mut props = ClusterJoinProperties::new();
    props.insert(JoinProperty::NetworkHost, HOST_A);

    let err = joiner.join(&props).await.unwrap_err();

    match err {
        ClusterJoinError::Configuration(msg) => assert!(msg.contains(UNICAST_HOSTS_KEY)),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(ctx.log.events().is_empty(), "client must not be called");
}

#[tokio::test]
async fn test_client_failure_propagates() {
    let ctx = TestContext::new().await;
    *ctx.search_client.reject.lock() = true;
    let joiner = SearchEngineJoiner::new(ctx.search_client.clone());

    let err = joiner.join(&complete_properties()).await.unwrap_err();

    assert!(matches!(err, ClusterJoinError::JoinFailure(_)));
}

#[tokio::test]
async fn test_settings_file_is_written() {
    let ctx = TestContext::new().await;
    let path = ctx.temp_dir.path().join("search").join("node.yml");
    let client = SettingsFileClient::new(&path).with_cluster_name("clusterjoin-abc");
    assert_eq!(client.path(), path.as_path());
    let joiner = SearchEngineJoiner::new(Arc::new(client));

    joiner.join(&complete_properties()).await.unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(
        lines,
        vec![
            "cluster.name: \"clusterjoin-abc\"",
            "network.host: \"10.0.0.1\"",
            "transport.tcp.port: \"9300\"",
            "http.port: \"9200\"",
            "discovery.zen.ping.multicast.enabled: \"false\"",
            "discovery.zen.ping.timeout: \"5s\"",
            "discovery.zen.ping.unicast.hosts: \"10.0.0.1[9300], 10.0.0.2[9301]\"",
        ]
    );
    assert!(!path.with_extension("tmp").exists());
}

#[tokio::test]
async fn test_settings_file_is_replaced_on_rejoin() {
    let ctx = TestContext::new().await;
    let path = ctx.temp_dir.path().join("node.yml");
    let client = SettingsFileClient::new(&path);

    client
        .apply_node_configuration(&complete_properties())
        .await
        .unwrap();
    let mut props = complete_properties();
    props.insert(JoinProperty::HttpPort, "9201");
    client.apply_node_configuration(&props).await.unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("http.port: \"9201\""));
    assert!(!contents.contains("\"9200\""));
    assert!(!contents.contains("cluster.name"));
}

#[tokio::test]
async fn test_unwritable_settings_path_is_join_failure() {
    let ctx = TestContext::new().await;
    // A regular file in place of the settings directory.
    let blocker = ctx.temp_dir.path().join("blocker");
    fs::write(&blocker, b"").unwrap();
    let client = SettingsFileClient::new(blocker.join("node.yml"));

    let err = client
        .apply_node_configuration(&complete_properties())
        .await
        .unwrap_err();

    assert!(matches!(err, ClusterJoinError::JoinFailure(_)));
}
