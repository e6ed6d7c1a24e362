// tests/integration/resp_admin_test.rs

//! Integration tests for the RESP cache administrator against in-process fake
//! cache nodes.

use super::fixtures::*;
use super::test_helpers::{TestContext, overrides};
use bytes::BytesMut;
use clusterjoin::cluster::ServerRegistry;
use clusterjoin::core::ClusterJoinError;
use clusterjoin::core::cache::resp_admin::{CacheNodeAddr, parse_host_list};
use clusterjoin::core::cache::{CacheAdministrator, RespCacheAdministrator};
use clusterjoin::core::protocol::{RespFrame, RespFrameCodec};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::codec::{Decoder, Encoder};

/// A fake cache node answering PING and CLUSTER MEET; records received commands.
struct FakeCacheNode {
    port: u16,
    commands: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FakeCacheNode {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let recorded = commands.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let mut codec = RespFrameCodec;
                    let mut buf = BytesMut::new();
                    loop {
                        match socket.read_buf(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(_) => {}
                        }
                        while let Ok(Some(frame)) = codec.decode(&mut buf) {
                            let words: Vec<String> = match frame {
                                RespFrame::Array(items) => {
                                    items.iter().filter_map(RespFrame::as_text).collect()
                                }
                                _ => Vec::new(),
                            };
                            let reply = match words.first().map(|w| w.to_uppercase()) {
                                Some(cmd) if cmd == "PING" => {
                                    RespFrame::SimpleString("PONG".into())
                                }
                                Some(cmd) if cmd == "CLUSTER" => {
                                    RespFrame::SimpleString("OK".into())
                                }
                                _ => RespFrame::Error("ERR unknown command".into()),
                            };
                            recorded.lock().push(words);
                            let mut out = BytesMut::new();
                            codec.encode(reply, &mut out).unwrap();
                            if socket.write_all(&out).await.is_err() {
                                return;
                            }
                        }
                    }
                });
            }
        });

        Self { port, commands }
    }

    fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().clone()
    }
}

/// Returns a port on 127.0.0.1 that nothing listens on.
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

fn admin(ctx: &TestContext) -> RespCacheAdministrator {
    RespCacheAdministrator::new(
        ctx.registry.clone(),
        ctx.ports.clone(),
        None,
        Duration::from_millis(500),
    )
}

#[tokio::test]
async fn test_local_node_meets_every_peer() {
    let ctx = TestContext::new().await;
    ctx.add_server("node-1", HOST_A, None, None, true).await;
    let local = FakeCacheNode::start().await;
    let peer = FakeCacheNode::start().await;
    let admin = admin(&ctx);

    let props = overrides(&[
        ("CACHE_BINDADDRESS", "127.0.0.1"),
        ("CACHE_BINDPORT", &local.port.to_string()),
        ("CACHE_TCP_INITIAL_HOSTS", &format!("127.0.0.1[{}]", peer.port)),
    ]);
    admin.set_cluster_membership(&props, "node-1").await.unwrap();

    assert_eq!(
        local.commands(),
        vec![vec![
            "CLUSTER".to_string(),
            "MEET".to_string(),
            "127.0.0.1".to_string(),
            peer.port.to_string(),
        ]]
    );
    let membership = admin.membership().unwrap();
    assert_eq!(membership.peers.len(), 1);

    admin.test_cluster_connectivity().await.unwrap();
    assert_eq!(peer.commands(), vec![vec!["PING".to_string()]]);

    // The bind port override is recorded as the server's cache port.
    let server = ctx.sql_registry.get_server("node-1").await.unwrap();
    assert_eq!(server.cache_port, Some(local.port));
}

#[tokio::test]
async fn test_cache_port_is_allocated_when_not_supplied() {
    let ctx = TestContext::new().await;
    ctx.add_server("node-1", HOST_A, None, None, true).await;
    let admin = admin(&ctx);

    admin
        .set_cluster_membership(&overrides(&[]), "node-1")
        .await
        .unwrap();

    let membership = admin.membership().unwrap();
    assert_eq!(
        membership.local,
        CacheNodeAddr {
            host: HOST_A.to_string(),
            port: 5701
        }
    );
    assert!(membership.peers.is_empty());
    let server = ctx.sql_registry.get_server("node-1").await.unwrap();
    assert_eq!(server.cache_port, Some(5701));
}

#[tokio::test]
async fn test_peers_default_to_alive_servers_cache_ports() {
    let ctx = TestContext::new().await;
    let local = FakeCacheNode::start().await;
    let mut other = ctx.add_server("node-0", "127.0.0.1", None, None, true).await;
    other.cache_port = Some(4444);
    ctx.sql_registry.update_server(&other).await.unwrap();
    ctx.add_server("node-1", "127.0.0.1", None, None, true).await;
    let admin = admin(&ctx);

    admin
        .set_cluster_membership(
            &overrides(&[("CACHE_BINDPORT", &local.port.to_string())]),
            "node-1",
        )
        .await
        .unwrap();

    assert_eq!(
        admin.membership().unwrap().peers,
        vec![CacheNodeAddr {
            host: "127.0.0.1".to_string(),
            port: 4444
        }]
    );
    assert_eq!(local.commands().len(), 1);
}

#[tokio::test]
async fn test_unreachable_peer_fails_connectivity_test() {
    let ctx = TestContext::new().await;
    ctx.add_server("node-1", HOST_A, None, None, true).await;
    let local = FakeCacheNode::start().await;
    let dead = closed_port().await;
    let admin = admin(&ctx);

    let props = overrides(&[
        ("CACHE_BINDADDRESS", "127.0.0.1"),
        ("CACHE_BINDPORT", &local.port.to_string()),
        ("CACHE_TCP_INITIAL_HOSTS", &format!("127.0.0.1[{dead}]")),
    ]);
    admin.set_cluster_membership(&props, "node-1").await.unwrap();

    let err = admin.test_cluster_connectivity().await.unwrap_err();
    match err {
        ClusterJoinError::CacheCluster(msg) => assert!(msg.contains(&dead.to_string())),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_connectivity_before_membership_is_an_error() {
    let ctx = TestContext::new().await;

    let err = admin(&ctx).test_cluster_connectivity().await.unwrap_err();
    assert!(matches!(err, ClusterJoinError::CacheCluster(_)));
}

#[tokio::test]
async fn test_invalid_bind_port_is_configuration_error() {
    let ctx = TestContext::new().await;
    ctx.add_server("node-1", HOST_A, None, None, true).await;

    let err = admin(&ctx)
        .set_cluster_membership(&overrides(&[("CACHE_BINDPORT", "eighty")]), "node-1")
        .await
        .unwrap_err();
    assert!(matches!(err, ClusterJoinError::Configuration(_)));
}

#[tokio::test]
async fn test_zero_bind_port_is_configuration_error() {
    let ctx = TestContext::new().await;
    ctx.add_server("node-1", HOST_A, None, None, true).await;
    let admin = admin(&ctx);

    let err = admin
        .set_cluster_membership(&overrides(&[("CACHE_BINDPORT", "0")]), "node-1")
        .await
        .unwrap_err();

    assert!(matches!(err, ClusterJoinError::Configuration(_)));
    assert!(admin.membership().is_none());
    let stored = ctx.sql_registry.get_server("node-1").await.unwrap();
    assert_eq!(stored.cache_port, None);
}

#[test]
fn test_parse_host_list() {
    let hosts = parse_host_list("10.0.0.1[5701], 10.0.0.2[5702],").unwrap();
    assert_eq!(
        hosts,
        vec![
            CacheNodeAddr {
                host: "10.0.0.1".to_string(),
                port: 5701
            },
            CacheNodeAddr {
                host: "10.0.0.2".to_string(),
                port: 5702
            },
        ]
    );
    assert!(parse_host_list("").unwrap().is_empty());
    assert!(parse_host_list("10.0.0.1:5701").is_err());
    assert!(parse_host_list("10.0.0.1[0]").is_err());
    assert!(parse_host_list("[5701]").is_err());
}
