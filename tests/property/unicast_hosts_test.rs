// tests/property/unicast_hosts_test.rs

//! Property-based tests for the unicast discovery host list

use clusterjoin::cluster::Server;
use clusterjoin::cluster::properties::unicast_hosts;
use proptest::prelude::*;

fn server_strategy() -> impl Strategy<Value = Server> {
    (
        "[a-z]{1,8}",
        (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>()),
        prop::option::of(1u16..=u16::MAX),
    )
        .prop_map(|(id, (a, b, c, d), port)| {
            let mut server = Server::new(id, format!("{a}.{b}.{c}.{d}"));
            server.es_transport_tcp_port = port;
            server
        })
}

proptest! {
    #[test]
    fn test_one_entry_per_server_in_order(
        servers in prop::collection::vec(server_strategy(), 1..=20),
        fallback in 1u16..=u16::MAX,
    ) {
        let rendered = unicast_hosts(&servers, fallback);
        let entries: Vec<&str> = rendered.split(", ").collect();

        prop_assert_eq!(entries.len(), servers.len());
        for (entry, server) in entries.iter().zip(&servers) {
            let port = server.es_transport_tcp_port.unwrap_or(fallback);
            prop_assert_eq!(*entry, format!("{}[{}]", server.ip_address, port));
        }
    }

    #[test]
    fn test_duplicates_are_kept(
        server in server_strategy(),
        copies in 1usize..=5,
    ) {
        let servers = vec![server; copies];

        let rendered = unicast_hosts(&servers, 9300);

        prop_assert_eq!(rendered.split(", ").count(), copies);
    }
}

#[test]
fn test_empty_server_list_renders_empty_string() {
    assert_eq!(unicast_hosts(&[], 9300), "");
}
