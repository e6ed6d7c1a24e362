// tests/property/port_allocation_test.rs

//! Property-based tests for per-host port allocation

use crate::test_helpers::TestContext;
use clusterjoin::cluster::ServerPort;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 32, // Each case builds a fresh database
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_allocation_is_one_past_host_maximum(
        shared_ports in prop::collection::vec(prop::option::of(1u16..60000), 1..=8),
        other_ports in prop::collection::vec(1u16..=u16::MAX, 0..=4),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ctx = TestContext::new().await;
            for (i, port) in shared_ports.iter().enumerate() {
                ctx.add_server(&format!("shared-{i}"), "10.1.0.1", *port, None, i % 2 == 0)
                    .await;
            }
            for (i, port) in other_ports.iter().enumerate() {
                ctx.add_server(&format!("other-{i}"), "10.1.0.2", Some(*port), None, true)
                    .await;
            }

            let expected = shared_ports
                .iter()
                .flatten()
                .max()
                .map(|max| max + 1)
                .unwrap_or(9300);

            for i in 0..shared_ports.len() {
                let port = ctx
                    .ports
                    .next_available_port(&format!("shared-{i}"), ServerPort::SearchTransport)
                    .await;
                assert_eq!(port, expected.to_string());
            }
        });
    }

    #[test]
    fn test_allocation_never_reuses_a_host_port(
        ports in prop::collection::vec(1u16..60000, 1..=8),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ctx = TestContext::new().await;
            for (i, port) in ports.iter().enumerate() {
                ctx.add_server(&format!("s{i}"), "10.1.0.1", None, Some(*port), true)
                    .await;
            }

            let allocated = ctx
                .ports
                .allocate("s0", ServerPort::SearchHttp)
                .await
                .into_value();
            assert!(!ports.contains(&allocated));
        });
    }
}
