//! End-to-end exchanges between ReplicationClient and a live ReplicationServer.

use replica_client::{ClientError, ReplicationClient, TcpTransport};
use replica_core::{InclusionPolicy, ServerState};
use replica_server::{Config, ReplicationServer};
use replica_types::{Entry, ReplicaError, Transmissible, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

async fn start_server(config: Config) -> ReplicationServer {
    let server = ReplicationServer::bind(config).await.unwrap();
    server.serve().unwrap();
    server
}

async fn local_server() -> ReplicationServer {
    start_server(Config::with_bind_address("127.0.0.1:0")).await
}

fn client_for(server: &ReplicationServer) -> ReplicationClient<TcpTransport> {
    ReplicationClient::tcp(server.local_addr().to_string()).with_deadline(Duration::from_secs(5))
}

fn versions(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[tokio::test]
async fn example_scenario() {
    let server = local_server().await;
    server.set("int", 0, 1);
    server.set("str", 0, "string");
    server.set("bool", 0, true);

    let client = client_for(&server);
    let all = client.fetch_all().await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all.get("int"), Some(&Value::from(1)));
    assert_eq!(all.get("str"), Some(&Value::from("string")));
    assert_eq!(all.get("bool"), Some(&Value::from(true)));

    server.set("int", 1, 2);
    client.add_key("int", 0);
    client.add_key("bool", 0);
    let changed = client.fetch_tracked().await.unwrap();

    assert_eq!(changed.len(), 2);
    assert_eq!(changed.get("int"), Some(&Value::from(2)));
    assert_eq!(changed.get_version("int"), Some(1));
    assert_eq!(changed.get("bool"), Some(&Value::from(true)));
    assert!(!changed.is_set("str"));

    server.graceful_stop().await;
}

#[tokio::test]
async fn set_then_fetch_round_trip() {
    let server = local_server().await;
    server.set("k", 5, "v");

    let all = client_for(&server).fetch_all().await.unwrap();
    assert_eq!(all.get("k"), Some(&Value::from("v")));
    assert_eq!(all.get_version("k"), Some(5));

    server.graceful_stop().await;
}

#[tokio::test]
async fn strictly_newer_skips_unchanged_entries() {
    let server = local_server().await;
    server.set("a", 3, "x");
    server.set("b", 3, "y");

    let client = client_for(&server);
    let response = client
        .fetch_keys(versions(&[("a", 3), ("b", 2)]))
        .await
        .unwrap();
    assert!(!response.is_set("a"));
    assert_eq!(response.get_version("b"), Some(3));

    server.graceful_stop().await;
}

#[tokio::test]
async fn newer_or_equal_resends_unchanged_entries() {
    let server = start_server(
        Config::with_bind_address("127.0.0.1:0").with_inclusion(InclusionPolicy::NewerOrEqual),
    )
    .await;
    server.set("a", 3, "x");

    let client = client_for(&server);
    let response = client.fetch_keys(versions(&[("a", 3)])).await.unwrap();
    assert_eq!(response.get("a"), Some(&Value::from("x")));

    let response = client.fetch_keys(versions(&[("a", 4)])).await.unwrap();
    assert!(response.is_empty());

    server.graceful_stop().await;
}

#[tokio::test]
async fn hooks_recompute_served_entries() {
    let server = local_server().await;
    server.set("int", 100, 1);
    server.set("bool", 100, true);

    // Always one version ahead of what the client holds, with a fixed value.
    server.set_hook("int", |_: &str, requested: i64, _: &Entry| {
        Entry::new(42, requested + 1)
    });
    // Pinned version: only sent to clients behind it.
    server.set_hook("bool", |_: &str, _: i64, stored: &Entry| {
        Entry::new(stored.value.clone(), 100)
    });

    let client = client_for(&server);
    let response = client
        .fetch_keys(versions(&[("int", 100), ("bool", 99)]))
        .await
        .unwrap();
    assert_eq!(response.get("int"), Some(&Value::from(42)));
    assert_eq!(response.get_version("int"), Some(101));
    assert_eq!(response.get("bool"), Some(&Value::from(true)));

    let response = client.fetch_keys(versions(&[("bool", 100)])).await.unwrap();
    assert!(!response.is_set("bool"));

    // Fetch-all bypasses hooks.
    let all = client.fetch_all().await.unwrap();
    assert_eq!(all.get("int"), Some(&Value::from(1)));
    assert_eq!(all.get_version("int"), Some(100));

    server.graceful_stop().await;
}

#[tokio::test]
async fn sync_only_reports_changes() {
    let server = local_server().await;
    server.set("motd", 1, "hello");
    server.set("other", 1, "ignored");

    let client = client_for(&server);
    client.add_key("motd", 0);

    let first = client.sync().await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(client.keys()["motd"], 1);

    let second = client.sync().await.unwrap();
    assert!(second.is_empty());

    server.set("motd", 2, "updated");
    let third = client.sync().await.unwrap();
    assert_eq!(third.get("motd"), Some(&Value::from("updated")));
    assert_eq!(client.keys()["motd"], 2);

    server.graceful_stop().await;
}

#[tokio::test]
async fn emptied_tracker_falls_back_to_all() {
    let server = local_server().await;
    server.set("a", 1, 1);
    server.set("b", 1, 2);

    let client = client_for(&server);
    client.add_key("a", 1);
    client.set_keys(HashMap::new());

    let response = client.fetch_tracked().await.unwrap();
    assert_eq!(response.len(), 2);

    server.graceful_stop().await;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Limits {
    max_items: u32,
    label: String,
}

impl Transmissible for Limits {
    const TYPE_NAME: &'static str = "kvreplica.test.Limits";
}

#[tokio::test]
async fn registered_custom_type_crosses_the_wire() {
    let server = local_server().await;
    server.register_type::<Limits>();
    let limits = Limits {
        max_items: 10,
        label: "default".into(),
    };
    server.set("limits", 1, Value::custom(&limits).unwrap());

    let client = client_for(&server);
    client.register_type::<Limits>();
    let response = client.fetch_all().await.unwrap();
    let received: Limits = response.get("limits").unwrap().decode().unwrap();
    assert_eq!(received, limits);

    server.graceful_stop().await;
}

#[tokio::test]
async fn unregistered_custom_type_fails_the_exchange() {
    let server = local_server().await;
    let limits = Limits {
        max_items: 1,
        label: "x".into(),
    };
    server.set("limits", 1, Value::custom(&limits).unwrap());
    server.set("plain", 1, "ok");

    // Server-side encode fails, the connection closes without a response.
    let client = client_for(&server);
    let err = client.fetch_all().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));

    // The failure is local to that connection.
    let response = client.fetch_keys(versions(&[("plain", 0)])).await.unwrap();
    assert_eq!(response.get("plain"), Some(&Value::from("ok")));

    // Registered on the server only: the client refuses to decode it.
    server.register_type::<Limits>();
    let err = client.fetch_all().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Encoding(ReplicaError::UnregisteredType(_))
    ));

    server.graceful_stop().await;
}

#[tokio::test]
async fn graceful_stop_refuses_later_connections() {
    let server = local_server().await;
    server.set("k", 1, "v");
    let client = client_for(&server);
    client.fetch_all().await.unwrap();

    server.graceful_stop().await;
    assert_eq!(server.connections(), 0);
    assert_eq!(server.state(), ServerState::Stopped);

    let err = client.fetch_all().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sets_never_mix_a_response() {
    let server = Arc::new(local_server().await);
    for key in ["a", "b", "c"] {
        server.set(key, 1, 1);
    }

    let writer = {
        let server = Arc::clone(&server);
        tokio::task::spawn_blocking(move || {
            for version in 2..500 {
                // All three keys move together.
                for key in ["a", "b", "c"] {
                    server.set(key, version, version);
                }
            }
        })
    };

    let client = client_for(&server);
    for _ in 0..50 {
        let response = client.fetch_all().await.unwrap();
        for (key, entry) in response.iter() {
            assert_eq!(
                entry.value,
                Value::from(entry.version),
                "value and version of {} came from different writes",
                key
            );
        }
    }

    writer.await.unwrap();
    server.graceful_stop().await;
}
