//! Track keys and print changes as they arrive.

use anyhow::Result;
use replica_client::{ReplicationClient, Transport};
use std::time::Duration;

use super::{KeyArg, Target};
use crate::json;

/// Run the poll command.
///
/// Each round syncs the tracked keys and prints one JSON line per changed
/// entry. Failed rounds are reported and retried on the next tick.
pub async fn run(
    target: &Target,
    keys: &[KeyArg],
    interval: u64,
    count: Option<u64>,
) -> Result<()> {
    if keys.is_empty() {
        anyhow::bail!("poll needs at least one --key");
    }

    let client = target.client();
    for key in keys {
        client.add_key(key.name.as_str(), key.version);
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
    let mut rounds = 0u64;

    loop {
        ticker.tick().await;

        for line in poll_round(&client).await {
            println!("{}", line);
        }

        rounds += 1;
        if count.is_some_and(|limit| rounds >= limit) {
            break;
        }
    }

    Ok(())
}

/// Sync once and render every changed entry as a JSON line.
///
/// A failed sync is reported and yields no lines; the tracked versions are
/// left untouched so the next round asks again.
pub async fn poll_round<T: Transport>(client: &ReplicationClient<T>) -> Vec<serde_json::Value> {
    match client.sync().await {
        Ok(changed) => {
            let mut lines: Vec<_> = changed
                .iter()
                .map(|(key, entry)| {
                    serde_json::json!({
                        "key": key,
                        "version": entry.version,
                        "value": json::value_to_json(&entry.value),
                    })
                })
                .collect();
            lines.sort_by(|a, b| a["key"].as_str().cmp(&b["key"].as_str()));
            lines
        }
        Err(e) => {
            tracing::warn!("Poll of {} failed: {}", client.address(), e);
            eprintln!("poll failed: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replica_server::{Config, ReplicationServer};

    fn target(addr: String) -> Target {
        Target {
            addr,
            timeout_secs: 1,
            accept_types: Vec::new(),
        }
    }

    async fn closed_addr() -> String {
        let server = ReplicationServer::bind(Config::with_bind_address("127.0.0.1:0"))
            .await
            .unwrap();
        let addr = server.local_addr().to_string();
        server.graceful_stop().await;
        addr
    }

    #[tokio::test]
    async fn poll_requires_keys() {
        let target = target("127.0.0.1:1".into());
        assert!(run(&target, &[], 1, Some(1)).await.is_err());
    }

    #[tokio::test]
    async fn rounds_report_only_changes() {
        let server = ReplicationServer::bind(Config::with_bind_address("127.0.0.1:0"))
            .await
            .unwrap();
        server.set("motd", 1, "hello");
        server.set("other", 1, "ignored");
        server.serve().unwrap();

        let client = target(server.local_addr().to_string()).client();
        client.add_key("motd", 0);

        let first = poll_round(&client).await;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0]["key"], "motd");
        assert_eq!(first[0]["version"], 1);
        assert_eq!(first[0]["value"], "hello");

        assert!(poll_round(&client).await.is_empty());

        server.set("motd", 2, "updated");
        let third = poll_round(&client).await;
        assert_eq!(third.len(), 1);
        assert_eq!(third[0]["version"], 2);
        assert_eq!(third[0]["value"], "updated");

        server.graceful_stop().await;
    }

    #[tokio::test]
    async fn failed_round_keeps_tracked_versions() {
        let client = target(closed_addr().await).client();
        client.add_key("motd", 4);

        assert!(poll_round(&client).await.is_empty());
        assert_eq!(client.keys()["motd"], 4);
    }

    #[tokio::test]
    async fn unreachable_server_does_not_end_polling() {
        let target = target(closed_addr().await);
        let keys = vec!["motd".parse().unwrap()];
        run(&target, &keys, 1, Some(2)).await.unwrap();
    }
}
