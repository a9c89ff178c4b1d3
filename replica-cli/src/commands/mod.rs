//! CLI command implementations.

pub mod fetch;
pub mod poll;

use replica_client::{ReplicationClient, TcpTransport};
use replica_types::TypeRegistry;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

/// Where to connect and how.
#[derive(Debug, Clone)]
pub struct Target {
    /// Server address (host:port).
    pub addr: String,
    /// Round-trip deadline in seconds (0 = no deadline).
    pub timeout_secs: u64,
    /// Custom type names accepted in responses.
    pub accept_types: Vec<String>,
}

impl Target {
    /// Build a client for this target.
    pub fn client(&self) -> ReplicationClient<TcpTransport> {
        let registry = TypeRegistry::new();
        for name in &self.accept_types {
            registry.register_name(name);
        }
        let client = ReplicationClient::tcp(self.addr.clone()).with_registry(registry);
        if self.timeout_secs == 0 {
            client
        } else {
            client.with_deadline(Duration::from_secs(self.timeout_secs))
        }
    }
}

/// A `NAME[=VERSION]` command-line key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyArg {
    /// Key name.
    pub name: String,
    /// Version already held (0 = send unconditionally).
    pub version: i64,
}

impl FromStr for KeyArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, version) = match s.split_once('=') {
            Some((name, version)) => {
                let version = version
                    .parse()
                    .map_err(|_| format!("invalid version in '{}'", s))?;
                (name, version)
            }
            None => (s, 0),
        };
        if name.is_empty() {
            return Err(format!("missing key name in '{}'", s));
        }
        Ok(Self {
            name: name.to_string(),
            version,
        })
    }
}

/// Collect keys into a key → version map.
pub fn key_map(keys: &[KeyArg]) -> HashMap<String, i64> {
    keys.iter()
        .map(|k| (k.name.clone(), k.version))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_arg_parsing() {
        assert_eq!(
            "motd".parse::<KeyArg>().unwrap(),
            KeyArg {
                name: "motd".into(),
                version: 0
            }
        );
        assert_eq!("motd=7".parse::<KeyArg>().unwrap().version, 7);
        assert_eq!("neg=-2".parse::<KeyArg>().unwrap().version, -2);
        assert!("=3".parse::<KeyArg>().is_err());
        assert!("motd=x".parse::<KeyArg>().is_err());
    }

    fn target(timeout_secs: u64) -> Target {
        Target {
            addr: "127.0.0.1:8086".into(),
            timeout_secs,
            accept_types: vec!["test.Point".into()],
        }
    }

    #[test]
    fn client_deadline_follows_timeout() {
        let client = target(5).client();
        assert_eq!(client.deadline(), Some(Duration::from_secs(5)));
        assert_eq!(client.address(), "127.0.0.1:8086");
        assert!(client.registry().is_registered("test.Point"));
    }

    #[test]
    fn zero_timeout_means_no_deadline() {
        assert_eq!(target(0).client().deadline(), None);
    }

    #[test]
    fn key_map_keeps_last_version() {
        let keys = vec!["a=1".parse().unwrap(), "a=4".parse().unwrap()];
        let map = key_map(&keys);
        assert_eq!(map.len(), 1);
        assert_eq!(map["a"], 4);
    }
}
