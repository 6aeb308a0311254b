//! Configuration for a replica node

use crate::common::{Error, NodeId, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable prefix (`PASSREP_NODE_ID`, `PASSREP_BASE_PORT`, ...)
pub const ENV_PREFIX: &str = "PASSREP";

/// Replica configuration.
///
/// The replica set is fixed at construction time. Peers are either listed
/// explicitly in `peers`, or derived as identities `0..num_replicas` reachable
/// at `host:(base_port + identity)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaConfig {
    /// This node's identity
    #[serde(default)]
    pub node_id: NodeId,

    /// Total replica count, used when `peers` is empty
    #[serde(default = "default_num_replicas")]
    pub num_replicas: u32,

    /// Port of replica 0; replica `n` listens on `base_port + n`
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    /// Host used to reach derived peers
    #[serde(default = "default_host")]
    pub host: String,

    /// Identity assumed to be the leader at startup
    #[serde(default)]
    pub leader_id: NodeId,

    /// Overrides the derived gRPC bind address
    #[serde(default)]
    pub listen_addr: Option<SocketAddr>,

    /// Explicit peer list (other replicas only)
    #[serde(default)]
    pub peers: Vec<PeerConfig>,

    /// Bind address for the HTTP status endpoint (disabled when unset)
    #[serde(default)]
    pub http_addr: Option<SocketAddr>,

    /// Period between heartbeat rounds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,

    /// Bound on every outbound call
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_ms: u64,

    /// How long startup keeps dialing a configured peer before giving up
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_ms: u64,

    /// Drop peers that fail to receive an election result
    #[serde(default = "default_purge_unreachable")]
    pub purge_unreachable_peers: bool,

    /// Directory for the append-only activity log (disabled when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_num_replicas() -> u32 {
    3
}
fn default_base_port() -> u16 {
    8080
}
fn default_host() -> String {
    "localhost".to_string()
}
fn default_heartbeat_interval() -> u64 {
    5_000
}
fn default_rpc_timeout() -> u64 {
    1_000
}
fn default_startup_timeout() -> u64 {
    10_000
}
fn default_purge_unreachable() -> bool {
    true
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            node_id: 0,
            num_replicas: default_num_replicas(),
            base_port: default_base_port(),
            host: default_host(),
            leader_id: 0,
            listen_addr: None,
            peers: Vec::new(),
            http_addr: None,
            heartbeat_interval_ms: default_heartbeat_interval(),
            rpc_timeout_ms: default_rpc_timeout(),
            startup_timeout_ms: default_startup_timeout(),
            purge_unreachable_peers: default_purge_unreachable(),
            log_dir: None,
        }
    }
}

/// A statically known peer replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub id: NodeId,
    /// `host:port`
    pub addr: String,
}

impl FromStr for PeerConfig {
    type Err = Error;

    /// Parses `ID=HOST:PORT`.
    fn from_str(s: &str) -> Result<Self> {
        let (id, addr) = s
            .split_once('=')
            .ok_or_else(|| Error::InvalidConfig(format!("peer must be ID=ADDR, got: {}", s)))?;
        let id = id
            .trim()
            .parse()
            .map_err(|_| Error::InvalidConfig(format!("invalid peer id in: {}", s)))?;
        let addr = addr.trim();
        if addr.is_empty() {
            return Err(Error::InvalidConfig(format!("empty peer address in: {}", s)));
        }
        Ok(Self {
            id,
            addr: addr.to_string(),
        })
    }
}

impl ReplicaConfig {
    /// Load configuration from an optional TOML file layered under
    /// `PASSREP_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    fn derived_port(&self, id: NodeId) -> Result<u16> {
        u16::try_from(id)
            .ok()
            .and_then(|offset| self.base_port.checked_add(offset))
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "port for replica {} overflows base port {}",
                    id, self.base_port
                ))
            })
    }

    /// Address the gRPC server binds to.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        match self.listen_addr {
            Some(addr) => Ok(addr),
            None => Ok(SocketAddr::from(([0, 0, 0, 0], self.derived_port(self.node_id)?))),
        }
    }

    /// Every other replica in the set, in identity order.
    pub fn peer_addresses(&self) -> Result<Vec<PeerConfig>> {
        if !self.peers.is_empty() {
            let mut peers = self.peers.clone();
            peers.sort_by_key(|p| p.id);
            return Ok(peers);
        }

        (0..self.num_replicas)
            .filter(|&id| id != self.node_id)
            .map(|id| {
                Ok(PeerConfig {
                    id,
                    addr: format!("{}:{}", self.host, self.derived_port(id)?),
                })
            })
            .collect()
    }

    /// Reject configurations the coordination core cannot start from.
    pub fn validate(&self) -> Result<()> {
        if self.peers.is_empty() {
            if self.num_replicas == 0 {
                return Err(Error::InvalidConfig("num_replicas must be at least 1".into()));
            }
            if self.node_id >= self.num_replicas {
                return Err(Error::InvalidConfig(format!(
                    "node id {} outside replica set 0..{}",
                    self.node_id, self.num_replicas
                )));
            }
        }

        let peers = self.peer_addresses()?;
        let mut members = BTreeSet::new();
        members.insert(self.node_id);
        for peer in &peers {
            if !members.insert(peer.id) {
                return Err(Error::InvalidConfig(format!(
                    "replica id {} listed more than once (or equals own id)",
                    peer.id
                )));
            }
        }
        if !members.contains(&self.leader_id) {
            return Err(Error::InvalidConfig(format!(
                "leader {} is not a member of the replica set",
                self.leader_id
            )));
        }

        if self.heartbeat_interval_ms == 0 || self.rpc_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "heartbeat interval and rpc timeout must be positive".into(),
            ));
        }

        self.listen_addr()?;
        Ok(())
    }
}
