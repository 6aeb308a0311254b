//! Replica binary

use clap::{Parser, Subcommand};
use passrep::common::{parse_duration, NodeId, PeerConfig};
use passrep::{ReplicaConfig, ReplicaServer};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "passrep-replica")]
#[command(about = "passrep replica with heartbeat failure detection and leader election")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a replica
    Serve {
        /// TOML configuration file (CLI flags take priority)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Replica identity
        #[arg(long)]
        id: Option<NodeId>,

        /// Size of the replica set (peers derived as 0..N)
        #[arg(long)]
        num_replicas: Option<u32>,

        /// Port of replica 0
        #[arg(long)]
        base_port: Option<u16>,

        /// Host used to reach derived peers
        #[arg(long)]
        host: Option<String>,

        /// Initial leader identity
        #[arg(long)]
        leader: Option<NodeId>,

        /// gRPC bind address (defaults to 0.0.0.0:base_port+id)
        #[arg(long)]
        listen: Option<SocketAddr>,

        /// Explicit peer as ID=ADDR (repeatable)
        #[arg(long = "peer")]
        peers: Vec<PeerConfig>,

        /// Bind address for the HTTP status endpoint
        #[arg(long)]
        http: Option<SocketAddr>,

        /// Period between heartbeats (e.g. 5s, 500ms)
        #[arg(long, value_parser = parse_duration)]
        heartbeat_interval: Option<Duration>,

        /// Bound on every outbound call
        #[arg(long, value_parser = parse_duration)]
        rpc_timeout: Option<Duration>,

        /// How long to keep dialing peers at startup
        #[arg(long, value_parser = parse_duration)]
        startup_timeout: Option<Duration>,

        /// Directory for the activity log
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Keep peers that miss an election result
        #[arg(long)]
        keep_unreachable: bool,

        /// Log level (trace, debug, info, warn, error)
        #[arg(long, default_value = "info")]
        log_level: String,
    },
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            id,
            num_replicas,
            base_port,
            host,
            leader,
            listen,
            peers,
            http,
            heartbeat_interval,
            rpc_timeout,
            startup_timeout,
            log_dir,
            keep_unreachable,
            log_level,
        } => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| log_level.into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            // File and environment first, then CLI overrides
            let mut replica_config = ReplicaConfig::load(config.as_deref())?;
            if let Some(id) = id {
                replica_config.node_id = id;
            }
            if let Some(n) = num_replicas {
                replica_config.num_replicas = n;
            }
            if let Some(port) = base_port {
                replica_config.base_port = port;
            }
            if let Some(host) = host {
                replica_config.host = host;
            }
            if let Some(leader) = leader {
                replica_config.leader_id = leader;
            }
            if listen.is_some() {
                replica_config.listen_addr = listen;
            }
            if !peers.is_empty() {
                replica_config.peers = peers;
            }
            if http.is_some() {
                replica_config.http_addr = http;
            }
            if let Some(d) = heartbeat_interval {
                replica_config.heartbeat_interval_ms = millis(d);
            }
            if let Some(d) = rpc_timeout {
                replica_config.rpc_timeout_ms = millis(d);
            }
            if let Some(d) = startup_timeout {
                replica_config.startup_timeout_ms = millis(d);
            }
            if log_dir.is_some() {
                replica_config.log_dir = log_dir;
            }
            if keep_unreachable {
                replica_config.purge_unreachable_peers = false;
            }

            ReplicaServer::new(replica_config).serve().await?;
        }
    }

    Ok(())
}
