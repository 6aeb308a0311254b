//! Replica server lifecycle

use crate::common::{replica_log_path, ActivityLog, Error, ReplicaConfig, Result};
use crate::replica::grpc::RouteService;
use crate::replica::heartbeat::HeartbeatMonitor;
use crate::replica::http::create_router;
use crate::replica::node::{NodeOptions, ReplicaNode};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio_stream::wrappers::TcpListenerStream;

/// How long shutdown waits for servers to drain before aborting them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub struct ReplicaServer {
    config: ReplicaConfig,
}

/// A started replica: servers bound, peers connected, monitor running.
pub struct RunningReplica {
    node: Arc<ReplicaNode>,
    grpc_addr: SocketAddr,
    http_addr: Option<SocketAddr>,
    shutdown_tx: watch::Sender<bool>,
    grpc_task: JoinHandle<Result<()>>,
    http_task: Option<JoinHandle<Result<()>>>,
    monitor_task: JoinHandle<()>,
}

impl ReplicaServer {
    pub fn new(config: ReplicaConfig) -> Self {
        Self { config }
    }

    /// Bind, connect to every configured peer, and start the failure detector.
    ///
    /// Fails if the listen address cannot be bound or any peer stays
    /// unreachable for the whole startup window.
    pub async fn start(self) -> Result<RunningReplica> {
        let config = self.config;
        config.validate()?;
        let listen_addr = config.listen_addr()?;

        tracing::info!("Starting replica: {}", config.node_id);
        tracing::info!("  gRPC API: {}", listen_addr);
        if let Some(addr) = config.http_addr {
            tracing::info!("  HTTP API: {}", addr);
        }
        tracing::info!("  Initial leader: {}", config.leader_id);
        tracing::info!("  Heartbeat interval: {:?}", config.heartbeat_interval());

        let activity = match &config.log_dir {
            Some(dir) => ActivityLog::open(replica_log_path(dir, config.node_id))?,
            None => ActivityLog::disabled(),
        };
        let node = Arc::new(ReplicaNode::new(
            config.node_id,
            config.leader_id,
            NodeOptions {
                rpc_timeout: config.rpc_timeout(),
                purge_unreachable_peers: config.purge_unreachable_peers,
            },
            activity,
        ));

        let listener = TcpListener::bind(listen_addr).await?;
        let grpc_addr = listener.local_addr()?;
        node.activity().record(format!(
            "Started server with id {} on {} | Lamport: {}",
            node.id(),
            grpc_addr,
            node.lamport()
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let grpc_task = {
            let service = RouteService::new(node.clone()).into_server();
            let mut shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                tonic::transport::Server::builder()
                    .add_service(service)
                    .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                        let _ = shutdown.changed().await;
                    })
                    .await
                    .map_err(Error::from)
            })
        };

        let (http_addr, http_task) = match config.http_addr {
            Some(addr) => {
                let http_listener = match TcpListener::bind(addr).await {
                    Ok(listener) => listener,
                    Err(e) => {
                        let _ = shutdown_tx.send(true);
                        return Err(e.into());
                    }
                };
                let bound = http_listener.local_addr()?;
                let router = create_router(node.clone());
                let mut shutdown = shutdown_rx.clone();
                let task = tokio::spawn(async move {
                    axum::serve(http_listener, router)
                        .with_graceful_shutdown(async move {
                            let _ = shutdown.changed().await;
                        })
                        .await
                        .map_err(Error::from)
                });
                (Some(bound), Some(task))
            }
            None => (None, None),
        };

        node.activity().record("Connecting to replicas.....");
        for peer in config.peer_addresses()? {
            if let Err(e) = node
                .add_replica(peer.id, &peer.addr, config.startup_timeout())
                .await
            {
                tracing::error!("Startup aborted: {}", e);
                let _ = shutdown_tx.send(true);
                return Err(e);
            }
        }

        let monitor_task = HeartbeatMonitor::new(node.clone(), config.heartbeat_interval()).spawn();

        tracing::info!(
            "✓ Replica {} ready ({} peers, leader {})",
            node.id(),
            node.replica_ids().len(),
            node.leader_id()
        );

        Ok(RunningReplica {
            node,
            grpc_addr,
            http_addr,
            shutdown_tx,
            grpc_task,
            http_task,
            monitor_task,
        })
    }

    /// Start and run until Ctrl-C or a server failure.
    pub async fn serve(self) -> Result<()> {
        let mut running = self.start().await?;

        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    tracing::error!("Failed to listen for shutdown signal: {}", e);
                }
                tracing::info!("Shutdown requested");
            }
            res = &mut running.grpc_task => {
                running.monitor_task.abort();
                let _ = running.shutdown_tx.send(true);
                return flatten(res);
            }
        }

        running.shutdown().await
    }
}

impl RunningReplica {
    pub fn node(&self) -> &Arc<ReplicaNode> {
        &self.node
    }

    pub fn grpc_addr(&self) -> SocketAddr {
        self.grpc_addr
    }

    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http_addr
    }

    /// Stop the failure detector and both servers.
    pub async fn shutdown(self) -> Result<()> {
        self.monitor_task.abort();
        let _ = self.shutdown_tx.send(true);

        let grpc = drain(self.grpc_task).await;
        if let Some(task) = self.http_task {
            drain(task).await?;
        }
        tracing::info!("Replica {} stopped", self.node.id());
        grpc
    }
}

async fn drain(mut task: JoinHandle<Result<()>>) -> Result<()> {
    match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
        Ok(res) => flatten(res),
        Err(_) => {
            task.abort();
            Ok(())
        }
    }
}

fn flatten(res: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match res {
        Ok(inner) => inner,
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) => Err(Error::Internal(format!("server task panicked: {}", e))),
    }
}
