//! Client binary: connect to one replica and echo stdin lines through it

use clap::Parser;
use passrep::common::{
    client_log_path, parse_duration, ActivityLog, BroadcastRequest, ClientId, ConnectRequest,
    HelloRequest,
};
use passrep::replica::{RemoteReplica, ReplicaRpc};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "passrep-client")]
#[command(about = "passrep client")]
#[command(version)]
struct Args {
    /// Client identity (must be unique per replica)
    #[arg(long)]
    id: ClientId,

    /// Replica address
    #[arg(long, default_value = "localhost:8080")]
    server: String,

    /// Bound on each call
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    timeout: Duration,

    /// Directory for the activity log
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

const BROADCAST_PREFIX: &str = "/broadcast ";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let activity = match &args.log_dir {
        Some(dir) => ActivityLog::open(client_log_path(dir, args.id))?,
        None => ActivityLog::disabled(),
    };

    let replica = RemoteReplica::dial(&args.server, args.timeout).await?;
    let ack = replica
        .connect(ConnectRequest { client_id: args.id })
        .await?;
    println!("{}", ack.status);
    activity.record(format!("Connected to {}: {}", args.server, ack.status));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("Enter text: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match line.strip_prefix(BROADCAST_PREFIX) {
            Some(body) => {
                replica
                    .broadcast_message(BroadcastRequest {
                        body: body.to_string(),
                    })
                    .await
            }
            None => {
                replica
                    .say_hello(HelloRequest {
                        body: line.to_string(),
                        client_id: args.id,
                    })
                    .await
            }
        };

        match reply {
            Ok(reply) => {
                println!("{}", reply.body);
                activity.record(format!("Reply: {}", reply.body));
            }
            Err(e) => {
                eprintln!("Request failed: {}", e);
                activity.record(format!("Request failed: {}", e));
            }
        }
    }

    Ok(())
}
