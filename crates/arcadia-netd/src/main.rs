use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use arcadia_netd::config::{DEFAULT_OUTBOUND_QUEUE, ServerConfig};
use arcadia_netd::identity::{DidRegistry, DidSyntaxResolver, IdentityResolver};
use arcadia_netd::net::rate_limit::RateLimitConfig;
use arcadia_netd::reward::LocalCredentialIssuer;
use arcadia_netd::{ServerState, run_server};
use arcadia_netproto::constants::{DEFAULT_GAME_ID, DEFAULT_ROOM_CAPACITY, DEFAULT_ROOM_ID};
use arcadia_netproto::limits::DEFAULT_MAX_MESSAGE_BYTES;

/// Multiplayer room server
#[derive(Parser, Debug)]
#[command(name = "arcadia-netd")]
#[command(about = "Real-time multiplayer session and room server", long_about = None)]
struct Args {
    /// WebSocket bind address
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    /// Maximum members per room
    #[arg(long, default_value_t = DEFAULT_ROOM_CAPACITY)]
    room_capacity: usize,

    /// Room joined when a client names none
    #[arg(long, default_value = DEFAULT_ROOM_ID)]
    default_room: String,

    /// Game id for rooms created without one
    #[arg(long, default_value = DEFAULT_GAME_ID)]
    default_game: String,

    /// Largest accepted inbound message in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_BYTES)]
    max_message_bytes: usize,

    /// Outbound frames buffered per connection
    #[arg(long, default_value_t = DEFAULT_OUTBOUND_QUEUE)]
    outbound_queue: usize,

    /// New connections per IP per second (0 disables)
    #[arg(long, default_value_t = 10)]
    conn_per_ip_per_sec: u32,

    /// Messages per connection per second (0 disables)
    #[arg(long, default_value_t = 60)]
    msg_per_conn_per_sec: u32,

    /// Burst allowance, in seconds' worth of traffic
    #[arg(long, default_value_t = 3)]
    burst_multiplier: u32,

    /// JSON array of identity documents. Without it any well-formed DID is accepted.
    #[arg(long)]
    identity_file: Option<PathBuf>,

    /// DID that signs issued credentials
    #[arg(long, default_value = "did:arcadia:issuer")]
    issuer_did: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let identity: Arc<dyn IdentityResolver> = match &args.identity_file {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading identity file {}", path.display()))?;
            let registry = DidRegistry::from_json(&json)
                .with_context(|| format!("parsing identity file {}", path.display()))?;
            info!(identities = registry.len(), "Identity registry loaded");
            Arc::new(registry)
        }
        None => {
            info!("No identity file; accepting any well-formed DID");
            Arc::new(DidSyntaxResolver)
        }
    };
    let credentials = Arc::new(LocalCredentialIssuer::new(
        args.issuer_did.clone(),
        Arc::clone(&identity),
    ));

    let config = ServerConfig {
        room_capacity: args.room_capacity,
        default_room_id: args.default_room,
        default_game_id: args.default_game,
        max_message_bytes: args.max_message_bytes,
        outbound_queue: args.outbound_queue,
        rate_limit: RateLimitConfig {
            conn_per_ip_per_sec: args.conn_per_ip_per_sec,
            msg_per_conn_per_sec: args.msg_per_conn_per_sec,
            burst_multiplier: args.burst_multiplier,
        },
    };
    let state = Arc::new(ServerState::new(config, identity, credentials));

    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    info!("Log level: {}", args.log_level);
    info!(issuer = %args.issuer_did, "Credential issuer ready");

    run_server(listener, state).await
}
