//! Game server bridge.
//!
//! Accepts the game-server plugin over WebSocket, keeps the persisted server
//! state in sync and logs state and chat changes.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin discraft-bridge
//! cargo run --bin discraft-bridge -- --port 8080 --database-url memory
//! ```

use std::sync::{Arc, Weak};

use clap::Parser;
use discraft_bridge::{
    Bridge,
    domain::ServerStateRepository,
    infrastructure::{
        public_ip::PublicIpResolver,
        repository::{InMemoryServerStateRepository, SqliteServerStateRepository},
    },
    ui::signal::shutdown_signal,
};
use discraft_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

/// `--database-url` value selecting the in-memory store
const IN_MEMORY_DATABASE: &str = "memory";

#[derive(Parser, Debug)]
#[command(name = "discraft-bridge")]
#[command(about = "WebSocket bridge for the game server plugin", long_about = None)]
struct Args {
    /// Host address to bind the bridge to
    #[arg(short = 'H', long, env = "BRIDGE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port number to bind the bridge to
    #[arg(short = 'p', long, env = "WS_PORT", default_value = "8080")]
    port: u16,

    /// SQLite database URL, or "memory" for a non-persistent store
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://data/bot.db")]
    database_url: String,

    /// Static public address; skips the public IP lookup when set
    #[arg(long, env = "SERVER_IP")]
    server_ip: Option<String>,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    if let Err(e) = run(args).await {
        tracing::error!("Bridge failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize dependencies in order:
    // 1. Repository
    // 2. Bridge
    // 3. Subscribers
    // 4. Listener

    // 1. Create Repository
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let repository: Arc<dyn ServerStateRepository> = if args.database_url == IN_MEMORY_DATABASE {
        tracing::info!("Using in-memory store");
        Arc::new(InMemoryServerStateRepository::new(clock))
    } else {
        tracing::info!("Using SQLite store at {}", args.database_url);
        Arc::new(SqliteServerStateRepository::connect(&args.database_url, clock).await?)
    };

    // 2. Create Bridge
    let bridge = Arc::new(Bridge::new(repository.clone()).await?);

    match args.server_ip.as_deref().filter(|ip| !ip.is_empty()) {
        Some(ip) => tracing::info!("Using static server address {}", ip),
        None => resolve_public_ip(&bridge).await,
    }

    // 3. Register subscribers
    let static_ip = args.server_ip.clone();
    let weak: Weak<Bridge> = Arc::downgrade(&bridge);
    bridge.on_state_changed(move || {
        let Some(bridge) = weak.upgrade() else {
            return;
        };
        let state = bridge.snapshot();
        let peers = bridge
            .try_live_connection_count()
            .map_or_else(|| "?".to_string(), |count| count.to_string());
        tracing::info!(
            "Server {} | players: {} | address: {} | peers: {}",
            if state.is_online { "online" } else { "offline" },
            state.player_count,
            state.display_ip(static_ip.as_deref()),
            peers
        );
    });
    bridge.on_chat_received(|player, message| {
        tracing::info!("[chat] <{}> {}", player, message);
    });

    // 4. Start listener
    let local_addr = bridge.start(&args.host, args.port).await?;
    tracing::info!("Bridge ready on {}", local_addr);
    tracing::info!("Press Ctrl+C to shutdown gracefully");

    shutdown_signal().await;

    bridge.stop().await;
    repository.close().await;

    tracing::info!("Bridge shutdown complete");

    Ok(())
}

async fn resolve_public_ip(bridge: &Bridge) {
    let resolver = match PublicIpResolver::new() {
        Ok(resolver) => resolver,
        Err(e) => {
            tracing::warn!("Public IP lookup unavailable: {}", e);
            return;
        }
    };

    match resolver.resolve().await {
        Ok(ip) => {
            tracing::info!("Public IP resolved: {}", ip);
            if let Err(e) = bridge.update_public_ip(ip).await {
                tracing::warn!("Failed to store public IP: {}", e);
            }
        }
        Err(e) => tracing::warn!("Failed to resolve public IP: {}", e),
    }
}
