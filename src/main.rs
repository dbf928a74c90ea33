use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use trackd::config::ServerConfig;
use trackd::{rest, ws, AppContext};

#[derive(Parser)]
#[command(
    name = "trackd",
    about = "trackd — multi-user task tracker daemon with real-time sync",
    version
)]
struct Args {
    /// HTTP API port
    #[arg(long, env = "TRACKD_HTTP_PORT")]
    http_port: Option<u16>,

    /// WebSocket event-push port
    #[arg(long, env = "TRACKD_WS_PORT")]
    ws_port: Option<u16>,

    /// Data directory for config, JWT secret, and SQLite database
    #[arg(long, env = "TRACKD_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TRACKD_LOG")]
    log: Option<String>,

    /// Bind address (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "TRACKD_BIND")]
    bind_address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ServerConfig::new(
        args.http_port,
        args.ws_port,
        args.data_dir,
        args.log,
        args.bind_address,
    );

    // Init once — must happen before any tracing calls.
    setup_logging(&config.log, &config.log_format);

    info!(version = env!("CARGO_PKG_VERSION"), "trackd starting");
    info!(
        data_dir = %config.data_dir.display(),
        http_port = config.http_port,
        ws_port = config.ws_port,
        "config loaded"
    );

    let ctx = AppContext::init(config).await?;

    // The HTTP API runs beside the WebSocket server. The WebSocket server
    // owns the shutdown signal; when it stops, the process exits and the
    // HTTP task goes with it.
    let http_ctx = ctx.clone();
    tokio::spawn(async move {
        if let Err(e) = rest::start_http_server(http_ctx).await {
            error!(err = %e, "HTTP server exited");
        }
    });

    ws::run(ctx).await
}

/// Initialize the tracing subscriber. RUST_LOG takes precedence over the
/// configured level so operators can raise verbosity without edits.
fn setup_logging(level: &str, format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    if format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
