//! xnotif Daemon
//!
//! Main process of the xnotif notification system.
//!
//! Responsibilities:
//! - Load configuration and rendering contexts
//! - Read commands from the FIFO
//! - Watch the X connection for expose events and connection loss
//! - Apply every order to the notification queue from one place

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use xnotif_core_layout::{LayoutSettings, NotificationQueue};
use xnotif_daemon::config::Config;
use xnotif_daemon::fifo::CommandFifo;
use xnotif_daemon::orchestrator::{Orchestrator, ORDER_CHANNEL_CAPACITY};
use xnotif_ipc::{CommandSource, Order};
use xnotif_platform_x11::{
    spawn_event_watcher, Connection, ContextRegistry, DisplayEvent, X11PopupFactory,
    XineramaScreens,
};

#[derive(Parser, Debug)]
#[command(name = "xnotif", version, about = "Lightweight X11 notification daemon")]
struct Args {
    /// Configuration file to use instead of the standard locations.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Command FIFO path (overrides global.fifo).
    #[arg(short, long)]
    fifo: Option<PathBuf>,
}

fn parse_log_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// `RUST_LOG` wins over the configured level when set.
fn init_logging(level: &str) -> Result<()> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => {
            let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        Err(_) => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(parse_log_level(level))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn display_order(event: DisplayEvent) -> Order {
    match event {
        DisplayEvent::Exposed => Order::Redraw,
        DisplayEvent::ConnectionLost => Order::Kill,
    }
}

/// Turn Ctrl+C and SIGTERM into a kill order.
fn spawn_signal_handler(orders: mpsc::Sender<Order>, token: CancellationToken) {
    tokio::spawn(async move {
        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                None
            }
        };

        tokio::select! {
            _ = token.cancelled() => return,
            Ok(()) = tokio::signal::ctrl_c() => info!("Ctrl+C received, initiating shutdown..."),
            Some(()) = async {
                match terminate.as_mut() {
                    Some(s) => s.recv().await,
                    None => std::future::pending().await,
                }
            } => info!("SIGTERM received, initiating shutdown..."),
        }
        let _ = orders.send(Order::Kill).await;
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration first: it carries the log level.
    let (config, config_path) = Config::load(args.config.as_deref())?;
    init_logging(&config.daemon.log_level)?;

    info!("xnotif daemon starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config_path.display());

    let settings = LayoutSettings::from_config(&config).context("Invalid layout settings")?;
    info!(
        "Layout: gravity={}, padding hori={} space={}",
        settings.gravity, settings.padding.hori, settings.padding.space
    );

    let conn = Arc::new(Connection::open(None).context("Failed to connect to the X server")?);
    let registry =
        ContextRegistry::load(&conn, &config).context("Failed to load rendering contexts")?;
    let screens = XineramaScreens::load(&conn);
    let queue = NotificationQueue::new(
        screens,
        X11PopupFactory::new(Arc::clone(&conn), registry),
        settings,
    );

    let (order_tx, order_rx) = mpsc::channel::<Order>(ORDER_CHANNEL_CAPACITY);
    let token = CancellationToken::new();

    let fifo_path = args.fifo.unwrap_or_else(|| config.daemon.fifo.clone());
    let fifo = CommandFifo::create(&fifo_path)?;
    let reader = tokio::spawn(fifo.run(CommandSource::new(), order_tx.clone(), token.clone()));

    let watcher = spawn_event_watcher(
        Arc::clone(&conn),
        order_tx.clone(),
        token.clone(),
        display_order,
    )
    .context("Failed to spawn X11 event watcher")?;

    spawn_signal_handler(order_tx.clone(), token.clone());

    let mut orchestrator = Orchestrator::new(queue, &order_tx, token.clone());
    drop(order_tx);

    info!("Ready. Use xnotif-cli to send notifications.");
    orchestrator.run(order_rx).await;

    // Producers observe the token; wait for them before closing the display.
    token.cancel();
    if let Err(e) = reader.await {
        warn!("FIFO reader task failed: {}", e);
    }
    if watcher.join().is_err() {
        warn!("X11 event watcher thread panicked");
    }

    drop(orchestrator);
    drop(conn);
    info!("xnotif daemon stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug"), Level::DEBUG);
        assert_eq!(parse_log_level("WARN"), Level::WARN);
        assert_eq!(parse_log_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_display_events_map_to_orders() {
        assert_eq!(display_order(DisplayEvent::Exposed), Order::Redraw);
        assert_eq!(display_order(DisplayEvent::ConnectionLost), Order::Kill);
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["xnotif", "--config", "/etc/xnotif.toml", "-f", "/tmp/n.fifo"]);
        assert_eq!(args.config, Some(PathBuf::from("/etc/xnotif.toml")));
        assert_eq!(args.fifo, Some(PathBuf::from("/tmp/n.fifo")));
    }
}
