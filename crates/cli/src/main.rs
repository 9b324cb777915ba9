//! xnotif CLI
//!
//! Command-line interface for the xnotif notification daemon.
//!
//! Commands are written as text lines to the daemon's FIFO.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::net::unix::pipe;
use xnotif_ipc::{encode, CloseTarget, Order, DEFAULT_FIFO_PATH};

#[derive(Parser)]
#[command(name = "xnotif-cli")]
#[command(author, version, about = "Send commands to the xnotif notification daemon")]
struct Cli {
    /// FIFO the daemon listens on
    #[arg(short, long, default_value = DEFAULT_FIFO_PATH)]
    fifo: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a notification
    Notify {
        /// Seconds before it closes itself (0 keeps it until closed)
        #[arg(short, long, default_value = "0")]
        time: u32,
        /// Rendering context to use, as listed in global.list
        #[arg(short, long, default_value = "normal")]
        level: String,
        /// Notification text
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Close a notification by id, or the oldest one on the focused screen
    Close {
        id: Option<u32>,
    },
    /// Close every notification
    CloseAll,
    /// Repaint every visible notification
    Redraw,
    /// Stop the daemon
    Kill,
}

fn build_order(command: Commands) -> Result<Order> {
    let order = match command {
        Commands::Notify { time, level, text } => {
            if level.is_empty() || level.contains(char::is_whitespace) {
                bail!("Level must be a single word: {:?}", level);
            }
            let text = text.join(" ");
            if text.trim().is_empty() {
                bail!("Notification text is empty");
            }
            Order::Notify { time, level, text }
        }
        Commands::Close { id: Some(id) } => Order::Close(CloseTarget::Id(id)),
        Commands::Close { id: None } => Order::Close(CloseTarget::Top),
        Commands::CloseAll => Order::Close(CloseTarget::All),
        Commands::Redraw => Order::Redraw,
        Commands::Kill => Order::Kill,
    };
    Ok(order)
}

async fn send_order(fifo: &Path, order: &Order) -> Result<()> {
    let mut sender = match pipe::OpenOptions::new().open_sender(fifo) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            bail!("Daemon not running ({} does not exist)", fifo.display())
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to open FIFO {}", fifo.display()))
        }
    };

    let line = format!("{}\n", encode(order));
    sender
        .write_all(line.as_bytes())
        .await
        .context("Failed to write command")?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let order = build_order(cli.command)?;
    send_order(&cli.fifo, &order).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_for(args: &[&str]) -> Result<Order> {
        let cli = Cli::try_parse_from(args)?;
        build_order(cli.command)
    }

    #[test]
    fn test_notify_joins_words() {
        let order = order_for(&["xnotif-cli", "notify", "-t", "5", "-l", "urgent", "disk", "full"])
            .unwrap();
        assert_eq!(
            order,
            Order::Notify {
                time: 5,
                level: "urgent".to_string(),
                text: "disk full".to_string(),
            }
        );
        assert_eq!(encode(&order), "notif 5 urgent disk full");
    }

    #[test]
    fn test_notify_defaults() {
        let order = order_for(&["xnotif-cli", "notify", "hello"]).unwrap();
        assert_eq!(encode(&order), "notif 0 normal hello");
    }

    #[test]
    fn test_notify_requires_text() {
        assert!(order_for(&["xnotif-cli", "notify"]).is_err());
        assert!(order_for(&["xnotif-cli", "notify", "  "]).is_err());
    }

    #[test]
    fn test_level_must_be_one_word() {
        assert!(order_for(&["xnotif-cli", "notify", "-l", "very urgent", "x"]).is_err());
    }

    #[test]
    fn test_close_forms() {
        assert_eq!(
            order_for(&["xnotif-cli", "close"]).unwrap(),
            Order::Close(CloseTarget::Top)
        );
        assert_eq!(
            order_for(&["xnotif-cli", "close", "7"]).unwrap(),
            Order::Close(CloseTarget::Id(7))
        );
        assert_eq!(
            order_for(&["xnotif-cli", "close-all"]).unwrap(),
            Order::Close(CloseTarget::All)
        );
    }

    #[test]
    fn test_fifo_override() {
        let cli = Cli::try_parse_from(["xnotif-cli", "--fifo", "/tmp/other.fifo", "kill"]).unwrap();
        assert_eq!(cli.fifo, PathBuf::from("/tmp/other.fifo"));
        assert_eq!(build_order(cli.command).unwrap(), Order::Kill);
    }

    #[tokio::test]
    async fn test_missing_fifo_reports_daemon_not_running() {
        let path = PathBuf::from("/nonexistent/xnotif.fifo");
        let err = send_order(&path, &Order::Redraw).await.unwrap_err();
        assert!(err.to_string().contains("Daemon not running"));
    }
}
