//! The orchestrator: the only code that mutates the notification queue.
//!
//! Orders arrive one at a time over a bounded channel from the FIFO reader,
//! the display event watcher, signal handlers and expiry timers.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use xnotif_core_layout::{
    NotificationId, NotificationQueue, PopupFactory, QueueError, ScreenDirectory,
};
use xnotif_ipc::{CloseTarget, Order};

/// Capacity of the order channel shared by every producer.
pub const ORDER_CHANNEL_CAPACITY: usize = 64;

/// Whether the orchestrator keeps accepting orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorStatus {
    Running,
    Terminated,
}

pub struct Orchestrator<S, F: PopupFactory> {
    queue: NotificationQueue<S, F>,
    /// Used by expiry timers; weak so the channel still closes once every
    /// external producer is gone.
    orders: mpsc::WeakSender<Order>,
    token: CancellationToken,
}

impl<S: ScreenDirectory, F: PopupFactory> Orchestrator<S, F> {
    pub fn new(
        queue: NotificationQueue<S, F>,
        orders: &mpsc::Sender<Order>,
        token: CancellationToken,
    ) -> Self {
        Self {
            queue,
            orders: orders.downgrade(),
            token,
        }
    }

    pub fn queue(&self) -> &NotificationQueue<S, F> {
        &self.queue
    }

    /// Apply one order.
    ///
    /// Failures are logged and scoped to the order; only [`Order::Kill`]
    /// terminates.
    pub fn handle(&mut self, order: Order) -> OrchestratorStatus {
        match order {
            Order::Kill => {
                info!("Kill received, closing {} notification(s)", self.queue.len());
                self.shutdown();
                return OrchestratorStatus::Terminated;
            }
            Order::Close(CloseTarget::All) => self.queue.close_all(),
            Order::Close(CloseTarget::Top) => {
                let screen = self.queue.focused_screen();
                if let Err(e) = self.queue.close_top(screen) {
                    warn!("Cannot close top notification: {}", e);
                }
            }
            Order::Close(CloseTarget::Id(id)) => match self.queue.close(id) {
                Ok(()) => {}
                // Expiry timers race with explicit closes.
                Err(QueueError::NotFound(_)) => debug!("Notification {} already closed", id),
                Err(e) => warn!("Cannot close notification {}: {}", id, e),
            },
            Order::Notify { time, level, text } => match self.queue.open(&level, &text) {
                Ok(id) => {
                    if time > 0 {
                        self.schedule_expiry(id, Duration::from_secs(u64::from(time)));
                    }
                }
                Err(e) => warn!("Cannot open \"{}\" notification: {}", level, e),
            },
            Order::Redraw => self.queue.redraw_all(),
        }
        OrchestratorStatus::Running
    }

    /// Receive and apply orders until a kill or until every producer is gone.
    pub async fn run(&mut self, mut orders: mpsc::Receiver<Order>) -> OrchestratorStatus {
        while let Some(order) = orders.recv().await {
            debug!("Order: {}", order);
            if self.handle(order) == OrchestratorStatus::Terminated {
                return OrchestratorStatus::Terminated;
            }
        }

        info!("Every order producer is gone, shutting down");
        self.shutdown();
        OrchestratorStatus::Terminated
    }

    fn shutdown(&mut self) {
        self.queue.close_all();
        self.token.cancel();
    }

    /// Send `Close(Id(id))` after `delay` unless shutdown comes first.
    fn schedule_expiry(&self, id: NotificationId, delay: Duration) {
        let orders = self.orders.clone();
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Some(tx) = orders.upgrade() {
                        let _ = tx.send(Order::Close(CloseTarget::Id(id))).await;
                    }
                }
            }
        });
    }
}
