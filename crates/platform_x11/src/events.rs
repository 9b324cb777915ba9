//! Display event watcher thread.

use crate::Connection;
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::io;
use std::mem;
use std::os::fd::BorrowedFd;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};
use x11::xlib;

/// How long one poll waits before the cancellation token is checked again.
const POLL_INTERVAL_MS: u16 = 100;

/// Display events the daemon reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    /// A popup was (partly) uncovered and must be repainted.
    Exposed,
    /// The server connection failed.
    ConnectionLost,
}

/// Spawn the `x11-events` thread.
///
/// The thread forwards [`DisplayEvent`]s through `translate` into `tx` until
/// `token` is cancelled, the channel closes or the connection is lost. Sends
/// block while the channel is full.
pub fn spawn_event_watcher<T, F>(
    conn: Arc<Connection>,
    tx: mpsc::Sender<T>,
    token: CancellationToken,
    translate: F,
) -> io::Result<JoinHandle<()>>
where
    T: Send + 'static,
    F: Fn(DisplayEvent) -> T + Send + 'static,
{
    std::thread::Builder::new()
        .name("x11-events".into())
        .spawn(move || {
            info!("X11 event watcher started");
            watch(&conn, &tx, &token, &translate);
            info!("X11 event watcher stopped");
        })
}

fn watch<T, F>(conn: &Connection, tx: &mpsc::Sender<T>, token: &CancellationToken, translate: &F)
where
    F: Fn(DisplayEvent) -> T,
{
    // SAFETY: the fd stays open as long as `conn` is alive, which outlives this loop.
    let fd = unsafe { BorrowedFd::borrow_raw(conn.event_fd()) };

    while !token.is_cancelled() {
        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::from(POLL_INTERVAL_MS)) {
            Ok(_) => {}
            Err(Errno::EINTR) => continue,
            Err(e) => {
                error!("Polling the X connection failed: {}", e);
                let _ = tx.blocking_send(translate(DisplayEvent::ConnectionLost));
                return;
            }
        }

        let revents = fds[0].revents().unwrap_or(PollFlags::empty());
        if revents.intersects(PollFlags::POLLHUP | PollFlags::POLLERR) {
            error!("X server closed the connection");
            let _ = tx.blocking_send(translate(DisplayEvent::ConnectionLost));
            return;
        }

        // Xlib may already hold events read during other requests, so drain
        // on every wakeup, not only when the socket is readable.
        for event in drain_events(conn) {
            if tx.blocking_send(translate(event)).is_err() {
                debug!("Order channel closed, stopping event watcher");
                return;
            }
        }
    }
}

fn drain_events(conn: &Connection) -> Vec<DisplayEvent> {
    let display = conn.display();
    let mut events = Vec::new();
    unsafe {
        while xlib::XPending(display) > 0 {
            let mut xevent: xlib::XEvent = mem::zeroed();
            xlib::XNextEvent(display, &mut xevent);
            match xevent.get_type() {
                xlib::Expose if xevent.expose.count == 0 => {
                    trace!("Expose on window {:#x}", xevent.expose.window);
                    // One redraw repaints every popup.
                    if !events.contains(&DisplayEvent::Exposed) {
                        events.push(DisplayEvent::Exposed);
                    }
                }
                _ => {}
            }
        }
    }
    events
}
