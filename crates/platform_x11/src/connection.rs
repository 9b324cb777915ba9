//! Shared Xlib display connection.

use crate::X11Error;
use libc::{c_char, c_int};
use std::ffi::{CStr, CString};
use std::os::unix::io::RawFd;
use std::ptr;
use tracing::{debug, error, info, warn};
use x11::xlib;

const ERROR_TEXT_LEN: usize = 256;

/// An open connection to the X server.
///
/// Xlib thread support is initialized before the display is opened, so the
/// connection can be shared between the orchestrator and the event watcher.
/// The display is closed when the last owner drops it.
#[derive(Debug)]
pub struct Connection {
    display: *mut xlib::Display,
    screen: c_int,
    root: xlib::Window,
    colormap: xlib::Colormap,
    visual: *mut xlib::Visual,
    depth: c_int,
}

// SAFETY: XInitThreads has run before XOpenDisplay, so Xlib locks the display
// internally around every request.
unsafe impl Send for Connection {}
unsafe impl Sync for Connection {}

impl Connection {
    /// Connect to `name`, or to `$DISPLAY` when `None`.
    pub fn open(name: Option<&str>) -> Result<Self, X11Error> {
        // SAFETY: first Xlib call made by this process.
        if unsafe { xlib::XInitThreads() } == 0 {
            return Err(X11Error::InitThreads);
        }

        let label = name
            .map(str::to_string)
            .or_else(|| std::env::var("DISPLAY").ok())
            .unwrap_or_else(|| "(unset)".to_string());
        let c_name = name
            .map(CString::new)
            .transpose()
            .map_err(|_| X11Error::OpenDisplay(label.clone()))?;

        let display = unsafe {
            xlib::XOpenDisplay(c_name.as_ref().map_or(ptr::null(), |n| n.as_ptr()))
        };
        if display.is_null() {
            return Err(X11Error::OpenDisplay(label));
        }

        // SAFETY: display is a live connection from XOpenDisplay.
        let conn = unsafe {
            xlib::XSetErrorHandler(Some(log_x_error));
            xlib::XSetIOErrorHandler(Some(log_io_error));

            let screen = xlib::XDefaultScreen(display);
            Connection {
                display,
                screen,
                root: xlib::XRootWindow(display, screen),
                colormap: xlib::XDefaultColormap(display, screen),
                visual: xlib::XDefaultVisual(display, screen),
                depth: xlib::XDefaultDepth(display, screen),
            }
        };

        info!("Connected to X display {} (screen {})", label, conn.screen);
        Ok(conn)
    }

    /// Raw display pointer, valid for the lifetime of `self`.
    #[inline]
    pub fn display(&self) -> *mut xlib::Display {
        self.display
    }

    #[inline]
    pub fn screen(&self) -> c_int {
        self.screen
    }

    #[inline]
    pub fn root(&self) -> xlib::Window {
        self.root
    }

    #[inline]
    pub fn colormap(&self) -> xlib::Colormap {
        self.colormap
    }

    #[inline]
    pub fn visual(&self) -> *mut xlib::Visual {
        self.visual
    }

    #[inline]
    pub fn depth(&self) -> c_int {
        self.depth
    }

    /// Size of the default screen's root window.
    pub fn root_size(&self) -> (i32, i32) {
        unsafe {
            (
                xlib::XDisplayWidth(self.display, self.screen),
                xlib::XDisplayHeight(self.display, self.screen),
            )
        }
    }

    /// File descriptor of the server socket, for polling.
    pub fn event_fd(&self) -> RawFd {
        unsafe { xlib::XConnectionNumber(self.display) }
    }

    /// Look up (or create) an atom by name. Returns 0 on failure.
    pub fn intern_atom(&self, name: &str) -> xlib::Atom {
        match CString::new(name) {
            Ok(c_name) => unsafe { xlib::XInternAtom(self.display, c_name.as_ptr(), xlib::False) },
            Err(_) => 0,
        }
    }

    /// Send every buffered request to the server.
    pub fn flush(&self) {
        unsafe {
            xlib::XFlush(self.display);
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        debug!("Closing X display connection");
        unsafe {
            let status = xlib::XCloseDisplay(self.display);
            if status != 0 {
                warn!("XCloseDisplay returned {}", status);
            }
        }
    }
}

/// Logs asynchronous protocol errors instead of exiting.
unsafe extern "C" fn log_x_error(display: *mut xlib::Display, event: *mut xlib::XErrorEvent) -> c_int {
    if event.is_null() {
        return 0;
    }
    let event = &*event;
    let mut buf = [0 as c_char; ERROR_TEXT_LEN];
    xlib::XGetErrorText(
        display,
        event.error_code as c_int,
        buf.as_mut_ptr(),
        ERROR_TEXT_LEN as c_int,
    );
    let text = CStr::from_ptr(buf.as_ptr()).to_string_lossy();
    error!(
        "X error: {} (request {}.{}, resource {:#x})",
        text, event.request_code, event.minor_code, event.resourceid
    );
    0
}

/// Xlib terminates the process once this returns.
unsafe extern "C" fn log_io_error(_display: *mut xlib::Display) -> c_int {
    error!("Lost connection to the X server");
    0
}
