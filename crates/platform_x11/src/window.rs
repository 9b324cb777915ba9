//! Notification popup windows.

use crate::context::{ContextRegistry, RenderingContext};
use crate::{Connection, X11Error};
use libc::{c_char, c_int, c_uchar, c_uint, c_ulong};
use std::ffi::CString;
use std::mem;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, trace};
use x11::xlib;
use xnotif_core_layout::{wrap_text, Popup, PopupError, PopupFactory};

/// Window name used when no title is configured.
const DEFAULT_WINDOW_NAME: &str = "xnotif";

/// The text shown in a popup: `title + " " + body`, or `body` alone.
pub fn compose_text(title: Option<&str>, body: &str) -> String {
    match title {
        Some(title) => format!("{} {}", title, body),
        None => body.to_string(),
    }
}

/// An override-redirect window showing one notification.
///
/// The window is created unmapped; the queue maps it once it fits on its
/// screen. Dropping it destroys the X window.
#[derive(Debug)]
pub struct X11Window {
    conn: Arc<Connection>,
    id: xlib::Window,
    ctx: Rc<RenderingContext>,
    lines: Vec<String>,
    width: i32,
    height: i32,
}

impl X11Window {
    pub fn open(
        conn: &Arc<Connection>,
        ctx: Rc<RenderingContext>,
        title: Option<&str>,
        body: &str,
    ) -> Result<Self, X11Error> {
        let border = ctx.border_width();
        let width = ctx.width();
        let lines = wrap_text(&*ctx, &compose_text(title, body), width - 2 * border);
        let height = lines.len().max(1) as i32 * ctx.font_height() + 2 * border;

        let display = conn.display();
        let id = unsafe {
            let mut attributes: xlib::XSetWindowAttributes = mem::zeroed();
            attributes.override_redirect = xlib::True;
            attributes.background_pixel = ctx.background_pixel();
            attributes.event_mask = xlib::ExposureMask;

            xlib::XCreateWindow(
                display,
                conn.root(),
                0,
                0,
                width as c_uint,
                height as c_uint,
                0,
                conn.depth(),
                xlib::InputOutput as c_uint,
                conn.visual(),
                xlib::CWOverrideRedirect | xlib::CWBackPixel | xlib::CWEventMask,
                &mut attributes,
            )
        };
        if id == 0 {
            return Err(X11Error::CreateWindow(format!(
                "{}x{} for context \"{}\"",
                width,
                height,
                ctx.name()
            )));
        }

        let window = Self {
            conn: Arc::clone(conn),
            id,
            ctx,
            lines,
            width,
            height,
        };
        window.set_properties(title.unwrap_or(DEFAULT_WINDOW_NAME));

        debug!(
            "Created window {:#x} ({}x{}, {} line(s))",
            id,
            width,
            height,
            window.lines.len()
        );
        Ok(window)
    }

    /// Name the window and mark it as a notification for compositors.
    fn set_properties(&self, name: &str) {
        let display = self.conn.display();
        let Ok(c_name) = CString::new(name) else {
            return;
        };

        unsafe {
            xlib::XStoreName(display, self.id, c_name.as_ptr() as *mut c_char);

            let net_wm_name = self.conn.intern_atom("_NET_WM_NAME");
            let utf8_string = self.conn.intern_atom("UTF8_STRING");
            if net_wm_name != 0 && utf8_string != 0 {
                xlib::XChangeProperty(
                    display,
                    self.id,
                    net_wm_name,
                    utf8_string,
                    8,
                    xlib::PropModeReplace,
                    c_name.as_ptr() as *const c_uchar,
                    c_name.as_bytes().len() as c_int,
                );
            }

            let window_type = self.conn.intern_atom("_NET_WM_WINDOW_TYPE");
            let notification = self.conn.intern_atom("_NET_WM_WINDOW_TYPE_NOTIFICATION");
            if window_type != 0 && notification != 0 {
                let data: [c_ulong; 1] = [notification];
                xlib::XChangeProperty(
                    display,
                    self.id,
                    window_type,
                    xlib::XA_ATOM,
                    32,
                    xlib::PropModeReplace,
                    data.as_ptr() as *const c_uchar,
                    1,
                );
            }
        }
    }
}

impl Popup for X11Window {
    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
    }

    fn move_to(&mut self, x: i32, y: i32) {
        trace!("Moving window {:#x} to ({}, {})", self.id, x, y);
        unsafe {
            xlib::XMoveWindow(self.conn.display(), self.id, x, y);
        }
        self.conn.flush();
    }

    fn map(&mut self) {
        unsafe {
            xlib::XMapRaised(self.conn.display(), self.id);
        }
        self.conn.flush();
    }

    fn unmap(&mut self) {
        unsafe {
            xlib::XUnmapWindow(self.conn.display(), self.id);
        }
        self.conn.flush();
    }

    fn redraw(&mut self) {
        let display = self.conn.display();
        let ctx = &self.ctx;
        let border = ctx.border_width();
        let (w, h) = (self.width, self.height);

        unsafe {
            xlib::XFillRectangle(display, self.id, ctx.fill_gc(), 0, 0, w as c_uint, h as c_uint);

            if border > 0 {
                let b = border as c_uint;
                let gc = ctx.border_gc();
                xlib::XFillRectangle(display, self.id, gc, 0, 0, w as c_uint, b);
                xlib::XFillRectangle(display, self.id, gc, 0, h - border, w as c_uint, b);
                xlib::XFillRectangle(display, self.id, gc, 0, 0, b, h as c_uint);
                xlib::XFillRectangle(display, self.id, gc, w - border, 0, b, h as c_uint);
            }

            let mut baseline = border + ctx.ascent();
            for line in &self.lines {
                xlib::XDrawImageString(
                    display,
                    self.id,
                    ctx.text_gc(),
                    border,
                    baseline,
                    line.as_ptr() as *const c_char,
                    line.len() as c_int,
                );
                baseline += ctx.font_height();
            }
        }
        self.conn.flush();
    }

    fn close(self) {
        trace!("Closing window {:#x}", self.id);
        drop(self);
    }
}

impl Drop for X11Window {
    fn drop(&mut self) {
        unsafe {
            xlib::XDestroyWindow(self.conn.display(), self.id);
        }
        self.conn.flush();
    }
}

/// Opens [`X11Window`]s styled by the contexts of a [`ContextRegistry`].
#[derive(Debug)]
pub struct X11PopupFactory {
    conn: Arc<Connection>,
    registry: ContextRegistry,
}

impl X11PopupFactory {
    pub fn new(conn: Arc<Connection>, registry: ContextRegistry) -> Self {
        Self { conn, registry }
    }
}

impl PopupFactory for X11PopupFactory {
    type Popup = X11Window;

    fn open(&mut self, level: &str, title: Option<&str>, body: &str) -> Result<X11Window, PopupError> {
        let ctx = Rc::clone(self.registry.get(level)?);
        Ok(X11Window::open(&self.conn, ctx, title, body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextSpec;

    #[test]
    fn test_compose_with_title() {
        assert_eq!(compose_text(Some("Mail:"), "3 new"), "Mail: 3 new");
    }

    #[test]
    fn test_compose_without_title() {
        assert_eq!(compose_text(None, "3 new"), "3 new");
    }

    /// Needs an X server; passes trivially when `$DISPLAY` is unusable.
    #[test]
    fn test_open_and_paint_on_live_display() {
        let Ok(conn) = Connection::open(None) else {
            return;
        };
        let conn = Arc::new(conn);
        let Ok(ctx) = RenderingContext::create(&conn, "normal", &ContextSpec::default()) else {
            return;
        };
        let ctx = Rc::new(ctx);

        let mut window =
            X11Window::open(&conn, Rc::clone(&ctx), Some("Notification"), "disk almost full")
                .unwrap();
        assert!(window.lines[0].starts_with("Notification "));
        assert_eq!(
            window.height(),
            window.lines.len() as i32 * ctx.font_height() + 2 * ctx.border_width()
        );

        window.move_to(10, 10);
        window.map();
        window.redraw();
        window.unmap();
        window.close();
    }
}
