//! Screen geometry and focused-screen detection.

use crate::Connection;
use libc::{c_int, c_uint, c_void};
use std::mem;
use std::sync::Arc;
use tracing::{debug, info, warn};
use x11::{xinerama, xlib};
use xnotif_core_layout::{Geometry, ScreenDirectory, ScreenError, ScreenId};

/// Focus values that name no real window.
const FOCUS_NONE: xlib::Window = 0;
const FOCUS_POINTER_ROOT: xlib::Window = 1;

/// Index of the first screen containing the point.
pub fn screen_at(screens: &[Geometry], x: i32, y: i32) -> Option<ScreenId> {
    screens
        .iter()
        .position(|s| s.contains(x, y))
        .map(|i| i as ScreenId)
}

/// Screens as reported by Xinerama, read once at startup.
///
/// Without an active Xinerama the root window is the only screen.
#[derive(Debug)]
pub struct XineramaScreens {
    conn: Arc<Connection>,
    screens: Vec<Geometry>,
}

impl XineramaScreens {
    pub fn load(conn: &Arc<Connection>) -> Self {
        let mut screens = query_xinerama(conn);
        if screens.is_empty() {
            let (width, height) = conn.root_size();
            debug!("Xinerama inactive, using root window {}x{}", width, height);
            screens.push(Geometry::new(0, 0, width, height));
        }

        for (i, s) in screens.iter().enumerate() {
            info!("Screen {}: {}x{} at ({}, {})", i, s.width, s.height, s.x, s.y);
        }
        Self {
            conn: Arc::clone(conn),
            screens,
        }
    }

    /// Centre of the window holding input focus, in root coordinates.
    fn focus_point(&self) -> Option<(i32, i32)> {
        let display = self.conn.display();
        unsafe {
            let mut focus: xlib::Window = FOCUS_NONE;
            let mut revert: c_int = 0;
            xlib::XGetInputFocus(display, &mut focus, &mut revert);
            if focus == FOCUS_NONE || focus == FOCUS_POINTER_ROOT {
                return None;
            }

            let mut attributes: xlib::XWindowAttributes = mem::zeroed();
            if xlib::XGetWindowAttributes(display, focus, &mut attributes) == 0 {
                return None;
            }

            let (mut x, mut y) = (0, 0);
            let mut child: xlib::Window = 0;
            let same_screen = xlib::XTranslateCoordinates(
                display,
                focus,
                self.conn.root(),
                attributes.width / 2,
                attributes.height / 2,
                &mut x,
                &mut y,
                &mut child,
            );
            (same_screen != 0).then_some((x, y))
        }
    }

    fn pointer_position(&self) -> Option<(i32, i32)> {
        let display = self.conn.display();
        unsafe {
            let (mut root, mut child): (xlib::Window, xlib::Window) = (0, 0);
            let (mut root_x, mut root_y, mut win_x, mut win_y) = (0, 0, 0, 0);
            let mut mask: c_uint = 0;
            let same_screen = xlib::XQueryPointer(
                display,
                self.conn.root(),
                &mut root,
                &mut child,
                &mut root_x,
                &mut root_y,
                &mut win_x,
                &mut win_y,
                &mut mask,
            );
            (same_screen != 0).then_some((root_x, root_y))
        }
    }
}

impl ScreenDirectory for XineramaScreens {
    fn screen_count(&self) -> u32 {
        self.screens.len() as u32
    }

    fn geometry(&self, id: ScreenId) -> Result<Geometry, ScreenError> {
        self.screens
            .get(id as usize)
            .copied()
            .ok_or(ScreenError::InvalidId(id))
    }

    fn focused_screen(&self) -> ScreenId {
        if self.screens.len() == 1 {
            return 0;
        }
        self.focus_point()
            .and_then(|(x, y)| screen_at(&self.screens, x, y))
            .or_else(|| {
                self.pointer_position()
                    .and_then(|(x, y)| screen_at(&self.screens, x, y))
            })
            .unwrap_or(0)
    }
}

fn query_xinerama(conn: &Connection) -> Vec<Geometry> {
    let display = conn.display();
    unsafe {
        if xinerama::XineramaIsActive(display) == 0 {
            return Vec::new();
        }

        let mut count: c_int = 0;
        let infos = xinerama::XineramaQueryScreens(display, &mut count);
        if infos.is_null() {
            warn!("Xinerama is active but returned no screens");
            return Vec::new();
        }

        let screens = std::slice::from_raw_parts(infos, count.max(0) as usize)
            .iter()
            .map(|info| {
                Geometry::new(
                    i32::from(info.x_org),
                    i32::from(info.y_org),
                    i32::from(info.width),
                    i32::from(info.height),
                )
            })
            .collect();
        xlib::XFree(infos as *mut c_void);
        screens
    }
}
