//! xnotif Core Layout Engine
//!
//! Platform-agnostic notification queue and stacking layout for xnotif.
//!
//! This crate implements the per-screen notification model where:
//! - Each screen keeps its notifications in arrival order
//! - Notifications stack from a configurable screen corner (the gravity)
//! - Notifications that do not fit stay pending until space frees up
//!
//! Everything that touches the display server is expressed as a capability
//! trait ([`Popup`], [`PopupFactory`], [`ScreenDirectory`], [`TextMeasure`]),
//! and configuration is read through [`ConfigSource`].

mod queue;
mod settings;
mod wrap;

pub use queue::{Notification, NotificationQueue, Visibility};
pub use settings::{Gravity, LayoutSettings, Padding, DEFAULT_PADDING, DEFAULT_TITLE, MAX_PADDING};
pub use wrap::{wrap_text, TextMeasure};

use thiserror::Error;

/// Unique identifier for a notification.
/// Ids are allocated process-wide, never per screen.
pub type NotificationId = u32;

/// Index of a screen in the [`ScreenDirectory`].
pub type ScreenId = u32;

/// Errors raised while reading configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("No entry for \"{0}\"")]
    NotFound(String),

    #[error("Entry \"{key}\" has invalid format: \"{value}\" ({reason})")]
    InvalidFormat {
        key: String,
        value: String,
        reason: String,
    },
}

/// Errors raised by the screen directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScreenError {
    #[error("Not a valid screen id: {0}")]
    InvalidId(ScreenId),
}

/// Errors raised when a popup cannot be opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PopupError {
    #[error("Unknown rendering context \"{0}\"")]
    BadContext(String),

    #[error("Display server request failed: {0}")]
    Protocol(String),
}

/// Errors that can occur during queue operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error(transparent)]
    Popup(#[from] PopupError),

    #[error("Notification {0} not found")]
    NotFound(NotificationId),

    #[error("Screen {0} has no notifications")]
    EmptyScreen(ScreenId),

    #[error("Notification ids exhausted")]
    IdsExhausted,
}

/// A screen rectangle in display-server coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Geometry {
    /// Create a new geometry.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check whether a point lies inside this rectangle.
    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Get the right edge x-coordinate.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Get the bottom edge y-coordinate.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }
}

/// Read access to the attached screens.
pub trait ScreenDirectory {
    /// Number of screens. Always at least one on a working display.
    fn screen_count(&self) -> u32;

    /// Geometry of the screen with the given index.
    fn geometry(&self, id: ScreenId) -> Result<Geometry, ScreenError>;

    /// Index of the screen currently holding input focus.
    fn focused_screen(&self) -> ScreenId;
}

/// One on-screen popup as seen by the layout engine.
///
/// Sizes are the outer size of the popup, borders included.
pub trait Popup {
    fn width(&self) -> i32;
    fn height(&self) -> i32;

    /// Reposition the popup. Best effort: transport errors are not reported.
    fn move_to(&mut self, x: i32, y: i32);

    fn map(&mut self);
    fn unmap(&mut self);
    fn redraw(&mut self);

    /// Destroy the popup. Consuming `self` rules out a second close.
    fn close(self);
}

/// Creates popups for a rendering context.
pub trait PopupFactory {
    type Popup: Popup;

    /// Open a popup styled by the context named `level`.
    ///
    /// The wrapped text is `title + " " + body`, or just `body` without a title.
    fn open(&mut self, level: &str, title: Option<&str>, body: &str)
        -> Result<Self::Popup, PopupError>;
}

/// Hierarchical configuration with dot-separated keys such as `global.padding.space`.
pub trait ConfigSource {
    fn has(&self, key: &str) -> bool;
    fn string(&self, key: &str) -> Result<String, ConfigError>;
    fn int(&self, key: &str) -> Result<i32, ConfigError>;

    /// Like [`string`](Self::string), but a missing key is `Ok(None)`.
    fn opt_string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        if self.has(key) {
            self.string(key).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Like [`int`](Self::int), but a missing key is `Ok(None)`.
    fn opt_int(&self, key: &str) -> Result<Option<i32>, ConfigError> {
        if self.has(key) {
            self.int(key).map(Some)
        } else {
            Ok(None)
        }
    }
}
