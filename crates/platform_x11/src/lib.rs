//! xnotif Platform X11
//!
//! X11-specific notification rendering using Xlib.
//!
//! This crate handles:
//! - The shared display connection and X error reporting
//! - Named rendering contexts (font, colors, border) loaded from configuration
//! - Override-redirect popup windows with word-wrapped text
//! - Screen geometry via Xinerama and focused-screen detection
//! - A watcher thread turning display events into daemon orders

pub mod color;
pub mod connection;
pub mod context;
pub mod events;
pub mod screens;
pub mod window;

pub use color::{parse_color, Rgb};
pub use connection::Connection;
pub use context::{context_names, ContextRegistry, ContextSpec, RenderingContext};
pub use events::{spawn_event_watcher, DisplayEvent};
pub use screens::{screen_at, XineramaScreens};
pub use window::{compose_text, X11PopupFactory, X11Window};

use thiserror::Error;
use xnotif_core_layout::{ConfigError, PopupError};

/// Errors that can occur during X11 operations.
#[derive(Debug, Error)]
pub enum X11Error {
    #[error("Failed to initialize Xlib thread support")]
    InitThreads,

    #[error("Failed to open X display {0}")]
    OpenDisplay(String),

    #[error("Failed to load font \"{0}\"")]
    FontLoad(String),

    #[error("Failed to allocate color {0}")]
    ColorAlloc(String),

    #[error("Failed to create graphics context for \"{0}\"")]
    CreateGc(String),

    #[error("Failed to create window: {0}")]
    CreateWindow(String),

    #[error("Unknown rendering context \"{0}\"")]
    BadContext(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<X11Error> for PopupError {
    fn from(err: X11Error) -> Self {
        match err {
            X11Error::BadContext(name) => PopupError::BadContext(name),
            other => PopupError::Protocol(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_context_maps_to_popup_error() {
        let err: PopupError = X11Error::BadContext("urgent".to_string()).into();
        assert_eq!(err, PopupError::BadContext("urgent".to_string()));
    }

    #[test]
    fn test_other_errors_map_to_protocol() {
        let err: PopupError = X11Error::CreateWindow("BadAlloc".to_string()).into();
        assert_eq!(
            err,
            PopupError::Protocol("Failed to create window: BadAlloc".to_string())
        );
    }
}
