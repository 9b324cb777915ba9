//! Layout settings resolved from the `global.*` configuration keys.

use crate::{ConfigError, ConfigSource, Geometry};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Default value of every padding in pixels.
pub const DEFAULT_PADDING: i32 = 15;

/// Largest accepted padding. X11 coordinates are 16-bit.
pub const MAX_PADDING: i32 = i16::MAX as i32;

/// Title prepended to every notification unless `global.title` overrides it.
pub const DEFAULT_TITLE: &str = "Notification";

const VERT_PADDING_KEY: &str = "global.padding.vert";

/// The screen corner notifications stack from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Gravity {
    fn is_right(self) -> bool {
        matches!(self, Gravity::TopRight | Gravity::BottomRight)
    }

    fn is_bottom(self) -> bool {
        matches!(self, Gravity::BottomLeft | Gravity::BottomRight)
    }

    /// Compute the top-left corner of a `width` x `height` popup whose stacking
    /// cursor is `offset` pixels away from the gravity edge of `screen`.
    pub fn place(
        self,
        screen: &Geometry,
        padding: Padding,
        offset: i32,
        width: i32,
        height: i32,
    ) -> (i32, i32) {
        let x = if self.is_right() {
            screen
                .right()
                .saturating_sub(width)
                .saturating_sub(padding.hori)
        } else {
            screen.x.saturating_add(padding.hori)
        };
        let y = if self.is_bottom() {
            screen
                .bottom()
                .saturating_sub(offset)
                .saturating_sub(height)
        } else {
            screen.y.saturating_add(offset)
        };
        (x, y)
    }
}

impl FromStr for Gravity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top_left" => Ok(Gravity::TopLeft),
            "top_right" => Ok(Gravity::TopRight),
            "bottom_left" => Ok(Gravity::BottomLeft),
            "bottom_right" => Ok(Gravity::BottomRight),
            other => Err(format!("unknown gravity \"{}\"", other)),
        }
    }
}

impl fmt::Display for Gravity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Gravity::TopLeft => "top_left",
            Gravity::TopRight => "top_right",
            Gravity::BottomLeft => "bottom_left",
            Gravity::BottomRight => "bottom_right",
        };
        f.write_str(name)
    }
}

/// Paddings in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    /// Distance between the screen side and the notifications.
    pub hori: i32,
    /// Gap between the gravity edge and the first notification, and between
    /// two stacked notifications.
    pub space: i32,
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            hori: DEFAULT_PADDING,
            space: DEFAULT_PADDING,
        }
    }
}

/// Settings that drive [`NotificationQueue`](crate::NotificationQueue) layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutSettings {
    pub gravity: Gravity,
    pub padding: Padding,
    /// Title prepended to every notification text; `None` shows the body alone.
    pub title: Option<String>,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            gravity: Gravity::default(),
            padding: Padding::default(),
            title: Some(DEFAULT_TITLE.to_string()),
        }
    }
}

impl LayoutSettings {
    /// Resolve the settings from `global.gravity`, `global.padding.*` and `global.title`.
    ///
    /// An unknown gravity falls back to the default with a warning; a malformed
    /// or out-of-range padding is an error. An empty `global.title` disables
    /// the title.
    pub fn from_config(config: &impl ConfigSource) -> Result<Self, ConfigError> {
        let gravity = match config.opt_string("global.gravity")? {
            Some(name) => name.trim().parse().unwrap_or_else(|e| {
                warn!("{}, using {}", e, Gravity::default());
                Gravity::default()
            }),
            None => Gravity::default(),
        };

        if config.has(VERT_PADDING_KEY) {
            warn!(
                "{} has no effect, notifications start global.padding.space from the edge",
                VERT_PADDING_KEY
            );
        }

        let padding = Padding {
            hori: padding_value(config, "global.padding.hori")?,
            space: padding_value(config, "global.padding.space")?,
        };

        let title = match config.opt_string("global.title")? {
            Some(t) if t.trim().is_empty() => None,
            Some(t) => Some(t),
            None => Some(DEFAULT_TITLE.to_string()),
        };

        Ok(Self {
            gravity,
            padding,
            title,
        })
    }
}

fn padding_value(config: &impl ConfigSource, key: &str) -> Result<i32, ConfigError> {
    match config.opt_int(key)? {
        Some(v) if !(0..=MAX_PADDING).contains(&v) => Err(ConfigError::InvalidFormat {
            key: key.to_string(),
            value: v.to_string(),
            reason: format!("padding must be between 0 and {}", MAX_PADDING),
        }),
        Some(v) => Ok(v),
        None => Ok(DEFAULT_PADDING),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapConfig(HashMap<&'static str, &'static str>);

    impl ConfigSource for MapConfig {
        fn has(&self, key: &str) -> bool {
            self.0.contains_key(key)
        }

        fn string(&self, key: &str) -> Result<String, ConfigError> {
            self.0
                .get(key)
                .map(|v| v.to_string())
                .ok_or_else(|| ConfigError::NotFound(key.to_string()))
        }

        fn int(&self, key: &str) -> Result<i32, ConfigError> {
            let value = self.string(key)?;
            value.parse().map_err(|_| ConfigError::InvalidFormat {
                key: key.to_string(),
                value,
                reason: "not an integer".to_string(),
            })
        }
    }

    #[test]
    fn test_defaults_without_config() {
        let settings = LayoutSettings::from_config(&MapConfig(HashMap::new())).unwrap();
        assert_eq!(settings.gravity, Gravity::TopRight);
        assert_eq!(settings.padding, Padding::default());
        assert_eq!(settings.title.as_deref(), Some(DEFAULT_TITLE));
    }

    #[test]
    fn test_settings_from_config() {
        let cfg = MapConfig(HashMap::from([
            ("global.gravity", "bottom_left"),
            ("global.padding.hori", "30"),
            ("global.padding.space", "5"),
            ("global.title", "Alert:"),
        ]));
        let settings = LayoutSettings::from_config(&cfg).unwrap();
        assert_eq!(settings.gravity, Gravity::BottomLeft);
        assert_eq!(
            settings.padding,
            Padding {
                hori: 30,
                space: 5
            }
        );
        assert_eq!(settings.title.as_deref(), Some("Alert:"));
    }

    #[test]
    fn test_unknown_gravity_falls_back() {
        let cfg = MapConfig(HashMap::from([("global.gravity", "center")]));
        let settings = LayoutSettings::from_config(&cfg).unwrap();
        assert_eq!(settings.gravity, Gravity::TopRight);
    }

    #[test]
    fn test_negative_padding_rejected() {
        let cfg = MapConfig(HashMap::from([("global.padding.space", "-3")]));
        assert!(matches!(
            LayoutSettings::from_config(&cfg),
            Err(ConfigError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_oversized_padding_rejected() {
        let cfg = MapConfig(HashMap::from([("global.padding.space", "2147483647")]));
        assert!(matches!(
            LayoutSettings::from_config(&cfg),
            Err(ConfigError::InvalidFormat { .. })
        ));

        let cfg = MapConfig(HashMap::from([("global.padding.hori", "32767")]));
        assert_eq!(LayoutSettings::from_config(&cfg).unwrap().padding.hori, MAX_PADDING);
    }

    #[test]
    fn test_vert_padding_is_ignored() {
        let cfg = MapConfig(HashMap::from([
            ("global.padding.vert", "40"),
            ("global.padding.space", "5"),
        ]));
        let settings = LayoutSettings::from_config(&cfg).unwrap();
        assert_eq!(settings.padding, Padding { hori: 15, space: 5 });
    }

    #[test]
    fn test_empty_title_disables_it() {
        let cfg = MapConfig(HashMap::from([("global.title", "  ")]));
        assert_eq!(LayoutSettings::from_config(&cfg).unwrap().title, None);
    }

    #[test]
    fn test_gravity_roundtrip_names() {
        for g in [
            Gravity::TopLeft,
            Gravity::TopRight,
            Gravity::BottomLeft,
            Gravity::BottomRight,
        ] {
            assert_eq!(g.to_string().parse::<Gravity>(), Ok(g));
        }
    }

    #[test]
    fn test_place_top_right() {
        let screen = Geometry::new(0, 0, 1920, 1080);
        let (x, y) = Gravity::TopRight.place(&screen, Padding::default(), 15, 500, 60);
        assert_eq!(x + 500, 1920 - 15);
        assert_eq!(y, 15);
    }

    #[test]
    fn test_place_top_left() {
        let screen = Geometry::new(0, 0, 1920, 1080);
        let padding = Padding { hori: 25, space: 15 };
        assert_eq!(Gravity::TopLeft.place(&screen, padding, 15, 500, 60), (25, 15));
        assert_eq!(Gravity::TopLeft.place(&screen, padding, 90, 500, 60), (25, 90));
    }

    #[test]
    fn test_place_saturates_on_huge_offsets() {
        let padding = Padding {
            hori: i32::MAX,
            space: 15,
        };
        let left = Geometry::new(-2000, -2000, 1920, 1080);
        let (x, y) = Gravity::BottomRight.place(&left, padding, i32::MAX, 500, 60);
        assert_eq!((x, y), (i32::MIN, i32::MIN));

        let right = Geometry::new(100, 100, 1920, 1080);
        let (x, y) = Gravity::TopLeft.place(&right, padding, i32::MAX, 500, 60);
        assert_eq!((x, y), (i32::MAX, i32::MAX));
    }

    #[test]
    fn test_place_bottom_left_mirrors_vertically() {
        let screen = Geometry::new(0, 0, 1920, 1080);
        let (x, y) = Gravity::BottomLeft.place(&screen, Padding::default(), 15, 500, 60);
        assert_eq!(x, 15);
        assert_eq!(y + 60, 1080 - 15);
    }

    #[test]
    fn test_place_respects_screen_origin() {
        let screen = Geometry::new(1920, 200, 1280, 1024);
        let (x, y) = Gravity::BottomRight.place(&screen, Padding::default(), 15, 400, 100);
        assert_eq!(x, 1920 + 1280 - 400 - 15);
        assert_eq!(y, 200 + 1024 - 15 - 100);
    }
}
