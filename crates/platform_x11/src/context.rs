//! Rendering contexts: one font, color set and border per notification level.
//!
//! The contexts are described in configuration:
//!
//! ```toml
//! [global]
//! list = "normal,urgent"
//! width = 400
//!
//! [global.gc]
//! fg = "#FFFFFF"
//! bg = "#000000"
//!
//! [urgent.gc]
//! bc = "#FF0000"
//! ```
//!
//! `global.gc.*` and `global.width` seed every level; each level overrides
//! whichever fields it sets.

use crate::color::{parse_color, Rgb};
use crate::{Connection, X11Error};
use libc::{c_char, c_int, c_ulong};
use std::collections::HashMap;
use std::ffi::CString;
use std::ptr;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use x11::xlib;
use xnotif_core_layout::{ConfigError, ConfigSource, TextMeasure};

pub const DEFAULT_FONT: &str = "-*-terminal-medium-r-*-*-14-*-*-*-*-*-iso8859-*";
/// Tried when the built-in default font is not installed.
pub const FALLBACK_FONT: &str = "fixed";
pub const DEFAULT_BORDER_WIDTH: i32 = 5;
pub const DEFAULT_BOX_WIDTH: i32 = 500;

/// The configured look of a rendering context, before any X resource exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSpec {
    pub foreground: Rgb,
    pub background: Rgb,
    pub border_color: Rgb,
    pub border_width: i32,
    /// Outer width of every popup using this context.
    pub width: i32,
    pub font: String,
    /// Whether `font` was set in the configuration.
    pub font_configured: bool,
}

impl Default for ContextSpec {
    fn default() -> Self {
        Self {
            foreground: Rgb::WHITE,
            background: Rgb::BLACK,
            border_color: Rgb::WHITE,
            border_width: DEFAULT_BORDER_WIDTH,
            width: DEFAULT_BOX_WIDTH,
            font: DEFAULT_FONT.to_string(),
            font_configured: false,
        }
    }
}

impl ContextSpec {
    /// Resolve `<prefix>.gc.*` and `<prefix>.width`, taking unset fields from `base`.
    pub fn from_config(
        config: &impl ConfigSource,
        prefix: &str,
        base: &ContextSpec,
    ) -> Result<Self, ConfigError> {
        let color = |field: &str, fallback: Rgb| -> Result<Rgb, ConfigError> {
            Ok(config
                .opt_string(&format!("{}.gc.{}", prefix, field))?
                .map(|s| parse_color(s.trim()))
                .unwrap_or(fallback))
        };

        let font = config.opt_string(&format!("{}.gc.font", prefix))?;
        let spec = ContextSpec {
            foreground: color("fg", base.foreground)?,
            background: color("bg", base.background)?,
            border_color: color("bc", base.border_color)?,
            border_width: config
                .opt_int(&format!("{}.gc.width", prefix))?
                .unwrap_or(base.border_width),
            width: config
                .opt_int(&format!("{}.width", prefix))?
                .unwrap_or(base.width),
            font_configured: font.is_some() || base.font_configured,
            font: font.unwrap_or_else(|| base.font.clone()),
        };

        if spec.border_width < 0 {
            return Err(ConfigError::InvalidFormat {
                key: format!("{}.gc.width", prefix),
                value: spec.border_width.to_string(),
                reason: "border width must not be negative".to_string(),
            });
        }
        if spec.width <= 2 * spec.border_width {
            return Err(ConfigError::InvalidFormat {
                key: format!("{}.width", prefix),
                value: spec.width.to_string(),
                reason: "width must exceed twice the border width".to_string(),
            });
        }
        Ok(spec)
    }
}

/// Names listed in `global.list`, trimmed, in order, without empties or repeats.
pub fn context_names(config: &impl ConfigSource) -> Result<Vec<String>, ConfigError> {
    let list = config.string("global.list")?;
    let mut names: Vec<String> = Vec::new();
    for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if names.iter().any(|n| n == name) {
            warn!("Rendering context \"{}\" listed twice", name);
            continue;
        }
        names.push(name.to_string());
    }

    if names.is_empty() {
        return Err(ConfigError::InvalidFormat {
            key: "global.list".to_string(),
            value: list,
            reason: "no rendering context named".to_string(),
        });
    }
    Ok(names)
}

/// The X resources of one context: a font, its colors and three GCs
/// (text, background fill, border).
///
/// Every resource is released on drop, including after a partially failed
/// [`create`](Self::create).
#[derive(Debug)]
pub struct RenderingContext {
    conn: Arc<Connection>,
    name: String,
    font: *mut xlib::XFontStruct,
    text_gc: xlib::GC,
    fill_gc: xlib::GC,
    border_gc: xlib::GC,
    pixels: Vec<c_ulong>,
    background: c_ulong,
    border_width: i32,
    width: i32,
}

impl RenderingContext {
    pub fn create(conn: &Arc<Connection>, name: &str, spec: &ContextSpec) -> Result<Self, X11Error> {
        let mut ctx = RenderingContext {
            conn: Arc::clone(conn),
            name: name.to_string(),
            font: ptr::null_mut(),
            text_gc: ptr::null_mut(),
            fill_gc: ptr::null_mut(),
            border_gc: ptr::null_mut(),
            pixels: Vec::with_capacity(3),
            background: 0,
            border_width: spec.border_width,
            width: spec.width,
        };

        ctx.font = load_font(conn, spec)?;
        let fg = ctx.alloc(spec.foreground)?;
        let bg = ctx.alloc(spec.background)?;
        let bc = ctx.alloc(spec.border_color)?;
        ctx.background = bg;

        // SAFETY: font was checked non-null by load_font.
        let fid = unsafe { (*ctx.font).fid };
        ctx.text_gc = ctx.create_gc(fg, bg, Some(fid))?;
        ctx.fill_gc = ctx.create_gc(bg, bg, None)?;
        ctx.border_gc = ctx.create_gc(bc, bc, None)?;

        debug!(
            "Created rendering context \"{}\" (width {}, border {}, font {})",
            name, spec.width, spec.border_width, spec.font
        );
        Ok(ctx)
    }

    fn alloc(&mut self, color: Rgb) -> Result<c_ulong, X11Error> {
        let pixel = color.alloc(&self.conn)?;
        self.pixels.push(pixel);
        Ok(pixel)
    }

    fn create_gc(
        &self,
        foreground: c_ulong,
        background: c_ulong,
        font: Option<xlib::Font>,
    ) -> Result<xlib::GC, X11Error> {
        let display = self.conn.display();
        unsafe {
            let gc = xlib::XCreateGC(display, self.conn.root(), 0, ptr::null_mut());
            if gc.is_null() {
                return Err(X11Error::CreateGc(self.name.clone()));
            }
            xlib::XSetForeground(display, gc, foreground);
            xlib::XSetBackground(display, gc, background);
            if let Some(fid) = font {
                xlib::XSetFont(display, gc, fid);
            }
            Ok(gc)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Outer popup width in pixels.
    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn border_width(&self) -> i32 {
        self.border_width
    }

    pub fn ascent(&self) -> i32 {
        unsafe { (*self.font).ascent }
    }

    /// Line height: ascent plus descent.
    pub fn font_height(&self) -> i32 {
        unsafe { (*self.font).ascent + (*self.font).descent }
    }

    pub(crate) fn background_pixel(&self) -> c_ulong {
        self.background
    }

    pub(crate) fn text_gc(&self) -> xlib::GC {
        self.text_gc
    }

    pub(crate) fn fill_gc(&self) -> xlib::GC {
        self.fill_gc
    }

    pub(crate) fn border_gc(&self) -> xlib::GC {
        self.border_gc
    }
}

impl TextMeasure for RenderingContext {
    fn text_width(&self, text: &str) -> i32 {
        unsafe { xlib::XTextWidth(self.font, text.as_ptr() as *const c_char, text.len() as c_int) }
    }
}

impl Drop for RenderingContext {
    fn drop(&mut self) {
        let display = self.conn.display();
        unsafe {
            for gc in [self.text_gc, self.fill_gc, self.border_gc] {
                if !gc.is_null() {
                    xlib::XFreeGC(display, gc);
                }
            }
            if !self.font.is_null() {
                xlib::XFreeFont(display, self.font);
            }
            if !self.pixels.is_empty() {
                xlib::XFreeColors(
                    display,
                    self.conn.colormap(),
                    self.pixels.as_mut_ptr(),
                    self.pixels.len() as c_int,
                    0,
                );
            }
        }
        debug!("Released rendering context \"{}\"", self.name);
    }
}

fn query_font(conn: &Connection, name: &str) -> Option<*mut xlib::XFontStruct> {
    let c_name = CString::new(name).ok()?;
    let font = unsafe { xlib::XLoadQueryFont(conn.display(), c_name.as_ptr()) };
    (!font.is_null()).then_some(font)
}

fn load_font(conn: &Connection, spec: &ContextSpec) -> Result<*mut xlib::XFontStruct, X11Error> {
    if let Some(font) = query_font(conn, &spec.font) {
        return Ok(font);
    }
    if spec.font_configured {
        return Err(X11Error::FontLoad(spec.font.clone()));
    }
    warn!("Font \"{}\" unavailable, trying \"{}\"", spec.font, FALLBACK_FONT);
    query_font(conn, FALLBACK_FONT).ok_or_else(|| X11Error::FontLoad(FALLBACK_FONT.to_string()))
}

/// Every rendering context named in `global.list`, keyed by name.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    contexts: HashMap<String, Rc<RenderingContext>>,
}

impl ContextRegistry {
    /// Build every listed context.
    ///
    /// Either all contexts are created or none: on the first failure the ones
    /// already built are dropped, freeing their X resources.
    pub fn load(conn: &Arc<Connection>, config: &impl ConfigSource) -> Result<Self, X11Error> {
        let names = context_names(config)?;
        let base = ContextSpec::from_config(config, "global", &ContextSpec::default())?;

        let mut contexts = HashMap::with_capacity(names.len());
        for name in names {
            let spec = ContextSpec::from_config(config, &name, &base)?;
            let ctx = RenderingContext::create(conn, &name, &spec)?;
            contexts.insert(name, Rc::new(ctx));
        }

        info!("Loaded {} rendering context(s)", contexts.len());
        Ok(Self { contexts })
    }

    pub fn get(&self, name: &str) -> Result<&Rc<RenderingContext>, X11Error> {
        self.contexts
            .get(name)
            .ok_or_else(|| X11Error::BadContext(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MapConfig(HashMap<&'static str, &'static str>);

    impl MapConfig {
        fn new(entries: &[(&'static str, &'static str)]) -> Self {
            Self(entries.iter().copied().collect())
        }
    }

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
    fn test_list_is_required() {
        let cfg = MapConfig::new(&[]);
        assert_eq!(
            context_names(&cfg),
            Err(ConfigError::NotFound("global.list".to_string()))
        );
    }

    #[test]
    fn test_list_trims_and_skips_empty() {
        let cfg = MapConfig::new(&[("global.list", " info, warn,,urgent ,")]);
        assert_eq!(context_names(&cfg).unwrap(), vec!["info", "warn", "urgent"]);
    }

    #[test]
    fn test_list_drops_repeats() {
        let cfg = MapConfig::new(&[("global.list", "info,warn,info")]);
        assert_eq!(context_names(&cfg).unwrap(), vec!["info", "warn"]);
    }

    #[test]
    fn test_empty_list_rejected() {
        let cfg = MapConfig::new(&[("global.list", " , ")]);
        assert!(matches!(
            context_names(&cfg),
            Err(ConfigError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_builtin_defaults() {
        let cfg = MapConfig::new(&[]);
        let spec = ContextSpec::from_config(&cfg, "global", &ContextSpec::default()).unwrap();
        assert_eq!(spec, ContextSpec::default());
        assert_eq!(spec.foreground, Rgb::WHITE);
        assert_eq!(spec.background, Rgb::BLACK);
        assert_eq!(spec.border_width, 5);
        assert_eq!(spec.width, 500);
        assert!(!spec.font_configured);
    }

    #[test]
    fn test_level_inherits_global() {
        let cfg = MapConfig::new(&[
            ("global.gc.fg", "#00FF00"),
            ("global.gc.font", "fixed"),
            ("global.width", "300"),
            ("urgent.gc.bc", "#F00"),
            ("urgent.gc.width", "2"),
        ]);
        let base = ContextSpec::from_config(&cfg, "global", &ContextSpec::default()).unwrap();
        let urgent = ContextSpec::from_config(&cfg, "urgent", &base).unwrap();

        assert_eq!(urgent.foreground, Rgb::new(0, 255, 0));
        assert_eq!(urgent.background, Rgb::BLACK);
        assert_eq!(urgent.border_color, Rgb::new(240, 0, 0));
        assert_eq!(urgent.border_width, 2);
        assert_eq!(urgent.width, 300);
        assert_eq!(urgent.font, "fixed");
        assert!(urgent.font_configured);
    }

    #[test]
    fn test_level_override_does_not_leak() {
        let cfg = MapConfig::new(&[("urgent.gc.bg", "#800000")]);
        let base = ContextSpec::from_config(&cfg, "global", &ContextSpec::default()).unwrap();
        let info = ContextSpec::from_config(&cfg, "info", &base).unwrap();
        let urgent = ContextSpec::from_config(&cfg, "urgent", &base).unwrap();

        assert_eq!(info.background, Rgb::BLACK);
        assert_eq!(urgent.background, Rgb::new(128, 0, 0));
    }

    #[test]
    fn test_negative_border_rejected() {
        let cfg = MapConfig::new(&[("info.gc.width", "-1")]);
        assert!(matches!(
            ContextSpec::from_config(&cfg, "info", &ContextSpec::default()),
            Err(ConfigError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_width_must_leave_room_for_text() {
        let cfg = MapConfig::new(&[("info.width", "10")]);
        assert!(matches!(
            ContextSpec::from_config(&cfg, "info", &ContextSpec::default()),
            Err(ConfigError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_bad_integer_surfaces() {
        let cfg = MapConfig::new(&[("info.width", "wide")]);
        assert!(matches!(
            ContextSpec::from_config(&cfg, "info", &ContextSpec::default()),
            Err(ConfigError::InvalidFormat { .. })
        ));
    }
}
