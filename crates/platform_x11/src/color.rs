//! Color strings and colormap allocation.

use crate::{Connection, X11Error};
use libc::{c_char, c_ulong, c_ushort};
use std::fmt;
use std::mem;
use x11::xlib;

/// An 8-bit-per-channel color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Allocate this color in the default colormap and return its pixel.
    pub fn alloc(self, conn: &Connection) -> Result<c_ulong, X11Error> {
        // SAFETY: XColor is plain data; zeroed is a valid initial value.
        let mut color: xlib::XColor = unsafe { mem::zeroed() };
        color.red = widen(self.r);
        color.green = widen(self.g);
        color.blue = widen(self.b);
        color.flags = (xlib::DoRed | xlib::DoGreen | xlib::DoBlue) as c_char;

        let status = unsafe { xlib::XAllocColor(conn.display(), conn.colormap(), &mut color) };
        if status == 0 {
            return Err(X11Error::ColorAlloc(self.to_string()));
        }
        Ok(color.pixel)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

fn widen(channel: u8) -> c_ushort {
    c_ushort::from(channel) * 257
}

fn digit(c: u8) -> u8 {
    (c as char).to_digit(16).unwrap_or(0) as u8
}

/// Parse a color string.
///
/// Accepted forms are `G`, `#G`, `RGB`, `#RGB`, `RRGGBB` and `#RRGGBB`. A
/// single digit `d` stands for `d * 16`. Anything else is black, and an
/// invalid hex digit counts as 0.
pub fn parse_color(s: &str) -> Rgb {
    let bytes = s.as_bytes();
    let digits = match bytes {
        [b'#', rest @ ..] if matches!(rest.len(), 1 | 3 | 6) => rest,
        [first, ..] if *first != b'#' && matches!(bytes.len(), 1 | 3 | 6) => bytes,
        _ => return Rgb::BLACK,
    };

    match digits {
        [g] => {
            let v = 16 * digit(*g);
            Rgb::new(v, v, v)
        }
        [r, g, b] => Rgb::new(16 * digit(*r), 16 * digit(*g), 16 * digit(*b)),
        [r1, r2, g1, g2, b1, b2] => Rgb::new(
            16 * digit(*r1) + digit(*r2),
            16 * digit(*g1) + digit(*g2),
            16 * digit(*b1) + digit(*b2),
        ),
        _ => Rgb::BLACK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_forms() {
        assert_eq!(parse_color("8"), Rgb::new(128, 128, 128));
        assert_eq!(parse_color("#8"), Rgb::new(128, 128, 128));
    }

    #[test]
    fn test_short_rgb() {
        assert_eq!(parse_color("F0A"), Rgb::new(240, 0, 160));
        assert_eq!(parse_color("#F0A"), Rgb::new(240, 0, 160));
    }

    #[test]
    fn test_full_rgb() {
        assert_eq!(parse_color("#FF8000"), Rgb::new(255, 128, 0));
        assert_eq!(parse_color("1a2b3c"), Rgb::new(0x1a, 0x2b, 0x3c));
    }

    #[test]
    fn test_lowercase_hex() {
        assert_eq!(parse_color("#ffffff"), Rgb::WHITE);
    }

    #[test]
    fn test_invalid_digits_count_as_zero() {
        assert_eq!(parse_color("#GG00FF"), Rgb::new(0, 0, 255));
    }

    #[test]
    fn test_bad_lengths_are_black() {
        assert_eq!(parse_color(""), Rgb::BLACK);
        assert_eq!(parse_color("#"), Rgb::BLACK);
        assert_eq!(parse_color("12"), Rgb::BLACK);
        assert_eq!(parse_color("#12345"), Rgb::BLACK);
        assert_eq!(parse_color("#1234567"), Rgb::BLACK);
    }

    #[test]
    fn test_inner_hash_is_an_invalid_digit() {
        assert_eq!(parse_color("F#A"), Rgb::new(240, 0, 160));
        assert_eq!(parse_color("##"), Rgb::BLACK);
    }

    #[test]
    fn test_display_is_hex() {
        assert_eq!(Rgb::new(255, 128, 0).to_string(), "#ff8000");
    }
}
