//! xnotif Command Protocol
//!
//! Line-oriented commands written to the daemon's FIFO, one per line:
//!
//! ```text
//! kill | end
//! redraw
//! close
//! close <id>
//! close_all
//! notif <time> <level> <text...>
//! ```
//!
//! Lines are matched against an ordered list of [`LineMatcher`]s; the first
//! match produces the [`Order`]. Lines nothing matches are dropped.

use std::fmt;
use tracing::debug;

/// FIFO path used when none is configured.
pub const DEFAULT_FIFO_PATH: &str = "/tmp/xcbnotif.fifo";

/// Which notifications a close order applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseTarget {
    /// Every notification on every screen.
    All,
    /// The oldest notification on the focused screen.
    Top,
    /// One notification by id.
    Id(u32),
}

/// Commands consumed by the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    /// Close everything and stop the daemon.
    Kill,
    Close(CloseTarget),
    /// Show `text` styled by the rendering context `level`.
    Notify {
        /// Seconds until the notification closes itself; 0 keeps it open.
        time: u32,
        level: String,
        text: String,
    },
    /// Repaint every visible notification.
    Redraw,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Kill => f.write_str("kill"),
            Order::Redraw => f.write_str("redraw"),
            Order::Close(CloseTarget::All) => f.write_str("close_all"),
            Order::Close(CloseTarget::Top) => f.write_str("close"),
            Order::Close(CloseTarget::Id(id)) => write!(f, "close {}", id),
            Order::Notify { time, level, text } => {
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                write!(f, "notif {} {} {}", time, level, text)
            }
        }
    }
}

/// Render an order as the command line that decodes back to it.
///
/// Whitespace inside the text collapses to single spaces. `level` must be a
/// single word.
pub fn encode(order: &Order) -> String {
    order.to_string()
}

/// Recognizes one kind of command line.
///
/// [`extract`](Self::extract) is only called right after
/// [`validate`](Self::validate) accepted a line and returns the order built
/// from that line.
pub trait LineMatcher: Send {
    fn validate(&mut self, line: &str) -> bool;
    fn extract(&mut self) -> Order;
}

/// Matches lines consisting of exactly one of `keywords`.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keywords: &'static [&'static str],
    order: Order,
}

impl KeywordMatcher {
    pub fn new(keywords: &'static [&'static str], order: Order) -> Self {
        Self { keywords, order }
    }
}

impl LineMatcher for KeywordMatcher {
    fn validate(&mut self, line: &str) -> bool {
        let line = line.trim();
        self.keywords.iter().any(|k| *k == line)
    }

    fn extract(&mut self) -> Order {
        self.order.clone()
    }
}

/// Matches `close <id>`.
#[derive(Debug, Default)]
pub struct CloseIdMatcher {
    id: u32,
}

impl LineMatcher for CloseIdMatcher {
    fn validate(&mut self, line: &str) -> bool {
        let Some(("close", rest)) = next_field(line) else {
            return false;
        };
        let Some((id, rest)) = next_field(rest) else {
            return false;
        };
        if !rest.trim().is_empty() {
            return false;
        }
        match id.parse() {
            Ok(id) => {
                self.id = id;
                true
            }
            Err(_) => false,
        }
    }

    fn extract(&mut self) -> Order {
        Order::Close(CloseTarget::Id(self.id))
    }
}

/// Matches `notif <time> <level> <text>`; the text is the rest of the line.
#[derive(Debug, Default)]
pub struct NotifyMatcher {
    time: u32,
    level: String,
    text: String,
}

impl LineMatcher for NotifyMatcher {
    fn validate(&mut self, line: &str) -> bool {
        let Some(("notif", rest)) = next_field(line) else {
            return false;
        };
        let Some((time, rest)) = next_field(rest) else {
            return false;
        };
        let Some((level, rest)) = next_field(rest) else {
            return false;
        };
        let text = rest.trim();
        if text.is_empty() {
            return false;
        }
        let Ok(time) = time.parse() else {
            return false;
        };

        self.time = time;
        self.level = level.to_string();
        self.text = text.to_string();
        true
    }

    fn extract(&mut self) -> Order {
        Order::Notify {
            time: self.time,
            level: std::mem::take(&mut self.level),
            text: std::mem::take(&mut self.text),
        }
    }
}

/// Split off the first whitespace-delimited field.
fn next_field(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some(s.split_at(end))
}

/// Decodes command lines into orders.
pub struct CommandSource {
    matchers: Vec<Box<dyn LineMatcher>>,
}

impl CommandSource {
    /// A source with the built-in commands registered.
    pub fn new() -> Self {
        let mut source = Self::empty();
        source.register(Box::new(KeywordMatcher::new(&["kill", "end"], Order::Kill)));
        source.register(Box::new(KeywordMatcher::new(&["redraw"], Order::Redraw)));
        source.register(Box::new(KeywordMatcher::new(
            &["close"],
            Order::Close(CloseTarget::Top),
        )));
        source.register(Box::new(KeywordMatcher::new(
            &["close_all"],
            Order::Close(CloseTarget::All),
        )));
        source.register(Box::new(CloseIdMatcher::default()));
        source.register(Box::new(NotifyMatcher::default()));
        source
    }

    /// A source that matches nothing until matchers are registered.
    pub fn empty() -> Self {
        Self {
            matchers: Vec::new(),
        }
    }

    /// Append a matcher. Earlier matchers take precedence.
    pub fn register(&mut self, matcher: Box<dyn LineMatcher>) {
        self.matchers.push(matcher);
    }

    /// Decode one line. Returns `None` when no matcher accepts it.
    pub fn decode(&mut self, line: &str) -> Option<Order> {
        let line = line.trim_end_matches(['\n', '\r']);
        for matcher in &mut self.matchers {
            if matcher.validate(line) {
                return Some(matcher.extract());
            }
        }
        debug!("Dropping unrecognized command: {:?}", line);
        None
    }
}

impl Default for CommandSource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSource")
            .field("matchers", &self.matchers.len())
            .finish()
    }
}
