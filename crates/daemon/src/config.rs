//! Configuration management for the xnotif daemon.
//!
//! Configuration is loaded from a TOML file, the first found of:
//! 1. the path given with `--config`
//! 2. `$XDG_CONFIG_HOME/xnotif/config.toml`
//! 3. `~/.xnotif.toml`
//!
//! Keys are addressed with dots, so `global.padding.vert` is the `vert` entry
//! of the `[global.padding]` table. Layout and rendering-context keys are read
//! through [`ConfigSource`]; daemon options are deserialized from `[global]`.
//!
//! ```toml
//! [global]
//! list = ["normal", "urgent"]
//! gravity = "bottom_right"
//!
//! [global.padding]
//! space = 10
//!
//! [urgent.gc]
//! bc = "#F00"
//! ```

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use xnotif_core_layout::{ConfigError, ConfigSource};
use xnotif_ipc::DEFAULT_FIFO_PATH;

/// Options of the daemon process itself, read from the `[global]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DaemonOptions {
    /// Path of the command FIFO.
    pub fifo: PathBuf,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for DaemonOptions {
    fn default() -> Self {
        Self {
            fifo: PathBuf::from(DEFAULT_FIFO_PATH),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// A parsed configuration file.
#[derive(Debug, Clone, Default)]
pub struct Config {
    table: Table,
    pub daemon: DaemonOptions,
}

impl Config {
    /// Load from `path`, or from the first existing standard location.
    ///
    /// Returns the configuration and the file it was read from. Having no
    /// configuration file at all is an error: `global.list` is required.
    pub fn load(path: Option<&Path>) -> Result<(Self, PathBuf)> {
        if let Some(path) = path {
            return Ok((Self::load_from_path(path)?, path.to_path_buf()));
        }

        let paths = config_paths();
        for path in &paths {
            if path.exists() {
                return Ok((Self::load_from_path(path)?, path.clone()));
            }
        }

        let searched: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        bail!("No configuration file found (searched: {})", searched.join(", "))
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let table: Table = toml::from_str(content)?;
        let daemon = match table.get("global") {
            Some(global) => global.clone().try_into()?,
            None => DaemonOptions::default(),
        };
        Ok(Self { table, daemon })
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let mut value = self.table.get(parts.next()?)?;
        for part in parts {
            value = value.as_table()?.get(part)?;
        }
        Some(value)
    }

    fn value(&self, key: &str) -> Result<&Value, ConfigError> {
        self.lookup(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))
    }
}

fn invalid(key: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidFormat {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a decimal, `0x` hexadecimal or `0o` octal integer.
fn parse_int(s: &str) -> Option<i64> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(oct) = digits
        .strip_prefix("0o")
        .or_else(|| digits.strip_prefix("0O"))
    {
        i64::from_str_radix(oct, 8).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

impl ConfigSource for Config {
    fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    fn string(&self, key: &str) -> Result<String, ConfigError> {
        match self.value(key)? {
            Value::String(s) => Ok(s.clone()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Boolean(b) => Ok(b.to_string()),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(invalid(key, other, "expected an array of strings")),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|items| items.join(",")),
            other => Err(invalid(key, other, "expected a string, number or array")),
        }
    }

    fn int(&self, key: &str) -> Result<i32, ConfigError> {
        let wide = match self.value(key)? {
            Value::Integer(i) => *i,
            Value::String(s) => {
                parse_int(s.trim()).ok_or_else(|| invalid(key, s, "not an integer"))?
            }
            other => return Err(invalid(key, other, "not an integer")),
        };
        i32::try_from(wide).map_err(|_| invalid(key, wide, "out of range"))
    }
}

/// Get all standard config file paths in priority order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(proj_dirs) = ProjectDirs::from("", "", "xnotif") {
        paths.push(proj_dirs.config_dir().join("config.toml"));
    }

    if let Some(home) = dirs_home() {
        paths.push(home.join(".xnotif.toml"));
    }

    paths
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use xnotif_core_layout::{Gravity, LayoutSettings};

    const SAMPLE: &str = r##"
        [global]
        list = "info, warn"
        gravity = "bottom_left"
        width = "0x190"
        fifo = "/run/user/1000/xnotif.fifo"

        [global.padding]
        vert = 20
        space = "0o12"

        [global.gc]
        fg = "#FFFFFF"

        [warn.gc]
        bc = "#F80"
        width = 3
    "##;

    #[test]
    fn test_nested_lookup() {
        let config = Config::parse(SAMPLE).unwrap();
        assert!(config.has("global.padding.vert"));
        assert!(config.has("warn.gc.bc"));
        assert!(!config.has("info.gc.bc"));
        assert!(!config.has("global.padding.vert.deeper"));
        assert_eq!(config.string("warn.gc.bc").unwrap(), "#F80");
    }

    #[test]
    fn test_int_forms() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.int("global.padding.vert"), Ok(20));
        assert_eq!(config.int("global.padding.space"), Ok(10));
        assert_eq!(config.int("global.width"), Ok(400));
    }

    #[test]
    fn test_missing_key() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(
            config.int("global.padding.hori"),
            Err(ConfigError::NotFound("global.padding.hori".to_string()))
        );
    }

    #[test]
    fn test_bad_int() {
        let config = Config::parse("[global]\nwidth = \"wide\"\nbig = 3000000000\n").unwrap();
        assert!(matches!(
            config.int("global.width"),
            Err(ConfigError::InvalidFormat { .. })
        ));
        assert!(matches!(
            config.int("global.big"),
            Err(ConfigError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_table_is_not_a_string() {
        let config = Config::parse(SAMPLE).unwrap();
        assert!(matches!(
            config.string("global.padding"),
            Err(ConfigError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_list_as_array() {
        let config = Config::parse("[global]\nlist = [\"info\", \"warn\"]\n").unwrap();
        assert_eq!(config.string("global.list").unwrap(), "info,warn");
    }

    #[test]
    fn test_integer_reads_as_string() {
        let config = Config::parse("[info]\nwidth = 300\n").unwrap();
        assert_eq!(config.string("info.width").unwrap(), "300");
    }

    #[test]
    fn test_daemon_options() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.daemon.fifo, PathBuf::from("/run/user/1000/xnotif.fifo"));
        assert_eq!(config.daemon.log_level, "info");
    }

    #[test]
    fn test_daemon_options_default() {
        let config = Config::parse("[info.gc]\nfg = \"#FFF\"\n").unwrap();
        assert_eq!(config.daemon, DaemonOptions::default());
        assert_eq!(config.daemon.fifo, PathBuf::from("/tmp/xcbnotif.fifo"));
    }

    #[test]
    fn test_layout_settings_from_file() {
        let config = Config::parse(SAMPLE).unwrap();
        let settings = LayoutSettings::from_config(&config).unwrap();
        assert_eq!(settings.gravity, Gravity::BottomLeft);
        assert_eq!(settings.padding.hori, 15);
        assert_eq!(settings.padding.space, 10);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::parse("[global\nlist = ").is_err());
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let err = Config::load(Some(Path::new("/nonexistent/xnotif.toml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/xnotif.toml"));
    }

    #[test]
    fn test_parse_int_signs() {
        assert_eq!(parse_int("-12"), Some(-12));
        assert_eq!(parse_int("+7"), Some(7));
        assert_eq!(parse_int("-0x10"), Some(-16));
        assert_eq!(parse_int("0x"), None);
        assert_eq!(parse_int(""), None);
    }

    #[test]
    fn test_config_paths_not_empty() {
        assert!(!config_paths().is_empty());
    }
}
