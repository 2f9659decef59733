//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;

use super::file::{ConfigFile, ConfigFileError};

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [tracker] section
    if let Some(section) = ini.section(Some("tracker")) {
        if let Some(v) = section.get("tick_interval_ms") {
            let millis: u64 = parse_value("tracker", "tick_interval_ms", v)?;
            if millis == 0 {
                return Err(invalid("tracker", "tick_interval_ms", v, "must be greater than 0"));
            }
            config.tracker.tick_interval = Duration::from_millis(millis);
        }
        if let Some(v) = section.get("default_slack") {
            let slack: f64 = parse_value("tracker", "default_slack", v)?;
            if !slack.is_finite() || slack < 0.0 {
                return Err(invalid(
                    "tracker",
                    "default_slack",
                    v,
                    "must be a non-negative number",
                ));
            }
            config.tracker.default_slack = slack;
        }
        if let Some(v) = section.get("worker_threads") {
            let threads: usize = parse_value("tracker", "worker_threads", v)?;
            config.tracker.worker_threads = (threads > 0).then_some(threads);
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

fn parse_value<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "not a valid number"))
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand a leading `~/` to the user's home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
