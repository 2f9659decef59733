//! Configuration types for AreaWatch.
//!
//! - [`TrackerConfig`] - in-process settings handed to the tracker
//! - [`ConfigFile`] - the user's `~/.areawatch/config.ini`
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use areawatch::config::TrackerConfig;
//!
//! let config = TrackerConfig::new()
//!     .with_default_slack(250.0)
//!     .with_tick_interval(Duration::from_secs(5));
//! ```

mod file;
mod parser;
mod tracker;
mod writer;

pub use file::{
    config_directory, config_file_path, ConfigFile, ConfigFileError, LoggingSettings,
    TrackerSettings, DEFAULT_LOG_DIRECTORY, DEFAULT_LOG_FILE,
};
pub use tracker::{TrackerConfig, DEFAULT_SLACK, DEFAULT_TICK_INTERVAL};
