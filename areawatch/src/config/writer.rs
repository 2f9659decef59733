//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::file::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let worker_threads = config.tracker.worker_threads.unwrap_or(0);

    format!(
        r#"[tracker]
; Milliseconds between reconciliation ticks
tick_interval_ms = {}
; Slack applied to subscriptions created without one
; (metres for geodesic circles; bounding boxes need 0)
default_slack = {}
; Dedicated worker threads for scans and fan-out (0 = shared pool)
worker_threads = {}

[logging]
; Directory for log files
directory = {}
; Log file name (cleared at startup)
file = {}
"#,
        config.tracker.tick_interval.as_millis(),
        config.tracker.default_slack,
        worker_threads,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
