//! Tracing setup for the quadsphere tools.
//!
//! Console output is human-readable with uptime timestamps and thread names,
//! so generation workers (`lod-gen-0`, `lod-gen-1`, ...) are easy to tell
//! apart. Debug builds can also write one JSON object per event to
//! `quadsphere.log`.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use quadsphere_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config names one.
pub const DEFAULT_FILTER: &str = "info";

/// Name of the JSON log file inside the log directory.
pub const LOG_FILE_NAME: &str = "quadsphere.log";

/// Filter directive taken from `debug.log_level`, falling back to [`DEFAULT_FILTER`].
pub fn filter_directive(config: Option<&Config>) -> String {
    config
        .map(|c| c.debug.log_level.trim())
        .filter(|level| !level.is_empty())
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}

/// `RUST_LOG` if set, otherwise [`filter_directive`].
pub fn env_filter(config: Option<&Config>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directive(config)))
}

/// Create `log_dir` and open a fresh log file in it.
fn open_log_file(log_dir: &Path) -> Option<File> {
    std::fs::create_dir_all(log_dir).ok()?;
    File::create(log_dir.join(LOG_FILE_NAME)).ok()
}

/// Install the global tracing subscriber.
///
/// The JSON file layer is added only when `debug_build` is set, a `log_dir`
/// is given, and the config does not turn `debug.json_log_file` off.
///
/// ```no_run
/// use quadsphere_config::Config;
/// use quadsphere_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), cfg!(debug_assertions), Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(console_layer);

    let wants_file = debug_build && config.is_none_or(|c| c.debug.json_log_file);
    if wants_file && let Some(log_file) = log_dir.and_then(open_log_file) {
        let file_layer = fmt::layer()
            .with_writer(Mutex::new(log_file))
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_without_config_is_default() {
        assert_eq!(filter_directive(None), DEFAULT_FILTER);
    }

    #[test]
    fn test_filter_from_config() {
        let mut config = Config::default();
        config.debug.log_level = "warn,quadsphere_lod=trace".to_string();
        assert_eq!(filter_directive(Some(&config)), "warn,quadsphere_lod=trace");

        config.debug.log_level = "  ".to_string();
        assert_eq!(filter_directive(Some(&config)), DEFAULT_FILTER);
    }

    #[test]
    fn test_env_filter_parsing() {
        for filter_str in [
            "info",
            "debug,quadsphere_lod=trace",
            "warn,quadsphere_lod::scheduler=debug",
        ] {
            assert!(EnvFilter::try_new(filter_str).is_ok(), "{filter_str}");
        }
    }

    #[test]
    fn test_open_log_file_creates_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_dir = temp_dir.path().join("logs");
        assert!(open_log_file(&log_dir).is_some());
        assert!(log_dir.join(LOG_FILE_NAME).exists());
    }

    #[test]
    fn test_json_layer_writes_parseable_lines() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_file = open_log_file(temp_dir.path()).unwrap();
        let layer = fmt::layer()
            .with_writer(Mutex::new(log_file))
            .with_ansi(false)
            .json();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(leaves = 7, "frame settled");
        });

        let contents = std::fs::read_to_string(temp_dir.path().join(LOG_FILE_NAME)).unwrap();
        let line = contents.lines().next().unwrap();
        let event: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(event["level"], "INFO");
        assert_eq!(event["fields"]["message"], "frame settled");
        assert_eq!(event["fields"]["leaves"], 7);
    }
}
