//=============================================
// File: runtime/config.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Layered runtime configuration for the gato binary
// Objective: Merge defaults, TOML files and GATO_* variables into one Config
//=============================================

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

//=============================================
// SECTION: Data Model
//=============================================

pub const DEFAULT_LOG_FILTER: &str = "warn";
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;
pub const DEFAULT_TASK_THREADS: usize = 512;

/// Per-project file, looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "gato.toml";
const USER_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,
    /// Trace-level logging of function application.
    pub trace: bool,
    /// Nested calls allowed per thread before `stack overflow`.
    pub max_call_depth: usize,
    /// Upper bound on threads running spawned tasks and request handlers.
    pub task_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            trace: false,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            task_threads: DEFAULT_TASK_THREADS,
        }
    }
}

/// One file's worth of settings; absent keys leave earlier layers alone.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigLayer {
    log_filter: Option<String>,
    trace: Option<bool>,
    max_call_depth: Option<usize>,
    task_threads: Option<usize>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("{variable} must be a positive integer, got {value:?}")]
    InvalidNumber {
        variable: &'static str,
        value: String,
    },
}

//=============================================
// SECTION: Loading
//=============================================

impl Config {
    /// Defaults, then the user config file, then `./gato.toml`, then the
    /// process environment. Later sources win.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for path in Self::search_paths() {
            if path.is_file() {
                config.merge_file(&path)?;
            }
        }
        config.apply_env(|name| env::var(name).ok())?;
        Ok(config)
    }

    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(2);
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("gato").join(USER_CONFIG_FILE));
        }
        paths.push(PathBuf::from(PROJECT_CONFIG_FILE));
        paths
    }

    pub fn merge_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.merge_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn merge_toml(&mut self, text: &str) -> Result<(), toml::de::Error> {
        let layer: ConfigLayer = toml::from_str(text)?;
        if let Some(filter) = layer.log_filter {
            self.log_filter = filter;
        }
        if let Some(trace) = layer.trace {
            self.trace = trace;
        }
        if let Some(depth) = layer.max_call_depth {
            self.max_call_depth = depth;
        }
        if let Some(threads) = layer.task_threads {
            self.task_threads = threads;
        }
        Ok(())
    }

    /// Reads `GATO_LOG`, `GATO_TRACE`, `GATO_MAX_DEPTH` and
    /// `GATO_TASK_THREADS` through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(filter) = lookup("GATO_LOG") {
            self.log_filter = filter;
        }
        if let Some(value) = lookup("GATO_TRACE") {
            self.trace = is_enabled(&value);
        }
        if let Some(value) = lookup("GATO_MAX_DEPTH") {
            self.max_call_depth = positive("GATO_MAX_DEPTH", &value)?;
        }
        if let Some(value) = lookup("GATO_TASK_THREADS") {
            self.task_threads = positive("GATO_TASK_THREADS", &value)?;
        }
        Ok(())
    }
}

/// Anything but empty, `0`, `false` or `off` turns a flag on.
pub fn is_enabled(value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    !(lower.is_empty() || lower == "0" || lower == "false" || lower == "off")
}

fn positive(variable: &'static str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::InvalidNumber {
            variable,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.log_filter, "warn");
        assert!(!config.trace);
        assert_eq!(config.max_call_depth, 10_000);
        assert_eq!(config.task_threads, 512);
    }

    #[test]
    fn toml_layers_only_override_present_keys() {
        let mut config = Config::default();
        config.merge_toml("max_call_depth = 200").unwrap();
        config.merge_toml("log_filter = \"info\"\ntrace = true").unwrap();
        assert_eq!(
            config,
            Config {
                log_filter: "info".into(),
                trace: true,
                max_call_depth: 200,
                task_threads: 512,
            }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut config = Config::default();
        assert!(config.merge_toml("max_depth = 3").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn merge_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_CONFIG_FILE);
        fs::write(&path, "task_threads = \"many\"").unwrap();
        let err = Config::default().merge_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(PROJECT_CONFIG_FILE));

        let missing = dir.path().join("absent.toml");
        let err = Config::default().merge_file(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn environment_overrides_files() {
        let mut config = Config::default();
        config.merge_toml("log_filter = \"info\"").unwrap();
        config
            .apply_env(lookup_from(&[
                ("GATO_LOG", "debug"),
                ("GATO_TRACE", "yes"),
                ("GATO_MAX_DEPTH", " 64 "),
                ("GATO_TASK_THREADS", "4"),
            ]))
            .unwrap();
        assert_eq!(config.log_filter, "debug");
        assert!(config.trace);
        assert_eq!(config.max_call_depth, 64);
        assert_eq!(config.task_threads, 4);
    }

    #[test]
    fn invalid_numbers_in_environment() {
        let mut config = Config::default();
        let err = config
            .apply_env(lookup_from(&[("GATO_MAX_DEPTH", "0")]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "GATO_MAX_DEPTH must be a positive integer, got \"0\""
        );
        assert!(config
            .apply_env(lookup_from(&[("GATO_TASK_THREADS", "lots")]))
            .is_err());
    }

    #[test]
    fn flag_values() {
        for on in ["1", "true", "ON", "yes"] {
            assert!(is_enabled(on), "{on}");
        }
        for off in ["", "0", "false", "Off", "  "] {
            assert!(!is_enabled(off), "{off:?}");
        }
    }

    #[test]
    fn search_paths_end_with_project_file() {
        let paths = Config::search_paths();
        assert_eq!(paths.last(), Some(&PathBuf::from(PROJECT_CONFIG_FILE)));
    }
}
