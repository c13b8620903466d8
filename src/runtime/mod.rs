//==============================================
// File: runtime/mod.rs
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Process-wide runtime services for GatoScript
// Objective: Install configuration, logging, the task pool and the HTTP bridge
//==============================================

//==============================================
// Import & Modules
//==============================================

pub mod config;
pub mod http;
pub mod tasks;

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing_subscriber::EnvFilter;

pub use config::{Config, ConfigError};

//==============================================
// Section 1.0 - Installed settings
//==============================================

static MAX_CALL_DEPTH: AtomicUsize = AtomicUsize::new(config::DEFAULT_MAX_CALL_DEPTH);
static TASK_THREADS: AtomicUsize = AtomicUsize::new(config::DEFAULT_TASK_THREADS);

/// Applies limits from `config`. The task pool reads its size when it is first
/// used, so call this before any script runs.
pub fn install(config: &Config) {
    MAX_CALL_DEPTH.store(config.max_call_depth.max(1), Ordering::Relaxed);
    TASK_THREADS.store(config.task_threads.max(1), Ordering::Relaxed);
}

pub fn max_call_depth() -> usize {
    MAX_CALL_DEPTH.load(Ordering::Relaxed)
}

pub fn task_threads() -> usize {
    TASK_THREADS.load(Ordering::Relaxed)
}

//==============================================
// Section 2.0 - Logging
//==============================================

/// Installs the stderr subscriber. Safe to call more than once; only the
/// first call takes effect.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_new(log_directive(config))
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn log_directive(config: &Config) -> String {
    if config.trace {
        format!("{},gatoscript=trace", config.log_filter)
    } else {
        config.log_filter.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_adds_crate_directive() {
        let mut config = Config::default();
        assert_eq!(log_directive(&config), "warn");
        config.trace = true;
        assert_eq!(log_directive(&config), "warn,gatoscript=trace");
    }

    #[test]
    fn init_logging_is_idempotent() {
        let config = Config {
            log_filter: "not a [valid filter".into(),
            ..Config::default()
        };
        init_logging(&config);
        init_logging(&Config::default());
    }
}

//==============================================
// End of file
//==============================================
