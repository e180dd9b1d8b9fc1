use std::{env, path::PathBuf};

use tracing::info;

pub const DEFAULT_LOG_FILTER: &str = "gradebandsd=info";

pub struct Config {
    /// Workspace opened before the first request, if any.
    pub workspace: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Self {
        Self {
            workspace: var("GRADEBANDSD_WORKSPACE").map(PathBuf::from),
        }
    }
}

/// Read before the subscriber exists, so it cannot log.
pub fn log_filter() -> String {
    env::var("RUST_LOG")
        .or_else(|_| env::var("GRADEBANDSD_LOG"))
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string())
}

fn var(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => {
            info!("{key} not set, using default");
            None
        }
    }
}
