mod backup;
mod config;
mod db;
mod editor;
mod error;
mod grades;
mod ipc;
mod pricing;

use std::io::{self, BufRead, Write};

use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    // stdout carries responses; logs go to stderr.
    fmt()
        .with_env_filter(EnvFilter::new(config::log_filter()))
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    let config = config::Config::load();
    let mut state = ipc::AppState::default();
    if let Some(path) = &config.workspace {
        if let Err(e) = state.select_workspace(path) {
            warn!(workspace = %path.display(), error = %e, "startup workspace not opened");
        }
    }
    info!(version = env!("CARGO_PKG_VERSION"), "gradebandsd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                warn!(error = %e, "bad request line");
                let resp = json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    info!("gradebandsd shutting down");
}
