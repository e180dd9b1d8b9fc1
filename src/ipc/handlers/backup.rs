use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{opt_param_str, param_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

fn handle_export_workspace(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let out_path = match param_str(req, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };

    match backup::export_workspace_bundle(&workspace, &out_path) {
        Ok(summary) => {
            info!(path = %out_path.display(), "workspace exported");
            ok(
                &req.id,
                json!({
                    "path": out_path.to_string_lossy(),
                    "bundleFormat": summary.bundle_format,
                    "entryCount": summary.entry_count,
                    "dbSha256": summary.db_sha256
                }),
            )
        }
        Err(e) => err(&req.id, "io_failed", format!("{e:#}"), None),
    }
}

fn handle_import_workspace(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = match param_str(req, "inPath") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };
    let target = match opt_param_str(req, "workspacePath") {
        Some(p) => PathBuf::from(p),
        None => match state.workspace.clone() {
            Some(p) => p,
            None => {
                return err(
                    &req.id,
                    "no_workspace",
                    "select a workspace or pass workspacePath",
                    None,
                )
            }
        },
    };

    // The database file is replaced on disk, so the open connection has to go first.
    let reopen = state.workspace.as_deref() == Some(target.as_path());
    if reopen {
        state.close_workspace();
    }
    let imported = backup::import_workspace_bundle(&in_path, &target);
    if reopen {
        if let Err(e) = state.select_workspace(&target) {
            warn!(workspace = %target.display(), error = %e, "reopen after import failed");
            return err(&req.id, "db_open_failed", format!("{e:#}"), None);
        }
    }

    match imported {
        Ok(summary) => {
            info!(
                workspace = %target.display(),
                format = %summary.bundle_format_detected,
                "workspace imported"
            );
            ok(
                &req.id,
                json!({
                    "workspacePath": target.to_string_lossy(),
                    "bundleFormatDetected": summary.bundle_format_detected
                }),
            )
        }
        Err(e) => err(&req.id, "io_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspace" => Some(handle_export_workspace(state, req)),
        "backup.importWorkspace" => Some(handle_import_workspace(state, req)),
        _ => None,
    }
}
