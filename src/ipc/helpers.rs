use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::db;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};

pub fn require_db<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// Required, trimmed, non-empty string parameter.
pub fn param_str<'a>(req: &'a Request, key: &str) -> Result<&'a str, Value> {
    let Some(raw) = req.params.get(key).and_then(|v| v.as_str()) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    let s = raw.trim();
    if s.is_empty() {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must not be empty", key),
            None,
        ));
    }
    Ok(s)
}

pub fn opt_param_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Deserializes `params[key]` into a typed payload; shape mismatches are rejected
/// here rather than coerced.
pub fn param_typed<T: DeserializeOwned>(req: &Request, key: &str) -> Result<T, Value> {
    let Some(raw) = req.params.get(key) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    serde_json::from_value(raw.clone()).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("invalid {}: {}", key, e),
            None,
        )
    })
}

/// `params.examId`, checked against the store.
pub fn require_exam(conn: &Connection, req: &Request) -> Result<String, Value> {
    let exam_id = param_str(req, "examId")?;
    match db::exam_exists(conn, exam_id) {
        Ok(true) => Ok(exam_id.to_string()),
        Ok(false) => Err(err(&req.id, "not_found", "exam not found", None)),
        Err(e) => Err(err(&req.id, "db_query_failed", e.to_string(), None)),
    }
}
