use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{opt_param_str, require_db, require_exam};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_revisions_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let exam_id = match require_exam(conn, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let kind = opt_param_str(req, "kind");
    if let Some(k) = kind {
        if k != db::KIND_GRADE_RANGES && k != db::KIND_PRICING_TIERS {
            return err(
                &req.id,
                "bad_params",
                "kind must be one of: gradeRanges, pricingTiers",
                None,
            );
        }
    }

    match db::list_revisions(conn, &exam_id, kind) {
        Ok(revisions) => ok(&req.id, json!({ "revisions": revisions })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "revisions.list" => Some(handle_revisions_list(state, req)),
        _ => None,
    }
}
