use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{opt_param_str, param_str, require_db};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::info;

fn handle_exams_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "exams": [] }));
    };
    match db::list_exams(conn, opt_param_str(req, "tenantId")) {
        Ok(exams) => ok(&req.id, json!({ "exams": exams })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_exams_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let tenant_id = match param_str(req, "tenantId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let name = match param_str(req, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match db::create_exam(conn, tenant_id, name) {
        Ok(exam) => {
            info!(exam_id = %exam.id, tenant_id = %exam.tenant_id, "exam created");
            ok(
                &req.id,
                json!({
                    "examId": exam.id,
                    "tenantId": exam.tenant_id,
                    "name": exam.name
                }),
            )
        }
        Err(e) => err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "exams" })),
        ),
    }
}

fn handle_exams_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let exam_id = match param_str(req, "examId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match db::delete_exam(conn, exam_id) {
        Ok(true) => {
            info!(exam_id, "exam deleted");
            ok(&req.id, json!({ "ok": true }))
        }
        Ok(false) => err(&req.id, "not_found", "exam not found", None),
        Err(e) => err(&req.id, "db_delete_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "exams.list" => Some(handle_exams_list(state, req)),
        "exams.create" => Some(handle_exams_create(state, req)),
        "exams.delete" => Some(handle_exams_delete(state, req)),
        _ => None,
    }
}
