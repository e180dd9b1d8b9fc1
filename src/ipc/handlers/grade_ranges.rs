use crate::db;
use crate::editor::{self, EditorAction, EditorState};
use crate::error::ServiceError;
use crate::grades::{self, Grade, GradeRangeSet, GradeRecord};
use crate::ipc::error::{err, ok, service_err};
use crate::ipc::helpers::{param_typed, require_db, require_exam};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use tracing::{info, warn};

fn load_set(conn: &Connection, exam_id: &str) -> Result<GradeRangeSet, ServiceError> {
    let records = db::load_grade_records(conn, exam_id)?;
    Ok(GradeRangeSet::from_records(&records)?)
}

fn build_set(req: &Request, records: &[GradeRecord]) -> Result<GradeRangeSet, serde_json::Value> {
    GradeRangeSet::from_records(records).map_err(|e| service_err(&req.id, &ServiceError::from(e)))
}

fn parse_ranges(req: &Request) -> Result<GradeRangeSet, serde_json::Value> {
    let records: Vec<GradeRecord> = param_typed(req, "ranges")?;
    build_set(req, &records)
}

fn handle_grade_ranges_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let exam_id = match require_exam(conn, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match load_set(conn, &exam_id) {
        Ok(set) => ok(
            &req.id,
            json!({
                "examId": exam_id,
                "configured": !set.is_unconfigured(),
                "ranges": set.to_records()
            }),
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_grade_ranges_validate(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let set = match parse_ranges(req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    // Half-filled grades are skipped by validation; report them so the caller can flag them.
    let incomplete: Vec<&str> = Grade::ALL
        .iter()
        .filter(|g| set.get(**g).is_partial())
        .map(|g| g.label())
        .collect();
    match grades::validate(&set) {
        Ok(()) => ok(&req.id, json!({ "valid": true, "incomplete": incomplete })),
        Err(e) => ok(
            &req.id,
            json!({
                "valid": false,
                "message": e.to_string(),
                "rule": e.rule(),
                "incomplete": incomplete
            }),
        ),
    }
}

fn handle_grade_ranges_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let exam_id = match require_exam(conn, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let records: Vec<GradeRecord> = match param_typed(req, "ranges") {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    // Saves replace the whole configuration, so every grade must be present.
    if records.len() != Grade::ALL.len() {
        return err(
            &req.id,
            "bad_params",
            format!("ranges must list all six grades (got {})", records.len()),
            None,
        );
    }
    let submitted = match build_set(req, &records) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let stored = match load_set(conn, &exam_id) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let session = editor::reduce(&EditorState::new(&exam_id), EditorAction::Loaded(stored));
    let session = editor::reduce(&session, EditorAction::ReplaceAll(submitted));
    let changed = session.is_dirty();

    let (_, result) = editor::commit(&session, |save| {
        db::save_grade_ranges(conn, &save.exam_id, &save.ranges)
    });
    match result {
        Ok(revision) => {
            info!(exam_id = %exam_id, revision = %revision.id, changed, "grade ranges saved");
            ok(
                &req.id,
                json!({
                    "examId": exam_id,
                    "revisionId": revision.id,
                    "checksum": revision.checksum,
                    "changed": changed
                }),
            )
        }
        Err(e) => {
            if let ServiceError::RemoteOperationFailed(inner) = &e {
                warn!(exam_id = %exam_id, error = %inner, "grade range save failed");
            }
            service_err(&req.id, &e)
        }
    }
}

fn handle_grade_ranges_classify(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let exam_id = match require_exam(conn, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(score) = req.params.get("score").and_then(|v| v.as_f64()) else {
        return err(&req.id, "bad_params", "score must be a number", None);
    };

    let set = match load_set(conn, &exam_id) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(e) = grades::validate(&set) {
        return service_err(&req.id, &ServiceError::from(e));
    }
    let grade = grades::classify(&set, score).map(|g| g.label());
    ok(&req.id, json!({ "examId": exam_id, "score": score, "grade": grade }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "gradeRanges.get" => Some(handle_grade_ranges_get(state, req)),
        "gradeRanges.validate" => Some(handle_grade_ranges_validate(state, req)),
        "gradeRanges.save" => Some(handle_grade_ranges_save(state, req)),
        "gradeRanges.classify" => Some(handle_grade_ranges_classify(state, req)),
        _ => None,
    }
}
