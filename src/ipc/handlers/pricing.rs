use crate::db;
use crate::error::ServiceError;
use crate::ipc::error::{err, ok, service_err};
use crate::ipc::helpers::{param_typed, require_db, require_exam};
use crate::ipc::types::{AppState, Request};
use crate::pricing::{self, PricingTier};
use serde_json::json;
use tracing::info;

fn handle_pricing_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let exam_id = match require_exam(conn, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match db::load_pricing_tiers(conn, &exam_id) {
        Ok(tiers) => ok(&req.id, json!({ "examId": exam_id, "tiers": tiers })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_pricing_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let exam_id = match require_exam(conn, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let tiers: Vec<PricingTier> = match param_typed(req, "tiers") {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    if let Err(e) = pricing::validate_tiers(&tiers) {
        return service_err(&req.id, &ServiceError::from(e));
    }

    let ordered = pricing::sorted(&tiers);
    match db::save_pricing_tiers(conn, &exam_id, &ordered) {
        Ok(revision) => {
            info!(exam_id = %exam_id, tiers = ordered.len(), "pricing tiers saved");
            ok(
                &req.id,
                json!({
                    "examId": exam_id,
                    "revisionId": revision.id,
                    "checksum": revision.checksum
                }),
            )
        }
        Err(e) => service_err(&req.id, &ServiceError::from(e)),
    }
}

fn handle_pricing_quote(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let exam_id = match require_exam(conn, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let count = match req
        .params
        .get("subjectCount")
        .and_then(|v| v.as_u64())
        .and_then(|n| u32::try_from(n).ok())
    {
        Some(n) => n,
        None => {
            return err(
                &req.id,
                "bad_params",
                "subjectCount must be a non-negative integer",
                None,
            )
        }
    };
    match db::load_pricing_tiers(conn, &exam_id) {
        Ok(tiers) => ok(
            &req.id,
            json!({
                "examId": exam_id,
                "subjectCount": count,
                "price": pricing::price_for(&tiers, count)
            }),
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "pricingTiers.get" => Some(handle_pricing_get(state, req)),
        "pricingTiers.save" => Some(handle_pricing_save(state, req)),
        "pricingTiers.quote" => Some(handle_pricing_quote(state, req)),
        _ => None,
    }
}
