use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use uuid::Uuid;

use crate::grades::{GradeRangeSet, GradeRecord};
use crate::pricing::PricingTier;

pub const DB_FILE: &str = "gradebands.sqlite3";

pub const KIND_GRADE_RANGES: &str = "gradeRanges";
pub const KIND_PRICING_TIERS: &str = "pricingTiers";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let conn = Connection::open(workspace.join(DB_FILE))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS exams(
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_exams_tenant ON exams(tenant_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grade_ranges(
            exam_id TEXT NOT NULL,
            grade TEXT NOT NULL,
            position INTEGER NOT NULL,
            min_value REAL,
            max_value REAL,
            PRIMARY KEY(exam_id, grade),
            FOREIGN KEY(exam_id) REFERENCES exams(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS pricing_tiers(
            exam_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            min_subjects INTEGER NOT NULL,
            max_subjects INTEGER NOT NULL,
            price REAL NOT NULL,
            PRIMARY KEY(exam_id, position),
            FOREIGN KEY(exam_id) REFERENCES exams(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS revisions(
            id TEXT PRIMARY KEY,
            exam_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            saved_at TEXT NOT NULL,
            checksum TEXT NOT NULL,
            payload TEXT NOT NULL,
            FOREIGN KEY(exam_id) REFERENCES exams(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_revisions_exam ON revisions(exam_id, kind)",
        [],
    )?;

    Ok(conn)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRow {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionRow {
    pub id: String,
    pub exam_id: String,
    pub kind: String,
    pub saved_at: String,
    pub checksum: String,
}

pub fn exam_exists(conn: &Connection, exam_id: &str) -> anyhow::Result<bool> {
    let hit: Option<i64> = conn
        .query_row("SELECT 1 FROM exams WHERE id = ?", [exam_id], |r| r.get(0))
        .optional()?;
    Ok(hit.is_some())
}

pub fn list_exams(conn: &Connection, tenant_id: Option<&str>) -> anyhow::Result<Vec<ExamRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, tenant_id, name, created_at
         FROM exams
         WHERE (?1 IS NULL OR tenant_id = ?1)
         ORDER BY tenant_id, name",
    )?;
    let rows = stmt
        .query_map([tenant_id], |row| {
            Ok(ExamRow {
                id: row.get(0)?,
                tenant_id: row.get(1)?,
                name: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn create_exam(conn: &Connection, tenant_id: &str, name: &str) -> anyhow::Result<ExamRow> {
    let row = ExamRow {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant_id.to_string(),
        name: name.to_string(),
        created_at: now_rfc3339(),
    };
    conn.execute(
        "INSERT INTO exams(id, tenant_id, name, created_at) VALUES(?, ?, ?, ?)",
        (&row.id, &row.tenant_id, &row.name, &row.created_at),
    )
    .context("failed to insert exam")?;
    Ok(row)
}

/// Returns false when the exam did not exist.
pub fn delete_exam(conn: &Connection, exam_id: &str) -> anyhow::Result<bool> {
    if !exam_exists(conn, exam_id)? {
        return Ok(false);
    }
    let tx = conn.unchecked_transaction()?;
    // No ON DELETE CASCADE; children go first.
    tx.execute("DELETE FROM grade_ranges WHERE exam_id = ?", [exam_id])?;
    tx.execute("DELETE FROM pricing_tiers WHERE exam_id = ?", [exam_id])?;
    tx.execute("DELETE FROM revisions WHERE exam_id = ?", [exam_id])?;
    tx.execute("DELETE FROM exams WHERE id = ?", [exam_id])?;
    tx.commit()?;
    Ok(true)
}

/// Raw stored rows. Callers run them through [`GradeRangeSet::from_records`] so
/// grades with no row come back unset.
pub fn load_grade_records(conn: &Connection, exam_id: &str) -> anyhow::Result<Vec<GradeRecord>> {
    let mut stmt = conn.prepare(
        "SELECT grade, min_value, max_value
         FROM grade_ranges
         WHERE exam_id = ?
         ORDER BY position",
    )?;
    let rows = stmt
        .query_map([exam_id], |row| {
            Ok(GradeRecord {
                grade: row.get(0)?,
                min: row.get(1)?,
                max: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Replaces the exam's whole configuration in one transaction.
pub fn save_grade_ranges(
    conn: &Connection,
    exam_id: &str,
    set: &GradeRangeSet,
) -> anyhow::Result<RevisionRow> {
    let records = set.to_records();
    let tx = conn
        .unchecked_transaction()
        .context("failed to begin grade range transaction")?;
    tx.execute("DELETE FROM grade_ranges WHERE exam_id = ?", [exam_id])?;
    {
        let mut ins = tx.prepare(
            "INSERT INTO grade_ranges(exam_id, grade, position, min_value, max_value)
             VALUES(?, ?, ?, ?, ?)",
        )?;
        for (i, rec) in records.iter().enumerate() {
            ins.execute((exam_id, &rec.grade, i as i64, rec.min, rec.max))?;
        }
    }
    let payload = serde_json::to_value(&records)?;
    let revision = insert_revision(&tx, exam_id, KIND_GRADE_RANGES, &payload)?;
    tx.commit().context("failed to commit grade ranges")?;
    Ok(revision)
}

pub fn load_pricing_tiers(conn: &Connection, exam_id: &str) -> anyhow::Result<Vec<PricingTier>> {
    let mut stmt = conn.prepare(
        "SELECT min_subjects, max_subjects, price
         FROM pricing_tiers
         WHERE exam_id = ?
         ORDER BY position",
    )?;
    let rows = stmt
        .query_map([exam_id], |row| {
            Ok(PricingTier {
                min_subjects: row.get(0)?,
                max_subjects: row.get(1)?,
                price: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn save_pricing_tiers(
    conn: &Connection,
    exam_id: &str,
    tiers: &[PricingTier],
) -> anyhow::Result<RevisionRow> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to begin pricing transaction")?;
    tx.execute("DELETE FROM pricing_tiers WHERE exam_id = ?", [exam_id])?;
    {
        let mut ins = tx.prepare(
            "INSERT INTO pricing_tiers(exam_id, position, min_subjects, max_subjects, price)
             VALUES(?, ?, ?, ?, ?)",
        )?;
        for (i, t) in tiers.iter().enumerate() {
            ins.execute((exam_id, i as i64, t.min_subjects, t.max_subjects, t.price))?;
        }
    }
    let payload = serde_json::to_value(tiers)?;
    let revision = insert_revision(&tx, exam_id, KIND_PRICING_TIERS, &payload)?;
    tx.commit().context("failed to commit pricing tiers")?;
    Ok(revision)
}

pub fn list_revisions(
    conn: &Connection,
    exam_id: &str,
    kind: Option<&str>,
) -> anyhow::Result<Vec<RevisionRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, exam_id, kind, saved_at, checksum
         FROM revisions
         WHERE exam_id = ?1 AND (?2 IS NULL OR kind = ?2)
         ORDER BY saved_at DESC, rowid DESC",
    )?;
    let rows = stmt
        .query_map((exam_id, kind), |row| {
            Ok(RevisionRow {
                id: row.get(0)?,
                exam_id: row.get(1)?,
                kind: row.get(2)?,
                saved_at: row.get(3)?,
                checksum: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn insert_revision(
    conn: &Connection,
    exam_id: &str,
    kind: &str,
    payload: &serde_json::Value,
) -> anyhow::Result<RevisionRow> {
    let text = serde_json::to_string(payload)?;
    let row = RevisionRow {
        id: Uuid::new_v4().to_string(),
        exam_id: exam_id.to_string(),
        kind: kind.to_string(),
        saved_at: now_rfc3339(),
        checksum: sha256_hex(text.as_bytes()),
    };
    conn.execute(
        "INSERT INTO revisions(id, exam_id, kind, saved_at, checksum, payload)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &row.id,
            &row.exam_id,
            &row.kind,
            &row.saved_at,
            &row.checksum,
            &text,
        ),
    )
    .context("failed to record revision")?;
    Ok(row)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
