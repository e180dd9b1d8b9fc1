use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradebandsd");
    let mut child = Command::new(exe)
        .env_remove("GRADEBANDSD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradebandsd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

fn create_exam(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    tenant: &str,
    name: &str,
) -> String {
    let created = request_ok(
        stdin,
        reader,
        id,
        "exams.create",
        json!({ "tenantId": tenant, "name": name }),
    );
    created
        .get("examId")
        .and_then(|v| v.as_str())
        .expect("examId")
        .to_string()
}

#[test]
fn exams_require_a_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let listed = request_ok(&mut stdin, &mut reader, "1", "exams.list", json!({}));
    assert_eq!(listed.get("exams"), Some(&json!([])));

    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "exams.create",
        json!({ "tenantId": "t", "name": "x" }),
    );
    assert_eq!(error_code(&resp), "no_workspace");

    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "gradeRanges.get",
        json!({ "examId": "x" }),
    );
    assert_eq!(error_code(&resp), "no_workspace");
}

#[test]
fn exams_are_scoped_by_tenant() {
    let workspace = temp_dir("gradebands-exams");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let a1 = create_exam(&mut stdin, &mut reader, "1", "tenant-a", "Mock");
    let _a2 = create_exam(&mut stdin, &mut reader, "2", "tenant-a", "Final");
    let _b1 = create_exam(&mut stdin, &mut reader, "3", "tenant-b", "Entrance");

    let all = request_ok(&mut stdin, &mut reader, "4", "exams.list", json!({}));
    assert_eq!(all["exams"].as_array().map(|a| a.len()), Some(3));

    let only_a = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "exams.list",
        json!({ "tenantId": "tenant-a" }),
    );
    let names: Vec<&str> = only_a["exams"]
        .as_array()
        .expect("exams")
        .iter()
        .map(|e| e["name"].as_str().unwrap_or(""))
        .collect();
    assert_eq!(names, vec!["Final", "Mock"]);

    let resp = request(
        &mut stdin,
        &mut reader,
        "6",
        "exams.create",
        json!({ "tenantId": "tenant-a", "name": "   " }),
    );
    assert_eq!(error_code(&resp), "bad_params");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "gradeRanges.save",
        json!({ "examId": a1, "ranges": [
            { "grade": "Fail", "min": 0, "max": 39 },
            { "grade": "Pass", "min": 40, "max": 100 },
            { "grade": "Lower Credit" },
            { "grade": "Credit" },
            { "grade": "Upper Credit" },
            { "grade": "Distinction" }
        ] }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "exams.delete",
        json!({ "examId": a1 }),
    );
    let resp = request(
        &mut stdin,
        &mut reader,
        "9",
        "gradeRanges.get",
        json!({ "examId": a1 }),
    );
    assert_eq!(error_code(&resp), "not_found");
    let resp = request(
        &mut stdin,
        &mut reader,
        "10",
        "exams.delete",
        json!({ "examId": a1 }),
    );
    assert_eq!(error_code(&resp), "not_found");

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn revisions_track_each_save() {
    let workspace = temp_dir("gradebands-revisions");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let exam_id = create_exam(&mut stdin, &mut reader, "1", "tenant-a", "Mock");

    let full = json!([
        { "grade": "Fail", "min": 0, "max": 100 },
        { "grade": "Pass" },
        { "grade": "Lower Credit" },
        { "grade": "Credit" },
        { "grade": "Upper Credit" },
        { "grade": "Distinction" }
    ]);
    let first = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "gradeRanges.save",
        json!({ "examId": exam_id, "ranges": full }),
    );
    let second = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "gradeRanges.save",
        json!({ "examId": exam_id, "ranges": full }),
    );
    // Same payload, same checksum.
    assert_eq!(first["checksum"], second["checksum"]);
    assert_ne!(first["revisionId"], second["revisionId"]);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "pricingTiers.save",
        json!({ "examId": exam_id, "tiers": [
            { "minSubjects": 1, "maxSubjects": 5, "price": 100.0 }
        ] }),
    );

    let all = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "revisions.list",
        json!({ "examId": exam_id }),
    );
    assert_eq!(all["revisions"].as_array().map(|a| a.len()), Some(3));
    assert_eq!(all["revisions"][0]["kind"].as_str(), Some("pricingTiers"));

    let ranges_only = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "revisions.list",
        json!({ "examId": exam_id, "kind": "gradeRanges" }),
    );
    assert_eq!(ranges_only["revisions"].as_array().map(|a| a.len()), Some(2));

    let resp = request(
        &mut stdin,
        &mut reader,
        "7",
        "revisions.list",
        json!({ "examId": exam_id, "kind": "themes" }),
    );
    assert_eq!(error_code(&resp), "bad_params");

    let _ = std::fs::remove_dir_all(workspace);
}
