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

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("gradebands-router-smoke");
    let bundle_out = workspace.join("smoke-backup.gbbackup.zip");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health["workspacePath"].is_null());
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let health = request_ok(&mut stdin, &mut reader, "3", "health", json!({}));
    assert!(health["version"].as_str().is_some());
    assert!(health["workspacePath"].as_str().is_some());

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "exams.create",
        json!({ "tenantId": "smoke", "name": "Smoke Exam" }),
    );
    let exam_id = created["examId"].as_str().expect("examId").to_string();

    let calls = vec![
        ("exams.list", json!({})),
        ("gradeRanges.get", json!({ "examId": exam_id })),
        ("gradeRanges.validate", json!({ "ranges": [] })),
        ("gradeRanges.classify", json!({ "examId": exam_id, "score": 50 })),
        ("pricingTiers.get", json!({ "examId": exam_id })),
        ("pricingTiers.quote", json!({ "examId": exam_id, "subjectCount": 3 })),
        ("revisions.list", json!({ "examId": exam_id })),
        (
            "backup.exportWorkspace",
            json!({ "outPath": bundle_out.to_string_lossy() }),
        ),
    ];
    for (i, (method, params)) in calls.into_iter().enumerate() {
        let id = format!("s{}", i);
        let _ = request_ok(&mut stdin, &mut reader, &id, method, params);
    }

    // Unconfigured exams classify nothing.
    let classified = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "gradeRanges.classify",
        json!({ "examId": exam_id, "score": 50 }),
    );
    assert!(classified["grade"].is_null());

    let unknown = request(&mut stdin, &mut reader, "6", "themes.toggle", json!({}));
    assert_eq!(error_code(&unknown), "not_implemented");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn malformed_line_gets_bad_json_and_loop_continues() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read bad_json line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("json");
    assert_eq!(value["ok"].as_bool(), Some(false));
    assert_eq!(error_code(&value), "bad_json");
    assert!(value.get("id").is_none());

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health["version"].as_str().is_some());
}

#[test]
fn missing_params_are_bad_params() {
    let workspace = temp_dir("gradebands-router-params");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(&mut stdin, &mut reader, "1", "workspace.select", json!({}));
    assert_eq!(error_code(&resp), "bad_params");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let resp = request(&mut stdin, &mut reader, "3", "gradeRanges.get", json!({}));
    assert_eq!(error_code(&resp), "bad_params");
    let resp = request(&mut stdin, &mut reader, "4", "gradeRanges.validate", json!({}));
    assert_eq!(error_code(&resp), "bad_params");

    let _ = std::fs::remove_dir_all(workspace);
}
