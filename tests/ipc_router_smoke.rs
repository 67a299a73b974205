mod test_support;

use serde_json::json;
use test_support::{request_err, request_err_as, request_ok, select_workspace, send_line, spawn_sidecar};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("workspacePath").map(|v| v.is_null()).unwrap_or(false));
    assert_eq!(health["standards"], "bundled");

    let (code, _) = request_err(&mut stdin, &mut reader, "2", "students.list", json!({}));
    assert_eq!(code, "no_workspace");

    let _ = select_workspace(&mut stdin, &mut reader, "prairie-router-smoke");

    for (i, method) in [
        "setup.get",
        "students.list",
        "fitness.list",
        "curriculum.list",
        "lessons.list",
        "teachers.list",
        "periods.list",
        "activationCodes.list",
        "adminLogs.list",
        "reports.pacerComparison",
        "standards.info",
        "students.importTemplate",
        "curriculum.skillFocusOptions",
    ]
    .iter()
    .enumerate()
    {
        let _ = request_ok(&mut stdin, &mut reader, &format!("m{}", i), method, json!({}));
    }

    let (code, message) = request_err(&mut stdin, &mut reader, "9", "grades.open", json!({}));
    assert_eq!(code, "not_implemented");
    assert_eq!(message, "unknown method: grades.open");

    let (code, _) = request_err_as(&mut stdin, &mut reader, "10", "teachers.list", json!({}), None);
    assert_eq!(code, "forbidden");
}

#[test]
fn malformed_lines_get_bad_json_and_the_loop_continues() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let resp = send_line(&mut stdin, &mut reader, "{not json");
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["error"]["code"], "bad_json");

    let health = request_ok(&mut stdin, &mut reader, "after", "health", json!({}));
    assert!(health.get("version").is_some());
}

#[test]
fn standards_info_reports_the_bundled_table() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let info = request_ok(&mut stdin, &mut reader, "1", "standards.info", json!({}));
    assert_eq!(info["source"], "bundled");
    assert_eq!(info["fingerprint"].as_str().map(str::len), Some(64));
    let boys = info["ageKeys"]["boys"].as_array().expect("boys age keys");
    assert_eq!(boys.last().and_then(|v| v.as_str()), Some("17+"));
}
