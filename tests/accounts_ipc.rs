mod test_support;

use serde_json::json;
use test_support::{
    request_err, request_err_as, request_ok, request_ok_as, select_workspace, spawn_sidecar,
    str_at, teacher,
};

#[test]
fn teacher_onboarding_with_activation_codes() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "prairie-accounts");
    let dana = teacher("dana@central.test");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "teachers.create",
        json!({ "email": "Dana@Central.test", "name": "Dana Ruiz", "school": "Central Elementary" }),
    );
    let teacher_id = str_at(&created, "teacherId").to_string();

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "teachers.create",
        json!({ "email": "dana@central.test", "name": "Dup", "school": "Central Elementary" }),
    );
    assert_eq!(code, "conflict");

    let issued = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "activationCodes.create",
        json!({ "maxUses": 1 }),
    );
    let code_value = str_at(&issued["code"], "code").to_string();
    assert_eq!(code_value.len(), 8);
    assert!(code_value.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));

    let (code, message) = request_err_as(
        &mut stdin,
        &mut reader,
        "4",
        "activationCodes.redeem",
        json!({ "code": "ZZZZZZZZ" }),
        Some(dana.clone()),
    );
    assert_eq!(code, "not_found");
    assert_eq!(message, "Invalid activation code");

    let redeemed = request_ok_as(
        &mut stdin,
        &mut reader,
        "5",
        "activationCodes.redeem",
        json!({ "code": code_value.to_ascii_lowercase() }),
        dana.clone(),
    );
    assert_eq!(redeemed["status"], "active");
    assert_eq!(redeemed["teacherId"], teacher_id.as_str());

    let (code, _) = request_err_as(
        &mut stdin,
        &mut reader,
        "6",
        "activationCodes.redeem",
        json!({ "code": code_value }),
        Some(dana.clone()),
    );
    assert_eq!(code, "conflict");

    let expired = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "activationCodes.create",
        json!({ "maxUses": 5, "expiresAt": "2020-01-01" }),
    );
    let (code, message) = request_err_as(
        &mut stdin,
        &mut reader,
        "8",
        "activationCodes.redeem",
        json!({ "code": str_at(&expired["code"], "code") }),
        Some(dana.clone()),
    );
    assert_eq!(code, "conflict");
    assert_eq!(message, "Activation code has expired");

    let setup = request_ok_as(
        &mut stdin,
        &mut reader,
        "9",
        "teachers.setup",
        json!({ "schoolLevel": "elementary", "grade": "4" }),
        dana.clone(),
    );
    assert_eq!(setup["teacher"]["schoolLevel"], "ELEMENTARY");
    assert_eq!(setup["teacher"]["grade"], "4");
    assert_eq!(setup["periods"].as_array().map(Vec::len), Some(0));

    let (code, message) = request_err_as(
        &mut stdin,
        &mut reader,
        "10",
        "teachers.setup",
        json!({ "schoolLevel": "SECONDARY" }),
        Some(dana.clone()),
    );
    assert_eq!(code, "conflict");
    assert_eq!(message, "Already setup");

    let (code, message) = request_err_as(
        &mut stdin,
        &mut reader,
        "11",
        "teachers.setup",
        json!({ "schoolLevel": "COLLEGE" }),
        Some(dana.clone()),
    );
    assert_eq!(code, "bad_params");
    assert_eq!(message, "Invalid school level");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "teachers.setStatus",
        json!({ "teacherId": teacher_id, "status": "locked" }),
    );
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "teachers.list",
        json!({ "status": "locked" }),
    );
    assert_eq!(listed["teachers"].as_array().map(Vec::len), Some(1));

    let (code, _) = request_err_as(
        &mut stdin,
        &mut reader,
        "14",
        "teachers.list",
        json!({}),
        Some(dana),
    );
    assert_eq!(code, "forbidden");

    let codes = request_ok(&mut stdin, &mut reader, "15", "activationCodes.list", json!({}));
    assert_eq!(codes["codes"].as_array().map(Vec::len), Some(2));
}

#[test]
fn admin_logs_page_and_filter() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "prairie-admin-logs");

    for i in 0..5 {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("c{}", i),
            "activationCodes.create",
            json!({}),
        );
    }
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "t",
        "teachers.create",
        json!({ "email": "lee@high.test", "name": "Lee", "school": "Lincoln High" }),
    );

    let page = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "adminLogs.list",
        json!({ "page": 2, "pageSize": 4 }),
    );
    assert_eq!(page["total"], 6);
    assert_eq!(page["page"], 2);
    assert_eq!(page["logs"].as_array().map(Vec::len), Some(2));

    let newest = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "adminLogs.list",
        json!({ "pageSize": 1 }),
    );
    assert_eq!(newest["logs"][0]["action"], "teacher_create");
    assert_eq!(newest["logs"][0]["adminEmail"], "admin@district.test");
    assert_eq!(newest["logs"][0]["details"]["email"], "lee@high.test");

    let clamped = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "adminLogs.list",
        json!({ "page": 0, "pageSize": 1000, "action": "activation_code" }),
    );
    assert_eq!(clamped["page"], 1);
    assert_eq!(clamped["pageSize"], 100);
    assert_eq!(clamped["total"], 5);
}
