mod test_support;

use serde_json::json;
use test_support::{
    request_err, request_err_as, request_ok, request_ok_as, select_workspace, spawn_sidecar,
    str_at, teacher,
};

#[test]
fn admin_manages_resources_and_teachers_browse() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "prairie-curriculum");

    let link = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "curriculum.create",
        json!({
            "title": "Jump Rope Cues",
            "type": "link",
            "externalUrl": "https://example.org/jump",
            "unit": "Jump Rope",
            "tags": "cardio, rhythm"
        }),
    );
    let link_id = str_at(&link["resource"], "id").to_string();
    assert_eq!(link["resource"]["band"], "ELEMENTARY");
    assert_eq!(link["resource"]["externalUrl"], "https://example.org/jump");

    let pdf = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "curriculum.create",
        json!({
            "title": "Volleyball Rubric",
            "type": "pdf",
            "band": "high",
            "externalUrl": "https://example.org/ignored"
        }),
    );
    assert_eq!(pdf["resource"]["band"], "HIGH");
    assert!(pdf["resource"]["externalUrl"].is_null());

    let (code, message) = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "curriculum.create",
        json!({ "title": "No type" }),
    );
    assert_eq!(code, "bad_params");
    assert_eq!(message, "Title and type are required");

    let (code, _) = request_err_as(
        &mut stdin,
        &mut reader,
        "4",
        "curriculum.create",
        json!({ "title": "Sneaky", "type": "doc" }),
        Some(teacher("coach@school.test")),
    );
    assert_eq!(code, "forbidden");

    let found = request_ok_as(
        &mut stdin,
        &mut reader,
        "5",
        "curriculum.list",
        json!({ "search": "RHYTHM" }),
        teacher("coach@school.test"),
    );
    let found = found["resources"].as_array().expect("resources");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], link_id.as_str());

    let high = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "curriculum.list",
        json!({ "band": "HIGH", "type": "pdf" }),
    );
    assert_eq!(high["resources"].as_array().map(Vec::len), Some(1));

    // Switching away from link clears the URL.
    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "curriculum.update",
        json!({ "resourceId": link_id, "patch": { "type": "doc", "title": "Jump Rope Handout" } }),
    );
    assert_eq!(updated["resource"]["type"], "doc");
    assert_eq!(updated["resource"]["title"], "Jump Rope Handout");
    assert!(updated["resource"]["externalUrl"].is_null());

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "curriculum.delete",
        json!({ "resourceId": link_id }),
    );
    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "9",
        "curriculum.delete",
        json!({ "resourceId": link_id }),
    );
    assert_eq!(code, "not_found");

    let logs = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "adminLogs.list",
        json!({ "search": "curriculum" }),
    );
    assert_eq!(logs["total"], 4);
}

#[test]
fn skill_focus_and_activity_suggestions() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let options = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "curriculum.skillFocusOptions",
        json!({ "unit": "Spatial Awareness" }),
    );
    let options: Vec<&str> = options["options"]
        .as_array()
        .expect("options")
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert!(options.contains(&"Personal Space (bubble)"));
    assert_eq!(options.last(), Some(&"Other"));

    let suggested = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "curriculum.activitySuggestions",
        json!({
            "unit": "Spatial Awareness",
            "skillFocus": "Personal Space (bubble)",
            "gradeBand": "K-2",
            "intent": "Introduce"
        }),
    );
    let ids: Vec<&str> = suggested["suggestions"]
        .as_array()
        .expect("suggestions")
        .iter()
        .filter_map(|s| s["id"].as_str())
        .collect();
    assert!(ids.contains(&"sa_k2_intro_space_bubbles"));

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "curriculum.activitySuggestions",
        json!({ "intent": "Daydream" }),
    );
    assert_eq!(code, "bad_params");
}
