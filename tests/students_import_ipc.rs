mod test_support;

use serde_json::json;
use test_support::{
    request_err, request_err_as, request_ok, request_ok_as, select_workspace, spawn_sidecar,
    str_at, teacher,
};

const ROSTER: &str = "districtId,firstName,lastName,dateOfBirth,grade,school,peTeacher,classroomTeacher,sex
S100,Ava,Lopez,2014-06-01,4,Central Elementary,Ms. Reed,Mr. Hill,F
S101,Ben,Young,2013-02-11,5,Central Elementary,Ms. Reed,Mrs. Diaz,M
S102,Cal,Zeller,2010-09-30,8,Lincoln Middle,Mr. Park,,M
S103,Dee,Bad,2014-13-40,4,Central Elementary,Ms. Reed,,F
S104,Eli,Tiny,2018-01-01,1,Central Elementary,Ms. Reed,,M
";

#[test]
fn roster_import_reports_row_errors_and_upserts_by_district_id() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "prairie-students-import");

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.importCsv",
        json!({ "csv": ROSTER }),
    );
    assert_eq!(result["imported"], 3);
    assert_eq!(result["skipped"], 2);
    let errors = result["errors"].as_array().expect("errors");
    assert_eq!(errors[0]["row"], 5);
    assert_eq!(errors[0]["districtId"], "S103");
    assert_eq!(errors[0]["error"], "Invalid date format (use YYYY-MM-DD)");
    assert_eq!(errors[1]["row"], 6);
    assert_eq!(errors[1]["error"], "Grade must be between 3 and 12");

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.list",
        json!({ "school": "Central Elementary" }),
    );
    let names: Vec<&str> = listed["students"]
        .as_array()
        .expect("students")
        .iter()
        .map(|s| str_at(s, "lastName"))
        .collect();
    assert_eq!(names, vec!["Lopez", "Young"]);

    // Re-importing the same district id updates in place.
    let again = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.importCsv",
        json!({ "csv": "districtId,firstName,lastName,dateOfBirth,grade,school,peTeacher\nS100,Ava,Lopez,2014-06-01,5,Central Elementary,Ms. Reed\n" }),
    );
    assert_eq!(again["imported"], 1);
    let student = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.get",
        json!({ "districtId": "S100" }),
    );
    assert_eq!(student["student"]["currentGrade"], 5);
    assert_eq!(student["student"]["sex"], "F");

    let all = request_ok(&mut stdin, &mut reader, "5", "students.list", json!({}));
    assert_eq!(all["students"].as_array().map(Vec::len), Some(3));

    let logs = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "adminLogs.list",
        json!({ "action": "students_import" }),
    );
    assert_eq!(logs["total"], 2);
}

#[test]
fn empty_and_malformed_imports_fail() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "prairie-students-empty");

    let (code, message) = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "students.importCsv",
        json!({ "csv": "" }),
    );
    assert_eq!(code, "import_failed");
    assert_eq!(message, "CSV file is empty");

    let (code, _) = request_err_as(
        &mut stdin,
        &mut reader,
        "2",
        "students.importCsv",
        json!({ "csv": ROSTER }),
        Some(teacher("coach@school.test")),
    );
    assert_eq!(code, "forbidden");
}

#[test]
fn upsert_get_and_delete_student() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "prairie-students-upsert");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.upsert",
        json!({
            "districtId": "S200",
            "firstName": "Fay",
            "lastName": "North",
            "dateOfBirth": "2012-03-04",
            "grade": 6,
            "school": "Lincoln Middle",
            "peTeacher": "Mr. Park",
            "sex": "F"
        }),
    );
    assert_eq!(created["created"], true);
    let student_id = str_at(&created, "studentId").to_string();

    let (code, message) = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "students.upsert",
        json!({
            "districtId": "S201",
            "firstName": "Gus",
            "lastName": "South",
            "dateOfBirth": "2012-03-04",
            "grade": 2,
            "school": "Lincoln Middle",
            "peTeacher": "Mr. Park"
        }),
    );
    assert_eq!(code, "bad_params");
    assert_eq!(message, "Grade must be between 3 and 12");

    let _ = request_ok_as(
        &mut stdin,
        &mut reader,
        "3",
        "fitness.save",
        json!({
            "studentId": student_id,
            "testDate": "2024-09-20",
            "testSeason": "Fall",
            "testYear": 2024,
            "pacerOrMileRun": 30
        }),
        teacher("park@school.test"),
    );

    let fetched = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.get",
        json!({ "studentId": student_id }),
    );
    assert_eq!(fetched["fitnessTests"].as_array().map(Vec::len), Some(1));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.delete",
        json!({ "studentId": student_id }),
    );
    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "students.get",
        json!({ "studentId": student_id }),
    );
    assert_eq!(code, "not_found");
    let tests = request_ok(&mut stdin, &mut reader, "7", "fitness.list", json!({}));
    assert_eq!(tests["tests"].as_array().map(Vec::len), Some(0));
}
