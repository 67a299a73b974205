mod test_support;

use chrono::{Datelike, Local};
use serde_json::{json, Value};
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{request_ok, request_ok_as, select_workspace, spawn_sidecar, str_at, teacher};

fn add_student(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    district_id: &str,
    last_name: &str,
    dob: &str,
    grade: i64,
) -> String {
    let created = request_ok(
        stdin,
        reader,
        &format!("add-{}", district_id),
        "students.upsert",
        json!({
            "districtId": district_id,
            "firstName": "Kid",
            "lastName": last_name,
            "dateOfBirth": dob,
            "grade": grade,
            "school": "Central Elementary",
            "peTeacher": "Ms. Reed",
            "classroomTeacher": "Mr. Hill",
            "sex": "M"
        }),
    );
    str_at(&created, "studentId").to_string()
}

fn save(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, id: &str, params: Value) {
    let _ = request_ok(stdin, reader, id, "fitness.save", params);
}

fn row_for<'a>(report: &'a Value, district_id: &str) -> &'a Value {
    report["students"]
        .as_array()
        .expect("students")
        .iter()
        .find(|r| r["student"]["districtId"] == district_id)
        .unwrap_or_else(|| panic!("no row for {}", district_id))
}

#[test]
fn pacer_comparison_pairs_seasons_within_the_school_year() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "prairie-reports-pacer");

    let gainer = add_student(&mut stdin, &mut reader, "R1", "Adams", "2014-06-01", 4);
    let steady = add_student(&mut stdin, &mut reader, "R2", "Baker", "2014-06-01", 4);
    let _absent = add_student(&mut stdin, &mut reader, "R3", "Cole", "2014-06-01", 4);

    for (id, student, date, season, year, laps) in [
        ("p1", &gainer, "2023-09-12", "Fall", 2023, 50),
        ("p2", &gainer, "2024-09-15", "Fall", 2024, 20),
        ("p3", &gainer, "2025-04-15", "Spring", 2024, 30),
        ("p4", &steady, "2024-09-16", "Fall", 2024, 30),
        ("p5", &steady, "2025-04-16", "Spring", 2024, 31),
    ] {
        save(
            &mut stdin,
            &mut reader,
            id,
            json!({
                "studentId": student,
                "testDate": date,
                "testSeason": season,
                "testYear": year,
                "pacerOrMileRun": laps
            }),
        );
    }

    let report = request_ok(
        &mut stdin,
        &mut reader,
        "r1",
        "reports.pacerComparison",
        json!({ "school": "Central Elementary", "schoolYear": "2024-2025" }),
    );
    assert_eq!(report["schoolYear"], "2024-2025");

    let a = row_for(&report, "R1");
    assert_eq!(a["fall"]["laps"], 20.0);
    assert_eq!(a["fall"]["zone"], "needsImprovementLow");
    assert_eq!(a["spring"]["zone"], "healthyFitnessZone");
    assert_eq!(a["status"]["status"], "significantImprovement");
    assert_eq!(a["comparison"]["difference"], 10.0);

    let b = row_for(&report, "R2");
    assert_eq!(b["status"]["label"], "No Clear Change");

    let c = row_for(&report, "R3");
    assert_eq!(c["status"]["status"], "noData");
    assert!(c["fall"].is_null());

    assert_eq!(report["stats"]["totalStudentsWithBothTests"], 2);
    assert_eq!(report["stats"]["studentsWithSignificantImprovement"], 1);
    assert_eq!(report["significantImprovement"], 1);
    assert_eq!(report["statusCounts"]["No Data"], 1);

    let card = request_ok(
        &mut stdin,
        &mut reader,
        "r2",
        "reports.studentCard",
        json!({ "studentId": gainer, "schoolYear": "2023" }),
    );
    assert_eq!(card["schoolYear"], "2023-2024");
    assert_eq!(card["fall"]["test"]["pacerOrMileRun"], 50.0);
    assert!(card["spring"].is_null());
    assert_eq!(card["comparisons"]["pacer"]["hasBoth"], false);
}

#[test]
fn secondary_summary_uses_the_period_roster() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "prairie-reports-secondary");

    let today = Local::now().date_naive();
    let y = if today.month() >= 8 { today.year() } else { today.year() - 1 };
    let coach = teacher("coach@lincoln.test");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "t1",
        "teachers.create",
        json!({ "email": "coach@lincoln.test", "name": "Coach Park", "school": "Lincoln High", "status": "active" }),
    );
    let setup = request_ok_as(
        &mut stdin,
        &mut reader,
        "t2",
        "teachers.setup",
        json!({ "schoolLevel": "SECONDARY", "department": "PE", "periods": [2, 1] }),
        coach.clone(),
    );
    let periods = setup["periods"].as_array().expect("periods");
    assert_eq!(periods.len(), 2);
    assert_eq!(periods[0]["periodNumber"], 1);
    assert_eq!(periods[0]["schoolYear"], format!("{}-{}", y, y + 1));
    let period_id = str_at(&periods[0], "id").to_string();

    let dob = format!("{}-06-01", y - 15);
    let improver = add_student(&mut stdin, &mut reader, "H1", "Irwin", &dob, 10);
    let missing = add_student(&mut stdin, &mut reader, "H2", "Jones", &dob, 10);
    let assigned = request_ok_as(
        &mut stdin,
        &mut reader,
        "a1",
        "periods.assign",
        json!({ "periodId": period_id, "studentIds": [improver, missing, "ghost"] }),
        coach.clone(),
    );
    assert_eq!(assigned["assigned"], 2);
    assert_eq!(assigned["skipped"], json!(["ghost"]));

    save(
        &mut stdin,
        &mut reader,
        "s1",
        json!({
            "studentId": improver,
            "testDate": format!("{}-09-20", y),
            "testSeason": "Fall",
            "testYear": y,
            "pacerOrMileRun": 30, "pushups": 5, "situps": 10, "sitAndReach": 4, "trunkLift": 6
        }),
    );
    save(
        &mut stdin,
        &mut reader,
        "s2",
        json!({
            "studentId": improver,
            "testDate": format!("{}-04-20", y + 1),
            "testSeason": "Spring",
            "testYear": y,
            "pacerOrMileRun": 60, "pushups": 20, "situps": 30, "sitAndReach": 10, "trunkLift": 10
        }),
    );

    let summary = request_ok_as(
        &mut stdin,
        &mut reader,
        "r1",
        "reports.secondaryClassSummary",
        json!({ "periodId": period_id }),
        coach.clone(),
    );
    let i = row_for(&summary, "H1");
    assert_eq!(i["outcome"]["fallZone"], "Needs Improvement");
    assert_eq!(i["outcome"]["springZone"], "HFZ");
    assert_eq!(i["outcome"]["status"], "significantImprovement");
    assert_eq!(row_for(&summary, "H2")["outcome"]["status"], "noData");
    assert_eq!(summary["summary"]["totalStudents"], 2);
    assert_eq!(summary["summary"]["studentsWithBothTests"], 1);
    assert_eq!(summary["summary"]["percentSignificantImprovement"], 100.0);

    let _ = request_ok_as(
        &mut stdin,
        &mut reader,
        "d1",
        "periods.drop",
        json!({ "periodId": period_id, "studentId": missing }),
        coach.clone(),
    );
    let roster = request_ok_as(
        &mut stdin,
        &mut reader,
        "d2",
        "periods.students",
        json!({ "periodId": period_id }),
        coach,
    );
    assert_eq!(roster["students"].as_array().map(Vec::len), Some(1));
}
