use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "prairie.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            district_id TEXT NOT NULL UNIQUE,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            date_of_birth TEXT,
            sex TEXT,
            current_grade INTEGER NOT NULL,
            current_school TEXT NOT NULL,
            pe_teacher TEXT NOT NULL,
            classroom_teacher TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    // Workspaces created before sex was tracked on the roster.
    ensure_students_sex(&conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_school_grade ON students(current_school, current_grade)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_last_name ON students(last_name)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS fitness_tests(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            test_date TEXT NOT NULL,
            test_season TEXT NOT NULL,
            test_year INTEGER NOT NULL,
            cardio_test_type TEXT NOT NULL DEFAULT 'PACER',
            pacer_or_mile_run REAL,
            pushups REAL,
            situps REAL,
            sit_and_reach REAL,
            trunk_lift REAL,
            height REAL,
            weight REAL,
            bmi REAL,
            shoulder_stretch_left INTEGER,
            shoulder_stretch_right INTEGER,
            notes TEXT,
            school TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(id),
            UNIQUE(student_id, test_year, test_season)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_fitness_tests_student ON fitness_tests(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_fitness_tests_year_season ON fitness_tests(test_year, test_season)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS curriculum_resources(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            band TEXT NOT NULL DEFAULT 'ELEMENTARY',
            grade TEXT,
            unit TEXT,
            subject TEXT,
            tags TEXT,
            type TEXT NOT NULL,
            external_url TEXT,
            created_by TEXT NOT NULL,
            uploaded_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_curriculum_resources_band ON curriculum_resources(band)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS lessons(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            band TEXT NOT NULL,
            grade_group TEXT NOT NULL,
            unit TEXT,
            skill_focus TEXT,
            duration_minutes INTEGER NOT NULL,
            objectives TEXT,
            standards TEXT,
            equipment TEXT,
            warm_up TEXT,
            main_activity TEXT,
            modifications TEXT,
            assessment TEXT,
            closure TEXT,
            notes TEXT,
            progression_level TEXT,
            teacher_look_fors TEXT,
            common_mistakes TEXT,
            coaching_language TEXT,
            resource_ids_json TEXT NOT NULL DEFAULT '[]',
            status TEXT NOT NULL DEFAULT 'draft',
            created_by_email TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_lessons_owner ON lessons(created_by_email)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS teachers(
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            school TEXT NOT NULL,
            school_level TEXT,
            grade TEXT,
            department TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            activation_code_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS class_periods(
            id TEXT PRIMARY KEY,
            teacher_id TEXT NOT NULL,
            period_number INTEGER NOT NULL,
            school_year TEXT NOT NULL,
            name TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(teacher_id) REFERENCES teachers(id),
            UNIQUE(teacher_id, school_year, period_number)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS period_assignments(
            id TEXT PRIMARY KEY,
            period_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            school_year TEXT NOT NULL,
            assigned_date TEXT NOT NULL,
            drop_date TEXT,
            FOREIGN KEY(period_id) REFERENCES class_periods(id),
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_period_assignments_period ON period_assignments(period_id, school_year)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_period_assignments_student ON period_assignments(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS activation_codes(
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            active INTEGER NOT NULL DEFAULT 1,
            max_uses INTEGER NOT NULL DEFAULT 1,
            uses_count INTEGER NOT NULL DEFAULT 0,
            expires_at TEXT,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS admin_logs(
            id TEXT PRIMARY KEY,
            action TEXT NOT NULL,
            admin_email TEXT NOT NULL,
            details TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_admin_logs_created ON admin_logs(created_at)",
        [],
    )?;

    Ok(conn)
}

fn ensure_students_sex(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "students", "sex")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE students ADD COLUMN sex TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn settings_get_json(
    conn: &Connection,
    key: &str,
) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_workspace(prefix: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn open_is_idempotent() {
        let ws = temp_workspace("prairied-db-open");
        drop(open_db(&ws).expect("first open"));
        let conn = open_db(&ws).expect("second open");
        assert!(table_has_column(&conn, "students", "sex").expect("pragma"));
        assert!(table_has_column(&conn, "fitness_tests", "cardio_test_type").expect("pragma"));
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn sex_column_is_added_to_old_rosters() {
        let ws = temp_workspace("prairied-db-migrate");
        {
            let conn = Connection::open(ws.join(DB_FILE_NAME)).expect("open raw");
            conn.execute(
                "CREATE TABLE students(
                    id TEXT PRIMARY KEY,
                    district_id TEXT NOT NULL UNIQUE,
                    first_name TEXT NOT NULL,
                    last_name TEXT NOT NULL,
                    date_of_birth TEXT,
                    current_grade INTEGER NOT NULL,
                    current_school TEXT NOT NULL,
                    pe_teacher TEXT NOT NULL,
                    classroom_teacher TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )",
                [],
            )
            .expect("legacy table");
        }
        let conn = open_db(&ws).expect("open");
        assert!(table_has_column(&conn, "students", "sex").expect("pragma"));
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn settings_round_trip_and_overwrite() {
        let ws = temp_workspace("prairied-db-settings");
        let conn = open_db(&ws).expect("open");
        assert_eq!(settings_get_json(&conn, "setup.lessons").expect("get"), None);
        settings_set_json(&conn, "setup.lessons", &serde_json::json!({"a": 1})).expect("set");
        settings_set_json(&conn, "setup.lessons", &serde_json::json!({"a": 2})).expect("set");
        assert_eq!(
            settings_get_json(&conn, "setup.lessons").expect("get"),
            Some(serde_json::json!({"a": 2}))
        );
        let _ = std::fs::remove_dir_all(ws);
    }
}
