use formvox_db::{get_submission, insert_submission, open_database, DbRuntimeSettings};
use std::collections::BTreeMap;

#[test]
fn submissions_survive_reopening_the_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("formvox.db");
    let path = path.to_str().expect("utf-8 path");

    let mut values = BTreeMap::new();
    values.insert("plan".to_string(), "pro".to_string());
    {
        let pool = open_database(path, DbRuntimeSettings::default()).expect("open");
        let conn = pool.get().expect("connection");
        insert_submission(&conn, "session-a", 4, &values).expect("insert");
    }

    let pool = open_database(path, DbRuntimeSettings::default()).expect("reopen");
    let conn = pool.get().expect("connection");
    let stored = get_submission(&conn, "session-a")
        .expect("query")
        .expect("stored submission");
    assert_eq!(stored.values, values);
    assert_eq!(stored.field_count, 4);

    let tables: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
        .expect("prepare")
        .query_map([], |row| row.get(0))
        .expect("query")
        .collect::<Result<_, _>>()
        .expect("rows");
    assert_eq!(
        tables,
        vec!["_formvox_migrations", "submission_answers", "submissions"]
    );
}
