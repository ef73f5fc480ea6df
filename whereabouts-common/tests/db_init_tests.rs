//! Tests for database initialization

use whereabouts_common::db::{init_database_pool, init_tables};

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("whereabouts.db");

    let pool = init_database_pool(&db_path).await;
    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_init_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("whereabouts.db");

    let pool = init_database_pool(&db_path).await.unwrap();
    init_tables(&pool).await.expect("second init should succeed");

    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
    assert_eq!(names, vec!["attendance", "offender_event"]);
}

#[tokio::test]
async fn test_attendance_key_is_unique() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database_pool(&dir.path().join("whereabouts.db")).await.unwrap();

    let insert = "INSERT INTO attendance (booking_id, event_id, event_location_id, event_date, period, \
                  prison_id, attended, paid, create_user_id, create_date_time) \
                  VALUES (1, 2, 3, '2024-05-01', 'AM', 'LEI', 1, 1, 'user', '2024-05-01T09:00:00')";
    sqlx::query(insert).execute(&pool).await.unwrap();
    let duplicate = sqlx::query(insert).execute(&pool).await;
    assert!(duplicate.is_err(), "duplicate attendance key must be rejected");
}
