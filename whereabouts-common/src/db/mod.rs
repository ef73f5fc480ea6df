//! Database pool and schema initialisation
//!
//! Tables are created with `CREATE TABLE IF NOT EXISTS`, so startup is
//! idempotent against an existing database file.

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open (creating if needed) the SQLite database and ensure the schema exists
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the attendance and offender_event tables
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            booking_id INTEGER NOT NULL,
            event_id INTEGER NOT NULL,
            event_location_id INTEGER NOT NULL,
            event_date TEXT NOT NULL,
            period TEXT NOT NULL,
            prison_id TEXT NOT NULL,
            attended INTEGER NOT NULL,
            paid INTEGER NOT NULL,
            absent_reason TEXT,
            absent_sub_reason TEXT,
            comments TEXT,
            case_note_id INTEGER,
            create_user_id TEXT NOT NULL,
            create_date_time TEXT NOT NULL,
            modify_user_id TEXT,
            modify_date_time TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Upsert key: one row per booking, event, day and period
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS attendance_booking_event_date_period
        ON attendance (booking_id, event_id, event_date, period)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS attendance_prison_location_date
        ON attendance (prison_id, event_location_id, event_date, period)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS offender_event (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            booking_id INTEGER NOT NULL,
            event_id INTEGER NOT NULL,
            event_type TEXT NOT NULL,
            event_date TEXT NOT NULL,
            period TEXT NOT NULL,
            prison_id TEXT NOT NULL,
            current_location INTEGER NOT NULL,
            create_user_id TEXT NOT NULL,
            create_date_time TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (attendance, offender_event)");

    Ok(())
}
