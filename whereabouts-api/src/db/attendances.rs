//! Attendance table operations
//!
//! One row per (booking, event, date, period). Writes go through `upsert`, so
//! a second submission for the same key updates the row in place and only
//! the modify audit columns record that it happened.

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};
use whereabouts_common::{AbsentReason, AbsentSubReason, Error, Result, TimePeriod};

use crate::models::Attendance;

const SELECT_COLUMNS: &str = "id, booking_id, event_id, event_location_id, event_date, period, \
     prison_id, attended, paid, absent_reason, absent_sub_reason, comments, case_note_id, \
     create_user_id, create_date_time, modify_user_id, modify_date_time";

/// Values written by an attendance submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub booking_id: i64,
    pub event_id: i64,
    pub event_location_id: i64,
    pub event_date: NaiveDate,
    pub period: TimePeriod,
    pub prison_id: String,
    pub attended: bool,
    pub paid: bool,
    pub absent_reason: Option<AbsentReason>,
    pub absent_sub_reason: Option<AbsentSubReason>,
    pub comments: Option<String>,
    pub case_note_id: Option<i64>,
}

#[derive(Debug, sqlx::FromRow)]
struct AttendanceRow {
    id: i64,
    booking_id: i64,
    event_id: i64,
    event_location_id: i64,
    event_date: NaiveDate,
    period: String,
    prison_id: String,
    attended: bool,
    paid: bool,
    absent_reason: Option<String>,
    absent_sub_reason: Option<String>,
    comments: Option<String>,
    case_note_id: Option<i64>,
    create_user_id: String,
    create_date_time: NaiveDateTime,
    modify_user_id: Option<String>,
    modify_date_time: Option<NaiveDateTime>,
}

impl TryFrom<AttendanceRow> for Attendance {
    type Error = Error;

    fn try_from(row: AttendanceRow) -> Result<Self> {
        let id = row.id;
        let corrupt = move |e: Error| Error::Internal(format!("Corrupt attendance row {}: {}", id, e));

        Ok(Attendance {
            id,
            booking_id: row.booking_id,
            event_id: row.event_id,
            event_location_id: row.event_location_id,
            event_date: row.event_date,
            period: row.period.parse().map_err(corrupt)?,
            absent_reason: row
                .absent_reason
                .as_deref()
                .map(str::parse)
                .transpose()
                .map_err(corrupt)?,
            absent_sub_reason: row
                .absent_sub_reason
                .as_deref()
                .map(str::parse)
                .transpose()
                .map_err(corrupt)?,
            prison_id: row.prison_id,
            attended: row.attended,
            paid: row.paid,
            comments: row.comments,
            case_note_id: row.case_note_id,
            create_user_id: row.create_user_id,
            create_date_time: row.create_date_time,
            modify_user_id: row.modify_user_id,
            modify_date_time: row.modify_date_time,
        })
    }
}

fn into_attendances(rows: Vec<AttendanceRow>) -> Result<Vec<Attendance>> {
    rows.into_iter().map(Attendance::try_from).collect()
}

/// Insert the record, or update the existing row with the same key
///
/// `create_*` audit columns are kept on update; `modify_*` are set.
pub async fn upsert<'e>(
    executor: impl SqliteExecutor<'e>,
    record: &AttendanceRecord,
    user: &str,
    now: NaiveDateTime,
) -> Result<Attendance> {
    let row: AttendanceRow = sqlx::query_as(&format!(
        r#"
        INSERT INTO attendance (
            booking_id, event_id, event_location_id, event_date, period, prison_id,
            attended, paid, absent_reason, absent_sub_reason, comments, case_note_id,
            create_user_id, create_date_time
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(booking_id, event_id, event_date, period) DO UPDATE SET
            event_location_id = excluded.event_location_id,
            prison_id = excluded.prison_id,
            attended = excluded.attended,
            paid = excluded.paid,
            absent_reason = excluded.absent_reason,
            absent_sub_reason = excluded.absent_sub_reason,
            comments = excluded.comments,
            case_note_id = excluded.case_note_id,
            modify_user_id = excluded.create_user_id,
            modify_date_time = excluded.create_date_time
        RETURNING {}
        "#,
        SELECT_COLUMNS
    ))
    .bind(record.booking_id)
    .bind(record.event_id)
    .bind(record.event_location_id)
    .bind(record.event_date)
    .bind(record.period.as_str())
    .bind(&record.prison_id)
    .bind(record.attended)
    .bind(record.paid)
    .bind(record.absent_reason.map(AbsentReason::as_str))
    .bind(record.absent_sub_reason.map(AbsentSubReason::as_str))
    .bind(&record.comments)
    .bind(record.case_note_id)
    .bind(user)
    .bind(now)
    .fetch_one(executor)
    .await?;

    row.try_into()
}

/// Overwrite the outcome fields of an existing row
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    record: &AttendanceRecord,
    user: &str,
    now: NaiveDateTime,
) -> Result<Attendance> {
    let row: Option<AttendanceRow> = sqlx::query_as(&format!(
        r#"
        UPDATE attendance SET
            attended = ?,
            paid = ?,
            absent_reason = ?,
            absent_sub_reason = ?,
            comments = ?,
            case_note_id = ?,
            modify_user_id = ?,
            modify_date_time = ?
        WHERE id = ?
        RETURNING {}
        "#,
        SELECT_COLUMNS
    ))
    .bind(record.attended)
    .bind(record.paid)
    .bind(record.absent_reason.map(AbsentReason::as_str))
    .bind(record.absent_sub_reason.map(AbsentSubReason::as_str))
    .bind(&record.comments)
    .bind(record.case_note_id)
    .bind(user)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.ok_or_else(|| Error::NotFound(format!("Attendance with id {} not found", id)))?
        .try_into()
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Attendance>> {
    let row: Option<AttendanceRow> =
        sqlx::query_as(&format!("SELECT {} FROM attendance WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await?;

    row.map(Attendance::try_from).transpose()
}

pub async fn find_by_key(
    pool: &SqlitePool,
    booking_id: i64,
    event_id: i64,
    event_date: NaiveDate,
    period: TimePeriod,
) -> Result<Option<Attendance>> {
    let row: Option<AttendanceRow> = sqlx::query_as(&format!(
        "SELECT {} FROM attendance
         WHERE booking_id = ? AND event_id = ? AND event_date = ? AND period = ?",
        SELECT_COLUMNS
    ))
    .bind(booking_id)
    .bind(event_id)
    .bind(event_date)
    .bind(period.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(Attendance::try_from).transpose()
}

/// Attendances at one location for a day and period
pub async fn find_by_location(
    pool: &SqlitePool,
    prison_id: &str,
    event_location_id: i64,
    event_date: NaiveDate,
    period: TimePeriod,
) -> Result<Vec<Attendance>> {
    let rows: Vec<AttendanceRow> = sqlx::query_as(&format!(
        "SELECT {} FROM attendance
         WHERE prison_id = ? AND event_location_id = ? AND event_date = ? AND period = ?
         ORDER BY id",
        SELECT_COLUMNS
    ))
    .bind(prison_id)
    .bind(event_location_id)
    .bind(event_date)
    .bind(period.as_str())
    .fetch_all(pool)
    .await?;

    into_attendances(rows)
}

/// Attendances for a set of bookings on a day and period
pub async fn find_by_bookings(
    pool: &SqlitePool,
    prison_id: &str,
    booking_ids: &[i64],
    event_date: NaiveDate,
    period: TimePeriod,
) -> Result<Vec<Attendance>> {
    if booking_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM attendance WHERE prison_id = ", SELECT_COLUMNS));
    query.push_bind(prison_id);
    query.push(" AND event_date = ").push_bind(event_date);
    query.push(" AND period = ").push_bind(period.as_str());
    query.push(" AND booking_id IN (");
    let mut ids = query.separated(", ");
    for id in booking_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(") ORDER BY id");

    let rows: Vec<AttendanceRow> = query.build_query_as().fetch_all(pool).await?;
    into_attendances(rows)
}

/// Attendances in `[from, to]` restricted to the given periods
pub async fn find_in_range(
    pool: &SqlitePool,
    prison_id: &str,
    from: NaiveDate,
    to: NaiveDate,
    periods: &[TimePeriod],
) -> Result<Vec<Attendance>> {
    if periods.is_empty() {
        return Ok(Vec::new());
    }

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM attendance WHERE prison_id = ", SELECT_COLUMNS));
    query.push_bind(prison_id);
    query.push(" AND event_date >= ").push_bind(from);
    query.push(" AND event_date <= ").push_bind(to);
    query.push(" AND period IN (");
    let mut list = query.separated(", ");
    for period in periods {
        list.push_bind(period.as_str());
    }
    list.push_unseparated(") ORDER BY event_date, id");

    let rows: Vec<AttendanceRow> = query.build_query_as().fetch_all(pool).await?;
    into_attendances(rows)
}

/// Absences for one reason in `[from, to]`, optionally for a single period
pub async fn find_absences(
    pool: &SqlitePool,
    prison_id: &str,
    reason: AbsentReason,
    from: NaiveDate,
    to: NaiveDate,
    period: Option<TimePeriod>,
) -> Result<Vec<Attendance>> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM attendance WHERE prison_id = ", SELECT_COLUMNS));
    query.push_bind(prison_id);
    query.push(" AND absent_reason = ").push_bind(reason.as_str());
    query.push(" AND event_date >= ").push_bind(from);
    query.push(" AND event_date <= ").push_bind(to);
    if let Some(period) = period {
        query.push(" AND period = ").push_bind(period.as_str());
    }
    query.push(" ORDER BY event_date, id");

    let rows: Vec<AttendanceRow> = query.build_query_as().fetch_all(pool).await?;
    into_attendances(rows)
}
