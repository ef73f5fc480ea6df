//! Legacy offender event records
//!
//! Append and query only; there is no update path.

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::SqlitePool;
use whereabouts_common::{Error, Result, TimePeriod};

use crate::models::{CreateOffenderEvent, OffenderEvent};

const SELECT_COLUMNS: &str = "id, booking_id, event_id, event_type, event_date, period, \
     prison_id, current_location, create_user_id, create_date_time";

#[derive(Debug, sqlx::FromRow)]
struct OffenderEventRow {
    id: i64,
    booking_id: i64,
    event_id: i64,
    event_type: String,
    event_date: NaiveDate,
    period: String,
    prison_id: String,
    current_location: bool,
    create_user_id: String,
    create_date_time: NaiveDateTime,
}

impl TryFrom<OffenderEventRow> for OffenderEvent {
    type Error = Error;

    fn try_from(row: OffenderEventRow) -> Result<Self> {
        let id = row.id;
        let corrupt = move |e: Error| Error::Internal(format!("Corrupt offender event {}: {}", id, e));

        Ok(OffenderEvent {
            id,
            booking_id: row.booking_id,
            event_id: row.event_id,
            event_type: row.event_type.parse().map_err(corrupt)?,
            event_date: row.event_date,
            period: row.period.parse().map_err(corrupt)?,
            prison_id: row.prison_id,
            current_location: row.current_location,
            create_user_id: row.create_user_id,
            create_date_time: row.create_date_time,
        })
    }
}

pub async fn insert(
    pool: &SqlitePool,
    event: &CreateOffenderEvent,
    user: &str,
    now: NaiveDateTime,
) -> Result<OffenderEvent> {
    let row: OffenderEventRow = sqlx::query_as(&format!(
        r#"
        INSERT INTO offender_event (
            booking_id, event_id, event_type, event_date, period, prison_id,
            current_location, create_user_id, create_date_time
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        SELECT_COLUMNS
    ))
    .bind(event.booking_id)
    .bind(event.event_id)
    .bind(event.event_type.as_str())
    .bind(event.event_date)
    .bind(event.period.as_str())
    .bind(&event.prison_id)
    .bind(event.current_location)
    .bind(user)
    .bind(now)
    .fetch_one(pool)
    .await?;

    row.try_into()
}

/// Events recorded at a prison for a day, optionally narrowed to one period
pub async fn find_by_prison(
    pool: &SqlitePool,
    prison_id: &str,
    event_date: NaiveDate,
    period: Option<TimePeriod>,
) -> Result<Vec<OffenderEvent>> {
    let rows: Vec<OffenderEventRow> = sqlx::query_as(&format!(
        "SELECT {} FROM offender_event
         WHERE prison_id = ? AND event_date = ? AND (? IS NULL OR period = ?)
         ORDER BY id",
        SELECT_COLUMNS
    ))
    .bind(prison_id)
    .bind(event_date)
    .bind(period.map(TimePeriod::as_str))
    .bind(period.map(TimePeriod::as_str))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(OffenderEvent::try_from).collect()
}
