//! Request and response bodies
//!
//! All JSON is camelCase; dates are `YYYY-MM-DD`.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use whereabouts_common::{AbsentReason, AbsentSubReason, EventType, TimePeriod};

use crate::clients::BookingActivity;
use crate::{ApiError, ApiResult};

/// Longest comment accepted on an attendance
pub const MAX_COMMENT_LENGTH: usize = 240;

/// Recorded attendance of one booking at one event occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: i64,
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
    pub create_user_id: String,
    pub create_date_time: NaiveDateTime,
    pub modify_user_id: Option<String>,
    pub modify_date_time: Option<NaiveDateTime>,
}

/// Body of `POST /attendance`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttendance {
    pub booking_id: i64,
    pub event_id: i64,
    pub event_location_id: i64,
    pub period: TimePeriod,
    pub prison_id: String,
    pub event_date: NaiveDate,
    pub attended: bool,
    pub paid: bool,
    #[serde(default)]
    pub absent_reason: Option<AbsentReason>,
    #[serde(default)]
    pub absent_sub_reason: Option<AbsentSubReason>,
    #[serde(default)]
    pub comments: Option<String>,
}

impl CreateAttendance {
    pub fn validate(&self) -> ApiResult<()> {
        validate_prison_id(&self.prison_id)?;
        validate_comments(self.comments.as_deref())
    }
}

/// Body of `PUT /attendance/{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAttendance {
    pub attended: bool,
    pub paid: bool,
    #[serde(default)]
    pub absent_reason: Option<AbsentReason>,
    #[serde(default)]
    pub absent_sub_reason: Option<AbsentSubReason>,
    #[serde(default)]
    pub comments: Option<String>,
}

impl UpdateAttendance {
    pub fn validate(&self) -> ApiResult<()> {
        validate_comments(self.comments.as_deref())
    }
}

/// Body of `POST /attendances`: one outcome for many bookings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttendances {
    pub booking_activities: Vec<BookingActivity>,
    pub event_location_id: i64,
    pub event_date: NaiveDate,
    pub period: TimePeriod,
    pub prison_id: String,
    pub attended: bool,
    pub paid: bool,
    #[serde(default)]
    pub absent_reason: Option<AbsentReason>,
    #[serde(default)]
    pub absent_sub_reason: Option<AbsentSubReason>,
    #[serde(default)]
    pub comments: Option<String>,
}

impl CreateAttendances {
    pub fn validate(&self) -> ApiResult<()> {
        if self.booking_activities.is_empty() {
            return Err(ApiError::BadRequest(
                "bookingActivities must not be empty".to_string(),
            ));
        }
        validate_prison_id(&self.prison_id)?;
        validate_comments(self.comments.as_deref())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendancesResponse {
    pub attendances: Vec<Attendance>,
}

/// Body of `GET /absence-reasons`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsentReasons {
    pub paid_reasons: Vec<AbsentReason>,
    pub unpaid_reasons: Vec<AbsentReason>,
    #[serde(rename = "triggersIEPWarning")]
    pub triggers_iep_warning: Vec<AbsentReason>,
    pub triggers_absent_sub_reason: Vec<AbsentReason>,
    pub paid_sub_reasons: Vec<AbsentSubReason>,
    pub unpaid_sub_reasons: Vec<AbsentSubReason>,
}

impl AbsentReasons {
    pub fn current() -> Self {
        Self {
            paid_reasons: AbsentReason::PAID.to_vec(),
            unpaid_reasons: AbsentReason::UNPAID.to_vec(),
            triggers_iep_warning: AbsentReason::IEP_TRIGGERS.to_vec(),
            triggers_absent_sub_reason: AbsentReason::SUB_REASON_TRIGGERS.to_vec(),
            paid_sub_reasons: AbsentSubReason::paid(),
            unpaid_sub_reasons: AbsentSubReason::unpaid(),
        }
    }
}

/// Counts of attended sessions and paid absences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidReasonCounts {
    pub attended: i64,
    pub acceptable_absence: i64,
    pub approved_course: i64,
    pub not_required: i64,
}

/// Counts of unpaid absences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpaidReasonCounts {
    pub refused: i64,
    pub session_cancelled: i64,
    pub rest_day: i64,
    pub rest_in_cell: i64,
    pub sick: i64,
    pub unacceptable_absence: i64,
}

/// Body of `GET /attendance-statistics/...`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub schedule_activities: i64,
    pub not_recorded: i64,
    pub paid_reasons: PaidReasonCounts,
    pub unpaid_reasons: UnpaidReasonCounts,
}

/// Legacy record that an offender event took place
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OffenderEvent {
    pub id: i64,
    pub booking_id: i64,
    pub event_id: i64,
    pub event_type: EventType,
    pub event_date: NaiveDate,
    pub period: TimePeriod,
    pub prison_id: String,
    pub current_location: bool,
    pub create_user_id: String,
    pub create_date_time: NaiveDateTime,
}

/// Body of `POST /whereabouts/offender-event`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOffenderEvent {
    pub booking_id: i64,
    pub event_id: i64,
    pub event_type: EventType,
    pub event_date: NaiveDate,
    pub period: TimePeriod,
    pub prison_id: String,
    #[serde(default)]
    pub current_location: bool,
}

impl CreateOffenderEvent {
    pub fn validate(&self) -> ApiResult<()> {
        validate_prison_id(&self.prison_id)
    }
}

fn validate_prison_id(prison_id: &str) -> ApiResult<()> {
    if prison_id.trim().is_empty() {
        return Err(ApiError::BadRequest("prisonId must not be blank".to_string()));
    }
    Ok(())
}

fn validate_comments(comments: Option<&str>) -> ApiResult<()> {
    match comments {
        Some(c) if c.chars().count() > MAX_COMMENT_LENGTH => Err(ApiError::BadRequest(format!(
            "comments must be at most {} characters",
            MAX_COMMENT_LENGTH
        ))),
        _ => Ok(()),
    }
}
