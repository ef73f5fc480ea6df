//! Upstream HTTP clients
//!
//! The Prison API and Case Notes API are reached through traits so that the
//! service layer can be exercised without a network. The reqwest-backed
//! implementations live in the submodules.

pub mod case_notes;
pub mod oauth;
pub mod prison_api;

pub use case_notes::CaseNotesClient;
pub use oauth::ServiceTokenProvider;
pub use prison_api::PrisonApiClient;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use whereabouts_common::{EventOutcome, TimePeriod};

/// Failure talking to an upstream service
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Upstream answered with a non-success status
    #[error("Upstream returned {status}: {body}")]
    Status {
        status: StatusCode,
        content_type: Option<String>,
        body: String,
    },

    /// Request could not be sent or the response could not be read
    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream did not answer within the allowed time
    #[error("Upstream request timed out")]
    Timeout,
}

/// One booking's scheduled activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingActivity {
    pub booking_id: i64,
    pub activity_id: i64,
}

/// A physical location as reported by the Prison API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub location_id: i64,
    #[serde(default)]
    pub location_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location_prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_location_code: Option<String>,
}

/// Named grouping of locations, nested at most one level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationGroup {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub children: Vec<LocationGroup>,
}

impl LocationGroup {
    pub fn leaf(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            children: Vec::new(),
        }
    }
}

/// Activity scheduled for a booking on a given day and period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledActivity {
    pub booking_id: i64,
    #[serde(default)]
    pub event_id: Option<i64>,
    #[serde(default)]
    pub event_location_id: Option<i64>,
}

/// Case note to create against an offender
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCaseNote {
    #[serde(rename = "type")]
    pub case_note_type: String,
    pub sub_type: String,
    pub text: String,
    pub occurrence_date_time: NaiveDateTime,
}

/// Case note as returned by the Case Notes API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseNote {
    pub case_note_id: i64,
}

/// Prison-management API operations used by this service
#[async_trait]
pub trait PrisonApi: Send + Sync {
    /// `PUT /bookings/{bookingId}/activities/{activityId}/attendance`
    async fn put_attendance(
        &self,
        token: &str,
        booking_id: i64,
        activity_id: i64,
        outcome: &EventOutcome,
    ) -> Result<(), UpstreamError>;

    /// `PUT /bookings/activities/attendance`
    async fn put_attendance_for_bookings(
        &self,
        token: &str,
        bookings: &[BookingActivity],
        outcome: &EventOutcome,
    ) -> Result<(), UpstreamError>;

    /// `GET /bookings/{bookingId}?basicInfo=true`, returning the offender number
    async fn get_offender_no(&self, token: &str, booking_id: i64) -> Result<String, UpstreamError>;

    /// `GET /schedules/{prisonId}/activities?date&timeSlot`
    async fn get_scheduled_activities(
        &self,
        token: &str,
        prison_id: &str,
        date: NaiveDate,
        period: TimePeriod,
    ) -> Result<Vec<ScheduledActivity>, UpstreamError>;

    /// `GET /agencies/{agencyId}/locations/groups`
    async fn get_location_groups(
        &self,
        token: &str,
        agency_id: &str,
    ) -> Result<Vec<LocationGroup>, UpstreamError>;

    /// `GET /agencies/{agencyId}/locations/type/{type}`
    async fn get_locations_for_type(
        &self,
        token: &str,
        agency_id: &str,
        location_type: &str,
    ) -> Result<Vec<Location>, UpstreamError>;

    /// Liveness probe for the health endpoint
    async fn ping(&self) -> Result<(), UpstreamError>;
}

/// Case Notes API operations used by this service
#[async_trait]
pub trait CaseNotesApi: Send + Sync {
    /// `POST /case-notes/{offenderNo}`
    async fn post_case_note(
        &self,
        token: &str,
        offender_no: &str,
        case_note: &NewCaseNote,
    ) -> Result<CaseNote, UpstreamError>;

    /// `PUT /case-notes/{offenderNo}/{caseNoteId}`
    async fn put_case_note_amendment(
        &self,
        token: &str,
        offender_no: &str,
        case_note_id: i64,
        text: &str,
    ) -> Result<(), UpstreamError>;

    /// Liveness probe for the health endpoint
    async fn ping(&self) -> Result<(), UpstreamError>;
}

/// Turn a non-success response into `UpstreamError::Status`
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();

    Err(UpstreamError::Status {
        status: StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
        content_type,
        body,
    })
}

pub(crate) fn trim_base_url(url: impl Into<String>) -> String {
    url.into().trim_end_matches('/').to_string()
}
