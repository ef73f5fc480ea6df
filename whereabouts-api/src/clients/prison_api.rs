//! Prison API client
//!
//! Thin reqwest wrapper; every call carries the bearer token it is given.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use whereabouts_common::{EventOutcome, TimePeriod};

use super::{
    ensure_success, trim_base_url, BookingActivity, Location, LocationGroup, PrisonApi,
    ScheduledActivity, UpstreamError,
};

/// reqwest-backed `PrisonApi`
#[derive(Debug, Clone)]
pub struct PrisonApiClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchAttendanceRequest<'a> {
    booking_activities: &'a [BookingActivity],
    #[serde(flatten)]
    outcome: &'a EventOutcome,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookingBasicInfo {
    offender_no: String,
}

impl PrisonApiClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: trim_base_url(base_url),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl PrisonApi for PrisonApiClient {
    async fn put_attendance(
        &self,
        token: &str,
        booking_id: i64,
        activity_id: i64,
        outcome: &EventOutcome,
    ) -> Result<(), UpstreamError> {
        debug!(booking_id, activity_id, outcome = %outcome.event_outcome, "Updating attendance on Prison API");

        let response = self
            .http
            .put(self.url(&format!(
                "/bookings/{}/activities/{}/attendance",
                booking_id, activity_id
            )))
            .bearer_auth(token)
            .json(outcome)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn put_attendance_for_bookings(
        &self,
        token: &str,
        bookings: &[BookingActivity],
        outcome: &EventOutcome,
    ) -> Result<(), UpstreamError> {
        debug!(
            bookings = bookings.len(),
            outcome = %outcome.event_outcome,
            "Updating attendance for multiple bookings on Prison API"
        );

        let response = self
            .http
            .put(self.url("/bookings/activities/attendance"))
            .bearer_auth(token)
            .json(&BatchAttendanceRequest {
                booking_activities: bookings,
                outcome,
            })
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn get_offender_no(&self, token: &str, booking_id: i64) -> Result<String, UpstreamError> {
        let response = self
            .http
            .get(self.url(&format!("/bookings/{}", booking_id)))
            .query(&[("basicInfo", "true")])
            .bearer_auth(token)
            .send()
            .await?;
        let info: BookingBasicInfo = ensure_success(response).await?.json().await?;
        Ok(info.offender_no)
    }

    async fn get_scheduled_activities(
        &self,
        token: &str,
        prison_id: &str,
        date: NaiveDate,
        period: TimePeriod,
    ) -> Result<Vec<ScheduledActivity>, UpstreamError> {
        let response = self
            .http
            .get(self.url(&format!("/schedules/{}/activities", prison_id)))
            .query(&[
                ("date", date.format("%Y-%m-%d").to_string()),
                ("timeSlot", period.as_str().to_string()),
            ])
            .bearer_auth(token)
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn get_location_groups(
        &self,
        token: &str,
        agency_id: &str,
    ) -> Result<Vec<LocationGroup>, UpstreamError> {
        let response = self
            .http
            .get(self.url(&format!("/agencies/{}/locations/groups", agency_id)))
            .bearer_auth(token)
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn get_locations_for_type(
        &self,
        token: &str,
        agency_id: &str,
        location_type: &str,
    ) -> Result<Vec<Location>, UpstreamError> {
        let response = self
            .http
            .get(self.url(&format!(
                "/agencies/{}/locations/type/{}",
                agency_id, location_type
            )))
            .bearer_auth(token)
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn ping(&self) -> Result<(), UpstreamError> {
        let response = self.http.get(self.url("/health/ping")).send().await?;
        ensure_success(response).await?;
        Ok(())
    }
}
