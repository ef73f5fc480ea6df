//! Shared test harness
//!
//! In-memory SQLite plus recording fakes for the Prison API and Case Notes
//! API, wired into the real router.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::NaiveDate;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use whereabouts_api::clients::{
    BookingActivity, CaseNote, CaseNotesApi, Location, LocationGroup, NewCaseNote, PrisonApi,
    ScheduledActivity, ServiceTokenProvider, UpstreamError,
};
use whereabouts_api::services::{LocationGroupService, PropertiesLocationGroupService};
use whereabouts_api::{build_router, AppState};
use whereabouts_common::config::OAuthConfig;
use whereabouts_common::{EventOutcome, TimePeriod};

pub const USER: &str = "ITAG_USER";

/// Offender number the fake Prison API returns for a booking
pub fn offender_no(booking_id: i64) -> String {
    format!("A{:04}AA", booking_id)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Unsigned JWT carrying `user_name`
pub fn bearer() -> String {
    format!(
        "Bearer {}.{}.sig",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#),
        URL_SAFE_NO_PAD.encode(format!(r#"{{"user_name":"{}"}}"#, USER))
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrisonCall {
    PutAttendance {
        booking_id: i64,
        activity_id: i64,
        outcome: EventOutcome,
    },
    PutAttendanceForBookings {
        bookings: Vec<BookingActivity>,
        outcome: EventOutcome,
    },
    GetOffenderNo(i64),
    GetScheduledActivities(NaiveDate, TimePeriod),
}

/// Error the fake returns from write calls
#[derive(Debug, Clone)]
pub struct FakeFailure {
    pub status: u16,
    pub body: String,
}

#[derive(Default)]
pub struct FakePrisonApi {
    pub calls: Mutex<Vec<PrisonCall>>,
    /// Bearer token passed on each schedule lookup
    pub schedule_tokens: Mutex<Vec<String>>,
    pub fail_writes: Mutex<Option<FakeFailure>>,
    pub scheduled: Mutex<HashMap<(NaiveDate, TimePeriod), usize>>,
    pub groups: Mutex<Vec<LocationGroup>>,
    pub cells: Mutex<Vec<Location>>,
    pub ping_delay: Mutex<Option<Duration>>,
}

impl FakePrisonApi {
    pub fn calls(&self) -> Vec<PrisonCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_writes_with(&self, status: u16, body: &str) {
        *self.fail_writes.lock().unwrap() = Some(FakeFailure {
            status,
            body: body.to_string(),
        });
    }

    pub fn schedule(&self, date: NaiveDate, period: TimePeriod, count: usize) {
        self.scheduled.lock().unwrap().insert((date, period), count);
    }

    fn record(&self, call: PrisonCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn write_result(&self) -> Result<(), UpstreamError> {
        match self.fail_writes.lock().unwrap().clone() {
            Some(failure) => Err(UpstreamError::Status {
                status: StatusCode::from_u16(failure.status).unwrap(),
                content_type: Some("application/json".to_string()),
                body: failure.body,
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PrisonApi for FakePrisonApi {
    async fn put_attendance(
        &self,
        _token: &str,
        booking_id: i64,
        activity_id: i64,
        outcome: &EventOutcome,
    ) -> Result<(), UpstreamError> {
        self.record(PrisonCall::PutAttendance {
            booking_id,
            activity_id,
            outcome: outcome.clone(),
        });
        self.write_result()
    }

    async fn put_attendance_for_bookings(
        &self,
        _token: &str,
        bookings: &[BookingActivity],
        outcome: &EventOutcome,
    ) -> Result<(), UpstreamError> {
        self.record(PrisonCall::PutAttendanceForBookings {
            bookings: bookings.to_vec(),
            outcome: outcome.clone(),
        });
        self.write_result()
    }

    async fn get_offender_no(&self, _token: &str, booking_id: i64) -> Result<String, UpstreamError> {
        self.record(PrisonCall::GetOffenderNo(booking_id));
        Ok(offender_no(booking_id))
    }

    async fn get_scheduled_activities(
        &self,
        token: &str,
        _prison_id: &str,
        date: NaiveDate,
        period: TimePeriod,
    ) -> Result<Vec<ScheduledActivity>, UpstreamError> {
        self.record(PrisonCall::GetScheduledActivities(date, period));
        self.schedule_tokens.lock().unwrap().push(token.to_string());
        let count = self
            .scheduled
            .lock()
            .unwrap()
            .get(&(date, period))
            .copied()
            .unwrap_or(0);
        Ok((0..count as i64)
            .map(|i| ScheduledActivity {
                booking_id: i + 1,
                event_id: Some(100 + i),
                event_location_id: Some(1),
            })
            .collect())
    }

    async fn get_location_groups(
        &self,
        _token: &str,
        _agency_id: &str,
    ) -> Result<Vec<LocationGroup>, UpstreamError> {
        Ok(self.groups.lock().unwrap().clone())
    }

    async fn get_locations_for_type(
        &self,
        _token: &str,
        _agency_id: &str,
        _location_type: &str,
    ) -> Result<Vec<Location>, UpstreamError> {
        Ok(self.cells.lock().unwrap().clone())
    }

    async fn ping(&self) -> Result<(), UpstreamError> {
        let delay = *self.ping_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Amendment {
    pub offender_no: String,
    pub case_note_id: i64,
    pub text: String,
}

pub struct FakeCaseNotesApi {
    pub posted: Mutex<Vec<(String, NewCaseNote)>>,
    pub amended: Mutex<Vec<Amendment>>,
    next_id: AtomicI64,
}

impl Default for FakeCaseNotesApi {
    fn default() -> Self {
        Self {
            posted: Mutex::new(Vec::new()),
            amended: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1000),
        }
    }
}

impl FakeCaseNotesApi {
    pub fn posted(&self) -> Vec<(String, NewCaseNote)> {
        self.posted.lock().unwrap().clone()
    }

    pub fn amended(&self) -> Vec<Amendment> {
        self.amended.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaseNotesApi for FakeCaseNotesApi {
    async fn post_case_note(
        &self,
        _token: &str,
        offender_no: &str,
        case_note: &NewCaseNote,
    ) -> Result<CaseNote, UpstreamError> {
        self.posted
            .lock()
            .unwrap()
            .push((offender_no.to_string(), case_note.clone()));
        Ok(CaseNote {
            case_note_id: self.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn put_case_note_amendment(
        &self,
        _token: &str,
        offender_no: &str,
        case_note_id: i64,
        text: &str,
    ) -> Result<(), UpstreamError> {
        self.amended.lock().unwrap().push(Amendment {
            offender_no: offender_no.to_string(),
            case_note_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn ping(&self) -> Result<(), UpstreamError> {
        Ok(())
    }
}

/// Local OAuth server that hands out `token` for client-credentials grants
///
/// Returns its base URL.
pub async fn spawn_token_server(token: &'static str) -> String {
    let app = Router::new().route(
        "/oauth/token",
        post(move || async move { Json(json!({"access_token": token, "expires_in": 300})) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Token provider using the client-credentials grant against `url`
pub fn oauth_tokens(url: String) -> ServiceTokenProvider {
    ServiceTokenProvider::new(
        reqwest::Client::new(),
        Some(OAuthConfig {
            url,
            client_id: "whereabouts".to_string(),
            client_secret: "secret".to_string(),
        }),
    )
}

pub async fn memory_pool() -> SqlitePool {
    // One connection: each new in-memory connection would be a fresh database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    whereabouts_api::db::init_tables(&pool).await.unwrap();
    pool
}

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub prison_api: Arc<FakePrisonApi>,
    pub case_notes: Arc<FakeCaseNotesApi>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_groups(Arc::new(PropertiesLocationGroupService::default())).await
    }

    pub async fn with_properties(properties: &str) -> Self {
        let groups = PropertiesLocationGroupService::from_properties_str(properties).unwrap();
        Self::with_groups(Arc::new(groups)).await
    }

    pub async fn with_groups(groups: Arc<dyn LocationGroupService>) -> Self {
        let prison_api = Arc::new(FakePrisonApi::default());
        Self::build(prison_api, groups, Duration::from_millis(500)).await
    }

    pub async fn with_tokens(tokens: ServiceTokenProvider) -> Self {
        Self::build_with_tokens(
            Arc::new(FakePrisonApi::default()),
            Arc::new(PropertiesLocationGroupService::default()),
            tokens,
            Duration::from_millis(500),
        )
        .await
    }

    pub async fn build(
        prison_api: Arc<FakePrisonApi>,
        groups: Arc<dyn LocationGroupService>,
        health_timeout: Duration,
    ) -> Self {
        Self::build_with_tokens(
            prison_api,
            groups,
            ServiceTokenProvider::passthrough(),
            health_timeout,
        )
        .await
    }

    pub async fn build_with_tokens(
        prison_api: Arc<FakePrisonApi>,
        groups: Arc<dyn LocationGroupService>,
        tokens: ServiceTokenProvider,
        health_timeout: Duration,
    ) -> Self {
        let db = memory_pool().await;
        let case_notes = Arc::new(FakeCaseNotesApi::default());
        let state = AppState::new(
            db.clone(),
            prison_api.clone(),
            case_notes.clone(),
            groups,
            Arc::new(tokens),
        )
        .with_health_timeout(health_timeout);

        Self {
            router: build_router(state),
            db,
            prison_api,
            case_notes,
        }
    }

    /// Authenticated request; returns status and JSON body if any
    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Option<Value>) {
        self.send(method, path, body, Some(bearer())).await
    }

    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        authorization: Option<String>,
    ) -> (StatusCode, Option<Value>) {
        let mut request = Request::builder().method(method).uri(path);
        if let Some(authorization) = authorization {
            request = request.header("authorization", authorization);
        }

        let request = match body {
            Some(json_body) => request
                .header("content-type", "application/json")
                .body(Body::from(json_body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json_body = if bytes.is_empty() {
            None
        } else {
            serde_json::from_slice(&bytes).ok()
        };
        (status, json_body)
    }

    pub async fn attendance_count(&self) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM attendance")
            .fetch_one(&self.db)
            .await
            .unwrap();
        count
    }
}
