//! Attendance statistics endpoint tests

mod common;

use axum::http::{Method, StatusCode};
use common::{date, oauth_tokens, spawn_token_server, PrisonCall, TestApp};
use serde_json::json;
use whereabouts_common::TimePeriod;

async fn record(app: &TestApp, booking_id: i64, day: &str, period: &str, body: serde_json::Value) {
    let mut request = json!({
        "bookingId": booking_id,
        "eventId": 100 + booking_id,
        "eventLocationId": 1,
        "period": period,
        "prisonId": "LEI",
        "eventDate": day
    });
    for (key, value) in body.as_object().unwrap() {
        request[key] = value.clone();
    }
    let (status, _) = app.request(Method::POST, "/attendance", Some(request)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_stats_over_range() {
    let app = TestApp::new().await;
    app.prison_api.schedule(date(2024, 5, 1), TimePeriod::Am, 3);
    app.prison_api.schedule(date(2024, 5, 2), TimePeriod::Pm, 2);
    app.prison_api.schedule(date(2024, 5, 2), TimePeriod::Ed, 10);

    record(&app, 1, "2024-05-01", "AM", json!({"attended": true, "paid": true})).await;
    record(
        &app,
        2,
        "2024-05-01",
        "AM",
        json!({"attended": false, "paid": false, "absentReason": "Refused"}),
    )
    .await;
    record(
        &app,
        3,
        "2024-05-02",
        "PM",
        json!({"attended": false, "paid": true, "absentReason": "ApprovedCourse"}),
    )
    .await;
    // Evening sessions are not counted by default
    record(&app, 4, "2024-05-02", "ED", json!({"attended": true, "paid": true})).await;

    let (status, body) = app
        .request(
            Method::GET,
            "/attendance-statistics/LEI/over-date-range?fromDate=2024-05-01&toDate=2024-05-02",
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body.unwrap(),
        json!({
            "scheduleActivities": 5,
            "notRecorded": 2,
            "paidReasons": {
                "attended": 1,
                "acceptableAbsence": 0,
                "approvedCourse": 1,
                "notRequired": 0
            },
            "unpaidReasons": {
                "refused": 1,
                "sessionCancelled": 0,
                "restDay": 0,
                "restInCell": 0,
                "sick": 0,
                "unacceptableAbsence": 0
            }
        })
    );

    let schedule_calls = app
        .prison_api
        .calls()
        .into_iter()
        .filter(|c| matches!(c, PrisonCall::GetScheduledActivities(..)))
        .count();
    assert_eq!(schedule_calls, 4);
}

#[tokio::test]
async fn test_stats_single_period() {
    let app = TestApp::new().await;
    app.prison_api.schedule(date(2024, 5, 2), TimePeriod::Ed, 1);
    record(&app, 4, "2024-05-02", "ED", json!({"attended": true, "paid": true})).await;
    record(&app, 5, "2024-05-02", "ED", json!({"attended": true, "paid": true})).await;

    let (status, body) = app
        .request(
            Method::GET,
            "/attendance-statistics/LEI/over-date-range?fromDate=2024-05-02&period=ED",
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["scheduleActivities"], 1);
    assert_eq!(body["paidReasons"]["attended"], 2);
    // More recorded than scheduled never goes negative
    assert_eq!(body["notRecorded"], 0);
}

#[tokio::test]
async fn test_stats_rejects_reversed_range() {
    let app = TestApp::new().await;

    let (status, _) = app
        .request(
            Method::GET,
            "/attendance-statistics/LEI/over-date-range?fromDate=2024-05-02&toDate=2024-05-01",
            None,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.prison_api.calls().is_empty());
}

#[tokio::test]
async fn test_stats_rejects_long_range() {
    let app = TestApp::new().await;

    let (status, _) = app
        .request(
            Method::GET,
            "/attendance-statistics/LEI/over-date-range?fromDate=2024-01-01&toDate=2024-02-01",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::GET,
            "/attendance-statistics/LEI/over-date-range?fromDate=2024-01-01&toDate=2024-01-31",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_stats_requires_from_date() {
    let app = TestApp::new().await;

    let (status, _) = app
        .request(Method::GET, "/attendance-statistics/LEI/over-date-range", None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_schedule_lookups_use_service_token() {
    let url = spawn_token_server("service-token").await;
    let app = TestApp::with_tokens(oauth_tokens(url)).await;

    let (status, _) = app
        .request(
            Method::GET,
            "/attendance-statistics/LEI/over-date-range?fromDate=2024-05-01",
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let tokens = app.prison_api.schedule_tokens.lock().unwrap().clone();
    assert_eq!(tokens, vec!["service-token".to_string(); 2]);
}
