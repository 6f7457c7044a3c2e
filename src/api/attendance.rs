use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::attendance::service::{AttendanceService, TransitionRequest};
use crate::error::{Error, Result};
use crate::model::attendance::{AttendanceEvent, AttendanceStatus};
use crate::model::location::{IntegritySignal, LocationSample};

#[derive(Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    #[schema(example = "alice")]
    pub username: String,
    /// Bucket day; defaults to the server's current day in the organization's
    /// timezone.
    #[schema(example = "2024-03-01", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    /// Client-reported time. Informational only; the server clock is what
    /// gets recorded.
    #[schema(example = "2024-03-01T09:05:00Z", value_type = Option<String>)]
    pub check_in_time: Option<DateTime<Utc>>,
    #[schema(example = 23.7808)]
    pub check_in_latitude: f64,
    #[schema(example = 90.4074)]
    pub check_in_longitude: f64,
    /// Device-reported accuracy radius in meters.
    #[schema(example = 4.2)]
    pub check_in_accuracy: f64,
    pub check_in_address: Option<String>,
}

#[derive(Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "2024-03-01", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    #[schema(example = "2024-03-01T17:30:00Z", value_type = Option<String>)]
    pub check_out_time: Option<DateTime<Utc>>,
    #[schema(example = 23.7811)]
    pub check_out_latitude: f64,
    #[schema(example = 90.4077)]
    pub check_out_longitude: f64,
    #[schema(example = 6.0)]
    pub check_out_accuracy: f64,
    pub check_out_address: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct TransitionResponse {
    #[schema(example = "Checked in successfully")]
    pub message: String,
    pub integrity: IntegritySignal,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StatusQuery {
    pub username: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct FeedQuery {
    /// Cursor: epoch milliseconds of the last event already seen.
    pub since: Option<i64>,
    pub limit: Option<u32>,
}

/// Current day's status for a user
#[utoipa::path(
    get,
    path = "/api/attendance/status",
    params(StatusQuery),
    responses(
        (status = 200, description = "Current day's attendance projection", body = AttendanceStatus),
        (status = 400, description = "Missing or blank username"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn status(
    service: web::Data<AttendanceService>,
    query: web::Query<StatusQuery>,
) -> Result<HttpResponse> {
    let status = service.status(&query.username).await?;
    Ok(HttpResponse::Ok().json(status))
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/checkin",
    request_body = CheckInRequest,
    responses(
        (status = 200, description = "Checked in successfully", body = TransitionResponse),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 400, description = "Malformed request"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    service: web::Data<AttendanceService>,
    payload: web::Json<CheckInRequest>,
) -> Result<HttpResponse> {
    let body = payload.into_inner();
    let now = Utc::now();

    let receipt = service
        .check_in_at(
            TransitionRequest {
                username: body.username,
                date: body.date,
                client_time: body.check_in_time,
                sample: LocationSample {
                    latitude: body.check_in_latitude,
                    longitude: body.check_in_longitude,
                    accuracy_meters: body.check_in_accuracy,
                    captured_at_epoch_ms: now.timestamp_millis(),
                },
                address: body.check_in_address,
            },
            now,
        )
        .await?;

    Ok(HttpResponse::Ok().json(TransitionResponse {
        message: receipt.message.to_string(),
        integrity: receipt.integrity,
    }))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/checkout",
    request_body = CheckOutRequest,
    responses(
        (status = 200, description = "Checked out successfully", body = TransitionResponse),
        (status = 409, description = "Not checked in, or already checked out", body = Object, example = json!({
            "message": "No active check-in found for today"
        })),
        (status = 400, description = "Malformed request"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    service: web::Data<AttendanceService>,
    payload: web::Json<CheckOutRequest>,
) -> Result<HttpResponse> {
    let body = payload.into_inner();
    let now = Utc::now();

    let receipt = service
        .check_out_at(
            TransitionRequest {
                username: body.username,
                date: body.date,
                client_time: body.check_out_time,
                sample: LocationSample {
                    latitude: body.check_out_latitude,
                    longitude: body.check_out_longitude,
                    accuracy_meters: body.check_out_accuracy,
                    captured_at_epoch_ms: now.timestamp_millis(),
                },
                address: body.check_out_address,
            },
            now,
        )
        .await?;

    Ok(HttpResponse::Ok().json(TransitionResponse {
        message: receipt.message.to_string(),
        integrity: receipt.integrity,
    }))
}

/// Committed-transition feed for dashboards
#[utoipa::path(
    get,
    path = "/api/attendance/feed",
    params(FeedQuery),
    responses(
        (status = 200, description = "Commits newer than the cursor, oldest first", body = Vec<AttendanceEvent>),
        (status = 400, description = "Invalid cursor"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn feed(
    service: web::Data<AttendanceService>,
    query: web::Query<FeedQuery>,
) -> Result<HttpResponse> {
    let since = DateTime::from_timestamp_millis(query.since.unwrap_or(0))
        .ok_or_else(|| Error::Validation("invalid since cursor".into()))?;
    let limit = query.limit.unwrap_or(100).min(1000);

    let events = service.feed(since, limit).await?;
    Ok(HttpResponse::Ok().json(events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::memory_store::MemoryAttendanceStore;
    use crate::geo::integrity::IntegrityThresholds;
    use crate::sync::StatusSync;
    use actix_web::body::MessageBody;
    use actix_web::dev::{Service, ServiceResponse};
    use actix_web::{App, http::StatusCode, test};
    use std::sync::Arc;

    async fn spawn_app() -> impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    > {
        let service = AttendanceService::new(
            Arc::new(MemoryAttendanceStore::new()),
            StatusSync::new(16),
            IntegrityThresholds::default(),
            330,
            18,
        );

        test::init_service(
            App::new().app_data(web::Data::new(service)).service(
                web::scope("/attendance")
                    .route("/status", web::get().to(status))
                    .route("/checkin", web::post().to(check_in))
                    .route("/checkout", web::post().to(check_out))
                    .route("/feed", web::get().to(feed)),
            ),
        )
        .await
    }

    fn checkin_body(username: &str, accuracy: f64) -> serde_json::Value {
        serde_json::json!({
            "username": username,
            "checkInLatitude": 23.7808,
            "checkInLongitude": 90.4074,
            "checkInAccuracy": accuracy,
        })
    }

    fn checkout_body(username: &str, accuracy: f64) -> serde_json::Value {
        serde_json::json!({
            "username": username,
            "checkOutLatitude": 23.7811,
            "checkOutLongitude": 90.4077,
            "checkOutAccuracy": accuracy,
        })
    }

    #[actix_web::test]
    async fn check_in_then_repeat_is_conflict() {
        let app = spawn_app().await;

        let req = test::TestRequest::post()
            .uri("/attendance/checkin")
            .set_json(checkin_body("api-alice", 4.0))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Checked in successfully");

        let req = test::TestRequest::post()
            .uri("/attendance/checkin")
            .set_json(checkin_body("api-alice", 4.0))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Already checked in today");
    }

    #[actix_web::test]
    async fn status_reflects_transitions() {
        let app = spawn_app().await;

        let req = test::TestRequest::get()
            .uri("/attendance/status?username=api-bob")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["checkedIn"], false);

        let req = test::TestRequest::post()
            .uri("/attendance/checkin")
            .set_json(checkin_body("api-bob", 4.0))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/attendance/status?username=api-bob")
            .to_request();
        let body: serde_json::Value =
            test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["checkedIn"], true);
        assert_eq!(body["checkedOut"], false);
    }

    #[actix_web::test]
    async fn checkout_without_check_in_is_conflict() {
        let app = spawn_app().await;

        let req = test::TestRequest::post()
            .uri("/attendance/checkout")
            .set_json(checkout_body("api-carol", 6.0))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "No active check-in found for today");
    }

    #[actix_web::test]
    async fn blank_username_is_bad_request() {
        let app = spawn_app().await;

        let req = test::TestRequest::post()
            .uri("/attendance/checkin")
            .set_json(checkin_body("   ", 4.0))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn low_accuracy_is_surfaced_but_accepted() {
        let app = spawn_app().await;

        let req = test::TestRequest::post()
            .uri("/attendance/checkin")
            .set_json(checkin_body("api-dora", 9.5))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["integrity"]["flags"]["lowAccuracy"], true);
    }

    #[actix_web::test]
    async fn feed_lists_committed_records() {
        let app = spawn_app().await;

        let req = test::TestRequest::post()
            .uri("/attendance/checkin")
            .set_json(checkin_body("api-eve", 4.0))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/attendance/feed?since=0")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        let events = body.as_array().unwrap();
        assert!(events.iter().any(|e| e["userIdentifier"] == "api-eve"));
    }
}
