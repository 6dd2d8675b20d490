mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::appointment_routes;
use shared_utils::test_utils::monday_at;

use common::Clinic;

fn app(clinic: &Clinic) -> Router {
    appointment_routes(clinic.service.clone())
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn create_body(clinic: &Clinic, hour: u32, minute: u32) -> Value {
    json!({
        "patientId": clinic.patient.id,
        "staffId": clinic.dentist.id,
        "treatmentId": clinic.checkup.id,
        "start": monday_at(hour, minute),
        "durationMinutes": 30
    })
}

#[tokio::test]
async fn create_returns_created_appointment() {
    let clinic = Clinic::new().await;

    let (status, body) = send(app(&clinic), Method::POST, "/", Some(create_body(&clinic, 10, 0))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "scheduled");
    assert_eq!(body["durationMinutes"], 30);
    assert_eq!(body["staffId"], json!(clinic.dentist.id));
}

#[tokio::test]
async fn overlapping_create_returns_conflict_body() {
    let clinic = Clinic::new().await;
    let first = clinic.book(monday_at(10, 0), 30).await;

    let (status, body) = send(app(&clinic), Method::POST, "/", Some(create_body(&clinic, 10, 15))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "SlotConflict");
    assert_eq!(body["conflictingAppointmentId"], json!(first.id));
}

#[tokio::test]
async fn outside_hours_is_unprocessable() {
    let clinic = Clinic::new().await;

    let (status, body) = send(app(&clinic), Method::POST, "/", Some(create_body(&clinic, 18, 0))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "OutsideWorkingHours");
}

#[tokio::test]
async fn unknown_appointment_is_not_found() {
    let clinic = Clinic::new().await;

    let (status, body) = send(app(&clinic), Method::GET, &format!("/{}", Uuid::new_v4()), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");
}

#[tokio::test]
async fn status_route_applies_transition() {
    let clinic = Clinic::new().await;
    let appointment = clinic.book(monday_at(10, 0), 30).await;

    let (status, body) = send(
        app(&clinic),
        Method::POST,
        "/status",
        Some(json!({ "appointmentId": appointment.id, "newStatus": "no-show" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "no-show");

    let (status, body) = send(
        app(&clinic),
        Method::POST,
        "/status",
        Some(json!({ "appointmentId": appointment.id, "newStatus": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "InvalidTransition");
}

#[tokio::test]
async fn reschedule_route_moves_appointment() {
    let clinic = Clinic::new().await;
    let appointment = clinic.book(monday_at(10, 0), 30).await;

    let (status, body) = send(
        app(&clinic),
        Method::POST,
        "/reschedule",
        Some(json!({ "appointmentId": appointment.id, "newStart": monday_at(14, 0) })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(appointment.id));
    assert_eq!(body["start"], json!(monday_at(14, 0)));
}

#[tokio::test]
async fn cancel_and_notes_routes() {
    let clinic = Clinic::new().await;
    let appointment = clinic.book(monday_at(10, 0), 30).await;

    let (status, body) = send(
        app(&clinic),
        Method::POST,
        &format!("/{}/cancel", appointment.id),
        Some(json!({ "reason": "dentist ill" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["notes"], "Cancelled: dentist ill");

    let (status, body) = send(
        app(&clinic),
        Method::PATCH,
        &format!("/{}/notes", appointment.id),
        Some(json!({ "notes": "Rebook next week" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notes"], "Rebook next week");
}

#[tokio::test]
async fn slots_route_honours_limit() {
    let clinic = Clinic::new().await;
    clinic.book(monday_at(10, 0), 30).await;
    clinic.book(monday_at(13, 0), 30).await;

    let uri = format!(
        "/slots?staffId={}&date=2025-02-03&treatmentId={}&limit=2",
        clinic.dentist.id, clinic.checkup.id
    );
    let (status, body) = send(app(&clinic), Method::GET, &uri, None).await;

    assert_eq!(status, StatusCode::OK);
    let slots = body.as_array().unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0]["start"], json!(monday_at(9, 0)));
    assert_eq!(slots[0]["end"], json!(monday_at(10, 0)));
}

#[tokio::test]
async fn list_and_calendar_routes() {
    let clinic = Clinic::new().await;
    clinic.book(monday_at(10, 0), 30).await;
    clinic.book(monday_at(11, 0), 30).await;

    let (status, body) = send(
        app(&clinic),
        Method::GET,
        &format!("/?staffId={}&status=scheduled", clinic.dentist.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(app(&clinic), Method::GET, "/calendar?view=week&date=2025-02-05", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn cancel_without_body_has_no_reason() {
    let clinic = Clinic::new().await;
    let appointment = clinic.book(monday_at(10, 0), 30).await;

    let (status, body) = send(app(&clinic), Method::POST, &format!("/{}/cancel", appointment.id), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["notes"], Value::Null);
}

#[tokio::test]
async fn extended_year_start_is_a_bad_request() {
    let clinic = Clinic::new().await;
    let mut body = create_body(&clinic, 10, 0);
    body["start"] = json!("+262142-12-31T23:50:00Z");

    let (status, body) = send(app(&clinic), Method::POST, "/", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidRequest");
}
