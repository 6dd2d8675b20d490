// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::SchedulingError;
use crate::models::{
    Appointment, AppointmentListQuery, CalendarQuery, CancelAppointmentRequest,
    CreateAppointmentRequest, RescheduleAppointmentRequest, SlotsQuery, TimeWindow,
    UpdateNotesRequest, UpdateStatusRequest,
};
use crate::services::SchedulingService;

const DEFAULT_SLOT_LIMIT: usize = 50;

// ==============================================================================
// SCHEDULING HANDLERS
// ==============================================================================

pub async fn create_appointment(
    State(service): State<Arc<SchedulingService>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), SchedulingError> {
    let appointment = service.create(request).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn reschedule_appointment(
    State(service): State<Arc<SchedulingService>>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Appointment>, SchedulingError> {
    Ok(Json(service.reschedule(request).await?))
}

pub async fn update_appointment_status(
    State(service): State<Arc<SchedulingService>>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Appointment>, SchedulingError> {
    Ok(Json(
        service
            .update_status(request.appointment_id, request.new_status)
            .await?,
    ))
}

pub async fn cancel_appointment(
    State(service): State<Arc<SchedulingService>>,
    Path(appointment_id): Path<Uuid>,
    request: Option<Json<CancelAppointmentRequest>>,
) -> Result<Json<Appointment>, SchedulingError> {
    let reason = request.and_then(|Json(body)| body.reason);
    Ok(Json(service.cancel(appointment_id, reason).await?))
}

pub async fn update_appointment_notes(
    State(service): State<Arc<SchedulingService>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateNotesRequest>,
) -> Result<Json<Appointment>, SchedulingError> {
    Ok(Json(service.update_notes(appointment_id, request.notes).await?))
}

// ==============================================================================
// QUERY HANDLERS
// ==============================================================================

pub async fn get_appointment(
    State(service): State<Arc<SchedulingService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, SchedulingError> {
    Ok(Json(service.get(appointment_id).await?))
}

pub async fn list_appointments(
    State(service): State<Arc<SchedulingService>>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Vec<Appointment>>, SchedulingError> {
    Ok(Json(service.list(&query).await?))
}

pub async fn get_calendar(
    State(service): State<Arc<SchedulingService>>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Vec<Appointment>>, SchedulingError> {
    Ok(Json(service.calendar(&query).await?))
}

pub async fn get_available_slots(
    State(service): State<Arc<SchedulingService>>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Vec<TimeWindow>>, SchedulingError> {
    let slots = service
        .open_slots_for_treatment(query.staff_id, query.date, query.treatment_id)
        .await?;

    let limit = query.limit.unwrap_or(DEFAULT_SLOT_LIMIT);
    Ok(Json(slots.iter().take(limit).collect()))
}
