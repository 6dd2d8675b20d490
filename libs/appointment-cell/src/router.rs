// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::handlers;
use crate::services::SchedulingService;

pub fn appointment_routes(service: Arc<SchedulingService>) -> Router {
    Router::new()
        // Scheduling commands
        .route("/", post(handlers::create_appointment).get(handlers::list_appointments))
        .route("/reschedule", post(handlers::reschedule_appointment))
        .route("/status", post(handlers::update_appointment_status))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/notes", patch(handlers::update_appointment_notes))

        // Availability and calendar views
        .route("/slots", get(handlers::get_available_slots))
        .route("/calendar", get(handlers::get_calendar))
        .route("/{appointment_id}", get(handlers::get_appointment))

        .with_state(service)
}
