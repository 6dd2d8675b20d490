use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::{appointment_routes, SchedulingService};
use shared_models::AppError;

pub fn create_router(service: Arc<SchedulingService>) -> Router {
    Router::new()
        .route("/", get(|| async { "Dental scheduling API is running!" }))
        .nest("/appointments", appointment_routes(service))
        .fallback(|| async { AppError::NotFound("No such route".to_string()) })
}
