// libs/appointment-cell/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::StaffRole;

use crate::models::AppointmentStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Patient,
    Staff,
    Treatment,
    Appointment,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Patient => "patient",
            EntityKind::Staff => "staff member",
            EntityKind::Treatment => "treatment",
            EntityKind::Appointment => "appointment",
        };
        f.write_str(name)
    }
}

/// A scheduling request that was refused by policy. Never retried as-is.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: Uuid },

    #[error("{role} staff cannot perform {category} treatments")]
    RoleMismatch { role: StaffRole, category: String },

    #[error("Requested time is outside the staff member's working hours")]
    OutsideWorkingHours,

    #[error("Requested time conflicts with an existing appointment")]
    SlotConflict { conflicting_appointment_id: Option<Uuid> },

    #[error("Cannot move appointment from {from} to {to}")]
    InvalidTransition { from: AppointmentStatus, to: AppointmentStatus },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl Rejection {
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::NotFound { .. } => "NotFound",
            Rejection::RoleMismatch { .. } => "RoleMismatch",
            Rejection::OutsideWorkingHours => "OutsideWorkingHours",
            Rejection::SlotConflict { .. } => "SlotConflict",
            Rejection::InvalidTransition { .. } => "InvalidTransition",
            Rejection::InvalidRequest(_) => "InvalidRequest",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Rejection::NotFound { .. } => StatusCode::NOT_FOUND,
            Rejection::RoleMismatch { .. } | Rejection::OutsideWorkingHours => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Rejection::SlotConflict { .. } | Rejection::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
            Rejection::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// A timed-out write keeps running; a retry may see its own booking as a conflict.
    #[error("Storage did not answer within {after_ms}ms during {operation}")]
    Timeout { operation: &'static str, after_ms: u64 },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl SchedulingError {
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            SchedulingError::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}

/// Errors raised by an appointment store implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The storage-level overlap backstop fired.
    #[error("Overlapping appointment already stored")]
    Conflict { conflicting_appointment_id: Option<Uuid> },

    #[error("Appointment {0} not found")]
    MissingAppointment(Uuid),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for SchedulingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { conflicting_appointment_id } => {
                SchedulingError::Rejected(Rejection::SlotConflict { conflicting_appointment_id })
            }
            StoreError::MissingAppointment(id) => SchedulingError::Rejected(Rejection::NotFound {
                entity: EntityKind::Appointment,
                id,
            }),
            StoreError::Backend(message) => SchedulingError::Unavailable(message),
        }
    }
}

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(_) => StoreError::Conflict { conflicting_appointment_id: None },
            other => StoreError::Backend(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    conflicting_appointment_id: Option<Uuid>,
}

impl IntoResponse for SchedulingError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            SchedulingError::Rejected(rejection) => {
                let conflicting_appointment_id = match rejection {
                    Rejection::SlotConflict { conflicting_appointment_id } => *conflicting_appointment_id,
                    _ => None,
                };
                (
                    rejection.status_code(),
                    ErrorBody {
                        kind: rejection.kind(),
                        message: rejection.to_string(),
                        conflicting_appointment_id,
                    },
                )
            }
            SchedulingError::Timeout { .. } => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorBody { kind: "Timeout", message: self.to_string(), conflicting_appointment_id: None },
            ),
            SchedulingError::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody { kind: "Unavailable", message: self.to_string(), conflicting_appointment_id: None },
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {}: {}", status, body.message);
        } else {
            tracing::debug!("Rejected: {}: {}", status, body.message);
        }

        (status, Json(body)).into_response()
    }
}
