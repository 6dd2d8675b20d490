// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, info, warn};

use crate::error::Rejection;
use crate::models::AppointmentStatus;

/// Status state machine: `scheduled` moves to exactly one terminal status.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), Rejection> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(Rejection::InvalidTransition {
                from: current_status,
                to: new_status,
            });
        }

        info!("Status transition validated: {} -> {}", current_status, new_status);
        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> &'static [AppointmentStatus] {
        match current_status {
            AppointmentStatus::Scheduled => &[
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed
            | AppointmentStatus::Cancelled
            | AppointmentStatus::NoShow => &[],
        }
    }

    /// Rescheduling keeps the status, so it is only legal while still scheduled.
    pub fn validate_reschedule(&self, current_status: AppointmentStatus) -> Result<(), Rejection> {
        if current_status.is_terminal() {
            warn!("Reschedule attempted on {} appointment", current_status);
            return Err(Rejection::InvalidTransition {
                from: current_status,
                to: AppointmentStatus::Scheduled,
            });
        }
        Ok(())
    }
}
