// libs/appointment-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::SchedulingConfig;
use shared_models::{Staff, Treatment};

use crate::error::{EntityKind, Rejection, SchedulingError};
use crate::models::{Appointment, ProposedAppointment, TimeWindow};
use crate::services::availability::AvailabilityEngine;
use crate::services::store::BoundedStore;

/// A proposal that passed every check, with its references resolved.
#[derive(Debug, Clone)]
pub struct ValidatedAppointment {
    pub staff: Staff,
    pub treatment: Treatment,
    pub window: TimeWindow,
    pub duration_minutes: i32,
}

pub struct ConflictChecker {
    store: BoundedStore,
    config: Arc<SchedulingConfig>,
    availability: Arc<AvailabilityEngine>,
}

impl ConflictChecker {
    pub fn new(
        store: BoundedStore,
        config: Arc<SchedulingConfig>,
        availability: Arc<AvailabilityEngine>,
    ) -> Self {
        Self { store, config, availability }
    }

    /// Run the checks in order, stopping at the first failure:
    /// references exist, role fits the treatment category, the interval is
    /// inside working hours, and no blocking appointment overlaps it.
    ///
    /// `exclude` drops one appointment from the overlap scan (rescheduling).
    pub async fn validate(
        &self,
        proposed: &ProposedAppointment,
        exclude: Option<Uuid>,
    ) -> Result<ValidatedAppointment, SchedulingError> {
        debug!(
            "Validating proposal for staff {} at {}",
            proposed.staff_id, proposed.start
        );

        if let Some(minutes) = proposed.duration_minutes {
            check_duration(minutes)?;
        }

        let (patient, staff, treatment) = futures::try_join!(
            self.store.patient(proposed.patient_id),
            self.store.staff(proposed.staff_id),
            self.store.treatment(proposed.treatment_id),
        )?;

        if patient.is_none() {
            return Err(not_found(EntityKind::Patient, proposed.patient_id));
        }
        let staff = staff.ok_or_else(|| not_found(EntityKind::Staff, proposed.staff_id))?;
        let treatment =
            treatment.ok_or_else(|| not_found(EntityKind::Treatment, proposed.treatment_id))?;

        let duration_minutes = proposed
            .duration_minutes
            .unwrap_or(treatment.default_duration_minutes);
        check_duration(duration_minutes)?;

        if !self.config.can_perform(staff.role.as_str(), &treatment.category) {
            warn!(
                "Staff {} ({}) cannot perform {} treatments",
                staff.id, staff.role, treatment.category
            );
            return Err(Rejection::RoleMismatch {
                role: staff.role,
                category: treatment.category.clone(),
            }
            .into());
        }

        let end = proposed
            .start
            .checked_add_signed(Duration::minutes(duration_minutes as i64))
            .ok_or_else(|| {
                SchedulingError::from(Rejection::InvalidRequest(format!(
                    "start {} plus {} minutes is out of range",
                    proposed.start, duration_minutes
                )))
            })?;
        let window = TimeWindow::new(proposed.start, end);

        if !self.availability.within_working_hours(staff.id, &window) {
            warn!("Proposal {:?} outside working hours of staff {}", window, staff.id);
            return Err(Rejection::OutsideWorkingHours.into());
        }

        let existing = self.store.appointments_for_staff(staff.id, window).await?;
        if let Some(conflict) = find_conflict(&existing, &window, exclude) {
            warn!("Conflict detected for staff {} with appointment {}", staff.id, conflict.id);
            return Err(Rejection::SlotConflict {
                conflicting_appointment_id: Some(conflict.id),
            }
            .into());
        }

        Ok(ValidatedAppointment {
            staff,
            treatment,
            window,
            duration_minutes,
        })
    }
}

/// Earliest blocking appointment overlapping `window`, ignoring `exclude`.
pub fn find_conflict<'a>(
    existing: &'a [Appointment],
    window: &TimeWindow,
    exclude: Option<Uuid>,
) -> Option<&'a Appointment> {
    existing
        .iter()
        .filter(|appointment| Some(appointment.id) != exclude)
        .filter(|appointment| appointment.blocks_slot())
        .filter(|appointment| appointment.window().overlaps(window))
        .min_by_key(|appointment| appointment.start)
}

fn check_duration(minutes: i32) -> Result<(), SchedulingError> {
    if minutes <= 0 {
        return Err(Rejection::InvalidRequest(format!(
            "duration must be positive, got {} minutes",
            minutes
        ))
        .into());
    }
    Ok(())
}

fn not_found(entity: EntityKind, id: Uuid) -> SchedulingError {
    warn!("Referenced {} {} does not exist", entity, id);
    Rejection::NotFound { entity, id }.into()
}
