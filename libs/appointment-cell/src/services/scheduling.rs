// libs/appointment-cell/src/services/scheduling.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, Utc};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_config::{AppConfig, SchedulingConfig, StoreBackend};
use shared_database::SupabaseClient;

use crate::error::{EntityKind, Rejection, SchedulingError};
use crate::models::{
    Appointment, AppointmentFilter, AppointmentListQuery, AppointmentStatus, CalendarQuery,
    CreateAppointmentRequest, ProposedAppointment, RescheduleAppointmentRequest,
};
use crate::services::availability::{AvailabilityEngine, OpenSlots};
use crate::services::calendar::range_for;
use crate::services::conflict::ConflictChecker;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::memory::InMemoryStore;
use crate::services::store::{BoundedStore, SchedulingStore};
use crate::services::supabase_store::SupabaseStore;

/// One async mutex per staff member; check-then-write for a staff member
/// happens under its lock.
///
/// Entries nobody holds or waits on are swept on every lookup, so ids that
/// never reach a write do not accumulate.
#[derive(Default)]
struct StaffLocks {
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl StaffLocks {
    fn lock_for(&self, staff_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map holds an idle lock; clones live in guards and waiters.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(staff_id).or_default())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

pub struct SchedulingService {
    store: BoundedStore,
    config: Arc<SchedulingConfig>,
    availability: Arc<AvailabilityEngine>,
    checker: ConflictChecker,
    lifecycle: AppointmentLifecycleService,
    locks: StaffLocks,
}

impl SchedulingService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        config: Arc<SchedulingConfig>,
        storage_timeout: Duration,
    ) -> Self {
        let store = BoundedStore::new(store, storage_timeout);
        let availability = Arc::new(AvailabilityEngine::new(store.clone(), Arc::clone(&config)));
        let checker = ConflictChecker::new(
            store.clone(),
            Arc::clone(&config),
            Arc::clone(&availability),
        );

        Self {
            store,
            config,
            availability,
            checker,
            lifecycle: AppointmentLifecycleService::new(),
            locks: StaffLocks::default(),
        }
    }

    /// Build the service on the backend selected in `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        let store: Arc<dyn SchedulingStore> = match config.store_backend {
            StoreBackend::Supabase => {
                info!("Using Supabase appointment store at {}", config.supabase_url);
                Arc::new(SupabaseStore::new(Arc::new(SupabaseClient::new(config))))
            }
            StoreBackend::Memory => {
                info!("Using in-memory appointment store");
                Arc::new(InMemoryStore::new())
            }
        };

        Self::new(store, Arc::new(config.scheduling.clone()), config.storage_timeout())
    }

    /// Same service with a different bound on each storage call.
    pub fn with_storage_timeout(self, storage_timeout: Duration) -> Self {
        let store = BoundedStore::new(self.store.inner(), storage_timeout);
        let availability = Arc::new(AvailabilityEngine::new(store.clone(), Arc::clone(&self.config)));
        let checker = ConflictChecker::new(
            store.clone(),
            Arc::clone(&self.config),
            Arc::clone(&availability),
        );
        Self { store, availability, checker, ..self }
    }

    async fn lock_staff(&self, staff_id: Uuid) -> Result<OwnedMutexGuard<()>, SchedulingError> {
        let lock = self.locks.lock_for(staff_id);
        tokio::time::timeout(self.store.timeout(), lock.lock_owned())
            .await
            .map_err(|_| {
                warn!("Timed out waiting for scheduling lock of staff {}", staff_id);
                SchedulingError::Timeout {
                    operation: "acquire_staff_lock",
                    after_ms: self.store.timeout().as_millis() as u64,
                }
            })
    }

    async fn existing(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        self.store.appointment(appointment_id).await?.ok_or_else(|| {
            Rejection::NotFound {
                entity: EntityKind::Appointment,
                id: appointment_id,
            }
            .into()
        })
    }

    /// Fetch an appointment, take its staff lock, then re-read it under the lock.
    async fn locked_existing(
        &self,
        appointment_id: Uuid,
    ) -> Result<(Appointment, OwnedMutexGuard<()>), SchedulingError> {
        let staff_id = self.existing(appointment_id).await?.staff_id;
        let guard = self.lock_staff(staff_id).await?;
        let current = self.existing(appointment_id).await?;
        Ok((current, guard))
    }

    #[instrument(skip(self, request), fields(staff_id = %request.staff_id, start = %request.start))]
    pub async fn create(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let proposed = ProposedAppointment::from(&request);
        let guard = self.lock_staff(request.staff_id).await?;

        let validated = self.checker.validate(&proposed, None).await?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            staff_id: validated.staff.id,
            treatment_id: validated.treatment.id,
            start: validated.window.start,
            duration_minutes: validated.duration_minutes,
            status: AppointmentStatus::Scheduled,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };

        let saved = self.store.insert_appointment(appointment, guard).await?;
        info!(
            "Appointment {} booked for staff {} at {} ({} min)",
            saved.id, saved.staff_id, saved.start, saved.duration_minutes
        );
        Ok(saved)
    }

    #[instrument(skip(self, request), fields(appointment_id = %request.appointment_id))]
    pub async fn reschedule(
        &self,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let (current, guard) = self.locked_existing(request.appointment_id).await?;
        self.lifecycle.validate_reschedule(current.status)?;

        let proposed = ProposedAppointment {
            patient_id: current.patient_id,
            staff_id: current.staff_id,
            treatment_id: current.treatment_id,
            start: request.new_start,
            duration_minutes: Some(request.new_duration_minutes.unwrap_or(current.duration_minutes)),
        };
        let validated = self.checker.validate(&proposed, Some(current.id)).await?;

        let updated = Appointment {
            start: validated.window.start,
            duration_minutes: validated.duration_minutes,
            updated_at: Utc::now(),
            ..current
        };

        let saved = self.store.update_appointment(updated, guard).await?;
        info!("Appointment {} rescheduled to {}", saved.id, saved.start);
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, SchedulingError> {
        self.transition(appointment_id, new_status, None).await
    }

    /// Cancel a scheduled appointment, appending the reason to its notes.
    #[instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        reason: Option<String>,
    ) -> Result<Appointment, SchedulingError> {
        self.transition(appointment_id, AppointmentStatus::Cancelled, reason).await
    }

    async fn transition(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        cancellation_reason: Option<String>,
    ) -> Result<Appointment, SchedulingError> {
        let (current, guard) = self.locked_existing(appointment_id).await?;
        self.lifecycle.validate_status_transition(current.status, new_status)?;

        let notes = match cancellation_reason.filter(|r| !r.trim().is_empty()) {
            Some(reason) => {
                let line = format!("Cancelled: {}", reason.trim());
                Some(append_note(current.notes.as_deref(), &line))
            }
            None => current.notes.clone(),
        };

        let updated = Appointment {
            status: new_status,
            notes,
            updated_at: Utc::now(),
            ..current
        };

        let saved = self.store.update_appointment(updated, guard).await?;
        info!("Appointment {} is now {}", saved.id, saved.status);
        Ok(saved)
    }

    /// Notes stay editable in every status.
    #[instrument(skip(self, notes))]
    pub async fn update_notes(
        &self,
        appointment_id: Uuid,
        notes: Option<String>,
    ) -> Result<Appointment, SchedulingError> {
        let (current, guard) = self.locked_existing(appointment_id).await?;
        let updated = Appointment {
            notes,
            updated_at: Utc::now(),
            ..current
        };
        self.store.update_appointment(updated, guard).await
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        self.existing(appointment_id).await
    }

    pub async fn list(
        &self,
        query: &AppointmentListQuery,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let filter = AppointmentFilter {
            staff_id: query.staff_id,
            patient_id: query.patient_id,
            status: query.status,
            ..AppointmentFilter::default()
        };

        let appointments = self.store.list_appointments(&filter).await?;
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase);

        Ok(match search {
            Some(term) => appointments
                .into_iter()
                .filter(|a| {
                    a.notes
                        .as_deref()
                        .map_or(false, |notes| notes.to_lowercase().contains(&term))
                })
                .collect(),
            None => appointments,
        })
    }

    /// Appointments starting inside a day, week or month view.
    pub async fn calendar(&self, query: &CalendarQuery) -> Result<Vec<Appointment>, SchedulingError> {
        let range = range_for(query.view, query.date)?;
        let offset = chrono::Duration::seconds(self.config.offset().local_minus_utc() as i64);
        let local_midnight = |date: NaiveDate| {
            date.and_time(NaiveTime::MIN)
                .checked_sub_signed(offset)
                .map(|naive| naive.and_utc())
                .ok_or_else(|| {
                    Rejection::InvalidRequest(format!("date {} is out of range", date))
                })
        };

        let filter = AppointmentFilter {
            staff_id: query.staff_id,
            starts_from: Some(local_midnight(range.first)?),
            starts_before: Some(local_midnight(range.end)?),
            ..AppointmentFilter::default()
        };
        debug!("Calendar {:?} for {} covers {:?}", query.view, query.date, range);
        self.store.list_appointments(&filter).await
    }

    /// Open windows of at least `duration_minutes` for a staff member on `date`.
    pub async fn compute_open_slots(
        &self,
        staff_id: Uuid,
        date: NaiveDate,
        duration_minutes: i64,
    ) -> Result<OpenSlots, SchedulingError> {
        self.availability.compute_open_slots(staff_id, date, duration_minutes).await
    }

    /// Open windows sized by a treatment's default duration.
    #[instrument(skip(self))]
    pub async fn open_slots_for_treatment(
        &self,
        staff_id: Uuid,
        date: NaiveDate,
        treatment_id: Uuid,
    ) -> Result<OpenSlots, SchedulingError> {
        let (staff, treatment) = futures::try_join!(
            self.store.staff(staff_id),
            self.store.treatment(treatment_id),
        )?;
        if staff.is_none() {
            return Err(Rejection::NotFound { entity: EntityKind::Staff, id: staff_id }.into());
        }
        let treatment = treatment.ok_or(Rejection::NotFound {
            entity: EntityKind::Treatment,
            id: treatment_id,
        })?;

        self.compute_open_slots(staff_id, date, treatment.default_duration_minutes as i64)
            .await
    }
}

fn append_note(existing: Option<&str>, line: &str) -> String {
    match existing.map(str::trim).filter(|notes| !notes.is_empty()) {
        Some(notes) => format!("{}\n{}", notes, line),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn request(staff_id: Uuid) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            patient_id: Uuid::new_v4(),
            staff_id,
            treatment_id: Uuid::new_v4(),
            start: Utc.with_ymd_and_hms(2025, 2, 3, 10, 0, 0).unwrap(),
            duration_minutes: Some(30),
            notes: None,
        }
    }

    #[tokio::test]
    async fn unknown_staff_ids_do_not_accumulate_locks() {
        let service = SchedulingService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(SchedulingConfig::default()),
            Duration::from_secs(1),
        );

        for _ in 0..200 {
            assert_matches!(
                service.create(request(Uuid::new_v4())).await,
                Err(SchedulingError::Rejected(Rejection::NotFound { .. }))
            );
        }

        assert!(service.locks.len() <= 1, "{} locks retained", service.locks.len());
    }

    #[tokio::test]
    async fn held_lock_survives_sweep() {
        let locks = StaffLocks::default();
        let staff_id = Uuid::new_v4();
        let guard = locks.lock_for(staff_id).lock_owned().await;

        locks.lock_for(Uuid::new_v4());
        assert!(locks.lock_for(staff_id).try_lock().is_err());

        drop(guard);
        locks.lock_for(Uuid::new_v4());
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn append_note_keeps_existing_text() {
        assert_eq!(append_note(None, "Cancelled: sick"), "Cancelled: sick");
        assert_eq!(append_note(Some("  "), "Cancelled: sick"), "Cancelled: sick");
        assert_eq!(
            append_note(Some("bring x-rays"), "Cancelled: sick"),
            "bring x-rays\nCancelled: sick"
        );
    }
}
