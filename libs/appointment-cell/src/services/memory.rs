// libs/appointment-cell/src/services/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::{Patient, Staff, Treatment};

use crate::error::StoreError;
use crate::models::{Appointment, AppointmentFilter, TimeWindow};
use crate::services::store::SchedulingStore;

/// Process-local store used for development and tests.
#[derive(Default)]
pub struct InMemoryStore {
    patients: RwLock<HashMap<Uuid, Patient>>,
    staff: RwLock<HashMap<Uuid, Staff>>,
    treatments: RwLock<HashMap<Uuid, Treatment>>,
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_patient(&self, patient: Patient) {
        self.patients.write().await.insert(patient.id, patient);
    }

    pub async fn add_staff(&self, staff: Staff) {
        self.staff.write().await.insert(staff.id, staff);
    }

    pub async fn add_treatment(&self, treatment: Treatment) {
        self.treatments.write().await.insert(treatment.id, treatment);
    }

    pub async fn appointment_count(&self) -> usize {
        self.appointments.read().await.len()
    }
}

fn first_overlap(
    appointments: &HashMap<Uuid, Appointment>,
    candidate: &Appointment,
) -> Option<Uuid> {
    if !candidate.blocks_slot() {
        return None;
    }
    let window = candidate.window();
    appointments
        .values()
        .filter(|existing| existing.id != candidate.id)
        .filter(|existing| existing.staff_id == candidate.staff_id && existing.blocks_slot())
        .filter(|existing| existing.window().overlaps(&window))
        .min_by_key(|existing| existing.start)
        .map(|existing| existing.id)
}

fn sorted(mut appointments: Vec<Appointment>) -> Vec<Appointment> {
    appointments.sort_by_key(|appointment| (appointment.start, appointment.id));
    appointments
}

#[async_trait]
impl SchedulingStore for InMemoryStore {
    async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError> {
        Ok(self.patients.read().await.get(&id).cloned())
    }

    async fn find_staff(&self, id: Uuid) -> Result<Option<Staff>, StoreError> {
        Ok(self.staff.read().await.get(&id).cloned())
    }

    async fn find_treatment(&self, id: Uuid) -> Result<Option<Treatment>, StoreError> {
        Ok(self.treatments.read().await.get(&id).cloned())
    }

    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn appointments_for_staff(
        &self,
        staff_id: Uuid,
        window: TimeWindow,
    ) -> Result<Vec<Appointment>, StoreError> {
        let appointments = self.appointments.read().await;
        Ok(sorted(
            appointments
                .values()
                .filter(|a| a.staff_id == staff_id && a.window().overlaps(&window))
                .cloned()
                .collect(),
        ))
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        let appointments = self.appointments.read().await;
        Ok(sorted(
            appointments.values().filter(|a| filter.matches(a)).cloned().collect(),
        ))
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        let mut appointments = self.appointments.write().await;

        if let Some(conflict) = first_overlap(&appointments, appointment) {
            warn!("Refusing insert of {}: overlaps {}", appointment.id, conflict);
            return Err(StoreError::Conflict { conflicting_appointment_id: Some(conflict) });
        }

        appointments.insert(appointment.id, appointment.clone());
        debug!("Stored appointment {}", appointment.id);
        Ok(appointment.clone())
    }

    async fn update_appointment(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        let mut appointments = self.appointments.write().await;

        if !appointments.contains_key(&appointment.id) {
            return Err(StoreError::MissingAppointment(appointment.id));
        }
        if let Some(conflict) = first_overlap(&appointments, appointment) {
            warn!("Refusing update of {}: overlaps {}", appointment.id, conflict);
            return Err(StoreError::Conflict { conflicting_appointment_id: Some(conflict) });
        }

        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }
}
