// Shared setup for appointment-cell integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentFilter, CreateAppointmentRequest, TimeWindow,
};
use appointment_cell::services::{InMemoryStore, SchedulingService, SchedulingStore};
use appointment_cell::StoreError;
use shared_config::SchedulingConfig;
use shared_models::{Patient, Staff, StaffRole, Treatment};
use shared_utils::test_utils::ClinicFixtures;

pub struct Clinic {
    pub service: Arc<SchedulingService>,
    pub store: Arc<InMemoryStore>,
    pub patient: Patient,
    pub dentist: Staff,
    pub hygienist: Staff,
    pub receptionist: Staff,
    pub checkup: Treatment,
    pub cleaning: Treatment,
}

impl Clinic {
    pub async fn new() -> Self {
        Self::with_config(SchedulingConfig::default()).await
    }

    pub async fn with_config(config: SchedulingConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());

        let patient = ClinicFixtures::patient("Maria", "Garcia");
        let dentist = ClinicFixtures::staff(StaffRole::Dentist);
        let hygienist = ClinicFixtures::staff(StaffRole::Hygienist);
        let receptionist = ClinicFixtures::staff(StaffRole::Receptionist);
        let checkup = ClinicFixtures::treatment("Checkup", "general", 30);
        let cleaning = ClinicFixtures::treatment("Cleaning", "cleaning", 45);

        store.add_patient(patient.clone()).await;
        for member in [&dentist, &hygienist, &receptionist] {
            store.add_staff(member.clone()).await;
        }
        store.add_treatment(checkup.clone()).await;
        store.add_treatment(cleaning.clone()).await;

        let service = SchedulingService::new(
            store.clone(),
            Arc::new(config),
            Duration::from_secs(2),
        );

        Self {
            service: Arc::new(service),
            store,
            patient,
            dentist,
            hygienist,
            receptionist,
            checkup,
            cleaning,
        }
    }

    pub fn request(&self, start: DateTime<Utc>, duration_minutes: Option<i32>) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            patient_id: self.patient.id,
            staff_id: self.dentist.id,
            treatment_id: self.checkup.id,
            start,
            duration_minutes,
            notes: None,
        }
    }

    pub async fn book(&self, start: DateTime<Utc>, duration_minutes: i32) -> Appointment {
        self.service
            .create(self.request(start, Some(duration_minutes)))
            .await
            .expect("booking should succeed")
    }
}

/// Store whose writes stall for `write_delay` before reaching the inner store.
pub struct SlowWriteStore {
    pub inner: Arc<InMemoryStore>,
    pub write_delay: Duration,
}

#[async_trait]
impl SchedulingStore for SlowWriteStore {
    async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError> {
        self.inner.find_patient(id).await
    }

    async fn find_staff(&self, id: Uuid) -> Result<Option<Staff>, StoreError> {
        self.inner.find_staff(id).await
    }

    async fn find_treatment(&self, id: Uuid) -> Result<Option<Treatment>, StoreError> {
        self.inner.find_treatment(id).await
    }

    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        self.inner.find_appointment(id).await
    }

    async fn appointments_for_staff(
        &self,
        staff_id: Uuid,
        window: TimeWindow,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.inner.appointments_for_staff(staff_id, window).await
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.inner.list_appointments(filter).await
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        tokio::time::sleep(self.write_delay).await;
        self.inner.insert_appointment(appointment).await
    }

    async fn update_appointment(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        tokio::time::sleep(self.write_delay).await;
        self.inner.update_appointment(appointment).await
    }
}

/// Store that is down.
pub struct UnavailableStore;

#[async_trait]
impl SchedulingStore for UnavailableStore {
    async fn find_patient(&self, _id: Uuid) -> Result<Option<Patient>, StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn find_staff(&self, _id: Uuid) -> Result<Option<Staff>, StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn find_treatment(&self, _id: Uuid) -> Result<Option<Treatment>, StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn find_appointment(&self, _id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn appointments_for_staff(
        &self,
        _staff_id: Uuid,
        _window: TimeWindow,
    ) -> Result<Vec<Appointment>, StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn list_appointments(
        &self,
        _filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn insert_appointment(&self, _appointment: &Appointment) -> Result<Appointment, StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn update_appointment(&self, _appointment: &Appointment) -> Result<Appointment, StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }
}
