// libs/appointment-cell/src/services/store.rs
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error};
use uuid::Uuid;

use shared_models::{Patient, Staff, Treatment};

use crate::error::{SchedulingError, StoreError};
use crate::models::{Appointment, AppointmentFilter, TimeWindow};

/// Persistent records the scheduling service reads and writes.
///
/// Implementations must refuse to store a blocking appointment that overlaps
/// another blocking appointment of the same staff member, returning
/// [`StoreError::Conflict`]. The service checks first; this is the backstop
/// for writers that bypass its locks.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError>;

    async fn find_staff(&self, id: Uuid) -> Result<Option<Staff>, StoreError>;

    async fn find_treatment(&self, id: Uuid) -> Result<Option<Treatment>, StoreError>;

    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;

    /// Appointments of any status whose interval intersects `window`, earliest first.
    async fn appointments_for_staff(
        &self,
        staff_id: Uuid,
        window: TimeWindow,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<Appointment, StoreError>;

    async fn update_appointment(&self, appointment: &Appointment) -> Result<Appointment, StoreError>;
}

/// Store handle that bounds every call by the caller-supplied timeout.
#[derive(Clone)]
pub struct BoundedStore {
    inner: Arc<dyn SchedulingStore>,
    timeout: Duration,
}

impl BoundedStore {
    pub fn new(inner: Arc<dyn SchedulingStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn inner(&self) -> Arc<dyn SchedulingStore> {
        Arc::clone(&self.inner)
    }

    fn timed_out(&self, operation: &'static str) -> SchedulingError {
        error!("Storage call {} exceeded {:?}", operation, self.timeout);
        SchedulingError::Timeout {
            operation,
            after_ms: self.timeout.as_millis() as u64,
        }
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, SchedulingError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        debug!("Storage call {}", operation);
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(SchedulingError::from),
            Err(_) => Err(self.timed_out(operation)),
        }
    }

    pub async fn patient(&self, id: Uuid) -> Result<Option<Patient>, SchedulingError> {
        self.bounded("find_patient", self.inner.find_patient(id)).await
    }

    pub async fn staff(&self, id: Uuid) -> Result<Option<Staff>, SchedulingError> {
        self.bounded("find_staff", self.inner.find_staff(id)).await
    }

    pub async fn treatment(&self, id: Uuid) -> Result<Option<Treatment>, SchedulingError> {
        self.bounded("find_treatment", self.inner.find_treatment(id)).await
    }

    pub async fn appointment(&self, id: Uuid) -> Result<Option<Appointment>, SchedulingError> {
        self.bounded("find_appointment", self.inner.find_appointment(id)).await
    }

    pub async fn appointments_for_staff(
        &self,
        staff_id: Uuid,
        window: TimeWindow,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        self.bounded(
            "appointments_for_staff",
            self.inner.appointments_for_staff(staff_id, window),
        )
        .await
    }

    pub async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        self.bounded("list_appointments", self.inner.list_appointments(filter)).await
    }

    /// Insert on a detached task holding the staff lock. A timed-out write is
    /// not cancelled: it runs to completion and releases the lock when done.
    pub async fn insert_appointment(
        &self,
        appointment: Appointment,
        staff_guard: OwnedMutexGuard<()>,
    ) -> Result<Appointment, SchedulingError> {
        let store = Arc::clone(&self.inner);
        self.detached_write("insert_appointment", async move {
            let result = store.insert_appointment(&appointment).await;
            drop(staff_guard);
            result
        })
        .await
    }

    pub async fn update_appointment(
        &self,
        appointment: Appointment,
        staff_guard: OwnedMutexGuard<()>,
    ) -> Result<Appointment, SchedulingError> {
        let store = Arc::clone(&self.inner);
        self.detached_write("update_appointment", async move {
            let result = store.update_appointment(&appointment).await;
            drop(staff_guard);
            result
        })
        .await
    }

    async fn detached_write<F>(
        &self,
        operation: &'static str,
        write: F,
    ) -> Result<Appointment, SchedulingError>
    where
        F: Future<Output = Result<Appointment, StoreError>> + Send + 'static,
    {
        let handle = tokio::spawn(write);
        match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(result)) => result.map_err(SchedulingError::from),
            Ok(Err(join_error)) => {
                error!("Storage write {} panicked: {}", operation, join_error);
                Err(SchedulingError::Unavailable(format!("{} failed: {}", operation, join_error)))
            }
            Err(_) => Err(self.timed_out(operation)),
        }
    }
}
