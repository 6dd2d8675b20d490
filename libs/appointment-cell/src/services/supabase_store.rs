// libs/appointment-cell/src/services/supabase_store.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::SupabaseClient;
use shared_models::{Patient, Staff, Treatment};

use crate::error::StoreError;
use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, TimeWindow};
use crate::services::store::SchedulingStore;

const APPOINTMENTS: &str = "/rest/v1/appointments";

/// Row layout of the `appointments` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AppointmentRecord {
    id: Uuid,
    patient_id: Uuid,
    staff_id: Uuid,
    treatment_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration_minutes: i32,
    status: AppointmentStatus,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&Appointment> for AppointmentRecord {
    fn from(a: &Appointment) -> Self {
        Self {
            id: a.id,
            patient_id: a.patient_id,
            staff_id: a.staff_id,
            treatment_id: a.treatment_id,
            start_time: a.start,
            end_time: a.end(),
            duration_minutes: a.duration_minutes,
            status: a.status,
            notes: a.notes.clone(),
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

impl From<AppointmentRecord> for Appointment {
    fn from(r: AppointmentRecord) -> Self {
        Self {
            id: r.id,
            patient_id: r.patient_id,
            staff_id: r.staff_id,
            treatment_id: r.treatment_id,
            start: r.start_time,
            duration_minutes: r.duration_minutes,
            status: r.status,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// PostgREST timestamps; `Z` keeps `+` out of the query string.
fn ts(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub struct SupabaseStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn find_one<T: DeserializeOwned>(&self, table: &str, id: Uuid) -> Result<Option<T>, StoreError> {
        let path = format!("/rest/v1/{}?id=eq.{}&limit=1", table, id);
        let mut rows: Vec<T> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }

    async fn query_appointments(&self, query_parts: Vec<String>) -> Result<Vec<Appointment>, StoreError> {
        let mut query_parts = query_parts;
        query_parts.push("order=start_time.asc".to_string());
        let path = format!("{}?{}", APPOINTMENTS, query_parts.join("&"));

        let rows: Vec<AppointmentRecord> = self.supabase.request(Method::GET, &path, None).await?;
        debug!("Fetched {} appointment rows", rows.len());
        Ok(rows.into_iter().map(Appointment::from).collect())
    }
}

#[async_trait]
impl SchedulingStore for SupabaseStore {
    async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError> {
        self.find_one("patients", id).await
    }

    async fn find_staff(&self, id: Uuid) -> Result<Option<Staff>, StoreError> {
        self.find_one("staff", id).await
    }

    async fn find_treatment(&self, id: Uuid) -> Result<Option<Treatment>, StoreError> {
        self.find_one("treatments", id).await
    }

    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let record: Option<AppointmentRecord> = self.find_one("appointments", id).await?;
        Ok(record.map(Appointment::from))
    }

    async fn appointments_for_staff(
        &self,
        staff_id: Uuid,
        window: TimeWindow,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.query_appointments(vec![
            format!("staff_id=eq.{}", staff_id),
            format!("start_time=lt.{}", ts(window.end)),
            format!("end_time=gt.{}", ts(window.start)),
        ])
        .await
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut query_parts = Vec::new();
        if let Some(staff_id) = filter.staff_id {
            query_parts.push(format!("staff_id=eq.{}", staff_id));
        }
        if let Some(patient_id) = filter.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(status) = filter.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(from) = filter.starts_from {
            query_parts.push(format!("start_time=gte.{}", ts(from)));
        }
        if let Some(before) = filter.starts_before {
            query_parts.push(format!("start_time=lt.{}", ts(before)));
        }
        self.query_appointments(query_parts).await
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        let body = serde_json::to_value(AppointmentRecord::from(appointment))
            .map_err(|e| StoreError::Backend(format!("Failed to encode appointment: {}", e)))?;

        let rows: Vec<AppointmentRecord> = self
            .supabase
            .write_returning(Method::POST, APPOINTMENTS, body)
            .await
            .map_err(|e| {
                warn!("Insert of appointment {} failed: {}", appointment.id, e);
                StoreError::from(e)
            })?;

        rows.into_iter()
            .next()
            .map(Appointment::from)
            .ok_or_else(|| StoreError::Backend("Insert returned no rows".to_string()))
    }

    async fn update_appointment(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS, appointment.id);
        let body = json!({
            "start_time": ts(appointment.start),
            "end_time": ts(appointment.end()),
            "duration_minutes": appointment.duration_minutes,
            "status": appointment.status,
            "notes": appointment.notes,
            "updated_at": ts(appointment.updated_at),
        });

        let rows: Vec<AppointmentRecord> = self
            .supabase
            .write_returning(Method::PATCH, &path, body)
            .await?;

        rows.into_iter()
            .next()
            .map(Appointment::from)
            .ok_or(StoreError::MissingAppointment(appointment.id))
    }
}
