use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::{AppConfig, StoreBackend};
use shared_models::{Patient, Specialization, Staff, StaffRole, Treatment};

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub storage_timeout_ms: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            storage_timeout_ms: 2_000,
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: None,
            storage_timeout_ms: self.storage_timeout_ms,
            store_backend: StoreBackend::Supabase,
            ..AppConfig::local()
        }
    }
}

/// A 2025-02-03 (Monday) instant in UTC; default practice hours apply.
pub fn monday_at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 3, hour, minute, 0).unwrap()
}

pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 2, 3).unwrap()
}

pub fn sunday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 2, 2).unwrap()
}

pub struct ClinicFixtures;

impl ClinicFixtures {
    pub fn patient(first_name: &str, last_name: &str) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone: Some("(555) 123-4567".to_string()),
            email: Some(format!("{}@example.com", first_name.to_lowercase())),
            created_at: Some(Utc::now()),
        }
    }

    pub fn staff(role: StaffRole) -> Staff {
        Staff {
            id: Uuid::new_v4(),
            first_name: "Test".to_string(),
            last_name: role.to_string(),
            email: Some(format!("{}@example.com", role)),
            phone: None,
            role,
            specialization: (role == StaffRole::Dentist).then_some(Specialization::General),
        }
    }

    pub fn treatment(name: &str, category: &str, default_duration_minutes: i32) -> Treatment {
        Treatment {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            default_duration_minutes,
            base_cost: 120.0,
            category: category.to_string(),
        }
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn patient_response(patient: &Patient) -> Value {
        json!({
            "id": patient.id,
            "first_name": patient.first_name,
            "last_name": patient.last_name,
            "phone": patient.phone,
            "email": patient.email,
            "created_at": patient.created_at
        })
    }

    pub fn staff_response(staff: &Staff) -> Value {
        json!({
            "id": staff.id,
            "first_name": staff.first_name,
            "last_name": staff.last_name,
            "email": staff.email,
            "phone": staff.phone,
            "role": staff.role,
            "specialization": staff.specialization
        })
    }

    pub fn treatment_response(treatment: &Treatment) -> Value {
        json!({
            "id": treatment.id,
            "name": treatment.name,
            "description": treatment.description,
            "default_duration_minutes": treatment.default_duration_minutes,
            "base_cost": treatment.base_cost,
            "category": treatment.category
        })
    }

    pub fn appointment_response(
        id: Uuid,
        staff_id: Uuid,
        start: DateTime<Utc>,
        duration_minutes: i64,
        status: &str,
    ) -> Value {
        let end = start + chrono::Duration::minutes(duration_minutes);
        json!({
            "id": id,
            "patient_id": Uuid::new_v4(),
            "staff_id": staff_id,
            "treatment_id": Uuid::new_v4(),
            "start_time": start.to_rfc3339(),
            "end_time": end.to_rfc3339(),
            "duration_minutes": duration_minutes,
            "status": status,
            "notes": null,
            "created_at": start.to_rfc3339(),
            "updated_at": start.to_rfc3339()
        })
    }
}
