// libs/shared/models/src/clinic.rs
//
// Reference data owned by the patient, staff and treatment services.
// Scheduling only ever looks these up by id.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Dentist,
    Assistant,
    Hygienist,
    Receptionist,
    Admin,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Dentist => "dentist",
            StaffRole::Assistant => "assistant",
            StaffRole::Hygienist => "hygienist",
            StaffRole::Receptionist => "receptionist",
            StaffRole::Admin => "admin",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialization {
    General,
    Cosmetic,
    Orthodontics,
    Pediatric,
    Periodontics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: StaffRole,
    pub specialization: Option<Specialization>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treatment {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub default_duration_minutes: i32,
    pub base_cost: f64,
    pub category: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn staff_row_deserializes_from_table_shape() {
        let row = json!({
            "id": "6a2f41a3-c54c-fce8-32d2-0324e1c32e22",
            "first_name": "Ana",
            "last_name": "Lopez",
            "email": "ana@example.com",
            "phone": null,
            "role": "hygienist",
            "specialization": null
        });

        let staff: Staff = serde_json::from_value(row).unwrap();
        assert_eq!(staff.role, StaffRole::Hygienist);
        assert_eq!(staff.last_name, "Lopez");
        assert_eq!(staff.role.to_string(), "hygienist");
    }

    #[test]
    fn unknown_role_is_rejected() {
        let row = json!({
            "id": Uuid::new_v4(),
            "first_name": "X",
            "last_name": "Y",
            "email": null,
            "phone": null,
            "role": "janitor",
            "specialization": null
        });

        assert!(serde_json::from_value::<Staff>(row).is_err());
    }
}
