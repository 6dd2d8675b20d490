// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub staff_id: Uuid,
    pub treatment_id: Uuid,
    pub start: DateTime<Utc>,
    /// Snapshot taken at booking time; later treatment edits do not change it.
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(self.duration_minutes as i64)
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end())
    }

    /// Whether this appointment occupies its interval on the staff calendar.
    pub fn blocks_slot(&self) -> bool {
        self.status.blocks_slot()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no-show",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Scheduled)
    }

    pub fn blocks_slot(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Completed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }

    /// Back-to-back windows touching at a boundary do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &TimeWindow) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub staff_id: Uuid,
    pub treatment_id: Uuid,
    pub start: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleAppointmentRequest {
    pub appointment_id: Uuid,
    pub new_start: DateTime<Utc>,
    pub new_duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub appointment_id: Uuid,
    pub new_status: AppointmentStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotesRequest {
    pub notes: Option<String>,
}

/// An interval someone wants to book, before validation.
#[derive(Debug, Clone)]
pub struct ProposedAppointment {
    pub patient_id: Uuid,
    pub staff_id: Uuid,
    pub treatment_id: Uuid,
    pub start: DateTime<Utc>,
    /// Falls back to the treatment's default duration when absent.
    pub duration_minutes: Option<i32>,
}

impl From<&CreateAppointmentRequest> for ProposedAppointment {
    fn from(request: &CreateAppointmentRequest) -> Self {
        Self {
            patient_id: request.patient_id,
            staff_id: request.staff_id,
            treatment_id: request.treatment_id,
            start: request.start,
            duration_minutes: request.duration_minutes,
        }
    }
}

// ==============================================================================
// QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsQuery {
    pub staff_id: Uuid,
    pub date: NaiveDate,
    pub treatment_id: Uuid,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListQuery {
    pub staff_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarView {
    Day,
    Week,
    Month,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarQuery {
    pub view: CalendarView,
    pub date: NaiveDate,
    pub staff_id: Option<Uuid>,
}

/// Storage-level filter; every set field must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    pub staff_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    /// Appointments starting at or after this instant.
    pub starts_from: Option<DateTime<Utc>>,
    /// Appointments starting strictly before this instant.
    pub starts_before: Option<DateTime<Utc>>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.staff_id.map_or(true, |id| appointment.staff_id == id)
            && self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && self.status.map_or(true, |status| appointment.status == status)
            && self.starts_from.map_or(true, |from| appointment.start >= from)
            && self.starts_before.map_or(true, |before| appointment.start < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 3, h, m, 0).unwrap()
    }

    #[test]
    fn touching_windows_do_not_overlap() {
        let first = TimeWindow::new(at(10, 0), at(10, 30));
        let second = TimeWindow::new(at(10, 30), at(11, 0));
        assert!(!first.overlaps(&second));
        assert!(!second.overlaps(&first));
    }

    #[test]
    fn partial_and_nested_windows_overlap() {
        let base = TimeWindow::new(at(10, 0), at(10, 30));
        assert!(base.overlaps(&TimeWindow::new(at(10, 15), at(10, 45))));
        assert!(base.overlaps(&TimeWindow::new(at(9, 0), at(12, 0))));
        assert!(base.overlaps(&base));
    }

    #[test]
    fn status_serializes_with_hyphen() {
        assert_eq!(serde_json::to_string(&AppointmentStatus::NoShow).unwrap(), "\"no-show\"");
        let parsed: AppointmentStatus = serde_json::from_str("\"scheduled\"").unwrap();
        assert_eq!(parsed, AppointmentStatus::Scheduled);
    }

    #[test]
    fn only_scheduled_and_completed_block() {
        assert!(AppointmentStatus::Scheduled.blocks_slot());
        assert!(AppointmentStatus::Completed.blocks_slot());
        assert!(!AppointmentStatus::Cancelled.blocks_slot());
        assert!(!AppointmentStatus::NoShow.blocks_slot());
    }

    #[test]
    fn create_request_uses_camel_case() {
        let raw = serde_json::json!({
            "patientId": Uuid::new_v4(),
            "staffId": Uuid::new_v4(),
            "treatmentId": Uuid::new_v4(),
            "start": "2025-02-03T10:00:00+01:00"
        });

        let request: CreateAppointmentRequest = serde_json::from_value(raw).unwrap();
        assert_eq!(request.start, at(9, 0));
        assert!(request.duration_minutes.is_none());
    }
}
