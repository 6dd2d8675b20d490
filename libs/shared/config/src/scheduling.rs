// libs/shared/config/src/scheduling.rs
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, NaiveTime, Offset, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Category wildcard in `role_capabilities`.
pub const ANY_CATEGORY: &str = "*";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse scheduling config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid working hours for {weekday}: {reason}")]
    InvalidHours { weekday: Weekday, reason: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// One weekday row of a working-hours table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingHours {
    pub weekday: Weekday,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
    pub is_open: bool,
}

impl WorkingHours {
    pub fn open(weekday: Weekday, start: NaiveTime, end: NaiveTime) -> Self {
        Self { weekday, start, end, is_open: true }
    }

    pub fn closed(weekday: Weekday) -> Self {
        Self {
            weekday,
            start: NaiveTime::MIN,
            end: NaiveTime::MIN,
            is_open: false,
        }
    }
}

/// Working hours and clinical policy for the practice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Offset of practice local time from UTC.
    #[serde(default)]
    pub utc_offset_minutes: i32,

    #[serde(default = "default_practice_hours")]
    pub practice_hours: Vec<WorkingHours>,

    /// Per-staff overrides; weekdays missing here fall back to `practice_hours`.
    #[serde(default)]
    pub staff_hours: HashMap<Uuid, Vec<WorkingHours>>,

    /// Staff role -> treatment categories that role may perform.
    #[serde(default = "default_role_capabilities")]
    pub role_capabilities: HashMap<String, Vec<String>>,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            practice_hours: default_practice_hours(),
            staff_hours: HashMap::new(),
            role_capabilities: default_role_capabilities(),
        }
    }
}

impl SchedulingConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        debug!(
            "Scheduling config loaded: {} practice rows, {} staff overrides",
            config.practice_hours.len(),
            config.staff_hours.len()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).is_none() {
            return Err(ConfigError::InvalidValue {
                key: "utc_offset_minutes",
                value: self.utc_offset_minutes.to_string(),
            });
        }

        validate_table(&self.practice_hours)?;
        for table in self.staff_hours.values() {
            validate_table(table)?;
        }
        Ok(())
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }

    /// Resolve the working-hours row for a staff member on a weekday.
    pub fn working_hours(&self, staff_id: Uuid, weekday: Weekday) -> Option<&WorkingHours> {
        self.staff_hours
            .get(&staff_id)
            .and_then(|rows| rows.iter().find(|row| row.weekday == weekday))
            .or_else(|| self.practice_hours.iter().find(|row| row.weekday == weekday))
    }

    pub fn can_perform(&self, role: &str, category: &str) -> bool {
        let role = role.trim().to_ascii_lowercase();
        let category = category.trim().to_ascii_lowercase();

        self.role_capabilities
            .iter()
            .find(|(configured, _)| configured.trim().eq_ignore_ascii_case(&role))
            .map(|(_, categories)| {
                categories.iter().any(|c| {
                    let c = c.trim();
                    c == ANY_CATEGORY || c.eq_ignore_ascii_case(&category)
                })
            })
            .unwrap_or(false)
    }
}

fn validate_table(rows: &[WorkingHours]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for row in rows {
        if !seen.insert(row.weekday) {
            return Err(ConfigError::InvalidHours {
                weekday: row.weekday,
                reason: "weekday listed more than once".to_string(),
            });
        }
        if row.is_open && row.start >= row.end {
            return Err(ConfigError::InvalidHours {
                weekday: row.weekday,
                reason: format!("start {} is not before end {}", row.start, row.end),
            });
        }
    }
    Ok(())
}

fn default_practice_hours() -> Vec<WorkingHours> {
    let open = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN);
    let close = NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN);

    [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
    ]
    .into_iter()
    .map(|day| WorkingHours::open(day, open, close))
    .chain(std::iter::once(WorkingHours::closed(Weekday::Sun)))
    .collect()
}

fn default_role_capabilities() -> HashMap<String, Vec<String>> {
    HashMap::from([
        ("dentist".to_string(), vec![ANY_CATEGORY.to_string()]),
        (
            "hygienist".to_string(),
            vec!["hygiene".to_string(), "preventive".to_string(), "cleaning".to_string()],
        ),
    ])
}

/// `HH:MM` times, `HH:MM:SS` also accepted on input.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format("%H:%M"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn defaults_match_practice_settings() {
        let config = SchedulingConfig::default();
        let staff = Uuid::new_v4();

        let monday = config.working_hours(staff, Weekday::Mon).unwrap();
        assert!(monday.is_open);
        assert_eq!(monday.start, hm(9, 0));
        assert_eq!(monday.end, hm(17, 0));

        let sunday = config.working_hours(staff, Weekday::Sun).unwrap();
        assert!(!sunday.is_open);
    }

    #[test]
    fn staff_override_wins_for_its_weekday_only() {
        let staff = Uuid::new_v4();
        let mut config = SchedulingConfig::default();
        config.staff_hours.insert(
            staff,
            vec![WorkingHours::open(Weekday::Tue, hm(12, 0), hm(20, 0))],
        );

        assert_eq!(config.working_hours(staff, Weekday::Tue).unwrap().start, hm(12, 0));
        assert_eq!(config.working_hours(staff, Weekday::Wed).unwrap().start, hm(9, 0));
        assert_eq!(
            config.working_hours(Uuid::new_v4(), Weekday::Tue).unwrap().start,
            hm(9, 0)
        );
    }

    #[test]
    fn role_capabilities_are_case_insensitive_with_wildcard() {
        let config = SchedulingConfig::default();
        assert!(config.can_perform("Dentist", "orthodontics"));
        assert!(config.can_perform("hygienist", "Cleaning"));
        assert!(!config.can_perform("hygienist", "surgery"));
        assert!(!config.can_perform("receptionist", "cleaning"));
    }

    #[test]
    fn parses_json_rows_with_short_times() {
        let raw = r#"{
            "utc_offset_minutes": 60,
            "practice_hours": [
                {"weekday": "Monday", "start": "08:30", "end": "16:00", "isOpen": true},
                {"weekday": "Sunday", "start": "00:00", "end": "00:00", "isOpen": false}
            ],
            "role_capabilities": {"dentist": ["*"]}
        }"#;

        let config = SchedulingConfig::from_json_str(raw).unwrap();
        assert_eq!(config.offset().local_minus_utc(), 3600);
        assert_eq!(
            config.working_hours(Uuid::new_v4(), Weekday::Mon).unwrap().start,
            hm(8, 30)
        );
        assert!(config.working_hours(Uuid::new_v4(), Weekday::Tue).is_none());
    }

    #[test]
    fn rejects_inverted_hours() {
        let raw = r#"{"practice_hours": [
            {"weekday": "Friday", "start": "17:00", "end": "09:00", "isOpen": true}
        ]}"#;

        assert_matches!(
            SchedulingConfig::from_json_str(raw),
            Err(ConfigError::InvalidHours { weekday: Weekday::Fri, .. })
        );
    }

    #[test]
    fn rejects_duplicate_weekdays() {
        let raw = r#"{"practice_hours": [
            {"weekday": "Mon", "start": "09:00", "end": "12:00", "isOpen": true},
            {"weekday": "Mon", "start": "13:00", "end": "17:00", "isOpen": true}
        ]}"#;

        assert_matches!(
            SchedulingConfig::from_json_str(raw),
            Err(ConfigError::InvalidHours { .. })
        );
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"utc_offset_minutes": -300}}"#).unwrap();

        let config = SchedulingConfig::load(file.path()).unwrap();
        assert_eq!(config.offset().local_minus_utc(), -300 * 60);
        assert_eq!(config.practice_hours.len(), 7);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert_matches!(
            SchedulingConfig::load("/definitely/not/here.json"),
            Err(ConfigError::Io { .. })
        );
    }
}
