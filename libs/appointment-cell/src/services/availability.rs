// libs/appointment-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use tracing::debug;
use uuid::Uuid;

use shared_config::SchedulingConfig;

use crate::error::{Rejection, SchedulingError};
use crate::models::{Appointment, TimeWindow};
use crate::services::store::BoundedStore;

const MINUTES_PER_DAY: i64 = 24 * 60;

pub struct AvailabilityEngine {
    store: BoundedStore,
    config: Arc<SchedulingConfig>,
}

impl AvailabilityEngine {
    pub fn new(store: BoundedStore, config: Arc<SchedulingConfig>) -> Self {
        Self { store, config }
    }

    /// Working-hours window of a staff member on a practice-local date.
    /// `None` when closed or unconfigured.
    pub fn working_window(&self, staff_id: Uuid, date: NaiveDate) -> Option<TimeWindow> {
        let hours = self.config.working_hours(staff_id, date.weekday())?;
        if !hours.is_open {
            return None;
        }
        Some(TimeWindow::new(
            self.local_instant(date, hours.start)?,
            self.local_instant(date, hours.end)?,
        ))
    }

    /// Whether `window` lies entirely inside the working hours of the day it starts on.
    pub fn within_working_hours(&self, staff_id: Uuid, window: &TimeWindow) -> bool {
        let offset = Duration::seconds(self.config.offset().local_minus_utc() as i64);
        let Some(local_start) = window.start.naive_utc().checked_add_signed(offset) else {
            return false;
        };
        self.working_window(staff_id, local_start.date())
            .map_or(false, |hours| hours.contains(window))
    }

    /// Free windows of at least `duration_minutes` on `date`, earliest first.
    pub async fn compute_open_slots(
        &self,
        staff_id: Uuid,
        date: NaiveDate,
        duration_minutes: i64,
    ) -> Result<OpenSlots, SchedulingError> {
        if duration_minutes <= 0 || duration_minutes > MINUTES_PER_DAY {
            return Err(Rejection::InvalidRequest(format!(
                "slot length must be between 1 and {} minutes, got {}",
                MINUTES_PER_DAY, duration_minutes
            ))
            .into());
        }

        let Some(hours) = self.working_window(staff_id, date) else {
            debug!("Staff {} not working on {}", staff_id, date);
            return Ok(OpenSlots::closed());
        };

        let booked = self.store.appointments_for_staff(staff_id, hours).await?;
        Ok(OpenSlots::new(hours, &booked, Duration::minutes(duration_minutes)))
    }

    /// `None` at the edges of the representable range.
    fn local_instant(&self, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
        let offset = Duration::seconds(self.config.offset().local_minus_utc() as i64);
        date.and_time(time)
            .checked_sub_signed(offset)
            .map(|naive| naive.and_utc())
    }
}

/// Free windows inside a working day.
///
/// Iterating is lazy and can be repeated; callers can stop after the first
/// few windows without the rest being computed.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenSlots {
    hours: Option<TimeWindow>,
    busy: Vec<TimeWindow>,
    min_length: Duration,
}

impl OpenSlots {
    pub fn new(hours: TimeWindow, booked: &[Appointment], min_length: Duration) -> Self {
        let mut busy: Vec<TimeWindow> = booked
            .iter()
            .filter(|appointment| appointment.blocks_slot())
            .map(Appointment::window)
            .filter(|window| window.overlaps(&hours))
            .map(|window| TimeWindow::new(window.start.max(hours.start), window.end.min(hours.end)))
            .collect();
        busy.sort_by_key(|window| window.start);

        Self { hours: Some(hours), busy, min_length }
    }

    pub fn closed() -> Self {
        Self { hours: None, busy: Vec::new(), min_length: Duration::zero() }
    }

    pub fn iter(&self) -> OpenSlotsIter<'_> {
        OpenSlotsIter {
            cursor: self.hours.map(|hours| hours.start),
            next_busy: 0,
            slots: self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<'a> IntoIterator for &'a OpenSlots {
    type Item = TimeWindow;
    type IntoIter = OpenSlotsIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct OpenSlotsIter<'a> {
    slots: &'a OpenSlots,
    /// Start of the next candidate gap; `None` once exhausted.
    cursor: Option<DateTime<Utc>>,
    next_busy: usize,
}

impl Iterator for OpenSlotsIter<'_> {
    type Item = TimeWindow;

    fn next(&mut self) -> Option<TimeWindow> {
        let hours = self.slots.hours?;

        loop {
            let cursor = self.cursor?;

            let gap = match self.slots.busy.get(self.next_busy) {
                Some(busy) => {
                    self.next_busy += 1;
                    self.cursor = Some(cursor.max(busy.end));
                    TimeWindow::new(cursor, busy.start)
                }
                None => {
                    self.cursor = None;
                    TimeWindow::new(cursor, hours.end)
                }
            };

            // Back-to-back bookings leave zero or negative gaps; skip them.
            if gap.length() > Duration::zero() && gap.length() >= self.slots.min_length {
                return Some(gap);
            }
        }
    }
}
