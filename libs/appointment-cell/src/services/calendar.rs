// libs/appointment-cell/src/services/calendar.rs
use chrono::{Datelike, Days, Months, NaiveDate};

use crate::error::Rejection;
use crate::models::CalendarView;

/// Practice-local date range `[first, end)` shown by a calendar view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub first: NaiveDate,
    pub end: NaiveDate,
}

/// Day = the date itself, week = the Sunday-start week containing it,
/// month = the calendar month containing it.
pub fn range_for(view: CalendarView, anchor: NaiveDate) -> Result<DateRange, Rejection> {
    let out_of_range = || Rejection::InvalidRequest(format!("date {} is out of range", anchor));

    let (first, end) = match view {
        CalendarView::Day => (anchor, anchor.checked_add_days(Days::new(1))),
        CalendarView::Week => {
            let back = Days::new(anchor.weekday().num_days_from_sunday() as u64);
            let sunday = anchor.checked_sub_days(back).ok_or_else(out_of_range)?;
            (sunday, sunday.checked_add_days(Days::new(7)))
        }
        CalendarView::Month => {
            let first = anchor.with_day(1).ok_or_else(out_of_range)?;
            (first, first.checked_add_months(Months::new(1)))
        }
    };

    Ok(DateRange {
        first,
        end: end.ok_or_else(out_of_range)?,
    })
}
