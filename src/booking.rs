use crate::error::BookingError;
use crate::time::{Interval, MINUTES_PER_DAY, Moment, Time};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable booking identity; never reused within one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(pub u64);

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreatedBy {
    #[serde(alias = "user")]
    Customer,
    Owner,
}

impl fmt::Display for CreatedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreatedBy::Customer => write!(f, "customer"),
            CreatedBy::Owner => write!(f, "owner"),
        }
    }
}

/// A validated date + start + duration; the shape every booking path accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub date: NaiveDate,
    pub start_time: Time,
    pub duration_hours: u32,
}

impl Slot {
    pub fn new(date: NaiveDate, start_time: Time, duration_hours: u32) -> Result<Slot, BookingError> {
        if duration_hours == 0 {
            return Err(BookingError::validation("duration_hours", "must be positive"));
        }
        if start_time.0 >= MINUTES_PER_DAY {
            return Err(BookingError::validation(
                "start_time",
                format!("minute {} is outside 0..1440", start_time.0),
            ));
        }
        Ok(Slot {
            date,
            start_time,
            duration_hours,
        })
    }

    pub fn interval(&self) -> Interval {
        Interval::derive(self.start_time, self.duration_hours)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(default = "BookingId::unassigned")]
    pub id: BookingId,
    pub date: NaiveDate,
    pub start_time: Time,
    pub duration_hours: u32,
    /// Display copy of the interval end folded onto the clock. Never read for
    /// conflict checks; rewritten by [`Booking::refresh_end_time`].
    #[serde(default = "midnight")]
    pub end_time: Time,
    pub created_by: CreatedBy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_identity: Option<String>,
}

impl BookingId {
    fn unassigned() -> BookingId {
        BookingId(0)
    }

    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

fn midnight() -> Time {
    Time::MIDNIGHT
}

impl Booking {
    pub fn new(
        id: BookingId,
        date: NaiveDate,
        start_time: Time,
        duration_hours: u32,
        created_by: CreatedBy,
        created_by_identity: Option<String>,
    ) -> Booking {
        let mut booking = Booking {
            id,
            date,
            start_time,
            duration_hours,
            end_time: Time::MIDNIGHT,
            created_by,
            created_by_identity,
        };
        booking.refresh_end_time();
        booking
    }

    pub fn from_slot(
        id: BookingId,
        slot: Slot,
        created_by: CreatedBy,
        created_by_identity: Option<String>,
    ) -> Booking {
        Booking::new(
            id,
            slot.date,
            slot.start_time,
            slot.duration_hours,
            created_by,
            created_by_identity,
        )
    }

    pub fn interval(&self) -> Interval {
        Interval::derive(self.start_time, self.duration_hours)
    }

    pub fn refresh_end_time(&mut self) {
        self.end_time = self.interval().end.wrapped();
    }

    /// Still worth showing at `as_of`: on a later date, or on that date and not
    /// yet over. Past bookings stay stored; they just stop being listed.
    pub fn is_upcoming(&self, as_of: Moment) -> bool {
        if self.date < as_of.date {
            return false;
        }
        self.date > as_of.date || self.interval().end >= as_of.time
    }
}
