use crate::booking::Slot;
use crate::error::BookingError;
use crate::time::{Interval, Time};
use crate::venue::{Price, SeatId, Venue};
use chrono::NaiveDate;
use std::collections::HashSet;

/// One checkout: the same window on several seats. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRequest {
    seat_ids: Vec<SeatId>,
    date: NaiveDate,
    start_time: Time,
    duration_hours: u32,
}

impl ReservationRequest {
    pub fn new(
        seat_ids: Vec<SeatId>,
        date: NaiveDate,
        start_time: Time,
        duration_hours: u32,
    ) -> Result<ReservationRequest, BookingError> {
        if seat_ids.is_empty() {
            return Err(BookingError::validation("seat_ids", "select at least one seat"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = seat_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(BookingError::validation(
                "seat_ids",
                format!("seat {} selected twice", dup),
            ));
        }
        Slot::new(date, start_time, duration_hours)?;
        Ok(ReservationRequest {
            seat_ids,
            date,
            start_time,
            duration_hours,
        })
    }

    pub fn seat_ids(&self) -> &[SeatId] {
        &self.seat_ids
    }

    pub fn slot(&self) -> Slot {
        Slot {
            date: self.date,
            start_time: self.start_time,
            duration_hours: self.duration_hours,
        }
    }

    pub fn interval(&self) -> Interval {
        self.slot().interval()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteLine {
    pub seat_id: SeatId,
    pub hourly_price: Price,
    pub line_total: Price,
}

impl QuoteLine {
    pub fn new(seat_id: SeatId, hourly_price: Price, duration_hours: u32) -> Result<QuoteLine, BookingError> {
        let line_total = hourly_price.checked_mul(duration_hours).ok_or_else(|| {
            BookingError::validation(
                "price",
                format!("{}/hr for {}h on seat {} is too large", hourly_price, duration_hours, seat_id),
            )
        })?;
        Ok(QuoteLine {
            seat_id,
            hourly_price,
            line_total,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub lines: Vec<QuoteLine>,
    pub total: Price,
}

impl Quote {
    pub fn from_lines(lines: Vec<QuoteLine>) -> Result<Quote, BookingError> {
        let total = lines
            .iter()
            .try_fold(Price::default(), |acc, l| acc.checked_add(l.line_total))
            .ok_or_else(|| BookingError::validation("price", "reservation total is too large"))?;
        Ok(Quote { lines, total })
    }
}

/// Prices every requested seat at its effective rate. Says nothing about
/// availability: that is re-checked when the bookings are committed.
pub fn price(venue: &Venue, request: &ReservationRequest) -> Result<Quote, BookingError> {
    let lines = request
        .seat_ids()
        .iter()
        .map(|seat_id| {
            let seat = venue.seat(*seat_id).ok_or_else(|| BookingError::SeatNotFound {
                venue_id: venue.id.clone(),
                seat_id: *seat_id,
            })?;
            QuoteLine::new(*seat_id, venue.effective_price(seat), request.duration_hours)
        })
        .collect::<Result<Vec<_>, BookingError>>()?;
    Quote::from_lines(lines)
}
