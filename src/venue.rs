use crate::booking::{Booking, BookingId};
use crate::conflict::find_conflict;
use crate::error::BookingError;
use crate::time::{Interval, Moment};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub type VenueId = Arc<str>;

/// 1-based position of a seat within its venue.
pub type SeatId = u32;

/// Amount in minor currency units (cents), so line totals never drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub u64);

impl Price {
    pub fn checked_mul(self, hours: u32) -> Option<Price> {
        self.0.checked_mul(u64::from(hours)).map(Price)
    }

    pub fn checked_add(self, rhs: Price) -> Option<Price> {
        self.0.checked_add(rhs.0).map(Price)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Accepts `20`, `20.5`, `20.50`.
impl FromStr for Price {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BookingError::validation("price", format!("cannot parse '{}'", s));
        let (whole, frac) = s.trim().split_once('.').unwrap_or((s.trim(), ""));
        if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let whole = whole.parse::<u64>().map_err(|_| invalid())?;
        let cents = format!("{:0<2}", frac).parse::<u64>().map_err(|_| invalid())?;
        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(cents))
            .map(Price)
            .ok_or_else(invalid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub id: SeatId,
    #[serde(default)]
    pub label: String,
    /// Per-seat override; `None` defers to the venue default.
    #[serde(default)]
    pub hourly_price: Option<Price>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

impl Seat {
    pub fn new(id: SeatId) -> Seat {
        Seat {
            id,
            label: String::new(),
            hourly_price: None,
            bookings: vec![],
        }
    }

    pub fn effective_price(&self, venue_default: Price) -> Price {
        self.hourly_price.unwrap_or(venue_default)
    }

    pub fn find_conflict(&self, date: NaiveDate, candidate: &Interval) -> Option<&Booking> {
        find_conflict(&self.bookings, date, candidate)
    }

    pub fn todays_booking_count(&self, today: NaiveDate) -> usize {
        self.bookings.iter().filter(|b| b.date == today).count()
    }

    pub fn upcoming(&self, as_of: Moment) -> impl Iterator<Item = &Booking> {
        self.bookings.iter().filter(move |b| b.is_upcoming(as_of))
    }
}

/// A booking together with where it lives, for cross-seat listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingView {
    pub venue_id: VenueId,
    pub seat_id: SeatId,
    pub seat_label: String,
    pub booking: Booking,
}

impl BookingView {
    pub fn new(venue_id: &VenueId, seat: &Seat, booking: &Booking) -> BookingView {
        BookingView {
            venue_id: venue_id.clone(),
            seat_id: seat.id,
            seat_label: seat.label.clone(),
            booking: booking.clone(),
        }
    }
}

/// Future bookings a capacity shrink would discard. Must be acknowledged
/// before the shrink is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShrinkWarning {
    pub venue_id: VenueId,
    pub from: u32,
    pub to: u32,
    pub at_risk: Vec<BookingView>,
}

impl ShrinkWarning {
    /// True when this acknowledgement names every booking `current` puts at risk.
    pub fn covers(&self, current: &ShrinkWarning) -> bool {
        let acknowledged = self
            .at_risk
            .iter()
            .map(|v| (v.seat_id, v.booking.id))
            .collect::<HashSet<(SeatId, BookingId)>>();
        self.venue_id == current.venue_id
            && self.to == current.to
            && current
                .at_risk
                .iter()
                .all(|v| acknowledged.contains(&(v.seat_id, v.booking.id)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResizeOutcome {
    Applied {
        from: u32,
        to: u32,
        removed_seats: Vec<SeatId>,
        discarded_bookings: usize,
    },
    ConfirmationRequired(ShrinkWarning),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    pub id: VenueId,
    #[serde(default)]
    pub name: String,
    pub capacity: u32,
    #[serde(default)]
    pub default_hourly_price: Price,
    #[serde(default)]
    pub seats: Vec<Seat>,
}

impl Venue {
    pub fn new(id: &str, name: &str, capacity: u32, default_hourly_price: Price) -> Venue {
        Venue {
            id: Arc::from(id),
            name: name.to_string(),
            capacity,
            default_hourly_price,
            seats: (1..=capacity).map(Seat::new).collect(),
        }
    }

    pub fn seat(&self, seat_id: SeatId) -> Option<&Seat> {
        seat_id
            .checked_sub(1)
            .and_then(|idx| self.seats.get(idx as usize))
    }

    pub fn effective_price(&self, seat: &Seat) -> Price {
        seat.effective_price(self.default_hourly_price)
    }

    /// Brings a loaded document back in line: exactly `capacity` seats with
    /// ids matching their positions, and every display `end_time` recomputed.
    pub fn normalize(&mut self) {
        self.seats.truncate(self.capacity as usize);
        while self.seats.len() < self.capacity as usize {
            self.seats.push(Seat::new(self.seats.len() as SeatId + 1));
        }
        for (idx, seat) in self.seats.iter_mut().enumerate() {
            seat.id = idx as SeatId + 1;
            seat.bookings.iter_mut().for_each(Booking::refresh_end_time);
        }
    }

    /// Bookings that shrinking to `new_capacity` would drop and that are still
    /// upcoming at `as_of`. `None` when nothing of value would be lost.
    pub fn shrink_warning(&self, new_capacity: u32, as_of: Moment) -> Option<ShrinkWarning> {
        let at_risk = self
            .seats
            .iter()
            .skip(new_capacity as usize)
            .flat_map(|seat| seat.upcoming(as_of).map(move |b| BookingView::new(&self.id, seat, b)))
            .collect::<Vec<_>>();
        if at_risk.is_empty() {
            return None;
        }
        Some(ShrinkWarning {
            venue_id: self.id.clone(),
            from: self.capacity,
            to: new_capacity,
            at_risk,
        })
    }

    /// Unconditional resize. Growing appends seats without a price override;
    /// shrinking drops trailing seats with all their bookings.
    pub fn resize_capacity(&mut self, new_capacity: u32) -> ResizeOutcome {
        let from = self.capacity;
        let removed = self.seats.split_off((new_capacity as usize).min(self.seats.len()));
        self.capacity = new_capacity;
        self.normalize();
        ResizeOutcome::Applied {
            from,
            to: new_capacity,
            removed_seats: removed.iter().map(|s| s.id).collect(),
            discarded_bookings: removed.iter().map(|s| s.bookings.len()).sum(),
        }
    }

    pub fn apply_default_price_to_all_seats(&mut self) {
        let price = self.default_hourly_price;
        self.seats
            .iter_mut()
            .for_each(|seat| seat.hourly_price = Some(price));
    }
}
