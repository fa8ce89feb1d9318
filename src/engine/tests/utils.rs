use crate::booking::{Booking, CreatedBy, Slot};
use crate::engine::engine::BookingEngine;
use crate::time::{Moment, Time};
use crate::venue::{Price, SeatId, Venue};
use chrono::NaiveDate;
use proptest::prelude::Strategy;
use proptest::prop_oneof;
use proptest::strategy::Just;

pub const VENUE: &str = "hall";

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn t(s: &str) -> Time {
    s.parse().unwrap()
}

pub fn slot(d: &str, start: &str, hours: u32) -> Slot {
    Slot::new(date(d), t(start), hours).unwrap()
}

pub fn moment(d: &str, time: &str) -> Moment {
    Moment::new(date(d), t(time))
}

/// Engine holding a single venue `hall` with `capacity` seats at `price` per hour.
pub fn engine_with(capacity: u32, price: u64) -> BookingEngine {
    let engine = BookingEngine::new();
    engine
        .add_venue(Venue::new(VENUE, "Main hall", capacity, Price(price)))
        .unwrap();
    engine
}

pub fn book(engine: &BookingEngine, seat_id: SeatId, d: &str, start: &str, hours: u32) -> Booking {
    engine
        .create_booking(VENUE, seat_id, slot(d, start, hours), CreatedBy::Owner, None)
        .unwrap()
}

pub fn book_as(engine: &BookingEngine, seat_id: SeatId, d: &str, start: &str, hours: u32, who: &str) -> Booking {
    engine
        .create_booking(VENUE, seat_id, slot(d, start, hours), CreatedBy::Customer, Some(who))
        .unwrap()
}

pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
    prop_oneof![
        Just(date("2025-06-01")),
        Just(date("2025-06-02")),
        Just(date("2025-06-03")),
    ]
}

/// Whole-hour and half-hour starts across the day, 1 to 6 hours long.
pub fn arb_slot() -> impl Strategy<Value = Slot> {
    (arb_date(), 0..48u64, 1..=6u32)
        .prop_map(|(d, half_hours, hours)| Slot::new(d, Time(half_hours * 30), hours).unwrap())
}
