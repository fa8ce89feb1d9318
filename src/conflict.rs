use crate::booking::Booking;
use crate::time::Interval;
use chrono::NaiveDate;

/// First booking on `date` whose window overlaps `candidate`.
///
/// Intervals are always re-derived from start and duration; the stored
/// `end_time` plays no part. Bookings on other dates never conflict, whatever
/// their minutes say. Linear scan: a seat holds dozens of bookings, not more.
pub fn find_conflict<'a>(
    bookings: &'a [Booking],
    date: NaiveDate,
    candidate: &Interval,
) -> Option<&'a Booking> {
    bookings
        .iter()
        .filter(|b| b.date == date)
        .find(|b| b.interval().overlaps(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{BookingId, CreatedBy};
    use crate::time::Time;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn owner(id: u64, date: &str, start: u64, hours: u32) -> Booking {
        Booking::new(BookingId(id), day(date), Time(start), hours, CreatedBy::Owner, None)
    }

    #[test]
    fn test_other_dates_are_ignored() {
        let bookings = vec![owner(1, "2025-06-02", 780, 2)];
        let candidate = Interval::derive(Time(780), 2);
        assert_eq!(None, find_conflict(&bookings, day("2025-06-01"), &candidate));
    }

    #[test]
    fn test_returns_first_overlap() {
        let bookings = vec![
            owner(1, "2025-06-01", 600, 1),
            owner(2, "2025-06-01", 780, 2),
            owner(3, "2025-06-01", 840, 1),
        ];
        let candidate = Interval::derive(Time(800), 1);
        assert_eq!(Some(BookingId(2)), find_conflict(&bookings, day("2025-06-01"), &candidate).map(|b| b.id));
    }

    #[test]
    fn test_stale_end_time_is_not_trusted() {
        let mut booking = owner(1, "2025-06-01", 1380, 3);
        // hand-edited display field claiming the booking ends at 23:30
        booking.end_time = Time(1410);
        let candidate = Interval::derive(Time(1420), 1);
        assert!(find_conflict(&[booking], day("2025-06-01"), &candidate).is_some());
    }
}
