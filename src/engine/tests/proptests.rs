use crate::booking::{CreatedBy, Slot};
use crate::engine::tests::utils::{VENUE, arb_slot, date, engine_with};
use crate::pricing::ReservationRequest;
use crate::time::{Interval, Meridiem, Time};
use crate::venue::Price;
use proptest::prelude::*;
use proptest::proptest;

proptest! {
    #[test]
    fn test_no_double_booking(
        attempts in prop::collection::vec((1..=3u32, arb_slot()), 1..40)
    ) {
        let engine = engine_with(3, 2000);
        for (seat_id, slot) in attempts {
            let _ = engine.create_booking(VENUE, seat_id, slot, CreatedBy::Owner, None);
        }

        let venue = engine.venue(VENUE).unwrap();
        for seat in &venue.seats {
            for (i, a) in seat.bookings.iter().enumerate() {
                for b in &seat.bookings[i + 1..] {
                    prop_assert!(
                        a.date != b.date || !a.interval().overlaps(&b.interval()),
                        "\nSeat {} double booked on {}:\n{} {} vs {} {}",
                        seat.id, a.date, a.id, a.interval(), b.id, b.interval()
                    );
                }
            }
        }
    }

    #[test]
    fn test_overlap_is_symmetric(
        s1 in 0..1440u64, h1 in 1..24u32,
        s2 in 0..1440u64, h2 in 1..24u32
    ) {
        let a = Interval::derive(Time(s1), h1);
        let b = Interval::derive(Time(s2), h2);
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        prop_assert!(a.overlaps(&a));
    }

    #[test]
    fn test_twelve_hour_round_trip(minute in 0..1440u64) {
        let twelve = Time(minute).to_12_hour();
        prop_assert!((1..=12).contains(&twelve.hour));
        prop_assert_eq!(Time(minute), Time::from_12_hour(twelve.hour, twelve.minute, twelve.meridiem).unwrap());
        prop_assert_eq!(minute >= 720, twelve.meridiem == Meridiem::Pm);
        prop_assert_eq!(Time(minute), twelve.to_string().parse::<Time>().unwrap());
    }

    #[test]
    fn test_quote_total_is_sum_of_lines(
        overrides in prop::collection::vec(prop::option::of(0..10_000u64), 4),
        default in 0..10_000u64,
        hours in 1..=12u32,
        seat_ids in prop::sample::subsequence(vec![1u32, 2, 3, 4], 1..=4)
    ) {
        let engine = engine_with(4, default);
        for (idx, price) in overrides.iter().enumerate() {
            engine.set_seat_price(VENUE, idx as u32 + 1, price.map(Price)).unwrap();
        }
        let request = ReservationRequest::new(seat_ids.clone(), date("2025-06-01"), Time(600), hours).unwrap();

        let quote = engine.price(VENUE, &request).unwrap();

        prop_assert_eq!(seat_ids.len(), quote.lines.len());
        for line in &quote.lines {
            let expected = overrides[line.seat_id as usize - 1].unwrap_or(default);
            prop_assert_eq!(Price(expected), line.hourly_price);
            prop_assert_eq!(Price(expected * u64::from(hours)), line.line_total);
        }
        prop_assert_eq!(quote.lines.iter().map(|l| l.line_total.0).sum::<u64>(), quote.total.0);
    }

    #[test]
    fn test_cancel_twice_changes_nothing(slots in prop::collection::vec(arb_slot(), 1..10), pick in any::<prop::sample::Index>()) {
        let engine = engine_with(1, 2000);
        let made = slots
            .into_iter()
            .filter_map(|slot: Slot| engine.create_booking(VENUE, 1, slot, CreatedBy::Owner, None).ok())
            .collect::<Vec<_>>();
        let target = pick.get(&made);

        engine.cancel_booking(VENUE, 1, target.id).unwrap();
        let after_first = engine.venue(VENUE).unwrap();
        prop_assert!(engine.cancel_booking(VENUE, 1, target.id).is_err());

        prop_assert_eq!(after_first, engine.venue(VENUE).unwrap());
        prop_assert_eq!(made.len() - 1, engine.all_bookings().len());
    }
}
