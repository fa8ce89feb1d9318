use crate::engine::tests::utils::{VENUE, book, book_as, date, engine_with, moment};

#[test]
fn test_upcoming_hides_finished_bookings() {
    let engine = engine_with(3, 2000);
    book(&engine, 1, "2025-05-31", "10:00", 1);
    let ended = book(&engine, 2, "2025-06-01", "08:00", 2);
    let running = book(&engine, 3, "2025-06-01", "09:00", 2);
    let later = book(&engine, 1, "2025-06-01", "15:00", 1);
    let tomorrow = book(&engine, 2, "2025-06-02", "07:00", 1);

    let upcoming = engine.list_upcoming(VENUE, moment("2025-06-01", "10:30")).unwrap();

    let ids = upcoming.iter().map(|v| v.booking.id).collect::<Vec<_>>();
    assert_eq!(vec![running.id, later.id, tomorrow.id], ids);
    assert!(!ids.contains(&ended.id));
    // Past bookings are hidden, not deleted.
    assert_eq!(5, engine.all_bookings().len());
}

#[test]
fn test_booking_ending_now_is_still_upcoming() {
    let engine = engine_with(1, 2000);
    let booking = book(&engine, 1, "2025-06-01", "08:00", 2);

    let upcoming = engine.list_upcoming(VENUE, moment("2025-06-01", "10:00")).unwrap();
    assert_eq!(vec![booking.id], upcoming.iter().map(|v| v.booking.id).collect::<Vec<_>>());
}

#[test]
fn test_late_booking_stays_listed_until_midnight_passes() {
    let engine = engine_with(1, 2000);
    let late = book(&engine, 1, "2025-06-01", "23:00", 3);

    // The display end wraps to 02:00, which is already before 23:30.
    assert!(late.end_time < crate::engine::tests::utils::t("23:30"));
    let upcoming = engine.list_upcoming(VENUE, moment("2025-06-01", "23:30")).unwrap();

    assert_eq!(vec![late.id], upcoming.iter().map(|v| v.booking.id).collect::<Vec<_>>());
}

#[test]
fn test_upcoming_is_ordered_by_date_then_start() {
    let engine = engine_with(3, 2000);
    let c = book(&engine, 1, "2025-06-03", "09:00", 1);
    let b = book(&engine, 2, "2025-06-02", "18:00", 1);
    let a = book(&engine, 3, "2025-06-02", "09:00", 1);

    let upcoming = engine.list_upcoming(VENUE, moment("2025-06-01", "00:00")).unwrap();

    assert_eq!(
        vec![(3, a.id), (2, b.id), (1, c.id)],
        upcoming.iter().map(|v| (v.seat_id, v.booking.id)).collect::<Vec<_>>()
    );
}

#[test]
fn test_history_by_identity_newest_first() {
    let engine = engine_with(2, 2000);
    let old = book_as(&engine, 1, "2025-05-01", "10:00", 1, "ana");
    book_as(&engine, 2, "2025-05-02", "10:00", 1, "ben");
    let new = book_as(&engine, 2, "2025-06-01", "10:00", 1, "ana");
    book(&engine, 1, "2025-06-01", "10:00", 1);

    let history = engine.bookings_by_identity("ana");

    assert_eq!(vec![new.id, old.id], history.iter().map(|v| v.booking.id).collect::<Vec<_>>());
    assert!(engine.bookings_by_identity("nobody").is_empty());
}

#[test]
fn test_seat_statuses_show_clashes_and_counts() {
    let engine = engine_with(3, 2000);
    let clash = book(&engine, 1, "2025-06-01", "13:00", 2);
    book(&engine, 2, "2025-06-01", "09:00", 1);
    book(&engine, 2, "2025-06-02", "13:00", 2);
    engine.set_seat_label(VENUE, 3, "  window  ").unwrap();

    let statuses = engine
        .seat_statuses(VENUE, crate::engine::tests::utils::slot("2025-06-01", "14:00", 1))
        .unwrap();

    assert_eq!(3, statuses.len());
    assert_eq!(Some((clash.id, clash.interval())), statuses[0].conflict);
    assert!(!statuses[0].is_available());
    assert!(statuses[1].is_available());
    assert_eq!(1, statuses[1].bookings_on_date);
    assert_eq!("window", statuses[2].label);
    assert_eq!(0, engine.venue(VENUE).unwrap().seat(3).unwrap().todays_booking_count(date("2025-06-01")));
}
