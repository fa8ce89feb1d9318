use crate::booking::{Booking, BookingId, CreatedBy, Slot};
use crate::error::{BookingError, Unavailable, UnavailableReason};
use crate::pricing::{self, Quote, QuoteLine, ReservationRequest};
use crate::time::{Interval, Moment};
use crate::venue::{BookingView, Price, ResizeOutcome, Seat, SeatId, ShrinkWarning, Venue, VenueId};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

/// A venue as the engine holds it: the venue-wide fields plus one lock per seat.
///
/// Single-seat operations take the venue lock shared and the seat lock
/// exclusively, so bookings on different seats never wait for each other.
/// Operations that touch every seat at once (resize, bulk price) take the
/// venue lock exclusively. Anything holding several seat locks acquires them
/// in ascending seat order.
struct SharedVenue {
    id: VenueId,
    name: String,
    capacity: u32,
    default_hourly_price: Price,
    seats: Vec<Mutex<Seat>>,
}

impl SharedVenue {
    fn from_venue(venue: Venue) -> SharedVenue {
        SharedVenue {
            id: venue.id,
            name: venue.name,
            capacity: venue.capacity,
            default_hourly_price: venue.default_hourly_price,
            seats: venue.seats.into_iter().map(Mutex::new).collect(),
        }
    }

    fn seat(&self, seat_id: SeatId) -> Result<MutexGuard<'_, Seat>, BookingError> {
        seat_id
            .checked_sub(1)
            .and_then(|idx| self.seats.get(idx as usize))
            .map(lock)
            .ok_or_else(|| BookingError::SeatNotFound {
                venue_id: self.id.clone(),
                seat_id,
            })
    }

    /// Consistent copy: every seat lock is held while cloning, so a multi-seat
    /// reservation is seen either entirely or not at all.
    fn snapshot(&self) -> Venue {
        let guards = self.seats.iter().map(lock).collect::<Vec<_>>();
        Venue {
            id: self.id.clone(),
            name: self.name.clone(),
            capacity: self.capacity,
            default_hourly_price: self.default_hourly_price,
            seats: guards.iter().map(|seat| (**seat).clone()).collect(),
        }
    }

    /// Runs `f` on a plain [`Venue`] built from this one and writes the result
    /// back. Callers must hold the venue lock exclusively.
    fn modify<R>(&mut self, f: impl FnOnce(&mut Venue) -> R) -> R {
        let mut venue = Venue {
            id: self.id.clone(),
            name: std::mem::take(&mut self.name),
            capacity: self.capacity,
            default_hourly_price: self.default_hourly_price,
            seats: std::mem::take(&mut self.seats)
                .into_iter()
                .map(|m| m.into_inner().unwrap_or_else(PoisonError::into_inner))
                .collect(),
        };
        let result = f(&mut venue);
        *self = SharedVenue::from_venue(venue);
        result
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(rw: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    rw.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(rw: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    rw.write().unwrap_or_else(PoisonError::into_inner)
}

/// Per-seat availability for one candidate window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatStatus {
    pub seat_id: SeatId,
    pub label: String,
    pub hourly_price: Price,
    pub bookings_on_date: usize,
    pub conflict: Option<(BookingId, Interval)>,
}

impl SeatStatus {
    pub fn is_available(&self) -> bool {
        self.conflict.is_none()
    }
}

/// The committed result of a multi-seat checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub bookings: Vec<(SeatId, Booking)>,
    pub quote: Quote,
}

pub struct BookingEngine {
    venues: DashMap<VenueId, Arc<RwLock<SharedVenue>>>,
    next_booking_id: AtomicU64,
}

impl Default for BookingEngine {
    fn default() -> Self {
        BookingEngine::new()
    }
}

impl BookingEngine {
    pub fn new() -> BookingEngine {
        BookingEngine {
            venues: DashMap::new(),
            next_booking_id: AtomicU64::new(1),
        }
    }

    fn issue_id(&self) -> BookingId {
        BookingId(self.next_booking_id.fetch_add(1, Ordering::SeqCst))
    }

    fn shared(&self, venue_id: &str) -> Result<Arc<RwLock<SharedVenue>>, BookingError> {
        self.venues
            .get(venue_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BookingError::VenueNotFound(Arc::from(venue_id)))
    }

    fn all_shared(&self) -> Vec<Arc<RwLock<SharedVenue>>> {
        let mut all = self
            .venues
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect::<Vec<_>>();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all.into_iter().map(|(_, v)| v).collect()
    }

    /// Registers a venue, normalising its seats and giving every booking an id
    /// unique within this engine. Stored bookings must describe a valid slot.
    pub fn add_venue(&self, mut venue: Venue) -> Result<(), BookingError> {
        venue.normalize();

        for booking in venue.seats.iter().flat_map(|s| s.bookings.iter()) {
            Slot::new(booking.date, booking.start_time, booking.duration_hours)?;
        }

        let max_seen = venue
            .seats
            .iter()
            .flat_map(|s| s.bookings.iter())
            .map(|b| b.id.0)
            .max()
            .unwrap_or(0);
        self.next_booking_id.fetch_max(max_seen.saturating_add(1), Ordering::SeqCst);

        let mut seen = self
            .all_bookings()
            .into_iter()
            .map(|v| v.booking.id)
            .collect::<HashSet<_>>();
        for booking in venue.seats.iter_mut().flat_map(|s| s.bookings.iter_mut()) {
            if !booking.id.is_assigned() || !seen.insert(booking.id) {
                booking.id = self.issue_id();
                seen.insert(booking.id);
            }
        }

        match self.venues.entry(venue.id.clone()) {
            Entry::Occupied(_) => Err(BookingError::DuplicateVenue(venue.id)),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(RwLock::new(SharedVenue::from_venue(venue))));
                Ok(())
            }
        }
    }

    pub fn venue(&self, venue_id: &str) -> Result<Venue, BookingError> {
        let shared = self.shared(venue_id)?;
        let venue = read(&shared).snapshot();
        Ok(venue)
    }

    pub fn venues(&self) -> Vec<Venue> {
        self.all_shared()
            .iter()
            .map(|shared| read(shared).snapshot())
            .collect()
    }

    pub fn venue_ids(&self) -> Vec<VenueId> {
        let mut ids = self
            .venues
            .iter()
            .map(|entry| entry.key().clone())
            .collect::<Vec<_>>();
        ids.sort();
        ids
    }

    /// Books one seat after checking it against that seat's bookings on the
    /// same date. Check and insert happen under the seat lock.
    pub fn create_booking(
        &self,
        venue_id: &str,
        seat_id: SeatId,
        slot: Slot,
        created_by: CreatedBy,
        identity: Option<&str>,
    ) -> Result<Booking, BookingError> {
        let slot = Slot::new(slot.date, slot.start_time, slot.duration_hours)?;
        let identity = Self::check_identity(created_by, identity)?;
        let candidate = slot.interval();

        let shared = self.shared(venue_id)?;
        let venue = read(&shared);
        let mut seat = venue.seat(seat_id)?;

        if let Some(existing) = seat.find_conflict(slot.date, &candidate) {
            return Err(BookingError::Conflict {
                seat_id,
                date: slot.date,
                window: existing.interval(),
                booking_id: existing.id,
            });
        }

        let booking = Booking::from_slot(self.issue_id(), slot, created_by, identity);
        seat.bookings.push(booking.clone());
        Ok(booking)
    }

    /// Removes a booking by identity. Cancelling twice reports `BookingNotFound`
    /// the second time.
    pub fn cancel_booking(
        &self,
        venue_id: &str,
        seat_id: SeatId,
        booking_id: BookingId,
    ) -> Result<Booking, BookingError> {
        let shared = self.shared(venue_id)?;
        let venue = read(&shared);
        let mut seat = venue.seat(seat_id)?;
        let idx = seat
            .bookings
            .iter()
            .position(|b| b.id == booking_id)
            .ok_or(BookingError::BookingNotFound {
                seat_id,
                booking_id,
            })?;
        Ok(seat.bookings.remove(idx))
    }

    /// Bookings still relevant at `as_of`, ordered by date then start time.
    pub fn list_upcoming(&self, venue_id: &str, as_of: Moment) -> Result<Vec<BookingView>, BookingError> {
        let venue = self.venue(venue_id)?;
        let id = &venue.id;
        let mut upcoming = venue
            .seats
            .iter()
            .flat_map(|seat| seat.upcoming(as_of).map(move |b| BookingView::new(id, seat, b)))
            .collect::<Vec<_>>();
        upcoming.sort_by_key(|v| (v.booking.date, v.booking.start_time, v.seat_id, v.booking.id));
        Ok(upcoming)
    }

    pub fn price(&self, venue_id: &str, request: &ReservationRequest) -> Result<Quote, BookingError> {
        let venue = self.venue(venue_id)?;
        pricing::price(&venue, request)
    }

    /// Books every requested seat or none. All requested seats stay locked
    /// from the first check to the last insert; on failure every unavailable
    /// seat is reported, in request order.
    pub fn reserve(
        &self,
        venue_id: &str,
        request: &ReservationRequest,
        created_by: CreatedBy,
        identity: Option<&str>,
    ) -> Result<Reservation, BookingError> {
        let identity = Self::check_identity(created_by, identity)?;
        let slot = request.slot();
        let candidate = request.interval();

        let shared = self.shared(venue_id)?;
        let venue = read(&shared);

        let mut ordered = request.seat_ids().to_vec();
        ordered.sort_unstable();
        let mut guards = ordered
            .iter()
            .filter_map(|id| venue.seat(*id).ok().map(|guard| (*id, guard)))
            .collect::<BTreeMap<SeatId, MutexGuard<'_, Seat>>>();

        let unavailable = request
            .seat_ids()
            .iter()
            .filter_map(|seat_id| match guards.get(seat_id) {
                None => Some(Unavailable {
                    seat_id: *seat_id,
                    reason: UnavailableReason::SeatNotFound,
                }),
                Some(seat) => seat.find_conflict(slot.date, &candidate).map(|b| Unavailable {
                    seat_id: *seat_id,
                    reason: UnavailableReason::Booked {
                        booking_id: b.id,
                        window: b.interval(),
                    },
                }),
            })
            .collect::<Vec<_>>();
        if !unavailable.is_empty() {
            return Err(BookingError::SeatsUnavailable(unavailable));
        }

        // Priced before any insert: an overflow leaves every seat untouched.
        let quote = Quote::from_lines(
            request
                .seat_ids()
                .iter()
                .filter_map(|seat_id| guards.get(seat_id).map(|seat| (*seat_id, seat)))
                .map(|(seat_id, seat)| {
                    QuoteLine::new(
                        seat_id,
                        seat.effective_price(venue.default_hourly_price),
                        slot.duration_hours,
                    )
                })
                .collect::<Result<Vec<_>, BookingError>>()?,
        )?;

        let mut bookings = Vec::with_capacity(request.seat_ids().len());
        for seat_id in request.seat_ids() {
            if let Some(seat) = guards.get_mut(seat_id) {
                let booking = Booking::from_slot(self.issue_id(), slot, created_by, identity.clone());
                seat.bookings.push(booking.clone());
                bookings.push((*seat_id, booking));
            }
        }
        Ok(Reservation { bookings, quote })
    }

    /// The seat grid for a candidate window: price and first clash per seat.
    pub fn seat_statuses(&self, venue_id: &str, slot: Slot) -> Result<Vec<SeatStatus>, BookingError> {
        let slot = Slot::new(slot.date, slot.start_time, slot.duration_hours)?;
        let candidate = slot.interval();
        let venue = self.venue(venue_id)?;
        Ok(venue
            .seats
            .iter()
            .map(|seat| SeatStatus {
                seat_id: seat.id,
                label: seat.label.clone(),
                hourly_price: venue.effective_price(seat),
                bookings_on_date: seat.todays_booking_count(slot.date),
                conflict: seat
                    .find_conflict(slot.date, &candidate)
                    .map(|b| (b.id, b.interval())),
            })
            .collect())
    }

    pub fn set_seat_label(&self, venue_id: &str, seat_id: SeatId, label: &str) -> Result<(), BookingError> {
        let shared = self.shared(venue_id)?;
        let venue = read(&shared);
        venue.seat(seat_id)?.label = label.trim().to_string();
        Ok(())
    }

    /// `None` clears the override so the seat follows the venue default.
    pub fn set_seat_price(
        &self,
        venue_id: &str,
        seat_id: SeatId,
        price: Option<Price>,
    ) -> Result<(), BookingError> {
        let shared = self.shared(venue_id)?;
        let venue = read(&shared);
        venue.seat(seat_id)?.hourly_price = price;
        Ok(())
    }

    pub fn set_default_price(&self, venue_id: &str, price: Price) -> Result<(), BookingError> {
        let shared = self.shared(venue_id)?;
        write(&shared).default_hourly_price = price;
        Ok(())
    }

    /// Overwrites every seat's override with the venue default.
    pub fn apply_default_price_to_all_seats(&self, venue_id: &str) -> Result<(), BookingError> {
        let shared = self.shared(venue_id)?;
        write(&shared).modify(|venue| venue.apply_default_price_to_all_seats());
        Ok(())
    }

    /// Grows or shrinks the seat list. A shrink that would discard bookings
    /// still upcoming at `as_of` returns [`ResizeOutcome::ConfirmationRequired`]
    /// unless `acknowledged` already lists every one of them.
    pub fn resize_capacity(
        &self,
        venue_id: &str,
        new_capacity: u32,
        as_of: Moment,
        acknowledged: Option<&ShrinkWarning>,
    ) -> Result<ResizeOutcome, BookingError> {
        let shared = self.shared(venue_id)?;
        let mut venue = write(&shared);
        Ok(venue.modify(|venue| {
            match venue.shrink_warning(new_capacity, as_of) {
                Some(warning) if !acknowledged.is_some_and(|ack| ack.covers(&warning)) => {
                    ResizeOutcome::ConfirmationRequired(warning)
                }
                _ => venue.resize_capacity(new_capacity),
            }
        }))
    }

    /// Every booking made under `identity`, newest first.
    pub fn bookings_by_identity(&self, identity: &str) -> Vec<BookingView> {
        let mut found = self
            .all_bookings()
            .into_iter()
            .filter(|v| v.booking.created_by_identity.as_deref() == Some(identity))
            .collect::<Vec<_>>();
        found.sort_by(|a, b| {
            (b.booking.date, b.booking.start_time).cmp(&(a.booking.date, a.booking.start_time))
        });
        found
    }

    /// Every stored booking, past ones included, by venue then date then start.
    pub fn all_bookings(&self) -> Vec<BookingView> {
        self.venues()
            .iter()
            .flat_map(|venue| {
                let id = &venue.id;
                let mut views = venue
                    .seats
                    .iter()
                    .flat_map(|seat| seat.bookings.iter().map(move |b| BookingView::new(id, seat, b)))
                    .collect::<Vec<_>>();
                views.sort_by_key(|v| (v.booking.date, v.booking.start_time, v.seat_id));
                views
            })
            .collect()
    }

    fn check_identity(created_by: CreatedBy, identity: Option<&str>) -> Result<Option<String>, BookingError> {
        let identity = identity.map(str::trim).filter(|s| !s.is_empty());
        match (created_by, identity) {
            (CreatedBy::Customer, None) => Err(BookingError::validation(
                "created_by_identity",
                "required for customer bookings",
            )),
            (_, identity) => Ok(identity.map(str::to_string)),
        }
    }
}
