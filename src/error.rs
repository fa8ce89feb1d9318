use crate::booking::BookingId;
use crate::time::Interval;
use crate::venue::{SeatId, VenueId};
use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

/// Coarse categorisation callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input; re-prompt.
    Validation,
    /// The window is taken; pick another seat or time.
    Conflict,
    /// Venue, seat or booking does not exist (any more).
    NotFound,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::NotFound => write!(f, "NOT_FOUND"),
        }
    }
}

/// Why one seat of a multi-seat reservation could not be taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    SeatNotFound,
    Booked { booking_id: BookingId, window: Interval },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unavailable {
    pub seat_id: SeatId,
    pub reason: UnavailableReason,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            UnavailableReason::SeatNotFound => write!(f, "seat {} not found", self.seat_id),
            UnavailableReason::Booked { window, .. } => {
                write!(f, "seat {} booked {}", self.seat_id, window)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("seat {seat_id} is already booked {window} on {date}")]
    Conflict {
        seat_id: SeatId,
        date: NaiveDate,
        window: Interval,
        booking_id: BookingId,
    },

    #[error("some seats are unavailable: {}", .0.iter().map(|u| u.to_string()).collect::<Vec<_>>().join(", "))]
    SeatsUnavailable(Vec<Unavailable>),

    #[error("venue {0} not found")]
    VenueNotFound(VenueId),

    #[error("seat {seat_id} not found in venue {venue_id}")]
    SeatNotFound { venue_id: VenueId, seat_id: SeatId },

    #[error("booking {booking_id} not found on seat {seat_id}")]
    BookingNotFound { seat_id: SeatId, booking_id: BookingId },

    #[error("venue {0} already exists")]
    DuplicateVenue(VenueId),
}

impl BookingError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> BookingError {
        BookingError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::DuplicateVenue(_) => ErrorKind::Validation,
            Self::Conflict { .. } | Self::SeatsUnavailable(_) => ErrorKind::Conflict,
            Self::VenueNotFound(_) | Self::SeatNotFound { .. } | Self::BookingNotFound { .. } => {
                ErrorKind::NotFound
            }
        }
    }
}

/// Failures reading or writing a scenario document.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed scenario: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid scenario: {0}")]
    Invalid(String),
}
