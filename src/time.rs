use crate::error::BookingError;
use chrono::{Local, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

pub const MINUTES_PER_DAY: u64 = 1440;

/// Minutes since midnight. Values past 1440 only appear as interval ends and
/// mean the window runs into the next day.
#[derive(Debug, Clone, Copy, Ord, Eq, PartialEq, Hash, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Time(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Meridiem {
    Am,
    Pm,
}

impl fmt::Display for Meridiem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Meridiem::Am => write!(f, "AM"),
            Meridiem::Pm => write!(f, "PM"),
        }
    }
}

/// Display split of a minute-of-day: hour in 1..=12, minute, AM/PM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwelveHour {
    pub hour: u8,
    pub minute: u8,
    pub meridiem: Meridiem,
}

impl fmt::Display for TwelveHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02} {}", self.hour, self.minute, self.meridiem)
    }
}

impl Time {
    pub const MIDNIGHT: Time = Time(0);

    /// Validated minute-of-day in `0..1440`.
    pub fn of_day(minute: u64) -> Result<Time, BookingError> {
        if minute >= MINUTES_PER_DAY {
            return Err(BookingError::validation(
                "start_time",
                format!("minute {} is outside 0..1440", minute),
            ));
        }
        Ok(Time(minute))
    }

    pub fn hm(hour: u64, minute: u64) -> Result<Time, BookingError> {
        if minute >= 60 {
            return Err(BookingError::validation("minute", format!("{} is not in 0..60", minute)));
        }
        Time::of_day(hour * 60 + minute)
    }

    /// Folds an interval end back onto the clock face.
    pub fn wrapped(self) -> Time {
        Time(self.0 % MINUTES_PER_DAY)
    }

    pub fn to_12_hour(self) -> TwelveHour {
        let minute_of_day = self.wrapped().0;
        let h24 = minute_of_day / 60;
        let meridiem = if h24 >= 12 { Meridiem::Pm } else { Meridiem::Am };
        let hour = match h24 % 12 {
            0 => 12,
            h => h,
        };
        TwelveHour {
            hour: hour as u8,
            minute: (minute_of_day % 60) as u8,
            meridiem,
        }
    }

    pub fn from_12_hour(hour: u8, minute: u8, meridiem: Meridiem) -> Result<Time, BookingError> {
        if !(1..=12).contains(&hour) {
            return Err(BookingError::validation("hour", format!("{} is not in 1..=12", hour)));
        }
        let h24 = match (meridiem, hour) {
            (Meridiem::Am, 12) => 0,
            (Meridiem::Am, h) => h,
            (Meridiem::Pm, 12) => 12,
            (Meridiem::Pm, h) => h + 12,
        };
        Time::hm(u64::from(h24), u64::from(minute))
    }

    /// Pulls `candidate` forward to the current minute when `date` is today and
    /// the candidate already lies in the past. Other dates pass through untouched.
    pub fn clamp_not_before_now(date: NaiveDate, candidate: Time, now: Moment) -> Time {
        if date == now.date && candidate < now.time {
            now.time
        } else {
            candidate
        }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = self.0 / MINUTES_PER_DAY;
        let remaining = self.0 % MINUTES_PER_DAY;
        write!(f, "{:02}:{:02}", remaining / 60, remaining % 60)?;
        if days > 0 {
            write!(f, "+{}d", days)?;
        }
        Ok(())
    }
}

/// Accepts `13:05`, `1:05pm`, `1:05 PM`, `9am`.
impl FromStr for Time {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s.trim().to_ascii_lowercase().replace(' ', "");
        let invalid = || BookingError::validation("time", format!("cannot parse '{}'", s));

        let (clock, meridiem) = if let Some(rest) = cleaned.strip_suffix("am") {
            (rest, Some(Meridiem::Am))
        } else if let Some(rest) = cleaned.strip_suffix("pm") {
            (rest, Some(Meridiem::Pm))
        } else {
            (cleaned.as_str(), None)
        };

        match meridiem {
            None => {
                let t = NaiveTime::parse_from_str(clock, "%H:%M").map_err(|_| invalid())?;
                Time::hm(u64::from(t.hour()), u64::from(t.minute()))
            }
            Some(meridiem) => {
                let (h, m) = clock.split_once(':').unwrap_or((clock, "0"));
                let hour = h.parse::<u8>().map_err(|_| invalid())?;
                let minute = m.parse::<u8>().map_err(|_| invalid())?;
                Time::from_12_hour(hour, minute, meridiem)
            }
        }
    }
}

impl TryFrom<String> for Time {
    type Error = BookingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Time> for String {
    fn from(value: Time) -> Self {
        value.wrapped().to_string()
    }
}

impl Add<u64> for Time {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Time(self.0 + rhs)
    }
}

/// A calendar day plus a minute on it; the engine's notion of "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Moment {
    pub date: NaiveDate,
    pub time: Time,
}

impl Moment {
    pub fn new(date: NaiveDate, time: Time) -> Moment {
        Moment { date, time }
    }

    pub fn now() -> Moment {
        let now = Local::now();
        Moment {
            date: now.date_naive(),
            time: Time(u64::from(now.hour()) * 60 + u64::from(now.minute())),
        }
    }
}

/// Half-open `[start, end)` window on one calendar date. `end` is never wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub start: Time,
    pub end: Time,
}

impl Interval {
    pub fn derive(start: Time, duration_hours: u32) -> Interval {
        Interval {
            start,
            end: start + u64::from(duration_hours) * 60,
        }
    }

    /// Strict on both ends: windows that only touch do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn crosses_midnight(&self) -> bool {
        self.end.0 > MINUTES_PER_DAY
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start.to_12_hour(), self.end.to_12_hour())?;
        if self.crosses_midnight() {
            write!(f, " (next day)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_midnight_and_noon() {
        assert_eq!("12:00 AM", Time(0).to_12_hour().to_string());
        assert_eq!("12:00 PM", Time(720).to_12_hour().to_string());
        assert_eq!("11:59 PM", Time(1439).to_12_hour().to_string());
        assert_eq!(Time(0), Time::from_12_hour(12, 0, Meridiem::Am).unwrap());
        assert_eq!(Time(720), Time::from_12_hour(12, 0, Meridiem::Pm).unwrap());
        assert_eq!(Time(780), Time::from_12_hour(1, 0, Meridiem::Pm).unwrap());
    }

    #[test]
    fn test_rejects_bad_twelve_hour_parts() {
        assert!(Time::from_12_hour(0, 0, Meridiem::Am).is_err());
        assert!(Time::from_12_hour(13, 0, Meridiem::Pm).is_err());
        assert!(Time::from_12_hour(5, 60, Meridiem::Pm).is_err());
    }

    #[test]
    fn test_parse() {
        assert_eq!(Time(780), "13:00".parse().unwrap());
        assert_eq!(Time(785), "1:05pm".parse().unwrap());
        assert_eq!(Time(785), "1:05 PM".parse().unwrap());
        assert_eq!(Time(540), "9am".parse().unwrap());
        assert_eq!(Time(30), "12:30am".parse().unwrap());
        assert!("24:00".parse::<Time>().is_err());
        assert!("noon".parse::<Time>().is_err());
    }

    #[test]
    fn test_clamp_only_applies_today() {
        let now = Moment::new(day("2025-06-01"), Time(600));
        assert_eq!(Time(600), Time::clamp_not_before_now(day("2025-06-01"), Time(540), now));
        assert_eq!(Time(660), Time::clamp_not_before_now(day("2025-06-01"), Time(660), now));
        assert_eq!(Time(540), Time::clamp_not_before_now(day("2025-06-02"), Time(540), now));
        assert_eq!(Time(540), Time::clamp_not_before_now(day("2025-05-31"), Time(540), now));
    }

    #[test]
    fn test_interval_past_midnight_is_not_wrapped() {
        let interval = Interval::derive(Time(1380), 3);
        assert_eq!(Time(1560), interval.end);
        assert!(interval.crosses_midnight());
        assert_eq!(Time(120), interval.end.wrapped());
        assert_eq!("02:00+1d", interval.end.to_string());
    }

    #[test]
    fn test_abutting_intervals_do_not_overlap() {
        let a = Interval::derive(Time(780), 2);
        let b = Interval::derive(Time(900), 1);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
        assert!(a.overlaps(&Interval::derive(Time(840), 1)));
    }

    #[test]
    fn test_serde_as_clock_string() {
        let json = serde_json::to_string(&Time(785)).unwrap();
        assert_eq!("\"13:05\"", json);
        let back: Time = serde_json::from_str(&json).unwrap();
        assert_eq!(Time(785), back);
    }
}
