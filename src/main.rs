use crate::booking::{CreatedBy, Slot};
use crate::engine::engine::{BookingEngine, SeatStatus};
use crate::error::BookingError;
use crate::pricing::{Quote, ReservationRequest};
use crate::time::{Moment, Time};
use crate::venue::{BookingView, Price, ResizeOutcome, SeatId, ShrinkWarning, Venue};
use chrono::NaiveDate;
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::{Context, Editor, Helper, Highlighter, Hinter, Validator};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod booking;
mod conflict;
mod engine;
mod error;
mod pricing;
mod time;
mod venue;

#[derive(Parser)]
struct Args {
    /// Path to the JSON venue document
    #[arg(short, long, value_name = "FILE", default_value = "data/default.json")]
    scenario: PathBuf,

    /// Where `save` writes; defaults to the scenario file
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `seatbook=trace`
    #[arg(long, env = "SEATBOOK_LOG", default_value = "info")]
    log: String,

    /// Pin today's date (YYYY-MM-DD) instead of reading the system clock
    #[arg(long, value_name = "DATE")]
    today: Option<NaiveDate>,

    /// Pin the current time of day (HH:MM) instead of reading the system clock
    #[arg(long, value_name = "TIME")]
    now: Option<Time>,
}

#[derive(Helper, Hinter, Highlighter, Validator)]
pub struct CompleteHelper {
    pub commands: Vec<String>,
}

impl Completer for CompleteHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, _pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let mut candidates = Vec::new();

        for cmd in &self.commands {
            if cmd.starts_with(line) {
                candidates.push(Pair {
                    display: cmd.clone(),
                    replacement: format!("{} ", cmd),
                });
            }
        }

        Ok((0, candidates))
    }
}

#[derive(Tabled)]
struct VenueRow {
    #[tabled(rename = "Venue")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Seats")]
    capacity: u32,
    #[tabled(rename = "Base/hr")]
    price: Price,
    #[tabled(rename = "Bookings")]
    bookings: usize,
}

#[derive(Tabled)]
struct SeatRow {
    #[tabled(rename = "Seat")]
    seat: SeatId,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Price/hr")]
    price: Price,
    #[tabled(rename = "On date")]
    bookings: usize,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&SeatStatus> for SeatRow {
    fn from(s: &SeatStatus) -> Self {
        SeatRow {
            seat: s.seat_id,
            label: s.label.clone(),
            price: s.hourly_price,
            bookings: s.bookings_on_date,
            status: match &s.conflict {
                None => "free".green().to_string(),
                Some((id, window)) => format!("booked {} ({})", window, id).red().to_string(),
            },
        }
    }
}

#[derive(Tabled)]
struct BookingRow {
    #[tabled(rename = "Id")]
    id: u64,
    #[tabled(rename = "Venue")]
    venue: String,
    #[tabled(rename = "Seat")]
    seat: String,
    #[tabled(rename = "Date")]
    date: NaiveDate,
    #[tabled(rename = "Time")]
    window: String,
    #[tabled(rename = "Hours")]
    hours: u32,
    #[tabled(rename = "By")]
    by: String,
}

impl From<&BookingView> for BookingRow {
    fn from(v: &BookingView) -> Self {
        let seat = if v.seat_label.is_empty() {
            v.seat_id.to_string()
        } else {
            format!("{} ({})", v.seat_id, v.seat_label)
        };
        let by = match &v.booking.created_by_identity {
            Some(who) => format!("{} {}", v.booking.created_by, who),
            None => v.booking.created_by.to_string(),
        };
        BookingRow {
            id: v.booking.id.0,
            venue: v.venue_id.to_string(),
            seat,
            date: v.booking.date,
            window: v.booking.interval().to_string(),
            hours: v.booking.duration_hours,
            by,
        }
    }
}

#[derive(Tabled)]
struct QuoteRow {
    #[tabled(rename = "Seat")]
    seat: SeatId,
    #[tabled(rename = "Price/hr")]
    hourly: Price,
    #[tabled(rename = "Line total")]
    total: Price,
}

fn paginate(content: String) {
    let spawned = Command::new("less")
        .arg("-R")
        .stdin(Stdio::piped())
        .spawn()
        // Fallback to 'more' if 'less' isn't available
        .or_else(|_| Command::new("more").stdin(Stdio::piped()).spawn());

    let mut pager = match spawned {
        Ok(pager) => pager,
        Err(e) => {
            debug!("no pager available: {}", e);
            println!("{}", content);
            return;
        }
    };

    if let Some(mut stdin) = pager.stdin.take() {
        if let Err(e) = stdin.write_all(content.as_bytes()) {
            // Broken pipe is common if the user quits the pager early
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                error!("error writing to pager: {}", e);
            }
        }
    }

    let _ = pager.wait();
}

fn print_table<R: Tabled>(rows: Vec<R>, empty: &str) {
    if rows.is_empty() {
        println!("{}", empty);
        return;
    }
    let long = rows.len() > 20;
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.with(tabled::settings::Alignment::left());
    if long {
        paginate(table.to_string());
    } else {
        println!("{}", table);
    }
}

fn print_quote(quote: &Quote) {
    print_table(
        quote
            .lines
            .iter()
            .map(|l| QuoteRow {
                seat: l.seat_id,
                hourly: l.hourly_price,
                total: l.line_total,
            })
            .collect::<Vec<_>>(),
        "Nothing to price.",
    );
    println!("Total: {}", quote.total.to_string().bold());
}

fn parse_date(s: &str) -> Result<NaiveDate, BookingError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| BookingError::validation("date", format!("'{}' is not YYYY-MM-DD", s)))
}

fn parse_number<T: std::str::FromStr>(field: &'static str, s: &str) -> Result<T, BookingError> {
    s.parse::<T>()
        .map_err(|_| BookingError::validation(field, format!("'{}' is not a number", s)))
}

fn parse_seats(s: &str) -> Result<Vec<SeatId>, BookingError> {
    s.split(',')
        .filter(|p| !p.is_empty())
        .map(|p| parse_number("seat_ids", p.trim()))
        .collect()
}

struct Session {
    engine: BookingEngine,
    save_path: PathBuf,
    today: Option<NaiveDate>,
    now: Option<Time>,
    pending_shrink: Option<ShrinkWarning>,
}

impl Session {
    fn clock(&self) -> Moment {
        let system = Moment::now();
        Moment::new(self.today.unwrap_or(system.date), self.now.unwrap_or(system.time))
    }

    /// Parses date/time/hours the way the checkout form does: a start earlier
    /// than now on today's date is pulled forward to now.
    fn slot(&self, date: &str, time: &str, hours: &str) -> Result<Slot, BookingError> {
        let date = parse_date(date)?;
        let requested = time.parse::<Time>()?;
        let start = Time::clamp_not_before_now(date, requested, self.clock());
        if start != requested {
            println!("Start moved to {} (cannot start in the past).", start.to_12_hour());
        }
        Slot::new(date, start, parse_number("duration_hours", hours)?)
    }

    fn venues(&self) {
        let rows = self
            .engine
            .venues()
            .iter()
            .map(|v| VenueRow {
                id: v.id.to_string(),
                name: v.name.clone(),
                capacity: v.capacity,
                price: v.default_hourly_price,
                bookings: v.seats.iter().map(|s| s.bookings.len()).sum(),
            })
            .collect();
        print_table::<VenueRow>(rows, "No venues loaded.");
    }

    fn add_venue(&self, id: &str, capacity: &str, price: &str, name: &str) -> Result<(), BookingError> {
        let capacity = parse_number("capacity", capacity)?;
        let price = price.parse::<Price>()?;
        let name = if name.is_empty() { id } else { name };
        self.engine.add_venue(Venue::new(id, name, capacity, price))?;
        info!(venue = id, capacity, "venue added");
        println!("Venue {} added with {} seats.", id, capacity);
        Ok(())
    }

    fn seats(&self, venue: &str, date: &str, time: &str, hours: &str) -> Result<(), BookingError> {
        let slot = self.slot(date, time, hours)?;
        let statuses = self.engine.seat_statuses(venue, slot)?;
        let free = statuses.iter().filter(|s| s.is_available()).count();
        println!("Seats at {} for {} {} ({} of {} free):", venue, slot.date, slot.interval(), free, statuses.len());
        print_table(statuses.iter().map(SeatRow::from).collect::<Vec<_>>(), "Venue has no seats.");
        Ok(())
    }

    fn request(&self, date: &str, time: &str, hours: &str, seats: &str) -> Result<ReservationRequest, BookingError> {
        let slot = self.slot(date, time, hours)?;
        ReservationRequest::new(parse_seats(seats)?, slot.date, slot.start_time, slot.duration_hours)
    }

    fn price(&self, venue: &str, date: &str, time: &str, hours: &str, seats: &str) -> Result<(), BookingError> {
        let request = self.request(date, time, hours, seats)?;
        let quote = self.engine.price(venue, &request)?;
        print_quote(&quote);
        Ok(())
    }

    fn reserve(&self, venue: &str, date: &str, time: &str, hours: &str, seats: &str, who: &str) -> Result<(), BookingError> {
        let request = self.request(date, time, hours, seats)?;
        let reservation = self.engine.reserve(venue, &request, CreatedBy::Customer, Some(who))?;
        info!(
            venue,
            who,
            seats = reservation.bookings.len(),
            total = %reservation.quote.total,
            "reservation confirmed"
        );
        for (seat_id, booking) in &reservation.bookings {
            println!("Seat {} booked {} on {} ({}).", seat_id, booking.interval(), booking.date, booking.id);
        }
        print_quote(&reservation.quote);
        Ok(())
    }

    fn book(&self, venue: &str, seat: &str, date: &str, time: &str, hours: &str) -> Result<(), BookingError> {
        let slot = self.slot(date, time, hours)?;
        let seat_id = parse_number("seat_id", seat)?;
        let booking = self.engine.create_booking(venue, seat_id, slot, CreatedBy::Owner, None)?;
        info!(venue, seat_id, id = booking.id.0, "owner booking added");
        println!("Seat {} booked {} on {} ({}).", seat_id, booking.interval(), booking.date, booking.id);
        Ok(())
    }

    fn cancel(&self, venue: &str, seat: &str, id: &str) -> Result<(), BookingError> {
        let seat_id = parse_number("seat_id", seat)?;
        let booking_id = booking::BookingId(parse_number("booking_id", id.trim_start_matches('#'))?);
        let removed = self.engine.cancel_booking(venue, seat_id, booking_id)?;
        info!(venue, seat_id, id = removed.id.0, "booking cancelled");
        println!("Cancelled {} on seat {} ({} {}).", removed.id, seat_id, removed.date, removed.interval());
        Ok(())
    }

    fn upcoming(&self, venue: &str) -> Result<(), BookingError> {
        let views = self.engine.list_upcoming(venue, self.clock())?;
        print_table(views.iter().map(BookingRow::from).collect::<Vec<_>>(), "No upcoming bookings.");
        Ok(())
    }

    fn history(&self, who: &str) {
        let views = self.engine.bookings_by_identity(who);
        print_table(views.iter().map(BookingRow::from).collect::<Vec<_>>(), "No bookings for that person.");
    }

    fn all(&self) {
        let views = self.engine.all_bookings();
        print_table(views.iter().map(BookingRow::from).collect::<Vec<_>>(), "No bookings stored.");
    }

    fn seat_price(&self, venue: &str, seat: &str, price: &str) -> Result<(), BookingError> {
        let seat_id = parse_number("seat_id", seat)?;
        let price = match price {
            "default" | "-" => None,
            p => Some(p.parse::<Price>()?),
        };
        self.engine.set_seat_price(venue, seat_id, price)?;
        match price {
            Some(p) => println!("Seat {} now costs {}/hr.", seat_id, p),
            None => println!("Seat {} now follows the venue base price.", seat_id),
        }
        Ok(())
    }

    fn resize(&mut self, venue: &str, capacity: &str, confirm: bool) -> Result<(), BookingError> {
        let capacity = parse_number("capacity", capacity)?;
        let acknowledged = if confirm { self.pending_shrink.as_ref() } else { None };
        let outcome = self.engine.resize_capacity(venue, capacity, self.clock(), acknowledged)?;
        match outcome {
            ResizeOutcome::Applied {
                from,
                to,
                removed_seats,
                discarded_bookings,
            } => {
                self.pending_shrink = None;
                info!(venue, from, to, discarded_bookings, "capacity changed");
                println!("Capacity {} -> {}.", from, to);
                if !removed_seats.is_empty() {
                    println!(
                        "Removed seats {:?} with {} booking(s).",
                        removed_seats, discarded_bookings
                    );
                }
            }
            ResizeOutcome::ConfirmationRequired(warning) => {
                warn!(venue, to = warning.to, at_risk = warning.at_risk.len(), "shrink needs confirmation");
                println!(
                    "{}",
                    format!(
                        "Shrinking {} from {} to {} seats would discard {} upcoming booking(s):",
                        warning.venue_id,
                        warning.from,
                        warning.to,
                        warning.at_risk.len()
                    )
                    .yellow()
                    .bold()
                );
                print_table(warning.at_risk.iter().map(BookingRow::from).collect::<Vec<_>>(), "");
                println!("Run `resize {} {} confirm` to proceed.", warning.venue_id, warning.to);
                self.pending_shrink = Some(warning);
            }
        }
        Ok(())
    }

    fn save(&self) {
        match self.engine.save_to_file(&self.save_path) {
            Ok(()) => {
                info!(path = %self.save_path.display(), "scenario saved");
                println!("Saved to {}.", self.save_path.display());
            }
            Err(e) => {
                error!(path = %self.save_path.display(), "save failed: {}", e);
                println!("{}", format!("Save failed: {}", e).red());
            }
        }
    }
}

fn report(result: Result<(), BookingError>) {
    if let Err(e) = result {
        warn!(kind = %e.kind(), "{}", e);
        println!("{} {}", format!("[{}]", e.kind()).red().bold(), e);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.log))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let engine = BookingEngine::load_from_file(&args.scenario)?;
    info!(path = %args.scenario.display(), venues = engine.venue_ids().len(), "scenario loaded");
    println!("Booking desk open. Loaded venues from {}", args.scenario.display());

    let mut session = Session {
        engine,
        save_path: args.save.clone().unwrap_or_else(|| args.scenario.clone()),
        today: args.today,
        now: args.now,
        pending_shrink: None,
    };

    let config = rustyline::Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();

    let helper = CompleteHelper {
        commands: [
            "venues", "addvenue", "seats", "price", "reserve", "book", "cancel", "ls", "history", "all",
            "label", "seatprice", "baseprice", "applyprice", "resize", "save", "help", "exit",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect(),
    };

    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(helper));

    loop {
        let readline = rl.readline(">> ");
        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() { continue; }

                rl.add_history_entry(trimmed)?;
                debug!(command = trimmed, "received");

                let parts: Vec<&str> = trimmed.split_whitespace().collect();
                match parts[0] {
                    "venues" => session.venues(),
                    "addvenue" => {
                        if let (Some(v), Some(n), Some(p)) = (parts.get(1), parts.get(2), parts.get(3)) {
                            let name = parts[4..].join(" ");
                            report(session.add_venue(v, n, p, &name));
                        } else {
                            println!("Usage: addvenue <id> <capacity> <price> [name]");
                        }
                    },
                    "seats" => {
                        if let (Some(v), Some(d), Some(t), Some(h)) = (parts.get(1), parts.get(2), parts.get(3), parts.get(4)) {
                            report(session.seats(v, d, t, h));
                        } else {
                            println!("Usage: seats <venue> <date> <time> <hours>");
                        }
                    },
                    "price" => {
                        if let (Some(v), Some(d), Some(t), Some(h), Some(s)) = (parts.get(1), parts.get(2), parts.get(3), parts.get(4), parts.get(5)) {
                            report(session.price(v, d, t, h, s));
                        } else {
                            println!("Usage: price <venue> <date> <time> <hours> <seat,seat,...>");
                        }
                    },
                    "reserve" => {
                        if let (Some(v), Some(d), Some(t), Some(h), Some(s), Some(w)) = (parts.get(1), parts.get(2), parts.get(3), parts.get(4), parts.get(5), parts.get(6)) {
                            report(session.reserve(v, d, t, h, s, w));
                        } else {
                            println!("Usage: reserve <venue> <date> <time> <hours> <seat,seat,...> <who>");
                        }
                    },
                    "book" => {
                        if let (Some(v), Some(s), Some(d), Some(t), Some(h)) = (parts.get(1), parts.get(2), parts.get(3), parts.get(4), parts.get(5)) {
                            report(session.book(v, s, d, t, h));
                        } else {
                            println!("Usage: book <venue> <seat> <date> <time> <hours>");
                        }
                    },
                    "cancel" => {
                        if let (Some(v), Some(s), Some(id)) = (parts.get(1), parts.get(2), parts.get(3)) {
                            report(session.cancel(v, s, id));
                        } else {
                            println!("Usage: cancel <venue> <seat> <booking_id>");
                        }
                    },
                    "ls" => {
                        if let Some(v) = parts.get(1) {
                            report(session.upcoming(v));
                        } else {
                            println!("Usage: ls <venue>");
                        }
                    },
                    "history" => {
                        if let Some(w) = parts.get(1) {
                            session.history(w);
                        } else {
                            println!("Usage: history <who>");
                        }
                    },
                    "all" => session.all(),
                    "label" => {
                        if let (Some(v), Some(s)) = (parts.get(1), parts.get(2)) {
                            let text = parts[3..].join(" ");
                            report(parse_number("seat_id", s).and_then(|seat_id| session.engine.set_seat_label(v, seat_id, &text)));
                        } else {
                            println!("Usage: label <venue> <seat> <text>");
                        }
                    },
                    "seatprice" => {
                        if let (Some(v), Some(s), Some(p)) = (parts.get(1), parts.get(2), parts.get(3)) {
                            report(session.seat_price(v, s, p));
                        } else {
                            println!("Usage: seatprice <venue> <seat> <price|default>");
                        }
                    },
                    "baseprice" => {
                        if let (Some(v), Some(p)) = (parts.get(1), parts.get(2)) {
                            report(p.parse::<Price>().and_then(|price| session.engine.set_default_price(v, price)));
                        } else {
                            println!("Usage: baseprice <venue> <price>");
                        }
                    },
                    "applyprice" => {
                        if let Some(v) = parts.get(1) {
                            report(session.engine.apply_default_price_to_all_seats(v).map(|()| {
                                println!("Base price applied to all seats of {}.", v);
                            }));
                        } else {
                            println!("Usage: applyprice <venue>");
                        }
                    },
                    "resize" => {
                        if let (Some(v), Some(n)) = (parts.get(1), parts.get(2)) {
                            let confirm = parts.get(3).is_some_and(|c| *c == "confirm");
                            report(session.resize(v, n, confirm));
                        } else {
                            println!("Usage: resize <venue> <capacity> [confirm]");
                        }
                    },
                    "save" => session.save(),
                    "help" | "?" => {
                        println!("\nAvailable Commands:");
                        println!("  venues                                  - List venues");
                        println!("  addvenue <id> <n> <price> [name]        - Create a venue with n seats");
                        println!("  seats <venue> <date> <time> <h>         - Seat grid for a window (free / booked)");
                        println!("  price <venue> <date> <time> <h> <s,..>  - Quote a multi-seat reservation");
                        println!("  reserve <venue> <date> <time> <h> <s,..> <who>");
                        println!("                                          - Customer checkout, all seats or none");
                        println!("  book <venue> <seat> <date> <time> <h>   - Owner booking on one seat");
                        println!("  cancel <venue> <seat> <id>              - Cancel a booking by id");
                        println!("  ls <venue>                              - Upcoming bookings");
                        println!("  history <who>                           - Bookings made by a customer");
                        println!("  all                                     - Every stored booking");
                        println!("  label <venue> <seat> <text>             - Set a seat label");
                        println!("  seatprice <venue> <seat> <price|default>- Override or clear a seat price");
                        println!("  baseprice <venue> <price>               - Set the venue base price");
                        println!("  applyprice <venue>                      - Copy the base price onto every seat");
                        println!("  resize <venue> <n> [confirm]            - Change capacity");
                        println!("  save                                    - Write venues back to disk");
                        println!("  help / ?                                - Show this help menu");
                        println!("  exit / quit                             - Exit\n");
                        println!("Dates are YYYY-MM-DD; times are 13:30 or 1:30pm.");
                    },
                    "exit" | "quit" => break,
                    _ => println!("Unknown command: {}", parts[0]),
                }
            },
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            },
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            },
            Err(err) => {
                error!("readline failed: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}
