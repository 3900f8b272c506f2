use chrono::{Datelike, Duration, NaiveDate, NaiveTime};

use shared_models::clinic::{AvailableSlot, TimeSlot};

pub const SLOT_MINUTES: i64 = 30;

/// Accepts `HH:MM:SS` (Postgres `time`) as well as `HH:MM`.
pub fn parse_wall_clock(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// 0 = Sunday .. 6 = Saturday.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Splits every available slot that falls on `date`'s weekday into
/// 30-minute bookable intervals.
pub fn expand_slots(date: NaiveDate, slots: &[TimeSlot]) -> Vec<AvailableSlot> {
    let weekday = day_of_week(date);
    let step = Duration::minutes(SLOT_MINUTES);
    let mut available = Vec::new();

    for slot in slots.iter().filter(|s| s.is_available && s.day_of_week == weekday) {
        let (Some(start), Some(end)) = (parse_wall_clock(&slot.start_time), parse_wall_clock(&slot.end_time)) else {
            continue;
        };

        let mut current = start;
        while current < end {
            available.push(AvailableSlot {
                time: current.format("%H:%M").to_string(),
                available: true,
            });

            let (next, wrapped) = current.overflowing_add_signed(step);
            if wrapped != 0 {
                break;
            }
            current = next;
        }
    }

    available
}
