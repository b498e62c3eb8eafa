use chrono::{NaiveTime, Timelike};

use crate::core::error::ValidationError;

/// Half-hour buckets per day. Index 0 covers 00:00–00:29.
pub const SLOTS_PER_DAY: usize = 48;

/// A time-of-day is a valid slot iff it sits exactly on a half-hour
/// boundary. Non-zero seconds (or sub-second parts) are invalid even when
/// the minute component is 0 or 30.
pub fn is_valid_slot(t: NaiveTime) -> bool {
    (t.minute() == 0 || t.minute() == 30) && t.second() == 0 && t.nanosecond() == 0
}

/// Maps a valid slot time to its bucket index in `[0, 48)`.
///
/// This is the single gate every record passes through before it reaches
/// the grid: creation, update and aggregation all reject misaligned times
/// here.
pub fn slot_index(t: NaiveTime) -> Result<usize, ValidationError> {
    if !is_valid_slot(t) {
        return Err(ValidationError::InvalidTimeSlot);
    }
    Ok(t.hour() as usize * 2 + usize::from(t.minute() == 30))
}

/// Inverse of `slot_index`. The index is taken modulo 48 so callers can
/// hand in an exclusive run end (e.g. 48 wraps to 00:00).
pub fn slot_start(index: usize) -> NaiveTime {
    let index = index % SLOTS_PER_DAY;
    let hour = (index / 2) as u32;
    let minute = (index % 2) as u32 * 30;
    // hour < 24 and minute in {0, 30}, so this cannot fail
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn test_valid_slots_round_trip_and_are_injective() {
        let mut seen = [false; SLOTS_PER_DAY];
        for hour in 0..24 {
            for minute in [0, 30] {
                let t = hm(hour, minute);
                assert!(is_valid_slot(t));
                let idx = slot_index(t).unwrap();
                assert!(idx < SLOTS_PER_DAY);
                assert!(!seen[idx], "index {} produced twice", idx);
                seen[idx] = true;
                assert_eq!(slot_start(idx), t);
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_minutes_off_boundary_are_invalid() {
        for minute in 0..60 {
            let t = hm(12, minute);
            assert_eq!(is_valid_slot(t), minute == 0 || minute == 30);
        }
        assert_eq!(slot_index(hm(9, 15)), Err(ValidationError::InvalidTimeSlot));
    }

    #[test]
    fn test_nonzero_seconds_are_invalid() {
        let t = NaiveTime::from_hms_opt(7, 30, 1).unwrap();
        assert!(!is_valid_slot(t));
        assert_eq!(slot_index(t), Err(ValidationError::InvalidTimeSlot));
    }

    #[test]
    fn test_slot_start_wraps_past_midnight() {
        assert_eq!(slot_start(48), hm(0, 0));
        assert_eq!(slot_start(49), hm(0, 30));
        assert_eq!(slot_start(46), hm(23, 0));
    }
}
