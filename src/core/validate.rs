use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::core::error::{ReferenceError, ValidationError};
use crate::core::slot;
use crate::models::meal_type::MealType;
use crate::models::sleep_record::RecordKind;
use crate::models::sleep_state::SleepState;

/// Unvalidated record fields as they arrive at the CRUD boundary.
///
/// The kind is still a raw string at this point: the boundary accepts
/// whatever the client sent and the specific `InvalidRecordType` error
/// comes from here, not from serde.
#[derive(Debug, Clone)]
pub struct RecordDraft<'a> {
    pub record_date: Option<NaiveDate>,
    pub time_slot: Option<NaiveTime>,
    pub kind: Option<&'a str>,
    pub sleep_state_id: Option<i64>,
    pub meal_type_id: Option<i64>,
}

/// Checks a draft against the record invariants and returns the parsed
/// kind. Called before any SQL on create and update.
pub fn validate_record(draft: &RecordDraft<'_>) -> Result<RecordKind, ValidationError> {
    if draft.record_date.is_none() {
        return Err(ValidationError::InvalidDate);
    }

    match draft.time_slot {
        Some(t) if slot::is_valid_slot(t) => {}
        _ => return Err(ValidationError::InvalidTimeSlot),
    }

    let kind = draft
        .kind
        .and_then(RecordKind::parse)
        .ok_or(ValidationError::InvalidRecordType)?;

    if kind.requires_state() && !matches!(draft.sleep_state_id, Some(id) if id > 0) {
        return Err(ValidationError::InvalidSleepState);
    }

    Ok(kind)
}

/// Confirms that every master-data reference on a draft resolves.
pub fn validate_references(
    kind: RecordKind,
    sleep_state_id: Option<i64>,
    meal_type_id: Option<i64>,
    states: &HashMap<i64, SleepState>,
    meal_types: &HashMap<i64, MealType>,
) -> Result<(), ReferenceError> {
    if kind.requires_state() {
        if let Some(id) = sleep_state_id {
            if !states.contains_key(&id) {
                return Err(ReferenceError::UnknownState(id));
            }
        }
    }
    if let Some(id) = meal_type_id {
        if !meal_types.contains_key(&id) {
            return Err(ReferenceError::UnknownMealType(id));
        }
    }
    Ok(())
}

/// Same-day event windows: start must not follow end, and the window must
/// not span more than 24 hours.
pub fn validate_time_range(start: NaiveDateTime, end: NaiveDateTime) -> Result<(), ValidationError> {
    if start > end {
        return Err(ValidationError::InvertedRange);
    }
    if end - start > Duration::hours(24) {
        return Err(ValidationError::RangeTooLong);
    }
    Ok(())
}

/// Diary and statistics date ranges: non-inverted and capped at
/// `max_days` (configuration decides the cap).
pub fn validate_date_range(
    start: NaiveDate,
    end: NaiveDate,
    max_days: i64,
) -> Result<(), ValidationError> {
    if start > end {
        return Err(ValidationError::InvertedRange);
    }
    if end - start > Duration::days(max_days) {
        return Err(ValidationError::RangeTooLong);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> RecordDraft<'static> {
        RecordDraft {
            record_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            time_slot: NaiveTime::from_hms_opt(23, 30, 0),
            kind: Some("STATE"),
            sleep_state_id: Some(1),
            meal_type_id: None,
        }
    }

    #[test]
    fn test_valid_state_draft_passes() {
        assert_eq!(validate_record(&draft()), Ok(RecordKind::State));
    }

    #[test]
    fn test_missing_date_is_invalid_date() {
        let mut d = draft();
        d.record_date = None;
        assert_eq!(validate_record(&d), Err(ValidationError::InvalidDate));
    }

    #[test]
    fn test_quarter_hour_slot_is_invalid_time_slot() {
        let mut d = draft();
        d.time_slot = NaiveTime::from_hms_opt(10, 15, 0);
        assert_eq!(validate_record(&d), Err(ValidationError::InvalidTimeSlot));
    }

    #[test]
    fn test_unknown_kind_is_invalid_record_type() {
        let mut d = draft();
        d.kind = Some("NAP");
        assert_eq!(validate_record(&d), Err(ValidationError::InvalidRecordType));
        d.kind = None;
        assert_eq!(validate_record(&d), Err(ValidationError::InvalidRecordType));
    }

    #[test]
    fn test_state_without_reference_is_invalid_sleep_state() {
        let mut d = draft();
        d.sleep_state_id = None;
        assert_eq!(validate_record(&d), Err(ValidationError::InvalidSleepState));
        d.sleep_state_id = Some(0);
        assert_eq!(validate_record(&d), Err(ValidationError::InvalidSleepState));
    }

    #[test]
    fn test_meal_without_state_reference_passes() {
        let mut d = draft();
        d.kind = Some("MEAL");
        d.sleep_state_id = None;
        d.meal_type_id = Some(2);
        assert_eq!(validate_record(&d), Ok(RecordKind::Meal));
    }

    #[test]
    fn test_inverted_time_range() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(
            validate_time_range(start, end),
            Err(ValidationError::InvertedRange)
        );
    }

    #[test]
    fn test_time_range_longer_than_a_day() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let end = start + Duration::hours(25);
        assert_eq!(
            validate_time_range(start, end),
            Err(ValidationError::RangeTooLong)
        );
        // exactly 24h is allowed
        assert_eq!(validate_time_range(start, start + Duration::hours(24)), Ok(()));
    }

    #[test]
    fn test_date_range_cap() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(validate_date_range(start, end, 366), Ok(()));
        assert_eq!(
            validate_date_range(start, end, 30),
            Err(ValidationError::RangeTooLong)
        );
        assert_eq!(
            validate_date_range(end, start, 366),
            Err(ValidationError::InvertedRange)
        );
    }

    #[test]
    fn test_reference_checks() {
        use crate::models::meal_type::MealType;
        use crate::models::sleep_state::SleepState;

        let states: HashMap<i64, SleepState> = SleepState::defaults()
            .into_iter()
            .map(|s| (s.id, s))
            .collect();
        let meals: HashMap<i64, MealType> = MealType::defaults()
            .into_iter()
            .map(|m| (m.id, m))
            .collect();

        assert_eq!(
            validate_references(RecordKind::State, Some(1), None, &states, &meals),
            Ok(())
        );
        assert_eq!(
            validate_references(RecordKind::State, Some(99), None, &states, &meals),
            Err(ReferenceError::UnknownState(99))
        );
        assert_eq!(
            validate_references(RecordKind::Meal, None, Some(42), &states, &meals),
            Err(ReferenceError::UnknownMealType(42))
        );
    }
}
