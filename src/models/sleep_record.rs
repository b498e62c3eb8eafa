use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// What a record means for its slot: STATE occupies the slot exclusively,
/// EVENT and MEAL annotate it without displacing the state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "record_kind", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordKind {
    State,
    Event,
    Meal,
}

impl RecordKind {
    /// Parses the wire form (`STATE` / `EVENT` / `MEAL`). The boundary
    /// keeps the kind as a string until validation so a bad value maps to
    /// `InvalidRecordType` rather than a serde failure.
    pub fn parse(s: &str) -> Option<RecordKind> {
        match s {
            "STATE" => Some(RecordKind::State),
            "EVENT" => Some(RecordKind::Event),
            "MEAL" => Some(RecordKind::Meal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::State => "STATE",
            RecordKind::Event => "EVENT",
            RecordKind::Meal => "MEAL",
        }
    }

    /// STATE and EVENT records must reference a sleep state; MEAL records
    /// reference a meal type instead (optionally).
    pub fn requires_state(&self) -> bool {
        matches!(self, RecordKind::State | RecordKind::Event)
    }
}

/// Soft-delete surfaced as a tagged state so callers cannot forget to
/// check the tombstone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Active,
    Deleted(DateTime<Utc>),
}

impl RecordStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, RecordStatus::Active)
    }
}

/// One logged sleep/wake/meal event on the half-hour grid.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SleepRecord {
    pub id: Uuid,
    pub diary_id: Uuid,
    pub user_id: Uuid,
    pub record_date: NaiveDate,
    pub time_slot: NaiveTime,
    pub kind: RecordKind,
    pub sleep_state_id: Option<i64>,
    pub meal_type_id: Option<i64>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SleepRecord {
    pub fn status(&self) -> RecordStatus {
        match self.deleted_at {
            None => RecordStatus::Active,
            Some(at) => RecordStatus::Deleted(at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSleepRecordRequest {
    pub diary_id: Uuid,
    pub record_date: Option<NaiveDate>,
    pub time_slot: Option<NaiveTime>,
    pub record_type: String,
    pub sleep_state_id: Option<i64>,
    pub meal_type_id: Option<i64>,
    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSleepRecordRequest {
    pub record_date: Option<NaiveDate>,
    pub time_slot: Option<NaiveTime>,
    pub record_type: Option<String>,
    pub sleep_state_id: Option<i64>,
    pub meal_type_id: Option<i64>,
    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordQuery {
    pub diary_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_kind_parse_round_trip() {
        for kind in [RecordKind::State, RecordKind::Event, RecordKind::Meal] {
            assert_eq!(RecordKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(RecordKind::parse("state"), None);
        assert_eq!(RecordKind::parse(""), None);
    }

    #[test]
    fn test_status_tags_tombstone() {
        let now = Utc::now();
        let mut record = SleepRecord {
            id: Uuid::new_v4(),
            diary_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            record_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            time_slot: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            kind: RecordKind::State,
            sleep_state_id: Some(1),
            meal_type_id: None,
            note: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        assert!(record.status().is_active());
        record.deleted_at = Some(now);
        assert_eq!(record.status(), RecordStatus::Deleted(now));
    }
}
