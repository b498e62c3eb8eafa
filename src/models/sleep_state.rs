use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Stable codes for the sleep-state master table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "sleep_state_code", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SleepStateCode {
    Sleeping,
    AwakeInBed,
    Awake,
    Drowsiness,
    Medication,
}

impl SleepStateCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SleepStateCode::Sleeping => "SLEEPING",
            SleepStateCode::AwakeInBed => "AWAKE_IN_BED",
            SleepStateCode::Awake => "AWAKE",
            SleepStateCode::Drowsiness => "DROWSINESS",
            SleepStateCode::Medication => "MEDICATION",
        }
    }
}

/// Master row describing one sleep state. Reference data, seeded by
/// migration; rows are soft-deleted, never removed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SleepState {
    pub id: i64,
    pub state_name: String,
    pub state_code: SleepStateCode,
    pub state_description: Option<String>,
    pub display_symbol: String,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SleepState {
    /// The seeded master rows, ids matching the migration. Handy for
    /// building lookup maps in tests without a database.
    pub fn defaults() -> Vec<SleepState> {
        let row = |id, name: &str, code, symbol: &str, order| SleepState {
            id,
            state_name: name.to_string(),
            state_code: code,
            state_description: None,
            display_symbol: symbol.to_string(),
            display_order: order,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };
        vec![
            row(1, "Sleeping", SleepStateCode::Sleeping, "■", 1),
            row(2, "Awake in bed", SleepStateCode::AwakeInBed, "╱", 2),
            row(3, "Awake", SleepStateCode::Awake, "□", 3),
            row(4, "Drowsiness", SleepStateCode::Drowsiness, "Z", 4),
            row(5, "Medication", SleepStateCode::Medication, "×", 5),
        ]
    }
}
