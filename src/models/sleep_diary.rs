use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A named date range owning a user's sleep records.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SleepDiary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub diary_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SleepDiary {
    /// Number of calendar days the diary covers, both ends inclusive.
    pub fn total_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSleepDiaryRequest {
    #[validate(length(min = 1, max = 100, message = "Diary name must be 1-100 characters"))]
    pub diary_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSleepDiaryRequest {
    #[validate(length(min = 1, max = 100, message = "Diary name must be 1-100 characters"))]
    pub diary_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_days_is_inclusive() {
        let diary = SleepDiary {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            diary_name: "February".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 2, 7).unwrap(),
            note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };
        assert_eq!(diary.total_days(), 7);
    }
}
