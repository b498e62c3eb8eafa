use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Stable codes for the meal-type master table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "meal_type_code", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MealTypeCode {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealTypeCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealTypeCode::Breakfast => "BREAKFAST",
            MealTypeCode::Lunch => "LUNCH",
            MealTypeCode::Dinner => "DINNER",
            MealTypeCode::Snack => "SNACK",
        }
    }
}

/// Master row describing one meal type, same shape as `SleepState`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MealType {
    pub id: i64,
    pub type_name: String,
    pub type_code: MealTypeCode,
    pub display_symbol: String,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl MealType {
    /// The seeded master rows, ids matching the migration.
    pub fn defaults() -> Vec<MealType> {
        let row = |id, name: &str, code, symbol: &str, order| MealType {
            id,
            type_name: name.to_string(),
            type_code: code,
            display_symbol: symbol.to_string(),
            display_order: order,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };
        vec![
            row(1, "Breakfast", MealTypeCode::Breakfast, "▲", 1),
            row(2, "Lunch", MealTypeCode::Lunch, "●", 2),
            row(3, "Dinner", MealTypeCode::Dinner, "■", 3),
            row(4, "Snack", MealTypeCode::Snack, "○", 4),
        ]
    }
}
