use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::core::{aggregate, AggregateOptions, CancelToken, DaySummary};
use crate::core::validate::validate_date_range;
use crate::error::AppResult;
use crate::models::sleep_record::SleepRecord;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GridQuery {
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
}

/// Returns one `DaySummary` per day that has records in the requested
/// window, defaulting to the diary's own date range.
pub async fn get_diary_grid(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(diary_id): Path<Uuid>,
    Query(query): Query<GridQuery>,
) -> AppResult<Json<Vec<DaySummary>>> {
    let diary =
        crate::handlers::diaries::fetch_owned_diary(&state, auth_user.id, diary_id).await?;

    let start = query.start_date.unwrap_or(diary.start_date);
    let end = query.end_date.unwrap_or(diary.end_date);
    validate_date_range(start, end, state.config.max_range_days)?;

    let records = sqlx::query_as::<_, SleepRecord>(
        r#"
        SELECT * FROM sleep_records
        WHERE diary_id = $1 AND record_date BETWEEN $2 AND $3 AND deleted_at IS NULL
        ORDER BY record_date ASC, time_slot ASC
        "#,
    )
    .bind(diary.id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    let states = crate::handlers::records::load_states(&state).await?;
    let meal_types = crate::handlers::records::load_meal_types(&state).await?;
    let preference =
        crate::handlers::preferences::fetch_preference(&state, auth_user.id).await?;

    let summaries = aggregate(
        &records,
        &states,
        &meal_types,
        AggregateOptions {
            goal_hours: preference.goal_hours(),
        },
        &CancelToken::new(),
    )?;

    Ok(Json(summaries.into_values().collect()))
}
