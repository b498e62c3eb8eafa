use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::AuthUser;
use crate::core::validate::validate_date_range;
use crate::core::{
    aggregate, compute_statistics, AggregateOptions, CancelToken, CoreError, DaySummary,
    PeriodStatistics,
};
use crate::error::{AppError, AppResult};
use crate::models::sleep_record::SleepRecord;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_sleep_hours: f64,
    pub average_sleep_hours: Option<f64>,
    pub average_score: Option<f64>,
    pub target_achievement_rate: Option<f64>,
    pub days_with_data: u32,
    pub recent_days: Vec<DaySummary>,
}

/// Period statistics for an arbitrary range, defaulting to the trailing
/// 30 days.
pub async fn get_statistics(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<StatisticsQuery>,
) -> AppResult<Json<PeriodStatistics>> {
    let end = query.end_date.unwrap_or_else(|| Utc::now().date_naive());
    let start = query.start_date.unwrap_or(end - Duration::days(29));
    let stats = statistics_for_range(&state, &auth_user, start, end).await?;
    Ok(Json(stats))
}

/// Trailing 7 days.
pub async fn get_weekly_statistics(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<PeriodStatistics>> {
    let end = Utc::now().date_naive();
    let start = end - Duration::days(6);
    let stats = statistics_for_range(&state, &auth_user, start, end).await?;
    Ok(Json(stats))
}

/// Trailing calendar month.
pub async fn get_monthly_statistics(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<PeriodStatistics>> {
    let end = Utc::now().date_naive();
    let start = end
        .checked_sub_months(Months::new(1))
        .unwrap_or(end - Duration::days(30));
    let stats = statistics_for_range(&state, &auth_user, start, end).await?;
    Ok(Json(stats))
}

/// Dashboard rollup of the trailing week.
pub async fn dashboard_summary(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<DashboardSummary>> {
    let end = Utc::now().date_naive();
    let start = end - Duration::days(6);

    let records = fetch_user_records(&state, &auth_user, start, end).await?;
    let states = crate::handlers::records::load_states(&state).await?;
    let meal_types = crate::handlers::records::load_meal_types(&state).await?;
    let preference =
        crate::handlers::preferences::fetch_preference(&state, auth_user.id).await?;
    let goal_hours = preference.goal_hours();

    let summaries = aggregate(
        &records,
        &states,
        &meal_types,
        AggregateOptions { goal_hours },
        &CancelToken::new(),
    )?;

    let days: Vec<DaySummary> = summaries.into_values().collect();
    let stats = compute_statistics(&days, None, start, end, goal_hours);
    let total_sleep_hours = days.iter().map(|d| d.sleep_duration_hours).sum();

    // most recent first
    let mut recent_days = days;
    recent_days.reverse();

    Ok(Json(DashboardSummary {
        start_date: start,
        end_date: end,
        total_sleep_hours,
        average_sleep_hours: stats.summary.average_duration_hours,
        average_score: stats.summary.average_score,
        target_achievement_rate: stats.summary.target_achievement_rate,
        days_with_data: stats.summary.days_with_data,
        recent_days,
    }))
}

/// Shared statistics path: fetches the requested window plus the
/// immediately preceding window of equal length as the trend baseline,
/// then aggregates off the async runtime under a cancellation watchdog.
async fn statistics_for_range(
    state: &AppState,
    auth_user: &AuthUser,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<PeriodStatistics> {
    validate_date_range(start, end, state.config.max_range_days)?;

    let period_days = (end - start).num_days() + 1;
    let baseline_start = start - Duration::days(period_days);

    let records = fetch_user_records(state, auth_user, baseline_start, end).await?;
    let states = crate::handlers::records::load_states(state).await?;
    let meal_types = crate::handlers::records::load_meal_types(state).await?;
    let preference =
        crate::handlers::preferences::fetch_preference(state, auth_user.id).await?;
    let goal_hours = preference.goal_hours();

    let cancel = CancelToken::new();
    let watchdog = cancel.clone();
    let deadline = std::time::Duration::from_secs(state.config.statistics_timeout_secs);
    tokio::spawn(async move {
        tokio::time::sleep(deadline).await;
        watchdog.cancel();
    });

    let stats = tokio::task::spawn_blocking(move || -> Result<PeriodStatistics, CoreError> {
        let summaries = aggregate(
            &records,
            &states,
            &meal_types,
            AggregateOptions { goal_hours },
            &cancel,
        )?;
        let (current, baseline): (Vec<DaySummary>, Vec<DaySummary>) =
            summaries.into_values().partition(|d| d.date >= start);
        Ok(compute_statistics(
            &current,
            Some(&baseline),
            start,
            end,
            goal_hours,
        ))
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("statistics task failed: {e}")))??;

    Ok(stats)
}

async fn fetch_user_records(
    state: &AppState,
    auth_user: &AuthUser,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<Vec<SleepRecord>> {
    let records = sqlx::query_as::<_, SleepRecord>(
        r#"
        SELECT * FROM sleep_records
        WHERE user_id = $1 AND record_date BETWEEN $2 AND $3 AND deleted_at IS NULL
        ORDER BY record_date ASC, time_slot ASC
        "#,
    )
    .bind(auth_user.id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;
    Ok(records)
}
