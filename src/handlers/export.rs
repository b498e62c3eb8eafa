use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Extension,
};
use axum::Json;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::core::validate::validate_date_range;
use crate::core::{
    aggregate, compute_statistics, AggregateOptions, CancelToken, DaySummary, PeriodStatistics,
};
use crate::error::AppResult;
use crate::models::meal_type::{MealType, MealTypeCode};
use crate::models::sleep_record::SleepRecord;
use crate::models::sleep_state::{SleepState, SleepStateCode};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Flat CSV of the user's records over the window, for spreadsheet use.
pub async fn export_records_csv(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ExportQuery>,
) -> AppResult<impl IntoResponse> {
    let end = query.end_date.unwrap_or_else(|| Utc::now().date_naive());
    let start = query.start_date.unwrap_or(end - Duration::days(29));
    validate_date_range(start, end, state.config.max_range_days)?;

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

    let states = crate::handlers::records::load_states(&state).await?;
    let meal_types = crate::handlers::records::load_meal_types(&state).await?;

    let csv = build_records_csv(&records, &states, &meal_types);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"sleep-records_{start}_{end}.csv\""),
            ),
        ],
        csv,
    ))
}

/// Everything the external PDF renderer needs for one printable diary:
/// per-day symbol rows plus period statistics. Typed payload, no
/// free-form maps.
#[derive(Debug, Serialize)]
pub struct PdfExportData {
    pub diary_id: Uuid,
    pub diary_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub goal_hours: f64,
    pub preferred_bedtime: NaiveTime,
    pub preferred_wakeup_time: NaiveTime,
    pub days: Vec<PdfDayRow>,
    pub statistics: PeriodStatistics,
}

#[derive(Debug, Serialize)]
pub struct PdfDayRow {
    pub date: NaiveDate,
    pub bed_time: Option<String>,
    pub wake_time: Option<String>,
    pub duration_hours: f64,
    pub score: Option<u8>,
    /// One display symbol per half-hour slot, 48 entries.
    pub slot_symbols: Vec<String>,
}

pub async fn export_diary_pdf_data(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(diary_id): Path<Uuid>,
) -> AppResult<Json<PdfExportData>> {
    let diary =
        crate::handlers::diaries::fetch_owned_diary(&state, auth_user.id, diary_id).await?;

    let records = sqlx::query_as::<_, SleepRecord>(
        r#"
        SELECT * FROM sleep_records
        WHERE diary_id = $1 AND record_date BETWEEN $2 AND $3 AND deleted_at IS NULL
        ORDER BY record_date ASC, time_slot ASC
        "#,
    )
    .bind(diary.id)
    .bind(diary.start_date)
    .bind(diary.end_date)
    .fetch_all(&state.db)
    .await?;

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

    let statistics =
        compute_statistics(&days, None, diary.start_date, diary.end_date, goal_hours);

    let state_symbols: HashMap<SleepStateCode, String> = states
        .values()
        .map(|s| (s.state_code, s.display_symbol.clone()))
        .collect();
    let meal_symbols: HashMap<MealTypeCode, String> = meal_types
        .values()
        .map(|m| (m.type_code, m.display_symbol.clone()))
        .collect();

    let day_rows = days
        .iter()
        .map(|day| PdfDayRow {
            date: day.date,
            bed_time: day.bed_time.map(|t| t.format("%H:%M").to_string()),
            wake_time: day.wake_time.map(|t| t.format("%H:%M").to_string()),
            duration_hours: day.sleep_duration_hours,
            score: day.score,
            slot_symbols: day
                .slots
                .iter()
                .map(|cell| slot_symbol(cell, &state_symbols, &meal_symbols))
                .collect(),
        })
        .collect();

    Ok(Json(PdfExportData {
        diary_id: diary.id,
        diary_name: diary.diary_name,
        start_date: diary.start_date,
        end_date: diary.end_date,
        generated_at: Utc::now(),
        goal_hours,
        preferred_bedtime: preference.preferred_bedtime,
        preferred_wakeup_time: preference.preferred_wakeup_time,
        days: day_rows,
        statistics,
    }))
}

/// State symbol wins, then the first event overlay, then the meal; blank
/// cells print as a space.
fn slot_symbol(
    cell: &crate::core::SlotCell,
    state_symbols: &HashMap<SleepStateCode, String>,
    meal_symbols: &HashMap<MealTypeCode, String>,
) -> String {
    if let Some(code) = cell.state {
        if let Some(symbol) = state_symbols.get(&code) {
            return symbol.clone();
        }
    }
    if let Some(code) = cell.events.first() {
        if let Some(symbol) = state_symbols.get(code) {
            return symbol.clone();
        }
    }
    if let Some(code) = cell.meal {
        if let Some(symbol) = meal_symbols.get(&code) {
            return symbol.clone();
        }
    }
    " ".to_string()
}

fn build_records_csv(
    records: &[SleepRecord],
    states: &HashMap<i64, SleepState>,
    meal_types: &HashMap<i64, MealType>,
) -> String {
    let mut csv = String::new();
    csv.push_str("record_date,time_slot,record_type,sleep_state,meal_type,note\n");
    for record in records {
        let state_code = record
            .sleep_state_id
            .and_then(|id| states.get(&id))
            .map(|s| s.state_code.as_str())
            .unwrap_or("");
        let meal_code = record
            .meal_type_id
            .and_then(|id| meal_types.get(&id))
            .map(|m| m.type_code.as_str())
            .unwrap_or("");
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            record.record_date,
            record.time_slot.format("%H:%M"),
            record.kind.as_str(),
            state_code,
            meal_code,
            csv_field(record.note.as_deref().unwrap_or("")),
        ));
    }
    csv
}

/// Quotes a field when it contains a separator, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sleep_record::RecordKind;

    fn record(note: Option<&str>) -> SleepRecord {
        SleepRecord {
            id: Uuid::from_u128(1),
            diary_id: Uuid::from_u128(2),
            user_id: Uuid::from_u128(3),
            record_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            time_slot: NaiveTime::from_hms_opt(23, 30, 0).unwrap(),
            kind: RecordKind::State,
            sleep_state_id: Some(1),
            meal_type_id: None,
            note: note.map(|n| n.to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn master() -> (HashMap<i64, SleepState>, HashMap<i64, MealType>) {
        (
            SleepState::defaults().into_iter().map(|s| (s.id, s)).collect(),
            MealType::defaults().into_iter().map(|m| (m.id, m)).collect(),
        )
    }

    #[test]
    fn test_csv_has_header_and_row() {
        let (states, meals) = master();
        let csv = build_records_csv(&[record(None)], &states, &meals);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("record_date,time_slot,record_type,sleep_state,meal_type,note")
        );
        assert_eq!(lines.next(), Some("2024-01-15,23:30,STATE,SLEEPING,,"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_csv_quotes_notes_with_separators() {
        let (states, meals) = master();
        let csv = build_records_csv(&[record(Some("woke up, twice"))], &states, &meals);
        assert!(csv.contains("\"woke up, twice\""));
    }

    #[test]
    fn test_csv_field_escapes_quotes() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
