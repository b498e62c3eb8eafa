use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::core::validate::{validate_record, validate_references, RecordDraft};
use crate::error::{AppError, AppResult};
use crate::models::meal_type::MealType;
use crate::models::sleep_record::{
    CreateSleepRecordRequest, RecordQuery, SleepRecord, UpdateSleepRecordRequest,
};
use crate::models::sleep_state::SleepState;
use crate::AppState;

pub async fn create_record(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateSleepRecordRequest>,
) -> AppResult<Json<SleepRecord>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let draft = RecordDraft {
        record_date: body.record_date,
        time_slot: body.time_slot,
        kind: Some(body.record_type.as_str()),
        sleep_state_id: body.sleep_state_id,
        meal_type_id: body.meal_type_id,
    };
    let kind = validate_record(&draft)?;

    let diary =
        crate::handlers::diaries::fetch_owned_diary(&state, auth_user.id, body.diary_id).await?;

    let states = load_states(&state).await?;
    let meal_types = load_meal_types(&state).await?;
    validate_references(
        kind,
        body.sleep_state_id,
        body.meal_type_id,
        &states,
        &meal_types,
    )?;

    let record = sqlx::query_as::<_, SleepRecord>(
        r#"
        INSERT INTO sleep_records
            (id, diary_id, user_id, record_date, time_slot, kind, sleep_state_id, meal_type_id, note)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(diary.id)
    .bind(auth_user.id)
    .bind(body.record_date)
    .bind(body.time_slot)
    .bind(kind)
    .bind(body.sleep_state_id)
    .bind(body.meal_type_id)
    .bind(&body.note)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(record))
}

pub async fn list_records(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<RecordQuery>,
) -> AppResult<Json<Vec<SleepRecord>>> {
    let start = query
        .start_date
        .unwrap_or_else(|| Utc::now().date_naive() - chrono::Duration::days(30));
    let end = query.end_date.unwrap_or_else(|| Utc::now().date_naive());

    let records = if let Some(diary_id) = query.diary_id {
        sqlx::query_as::<_, SleepRecord>(
            r#"
            SELECT * FROM sleep_records
            WHERE user_id = $1 AND diary_id = $2
              AND record_date BETWEEN $3 AND $4 AND deleted_at IS NULL
            ORDER BY record_date ASC, time_slot ASC
            "#,
        )
        .bind(auth_user.id)
        .bind(diary_id)
        .bind(start)
        .bind(end)
        .fetch_all(&state.db)
        .await?
    } else {
        sqlx::query_as::<_, SleepRecord>(
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
        .await?
    };

    Ok(Json(records))
}

pub async fn update_record(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(record_id): Path<Uuid>,
    Json(body): Json<UpdateSleepRecordRequest>,
) -> AppResult<Json<SleepRecord>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let existing = sqlx::query_as::<_, SleepRecord>(
        "SELECT * FROM sleep_records WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
    )
    .bind(record_id)
    .bind(auth_user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Record not found".into()))?;

    // Revalidate the merged record, not only the changed fields.
    let record_type = body
        .record_type
        .clone()
        .unwrap_or_else(|| existing.kind.as_str().to_string());
    let sleep_state_id = body.sleep_state_id.or(existing.sleep_state_id);
    let meal_type_id = body.meal_type_id.or(existing.meal_type_id);
    let draft = RecordDraft {
        record_date: body.record_date.or(Some(existing.record_date)),
        time_slot: body.time_slot.or(Some(existing.time_slot)),
        kind: Some(record_type.as_str()),
        sleep_state_id,
        meal_type_id,
    };
    let kind = validate_record(&draft)?;

    let states = load_states(&state).await?;
    let meal_types = load_meal_types(&state).await?;
    validate_references(kind, sleep_state_id, meal_type_id, &states, &meal_types)?;

    let record = sqlx::query_as::<_, SleepRecord>(
        r#"
        UPDATE sleep_records SET
            record_date = $3,
            time_slot = $4,
            kind = $5,
            sleep_state_id = $6,
            meal_type_id = $7,
            note = COALESCE($8, note),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(record_id)
    .bind(auth_user.id)
    .bind(draft.record_date)
    .bind(draft.time_slot)
    .bind(kind)
    .bind(sleep_state_id)
    .bind(meal_type_id)
    .bind(&body.note)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(record))
}

/// Soft delete: the tombstone timestamp is set, the row stays.
pub async fn delete_record(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(record_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query(
        r#"
        UPDATE sleep_records SET deleted_at = NOW()
        WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
        "#,
    )
    .bind(record_id)
    .bind(auth_user.id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Record not found".into()));
    }

    Ok(Json(serde_json::json!({ "deleted": true, "id": record_id })))
}

pub async fn list_sleep_states(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<SleepState>>> {
    let states = sqlx::query_as::<_, SleepState>(
        "SELECT * FROM sleep_states WHERE deleted_at IS NULL ORDER BY display_order ASC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(states))
}

pub async fn list_meal_types(State(state): State<AppState>) -> AppResult<Json<Vec<MealType>>> {
    let meal_types = sqlx::query_as::<_, MealType>(
        "SELECT * FROM meal_types WHERE deleted_at IS NULL ORDER BY display_order ASC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(meal_types))
}

/// Master lookup for the aggregator and the reference checks.
pub async fn load_states(state: &AppState) -> AppResult<HashMap<i64, SleepState>> {
    let rows = sqlx::query_as::<_, SleepState>(
        "SELECT * FROM sleep_states WHERE deleted_at IS NULL",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(rows.into_iter().map(|s| (s.id, s)).collect())
}

pub async fn load_meal_types(state: &AppState) -> AppResult<HashMap<i64, MealType>> {
    let rows =
        sqlx::query_as::<_, MealType>("SELECT * FROM meal_types WHERE deleted_at IS NULL")
            .fetch_all(&state.db)
            .await?;
    Ok(rows.into_iter().map(|m| (m.id, m)).collect())
}
