use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::core::validate::validate_date_range;
use crate::error::{AppError, AppResult};
use crate::models::sleep_diary::{CreateSleepDiaryRequest, SleepDiary, UpdateSleepDiaryRequest};
use crate::AppState;

pub async fn list_diaries(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<SleepDiary>>> {
    let diaries = sqlx::query_as::<_, SleepDiary>(
        r#"
        SELECT * FROM sleep_diaries
        WHERE user_id = $1 AND deleted_at IS NULL
        ORDER BY start_date DESC, created_at DESC
        "#,
    )
    .bind(auth_user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(diaries))
}

pub async fn create_diary(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateSleepDiaryRequest>,
) -> AppResult<Json<SleepDiary>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    validate_date_range(body.start_date, body.end_date, state.config.max_range_days)?;

    let diary = sqlx::query_as::<_, SleepDiary>(
        r#"
        INSERT INTO sleep_diaries (id, user_id, diary_name, start_date, end_date, note)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(&body.diary_name)
    .bind(body.start_date)
    .bind(body.end_date)
    .bind(&body.note)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(diary))
}

pub async fn get_diary(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(diary_id): Path<Uuid>,
) -> AppResult<Json<SleepDiary>> {
    let diary = fetch_owned_diary(&state, auth_user.id, diary_id).await?;
    Ok(Json(diary))
}

pub async fn update_diary(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(diary_id): Path<Uuid>,
    Json(body): Json<UpdateSleepDiaryRequest>,
) -> AppResult<Json<SleepDiary>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let existing = fetch_owned_diary(&state, auth_user.id, diary_id).await?;

    // Validate the merged range, not just the changed ends.
    let start_date = body.start_date.unwrap_or(existing.start_date);
    let end_date = body.end_date.unwrap_or(existing.end_date);
    validate_date_range(start_date, end_date, state.config.max_range_days)?;

    let diary = sqlx::query_as::<_, SleepDiary>(
        r#"
        UPDATE sleep_diaries SET
            diary_name = COALESCE($3, diary_name),
            start_date = $4,
            end_date = $5,
            note = COALESCE($6, note),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(diary_id)
    .bind(auth_user.id)
    .bind(&body.diary_name)
    .bind(start_date)
    .bind(end_date)
    .bind(&body.note)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(diary))
}

/// Soft-deletes the diary together with its records in one transaction.
pub async fn delete_diary(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(diary_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let _existing = fetch_owned_diary(&state, auth_user.id, diary_id).await?;

    let mut tx = state.db.begin().await?;

    sqlx::query(
        "UPDATE sleep_records SET deleted_at = NOW() WHERE diary_id = $1 AND deleted_at IS NULL",
    )
    .bind(diary_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE sleep_diaries SET deleted_at = NOW() WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
    )
    .bind(diary_id)
    .bind(auth_user.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(serde_json::json!({ "deleted": true, "id": diary_id })))
}

/// Loads an active diary and enforces ownership.
pub async fn fetch_owned_diary(
    state: &AppState,
    user_id: Uuid,
    diary_id: Uuid,
) -> AppResult<SleepDiary> {
    sqlx::query_as::<_, SleepDiary>(
        "SELECT * FROM sleep_diaries WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
    )
    .bind(diary_id)
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Diary not found".into()))
}
