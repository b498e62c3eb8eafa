use axum::{extract::State, Extension, Json};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::preference::{SleepPreference, UpsertSleepPreferenceRequest};
use crate::AppState;

pub async fn get_preference(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<SleepPreference>> {
    let preference = fetch_preference(&state, auth_user.id).await?;
    Ok(Json(preference))
}

pub async fn upsert_preference(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpsertSleepPreferenceRequest>,
) -> AppResult<Json<SleepPreference>> {
    if let Some(goal) = body.sleep_goal_hours {
        if !(1..=24).contains(&goal) {
            return Err(AppError::Validation(
                "Sleep goal must be between 1 and 24 hours".into(),
            ));
        }
    }

    let preference = sqlx::query_as::<_, SleepPreference>(
        r#"
        INSERT INTO sleep_preferences
            (id, user_id, preferred_bedtime, preferred_wakeup_time, sleep_goal_hours, reminder_enabled)
        VALUES (
            $1, $2,
            COALESCE($3, '23:00'::time),
            COALESCE($4, '07:00'::time),
            COALESCE($5, 8),
            COALESCE($6, FALSE)
        )
        ON CONFLICT (user_id) DO UPDATE SET
            preferred_bedtime = COALESCE($3, sleep_preferences.preferred_bedtime),
            preferred_wakeup_time = COALESCE($4, sleep_preferences.preferred_wakeup_time),
            sleep_goal_hours = COALESCE($5, sleep_preferences.sleep_goal_hours),
            reminder_enabled = COALESCE($6, sleep_preferences.reminder_enabled),
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(body.preferred_bedtime)
    .bind(body.preferred_wakeup_time)
    .bind(body.sleep_goal_hours)
    .bind(body.reminder_enabled)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(preference))
}

/// Stored preference, or the defaults when the user has never saved one.
pub async fn fetch_preference(state: &AppState, user_id: Uuid) -> AppResult<SleepPreference> {
    let stored = sqlx::query_as::<_, SleepPreference>(
        "SELECT * FROM sleep_preferences WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?;

    Ok(stored.unwrap_or_else(|| SleepPreference::default_for(user_id)))
}
