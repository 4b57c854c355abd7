// src/handlers/progress.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::progress::{AwardAchievementRequest, ContentKind, HistoryParams, RecordConsumptionRequest},
    services::ProgressTracker,
    utils::jwt::Claims,
};

/// Get the current user's progress summary.
/// Creates an empty record on first visit.
pub async fn get_progress(
    State(tracker): State<ProgressTracker>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let summary = tracker.ensure_summary(user_id, Utc::now()).await?;

    Ok(Json(summary))
}

pub async fn mark_verse_read(
    State(tracker): State<ProgressTracker>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<RecordConsumptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    record(&tracker, &claims, ContentKind::Verse, payload, "Verse marked as read").await
}

pub async fn mark_hadith_read(
    State(tracker): State<ProgressTracker>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<RecordConsumptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    record(&tracker, &claims, ContentKind::Hadith, payload, "Hadith marked as read").await
}

pub async fn mark_lesson_completed(
    State(tracker): State<ProgressTracker>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<RecordConsumptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    record(&tracker, &claims, ContentKind::Lesson, payload, "Lesson marked as completed").await
}

async fn record(
    tracker: &ProgressTracker,
    claims: &Claims,
    kind: ContentKind,
    payload: RecordConsumptionRequest,
    message: &str,
) -> Result<Json<serde_json::Value>, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let summary = tracker
        .record_consumption(user_id, kind, &payload.content_id, &payload.reference, Utc::now())
        .await?;

    Ok(Json(json!({
        "message": message,
        "progress": summary,
    })))
}

/// Totals and streak counters. Does not create a record.
pub async fn get_stats(
    State(tracker): State<ProgressTracker>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    Ok(Json(tracker.get_stats(user_id).await?))
}

/// Reading history across kinds, newest first.
/// Supports `?type=verse|hadith|lesson` and `?limit=N` (default 20, max 100).
pub async fn get_history(
    State(tracker): State<ProgressTracker>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let kind = params
        .kind
        .as_deref()
        .filter(|k| !k.is_empty())
        .map(str::parse::<ContentKind>)
        .transpose()
        .map_err(AppError::BadRequest)?;

    let history = tracker.get_history(user_id, kind, params.limit).await?;

    Ok(Json(history))
}

pub async fn reset_progress(
    State(tracker): State<ProgressTracker>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    tracker.reset_progress(user_id, Utc::now()).await?;

    Ok(Json(json!({ "message": "Progress reset successfully" })))
}

/// Append an achievement to the current user's record.
pub async fn award_achievement(
    State(tracker): State<ProgressTracker>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AwardAchievementRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let summary = tracker
        .award_achievement(user_id, &payload.name, &payload.description, &payload.icon, Utc::now())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Achievement awarded",
            "progress": summary,
        })),
    ))
}
