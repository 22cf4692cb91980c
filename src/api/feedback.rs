//! `/api/feedback`

use super::{AppState, auth::CurrentUser, error::ApiResult};
use crate::{
    core::{
        feedback::{self as ratings, FeedbackFilter, FeedbackUpdate, FeedbackView, NewFeedback},
        listing::{ListParams, Page},
    },
    errors::{Error, Result},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

pub async fn list_feedback(
    State(state): State<AppState>,
    Query(filter): Query<FeedbackFilter>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<FeedbackView>> {
    Ok(Json(
        ratings::list_feedback(&state.db, &filter, &params).await?,
    ))
}

async fn feedback_view(state: &AppState, feedback_id: i64) -> Result<FeedbackView> {
    let found = ratings::get_feedback(&state.db, feedback_id).await?;
    ratings::to_views(&state.db, vec![found])
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("feedback", feedback_id))
}

pub async fn create_feedback(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<NewFeedback>,
) -> Result<(StatusCode, Json<FeedbackView>)> {
    let created = ratings::create_feedback(&state.db, current.0.id, body).await?;
    let view = feedback_view(&state, created.id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_feedback(
    State(state): State<AppState>,
    Path(feedback_id): Path<i64>,
) -> ApiResult<FeedbackView> {
    Ok(Json(feedback_view(&state, feedback_id).await?))
}

pub async fn update_feedback(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(feedback_id): Path<i64>,
    Json(body): Json<FeedbackUpdate>,
) -> ApiResult<FeedbackView> {
    let existing = ratings::get_feedback(&state.db, feedback_id).await?;
    current.require_self_or_admin(existing.user_id)?;
    ratings::update_feedback(&state.db, feedback_id, body).await?;
    Ok(Json(feedback_view(&state, feedback_id).await?))
}

pub async fn delete_feedback(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(feedback_id): Path<i64>,
) -> Result<StatusCode> {
    let existing = ratings::get_feedback(&state.db, feedback_id).await?;
    current.require_self_or_admin(existing.user_id)?;
    ratings::delete_feedback(&state.db, feedback_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
