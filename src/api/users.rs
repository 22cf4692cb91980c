//! `/api/users`

use super::{AppState, auth::CurrentUser, error::ApiResult};
use crate::{
    core::{
        listing::{ListParams, Page},
        user::{self as users, NewUser, UserFilter, UserUpdate},
    },
    entities::user,
    errors::{Error, Result},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

pub async fn list_users(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(filter): Query<UserFilter>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<user::Model>> {
    current.require_admin()?;
    Ok(Json(users::list_users(&state.db, &filter, &params).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<NewUser>,
) -> Result<(StatusCode, Json<user::Model>)> {
    current.require_admin()?;
    let created =
        users::create_user(&state.db, body, &state.config.allowed_email_domain).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn me(Extension(current): Extension<CurrentUser>) -> Json<user::Model> {
    Json(current.0)
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
) -> ApiResult<user::Model> {
    current.require_self_or_admin(user_id)?;
    users::get_user_by_id(&state.db, user_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("user", user_id))
}

/// Students may change their own name, email and password only.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
    Json(body): Json<UserUpdate>,
) -> ApiResult<user::Model> {
    current.require_self_or_admin(user_id)?;
    if !current.is_admin() && (body.role.is_some() || body.is_active.is_some()) {
        return Err(Error::Forbidden);
    }
    let updated =
        users::update_user(&state.db, user_id, body, &state.config.allowed_email_domain).await?;
    Ok(Json(updated))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode> {
    current.require_admin()?;
    users::delete_user(&state.db, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
