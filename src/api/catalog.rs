//! `/api/categories` and `/api/items`
//!
//! Anyone signed in can browse the catalog; only administrators change it.

use super::{AppState, auth::CurrentUser, error::ApiResult};
use crate::{
    core::{
        category as categories,
        item::{self as items, ItemFilter, ItemInput, ItemUpdate, ItemView},
        listing::{ListParams, Page},
    },
    entities::category,
    errors::{Error, Result},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CategoryBody {
    pub name: String,
}

pub async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<category::Model>> {
    Ok(Json(categories::list_categories(&state.db, &params).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<CategoryBody>,
) -> Result<(StatusCode, Json<category::Model>)> {
    current.require_admin()?;
    let created = categories::create_category(&state.db, &body.name).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
) -> ApiResult<category::Model> {
    categories::get_category_by_id(&state.db, category_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("category", category_id))
}

pub async fn update_category(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(category_id): Path<i64>,
    Json(body): Json<CategoryBody>,
) -> ApiResult<category::Model> {
    current.require_admin()?;
    Ok(Json(
        categories::rename_category(&state.db, category_id, &body.name).await?,
    ))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(category_id): Path<i64>,
) -> Result<StatusCode> {
    current.require_admin()?;
    categories::delete_category(&state.db, category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_items(
    State(state): State<AppState>,
    Query(filter): Query<ItemFilter>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<ItemView>> {
    let page = items::list_items(&state.db, &filter, &params, state.base_url()).await?;
    Ok(Json(page))
}

pub async fn create_item(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<ItemInput>,
) -> Result<(StatusCode, Json<ItemView>)> {
    current.require_admin()?;
    let created = items::create_item(&state.db, body).await?;
    let view = items::get_item_view(&state.db, created.id, state.base_url()).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> ApiResult<ItemView> {
    Ok(Json(
        items::get_item_view(&state.db, item_id, state.base_url()).await?,
    ))
}

pub async fn update_item(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(item_id): Path<i64>,
    Json(body): Json<ItemUpdate>,
) -> ApiResult<ItemView> {
    current.require_admin()?;
    items::update_item(&state.db, item_id, body).await?;
    Ok(Json(
        items::get_item_view(&state.db, item_id, state.base_url()).await?,
    ))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(item_id): Path<i64>,
) -> Result<StatusCode> {
    current.require_admin()?;
    items::delete_item(&state.db, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
