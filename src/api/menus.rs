//! `/api/menus` and `/api/menu-items`

use super::{AppState, auth::CurrentUser, error::ApiResult};
use crate::{
    core::{
        listing::{ListParams, Page},
        menu::{self as menus, MenuFilter, MenuItemFilter, MenuItemView, MenuUpdate, MenuView, NewMenu},
    },
    errors::Result,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

pub async fn list_menus(
    State(state): State<AppState>,
    Query(filter): Query<MenuFilter>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<MenuView>> {
    let page = menus::list_menus(&state.db, &filter, &params, state.base_url()).await?;
    Ok(Json(page))
}

pub async fn today_menu(State(state): State<AppState>) -> ApiResult<MenuView> {
    Ok(Json(menus::today_menu(&state.db, state.base_url()).await?))
}

pub async fn create_menu(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<NewMenu>,
) -> Result<(StatusCode, Json<MenuView>)> {
    current.require_admin()?;
    let created = menus::create_menu(&state.db, body).await?;
    let view = menus::menu_view(&state.db, created, state.base_url()).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_menu(
    State(state): State<AppState>,
    Path(menu_id): Path<i64>,
) -> ApiResult<MenuView> {
    let found = menus::get_menu(&state.db, menu_id).await?;
    Ok(Json(menus::menu_view(&state.db, found, state.base_url()).await?))
}

pub async fn update_menu(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(menu_id): Path<i64>,
    Json(body): Json<MenuUpdate>,
) -> ApiResult<MenuView> {
    current.require_admin()?;
    let updated = menus::update_menu(&state.db, menu_id, body).await?;
    Ok(Json(menus::menu_view(&state.db, updated, state.base_url()).await?))
}

pub async fn delete_menu(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(menu_id): Path<i64>,
) -> Result<StatusCode> {
    current.require_admin()?;
    menus::delete_menu(&state.db, menu_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct AssembleResponse {
    pub menu: MenuView,
    pub added: usize,
}

/// Lists every available item on the menu's date.
pub async fn assemble_menu(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(menu_id): Path<i64>,
) -> ApiResult<AssembleResponse> {
    current.require_admin()?;
    let found = menus::get_menu(&state.db, menu_id).await?;
    let (assembled, added) = menus::assemble_daily_menu(&state.db, found.date).await?;
    let menu = menus::menu_view(&state.db, assembled, state.base_url()).await?;
    Ok(Json(AssembleResponse { menu, added }))
}

#[derive(Debug, Deserialize)]
pub struct MenuItemBody {
    pub menu_id: i64,
    pub item_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct MenuItemPatch {
    pub menu_id: Option<i64>,
    pub item_id: Option<i64>,
}

pub async fn list_menu_items(
    State(state): State<AppState>,
    Query(filter): Query<MenuItemFilter>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<MenuItemView>> {
    Ok(Json(
        menus::list_menu_items(&state.db, &filter, &params).await?,
    ))
}

pub async fn create_menu_item(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<MenuItemBody>,
) -> Result<(StatusCode, Json<MenuItemView>)> {
    current.require_admin()?;
    let created = menus::create_menu_item(&state.db, body.menu_id, body.item_id).await?;
    let view = menus::menu_item_view(&state.db, created).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_menu_item(
    State(state): State<AppState>,
    Path(menu_item_id): Path<i64>,
) -> ApiResult<MenuItemView> {
    let found = menus::get_menu_item(&state.db, menu_item_id).await?;
    Ok(Json(menus::menu_item_view(&state.db, found).await?))
}

pub async fn update_menu_item(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(menu_item_id): Path<i64>,
    Json(body): Json<MenuItemPatch>,
) -> ApiResult<MenuItemView> {
    current.require_admin()?;
    let updated =
        menus::update_menu_item(&state.db, menu_item_id, body.menu_id, body.item_id).await?;
    Ok(Json(menus::menu_item_view(&state.db, updated).await?))
}

pub async fn delete_menu_item(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(menu_item_id): Path<i64>,
) -> Result<StatusCode> {
    current.require_admin()?;
    menus::delete_menu_item(&state.db, menu_item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
