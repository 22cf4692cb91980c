//! `/api/cart` - The caller's own cart.

use super::{AppState, auth::CurrentUser, error::ApiResult, optional_json};
use crate::{
    core::{
        cart::{self as carts, CartView},
        reservation::{self as reservations, ReservationView},
    },
    errors::Result,
};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AddItemBody {
    pub item_id: i64,
    #[serde(default = "one")]
    pub quantity: i32,
}

const fn one() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct QuantityBody {
    pub quantity: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutBody {
    pub pickup_date: Option<NaiveDate>,
}

pub async fn get_cart(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<CartView> {
    Ok(Json(carts::cart_view(&state.db, current.0.id).await?))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<CartView> {
    Ok(Json(carts::clear_cart(&state.db, current.0.id).await?))
}

pub async fn add_item(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<AddItemBody>,
) -> ApiResult<CartView> {
    Ok(Json(
        carts::add_item(&state.db, current.0.id, body.item_id, body.quantity).await?,
    ))
}

pub async fn set_item_quantity(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(item_id): Path<i64>,
    Json(body): Json<QuantityBody>,
) -> ApiResult<CartView> {
    Ok(Json(
        carts::set_item_quantity(&state.db, current.0.id, item_id, body.quantity).await?,
    ))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(item_id): Path<i64>,
) -> ApiResult<CartView> {
    Ok(Json(
        carts::remove_item(&state.db, current.0.id, item_id).await?,
    ))
}

pub async fn checkout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    body: Bytes,
) -> Result<(StatusCode, Json<ReservationView>)> {
    let body: CheckoutBody = optional_json(&body)?;
    let placed = carts::checkout(&state.db, &current.0, body.pickup_date).await?;
    let view = reservations::get_reservation_view(&state.db, placed.id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}
