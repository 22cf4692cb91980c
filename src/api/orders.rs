//! `/api/orders` and `/api/payments`
//!
//! Students see and place their own orders. Payments and order changes after
//! placement are handled by administrators.

use super::{AppState, auth::CurrentUser, error::ApiResult};
use crate::{
    core::{
        listing::{ListParams, Page},
        order::{self as orders, NewOrder, OrderFilter, OrderUpdate, OrderView},
        payment::{self as payments, PaymentFilter, PaymentUpdate, PaymentView},
    },
    errors::{Error, Result},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

/// Body of `POST /api/orders/bulk`
#[derive(Debug, Deserialize)]
pub struct BulkOrders {
    pub orders: Vec<NewOrder>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(mut filter): Query<OrderFilter>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<OrderView>> {
    if !current.is_admin() {
        filter.user = Some(current.0.institutional_id.clone());
    }
    let page = orders::list_orders(&state.db, &filter, &params, state.base_url()).await?;
    Ok(Json(page))
}

pub async fn create_order(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(mut body): Json<NewOrder>,
) -> Result<(StatusCode, Json<OrderView>)> {
    body.user = current.acting_as(&body.user);
    let placed = orders::create_order(&state.db, body).await?;
    let view = orders::get_order_view(&state.db, placed.id, state.base_url()).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn create_orders_bulk(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<BulkOrders>,
) -> Result<(StatusCode, Json<Vec<OrderView>>)> {
    current.require_admin()?;
    let placed = orders::create_orders_bulk(&state.db, body.orders).await?;
    let views = orders::to_views(&state.db, placed, state.base_url()).await?;
    Ok((StatusCode::CREATED, Json(views)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(order_id): Path<i64>,
) -> ApiResult<OrderView> {
    let view = orders::get_order_view(&state.db, order_id, state.base_url()).await?;
    current.require_self_or_admin(view.order.user_id)?;
    Ok(Json(view))
}

pub async fn update_order(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(order_id): Path<i64>,
    Json(body): Json<OrderUpdate>,
) -> ApiResult<OrderView> {
    current.require_admin()?;
    orders::update_order(&state.db, order_id, body).await?;
    Ok(Json(
        orders::get_order_view(&state.db, order_id, state.base_url()).await?,
    ))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(order_id): Path<i64>,
) -> Result<StatusCode> {
    current.require_admin()?;
    orders::delete_order(&state.db, order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_payments(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(filter): Query<PaymentFilter>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<PaymentView>> {
    current.require_admin()?;
    Ok(Json(
        payments::list_payments(&state.db, &filter, &params).await?,
    ))
}

async fn payment_view(state: &AppState, payment_id: i64) -> Result<PaymentView> {
    let found = payments::get_payment(&state.db, payment_id).await?;
    payments::to_views(&state.db, vec![found])
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("payment", payment_id))
}

pub async fn get_payment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(payment_id): Path<i64>,
) -> ApiResult<PaymentView> {
    current.require_admin()?;
    Ok(Json(payment_view(&state, payment_id).await?))
}

pub async fn update_payment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(payment_id): Path<i64>,
    Json(body): Json<PaymentUpdate>,
) -> ApiResult<PaymentView> {
    current.require_admin()?;
    payments::update_payment(&state.db, payment_id, body).await?;
    Ok(Json(payment_view(&state, payment_id).await?))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(payment_id): Path<i64>,
) -> Result<StatusCode> {
    current.require_admin()?;
    payments::delete_payment(&state.db, payment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
