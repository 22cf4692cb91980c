//! `/api/reservations`

use super::{AppState, auth::CurrentUser, error::ApiResult, optional_json};
use crate::{
    core::{
        listing::{ListParams, Page},
        reservation::{
            self as reservations, ConfirmOptions, NewReservation, ReservationFilter,
            ReservationStatusUpdate, ReservationView,
        },
    },
    errors::Result,
};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};

pub async fn list_reservations(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(mut filter): Query<ReservationFilter>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<ReservationView>> {
    if !current.is_admin() {
        filter.user = Some(current.0.institutional_id.clone());
    }
    Ok(Json(
        reservations::list_reservations(&state.db, &filter, &params).await?,
    ))
}

pub async fn create_reservation(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(mut body): Json<NewReservation>,
) -> Result<(StatusCode, Json<ReservationView>)> {
    body.user = current.acting_as(&body.user);
    let placed = reservations::create_reservation(&state.db, body).await?;
    let view = reservations::get_reservation_view(&state.db, placed.id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Loads a reservation and checks that the caller may act on it.
async fn owned_view(
    state: &AppState,
    current: &CurrentUser,
    reservation_id: i64,
) -> Result<ReservationView> {
    let view = reservations::get_reservation_view(&state.db, reservation_id).await?;
    current.require_self_or_admin(view.reservation.user_id)?;
    Ok(view)
}

pub async fn get_reservation(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(reservation_id): Path<i64>,
) -> ApiResult<ReservationView> {
    Ok(Json(owned_view(&state, &current, reservation_id).await?))
}

pub async fn update_reservation(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(reservation_id): Path<i64>,
    Json(body): Json<ReservationStatusUpdate>,
) -> ApiResult<ReservationView> {
    owned_view(&state, &current, reservation_id).await?;
    reservations::update_reservation_status(&state.db, reservation_id, body).await?;
    Ok(Json(
        reservations::get_reservation_view(&state.db, reservation_id).await?,
    ))
}

pub async fn confirm_reservation(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(reservation_id): Path<i64>,
    body: Bytes,
) -> ApiResult<ReservationView> {
    let options: ConfirmOptions = optional_json(&body)?;
    owned_view(&state, &current, reservation_id).await?;
    reservations::confirm_reservation(&state.db, reservation_id, options).await?;
    Ok(Json(
        reservations::get_reservation_view(&state.db, reservation_id).await?,
    ))
}

pub async fn cancel_reservation(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(reservation_id): Path<i64>,
) -> ApiResult<ReservationView> {
    owned_view(&state, &current, reservation_id).await?;
    reservations::cancel_reservation(&state.db, reservation_id).await?;
    Ok(Json(
        reservations::get_reservation_view(&state.db, reservation_id).await?,
    ))
}

pub async fn delete_reservation(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(reservation_id): Path<i64>,
) -> Result<StatusCode> {
    current.require_admin()?;
    reservations::delete_reservation(&state.db, reservation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
