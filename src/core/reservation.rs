//! Reservation business logic.
//!
//! A reservation holds items for pickup on a given day. Confirming it turns
//! it into an order on that day's menu, with a pending payment, in a single
//! transaction. Cancelling a confirmed reservation also cancels its order if
//! nobody has paid for it yet.

use crate::{
    core::{
        codes::{self, RESERVATION_CODE_PREFIX},
        item as items,
        listing::{self, ListParams, Page},
        menu,
        order::{self as orders, NewOrder, OrderLine},
        round_to, user as users,
    },
    entities::{
        Item, OrderStatus, PaymentMethod, Reservation, ReservationItem, ReservationStatus, User,
        item, reservation, reservation_item, user,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveEnum, Condition, IntoActiveModel, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument};

/// New reservation
#[derive(Debug, Clone, Deserialize)]
pub struct NewReservation {
    /// Customer's institutional id
    #[serde(default)]
    pub user: String,
    /// Pickup day; today when absent
    pub pickup_date: Option<NaiveDate>,
    /// Reserved lines
    pub items: Vec<OrderLine>,
}

/// Options used when a reservation is confirmed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfirmOptions {
    /// Payment method of the generated order; cash when absent
    pub payment_method: Option<PaymentMethod>,
    pub performer_institutional_id: Option<String>,
    pub performer_name: Option<String>,
}

/// Status change requested through a partial update
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationStatusUpdate {
    pub status: ReservationStatus,
    #[serde(flatten)]
    pub confirm: ConfirmOptions,
}

/// Filters accepted by [`list_reservations`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationFilter {
    /// Customer's institutional id
    pub user: Option<String>,
    pub status: Option<ReservationStatus>,
    pub pickup_date: Option<NaiveDate>,
}

/// A reserved line with item details
#[derive(Debug, Clone, Serialize)]
pub struct ReservationLineView {
    pub item_id: i64,
    pub item_name: Option<String>,
    pub unit_price: f64,
    pub quantity: i32,
    pub line_total: f64,
}

/// Reservation as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct ReservationView {
    #[serde(flatten)]
    pub reservation: reservation::Model,
    pub user_name: Option<String>,
    pub items: Vec<ReservationLineView>,
    pub total: f64,
}

fn invalid_transition(from: ReservationStatus, to: ReservationStatus) -> Error {
    Error::InvalidTransition {
        entity: "reservation",
        from: from.to_value(),
        to: to.to_value(),
    }
}

/// Stores a reservation with its lines inside an open transaction.
pub(crate) async fn place_reservation<C>(
    db: &C,
    customer: &user::Model,
    pickup_date: Option<NaiveDate>,
    lines: &[OrderLine],
) -> Result<reservation::Model>
where
    C: ConnectionTrait,
{
    orders::validate_lines(lines)?;
    let pickup_date = pickup_date.unwrap_or_else(menu::today);
    if pickup_date < menu::today() {
        return Err(Error::validation(
            "pickup_date",
            "pickup date cannot be in the past",
        ));
    }

    let created_at = Utc::now();
    let placed = codes::insert_with_code::<_, reservation::ActiveModel, _>(
        db,
        reservation::Column::Code,
        RESERVATION_CODE_PREFIX,
        &customer.name,
        |code| reservation::ActiveModel {
            user_id: Set(customer.id),
            code: Set(Some(code)),
            status: Set(ReservationStatus::Pending),
            pickup_date: Set(pickup_date),
            order_id: Set(None),
            created_at: Set(created_at),
            ..Default::default()
        },
    )
    .await?;

    for line in lines {
        items::require_available_item(db, line.item_id).await?;
        reservation_item::ActiveModel {
            reservation_id: Set(placed.id),
            item_id: Set(line.item_id),
            quantity: Set(line.quantity),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(placed)
}

/// Creates a pending reservation.
#[instrument(skip(db, input), fields(user = %input.user))]
pub async fn create_reservation(
    db: &DatabaseConnection,
    input: NewReservation,
) -> Result<reservation::Model> {
    let txn = db.begin().await?;
    let customer = users::require_user_by_institutional_id(&txn, input.user.trim()).await?;
    let placed = place_reservation(&txn, &customer, input.pickup_date, &input.items).await?;
    txn.commit().await?;
    info!(
        reservation_id = placed.id,
        "Reservation {} created",
        placed.code.as_deref().unwrap_or_default()
    );
    Ok(placed)
}

/// Finds a reservation by id or fails with not found.
pub async fn get_reservation<C>(db: &C, reservation_id: i64) -> Result<reservation::Model>
where
    C: ConnectionTrait,
{
    Reservation::find_by_id(reservation_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("reservation", reservation_id))
}

async fn reservation_lines<C>(db: &C, reservation_id: i64) -> Result<Vec<OrderLine>>
where
    C: ConnectionTrait,
{
    Ok(ReservationItem::find()
        .filter(reservation_item::Column::ReservationId.eq(reservation_id))
        .order_by_asc(reservation_item::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|line| OrderLine {
            item_id: line.item_id,
            quantity: line.quantity,
        })
        .collect())
}

/// Converts a pending reservation into an order.
///
/// The order is placed on the menu of the pickup date (created if needed),
/// gets a pending payment and is linked back from the reservation.
pub async fn confirm_reservation(
    db: &DatabaseConnection,
    reservation_id: i64,
    options: ConfirmOptions,
) -> Result<reservation::Model> {
    let txn = db.begin().await?;
    let current = get_reservation(&txn, reservation_id).await?;
    if current.status != ReservationStatus::Pending {
        return Err(invalid_transition(current.status, ReservationStatus::Confirmed));
    }

    let customer = User::find_by_id(current.user_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("user", current.user_id))?;
    let daily = menu::get_or_create_menu_for(&txn, current.pickup_date).await?;
    let (placed, _) = orders::place_order(
        &txn,
        &NewOrder {
            user: customer.institutional_id,
            menu_id: Some(daily.id),
            order_date: Some(current.pickup_date),
            items: reservation_lines(&txn, reservation_id).await?,
            payment_method: options
                .payment_method
                .unwrap_or_else(orders::default_payment_method),
            performer_institutional_id: options.performer_institutional_id,
            performer_name: options.performer_name,
        },
    )
    .await?;

    let mut active = current.into_active_model();
    active.status = Set(ReservationStatus::Confirmed);
    active.order_id = Set(Some(placed.id));
    let confirmed = active.update(&txn).await?;
    txn.commit().await?;

    info!(reservation_id, order_id = placed.id, "Reservation confirmed");
    Ok(confirmed)
}

/// Cancels a pending or confirmed reservation.
pub async fn cancel_reservation(
    db: &DatabaseConnection,
    reservation_id: i64,
) -> Result<reservation::Model> {
    let txn = db.begin().await?;
    let current = get_reservation(&txn, reservation_id).await?;
    if current.status == ReservationStatus::Cancelled {
        return Err(invalid_transition(current.status, ReservationStatus::Cancelled));
    }

    if let Some(order_id) = current.order_id {
        let linked = orders::get_order(&txn, order_id).await?;
        if linked.status == OrderStatus::Reserved {
            orders::set_order_status(&txn, order_id, OrderStatus::Cancelled).await?;
        }
    }

    let mut active = current.into_active_model();
    active.status = Set(ReservationStatus::Cancelled);
    let cancelled = active.update(&txn).await?;
    txn.commit().await?;

    info!(reservation_id, "Reservation cancelled");
    Ok(cancelled)
}

/// Applies a status change, dispatching to confirm or cancel.
pub async fn update_reservation_status(
    db: &DatabaseConnection,
    reservation_id: i64,
    update: ReservationStatusUpdate,
) -> Result<reservation::Model> {
    match update.status {
        ReservationStatus::Confirmed => {
            confirm_reservation(db, reservation_id, update.confirm).await
        }
        ReservationStatus::Cancelled => cancel_reservation(db, reservation_id).await,
        ReservationStatus::Pending => {
            let current = get_reservation(db, reservation_id).await?;
            if current.status == ReservationStatus::Pending {
                Ok(current)
            } else {
                Err(invalid_transition(current.status, ReservationStatus::Pending))
            }
        }
    }
}

/// Deletes a reservation with its lines.
pub async fn delete_reservation(db: &DatabaseConnection, reservation_id: i64) -> Result<()> {
    let result = Reservation::delete_by_id(reservation_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("reservation", reservation_id));
    }
    Ok(())
}

/// Builds read models for several reservations.
pub async fn to_views(
    db: &DatabaseConnection,
    rows: Vec<reservation::Model>,
) -> Result<Vec<ReservationView>> {
    let user_names: HashMap<i64, String> = User::find()
        .filter(user::Column::Id.is_in(rows.iter().map(|r| r.user_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();
    let lines = ReservationItem::find()
        .filter(reservation_item::Column::ReservationId.is_in(rows.iter().map(|r| r.id)))
        .order_by_asc(reservation_item::Column::Id)
        .all(db)
        .await?;
    let catalog: HashMap<i64, item::Model> = Item::find()
        .filter(item::Column::Id.is_in(lines.iter().map(|l| l.item_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();

    let mut by_reservation: HashMap<i64, Vec<ReservationLineView>> = HashMap::new();
    for line in lines {
        let listed = catalog.get(&line.item_id);
        let unit_price = listed.map_or(0.0, |i| i.price);
        by_reservation
            .entry(line.reservation_id)
            .or_default()
            .push(ReservationLineView {
                item_id: line.item_id,
                item_name: listed.map(|i| i.name.clone()),
                unit_price,
                quantity: line.quantity,
                line_total: round_to(unit_price * f64::from(line.quantity), 2),
            });
    }

    Ok(rows
        .into_iter()
        .map(|reservation| {
            let items = by_reservation.remove(&reservation.id).unwrap_or_default();
            ReservationView {
                user_name: user_names.get(&reservation.user_id).cloned(),
                total: round_to(items.iter().map(|l| l.line_total).sum(), 2),
                items,
                reservation,
            }
        })
        .collect())
}

/// Read model of a single reservation.
pub async fn get_reservation_view(
    db: &DatabaseConnection,
    reservation_id: i64,
) -> Result<ReservationView> {
    let found = get_reservation(db, reservation_id).await?;
    to_views(db, vec![found])
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("reservation", reservation_id))
}

/// Lists reservations, newest first unless asked otherwise.
pub async fn list_reservations(
    db: &DatabaseConnection,
    filter: &ReservationFilter,
    params: &ListParams,
) -> Result<Page<ReservationView>> {
    let mut condition = Condition::all();
    if let Some(institutional_id) = &filter.user {
        let customer = users::require_user_by_institutional_id(db, institutional_id).await?;
        condition = condition.add(reservation::Column::UserId.eq(customer.id));
    }
    if let Some(status) = filter.status {
        condition = condition.add(reservation::Column::Status.eq(status));
    }
    if let Some(date) = filter.pickup_date {
        condition = condition.add(reservation::Column::PickupDate.eq(date));
    }
    if let Some(term) = params.search_term() {
        condition = condition.add(reservation::Column::Code.contains(term));
    }

    let mut query = Reservation::find().filter(condition);
    query = match params.ordering(&["created_at", "pickup_date"])? {
        Some(("pickup_date", order)) => query.order_by(reservation::Column::PickupDate, order),
        Some((_, order)) => query.order_by(reservation::Column::CreatedAt, order),
        None => query.order_by_desc(reservation::Column::CreatedAt),
    }
    .order_by_desc(reservation::Column::Id);

    let mut page = listing::paginate(db, query, params).await?;
    let rows = std::mem::take(&mut page.results);
    let views = to_views(db, rows).await?;
    Ok(page.with_results(views))
}
