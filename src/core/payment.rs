//! Payment business logic - Settling orders.
//!
//! Payments are created by the order and reservation flows. Administrators
//! then move them to `Completed` or `Failed`; both states are final.

use crate::{
    core::{
        listing::{self, ListParams, Page},
        order as orders, user as users,
    },
    entities::{
        Order, OrderStatus, Payment, PaymentMethod, PaymentStatus, User, order, payment, user,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Condition, IntoActiveModel, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Person who took a payment
///
/// A registered user is linked when both the institutional id and the name
/// match; otherwise whatever was given is stored as free text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Performer {
    pub user_id: Option<i64>,
    pub external_institutional_id: Option<String>,
    pub external_name: Option<String>,
}

impl Performer {
    /// Resolves a performer from an optional institutional id and name.
    pub async fn resolve<C>(
        db: &C,
        institutional_id: Option<&str>,
        name: Option<&str>,
    ) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        let institutional_id = institutional_id.map(str::trim).filter(|s| !s.is_empty());
        let name = name.map(str::trim).filter(|s| !s.is_empty());
        if let (Some(id), Some(n)) = (institutional_id, name) {
            if let Some(found) = users::get_user_by_institutional_id(db, id).await? {
                if found.name == n {
                    return Ok(Self {
                        user_id: Some(found.id),
                        ..Self::default()
                    });
                }
            }
        }
        Ok(Self {
            user_id: None,
            external_institutional_id: institutional_id.map(str::to_string),
            external_name: name.map(str::to_string),
        })
    }

    /// Writes the performer fields into a payment.
    pub fn apply(&self, payment: &mut payment::ActiveModel) {
        payment.performed_by = Set(self.user_id);
        payment.external_institutional_id = Set(self.external_institutional_id.clone());
        payment.external_name = Set(self.external_name.clone());
    }
}

/// Stores a new pending payment for an order.
pub async fn insert_pending_payment<C>(
    db: &C,
    order_id: i64,
    amount: f64,
    method: PaymentMethod,
    performer: &Performer,
) -> Result<payment::Model>
where
    C: ConnectionTrait,
{
    if amount < 0.0 || !amount.is_finite() {
        return Err(Error::InvalidAmount { amount });
    }
    let mut active = payment::ActiveModel {
        order_id: Set(Some(order_id)),
        method: Set(method),
        status: Set(PaymentStatus::Pending),
        created_at: Set(Utc::now()),
        amount: Set(amount),
        ..Default::default()
    };
    performer.apply(&mut active);
    active.insert(db).await.map_err(Into::into)
}

/// Most recent payment of an order.
pub async fn latest_payment_for_order<C>(db: &C, order_id: i64) -> Result<Option<payment::Model>>
where
    C: ConnectionTrait,
{
    Payment::find()
        .filter(payment::Column::OrderId.eq(order_id))
        .order_by_desc(payment::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Changes requested on a payment; amount and date cannot be changed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentUpdate {
    pub status: Option<PaymentStatus>,
    pub method: Option<PaymentMethod>,
}

/// Filters accepted by [`list_payments`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentFilter {
    pub order_id: Option<i64>,
    pub method: Option<PaymentMethod>,
    pub status: Option<PaymentStatus>,
    /// Institutional id of the registered performer
    pub performer: Option<String>,
}

/// Payment with its order code and performer name
#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    #[serde(flatten)]
    pub payment: payment::Model,
    pub order_code: Option<String>,
    /// Registered performer's name, or the external name
    pub performer_name: Option<String>,
}

/// Finds a payment by id or fails with not found.
pub async fn get_payment<C>(db: &C, payment_id: i64) -> Result<payment::Model>
where
    C: ConnectionTrait,
{
    Payment::find_by_id(payment_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("payment", payment_id))
}

/// Changes status and/or method of a payment.
///
/// Completing a payment marks its order as paid when the order is still
/// reserved.
///
/// # Errors
/// [`Error::PaymentFinalized`] if the stored payment is completed or failed.
pub async fn update_payment(
    db: &DatabaseConnection,
    payment_id: i64,
    update: PaymentUpdate,
) -> Result<payment::Model> {
    let txn = db.begin().await?;
    let current = get_payment(&txn, payment_id).await?;
    if current.status.is_terminal() {
        return Err(Error::PaymentFinalized);
    }

    let order_id = current.order_id;
    let mut active = current.into_active_model();
    if let Some(status) = update.status {
        active.status = Set(status);
    }
    if let Some(method) = update.method {
        active.method = Set(method);
    }
    let updated = active.update(&txn).await?;

    if updated.status == PaymentStatus::Completed {
        if let Some(order_id) = order_id {
            let paid = orders::get_order(&txn, order_id).await?;
            if paid.status == OrderStatus::Reserved {
                orders::set_order_status(&txn, order_id, OrderStatus::Paid).await?;
                info!(order_id, "Order paid");
            }
        }
    }

    txn.commit().await?;
    Ok(updated)
}

/// Deletes a payment.
pub async fn delete_payment(db: &DatabaseConnection, payment_id: i64) -> Result<()> {
    let result = Payment::delete_by_id(payment_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("payment", payment_id));
    }
    Ok(())
}

/// Adds order codes and performer names to payments.
pub async fn to_views(
    db: &DatabaseConnection,
    rows: Vec<payment::Model>,
) -> Result<Vec<PaymentView>> {
    let codes: HashMap<i64, Option<String>> = Order::find()
        .filter(order::Column::Id.is_in(rows.iter().filter_map(|p| p.order_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|o| (o.id, o.code))
        .collect();
    let performers: HashMap<i64, String> = User::find()
        .filter(user::Column::Id.is_in(rows.iter().filter_map(|p| p.performed_by)))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();

    Ok(rows
        .into_iter()
        .map(|payment| PaymentView {
            order_code: payment
                .order_id
                .and_then(|id| codes.get(&id).cloned().flatten()),
            performer_name: payment
                .performed_by
                .and_then(|id| performers.get(&id).cloned())
                .or_else(|| payment.external_name.clone()),
            payment,
        })
        .collect())
}

/// Lists payments, newest first unless asked otherwise.
///
/// The search term matches the performer's name, the external name, or the
/// name of the customer who placed the order.
pub async fn list_payments(
    db: &DatabaseConnection,
    filter: &PaymentFilter,
    params: &ListParams,
) -> Result<Page<PaymentView>> {
    let mut condition = Condition::all();
    if let Some(order_id) = filter.order_id {
        condition = condition.add(payment::Column::OrderId.eq(order_id));
    }
    if let Some(method) = filter.method {
        condition = condition.add(payment::Column::Method.eq(method));
    }
    if let Some(status) = filter.status {
        condition = condition.add(payment::Column::Status.eq(status));
    }
    if let Some(institutional_id) = &filter.performer {
        let performer = users::require_user_by_institutional_id(db, institutional_id).await?;
        condition = condition.add(payment::Column::PerformedBy.eq(performer.id));
    }
    if let Some(term) = params.search_term() {
        let matching_users: Vec<i64> = User::find()
            .filter(user::Column::Name.contains(term))
            .all(db)
            .await?
            .into_iter()
            .map(|u| u.id)
            .collect();
        let matching_orders: Vec<i64> = Order::find()
            .filter(order::Column::UserId.is_in(matching_users.clone()))
            .all(db)
            .await?
            .into_iter()
            .map(|o| o.id)
            .collect();
        condition = condition.add(
            Condition::any()
                .add(payment::Column::ExternalName.contains(term))
                .add(payment::Column::PerformedBy.is_in(matching_users))
                .add(payment::Column::OrderId.is_in(matching_orders)),
        );
    }

    let mut query = Payment::find().filter(condition);
    query = match params.ordering(&["date", "amount"])? {
        Some(("amount", order)) => query.order_by(payment::Column::Amount, order),
        Some((_, order)) => query.order_by(payment::Column::CreatedAt, order),
        None => query.order_by_desc(payment::Column::CreatedAt),
    }
    .order_by_desc(payment::Column::Id);

    let mut page = listing::paginate(db, query, params).await?;
    let rows = std::mem::take(&mut page.results);
    let views = to_views(db, rows).await?;
    Ok(page.with_results(views))
}
