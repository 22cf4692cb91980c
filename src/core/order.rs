//! Order business logic - Placing, updating and reading orders.
//!
//! Placing an order is atomic: the order, its lines and a pending payment for
//! the total are written in one database transaction.
//!
//! Status flow: `Reserved → Paid | Cancelled`, `Paid → Delivered | Cancelled`.
//! `Delivered` and `Cancelled` are final. Setting the current status again is
//! always accepted.

use crate::{
    core::{
        codes::{self, ORDER_CODE_PREFIX},
        item as items,
        listing::{self, ListParams, Page},
        menu, nullable, payment as payments,
        payment::Performer,
        round_to, user as users,
    },
    entities::{
        Category, Item, Menu, Order, OrderItem, OrderStatus, Payment, PaymentMethod, User, category,
        item, order, order_item, payment, user,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{
    ActiveEnum, Condition, IntoActiveModel, QueryOrder, Set, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument};

/// One requested line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderLine {
    /// Ordered item
    pub item_id: i64,
    /// Units, at least 1
    pub quantity: i32,
}

/// Everything needed to place an order
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    /// Customer's institutional id
    #[serde(default)]
    pub user: String,
    /// Menu the order is placed against
    pub menu_id: Option<i64>,
    /// Day of the order; today when absent
    pub order_date: Option<NaiveDate>,
    /// Ordered lines
    pub items: Vec<OrderLine>,
    /// How the order will be paid
    #[serde(default = "default_payment_method")]
    pub payment_method: PaymentMethod,
    /// Institutional id of the person taking the payment
    pub performer_institutional_id: Option<String>,
    /// Name of the person taking the payment
    pub performer_name: Option<String>,
}

pub(crate) const fn default_payment_method() -> PaymentMethod {
    PaymentMethod::Cash
}

/// Partial update of an order
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub menu_id: Option<Option<i64>>,
    /// Replaces every line and recomputes the payment amount
    pub items: Option<Vec<OrderLine>>,
    pub payment_method: Option<PaymentMethod>,
    pub performer_institutional_id: Option<String>,
    pub performer_name: Option<String>,
}

/// Filters accepted by [`list_orders`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    /// Customer's institutional id
    pub user: Option<String>,
    pub status: Option<OrderStatus>,
    pub order_date: Option<NaiveDate>,
    pub menu_id: Option<i64>,
}

/// An order line with item details
#[derive(Debug, Clone, Serialize)]
pub struct OrderLineView {
    pub item_id: i64,
    pub item_name: Option<String>,
    pub category_name: Option<String>,
    pub image_url: Option<String>,
    pub unit_price: f64,
    pub quantity: i32,
    pub line_total: f64,
}

/// Order as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: order::Model,
    pub user_name: Option<String>,
    pub items: Vec<OrderLineView>,
    /// Sum of the line totals
    pub total: f64,
    pub payments: Vec<payment::Model>,
}

/// Checks an order status change against the allowed flow.
pub fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<()> {
    use OrderStatus::{Cancelled, Delivered, Paid, Reserved};
    let allowed = from == to
        || matches!(
            (from, to),
            (Reserved, Paid | Cancelled) | (Paid, Delivered | Cancelled)
        );
    if allowed {
        Ok(())
    } else {
        Err(Error::InvalidTransition {
            entity: "order",
            from: from.to_value(),
            to: to.to_value(),
        })
    }
}

/// Rejects empty line lists and quantities below one.
pub fn validate_lines(lines: &[OrderLine]) -> Result<()> {
    if lines.is_empty() {
        return Err(Error::validation("items", "at least one item is required"));
    }
    if let Some(line) = lines.iter().find(|l| l.quantity < 1) {
        return Err(Error::validation(
            "quantity",
            format!("quantity for item {} must be at least 1", line.item_id),
        ));
    }
    Ok(())
}

/// Writes the lines of an order and returns their total.
///
/// Every item must exist and be available.
pub(crate) async fn insert_lines<C>(db: &C, order_id: i64, lines: &[OrderLine]) -> Result<f64>
where
    C: ConnectionTrait,
{
    let mut total = 0.0;
    for line in lines {
        let ordered = items::require_available_item(db, line.item_id).await?;
        total += ordered.price * f64::from(line.quantity);
        order_item::ActiveModel {
            order_id: Set(order_id),
            item_id: Set(line.item_id),
            quantity: Set(line.quantity),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(round_to(total, 2))
}

/// Places an order inside an open transaction.
pub(crate) async fn place_order<C>(db: &C, input: &NewOrder) -> Result<(order::Model, payment::Model)>
where
    C: ConnectionTrait,
{
    validate_lines(&input.items)?;
    let customer = users::require_user_by_institutional_id(db, input.user.trim()).await?;
    if let Some(menu_id) = input.menu_id {
        Menu::find_by_id(menu_id)
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("menu", menu_id))?;
    }

    let order_date = input.order_date.unwrap_or_else(menu::today);
    let placed = codes::insert_with_code::<_, order::ActiveModel, _>(
        db,
        order::Column::Code,
        ORDER_CODE_PREFIX,
        &customer.name,
        |code| order::ActiveModel {
            user_id: Set(customer.id),
            menu_id: Set(input.menu_id),
            order_date: Set(order_date),
            status: Set(OrderStatus::Reserved),
            code: Set(Some(code)),
            ..Default::default()
        },
    )
    .await?;

    let total = insert_lines(db, placed.id, &input.items).await?;
    let performer = Performer::resolve(
        db,
        input.performer_institutional_id.as_deref(),
        input.performer_name.as_deref(),
    )
    .await?;
    let pending =
        payments::insert_pending_payment(db, placed.id, total, input.payment_method, &performer)
            .await?;
    Ok((placed, pending))
}

/// Places an order with its lines and a pending payment for the total.
#[instrument(skip(db, input), fields(user = %input.user))]
pub async fn create_order(db: &DatabaseConnection, input: NewOrder) -> Result<order::Model> {
    let txn = db.begin().await?;
    let (placed, pending) = place_order(&txn, &input).await?;
    txn.commit().await?;
    info!(
        order_id = placed.id,
        amount = pending.amount,
        "Order {} placed",
        placed.code.as_deref().unwrap_or_default()
    );
    Ok(placed)
}

/// Places several orders; either all of them are stored or none.
pub async fn create_orders_bulk(
    db: &DatabaseConnection,
    inputs: Vec<NewOrder>,
) -> Result<Vec<order::Model>> {
    if inputs.is_empty() {
        return Err(Error::validation("orders", "at least one order is required"));
    }
    let txn = db.begin().await?;
    let mut placed = Vec::with_capacity(inputs.len());
    for input in &inputs {
        placed.push(place_order(&txn, input).await?.0);
    }
    txn.commit().await?;
    info!("Placed {} orders in bulk", placed.len());
    Ok(placed)
}

/// Finds an order by id or fails with not found.
pub async fn get_order<C>(db: &C, order_id: i64) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("order", order_id))
}

/// Moves an order to `status`, checking the allowed flow.
pub async fn set_order_status<C>(db: &C, order_id: i64, status: OrderStatus) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    let current = get_order(db, order_id).await?;
    check_transition(current.status, status)?;
    if current.status == status {
        return Ok(current);
    }
    let mut active = current.into_active_model();
    active.status = Set(status);
    active.update(db).await.map_err(Into::into)
}

/// Updates status, menu, lines and payment details of an order.
///
/// New lines replace the old ones and the latest payment is re-priced. A
/// pending payment is created when the order has none.
pub async fn update_order(
    db: &DatabaseConnection,
    order_id: i64,
    update: OrderUpdate,
) -> Result<order::Model> {
    let txn = db.begin().await?;
    let current = get_order(&txn, order_id).await?;

    let mut active = current.clone().into_active_model();
    if let Some(status) = update.status {
        check_transition(current.status, status)?;
        active.status = Set(status);
    }
    if let Some(menu_id) = update.menu_id {
        if let Some(id) = menu_id {
            Menu::find_by_id(id)
                .one(&txn)
                .await?
                .ok_or_else(|| Error::not_found("menu", id))?;
        }
        active.menu_id = Set(menu_id);
    }
    let updated = active.update(&txn).await?;

    let latest = payments::latest_payment_for_order(&txn, order_id).await?;
    let performer_given =
        update.performer_institutional_id.is_some() || update.performer_name.is_some();

    if let Some(lines) = update.items {
        validate_lines(&lines)?;
        OrderItem::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        let total = insert_lines(&txn, order_id, &lines).await?;
        let performer = Performer::resolve(
            &txn,
            update.performer_institutional_id.as_deref(),
            update.performer_name.as_deref(),
        )
        .await?;
        match latest {
            Some(existing) => {
                if existing.status.is_terminal() {
                    return Err(Error::PaymentFinalized);
                }
                let mut payment = existing.into_active_model();
                payment.amount = Set(total);
                if let Some(method) = update.payment_method {
                    payment.method = Set(method);
                }
                if performer_given {
                    performer.apply(&mut payment);
                }
                payment.update(&txn).await?;
            }
            None => {
                let method = update.payment_method.unwrap_or_else(default_payment_method);
                payments::insert_pending_payment(&txn, order_id, total, method, &performer)
                    .await?;
            }
        }
    } else if update.payment_method.is_some() || performer_given {
        if let Some(existing) = latest {
            if existing.status.is_terminal() {
                return Err(Error::PaymentFinalized);
            }
            let performer = Performer::resolve(
                &txn,
                update.performer_institutional_id.as_deref(),
                update.performer_name.as_deref(),
            )
            .await?;
            let mut payment = existing.into_active_model();
            if let Some(method) = update.payment_method {
                payment.method = Set(method);
            }
            if performer_given {
                performer.apply(&mut payment);
            }
            payment.update(&txn).await?;
        }
    }

    txn.commit().await?;
    Ok(updated)
}

/// Deletes an order with its lines and payments.
pub async fn delete_order(db: &DatabaseConnection, order_id: i64) -> Result<()> {
    let result = Order::delete_by_id(order_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("order", order_id));
    }
    Ok(())
}

/// Lines of an order, in insertion order.
pub async fn order_lines<C>(db: &C, order_id: i64) -> Result<Vec<order_item::Model>>
where
    C: ConnectionTrait,
{
    OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Builds read models for several orders.
pub async fn to_views(
    db: &DatabaseConnection,
    orders: Vec<order::Model>,
    base_url: &str,
) -> Result<Vec<OrderView>> {
    let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let user_names: HashMap<i64, String> = User::find()
        .filter(user::Column::Id.is_in(orders.iter().map(|o| o.user_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();

    let lines = OrderItem::find()
        .filter(order_item::Column::OrderId.is_in(order_ids.clone()))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await?;
    let catalog: HashMap<i64, item::Model> = Item::find()
        .filter(item::Column::Id.is_in(lines.iter().map(|l| l.item_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();
    let categories: HashMap<i64, String> = Category::find()
        .filter(category::Column::Id.is_in(catalog.values().map(|i| i.category_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let mut lines_by_order: HashMap<i64, Vec<OrderLineView>> = HashMap::new();
    for line in lines {
        let listed = catalog.get(&line.item_id);
        let unit_price = listed.map_or(0.0, |i| i.price);
        lines_by_order
            .entry(line.order_id)
            .or_default()
            .push(OrderLineView {
                item_id: line.item_id,
                item_name: listed.map(|i| i.name.clone()),
                category_name: listed.and_then(|i| categories.get(&i.category_id).cloned()),
                image_url: listed
                    .and_then(|i| items::image_url(base_url, i.image_path.as_deref())),
                unit_price,
                quantity: line.quantity,
                line_total: round_to(unit_price * f64::from(line.quantity), 2),
            });
    }

    let mut payments_by_order: HashMap<i64, Vec<payment::Model>> = HashMap::new();
    for p in Payment::find()
        .filter(payment::Column::OrderId.is_in(order_ids))
        .order_by_asc(payment::Column::Id)
        .all(db)
        .await?
    {
        if let Some(order_id) = p.order_id {
            payments_by_order.entry(order_id).or_default().push(p);
        }
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let lines = lines_by_order.remove(&order.id).unwrap_or_default();
            let total = round_to(lines.iter().map(|l| l.line_total).sum(), 2);
            OrderView {
                user_name: user_names.get(&order.user_id).cloned(),
                payments: payments_by_order.remove(&order.id).unwrap_or_default(),
                items: lines,
                total,
                order,
            }
        })
        .collect())
}

/// Read model of a single order.
pub async fn get_order_view(
    db: &DatabaseConnection,
    order_id: i64,
    base_url: &str,
) -> Result<OrderView> {
    let found = get_order(db, order_id).await?;
    to_views(db, vec![found], base_url)
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("order", order_id))
}

/// Lists orders, newest first unless asked otherwise.
pub async fn list_orders(
    db: &DatabaseConnection,
    filter: &OrderFilter,
    params: &ListParams,
    base_url: &str,
) -> Result<Page<OrderView>> {
    let mut condition = Condition::all();
    if let Some(institutional_id) = &filter.user {
        let customer = users::require_user_by_institutional_id(db, institutional_id).await?;
        condition = condition.add(order::Column::UserId.eq(customer.id));
    }
    if let Some(status) = filter.status {
        condition = condition.add(order::Column::Status.eq(status));
    }
    if let Some(date) = filter.order_date {
        condition = condition.add(order::Column::OrderDate.eq(date));
    }
    if let Some(menu_id) = filter.menu_id {
        condition = condition.add(order::Column::MenuId.eq(menu_id));
    }
    if let Some(term) = params.search_term() {
        condition = condition.add(order::Column::Code.contains(term));
    }

    let mut query = Order::find().filter(condition);
    query = match params.ordering(&["order_date", "status"])? {
        Some(("status", order)) => query.order_by(order::Column::Status, order),
        Some((_, order)) => query.order_by(order::Column::OrderDate, order),
        None => query.order_by_desc(order::Column::OrderDate),
    }
    .order_by_desc(order::Column::Id);

    let mut page = listing::paginate(db, query, params).await?;
    let rows = std::mem::take(&mut page.results);
    let views = to_views(db, rows, base_url).await?;
    Ok(page.with_results(views))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::PaymentStatus;
    use crate::test_utils::*;

    #[test]
    fn test_check_transition() {
        use OrderStatus::*;
        assert!(check_transition(Reserved, Paid).is_ok());
        assert!(check_transition(Reserved, Cancelled).is_ok());
        assert!(check_transition(Paid, Delivered).is_ok());
        assert!(check_transition(Paid, Cancelled).is_ok());
        assert!(check_transition(Delivered, Delivered).is_ok());

        assert!(check_transition(Reserved, Delivered).is_err());
        assert!(check_transition(Delivered, Paid).is_err());
        let err = check_transition(Cancelled, Reserved).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot change order status from cancelled to reserved"
        );
    }

    #[tokio::test]
    async fn test_create_order_rejects_bad_lines() -> Result<()> {
        let db = setup_test_db().await?;
        let mut input = new_order_input("A00001", vec![]);
        assert!(matches!(
            place_order(&db, &input).await,
            Err(Error::Validation { field: "items", .. })
        ));
        input.items = vec![OrderLine {
            item_id: 1,
            quantity: 0,
        }];
        assert!(matches!(
            place_order(&db, &input).await,
            Err(Error::Validation { field: "quantity", .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_order_writes_lines_and_pending_payment() -> Result<()> {
        let db = setup_test_db().await?;
        let (category, lomo) = setup_with_item(&db).await?;
        let juice = crate::core::item::create_item(&db, item_input("Jugo", category.id, 3.5)).await?;
        create_test_user(&db, "A00001", "juan perez").await?;

        let placed = create_order(
            &db,
            new_order_input(
                "A00001",
                vec![
                    OrderLine {
                        item_id: lomo.id,
                        quantity: 2,
                    },
                    OrderLine {
                        item_id: juice.id,
                        quantity: 1,
                    },
                ],
            ),
        )
        .await?;

        assert_eq!(placed.status, OrderStatus::Reserved);
        let code = placed.code.clone().unwrap();
        assert!(code.starts_with("TECJP-"), "unexpected code {code}");

        let view = get_order_view(&db, placed.id, "").await?;
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.total, round_to(lomo.price * 2.0 + 3.5, 2));
        assert_eq!(view.payments.len(), 1);
        assert_eq!(view.payments[0].status, PaymentStatus::Pending);
        assert_eq!(view.payments[0].amount, view.total);
        assert_eq!(view.user_name.as_deref(), Some("juan perez"));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_order_is_atomic() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, lomo) = setup_with_item(&db).await?;
        create_test_user(&db, "A00001", "Juan Perez").await?;

        let result = create_order(
            &db,
            new_order_input(
                "A00001",
                vec![
                    OrderLine {
                        item_id: lomo.id,
                        quantity: 1,
                    },
                    OrderLine {
                        item_id: 999,
                        quantity: 1,
                    },
                ],
            ),
        )
        .await;
        assert!(matches!(result, Err(Error::NotFound { entity: "item", .. })));
        assert!(Order::find().all(&db).await?.is_empty());
        assert!(Payment::find().all(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_performer_linking() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, lomo) = setup_with_item(&db).await?;
        create_test_user(&db, "A00001", "Juan Perez").await?;
        let cashier = create_test_admin(&db, "ADM001", "Rosa Caja").await?;
        let line = vec![OrderLine {
            item_id: lomo.id,
            quantity: 1,
        }];

        let mut input = new_order_input("A00001", line.clone());
        input.performer_institutional_id = Some("ADM001".to_string());
        input.performer_name = Some("Rosa Caja".to_string());
        let placed = create_order(&db, input).await?;
        let view = get_order_view(&db, placed.id, "").await?;
        assert_eq!(view.payments[0].performed_by, Some(cashier.id));
        assert_eq!(view.payments[0].external_name, None);

        let mut input = new_order_input("A00001", line);
        input.performer_institutional_id = Some("EXT123".to_string());
        input.performer_name = Some("Visitante".to_string());
        let placed = create_order(&db, input).await?;
        let view = get_order_view(&db, placed.id, "").await?;
        assert_eq!(view.payments[0].performed_by, None);
        assert_eq!(view.payments[0].external_institutional_id.as_deref(), Some("EXT123"));
        assert_eq!(view.payments[0].external_name.as_deref(), Some("Visitante"));
        Ok(())
    }

    #[tokio::test]
    async fn test_bulk_create_is_all_or_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, lomo) = setup_with_item(&db).await?;
        create_test_user(&db, "A00001", "Juan Perez").await?;
        let line = vec![OrderLine {
            item_id: lomo.id,
            quantity: 1,
        }];

        let result = create_orders_bulk(
            &db,
            vec![
                new_order_input("A00001", line.clone()),
                new_order_input("ZZZ999", line.clone()),
            ],
        )
        .await;
        assert!(result.is_err());
        assert!(Order::find().all(&db).await?.is_empty());

        let placed = create_orders_bulk(
            &db,
            vec![
                new_order_input("A00001", line.clone()),
                new_order_input("A00001", line),
            ],
        )
        .await?;
        assert_eq!(placed.len(), 2);
        assert_ne!(placed[0].code, placed[1].code);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_order_replaces_lines_and_reprices() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, lomo) = setup_with_item(&db).await?;
        create_test_user(&db, "A00001", "Juan Perez").await?;
        let placed = create_order(
            &db,
            new_order_input(
                "A00001",
                vec![OrderLine {
                    item_id: lomo.id,
                    quantity: 1,
                }],
            ),
        )
        .await?;

        update_order(
            &db,
            placed.id,
            OrderUpdate {
                items: Some(vec![OrderLine {
                    item_id: lomo.id,
                    quantity: 3,
                }]),
                payment_method: Some(PaymentMethod::Card),
                ..OrderUpdate::default()
            },
        )
        .await?;

        let view = get_order_view(&db, placed.id, "").await?;
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 3);
        assert_eq!(view.payments.len(), 1);
        assert_eq!(view.payments[0].amount, round_to(lomo.price * 3.0, 2));
        assert_eq!(view.payments[0].method, PaymentMethod::Card);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_order_status_flow() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, lomo) = setup_with_item(&db).await?;
        create_test_user(&db, "A00001", "Juan Perez").await?;
        let placed = create_order(
            &db,
            new_order_input(
                "A00001",
                vec![OrderLine {
                    item_id: lomo.id,
                    quantity: 1,
                }],
            ),
        )
        .await?;

        let status = |s| OrderUpdate {
            status: Some(s),
            ..OrderUpdate::default()
        };
        let result = update_order(&db, placed.id, status(OrderStatus::Delivered)).await;
        assert!(matches!(result, Err(Error::InvalidTransition { .. })));

        update_order(&db, placed.id, status(OrderStatus::Paid)).await?;
        let delivered = update_order(&db, placed.id, status(OrderStatus::Delivered)).await?;
        assert_eq!(delivered.status, OrderStatus::Delivered);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_orders_filters() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, lomo) = setup_with_item(&db).await?;
        create_test_user(&db, "A00001", "Juan Perez").await?;
        create_test_user(&db, "A00002", "Ana Diaz").await?;
        let line = vec![OrderLine {
            item_id: lomo.id,
            quantity: 1,
        }];
        let first = create_order(&db, new_order_input("A00001", line.clone())).await?;
        create_order(&db, new_order_input("A00002", line)).await?;

        let filter = OrderFilter {
            user: Some("A00001".to_string()),
            ..OrderFilter::default()
        };
        let page = list_orders(&db, &filter, &ListParams::default(), "").await?;
        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].order.id, first.id);

        let params = ListParams {
            search: first.code.clone(),
            ..ListParams::default()
        };
        let page = list_orders(&db, &OrderFilter::default(), &params, "").await?;
        assert_eq!(page.count, 1);

        let page = list_orders(&db, &OrderFilter::default(), &ListParams::default(), "").await?;
        assert_eq!(page.count, 2);
        // Same date, so newest id first
        assert_ne!(page.results[0].order.id, first.id);
        Ok(())
    }
}
