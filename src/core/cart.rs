//! Cart business logic - One cart per user, created on first use.
//!
//! Checking out turns the cart's lines into a pending reservation and empties
//! the cart.

use crate::{
    core::{
        item as items,
        order::OrderLine,
        reservation as reservations,
        round_to,
    },
    entities::{Cart, CartItem, Item, cart, cart_item, item, reservation, user},
    errors::{Error, Result, is_unique_violation},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{IntoActiveModel, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// A cart line with item details
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub item_id: i64,
    pub item_name: Option<String>,
    pub unit_price: f64,
    pub quantity: i32,
    pub line_total: f64,
    /// Whether the item can still be ordered
    pub available: bool,
}

/// Cart contents and total
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    #[serde(flatten)]
    pub cart: cart::Model,
    pub items: Vec<CartLineView>,
    pub total: f64,
}

/// Returns the user's cart, creating an empty one if needed.
pub async fn get_or_create_cart<C>(db: &C, user_id: i64) -> Result<cart::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = Cart::find()
        .filter(cart::Column::UserId.eq(user_id))
        .one(db)
        .await?
    {
        return Ok(existing);
    }
    let now = Utc::now();
    let inserted = cart::ActiveModel {
        user_id: Set(user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await;
    match inserted {
        Ok(created) => Ok(created),
        Err(err) if is_unique_violation(&err) => Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("cart", user_id)),
        Err(err) => Err(err.into()),
    }
}

async fn touch<C>(db: &C, cart: cart::Model) -> Result<cart::Model>
where
    C: ConnectionTrait,
{
    let mut active = cart.into_active_model();
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

async fn find_line<C>(db: &C, cart_id: i64, item_id: i64) -> Result<Option<cart_item::Model>>
where
    C: ConnectionTrait,
{
    CartItem::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .filter(cart_item::Column::ItemId.eq(item_id))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn cart_lines<C>(db: &C, cart_id: i64) -> Result<Vec<cart_item::Model>>
where
    C: ConnectionTrait,
{
    CartItem::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .order_by_asc(cart_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds units of an item, merging with an existing line.
pub async fn add_item(
    db: &DatabaseConnection,
    user_id: i64,
    item_id: i64,
    quantity: i32,
) -> Result<CartView> {
    if quantity < 1 {
        return Err(Error::validation("quantity", "quantity must be at least 1"));
    }
    items::require_available_item(db, item_id).await?;
    let cart = get_or_create_cart(db, user_id).await?;

    match find_line(db, cart.id, item_id).await? {
        Some(line) => {
            let merged = line.quantity + quantity;
            let mut active = line.into_active_model();
            active.quantity = Set(merged);
            active.update(db).await?;
        }
        None => {
            cart_item::ActiveModel {
                cart_id: Set(cart.id),
                item_id: Set(item_id),
                quantity: Set(quantity),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }
    touch(db, cart).await?;
    cart_view(db, user_id).await
}

/// Sets the quantity of a line; zero removes it.
pub async fn set_item_quantity(
    db: &DatabaseConnection,
    user_id: i64,
    item_id: i64,
    quantity: i32,
) -> Result<CartView> {
    if quantity < 0 {
        return Err(Error::validation("quantity", "quantity cannot be negative"));
    }
    if quantity == 0 {
        return remove_item(db, user_id, item_id).await;
    }
    let cart = get_or_create_cart(db, user_id).await?;
    let line = find_line(db, cart.id, item_id)
        .await?
        .ok_or_else(|| Error::not_found("cart item", item_id))?;
    let mut active = line.into_active_model();
    active.quantity = Set(quantity);
    active.update(db).await?;
    touch(db, cart).await?;
    cart_view(db, user_id).await
}

/// Removes an item from the cart.
pub async fn remove_item(db: &DatabaseConnection, user_id: i64, item_id: i64) -> Result<CartView> {
    let cart = get_or_create_cart(db, user_id).await?;
    let result = CartItem::delete_many()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .filter(cart_item::Column::ItemId.eq(item_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("cart item", item_id));
    }
    touch(db, cart).await?;
    cart_view(db, user_id).await
}

/// Empties the cart.
pub async fn clear_cart(db: &DatabaseConnection, user_id: i64) -> Result<CartView> {
    let cart = get_or_create_cart(db, user_id).await?;
    CartItem::delete_many()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .exec(db)
        .await?;
    touch(db, cart).await?;
    cart_view(db, user_id).await
}

/// Contents of the user's cart with line totals.
pub async fn cart_view(db: &DatabaseConnection, user_id: i64) -> Result<CartView> {
    let cart = get_or_create_cart(db, user_id).await?;
    let lines = cart_lines(db, cart.id).await?;
    let catalog: HashMap<i64, item::Model> = Item::find()
        .filter(item::Column::Id.is_in(lines.iter().map(|l| l.item_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();

    let items: Vec<CartLineView> = lines
        .into_iter()
        .map(|line| {
            let listed = catalog.get(&line.item_id);
            let unit_price = listed.map_or(0.0, |i| i.price);
            CartLineView {
                item_id: line.item_id,
                item_name: listed.map(|i| i.name.clone()),
                unit_price,
                quantity: line.quantity,
                line_total: round_to(unit_price * f64::from(line.quantity), 2),
                available: listed.is_some_and(|i| i.available),
            }
        })
        .collect();
    Ok(CartView {
        total: round_to(items.iter().map(|l| l.line_total).sum(), 2),
        items,
        cart,
    })
}

/// Turns the cart into a pending reservation and empties it.
///
/// # Errors
/// Validation error when the cart is empty; any reservation error otherwise,
/// in which case the cart is left untouched.
pub async fn checkout(
    db: &DatabaseConnection,
    customer: &user::Model,
    pickup_date: Option<NaiveDate>,
) -> Result<reservation::Model> {
    let txn = db.begin().await?;
    let cart = get_or_create_cart(&txn, customer.id).await?;
    let lines: Vec<OrderLine> = cart_lines(&txn, cart.id)
        .await?
        .into_iter()
        .map(|line| OrderLine {
            item_id: line.item_id,
            quantity: line.quantity,
        })
        .collect();
    if lines.is_empty() {
        return Err(Error::validation("cart", "the cart is empty"));
    }

    let placed = reservations::place_reservation(&txn, customer, pickup_date, &lines).await?;
    CartItem::delete_many()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .exec(&txn)
        .await?;
    touch(&txn, cart).await?;
    txn.commit().await?;

    info!(
        user_id = customer.id,
        reservation_id = placed.id,
        "Cart checked out"
    );
    Ok(placed)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::ReservationStatus;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_concurrent_get_or_create_cart_shares_one_cart() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "A00001", "Juan Perez").await?;
        let (first, second) = tokio::join!(
            get_or_create_cart(&db, user.id),
            get_or_create_cart(&db, user.id)
        );
        assert_eq!(first?.id, second?.id);
        assert_eq!(Cart::find().all(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_item_merges_lines() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, lomo) = setup_with_item(&db).await?;
        let user = create_test_user(&db, "A00001", "Juan Perez").await?;

        add_item(&db, user.id, lomo.id, 1).await?;
        let view = add_item(&db, user.id, lomo.id, 2).await?;
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 3);
        assert_eq!(view.total, round_to(lomo.price * 3.0, 2));

        let bad = add_item(&db, user.id, lomo.id, 0).await;
        assert!(matches!(bad, Err(Error::Validation { field: "quantity", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_quantity_zero_removes_line() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, lomo) = setup_with_item(&db).await?;
        let user = create_test_user(&db, "A00001", "Juan Perez").await?;

        add_item(&db, user.id, lomo.id, 2).await?;
        let view = set_item_quantity(&db, user.id, lomo.id, 5).await?;
        assert_eq!(view.items[0].quantity, 5);

        let view = set_item_quantity(&db, user.id, lomo.id, 0).await?;
        assert!(view.items.is_empty());
        assert_eq!(view.total, 0.0);

        let missing = remove_item(&db, user.id, lomo.id).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_one_cart_per_user() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "A00001", "Juan Perez").await?;
        let first = get_or_create_cart(&db, user.id).await?;
        let second = get_or_create_cart(&db, user.id).await?;
        assert_eq!(first.id, second.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_creates_reservation_and_empties_cart() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, lomo) = setup_with_item(&db).await?;
        let user = create_test_user(&db, "A00001", "Juan Perez").await?;

        let empty = checkout(&db, &user, None).await;
        assert!(matches!(empty, Err(Error::Validation { field: "cart", .. })));

        add_item(&db, user.id, lomo.id, 2).await?;
        let placed = checkout(&db, &user, None).await?;
        assert_eq!(placed.status, ReservationStatus::Pending);
        assert_eq!(placed.user_id, user.id);

        let view = reservations::get_reservation_view(&db, placed.id).await?;
        assert_eq!(view.items[0].quantity, 2);
        assert!(cart_view(&db, user.id).await?.items.is_empty());
        Ok(())
    }
}
