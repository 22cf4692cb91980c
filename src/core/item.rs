//! Item business logic - Catalog entries and their read model.
//!
//! Saving an item keeps today's menu in sync: an available item is added to
//! today's menu (the menu is created on demand) and an unavailable one is
//! removed from it.

use crate::{
    core::{
        feedback::{self, RatingSummary},
        listing::{self, ListParams, Page},
        menu, nullable,
    },
    entities::{Category, Item, item},
    errors::{Error, Result},
};
use sea_orm::{Condition, IntoActiveModel, QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Full description of an item, used on creation
#[derive(Debug, Clone, Deserialize)]
pub struct ItemInput {
    /// Dish name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Unit price
    pub price: f64,
    /// Category id
    pub category_id: i64,
    /// Whether the item can be ordered
    #[serde(default = "default_available")]
    pub available: bool,
    /// Relative image path or absolute URL
    pub image_path: Option<String>,
    /// Ingredient list
    pub ingredients: Option<String>,
    /// Kilocalories per serving
    pub calories: Option<i32>,
    /// Grams of protein
    pub proteins: Option<f64>,
    /// Grams of fat
    pub fats: Option<f64>,
    /// Grams of carbohydrates
    pub carbohydrates: Option<f64>,
}

const fn default_available() -> bool {
    true
}

/// Partial update of an item; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub price: Option<f64>,
    pub category_id: Option<i64>,
    pub available: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_path: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub ingredients: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub calories: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub proteins: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub fats: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub carbohydrates: Option<Option<f64>>,
}

/// Filters accepted by [`list_items`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemFilter {
    /// Category id
    pub category_id: Option<i64>,
    /// Availability flag
    pub available: Option<bool>,
}

/// Item as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    /// Stored item
    #[serde(flatten)]
    pub item: item::Model,
    /// Name of the item's category
    pub category_name: Option<String>,
    /// Absolute URL of the image
    pub image_url: Option<String>,
    /// Rating aggregates
    #[serde(flatten)]
    pub rating: RatingSummary,
}

fn validate_price(price: f64) -> Result<()> {
    if price < 0.0 || !price.is_finite() {
        return Err(Error::InvalidAmount { amount: price });
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("name", "item name cannot be empty"));
    }
    Ok(name.to_string())
}

async fn ensure_category(db: &DatabaseConnection, category_id: i64) -> Result<()> {
    Category::find_by_id(category_id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or_else(|| Error::not_found("category", category_id))
}

/// Builds the absolute URL of an image path.
#[must_use]
pub fn image_url(base_url: &str, image_path: Option<&str>) -> Option<String> {
    let path = image_path?.trim();
    if path.is_empty() {
        return None;
    }
    if path.starts_with("http://") || path.starts_with("https://") {
        return Some(path.to_string());
    }
    Some(format!("{base_url}/media/{}", path.trim_start_matches('/')))
}

/// Adds the item to today's menu when available, removes it otherwise.
async fn sync_daily_menu(db: &DatabaseConnection, item: &item::Model) -> Result<()> {
    let today = menu::today();
    if item.available {
        let daily = menu::get_or_create_menu_for(db, today).await?;
        menu::link_item(db, daily.id, item.id).await?;
        debug!(item_id = item.id, menu_id = daily.id, "Item listed on today's menu");
    } else {
        menu::unlink_item_for_date(db, today, item.id).await?;
        debug!(item_id = item.id, "Item removed from today's menu");
    }
    Ok(())
}

/// Creates an item and updates today's menu.
pub async fn create_item(db: &DatabaseConnection, input: ItemInput) -> Result<item::Model> {
    let name = validate_name(&input.name)?;
    validate_price(input.price)?;
    ensure_category(db, input.category_id).await?;

    let created = item::ActiveModel {
        name: Set(name),
        description: Set(input.description),
        price: Set(input.price),
        category_id: Set(input.category_id),
        available: Set(input.available),
        image_path: Set(input.image_path),
        ingredients: Set(input.ingredients),
        calories: Set(input.calories),
        proteins: Set(input.proteins),
        fats: Set(input.fats),
        carbohydrates: Set(input.carbohydrates),
        ..Default::default()
    }
    .insert(db)
    .await?;

    sync_daily_menu(db, &created).await?;
    Ok(created)
}

/// Applies a partial update and updates today's menu.
pub async fn update_item(
    db: &DatabaseConnection,
    item_id: i64,
    update: ItemUpdate,
) -> Result<item::Model> {
    let mut active = require_item(db, item_id).await?.into_active_model();

    if let Some(name) = update.name {
        active.name = Set(validate_name(&name)?);
    }
    if let Some(price) = update.price {
        validate_price(price)?;
        active.price = Set(price);
    }
    if let Some(category_id) = update.category_id {
        ensure_category(db, category_id).await?;
        active.category_id = Set(category_id);
    }
    if let Some(available) = update.available {
        active.available = Set(available);
    }
    if let Some(description) = update.description {
        active.description = Set(description);
    }
    if let Some(image_path) = update.image_path {
        active.image_path = Set(image_path);
    }
    if let Some(ingredients) = update.ingredients {
        active.ingredients = Set(ingredients);
    }
    if let Some(calories) = update.calories {
        active.calories = Set(calories);
    }
    if let Some(proteins) = update.proteins {
        active.proteins = Set(proteins);
    }
    if let Some(fats) = update.fats {
        active.fats = Set(fats);
    }
    if let Some(carbohydrates) = update.carbohydrates {
        active.carbohydrates = Set(carbohydrates);
    }

    let updated = active.update(db).await?;
    sync_daily_menu(db, &updated).await?;
    Ok(updated)
}

/// Deletes an item; menu, cart and order lines referencing it go with it.
pub async fn delete_item(db: &DatabaseConnection, item_id: i64) -> Result<()> {
    let result = Item::delete_by_id(item_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("item", item_id));
    }
    Ok(())
}

/// Finds an item by id.
pub async fn get_item_by_id<C>(db: &C, item_id: i64) -> Result<Option<item::Model>>
where
    C: ConnectionTrait,
{
    Item::find_by_id(item_id).one(db).await.map_err(Into::into)
}

/// Finds an item by id or fails with not found.
pub async fn require_item<C>(db: &C, item_id: i64) -> Result<item::Model>
where
    C: ConnectionTrait,
{
    get_item_by_id(db, item_id)
        .await?
        .ok_or_else(|| Error::not_found("item", item_id))
}

/// Finds an item that can be ordered right now.
///
/// # Errors
/// Not found for unknown ids, validation error for unavailable items.
pub async fn require_available_item<C>(db: &C, item_id: i64) -> Result<item::Model>
where
    C: ConnectionTrait,
{
    let found = require_item(db, item_id).await?;
    if !found.available {
        return Err(Error::validation(
            "item",
            format!("item '{}' is not available", found.name),
        ));
    }
    Ok(found)
}

/// Finds an item by exact name.
pub async fn get_item_by_name(db: &DatabaseConnection, name: &str) -> Result<Option<item::Model>> {
    Item::find()
        .filter(item::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// All available items, alphabetically.
pub async fn available_items(db: &DatabaseConnection) -> Result<Vec<item::Model>> {
    Item::find()
        .filter(item::Column::Available.eq(true))
        .order_by_asc(item::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds category names, image URLs and rating aggregates to items.
pub async fn to_views(
    db: &DatabaseConnection,
    items: Vec<item::Model>,
    base_url: &str,
) -> Result<Vec<ItemView>> {
    let category_ids: Vec<i64> = items.iter().map(|i| i.category_id).collect();
    let categories: HashMap<i64, String> = Category::find()
        .filter(crate::entities::category::Column::Id.is_in(category_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    let item_ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    let ratings = feedback::rating_summaries(db, &item_ids).await?;

    Ok(items
        .into_iter()
        .map(|item| ItemView {
            category_name: categories.get(&item.category_id).cloned(),
            image_url: image_url(base_url, item.image_path.as_deref()),
            rating: ratings.get(&item.id).copied().unwrap_or_default(),
            item,
        })
        .collect())
}

/// Read model of a single item.
pub async fn get_item_view(db: &DatabaseConnection, item_id: i64, base_url: &str) -> Result<ItemView> {
    let found = require_item(db, item_id).await?;
    let mut views = to_views(db, vec![found], base_url).await?;
    views
        .pop()
        .ok_or_else(|| Error::not_found("item", item_id))
}

/// Lists items with filters, search on name and description, and ordering by
/// price, calories or name (default).
pub async fn list_items(
    db: &DatabaseConnection,
    filter: &ItemFilter,
    params: &ListParams,
    base_url: &str,
) -> Result<Page<ItemView>> {
    let mut query = Item::find();
    if let Some(category_id) = filter.category_id {
        query = query.filter(item::Column::CategoryId.eq(category_id));
    }
    if let Some(available) = filter.available {
        query = query.filter(item::Column::Available.eq(available));
    }
    if let Some(term) = params.search_term() {
        query = query.filter(
            Condition::any()
                .add(item::Column::Name.contains(term))
                .add(item::Column::Description.contains(term)),
        );
    }
    query = match params.ordering(&["price", "calories", "name"])? {
        Some(("price", order)) => query.order_by(item::Column::Price, order),
        Some(("calories", order)) => query.order_by(item::Column::Calories, order),
        Some((_, order)) => query.order_by(item::Column::Name, order),
        None => query.order_by_asc(item::Column::Name),
    };

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
    use crate::test_utils::*;

    #[test]
    fn test_image_url() {
        let base = "https://cafe.example.edu";
        assert_eq!(image_url(base, None), None);
        assert_eq!(image_url(base, Some("")), None);
        assert_eq!(
            image_url(base, Some("items/causa.jpg")).as_deref(),
            Some("https://cafe.example.edu/media/items/causa.jpg")
        );
        assert_eq!(
            image_url(base, Some("https://cdn.example.com/x.png")).as_deref(),
            Some("https://cdn.example.com/x.png")
        );
    }

    #[tokio::test]
    async fn test_create_item_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let mut input = item_input("Causa", 1, 8.0);
        input.price = -1.0;
        let result = create_item(&db, input).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: -1.0 })));

        let mut input = item_input("Causa", 1, 8.0);
        input.price = f64::NAN;
        assert!(matches!(
            create_item(&db, input).await,
            Err(Error::InvalidAmount { .. })
        ));

        let input = item_input("  ", 1, 8.0);
        assert!(matches!(
            create_item(&db, input).await,
            Err(Error::Validation { field: "name", .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_item_requires_category() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_item(&db, item_input("Causa", 99, 8.0)).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "category", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_available_item_joins_todays_menu() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, item) = setup_with_item(&db).await?;

        let today = menu::get_menu_for(&db, menu::today()).await?.unwrap();
        assert_eq!(today.name, format!("Menu for {}", menu::today()));
        assert!(menu::menu_item_ids(&db, today.id).await?.contains(&item.id));

        // Marking it unavailable removes it again
        update_item(
            &db,
            item.id,
            ItemUpdate {
                available: Some(false),
                ..ItemUpdate::default()
            },
        )
        .await?;
        assert!(!menu::menu_item_ids(&db, today.id).await?.contains(&item.id));

        // And saving twice does not duplicate the link
        update_item(
            &db,
            item.id,
            ItemUpdate {
                available: Some(true),
                ..ItemUpdate::default()
            },
        )
        .await?;
        update_item(&db, item.id, ItemUpdate::default()).await?;
        assert_eq!(menu::menu_item_ids(&db, today.id).await?, vec![item.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_item_clears_optional_fields() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, item) = setup_with_item(&db).await?;
        assert!(item.calories.is_some());

        let updated = update_item(
            &db,
            item.id,
            ItemUpdate {
                calories: Some(None),
                price: Some(9.5),
                ..ItemUpdate::default()
            },
        )
        .await?;
        assert_eq!(updated.calories, None);
        assert_eq!(updated.price, 9.5);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_items_filters_and_views() -> Result<()> {
        let db = setup_test_db().await?;
        let (category, lomo) = setup_with_item(&db).await?;
        let mut input = item_input("Arroz con leche", category.id, 4.0);
        input.available = false;
        create_item(&db, input).await?;
        let user = create_test_user(&db, "A00001", "Juan Perez").await?;
        rate_item(&db, user.id, lomo.id, 5).await?;

        let page = list_items(&db, &ItemFilter::default(), &ListParams::default(), "").await?;
        assert_eq!(page.count, 2);
        assert_eq!(page.results[0].item.name, "Arroz con leche");
        assert_eq!(page.results[1].category_name.as_deref(), Some("Almuerzos"));
        assert_eq!(page.results[1].rating.total_votes, 1);

        let filter = ItemFilter {
            available: Some(true),
            ..ItemFilter::default()
        };
        let page = list_items(&db, &filter, &ListParams::default(), "").await?;
        assert_eq!(page.count, 1);

        let params = ListParams {
            ordering: Some("-price".to_string()),
            ..ListParams::default()
        };
        let page = list_items(&db, &ItemFilter::default(), &params, "").await?;
        assert_eq!(page.results[0].item.id, lomo.id);
        Ok(())
    }
}
