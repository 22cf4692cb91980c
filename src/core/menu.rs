//! Menu business logic - The daily menu ("carta") and its items.
//!
//! There is at most one menu per date. Today's menu is created on demand the
//! first time an available item is saved or the menu is assembled.

use crate::{
    core::{
        item::{self as items, ItemView},
        listing::{self, ListParams, Page},
    },
    entities::{Item, Menu, MenuItem, item, menu, menu_item},
    errors::{Error, Result, is_unique_violation},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    Condition, IntoActiveModel, JoinType, QueryOrder, QuerySelect, RelationTrait, Set,
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Today's date in UTC.
#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Name given to menus created automatically.
#[must_use]
pub fn default_menu_name(date: NaiveDate) -> String {
    format!("Menu for {date}")
}

/// New menu
#[derive(Debug, Clone, Deserialize)]
pub struct NewMenu {
    /// Display name; defaults to "Menu for YYYY-MM-DD"
    pub name: Option<String>,
    /// Day the menu is served
    pub date: NaiveDate,
    /// Whether the menu is published
    #[serde(default = "default_available")]
    pub available: bool,
}

const fn default_available() -> bool {
    true
}

/// Partial update of a menu
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuUpdate {
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub available: Option<bool>,
}

/// Filters accepted by [`list_menus`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuFilter {
    pub date: Option<NaiveDate>,
    pub available: Option<bool>,
}

/// Filters accepted by [`list_menu_items`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuItemFilter {
    pub menu_id: Option<i64>,
    pub item_id: Option<i64>,
}

/// Link between a menu and an item, with the item's name
#[derive(Debug, Clone, Serialize)]
pub struct MenuItemView {
    /// Stored link
    #[serde(flatten)]
    pub menu_item: menu_item::Model,
    /// Name of the listed item
    pub item_name: Option<String>,
}

/// Menu with its links and the full read model of every listed item
#[derive(Debug, Clone, Serialize)]
pub struct MenuView {
    #[serde(flatten)]
    pub menu: menu::Model,
    pub menu_items: Vec<MenuItemView>,
    pub items: Vec<ItemView>,
}

/// Finds the menu of a date.
pub async fn get_menu_for<C>(db: &C, date: NaiveDate) -> Result<Option<menu::Model>>
where
    C: ConnectionTrait,
{
    Menu::find()
        .filter(menu::Column::Date.eq(date))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns the menu of a date, creating an available one if none exists.
pub async fn get_or_create_menu_for<C>(db: &C, date: NaiveDate) -> Result<menu::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = get_menu_for(db, date).await? {
        return Ok(existing);
    }
    let inserted = menu::ActiveModel {
        name: Set(default_menu_name(date)),
        date: Set(date),
        available: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await;
    match inserted {
        Ok(created) => {
            info!("Created menu '{}'", created.name);
            Ok(created)
        }
        // Another request created it first
        Err(err) if is_unique_violation(&err) => get_menu_for(db, date)
            .await?
            .ok_or_else(|| Error::not_found("menu", date)),
        Err(err) => Err(err.into()),
    }
}

async fn find_link<C>(db: &C, menu_id: i64, item_id: i64) -> Result<Option<menu_item::Model>>
where
    C: ConnectionTrait,
{
    MenuItem::find()
        .filter(menu_item::Column::MenuId.eq(menu_id))
        .filter(menu_item::Column::ItemId.eq(item_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists an item on a menu. Returns `false` if it was already listed.
pub async fn link_item<C>(db: &C, menu_id: i64, item_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    if find_link(db, menu_id, item_id).await?.is_some() {
        return Ok(false);
    }
    let inserted = menu_item::ActiveModel {
        menu_id: Set(menu_id),
        item_id: Set(item_id),
        ..Default::default()
    }
    .insert(db)
    .await;
    match inserted {
        Ok(_) => Ok(true),
        Err(err) if is_unique_violation(&err) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// Removes an item from the menu of `date`, if that menu exists.
pub async fn unlink_item_for_date<C>(db: &C, date: NaiveDate, item_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    if let Some(existing) = get_menu_for(db, date).await? {
        MenuItem::delete_many()
            .filter(menu_item::Column::MenuId.eq(existing.id))
            .filter(menu_item::Column::ItemId.eq(item_id))
            .exec(db)
            .await?;
    }
    Ok(())
}

/// Ids of the items listed on a menu, in insertion order.
pub async fn menu_item_ids<C>(db: &C, menu_id: i64) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    Ok(MenuItem::find()
        .filter(menu_item::Column::MenuId.eq(menu_id))
        .order_by_asc(menu_item::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.item_id)
        .collect())
}

/// Lists every available item on the menu of `date`.
///
/// Returns the menu and the number of newly linked items. Running it again
/// on the same day links nothing.
pub async fn assemble_daily_menu(
    db: &DatabaseConnection,
    date: NaiveDate,
) -> Result<(menu::Model, usize)> {
    let daily = get_or_create_menu_for(db, date).await?;
    let mut added = 0;
    for available in items::available_items(db).await? {
        if link_item(db, daily.id, available.id).await? {
            added += 1;
        }
    }
    info!("Assembled '{}': {added} item(s) added", daily.name);
    Ok((daily, added))
}

/// Creates a menu. Only one menu may exist per date.
pub async fn create_menu(db: &DatabaseConnection, input: NewMenu) -> Result<menu::Model> {
    if get_menu_for(db, input.date).await?.is_some() {
        return Err(Error::conflict(format!(
            "a menu for {} already exists",
            input.date
        )));
    }
    let name = input
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| default_menu_name(input.date));

    menu::ActiveModel {
        name: Set(name),
        date: Set(input.date),
        available: Set(input.available),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds a menu by id or fails with not found.
pub async fn get_menu(db: &DatabaseConnection, menu_id: i64) -> Result<menu::Model> {
    Menu::find_by_id(menu_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("menu", menu_id))
}

/// Applies a partial update to a menu.
pub async fn update_menu(
    db: &DatabaseConnection,
    menu_id: i64,
    update: MenuUpdate,
) -> Result<menu::Model> {
    let mut active = get_menu(db, menu_id).await?.into_active_model();
    if let Some(date) = update.date {
        if let Some(other) = get_menu_for(db, date).await? {
            if other.id != menu_id {
                return Err(Error::conflict(format!("a menu for {date} already exists")));
            }
        }
        active.date = Set(date);
    }
    if let Some(name) = update.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(Error::validation("name", "menu name cannot be empty"));
        }
        active.name = Set(name);
    }
    if let Some(available) = update.available {
        active.available = Set(available);
    }
    active.update(db).await.map_err(Into::into)
}

/// Deletes a menu together with its item links.
pub async fn delete_menu(db: &DatabaseConnection, menu_id: i64) -> Result<()> {
    let result = Menu::delete_by_id(menu_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("menu", menu_id));
    }
    Ok(())
}

async fn item_names(db: &DatabaseConnection, item_ids: Vec<i64>) -> Result<HashMap<i64, String>> {
    Ok(Item::find()
        .filter(item::Column::Id.is_in(item_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|i| (i.id, i.name))
        .collect())
}

/// Adds item names to menu links.
pub async fn menu_item_views(
    db: &DatabaseConnection,
    links: Vec<menu_item::Model>,
) -> Result<Vec<MenuItemView>> {
    let names = item_names(db, links.iter().map(|l| l.item_id).collect()).await?;
    Ok(links
        .into_iter()
        .map(|menu_item| MenuItemView {
            item_name: names.get(&menu_item.item_id).cloned(),
            menu_item,
        })
        .collect())
}

/// Adds the item name to a single menu link.
pub async fn menu_item_view(db: &DatabaseConnection, link: menu_item::Model) -> Result<MenuItemView> {
    let id = link.id;
    menu_item_views(db, vec![link])
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("menu item", id))
}

/// Builds the read model of a menu.
pub async fn menu_view(
    db: &DatabaseConnection,
    menu: menu::Model,
    base_url: &str,
) -> Result<MenuView> {
    let links = MenuItem::find()
        .filter(menu_item::Column::MenuId.eq(menu.id))
        .order_by_asc(menu_item::Column::Id)
        .all(db)
        .await?;
    let listed = Item::find()
        .filter(item::Column::Id.is_in(links.iter().map(|l| l.item_id)))
        .order_by_asc(item::Column::Name)
        .all(db)
        .await?;
    Ok(MenuView {
        menu_items: menu_item_views(db, links).await?,
        items: items::to_views(db, listed, base_url).await?,
        menu,
    })
}

/// Today's menu, created and filled with the available items if missing.
pub async fn today_menu(db: &DatabaseConnection, base_url: &str) -> Result<MenuView> {
    let date = today();
    let daily = match get_menu_for(db, date).await? {
        Some(existing) => existing,
        None => assemble_daily_menu(db, date).await?.0,
    };
    menu_view(db, daily, base_url).await
}

/// Lists menus, by date unless asked otherwise.
pub async fn list_menus(
    db: &DatabaseConnection,
    filter: &MenuFilter,
    params: &ListParams,
    base_url: &str,
) -> Result<Page<MenuView>> {
    let mut query = Menu::find();
    if let Some(date) = filter.date {
        query = query.filter(menu::Column::Date.eq(date));
    }
    if let Some(available) = filter.available {
        query = query.filter(menu::Column::Available.eq(available));
    }
    if let Some(term) = params.search_term() {
        query = query.filter(menu::Column::Name.contains(term));
    }
    query = match params.ordering(&["date", "name"])? {
        Some(("name", order)) => query.order_by(menu::Column::Name, order),
        Some((_, order)) => query.order_by(menu::Column::Date, order),
        None => query.order_by_asc(menu::Column::Date),
    };

    let mut page = listing::paginate(db, query, params).await?;
    let mut views = Vec::with_capacity(page.results.len());
    for row in std::mem::take(&mut page.results) {
        views.push(menu_view(db, row, base_url).await?);
    }
    Ok(page.with_results(views))
}

/// Lists an item on a menu explicitly.
///
/// # Errors
/// Conflict when the item is already on the menu.
pub async fn create_menu_item(
    db: &DatabaseConnection,
    menu_id: i64,
    item_id: i64,
) -> Result<menu_item::Model> {
    get_menu(db, menu_id).await?;
    items::require_item(db, item_id).await?;
    if find_link(db, menu_id, item_id).await?.is_some() {
        return Err(Error::conflict("item already on this menu"));
    }
    menu_item::ActiveModel {
        menu_id: Set(menu_id),
        item_id: Set(item_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds a menu link by id.
pub async fn get_menu_item(db: &DatabaseConnection, menu_item_id: i64) -> Result<menu_item::Model> {
    MenuItem::find_by_id(menu_item_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("menu item", menu_item_id))
}

/// Moves a link to another menu and/or item.
pub async fn update_menu_item(
    db: &DatabaseConnection,
    menu_item_id: i64,
    menu_id: Option<i64>,
    item_id: Option<i64>,
) -> Result<menu_item::Model> {
    let current = get_menu_item(db, menu_item_id).await?;
    let target_menu = menu_id.unwrap_or(current.menu_id);
    let target_item = item_id.unwrap_or(current.item_id);
    get_menu(db, target_menu).await?;
    items::require_item(db, target_item).await?;
    if let Some(other) = find_link(db, target_menu, target_item).await? {
        if other.id != menu_item_id {
            return Err(Error::conflict("item already on this menu"));
        }
    }
    let mut active = current.into_active_model();
    active.menu_id = Set(target_menu);
    active.item_id = Set(target_item);
    active.update(db).await.map_err(Into::into)
}

/// Removes a menu link.
pub async fn delete_menu_item(db: &DatabaseConnection, menu_item_id: i64) -> Result<()> {
    let result = MenuItem::delete_by_id(menu_item_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("menu item", menu_item_id));
    }
    Ok(())
}

/// Lists menu links, by menu name then item name unless asked otherwise.
///
/// `search` matches the menu name or the item name.
pub async fn list_menu_items(
    db: &DatabaseConnection,
    filter: &MenuItemFilter,
    params: &ListParams,
) -> Result<Page<MenuItemView>> {
    let mut query = MenuItem::find()
        .join(JoinType::InnerJoin, menu_item::Relation::Menu.def())
        .join(JoinType::InnerJoin, menu_item::Relation::Item.def());
    let mut condition = Condition::all();
    if let Some(menu_id) = filter.menu_id {
        condition = condition.add(menu_item::Column::MenuId.eq(menu_id));
    }
    if let Some(item_id) = filter.item_id {
        condition = condition.add(menu_item::Column::ItemId.eq(item_id));
    }
    if let Some(term) = params.search_term() {
        condition = condition.add(
            Condition::any()
                .add(menu::Column::Name.contains(term))
                .add(item::Column::Name.contains(term)),
        );
    }
    query = query.filter(condition);
    query = match params.ordering(&["menu_name", "item_name"])? {
        Some(("item_name", order)) => query.order_by(item::Column::Name, order),
        Some((_, order)) => query
            .order_by(menu::Column::Name, order)
            .order_by_asc(item::Column::Name),
        None => query
            .order_by_asc(menu::Column::Name)
            .order_by_asc(item::Column::Name),
    };
    query = query.order_by_asc(menu_item::Column::Id);

    let mut page = listing::paginate(db, query, params).await?;
    let rows = std::mem::take(&mut page.results);
    let views = menu_item_views(db, rows).await?;
    Ok(page.with_results(views))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_default_menu_name() {
        assert_eq!(default_menu_name(date("2025-03-14")), "Menu for 2025-03-14");
    }

    #[tokio::test]
    async fn test_get_or_create_menu_for_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let first = get_or_create_menu_for(&db, date("2025-03-14")).await?;
        let second = get_or_create_menu_for(&db, date("2025-03-14")).await?;
        assert_eq!(first.id, second.id);
        assert!(first.available);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create_menu_for_shares_one_menu() -> Result<()> {
        let db = setup_test_db().await?;
        let day = date("2025-03-14");
        let (first, second) = tokio::join!(
            get_or_create_menu_for(&db, day),
            get_or_create_menu_for(&db, day)
        );
        assert_eq!(first?.id, second?.id);
        assert_eq!(Menu::find().all(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_assemble_daily_menu_links_available_items_once() -> Result<()> {
        let db = setup_test_db().await?;
        let (category, lomo) = setup_with_item(&db).await?;
        let mut input = item_input("Arroz con leche", category.id, 4.0);
        input.available = false;
        crate::core::item::create_item(&db, input).await?;

        let day = date("2025-03-14");
        let (daily, added) = assemble_daily_menu(&db, day).await?;
        assert_eq!(added, 1);
        assert_eq!(menu_item_ids(&db, daily.id).await?, vec![lomo.id]);

        let (_, added) = assemble_daily_menu(&db, day).await?;
        assert_eq!(added, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_menu_one_per_date() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_menu(
            &db,
            NewMenu {
                name: None,
                date: date("2025-03-14"),
                available: true,
            },
        )
        .await?;
        assert_eq!(created.name, "Menu for 2025-03-14");

        let duplicate = create_menu(
            &db,
            NewMenu {
                name: Some("Otro".to_string()),
                date: date("2025-03-14"),
                available: false,
            },
        )
        .await;
        assert!(matches!(duplicate, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_menu_item_conflict() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, item) = setup_with_item(&db).await?;
        let other_day = get_or_create_menu_for(&db, date("2025-03-14")).await?;

        create_menu_item(&db, other_day.id, item.id).await?;
        let result = create_menu_item(&db, other_day.id, item.id).await;
        assert!(
            matches!(result, Err(Error::Conflict { ref message }) if message == "item already on this menu")
        );

        let missing = create_menu_item(&db, other_day.id, 999).await;
        assert!(matches!(missing, Err(Error::NotFound { entity: "item", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_today_menu_view() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, item) = setup_with_item(&db).await?;

        let view = today_menu(&db, "http://localhost").await?;
        assert_eq!(view.menu.date, today());
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].item.id, item.id);
        assert_eq!(view.menu_items[0].item_name.as_deref(), Some(item.name.as_str()));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_menus_ordering() -> Result<()> {
        let db = setup_test_db().await?;
        get_or_create_menu_for(&db, date("2025-03-15")).await?;
        get_or_create_menu_for(&db, date("2025-03-14")).await?;

        let page = list_menus(&db, &MenuFilter::default(), &ListParams::default(), "").await?;
        assert_eq!(page.count, 2);
        assert_eq!(page.results[0].menu.date, date("2025-03-14"));

        let params = ListParams {
            ordering: Some("-date".to_string()),
            ..ListParams::default()
        };
        let page = list_menus(&db, &MenuFilter::default(), &params, "").await?;
        assert_eq!(page.results[0].menu.date, date("2025-03-15"));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_menu_items_search_and_ordering() -> Result<()> {
        let db = setup_test_db().await?;
        let (category, lomo) = setup_with_item(&db).await?;
        let causa = crate::core::item::create_item(&db, item_input("Causa", category.id, 8.0)).await?;
        let march = get_or_create_menu_for(&db, date("2025-03-14")).await?;
        create_menu_item(&db, march.id, lomo.id).await?;
        create_menu_item(&db, march.id, causa.id).await?;

        let all = MenuItemFilter {
            menu_id: Some(march.id),
            item_id: None,
        };
        let page = list_menu_items(&db, &all, &ListParams::default()).await?;
        assert_eq!(page.count, 2);
        assert_eq!(page.results[0].item_name.as_deref(), Some("Causa"));

        let params = ListParams {
            ordering: Some("-item_name".to_string()),
            ..ListParams::default()
        };
        let page = list_menu_items(&db, &all, &params).await?;
        assert_eq!(page.results[0].menu_item.item_id, lomo.id);

        let params = ListParams {
            search: Some("caus".to_string()),
            ..ListParams::default()
        };
        let page = list_menu_items(&db, &all, &params).await?;
        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].menu_item.item_id, causa.id);

        let params = ListParams {
            search: Some("2025-03-14".to_string()),
            ..ListParams::default()
        };
        assert_eq!(list_menu_items(&db, &all, &params).await?.count, 2);

        let params = ListParams {
            search: Some("zzz-no-match".to_string()),
            ..ListParams::default()
        };
        assert_eq!(list_menu_items(&db, &all, &params).await?.count, 0);

        let params = ListParams {
            ordering: Some("bogus".to_string()),
            ..ListParams::default()
        };
        assert!(matches!(
            list_menu_items(&db, &all, &params).await,
            Err(Error::Validation { field: "ordering", .. })
        ));
        Ok(())
    }
}
