//! Category business logic.

use crate::{
    core::listing::{self, ListParams, Page},
    entities::{Category, category},
    errors::{Error, Result},
};
use sea_orm::{IntoActiveModel, QueryOrder, Set, prelude::*};

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("name", "category name cannot be empty"));
    }
    Ok(name.to_string())
}

/// Finds a category by exact name.
pub async fn get_category_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<category::Model>> {
    Category::find()
        .filter(category::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a category by id.
pub async fn get_category_by_id(
    db: &DatabaseConnection,
    category_id: i64,
) -> Result<Option<category::Model>> {
    Category::find_by_id(category_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a category with a unique, non-empty name.
pub async fn create_category(db: &DatabaseConnection, name: &str) -> Result<category::Model> {
    let name = clean_name(name)?;
    if get_category_by_name(db, &name).await?.is_some() {
        return Err(Error::conflict(format!("category '{name}' already exists")));
    }
    category::ActiveModel {
        name: Set(name),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Returns the category with this name, creating it if needed.
pub async fn get_or_create_category(db: &DatabaseConnection, name: &str) -> Result<category::Model> {
    let name = clean_name(name)?;
    match get_category_by_name(db, &name).await? {
        Some(existing) => Ok(existing),
        None => create_category(db, &name).await,
    }
}

/// Renames a category.
pub async fn rename_category(
    db: &DatabaseConnection,
    category_id: i64,
    name: &str,
) -> Result<category::Model> {
    let name = clean_name(name)?;
    let existing = get_category_by_id(db, category_id)
        .await?
        .ok_or_else(|| Error::not_found("category", category_id))?;
    if let Some(other) = get_category_by_name(db, &name).await? {
        if other.id != category_id {
            return Err(Error::conflict(format!("category '{name}' already exists")));
        }
    }
    let mut active = existing.into_active_model();
    active.name = Set(name);
    active.update(db).await.map_err(Into::into)
}

/// Deletes a category together with its items.
pub async fn delete_category(db: &DatabaseConnection, category_id: i64) -> Result<()> {
    let result = Category::delete_by_id(category_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("category", category_id));
    }
    Ok(())
}

/// Lists categories, searchable and ordered by name.
pub async fn list_categories(
    db: &DatabaseConnection,
    params: &ListParams,
) -> Result<Page<category::Model>> {
    let mut query = Category::find();
    if let Some(term) = params.search_term() {
        query = query.filter(category::Column::Name.contains(term));
    }
    let order = params
        .ordering(&["name"])?
        .map_or(sea_orm::Order::Asc, |(_, order)| order);
    query = query.order_by(category::Column::Name, order);
    listing::paginate(db, query, params).await
}
