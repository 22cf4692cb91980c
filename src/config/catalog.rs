//! Catalog seed loading from config.toml
//!
//! The optional TOML file lists categories and items that should exist on
//! startup. Seeding only inserts what is missing (matched by name), so it is
//! safe to run on every boot.

use crate::{
    core::{category, item},
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct CatalogConfig {
    /// Category names to create
    #[serde(default)]
    pub categories: Vec<String>,
    /// Items to create
    #[serde(default)]
    pub items: Vec<ItemConfig>,
}

/// Configuration for a single menu item
#[derive(Debug, Deserialize, Clone)]
pub struct ItemConfig {
    /// Dish name
    pub name: String,
    /// Name of the category (created if missing)
    pub category: String,
    /// Unit price
    pub price: f64,
    /// Optional description
    pub description: Option<String>,
    /// Whether the item starts available
    #[serde(default = "default_available")]
    pub available: bool,
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

/// Loads the catalog from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<CatalogConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read catalog file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse catalog file: {e}"),
    })
}

/// Loads the catalog if the file exists, otherwise returns an empty catalog.
pub fn load_catalog_if_present<P: AsRef<Path>>(path: P) -> Result<CatalogConfig> {
    if path.as_ref().exists() {
        load_catalog(path)
    } else {
        debug!("No catalog file at {}", path.as_ref().display());
        Ok(CatalogConfig::default())
    }
}

/// Inserts missing categories and items. Returns how many items were created.
pub async fn seed_catalog(db: &DatabaseConnection, catalog: &CatalogConfig) -> Result<usize> {
    let category_names = catalog
        .categories
        .iter()
        .chain(catalog.items.iter().map(|i| &i.category));
    for name in category_names {
        category::get_or_create_category(db, name).await?;
    }

    let mut created = 0;
    for entry in &catalog.items {
        if item::get_item_by_name(db, &entry.name).await?.is_some() {
            continue;
        }
        let category = category::get_or_create_category(db, &entry.category).await?;
        item::create_item(
            db,
            item::ItemInput {
                name: entry.name.clone(),
                description: entry.description.clone(),
                price: entry.price,
                category_id: category.id,
                available: entry.available,
                image_path: None,
                ingredients: None,
                calories: entry.calories,
                proteins: entry.proteins,
                fats: entry.fats,
                carbohydrates: entry.carbohydrates,
            },
        )
        .await?;
        created += 1;
    }

    info!("Catalog seed created {created} items");
    Ok(created)
}
