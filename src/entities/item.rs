//! Item entity - A dish or drink sold by the cafeteria.
//!
//! Items carry a price, an availability flag and optional nutrition facts.
//! Available items are what the daily menu is assembled from.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Dish name (e.g., "Lomo saltado")
    pub name: String,
    /// Optional free-text description
    pub description: Option<String>,
    /// Unit price
    pub price: f64,
    /// Category this item belongs to
    pub category_id: i64,
    /// Whether the item can currently be ordered
    pub available: bool,
    /// Relative path of the item's image, if any
    pub image_path: Option<String>,
    /// Free-text ingredient list
    pub ingredients: Option<String>,
    /// Kilocalories per serving
    pub calories: Option<i32>,
    /// Grams of protein per serving
    pub proteins: Option<f64>,
    /// Grams of fat per serving
    pub fats: Option<f64>,
    /// Grams of carbohydrates per serving
    pub carbohydrates: Option<f64>,
}

/// Defines relationships between Item and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "Cascade"
    )]
    Category,
    /// Menus this item appears on
    #[sea_orm(has_many = "super::menu_item::Entity")]
    MenuItems,
    /// Feedback left for this item
    #[sea_orm(has_many = "super::feedback::Entity")]
    Feedback,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::menu_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MenuItems.def()
    }
}

impl Related<super::feedback::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Feedback.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
