//! Menu entity - The daily menu ("carta"); at most one per date.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Menu database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "menus")]
pub struct Model {
    /// Unique identifier for the menu
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (defaults to "Menu for YYYY-MM-DD")
    pub name: String,
    /// Day the menu is served
    #[sea_orm(unique)]
    pub date: Date,
    /// Whether the menu is published
    pub available: bool,
}

/// Defines relationships between Menu and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One menu lists many items
    #[sea_orm(has_many = "super::menu_item::Entity")]
    MenuItems,
    /// Orders placed against this menu
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::menu_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MenuItems.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
