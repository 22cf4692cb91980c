//! User entity - Represents people who can sign in to the platform.
//!
//! Users are identified by their 6-character institutional id. Administrators
//! manage the catalog and payments; students place reservations and orders.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role granted to a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum Role {
    /// Full access to catalog, menus, payments and users
    #[sea_orm(string_value = "administrator")]
    #[serde(rename = "administrator")]
    Administrator,
    /// Can order, reserve, rate and use the chatbot
    #[sea_orm(string_value = "student")]
    #[serde(rename = "student")]
    Student,
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Institutional id used to sign in (exactly 6 characters)
    #[sea_orm(unique)]
    pub institutional_id: String,
    /// Full name
    pub name: String,
    /// Institutional email address
    #[sea_orm(unique)]
    pub email: String,
    /// Access role
    pub role: Role,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Inactive users cannot sign in
    pub is_active: bool,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many auth tokens
    #[sea_orm(has_many = "super::auth_token::Entity")]
    AuthTokens,
    /// One user places many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
    /// One user makes many reservations
    #[sea_orm(has_many = "super::reservation::Entity")]
    Reservations,
    /// One user leaves many feedback entries
    #[sea_orm(has_many = "super::feedback::Entity")]
    Feedback,
}

impl Related<super::auth_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuthTokens.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservations.def()
    }
}

impl Related<super::feedback::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Feedback.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
