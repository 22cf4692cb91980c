//! Payment entity - Tracks how an order is settled.
//!
//! A payment is created `Pending` together with its order. `Completed` and
//! `Failed` are terminal states. The person who took the payment is either a
//! registered user (`performed_by`) or recorded by institutional id and name.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How the customer pays
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum PaymentMethod {
    /// Bank transfer from a mobile app
    #[sea_orm(string_value = "mobile_banking")]
    #[serde(rename = "mobile_banking")]
    MobileBanking,
    /// Debit or credit card
    #[sea_orm(string_value = "card")]
    #[serde(rename = "card")]
    Card,
    /// Cash at the counter
    #[sea_orm(string_value = "cash")]
    #[serde(rename = "cash")]
    Cash,
}

/// Settlement state of a payment
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(15))")]
pub enum PaymentStatus {
    /// Awaiting settlement
    #[sea_orm(string_value = "pending")]
    #[serde(rename = "pending")]
    Pending,
    /// Settled; terminal
    #[sea_orm(string_value = "completed")]
    #[serde(rename = "completed")]
    Completed,
    /// Rejected; terminal
    #[sea_orm(string_value = "failed")]
    #[serde(rename = "failed")]
    Failed,
}

impl PaymentStatus {
    /// Terminal states cannot be changed once stored.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Payment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Order being paid
    pub order_id: Option<i64>,
    /// Payment method
    pub method: PaymentMethod,
    /// Settlement state
    pub status: PaymentStatus,
    /// When the payment record was created
    pub created_at: DateTimeUtc,
    /// Amount due, computed from the order lines
    pub amount: f64,
    /// Registered user who took the payment
    pub performed_by: Option<i64>,
    /// Institutional id of an unregistered performer
    pub external_institutional_id: Option<String>,
    /// Name of an unregistered performer
    pub external_name: Option<String>,
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payment belongs to one order
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id",
        on_delete = "Cascade"
    )]
    Order,
    /// User who took the payment
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::PerformedBy",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Performer,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
