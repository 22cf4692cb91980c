//! Shared test utilities for the cafeteria backend.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        category, feedback,
        item::{self, ItemInput},
        order::{NewOrder, OrderLine},
        user::{self, NewUser},
    },
    entities::{self, PaymentMethod, Role},
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Email domain accepted in tests
pub const TEST_DOMAIN: &str = "tecsup.edu.pe";
/// Password given to every test user
pub const TEST_PASSWORD: &str = "contraseña-segura";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Registration data for a student.
///
/// # Defaults
/// * `email`: lowercase institutional id at [`TEST_DOMAIN`]
/// * `password`: [`TEST_PASSWORD`]
pub fn new_user_input(institutional_id: &str, name: &str) -> NewUser {
    NewUser {
        institutional_id: institutional_id.to_string(),
        name: name.to_string(),
        email: format!("{}@{TEST_DOMAIN}", institutional_id.to_lowercase()),
        password: TEST_PASSWORD.to_string(),
        role: Role::Student,
    }
}

/// Creates a student.
pub async fn create_test_user(
    db: &DatabaseConnection,
    institutional_id: &str,
    name: &str,
) -> Result<entities::user::Model> {
    user::create_user(db, new_user_input(institutional_id, name), TEST_DOMAIN).await
}

/// Creates an administrator.
pub async fn create_test_admin(
    db: &DatabaseConnection,
    institutional_id: &str,
    name: &str,
) -> Result<entities::user::Model> {
    let mut input = new_user_input(institutional_id, name);
    input.role = Role::Administrator;
    user::create_user(db, input, TEST_DOMAIN).await
}

/// Item data with only the required fields set; the item is available.
pub fn item_input(name: &str, category_id: i64, price: f64) -> ItemInput {
    ItemInput {
        name: name.to_string(),
        description: None,
        price,
        category_id,
        available: true,
        image_path: None,
        ingredients: None,
        calories: None,
        proteins: None,
        fats: None,
        carbohydrates: None,
    }
}

/// Creates the "Almuerzos" category with one available item.
///
/// # Defaults
/// * item: "Lomo saltado", price 12.5, 650 kcal
pub async fn setup_with_item(
    db: &DatabaseConnection,
) -> Result<(entities::category::Model, entities::item::Model)> {
    let category = category::create_category(db, "Almuerzos").await?;
    let mut input = item_input("Lomo saltado", category.id, 12.5);
    input.description = Some("Carne salteada con cebolla y tomate".to_string());
    input.calories = Some(650);
    let item = item::create_item(db, input).await?;
    Ok((category, item))
}

/// Leaves a rating without comment.
pub async fn rate_item(
    db: &DatabaseConnection,
    user_id: i64,
    item_id: i64,
    rating: i32,
) -> Result<entities::feedback::Model> {
    feedback::create_feedback(
        db,
        user_id,
        feedback::NewFeedback {
            item_id: Some(item_id),
            comment: String::new(),
            rating,
        },
    )
    .await
}

/// Order data paid in cash with no performer.
pub fn new_order_input(institutional_id: &str, items: Vec<OrderLine>) -> NewOrder {
    NewOrder {
        user: institutional_id.to_string(),
        menu_id: None,
        order_date: None,
        items,
        payment_method: PaymentMethod::Cash,
        performer_institutional_id: None,
        performer_name: None,
    }
}
