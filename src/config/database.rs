//! Database configuration module.
//!
//! This module handles the `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Composite uniqueness rules that the
//! entity derive cannot express are added as explicit unique indexes.

use crate::entities::{
    AuthToken, Cart, CartItem, Category, Feedback, Item, Menu, MenuItem, Order, OrderItem,
    Payment, Reservation, ReservationItem, User, cart_item, feedback, menu_item,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Default database location when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/cafeteria.sqlite?mode=rwc";

/// Creates the directory that will hold a file-backed `SQLite` database.
pub fn ensure_database_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let file = rest.split('?').next().unwrap_or_default();
    if let Some(parent) = Path::new(file)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Establishes a connection to the database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    ensure_database_dir(database_url)?;
    debug!("Connecting to database at {database_url}");
    Database::connect(database_url).await.map_err(Into::into)
}

fn table_for<E: EntityTrait>(schema: &Schema, entity: E) -> TableCreateStatement {
    schema.create_table_from_entity(entity).if_not_exists().to_owned()
}

fn unique_pair<E, A, B>(name: &str, entity: E, first: A, second: B) -> IndexCreateStatement
where
    E: EntityTrait,
    A: sea_orm::sea_query::IntoIden,
    B: sea_orm::sea_query::IntoIden,
{
    Index::create()
        .name(name)
        .table(entity)
        .col(first)
        .col(second)
        .unique()
        .if_not_exists()
        .to_owned()
}

/// Creates every table (if missing) plus the composite unique indexes.
///
/// Safe to call on every startup.
#[instrument(skip(db))]
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let tables = [
        table_for(&schema, User),
        table_for(&schema, AuthToken),
        table_for(&schema, Category),
        table_for(&schema, Item),
        table_for(&schema, Menu),
        table_for(&schema, MenuItem),
        table_for(&schema, Order),
        table_for(&schema, OrderItem),
        table_for(&schema, Payment),
        table_for(&schema, Reservation),
        table_for(&schema, ReservationItem),
        table_for(&schema, Feedback),
        table_for(&schema, Cart),
        table_for(&schema, CartItem),
    ];
    for table in &tables {
        db.execute(builder.build(table)).await?;
    }

    let indexes = [
        unique_pair(
            "idx_menu_items_menu_item",
            MenuItem,
            menu_item::Column::MenuId,
            menu_item::Column::ItemId,
        ),
        unique_pair(
            "idx_feedback_user_item",
            Feedback,
            feedback::Column::UserId,
            feedback::Column::ItemId,
        ),
        unique_pair(
            "idx_cart_items_cart_item",
            CartItem,
            cart_item::Column::CartId,
            cart_item::Column::ItemId,
        ),
    ];
    for index in &indexes {
        db.execute(builder.build(index)).await?;
    }

    info!("Database tables ensured ({} tables)", tables.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = create_connection("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _ = User::find().limit(1).all(&db).await?;
        let _ = Item::find().limit(1).all(&db).await?;
        let _ = Menu::find().limit(1).all(&db).await?;
        let _ = Order::find().limit(1).all(&db).await?;
        let _ = Payment::find().limit(1).all(&db).await?;
        let _ = Reservation::find().limit(1).all(&db).await?;
        let _ = Cart::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[test]
    fn test_ensure_database_dir_ignores_memory_urls() -> Result<()> {
        ensure_database_dir("sqlite::memory:")?;
        ensure_database_dir("sqlite://cafeteria.sqlite?mode=rwc")?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = create_connection("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        let _ = Feedback::find().limit(1).all(&db).await?;
        Ok(())
    }
}
